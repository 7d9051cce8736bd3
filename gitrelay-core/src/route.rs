//! Object-key → [`RouteMetadata`] decoding.
//!
//! The upstream producer names each object after its destination: a
//! base64-encoded `/`-delimited path whose final segments carry the commit
//! SHA and (optionally) the branch, followed by a file extension
//! (`.tar.age`). Decoding recovers where the bundle must be pushed.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::RouteError;
use crate::types::RouteMetadata;

/// Branch used when the key encodes no branch segment.
pub const DEFAULT_BRANCH: &str = "main";

const SHORT_SHA_LEN: usize = 7;

/// Decode the routing metadata encoded in an object key.
///
/// Strips everything from the first `.` (the file extension), base64-decodes
/// the remainder, and splits on `/`. The last segment is the full commit
/// SHA. With four or more segments the second-to-last is the branch; with
/// exactly three there is no branch segment and [`DEFAULT_BRANCH`] applies.
/// The leading segments form the destination group path and project name.
pub fn decode(key: &str) -> Result<RouteMetadata, RouteError> {
    let encoded = key.split('.').next().unwrap_or(key);
    let decoded = STANDARD.decode(encoded).map_err(|source| RouteError::Base64 {
        key: key.to_string(),
        source,
    })?;
    let text = String::from_utf8(decoded).map_err(|_| RouteError::NotUtf8 {
        key: key.to_string(),
    })?;

    let segments: Vec<&str> = text.split('/').collect();
    if segments.len() < 3 || segments.iter().any(|s| s.is_empty()) {
        return Err(RouteError::SegmentCount {
            key: key.to_string(),
            found: segments.len(),
        });
    }

    let sha = segments[segments.len() - 1];
    let short_sha = sha
        .get(..SHORT_SHA_LEN)
        .ok_or_else(|| RouteError::ShortSha {
            key: key.to_string(),
        })?;

    let (leading, branch) = if segments.len() >= 4 {
        (
            &segments[..segments.len() - 2],
            segments[segments.len() - 2].to_string(),
        )
    } else {
        (&segments[..segments.len() - 1], DEFAULT_BRANCH.to_string())
    };

    let project = leading[leading.len() - 1].to_string();
    let group = leading[..leading.len() - 1].join("/");

    Ok(RouteMetadata {
        group,
        project,
        branch,
        short_sha: short_sha.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_key(path: &str) -> String {
        format!("{}.tar.age", STANDARD.encode(path))
    }

    #[test]
    fn decodes_group_project_branch_sha() {
        let key = encode_key("g/p/b/abcdef1234567890");
        let route = decode(&key).expect("decode");
        assert_eq!(route.group, "g");
        assert_eq!(route.project, "p");
        assert_eq!(route.branch, "b");
        assert_eq!(route.short_sha, "abcdef1");
    }

    #[test]
    fn nested_group_keeps_branch_and_project_positions() {
        let key = encode_key("team/sub/svc/release/0123456789abcdef");
        let route = decode(&key).expect("decode");
        assert_eq!(route.group, "team/sub");
        assert_eq!(route.project, "svc");
        assert_eq!(route.branch, "release");
        assert_eq!(route.short_sha, "0123456");
    }

    #[test]
    fn three_segments_defaults_branch() {
        let key = encode_key("g/p/abcdef1234567890");
        let route = decode(&key).expect("decode");
        assert_eq!(route.group, "g");
        assert_eq!(route.project, "p");
        assert_eq!(route.branch, DEFAULT_BRANCH);
        assert_eq!(route.short_sha, "abcdef1");
    }

    #[test]
    fn rejects_invalid_base64() {
        let err = decode("not-base64!!.tar.age").expect_err("must fail");
        assert!(matches!(err, RouteError::Base64 { .. }));
    }

    #[test]
    fn rejects_too_few_segments() {
        let key = encode_key("p/abcdef1234567890");
        let err = decode(&key).expect_err("must fail");
        assert!(matches!(err, RouteError::SegmentCount { found: 2, .. }));
    }

    #[test]
    fn rejects_short_sha_segment() {
        let key = encode_key("g/p/b/abc");
        let err = decode(&key).expect_err("must fail");
        assert!(matches!(err, RouteError::ShortSha { .. }));
    }

    #[test]
    fn extension_split_happens_at_first_dot() {
        // base64 of "g/p/abcdef1234567890" followed by a two-part extension;
        // only the part before the first dot is decoded.
        let encoded = STANDARD.encode("g/p/abcdef1234567890");
        let key = format!("{encoded}.tar.age");
        assert!(decode(&key).is_ok());
    }
}
