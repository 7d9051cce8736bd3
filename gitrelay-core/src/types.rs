//! Domain types flowing through one sync pass.
//!
//! All entities here are pass-scoped: fetched, decrypted, extracted, and
//! published within a single pipeline iteration, then dropped. Only
//! [`crate::ChangeCache`] outlives a pass.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One object currently present in the remote bucket, as reported by the
/// store listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteObject {
    pub key: String,
    pub last_modified: DateTime<Utc>,
}

/// Ciphertext of a fetched object. The body is fully collected so the
/// underlying network resource is released as soon as the fetch completes.
#[derive(Debug, Clone)]
pub struct EncryptedBundle {
    pub key: String,
    pub ciphertext: Vec<u8>,
}

/// Plaintext tar stream produced one-to-one from an [`EncryptedBundle`].
#[derive(Debug, Clone)]
pub struct DecryptedBundle {
    pub key: String,
    pub plaintext: Vec<u8>,
}

/// Push destination recovered from an object key.
///
/// `short_sha` is always the first 7 characters of the full commit SHA the
/// producer encoded into the key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteMetadata {
    /// Destination group path, possibly nested (`"team/sub"`).
    pub group: String,
    pub project: String,
    pub branch: String,
    pub short_sha: String,
}

impl RouteMetadata {
    /// `<group>/<project>` path component used when composing push URLs.
    pub fn project_path(&self) -> String {
        if self.group.is_empty() {
            self.project.clone()
        } else {
            format!("{}/{}", self.group, self.project)
        }
    }
}

/// A repository unpacked into the scratch tree, ready to publish.
#[derive(Debug, Clone)]
pub struct ExtractedArchive {
    /// Root of the unpacked repository (the first directory entry seen while
    /// unpacking; archives may wrap the repo in one enclosing directory).
    pub local_dir: PathBuf,
    pub route: RouteMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_path_joins_group_and_project() {
        let route = RouteMetadata {
            group: "team/sub".to_string(),
            project: "svc".to_string(),
            branch: "main".to_string(),
            short_sha: "abcdef1".to_string(),
        };
        assert_eq!(route.project_path(), "team/sub/svc");
    }

    #[test]
    fn project_path_without_group() {
        let route = RouteMetadata {
            group: String::new(),
            project: "svc".to_string(),
            branch: "main".to_string(),
            short_sha: "abcdef1".to_string(),
        };
        assert_eq!(route.project_path(), "svc");
    }
}
