//! Change-detection properties across listing shapes.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, TimeZone, Utc};
use gitrelay_core::{route, ChangeCache, RemoteObject};

fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().expect("timestamp")
}

fn obj(key: &str, secs: i64) -> RemoteObject {
    RemoteObject {
        key: key.to_string(),
        last_modified: ts(secs),
    }
}

#[test]
fn committed_key_with_new_sibling_flags_only_the_sibling() {
    let mut cache = ChangeCache::new();
    cache.pending_writer().record("k1", ts(0));
    cache.commit();

    let changed = cache.diff(&[obj("k1", 0), obj("k2", 1)]);
    let keys: Vec<&str> = changed.iter().map(|o| o.key.as_str()).collect();
    assert_eq!(keys, vec!["k2"]);
}

#[test]
fn replaced_object_is_flagged_even_with_earlier_timestamp() {
    let mut cache = ChangeCache::new();
    cache.pending_writer().record("k1", ts(100));
    cache.commit();

    let changed = cache.diff(&[obj("k1", 2)]);
    let keys: Vec<&str> = changed.iter().map(|o| o.key.as_str()).collect();
    assert_eq!(keys, vec!["k1"]);
}

#[test]
fn route_for_a_realistic_key_survives_the_full_encode_decode_cycle() {
    let encoded = STANDARD.encode("platform/infra/relay/production/fedcba9876543210");
    let key = format!("{encoded}.tar.age");

    let route = route::decode(&key).expect("decode");
    assert_eq!(route.group, "platform/infra");
    assert_eq!(route.project, "relay");
    assert_eq!(route.branch, "production");
    assert_eq!(route.short_sha, "fedcba9");
    assert_eq!(route.project_path(), "platform/infra/relay");
}
