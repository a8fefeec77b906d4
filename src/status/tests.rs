use rstest::rstest;

use super::*;

#[rstest]
#[case(Deps::new(), Deps::new(), true)]
#[case(Deps::new().with(1).with(2), Deps::new().with(1).with(2), true)]
#[case(Deps::new().with(1), Deps::new().with(2), false)]
#[case(Deps::new().with(1), Deps::new().with(1).with(2), false)]
#[case(Deps::new().with(1).with(2), Deps::new().with(2).with(1), false)]
fn deps_shallow_eq(#[case] a: Deps, #[case] b: Deps, #[case] expected: bool) {
    assert_eq!(a.shallow_eq(&b), expected);
}

#[test]
fn dep_key_is_stable() {
    assert_eq!(DepKey::of(7u32), DepKey::of(7u32));
    assert_ne!(DepKey::of(7u32), DepKey::of(8u32));
    assert_eq!(DepKey::of("id"), DepKey::of("id"));
}

#[test]
fn merge_is_field_wise() {
    let mut record = StatusRecord {
        deps: Some(Deps::new().with(1)),
        is_fetching: true,
        is_loading: true,
        ..StatusRecord::default()
    };
    let patch = StatusPatch {
        is_fetching: Some(false),
        ..StatusPatch::default()
    };
    patch.apply_to(&mut record);
    assert!(!record.is_fetching);
    // the absent fields stay as they were
    assert!(record.is_loading);
    assert_eq!(record.deps, Some(Deps::new().with(1)));
}

#[test]
fn merge_can_clear_error() {
    let mut record = StatusRecord {
        is_error: true,
        error: Some(FetchError::msg("boom")),
        ..StatusRecord::default()
    };
    let patch = StatusPatch {
        is_error: Some(false),
        error: Some(None),
        ..StatusPatch::default()
    };
    patch.apply_to(&mut record);
    assert!(!record.is_error);
    assert_eq!(record.error, None);
}

#[test]
fn merge_overwrites_deps_when_present() {
    let mut record = StatusRecord {
        deps: Some(Deps::new().with(1)),
        ..StatusRecord::default()
    };
    let patch = StatusPatch {
        deps: Some(Deps::new().with(2)),
        ..StatusPatch::default()
    };
    patch.apply_to(&mut record);
    assert_eq!(record.deps, Some(Deps::new().with(2)));
}

#[test]
fn empty_patch_is_identity() {
    let mut record = StatusRecord {
        deps: Some(Deps::new().with(3)),
        is_loaded: true,
        is_success: true,
        ..StatusRecord::default()
    };
    let before = record.clone();
    StatusPatch::default().apply_to(&mut record);
    assert_eq!(record, before);
}

#[test]
fn record_serializes() {
    let record = StatusRecord {
        is_loaded: true,
        is_success: true,
        error: Some(FetchError::msg("late")),
        ..StatusRecord::default()
    };
    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["is_loaded"], true);
    assert_eq!(json["is_fetching"], false);
    assert_eq!(json["error"], "late");
    assert_eq!(json["deps"], serde_json::Value::Null);
}
