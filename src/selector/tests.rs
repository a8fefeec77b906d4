use std::rc::Rc;

use assert_call::{call, CallRecorder};

use super::*;

#[derive(Clone, Debug, PartialEq)]
struct Data {
    names: Vec<String>,
}

fn state(names: &[&str]) -> SliceState<Data> {
    SliceState::new(Data {
        names: names.iter().map(|s| s.to_string()).collect(),
    })
}

#[test]
fn repeated_select_hits_cache() {
    let mut cr = CallRecorder::new();
    let selector = Selector::new("count", |d: &Data| {
        call!("compute");
        d.names.len()
    });
    let state = state(&["a", "b"]);

    let first = selector.select(&state);
    let second = selector.select(&state);
    cr.verify("compute");
    assert!(Rc::ptr_eq(&first, &second));
    assert_eq!(*first, 2);
}

#[test]
fn data_change_recomputes() {
    let mut cr = CallRecorder::new();
    let selector = Selector::new("count", |d: &Data| {
        call!("compute");
        d.names.len()
    });
    let state = state(&["a"]);
    assert_eq!(*selector.select(&state), 1);

    // a dispatch clones the data because the cache pins the old Rc
    let mut next = state.clone();
    Rc::make_mut(&mut next.data).names.push("b".to_string());
    assert!(!Rc::ptr_eq(&state.data, &next.data));

    assert_eq!(*selector.select(&next), 2);
    cr.verify(["compute", "compute"]);
}

#[test]
fn no_stale_result_after_change() {
    let selector = Selector::new("first", |d: &Data| d.names.first().cloned());
    let state = state(&["old"]);
    assert_eq!(*selector.select(&state), Some("old".to_string()));

    let mut next = state.clone();
    Rc::make_mut(&mut next.data).names[0] = "new".to_string();
    assert_eq!(*selector.select(&next), Some("new".to_string()));
}
