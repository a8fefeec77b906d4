use std::{cell::RefCell, rc::Rc};

use assert_call::{call, CallRecorder};

use super::*;
use crate::{action::ActionType, slice::Slice};

#[derive(Clone, Debug, PartialEq)]
struct Counter {
    value: i32,
}

fn counter_slice() -> Slice<Counter> {
    Slice::builder("counter")
        .initial_data(Counter { value: 0 })
        .case("increment", |d: &mut Counter, _: ()| d.value += 1)
        .case("add", |d: &mut Counter, n: i32| d.value += n)
        .build()
        .unwrap()
}

#[test]
fn dispatch_applies_case() {
    let slice = counter_slice();
    let store = Store::new(&slice);
    let increment = slice.action::<()>("increment").unwrap();

    store.dispatch(increment.create(()));
    store.dispatch(increment.create(()));
    assert_eq!(store.read(|s| s.data().value), 2);
    assert_eq!(store.epoch(), 2);
}

#[test]
fn unknown_action_is_no_op() {
    let slice = counter_slice();
    let store = Store::new(&slice);
    let mut cr = CallRecorder::new();
    let before = store.snapshot();
    let _s = store.subscribe(|_| call!("notify"));

    store.dispatch(Action::new(ActionType::new("counter", "missing"), None));
    assert!(Rc::ptr_eq(before.data(), store.snapshot().data()));
    assert_eq!(store.epoch(), 0);
    cr.verify(());
}

#[test]
fn subscriber_sees_each_effective_dispatch() {
    let slice = counter_slice();
    let store = Store::new(&slice);
    let add = slice.action::<i32>("add").unwrap();

    let seen = Rc::new(RefCell::new(Vec::new()));
    let s = store.subscribe({
        let seen = seen.clone();
        move |state| seen.borrow_mut().push(state.data().value)
    });
    store.dispatch(add.create(3));
    store.dispatch(add.create(4));
    drop(s);
    store.dispatch(add.create(5));
    assert_eq!(*seen.borrow(), vec![3, 7]);
}

#[test]
fn stores_are_independent() {
    let slice = counter_slice();
    let a = Store::new(&slice);
    let b = Store::new(&slice);
    let increment = slice.action::<()>("increment").unwrap();

    a.dispatch(increment.create(()));
    assert_eq!(a.read(|s| s.data().value), 1);
    assert_eq!(b.read(|s| s.data().value), 0);
}

#[test]
fn dispatcher_forwards_to_store() {
    let slice = counter_slice();
    let store = Store::new(&slice);
    let d = store.dispatcher();

    d.dispatch(slice.action::<()>("increment").unwrap().create(()));
    assert_eq!(store.read(|s| s.data().value), 1);
}

#[test]
fn dispatcher_survives_store_drop() {
    let slice = counter_slice();
    let store = Store::new(&slice);
    let d = store.dispatcher();
    drop(store);

    // discarded, not a panic
    d.dispatch(slice.action::<()>("increment").unwrap().create(()));
}

#[test]
fn snapshot_is_isolated_from_later_dispatches() {
    let slice = counter_slice();
    let store = Store::new(&slice);
    let increment = slice.action::<()>("increment").unwrap();

    store.dispatch(increment.create(()));
    let snapshot = store.snapshot();
    store.dispatch(increment.create(()));
    assert_eq!(snapshot.data().value, 1);
    assert_eq!(store.read(|s| s.data().value), 2);
}
