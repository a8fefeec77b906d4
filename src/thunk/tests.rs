use assert_call::{call, CallRecorder};
use futures::future::FutureExt;
use rt_local::runtime::core::test;

use super::*;
use crate::{
    error::FetchError,
    slice::{AsyncCase, Slice},
    store::Store,
};

fn plain_thunk<R: Clone + 'static>(result: Result<R, FetchError>) -> ThunkAction<(), R> {
    ThunkAction::new("load".into(), None, move |_| {
        let result = result.clone();
        async move { result }.boxed_local()
    })
}

#[test]
async fn fulfilled_value_reaches_caller() {
    let thunk = plain_thunk(Ok(5));
    let r = thunk
        .call(None, PhaseCallbacks::new(), &Dispatcher::noop())
        .await;
    assert_eq!(r.unwrap(), 5);
}

#[test]
async fn rejection_reaches_caller_unconsumed() {
    let thunk = plain_thunk::<i32>(Err(FetchError::msg("404")));
    let r = thunk
        .call(None, PhaseCallbacks::new(), &Dispatcher::noop())
        .await;
    assert_eq!(r.unwrap_err().message(), "404");
}

#[test]
async fn rejection_reaches_caller_even_when_handled() {
    let mut cr = CallRecorder::new();
    let thunk = plain_thunk::<i32>(Err(FetchError::msg("404")));
    let callbacks = PhaseCallbacks::new().on_rejected(|_, e| call!("rejected {}", e.message()));
    let r = thunk.call(None, callbacks, &Dispatcher::noop()).await;
    assert!(r.is_err());
    cr.verify("rejected 404");
}

#[test]
async fn callbacks_run_in_registration_order() {
    let mut cr = CallRecorder::new();
    let thunk = plain_thunk(Ok(5));
    let callbacks = PhaseCallbacks::new()
        .on_pending(|_| call!("pending"))
        .on_fulfilled(|_, r: &i32| call!("fulfilled-1 {r}"))
        .on_fulfilled(|_, r: &i32| call!("fulfilled-2 {r}"));
    thunk
        .call(None, callbacks, &Dispatcher::noop())
        .await
        .unwrap();
    cr.verify(["pending", "fulfilled-1 5", "fulfilled-2 5"]);
}

#[test]
async fn pending_callbacks_fire_before_the_future_is_driven() {
    let mut cr = CallRecorder::new();
    let thunk = plain_thunk(Ok(5));
    let callbacks = PhaseCallbacks::new().on_pending(|_| call!("pending"));
    let fut = thunk.call(None, callbacks, &Dispatcher::noop());
    cr.verify("pending");
    fut.await.unwrap();
}

#[test]
async fn query_value_is_passed_through() {
    let thunk: ThunkAction<i32, i32> = ThunkAction::new("load".into(), None, |q| {
        async move { Ok(q.unwrap_or(0) * 2) }.boxed_local()
    });
    let r = thunk
        .call(Some(21), PhaseCallbacks::new(), &Dispatcher::noop())
        .await;
    assert_eq!(r.unwrap(), 42);
}

#[derive(Clone, Debug, PartialEq, Default)]
struct Data {
    value: i32,
}

#[test]
async fn registered_actions_run_before_caller_callbacks() {
    let slice = Slice::builder("s")
        .initial_data(Data::default())
        .thunk_case(
            "load",
            AsyncCase::new(|d: &mut Data, v: i32| d.value = v),
            |_: Option<()>| async { Ok(7) },
        )
        .build()
        .unwrap();
    let store = Store::new(&slice);
    let thunk = slice.thunk_action::<(), i32>("load").unwrap();

    // the case handler has already applied the result when the caller's
    // fulfilled callback observes the store
    let observer = store.clone();
    let callbacks =
        PhaseCallbacks::fulfilled(move |_, _| assert_eq!(observer.read(|s| s.data().value), 7));
    thunk
        .call(None, callbacks, &store.dispatcher())
        .await
        .unwrap();
    assert_eq!(store.read(|s| s.data().value), 7);
}
