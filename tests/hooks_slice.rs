use std::{cell::RefCell, rc::Rc};

use assert_call::{call, CallRecorder};
use futures::executor::{block_on, LocalPool};
use slicekit::{AsyncCase, Deps, Hooks, PhaseCallbacks, Slice, SliceError, Store};

#[derive(Clone, Debug, PartialEq, Default)]
struct Todos {
    items: Vec<String>,
}

fn todos_slice() -> Slice<Todos> {
    Slice::builder("todos")
        .initial_data(Todos::default())
        .case("add", |d: &mut Todos, item: String| d.items.push(item))
        .case("clear", |d: &mut Todos, _: ()| d.items.clear())
        .thunk_case(
            "import",
            AsyncCase::new(|d: &mut Todos, items: Vec<String>| d.items.extend(items)),
            |query: Option<usize>| async move {
                let n = query.unwrap_or(1);
                Ok((0..n).map(|i| format!("imported-{i}")).collect())
            },
        )
        .selector("count", |d: &Todos| d.items.len())
        .selector("items", |d: &Todos| d.items.clone())
        .build()
        .unwrap()
}

fn todos_hooks() -> Hooks<Todos> {
    let store = Store::new(&todos_slice());
    Hooks::new(&store, LocalPool::new().spawner())
}

#[test]
fn action_hook_dispatches_into_the_store() {
    let hooks = todos_hooks();
    let add = hooks.use_action::<String>("add").unwrap();

    add.call("milk".to_string());
    add.call("eggs".to_string());
    assert_eq!(
        hooks.store().read(|s| s.data().items.clone()),
        vec!["milk", "eggs"]
    );
}

#[test]
fn selector_hook_caches_per_data_identity() {
    let hooks = todos_hooks();
    let add = hooks.use_action::<String>("add").unwrap();
    let count = hooks.use_selector::<usize>("count").unwrap();

    let a = count.get();
    let b = count.get();
    assert!(Rc::ptr_eq(&a, &b));
    assert_eq!(*a, 0);

    add.call("milk".to_string());
    assert_eq!(*count.get(), 1);
}

#[test]
fn selector_map_memoizes_per_value_and_deps() {
    let mut cr = CallRecorder::new();
    let hooks = todos_hooks();
    let add = hooks.use_action::<String>("add").unwrap();
    let items = hooks.use_selector::<Vec<String>>("items").unwrap();
    add.call("Milk".to_string());

    let upper = |items: &Vec<String>| {
        call!("map");
        items.iter().map(|s| s.to_uppercase()).collect::<Vec<_>>()
    };
    let a = items.map(upper, Deps::new().with(1));
    let b = items.map(upper, Deps::new().with(1));
    cr.verify("map");
    assert!(Rc::ptr_eq(&a, &b));
    assert_eq!(*a, vec!["MILK".to_string()]);

    items.map(upper, Deps::new().with(2));
    cr.verify("map");

    add.call("Eggs".to_string());
    let c = items.map(upper, Deps::new().with(2));
    cr.verify("map");
    assert_eq!(*c, vec!["MILK".to_string(), "EGGS".to_string()]);
}

#[test]
fn thunk_hook_defaults_apply_when_call_site_passes_none() {
    let hooks = todos_hooks();
    let import = hooks
        .use_thunk::<usize, Vec<String>>("import")
        .unwrap()
        .with_query(2);

    block_on(import.call(None, None)).unwrap();
    assert_eq!(
        hooks.store().read(|s| s.data().items.clone()),
        vec!["imported-0", "imported-1"]
    );
}

#[test]
fn call_site_query_wins_over_the_default() {
    let hooks = todos_hooks();
    let import = hooks
        .use_thunk::<usize, Vec<String>>("import")
        .unwrap()
        .with_query(2);

    block_on(import.call(Some(1), None)).unwrap();
    assert_eq!(hooks.store().read(|s| s.data().items.len()), 1);
}

#[test]
fn call_site_callbacks_replace_the_defaults() {
    let mut cr = CallRecorder::new();
    let hooks = todos_hooks();
    let import = hooks
        .use_thunk::<usize, Vec<String>>("import")
        .unwrap()
        .with_callbacks(PhaseCallbacks::fulfilled(|_, _| call!("default")));

    block_on(import.call(None, None)).unwrap();
    cr.verify("default");

    block_on(import.call(
        None,
        Some(PhaseCallbacks::fulfilled(|_, _| call!("call-site"))),
    ))
    .unwrap();
    cr.verify("call-site");
}

#[test]
fn unknown_names_are_reported() {
    let hooks = todos_hooks();
    assert!(matches!(
        hooks.use_action::<String>("missing"),
        Err(SliceError::UnknownOperation(_))
    ));
    assert!(matches!(
        hooks.use_selector::<usize>("missing"),
        Err(SliceError::UnknownSelector(_))
    ));
    assert!(matches!(
        hooks.use_action::<u32>("add"),
        Err(SliceError::TypeMismatch(_))
    ));
    assert!(matches!(
        hooks.use_status("missing"),
        Err(SliceError::UnknownResource(_))
    ));
}

#[test]
fn stores_bound_to_the_same_slice_stay_independent() {
    let slice = todos_slice();
    let a = Hooks::new(&Store::new(&slice), LocalPool::new().spawner());
    let b = Hooks::new(&Store::new(&slice), LocalPool::new().spawner());

    a.use_action::<String>("add").unwrap().call("milk".to_string());
    assert_eq!(a.store().read(|s| s.data().items.len()), 1);
    assert_eq!(b.store().read(|s| s.data().items.len()), 0);
}

#[test]
fn subscription_follows_hook_dispatches() {
    let hooks = todos_hooks();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sub = hooks.store().subscribe({
        let seen = seen.clone();
        move |state| seen.borrow_mut().push(state.data().items.len())
    });

    let add = hooks.use_action::<String>("add").unwrap();
    add.call("milk".to_string());
    add.call("eggs".to_string());
    drop(sub);
    add.call("jam".to_string());
    assert_eq!(*seen.borrow(), vec![1, 2]);
}
