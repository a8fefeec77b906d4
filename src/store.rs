use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use derive_ex::derive_ex;
use slabmap::SlabMap;
use tracing::debug;

use crate::{action::Action, reducer::SliceState, slice::Slice, subscription::Subscription};

#[cfg(test)]
mod tests;

type SubscriberFn<Data> = Rc<dyn Fn(&SliceState<Data>)>;

/// An injectable store handle holding one slice instance.
///
/// Never a process-wide global: any number of independent stores can coexist,
/// each with its own envelope. Cloning the handle shares the instance.
#[derive_ex(Clone, bound())]
pub struct Store<Data: 'static>(Rc<StoreNode<Data>>);

struct StoreNode<Data: 'static> {
    slice: Slice<Data>,
    state: RefCell<SliceState<Data>>,
    epoch: Cell<u64>,
    subscribers: RefCell<SlabMap<SubscriberFn<Data>>>,
}

impl<Data: Clone + 'static> Store<Data> {
    pub fn new(slice: &Slice<Data>) -> Self {
        Store(Rc::new(StoreNode {
            slice: slice.clone(),
            state: RefCell::new(slice.initial_state()),
            epoch: Cell::new(0),
            subscribers: RefCell::new(SlabMap::new()),
        }))
    }

    pub fn slice(&self) -> &Slice<Data> {
        &self.0.slice
    }

    /// Applies the case handler registered for the action's type, then
    /// notifies subscribers. An action with no registered handler is an
    /// identity-preserving no-op: the envelope is untouched, the epoch does
    /// not advance and no subscriber runs.
    ///
    /// Dispatches are synchronous and atomic; a dispatch issued from inside a
    /// subscriber runs after the current state borrow is released.
    pub fn dispatch(&self, action: Action) {
        debug!(ty = %action.ty(), "dispatch");
        let handled = {
            let mut state = self.0.state.borrow_mut();
            self.0.slice.apply(&mut state, action)
        };
        if handled {
            self.0.epoch.set(self.0.epoch.get() + 1);
            self.notify();
        }
    }

    /// Runs `f` against the current envelope.
    pub fn read<T>(&self, f: impl FnOnce(&SliceState<Data>) -> T) -> T {
        f(&self.0.state.borrow())
    }

    /// A cheap copy of the envelope: the data `Rc` plus the status map.
    pub fn snapshot(&self) -> SliceState<Data> {
        self.0.state.borrow().clone()
    }

    /// Count of effective dispatches since construction.
    pub fn epoch(&self) -> u64 {
        self.0.epoch.get()
    }

    /// Calls `f` with a snapshot after every effective dispatch, until the
    /// returned [`Subscription`] is dropped.
    pub fn subscribe(&self, f: impl Fn(&SliceState<Data>) + 'static) -> Subscription {
        let key = self.0.subscribers.borrow_mut().insert(Rc::new(f));
        let node = Rc::downgrade(&self.0);
        Subscription::from_fn(move || {
            if let Some(node) = node.upgrade() {
                node.subscribers.borrow_mut().remove(key);
            }
        })
    }

    /// A dispatch-only handle, untyped in `Data`, for wiring into thunk
    /// callbacks. Holds the store weakly: a fetch completing after the store
    /// is gone drops its patch instead of keeping the store alive.
    pub fn dispatcher(&self) -> Dispatcher {
        let node = Rc::downgrade(&self.0);
        Dispatcher(Rc::new(move |action| {
            if let Some(node) = node.upgrade() {
                Store(node).dispatch(action);
            } else {
                debug!(ty = %action.ty(), "store dropped; action discarded");
            }
        }))
    }

    fn notify(&self) {
        let snapshot = self.snapshot();
        let subscribers: Vec<SubscriberFn<Data>> =
            self.0.subscribers.borrow().values().cloned().collect();
        for f in subscribers {
            f(&snapshot);
        }
    }
}

/// Dispatches actions into the store it was created from.
#[derive(Clone)]
pub struct Dispatcher(Rc<dyn Fn(Action)>);

impl Dispatcher {
    pub fn dispatch(&self, action: Action) {
        (self.0)(action)
    }

    /// A dispatcher that drops everything, for detached callbacks.
    pub fn noop() -> Self {
        Dispatcher(Rc::new(|_| {}))
    }
}
