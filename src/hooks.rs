use std::{any::Any, cell::RefCell, rc::Rc};

use derive_ex::derive_ex;
use futures::task::LocalSpawn;

use crate::{
    action::ActionCreator,
    error::SliceError,
    resource::ResourceHandle,
    selector::Selector,
    slice::Slice,
    status::{Deps, StatusRecord},
    store::{Dispatcher, Store},
    thunk::{PhaseCallbacks, ThunkAction, ThunkFuture},
};

/// Binds a built [`Slice`] to a [`Store`] and a local spawner, exposing the
/// slice's operations as per-name callable handles.
///
/// Everything is resolved by name once, when the handle is requested; the
/// handles themselves hold direct references.
#[derive_ex(Clone, bound())]
pub struct Hooks<Data: 'static>(Rc<HooksShared<Data>>);

struct HooksShared<Data: 'static> {
    slice: Slice<Data>,
    store: Store<Data>,
    spawner: Rc<dyn LocalSpawn>,
}

impl<Data: Clone + 'static> Hooks<Data> {
    pub fn new(store: &Store<Data>, spawner: impl LocalSpawn + 'static) -> Self {
        Hooks(Rc::new(HooksShared {
            slice: store.slice().clone(),
            store: store.clone(),
            spawner: Rc::new(spawner),
        }))
    }

    pub fn store(&self) -> &Store<Data> {
        &self.0.store
    }

    /// A dispatching handle for a synchronous case.
    pub fn use_action<P: 'static>(&self, op: &str) -> Result<ActionHook<P>, SliceError> {
        Ok(ActionHook {
            creator: self.0.slice.action::<P>(op)?,
            dispatcher: self.0.store.dispatcher(),
        })
    }

    /// A calling handle for a thunk, with optional hook-level defaults.
    pub fn use_thunk<Q, R>(&self, op: &str) -> Result<ThunkHook<Q, R>, SliceError>
    where
        Q: Clone + 'static,
        R: Clone + 'static,
    {
        Ok(ThunkHook {
            thunk: self.0.slice.thunk_action::<Q, R>(op)?,
            dispatcher: self.0.store.dispatcher(),
            default_query: None,
            default_callbacks: None,
        })
    }

    /// A reading handle for a named selector.
    pub fn use_selector<S: 'static>(&self, name: &str) -> Result<SelectorHook<Data, S>, SliceError> {
        Ok(SelectorHook {
            selector: self.0.slice.selector::<S>(name)?,
            store: self.0.store.clone(),
            memo: RefCell::new(None),
        })
    }

    /// The resource handle: selector + thunk + shared status record.
    pub fn use_resource<Q, R, S>(
        &self,
        name: &str,
    ) -> Result<ResourceHandle<Data, Q, R, S>, SliceError>
    where
        Q: Clone + 'static,
        R: Clone + 'static,
        S: 'static,
    {
        let thunk_op = self.0.slice.resource_thunk(name)?;
        let selector = self.0.slice.selector::<S>(name)?;
        let thunk = self.0.slice.thunk_action::<Q, R>(&thunk_op)?;
        Ok(ResourceHandle::new(
            self.0.store.clone(),
            self.0.spawner.clone(),
            selector,
            thunk,
        ))
    }

    /// The status record of a resource's operation. Never triggers a fetch.
    pub fn use_status(&self, name: &str) -> Result<StatusRecord, SliceError> {
        let thunk_op = self.0.slice.resource_thunk(name)?;
        Ok(self
            .0
            .store
            .read(|state| state.status(&thunk_op).cloned().unwrap_or_default()))
    }
}

/// Dispatches one synchronous case into the bound store.
pub struct ActionHook<P: 'static> {
    creator: ActionCreator<P>,
    dispatcher: Dispatcher,
}

impl<P: 'static> ActionHook<P> {
    pub fn call(&self, payload: P) {
        self.dispatcher.dispatch(self.creator.create(payload));
    }
}

/// Calls one thunk against the bound store.
///
/// Hook-level default query and callbacks apply when the call site passes
/// `None`; a call-site argument always wins.
pub struct ThunkHook<Q: 'static, R: 'static> {
    thunk: ThunkAction<Q, R>,
    dispatcher: Dispatcher,
    default_query: Option<Q>,
    default_callbacks: Option<PhaseCallbacks<R>>,
}

impl<Q: Clone + 'static, R: Clone + 'static> ThunkHook<Q, R> {
    pub fn with_query(mut self, query: Q) -> Self {
        self.default_query = Some(query);
        self
    }
    pub fn with_callbacks(mut self, callbacks: PhaseCallbacks<R>) -> Self {
        self.default_callbacks = Some(callbacks);
        self
    }

    pub fn call(
        &self,
        query: Option<Q>,
        callbacks: Option<PhaseCallbacks<R>>,
    ) -> ThunkFuture<R> {
        let query = query.or_else(|| self.default_query.clone());
        let callbacks = callbacks
            .or_else(|| self.default_callbacks.clone())
            .unwrap_or_default();
        self.thunk.call(query, callbacks, &self.dispatcher)
    }
}

/// Reads one named selector from the bound store.
pub struct SelectorHook<Data: 'static, S: 'static> {
    selector: Selector<Data, S>,
    store: Store<Data>,
    memo: RefCell<Option<TransformMemo<S>>>,
}

struct TransformMemo<S> {
    input: Rc<S>,
    deps: Deps,
    output: Rc<dyn Any>,
}

impl<Data: Clone + 'static, S: 'static> SelectorHook<Data, S> {
    pub fn get(&self) -> Rc<S> {
        self.store.read(|state| self.selector.select(state))
    }

    /// A transformed read, memoized per `(selected value identity, deps)`.
    pub fn map<T: 'static>(&self, transform: impl Fn(&S) -> T, deps: Deps) -> Rc<T> {
        let input = self.get();
        let mut memo = self.memo.borrow_mut();
        if let Some(m) = &*memo {
            if Rc::ptr_eq(&m.input, &input) && m.deps.shallow_eq(&deps) {
                if let Ok(output) = m.output.clone().downcast::<T>() {
                    return output;
                }
            }
        }
        let output = Rc::new(transform(&input));
        *memo = Some(TransformMemo {
            input,
            deps,
            output: output.clone(),
        });
        output
    }
}
