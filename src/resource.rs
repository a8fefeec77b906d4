use std::{any::Any, cell::RefCell, fmt, rc::Rc};

use derive_ex::derive_ex;
use futures::future::FutureExt;
use futures::task::{LocalSpawn, LocalSpawnExt};
use tracing::warn;

use crate::{
    action::ActionCreator,
    error::FetchError,
    selector::Selector,
    status::{Deps, StatusPatch, StatusRecord},
    store::{Dispatcher, Store},
    thunk::{PhaseCallbacks, ThunkAction, ThunkFuture},
};

/// A fetchable resource: a selector over the slice data coupled to the thunk
/// that loads it, sharing one status record keyed by the thunk operation.
///
/// Reading a resource evaluates the status machine: an `Idle` or
/// deps-changed record triggers the fetch, an in-flight one coalesces into
/// it. All transitions flow through the slice's internal status-merge case,
/// so they are ordinary dispatches.
#[derive_ex(Clone, bound())]
pub struct ResourceHandle<Data: 'static, Q: 'static, R: 'static, S: 'static>(
    Rc<ResourceShared<Data, Q, R, S>>,
);

struct ResourceShared<Data: 'static, Q: 'static, R: 'static, S: 'static> {
    store: Store<Data>,
    dispatcher: Dispatcher,
    spawner: Rc<dyn LocalSpawn>,
    selector: Selector<Data, S>,
    thunk: ThunkAction<Q, R>,
    op: Rc<str>,
    status_creator: ActionCreator<(Rc<str>, StatusPatch)>,
    data_memo: RefCell<Option<DataMemo<S>>>,
}

struct DataMemo<S> {
    input: Rc<S>,
    deps: Deps,
    output: Rc<dyn Any>,
}

/// Why a suspense read did not produce a value.
pub enum Suspended<R> {
    /// The fetch is in flight; drive the future to settle it.
    Pending(ThunkFuture<R>),
    /// The last fetch rejected (error-suspense mode only).
    Failed(FetchError),
}

impl<R> fmt::Debug for Suspended<R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Suspended::Pending(_) => f.write_str("Suspended::Pending"),
            Suspended::Failed(e) => f.debug_tuple("Suspended::Failed").field(e).finish(),
        }
    }
}

impl<Data, Q, R, S> ResourceHandle<Data, Q, R, S>
where
    Data: Clone + 'static,
    Q: Clone + 'static,
    R: Clone + 'static,
    S: 'static,
{
    pub(crate) fn new(
        store: Store<Data>,
        spawner: Rc<dyn LocalSpawn>,
        selector: Selector<Data, S>,
        thunk: ThunkAction<Q, R>,
    ) -> Self {
        let dispatcher = store.dispatcher();
        let op: Rc<str> = thunk.op().into();
        let status_creator = store.slice().status_creator().clone();
        ResourceHandle(Rc::new(ResourceShared {
            store,
            dispatcher,
            spawner,
            selector,
            thunk,
            op,
            status_creator,
            data_memo: RefCell::new(None),
        }))
    }

    /// Evaluates the resource: triggers the fetch when the machine calls for
    /// one (spawned on the injected spawner), then returns the current data
    /// and status.
    pub fn read(&self, query: Option<Q>, deps: Option<Deps>) -> ResourceResult<Data, Q, R, S> {
        if let Some(fut) = self.maybe_fetch(&query, &deps) {
            if let Err(e) = self.0.spawner.spawn_local(fut.map(|_| ())) {
                warn!(op = %self.0.op, error = ?e, "failed to spawn fetch");
            }
        }
        self.result(query, deps)
    }

    /// Like [`read`](Self::read), but an in-flight fetch is surfaced as
    /// [`Suspended::Pending`] for the host to drive instead of returning a
    /// placeholder.
    pub fn suspense(
        &self,
        query: Option<Q>,
        deps: Option<Deps>,
    ) -> Result<ResourceResult<Data, Q, R, S>, Suspended<R>> {
        if let Some(fut) = self.maybe_fetch(&query, &deps) {
            return Err(Suspended::Pending(fut));
        }
        Ok(self.result(query, deps))
    }

    /// Like [`suspense`](Self::suspense), but a record in the error state is
    /// surfaced as [`Suspended::Failed`] instead of error flags.
    pub fn suspense_or_error(
        &self,
        query: Option<Q>,
        deps: Option<Deps>,
    ) -> Result<ResourceResult<Data, Q, R, S>, Suspended<R>> {
        if let Some(fut) = self.maybe_fetch(&query, &deps) {
            return Err(Suspended::Pending(fut));
        }
        let result = self.result(query, deps);
        if result.status.is_error {
            if let Some(error) = result.status.error.clone() {
                return Err(Suspended::Failed(error));
            }
        }
        Ok(result)
    }

    /// The current status record. Never triggers a fetch.
    pub fn status(&self) -> StatusRecord {
        self.current_status()
    }

    /// Re-runs the fetch unconditionally, bypassing the dependency check.
    ///
    /// The pending status patch is dispatched before this method returns; the
    /// query and settle patches run as the returned future is driven.
    pub fn refetch(&self, query: Option<Q>, deps: Option<Deps>) -> ThunkFuture<R> {
        let status = self.current_status();
        let first_load = !status.is_loaded;
        let op = self.0.op.clone();
        let creator = self.0.status_creator.clone();

        let mut callbacks = PhaseCallbacks::new();
        {
            let op = op.clone();
            let creator = creator.clone();
            callbacks = callbacks.on_pending(move |d| {
                let mut patch = StatusPatch {
                    is_fetching: Some(true),
                    ..StatusPatch::default()
                };
                if first_load {
                    patch.is_loading = Some(true);
                }
                d.dispatch(creator.create((op.clone(), patch)));
            });
        }
        {
            let op = op.clone();
            let creator = creator.clone();
            let deps = deps.clone();
            callbacks = callbacks.on_fulfilled(move |d, _result: &R| {
                let mut patch = StatusPatch {
                    is_fetching: Some(false),
                    is_success: Some(true),
                    is_error: Some(false),
                    error: Some(None),
                    ..StatusPatch::default()
                };
                if first_load {
                    patch.is_loading = Some(false);
                    patch.is_loaded = Some(true);
                }
                if let Some(deps) = &deps {
                    patch.deps = Some(deps.clone());
                }
                d.dispatch(creator.create((op.clone(), patch)));
            });
        }
        {
            let deps = deps.clone();
            callbacks = callbacks.on_rejected(move |d, error| {
                let mut patch = StatusPatch {
                    is_fetching: Some(false),
                    is_success: Some(false),
                    is_error: Some(true),
                    error: Some(Some(error.clone())),
                    ..StatusPatch::default()
                };
                // `is_loaded` is preserved once true: a prior successful
                // load's data remains valid through a failed refetch.
                if first_load {
                    patch.is_loading = Some(false);
                }
                if let Some(deps) = &deps {
                    patch.deps = Some(deps.clone());
                }
                d.dispatch(creator.create((op.clone(), patch)));
            });
        }
        self.0.thunk.call(query, callbacks, &self.0.dispatcher)
    }

    /// Starts the fetch if the machine calls for one. The pending dispatch
    /// inside [`refetch`](Self::refetch) sets `is_fetching` before this
    /// returns, so overlapping evaluations coalesce instead of double-fetching.
    fn maybe_fetch(&self, query: &Option<Q>, deps: &Option<Deps>) -> Option<ThunkFuture<R>> {
        let status = self.current_status();
        if !should_fetch(&status, deps.as_ref()) {
            return None;
        }
        Some(self.refetch(query.clone(), deps.clone()))
    }

    fn result(&self, query: Option<Q>, deps: Option<Deps>) -> ResourceResult<Data, Q, R, S> {
        let (data, status) = self.0.store.read(|state| {
            (
                self.0.selector.select(state),
                state.status(&self.0.op).cloned().unwrap_or_default(),
            )
        });
        ResourceResult {
            handle: self.clone(),
            query,
            deps,
            data,
            status,
        }
    }

    fn current_status(&self) -> StatusRecord {
        self.0
            .store
            .read(|state| state.status(&self.0.op).cloned().unwrap_or_default())
    }

    fn memoized_data<T: 'static>(
        &self,
        data: &Rc<S>,
        transform: impl Fn(&S) -> T,
        deps: Deps,
    ) -> Rc<T> {
        let mut memo = self.0.data_memo.borrow_mut();
        if let Some(m) = &*memo {
            if Rc::ptr_eq(&m.input, data) && m.deps.shallow_eq(&deps) {
                if let Ok(output) = m.output.clone().downcast::<T>() {
                    return output;
                }
            }
        }
        let output = Rc::new(transform(data));
        *memo = Some(DataMemo {
            input: data.clone(),
            deps,
            output: output.clone(),
        });
        output
    }
}

fn should_fetch(status: &StatusRecord, deps: Option<&Deps>) -> bool {
    if status.is_fetching {
        return false;
    }
    let deps_changed = match (deps, &status.deps) {
        (Some(deps), Some(stored)) => !deps.shallow_eq(stored),
        (Some(_), None) => true,
        (None, _) => false,
    };
    deps_changed || (!status.is_loaded && !status.is_error)
}

/// One evaluation of a resource: the selected data, the status record, and
/// callables bound to the evaluation's query and deps.
pub struct ResourceResult<Data: 'static, Q: 'static, R: 'static, S: 'static> {
    handle: ResourceHandle<Data, Q, R, S>,
    query: Option<Q>,
    deps: Option<Deps>,
    data: Rc<S>,
    status: StatusRecord,
}

impl<Data, Q, R, S> ResourceResult<Data, Q, R, S>
where
    Data: Clone + 'static,
    Q: Clone + 'static,
    R: Clone + 'static,
    S: 'static,
{
    pub fn data(&self) -> &Rc<S> {
        &self.data
    }

    pub fn status(&self) -> &StatusRecord {
        &self.status
    }

    /// Re-runs the fetch with this evaluation's query, ignoring deps.
    pub fn refetch(&self) -> ThunkFuture<R> {
        self.handle.refetch(self.query.clone(), self.deps.clone())
    }

    /// A pure transform of the data, memoized per `(data identity, extra_deps)`.
    pub fn use_data<T: 'static>(&self, transform: impl Fn(&S) -> T, extra_deps: Deps) -> Rc<T> {
        self.handle.memoized_data(&self.data, transform, extra_deps)
    }
}
