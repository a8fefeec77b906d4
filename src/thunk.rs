use std::rc::Rc;

use derive_ex::derive_ex;
use futures::future::{FutureExt, LocalBoxFuture};
use tracing::debug;

use crate::{
    action::{AsyncActionTags, FetchPhase},
    error::FetchError,
    store::Dispatcher,
};

#[cfg(test)]
mod tests;

pub type ThunkFuture<R> = LocalBoxFuture<'static, Result<R, FetchError>>;

type QueryFn<Q, R> = Box<dyn Fn(Option<Q>) -> ThunkFuture<R>>;

/// Side effects to run around one thunk call.
///
/// Multiple callbacks registered for the same phase run sequentially,
/// first-registered first. Framework actions bound to the operation run
/// before caller-supplied callbacks.
pub struct PhaseCallbacks<R> {
    pending: Vec<Rc<dyn Fn(&Dispatcher)>>,
    fulfilled: Vec<Rc<dyn Fn(&Dispatcher, &R)>>,
    rejected: Vec<Rc<dyn Fn(&Dispatcher, &FetchError)>>,
}

impl<R> Default for PhaseCallbacks<R> {
    fn default() -> Self {
        PhaseCallbacks {
            pending: Vec::new(),
            fulfilled: Vec::new(),
            rejected: Vec::new(),
        }
    }
}
impl<R> Clone for PhaseCallbacks<R> {
    fn clone(&self) -> Self {
        PhaseCallbacks {
            pending: self.pending.clone(),
            fulfilled: self.fulfilled.clone(),
            rejected: self.rejected.clone(),
        }
    }
}

impl<R> PhaseCallbacks<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for a bare fulfilled callback.
    pub fn fulfilled(f: impl Fn(&Dispatcher, &R) + 'static) -> Self {
        Self::new().on_fulfilled(f)
    }

    pub fn on_pending(mut self, f: impl Fn(&Dispatcher) + 'static) -> Self {
        self.pending.push(Rc::new(f));
        self
    }
    pub fn on_fulfilled(mut self, f: impl Fn(&Dispatcher, &R) + 'static) -> Self {
        self.fulfilled.push(Rc::new(f));
        self
    }
    pub fn on_rejected(mut self, f: impl Fn(&Dispatcher, &FetchError) + 'static) -> Self {
        self.rejected.push(Rc::new(f));
        self
    }

    /// Appends `other`'s callbacks after this set's, per phase.
    pub fn merge(mut self, other: Self) -> Self {
        self.pending.extend(other.pending);
        self.fulfilled.extend(other.fulfilled);
        self.rejected.extend(other.rejected);
        self
    }
}

/// A dispatchable async operation: a query function plus the explicit action
/// triplet it was registered with, if any.
#[derive_ex(Clone, bound())]
pub struct ThunkAction<Q: 'static, R: 'static>(Rc<ThunkActionData<Q, R>>);

struct ThunkActionData<Q: 'static, R: 'static> {
    op: Rc<str>,
    query: QueryFn<Q, R>,
    tags: Option<AsyncActionTags<R>>,
}

impl<Q: 'static, R: Clone + 'static> ThunkAction<Q, R> {
    pub(crate) fn new(
        op: Rc<str>,
        tags: Option<AsyncActionTags<R>>,
        query: impl Fn(Option<Q>) -> ThunkFuture<R> + 'static,
    ) -> Self {
        ThunkAction(Rc::new(ThunkActionData {
            op,
            query: Box::new(query),
            tags,
        }))
    }

    pub fn op(&self) -> &str {
        &self.0.op
    }

    /// Runs the operation: pending callbacks fire synchronously before this
    /// method returns, the query itself and the settle callbacks run when the
    /// returned future is driven. The query is never retried.
    ///
    /// A rejection is returned to the caller either way; when no rejected
    /// callback exists it arrives unconsumed, otherwise the callbacks have
    /// already surfaced it (typically as status flags).
    pub fn call(
        &self,
        query: Option<Q>,
        callbacks: PhaseCallbacks<R>,
        dispatcher: &Dispatcher,
    ) -> ThunkFuture<R> {
        let callbacks = self.action_callbacks().merge(callbacks);
        let op = self.0.op.clone();
        debug!(op = %op, phase = %FetchPhase::Pending, "thunk");
        for f in &callbacks.pending {
            f(dispatcher);
        }
        let fut = (self.0.query)(query);
        let dispatcher = dispatcher.clone();
        async move {
            match fut.await {
                Ok(result) => {
                    debug!(op = %op, phase = %FetchPhase::Fulfilled, "thunk");
                    for f in &callbacks.fulfilled {
                        f(&dispatcher, &result);
                    }
                    Ok(result)
                }
                Err(error) => {
                    debug!(op = %op, phase = %FetchPhase::Rejected, error = %error, "thunk");
                    for f in &callbacks.rejected {
                        f(&dispatcher, &error);
                    }
                    Err(error)
                }
            }
        }
        .boxed_local()
    }

    /// Callbacks dispatching the operation's registered action triplet.
    fn action_callbacks(&self) -> PhaseCallbacks<R> {
        let mut callbacks = PhaseCallbacks::new();
        let Some(tags) = &self.0.tags else {
            return callbacks;
        };
        let pending = tags.pending.clone();
        let fulfilled = tags.fulfilled.clone();
        let rejected = tags.rejected.clone();
        callbacks = callbacks
            .on_pending(move |d| d.dispatch(pending.create(())))
            .on_fulfilled(move |d, result: &R| d.dispatch(fulfilled.create(result.clone())))
            .on_rejected(move |d, error| d.dispatch(rejected.create(error.clone())));
        callbacks
    }
}
