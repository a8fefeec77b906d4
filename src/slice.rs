use std::{
    any::Any,
    collections::{HashMap, HashSet},
    future::Future,
    rc::Rc,
};

use derive_ex::derive_ex;
use futures::future::FutureExt;
use tracing::warn;

use crate::{
    action::{Action, ActionCreator, ActionType, AsyncActionTags, FetchPhase, Prepared},
    error::{FetchError, SliceError},
    reducer::{draft_handler, replacing_handler, unit_handler, CaseTable, SliceState},
    selector::Selector,
    status::StatusPatch,
    thunk::ThunkAction,
};


/// Operation name of the internal status-merge case. Reserved.
pub const SET_RESOURCE_STATUS: &str = "_setResourceStatus";
/// Selector name of the internal status view. Reserved.
pub const GET_RESOURCE_STATUS: &str = "_getResourceStatus";

enum InitialData<Data> {
    Value(Data),
    Factory(Box<dyn Fn() -> Data>),
}

/// The update functions of one async operation. `fulfilled` is required;
/// `pending` and `rejected` are optional.
pub struct AsyncCase<Data, R> {
    pending: Option<Box<dyn Fn(&mut Data)>>,
    fulfilled: Box<dyn Fn(&mut Data, R)>,
    rejected: Option<Box<dyn Fn(&mut Data, FetchError)>>,
}

impl<Data, R> AsyncCase<Data, R> {
    pub fn new(fulfilled: impl Fn(&mut Data, R) + 'static) -> Self {
        AsyncCase {
            pending: None,
            fulfilled: Box::new(fulfilled),
            rejected: None,
        }
    }
    pub fn pending(mut self, f: impl Fn(&mut Data) + 'static) -> Self {
        self.pending = Some(Box::new(f));
        self
    }
    pub fn rejected(mut self, f: impl Fn(&mut Data, FetchError) + 'static) -> Self {
        self.rejected = Some(Box::new(f));
        self
    }
}

/// Declares a slice: name, initial data, cases, thunks, selectors, resources.
///
/// Registration never fails mid-chain; configuration errors are collected and
/// the first one is reported by [`build`](Self::build).
pub struct SliceBuilder<Data: 'static> {
    name: String,
    initial: Option<InitialData<Data>>,
    cases: CaseTable<Data>,
    actions: HashMap<String, Box<dyn Any>>,
    thunks: HashMap<String, Box<dyn Any>>,
    selectors: HashMap<String, Box<dyn Any>>,
    resources: HashMap<String, Rc<str>>,
    ops: HashSet<String>,
    async_ops: HashSet<String>,
    errors: Vec<SliceError>,
}

impl<Data: Clone + 'static> SliceBuilder<Data> {
    fn new(name: String) -> Self {
        SliceBuilder {
            name,
            initial: None,
            cases: CaseTable::new(),
            actions: HashMap::new(),
            thunks: HashMap::new(),
            selectors: HashMap::new(),
            resources: HashMap::new(),
            ops: HashSet::new(),
            async_ops: HashSet::new(),
            errors: Vec::new(),
        }
    }

    pub fn initial_data(mut self, data: Data) -> Self {
        self.initial = Some(InitialData::Value(data));
        self
    }

    pub fn initial_data_with(mut self, f: impl Fn() -> Data + 'static) -> Self {
        self.initial = Some(InitialData::Factory(Box::new(f)));
        self
    }

    /// Registers a synchronous case. The update function mutates a
    /// copy-on-write draft of the data value.
    pub fn case<P: 'static>(mut self, op: &str, f: impl Fn(&mut Data, P) + 'static) -> Self {
        if self.claim_op(op) {
            let ty = ActionType::new(&self.name, op);
            self.cases.insert(ty.clone(), draft_handler(f));
            self.actions
                .insert(op.to_string(), Box::new(ActionCreator::<P>::new(ty)));
        }
        self
    }

    /// Registers a synchronous case whose update function returns the
    /// replacement data value instead of mutating the draft.
    pub fn case_replacing<P: 'static>(
        mut self,
        op: &str,
        f: impl Fn(&mut Data, P) -> Data + 'static,
    ) -> Self {
        if self.claim_op(op) {
            let ty = ActionType::new(&self.name, op);
            self.cases.insert(ty.clone(), replacing_handler(f));
            self.actions
                .insert(op.to_string(), Box::new(ActionCreator::<P>::new(ty)));
        }
        self
    }

    /// Registers a synchronous case with a payload-preparation function.
    pub fn case_prepared<P: 'static>(
        mut self,
        op: &str,
        prepare: impl Fn(P) -> Prepared<P> + 'static,
        f: impl Fn(&mut Data, P) + 'static,
    ) -> Self {
        if self.claim_op(op) {
            let ty = ActionType::new(&self.name, op);
            self.cases.insert(ty.clone(), draft_handler(f));
            self.actions.insert(
                op.to_string(),
                Box::new(ActionCreator::<P>::with_prepare(ty, prepare)),
            );
        }
        self
    }

    /// Registers an async case triplet without a thunk. The three phase
    /// actions can still be dispatched by hand or through callbacks.
    pub fn async_case<R: Clone + 'static>(mut self, op: &str, case: AsyncCase<Data, R>) -> Self {
        if self.claim_op(op) {
            self.insert_async_case(op, case);
            self.async_ops.insert(op.to_string());
        }
        self
    }

    /// Registers a thunk with no reducer wiring; phase effects come only
    /// from caller-supplied callbacks.
    pub fn thunk<Q, R, Fut>(
        mut self,
        op: &str,
        query: impl Fn(Option<Q>) -> Fut + 'static,
    ) -> Self
    where
        Q: 'static,
        R: Clone + 'static,
        Fut: Future<Output = Result<R, FetchError>> + 'static,
    {
        if self.async_ops.contains(op) {
            // An async case exists; binding it by name alone is the silent-miss
            // class of bug this builder refuses. Use `thunk_case`.
            self.errors.push(SliceError::UnboundThunk(op.to_string()));
            return self;
        }
        if self.claim_op(op) {
            let action =
                ThunkAction::<Q, R>::new(op.into(), None, move |q| query(q).boxed_local());
            self.thunks.insert(op.to_string(), Box::new(action));
        }
        self
    }

    /// Registers an async operation in full: the case triplet and the thunk
    /// that drives it, tied together here rather than matched up by name.
    pub fn thunk_case<Q, R, Fut>(
        mut self,
        op: &str,
        case: AsyncCase<Data, R>,
        query: impl Fn(Option<Q>) -> Fut + 'static,
    ) -> Self
    where
        Q: 'static,
        R: Clone + 'static,
        Fut: Future<Output = Result<R, FetchError>> + 'static,
    {
        if self.claim_op(op) {
            let tags = self.insert_async_case(op, case);
            let action =
                ThunkAction::<Q, R>::new(op.into(), Some(tags), move |q| query(q).boxed_local());
            self.thunks.insert(op.to_string(), Box::new(action));
        }
        self
    }

    /// Registers a named derivation of the data value.
    pub fn selector<S: 'static>(mut self, name: &str, f: impl Fn(&Data) -> S + 'static) -> Self {
        if name == SET_RESOURCE_STATUS || name == GET_RESOURCE_STATUS {
            self.errors.push(SliceError::ReservedName(name.to_string()));
        } else if self.selectors.contains_key(name) {
            self.errors
                .push(SliceError::DuplicateSelector(name.to_string()));
        } else {
            self.selectors
                .insert(name.to_string(), Box::new(Selector::new(name, f)));
        }
        self
    }

    /// Associates a resource name with the thunk operation that loads it.
    /// The resource reads through the selector of the same name.
    pub fn resource(mut self, name: &str, thunk_op: &str) -> Self {
        self.resources.insert(name.to_string(), thunk_op.into());
        self
    }

    pub fn build(mut self) -> Result<Slice<Data>, SliceError> {
        if !self.errors.is_empty() {
            return Err(self.errors.remove(0));
        }
        if self.name.is_empty() {
            return Err(SliceError::EmptyName);
        }
        let Some(initial) = self.initial else {
            return Err(SliceError::MissingInitialData);
        };
        for (resource, thunk_op) in &self.resources {
            if !self.selectors.contains_key(resource) {
                return Err(SliceError::UnknownResourceSelector(resource.clone()));
            }
            if !self.thunks.contains_key(&**thunk_op) {
                return Err(SliceError::UnknownThunk {
                    resource: resource.clone(),
                    thunk: thunk_op.to_string(),
                });
            }
        }

        let status_ty = ActionType::new(&self.name, SET_RESOURCE_STATUS);
        let status_creator = ActionCreator::<(Rc<str>, StatusPatch)>::new(status_ty.clone());
        self.cases.insert(
            status_ty,
            Box::new(|state: &mut SliceState<Data>, action: Action| {
                let ty = action.ty().clone();
                let Some((op, patch)) = action.into_payload::<(Rc<str>, StatusPatch)>() else {
                    warn!(ty = %ty, "payload type mismatch; action ignored");
                    return;
                };
                patch.apply_to(state.status.entry(op).or_default());
            }),
        );

        Ok(Slice(Rc::new(SliceShared {
            name: self.name.into(),
            initial,
            cases: self.cases,
            actions: self.actions,
            thunks: self.thunks,
            selectors: self.selectors,
            resources: self.resources,
            status_creator,
        })))
    }

    fn claim_op(&mut self, op: &str) -> bool {
        if op == SET_RESOURCE_STATUS || op == GET_RESOURCE_STATUS {
            self.errors.push(SliceError::ReservedName(op.to_string()));
            false
        } else if !self.ops.insert(op.to_string()) {
            self.errors
                .push(SliceError::DuplicateOperation(op.to_string()));
            false
        } else {
            true
        }
    }

    fn insert_async_case<R: Clone + 'static>(
        &mut self,
        op: &str,
        case: AsyncCase<Data, R>,
    ) -> AsyncActionTags<R> {
        let tags = AsyncActionTags::<R>::new(&self.name, op);
        if let Some(pending) = case.pending {
            self.cases
                .insert(tags.pending.ty().clone(), unit_handler(pending));
        }
        self.cases
            .insert(tags.fulfilled.ty().clone(), draft_handler(case.fulfilled));
        if let Some(rejected) = case.rejected {
            self.cases
                .insert(tags.rejected.ty().clone(), draft_handler(rejected));
        }
        self.actions.insert(
            format!("{op}{}", FetchPhase::Pending),
            Box::new(tags.pending.clone()),
        );
        self.actions.insert(
            format!("{op}{}", FetchPhase::Fulfilled),
            Box::new(tags.fulfilled.clone()),
        );
        self.actions.insert(
            format!("{op}{}", FetchPhase::Rejected),
            Box::new(tags.rejected.clone()),
        );
        tags
    }
}

/// A built slice: the dispatch table, action creators, thunks, selectors and
/// resource bindings produced from one declaration. Cheap to clone.
#[derive_ex(Clone, bound())]
pub struct Slice<Data: 'static>(Rc<SliceShared<Data>>);

struct SliceShared<Data: 'static> {
    name: Rc<str>,
    initial: InitialData<Data>,
    cases: CaseTable<Data>,
    actions: HashMap<String, Box<dyn Any>>,
    thunks: HashMap<String, Box<dyn Any>>,
    selectors: HashMap<String, Box<dyn Any>>,
    resources: HashMap<String, Rc<str>>,
    status_creator: ActionCreator<(Rc<str>, StatusPatch)>,
}

impl<Data: Clone + 'static> Slice<Data> {
    pub fn builder(name: impl Into<String>) -> SliceBuilder<Data> {
        SliceBuilder::new(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// The action creator of a synchronous case, or one phase of an async
    /// case (`"<op>Pending"` / `"<op>Fulfilled"` / `"<op>Rejected"`).
    pub fn action<P: 'static>(&self, op: &str) -> Result<ActionCreator<P>, SliceError> {
        let creator = self
            .0
            .actions
            .get(op)
            .ok_or_else(|| SliceError::UnknownOperation(op.to_string()))?;
        creator
            .downcast_ref::<ActionCreator<P>>()
            .cloned()
            .ok_or_else(|| SliceError::TypeMismatch(op.to_string()))
    }

    pub fn thunk_action<Q: 'static, R: 'static>(
        &self,
        op: &str,
    ) -> Result<ThunkAction<Q, R>, SliceError> {
        let thunk = self
            .0
            .thunks
            .get(op)
            .ok_or_else(|| SliceError::UnknownOperation(op.to_string()))?;
        thunk
            .downcast_ref::<ThunkAction<Q, R>>()
            .cloned()
            .ok_or_else(|| SliceError::TypeMismatch(op.to_string()))
    }

    pub fn selector<S: 'static>(&self, name: &str) -> Result<Selector<Data, S>, SliceError> {
        let selector = self
            .0
            .selectors
            .get(name)
            .ok_or_else(|| SliceError::UnknownSelector(name.to_string()))?;
        selector
            .downcast_ref::<Selector<Data, S>>()
            .cloned()
            .ok_or_else(|| SliceError::TypeMismatch(name.to_string()))
    }

    pub(crate) fn resource_thunk(&self, name: &str) -> Result<Rc<str>, SliceError> {
        self.0
            .resources
            .get(name)
            .cloned()
            .ok_or_else(|| SliceError::UnknownResource(name.to_string()))
    }

    pub(crate) fn initial_state(&self) -> SliceState<Data> {
        match &self.0.initial {
            InitialData::Value(data) => SliceState::new(data.clone()),
            InitialData::Factory(f) => SliceState::new(f()),
        }
    }

    pub(crate) fn apply(&self, state: &mut SliceState<Data>, action: Action) -> bool {
        self.0.cases.apply(state, action)
    }

    pub(crate) fn status_creator(&self) -> &ActionCreator<(Rc<str>, StatusPatch)> {
        &self.0.status_creator
    }
}
