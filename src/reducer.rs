use std::{collections::HashMap, rc::Rc};

use derive_ex::derive_ex;
use serde::{ser::SerializeStruct, Serialize};
use tracing::warn;

use crate::{
    action::{Action, ActionType},
    status::{StatusMap, StatusRecord},
};


/// The slice envelope: the user data value plus the per-operation status map.
///
/// `data` sits behind an `Rc` and is replaced by a structurally new value on
/// every effective dispatch; snapshots taken before a dispatch are never
/// affected by it.
#[derive_ex(Clone, bound())]
pub struct SliceState<Data> {
    pub(crate) data: Rc<Data>,
    pub(crate) status: StatusMap,
}

impl<Data> SliceState<Data> {
    pub(crate) fn new(data: Data) -> Self {
        SliceState {
            data: Rc::new(data),
            status: StatusMap::new(),
        }
    }

    pub fn data(&self) -> &Rc<Data> {
        &self.data
    }

    pub fn status(&self, op: &str) -> Option<&StatusRecord> {
        self.status.get(op)
    }
}

impl<Data: std::fmt::Debug> std::fmt::Debug for SliceState<Data> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("SliceState")
            .field("data", &self.data)
            .field("status", &self.status)
            .finish()
    }
}

impl<Data: Serialize> Serialize for SliceState<Data> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        // Status keys are sorted so that snapshots serialize deterministically.
        let status: std::collections::BTreeMap<&str, &StatusRecord> =
            self.status.iter().map(|(k, v)| (&**k, v)).collect();
        let mut s = serializer.serialize_struct("SliceState", 2)?;
        s.serialize_field("data", &*self.data)?;
        s.serialize_field("status", &status)?;
        s.end()
    }
}

pub(crate) type CaseHandler<Data> = Box<dyn Fn(&mut SliceState<Data>, Action)>;

/// The dispatch table of one slice: full action type to case handler.
pub(crate) struct CaseTable<Data> {
    handlers: HashMap<ActionType, CaseHandler<Data>>,
}

impl<Data> CaseTable<Data> {
    pub fn new() -> Self {
        CaseTable {
            handlers: HashMap::new(),
        }
    }

    pub fn insert(&mut self, ty: ActionType, handler: CaseHandler<Data>) {
        self.handlers.insert(ty, handler);
    }

    /// Applies the handler registered for the action's type. Returns `false`
    /// without touching the envelope when no handler is registered.
    pub fn apply(&self, state: &mut SliceState<Data>, action: Action) -> bool {
        let Some(handler) = self.handlers.get(action.ty()) else {
            return false;
        };
        handler(state, action);
        true
    }
}

/// Adapts a draft-mutating case function. The function receives a
/// copy-on-write draft of the data value; mutations become the next value.
pub(crate) fn draft_handler<Data, P>(f: impl Fn(&mut Data, P) + 'static) -> CaseHandler<Data>
where
    Data: Clone + 'static,
    P: 'static,
{
    Box::new(move |state, action| {
        let ty = action.ty().clone();
        let Some(payload) = action.into_payload::<P>() else {
            warn!(ty = %ty, "payload type mismatch; action ignored");
            return;
        };
        f(Rc::make_mut(&mut state.data), payload);
    })
}

/// Adapts a case function that returns the replacement data value. Mutating
/// the draft and returning it is equivalent to mutating in place.
pub(crate) fn replacing_handler<Data, P>(
    f: impl Fn(&mut Data, P) -> Data + 'static,
) -> CaseHandler<Data>
where
    Data: Clone + 'static,
    P: 'static,
{
    Box::new(move |state, action| {
        let ty = action.ty().clone();
        let Some(payload) = action.into_payload::<P>() else {
            warn!(ty = %ty, "payload type mismatch; action ignored");
            return;
        };
        let mut draft = (*state.data).clone();
        let next = f(&mut draft, payload);
        state.data = Rc::new(next);
    })
}

/// Adapts a payload-less case function (the pending phase of an async case).
pub(crate) fn unit_handler<Data>(f: impl Fn(&mut Data) + 'static) -> CaseHandler<Data>
where
    Data: Clone + 'static,
{
    Box::new(move |state, _action| {
        f(Rc::make_mut(&mut state.data));
    })
}
