use std::{any::Any, fmt, rc::Rc};

use derive_ex::derive_ex;
use parse_display::{Display, FromStr};

use crate::error::FetchError;


/// Identifies one operation of one slice on the wire, formatted `"<slice>/<op>"`.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Display, FromStr)]
#[display("{slice}/{op}")]
pub struct ActionType {
    slice: String,
    op: String,
}

impl ActionType {
    pub fn new(slice: impl Into<String>, op: impl Into<String>) -> Self {
        ActionType {
            slice: slice.into(),
            op: op.into(),
        }
    }

    /// The type of one phase of an async operation, e.g. `"pets/availableListFulfilled"`.
    pub fn with_phase(slice: impl Into<String>, op: &str, phase: FetchPhase) -> Self {
        ActionType {
            slice: slice.into(),
            op: format!("{op}{phase}"),
        }
    }

    pub fn slice(&self) -> &str {
        &self.slice
    }
    pub fn op(&self) -> &str {
        &self.op
    }
}

/// The three phases of an async operation.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Display)]
pub enum FetchPhase {
    Pending,
    Fulfilled,
    Rejected,
}

/// A dispatched action: a type tag plus an optional typed payload.
///
/// The payload is type-erased so that heterogeneous actions flow through a
/// single dispatch path; the case handler registered for the type restores it.
pub struct Action {
    ty: ActionType,
    payload: Option<Box<dyn Any>>,
    meta: Option<Box<dyn Any>>,
    error: bool,
}

impl Action {
    pub fn new(ty: ActionType, payload: Option<Box<dyn Any>>) -> Self {
        Action {
            ty,
            payload,
            meta: None,
            error: false,
        }
    }

    pub fn ty(&self) -> &ActionType {
        &self.ty
    }
    pub fn is_error(&self) -> bool {
        self.error
    }
    pub fn meta<M: 'static>(&self) -> Option<&M> {
        self.meta.as_ref()?.downcast_ref()
    }

    /// Recovers the typed payload. `None` if the action carries no payload or
    /// a payload of a different type.
    pub(crate) fn into_payload<P: 'static>(self) -> Option<P> {
        Some(*self.payload?.downcast::<P>().ok()?)
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Action")
            .field("ty", &self.ty)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

/// A prepared payload: the output of a payload-preparation function.
pub struct Prepared<P> {
    pub payload: Option<P>,
    pub meta: Option<Box<dyn Any>>,
    pub error: bool,
}

impl<P> Prepared<P> {
    pub fn payload(payload: P) -> Self {
        Prepared {
            payload: Some(payload),
            meta: None,
            error: false,
        }
    }
    pub fn meta(mut self, meta: impl Any) -> Self {
        self.meta = Some(Box::new(meta));
        self
    }
    pub fn error(mut self) -> Self {
        self.error = true;
        self
    }
}

type PrepareFn<P> = Box<dyn Fn(P) -> Prepared<P>>;

/// Builds [`Action`]s carrying a fixed type tag and a typed payload.
#[derive_ex(Clone, bound())]
pub struct ActionCreator<P: 'static>(Rc<ActionCreatorData<P>>);

struct ActionCreatorData<P: 'static> {
    ty: ActionType,
    prepare: Option<PrepareFn<P>>,
}

impl<P: 'static> ActionCreator<P> {
    pub fn new(ty: ActionType) -> Self {
        ActionCreator(Rc::new(ActionCreatorData { ty, prepare: None }))
    }

    /// Like [`new`](Self::new), but the payload passes through `prepare`
    /// before it is stored on the action.
    pub fn with_prepare(ty: ActionType, prepare: impl Fn(P) -> Prepared<P> + 'static) -> Self {
        ActionCreator(Rc::new(ActionCreatorData {
            ty,
            prepare: Some(Box::new(prepare)),
        }))
    }

    pub fn ty(&self) -> &ActionType {
        &self.0.ty
    }

    pub fn create(&self, payload: P) -> Action {
        let ty = self.0.ty.clone();
        match &self.0.prepare {
            Some(prepare) => {
                let prepared = prepare(payload);
                Action {
                    ty,
                    payload: prepared.payload.map(|p| Box::new(p) as Box<dyn Any>),
                    meta: prepared.meta,
                    error: prepared.error,
                }
            }
            None => Action {
                ty,
                payload: Some(Box::new(payload)),
                meta: None,
                error: false,
            },
        }
    }
}

// The type string, like calling the creator's `toString`.
impl<P> fmt::Display for ActionCreator<P> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.0.ty, f)
    }
}

/// The explicit action triplet of one async operation.
///
/// Built once when the operation is registered and held by direct reference,
/// so thunks never resolve their framework actions by name at dispatch time.
#[derive_ex(Clone, bound())]
pub struct AsyncActionTags<R: 'static> {
    pub(crate) pending: ActionCreator<()>,
    pub(crate) fulfilled: ActionCreator<R>,
    pub(crate) rejected: ActionCreator<FetchError>,
}

impl<R: 'static> AsyncActionTags<R> {
    pub(crate) fn new(slice: &str, op: &str) -> Self {
        AsyncActionTags {
            pending: ActionCreator::new(ActionType::with_phase(slice, op, FetchPhase::Pending)),
            fulfilled: ActionCreator::new(ActionType::with_phase(slice, op, FetchPhase::Fulfilled)),
            rejected: ActionCreator::new(ActionType::with_phase(slice, op, FetchPhase::Rejected)),
        }
    }
}
