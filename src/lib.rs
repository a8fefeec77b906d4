mod action;
mod error;
mod hooks;
mod reducer;
mod resource;
mod selector;
mod slice;
mod status;
mod store;
mod subscription;
mod thunk;

pub use action::{Action, ActionCreator, ActionType, AsyncActionTags, FetchPhase, Prepared};
pub use error::{FetchError, SliceError};
pub use hooks::{ActionHook, Hooks, SelectorHook, ThunkHook};
pub use reducer::SliceState;
pub use resource::{ResourceHandle, ResourceResult, Suspended};
pub use selector::Selector;
pub use slice::{AsyncCase, Slice, SliceBuilder, GET_RESOURCE_STATUS, SET_RESOURCE_STATUS};
pub use status::{DepKey, Deps, StatusMap, StatusPatch, StatusRecord};
pub use store::{Dispatcher, Store};
pub use subscription::Subscription;
pub use thunk::{PhaseCallbacks, ThunkAction, ThunkFuture};
