use std::{fmt, rc::Rc};

use serde::Serialize;
use thiserror::Error;

/// Configuration errors reported by [`SliceBuilder::build`](crate::SliceBuilder::build)
/// and by typed lookups on a built slice.
///
/// These signal programmer error and are not recoverable at runtime.
#[derive(Debug, Error)]
pub enum SliceError {
    #[error("slice name must not be empty")]
    EmptyName,
    #[error("slice has no initial data")]
    MissingInitialData,
    #[error("duplicate operation name `{0}`")]
    DuplicateOperation(String),
    #[error("duplicate selector name `{0}`")]
    DuplicateSelector(String),
    #[error("`{0}` is reserved for internal use")]
    ReservedName(String),
    #[error("thunk `{0}` must be registered together with its async case")]
    UnboundThunk(String),
    #[error("resource `{resource}` refers to unknown thunk `{thunk}`")]
    UnknownThunk { resource: String, thunk: String },
    #[error("resource `{0}` has no selector of the same name")]
    UnknownResourceSelector(String),
    #[error("no operation named `{0}`")]
    UnknownOperation(String),
    #[error("no selector named `{0}`")]
    UnknownSelector(String),
    #[error("no resource named `{0}`")]
    UnknownResource(String),
    #[error("`{0}` is registered with a different type")]
    TypeMismatch(String),
}

/// A fetch failure captured by the status machine.
///
/// Cheap to clone; the same error value is shared between the status record,
/// rejected-phase callbacks and the caller of the thunk.
#[derive(Clone)]
pub struct FetchError(Rc<str>);

impl FetchError {
    pub fn msg(message: impl Into<String>) -> Self {
        FetchError(message.into().into())
    }
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl<E: std::error::Error> From<&E> for FetchError {
    fn from(e: &E) -> Self {
        FetchError::msg(e.to_string())
    }
}

impl PartialEq for FetchError {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}
impl fmt::Debug for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "FetchError({:?})", &*self.0)
    }
}
impl std::error::Error for FetchError {}

impl Serialize for FetchError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}
