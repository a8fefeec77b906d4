use std::{
    collections::HashMap,
    hash::{DefaultHasher, Hash, Hasher},
    rc::Rc,
};

use serde::{
    ser::{SerializeSeq, SerializeStruct},
    Serialize,
};

use crate::error::FetchError;

#[cfg(test)]
mod tests;

/// One opaque comparison key of a dependency sequence.
///
/// Derived by hashing the dependency value, so arbitrary `Hash` values can be
/// compared without keeping them alive.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct DepKey(u64);

impl DepKey {
    pub fn of(value: impl Hash) -> Self {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        DepKey(hasher.finish())
    }
}

/// An ordered dependency sequence. Equality is shallow and position-wise.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Deps(Vec<DepKey>);

impl Deps {
    pub fn new() -> Self {
        Deps(Vec::new())
    }
    pub fn with(mut self, value: impl Hash) -> Self {
        self.0.push(DepKey::of(value));
        self
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Same length and each key equal, in order.
    pub fn shallow_eq(&self, other: &Deps) -> bool {
        self.0 == other.0
    }
}

impl Serialize for Deps {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for key in &self.0 {
            seq.serialize_element(&key.0)?;
        }
        seq.end()
    }
}

/// The fetch status of one async operation.
///
/// `is_loading` and `is_loaded` are mutually exclusive phases of the first
/// load. `is_fetching` covers both the first load and later refetches. After
/// a completed fetch at most one of `is_success`/`is_error` is true; before,
/// both are false.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct StatusRecord {
    pub deps: Option<Deps>,
    pub is_loading: bool,
    pub is_loaded: bool,
    pub is_fetching: bool,
    pub is_success: bool,
    pub is_error: bool,
    pub error: Option<FetchError>,
}

impl Serialize for StatusRecord {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        let mut s = serializer.serialize_struct("StatusRecord", 7)?;
        s.serialize_field("deps", &self.deps)?;
        s.serialize_field("is_loading", &self.is_loading)?;
        s.serialize_field("is_loaded", &self.is_loaded)?;
        s.serialize_field("is_fetching", &self.is_fetching)?;
        s.serialize_field("is_success", &self.is_success)?;
        s.serialize_field("is_error", &self.is_error)?;
        s.serialize_field("error", &self.error)?;
        s.end()
    }
}

/// A partial status update. Only the present fields are applied; absent
/// fields leave the stored record untouched.
#[derive(Clone, Debug, Default)]
pub struct StatusPatch {
    pub deps: Option<Deps>,
    pub is_loading: Option<bool>,
    pub is_loaded: Option<bool>,
    pub is_fetching: Option<bool>,
    pub is_success: Option<bool>,
    pub is_error: Option<bool>,
    pub error: Option<Option<FetchError>>,
}

impl StatusPatch {
    pub fn apply_to(&self, record: &mut StatusRecord) {
        if let Some(deps) = &self.deps {
            record.deps = Some(deps.clone());
        }
        if let Some(v) = self.is_loading {
            record.is_loading = v;
        }
        if let Some(v) = self.is_loaded {
            record.is_loaded = v;
        }
        if let Some(v) = self.is_fetching {
            record.is_fetching = v;
        }
        if let Some(v) = self.is_success {
            record.is_success = v;
        }
        if let Some(v) = self.is_error {
            record.is_error = v;
        }
        if let Some(error) = &self.error {
            record.error = error.clone();
        }
    }
}

/// Status records keyed by thunk-operation name. Entries are created lazily
/// on the first patch for an operation.
pub type StatusMap = HashMap<Rc<str>, StatusRecord>;
