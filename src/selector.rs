use std::{cell::RefCell, rc::Rc};

use derive_ex::derive_ex;

use crate::reducer::SliceState;

#[cfg(test)]
mod tests;

type SelectFn<Data, S> = Box<dyn Fn(&Data) -> S>;

/// A memoized derivation over the slice data.
///
/// The cache is keyed by the identity of the envelope's `Rc<Data>`. The cached
/// `Rc` is pinned inside the cache, which forces the copy-on-write dispatch
/// path to allocate a fresh value on the next mutation, so an unchanged
/// pointer always means an unchanged input.
#[derive_ex(Clone, bound())]
pub struct Selector<Data: 'static, S: 'static>(Rc<SelectorData<Data, S>>);

struct SelectorData<Data: 'static, S: 'static> {
    name: Rc<str>,
    select: SelectFn<Data, S>,
    cache: RefCell<Option<(Rc<Data>, Rc<S>)>>,
}

impl<Data: 'static, S: 'static> Selector<Data, S> {
    pub fn new(name: impl Into<Rc<str>>, select: impl Fn(&Data) -> S + 'static) -> Self {
        Selector(Rc::new(SelectorData {
            name: name.into(),
            select: Box::new(select),
            cache: RefCell::new(None),
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn select(&self, state: &SliceState<Data>) -> Rc<S> {
        let mut cache = self.0.cache.borrow_mut();
        if let Some((data, result)) = &*cache {
            if Rc::ptr_eq(data, &state.data) {
                return result.clone();
            }
        }
        let result = Rc::new((self.0.select)(&state.data));
        *cache = Some((state.data.clone(), result.clone()));
        result
    }
}
