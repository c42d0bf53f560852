//! Filter: predicate-based item filtering node.
//!
//! Items for which the predicate holds are forwarded unchanged; everything
//! else is dropped. With `invert` set the roles swap and matching items are
//! the ones dropped.

use crate::error::Result;
use crate::graph::plugin::{Emitter, Item, Plugin};

/// Forwards items that pass a predicate.
pub struct Filter<F> {
    predicate: F,
    /// Invert mode: if true, block matching items instead of allowing them.
    invert_mode: bool,
}

impl<F> Filter<F> {
    pub fn new(predicate: F) -> Self {
        Self {
            predicate,
            invert_mode: false,
        }
    }

    /// Drop matching items instead of forwarding them.
    pub fn inverted(mut self) -> Self {
        self.invert_mode = true;
        self
    }

    /// Check if invert mode is enabled.
    pub fn invert_mode(&self) -> bool {
        self.invert_mode
    }
}

impl<T, F> Plugin<T> for Filter<F>
where
    T: Item,
    F: FnMut(&T) -> bool + Send + 'static,
{
    fn name(&self) -> &str {
        "Filter"
    }

    fn process(&mut self, item: T, _out: &Emitter<'_, T>) -> Result<Option<T>> {
        let matches = (self.predicate)(&item);

        // Pass if: (matches AND !invert) OR (!matches AND invert)
        if matches != self.invert_mode {
            Ok(Some(item))
        } else {
            Ok(None)
        }
    }
}
