//! Splitter: emits several items for each input.
//!
//! The split function's parts are streamed downstream one by one through the
//! emitter while the input is still being processed, the same way a
//! generation stage streams tokens. Nothing is returned, so only the parts
//! reach the outputs (plus the original, if the node relays).

use crate::error::Result;
use crate::graph::plugin::{Emitter, Item, Plugin};

pub struct Splitter<F> {
    split: F,
}

impl<F> Splitter<F> {
    pub fn new(split: F) -> Self {
        Self { split }
    }
}

impl<T, F, I> Plugin<T> for Splitter<F>
where
    T: Item,
    F: FnMut(T) -> I + Send + 'static,
    I: IntoIterator<Item = T>,
{
    fn name(&self) -> &str {
        "Splitter"
    }

    fn process(&mut self, item: T, out: &Emitter<'_, T>) -> Result<Option<T>> {
        for part in (self.split)(item) {
            out.broadcast(part)?;
        }
        Ok(None)
    }
}
