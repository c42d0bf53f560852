//! PrintSink: writes each item to stdout.

use crate::error::Result;
use crate::graph::plugin::{Emitter, Item, Plugin};
use std::fmt::Display;
use std::io::{self, Write};

/// Terminal node that prints items, one per line.
pub struct PrintSink {
    prefix: String,
}

impl PrintSink {
    pub fn new() -> Self {
        Self {
            prefix: String::new(),
        }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn write_line<T: Display>(&self, w: &mut impl Write, item: &T) -> io::Result<()> {
        writeln!(w, "{}{}", self.prefix, item)?;
        w.flush()
    }
}

impl Default for PrintSink {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Item + Display> Plugin<T> for PrintSink {
    fn name(&self) -> &str {
        "PrintSink"
    }

    fn process(&mut self, item: T, _out: &Emitter<'_, T>) -> Result<Option<T>> {
        self.write_line(&mut io::stdout().lock(), &item)?;
        Ok(None)
    }
}
