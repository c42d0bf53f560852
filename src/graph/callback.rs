//! Plain functions as graph nodes.
//!
//! [`Callback`] adapts a closure into a [`Plugin`] so it can sit in the graph
//! like any other node. [`IntoNode`] lets `Node::add`/`Node::connect` accept
//! either an existing node or a closure, wrapping the latter on the fly.

use crate::error::Result;
use crate::graph::node::{Node, NodeOptions};
use crate::graph::plugin::{Emitter, Item, Plugin};

/// What a callback closure may return.
///
/// `()` forwards nothing, so side-effect-only closures (printing, logging)
/// work without an explicit `None`.
pub trait CallbackOutput<T> {
    fn into_output(self) -> Option<T>;
}

impl<T> CallbackOutput<T> for () {
    fn into_output(self) -> Option<T> {
        None
    }
}

impl<T> CallbackOutput<T> for Option<T> {
    fn into_output(self) -> Option<T> {
        self
    }
}

/// Plugin that delegates `process` to a function.
pub struct Callback<F> {
    f: F,
}

impl<F> Callback<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<T, F, R> Plugin<T> for Callback<F>
where
    T: Item,
    F: FnMut(T) -> R + Send + 'static,
    R: CallbackOutput<T>,
{
    fn name(&self) -> &str {
        "Callback"
    }

    fn process(&mut self, item: T, _out: &Emitter<'_, T>) -> Result<Option<T>> {
        Ok((self.f)(item).into_output())
    }
}

impl<T: Item> Node<T> {
    /// Wrap `f` in a threaded [`Callback`] node.
    pub fn callback<F, R>(f: F) -> Result<Self>
    where
        F: FnMut(T) -> R + Send + 'static,
        R: CallbackOutput<T>,
    {
        Self::new(Callback::new(f), NodeOptions::default())
    }

    /// Wrap `f` in a [`Callback`] node with explicit options.
    pub fn callback_with<F, R>(f: F, options: NodeOptions) -> Result<Self>
    where
        F: FnMut(T) -> R + Send + 'static,
        R: CallbackOutput<T>,
    {
        Self::new(Callback::new(f), options)
    }
}

/// Anything that can be the far end of an edge.
pub trait IntoNode<T: Item> {
    fn into_node(self) -> Result<Node<T>>;
}

impl<T: Item> IntoNode<T> for Node<T> {
    fn into_node(self) -> Result<Node<T>> {
        Ok(self)
    }
}

impl<T: Item> IntoNode<T> for &Node<T> {
    fn into_node(self) -> Result<Node<T>> {
        Ok(self.clone())
    }
}

impl<T, F, R> IntoNode<T> for F
where
    T: Item,
    F: FnMut(T) -> R + Send + 'static,
    R: CallbackOutput<T>,
{
    fn into_node(self) -> Result<Node<T>> {
        Node::callback(self)
    }
}
