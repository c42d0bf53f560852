//! Output channel selection and edge direction.
//!
//! A node's outputs are addressed positionally: channel `i` is the `i`-th edge
//! added to the node. [`Channel::All`] broadcasts to every edge present when the
//! value is emitted.

use crate::error::GraphError;
use std::fmt;
use std::str::FromStr;

/// Which of a node's outputs receive an emitted value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Channel {
    /// Every current output, in insertion order.
    #[default]
    All,
    /// Only the output at this position.
    Index(usize),
}

impl Channel {
    /// Raw encoding used by graph files and foreign callers: `-1` is broadcast.
    pub const BROADCAST: i64 = -1;
}

impl From<usize> for Channel {
    fn from(index: usize) -> Self {
        Channel::Index(index)
    }
}

impl TryFrom<i64> for Channel {
    type Error = GraphError;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        match raw {
            Self::BROADCAST => Ok(Channel::All),
            i if i >= 0 => Ok(Channel::Index(i as usize)),
            other => Err(GraphError::InvalidArgument(format!(
                "channel must be -1 (all) or a non-negative index (was {})",
                other
            ))),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::All => write!(f, "all"),
            Channel::Index(i) => write!(f, "{}", i),
        }
    }
}

/// Which way a new edge points relative to the node it is added on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    /// `this -> other`
    #[default]
    Output,
    /// `other -> this`
    Input,
}

impl FromStr for Direction {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "output" => Ok(Direction::Output),
            "input" => Ok(Direction::Input),
            other => Err(GraphError::InvalidArgument(format!(
                "direction should either be 'input' or 'output' (was '{}')",
                other
            ))),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Output => write!(f, "output"),
            Direction::Input => write!(f, "input"),
        }
    }
}
