//! Ownership and overflow policies.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Who closes handles once they reach the consumer.
///
/// Pick one per stream and say so where the stream is created; mixing the two
/// is how handles end up closed twice or never.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ownership {
    /// The engine closes each handle when a newer one has been received, and
    /// the last one when the stream is cancelled. Consumers never close.
    #[default]
    Engine,
    /// The consumer closes every handle it receives. The engine only closes
    /// handles it never managed to deliver.
    Consumer,
}

/// What a continuous stream does when reloads outpace the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Overflow {
    /// Keep only the newest pending handle; older pending ones are closed.
    #[default]
    Latest,
    /// Fail the stream with `LoaderError::Overflow` once `capacity` handles
    /// are pending.
    Error,
    /// Queue every handle, without bound.
    Buffer,
    /// Stop reloading this stream once `capacity` handles are pending. The
    /// newest result is held back and reloading resumes when the consumer
    /// receives. The scheduler itself is never blocked.
    Block,
}

impl fmt::Display for Ownership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ownership::Engine => f.write_str("engine"),
            Ownership::Consumer => f.write_str("consumer"),
        }
    }
}

impl FromStr for Ownership {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "engine" => Ok(Ownership::Engine),
            "consumer" => Ok(Ownership::Consumer),
            other => Err(format!("unknown ownership '{other}' (expected engine or consumer)")),
        }
    }
}

impl fmt::Display for Overflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Overflow::Latest => "latest",
            Overflow::Error => "error",
            Overflow::Buffer => "buffer",
            Overflow::Block => "block",
        };
        f.write_str(name)
    }
}

impl FromStr for Overflow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "latest" => Ok(Overflow::Latest),
            "error" => Ok(Overflow::Error),
            "buffer" => Ok(Overflow::Buffer),
            "block" => Ok(Overflow::Block),
            other => Err(format!(
                "unknown overflow policy '{other}' (expected latest, error, buffer or block)"
            )),
        }
    }
}

/// Pending-queue behaviour resolved from an [`Overflow`] and a capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Backlog {
    Unbounded,
    Latest,
    Error(usize),
    Block(usize),
}

impl Backlog {
    /// `capacity` is validated by the loader builder and is at least 1.
    pub(crate) fn new(overflow: Overflow, capacity: usize) -> Self {
        match overflow {
            Overflow::Latest => Backlog::Latest,
            Overflow::Error => Backlog::Error(capacity),
            Overflow::Buffer => Backlog::Unbounded,
            Overflow::Block => Backlog::Block(capacity),
        }
    }
}

/// Continuous streams reload on change; single-shot loads once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    Continuous,
    Single,
}
