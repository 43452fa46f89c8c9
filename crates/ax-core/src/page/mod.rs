//! Page Mutation Engine
//!
//! Content-script side of the blocker. The engine removes ad containers by a
//! fixed selector list and, on the video site, runs the in-stream ad state
//! machine. All page access goes through the capability traits in `dom`, so
//! the logic here runs unchanged against a real document or a test fake.

mod ad_state;
mod dom;
mod engine;
pub mod selectors;

#[cfg(test)]
pub(crate) mod testing;

pub use ad_state::*;
pub use dom::*;
pub use engine::*;

/// Background's answer to "should this page be blocked?", as seen by the
/// content script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReply {
    /// Not running inside an extension; nobody to ask
    NoExtension,
    /// The message could not be delivered or answered
    Failed,
    /// The background replied; `None` when the reply carried no decision
    Answered(Option<bool>),
}

impl BlockReply {
    /// Should the engine start? Anything short of an explicit "no" starts it,
    /// except a reply without a decision.
    pub fn should_activate(self) -> bool {
        match self {
            Self::NoExtension | Self::Failed => true,
            Self::Answered(decision) => decision == Some(true),
        }
    }
}

/// Start-once latch for the engine.
#[derive(Debug, Default)]
pub struct Activation {
    started: bool,
}

impl Activation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` the first time only.
    pub fn begin(&mut self) -> bool {
        if self.started {
            return false;
        }
        self.started = true;
        true
    }
}
