//! Stage execution: retrying nodes, concurrent batch nodes, and the
//! signal-routed flow that strings them together.

pub mod batch;
pub mod context;
pub mod flow;
pub mod node;
pub mod retry;

pub use batch::{BatchNode, ItemFailure, ItemOutcome};
pub use context::{Context, OutputRecord, RunInput};
pub use flow::{Flow, FlowBuilder, FlowReport};
pub use node::{Node, DEFAULT_SIGNAL};
pub use retry::{Attempt, AttemptInfo};

#[cfg(test)]
pub(crate) use batch::BatchStage;
#[cfg(test)]
pub(crate) use node::{Stage, Step};
