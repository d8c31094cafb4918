//! Models on [tch](https://crates.io/crates/tch).
//!
//! [`TchModelV2`] implements [`rlmodel_core::ModelV2`] for a [`Network`],
//! keeping the list of variables the network registers and the execution
//! mode, eager or graph, in which it runs.
pub mod graph;
mod model;
mod variable;
pub use graph::ExecutionMode;
pub use model::{Network, NoNetwork, TchModelV2};
pub use variable::TchVariable;
