#![warn(missing_docs)]
//! Framework-independent interface of reinforcement learning models.
//!
//! Backends, such as `rlmodel-tch`, implement [`ModelV2`] on top of their
//! own tensor and variable types.
pub mod error;
pub mod record;

mod config;
mod model;
mod space;
mod variable;

pub use config::ModelConfig;
pub use model::{check_state_len, InputDict, ModelV2, ModelV2Base, NullScope, Scope};
pub use space::Space;
pub use variable::{NamedVariable, VarList};
