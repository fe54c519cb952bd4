//! CLI command implementations.

mod export;
mod probe;
mod serve;

pub use export::cmd_export;
pub use probe::{cmd_probe, Via};
pub use serve::cmd_serve;
