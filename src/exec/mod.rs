//! Child process execution for external tooling.
//!
//! Every external tool invocation goes through [`CommandRunner`] so the
//! provisioning flow can be driven by scripted outputs in tests. The
//! [`StreamingCommandRunner`] forwards a child's output to a live sink while
//! it runs and still hands the captured streams back to the caller.

mod streaming;
mod tee;
mod types;

pub use streaming::StreamingCommandRunner;
pub use tee::TeeWriter;
pub use types::{CommandOutput, CommandRunner, CommandSpec, ExecError};

#[cfg(test)]
mod tests;
