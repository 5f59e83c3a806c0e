//! surveyor-exec: Shell execution facility
//!
//! Spawns probe scripts on the local endpoint and captures their output.
//! The engine treats this crate as one of its two probe sources.

pub mod error;
pub mod local;
pub mod result;
pub mod traits;

pub use error::ExecError;
pub use local::LocalExecutor;
pub use result::CommandResult;
pub use traits::ShellExecutor;
