//! Shell-command leaves for arbor action trees.
//!
//! [`ShellCommand`] turns an external program invocation into a
//! [`Work`](arbor_core::Work) item, with arguments resolvable from the
//! execution context. The [`ops`] module offers ready-made filesystem
//! actions built on it.

pub mod command;
pub mod ops;

pub use command::{ShellArg, ShellCommand, ShellConfig, ShellError};
pub use ops::{copy_file, list_dir, remove_path};
