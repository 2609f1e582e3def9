//! Arbor: an action-tree execution engine.
//!
//! Programs are built as trees of [`Action`] nodes: leaves hold the actual
//! work, inner nodes are combinators for sequencing, fan-out, branching,
//! iteration, recovery, retry and deadlines. A built tree is inert data;
//! execution strategies ([`Performer`], [`ReportingPerformer`]) walk it
//! against a hierarchical [`Context`], and [`Printer`] renders it.
//!
//! ```no_run
//! use arbor_core::{Action, Context, Performer};
//!
//! # async fn demo() -> Result<(), arbor_core::PerformError> {
//! let plan = Action::sequence(vec![
//!     Action::leaf_fn(|ctx| {
//!         let who = ctx.value_of("who")?;
//!         println!("hello, {}", who.as_str().unwrap_or("?"));
//!         Ok(())
//!     })
//!     .named("greet"),
//! ]);
//!
//! let ctx = Context::root().child("who", "world");
//! Performer::new().perform(&plan, &ctx).await
//! # }
//! ```

pub mod action;
pub mod context;
pub mod error;
pub mod report;
pub mod visit;

pub use action::{
    Action, AttemptBuilder, ElementIter, ForEachBuilder, Mode, RetryBuilder, Tries, Work,
};
pub use context::{Context, Value, FAULT_VAR};
pub use error::{BuildError, FaultKind, PerformError};
pub use report::{Outcome, Record, Report};
pub use visit::print::Printer;
pub use visit::{Performer, ReportingPerformer, Visitor};
