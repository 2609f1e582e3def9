//! Execution engines over the action tree.
//!
//! One shared [`dispatch`] implements the per-variant semantics; strategies
//! recurse through the [`Visitor`] trait, so a strategy interposes on every
//! node visit. [`Performer`] executes leaves for their real side effects,
//! [`ReportingPerformer`] additionally keeps a per-node outcome ledger, and
//! [`print::Printer`] renders the tree without executing anything.

pub mod print;

use crate::action::{Action, Kind, Mode, Tries};
use crate::context::{Context, Value, FAULT_VAR};
use crate::error::PerformError;
use crate::report::{Outcome, Report};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::task::JoinSet;
use uuid::Uuid;

/// An execution strategy over the action tree.
///
/// Implementations delegate the combinator semantics to [`dispatch`] and may
/// wrap each visit with their own bookkeeping. The `Clone + 'static` bound is
/// what lets parallel combinators hand the strategy to spawned workers.
#[async_trait]
pub trait Visitor: Clone + Send + Sync + 'static {
    async fn visit(&self, action: &Action, ctx: &Context) -> Result<(), PerformError>;
}

/// Variant-specific execution semantics, recursing through `visitor`.
pub(crate) async fn dispatch<V: Visitor>(
    visitor: &V,
    action: &Action,
    ctx: &Context,
) -> Result<(), PerformError> {
    match action.kind() {
        Kind::Leaf { work } => work.run(ctx).await,

        // Transparent: exists purely for presentation.
        Kind::Named { inner, .. } => visitor.visit(inner, ctx).await,

        Kind::Composite {
            mode: Mode::Sequential,
            children,
        } => {
            for child in children {
                visitor.visit(child, ctx).await?;
            }
            Ok(())
        }

        Kind::Composite {
            mode: Mode::Parallel,
            children,
        } => join_parallel(visitor, children.iter().map(|c| (c.clone_ref(), ctx.clone()))).await,

        Kind::ForEach {
            var,
            elements,
            mode: Mode::Sequential,
            body,
        } => {
            let produce = elements.as_ref();
            for item in produce(ctx)? {
                let scope = ctx.child(var.clone(), item);
                visitor.visit(body, &scope).await?;
            }
            Ok(())
        }

        Kind::ForEach {
            var,
            elements,
            mode: Mode::Parallel,
            body,
        } => {
            let produce = elements.as_ref();
            let items: Vec<Value> = produce(ctx)?.collect();
            join_parallel(
                visitor,
                items
                    .into_iter()
                    .map(|item| (body.clone_ref(), ctx.child(var.clone(), item))),
            )
            .await
        }

        Kind::When {
            predicate,
            then,
            otherwise,
        } => {
            let test = predicate.as_ref();
            if test(ctx)? {
                visitor.visit(then, ctx).await
            } else {
                visitor.visit(otherwise, ctx).await
            }
        }

        Kind::Attempt {
            target,
            on,
            recovery,
            ensure,
        } => {
            let outcome = visitor.visit(target, ctx).await;
            if let Err(cause) = &outcome {
                if on.matches(cause) {
                    // Recovery observes the failure; it does not suppress it.
                    let scope = ctx.child(FAULT_VAR, Value::Fault(cause.clone()));
                    if let Err(err) = visitor.visit(recovery, &scope).await {
                        tracing::warn!(error = %err, "Recovery action failed");
                    }
                }
            }
            if let Some(ensure) = ensure {
                match visitor.visit(ensure, ctx).await {
                    Ok(()) => {}
                    Err(err) if outcome.is_ok() => return Err(err),
                    Err(err) => {
                        tracing::warn!(error = %err, "Ensure action failed after earlier failure")
                    }
                }
            }
            outcome
        }

        Kind::Retry {
            target,
            on,
            tries,
            delay,
        } => {
            let mut attempts: u32 = 0;
            loop {
                attempts = attempts.saturating_add(1);
                match visitor.visit(target, ctx).await {
                    Ok(()) => return Ok(()),
                    Err(cause) if !on.matches(&cause) => return Err(cause),
                    Err(cause) => {
                        let budget_left = match tries {
                            Tries::Limited(count) => attempts <= *count,
                            Tries::Unbounded => true,
                        };
                        if !budget_left {
                            tracing::warn!(attempts, error = %cause, "Retry budget exhausted");
                            return Err(PerformError::RetriesExhausted {
                                attempts,
                                last: Box::new(cause),
                            });
                        }
                        tracing::debug!(attempt = attempts, error = %cause, "Attempt failed, retrying");
                        tokio::time::sleep(*delay).await;
                    }
                }
            }
        }

        Kind::TimeOut { target, limit } => {
            let strategy = visitor.clone();
            let worker_action = target.clone_ref();
            let worker_ctx = ctx.clone();
            let mut worker =
                tokio::spawn(async move { strategy.visit(&worker_action, &worker_ctx).await });
            match tokio::time::timeout(*limit, &mut worker).await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(join_err)) => Err(PerformError::Panicked(join_err.to_string())),
                Err(_elapsed) => {
                    tracing::warn!(limit_ms = limit.as_millis() as u64, "Deadline elapsed, cancelling worker");
                    worker.abort();
                    // The worker is always released, cancelled or not.
                    let _ = (&mut worker).await;
                    Err(PerformError::TimedOut(*limit))
                }
            }
        }
    }
}

/// Spawn one worker per branch, await every one (run-to-completion), and
/// aggregate failures deterministically by branch declaration index: a lone
/// failure propagates unchanged, several become `Aggregate` with the
/// lowest-indexed failure as the primary cause.
async fn join_parallel<V, I>(visitor: &V, branches: I) -> Result<(), PerformError>
where
    V: Visitor,
    I: Iterator<Item = (Action, Context)>,
{
    let mut workers = JoinSet::new();
    for (index, (action, ctx)) in branches.enumerate() {
        let strategy = visitor.clone();
        workers.spawn(async move { (index, strategy.visit(&action, &ctx).await) });
    }

    let mut failures: Vec<(usize, PerformError)> = Vec::new();
    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok((_, Ok(()))) => {}
            Ok((index, Err(err))) => failures.push((index, err)),
            // The branch index is lost with the panic; order these last.
            Err(join_err) => failures.push((usize::MAX, PerformError::Panicked(join_err.to_string()))),
        }
    }

    failures.sort_by_key(|(index, _)| *index);
    let mut causes: Vec<PerformError> = failures.into_iter().map(|(_, err)| err).collect();
    match causes.len() {
        0 => Ok(()),
        1 => Err(causes.remove(0)),
        total => {
            tracing::debug!(failed = total, "Multiple parallel branches failed");
            let primary = Box::new(causes.remove(0));
            Err(PerformError::Aggregate {
                primary,
                secondary: causes,
            })
        }
    }
}

/// Executes leaf callables for their real side effects.
#[derive(Debug, Clone, Copy, Default)]
pub struct Performer;

impl Performer {
    pub fn new() -> Self {
        Performer
    }

    /// Execute the tree rooted at `root` against `ctx`.
    pub async fn perform(&self, root: &Action, ctx: &Context) -> Result<(), PerformError> {
        self.visit(root, ctx).await
    }
}

#[async_trait]
impl Visitor for Performer {
    async fn visit(&self, action: &Action, ctx: &Context) -> Result<(), PerformError> {
        dispatch(self, action, ctx).await
    }
}

/// Executes like [`Performer`] while recording a per-node outcome ledger.
///
/// Before delegating to a node it ensures a record exists; after the call it
/// appends a success or failure event and re-raises the failure unchanged.
/// A visit cancelled mid-flight (a TimeOut aborting its worker) appends a
/// failure event on drop, so every visited node carries at least one outcome
/// by the time the report reaches a consumer.
#[derive(Debug, Clone)]
pub struct ReportingPerformer {
    report: Arc<Report>,
}

impl ReportingPerformer {
    pub fn new() -> Self {
        ReportingPerformer {
            report: Arc::new(Report::new()),
        }
    }

    pub async fn perform(&self, root: &Action, ctx: &Context) -> Result<(), PerformError> {
        self.visit(root, ctx).await
    }

    /// The ledger accumulated so far.
    pub fn report(&self) -> Arc<Report> {
        Arc::clone(&self.report)
    }
}

impl Default for ReportingPerformer {
    fn default() -> Self {
        ReportingPerformer::new()
    }
}

/// Appends a failure event if the visit is dropped before completing.
struct VisitGuard {
    report: Arc<Report>,
    id: Uuid,
    armed: bool,
}

impl VisitGuard {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for VisitGuard {
    fn drop(&mut self) {
        if self.armed {
            let _ = self.report.append(
                self.id,
                Outcome::Failure(PerformError::failed("cancelled before completion")),
            );
        }
    }
}

#[async_trait]
impl Visitor for ReportingPerformer {
    async fn visit(&self, action: &Action, ctx: &Context) -> Result<(), PerformError> {
        self.report.ensure_record(action.id())?;
        let mut guard = VisitGuard {
            report: Arc::clone(&self.report),
            id: action.id(),
            armed: true,
        };
        let outcome = dispatch(self, action, ctx).await;
        guard.disarm();
        match &outcome {
            Ok(()) => self.report.append(action.id(), Outcome::Success)?,
            Err(err) => self
                .report
                .append(action.id(), Outcome::Failure(err.clone()))?,
        }
        outcome
    }
}
