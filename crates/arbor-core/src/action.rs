//! The action data model: a closed set of combinator nodes plus builders.
//!
//! Builders are the only way to obtain an [`Action`], and they validate
//! configuration at build time, never at execution time. `Action` is not
//! `Clone`: builders consume their children, so a node occupies at most one
//! position in one tree, which is what makes node identity a sound
//! [`Report`](crate::report::Report) key.

use crate::context::{Context, Value};
use crate::error::{BuildError, FaultKind, PerformError};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Contract for a leaf work item: one atomic, side-effecting operation.
///
/// Failure is signalled only by returning an error; there is no return-value
/// protocol.
#[async_trait]
pub trait Work: Send + Sync {
    async fn run(&self, ctx: &Context) -> Result<(), PerformError>;
}

/// A finite sequence of elements produced for one ForEach run.
pub type ElementIter = Box<dyn Iterator<Item = Value> + Send>;

pub(crate) type ElementsFn =
    Arc<dyn Fn(&Context) -> Result<ElementIter, PerformError> + Send + Sync>;
pub(crate) type PredicateFn = Arc<dyn Fn(&Context) -> Result<bool, PerformError> + Send + Sync>;

/// Scheduling policy for Composite children and ForEach elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Sequential,
    Parallel,
}

/// Retry attempt budget: a finite retry count or retry-forever.
///
/// `Limited(n)` allows `n + 1` total attempts (the first attempt plus `n`
/// retries).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tries {
    Limited(u32),
    Unbounded,
}

pub(crate) enum Kind {
    Leaf {
        work: Arc<dyn Work>,
    },
    Named {
        name: String,
        inner: Action,
    },
    Composite {
        mode: Mode,
        children: Vec<Action>,
    },
    ForEach {
        var: String,
        elements: ElementsFn,
        mode: Mode,
        body: Action,
    },
    When {
        predicate: PredicateFn,
        then: Action,
        otherwise: Action,
    },
    Attempt {
        target: Action,
        on: FaultKind,
        recovery: Action,
        ensure: Option<Action>,
    },
    Retry {
        target: Action,
        on: FaultKind,
        tries: Tries,
        delay: Duration,
    },
    TimeOut {
        target: Action,
        limit: Duration,
    },
}

struct Node {
    id: Uuid,
    kind: Kind,
}

/// A node in the action tree.
pub struct Action {
    node: Arc<Node>,
}

impl Action {
    fn new(kind: Kind) -> Self {
        Action {
            node: Arc::new(Node {
                id: Uuid::new_v4(),
                kind,
            }),
        }
    }

    /// Stable identity assigned at build time; the Report key.
    pub fn id(&self) -> Uuid {
        self.node.id
    }

    pub(crate) fn kind(&self) -> &Kind {
        &self.node.kind
    }

    /// A second handle to the same node, for in-engine worker dispatch.
    pub(crate) fn clone_ref(&self) -> Action {
        Action {
            node: Arc::clone(&self.node),
        }
    }

    /// A leaf performing the given work item.
    pub fn leaf(work: impl Work + 'static) -> Action {
        Action::new(Kind::Leaf {
            work: Arc::new(work),
        })
    }

    /// A leaf from a plain synchronous closure.
    pub fn leaf_fn<F>(f: F) -> Action
    where
        F: Fn(&Context) -> Result<(), PerformError> + Send + Sync + 'static,
    {
        Action::leaf(FnWork(f))
    }

    /// A leaf that does nothing; useful as a When arm.
    pub fn noop() -> Action {
        Action::leaf_fn(|_| Ok(()))
    }

    /// Wrap this action under a display name; execution is unchanged.
    pub fn named(self, name: impl Into<String>) -> Action {
        Action::new(Kind::Named {
            name: name.into(),
            inner: self,
        })
    }

    /// Children in declared order, visited one fully before the next starts.
    pub fn sequence(children: Vec<Action>) -> Action {
        Action::new(Kind::Composite {
            mode: Mode::Sequential,
            children,
        })
    }

    /// Children dispatched concurrently and all awaited before returning.
    pub fn parallel(children: Vec<Action>) -> Action {
        Action::new(Kind::Composite {
            mode: Mode::Parallel,
            children,
        })
    }

    /// Binary branch on a context predicate.
    pub fn when<P>(predicate: P, then: Action, otherwise: Action) -> Action
    where
        P: Fn(&Context) -> Result<bool, PerformError> + Send + Sync + 'static,
    {
        Action::new(Kind::When {
            predicate: Arc::new(predicate),
            then,
            otherwise,
        })
    }

    /// Iterate `body` once per produced element, binding `var` to the element
    /// in a child scope. Sequential unless [`ForEachBuilder::parallel`] is
    /// called.
    pub fn for_each<F>(var: impl Into<String>, elements: F, body: Action) -> ForEachBuilder
    where
        F: Fn(&Context) -> Result<ElementIter, PerformError> + Send + Sync + 'static,
    {
        ForEachBuilder {
            var: var.into(),
            elements: Arc::new(elements),
            mode: Mode::Sequential,
            body,
        }
    }

    /// Structured exception handling around `target`.
    pub fn attempt(target: Action) -> AttemptBuilder {
        AttemptBuilder {
            target,
            on: None,
            recovery: None,
            ensure: None,
        }
    }

    /// Bounded retry with a fixed inter-attempt delay.
    pub fn retry(target: Action) -> RetryBuilder {
        RetryBuilder {
            target,
            on: FaultKind::Any,
            tries: None,
            delay: None,
        }
    }

    /// Time-bounded execution with cancellation of the in-flight worker.
    pub fn timeout(target: Action, limit: Duration) -> Result<Action, BuildError> {
        if limit.is_zero() {
            return Err(BuildError::ZeroTimeout);
        }
        Ok(Action::new(Kind::TimeOut { target, limit }))
    }

    /// Direct children of this node, in structural order.
    pub fn children(&self) -> Vec<&Action> {
        match &self.node.kind {
            Kind::Leaf { .. } => Vec::new(),
            Kind::Named { inner, .. } => vec![inner],
            Kind::Composite { children, .. } => children.iter().collect(),
            Kind::ForEach { body, .. } => vec![body],
            Kind::When {
                then, otherwise, ..
            } => vec![then, otherwise],
            Kind::Attempt {
                target,
                recovery,
                ensure,
                ..
            } => {
                let mut all = vec![target, recovery];
                if let Some(ensure) = ensure {
                    all.push(ensure);
                }
                all
            }
            Kind::Retry { target, .. } | Kind::TimeOut { target, .. } => vec![target],
        }
    }

    /// Short human label for rendering.
    pub fn label(&self) -> String {
        match &self.node.kind {
            Kind::Leaf { .. } => "leaf".to_string(),
            Kind::Named { name, .. } => name.clone(),
            Kind::Composite {
                mode: Mode::Sequential,
                ..
            } => "sequence".to_string(),
            Kind::Composite {
                mode: Mode::Parallel,
                ..
            } => "parallel".to_string(),
            Kind::ForEach { var, mode, .. } => match mode {
                Mode::Sequential => format!("for each {var}"),
                Mode::Parallel => format!("for each {var} (parallel)"),
            },
            Kind::When { .. } => "when".to_string(),
            Kind::Attempt { on, .. } => format!("attempt (recover on {on})"),
            Kind::Retry { tries, delay, .. } => match tries {
                Tries::Limited(count) => format!("retry ({count}x, {delay:?})"),
                Tries::Unbounded => format!("retry (unbounded, {delay:?})"),
            },
            Kind::TimeOut { limit, .. } => format!("timeout ({limit:?})"),
        }
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("id", &self.node.id)
            .field("label", &self.label())
            .finish()
    }
}

struct FnWork<F>(F);

#[async_trait]
impl<F> Work for FnWork<F>
where
    F: Fn(&Context) -> Result<(), PerformError> + Send + Sync,
{
    async fn run(&self, ctx: &Context) -> Result<(), PerformError> {
        (self.0)(ctx)
    }
}

/// Builder for the ForEach combinator.
pub struct ForEachBuilder {
    var: String,
    elements: ElementsFn,
    mode: Mode,
    body: Action,
}

impl ForEachBuilder {
    /// Dispatch one worker per element instead of iterating in order.
    pub fn parallel(mut self) -> Self {
        self.mode = Mode::Parallel;
        self
    }

    pub fn build(self) -> Action {
        Action::new(Kind::ForEach {
            var: self.var,
            elements: self.elements,
            mode: self.mode,
            body: self.body,
        })
    }
}

/// Builder for the Attempt combinator.
///
/// A fault kind (`on`) and a recovery action are required before `build()`;
/// the ensure action is optional.
pub struct AttemptBuilder {
    target: Action,
    on: Option<FaultKind>,
    recovery: Option<Action>,
    ensure: Option<Action>,
}

impl AttemptBuilder {
    /// The kind of failure the recovery action observes.
    pub fn on(mut self, kind: FaultKind) -> Self {
        self.on = Some(kind);
        self
    }

    /// Action visited on a matching failure, with the cause bound under
    /// [`FAULT_VAR`](crate::context::FAULT_VAR). Recovery observes the
    /// failure; it does not suppress it.
    pub fn recover(mut self, action: Action) -> Self {
        self.recovery = Some(action);
        self
    }

    /// Action visited exactly once as the final step, whatever the outcome.
    pub fn ensure(mut self, action: Action) -> Self {
        self.ensure = Some(action);
        self
    }

    pub fn build(self) -> Result<Action, BuildError> {
        let on = self.on.ok_or(BuildError::MissingFaultKind)?;
        let recovery = self.recovery.ok_or(BuildError::MissingRecovery)?;
        Ok(Action::new(Kind::Attempt {
            target: self.target,
            on,
            recovery,
            ensure: self.ensure,
        }))
    }
}

/// Builder for the Retry combinator.
pub struct RetryBuilder {
    target: Action,
    on: FaultKind,
    tries: Option<Tries>,
    delay: Option<Duration>,
}

impl RetryBuilder {
    /// Restrict which failures are retried; defaults to `FaultKind::Any`.
    /// Non-matching failures bypass the retry loop entirely.
    pub fn on(mut self, kind: FaultKind) -> Self {
        self.on = kind;
        self
    }

    /// Retry up to `count` times after the first attempt.
    pub fn times(mut self, count: u32) -> Self {
        self.tries = Some(Tries::Limited(count));
        self
    }

    /// Retry until success or a non-matching failure.
    pub fn unbounded(mut self) -> Self {
        self.tries = Some(Tries::Unbounded);
        self
    }

    /// Blocking delay between attempts; must be greater than zero.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn build(self) -> Result<Action, BuildError> {
        let tries = self.tries.ok_or(BuildError::MissingRetryCount)?;
        let delay = self.delay.ok_or(BuildError::ZeroRetryDelay)?;
        if delay.is_zero() {
            return Err(BuildError::ZeroRetryDelay);
        }
        Ok(Action::new(Kind::Retry {
            target: self.target,
            on: self.on,
            tries,
            delay,
        }))
    }
}
