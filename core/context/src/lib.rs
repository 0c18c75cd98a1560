//! The [`Context`] is a general purpose immutable container to carry scoped values around.
//!
//! Contexts are organised into a tree structure:
//!
//! - A root context represents the general process wide scope.
//! - Derived contexts represents a narrower scope within their parent with additional
//!   or updated information attached to them.
//!
//! For example: [`Context`]s provide access to the current [`Logger`].
//! For the root context this is the process-wide logger with no additional attributes.
//! Entitlement tasks instead run with a derived context whose [`Logger`] is decorated
//! with the resource kind and ID the task operates on.
//!
//! ## Deadlines
//!
//! A [`Context`] can carry a deadline for the operation it scopes.
//! Operations that may wait (such as submitting work to a saturated pool) must not wait
//! past the deadline of the context they are given.
//!
//! Deadlines are NOT inherited by work that outlives the operation that started it:
//! use [`ContextBuilder::detached`] to drop the deadline when deriving such contexts.
use std::time::Duration;
use std::time::Instant;

use opentelemetry_api::trace::TraceContextExt;
use opentelemetry_api::trace::TraceId;
use opentelemetry_api::Context as OtelContext;
use slog::Logger;
use slog::OwnedKV;
use slog::SendSyncRefUnwindSafeKV;

/// The [`Context`] is a general purpose container to carry scoped values around.
///
/// Refer to the [crate level docs](crate) for details.
#[derive(Clone, Debug)]
pub struct Context {
    /// Point in time after which the operation scoped by this context should give up.
    ///
    /// The value `None` indicates the operation has no time bound.
    pub deadline: Option<Instant>,

    /// Logger with contextual attributes attached to it.
    pub logger: Logger,
}

impl Context {
    /// Derive a new [`Context`] by making changes to the current one.
    pub fn derive(&self) -> ContextBuilder {
        ContextBuilder {
            deadline: self.deadline,
            logger: self.logger.clone(),
        }
    }

    /// Derive a new [`Context`] by making changes to the current one using the provided callback.
    pub fn derive_with<F>(&self, callback: F) -> Context
    where
        F: FnOnce(ContextBuilder) -> ContextBuilder,
    {
        let builder = callback(self.derive());
        builder.build()
    }

    /// Time left until the context deadline, if one is set.
    ///
    /// Expired deadlines return a zero [`Duration`].
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Initialise a new root context with no values attached.
    pub fn root(logger: Logger) -> ContextBuilder {
        ContextBuilder {
            deadline: None,
            logger,
        }
    }
}

/// A builder for root and derived contexts.
pub struct ContextBuilder {
    deadline: Option<Instant>,
    logger: Logger,
}

impl ContextBuilder {
    /// Finalise the build process and return a new [`Context`].
    pub fn build(self) -> Context {
        Context {
            deadline: self.deadline,
            logger: self.logger,
        }
    }

    /// Set the deadline of the new [`Context`] to an exact point in time.
    ///
    /// Derived contexts can't extend the deadline of their parent:
    /// the earliest of the two deadlines is kept.
    pub fn deadline(mut self, deadline: Instant) -> Self {
        self.deadline = match self.deadline {
            Some(current) if current < deadline => Some(current),
            _ => Some(deadline),
        };
        self
    }

    /// Drop any deadline inherited from the parent [`Context`].
    ///
    /// Use this for work scheduled by an operation that needs to outlive it.
    pub fn detached(mut self) -> Self {
        self.deadline = None;
        self
    }

    /// Decorate the [`Context`]'s logger with the trace ID of the current OpenTelemetry span.
    pub fn log_trace(self) -> Self {
        let context = OtelContext::current();
        let span = context.span();
        let trace_id = span.span_context().trace_id();
        if trace_id == TraceId::INVALID {
            self
        } else {
            let trace_id = trace_id.to_string();
            self.log_values(slog::o!("trace_id" => trace_id))
        }
    }

    /// Update the [`Context`] logger to attach new log key/pair values.
    pub fn log_values<T>(mut self, entries: OwnedKV<T>) -> Self
    where
        T: SendSyncRefUnwindSafeKV + 'static,
    {
        self.logger = self.logger.new(entries);
        self
    }

    /// Set the deadline of the new [`Context`] to the given amount of time from now.
    pub fn timeout(self, timeout: Duration) -> Self {
        self.deadline(Instant::now() + timeout)
    }
}

#[cfg(any(test, feature = "test-fixture"))]
impl Context {
    /// Create an empty context useful for test.
    pub fn fixture() -> Context {
        let logger = Logger::root(slog::Discard, slog::o!());
        Context {
            deadline: None,
            logger,
        }
    }
}
