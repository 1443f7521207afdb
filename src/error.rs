//! Error types used by the quiesce primitives and their collaborators.
//!
//! This module defines four error enums:
//!
//! - [`GateError`] — invariant violations detected by an [`AdmissionGate`](crate::AdmissionGate).
//! - [`FrameError`] — malformed records found while decoding a harvested range.
//! - [`SinkError`] — failures reported by an external [`Sink`](crate::Sink) while flushing.
//! - [`RuntimeError`] — failures of the lifecycle runtime itself (signals, grace period).
//!
//! Expected outcomes (a dropped append, a sleep cut short by shutdown) are **not** errors;
//! they are reported through return values. All types provide `as_label` / `as_message`
//! helpers for logs.

use std::time::Duration;
use thiserror::Error;

/// # Invariant violations of an admission gate.
///
/// These indicate a logic error at the call site. The gate restores its
/// counter before reporting, so other callers keep seeing consistent state.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    /// `leave()` was called without a matching successful `enter()`.
    #[error("leave() without matching enter(); in-flight counter would drop below zero (in_flight={in_flight})")]
    Unbalanced {
        /// Counter value observed after the offending decrement was undone.
        in_flight: i64,
    },
}

impl GateError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use quiesce::GateError;
    ///
    /// let err = GateError::Unbalanced { in_flight: 0 };
    /// assert_eq!(err.as_label(), "gate_unbalanced");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            GateError::Unbalanced { .. } => "gate_unbalanced",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            GateError::Unbalanced { in_flight } => {
                format!("unbalanced leave; in_flight restored to {in_flight}")
            }
        }
    }
}

/// # Decoding failures of a harvested byte range.
///
/// A drained buffer never produces these; they indicate foreign or damaged input.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// The range ends before the frame starting at `offset` is complete.
    #[error("truncated frame at offset {offset}")]
    Truncated {
        /// Offset of the incomplete frame.
        offset: usize,
    },

    /// The frame at `offset` was never committed by its writer.
    #[error("uncommitted frame at offset {offset} (status={status:#04x})")]
    Uncommitted {
        /// Offset of the frame.
        offset: usize,
        /// Status byte found instead of the committed marker.
        status: u8,
    },
}

impl FrameError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            FrameError::Truncated { .. } => "frame_truncated",
            FrameError::Uncommitted { .. } => "frame_uncommitted",
        }
    }
}

/// # Errors produced by a sink while flushing a harvested buffer.
///
/// `Io` and `Rejected` may succeed when retried; `Closed` is terminal.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SinkError {
    /// The sink refused the batch (e.g. remote side busy).
    #[error("batch rejected: {reason}")]
    Rejected {
        /// The reason reported by the sink.
        reason: String,
    },

    /// Underlying I/O failure.
    #[error("sink i/o failed: {0}")]
    Io(#[from] std::io::Error),

    /// The sink has been closed and will never accept data again.
    #[error("sink closed")]
    Closed,
}

impl SinkError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use quiesce::SinkError;
    ///
    /// assert_eq!(SinkError::Closed.as_label(), "sink_closed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            SinkError::Rejected { .. } => "sink_rejected",
            SinkError::Io(_) => "sink_io",
            SinkError::Closed => "sink_closed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            SinkError::Rejected { reason } => format!("rejected: {reason}"),
            SinkError::Io(e) => format!("io: {e}"),
            SinkError::Closed => "sink closed".to_string(),
        }
    }

    /// Indicates whether flushing the same batch again may succeed.
    ///
    /// # Example
    /// ```
    /// use quiesce::SinkError;
    ///
    /// assert!(SinkError::Rejected { reason: "busy".into() }.is_retryable());
    /// assert!(!SinkError::Closed.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(self, SinkError::Rejected { .. } | SinkError::Io(_))
    }
}

/// # Errors produced by the lifecycle runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Grace period elapsed while registered workers were still running.
    #[error("shutdown timeout {grace:?} exceeded; {remaining} worker(s) still registered")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Number of workers that had not deregistered in time.
        remaining: usize,
    },

    /// Registering the OS signal listeners failed.
    #[error("signal registration failed: {0}")]
    Signal(#[from] std::io::Error),
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use quiesce::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), remaining: 2 };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::Signal(_) => "runtime_signal",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::GraceExceeded { grace, remaining } => {
                format!("grace exceeded after {grace:?}; remaining workers={remaining}")
            }
            RuntimeError::Signal(e) => format!("signal: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_error_retryability() {
        assert!(SinkError::Io(std::io::Error::other("disk")).is_retryable());
        assert!(
            SinkError::Rejected {
                reason: "busy".into()
            }
            .is_retryable()
        );
        assert!(!SinkError::Closed.is_retryable());
    }

    #[test]
    fn test_gate_error_display_mentions_counter() {
        let err = GateError::Unbalanced { in_flight: 0 };
        assert!(err.to_string().contains("in_flight=0"));
        assert_eq!(err.as_message(), "unbalanced leave; in_flight restored to 0");
    }

    #[test]
    fn test_grace_exceeded_message() {
        let err = RuntimeError::GraceExceeded {
            grace: Duration::from_millis(10),
            remaining: 3,
        };
        assert!(err.as_message().contains("remaining workers=3"));
    }
}
