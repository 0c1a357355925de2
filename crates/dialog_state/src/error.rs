//! Error taxonomy for the dialog state layer.
//!
//! Three failure classes cross this layer's boundary. None of them are caught
//! inside the crate: formatters and normalizers propagate them to the
//! orchestrator, which decides whether to skip the consumer for this turn,
//! retry, or surface a degraded fallback hypothesis.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DialogStateError {
    /// The requested turn or window lies beyond the available history
    /// (e.g. asking for the last bot turn before the bot has spoken).
    #[error("out of range: {what}")]
    OutOfRange { what: String },

    /// A required annotation is absent on the target turn. Annotation
    /// presence is guaranteed by the pipeline order upstream, so this points
    /// at an ordering bug rather than a data anomaly.
    #[error("missing annotation `{annotator}`: {detail}")]
    MissingAnnotation { annotator: String, detail: String },

    /// A downstream reply has an arity or batch shape outside the enumerated
    /// contract for its consumer family.
    #[error("malformed reply: {reason}")]
    MalformedReply { reason: String },
}

pub type Result<T> = std::result::Result<T, DialogStateError>;

impl DialogStateError {
    pub(crate) fn out_of_range(what: impl Into<String>) -> Self {
        Self::OutOfRange { what: what.into() }
    }

    pub(crate) fn missing_annotation(annotator: &str, detail: impl Into<String>) -> Self {
        Self::MissingAnnotation {
            annotator: annotator.to_string(),
            detail: detail.into(),
        }
    }

    pub(crate) fn malformed_reply(reason: impl Into<String>) -> Self {
        Self::MalformedReply {
            reason: reason.into(),
        }
    }
}
