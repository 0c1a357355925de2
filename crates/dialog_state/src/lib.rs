//! Dialog state transformation layer for a multi-service conversational agent.
//!
//! The agent orchestrator owns a growing dialog record; every downstream
//! annotator, skill and selector takes its own reduced view of that record
//! and answers in its own shape. This crate holds the reshaping in both
//! directions:
//! - request formatters build consumer-specific, singleton-batched payloads
//!   from the record (windowed, pruned, or annotation-rewritten as the
//!   consumer requires);
//! - response normalizers fold heterogeneous positional replies back into
//!   the canonical hypothesis schema.
//!
//! All transformations are pure and synchronous. Anything that mutates works
//! on a deep copy, so the orchestrator may run formatters concurrently over
//! the same record. Transport, skill selection and hypothesis merging live
//! outside this crate.

pub mod annotations;
pub mod dialog;
pub mod error;
pub mod formatters;
pub mod normalizers;
pub mod pruning;
pub mod rewrite;
pub mod window;

pub use dialog::{Dialog, Hypothesis, Speaker, Turn, UtteranceText};
pub use error::{DialogStateError, Result};
pub use pruning::remove_anomalous_turns;
pub use rewrite::{rewrite_with_annotations, RewriteMode};
pub use window::{select_window, WindowPolicy};
