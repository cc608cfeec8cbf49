//! Byte-range audio delivery.
//!
//! [`StreamResponder`] evaluates a request and builds headers;
//! [`StreamSession`] owns the reader behind the body.

pub mod responder;
pub mod session;

pub use responder::StreamResponder;
pub use session::{AbortReason, PhaseTracker, SessionPhase, StreamSession};
