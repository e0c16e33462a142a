//! # beacon-net
//!
//! Wire encoding and the report uploader. The reporter serializes a
//! claimed batch into the envelope format, posts it through the
//! transport seam, and classifies the response into a delivery outcome
//! for the dispatcher. Nothing here touches storage.

pub mod envelope;
pub mod reporter;
pub mod transport;
pub mod wire;

pub use envelope::{EnvelopeContext, ReportEnvelope, WireEvent};
pub use reporter::{classify_status, Reporter};
pub use transport::HttpTransport;
