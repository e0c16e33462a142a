//! Seams between the subsystems.
//!
//! Storage, transport and time are consumed through these traits so the
//! dispatcher and session layers can be tested against in-memory fakes.
//! `Arc<T>` forwards every trait, letting shared handles be passed
//! where the trait is expected.

pub mod clock;
pub mod crash_source;
pub mod listener;
pub mod storage;
pub mod transport;

pub use clock::{IClock, SystemClock};
pub use crash_source::ICrashSource;
pub use listener::IDeliveryListener;
pub use storage::{IEventStorage, IKeyValueStorage, ISessionStorage};
pub use transport::{ITransport, TransportResponse};
