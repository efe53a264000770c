//! Event Store boundary: raw usage events and billing lines.
//!
//! The engine only **reads** from this boundary. Events are immutable facts owned by
//! the upstream collaborator; late-arriving or corrected rows simply show up on the
//! next read.

pub mod billing;
pub mod in_memory;
pub mod source;
pub mod usage;

pub use billing::BillingLine;
pub use in_memory::InMemoryEventSource;
pub use source::{EventFilter, EventSource, SourceError};
pub use usage::UsageEvent;
