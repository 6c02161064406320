//! Application use cases. Orchestrate the codec via ports.

pub mod compose_service;
pub mod inbox;
pub mod persist_worker;
pub mod relay_service;

pub use compose_service::MessageComposer;
pub use inbox::{ChatLine, Inbox, LineBody};
pub use persist_worker::{PendingRecord, PersistWorker, RetryPolicy};
pub use relay_service::{DeliveryPolicy, RelayEvent, RelayHandle, RelayService, RelaySettings};
