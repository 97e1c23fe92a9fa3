//! Post-commit change notifications.
//!
//! The stock core emits a [`ChangeEvent`] after every committed mutation. The
//! delivery side (websocket push, message broker, ...) lives behind the
//! [`ChangeNotifier`] port and is never allowed to fail a committed write.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{ChangeNotifier, NoopNotifier, Subscription};
pub use envelope::ChangeEvent;
pub use event::ChangeTopic;
pub use in_memory_bus::{InMemoryNotifier, InMemoryNotifierError};
