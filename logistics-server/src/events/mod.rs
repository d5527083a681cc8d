//! Domain Events
//!
//! In-process publish/subscribe with fire-and-forget observers. The bus is
//! an explicitly constructed object injected through `ServerState`: there
//! is no global singleton.

mod bus;
mod email;
mod observers;
pub mod types;

pub use bus::{EventBus, EventHandler};
pub use email::{EmailService, MailTransport, OutgoingEmail, RecordingTransport};
pub use observers::register_observers;
