//! Chat-platform boundary
//!
//! Interaction payload types, control-identifier parsing, the command and
//! component handler, and direct-message delivery.

pub mod control;
pub mod dm;
pub mod handler;
pub mod interaction;

pub use control::{ControlId, PageDirection, SelectValue};
pub use dm::{DirectMessenger, LogMessenger, RestMessenger};
pub use handler::ChatHandler;
pub use interaction::{Interaction, InteractionResponse};
