//! Session-link lifecycle management

pub mod lifecycle;
pub mod token;

pub use lifecycle::{is_valid_address, LinkKind, LinkService};
