//! Database schemas for Wicket
//!
//! Defines the five session-link document structures. Every record carries a
//! chat `user`, a unique single-use `token`, and an immutable `generate_time`
//! that orders per-user history.

mod create_link;
mod send_link;
mod tally_link;
mod user_link;
mod vote_link;

pub use create_link::{
    CreateLinkDoc, CREATE_LINK_COLLECTION, MAX_VOTE_OPTIONS, MIN_VOTE_OPTIONS,
};
pub use send_link::{SendLinkDoc, SEND_LINK_COLLECTION};
pub use tally_link::{TallyLinkDoc, TALLY_LINK_COLLECTION};
pub use user_link::{UserLinkDoc, PLACEHOLDER_ADDRESS, USER_LINK_COLLECTION};
pub use vote_link::{VoteLinkDoc, VOTE_LINK_COLLECTION};
