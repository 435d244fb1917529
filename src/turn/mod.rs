//! Session flow.
//!
//! The coordinator walks a session through its phases, the queue collects
//! orders from concurrent clients, and links abstract the clients.

pub mod coordinator;
pub mod link;
pub mod queue;

pub use coordinator::{Coordinator, GameOutcome, SessionError, TurnPhase};
pub use link::{ChannelLink, ClientEnd, LinkError, PlayerLink};
pub use queue::OrderQueue;
