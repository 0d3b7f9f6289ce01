//! Client fan-out for the flowbridge daemon
//!
//! This crate owns the set of connected browser clients and the status
//! backlog, and knows how to push events at them. It manages multiple
//! concurrent clients, best-effort delivery, and the one-shot catch-up of
//! status lines queued before anyone was connected.
//!
//! # Delivery model
//!
//! Each client is represented by an unbounded outbound channel; the task
//! that owns the actual socket drains it. Sending therefore never blocks
//! the broadcaster, and a slow client cannot stall delivery to the rest. A
//! closed channel means the client went away: it is pruned on the next
//! broadcast and delivery to the others is unaffected.
//!
//! # Status backlog
//!
//! System status lines raised before any client connected (`serial-open`,
//! `counter-reset`) sit in a FIFO queue. The first client(s) to connect
//! drain it, in order, exactly once; later clients see none of it.

pub mod backlog;
pub mod client;
pub mod error;

pub use backlog::StatusBacklog;
pub use client::{ClientId, ClientManager};
pub use error::{BroadcasterError, Result};
