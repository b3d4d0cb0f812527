//! Match simulation for Lanfire.
//!
//! The server side runs one [`ServerSession`] per started room: a
//! fixed-rate loop that applies input, fires weapons, moves objects,
//! resolves hits, and replicates state. The client side keeps a
//! [`ClientMirror`] fed by what the server sends.
//!
//! # Key types
//!
//! - [`ServerSession`] — the authoritative simulation of one match
//! - [`SessionHandle`] — feeds input and departures into a running match
//! - [`TickScheduler`] — fixed-timestep timing with overrun handling
//! - [`ClientMirror`] — shadows of server objects plus local prediction

mod error;
mod mirror;
mod server;
mod tick;

pub use error::SessionError;
pub use mirror::{ClientMirror, DEFAULT_PREDICTION_TTL, MatchOutcome, PredictedShot, ShadowObject};
pub use server::{ServerSession, SessionCommand, SessionConfig, SessionEnd, SessionHandle};
pub use tick::{TickConfig, TickInfo, TickMetrics, TickPolicy, TickScheduler};
