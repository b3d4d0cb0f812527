//! # Lanfire
//!
//! Authoritative multiplayer for 2D LAN arcade shooters.
//!
//! One server process owns the simulation. Clients find it with a UDP
//! broadcast, talk to it over a reliable TCP channel (lobby, lifecycle,
//! key and button input) and an unreliable UDP channel (per-tick state,
//! mouse motion), and mirror what it sends.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lanfire::prelude::*;
//!
//! # async fn run() -> Result<(), LanfireError> {
//! lanfire::logging::init();
//! let server = LanfireServer::builder().build().await?;
//! server.run().await
//! # }
//! ```
//!
//! And on a client:
//!
//! ```rust,no_run
//! use lanfire::prelude::*;
//!
//! # async fn play() -> Result<(), LanfireError> {
//! let client = LanfireClient::locate(DiscoveryConfig::default(), Ports::default()).await?;
//! client.send(Message::UpdateNickname { nickname: "alice".into() }).await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod error;
mod handler;
pub mod logging;
mod server;

pub use client::LanfireClient;
pub use config::{LanfireConfig, Ports};
pub use error::LanfireError;
pub use server::{LanfireServer, LanfireServerBuilder};

pub mod prelude {
    //! Everything an application built on Lanfire usually needs.

    pub use crate::{LanfireClient, LanfireConfig, LanfireError, LanfireServer, LanfireServerBuilder, Ports};
    pub use lanfire_discovery::DiscoveryConfig;
    pub use lanfire_lobby::LobbyView;
    pub use lanfire_protocol::{
        Channel, ClientId, ConfirmationType, ErrorType, Key, Message, MouseButton, ObjectId,
        RoomSummary,
    };
    pub use lanfire_session::{ClientMirror, SessionConfig, TickConfig};
    pub use lanfire_world::{Arena, Loadout, MovementConfig, WeaponKind};
}
