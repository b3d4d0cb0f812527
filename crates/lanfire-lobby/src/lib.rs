//! Lobby management for Lanfire.
//!
//! Everything here is synchronous: operations return the messages they
//! produce as [`Outbound`](lanfire_protocol::Outbound) values and the
//! server routes them. The server keeps [`ClientRegistry`] and
//! [`RoomRegistry`] behind locks, so every join, leave, and start is
//! serialized.
//!
//! # Key types
//!
//! - [`ClientRegistry`] / [`ClientInfo`] — connected clients and nicknames
//! - [`RoomRegistry`] — creates rooms, tracks which client is in which
//!   room, and drives each [`Room`] through its [`RoomState`]s
//! - [`RoomChange`] — the outcome of a room operation
//! - [`LobbyError`] — rejections, each mapped to a wire
//!   [`ErrorType`](lanfire_protocol::ErrorType)
//! - [`LobbyView`] — the client's side: lobby state rebuilt from what
//!   the server sent

mod clients;
mod error;
mod registry;
mod room;
mod view;

pub use clients::{ClientInfo, ClientRegistry, MAX_NICKNAME_LEN};
pub use error::LobbyError;
pub use registry::{MatchStart, RoomChange, RoomRegistry};
pub use room::{MAX_ROOM_NAME_LEN, MAX_ROOM_PLAYERS, Member, Room, RoomState};
pub use view::LobbyView;
