//! Parlor - game engines for a social deduction party-game platform
//!
//! This crate provides the server-authoritative core of Parlor:
//! - An immutable event model with per-player visibility filtering
//! - The polymorphic game contract (`Action -> validate -> process -> events`)
//! - Two game engines: One Night-style werewolf and an Avalon-style quest game
//! - Room orchestration: roster, append-only event log, game lifecycle
//! - A registry mapping game-type strings to constructors and config parsers
//!
//! The crate is transport-agnostic: no async, no I/O. The companion server
//! crate owns the WebSocket plumbing, the room store, and the timeout sweep.
//!
//! # Modules
//!
//! - [`event`]: events and visibility predicates
//! - [`game`]: the `Game`/`GameConfig` traits and the action envelope
//! - [`player`]: anonymous session-token players
//! - [`room`]: room lifecycle and per-viewer log filtering
//! - [`registry`]: game-type registration and dispatch
//! - [`werewolf`], [`avalon`]: the two shipped game engines

pub mod avalon;
pub mod event;
pub mod game;
pub mod player;
pub mod registry;
pub mod room;
pub mod werewolf;

// Re-export commonly used types
pub use event::{EventError, EventVisibility, GameEvent, SYSTEM_ACTOR};
pub use game::{Action, ConfigError, Game, GameConfig, GameError, GamePhase, GameResults};
pub use player::Player;
pub use registry::{Registry, RegistryError};
pub use room::{Room, RoomError, RoomState, RoomStatus};
