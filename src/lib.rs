//////////////////////////
// lib.rs
//////////////////////////

pub mod types;
pub mod board;
pub mod moves;
pub mod game;
pub mod error;
pub mod config;
pub mod store;
pub mod session;
pub mod dispatcher;
pub mod server;

pub use types::*;
pub use board::Board;
pub use game::{Game, MoveOutcome};
pub use error::{MoveError, SessionError, StoreError};
pub use config::ServerConfig;
pub use store::{GameRecord, GameStore, IdentityResolver, MemoryStore, Role};
pub use session::{ConnectionId, Outbox, SessionRegistry};
pub use dispatcher::{Dispatcher, Flow};
pub use server::{routes, start_server};
