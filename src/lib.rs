// Library crate for the club league server
// This file exposes the public API for integration tests

pub mod app;
pub mod audit;
pub mod auth;
pub mod config;
pub mod matches;
pub mod month_lock;
pub mod player;
pub mod rating;
pub mod rules;
pub mod shared;
pub mod stats;
pub mod tournament;

// Re-export commonly used types for easier access in tests
pub use app::build_router;
pub use auth::{Principal, Role, TokenConfig};
pub use matches::{MatchModel, MatchService, MatchStatus, NewMatch};
pub use player::{PlayerModel, PlayerService};
pub use rating::RecalculationService;
pub use shared::{AppError, AppState};
