// Public API - what other modules can use
pub use handlers::{
    approve_match, cancel_match, create_match, day_summary, delete_match, edit_match,
    force_confirm, get_match, list_matches, reject_match, submit_score,
};
pub use lifecycle::{transition, MatchAction};
pub use models::{MatchModel, MatchStatus, NewMatch};
pub use service::MatchService;

// Internal modules
mod handlers;
pub mod lifecycle;
pub mod models;
pub mod repository;
mod service;
pub mod types;
