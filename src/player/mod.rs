// Public API - what other modules can use
pub use handlers::{
    add_player, approve_signup, deactivate_player, delete_player, get_player, list_players,
    ranking, reject_signup, set_role, signup, update_player,
};
pub use bootstrap::seed_super_admin;
pub use models::{PlayerModel, STARTING_SCORE};
pub use service::PlayerService;

// Internal modules
mod bootstrap;
mod handlers;
pub mod models;
pub mod repository;
mod service;
pub mod types;
