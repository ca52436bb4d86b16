// Public API - what other modules can use
pub use generator::{plan_tournament, split_groups, GroupPlan, Pairing, TournamentMode};
pub use handlers::generate_tournament;
pub use service::{TournamentResult, TournamentService};

// Internal modules
pub mod generator;
mod handlers;
mod service;
