// Public API - what other modules can use
pub use calculators::daily_results;
pub use handlers::{player_stats, rank_changes};
pub use models::{DailyResult, PartnerRecord, PlayerStats, RankChange, RankChanges, RivalRecord};
pub use service::StatsService;

// Internal modules
pub mod calculators;
mod handlers;
mod models;
mod service;
