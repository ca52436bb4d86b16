// Public API - what other modules can use
pub use handlers::{get_rules, update_rules};
pub use models::{RuleConfig, ScoreRules, TierRules, FLOOR_TIER};
pub use service::RuleService;

// Internal modules
mod handlers;
pub mod models;
pub mod repository;
mod service;
