// Public API - what other modules can use
pub use engine::{replay_ratings, RatingEngine, RatingReplay};
pub use handlers::{recalculate_all, recalculate_rating, recalculate_xp};
pub use service::RecalculationService;
pub use xp::{replay_attendance, AttendanceReplay};

// Internal modules
pub mod engine;
mod handlers;
pub mod models;
pub mod repository;
mod service;
pub mod xp;
