// Public API - what other modules can use
pub use handlers::{list_locked_months, lock_month, unlock_month};
pub use models::MonthKey;
pub use service::{ensure_open, MonthLockService};

// Internal modules
mod handlers;
pub mod models;
pub mod repository;
mod service;
