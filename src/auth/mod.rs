// Public API - what other modules can use
pub use middleware::jwt_auth;
pub use role::{authorize, Permission, Role};
pub use token::TokenConfig;
pub use types::{Claims, Principal};

// Internal modules
mod middleware;
mod role;
mod token;
mod types;
