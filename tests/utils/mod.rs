pub mod actions;
pub mod assertions;
pub mod setup;

// Re-export main utilities for use by test files
#[allow(unused_imports)]
pub use assertions::{assert_conflict, assert_validation, PlayerAssertion};
#[allow(unused_imports)]
pub use setup::{june, TestSetup, TestSetupBuilder};
