//! Utilities
//!
//! Common utilities used throughout the engine.

pub mod clock;
pub mod error;
pub mod ids;
pub mod paths;

pub use clock::*;
pub use error::*;
pub use ids::*;
pub use paths::*;
