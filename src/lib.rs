pub mod config;
pub mod executor;
pub mod model;
pub mod packaging;
pub mod traits;

// Re-export common types for convenience
pub use config::*;
pub use executor::*;
pub use model::*;
pub use traits::*;
