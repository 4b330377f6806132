pub mod services;

// Re-export commonly used items
pub use services::*;
