pub mod config;
pub mod error;
pub mod geometry;
pub mod math;
pub mod milling;
pub mod operations;
pub mod scene;

pub use config::ProjectConfig;
pub use error::{Result, SurfmillError};
