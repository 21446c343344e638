pub mod config;
pub mod smoother;

pub use config::SmoothingConfig;
pub use smoother::DetectionSmoother;
