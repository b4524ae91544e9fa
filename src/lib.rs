pub mod config;
pub mod error;
pub mod playback;
pub mod pose;
pub mod scaler;
pub mod trajectory;

pub use error::{ReplayError, Result};
