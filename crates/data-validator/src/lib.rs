//! Data Validation and Normalization
//!
//! Provides range checking for machine readings and the min-max scaling used
//! for tool wear.

mod error;
mod normalizer;
mod validator;

pub use error::ValidationError;
pub use normalizer::WearScale;
pub use validator::{ReadingValidator, ValidationConfig, ValidationResult};
