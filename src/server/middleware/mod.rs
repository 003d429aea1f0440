pub mod logging;
pub mod validation;

pub use logging::logging_layer;
pub use validation::{Validate, ValidatedJson, ValidationError};
