//! Utilities shared by the generator, the registry and the HTTP layer

pub mod db_errors;
pub mod envelope;
pub mod handlebars;

pub use envelope::{compose_code, ApiResponse};
pub use handlebars::{get_handlebars, write_string_to_file};
