//! Repository and request validation.

mod repository;
mod validation;
pub use repository::{FilterSpec, Repository};
pub use validation::RequestValidator;
