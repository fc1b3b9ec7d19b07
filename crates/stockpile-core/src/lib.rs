//! # stockpile-core
//!
//! Resource kinds served by Stockpile and the rules shared by every layer:
//! identifier generation and validation, write-payload validation, and the
//! cache key layout for each kind.

pub mod error;
pub mod id;
pub mod product;
pub mod resource;
pub mod task;

pub use error::{CoreError, Result, ValidationError};
pub use id::{IdError, generate_id, validate_id};
pub use product::{Product, ProductInput};
pub use resource::{CREATED_AT_FIELD, ID_FIELD, Resource, UPDATED_AT_FIELD, Validate};
pub use task::{Task, TaskInput};
