//! Taskboard Shared Library
//!
//! Wire types, validation rules and the client session cache used by the
//! backend, native clients and the WASM module.

pub mod errors;
pub mod location;
pub mod models;
pub mod session;
pub mod types;
pub mod validation;

// Re-export commonly used items
pub use errors::*;
pub use location::{parse_location, Location, LocationInput};
pub use models::{default_avatar_url, is_placeholder_avatar, TaskPriority, TaskStatus};
pub use session::{merge_identity, Session, SessionState, SessionStorage, VerificationFailure};
pub use types::*;
pub use validation::{FieldError, FieldErrors};
