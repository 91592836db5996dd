//! Business logic services
//!
//! Services encapsulate business logic and coordinate between
//! repositories, the token service and avatar storage.

pub mod profile;
pub mod task;
pub mod user;

pub use profile::{ProfileForm, ProfileService};
pub use task::TaskService;
pub use user::UserService;
