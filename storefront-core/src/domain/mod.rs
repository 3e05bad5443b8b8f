//! Core domain entities
//!
//! Pure data structures with validation logic - no I/O or external dependencies.

mod notification;
mod product;
pub mod result;
mod session;
mod user;

pub use notification::{Notification, NotificationLevel};
pub use product::{NewProduct, Product};
pub use session::{Session, SessionPhase};
pub use user::{Role, UserProfile};
