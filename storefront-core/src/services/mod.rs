//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each store owns
//! its observable state and talks to the backend only through `ApiClient`.

pub mod api_client;
pub mod catalog;
pub mod guards;
pub mod otp;
pub mod session;
pub mod single_flight;

pub use api_client::ApiClient;
pub use catalog::{CatalogState, CatalogStore};
pub use guards::{resolve, Navigation, Route};
pub use otp::{OtpCode, ResendCooldown, RESEND_COOLDOWN};
pub use session::{AuthProbe, SessionState, SessionStore, SignupForm};
pub use single_flight::SingleFlight;
