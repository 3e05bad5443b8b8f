//! Session domain model

use serde::Serialize;

use super::UserProfile;

/// Where the visitor is in the signup/verification flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Anonymous,
    PendingVerification,
    Authenticated,
}

/// Client-side authentication state
///
/// `pending_email` is only ever set while `is_signing_up` is true; the
/// session store keeps the two in lockstep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub user: Option<UserProfile>,
    pub pending_email: Option<String>,
    pub is_verified: bool,
    pub is_signing_up: bool,
    pub is_checking_auth: bool,
    pub is_loading: bool,
    pub is_resend_loading: bool,
}

impl Default for Session {
    /// A freshly started app is "checking" until the startup probe settles.
    fn default() -> Self {
        Self {
            user: None,
            pending_email: None,
            is_verified: false,
            is_signing_up: false,
            is_checking_auth: true,
            is_loading: false,
            is_resend_loading: false,
        }
    }
}

impl Session {
    pub fn phase(&self) -> SessionPhase {
        if self.user.is_some() {
            SessionPhase::Authenticated
        } else if self.is_signing_up && self.pending_email.is_some() {
            SessionPhase::PendingVerification
        } else {
            SessionPhase::Anonymous
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.user.as_ref().map_or(false, UserProfile::is_admin)
    }
}
