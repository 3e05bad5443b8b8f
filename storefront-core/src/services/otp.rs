//! OTP code parsing and the resend cooldown

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use tokio::time::Instant;

use crate::domain::result::{Error, Result};

/// Number of digits in an emailed verification code
pub const OTP_LENGTH: usize = 4;

/// Default wait between resend requests
pub const RESEND_COOLDOWN: Duration = Duration::from_secs(30);

static OTP_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();

fn is_otp(input: &str) -> bool {
    OTP_PATTERN
        .get_or_init(|| Regex::new(r"^[0-9]{4}$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(input))
}

/// A syntactically valid verification code
#[derive(Clone, PartialEq, Eq)]
pub struct OtpCode(String);

impl OtpCode {
    /// Parse user input; surrounding whitespace is ignored
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if is_otp(trimmed) {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(Error::validation(format!(
                "Verification code must be exactly {} digits",
                OTP_LENGTH
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for OtpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("OtpCode(****)")
    }
}

/// Countdown gating the "resend code" action
#[derive(Debug, Clone)]
pub struct ResendCooldown {
    period: Duration,
    started: Instant,
}

impl ResendCooldown {
    /// Start a cooldown now (a code was just sent)
    pub fn start(period: Duration) -> Self {
        Self {
            period,
            started: Instant::now(),
        }
    }

    pub fn remaining(&self) -> Duration {
        self.period.saturating_sub(self.started.elapsed())
    }

    pub fn can_resend(&self) -> bool {
        self.remaining().is_zero()
    }

    pub fn restart(&mut self) {
        self.started = Instant::now();
    }
}

impl Default for ResendCooldown {
    fn default() -> Self {
        Self::start(RESEND_COOLDOWN)
    }
}
