//! Route guards
//!
//! Decides, from the current session, whether a route renders, redirects or
//! waits for the startup auth probe. UX only; the backend enforces access.

use std::fmt;

use crate::domain::Session;

/// Storefront routes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Signup,
    VerifyOtp,
    Login,
    AdminDashboard,
    Category(String),
    Cart,
}

impl Route {
    /// Parse a path; unknown paths return `None`
    pub fn parse(path: &str) -> Option<Self> {
        let path = path.trim();
        let path = if path.len() > 1 { path.trim_end_matches('/') } else { path };

        let route = match path {
            "" | "/" => Route::Home,
            "/signup" => Route::Signup,
            "/verifyOtp" => Route::VerifyOtp,
            "/login" => Route::Login,
            "/secret-dashboard" => Route::AdminDashboard,
            "/cart" => Route::Cart,
            other => {
                let category = other.strip_prefix("/category/")?;
                if category.is_empty() || category.contains('/') {
                    return None;
                }
                Route::Category(category.to_string())
            }
        };
        Some(route)
    }

    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Signup => "/signup".to_string(),
            Route::VerifyOtp => "/verifyOtp".to_string(),
            Route::Login => "/login".to_string(),
            Route::AdminDashboard => "/secret-dashboard".to_string(),
            Route::Category(category) => format!("/category/{}", category),
            Route::Cart => "/cart".to_string(),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// What the front end should do with a navigation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Render,
    Redirect(Route),
    /// The startup auth probe has not settled yet
    Wait,
}

/// Resolve a navigation against the current session
pub fn resolve(route: &Route, session: &Session) -> Navigation {
    if session.is_checking_auth {
        return Navigation::Wait;
    }

    let redirect = match route {
        Route::Signup if session.is_signing_up => Some(Route::VerifyOtp),
        Route::VerifyOtp if session.is_verified => Some(Route::Home),
        Route::Login if session.is_authenticated() => Some(Route::Home),
        Route::AdminDashboard if !session.is_admin() => Some(Route::Login),
        Route::Cart if !session.is_authenticated() => Some(Route::Login),
        _ => None,
    };

    match redirect {
        Some(target) => Navigation::Redirect(target),
        None => Navigation::Render,
    }
}
