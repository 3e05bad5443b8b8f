//! API client - every outbound request goes through here
//!
//! Wraps an `HttpTransport` with the refresh interceptor: a 401 on a
//! refreshable request triggers one session refresh (shared by every request
//! that hits a 401 while it is outstanding) followed by exactly one replay.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::config::ApiSettings;
use crate::domain::result::{Error, Result};
use crate::ports::{ApiRequest, ApiResponse, HttpTransport};
use crate::services::session::SessionState;
use crate::services::single_flight::SingleFlight;

/// HTTP client with the refresh-on-401 policy
pub struct ApiClient {
    transport: Arc<dyn HttpTransport>,
    session: SessionState,
    refresh: SingleFlight<Result<()>>,
    refresh_path: String,
    refresh_timeout: Duration,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn HttpTransport>, session: SessionState, settings: &ApiSettings) -> Self {
        Self {
            transport,
            session,
            refresh: SingleFlight::new(),
            refresh_path: settings.refresh_path.clone(),
            refresh_timeout: Duration::from_secs(settings.refresh_timeout_secs),
        }
    }

    pub fn transport_name(&self) -> &str {
        self.transport.name()
    }

    /// Whether a session refresh is currently outstanding
    pub fn is_refreshing(&self) -> bool {
        self.refresh.is_in_flight()
    }

    /// Send a request, refreshing the session and replaying once on 401
    ///
    /// Non-2xx responses become `Error::RequestFailed` carrying the server's
    /// message. A 401 that survives the replay becomes `Error::AuthExpired`.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let mut request = request;
        loop {
            tracing::debug!(
                method = request.method.as_str(),
                path = %request.path,
                retried = request.retried,
                "sending request"
            );
            let response = self.transport.execute(&request).await?;

            if !(response.is_unauthorized() && request.refreshable) {
                return into_result(response);
            }

            if request.retried {
                tracing::debug!(path = %request.path, "401 after replay, giving up");
                return Err(expired(&response, || {
                    "Session expired, please log in again".to_string()
                }));
            }

            request.retried = true;
            self.refresh_session().await?;
            tracing::debug!(path = %request.path, "replaying after refresh");
        }
    }

    /// Send a request and decode the JSON response body
    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let response = self.send(request).await?;
        serde_json::from_value(response.body)
            .map_err(|e| Error::Decode(format!("Failed to decode response: {}", e)))
    }

    /// Refresh the session, joining an outstanding refresh if there is one
    ///
    /// On failure the local user is cleared (once, by the flight) and every
    /// waiting caller receives the same `AuthExpired` error.
    async fn refresh_session(&self) -> Result<()> {
        let transport = Arc::clone(&self.transport);
        let session = self.session.clone();
        let request = ApiRequest::post(self.refresh_path.clone()).without_refresh();
        let timeout = self.refresh_timeout;

        self.refresh
            .run_exclusive(move || async move {
                tracing::info!(path = %request.path, "refreshing session");
                let outcome = match tokio::time::timeout(timeout, transport.execute(&request)).await {
                    Err(_) => Err(Error::auth_expired(format!(
                        "Session refresh timed out after {} seconds",
                        timeout.as_secs()
                    ))),
                    Ok(Err(e)) => Err(Error::auth_expired(format!("Session refresh failed: {}", e))),
                    Ok(Ok(response)) if response.is_success() => Ok(()),
                    Ok(Ok(response)) => Err(expired(&response, || {
                        format!("Session refresh rejected (HTTP {})", response.status)
                    })),
                };

                if let Err(e) = &outcome {
                    tracing::warn!(error = %e, "session refresh failed, forcing logout");
                    session.force_logout();
                }
                outcome
            })
            .await
    }
}

/// Auth-expired error, keeping the backend's message when it sent one
fn expired(response: &ApiResponse, fallback: impl FnOnce() -> String) -> Error {
    match response.server_message() {
        Some(message) => Error::server_auth_expired(message),
        None => Error::auth_expired(fallback()),
    }
}

fn into_result(response: ApiResponse) -> Result<ApiResponse> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(Error::RequestFailed {
            status: response.status,
            message: response.server_message(),
        })
    }
}
