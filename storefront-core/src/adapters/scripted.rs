//! Scripted in-memory transport
//!
//! A programmable backend for tests: a handler closure produces the response
//! for each request, optional per-path delays simulate slow endpoints, and
//! every request is recorded so tests can assert on exactly what was sent.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::result::{Error, Result};
use crate::ports::{ApiRequest, ApiResponse, HttpMethod, HttpTransport};

type Handler = Box<dyn Fn(&ApiRequest) -> ApiResponse + Send + Sync>;

pub struct ScriptedTransport {
    handler: Handler,
    delays: Mutex<HashMap<String, Duration>>,
    calls: Mutex<Vec<ApiRequest>>,
    unreachable: AtomicBool,
}

impl ScriptedTransport {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&ApiRequest) -> ApiResponse + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            delays: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            unreachable: AtomicBool::new(false),
        }
    }

    /// Delay every response for `path`; the handler runs after the delay
    pub fn set_delay(&self, path: &str, delay: Duration) {
        lock(&self.delays).insert(path.to_string(), delay);
    }

    /// Fail every request as if the network were down
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Every request received so far, in arrival order
    pub fn calls(&self) -> Vec<ApiRequest> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self, method: HttpMethod, path: &str) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|call| call.method == method && call.path == path)
            .count()
    }

    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse> {
        lock(&self.calls).push(request.clone());

        if self.unreachable.load(Ordering::SeqCst) {
            return Err(Error::unreachable("scripted backend is offline"));
        }

        let delay = lock(&self.delays).get(&request.path).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        Ok((self.handler)(request))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
