//! Mock storefront backend for testing
//!
//! A small threaded HTTP server implementing the storefront API with cookie
//! sessions, so the reqwest transport and the refresh flow can be exercised
//! end to end without a real backend.
//!
//! - `POST /api/auth/*` issues `accessToken`/`refreshToken` cookies
//! - `GET /api/auth/getProfile` requires a live access token
//! - `POST /api/auth/refreshToken` trades the refresh cookie for a new access token
//! - `/api/products/*` serves an in-memory catalog; mutations are admin-only

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use serde_json::{json, Value as JsonValue};

/// The code every "emailed" OTP carries
pub const MOCK_OTP: &str = "4821";

#[derive(Debug, Clone)]
struct MockUser {
    id: String,
    name: String,
    email: String,
    password: String,
    admin: bool,
    verified: bool,
}

impl MockUser {
    fn profile(&self) -> JsonValue {
        let role = if self.admin { "admin" } else { "customer" };
        json!({
            "_id": self.id,
            "name": self.name,
            "email": self.email,
            "role": role,
        })
    }
}

#[derive(Default)]
struct Backend {
    users: Vec<MockUser>,
    products: Vec<JsonValue>,
    /// token -> user id
    access_tokens: HashMap<String, String>,
    refresh_tokens: HashMap<String, String>,
    next_id: u64,
    refresh_calls: usize,
}

struct HttpRequest {
    method: String,
    path: String,
    cookies: HashMap<String, String>,
    body: JsonValue,
}

struct HttpResponse {
    status: u16,
    body: JsonValue,
    set_cookies: Vec<String>,
}

impl HttpResponse {
    fn new(status: u16, body: JsonValue) -> Self {
        Self {
            status,
            body,
            set_cookies: Vec::new(),
        }
    }

    fn message(status: u16, message: &str) -> Self {
        Self::new(status, json!({ "message": message }))
    }

    fn with_cookies(mut self, cookies: Vec<String>) -> Self {
        self.set_cookies = cookies;
        self
    }
}

/// Mock storefront server for testing
pub struct MockStorefrontServer {
    port: u16,
    running: Arc<AtomicBool>,
    backend: Arc<Mutex<Backend>>,
    refresh_delay_ms: Arc<AtomicU64>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl MockStorefrontServer {
    /// Start a new mock server on a random available port
    pub fn start() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        let running = Arc::new(AtomicBool::new(true));
        let backend = Arc::new(Mutex::new(Backend::default()));
        let refresh_delay_ms = Arc::new(AtomicU64::new(0));

        // Non-blocking so the accept loop can notice shutdown
        listener.set_nonblocking(true)?;

        let thread_handle = {
            let running = Arc::clone(&running);
            let backend = Arc::clone(&backend);
            let refresh_delay_ms = Arc::clone(&refresh_delay_ms);
            thread::spawn(move || {
                while running.load(Ordering::SeqCst) {
                    match listener.accept() {
                        Ok((stream, _)) => {
                            let backend = Arc::clone(&backend);
                            let delay = Arc::clone(&refresh_delay_ms);
                            thread::spawn(move || handle_connection(stream, &backend, &delay));
                        }
                        Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                            thread::sleep(Duration::from_millis(5));
                        }
                        Err(_) => break,
                    }
                }
            })
        };

        Ok(Self {
            port,
            running,
            backend,
            refresh_delay_ms,
            thread_handle: Some(thread_handle),
        })
    }

    /// Base URL including the `/api` prefix
    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}/api", self.port)
    }

    /// Add an already-verified account
    pub fn add_user(&self, name: &str, email: &str, password: &str, admin: bool) {
        let mut backend = self.backend.lock().unwrap();
        let id = backend.next_id("user");
        backend.users.push(MockUser {
            id,
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            admin,
            verified: true,
        });
    }

    /// Seed a product; returns its id
    pub fn add_product(&self, name: &str, category: &str, featured: bool) -> String {
        let mut backend = self.backend.lock().unwrap();
        let id = backend.next_id("prod");
        backend.products.push(json!({
            "_id": id,
            "name": name,
            "description": format!("{} description", name),
            "price": 25.0,
            "category": category,
            "image": format!("https://img.example.com/{}.png", id),
            "isFeatured": featured,
        }));
        id
    }

    /// Invalidate every access token, as if they had all expired
    pub fn expire_access_tokens(&self) {
        self.backend.lock().unwrap().access_tokens.clear();
    }

    /// Invalidate every refresh token
    pub fn revoke_refresh_tokens(&self) {
        self.backend.lock().unwrap().refresh_tokens.clear();
    }

    pub fn set_refresh_delay(&self, delay: Duration) {
        self.refresh_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn refresh_calls(&self) -> usize {
        self.backend.lock().unwrap().refresh_calls
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MockStorefrontServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn handle_connection(mut stream: TcpStream, backend: &Mutex<Backend>, refresh_delay_ms: &AtomicU64) {
    let _ = stream.set_nonblocking(false);
    let Some(request) = read_request(&mut stream) else {
        return;
    };

    let route = request.path.strip_prefix("/api").unwrap_or(&request.path);
    if request.method == "POST" && route == "/auth/refreshToken" {
        let delay = refresh_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            thread::sleep(Duration::from_millis(delay));
        }
    }

    let response = backend.lock().unwrap().handle(&request);
    send_response(&mut stream, response);
}

fn read_request(stream: &mut TcpStream) -> Option<HttpRequest> {
    let mut data = Vec::new();
    let mut buffer = [0u8; 4096];

    let header_end = loop {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&buffer[..n]);
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&data[..header_end]).into_owned();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();

    let mut content_length = 0;
    let mut cookies = HashMap::new();
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match name.trim().to_ascii_lowercase().as_str() {
            "content-length" => content_length = value.parse().unwrap_or(0),
            "cookie" => {
                for pair in value.split(';') {
                    if let Some((k, v)) = pair.trim().split_once('=') {
                        cookies.insert(k.to_string(), v.to_string());
                    }
                }
            }
            _ => {}
        }
    }

    while data.len() < header_end + content_length {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buffer[..n]);
    }
    let body_end = (header_end + content_length).min(data.len());
    let body = serde_json::from_slice(&data[header_end..body_end]).unwrap_or(JsonValue::Null);

    Some(HttpRequest {
        method,
        path,
        cookies,
        body,
    })
}

fn send_response(stream: &mut TcpStream, response: HttpResponse) {
    let body = if response.body.is_null() {
        String::new()
    } else {
        response.body.to_string()
    };
    let reason = match response.status {
        200 => "OK",
        201 => "Created",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        _ => "Unknown",
    };

    let mut head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n",
        response.status,
        reason,
        body.len()
    );
    for cookie in &response.set_cookies {
        head.push_str(&format!("Set-Cookie: {}\r\n", cookie));
    }
    head.push_str("\r\n");

    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(body.as_bytes());
    let _ = stream.flush();
}

fn field<'a>(body: &'a JsonValue, key: &str) -> &'a str {
    body.get(key).and_then(JsonValue::as_str).unwrap_or("")
}

impl Backend {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }

    fn handle(&mut self, req: &HttpRequest) -> HttpResponse {
        let path = req.path.strip_prefix("/api").unwrap_or(&req.path);
        let product_id = path
            .strip_prefix("/products/")
            .filter(|rest| !rest.is_empty() && !rest.contains('/') && *rest != "featured");

        match (req.method.as_str(), path) {
            ("POST", "/auth/register") => self.register(&req.body),
            ("POST", "/auth/verifyOtp") => self.verify_otp(&req.body),
            ("POST", "/auth/resendOtp") => self.resend_otp(&req.body),
            ("POST", "/auth/login") => self.login(&req.body),
            ("POST", "/auth/logout") => self.logout(req),
            ("GET", "/auth/getProfile") => match self.current_user(req) {
                Some(user) => HttpResponse::new(200, user.profile()),
                None => HttpResponse::message(401, "Unauthorized - No access token provided"),
            },
            ("POST", "/auth/refreshToken") => self.refresh(req),
            ("GET", "/products/") => HttpResponse::new(200, JsonValue::Array(self.products.clone())),
            ("GET", "/products/featured") => {
                let featured: Vec<_> = self
                    .products
                    .iter()
                    .filter(|p| p["isFeatured"] == true)
                    .cloned()
                    .collect();
                HttpResponse::new(200, json!({ "products": featured }))
            }
            ("GET", p) if p.starts_with("/products/category/") => {
                let category = &p["/products/category/".len()..];
                let matching: Vec<_> = self
                    .products
                    .iter()
                    .filter(|prod| prod["category"] == category)
                    .cloned()
                    .collect();
                HttpResponse::new(200, JsonValue::Array(matching))
            }
            ("POST", "/products/") => self.admin(req, |backend| backend.create_product(&req.body)),
            ("DELETE", _) if product_id.is_some() => {
                let id = product_id.unwrap_or_default().to_string();
                self.admin(req, |backend| backend.delete_product(&id))
            }
            ("PATCH", _) if product_id.is_some() => {
                let id = product_id.unwrap_or_default().to_string();
                self.admin(req, |backend| backend.toggle_featured(&id))
            }
            _ => HttpResponse::message(404, "Not found"),
        }
    }

    fn issue_session(&mut self, user_id: &str) -> Vec<String> {
        let access = self.next_id("access");
        let refresh = self.next_id("refresh");
        self.access_tokens.insert(access.clone(), user_id.to_string());
        self.refresh_tokens.insert(refresh.clone(), user_id.to_string());
        vec![
            format!("accessToken={}; Path=/; HttpOnly", access),
            format!("refreshToken={}; Path=/; HttpOnly", refresh),
        ]
    }

    fn current_user(&self, req: &HttpRequest) -> Option<&MockUser> {
        let user_id = self.access_tokens.get(req.cookies.get("accessToken")?)?;
        self.users.iter().find(|u| &u.id == user_id)
    }

    fn admin(&mut self, req: &HttpRequest, action: impl FnOnce(&mut Self) -> HttpResponse) -> HttpResponse {
        match self.current_user(req).map(|user| user.admin) {
            None => HttpResponse::message(401, "Unauthorized - No access token provided"),
            Some(false) => HttpResponse::message(403, "Access denied - Admin only"),
            Some(true) => action(self),
        }
    }

    fn register(&mut self, body: &JsonValue) -> HttpResponse {
        let email = field(body, "email");
        if email.is_empty() || field(body, "password").is_empty() {
            return HttpResponse::message(400, "All fields are required");
        }
        if self.users.iter().any(|u| u.email == email) {
            return HttpResponse::message(400, "User already exists");
        }
        let id = self.next_id("user");
        self.users.push(MockUser {
            id,
            name: field(body, "name").to_string(),
            email: email.to_string(),
            password: field(body, "password").to_string(),
            admin: false,
            verified: false,
        });
        HttpResponse::message(201, "Verification code sent to your email")
    }

    fn verify_otp(&mut self, body: &JsonValue) -> HttpResponse {
        let email = field(body, "email");
        let Some(index) = self.users.iter().position(|u| u.email == email) else {
            return HttpResponse::message(404, "User not found");
        };
        if field(body, "otp") != MOCK_OTP {
            return HttpResponse::message(400, "Invalid or expired OTP");
        }

        self.users[index].verified = true;
        let user = self.users[index].clone();
        let cookies = self.issue_session(&user.id);
        let mut profile = user.profile();
        profile["message"] = json!("Email verified successfully");
        HttpResponse::new(200, profile).with_cookies(cookies)
    }

    fn resend_otp(&mut self, body: &JsonValue) -> HttpResponse {
        let email = field(body, "email");
        match self.users.iter().find(|u| u.email == email) {
            Some(user) if !user.verified => HttpResponse::message(200, "OTP resent successfully"),
            Some(_) => HttpResponse::message(400, "User already verified"),
            None => HttpResponse::message(404, "User not found"),
        }
    }

    fn login(&mut self, body: &JsonValue) -> HttpResponse {
        let email = field(body, "email");
        let password = field(body, "password");
        let Some(user) = self
            .users
            .iter()
            .find(|u| u.email == email && u.password == password && u.verified)
            .cloned()
        else {
            return HttpResponse::message(401, "invalid credentials");
        };

        let cookies = self.issue_session(&user.id);
        HttpResponse::new(200, json!({ "user": user.profile(), "message": "Logged in successfully" }))
            .with_cookies(cookies)
    }

    fn logout(&mut self, req: &HttpRequest) -> HttpResponse {
        if let Some(token) = req.cookies.get("accessToken") {
            self.access_tokens.remove(token);
        }
        if let Some(token) = req.cookies.get("refreshToken") {
            self.refresh_tokens.remove(token);
        }
        HttpResponse::message(200, "Logged out successfully").with_cookies(vec![
            "accessToken=; Path=/; Max-Age=0".to_string(),
            "refreshToken=; Path=/; Max-Age=0".to_string(),
        ])
    }

    fn refresh(&mut self, req: &HttpRequest) -> HttpResponse {
        self.refresh_calls += 1;
        let user_id = req
            .cookies
            .get("refreshToken")
            .and_then(|token| self.refresh_tokens.get(token))
            .cloned();
        let Some(user_id) = user_id else {
            return HttpResponse::message(401, "Invalid refresh token");
        };

        let access = self.next_id("access");
        self.access_tokens.insert(access.clone(), user_id);
        HttpResponse::message(200, "Token refreshed successfully")
            .with_cookies(vec![format!("accessToken={}; Path=/; HttpOnly", access)])
    }

    fn create_product(&mut self, body: &JsonValue) -> HttpResponse {
        if field(body, "name").is_empty() || field(body, "category").is_empty() {
            return HttpResponse::message(400, "Name and category are required");
        }
        let id = self.next_id("prod");
        let mut product = body.clone();
        product["_id"] = json!(id);
        product["isFeatured"] = json!(false);
        self.products.push(product.clone());
        HttpResponse::new(201, product)
    }

    fn delete_product(&mut self, id: &str) -> HttpResponse {
        let before = self.products.len();
        self.products.retain(|p| p["_id"] != id);
        if self.products.len() == before {
            HttpResponse::message(404, "Product not found")
        } else {
            HttpResponse::message(200, "Product deleted successfully")
        }
    }

    fn toggle_featured(&mut self, id: &str) -> HttpResponse {
        match self.products.iter_mut().find(|p| p["_id"] == id) {
            Some(product) => {
                let featured = product["isFeatured"] == true;
                product["isFeatured"] = json!(!featured);
                HttpResponse::new(200, product.clone())
            }
            None => HttpResponse::message(404, "Product not found"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::notifier::RecordingNotifier;
    use crate::config::{ApiSettings, Config};
    use crate::domain::result::Error;
    use crate::domain::NewProduct;
    use crate::ports::ApiRequest;
    use crate::services::{AuthProbe, SignupForm};
    use crate::StorefrontContext;
    use rust_decimal::Decimal;

    fn context(server: &MockStorefrontServer) -> (StorefrontContext, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::new());
        let config = Config::new(ApiSettings {
            base_url: server.base_url(),
            ..ApiSettings::default()
        });
        let ctx = StorefrontContext::new(config, notifier.clone()).unwrap();
        (ctx, notifier)
    }

    #[tokio::test]
    async fn test_signup_verify_then_profile_over_http() {
        let server = MockStorefrontServer::start().unwrap();
        let (ctx, _) = context(&server);

        ctx.session
            .signup(&SignupForm::new("Ann", "ann@x.com", "secret1", "secret1"))
            .await
            .unwrap();
        assert_eq!(ctx.session.snapshot().pending_email.as_deref(), Some("ann@x.com"));

        ctx.session.resend_otp().await.unwrap();
        ctx.session.verify_otp(MOCK_OTP).await.unwrap();

        let session = ctx.session.snapshot();
        assert!(session.pending_email.is_none());
        assert_eq!(session.user.unwrap().email, "ann@x.com");

        // Cookies from verification authenticate the probe
        assert_eq!(ctx.session.check_auth().await, AuthProbe::Authenticated);
    }

    #[tokio::test]
    async fn test_wrong_password_over_http() {
        let server = MockStorefrontServer::start().unwrap();
        server.add_user("Bo", "bo@x.com", "right", false);
        let (ctx, notifier) = context(&server);

        let err = ctx.session.login("bo@x.com", "wrong").await.unwrap_err();
        assert_eq!(err.status(), Some(401));
        assert_eq!(notifier.last_error().as_deref(), Some("invalid credentials"));
        assert!(ctx.session.snapshot().user.is_none());
        assert_eq!(server.refresh_calls(), 0);
    }

    #[tokio::test]
    async fn test_expired_access_token_refreshed_once_for_concurrent_requests() {
        let server = MockStorefrontServer::start().unwrap();
        server.add_user("Bo", "bo@x.com", "pw", false);
        server.set_refresh_delay(Duration::from_millis(300));
        let (ctx, _) = context(&server);

        ctx.session.login("bo@x.com", "pw").await.unwrap();
        server.expire_access_tokens();

        let (a, b, c) = tokio::join!(
            ctx.api.send(ApiRequest::get("/auth/getProfile")),
            ctx.api.send(ApiRequest::get("/auth/getProfile")),
            ctx.api.send(ApiRequest::get("/auth/getProfile")),
        );
        assert!(a.is_ok() && b.is_ok() && c.is_ok());
        assert_eq!(server.refresh_calls(), 1);
    }

    #[tokio::test]
    async fn test_revoked_refresh_token_forces_logout() {
        let server = MockStorefrontServer::start().unwrap();
        server.add_user("Bo", "bo@x.com", "pw", false);
        let (ctx, _) = context(&server);

        ctx.session.login("bo@x.com", "pw").await.unwrap();
        server.expire_access_tokens();
        server.revoke_refresh_tokens();

        let err = ctx.api.send(ApiRequest::get("/auth/getProfile")).await.unwrap_err();
        assert!(matches!(err, Error::AuthExpired { .. }));
        assert!(ctx.session.snapshot().user.is_none());
    }

    #[tokio::test]
    async fn test_admin_catalog_management_over_http() {
        let server = MockStorefrontServer::start().unwrap();
        server.add_user("Root", "root@x.com", "pw", true);
        let jeans = server.add_product("Jeans", "jeans", false);
        server.add_product("Tee", "t-shirts", true);
        let (ctx, notifier) = context(&server);

        ctx.session.login("root@x.com", "pw").await.unwrap();
        assert!(ctx.session.snapshot().is_admin());

        ctx.catalog.fetch_all().await.unwrap();
        assert_eq!(ctx.catalog.products().len(), 2);

        let created = ctx
            .catalog
            .create(&NewProduct::new("Cap", Decimal::new(1999, 2), "hats", "cap.png"))
            .await
            .unwrap();
        assert_eq!(created.price, Decimal::new(1999, 2));
        assert_eq!(ctx.catalog.products().len(), 3);

        assert!(ctx.catalog.toggle_featured(&jeans).await.unwrap());
        ctx.catalog.delete(&created.id).await.unwrap();

        let products = ctx.catalog.products();
        assert_eq!(products.len(), 2);
        assert!(products[0].is_featured);

        ctx.catalog.fetch_featured().await.unwrap();
        assert_eq!(ctx.catalog.products().len(), 2);
        ctx.catalog.fetch_by_category("t-shirts").await.unwrap();
        assert_eq!(ctx.catalog.products().len(), 1);

        let messages: Vec<_> = notifier.notifications().into_iter().map(|n| n.message).collect();
        assert!(messages.contains(&"Product updated successfully!".to_string()));
        assert!(messages.contains(&"Product deleted successfully!".to_string()));
    }

    #[tokio::test]
    async fn test_customer_cannot_create_products() {
        let server = MockStorefrontServer::start().unwrap();
        server.add_user("Bo", "bo@x.com", "pw", false);
        let (ctx, notifier) = context(&server);

        ctx.session.login("bo@x.com", "pw").await.unwrap();
        let err = ctx
            .catalog
            .create(&NewProduct::new("Cap", Decimal::new(5, 0), "hats", "cap.png"))
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(403));
        assert_eq!(notifier.last_error().as_deref(), Some("Access denied - Admin only"));
        assert!(ctx.catalog.products().is_empty());
    }

    #[tokio::test]
    async fn test_logout_clears_cookies() {
        let server = MockStorefrontServer::start().unwrap();
        server.add_user("Bo", "bo@x.com", "pw", false);
        let (ctx, _) = context(&server);

        ctx.session.login("bo@x.com", "pw").await.unwrap();
        ctx.session.logout().await.unwrap();
        assert!(ctx.session.snapshot().user.is_none());

        let err = ctx.api.send(ApiRequest::get("/auth/getProfile")).await.unwrap_err();
        assert!(matches!(err, Error::AuthExpired { .. }));
    }
}
