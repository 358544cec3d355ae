//! Request dispatch with credential attachment and central 401 handling

use super::events::{AuthEvent, AuthEventListener};
use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::session::storage::{clear_session, stored_token, SessionStorage};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::{Arc, RwLock};

/// Whether a request carries the stored credential
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Auth {
    /// Attach the stored bearer credential; a 401 ends the session
    Bearer,
    /// No credential; a 401 is an ordinary backend rejection (login, register)
    Anonymous,
}

/// Successful (2xx) response
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl ApiResponse {
    /// Decode the body; an empty body decodes as JSON `null`
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        decode(&self.body)
    }
}

/// HTTP client for the backend services
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    storage: Arc<dyn SessionStorage>,
    listeners: RwLock<Vec<Arc<dyn AuthEventListener>>>,
}

impl ApiClient {
    /// Create a client with the configured base URL and timeout
    pub fn new(config: &ApiConfig, storage: Arc<dyn SessionStorage>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            base_url: config.resolved_base_url(),
            storage,
            listeners: RwLock::new(Vec::new()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Storage the credential is read from and cleared in
    pub fn storage(&self) -> &Arc<dyn SessionStorage> {
        &self.storage
    }

    /// Subscribe to authentication events
    pub fn add_listener(&self, listener: Arc<dyn AuthEventListener>) {
        match self.listeners.write() {
            Ok(mut listeners) => listeners.push(listener),
            Err(_) => tracing::error!("Auth listener registry poisoned"),
        }
    }

    // =========================================================================
    // Typed helpers
    // =========================================================================

    pub async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        self.execute(Method::GET, path, query, None, Auth::Bearer)
            .await?
            .json()
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body)?;
        self.execute(Method::POST, path, &[], Some(body), Auth::Bearer)
            .await?
            .json()
    }

    /// POST without credential and without session-ending 401 handling
    pub async fn post_anonymous<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body)?;
        self.execute(Method::POST, path, &[], Some(body), Auth::Anonymous)
            .await?
            .json()
    }

    pub async fn patch<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        self.execute(Method::PATCH, path, query, None, Auth::Bearer)
            .await?
            .json()
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        self.execute(Method::DELETE, path, &[], None, Auth::Bearer)
            .await
            .map(|_| ())
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Send one request.
    ///
    /// - 2xx: returned as `ApiResponse`.
    /// - 401 on a `Bearer` request: storage cleared, listeners notified,
    ///   `Error::Unauthorized` returned.
    /// - other non-2xx: `Error::Backend` with the body's `message`/`error`.
    /// - no response: logged, `Error::Network`; the session is left alone.
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<serde_json::Value>,
        auth: Auth,
    ) -> Result<ApiResponse> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http.request(method.clone(), &url);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = &body {
            request = request.json(body);
        }
        if auth == Auth::Bearer {
            if let Some(token) = stored_token(self.storage.as_ref()) {
                request = request.bearer_auth(token);
            }
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(%method, path, error = %e, "Network error");
                return Err(Error::Network(e.to_string()));
            }
        };

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED && auth == Auth::Bearer {
            self.handle_unauthorized(path);
            return Err(Error::Unauthorized);
        }

        let body = match response.bytes().await {
            Ok(bytes) => bytes.to_vec(),
            Err(e) => {
                tracing::error!(%method, path, error = %e, "Network error reading response");
                return Err(Error::Network(e.to_string()));
            }
        };

        if !status.is_success() {
            tracing::debug!(%method, path, status = status.as_u16(), "Backend rejected request");
            return Err(Error::Backend {
                status: status.as_u16(),
                message: extract_message(&body),
            });
        }

        Ok(ApiResponse { status, body })
    }

    fn handle_unauthorized(&self, path: &str) {
        tracing::warn!(path, "Credential rejected by backend, clearing session");
        if let Err(e) = clear_session(self.storage.as_ref()) {
            tracing::error!(error = %e, "Failed to clear persisted session");
        }

        let listeners: Vec<Arc<dyn AuthEventListener>> = match self.listeners.read() {
            Ok(listeners) => listeners.clone(),
            Err(_) => Vec::new(),
        };
        let event = AuthEvent::Unauthorized {
            path: path.to_string(),
        };
        for listener in listeners {
            listener.on_auth_event(&event);
        }
    }
}

/// Human-readable message from an error body (`message`, then `error`)
pub fn extract_message(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    ["message", "error"]
        .iter()
        .filter_map(|field| value.get(*field).and_then(|v| v.as_str()))
        .find(|text| !text.trim().is_empty())
        .map(str::to_string)
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(serde_json::from_slice(b"null")?);
    }
    Ok(serde_json::from_slice(body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::storage::{load_session, save_session, MemoryStorage};
    use crate::session::{Credential, Role, Session};
    use crate::testing::{make_token, EventCounter, FakeBackend};

    fn client_for(backend: &FakeBackend, storage: Arc<MemoryStorage>) -> ApiClient {
        ApiClient::new(&backend.api_config(), storage).unwrap()
    }

    fn seed(storage: &MemoryStorage) -> Session {
        let token = make_token(chrono::Utc::now().timestamp() + 3600);
        let session = Session::new("alice", [Role::Client], 1, Credential::new(token));
        save_session(storage, &session).unwrap();
        session
    }

    #[test]
    fn test_extract_message() {
        assert_eq!(
            extract_message(br#"{"message":"Solde insuffisant"}"#).as_deref(),
            Some("Solde insuffisant")
        );
        assert_eq!(
            extract_message(br#"{"error":"Bad Request","message":""}"#).as_deref(),
            Some("Bad Request")
        );
        assert_eq!(extract_message(b"<html>oops</html>"), None);
        assert_eq!(extract_message(b""), None);
    }

    #[test]
    fn test_decode_empty_body() {
        assert!(decode::<()>(b"").is_ok());
        let value: Option<i32> = decode(b"  ").unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_bearer_attached_when_present() {
        let backend = FakeBackend::start().await;
        let storage = Arc::new(MemoryStorage::new());
        let session = seed(&storage);
        let client = client_for(&backend, storage);

        let _: serde_json::Value = client.get("/echo-auth", &[]).await.unwrap();
        assert_eq!(
            backend.state.last_authorization().as_deref(),
            Some(format!("Bearer {}", session.token.as_str()).as_str())
        );
    }

    #[tokio::test]
    async fn test_no_bearer_without_credential() {
        let backend = FakeBackend::start().await;
        let client = client_for(&backend, Arc::new(MemoryStorage::new()));

        let _: serde_json::Value = client.get("/echo-auth", &[]).await.unwrap();
        assert_eq!(backend.state.last_authorization(), None);
    }

    #[tokio::test]
    async fn test_unauthorized_clears_storage_and_notifies() {
        let backend = FakeBackend::start().await;
        let storage = Arc::new(MemoryStorage::new());
        seed(&storage);
        let client = client_for(&backend, storage.clone());
        let counter = Arc::new(EventCounter::new());
        client.add_listener(counter.clone());

        let result: Result<serde_json::Value> = client.get("/always-401", &[]).await;
        assert!(matches!(result, Err(Error::Unauthorized)));
        assert!(load_session(storage.as_ref()).unwrap().is_none());
        assert_eq!(counter.unauthorized(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_unauthorized_one_event_each() {
        let backend = FakeBackend::start().await;
        let storage = Arc::new(MemoryStorage::new());
        seed(&storage);
        let client = client_for(&backend, storage.clone());
        let counter = Arc::new(EventCounter::new());
        client.add_listener(counter.clone());

        let calls = (0..3).map(|_| client.get::<serde_json::Value>("/always-401", &[]));
        let results = futures::future::join_all(calls).await;

        assert!(results.iter().all(|r| matches!(r, Err(Error::Unauthorized))));
        assert_eq!(counter.unauthorized(), 3);
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_anonymous_401_is_backend_rejection() {
        let backend = FakeBackend::start().await;
        let storage = Arc::new(MemoryStorage::new());
        seed(&storage);
        let client = client_for(&backend, storage.clone());
        let counter = Arc::new(EventCounter::new());
        client.add_listener(counter.clone());

        let result: Result<serde_json::Value> = client
            .post_anonymous(
                "/auth/login",
                &serde_json::json!({"username": "alice", "password": "wrong"}),
            )
            .await;

        match result {
            Err(Error::Backend { status, message }) => {
                assert_eq!(status, 401);
                assert_eq!(message.as_deref(), Some("Bad credentials"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(counter.unauthorized(), 0);
        assert!(load_session(storage.as_ref()).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_backend_error_message() {
        let backend = FakeBackend::start().await;
        let client = client_for(&backend, Arc::new(MemoryStorage::new()));

        let result: Result<serde_json::Value> = client.get("/always-400", &[]).await;
        match result {
            Err(Error::Backend { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message.as_deref(), Some("Invalid request"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_network_error_keeps_session() {
        // Bind then drop a listener to get a port nothing listens on
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let storage = Arc::new(MemoryStorage::new());
        seed(&storage);
        let config = ApiConfig {
            base_url: Some(format!("http://{}/api", addr)),
            timeout_secs: 2,
            ..Default::default()
        };
        let client = ApiClient::new(&config, storage.clone()).unwrap();
        let counter = Arc::new(EventCounter::new());
        client.add_listener(counter.clone());

        let result: Result<serde_json::Value> = client.get("/auth/validate", &[]).await;
        assert!(matches!(result, Err(Error::Network(_))));
        assert!(load_session(storage.as_ref()).unwrap().is_some());
        assert_eq!(counter.unauthorized(), 0);
    }
}
