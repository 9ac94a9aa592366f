//! Typed HTTP client for the Ionix API.

mod optimistic;
mod session;

pub use optimistic::OptimisticList;
pub use session::{ActiveSession, Session, SessionState};

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{IdentityLoginRequest, LoginRequest, ProfileUpdate, RegisterRequest};
use crate::entity::{AuthResponse, Resource, UserProfile};
use crate::error::{IonixError, Result};
use crate::service::{AnalyticsSummary, ChatRequest, ChatResponse};

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
pub struct Deleted {
    pub id: Uuid,
}

/// Map a failed response back onto the error taxonomy.
pub fn error_from_status(status: StatusCode, message: String) -> IonixError {
    match status {
        StatusCode::BAD_REQUEST => IonixError::Validation(message),
        StatusCode::UNAUTHORIZED => IonixError::Auth(message),
        StatusCode::FORBIDDEN => IonixError::Authorization(message),
        StatusCode::NOT_FOUND => IonixError::NotFound(message),
        StatusCode::CONFLICT => IonixError::Conflict(message),
        StatusCode::BAD_GATEWAY => IonixError::Upstream(message),
        _ => IonixError::Internal(format!("{}: {}", status, message)),
    }
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Session,
}

impl ApiClient {
    /// `base_url` is the server origin, e.g. `http://localhost:5000`.
    pub fn new(base_url: impl Into<String>, session: Session) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}/api{}", self.base_url, path))
    }

    async fn send<T: DeserializeOwned>(&mut self, request: RequestBuilder) -> Result<T> {
        let request = match self.session.bearer()? {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.message,
            Err(_) => status.canonical_reason().unwrap_or("Request failed").to_string(),
        };
        if status == StatusCode::UNAUTHORIZED && self.session.is_active() {
            self.session.expire()?;
        }
        Err(error_from_status(status, message))
    }

    async fn authenticate(&mut self, request: RequestBuilder) -> Result<AuthResponse> {
        let response: AuthResponse = self.send(request).await?;
        self.session.activate(response.clone())?;
        Ok(response)
    }

    // ========================================================================
    // Users
    // ========================================================================

    pub async fn register(&mut self, request: &RegisterRequest) -> Result<AuthResponse> {
        let builder = self.request(Method::POST, "/users/register").json(request);
        self.authenticate(builder).await
    }

    pub async fn login(&mut self, email: &str, password: &str) -> Result<AuthResponse> {
        let body = LoginRequest {
            email: Some(email.to_string()),
            password: Some(password.to_string()),
        };
        let builder = self.request(Method::POST, "/users/login").json(&body);
        self.authenticate(builder).await
    }

    pub async fn login_with_google(&mut self, id_token: &str) -> Result<AuthResponse> {
        let body = IdentityLoginRequest {
            token: id_token.to_string(),
        };
        let builder = self.request(Method::POST, "/users/google").json(&body);
        self.authenticate(builder).await
    }

    pub async fn me(&mut self) -> Result<UserProfile> {
        let builder = self.request(Method::GET, "/users/me");
        self.send(builder).await
    }

    pub async fn update_profile(&mut self, update: &ProfileUpdate) -> Result<AuthResponse> {
        let builder = self.request(Method::PUT, "/users/profile").json(update);
        self.authenticate(builder).await
    }

    pub async fn upgrade_premium(&mut self) -> Result<AuthResponse> {
        let builder = self.request(Method::PUT, "/users/premium");
        self.authenticate(builder).await
    }

    pub fn logout(&mut self) -> Result<()> {
        self.session.logout()
    }

    // ========================================================================
    // Tasks, notes and events
    // ========================================================================

    pub async fn list<R: Resource>(&mut self) -> Result<Vec<R>> {
        let builder = self.request(Method::GET, &format!("/{}", R::COLLECTION));
        self.send(builder).await
    }

    pub async fn create<R>(&mut self, input: &R::Create) -> Result<R>
    where
        R: Resource,
        R::Create: Serialize,
    {
        let builder = self
            .request(Method::POST, &format!("/{}", R::COLLECTION))
            .json(input);
        self.send(builder).await
    }

    pub async fn update<R>(&mut self, id: Uuid, update: &R::Update) -> Result<R>
    where
        R: Resource,
        R::Update: Serialize,
    {
        let builder = self
            .request(Method::PUT, &format!("/{}/{}", R::COLLECTION, id))
            .json(update);
        self.send(builder).await
    }

    pub async fn delete<R: Resource>(&mut self, id: Uuid) -> Result<Uuid> {
        let builder = self.request(Method::DELETE, &format!("/{}/{}", R::COLLECTION, id));
        let deleted: Deleted = self.send(builder).await?;
        Ok(deleted.id)
    }

    // ========================================================================
    // Analytics and AI
    // ========================================================================

    pub async fn analytics(&mut self) -> Result<AnalyticsSummary> {
        let builder = self.request(Method::GET, "/analytics");
        self.send(builder).await
    }

    pub async fn chat(&mut self, request: &ChatRequest) -> Result<ChatResponse> {
        let builder = self.request(Method::POST, "/ai/chat").json(request);
        self.send(builder).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_from_status() {
        let cases = [
            (StatusCode::BAD_REQUEST, "Validation"),
            (StatusCode::UNAUTHORIZED, "Auth"),
            (StatusCode::FORBIDDEN, "Authorization"),
            (StatusCode::NOT_FOUND, "NotFound"),
            (StatusCode::CONFLICT, "Conflict"),
            (StatusCode::BAD_GATEWAY, "Upstream"),
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal"),
        ];
        for (status, expected) in cases {
            let err = error_from_status(status, "msg".to_string());
            let kind = format!("{:?}", err);
            assert!(kind.starts_with(expected), "{} -> {}", status, kind);
        }
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = ApiClient::new("http://localhost:5000/", Session::new());
        assert_eq!(client.base_url, "http://localhost:5000");
    }
}
