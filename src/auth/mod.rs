//! Credential verification, session tokens and identity-provider login.

pub mod identity;
pub mod password;
pub mod token;

pub use identity::{GoogleIdentityProvider, IdentityProvider, VerifiedIdentity};
pub use token::{SessionClaims, TokenIssuer};

use std::sync::Arc;

use chrono::Utc;
use email_address::EmailAddress;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::{AuthResponse, NewUser, User};
use crate::error::{IonixError, Result};
use crate::storage::SharedStore;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub pic: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityLoginRequest {
    pub token: String,
}

/// Profile changes. Missing or empty values leave the field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub pic: Option<String>,
    pub password: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn check_email(email: &str) -> Result<()> {
    if EmailAddress::is_valid(email) {
        Ok(())
    } else {
        Err(IonixError::validation("Please enter a valid email address"))
    }
}

fn invalid_credentials() -> IonixError {
    IonixError::unauthorized("Invalid email or password")
}

#[derive(Clone)]
pub struct AuthService {
    store: SharedStore,
    tokens: Arc<TokenIssuer>,
    identity: Arc<dyn IdentityProvider>,
}

impl AuthService {
    pub fn new(
        store: SharedStore,
        tokens: Arc<TokenIssuer>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            store,
            tokens,
            identity,
        }
    }

    fn respond(&self, user: &User) -> Result<AuthResponse> {
        Ok(AuthResponse {
            user: user.profile(),
            token: self.issue_session_token(user.id)?,
        })
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<AuthResponse> {
        let (name, email, password) = match (
            non_empty(request.name),
            non_empty(request.email),
            request.password.filter(|p| !p.is_empty()),
        ) {
            (Some(name), Some(email), Some(password)) => (name, normalize_email(&email), password),
            _ => return Err(IonixError::validation("Please enter all fields")),
        };
        check_email(&email)?;

        if self.store.lock().await.find_user_by_email(&email)?.is_some() {
            return Err(IonixError::Conflict("User already exists".to_string()));
        }

        let user = User::new(NewUser {
            name,
            email,
            password_hash: password::hash_password(&password)?,
            pic: non_empty(request.pic),
        });
        self.store.lock().await.insert_user(&user)?;

        tracing::info!(user_id = %user.id, "registered user");
        self.respond(&user)
    }

    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse> {
        let (email, password) = match (non_empty(request.email), request.password) {
            (Some(email), Some(password)) => (normalize_email(&email), password),
            _ => return Err(IonixError::validation("Please enter email and password")),
        };

        let user = self
            .store
            .lock()
            .await
            .find_user_by_email(&email)?
            .ok_or_else(invalid_credentials)?;

        if !password::verify_password(&password, &user.password_hash)? {
            return Err(invalid_credentials());
        }

        tracing::info!(user_id = %user.id, "user logged in");
        self.respond(&user)
    }

    /// Log in with a provider ID token, creating the account on first use.
    /// The flag is true when a new user was created.
    pub async fn login_with_identity_provider(
        &self,
        provider_token: &str,
    ) -> Result<(AuthResponse, bool)> {
        let identity = self.identity.verify(provider_token).await?;
        let email = normalize_email(&identity.email);

        if let Some(user) = self.store.lock().await.find_user_by_email(&email)? {
            return Ok((self.respond(&user)?, false));
        }

        let name = non_empty(identity.name)
            .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());
        let user = User::new(NewUser {
            name,
            email,
            password_hash: password::hash_password(&password::random_password())?,
            pic: identity.picture,
        });
        self.store.lock().await.insert_user(&user)?;

        tracing::info!(user_id = %user.id, "created user from identity provider");
        Ok((self.respond(&user)?, true))
    }

    pub fn issue_session_token(&self, user_id: Uuid) -> Result<String> {
        self.tokens.issue(user_id)
    }

    /// Resolve a bearer token to its user. Unknown users are rejected like
    /// any other bad token.
    pub async fn verify_session_token(&self, token: &str) -> Result<User> {
        let claims = self.tokens.verify(token)?;
        self.store
            .lock()
            .await
            .get_user(&claims.user_id)?
            .ok_or_else(|| IonixError::unauthorized("Not authorized, token failed"))
    }

    pub async fn update_profile(&self, user_id: Uuid, update: ProfileUpdate) -> Result<AuthResponse> {
        let mut user = self.load(user_id).await?;

        if let Some(name) = non_empty(update.name) {
            user.name = name;
        }
        if let Some(email) = non_empty(update.email) {
            let email = normalize_email(&email);
            check_email(&email)?;
            user.email = email;
        }
        if let Some(pic) = non_empty(update.pic) {
            user.pic = Some(pic);
        }
        if let Some(password) = update.password.filter(|p| !p.is_empty()) {
            user.password_hash = password::hash_password(&password)?;
        }
        user.updated_at = Utc::now();

        self.store.lock().await.update_user(&user)?;
        self.respond(&user)
    }

    pub async fn upgrade_to_premium(&self, user_id: Uuid) -> Result<AuthResponse> {
        let mut user = self.load(user_id).await?;
        user.is_premium = true;
        user.updated_at = Utc::now();

        self.store.lock().await.update_user(&user)?;
        tracing::info!(user_id = %user.id, "upgraded to premium");
        self.respond(&user)
    }

    async fn load(&self, user_id: Uuid) -> Result<User> {
        self.store
            .lock()
            .await
            .get_user(&user_id)?
            .ok_or_else(|| IonixError::not_found("User not found"))
    }
}
