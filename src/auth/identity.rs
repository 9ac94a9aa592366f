//! Identity-provider (Google Sign-In) token verification.
//!
//! ID tokens are RS256 JWTs. The signature is checked locally against
//! Google's published JSON Web Key set, which is cached and refetched when
//! stale or when a token names a key id we have not seen.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use jwt::algorithm::{AlgorithmType, VerifyingAlgorithm};
use jwt::{Header, Token, VerifyWithKey};
use rsa::signature::Verifier;
use rsa::{BigUint, RsaPublicKey};
use serde::Deserialize;
use sha2::Sha256;
use tokio::sync::RwLock;

use crate::error::{IonixError, Result};

const GOOGLE_CERTS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";
const GOOGLE_ISSUERS: &[&str] = &["accounts.google.com", "https://accounts.google.com"];
const KEY_SET_TTL: Duration = Duration::from_secs(60 * 60);

/// Identity asserted by a verified provider token.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedIdentity {
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Verify a provider-issued ID token and return the identity it asserts.
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity>;
}

/// One RSA signing key from a JWK set.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    pub kid: String,
    pub kty: String,
    pub n: String,
    pub e: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JwkSet {
    pub keys: Vec<Jwk>,
}

impl JwkSet {
    fn find(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|k| k.kid == kid)
    }
}

/// RS256 verifier over a single provider key.
struct Rs256Key(rsa::pkcs1v15::VerifyingKey<Sha256>);

impl Rs256Key {
    fn from_jwk(jwk: &Jwk) -> std::result::Result<Self, String> {
        if jwk.kty != "RSA" {
            return Err(format!("unsupported key type {}", jwk.kty));
        }
        let component = |raw: &str| {
            URL_SAFE_NO_PAD
                .decode(raw)
                .map(|bytes| BigUint::from_bytes_be(&bytes))
                .map_err(|e| format!("malformed key {}: {}", jwk.kid, e))
        };
        let key = RsaPublicKey::new(component(&jwk.n)?, component(&jwk.e)?)
            .map_err(|e| format!("invalid key {}: {}", jwk.kid, e))?;
        Ok(Self(rsa::pkcs1v15::VerifyingKey::new(key)))
    }
}

impl VerifyingAlgorithm for Rs256Key {
    fn algorithm_type(&self) -> AlgorithmType {
        AlgorithmType::Rs256
    }

    fn verify_bytes(
        &self,
        header: &str,
        claims: &str,
        signature: &[u8],
    ) -> std::result::Result<bool, jwt::Error> {
        let Ok(signature) = rsa::pkcs1v15::Signature::try_from(signature) else {
            return Ok(false);
        };
        let message = format!("{}.{}", header, claims);
        Ok(self.0.verify(message.as_bytes(), &signature).is_ok())
    }
}

/// Claims of a Google ID token that we check or use.
#[derive(Debug, Clone, Deserialize)]
struct GoogleClaims {
    iss: Option<String>,
    aud: Option<String>,
    exp: Option<i64>,
    email: Option<String>,
    email_verified: Option<serde_json::Value>,
    name: Option<String>,
    picture: Option<String>,
}

impl GoogleClaims {
    fn email_verified(&self) -> bool {
        match &self.email_verified {
            Some(serde_json::Value::Bool(b)) => *b,
            Some(serde_json::Value::String(s)) => s == "true",
            _ => false,
        }
    }
}

struct CachedKeys {
    keys: JwkSet,
    fetched: Instant,
}

pub struct GoogleIdentityProvider {
    http: reqwest::Client,
    client_id: Option<String>,
    certs_url: String,
    cache: RwLock<Option<CachedKeys>>,
}

impl GoogleIdentityProvider {
    pub fn new(client_id: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            client_id,
            certs_url: GOOGLE_CERTS_URL.to_string(),
            cache: RwLock::new(None),
        }
    }

    fn check(
        &self,
        claims: GoogleClaims,
        now: DateTime<Utc>,
    ) -> std::result::Result<VerifiedIdentity, String> {
        let client_id = self
            .client_id
            .as_deref()
            .ok_or("google.client_id is not configured")?;

        if claims.aud.as_deref() != Some(client_id) {
            return Err(format!("audience mismatch: {:?}", claims.aud));
        }
        if !claims
            .iss
            .as_deref()
            .is_some_and(|iss| GOOGLE_ISSUERS.contains(&iss))
        {
            return Err(format!("unexpected issuer: {:?}", claims.iss));
        }
        if !claims.exp.is_some_and(|exp| exp > now.timestamp()) {
            return Err("token expired".to_string());
        }
        if !claims.email_verified() {
            return Err("email not verified".to_string());
        }

        let email = claims.email.clone().ok_or("token carries no email")?;
        Ok(VerifiedIdentity {
            email,
            name: claims.name,
            picture: claims.picture,
        })
    }

    /// Check signature and claims of `token` against a known key set.
    fn verify_with_keys(
        &self,
        token: &str,
        keys: &JwkSet,
        now: DateTime<Utc>,
    ) -> std::result::Result<VerifiedIdentity, String> {
        let unverified: Token<Header, GoogleClaims, _> =
            Token::parse_unverified(token).map_err(|e| e.to_string())?;
        let kid = unverified
            .header()
            .key_id
            .clone()
            .ok_or("token has no key id")?;
        let jwk = keys
            .find(&kid)
            .ok_or_else(|| format!("unknown key id {}", kid))?;
        let key = Rs256Key::from_jwk(jwk)?;

        let verified = unverified
            .verify_with_key(&key)
            .map_err(|e| format!("signature rejected: {}", e))?;
        self.check(verified.claims().clone(), now)
    }

    /// Cached key set, refetched when stale or missing `kid`.
    async fn keys_for(&self, kid: Option<&str>) -> std::result::Result<JwkSet, String> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                let fresh = cached.fetched.elapsed() < KEY_SET_TTL;
                if fresh && kid.map_or(true, |kid| cached.keys.find(kid).is_some()) {
                    return Ok(cached.keys.clone());
                }
            }
        }

        let keys = self.fetch_keys().await?;
        *self.cache.write().await = Some(CachedKeys {
            keys: keys.clone(),
            fetched: Instant::now(),
        });
        Ok(keys)
    }

    async fn fetch_keys(&self) -> std::result::Result<JwkSet, String> {
        let response = self
            .http
            .get(&self.certs_url)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("key set request returned {}", response.status()));
        }
        response.json().await.map_err(|e| e.to_string())
    }
}

#[async_trait]
impl IdentityProvider for GoogleIdentityProvider {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity> {
        let kid = Token::<Header, GoogleClaims, _>::parse_unverified(token)
            .ok()
            .and_then(|t| t.header().key_id.clone());

        let outcome = match self.keys_for(kid.as_deref()).await {
            Ok(keys) => self.verify_with_keys(token, &keys, Utc::now()),
            Err(e) => Err(e),
        };

        outcome.map_err(|reason| {
            tracing::warn!(%reason, "google token verification failed");
            IonixError::unauthorized("Google verification failed")
        })
    }
}
