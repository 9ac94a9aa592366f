use chrono::{DateTime, Duration, TimeZone, Utc};
use hmac::{Hmac, Mac};
use jwt::{Claims, Header, RegisteredClaims, SignWithKey, Token, VerifyWithKey};
use sha2::Sha256;
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::error::{IonixError, Result};

/// Decoded claims of a valid session token.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionClaims {
    pub user_id: Uuid,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Signs and verifies HS256 bearer tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    key: Hmac<Sha256>,
    issuer: String,
    ttl: Duration,
}

fn failed() -> IonixError {
    IonixError::unauthorized("Not authorized, token failed")
}

impl TokenIssuer {
    pub fn new(config: &JwtConfig) -> Result<Self> {
        let key = Hmac::<Sha256>::new_from_slice(config.secret.as_bytes())
            .map_err(|e| IonixError::Config(format!("invalid jwt secret: {}", e)))?;
        let ttl = Duration::try_days(config.ttl_days)
            .filter(|ttl| *ttl > Duration::zero())
            .ok_or_else(|| {
                IonixError::Config(format!("invalid jwt.ttl_days: {}", config.ttl_days))
            })?;
        Ok(Self {
            key,
            issuer: config.issuer.clone(),
            ttl,
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, user_id: Uuid) -> Result<String> {
        self.issue_at(user_id, Utc::now())
    }

    /// Sign a token as if issued at `issued_at`.
    pub fn issue_at(&self, user_id: Uuid, issued_at: DateTime<Utc>) -> Result<String> {
        let expiration = issued_at
            .checked_add_signed(self.ttl)
            .ok_or_else(|| IonixError::Config("jwt.ttl_days overflows token expiry".to_string()))?;
        let claims = Claims::new(RegisteredClaims {
            issued_at: Some(issued_at.timestamp() as u64),
            expiration: Some(expiration.timestamp() as u64),
            issuer: Some(self.issuer.clone()),
            subject: Some(user_id.to_string()),
            json_web_token_id: Some(Uuid::new_v4().to_string()),
            not_before: None,
            audience: None,
        });

        claims
            .sign_with_key(&self.key)
            .map_err(|e| IonixError::Internal(format!("failed to sign token: {}", e)))
    }

    /// Check signature, issuer and expiry.
    pub fn verify(&self, token: &str) -> Result<SessionClaims> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims> {
        let token: Token<Header, Claims, _> =
            token.verify_with_key(&self.key).map_err(|_| failed())?;
        let claims = &token.claims().registered;

        if claims.issuer.as_deref() != Some(self.issuer.as_str()) {
            return Err(failed());
        }

        let issued_at = claims
            .issued_at
            .and_then(|x| Utc.timestamp_opt(x as i64, 0).single())
            .ok_or_else(failed)?;
        let expires_at = claims
            .expiration
            .and_then(|x| Utc.timestamp_opt(x as i64, 0).single())
            .ok_or_else(failed)?;

        if expires_at <= now {
            return Err(failed());
        }

        let user_id = claims
            .subject
            .as_deref()
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or_else(failed)?;

        Ok(SessionClaims {
            user_id,
            issued_at,
            expires_at,
        })
    }
}

/// Read the expiry of a token without checking its signature. Used by the
/// client to age out a stored session.
pub fn peek_expiry(token: &str) -> Option<DateTime<Utc>> {
    let token: Token<Header, Claims, _> = Token::parse_unverified(token).ok()?;
    token
        .claims()
        .registered
        .expiration
        .and_then(|x| Utc.timestamp_opt(x as i64, 0).single())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer(secret: &str) -> TokenIssuer {
        TokenIssuer::new(&JwtConfig {
            secret: secret.to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_issue_and_verify() {
        let tokens = issuer("secret");
        let user = Uuid::new_v4();
        let token = tokens.issue(user).unwrap();

        let claims = tokens.verify(&token).unwrap();
        assert_eq!(claims.user_id, user);
        assert_eq!(claims.expires_at - claims.issued_at, Duration::days(30));
    }

    #[test]
    fn test_expired_token_rejected() {
        let tokens = issuer("secret");
        let token = tokens
            .issue_at(Uuid::new_v4(), Utc::now() - Duration::days(31))
            .unwrap();

        let err = tokens.verify(&token).unwrap_err();
        assert!(matches!(err, IonixError::Auth(_)));
    }

    #[test]
    fn test_token_near_expiry_still_valid() {
        let tokens = issuer("secret");
        let token = tokens
            .issue_at(Uuid::new_v4(), Utc::now() - Duration::days(29))
            .unwrap();
        assert!(tokens.verify(&token).is_ok());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = issuer("one").issue(Uuid::new_v4()).unwrap();
        assert!(issuer("two").verify(&token).is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(issuer("secret").verify("not.a.token").is_err());
        assert!(issuer("secret").verify("").is_err());
    }

    #[test]
    fn test_oversized_lifetime_is_an_error() {
        let config = JwtConfig {
            secret: "secret".to_string(),
            ttl_days: i64::MAX,
            ..Default::default()
        };
        assert!(matches!(TokenIssuer::new(&config), Err(IonixError::Config(_))));

        let tokens = TokenIssuer::new(&JwtConfig {
            secret: "secret".to_string(),
            ttl_days: 1_000_000_000,
            ..Default::default()
        })
        .unwrap();
        let err = tokens.issue(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, IonixError::Config(_)));
    }

    #[test]
    fn test_peek_expiry() {
        let tokens = issuer("secret");
        let issued = Utc::now();
        let token = tokens.issue_at(Uuid::new_v4(), issued).unwrap();

        let exp = peek_expiry(&token).unwrap();
        assert_eq!(exp.timestamp(), (issued + Duration::days(30)).timestamp());
        assert!(peek_expiry("garbage").is_none());
    }
}
