//! Bearer token verification and issuance (HS256)

use axum::http::{header, HeaderMap};
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use lectern_rbac::Role;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::{WebError, WebResult};

/// Identity claims of a verified token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,
    /// Organization id
    pub org: String,
    pub role: Role,
    /// Expiry as seconds since the Unix epoch
    pub exp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
}

/// Why a token was refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidReason {
    Malformed,
    BadSignature,
    Expired,
    MissingClaim(&'static str),
    UnknownRole(String),
    IssuerMismatch,
    AudienceMismatch,
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidReason::Malformed => f.write_str("malformed token"),
            InvalidReason::BadSignature => f.write_str("signature mismatch"),
            InvalidReason::Expired => f.write_str("token expired"),
            InvalidReason::MissingClaim(claim) => write!(f, "missing claim '{}'", claim),
            InvalidReason::UnknownRole(role) => write!(f, "unknown role '{}'", role),
            InvalidReason::IssuerMismatch => f.write_str("issuer mismatch"),
            InvalidReason::AudienceMismatch => f.write_str("audience mismatch"),
        }
    }
}

/// Outcome of [`verify`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenVerification {
    Valid(Claims),
    Invalid(InvalidReason),
}

impl TokenVerification {
    pub fn is_valid(&self) -> bool {
        matches!(self, TokenVerification::Valid(_))
    }
}

// Claims as they appear on the wire, before presence checks
#[derive(Deserialize)]
struct WireClaims {
    sub: Option<String>,
    #[serde(alias = "organizationId", alias = "organization_id")]
    org: Option<String>,
    role: Option<String>,
    exp: Option<i64>,
    iat: Option<i64>,
    iss: Option<String>,
    aud: Option<serde_json::Value>,
}

/// Verifies bearer tokens signed with a shared secret
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
    issuer: Option<String>,
    audience: Option<String>,
}

impl fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish_non_exhaustive()
    }
}

impl TokenVerifier {
    pub fn new(secret: &str) -> Self {
        // Only the signature is checked by the library; expiry is compared
        // against the caller-supplied time below.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();
        validation.leeway = 0;

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            issuer: None,
            audience: None,
        }
    }

    /// Require the `iss` claim to equal `issuer`
    pub fn with_issuer(mut self, issuer: Option<String>) -> Self {
        self.issuer = issuer;
        self
    }

    /// Require the `aud` claim to contain `audience`
    pub fn with_audience(mut self, audience: Option<String>) -> Self {
        self.audience = audience;
        self
    }

    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> TokenVerification {
        match self.check(token, now) {
            Ok(claims) => TokenVerification::Valid(claims),
            Err(reason) => TokenVerification::Invalid(reason),
        }
    }

    fn check(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, InvalidReason> {
        let data = decode::<WireClaims>(token, &self.key, &self.validation).map_err(|e| match e.kind() {
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => InvalidReason::BadSignature,
            _ => InvalidReason::Malformed,
        })?;
        let wire = data.claims;

        let sub = wire.sub.filter(|s| !s.is_empty()).ok_or(InvalidReason::MissingClaim("sub"))?;
        let org = wire.org.filter(|s| !s.is_empty()).ok_or(InvalidReason::MissingClaim("org"))?;
        let role_name = wire.role.ok_or(InvalidReason::MissingClaim("role"))?;
        let exp = wire.exp.ok_or(InvalidReason::MissingClaim("exp"))?;

        let role: Role = role_name
            .parse()
            .map_err(|_| InvalidReason::UnknownRole(role_name.clone()))?;

        if DateTime::from_timestamp(exp, 0).is_none() {
            return Err(InvalidReason::Malformed);
        }
        if exp <= now.timestamp() {
            return Err(InvalidReason::Expired);
        }

        if let Some(ref expected) = self.issuer {
            if wire.iss.as_deref() != Some(expected.as_str()) {
                return Err(InvalidReason::IssuerMismatch);
            }
        }

        let aud = match (&self.audience, wire.aud) {
            (Some(expected), Some(aud)) => {
                if !audience_contains(&aud, expected) {
                    return Err(InvalidReason::AudienceMismatch);
                }
                Some(expected.clone())
            }
            (Some(_), None) => return Err(InvalidReason::AudienceMismatch),
            (None, aud) => aud.and_then(|v| v.as_str().map(str::to_string)),
        };

        Ok(Claims {
            sub,
            org,
            role,
            exp,
            iat: wire.iat,
            iss: wire.iss,
            aud,
        })
    }
}

fn audience_contains(aud: &serde_json::Value, expected: &str) -> bool {
    match aud {
        serde_json::Value::String(single) => single == expected,
        serde_json::Value::Array(many) => many.iter().any(|v| v.as_str() == Some(expected)),
        _ => false,
    }
}

/// Verify `token` against `secret` at time `now`
pub fn verify(token: &str, secret: &str, now: DateTime<Utc>) -> TokenVerification {
    TokenVerifier::new(secret).verify(token, now)
}

/// Signs tokens the verifier accepts
#[derive(Clone)]
pub struct TokenIssuer {
    key: EncodingKey,
    issuer: Option<String>,
    audience: Option<String>,
}

impl TokenIssuer {
    pub fn new(secret: &str) -> Self {
        Self {
            key: EncodingKey::from_secret(secret.as_bytes()),
            issuer: None,
            audience: None,
        }
    }

    pub fn with_issuer(mut self, issuer: Option<String>) -> Self {
        self.issuer = issuer;
        self
    }

    pub fn with_audience(mut self, audience: Option<String>) -> Self {
        self.audience = audience;
        self
    }

    /// Issue a token for `subject` valid for `ttl` from `now`
    pub fn issue(
        &self,
        subject: &str,
        organization: &str,
        role: Role,
        ttl: chrono::Duration,
        now: DateTime<Utc>,
    ) -> WebResult<String> {
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or_else(|| WebError::internal("Token lifetime out of range"))?;
        let claims = Claims {
            sub: subject.to_string(),
            org: organization.to_string(),
            role,
            exp: expires_at.timestamp(),
            iat: Some(now.timestamp()),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.key)
            .map_err(|e| WebError::internal(format!("Failed to sign token: {}", e)))
    }
}

/// The credential of an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
