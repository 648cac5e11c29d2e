use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Malformed token")]
    InvalidFormat,
    #[error("Token signature mismatch")]
    InvalidSignature,
    #[error("Token expired")]
    Expired,
    #[error("Expected a {expected} token")]
    WrongType { expected: TokenType },
    #[error("Token encoding failed: {0}")]
    Encoding(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenType::Access => f.write_str("access"),
            TokenType::Refresh => f.write_str("refresh"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(rename = "type")]
    pub token_type: TokenType,
}

impl Claims {
    pub fn new(user_id: i64, token_type: TokenType, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            token_type,
        }
    }

    pub fn user_id(&self) -> Result<i64, AuthError> {
        self.sub.parse().map_err(|_| AuthError::InvalidFormat)
    }
}

fn mac(secret: &[u8]) -> Result<HmacSha256, AuthError> {
    HmacSha256::new_from_slice(secret).map_err(|e| AuthError::Encoding(e.to_string()))
}

/// Sign claims into a compact HS256 token.
pub fn encode(claims: &Claims, secret: &[u8]) -> Result<String, AuthError> {
    let payload = serde_json::to_vec(claims).map_err(|e| AuthError::Encoding(e.to_string()))?;
    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(HEADER),
        URL_SAFE_NO_PAD.encode(payload)
    );

    let mut mac = mac(secret)?;
    mac.update(signing_input.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{}.{}", signing_input, signature))
}

/// Verify a token and return its claims.
pub fn decode(
    token: &str,
    secret: &[u8],
    expected: TokenType,
    now: DateTime<Utc>,
) -> Result<Claims, AuthError> {
    let (signing_input, signature) = token.rsplit_once('.').ok_or(AuthError::InvalidFormat)?;
    let (header, payload) = signing_input
        .split_once('.')
        .ok_or(AuthError::InvalidFormat)?;

    let signature = URL_SAFE_NO_PAD
        .decode(signature)
        .map_err(|_| AuthError::InvalidFormat)?;
    let mut mac = mac(secret)?;
    mac.update(signing_input.as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| AuthError::InvalidSignature)?;

    let header = URL_SAFE_NO_PAD
        .decode(header)
        .map_err(|_| AuthError::InvalidFormat)?;
    if header != HEADER.as_bytes() {
        return Err(AuthError::InvalidFormat);
    }

    let payload = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| AuthError::InvalidFormat)?;
    let claims: Claims = serde_json::from_slice(&payload).map_err(|_| AuthError::InvalidFormat)?;

    if claims.exp <= now.timestamp() {
        return Err(AuthError::Expired);
    }
    if claims.token_type != expected {
        return Err(AuthError::WrongType { expected });
    }

    Ok(claims)
}

/// Access and refresh tokens issued together
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: DateTime<Utc>,
    pub refresh_expires_in: DateTime<Utc>,
}

pub fn issue_pair(
    user_id: i64,
    secret: &[u8],
    access_ttl: Duration,
    refresh_ttl: Duration,
    now: DateTime<Utc>,
) -> Result<TokenPair, AuthError> {
    let access = Claims::new(user_id, TokenType::Access, now, access_ttl);
    let refresh = Claims::new(user_id, TokenType::Refresh, now, refresh_ttl);

    Ok(TokenPair {
        access_token: encode(&access, secret)?,
        refresh_token: encode(&refresh, secret)?,
        expires_in: now + access_ttl,
        refresh_expires_in: now + refresh_ttl,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"a-test-secret-of-enough-length";

    #[test]
    fn test_encode_decode() {
        let now = Utc::now();
        let claims = Claims::new(42, TokenType::Access, now, Duration::hours(8));
        let token = encode(&claims, SECRET).unwrap();

        assert_eq!(token.split('.').count(), 3);
        let decoded = decode(&token, SECRET, TokenType::Access, now).unwrap();
        assert_eq!(decoded, claims);
        assert_eq!(decoded.user_id().unwrap(), 42);
    }

    #[test]
    fn test_rejects_tampering_and_wrong_secret() {
        let now = Utc::now();
        let token = encode(
            &Claims::new(1, TokenType::Access, now, Duration::hours(1)),
            SECRET,
        )
        .unwrap();

        assert_eq!(
            decode(&token, b"another-secret-entirely", TokenType::Access, now),
            Err(AuthError::InvalidSignature)
        );

        let forged_payload = URL_SAFE_NO_PAD.encode(
            serde_json::to_vec(&Claims::new(2, TokenType::Access, now, Duration::hours(1)))
                .unwrap(),
        );
        let mut parts: Vec<&str> = token.split('.').collect();
        parts[1] = &forged_payload;
        assert_eq!(
            decode(&parts.join("."), SECRET, TokenType::Access, now),
            Err(AuthError::InvalidSignature)
        );

        assert_eq!(
            decode("not-a-token", SECRET, TokenType::Access, now),
            Err(AuthError::InvalidFormat)
        );
    }

    #[test]
    fn test_rejects_expired_and_wrong_type() {
        let issued = Utc::now() - Duration::hours(2);
        let expired = encode(
            &Claims::new(1, TokenType::Access, issued, Duration::hours(1)),
            SECRET,
        )
        .unwrap();
        assert_eq!(
            decode(&expired, SECRET, TokenType::Access, Utc::now()),
            Err(AuthError::Expired)
        );

        let pair = issue_pair(
            1,
            SECRET,
            Duration::hours(1),
            Duration::days(2),
            Utc::now(),
        )
        .unwrap();
        assert!(matches!(
            decode(&pair.refresh_token, SECRET, TokenType::Access, Utc::now()),
            Err(AuthError::WrongType { .. })
        ));
        assert!(decode(&pair.refresh_token, SECRET, TokenType::Refresh, Utc::now()).is_ok());
    }
}
