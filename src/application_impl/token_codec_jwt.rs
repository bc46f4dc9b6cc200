use crate::application_port::{AuthError, IssuedToken, TokenCodec};
use crate::domain_model::{TokenKind, TokenPayload, TokenSubject};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use std::fmt;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

const BEARER_PREFIX: &str = "Bearer ";

#[derive(Clone)]
pub struct JwtConfig {
    pub signing_key: Vec<u8>,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("signing_key", &"<redacted>")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

/// HS256 JWT codec. Every token carries an explicit `kind` claim so access
/// and refresh tokens cannot stand in for each other.
pub struct JwtHs256Codec {
    cfg: JwtConfig,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtHs256Codec {
    pub fn new(cfg: JwtConfig) -> Result<Self, AuthError> {
        if cfg.signing_key.is_empty() {
            return Err(AuthError::Config(
                "jwt signing secret is not configured".to_string(),
            ));
        }
        let access_ttl_secs = Self::positive_secs(cfg.access_ttl, "access")?;
        let refresh_ttl_secs = Self::positive_secs(cfg.refresh_ttl, "refresh")?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp"]);

        Ok(JwtHs256Codec {
            encoding_key: EncodingKey::from_secret(&cfg.signing_key),
            decoding_key: DecodingKey::from_secret(&cfg.signing_key),
            cfg,
            access_ttl_secs,
            refresh_ttl_secs,
            validation,
        })
    }

    fn positive_secs(ttl: Duration, which: &str) -> Result<i64, AuthError> {
        match i64::try_from(ttl.as_secs()) {
            Ok(secs) if secs > 0 => Ok(secs),
            _ => Err(AuthError::Config(format!(
                "{which} token ttl must be a positive number of seconds"
            ))),
        }
    }

    fn ttl_secs(&self, kind: TokenKind) -> i64 {
        match kind {
            TokenKind::Access => self.access_ttl_secs,
            TokenKind::Refresh => self.refresh_ttl_secs,
        }
    }

    fn sign(&self, payload: &TokenPayload) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), payload, &self.encoding_key)
            .map_err(|e| AuthError::InternalError(e.to_string()))
    }
}

impl TokenCodec for JwtHs256Codec {
    fn issue(&self, kind: TokenKind, subject: &TokenSubject) -> Result<IssuedToken, AuthError> {
        let now = Utc::now().timestamp();
        let payload = TokenPayload {
            user_id: subject.user_id,
            email: subject.email.clone(),
            kind,
            issued_at: now,
            expires_at: now + self.ttl_secs(kind),
            jti: Uuid::new_v4().to_string(),
        };
        let token = self.sign(&payload)?;
        Ok(IssuedToken { token, payload })
    }

    fn verify(&self, kind: TokenKind, token: &str) -> Result<TokenPayload, AuthError> {
        let data = decode::<TokenPayload>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                debug!(error = %e, "token rejected");
                AuthError::TokenInvalid
            })?;
        let payload = data.claims;

        if payload.kind != kind {
            debug!(expected = %kind, found = %payload.kind, "token kind mismatch");
            return Err(AuthError::TokenInvalid);
        }
        if payload.expires_at <= Utc::now().timestamp() || payload.expires_at <= payload.issued_at
        {
            debug!("token expired");
            return Err(AuthError::TokenInvalid);
        }
        Ok(payload)
    }

    fn ttl(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => self.cfg.access_ttl,
            TokenKind::Refresh => self.cfg.refresh_ttl,
        }
    }
}

/// Pull the token out of an `Authorization: Bearer <token>` header value.
pub fn extract_bearer(header: Option<&str>) -> Option<&str> {
    header?
        .strip_prefix(BEARER_PREFIX)
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_model::UserId;
    use testresult::TestResult;

    fn codec() -> JwtHs256Codec {
        let cfg = JwtConfig {
            signing_key: b"unit-test-secret".to_vec(),
            access_ttl: Duration::from_secs(15 * 60),
            refresh_ttl: Duration::from_secs(7 * 24 * 60 * 60),
        };
        match JwtHs256Codec::new(cfg) {
            Ok(codec) => codec,
            Err(e) => panic!("codec config rejected: {e}"),
        }
    }

    fn subject() -> TokenSubject {
        TokenSubject {
            user_id: UserId(42),
            email: "a@x.com".to_string(),
        }
    }

    #[test]
    fn verify_returns_issued_payload() -> TestResult {
        let codec = codec();
        let issued = codec.issue(TokenKind::Access, &subject())?;

        let payload = codec.verify(TokenKind::Access, &issued.token)?;

        assert_eq!(payload, issued.payload);
        assert_eq!(payload.user_id, UserId(42));
        assert_eq!(payload.expires_at - payload.issued_at, 15 * 60);
        Ok(())
    }

    #[test]
    fn refresh_tokens_live_seven_days() -> TestResult {
        let codec = codec();
        let issued = codec.issue(TokenKind::Refresh, &subject())?;

        assert_eq!(
            issued.payload.expires_at - issued.payload.issued_at,
            7 * 24 * 60 * 60
        );
        Ok(())
    }

    #[test]
    fn tokens_issued_back_to_back_differ() -> TestResult {
        let codec = codec();
        let first = codec.issue(TokenKind::Refresh, &subject())?;
        let second = codec.issue(TokenKind::Refresh, &subject())?;

        assert_ne!(first.token, second.token);
        Ok(())
    }

    #[test]
    fn expired_token_is_rejected() -> TestResult {
        let codec = codec();
        let now = Utc::now().timestamp();
        let stale = TokenPayload {
            user_id: UserId(42),
            email: "a@x.com".to_string(),
            kind: TokenKind::Access,
            issued_at: now - 1000,
            expires_at: now - 100,
            jti: "stale".to_string(),
        };
        let token = codec.sign(&stale)?;

        assert!(matches!(
            codec.verify(TokenKind::Access, &token),
            Err(AuthError::TokenInvalid)
        ));
        Ok(())
    }

    #[test]
    fn tampered_signature_is_rejected() -> TestResult {
        let codec = codec();
        let issued = codec.issue(TokenKind::Access, &subject())?;

        let sig_start = issued.token.rfind('.').map(|i| i + 1).unwrap_or_default();
        let mut bytes = issued.token.into_bytes();
        bytes[sig_start] = if bytes[sig_start] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes)?;

        assert!(matches!(
            codec.verify(TokenKind::Access, &tampered),
            Err(AuthError::TokenInvalid)
        ));
        Ok(())
    }

    #[test]
    fn malformed_token_is_rejected() {
        let codec = codec();

        for garbage in ["", "not-a-token", "a.b.c", "...."] {
            assert!(matches!(
                codec.verify(TokenKind::Access, garbage),
                Err(AuthError::TokenInvalid)
            ));
        }
    }

    #[test]
    fn token_signed_with_another_secret_is_rejected() -> TestResult {
        let other = JwtHs256Codec::new(JwtConfig {
            signing_key: b"someone-else".to_vec(),
            access_ttl: Duration::from_secs(60),
            refresh_ttl: Duration::from_secs(120),
        })?;
        let issued = other.issue(TokenKind::Access, &subject())?;

        assert!(matches!(
            codec().verify(TokenKind::Access, &issued.token),
            Err(AuthError::TokenInvalid)
        ));
        Ok(())
    }

    #[test]
    fn kinds_are_not_interchangeable() -> TestResult {
        let codec = codec();
        let access = codec.issue(TokenKind::Access, &subject())?;
        let refresh = codec.issue(TokenKind::Refresh, &subject())?;

        assert!(matches!(
            codec.verify(TokenKind::Refresh, &access.token),
            Err(AuthError::TokenInvalid)
        ));
        assert!(matches!(
            codec.verify(TokenKind::Access, &refresh.token),
            Err(AuthError::TokenInvalid)
        ));
        Ok(())
    }

    #[test]
    fn missing_secret_is_a_config_error() {
        let result = JwtHs256Codec::new(JwtConfig {
            signing_key: Vec::new(),
            access_ttl: Duration::from_secs(60),
            refresh_ttl: Duration::from_secs(120),
        });

        assert!(matches!(result, Err(AuthError::Config(_))));
    }

    #[test]
    fn extract_bearer_requires_prefix() {
        assert_eq!(extract_bearer(Some("Bearer abc.def.ghi")), Some("abc.def.ghi"));
        assert_eq!(extract_bearer(Some("Basic abc123")), None);
        assert_eq!(extract_bearer(Some("bearer abc")), None);
        assert_eq!(extract_bearer(Some("Bearer ")), None);
        assert_eq!(extract_bearer(None), None);
    }
}
