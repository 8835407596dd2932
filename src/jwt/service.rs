use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};

use super::{JwtConfig, SessionClaims};
use crate::crypto::generate_token;
use crate::session::{RoleFactBundle, RoleFactCache};
use crate::{AccessError, PrincipalId};

/// Length of the token id (jti).
const JTI_LENGTH: usize = 16;

/// Issues and verifies session tokens.
#[derive(Clone)]
pub struct JwtService {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// Signs a token for `principal` embedding `facts`.
    pub fn issue(&self, principal: PrincipalId, facts: &RoleFactBundle) -> Result<String, AccessError> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: principal.to_string(),
            exp: (now + self.config.expiry).timestamp(),
            iat: now.timestamp(),
            jti: generate_token(JTI_LENGTH),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
            facts: facts.clone(),
        };

        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AccessError::Internal(format!("token encoding failed: {e}")))
    }

    /// Signs a token with the principal's current facts from `cache`.
    ///
    /// Call again after a membership change so the gate sees the new facts.
    pub async fn issue_current(&self, principal: PrincipalId, cache: &RoleFactCache) -> Result<String, AccessError> {
        let facts = cache.get(principal).await?;
        self.issue(principal, &facts)
    }

    /// Decodes and verifies a token.
    pub fn decode(&self, token: &str) -> Result<SessionClaims, AccessError> {
        let mut validation = Validation::new(Algorithm::HS256);

        if let Some(ref iss) = self.config.issuer {
            validation.set_issuer(&[iss]);
        }

        if let Some(ref aud) = self.config.audience {
            validation.set_audience(&[aud]);
        }

        let token_data = jsonwebtoken::decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AccessError::TokenExpired,
                _ => AccessError::TokenInvalid,
            })?;

        Ok(token_data.claims)
    }

    /// Verifies a token and returns its principal.
    pub fn validate(&self, token: &str) -> Result<PrincipalId, AccessError> {
        self.decode(token)?.principal()
    }

    pub fn config(&self) -> &JwtConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use jsonwebtoken::Header;

    use super::*;
    use crate::repository::{AccountType, OrgRole};

    fn facts() -> RoleFactBundle {
        RoleFactBundle {
            org_id: Some(3),
            org_role: Some(OrgRole::BusinessAdmin),
            team_ids: vec![1, 4],
            onboarding_complete: true,
            account_type: AccountType::Business,
        }
    }

    #[test]
    fn test_issue_and_decode_carries_facts() {
        let service = JwtService::new(JwtConfig::new("test-secret-32-bytes-long-key-01").unwrap());

        let token = service.issue(42, &facts()).unwrap();
        let claims = service.decode(&token).unwrap();

        assert_eq!(claims.principal().unwrap(), 42);
        assert_eq!(claims.facts, facts());
        assert!(claims.gate_claims().onboarding_complete);
        assert_eq!(claims.gate_claims().org_role, Some(OrgRole::BusinessAdmin));
        assert_eq!(claims.session().unwrap().principal(), Some(42));
    }

    #[test]
    fn test_invalid_token() {
        let service = JwtService::new(JwtConfig::new("test-secret-32-bytes-long-key-02").unwrap());
        assert_eq!(service.decode("invalid-token").unwrap_err(), AccessError::TokenInvalid);
    }

    #[test]
    fn test_wrong_secret() {
        let first = JwtService::new(JwtConfig::new("test-secret-32-bytes-long-key-03").unwrap());
        let second = JwtService::new(JwtConfig::new("test-secret-32-bytes-long-key-04").unwrap());

        let token = first.issue(42, &facts()).unwrap();
        assert_eq!(second.decode(&token).unwrap_err(), AccessError::TokenInvalid);
    }

    #[test]
    fn test_expired_token() {
        let service = JwtService::new(JwtConfig::new("test-secret-32-bytes-long-key-05").unwrap());

        let claims = SessionClaims {
            sub: "42".to_owned(),
            exp: Utc::now().timestamp() - 3600,
            iat: Utc::now().timestamp() - 7200,
            jti: "test-jti".to_owned(),
            iss: None,
            aud: None,
            facts: facts(),
        };
        let encoding_key = EncodingKey::from_secret(b"test-secret-32-bytes-long-key-05");
        let token = jsonwebtoken::encode(&Header::default(), &claims, &encoding_key).unwrap();

        assert_eq!(service.decode(&token).unwrap_err(), AccessError::TokenExpired);
    }

    #[test]
    fn test_issuer_and_audience_enforced() {
        let config = JwtConfig::new("test-secret-32-bytes-long-key-06")
            .unwrap()
            .with_issuer("tenantry")
            .with_audience("web");
        let service = JwtService::new(config);
        let token = service.issue(42, &facts()).unwrap();
        let claims = service.decode(&token).unwrap();
        assert_eq!(claims.iss.as_deref(), Some("tenantry"));
        assert_eq!(claims.aud.as_deref(), Some("web"));

        let other = JwtService::new(
            JwtConfig::new("test-secret-32-bytes-long-key-06")
                .unwrap()
                .with_issuer("someone-else"),
        );
        assert_eq!(other.decode(&token).unwrap_err(), AccessError::TokenInvalid);
    }

    #[test]
    fn test_non_numeric_subject_is_invalid() {
        let service = JwtService::new(JwtConfig::new("test-secret-32-bytes-long-key-07").unwrap());
        let claims = SessionClaims {
            sub: "alice".to_owned(),
            exp: Utc::now().timestamp() + 3600,
            iat: Utc::now().timestamp(),
            jti: "jti".to_owned(),
            iss: None,
            aud: None,
            facts: RoleFactBundle::default(),
        };
        let encoding_key = EncodingKey::from_secret(b"test-secret-32-bytes-long-key-07");
        let token = jsonwebtoken::encode(&Header::default(), &claims, &encoding_key).unwrap();

        assert_eq!(service.validate(&token).unwrap_err(), AccessError::TokenInvalid);
    }

    #[test]
    fn test_secret_too_short() {
        let err = JwtConfig::new("short").unwrap_err();
        assert!(matches!(err, AccessError::ConfigurationError(ref msg) if msg.contains("32 bytes")));
    }

    #[test]
    fn test_jti_unique() {
        let service = JwtService::new(JwtConfig::new("test-secret-32-bytes-long-key-08").unwrap());

        let first = service.decode(&service.issue(42, &facts()).unwrap()).unwrap();
        let second = service.decode(&service.issue(42, &facts()).unwrap()).unwrap();

        assert_ne!(first.jti, second.jti);
        assert!(!first.jti.is_empty());
    }
}
