//! Identity token verification (HS256 JWT).
//!
//! Tokens are minted elsewhere; the engine only checks the signature, the
//! audience and the expiry, and reads the caller's identity out of the claims.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tidewatch_domain::{DisplayName, Role, UserId};

use crate::infrastructure::ports::{IdentityError, IdentityPort, VerifiedIdentity};

/// Claims carried by an identity token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityClaims {
    /// Stable user id (UUID).
    pub sub: String,
    /// Display name; guests without one get a generated name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub aud: String,
    pub exp: i64,
}

pub struct JwtIdentityVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
    #[cfg(test)]
    secret: String,
    #[cfg(test)]
    audience: String,
}

impl JwtIdentityVerifier {
    pub fn new(secret: &str, audience: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[audience]);
        validation.set_required_spec_claims(&["exp", "aud", "sub"]);

        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            #[cfg(test)]
            secret: secret.to_string(),
            #[cfg(test)]
            audience: audience.to_string(),
        }
    }

    /// Mint a token for tests.
    #[cfg(test)]
    pub fn issue(&self, user_id: UserId, name: &str, role: Role, ttl: chrono::TimeDelta) -> String {
        let claims = IdentityClaims {
            sub: user_id.to_string(),
            name: Some(name.to_string()),
            role: Some(role.as_str().to_string()),
            aud: self.audience.clone(),
            exp: (chrono::Utc::now() + ttl).timestamp(),
        };
        jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &claims,
            &jsonwebtoken::EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .expect("token encoding")
    }
}

fn guest_name(user_id: UserId) -> String {
    let id = user_id.to_string();
    format!("Guest-{}", &id[..8])
}

impl IdentityPort for JwtIdentityVerifier {
    fn verify(&self, token: &str) -> Result<VerifiedIdentity, IdentityError> {
        let data = decode::<IdentityClaims>(token, &self.decoding_key, &self.validation).map_err(
            |e| match e.kind() {
                ErrorKind::ExpiredSignature => IdentityError::Expired,
                _ => IdentityError::Invalid(e.to_string()),
            },
        )?;
        let claims = data.claims;

        let user_id = UserId::parse(&claims.sub)
            .map_err(|e| IdentityError::Invalid(format!("subject: {e}")))?;
        let role = match claims.role.as_deref() {
            Some(role) => role
                .parse::<Role>()
                .map_err(|e| IdentityError::Invalid(e.to_string()))?,
            None => Role::Registered,
        };
        let display_name = DisplayName::new(claims.name.unwrap_or_else(|| guest_name(user_id)))
            .map_err(|e| IdentityError::Invalid(e.to_string()))?;

        Ok(VerifiedIdentity {
            user_id,
            display_name,
            role,
        })
    }
}

/// Verifier used when no token secret is configured: every token is refused.
pub struct RejectAllIdentity;

impl IdentityPort for RejectAllIdentity {
    fn verify(&self, _token: &str) -> Result<VerifiedIdentity, IdentityError> {
        Err(IdentityError::NotConfigured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    const SECRET: &str = "test-secret";

    #[test]
    fn valid_token_yields_identity() {
        let verifier = JwtIdentityVerifier::new(SECRET, "tidewatch");
        let user = UserId::new();
        let token = verifier.issue(user, "Marin", Role::Admin, TimeDelta::hours(1));

        let identity = verifier.verify(&token).unwrap();
        assert_eq!(identity.user_id, user);
        assert_eq!(identity.display_name.as_str(), "Marin");
        assert_eq!(identity.role, Role::Admin);
    }

    #[test]
    fn expired_token_is_rejected() {
        let verifier = JwtIdentityVerifier::new(SECRET, "tidewatch");
        let token = verifier.issue(UserId::new(), "Marin", Role::Registered, TimeDelta::hours(-2));
        assert_eq!(verifier.verify(&token), Err(IdentityError::Expired));
    }

    #[test]
    fn wrong_audience_is_rejected() {
        let issuer = JwtIdentityVerifier::new(SECRET, "someone-else");
        let token = issuer.issue(UserId::new(), "Marin", Role::Registered, TimeDelta::hours(1));

        let verifier = JwtIdentityVerifier::new(SECRET, "tidewatch");
        assert!(matches!(verifier.verify(&token), Err(IdentityError::Invalid(_))));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let issuer = JwtIdentityVerifier::new("other-secret", "tidewatch");
        let token = issuer.issue(UserId::new(), "Marin", Role::Registered, TimeDelta::hours(1));

        let verifier = JwtIdentityVerifier::new(SECRET, "tidewatch");
        assert!(matches!(verifier.verify(&token), Err(IdentityError::Invalid(_))));
        assert!(matches!(verifier.verify("not-a-jwt"), Err(IdentityError::Invalid(_))));
    }

    #[test]
    fn unconfigured_verifier_refuses_everything() {
        assert_eq!(
            RejectAllIdentity.verify("anything"),
            Err(IdentityError::NotConfigured)
        );
    }
}
