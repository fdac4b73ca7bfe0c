/// Authentication extractors and utilities
use crate::{
    admin::{Actor, Role},
    api::middleware::{client_ip, extract_bearer_token},
    context::AppContext,
    error::{AppError, AppResult},
};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Access token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
}

/// Sign an HS256 access token for a user
pub fn issue_token(user_id: &str, jwt_secret: &str, ttl: Duration) -> AppResult<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
}

/// Verify a JWT token with full validation
///
/// This performs:
/// 1. JWT signature verification
/// 2. Expiration checking
/// 3. Claims validation
pub fn verify_token(token: &str, jwt_secret: &str) -> AppResult<Claims> {
    let decoding_key = DecodingKey::from_secret(jwt_secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 30;

    decode::<Claims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::warn!("JWT verification failed: {}", e);
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    AppError::Authentication("Token has expired".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    AppError::Authentication("Invalid token signature".to_string())
                }
                _ => AppError::Authentication(format!("Invalid token: {}", e)),
            }
        })
}

/// Authenticated context - extracts and validates the caller
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: String,
    /// Effective role: stored role, raised to admin for configured admins
    pub role: Role,
    pub ip_address: String,
}

impl AuthContext {
    pub fn actor(&self) -> Actor {
        Actor {
            user_id: self.user_id.clone(),
            role: self.role,
            ip_address: self.ip_address.clone(),
        }
    }
}

#[async_trait]
impl FromRequestParts<AppContext> for AuthContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers)
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

        let claims = verify_token(&token, &state.config.authentication.jwt_secret)?;

        let user = state
            .content
            .users
            .get_user(&claims.sub)
            .await?
            .ok_or_else(|| AppError::Authentication("Unknown user".to_string()))?;

        if user.suspended {
            tracing::warn!("Suspended user {} rejected", user.id);
            return Err(AppError::Authorization("Account is suspended".to_string()));
        }

        let is_configured_admin = state
            .config
            .authentication
            .admin_user_ids
            .contains(&user.id);
        let role = if is_configured_admin {
            Role::Admin
        } else {
            user.role
        };

        Ok(AuthContext {
            user_id: user.id,
            role,
            ip_address: client_ip(&parts.headers),
        })
    }
}

/// Moderation context - requires moderator role or higher
#[derive(Debug, Clone)]
pub struct AdminAuthContext {
    pub user_id: String,
    pub role: Role,
    pub ip_address: String,
}

impl AdminAuthContext {
    pub fn actor(&self) -> Actor {
        Actor {
            user_id: self.user_id.clone(),
            role: self.role,
            ip_address: self.ip_address.clone(),
        }
    }
}

#[async_trait]
impl FromRequestParts<AppContext> for AdminAuthContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let auth = AuthContext::from_request_parts(parts, state).await?;
        crate::require_admin_role!(auth, Role::Moderator);

        tracing::debug!("AdminAuthContext: {} acting as {}", auth.user_id, auth.role);

        Ok(AdminAuthContext {
            user_id: auth.user_id,
            role: auth.role,
            ip_address: auth.ip_address,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_issue_and_verify() {
        let token = issue_token("U1", SECRET, Duration::hours(1)).unwrap();
        let claims = verify_token(&token, SECRET).unwrap();
        assert_eq!(claims.sub, "U1");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = issue_token("U1", SECRET, Duration::hours(1)).unwrap();
        let result = verify_token(&token, "another-secret-another-secret-xx");
        assert!(matches!(result, Err(AppError::Authentication(_))));
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = issue_token("U1", SECRET, Duration::hours(-2)).unwrap();
        let result = verify_token(&token, SECRET);
        assert!(matches!(result, Err(AppError::Authentication(_))));
    }
}
