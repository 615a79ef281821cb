use axum::Extension;
use bcrypt::verify;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};

use crate::server::config::AuthConfig;
use crate::web::error::AppError;
use crate::web::models::{AuthenticatedUser, Claims, LoginRequest, LoginResponse, UserResponse};

const TOKEN_LIFETIME_HOURS: i64 = 24;

/// Checks the single admin account and issues a session token.
pub fn login_user(auth: &AuthConfig, req: &LoginRequest) -> Result<LoginResponse, AppError> {
    if req.username.trim().is_empty() || req.password.is_empty() {
        return Err(AppError::InvalidInput("Username and password are required.".to_string()));
    }

    if req.username != auth.admin_username {
        return Err(AppError::InvalidCredentials);
    }

    let valid_password = verify(&req.password, &auth.admin_password_hash)
        .map_err(|e| AppError::InternalServerError(format!("Password verification failed: {e}")))?;

    if !valid_password {
        return Err(AppError::InvalidCredentials);
    }

    create_jwt(&auth.admin_username, &auth.jwt_secret)
}

pub fn create_jwt(username: &str, jwt_secret: &str) -> Result<LoginResponse, AppError> {
    let expiration = (Utc::now() + Duration::hours(TOKEN_LIFETIME_HOURS)).timestamp() as usize;

    let claims = Claims {
        sub: username.to_string(),
        exp: expiration,
    };

    let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(jwt_secret.as_ref()))
        .map_err(|e| AppError::TokenCreationError(e.to_string()))?;

    Ok(LoginResponse {
        token,
        username: username.to_string(),
    })
}

pub async fn me(Extension(user): Extension<AuthenticatedUser>) -> Result<axum::Json<UserResponse>, AppError> {
    Ok(axum::Json(UserResponse {
        username: user.username,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, DecodingKey, Validation};

    fn auth() -> AuthConfig {
        AuthConfig {
            admin_username: "admin".into(),
            admin_password_hash: bcrypt::hash("hunter22", 4).unwrap(),
            jwt_secret: "secret".into(),
        }
    }

    fn request(username: &str, password: &str) -> LoginRequest {
        LoginRequest {
            username: username.into(),
            password: password.into(),
        }
    }

    #[test]
    fn valid_credentials_yield_a_decodable_token() {
        let response = login_user(&auth(), &request("admin", "hunter22")).unwrap();
        let data = decode::<Claims>(
            &response.token,
            &DecodingKey::from_secret(b"secret"),
            &Validation::default(),
        )
        .unwrap();
        assert_eq!(data.claims.sub, "admin");
    }

    #[test]
    fn wrong_password_or_user_is_rejected() {
        assert!(matches!(
            login_user(&auth(), &request("admin", "nope")),
            Err(AppError::InvalidCredentials)
        ));
        assert!(matches!(
            login_user(&auth(), &request("root", "hunter22")),
            Err(AppError::InvalidCredentials)
        ));
        assert!(matches!(login_user(&auth(), &request("", "x")), Err(AppError::InvalidInput(_))));
    }
}
