use serde::{Deserialize, Serialize};

pub mod dashboard_models;

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub username: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Admin username.
    pub sub: String,
    pub exp: usize,
}

/// Set by the auth middleware as a request extension.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub username: String,
}
