use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::{SaltString, rand_core::OsRng}};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::{info, warn};
use uuid::Uuid;

use notebox_db::Database;
use notebox_types::api::{AuthResponse, Claims, LoginRequest, RegisterRequest};

use crate::blocking;
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::service::NoteService;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub notes: NoteService,
    pub jwt_secret: String,
    pub token_ttl: Duration,
}

impl AppStateInner {
    pub fn new(db: Arc<Database>, jwt_secret: String, token_ttl: Duration) -> AppState {
        Arc::new(Self {
            notes: NoteService::new(db.clone()),
            db,
            jwt_secret,
            token_ttl,
        })
    }
}

pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Validate input
    if req.username.len() < 3 || req.username.len() > 32 {
        return Err(ApiError::bad_request("Username must be between 3 and 32 characters"));
    }
    if req.password.len() < 8 {
        return Err(ApiError::bad_request("Password must be at least 8 characters"));
    }
    if !req.email.contains('@') {
        return Err(ApiError::bad_request("Email address is invalid"));
    }

    let db = state.db.clone();
    let RegisterRequest { username, password, email } = req;
    let user_id = Uuid::new_v4();

    let username = blocking(move || -> Result<String, ApiError> {
        // Check if username is taken
        if db.get_user_by_username(&username)?.is_some() {
            return Err(username_taken(&username));
        }

        let password_hash = hash_password(&password)?;

        // A concurrent registration may have claimed the name since the check
        if !db.create_user(&user_id.to_string(), &username, &password_hash, &email)? {
            return Err(username_taken(&username));
        }
        Ok(username)
    })
    .await?;

    let token = create_token(&state, user_id, &username)?;
    info!("Registered user {}", username);

    Ok((StatusCode::CREATED, Json(AuthResponse { token, username })))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.db.clone();

    let user = blocking(move || -> Result<_, ApiError> {
        let user = db
            .get_user_by_username(&req.username)?
            .ok_or_else(|| ApiError::unauthenticated("Invalid username or password"))?;

        // Verify password
        let parsed_hash = PasswordHash::new(&user.password)
            .map_err(|e| ApiError::internal(format!("stored hash unreadable: {}", e)))?;

        Argon2::default()
            .verify_password(req.password.as_bytes(), &parsed_hash)
            .map_err(|_| {
                warn!("Failed login for {}", user.username);
                ApiError::unauthenticated("Invalid username or password")
            })?;

        Ok(user)
    })
    .await?;

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| ApiError::internal(format!("corrupt user id '{}': {}", user.id, e)))?;

    let token = create_token(&state, user_id, &user.username)?;

    Ok(Json(AuthResponse {
        token,
        username: user.username,
    }))
}

fn username_taken(username: &str) -> ApiError {
    ApiError::Conflict(format!("Username '{}' is already taken", username))
}

/// Argon2id with a fresh random salt, in PHC string form.
fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::internal(format!("password hashing failed: {}", e)))
}

fn create_token(state: &AppStateInner, user_id: Uuid, username: &str) -> Result<String, ApiError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        iat: now.timestamp(),
        exp: (now + state.token_ttl).timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.jwt_secret.as_bytes()),
    )
    .map_err(|e| ApiError::internal(format!("token encoding failed: {}", e)))
}
