//! Authentication and session lifecycle.
//!
//! Sign-in issues a JWT naming both the user and a stored session row.
//! Signing out deletes the row, which revokes the token even before it expires.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand_core::OsRng;
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    db,
    error::{AppError, Result},
    models::{Claims, CreateUser, LoginRequest, Session, Token, User},
};

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Clone)]
pub struct SessionProvider {
    pool: SqlitePool,
    secret: Arc<str>,
    token_ttl: Duration,
}

impl SessionProvider {
    pub fn new(pool: SqlitePool, secret: &str, token_ttl: Duration) -> Self {
        Self {
            pool,
            secret: Arc::from(secret),
            token_ttl,
        }
    }

    pub async fn sign_up(&self, payload: CreateUser) -> Result<User> {
        let email = payload.email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(AppError::ValidationError("Invalid email address".to_string()));
        }
        if payload.password.len() < MIN_PASSWORD_LEN {
            return Err(AppError::ValidationError(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let user_exists = sqlx::query("SELECT 1 FROM users WHERE email = ?")
            .bind(&email)
            .fetch_optional(&self.pool)
            .await?;

        if user_exists.is_some() {
            return Err(AppError::ValidationError("Email already registered".to_string()));
        }

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(payload.password.as_bytes(), &salt)
            .map_err(|e| AppError::InternalError(e.to_string()))?
            .to_string();

        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (id, email, hashed_password) VALUES (?, ?, ?) RETURNING *",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&email)
        .bind(&password_hash)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(user_id = %user.id, "account created");
        Ok(user)
    }

    pub async fn sign_in(&self, payload: LoginRequest) -> Result<(Session, Token)> {
        let email = payload.email.trim().to_lowercase();

        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(&email)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::AuthError("Invalid credentials".to_string()))?;

        let parsed_hash = PasswordHash::new(&user.hashed_password)
            .map_err(|_| AppError::AuthError("Invalid password hash in DB".to_string()))?;

        Argon2::default()
            .verify_password(payload.password.as_bytes(), &parsed_hash)
            .map_err(|_| AppError::AuthError("Invalid credentials".to_string()))?;

        let session_id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;
        // Rows older than the token lifetime back only expired tokens.
        let pruned = sqlx::query("DELETE FROM sessions WHERE user_id = ? AND created_at < ?")
            .bind(&user.id)
            .bind(db::timestamp(now - self.token_ttl))
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if pruned > 0 {
            tracing::debug!(user_id = %user.id, pruned, "expired sessions removed");
        }
        sqlx::query("INSERT INTO sessions (id, user_id) VALUES (?, ?)")
            .bind(&session_id)
            .bind(&user.id)
            .execute(&mut *tx)
            .await?;
        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET last_sign_in_at = ? WHERE id = ? RETURNING *",
        )
        .bind(db::timestamp(now))
        .bind(&user.id)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        let claims = Claims {
            sub: user.id.clone(),
            sid: session_id.clone(),
            exp: (now + self.token_ttl).timestamp() as usize,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AppError::InternalError(format!("Token creation failed: {}", e)))?;

        tracing::debug!(user_id = %user.id, session_id = %session_id, "signed in");

        Ok((
            Session {
                id: session_id,
                user,
            },
            Token {
                access_token: token,
                token_type: "bearer".to_string(),
            },
        ))
    }

    /// Resolves a bearer token to its live session.
    pub async fn resolve(&self, token: &str) -> Result<Session> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| AppError::AuthError(format!("Invalid token: {}", e)))?;

        let claims = token_data.claims;

        let user = sqlx::query_as::<_, User>(
            "SELECT u.* FROM sessions s JOIN users u ON u.id = s.user_id
             WHERE s.id = ? AND s.user_id = ?",
        )
        .bind(&claims.sid)
        .bind(&claims.sub)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::AuthError("Session expired or revoked".to_string()))?;

        Ok(Session {
            id: claims.sid,
            user,
        })
    }

    pub async fn sign_out(&self, session: &Session) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE id = ? AND user_id = ?")
            .bind(&session.id)
            .bind(session.user_id())
            .execute(&self.pool)
            .await?;

        tracing::debug!(user_id = %session.user_id(), session_id = %session.id, "signed out");
        Ok(())
    }
}
