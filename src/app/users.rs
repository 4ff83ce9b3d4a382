use serde::Deserialize;
use tracing::{info, warn};

use super::{App, AppError, AppResult};
use crate::auth::{self, TokenError};
use crate::database::StoreError;
use crate::model::user::{is_valid_email, is_valid_username};
use crate::model::{Session, User};
use crate::utils::now_millis;

pub const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Admin edit; empty strings keep the stored value
#[derive(Debug, Default, Deserialize)]
pub struct UserUpdate {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// The caller behind a valid bearer token
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub session: Session,
    pub user: User,
}

impl AuthSession {
    pub fn user_id(&self) -> &str {
        &self.user.id
    }
}

fn validate_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::BadRequest(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

fn hash(password: &str) -> AppResult<String> {
    auth::hash_password(password).map_err(AppError::Internal)
}

impl App {
    /// Open registration, or bootstrap the very first account when registration is closed
    pub async fn register_user(&self, request: RegisterRequest) -> AppResult<User> {
        let username = request.username.trim();
        let email = request.email.trim();

        if !is_valid_username(username) {
            return Err(AppError::BadRequest("invalid username".to_string()));
        }
        if !is_valid_email(email) {
            return Err(AppError::BadRequest("invalid email".to_string()));
        }
        validate_password(&request.password)?;

        let password_hash = hash(&request.password)?;

        // Closed registration only admits the first account; concurrent sign-ups
        // on an empty system must not all see a zero count.
        let _bootstrap = if self.config.features.enable_public_registration {
            None
        } else {
            let guard = self.bootstrap.lock().await;
            if self.store.user_count().await? > 0 {
                return Err(AppError::Forbidden("registration is disabled".to_string()));
            }
            Some(guard)
        };

        let user = User::new(username, email, password_hash);
        self.store.create_user(&user).await?;
        info!(user_id = %user.id, username = %user.username, "user registered");
        Ok(user)
    }

    /// Verify credentials and open a session; returns the bearer token
    pub async fn login(&self, request: LoginRequest) -> AppResult<(String, User)> {
        let invalid = || AppError::Unauthorized("invalid username or password".to_string());

        let user = self
            .store
            .get_user_by_username(request.username.trim())
            .await?
            .ok_or_else(invalid)?;

        match auth::verify_password(&request.password, &user.password_hash) {
            Ok(true) => {}
            Ok(false) => return Err(invalid()),
            Err(e) => {
                warn!(user_id = %user.id, "stored password hash unreadable: {}", e);
                return Err(invalid());
            }
        }

        let session = Session::new(&user.id);
        self.store.create_session(&session).await?;
        let token = auth::generate_token(&session, &self.config.security)
            .map_err(|e| AppError::Internal(e.to_string()))?;

        Ok((token, user))
    }

    /// End a session and close the websocket connections opened with it
    pub async fn logout(&self, session_id: &str) -> AppResult<()> {
        self.store.delete_session(session_id).await?;
        self.hub.disconnect_session(session_id).await;
        Ok(())
    }

    /// Resolve a bearer token to its live session and user
    pub async fn authenticate(&self, token: &str) -> AppResult<AuthSession> {
        let claims = auth::validate_token(token, &self.config.security).map_err(|e| match e {
            TokenError::Invalid(msg) => AppError::Unauthorized(msg),
            other => AppError::Internal(other.to_string()),
        })?;

        let session = self
            .store
            .get_session(&claims.sid)
            .await?
            .ok_or_else(|| AppError::Unauthorized("session not found".to_string()))?;

        if session.user_id != claims.sub {
            return Err(AppError::Unauthorized("session does not match token".to_string()));
        }
        if session.is_expired(self.config.security.session_expiry_hours, now_millis()) {
            self.store.delete_session(&session.id).await?;
            self.hub.disconnect_session(&session.id).await;
            return Err(AppError::Unauthorized("session expired".to_string()));
        }

        let user = match self.store.get_user(&session.user_id).await {
            Ok(user) => user,
            Err(StoreError::NotFound(_)) => return Err(AppError::Unauthorized("user no longer exists".to_string())),
            Err(e) => return Err(e.into()),
        };

        Ok(AuthSession { session, user })
    }

    pub async fn get_user(&self, user_id: &str) -> AppResult<User> {
        Ok(self.store.get_user(user_id).await?)
    }

    pub async fn get_all_users(&self) -> AppResult<Vec<User>> {
        Ok(self.store.get_all_users().await?)
    }

    pub async fn update_user(&self, user_id: &str, update: UserUpdate) -> AppResult<User> {
        let mut user = self.store.get_user(user_id).await?;

        let username = update.username.trim();
        if !username.is_empty() {
            if !is_valid_username(username) {
                return Err(AppError::BadRequest("invalid username".to_string()));
            }
            user.username = username.to_string();
        }
        let email = update.email.trim();
        if !email.is_empty() {
            if !is_valid_email(email) {
                return Err(AppError::BadRequest("invalid email".to_string()));
            }
            user.email = email.to_string();
        }
        if !update.password.is_empty() {
            validate_password(&update.password)?;
        }

        user.update_at = now_millis();
        self.store.update_user(&user).await?;

        if !update.password.is_empty() {
            let password_hash = hash(&update.password)?;
            self.store.update_user_password(user_id, &password_hash, user.update_at).await?;
            user.password_hash = password_hash;
        }

        Ok(user)
    }

    pub async fn delete_user(&self, user_id: &str) -> AppResult<()> {
        self.store.delete_user(user_id).await?;
        self.hub.disconnect_user(user_id).await;
        self.permissions.reset().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::AppConfig;
    use crate::database::{MemoryStore, Store};
    use crate::ws::WsHub;

    fn app_with(public_registration: bool) -> (Arc<App>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let mut config = AppConfig::development();
        config.features.enable_public_registration = public_registration;
        let app = App::new(store.clone(), Arc::new(WsHub::new()), Arc::new(config));
        (Arc::new(app), store)
    }

    fn request(username: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password: "password123".to_string(),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn closed_registration_admits_one_account_under_concurrency() {
        let (app, store) = app_with(false);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let app = app.clone();
                tokio::spawn(async move { app.register_user(request(&format!("user{}", i))).await })
            })
            .collect();

        let mut accepted = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => accepted += 1,
                Err(AppError::Forbidden(_)) => {}
                Err(e) => panic!("unexpected error: {}", e),
            }
        }

        assert_eq!(accepted, 1);
        assert_eq!(store.user_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn open_registration_admits_everyone() {
        let (app, store) = app_with(true);
        app.register_user(request("alice")).await.unwrap();
        app.register_user(request("bob")).await.unwrap();
        assert_eq!(store.user_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn login_then_logout_revokes_the_token() {
        let (app, _store) = app_with(true);
        app.register_user(request("alice")).await.unwrap();

        let (token, user) = app
            .login(LoginRequest { username: "alice".into(), password: "password123".into() })
            .await
            .unwrap();
        let auth = app.authenticate(&token).await.unwrap();
        assert_eq!(auth.user_id(), user.id);

        app.logout(&auth.session.id).await.unwrap();
        assert!(matches!(app.authenticate(&token).await, Err(AppError::Unauthorized(_))));
    }
}
