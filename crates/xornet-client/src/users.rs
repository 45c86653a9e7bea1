//! Users service: login/signup, the logged-in user, and cached lookups
//! of other users.
//!
//! Lookups of unknown users go through a [`RequestCoalescer`], so a
//! screen full of avatars triggers one `GET /users/<id>` per user.

use std::sync::{Arc, PoisonError, RwLock};

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use xornet_core::{EntityId, FetchError, RequestCoalescer, SharedStore, User};

use crate::api::{ApiClient, RestFetcher};
use crate::error::{ApiError, TokenError};
use crate::token::TokenHolder;

#[derive(Debug, Clone, Serialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignupForm {
    pub username: String,
    pub password: String,
    pub email: String,
}

/// What `@login` and `@signup` answer with.
#[derive(Debug, Deserialize)]
struct AuthResponse {
    token: String,
    user: User,
}

pub struct UsersService {
    api: Arc<ApiClient>,
    token: Arc<dyn TokenHolder>,
    loader: RequestCoalescer<User>,
    me: RwLock<Option<EntityId>>,
}

impl UsersService {
    pub fn new(api: Arc<ApiClient>, token: Arc<dyn TokenHolder>, store: SharedStore<User>) -> Self {
        let fetcher = Arc::new(RestFetcher::<User>::new(Arc::clone(&api), "/users"));
        UsersService {
            api,
            token,
            loader: RequestCoalescer::new(store, fetcher),
            me: RwLock::new(None),
        }
    }

    pub fn store(&self) -> &SharedStore<User> {
        self.loader.store()
    }

    /// `POST /users/@login`. Stores the returned token and user.
    pub async fn login(&self, form: &LoginForm) -> Result<User, ApiError> {
        let response: AuthResponse = self.api.send(Method::POST, "/users/@login", form).await?;
        self.accept(response)
    }

    /// `POST /users/@signup`. Same effect as a login on success.
    pub async fn signup(&self, form: &SignupForm) -> Result<User, ApiError> {
        let response: AuthResponse = self.api.send(Method::POST, "/users/@signup", form).await?;
        self.accept(response)
    }

    /// `GET /users/@me`, recorded as the logged-in user.
    pub async fn fetch_me(&self) -> Result<User, ApiError> {
        let user: User = self.api.get("/users/@me").await?;
        self.set_me(user.clone());
        Ok(user)
    }

    pub fn me_id(&self) -> Option<EntityId> {
        self.me.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn me(&self) -> Option<User> {
        self.me_id().and_then(|id| self.store().get(&id))
    }

    /// Cached user, or `None` while a coalesced fetch is started in the
    /// background.
    pub fn user(&self, id: &EntityId) -> Option<User> {
        let user = self.store().get(id);
        if user.is_none() {
            self.loader.request(id);
        }
        user
    }

    /// Cached user, fetching it (at most once) if needed.
    pub async fn ensure_user(&self, id: &EntityId) -> Result<User, FetchError> {
        self.loader.ensure_loaded(id).await
    }

    /// `PATCH /users/@avatar`, then patch the stored user. No-op when
    /// logged out.
    pub async fn update_avatar(&self, url: &str) -> Result<Option<User>, ApiError> {
        if self.me().is_none() {
            return Ok(None);
        }

        let updated: User = self
            .api
            .send(Method::PATCH, "/users/@avatar", &json!({ "url": url }))
            .await?;

        let mut store = self.store().write();
        let mut user = store.get(&updated.uuid).cloned().unwrap_or(updated);
        user.avatar = Some(url.to_string());
        store.set(user.clone());
        Ok(Some(user))
    }

    /// Forget the logged-in user, every cached user and the token.
    pub fn logout(&self) -> Result<(), TokenError> {
        *self.me.write().unwrap_or_else(PoisonError::into_inner) = None;
        self.loader.reset();
        self.token.clear()?;
        info!("Logged out");
        Ok(())
    }

    fn accept(&self, response: AuthResponse) -> Result<User, ApiError> {
        self.token.set(&response.token)?;
        info!("Logged in as {}", response.user.username);
        self.set_me(response.user.clone());
        Ok(response.user)
    }

    fn set_me(&self, user: User) {
        *self.me.write().unwrap_or_else(PoisonError::into_inner) = Some(user.uuid.clone());
        self.store().set(user);
    }
}
