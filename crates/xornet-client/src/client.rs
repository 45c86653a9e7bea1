//! The client context object.
//!
//! Everything the app needs, built once and passed around explicitly:
//! config, token holder, REST client, entity stores with their
//! coalescers, the users service, the sync driver and the host bridge.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, warn};
use xornet_core::{EntityId, FetchError, Machine, RequestCoalescer, SharedStore, User};

use crate::api::{ApiClient, RestFetcher};
use crate::bridge::{UiBridge, CLEAR_PRESENCE};
use crate::config::ClientConfig;
use crate::driver::{SyncDriver, SyncHandle, SyncSettings};
use crate::error::{ApiError, TokenError};
use crate::token::TokenHolder;
use crate::transport::Connector;
use crate::users::{LoginForm, SignupForm, UsersService};

pub struct XornetClient {
    config: ClientConfig,
    token: Arc<dyn TokenHolder>,
    api: Arc<ApiClient>,
    users: UsersService,
    machines: SharedStore<Machine>,
    machine_loader: RequestCoalescer<Machine>,
    sync: SyncHandle,
    driver: JoinHandle<()>,
    bridge: Arc<dyn UiBridge>,
}

impl XornetClient {
    /// Build the context and spawn the sync driver (idle until
    /// [`start_sync`](Self::start_sync)). Must run inside a tokio runtime.
    pub fn new(
        config: ClientConfig,
        token: Arc<dyn TokenHolder>,
        connector: Arc<dyn Connector>,
        bridge: Arc<dyn UiBridge>,
    ) -> Result<Self, ApiError> {
        let api = Arc::new(ApiClient::new(
            &config.base_url,
            Arc::clone(&token),
            config.request_timeout(),
        )?);

        let users = UsersService::new(Arc::clone(&api), Arc::clone(&token), SharedStore::new());

        let machines = SharedStore::new();
        let machine_loader = RequestCoalescer::new(
            machines.clone(),
            Arc::new(RestFetcher::<Machine>::new(Arc::clone(&api), "/machines")),
        );

        let (driver, sync) = SyncDriver::new(
            SyncSettings::from_config(&config),
            connector,
            Arc::clone(&token),
            machines.clone(),
        );
        let driver = driver.spawn();

        Ok(XornetClient {
            config,
            token,
            api,
            users,
            machines,
            machine_loader,
            sync,
            driver,
            bridge,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn users(&self) -> &UsersService {
        &self.users
    }

    pub fn machines(&self) -> &SharedStore<Machine> {
        &self.machines
    }

    pub fn sync(&self) -> &SyncHandle {
        &self.sync
    }

    pub fn is_logged_in(&self) -> bool {
        self.token.get().is_some()
    }

    /// Open the socket (idempotent). Recovery from then on is the
    /// watchdog's job.
    pub fn start_sync(&self) {
        self.sync.connect();
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<User, ApiError> {
        let form = LoginForm {
            username: username.to_string(),
            password: password.to_string(),
        };
        let user = self.users.login(&form).await?;
        self.start_sync();
        Ok(user)
    }

    pub async fn signup(&self, form: &SignupForm) -> Result<User, ApiError> {
        let user = self.users.signup(form).await?;
        self.start_sync();
        Ok(user)
    }

    /// Machine from the store, loading it over REST at most once if it
    /// has not arrived through telemetry yet.
    pub async fn ensure_machine(&self, id: &EntityId) -> Result<Machine, FetchError> {
        self.machine_loader.ensure_loaded(id).await
    }

    /// Stop the sync, forget all state and the token, and tell the host
    /// to drop its presence.
    pub fn logout(&self) -> Result<(), TokenError> {
        self.sync.logout();
        self.machine_loader.reset();
        self.users.logout()?;
        self.bridge.emit(CLEAR_PRESENCE, None);
        Ok(())
    }

    /// Stop the driver and wait for it to finish.
    pub async fn shutdown(self) {
        self.sync.shutdown();
        if let Err(e) = self.driver.await {
            warn!("Sync driver ended abnormally: {}", e);
        }
        info!("Client shut down");
    }
}
