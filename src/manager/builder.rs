use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use steamid_ng::SteamID;
use tokio::sync::{Mutex, Notify};

use crate::confirmation::ConfirmationEngine;
use crate::config::Config;
use crate::helpers::DEFAULT_CLIENT;
use crate::poll_data::{PollData, PollDataStore};
use crate::session::Session;
use crate::transport::Transport;
use crate::types::HttpClient;
use super::OfferManager;

/// Builder for [`OfferManager`]. Mirrors the teacher's two-phase construction (steamid + key up
/// front, everything else optional).
pub struct OfferManagerBuilder {
    steamid: SteamID,
    api_key: String,
    identity_secret: Option<String>,
    client: Option<HttpClient>,
    store: Option<Arc<dyn PollDataStore>>,
    username: Option<String>,
    config: Config,
}

impl OfferManagerBuilder {
    pub fn new(steamid: SteamID, api_key: impl Into<String>) -> Self {
        Self {
            steamid,
            api_key: api_key.into(),
            identity_secret: None,
            client: None,
            store: None,
            username: None,
            config: Config::default(),
        }
    }

    /// The shared secret used to derive mobile confirmation keys. Without this, `cancel`-side
    /// confirmations (and anything that routes through [`ConfirmationEngine`]) fail with
    /// [`crate::error::ParameterError::NoIdentitySecret`].
    pub fn identity_secret(mut self, identity_secret: impl Into<String>) -> Self {
        self.identity_secret = Some(identity_secret.into());
        self
    }

    /// Overrides the HTTP client used for every outbound request. Useful for sharing a cookie
    /// jar with other parts of a host application.
    pub fn client(mut self, client: HttpClient) -> Self {
        self.client = Some(client);
        self
    }

    /// Enables persistence of poll data across restarts, keyed by `username`.
    pub fn poll_data_store(mut self, store: Arc<dyn PollDataStore>, username: impl Into<String>) -> Self {
        self.store = Some(store);
        self.username = Some(username.into());
        self
    }

    /// Milliseconds between reconciliation ticks. A negative value disables automatic
    /// scheduling. Default 30000.
    pub fn interval(mut self, interval_ms: i64) -> Self {
        self.config.interval = interval_ms;
        self
    }

    /// Auto-cancels `Active` sent offers older than this (ms).
    pub fn cancel_time(mut self, ms: i64) -> Self {
        self.config.cancel_time = Some(ms);
        self
    }

    /// Auto-cancels `CreatedNeedsConfirmation` sent offers older than this (ms).
    pub fn pending_cancel_time(mut self, ms: i64) -> Self {
        self.config.pending_cancel_time = Some(ms);
        self
    }

    /// Caps the number of outstanding `Active` sent offers, trimming the oldest first.
    pub fn cancel_offer_count(mut self, count: usize) -> Self {
        self.config.cancel_offer_count = Some(count);
        self
    }

    /// Minimum age (ms) an offer must reach before `cancel_offer_count` trimming considers it.
    pub fn cancel_offer_count_min_age(mut self, ms: i64) -> Self {
        self.config.cancel_offer_count_min_age = ms;
        self
    }

    /// Whether to request item descriptions from the remote API.
    pub fn get_descriptions(mut self, enabled: bool) -> Self {
        self.config.get_descriptions = enabled;
        self
    }

    /// Language tag for descriptions and error text. Default `"english"`.
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.config.language = language.into();
        self
    }

    pub fn build(self) -> OfferManager {
        let Self { steamid, api_key, identity_secret, client, store, username, config } = self;
        let client = client.unwrap_or_else(|| DEFAULT_CLIENT.clone());
        let transport = Transport::new(client);
        let api = crate::api::RemoteApi::new(transport.clone(), api_key, config.language.clone());
        let confirmation = Arc::new(ConfirmationEngine::new(transport, steamid, identity_secret));
        let username = username.unwrap_or_else(|| u64::from(steamid).to_string());

        OfferManager {
            steamid,
            api,
            confirmation,
            session: Arc::new(std::sync::RwLock::new(Session::default())),
            poll_data: Arc::new(Mutex::new(PollData::new())),
            pending_send_counter: Arc::new(AtomicUsize::new(0)),
            config,
            store,
            username,
            poll_trigger: Arc::new(Notify::new()),
            polling: Arc::new(std::sync::Mutex::new(None)),
        }
    }
}
