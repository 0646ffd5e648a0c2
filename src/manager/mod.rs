//! The manager facade (component L): the single type embedding consumers construct. Owns the
//! shared collaborators (`RemoteApi`, `ConfirmationEngine`, the poll-data mutex) and the
//! currently-running polling task, and hands out an [`OfferContext`] so per-offer verbs
//! (`offer.send(&ctx)`, `offer.accept(&ctx, ..)`, ...) can reach them without an offer carrying a
//! back-reference to its manager.

pub mod builder;

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use steamid_ng::SteamID;
use tokio::sync::{mpsc, Mutex, Notify};
use tokio::task::JoinHandle;

pub use builder::OfferManagerBuilder;

use crate::api::{RemoteApi, TradeOffersPage};
use crate::confirmation::ConfirmationEngine;
use crate::confirmation::entry::{ConfirmationEntry, Operation};
use crate::config::Config;
use crate::context::OfferContext;
use crate::enums::OfferFilter;
use crate::error::Result;
use crate::offer::Offer;
use crate::ops::SendOutcome;
use crate::events::Event;
use crate::poll_data::{PollData, PollDataStore};
use crate::poller::{Poller, TickOutcome};
use crate::session::Session;
use crate::types::TradeOfferId;

/// Owns every collaborator a reconciliation tick or per-offer verb needs, plus the handle to
/// whichever [`Poller`] is currently running.
#[derive(Clone)]
pub struct OfferManager {
    pub steamid: SteamID,
    api: RemoteApi,
    confirmation: Arc<ConfirmationEngine>,
    session: Arc<std::sync::RwLock<Session>>,
    poll_data: Arc<Mutex<PollData>>,
    pending_send_counter: Arc<AtomicUsize>,
    config: Config,
    store: Option<Arc<dyn PollDataStore>>,
    username: String,
    poll_trigger: Arc<Notify>,
    #[allow(clippy::type_complexity)]
    polling: Arc<std::sync::Mutex<Option<(Arc<Poller>, Option<JoinHandle<()>>)>>>,
}

impl OfferManager {
    /// Creates a manager with default configuration. Use [`OfferManager::builder`] to configure
    /// auto-cancel policies, persistence, or polling interval.
    pub fn new(steamid: SteamID, api_key: impl Into<String>) -> Self {
        Self::builder(steamid, api_key).build()
    }

    pub fn builder(steamid: SteamID, api_key: impl Into<String>) -> OfferManagerBuilder {
        OfferManagerBuilder::new(steamid, api_key)
    }

    /// Populates the session from cookies obtained through an externally-driven login. Must be
    /// called (and kept current, e.g. on re-login) before `send`/`accept`/`decline`/polling can
    /// succeed.
    pub fn set_session(&self, sessionid: impl Into<String>, cookies: &[String]) -> Result<()> {
        let data = crate::helpers::extract_auth_data_from_cookies(cookies)?;
        let mut session = self.session.write().unwrap();

        *session = Session {
            sessionid: sessionid.into(),
            access_token: data.access_token,
            steamid: data.steamid,
        };

        Ok(())
    }

    /// The context passed into per-offer verbs. Carries this manager's `poll_trigger`, so a
    /// successful `send`/`accept`/`decline` wakes the reconciliation loop early.
    pub fn context(&self) -> OfferContext {
        OfferContext::new(
            self.api.clone(),
            self.session.read().unwrap().clone(),
            self.poll_data.clone(),
            self.pending_send_counter.clone(),
            Some(self.poll_trigger.clone()),
        )
    }

    /// Constructs a new, unsent offer for `partner`.
    pub fn new_offer(&self, partner: SteamID, token: Option<String>) -> Result<Offer> {
        Offer::new(partner, token)
    }

    pub async fn send_offer(&self, offer: &mut Offer) -> Result<SendOutcome> {
        offer.send(&self.context()).await
    }

    pub async fn accept_offer(&self, offer: &mut Offer, skip_refresh: bool) -> Result<&'static str> {
        offer.accept(&self.context(), skip_refresh).await
    }

    pub async fn cancel_offer(&self, offer: &mut Offer) -> Result<()> {
        offer.cancel(&self.context()).await
    }

    pub async fn decline_offer(&self, offer: &mut Offer) -> Result<()> {
        offer.decline(&self.context()).await
    }

    pub async fn refresh_offer(&self, offer: &mut Offer) -> Result<()> {
        offer.refresh(&self.context()).await
    }

    /// Fetches a single offer by id.
    pub async fn get_trade_offer(&self, tradeofferid: TradeOfferId) -> Result<Offer> {
        self.api.get_trade_offer(tradeofferid, self.config.get_descriptions).await
    }

    /// Fetches sent and received offers matching `filter`, updated since `cutoff` (unix
    /// seconds).
    pub async fn get_trade_offers(&self, filter: OfferFilter, cutoff: i64) -> Result<TradeOffersPage> {
        self.api.get_trade_offers(filter, cutoff, self.config.get_descriptions).await
    }

    /// Fetches the current mobile confirmation list.
    pub async fn get_confirmations(&self) -> Result<Vec<ConfirmationEntry>> {
        self.confirmation.fetch_list().await
    }

    /// Confirms the offer's pending mobile confirmation, if one exists.
    pub async fn confirm_offer(&self, tradeofferid: TradeOfferId) -> Result<()> {
        self.confirmation.respond_to_offer(tradeofferid, Operation::Allow).await
    }

    /// Cancels the offer's pending mobile confirmation, if one exists.
    pub async fn deny_confirmation_for_offer(&self, tradeofferid: TradeOfferId) -> Result<()> {
        self.confirmation.respond_to_offer(tradeofferid, Operation::Cancel).await
    }

    /// Cancels every currently outstanding mobile confirmation.
    pub async fn cancel_all_confirmations(&self) -> Result<()> {
        self.confirmation.cancel_all().await
    }

    /// Starts the reconciliation loop. Any previously running loop is stopped first (its current
    /// tick, if any, is left to finish; it just stops being rescheduled). Returns the channel
    /// events are published on — if the receiver is dropped, event delivery is simply dropped,
    /// polling itself keeps running.
    pub fn start_polling(&self) -> mpsc::Receiver<Event> {
        let (tx, rx) = mpsc::channel(64);
        let poller = Poller::new(
            self.steamid,
            self.api.clone(),
            self.session.clone(),
            self.poll_data.clone(),
            self.pending_send_counter.clone(),
            self.config.clone(),
            self.store.clone(),
            self.username.clone(),
            tx,
            self.poll_trigger.clone(),
        );
        let handle = poller.clone().spawn();
        let mut polling = self.polling.lock().unwrap();

        if let Some((prev_poller, prev_handle)) = polling.take() {
            prev_poller.stop();

            if let Some(prev_handle) = prev_handle {
                prev_handle.abort();
            }
        }

        *polling = Some((poller, handle));

        rx
    }

    /// Stops the reconciliation loop, letting its current tick (if any) finish first.
    pub async fn stop_polling(&self) {
        let prev = self.polling.lock().unwrap().take();

        if let Some((poller, handle)) = prev {
            poller.stop();

            if let Some(handle) = handle {
                let _ = handle.await;
            }
        }
    }

    /// Manually runs one reconciliation tick. Returns `None` if `start_polling` hasn't been
    /// called yet. Useful when `interval` is negative (automatic scheduling disabled) or to
    /// force an out-of-band poll.
    pub async fn tick(&self, full_update: bool) -> Option<TickOutcome> {
        let poller = self.polling.lock().unwrap().as_ref().map(|(poller, _)| poller.clone());

        match poller {
            Some(poller) => Some(poller.tick(full_update).await),
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use steamid_ng::{AccountType, Instance, Universe};

    fn test_steamid() -> SteamID {
        SteamID::new(1, Instance::Desktop, AccountType::Individual, Universe::Public)
    }

    #[test]
    fn builder_defaults_username_to_steamid() {
        let manager = OfferManager::new(test_steamid(), "key");

        assert_eq!(manager.username, u64::from(test_steamid()).to_string());
    }

    #[tokio::test]
    async fn tick_is_none_before_polling_starts() {
        let manager = OfferManager::new(test_steamid(), "key");

        assert!(manager.tick(false).await.is_none());
    }
}
