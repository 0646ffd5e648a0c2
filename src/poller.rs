//! The reconciliation loop (component D, §4.D): the sole scheduler in this crate. Each tick
//! fetches sent and received offers since the last cutoff, diffs them against [`PollData`],
//! dispatches lifecycle events, applies the auto-cancel policies (component F, §4.F), advances
//! the historical cutoff, and persists. At most one tick runs at a time (§5's single-flight
//! guard); `stop` lets the current tick finish before suppressing future ones.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use steamid_ng::SteamID;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::api::RemoteApi;
use crate::config::{Config, MIN_POLL_INTERVAL_MS};
use crate::context::OfferContext;
use crate::enums::{ConfirmationMethod, OfferFilter, TradeOfferState};
use crate::events::{CancelReason, Event};
use crate::offer::Offer;
use crate::poll_data::{PollData, PollDataStore, Side, CUTOFF_MARGIN_SECONDS};
use crate::policies;
use crate::session::Session;
use crate::time;

/// A full (non-delta) poll looks this far back. Matches the teacher's full-update fallback
/// window.
const FULL_UPDATE_LOOKBACK_SECONDS: i64 = 60 * 60 * 24 * 30 * 6;

/// What happened when [`Poller::tick`] was invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The tick ran to completion (successfully or not — failures become a `PollFailure`
    /// event, they don't surface here).
    Ran,
    /// Another tick was already in flight; this call was a no-op.
    AlreadyInFlight,
    /// The previous tick started too recently (within [`MIN_POLL_INTERVAL_MS`]); this call was
    /// a no-op. The caller should wait `retry_after_ms` before trying again.
    RateLimited { retry_after_ms: i64 },
    /// No session is set yet; this call was a no-op.
    PreconditionsNotMet,
}

fn has_named_items(offer: &Offer) -> bool {
    offer.items_to_give.iter()
        .chain(offer.items_to_receive.iter())
        .all(|item| item.name.is_some())
}

pub struct Poller {
    #[allow(dead_code)]
    steamid: SteamID,
    api: RemoteApi,
    session: Arc<std::sync::RwLock<Session>>,
    poll_data: Arc<Mutex<PollData>>,
    pending_send_counter: Arc<AtomicUsize>,
    config: Config,
    store: Option<Arc<dyn PollDataStore>>,
    username: String,
    event_tx: tokio::sync::mpsc::Sender<Event>,
    loaded: AtomicBool,
    in_flight: AtomicBool,
    last_tick_started: Mutex<Option<Instant>>,
    cancellation_token: CancellationToken,
    poll_trigger: Arc<Notify>,
}

impl Poller {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        steamid: SteamID,
        api: RemoteApi,
        session: Arc<std::sync::RwLock<Session>>,
        poll_data: Arc<Mutex<PollData>>,
        pending_send_counter: Arc<AtomicUsize>,
        config: Config,
        store: Option<Arc<dyn PollDataStore>>,
        username: String,
        event_tx: tokio::sync::mpsc::Sender<Event>,
        poll_trigger: Arc<Notify>,
    ) -> Arc<Self> {
        Arc::new(Self {
            steamid,
            api,
            session,
            poll_data,
            pending_send_counter,
            config,
            store,
            username,
            event_tx,
            loaded: AtomicBool::new(false),
            in_flight: AtomicBool::new(false),
            last_tick_started: Mutex::new(None),
            cancellation_token: CancellationToken::new(),
            poll_trigger,
        })
    }

    /// Spawns the background loop. Returns `None` without spawning anything if
    /// `config.interval` is negative (auto-scheduling disabled; `tick` can still be called
    /// manually).
    pub(crate) fn spawn(self: Arc<Self>) -> Option<JoinHandle<()>> {
        if self.config.interval < 0 {
            return None;
        }

        Some(tokio::spawn(async move {
            loop {
                let outcome = self.tick(false).await;

                if self.cancellation_token.is_cancelled() {
                    break;
                }

                let delay_ms = match outcome {
                    TickOutcome::RateLimited { retry_after_ms } => retry_after_ms.max(0),
                    _ => self.config.interval.max(0),
                };

                tokio::select! {
                    _ = self.cancellation_token.cancelled() => break,
                    _ = tokio::time::sleep(std::time::Duration::from_millis(delay_ms as u64)) => {},
                    _ = self.poll_trigger.notified() => {},
                }
            }
        }))
    }

    /// Requests that the background loop finish its current tick and not start another.
    /// Already-in-flight user operations are unaffected.
    pub(crate) fn stop(&self) {
        self.cancellation_token.cancel();
    }

    /// Runs one reconciliation tick, subject to the single-flight guard and rate floor.
    pub async fn tick(&self, full_update: bool) -> TickOutcome {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            return TickOutcome::AlreadyInFlight;
        }

        struct InFlightGuard<'a>(&'a AtomicBool);
        impl Drop for InFlightGuard<'_> {
            fn drop(&mut self) {
                self.0.store(false, Ordering::Release);
            }
        }
        let _guard = InFlightGuard(&self.in_flight);

        let now = Instant::now();
        let elapsed = {
            let mut last = self.last_tick_started.lock().await;
            let elapsed = last.map(|t| now.duration_since(t));

            *last = Some(now);
            elapsed
        };

        if let Some(elapsed) = elapsed {
            let elapsed_ms = elapsed.as_millis() as i64;

            if elapsed_ms < MIN_POLL_INTERVAL_MS {
                return TickOutcome::RateLimited { retry_after_ms: MIN_POLL_INTERVAL_MS - elapsed_ms };
            }
        }

        let session = self.session.read().unwrap().clone();

        if !session.is_set() {
            return TickOutcome::PreconditionsNotMet;
        }

        match self.run_tick(full_update, &session).await {
            Ok(()) => {
                let _ = self.event_tx.send(Event::PollSuccess).await;
            },
            Err(error) => {
                log::warn!("poll failed: {error}");

                match &error {
                    crate::error::Error::NotLoggedIn => {
                        let _ = self.event_tx.send(Event::SessionExpired).await;
                    },
                    crate::error::Error::FamilyViewRestricted => {
                        let _ = self.event_tx.send(Event::FamilyViewRestricted).await;
                    },
                    _ => {},
                }

                let _ = self.event_tx.send(Event::PollFailure(error)).await;
            },
        }

        TickOutcome::Ran
    }

    fn internal_context(&self, session: Session) -> OfferContext {
        OfferContext::new(
            self.api.clone(),
            session,
            self.poll_data.clone(),
            self.pending_send_counter.clone(),
            None,
        )
    }

    async fn run_tick(&self, full_update: bool, session: &Session) -> crate::error::Result<()> {
        if let Some(store) = &self.store {
            if !self.loaded.load(Ordering::Acquire) {
                match store.load(&self.username).await {
                    Ok(Some(loaded)) => {
                        self.poll_data.lock().await.merge_loaded(loaded);
                    },
                    Ok(None) => {},
                    Err(error) => {
                        log::warn!("poll data load failed for {}: {error}", self.username);

                        let _ = self.event_tx.send(Event::Debug(
                            format!("poll data load failed: {error}"),
                        )).await;
                    },
                }

                self.loaded.store(true, Ordering::Release);
            }
        }

        let offers_since = self.poll_data.lock().await.offers_since;
        let now_ts = time::now_timestamp();
        let (cutoff, filter) = if offers_since > 0 && !full_update {
            (offers_since - CUTOFF_MARGIN_SECONDS, OfferFilter::ActiveOnly)
        } else {
            (now_ts - FULL_UPDATE_LOOKBACK_SECONDS, OfferFilter::All)
        };
        let requested_at = now_ts - CUTOFF_MARGIN_SECONDS;

        let page = self.api.get_trade_offers(filter, cutoff, self.config.get_descriptions).await?;
        let mut has_glitched = false;
        let mut poll_data = self.poll_data.lock().await;

        for offer in &page.sent {
            self.walk_sent(offer, &mut poll_data, &mut has_glitched).await;
        }

        self.apply_auto_cancel(&page.sent, &mut poll_data, session).await;
        self.apply_quota_trim(&page.sent, &mut poll_data, session).await;

        for offer in &page.received {
            self.walk_received(offer, &mut poll_data, &mut has_glitched).await;
        }

        if !has_glitched {
            let candidate = match page.oldest_nonterminal {
                Some(oldest) if oldest < requested_at => oldest,
                _ => requested_at,
            };

            poll_data.set_offers_since(candidate);
        }

        poll_data.prune();

        if let Some(store) = &self.store {
            if let Err(error) = store.save(&self.username, &poll_data).await {
                log::warn!("poll data save failed for {}: {error}", self.username);

                let _ = self.event_tx.send(Event::Debug(
                    format!("poll data save failed: {error}"),
                )).await;
            }
        }

        Ok(())
    }

    async fn walk_sent(&self, offer: &Offer, poll_data: &mut PollData, has_glitched: &mut bool) {
        let Some(id) = offer.id else { return };

        if offer.is_glitched(self.config.get_descriptions, has_named_items) {
            *has_glitched = true;

            log::debug!(
                "not emitting sentOfferChanged for {id}: glitched (give={}, receive={})",
                offer.items_to_give.len(),
                offer.items_to_receive.len(),
            );

            let _ = self.event_tx.send(Event::Debug(format!(
                "not emitting sentOfferChanged for {id}: glitched (give={}, receive={})",
                offer.items_to_give.len(),
                offer.items_to_receive.len(),
            ))).await;

            return;
        }

        let updated_ts = offer.updated_at.map(|t| t.timestamp()).unwrap_or(0);

        match poll_data.sent.get(&id).copied() {
            None => {
                if self.pending_send_counter.load(Ordering::SeqCst) == 0 {
                    let _ = self.event_tx.send(Event::UnknownOfferSent(offer.clone())).await;
                }

                self.maybe_emit_realtime(offer, None).await;
                poll_data.record(Side::Sent, id, offer.state, updated_ts);
            },
            Some(prev) if prev == offer.state => {},
            Some(prev) => {
                let _ = self.event_tx.send(Event::SentOfferChanged(offer.clone(), prev)).await;

                if offer.from_realtime_trade && offer.state == TradeOfferState::Accepted {
                    let _ = self.event_tx.send(Event::RealTimeTradeCompleted(offer.clone())).await;
                }

                poll_data.record(Side::Sent, id, offer.state, updated_ts);
            },
        }
    }

    async fn walk_received(&self, offer: &Offer, poll_data: &mut PollData, has_glitched: &mut bool) {
        let Some(id) = offer.id else { return };

        if offer.is_glitched(self.config.get_descriptions, has_named_items) {
            *has_glitched = true;

            log::debug!("skipping glitched received offer {id}");

            return;
        }

        let prev = poll_data.received.get(&id).copied();

        self.maybe_emit_realtime(offer, prev).await;

        match prev {
            None if offer.state == TradeOfferState::Active => {
                let _ = self.event_tx.send(Event::NewOffer(offer.clone())).await;
            },
            Some(p) if p != offer.state => {
                let _ = self.event_tx.send(Event::ReceivedOfferChanged(offer.clone(), p)).await;
            },
            _ => {},
        }

        let updated_ts = offer.updated_at.map(|t| t.timestamp()).unwrap_or(0);
        poll_data.record(Side::Received, id, offer.state, updated_ts);
    }

    /// Shared "real-time trade" classification used by both the sent and received walks
    /// (§4.D steps 5 and 8). `prev` is the offer's previously recorded state, if any.
    async fn maybe_emit_realtime(&self, offer: &Offer, prev: Option<TradeOfferState>) {
        if !offer.from_realtime_trade {
            return;
        }

        let needs_confirmation = offer.state == TradeOfferState::CreatedNeedsConfirmation
            || (offer.state == TradeOfferState::Active && offer.confirmation_method != ConfirmationMethod::None);

        if prev.is_none() && needs_confirmation {
            let _ = self.event_tx.send(Event::RealTimeTradeConfirmationRequired(offer.clone())).await;
        } else if offer.state == TradeOfferState::Accepted && prev != Some(TradeOfferState::Accepted) {
            let _ = self.event_tx.send(Event::RealTimeTradeCompleted(offer.clone())).await;
        }
    }

    async fn apply_auto_cancel(&self, sent: &[Offer], poll_data: &mut PollData, session: &Session) {
        if self.config.cancel_time.is_none() && self.config.pending_cancel_time.is_none() {
            let has_override = !poll_data.cancel_times.is_empty() || !poll_data.pending_cancel_times.is_empty();

            if !has_override {
                return;
            }
        }

        let now_ms = time::now().timestamp_millis();
        let ctx = self.internal_context(session.clone());

        for offer in sent {
            let (should_cancel, reason) = if policies::should_cancel_active(offer, poll_data, &self.config, now_ms) {
                (true, CancelReason::CancelTime)
            } else if policies::should_cancel_pending(offer, poll_data, &self.config, now_ms) {
                (true, CancelReason::CancelTime)
            } else {
                (false, CancelReason::CancelTime)
            };

            if !should_cancel {
                continue;
            }

            let Some(id) = offer.id else { continue };
            let mut clone = offer.clone();
            let was_pending = offer.state == TradeOfferState::CreatedNeedsConfirmation;

            match clone.end_offer(&ctx, true).await {
                Ok(()) => {
                    poll_data.delete_time_props(id);

                    let event = if was_pending {
                        Event::SentPendingOfferCanceled(clone)
                    } else {
                        Event::SentOfferCanceled(clone, reason)
                    };

                    let _ = self.event_tx.send(event).await;
                },
                Err(error) => {
                    log::warn!("auto-cancel failed for offer {id}: {error}");

                    let _ = self.event_tx.send(Event::Debug(
                        format!("auto-cancel failed for offer {id}: {error}"),
                    )).await;
                },
            }
        }
    }

    async fn apply_quota_trim(&self, sent: &[Offer], poll_data: &mut PollData, session: &Session) {
        let Some(cap) = self.config.cancel_offer_count else { return };
        let now_ms = time::now().timestamp_millis();
        let mut by_id: std::collections::HashMap<u64, i64> = std::collections::HashMap::new();

        for offer in sent {
            if offer.state == TradeOfferState::Active {
                if let Some(id) = offer.id {
                    let ts = offer.updated_at.map(|t| t.timestamp()).unwrap_or(0);

                    by_id.insert(id, ts);
                }
            }
        }

        for (&id, &state) in poll_data.sent.iter() {
            if state == TradeOfferState::Active {
                by_id.entry(id).or_insert_with(|| poll_data.timestamps.get(&id).copied().unwrap_or(0));
            }
        }

        let entries: Vec<(u64, i64)> = by_id.into_iter().collect();
        let to_cancel = policies::quota_trim(entries, cap, self.config.cancel_offer_count_min_age, now_ms);

        if to_cancel.is_empty() {
            return;
        }

        let ctx = self.internal_context(session.clone());

        for id in to_cancel {
            let Some(offer) = sent.iter().find(|o| o.id == Some(id)) else { continue };
            let mut clone = offer.clone();

            match clone.end_offer(&ctx, true).await {
                Ok(()) => {
                    poll_data.delete_time_props(id);

                    let _ = self.event_tx.send(
                        Event::SentOfferCanceled(clone, CancelReason::CancelOfferCount),
                    ).await;
                },
                Err(error) => {
                    log::warn!("quota trim cancel failed for offer {id}: {error}");

                    let _ = self.event_tx.send(Event::Debug(
                        format!("quota trim cancel failed for offer {id}: {error}"),
                    )).await;
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limited_outcome_reports_remaining_wait() {
        let outcome = TickOutcome::RateLimited { retry_after_ms: 250 };

        assert_eq!(outcome, TickOutcome::RateLimited { retry_after_ms: 250 });
    }
}
