//! The event set the reconciliation loop and confirmation engine publish.
//!
//! Consumers receive these over the `mpsc::Receiver<Event>` returned by
//! [`crate::manager::OfferManager::start_polling`]. This replaces the dynamic pub/sub the
//! upstream library is built around with a single exhaustive enum (Design Notes §9): a consumer
//! matches on `Event` instead of registering per-name listeners.

use crate::enums::TradeOfferState;
use crate::error::Error;
use crate::offer::Offer;

/// Why an offer was auto-canceled by the reconciliation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The offer had been `Active` for at least the configured (or per-offer) cancel time.
    CancelTime,
    /// The offer was trimmed to respect `cancel_offer_count`.
    CancelOfferCount,
}

impl std::fmt::Display for CancelReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CancelTime => write!(f, "cancelTime"),
            Self::CancelOfferCount => write!(f, "cancelOfferCount"),
        }
    }
}

/// An event emitted by the reconciliation loop or confirmation engine.
#[derive(Debug)]
pub enum Event {
    /// A tick completed without error.
    PollSuccess,
    /// A tick failed. The store is left intact; the next tick retries.
    PollFailure(Error),
    /// A received offer we had no prior record of, observed in `Active` state.
    NewOffer(Offer),
    /// One of our sent offers transitioned to a new state.
    SentOfferChanged(Offer, TradeOfferState),
    /// A received offer transitioned to a new state.
    ReceivedOfferChanged(Offer, TradeOfferState),
    /// A sent offer we have no record of sending ourselves (`pending_send_counter` was zero at
    /// the time it was observed).
    UnknownOfferSent(Offer),
    /// An `Active` sent offer was auto-canceled.
    SentOfferCanceled(Offer, CancelReason),
    /// A `CreatedNeedsConfirmation` sent offer was auto-canceled before it was confirmed.
    SentPendingOfferCanceled(Offer),
    /// A real-time trade requires a second-factor confirmation.
    RealTimeTradeConfirmationRequired(Offer),
    /// A real-time trade completed.
    RealTimeTradeCompleted(Offer),
    /// The session was detected as expired.
    SessionExpired,
    /// The account is restricted by Family View.
    FamilyViewRestricted,
    /// A diagnostic message, e.g. a glitched-offer skip.
    Debug(String),
}
