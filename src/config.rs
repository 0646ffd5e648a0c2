//! Configuration knobs recognized by the reconciliation loop and confirmation engine.

/// The fastest the reconciliation loop will actually run a tick, regardless of `interval`. A
/// call arriving sooner than this short-circuits and the next scheduled delay absorbs the
/// difference.
pub const MIN_POLL_INTERVAL_MS: i64 = 1000;

/// Configuration for an [`crate::manager::OfferManager`]'s reconciliation loop and auto-cancel
/// policies. Constructed through [`crate::manager::OfferManagerBuilder`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Milliseconds between ticks. A negative value disables automatic scheduling; `tick` can
    /// still be called manually. Default 30000.
    pub interval: i64,
    /// `Active` sent offers older than this (ms) are auto-canceled. `None` disables the policy.
    pub cancel_time: Option<i64>,
    /// `CreatedNeedsConfirmation` sent offers older than this (ms) are auto-canceled. `None`
    /// disables the policy.
    pub pending_cancel_time: Option<i64>,
    /// Maximum number of outstanding `Active` sent offers. When exceeded, the oldest are
    /// auto-canceled down to this count. `None` disables the policy.
    pub cancel_offer_count: Option<usize>,
    /// Minimum age (ms) an offer must reach before it's eligible for `cancel_offer_count`
    /// trimming, even if it's among the oldest.
    pub cancel_offer_count_min_age: i64,
    /// Whether to request item descriptions from the remote API. Also affects
    /// [`crate::offer::Offer::is_glitched`] (an offer with nameless items counts as glitched).
    pub get_descriptions: bool,
    /// The language tag to request descriptions and error text in.
    pub language: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interval: 30_000,
            cancel_time: None,
            pending_cancel_time: None,
            cancel_offer_count: None,
            cancel_offer_count_min_age: 0,
            get_descriptions: false,
            language: "english".to_string(),
        }
    }
}
