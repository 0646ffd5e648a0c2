//! Auto-cancel policies (component F, §4.F): pure predicates over a returned offer, the poll
//! data store, and the manager's configured knobs. The reconciliation loop (§4.D) is the only
//! caller; keeping these as plain functions over borrowed data makes them exercisable without a
//! network or a clock mock beyond a plain `i64`.

use crate::config::Config;
use crate::enums::TradeOfferState;
use crate::offer::Offer;
use crate::poll_data::PollData;

/// True iff an `Active` sent offer has aged past its cancel timer (a per-offer override in
/// `poll_data.cancel_times`, falling back to `config.cancel_time`).
pub fn should_cancel_active(offer: &Offer, poll_data: &PollData, config: &Config, now_ms: i64) -> bool {
    if offer.state != TradeOfferState::Active {
        return false;
    }

    let Some(id) = offer.id else { return false };
    let threshold = poll_data.cancel_times.get(&id).copied().or(config.cancel_time);

    let Some(threshold) = threshold else { return false };
    if threshold <= 0 {
        return false;
    }

    let Some(updated_at) = offer.updated_at else { return false };

    now_ms - updated_at.timestamp_millis() >= threshold
}

/// True iff a `CreatedNeedsConfirmation` sent offer has aged past its pending-cancel timer (a
/// per-offer override in `poll_data.pending_cancel_times`, falling back to
/// `config.pending_cancel_time`).
pub fn should_cancel_pending(offer: &Offer, poll_data: &PollData, config: &Config, now_ms: i64) -> bool {
    if offer.state != TradeOfferState::CreatedNeedsConfirmation {
        return false;
    }

    let Some(id) = offer.id else { return false };
    let threshold = poll_data.pending_cancel_times.get(&id).copied().or(config.pending_cancel_time);

    let Some(threshold) = threshold else { return false };
    if threshold <= 0 {
        return false;
    }

    let Some(created_at) = offer.created_at else { return false };

    now_ms - created_at.timestamp_millis() >= threshold
}

/// Given the union of active sent offers (both freshly returned and recorded in the store) and
/// a cap, returns the ids to cancel: the oldest-by-store-timestamp entries past the cap,
/// excluding any younger than `min_age_ms`.
///
/// `entries` is `(id, timestamp_seconds)`, deduplicated by the caller before this is called.
pub fn quota_trim(mut entries: Vec<(u64, i64)>, cap: usize, min_age_ms: i64, now_ms: i64) -> Vec<u64> {
    if entries.len() <= cap {
        return Vec::new();
    }

    entries.sort_by_key(|(_, ts)| *ts);

    let excess = entries.len() - cap;

    entries.into_iter()
        .filter(|(_, ts)| now_ms - ts * 1000 >= min_age_ms)
        .take(excess)
        .map(|(id, _)| id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::timestamp_to_server_time;
    use steamid_ng::{AccountType, Instance, SteamID, Universe};

    fn offer_with(state: TradeOfferState, updated_at_secs: i64) -> Offer {
        let partner = SteamID::new(1, Instance::Desktop, AccountType::Individual, Universe::Public);
        let mut offer = Offer::new(partner, None).unwrap();

        offer.id = Some(1);
        offer.state = state;
        offer.updated_at = Some(timestamp_to_server_time(updated_at_secs));
        offer.created_at = Some(timestamp_to_server_time(updated_at_secs));

        offer
    }

    #[test]
    fn cancels_active_offer_past_threshold() {
        let offer = offer_with(TradeOfferState::Active, 1000);
        let poll_data = PollData::new();
        let config = Config { cancel_time: Some(60_000), ..Config::default() };

        assert!(should_cancel_active(&offer, &poll_data, &config, 1000 * 1000 + 60_000));
        assert!(!should_cancel_active(&offer, &poll_data, &config, 1000 * 1000 + 1_000));
    }

    #[test]
    fn per_offer_override_wins_over_config() {
        let offer = offer_with(TradeOfferState::Active, 1000);
        let mut poll_data = PollData::new();

        poll_data.set_cancel(1, 5_000);

        let config = Config { cancel_time: Some(999_999), ..Config::default() };

        assert!(should_cancel_active(&offer, &poll_data, &config, 1000 * 1000 + 5_000));
    }

    #[test]
    fn quota_trim_picks_oldest_first_respecting_min_age() {
        let now_ms = 100_000 * 1000;
        let entries = vec![(1, 100_000 - 20), (2, 100_000 - 50), (3, 100_000 - 10)];

        // cap=1: need to cancel 2. Oldest is id 2 (50s old), then id 1 (20s old); id 3 (10s old)
        // is too young under a 15_000ms (15s) floor and must be skipped even though it's needed
        // to reach the cap.
        let to_cancel = quota_trim(entries, 1, 15_000, now_ms);

        assert_eq!(to_cancel, vec![2, 1]);
    }

    #[test]
    fn quota_trim_is_noop_under_cap() {
        let entries = vec![(1, 100), (2, 200)];

        assert!(quota_trim(entries, 5, 0, 1_000_000).is_empty());
    }
}
