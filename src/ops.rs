//! Per-offer imperative verbs (component C, §4.C): `send`, `accept`, `decline`/`cancel`, and
//! `refresh`. These are a separate `impl Offer` block from the value-object mutators in
//! `offer.rs` — they're the ones that need network and shared-state access, taken as an explicit
//! [`OfferContext`] rather than a back-reference baked into the offer itself.

use crate::context::{OfferContext, PendingSendGuard};
use crate::enums::{ConfirmationMethod, TradeOfferState};
use crate::error::{Error, ParameterError, Result};
use crate::offer::Offer;
use crate::poll_data::Side;
use crate::time;

/// The state a successful [`Offer::send`] left the offer in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Active,
    CreatedNeedsConfirmation,
}

impl Offer {
    /// Transmits a newly-constructed offer. Fails if the offer has already been sent, has no
    /// items on either side, or the remote rejects it.
    pub async fn send(&mut self, ctx: &OfferContext) -> Result<SendOutcome> {
        if self.id.is_some() {
            return Err(Error::Parameter(ParameterError::AlreadySent));
        }

        if self.items_to_give.is_empty() && self.items_to_receive.is_empty() {
            return Err(Error::Parameter(ParameterError::EmptyOffer));
        }

        // Suppresses `unknownOfferSent` for this offer in the reconciliation loop while the
        // send is in flight.
        let _guard = PendingSendGuard::enter(ctx.pending_send_counter.clone());
        let response = ctx.api.send_offer(&ctx.session, self, self.countering).await
            .map_err(|error| map_401_to_not_logged_in(error))?;
        let now = time::now();

        self.id = Some(response.tradeofferid);
        self.state = TradeOfferState::Active;
        self.created_at = Some(now);
        self.updated_at = Some(now);
        self.expires_at = Some(now + chrono::Duration::days(14));

        if response.needs_mobile_confirmation {
            self.state = TradeOfferState::CreatedNeedsConfirmation;
            self.confirmation_method = ConfirmationMethod::Mobile;
        } else if response.needs_email_confirmation {
            self.state = TradeOfferState::CreatedNeedsConfirmation;
            self.confirmation_method = ConfirmationMethod::Email;
        }

        {
            let mut poll_data = ctx.poll_data.lock().await;

            poll_data.record(Side::Sent, response.tradeofferid, self.state, now.timestamp());

            if let Some(ms) = self.cancel_after_ms {
                poll_data.set_cancel(response.tradeofferid, ms);
            }

            if let Some(ms) = self.pending_cancel_after_ms {
                poll_data.set_pending_cancel(response.tradeofferid, ms);
            }
        }

        Ok(match self.state {
            TradeOfferState::CreatedNeedsConfirmation => SendOutcome::CreatedNeedsConfirmation,
            _ => SendOutcome::Active,
        })
    }

    /// Cancels an offer we created. Fails if we didn't create it, or if it's not in a
    /// cancelable state.
    pub async fn cancel(&mut self, ctx: &OfferContext) -> Result<()> {
        if !self.is_ours.unwrap_or(false) {
            return Err(Error::Parameter(ParameterError::CannotCancelOfferWeDidNotCreate));
        }

        self.end_offer(ctx, true).await
    }

    /// Declines an offer sent to us. Fails if we created it, or if it's not in a cancelable
    /// state.
    pub async fn decline(&mut self, ctx: &OfferContext) -> Result<()> {
        if self.is_ours.unwrap_or(true) {
            return Err(Error::Parameter(ParameterError::CannotDeclineOfferWeCreated));
        }

        self.end_offer(ctx, false).await
    }

    /// Shared implementation behind `cancel`/`decline`: picks the correct endpoint by
    /// `is_ours` rather than by which method was called. Used directly by the reconciliation
    /// loop's auto-cancel policies (§4.F), which must end an offer regardless of which side
    /// created it.
    pub(crate) async fn end_offer(&mut self, ctx: &OfferContext, is_ours: bool) -> Result<()> {
        if !matches!(self.state, TradeOfferState::Active | TradeOfferState::CreatedNeedsConfirmation) {
            return Err(Error::Parameter(ParameterError::CannotCancelOfferInState(self.state)));
        }

        let id = self.id.ok_or(Error::InvalidState("offer has no id"))?;

        if is_ours {
            ctx.api.cancel_offer(id).await?;
            self.state = TradeOfferState::Canceled;
        } else {
            ctx.api.decline_offer(id).await?;
            self.state = TradeOfferState::Declined;
        }

        self.updated_at = Some(time::now());
        ctx.schedule_poll();

        Ok(())
    }

    /// Accepts an offer we did not create. Returns `"accepted"`, `"pending"`, or `"escrow"`.
    ///
    /// When `skip_refresh` is false (the common case), a follow-up `refresh` re-fetches the
    /// offer so the returned classification reflects the server's authoritative state rather
    /// than just the immediate accept response.
    pub async fn accept(&mut self, ctx: &OfferContext, skip_refresh: bool) -> Result<&'static str> {
        if self.is_ours.unwrap_or(false) {
            return Err(Error::Parameter(ParameterError::CannotAcceptOfferWeCreated));
        }

        if self.state != TradeOfferState::Active {
            return Err(Error::Parameter(ParameterError::CannotAcceptOfferInState(self.state)));
        }

        let id = self.id.ok_or(Error::InvalidState("offer has no id"))?;
        let response = ctx.api.accept_offer(&ctx.session, id, self.partner).await
            .map_err(map_403_to_not_logged_in)?;

        if let Some(trade_id) = response.tradeid {
            self.trade_id = Some(trade_id);
        }

        let needs_confirmation = response.needs_mobile_confirmation || response.needs_email_confirmation;

        if response.needs_mobile_confirmation {
            self.confirmation_method = ConfirmationMethod::Mobile;
        } else if response.needs_email_confirmation {
            self.confirmation_method = ConfirmationMethod::Email;
        }

        ctx.schedule_poll();

        if skip_refresh {
            return Ok(if needs_confirmation { "pending" } else { "accepted" });
        }

        self.refresh(ctx).await?;

        Ok(match self.state {
            TradeOfferState::InEscrow => "escrow",
            _ if self.confirmation_method != ConfirmationMethod::None => "pending",
            TradeOfferState::Accepted => "accepted",
            _ => "pending",
        })
    }

    /// Re-fetches this offer by id and overwrites its mutable fields from the response.
    pub async fn refresh(&mut self, ctx: &OfferContext) -> Result<()> {
        let id = self.id.ok_or(Error::InvalidState("offer has no id"))?;
        let fresh = ctx.api.get_trade_offer(id, false).await?;

        self.state = fresh.state;
        self.is_ours = fresh.is_ours;
        self.message = fresh.message;
        self.items_to_give = fresh.items_to_give;
        self.items_to_receive = fresh.items_to_receive;
        self.created_at = fresh.created_at;
        self.updated_at = fresh.updated_at;
        self.expires_at = fresh.expires_at;
        self.trade_id = fresh.trade_id;
        self.from_realtime_trade = fresh.from_realtime_trade;
        self.confirmation_method = fresh.confirmation_method;
        self.escrow_until = fresh.escrow_until;

        Ok(())
    }
}

fn map_401_to_not_logged_in(error: Error) -> Error {
    match error {
        Error::Http(status) if status == reqwest::StatusCode::UNAUTHORIZED => Error::NotLoggedIn,
        other => other,
    }
}

fn map_403_to_not_logged_in(error: Error) -> Error {
    match error {
        Error::Http(status) if status == reqwest::StatusCode::FORBIDDEN => Error::NotLoggedIn,
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::RemoteApi;
    use crate::helpers::DEFAULT_CLIENT;
    use crate::poll_data::PollData;
    use crate::session::Session;
    use crate::transport::Transport;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use steamid_ng::{AccountType, SteamID};
    use tokio::sync::Mutex;

    fn individual(accountid: u32) -> SteamID {
        SteamID::new(accountid, steamid_ng::Instance::Desktop, AccountType::Individual, steamid_ng::Universe::Public)
    }

    fn test_context() -> OfferContext {
        let transport = Transport::new(DEFAULT_CLIENT.clone());
        let api = RemoteApi::new(transport, "key".to_string(), "english".to_string());

        OfferContext::new(
            api,
            Session::default(),
            Arc::new(Mutex::new(PollData::new())),
            Arc::new(AtomicUsize::new(0)),
            None,
        )
    }

    #[tokio::test]
    async fn cancel_rejects_offer_we_did_not_create() {
        let ctx = test_context();
        let mut offer = Offer::new(individual(1), None).unwrap();

        offer.id = Some(1);
        offer.is_ours = Some(false);
        offer.state = TradeOfferState::Active;

        let error = offer.cancel(&ctx).await.unwrap_err();

        assert!(matches!(error, Error::Parameter(ParameterError::CannotCancelOfferWeDidNotCreate)));
    }

    #[tokio::test]
    async fn decline_rejects_offer_we_created() {
        let ctx = test_context();
        let mut offer = Offer::new(individual(1), None).unwrap();

        offer.id = Some(1);
        offer.is_ours = Some(true);
        offer.state = TradeOfferState::Active;

        let error = offer.decline(&ctx).await.unwrap_err();

        assert!(matches!(error, Error::Parameter(ParameterError::CannotDeclineOfferWeCreated)));
    }

    #[tokio::test]
    async fn end_offer_rejects_terminal_state() {
        let ctx = test_context();
        let mut offer = Offer::new(individual(1), None).unwrap();

        offer.id = Some(1);
        offer.is_ours = Some(true);
        offer.state = TradeOfferState::Canceled;

        let error = offer.cancel(&ctx).await.unwrap_err();

        assert!(matches!(error, Error::Parameter(ParameterError::CannotCancelOfferInState(_))));
    }

    #[tokio::test]
    async fn accept_rejects_offer_we_created() {
        let ctx = test_context();
        let mut offer = Offer::new(individual(1), None).unwrap();

        offer.id = Some(1);
        offer.is_ours = Some(true);
        offer.state = TradeOfferState::Active;

        let error = offer.accept(&ctx, true).await.unwrap_err();

        assert!(matches!(error, Error::Parameter(ParameterError::CannotAcceptOfferWeCreated)));
    }

    #[test]
    fn maps_401_to_not_logged_in() {
        let error = map_401_to_not_logged_in(Error::Http(reqwest::StatusCode::UNAUTHORIZED));

        assert!(matches!(error, Error::NotLoggedIn));
    }

    #[test]
    fn leaves_other_statuses_alone() {
        let error = map_401_to_not_logged_in(Error::Http(reqwest::StatusCode::BAD_GATEWAY));

        assert!(matches!(error, Error::Http(status) if status == reqwest::StatusCode::BAD_GATEWAY));
    }
}
