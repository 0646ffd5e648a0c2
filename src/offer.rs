use steamid_ng::{SteamID, AccountType};
use crate::enums::{TradeOfferState, ConfirmationMethod};
use crate::item::Item;
use crate::time::ServerTime;
use crate::types::TradeOfferId;
use crate::error::{Error, ParameterError};

/// A trade offer, either newly constructed (not yet sent) or populated from the remote API.
///
/// `id` is `None` until the offer has been transmitted and the remote accepted it. Item sides
/// can only be mutated while `id` is unset; the remote considers a sent offer's item list
/// immutable.
#[derive(Debug, Clone, PartialEq)]
pub struct Offer {
    pub id: Option<TradeOfferId>,
    pub partner: SteamID,
    pub message: Option<String>,
    pub state: TradeOfferState,
    pub items_to_give: Vec<Item>,
    pub items_to_receive: Vec<Item>,
    pub is_ours: Option<bool>,
    pub created_at: Option<ServerTime>,
    pub updated_at: Option<ServerTime>,
    pub expires_at: Option<ServerTime>,
    pub trade_id: Option<String>,
    pub from_realtime_trade: bool,
    pub confirmation_method: ConfirmationMethod,
    pub escrow_until: Option<ServerTime>,
    pub token: Option<String>,
    pub countering: Option<TradeOfferId>,
    pub cancel_after_ms: Option<i64>,
    pub pending_cancel_after_ms: Option<i64>,
}

impl Offer {
    /// Constructs a new, unsent offer for the given partner. Fails if `partner` is not an
    /// individual account.
    pub fn new(partner: SteamID, token: Option<String>) -> crate::error::Result<Self> {
        if partner.account_type() != AccountType::Individual {
            return Err(Error::Parameter(ParameterError::InvalidPartner));
        }

        Ok(Self {
            id: None,
            partner,
            message: None,
            state: TradeOfferState::Invalid,
            items_to_give: Vec::new(),
            items_to_receive: Vec::new(),
            is_ours: None,
            created_at: None,
            updated_at: None,
            expires_at: None,
            trade_id: None,
            from_realtime_trade: false,
            confirmation_method: ConfirmationMethod::None,
            escrow_until: None,
            token,
            countering: None,
            cancel_after_ms: None,
            pending_cancel_after_ms: None,
        })
    }

    /// Sets the message attached to this offer. Fails once the offer has been sent.
    pub fn set_message(&mut self, message: impl Into<String>) -> crate::error::Result<()> {
        self.reject_if_sent()?;

        let message: String = message.into();

        self.message = Some(message.chars().take(128).collect());

        Ok(())
    }

    /// Sets the trade-invite token used at send time. Fails once the offer has been sent.
    pub fn set_token(&mut self, token: impl Into<String>) -> crate::error::Result<()> {
        self.reject_if_sent()?;
        self.token = Some(token.into());
        Ok(())
    }

    /// Adds an item to our side of the offer. Fails once the offer has been sent.
    pub fn add_item(&mut self, item: Item) -> crate::error::Result<()> {
        self.reject_if_sent()?;
        self.items_to_give.push(item);
        Ok(())
    }

    /// Adds an item to their side of the offer. Fails once the offer has been sent.
    pub fn add_their_item(&mut self, item: Item) -> crate::error::Result<()> {
        self.reject_if_sent()?;
        self.items_to_receive.push(item);
        Ok(())
    }

    /// Removes a previously added item from our side by value. Fails once the offer has been
    /// sent.
    pub fn remove_item(&mut self, item: &Item) -> crate::error::Result<bool> {
        self.reject_if_sent()?;

        let len_before = self.items_to_give.len();

        self.items_to_give.retain(|i| i != item);

        Ok(self.items_to_give.len() != len_before)
    }

    fn reject_if_sent(&self) -> crate::error::Result<()> {
        if self.id.is_some() {
            return Err(Error::InvalidState("offer has already been sent"));
        }

        Ok(())
    }

    /// True iff this offer was sent and the remote returned a payload we should ignore this
    /// tick: both item sides empty, or (when description enrichment is enabled) any item is
    /// missing a display name.
    pub fn is_glitched(&self, get_descriptions: bool, has_named_items: impl Fn(&Offer) -> bool) -> bool {
        if self.id.is_none() {
            return false;
        }

        let both_sides_empty = self.items_to_give.is_empty() && self.items_to_receive.is_empty();

        if both_sides_empty {
            return true;
        }

        get_descriptions && !has_named_items(self)
    }

    /// String tag for the current state, suitable for logging.
    pub fn state_name(&self) -> String {
        self.state.to_string()
    }

    /// String tag for the current confirmation method, suitable for logging.
    pub fn confirmation_method_name(&self) -> String {
        self.confirmation_method.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn individual(accountid: u32) -> SteamID {
        SteamID::new(accountid, steamid_ng::Instance::Desktop, AccountType::Individual, steamid_ng::Universe::Public)
    }

    #[test]
    fn rejects_non_individual_partner() {
        let clan = SteamID::new(1, steamid_ng::Instance::Desktop, AccountType::Clan, steamid_ng::Universe::Public);

        assert!(Offer::new(clan, None).is_err());
    }

    #[test]
    fn mutators_fail_once_sent() {
        let mut offer = Offer::new(individual(1), None).unwrap();

        offer.id = Some(123);

        assert!(offer.set_message("hi").is_err());
        assert!(offer.add_item(Item::new(730, 2, 1, 1)).is_err());
    }

    #[test]
    fn empty_sides_is_glitched_only_after_send() {
        let mut offer = Offer::new(individual(1), None).unwrap();

        assert!(!offer.is_glitched(false, |_| true));

        offer.id = Some(123);

        assert!(offer.is_glitched(false, |_| true));
    }
}
