//! Wire DTOs for the `IEconService`/`tradeoffer` endpoints. These mirror the remote's JSON
//! shapes exactly; translation into [`crate::offer::Offer`] happens in the parent module.

use serde::Deserialize;
use crate::enums::{TradeOfferState, ConfirmationMethod};
use crate::serialize;
use crate::types::{AppId, ContextId, AssetId, Amount, AccountId, TradeOfferId};

#[derive(Debug, Clone, Deserialize)]
pub struct RawAsset {
    pub appid: AppId,
    #[serde(with = "serialize::string")]
    pub contextid: ContextId,
    #[serde(with = "serialize::string")]
    pub assetid: AssetId,
    #[serde(with = "serialize::string")]
    pub amount: Amount,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawTradeOffer {
    pub tradeofferid: TradeOfferId,
    pub accountid_other: AccountId,
    pub trade_offer_state: TradeOfferState,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub items_to_give: Vec<RawAsset>,
    #[serde(default)]
    pub items_to_receive: Vec<RawAsset>,
    pub is_our_offer: bool,
    #[serde(default)]
    pub from_real_time_trade: bool,
    pub expiration_time: i64,
    pub time_created: i64,
    pub time_updated: i64,
    #[serde(default)]
    pub escrow_end_date: i64,
    #[serde(default)]
    pub confirmation_method: ConfirmationMethod,
    #[serde(default)]
    pub tradeid: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct GetTradeOffersResponseBody {
    #[serde(default)]
    pub trade_offers_sent: Vec<RawTradeOffer>,
    #[serde(default)]
    pub trade_offers_received: Vec<RawTradeOffer>,
    #[serde(default)]
    pub next_cursor: u32,
}

#[derive(Debug, Deserialize)]
pub(super) struct GetTradeOffersResponse {
    pub response: GetTradeOffersResponseBody,
}

#[derive(Debug, Deserialize)]
pub(super) struct GetTradeOfferResponseBody {
    pub offer: RawTradeOffer,
}

#[derive(Debug, Deserialize)]
pub(super) struct GetTradeOfferResponse {
    pub response: GetTradeOfferResponseBody,
}

#[derive(Debug, Deserialize)]
pub struct SentOfferResponse {
    #[serde(with = "serialize::string")]
    pub tradeofferid: TradeOfferId,
    #[serde(default)]
    pub needs_mobile_confirmation: bool,
    #[serde(default)]
    pub needs_email_confirmation: bool,
}

#[derive(Debug, Deserialize)]
pub struct AcceptedOfferResponse {
    #[serde(default)]
    pub tradeid: Option<String>,
    #[serde(default)]
    pub needs_mobile_confirmation: bool,
    #[serde(default)]
    pub needs_email_confirmation: bool,
}
