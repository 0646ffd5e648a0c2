//! The remote API adapter: flat, verb-per-endpoint wrappers over `IEconService` and the
//! `tradeoffer` web pages. No inheritance chain of request descriptors — every verb here builds
//! its own query/form and picks its own response parser directly.

pub mod raw;

use reqwest::header::REFERER;
use steamid_ng::{SteamID, AccountType, Instance, Universe};
use serde::Serialize;
use crate::error::{Error, ParameterError, Result};
use crate::enums::OfferFilter;
use crate::item::Item;
use crate::offer::Offer;
use crate::session::Session;
use crate::time::timestamp_to_server_time;
use crate::transport::{Transport, parse_response};
use crate::types::TradeOfferId;
use raw::*;

const COMMUNITY_HOSTNAME: &str = "steamcommunity.com";
const WEB_API_HOSTNAME: &str = "api.steampowered.com";

/// The result of a full (possibly multi-page) `GetTradeOffers` fetch.
#[derive(Debug, Default)]
pub struct TradeOffersPage {
    pub sent: Vec<Offer>,
    pub received: Vec<Offer>,
    /// The minimum `updated_at` across every returned offer in a non-terminal state.
    pub oldest_nonterminal: Option<i64>,
}

/// Thin, verb-oriented wrapper over the `IEconService` web API and the community site's
/// trade-offer pages.
#[derive(Debug, Clone)]
pub struct RemoteApi {
    transport: Transport,
    api_key: String,
    language: String,
}

impl RemoteApi {
    pub fn new(transport: Transport, api_key: String, language: String) -> Self {
        Self { transport, api_key, language }
    }

    fn url(pathname: &str) -> String {
        format!("https://{COMMUNITY_HOSTNAME}{pathname}")
    }

    fn api_url(interface: &str, method: &str, version: u32) -> String {
        format!("https://{WEB_API_HOSTNAME}/{interface}/{method}/v{version}")
    }

    fn accountid_to_steamid(accountid: u32) -> SteamID {
        SteamID::new(accountid, Instance::Desktop, AccountType::Individual, Universe::Public)
    }

    fn raw_to_offer(raw: RawTradeOffer) -> Offer {
        let items_to_give = raw.items_to_give.into_iter()
            .map(|a| Item::new(a.appid, a.contextid, a.assetid, a.amount))
            .collect();
        let items_to_receive = raw.items_to_receive.into_iter()
            .map(|a| Item::new(a.appid, a.contextid, a.assetid, a.amount))
            .collect();

        Offer {
            id: Some(raw.tradeofferid),
            partner: Self::accountid_to_steamid(raw.accountid_other),
            message: raw.message,
            state: raw.trade_offer_state,
            items_to_give,
            items_to_receive,
            is_ours: Some(raw.is_our_offer),
            created_at: Some(timestamp_to_server_time(raw.time_created)),
            updated_at: Some(timestamp_to_server_time(raw.time_updated)),
            expires_at: Some(timestamp_to_server_time(raw.expiration_time)),
            trade_id: raw.tradeid,
            from_realtime_trade: raw.from_real_time_trade,
            confirmation_method: raw.confirmation_method,
            escrow_until: if raw.escrow_end_date > 0 {
                Some(timestamp_to_server_time(raw.escrow_end_date))
            } else {
                None
            },
            token: None,
            countering: None,
            cancel_after_ms: None,
            pending_cancel_after_ms: None,
        }
    }

    /// Posts a new trade offer. `counter_tradeofferid` is set when this send counters an
    /// existing offer.
    pub async fn send_offer(
        &self,
        session: &Session,
        offer: &Offer,
        counter_tradeofferid: Option<TradeOfferId>,
    ) -> Result<SentOfferResponse> {
        #[derive(Serialize)]
        struct OfferFormSide<'a> {
            assets: &'a [Item],
            currency: [(); 0],
            ready: bool,
        }

        #[derive(Serialize)]
        struct OfferForm<'a> {
            newversion: bool,
            version: u32,
            me: OfferFormSide<'a>,
            them: OfferFormSide<'a>,
        }

        #[derive(Serialize)]
        struct TradeOfferCreateParams<'a> {
            #[serde(skip_serializing_if = "Option::is_none")]
            trade_offer_access_token: Option<&'a str>,
        }

        #[derive(Serialize)]
        struct SendOfferParams<'a> {
            sessionid: &'a str,
            serverid: u32,
            json_tradeoffer: String,
            tradeoffermessage: &'a str,
            captcha: &'static str,
            trade_offer_create_params: String,
            #[serde(skip_serializing_if = "Option::is_none")]
            tradeofferid_countered: Option<TradeOfferId>,
            partner: u64,
        }

        let num_items = offer.items_to_give.len() + offer.items_to_receive.len();

        if num_items == 0 {
            return Err(Error::Parameter(ParameterError::EmptyOffer));
        }

        let json_tradeoffer = serde_json::to_string(&OfferForm {
            newversion: true,
            version: num_items as u32 + 1,
            me: OfferFormSide { assets: &offer.items_to_give, currency: [], ready: false },
            them: OfferFormSide { assets: &offer.items_to_receive, currency: [], ready: false },
        })?;
        let trade_offer_create_params = serde_json::to_string(&TradeOfferCreateParams {
            trade_offer_access_token: offer.token.as_deref(),
        })?;
        let referer = Self::url(&match counter_tradeofferid {
            Some(id) => format!("/tradeoffer/{id}"),
            None => "/tradeoffer/new".to_string(),
        });
        let params = SendOfferParams {
            sessionid: &session.sessionid,
            serverid: 1,
            captcha: "",
            tradeoffermessage: offer.message.as_deref().unwrap_or_default(),
            partner: u64::from(offer.partner),
            json_tradeoffer,
            trade_offer_create_params,
            tradeofferid_countered: counter_tradeofferid,
        };
        let response = self.transport.client()
            .post(Self::url("/tradeoffer/new/send"))
            .header(REFERER, referer)
            .form(&params)
            .send()
            .await?;

        parse_response(response).await
    }

    pub async fn accept_offer(
        &self,
        session: &Session,
        tradeofferid: TradeOfferId,
        partner: SteamID,
    ) -> Result<AcceptedOfferResponse> {
        #[derive(Serialize)]
        struct Params<'a> {
            sessionid: &'a str,
            serverid: u32,
            tradeofferid: TradeOfferId,
            captcha: &'static str,
            partner: u64,
        }

        let referer = Self::url(&format!("/tradeoffer/{tradeofferid}"));
        let response = self.transport.client()
            .post(Self::url(&format!("/tradeoffer/{tradeofferid}/accept")))
            .header(REFERER, referer)
            .form(&Params {
                sessionid: &session.sessionid,
                serverid: 1,
                tradeofferid,
                captcha: "",
                partner: u64::from(partner),
            })
            .send()
            .await?;

        parse_response(response).await
    }

    pub async fn decline_offer(&self, tradeofferid: TradeOfferId) -> Result<()> {
        #[derive(Serialize)]
        struct Form<'a> {
            key: &'a str,
            tradeofferid: TradeOfferId,
        }

        self.transport.client()
            .post(Self::api_url("IEconService", "DeclineTradeOffer", 1))
            .form(&Form { key: &self.api_key, tradeofferid })
            .send()
            .await?;

        Ok(())
    }

    pub async fn cancel_offer(&self, tradeofferid: TradeOfferId) -> Result<()> {
        #[derive(Serialize)]
        struct Form<'a> {
            key: &'a str,
            tradeofferid: TradeOfferId,
        }

        self.transport.client()
            .post(Self::api_url("IEconService", "CancelTradeOffer", 1))
            .form(&Form { key: &self.api_key, tradeofferid })
            .send()
            .await?;

        Ok(())
    }

    /// Fetches a single offer by id.
    pub async fn get_trade_offer(&self, tradeofferid: TradeOfferId, get_descriptions: bool) -> Result<Offer> {
        #[derive(Serialize)]
        struct Form<'a> {
            key: &'a str,
            tradeofferid: TradeOfferId,
            language: &'a str,
            get_descriptions: bool,
        }

        let response = self.transport.client()
            .get(Self::api_url("IEconService", "GetTradeOffer", 1))
            .query(&Form { key: &self.api_key, tradeofferid, language: &self.language, get_descriptions })
            .send()
            .await?;
        let body: GetTradeOfferResponse = parse_response(response).await?;

        Ok(Self::raw_to_offer(body.response.offer))
    }

    /// Fetches sent and received offers since `cutoff`, transparently paging through every
    /// cursor the remote returns.
    pub async fn get_trade_offers(
        &self,
        filter: OfferFilter,
        cutoff: i64,
        get_descriptions: bool,
    ) -> Result<TradeOffersPage> {
        #[derive(Serialize)]
        struct Form<'a> {
            key: &'a str,
            language: &'a str,
            get_sent_offers: bool,
            get_received_offers: bool,
            get_descriptions: bool,
            active_only: bool,
            historical_only: bool,
            time_historical_cutoff: i64,
            #[serde(skip_serializing_if = "Option::is_none")]
            cursor: Option<u32>,
        }

        let (active_only, historical_only) = match filter {
            OfferFilter::ActiveOnly => (true, false),
            OfferFilter::HistoricalOnly => (false, true),
            OfferFilter::All => (false, false),
        };
        let mut cursor = None;
        let mut raw_offers = Vec::new();

        loop {
            let response = self.transport.client()
                .get(Self::api_url("IEconService", "GetTradeOffers", 1))
                .query(&Form {
                    key: &self.api_key,
                    language: &self.language,
                    get_sent_offers: true,
                    get_received_offers: true,
                    get_descriptions,
                    active_only,
                    historical_only,
                    time_historical_cutoff: cutoff,
                    cursor,
                })
                .send()
                .await?;
            let body: GetTradeOffersResponse = parse_response(response).await?;
            let next_cursor = body.response.next_cursor;

            raw_offers.push(body.response);

            if next_cursor == 0 {
                break;
            }

            cursor = Some(next_cursor);
        }

        let mut page = TradeOffersPage::default();

        for chunk in raw_offers {
            for raw in chunk.trade_offers_sent {
                if raw.trade_offer_state.is_non_terminal() {
                    page.oldest_nonterminal = Some(
                        page.oldest_nonterminal.map_or(raw.time_updated, |t| t.min(raw.time_updated))
                    );
                }

                page.sent.push(Self::raw_to_offer(raw));
            }

            for raw in chunk.trade_offers_received {
                if raw.trade_offer_state.is_non_terminal() {
                    page.oldest_nonterminal = Some(
                        page.oldest_nonterminal.map_or(raw.time_updated, |t| t.min(raw.time_updated))
                    );
                }

                page.received.push(Self::raw_to_offer(raw));
            }
        }

        let total = page.sent.len() + page.received.len();

        // A single offer with empty item sides is a per-offer glitch the poller's own
        // diff walk classifies and retries next tick (see `Offer::is_glitched`). Only a
        // multi-offer page that's *entirely* empty looks like a genuinely degraded response
        // from the remote rather than one stale offer.
        if total > 1 {
            let all_empty = page.sent.iter().chain(page.received.iter())
                .all(|offer| offer.items_to_give.is_empty() && offer.items_to_receive.is_empty());

            if all_empty {
                return Err(Error::DataTemporarilyUnavailable);
            }
        }

        Ok(page)
    }
}
