//! Mobile (TOTP-style) confirmation of trade offers and market listings.
//!
//! Fetching the confirmation list is expensive and stateful on Steam's end: concurrent fetches
//! are coalesced into a single in-flight request via a shared, once-firing future so that two
//! callers racing `fetch_list` never issue the GET twice.

pub mod entry;

use std::sync::{Arc, Mutex};
use futures::future::{BoxFuture, FutureExt, Shared};
use another_steam_totp::{Tag, get_device_id, generate_confirmation_key};
use scraper::{Html, Selector};
use steamid_ng::SteamID;
use crate::error::{Error, ParameterError, ParseHtmlError, Result};
use crate::transport::Transport;
use crate::types::TradeOfferId;
use entry::{ConfirmationEntry, ConfirmationType, Operation};

const HOSTNAME: &str = "https://steamcommunity.com";
/// Above this, `clock_offset` is reset to 0. The offset only needs to separate derivations
/// issued within the same wall-clock second; it never needs to grow unbounded.
const CLOCK_OFFSET_RESET: i64 = 500;

#[derive(Debug, Clone)]
enum FetchListError {
    NotLoggedIn,
    Response(String),
    Other(String),
}

impl From<&Error> for FetchListError {
    fn from(error: &Error) -> Self {
        match error {
            Error::NotLoggedIn => Self::NotLoggedIn,
            Error::ParseHtml(ParseHtmlError::Response(message)) => Self::Response(message.clone()),
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<FetchListError> for Error {
    fn from(error: FetchListError) -> Self {
        match error {
            FetchListError::NotLoggedIn => Self::NotLoggedIn,
            FetchListError::Response(message) | FetchListError::Other(message) => {
                Self::ParseHtml(ParseHtmlError::Response(message))
            },
        }
    }
}

type ListOutcome = std::result::Result<Arc<Vec<ConfirmationEntry>>, FetchListError>;
type ListFuture = Shared<BoxFuture<'static, ListOutcome>>;

/// Single-flight fetcher and key-deriver for the mobile confirmation list.
pub struct ConfirmationEngine {
    transport: Transport,
    steamid: SteamID,
    identity_secret: Option<String>,
    clock_offset: Mutex<i64>,
    last_list: Mutex<Vec<ConfirmationEntry>>,
    inflight: Mutex<Option<ListFuture>>,
}

impl ConfirmationEngine {
    pub fn new(transport: Transport, steamid: SteamID, identity_secret: Option<String>) -> Self {
        Self {
            transport,
            steamid,
            identity_secret,
            clock_offset: Mutex::new(0),
            last_list: Mutex::new(Vec::new()),
            inflight: Mutex::new(None),
        }
    }

    /// Derives a confirmation key for `tag`, using and then rotating `clock_offset` so two
    /// derivations issued within the same wall-clock second never collide.
    fn derive_key(&self, tag: Tag) -> Result<(String, i64)> {
        let identity_secret = self.identity_secret.as_deref()
            .ok_or(ParameterError::NoIdentitySecret)?;
        let offset = {
            let mut offset = self.clock_offset.lock().unwrap();
            let current = *offset;

            *offset += 1;
            if *offset > CLOCK_OFFSET_RESET {
                *offset = 0;
            }

            current
        };
        let (key, time) = generate_confirmation_key(identity_secret, tag, Some(offset))?;

        Ok((key, time))
    }

    /// Fetches the current confirmation list. Concurrent callers share a single in-flight
    /// request and all observe the same resulting list.
    pub async fn fetch_list(&self) -> Result<Vec<ConfirmationEntry>> {
        let fut = {
            let mut inflight = self.inflight.lock().unwrap();

            if let Some(fut) = inflight.as_ref() {
                fut.clone()
            } else {
                let (key, time) = self.derive_key(Tag::Conf)?;
                let transport = self.transport.clone();
                let device_id = get_device_id(u64::from(self.steamid));
                let account_id = u64::from(self.steamid).to_string();
                let new_fut: BoxFuture<'static, ListOutcome> = Box::pin(async move {
                    fetch_list_uncached(transport, device_id, account_id, key, time).await
                        .map(Arc::new)
                        .map_err(|error| FetchListError::from(&error))
                });
                let shared = new_fut.shared();

                *inflight = Some(shared.clone());
                shared
            }
        };

        let outcome = fut.await;

        *self.inflight.lock().unwrap() = None;

        let list = outcome?;

        *self.last_list.lock().unwrap() = (*list).clone();

        Ok((*list).clone())
    }

    /// Applies `op` to a single confirmation, or batches via `multiajaxop` when more than one
    /// id/key pair is given.
    pub async fn operate(&self, conf_ids: &[u64], conf_keys: &[u64], op: Operation) -> Result<()> {
        let (key, time) = self.derive_key(match op {
            Operation::Allow => Tag::Allow,
            Operation::Cancel => Tag::Cancel,
        })?;
        let device_id = get_device_id(u64::from(self.steamid));
        let account_id = u64::from(self.steamid).to_string();

        #[derive(serde::Deserialize)]
        struct OperateResponse {
            success: bool,
            #[serde(default)]
            message: Option<String>,
        }

        let response = if conf_ids.len() > 1 && conf_keys.len() > 1 {
            let cid: Vec<String> = conf_ids.iter().map(u64::to_string).collect();
            let ck: Vec<String> = conf_keys.iter().map(u64::to_string).collect();
            let mut form = vec![
                ("op".to_string(), op.to_string()),
                ("p".to_string(), device_id),
                ("a".to_string(), account_id),
                ("k".to_string(), key),
                ("t".to_string(), time.to_string()),
                ("m".to_string(), "android".to_string()),
                ("tag".to_string(), op.to_string()),
            ];

            form.extend(cid.into_iter().map(|v| ("cid[]".to_string(), v)));
            form.extend(ck.into_iter().map(|v| ("ck[]".to_string(), v)));

            self.transport.client()
                .post(format!("{HOSTNAME}/mobileconf/multiajaxop"))
                .header("X-Requested-With", "com.valvesoftware.android.steam.community")
                .form(&form)
                .send()
                .await?
        } else {
            let cid = conf_ids.first().copied().ok_or(Error::MalformedResponse("operate called with no confirmations"))?;
            let ck = conf_keys.first().copied().ok_or(Error::MalformedResponse("operate called with no confirmations"))?;

            self.transport.client()
                .get(format!("{HOSTNAME}/mobileconf/ajaxop"))
                .header("X-Requested-With", "com.valvesoftware.android.steam.community")
                .query(&[
                    ("op", op.to_string()),
                    ("p", device_id),
                    ("a", account_id),
                    ("k", key),
                    ("t", time.to_string()),
                    ("m", "android".to_string()),
                    ("tag", op.to_string()),
                    ("cid", cid.to_string()),
                    ("ck", ck.to_string()),
                ])
                .send()
                .await?
        };

        let body: OperateResponse = crate::transport::parse_response(response).await?;

        if body.success {
            Ok(())
        } else {
            Err(Error::ConfirmationFailed(body.message))
        }
    }

    /// Looks up and responds to the confirmation created for `offer_id`. Refetches the list
    /// once, and only once, if the entry isn't found on the first try.
    pub async fn respond_to_offer(&self, offer_id: TradeOfferId, op: Operation) -> Result<()> {
        let mut list = self.last_list.lock().unwrap().clone();
        let mut entry = list.iter().find(|c| c.creator == offer_id).cloned();

        if entry.is_none() {
            list = self.fetch_list().await?;
            entry = list.iter().find(|c| c.creator == offer_id).cloned();
        }

        let entry = entry.ok_or(Error::ConfirmationNotFound(offer_id))?;

        self.operate(&[entry.conf_id], &[entry.conf_key], op).await
    }

    /// Cancels every currently outstanding confirmation.
    pub async fn cancel_all(&self) -> Result<()> {
        let list = self.fetch_list().await?;

        if list.is_empty() {
            return Ok(());
        }

        let ids: Vec<u64> = list.iter().map(|c| c.conf_id).collect();
        let keys: Vec<u64> = list.iter().map(|c| c.conf_key).collect();

        self.operate(&ids, &keys, Operation::Cancel).await
    }
}

async fn fetch_list_uncached(
    transport: Transport,
    device_id: String,
    account_id: String,
    key: String,
    time: i64,
) -> Result<Vec<ConfirmationEntry>> {
    let response = transport.client()
        .get(format!("{HOSTNAME}/mobileconf/conf"))
        .header("X-Requested-With", "com.valvesoftware.android.steam.community")
        .query(&[
            ("p", device_id.as_str()),
            ("a", account_id.as_str()),
            ("k", key.as_str()),
            ("t", time.to_string().as_str()),
            ("m", "android"),
            ("tag", "conf"),
        ])
        .send()
        .await?;
    let text = response.text().await?;

    // Steam redirects unauthenticated mobile clients back into the login flow rather than
    // returning the confirmation fragment.
    if text.contains("mobileconf_loginflow") || text.contains("g_steamID = false;") {
        return Err(Error::NotLoggedIn);
    }

    parse_confirmations(&text).map_err(Error::ParseHtml)
}

fn parse_confirmations(text: &str) -> std::result::Result<Vec<ConfirmationEntry>, ParseHtmlError> {
    let fragment = Html::parse_fragment(text);
    let empty_selector = Selector::parse("#mobileconf_empty").expect("static selector");
    let done_selector = Selector::parse(".mobileconf_done").expect("static selector");
    let div_selector = Selector::parse("div").expect("static selector");

    if let Some(element) = fragment.select(&empty_selector).next() {
        if done_selector.matches(&element) {
            return match element.select(&div_selector).nth(1) {
                Some(message_node) => Err(ParseHtmlError::Response(message_node.text().collect())),
                None => Ok(Vec::new()),
            };
        }

        return Ok(Vec::new());
    }

    let entry_selector = Selector::parse(".mobileconf_list_entry").expect("static selector");
    let description_selector = Selector::parse(".mobileconf_list_entry_description").expect("static selector");

    fragment.select(&entry_selector)
        .map(|element| {
            let data_type = element.value().attr("data-type");
            let id = element.value().attr("data-confid");
            let key = element.value().attr("data-key");
            let creator = element.value().attr("data-creator");
            let description = element.select(&description_selector).next();

            if data_type.is_none() || id.is_none() || key.is_none() || creator.is_none() || description.is_none() {
                return Err(ParseHtmlError::Malformed("confirmation entry is missing a required attribute"));
            }

            let title = description.unwrap().text()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(" ");

            Ok(ConfirmationEntry {
                conf_id: id.unwrap().parse()?,
                conf_key: key.unwrap().parse()?,
                creator: creator.unwrap().parse()?,
                conf_type: ConfirmationType::from(data_type.unwrap()),
                title,
                receiving: None,
                time_text: None,
                icon_url: None,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_empty_list() {
        let html = r#"<div id="mobileconf_empty">Nothing to confirm</div>"#;

        assert_eq!(parse_confirmations(html).unwrap(), Vec::new());
    }

    #[test]
    fn parses_done_error_message() {
        let html = r#"<div id="mobileconf_empty" class="mobileconf_done">
            <div>icon</div>
            <div>Something went wrong</div>
        </div>"#;

        let error = parse_confirmations(html).unwrap_err();

        assert!(matches!(error, ParseHtmlError::Response(m) if m.contains("Something went wrong")));
    }

    #[test]
    fn parses_a_trade_confirmation_entry() {
        let html = r#"
            <div class="mobileconf_list_entry" data-confid="1" data-key="2" data-creator="555" data-type="2">
                <div class="mobileconf_list_entry_description">Trade with someone</div>
            </div>
        "#;

        let entries = parse_confirmations(html).unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].conf_id, 1);
        assert_eq!(entries[0].conf_key, 2);
        assert_eq!(entries[0].creator, 555);
        assert_eq!(entries[0].conf_type, ConfirmationType::Trade);
        assert_eq!(entries[0].title, "Trade with someone");
    }

    #[test]
    fn fails_fast_on_missing_attribute() {
        let html = r#"
            <div class="mobileconf_list_entry" data-key="2" data-creator="555" data-type="2">
                <div class="mobileconf_list_entry_description">Trade with someone</div>
            </div>
        "#;

        assert!(matches!(parse_confirmations(html), Err(ParseHtmlError::Malformed(_))));
    }
}
