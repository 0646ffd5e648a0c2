//! The cookie-aware HTTP fetch wrapper and its response classifier.
//!
//! Steam signals session and account-state problems inline in response bodies (and the
//! occasional redirect) rather than through clean status codes, so every response coming back
//! through this layer is run through [`parse_response`] before the caller ever sees it.

use bytes::Bytes;
use lazy_regex::{regex_captures, regex_is_match};
use serde::de::{self, DeserializeOwned, MapAccess, Visitor};
use crate::error::{Error, TradeOfferError};
use crate::types::HttpClient;

/// Thin wrapper over the middleware-wrapped reqwest client used for every outbound request.
#[derive(Debug, Clone)]
pub struct Transport {
    client: HttpClient,
}

impl Transport {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &HttpClient {
        &self.client
    }
}

#[derive(Debug, Default)]
struct TradeErrorOrEResultResponse<'a> {
    num_keys: usize,
    response: Option<&'a str>,
    str_error: Option<&'a str>,
}

/// Scans the raw body for a `"response"` or `"strError"` field without allocating or fully
/// deserializing it. This runs on every response, so it avoids the cost of parsing the whole
/// payload twice.
fn deserialize_response_for_errors(bytes: &Bytes) -> Result<TradeErrorOrEResultResponse<'_>, serde_json::Error> {
    struct Visit<'a>(std::marker::PhantomData<&'a ()>);

    impl<'de, 'a> Visitor<'de> for Visit<'a>
    where
        'de: 'a,
    {
        type Value = TradeErrorOrEResultResponse<'a>;

        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            write!(f, "a JSON object with optional 'response' and 'strError' fields")
        }

        fn visit_map<M>(self, mut access: M) -> Result<Self::Value, M::Error>
        where
            M: MapAccess<'de>,
        {
            let mut out = TradeErrorOrEResultResponse::default();

            while let Some(key) = access.next_key::<&str>()? {
                out.num_keys += 1;

                match key {
                    "response" => out.response = Some(access.next_value()?),
                    "strError" => out.str_error = Some(access.next_value()?),
                    _ => { access.next_value::<de::IgnoredAny>()?; },
                }
            }

            Ok(out)
        }
    }

    let mut deserializer = serde_json::Deserializer::new(serde_json::de::SliceRead::new(bytes));

    deserializer.deserialize_any(Visit(std::marker::PhantomData))
}

fn check_response_for_errors(bytes: &Bytes, eresult: Option<u32>) -> Result<(), Error> {
    let Ok(json) = deserialize_response_for_errors(bytes) else {
        return Ok(());
    };

    if let Some(str_error) = json.str_error {
        return Err(Error::TradeOffer(TradeOfferError::from(str_error)));
    }

    if let Some(code) = eresult {
        if code == 1 || json.num_keys > 1 {
            return Ok(());
        }

        if let Some(response) = json.response {
            let response_has_data = response.starts_with('{') && response.ends_with('}') && response != "{}";

            if !response_has_data {
                return Err(Error::DataTemporarilyUnavailable);
            }
        }
    }

    Ok(())
}

fn is_login_redirect(location: Option<&reqwest::header::HeaderValue>) -> bool {
    location
        .and_then(|v| v.to_str().ok())
        .is_some_and(|s| s.contains("/login"))
}

/// Deserializes a response body as `D`, classifying degraded or erroring responses along the
/// way. Any status >= 400 without a more specific match becomes [`Error::Http`].
pub async fn parse_response<D>(response: reqwest::Response) -> Result<D, Error>
where
    D: DeserializeOwned,
{
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.bytes().await?;
    let eresult = headers
        .get("x-eresult")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u32>().ok());

    if !status.is_success() {
        if (300..=399).contains(&status.as_u16()) && is_login_redirect(headers.get("location")) {
            return Err(Error::NotLoggedIn);
        }

        if status == reqwest::StatusCode::FORBIDDEN {
            let body = String::from_utf8_lossy(&bytes);

            if body.contains("Family View") {
                return Err(Error::FamilyViewRestricted);
            }
        }

        if (400..=599).contains(&status.as_u16()) {
            log::warn!("Steam response error. Status: {status}, Body: {}", String::from_utf8_lossy(&bytes));

            return Err(Error::Http(status));
        }
    }

    check_response_for_errors(&bytes, eresult)?;

    match serde_json::from_slice::<D>(&bytes) {
        Ok(body) => Ok(body),
        Err(_) => Err(classify_non_json_body(&bytes)),
    }
}

fn classify_non_json_body(bytes: &Bytes) -> Error {
    let html = String::from_utf8_lossy(bytes);

    if html.contains("<h1>Sorry!</h1>") {
        return if let Some((_, message)) = regex_captures!("<h3>(.+)</h3>", &html) {
            Error::TradeOffer(TradeOfferError::from(message))
        } else {
            Error::MalformedResponse("Steam returned an HTML error page without an <h3> message")
        };
    }

    if html.contains("<h1>Sign In</h1>") && html.contains("g_steamID = false;") {
        return Error::NotLoggedIn;
    }

    if regex_is_match!(r#"\{"success": ?false\}"#, &html) {
        return Error::DataTemporarilyUnavailable;
    }

    if html.contains("Access is denied") {
        return Error::NotLoggedIn;
    }

    if let Some((_, message)) = regex_captures!(r#"<div id="error_msg">\s*([^<]+)\s*</div>"#, &html) {
        return Error::TradeOffer(TradeOfferError::from(message));
    }

    Error::MalformedResponse("Got an unexpected non-JSON response")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_str_error_as_trade_offer_error() {
        let bytes = Bytes::from_static(br#"{"strError":"You have logged in from a new device (24)"}"#);

        let result = check_response_for_errors(&bytes, None);

        assert!(matches!(result, Err(Error::TradeOffer(TradeOfferError::NewDevice(Some(24))))));
    }

    #[test]
    fn eresult_one_with_empty_response_is_ok() {
        let bytes = Bytes::from_static(br#"{"response":{}}"#);

        assert!(check_response_for_errors(&bytes, Some(1)).is_ok());
    }

    #[test]
    fn eresult_failure_with_empty_response_is_data_unavailable() {
        let bytes = Bytes::from_static(br#"{"response":{}}"#);

        let result = check_response_for_errors(&bytes, Some(2));

        assert!(matches!(result, Err(Error::DataTemporarilyUnavailable)));
    }
}
