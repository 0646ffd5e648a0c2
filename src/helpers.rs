//! Small utilities shared across the transport and session layers.

use std::fmt::Write;
use std::sync::Arc;
use lazy_regex::regex_captures;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header;
use reqwest_middleware::ClientBuilder;
use crate::error::SetCookiesError;
use crate::session::Session;
use crate::types::HttpClient;

lazy_static::lazy_static! {
    /// A default client backed by an in-memory cookie jar, for callers who don't need to share
    /// cookies with anything else in the host process.
    pub static ref DEFAULT_CLIENT: HttpClient = {
        let cookie_store = Arc::new(Jar::default());

        get_default_client(cookie_store, USER_AGENT_STRING)
    };
}

pub const USER_AGENT_STRING: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, \
like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone)]
pub struct CookiesData {
    pub sessionid: Option<String>,
    pub steamid: u64,
    pub access_token: String,
}

/// Generates a random sessionid, e.g. `"37bf523a24034ec06c60ec61"`.
pub fn generate_sessionid() -> String {
    (0..12).fold(String::new(), |mut output, _| {
        let b = rand::random::<u8>();
        let _ = write!(output, "{b:02x?}");

        output
    })
}

/// Extracts the session ID and Steam ID from a set of `Set-Cookie` values.
pub fn extract_auth_data_from_cookies(cookies: &[String]) -> Result<CookiesData, SetCookiesError> {
    let mut sessionid = None;
    let mut steamid = 0;
    let mut access_token = None;

    for cookie in cookies {
        if let Some((_, key, value)) = regex_captures!(r#"([^=]+)=(.+)"#, cookie) {
            match key {
                "sessionid" => sessionid = Some(value.to_string()),
                "steamLoginSecure" => {
                    let (_, steamid_str, access_token_str) =
                        regex_captures!(r#"^(\d{17})%7C%7C([^;]+)"#, value)
                            .ok_or(SetCookiesError::MissingAccessToken)?;

                    steamid = steamid_str.parse::<u64>()?;
                    access_token = Some(access_token_str.to_string());
                },
                _ => {},
            }
        }
    }

    let access_token = access_token.ok_or(SetCookiesError::MissingAccessToken)?;

    if steamid == 0 {
        return Err(SetCookiesError::MissingLoginCookie);
    }

    Ok(CookiesData { sessionid, steamid, access_token })
}

/// Extracts a [`Session`] from cookies, generating a fresh sessionid (and appending it to
/// `cookies`) if one isn't already present.
pub fn get_session_from_cookies(cookies: &mut Vec<String>) -> Result<Session, SetCookiesError> {
    let CookiesData { sessionid, steamid, access_token } = extract_auth_data_from_cookies(cookies)?;
    let sessionid = sessionid.unwrap_or_else(|| {
        let sessionid = generate_sessionid();

        cookies.push(format!("sessionid={sessionid}"));
        sessionid
    });

    Ok(Session { sessionid, access_token, steamid })
}

/// Builds a middleware-wrapped client with the given cookie store and user agent.
pub fn get_default_client<T>(cookie_store: Arc<T>, user_agent_string: &'static str) -> HttpClient
where
    T: CookieStore + 'static,
{
    let mut headers = header::HeaderMap::new();

    headers.insert(
        header::USER_AGENT,
        header::HeaderValue::from_static(user_agent_string),
    );

    let client = reqwest::ClientBuilder::new()
        .cookie_provider(cookie_store)
        .default_headers(headers)
        .build()
        .expect("default client configuration is always valid");

    ClientBuilder::new(client).build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_session_of_expected_length() {
        assert_eq!(generate_sessionid().len(), 24);
    }

    #[test]
    fn extracts_auth_data_from_login_cookie() {
        let cookies = vec![
            "sessionid=abc123".to_string(),
            "steamLoginSecure=76561198000000000%7C%7Ctoken-value".to_string(),
        ];
        let data = extract_auth_data_from_cookies(&cookies).unwrap();

        assert_eq!(data.sessionid.as_deref(), Some("abc123"));
        assert_eq!(data.steamid, 76561198000000000);
        assert_eq!(data.access_token, "token-value");
    }

    #[test]
    fn missing_login_cookie_is_an_error() {
        let cookies = vec!["sessionid=abc123".to_string()];

        assert!(extract_auth_data_from_cookies(&cookies).is_err());
    }
}
