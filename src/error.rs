//! Error types.

use crate::enums::TradeOfferState;
use crate::types::TradeOfferId;

pub use another_steam_totp::Error as TOTPError;
pub use anyhow::Error as AnyhowError;
pub use reqwest::Error as ReqwestError;

/// Result type returned by most fallible methods in this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Any range of errors encountered interacting with Steam or its confirmation endpoints.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// An input parameter is missing or invalid.
    #[error("Invalid parameter: {0}")]
    Parameter(#[from] ParameterError),
    /// A precondition on an offer's state was not met (e.g. accepting an offer we created).
    #[error("Invalid state: {0}")]
    InvalidState(&'static str),
    /// The session is not authenticated, or the remote reported the session as expired.
    #[error("Not logged in")]
    NotLoggedIn,
    /// The account is restricted by Family View.
    #[error("Family View is enabled and is restricting this action")]
    FamilyViewRestricted,
    /// An error was encountered making a request.
    #[error("reqwest error: {0}")]
    Reqwest(#[from] ReqwestError),
    /// An error was encountered within the request middleware.
    #[error("reqwest middleware error: {0}")]
    ReqwestMiddleware(AnyhowError),
    /// An error was encountered parsing a JSON response body.
    #[error("Error parsing response: {0}")]
    ParseJson(#[from] serde_json::Error),
    /// The response had an HTTP status other than 2xx that could not be classified further.
    #[error("HTTP error {0}")]
    Http(reqwest::StatusCode),
    /// The response was JSON but did not contain the fields this call expected.
    #[error("Malformed response: {0}")]
    MalformedResponse(&'static str),
    /// Every offer in an otherwise well-formed response had empty item sides; Steam is likely
    /// serving a temporarily degraded view.
    #[error("Offer data is temporarily unavailable")]
    DataTemporarilyUnavailable,
    /// An error was encountered when sending or acting on trade offers.
    #[error("Trade offer error: {0}")]
    TradeOffer(#[from] TradeOfferError),
    /// An HTML document could not be parsed the way it was expected to be.
    #[error("Error parsing HTML: {0}")]
    ParseHtml(#[from] ParseHtmlError),
    /// An error occurred deriving a confirmation key.
    #[error("TOTP error: {0}")]
    TOTP(#[from] TOTPError),
    /// No confirmation exists for the given trade offer (yet, or at all).
    #[error("No confirmation exists for offer {0}")]
    ConfirmationNotFound(TradeOfferId),
    /// A confirmation action was rejected by the server.
    #[error(
        "Confirmation unsuccessful. {}",
        .0.as_deref().unwrap_or(
            "The confirmation may have succeeded, may no longer exist, or another \
            confirmation may be in progress. Check confirmations again to verify."
        )
    )]
    ConfirmationFailed(Option<String>),
    /// Loading or saving persisted data failed.
    #[error("Persistence error: {0}")]
    File(#[from] FileError),
    /// Session data could not be extracted from the cookies handed to `set_session`.
    #[error("Error setting session: {0}")]
    SetCookies(#[from] SetCookiesError),
}

impl From<reqwest_middleware::Error> for Error {
    fn from(error: reqwest_middleware::Error) -> Self {
        match error {
            reqwest_middleware::Error::Reqwest(e) => Error::Reqwest(e),
            reqwest_middleware::Error::Middleware(e) => Error::ReqwestMiddleware(e),
        }
    }
}

/// Problems with a provided parameter or a precondition on an operation.
#[derive(thiserror::Error, Debug)]
pub enum ParameterError {
    /// No API key was configured.
    #[error("No API key configured")]
    MissingApiKey,
    /// No identity secret was configured; mobile confirmations are unavailable.
    #[error("No identity secret configured")]
    NoIdentitySecret,
    /// The offer has no items on either side.
    #[error("Offer is empty")]
    EmptyOffer,
    /// The partner account is not an individual account and cannot be traded with directly.
    #[error("Partner is not an individual account")]
    InvalidPartner,
    /// Attempted to mutate or re-send an offer that already has an `id`.
    #[error("Offer has already been sent")]
    AlreadySent,
    /// Cannot accept an offer that is not in the `Active` state.
    #[error("Cannot accept an offer in state {0}")]
    CannotAcceptOfferInState(TradeOfferState),
    /// Cannot accept an offer we created ourselves.
    #[error("Cannot accept an offer we created")]
    CannotAcceptOfferWeCreated,
    /// Cannot cancel an offer we did not create.
    #[error("Cannot cancel an offer we did not create")]
    CannotCancelOfferWeDidNotCreate,
    /// Cannot decline an offer we created (use cancel instead).
    #[error("Cannot decline an offer we created")]
    CannotDeclineOfferWeCreated,
    /// Cannot cancel or decline an offer that is not in a cancelable state.
    #[error("Cannot cancel an offer in state {0}")]
    CannotCancelOfferInState(TradeOfferState),
    /// An error occurred parsing a URL.
    #[error("Unable to parse URL: {0}")]
    UrlParse(#[from] url::ParseError),
}

/// An error occurred loading or saving persisted data through an injected [`PollDataStore`].
///
/// [`PollDataStore`]: crate::poll_data::PollDataStore
#[derive(thiserror::Error, Debug)]
pub enum FileError {
    /// The callback itself returned an error.
    #[error("{0}")]
    Backend(String),
    /// The persisted bytes could not be parsed as JSON.
    #[error("Error parsing persisted data: {0}")]
    Parse(#[from] serde_json::Error),
    /// The underlying filesystem operation failed.
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

/// An error occurred extracting session data from cookies.
#[derive(thiserror::Error, Debug)]
pub enum SetCookiesError {
    /// The `steamLoginSecure` cookie is missing entirely.
    #[error("Missing steamLoginSecure cookie")]
    MissingLoginCookie,
    /// The `steamLoginSecure` cookie did not contain an access token.
    #[error("Access token not found in steamLoginSecure cookie")]
    MissingAccessToken,
    /// The SteamID embedded in the cookie could not be parsed.
    #[error("Invalid SteamID in cookie: {0}")]
    InvalidSteamId(#[from] std::num::ParseIntError),
}

/// A domain-specific error recognized from a trade offer's `strError` message. Each variant may
/// carry the numeric result code parsed from a trailing `"(N)"` in the server's message, when
/// present.
#[derive(thiserror::Error, Debug, PartialEq, Eq, Clone)]
pub enum TradeOfferError {
    /// An unrecognized error message. The contained string has the full server message.
    #[error("{0}")]
    Unknown(String),
    /// We cannot trade with the partner because they (or we) have a trade ban.
    #[error("TradeBan ({0:?})")]
    TradeBan(Option<u32>),
    /// We logged in from a new device and temporarily cannot trade.
    #[error("NewDevice ({0:?})")]
    NewDevice(Option<u32>),
    /// The partner cannot trade for some other reason (privacy, VAC ban, full inventory, ...).
    #[error("TargetCannotTrade ({0:?})")]
    TargetCannotTrade(Option<u32>),
    /// Sending this offer would exceed the account's outstanding-offer limit.
    #[error("OfferLimitExceeded ({0:?})")]
    OfferLimitExceeded(Option<u32>),
    /// The item server (game backend) is temporarily unavailable.
    #[error("ItemServerUnavailable ({0:?})")]
    ItemServerUnavailable(Option<u32>),
}

impl TradeOfferError {
    /// Extracts the numeric code trailing a server message in the form `"... (28)"`, if any.
    pub fn parse_trailing_code(message: &str) -> Option<u32> {
        let trimmed = message.trim();
        let last = trimmed.rsplit(' ').next()?;
        let inner = last.strip_prefix('(')?.strip_suffix(')')?;

        inner.parse::<u32>().ok()
    }

    /// The numeric result code carried by this error, if the server included one.
    pub fn code(&self) -> Option<u32> {
        match self {
            Self::Unknown(_) => None,
            Self::TradeBan(code)
            | Self::NewDevice(code)
            | Self::TargetCannotTrade(code)
            | Self::OfferLimitExceeded(code)
            | Self::ItemServerUnavailable(code) => *code,
        }
    }
}

impl From<&str> for TradeOfferError {
    /// Classifies a `strError` message from Steam. This matches by substring against known
    /// phrases (mirroring the upstream service's own error text, which has no stable error
    /// codes for these particular cases), and carries along any trailing `"(N)"` result code.
    fn from(message: &str) -> Self {
        let code = Self::parse_trailing_code(message);

        if message.contains("trade ban") {
            Self::TradeBan(code)
        } else if message.contains("logged in from a new device") {
            Self::NewDevice(code)
        } else if message.contains("is not available to trade")
            || message.contains("cannot trade with") {
            Self::TargetCannotTrade(code)
        } else if message.contains("sent too many trade offers")
            || message.contains("you own too many") {
            Self::OfferLimitExceeded(code)
        } else if message.contains("unable to contact the game's item server") {
            Self::ItemServerUnavailable(code)
        } else {
            Self::Unknown(message.to_string())
        }
    }
}

/// An error occurred parsing the mobile confirmation HTML list.
#[derive(thiserror::Error, Debug)]
pub enum ParseHtmlError {
    /// The document did not have the structure a confirmation list is expected to have.
    #[error("{0}")]
    Malformed(&'static str),
    /// The document was a recognized "error" shape; this carries its message text.
    #[error("{0}")]
    Response(String),
    /// An integer attribute failed to parse.
    #[error("{0}")]
    ParseInt(#[from] std::num::ParseIntError),
    /// A CSS selector failed to compile. Should not occur with the selectors this crate uses.
    #[error("Invalid selector")]
    ParseSelector,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_trade_ban_message() {
        let message = "You cannot trade with this user because they have a trade ban (12345)";
        let error = TradeOfferError::from(message);

        assert_eq!(error, TradeOfferError::TradeBan(Some(12345)));
    }

    #[test]
    fn extracts_trailing_code_when_unrecognized() {
        let message = "There was an error accepting this trade offer. Please try again later. (28)";
        let error = TradeOfferError::from(message);

        assert_eq!(error, TradeOfferError::Unknown(message.to_string()));
        assert_eq!(TradeOfferError::parse_trailing_code(message), Some(28));
    }

    #[test]
    fn falls_back_to_unknown_without_a_code() {
        let message = "Something went wrong.";
        let error = TradeOfferError::from(message);

        assert_eq!(error, TradeOfferError::Unknown(message.to_string()));
    }
}
