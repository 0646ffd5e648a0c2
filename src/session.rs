//! Session data derived from cookies set after an (externally driven) login.

/// Session data extracted from cookies.
#[derive(Debug, Clone, Default)]
pub struct Session {
    /// The session ID, used as `sessionid` in form/query parameters.
    pub sessionid: String,
    /// The access token carried in the `steamLoginSecure` cookie.
    pub access_token: String,
    /// The SteamID of the logged in account, as a 64-bit integer.
    pub steamid: u64,
}

impl Session {
    /// Whether this session appears populated (a login has completed).
    pub fn is_set(&self) -> bool {
        self.steamid != 0
    }
}
