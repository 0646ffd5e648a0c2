//! Contains types for common values used throughout the crate.

/// A Steam app ID, e.g. `440` for Team Fortress 2 or `730` for Counter-Strike 2.
pub type AppId = u32;
/// A context ID, scoped to an app.
pub type ContextId = u64;
/// An asset ID, unique to an item's `appid` and `contextid`.
pub type AssetId = u64;
/// The stack size of an asset. `1` for non-stackable items.
pub type Amount = u32;
/// The ID of a trade offer.
pub type TradeOfferId = u64;
/// The ID of a completed trade.
pub type TradeId = u64;
/// A 32-bit Steam account ID (the low bits of a 64-bit SteamID).
pub type AccountId = u32;
/// An HTTP client with the cookie and retry middleware the rest of the crate expects.
pub type HttpClient = reqwest_middleware::ClientWithMiddleware;
