use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde_repr::{Deserialize_repr, Serialize_repr};
use strum_macros::{Display, EnumString};

/// Filter applied when requesting trade offers from the remote API.
#[derive(
    Serialize_repr, Deserialize_repr, Display, EnumString,
    Debug, PartialEq, Eq, TryFromPrimitive, IntoPrimitive, Clone, Copy,
)]
#[repr(u8)]
pub enum OfferFilter {
    /// Fetch active offers only.
    ActiveOnly = 1,
    /// Fetch historical (terminal) offers only.
    HistoricalOnly = 2,
    /// Fetch all offers.
    All = 3,
}
