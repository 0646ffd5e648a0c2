use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde_repr::{Deserialize_repr, Serialize_repr};
use strum_macros::{Display, EnumString};

/// The method by which a trade offer requires second-factor confirmation.
#[derive(
    Debug, Serialize_repr, Deserialize_repr, Display, EnumString,
    PartialEq, Eq, TryFromPrimitive, IntoPrimitive, Clone, Copy,
)]
#[repr(u8)]
pub enum ConfirmationMethod {
    /// No confirmation is required.
    None = 0,
    /// An email was sent with a link to confirm the trade offer.
    Email = 1,
    /// The trade offer may be confirmed via the mobile app.
    Mobile = 2,
}

impl Default for ConfirmationMethod {
    fn default() -> Self {
        Self::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_confirmation_method() {
        #[derive(serde::Deserialize)]
        struct Wrapper {
            confirmation_method: ConfirmationMethod,
        }

        let wrapper: Wrapper = serde_json::from_str(r#"{"confirmation_method":2}"#).unwrap();

        assert_eq!(wrapper.confirmation_method, ConfirmationMethod::Mobile);
    }
}
