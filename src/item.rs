use serde::{Deserialize, Serialize};
use crate::serialize;
use crate::types::{AppId, ContextId, AssetId, Amount};

/// An economy item attached to a trade offer.
///
/// `name` is never set on an item we construct to send; it's only ever populated on items the
/// remote API gives back to us, and only when the caller has `get_descriptions` enabled.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
pub struct Item {
    pub appid: AppId,
    #[serde(with = "serialize::string")]
    pub contextid: ContextId,
    #[serde(with = "serialize::string")]
    pub assetid: AssetId,
    pub amount: Amount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Item {
    pub fn new(appid: AppId, contextid: ContextId, assetid: AssetId, amount: Amount) -> Self {
        Self { appid, contextid, assetid, amount, name: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_string_encoded_fields() {
        let item: Item = serde_json::from_str(
            r#"{"appid":730,"contextid":"2","assetid":"123456789","amount":1}"#,
        ).unwrap();

        assert_eq!(item.appid, 730);
        assert_eq!(item.contextid, 2);
        assert_eq!(item.assetid, 123456789);
        assert_eq!(item.amount, 1);
    }
}
