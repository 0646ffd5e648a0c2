//! Serde helpers for Steam's assorted wire-format quirks.

/// Serializes/deserializes a numeric value that Steam represents as a JSON string (most asset
/// IDs, e.g. `assetid`/`contextid`, are emitted this way to dodge JS's 53-bit integer limit).
pub mod string {
    use std::fmt::Display;
    use std::str::FromStr;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Display,
        S: Serializer,
    {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: FromStr,
        T::Err: Display,
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;

        s.parse::<T>().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use serde::{Serialize, Deserialize};

    #[derive(Serialize, Deserialize)]
    struct Wrapper {
        #[serde(with = "super::string")]
        value: u64,
    }

    #[test]
    fn round_trips_through_string() {
        let wrapper: Wrapper = serde_json::from_str(r#"{"value":"12345"}"#).unwrap();

        assert_eq!(wrapper.value, 12345);
        assert_eq!(serde_json::to_string(&wrapper).unwrap(), r#"{"value":"12345"}"#);
    }
}
