use std::fmt;

/// One entry of the mobile confirmation list.
#[derive(Debug, PartialEq, Clone)]
pub struct ConfirmationEntry {
    pub conf_id: u64,
    pub conf_key: u64,
    /// Typically the trade-offer id this confirmation authorizes.
    pub creator: u64,
    pub conf_type: ConfirmationType,
    pub title: String,
    pub receiving: Option<String>,
    pub time_text: Option<String>,
    pub icon_url: Option<String>,
}

impl ConfirmationEntry {
    /// Human-readable representation, suitable for logging.
    pub fn description(&self) -> String {
        format!("{:?} - {}", self.conf_type, self.title)
    }
}

/// The type of confirmation, recovered from the `data-type` attribute.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ConfirmationType {
    Generic = 1,
    Trade = 2,
    MarketListing = 3,
    AccountRecovery = 6,
    Unknown,
}

impl From<&str> for ConfirmationType {
    fn from(text: &str) -> Self {
        match text {
            "1" => Self::Generic,
            "2" => Self::Trade,
            "3" => Self::MarketListing,
            "6" => Self::AccountRecovery,
            _ => Self::Unknown,
        }
    }
}

/// The action to take on a confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Allow,
    Cancel,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow => write!(f, "allow"),
            Self::Cancel => write!(f, "cancel"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_type_codes() {
        assert_eq!(ConfirmationType::from("2"), ConfirmationType::Trade);
        assert_eq!(ConfirmationType::from("99"), ConfirmationType::Unknown);
    }
}
