use num_enum::{TryFromPrimitive, IntoPrimitive};
use serde_repr::{Serialize_repr, Deserialize_repr};
use strum_macros::{Display, EnumString};

/// The state of a trade offer, as reported by Steam.
#[derive(
    Serialize_repr, Deserialize_repr, Display, EnumString,
    Debug, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive, Clone, Copy,
)]
#[repr(u8)]
pub enum TradeOfferState {
    /// Invalid.
    Invalid = 1,
    /// Sent, awaiting action from the other party.
    Active = 2,
    /// Accepted and completed (or completing, if in escrow).
    Accepted = 3,
    /// Superseded by a counter-offer.
    Countered = 4,
    /// Expired without action.
    Expired = 5,
    /// Canceled by the sender.
    Canceled = 6,
    /// Declined by the recipient.
    Declined = 7,
    /// One or more items are no longer valid (e.g. traded away, converted).
    InvalidItems = 8,
    /// Created but requires a second-factor confirmation before it becomes active.
    CreatedNeedsConfirmation = 9,
    /// Canceled because the second-factor confirmation was not provided in time.
    CanceledBySecondFactor = 10,
    /// Accepted but held in escrow.
    InEscrow = 11,
    /// Was in escrow, but the escrow was rolled back.
    EscrowRollback = 12,
}

impl TradeOfferState {
    /// States from which further transitions are expected.
    pub const NON_TERMINAL: [TradeOfferState; 3] = [
        TradeOfferState::Accepted,
        TradeOfferState::CreatedNeedsConfirmation,
        TradeOfferState::InEscrow,
    ];

    /// Whether further transitions are expected from this state.
    pub fn is_non_terminal(&self) -> bool {
        Self::NON_TERMINAL.contains(self)
    }

    /// Whether no further transitions are expected from this state.
    pub fn is_terminal(&self) -> bool {
        !self.is_non_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_non_terminal_states() {
        assert!(TradeOfferState::Active.is_terminal());
        assert!(TradeOfferState::Accepted.is_non_terminal());
        assert!(TradeOfferState::CreatedNeedsConfirmation.is_non_terminal());
        assert!(TradeOfferState::InEscrow.is_non_terminal());
        assert!(TradeOfferState::Declined.is_terminal());
        assert!(TradeOfferState::Canceled.is_terminal());
    }

    #[test]
    fn deserializes_from_repr() {
        #[derive(serde::Deserialize)]
        struct Wrapper {
            state: TradeOfferState,
        }

        let wrapper: Wrapper = serde_json::from_str(r#"{"state":9}"#).unwrap();

        assert_eq!(wrapper.state, TradeOfferState::CreatedNeedsConfirmation);
    }
}
