//! Enumerated types shared across the crate.

mod trade_offer_state;
mod confirmation_method;
mod offer_filter;

pub use trade_offer_state::TradeOfferState;
pub use confirmation_method::ConfirmationMethod;
pub use offer_filter::OfferFilter;
