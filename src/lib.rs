//! A headless Steam trade-offer reconciliation agent: send, accept, decline and confirm trade
//! offers, and keep a local view of their state in sync with Steam's via a background polling
//! loop.
//!
//! Construct an [`OfferManager`](manager::OfferManager) via
//! [`OfferManager::builder`](manager::OfferManager::builder), feed it a session from an
//! externally-driven login with [`OfferManager::set_session`](manager::OfferManager::set_session),
//! and call [`OfferManager::start_polling`](manager::OfferManager::start_polling) to receive
//! [`Event`]s as offers change state.

pub mod api;
pub mod confirmation;
pub mod config;
pub mod context;
pub mod enums;
pub mod error;
pub mod events;
pub mod helpers;
pub mod item;
pub mod manager;
pub mod offer;
pub mod ops;
pub mod poll_data;
pub mod policies;
mod poller;
pub mod serialize;
pub mod session;
pub mod time;
pub mod transport;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use events::{CancelReason, Event};
pub use item::Item;
pub use manager::{OfferManager, OfferManagerBuilder};
pub use offer::Offer;
pub use ops::SendOutcome;
pub use poll_data::{FileStore, PollData, PollDataStore};
pub use poller::TickOutcome;
pub use session::Session;
pub use enums::{ConfirmationMethod, OfferFilter, TradeOfferState};

pub use steamid_ng::SteamID;
