//! The handle passed into per-offer verbs (component C, §4.C).
//!
//! The upstream library gives each offer a back-reference to its owning manager so `send`/
//! `accept`/`decline` can reach the transport, session and poll data. That makes `Offer` a type
//! with a lifecycle tied to whatever constructed it and complicates testing. Design Notes §9
//! calls for breaking the cycle: [`Offer`](crate::offer::Offer) stays a pure value, and verbs
//! that need collaborators take an explicit `&OfferContext` instead.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};

use crate::api::RemoteApi;
use crate::poll_data::PollData;
use crate::session::Session;

/// Everything a per-offer verb (`send`, `accept`, `decline`, `refresh`) needs besides the offer
/// itself.
#[derive(Clone)]
pub struct OfferContext {
    pub(crate) api: RemoteApi,
    pub(crate) session: Session,
    pub(crate) poll_data: Arc<Mutex<PollData>>,
    pub(crate) pending_send_counter: Arc<AtomicUsize>,
    /// Woken after a successful `send`/`accept`/`decline` so the reconciliation loop can run a
    /// tick sooner than its regular interval. `None` when a verb is invoked internally by the
    /// loop itself, which has no need to wake itself.
    pub(crate) poll_trigger: Option<Arc<Notify>>,
}

impl OfferContext {
    pub(crate) fn new(
        api: RemoteApi,
        session: Session,
        poll_data: Arc<Mutex<PollData>>,
        pending_send_counter: Arc<AtomicUsize>,
        poll_trigger: Option<Arc<Notify>>,
    ) -> Self {
        Self { api, session, poll_data, pending_send_counter, poll_trigger }
    }

    /// Wakes the reconciliation loop, if one is attached to this context.
    pub(crate) fn schedule_poll(&self) {
        if let Some(notify) = &self.poll_trigger {
            notify.notify_one();
        }
    }
}

/// RAII guard incrementing [`OfferContext::pending_send_counter`] for the duration of a send,
/// so the reconciliation loop can suppress `unknownOfferSent` for offers we just sent ourselves
/// (§5's "shared-resource policy").
pub(crate) struct PendingSendGuard(Arc<AtomicUsize>);

impl PendingSendGuard {
    pub(crate) fn enter(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for PendingSendGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
