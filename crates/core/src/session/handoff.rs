//! Single-slot handoff between a background QR scanner and the session
//! manager.
//!
//! The scanner offers every decoded string; only payloads carrying the
//! `REIKEY:` marker are kept. While a code is being verified the slot is
//! busy and further offers are dropped, and the last seen payload is ignored
//! so a code held in front of the camera is not submitted twice.

use elixir_domain::constants::QR_PAYLOAD_PREFIX;
use parking_lot::Mutex;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    Empty,
    Pending(String),
    Busy(String),
}

#[derive(Debug)]
struct HandoffState {
    slot: Slot,
    last_seen: Option<String>,
}

/// Mutex-guarded single slot
#[derive(Debug)]
pub struct QrHandoff {
    state: Mutex<HandoffState>,
}

impl Default for QrHandoff {
    fn default() -> Self {
        Self::new()
    }
}

impl QrHandoff {
    #[must_use]
    pub fn new() -> Self {
        Self { state: Mutex::new(HandoffState { slot: Slot::Empty, last_seen: None }) }
    }

    /// Whether a payload looks like an Elixir login code.
    #[must_use]
    pub fn is_login_payload(payload: &str) -> bool {
        payload.starts_with(QR_PAYLOAD_PREFIX)
    }

    /// Offer a decoded payload. Returns `true` when it was accepted.
    pub fn offer(&self, payload: &str) -> bool {
        if !Self::is_login_payload(payload) {
            return false;
        }

        let mut state = self.state.lock();
        if state.slot != Slot::Empty || state.last_seen.as_deref() == Some(payload) {
            return false;
        }

        debug!("QR login code captured");
        state.last_seen = Some(payload.to_string());
        state.slot = Slot::Pending(payload.to_string());
        true
    }

    /// Take the pending code and mark the slot busy.
    pub fn take(&self) -> Option<String> {
        let mut state = self.state.lock();
        match std::mem::replace(&mut state.slot, Slot::Empty) {
            Slot::Pending(code) => {
                state.slot = Slot::Busy(code.clone());
                Some(code)
            }
            other => {
                state.slot = other;
                None
            }
        }
    }

    /// [`Self::take`] behind a guard that frees the slot when dropped.
    pub fn claim(&self) -> Option<HandoffClaim<'_>> {
        let code = self.take()?;
        Some(HandoffClaim { handoff: self, code, settled: false })
    }

    /// Free the slot after verification. On failure the same code may be
    /// offered again.
    pub fn release(&self, success: bool) {
        let mut state = self.state.lock();
        state.slot = Slot::Empty;
        if !success {
            state.last_seen = None;
        }
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        matches!(self.state.lock().slot, Slot::Busy(_))
    }

    #[must_use]
    pub fn has_pending(&self) -> bool {
        matches!(self.state.lock().slot, Slot::Pending(_))
    }
}

/// A code taken from a [`QrHandoff`]
///
/// Dropping an unfinished claim counts as a failed verification.
#[derive(Debug)]
pub struct HandoffClaim<'a> {
    handoff: &'a QrHandoff,
    code: String,
    settled: bool,
}

impl HandoffClaim<'_> {
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn finish(mut self, success: bool) {
        self.settled = true;
        self.handoff.release(success);
    }
}

impl Drop for HandoffClaim<'_> {
    fn drop(&mut self) {
        if !self.settled {
            debug!("QR verification abandoned");
            self.handoff.release(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignores_unrelated_payloads() {
        let handoff = QrHandoff::new();
        assert!(!handoff.offer("https://example.org"));
        assert!(!handoff.has_pending());
    }

    #[test]
    fn busy_slot_rejects_new_offers() {
        let handoff = QrHandoff::new();
        assert!(handoff.offer("REIKEY:one"));
        assert_eq!(handoff.take().as_deref(), Some("REIKEY:one"));
        assert!(handoff.is_busy());
        assert!(!handoff.offer("REIKEY:two"));
        assert!(handoff.take().is_none());
    }

    #[test]
    fn same_code_is_not_resubmitted_after_success() {
        let handoff = QrHandoff::new();
        assert!(handoff.offer("REIKEY:one"));
        handoff.take();
        handoff.release(true);
        assert!(!handoff.offer("REIKEY:one"));
        assert!(handoff.offer("REIKEY:two"));
    }

    #[test]
    fn failed_code_can_be_retried() {
        let handoff = QrHandoff::new();
        assert!(handoff.offer("REIKEY:one"));
        handoff.take();
        handoff.release(false);
        assert!(!handoff.is_busy());
        assert!(handoff.offer("REIKEY:one"));
    }

    #[test]
    fn dropped_claim_frees_the_slot() {
        let handoff = QrHandoff::new();
        assert!(handoff.offer("REIKEY:one"));

        let claim = handoff.claim().unwrap();
        assert_eq!(claim.code(), "REIKEY:one");
        assert!(handoff.is_busy());
        drop(claim);

        assert!(!handoff.is_busy());
        assert!(handoff.offer("REIKEY:one"));
    }

    #[test]
    fn finished_claim_keeps_success_semantics() {
        let handoff = QrHandoff::new();
        assert!(handoff.offer("REIKEY:one"));
        handoff.claim().unwrap().finish(true);

        assert!(!handoff.is_busy());
        assert!(!handoff.offer("REIKEY:one"));
    }
}
