//! Transaction State Machine
//!
//! Pairs confirmed requests with their acks. Each outstanding request holds
//! an invoke-id (1..=255, 0 means "none"), the encoded PDU for
//! retransmission, the destination address and a retry timer. Acks complete
//! a transaction only when both the invoke-id and the source address match;
//! anything else is silently discarded, because the invoke-id may already
//! have been reissued.
//!
//! All operations are plain `&mut self` methods: the host drives them from
//! one cooperative loop and never re-enters them from a handler callback.

use crate::datalink::{BacnetAddress, DataLink};
use crate::network::Npdu;
use crate::service::{AbortReason, RejectReason};

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

/// Default per-transaction timeout in milliseconds.
pub const APDU_TIMEOUT_MS: u64 = 3000;
/// Default number of retransmissions before a transaction fails.
pub const APDU_RETRIES: u8 = 3;

/// Why a transaction reached the `Failed` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionFailure {
    /// No reply after every retry
    Timeout,
    Rejected(RejectReason),
    Aborted(AbortReason),
}

/// Lifecycle of one confirmed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Idle,
    AwaitConfirmation,
    Completed,
    Failed(TransactionFailure),
}

#[derive(Debug, Clone)]
struct Transaction {
    invoke_id: u8,
    destination: BacnetAddress,
    npdu: Npdu,
    pdu: Vec<u8>,
    state: TransactionState,
    retry_count: u8,
    retry_timer_ms: u64,
}

/// The table of in-flight confirmed requests.
#[derive(Debug)]
pub struct TransactionStateMachine {
    transactions: Vec<Transaction>,
    apdu_timeout_ms: u64,
    apdu_retries: u8,
    next_invoke_id: u8,
}

impl Default for TransactionStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionStateMachine {
    pub fn new() -> Self {
        Self::with_timing(APDU_TIMEOUT_MS, APDU_RETRIES)
    }

    pub fn with_timing(apdu_timeout_ms: u64, apdu_retries: u8) -> Self {
        Self {
            transactions: Vec::new(),
            apdu_timeout_ms,
            apdu_retries,
            next_invoke_id: 0,
        }
    }

    pub fn apdu_timeout_ms(&self) -> u64 {
        self.apdu_timeout_ms
    }

    pub fn apdu_retries(&self) -> u8 {
        self.apdu_retries
    }

    /// Number of live transactions.
    pub fn active_count(&self) -> usize {
        self.transactions
            .iter()
            .filter(|transaction| transaction.state == TransactionState::AwaitConfirmation)
            .count()
    }

    fn in_use(&self, invoke_id: u8) -> bool {
        self.transactions
            .iter()
            .any(|transaction| transaction.invoke_id == invoke_id)
    }

    /// Allocate the next free invoke-id, or 0 when all 255 are in flight;
    /// the caller must back off on 0.
    pub fn next_free_invoke_id(&mut self) -> u8 {
        for _ in 0..=u8::MAX {
            self.next_invoke_id = self.next_invoke_id.wrapping_add(1);
            if self.next_invoke_id == crate::BACNET_NO_INVOKE_ID {
                self.next_invoke_id = 1;
            }
            if !self.in_use(self.next_invoke_id) {
                return self.next_invoke_id;
            }
        }
        crate::BACNET_NO_INVOKE_ID
    }

    /// Register an outgoing confirmed request for retry tracking. The PDU
    /// must already have been sent once by the caller.
    pub fn set(&mut self, invoke_id: u8, destination: BacnetAddress, npdu: Npdu, pdu: &[u8]) {
        if invoke_id == crate::BACNET_NO_INVOKE_ID {
            return;
        }
        // A stale entry under this id was either completed or failed;
        // the id has been reissued, drop the old record.
        self.transactions
            .retain(|transaction| transaction.invoke_id != invoke_id);
        self.transactions.push(Transaction {
            invoke_id,
            destination,
            npdu,
            pdu: pdu.to_vec(),
            state: TransactionState::AwaitConfirmation,
            retry_count: 0,
            retry_timer_ms: self.apdu_timeout_ms,
        });
    }

    /// Current state of a transaction; `Idle` when the id is unknown.
    pub fn state(&self, invoke_id: u8) -> TransactionState {
        self.transactions
            .iter()
            .find(|transaction| transaction.invoke_id == invoke_id)
            .map(|transaction| transaction.state)
            .unwrap_or(TransactionState::Idle)
    }

    /// Return a terminal transaction's invoke-id to the free pool.
    pub fn free(&mut self, invoke_id: u8) {
        self.transactions
            .retain(|transaction| transaction.invoke_id != invoke_id);
    }

    /// An ack (simple, complex or segment) arrived. Returns true when it
    /// completed a live transaction; mismatched ids or addresses leave all
    /// state untouched.
    pub fn confirmation(&mut self, invoke_id: u8, source: &BacnetAddress) -> bool {
        match self.live_entry(invoke_id, source) {
            Some(transaction) => {
                transaction.state = TransactionState::Completed;
                true
            }
            None => {
                log::debug!("discarding unmatched ack, invoke id {}", invoke_id);
                false
            }
        }
    }

    /// A Reject PDU arrived for this transaction.
    pub fn reject(&mut self, invoke_id: u8, source: &BacnetAddress, reason: RejectReason) -> bool {
        match self.live_entry(invoke_id, source) {
            Some(transaction) => {
                transaction.state =
                    TransactionState::Failed(TransactionFailure::Rejected(reason));
                true
            }
            None => false,
        }
    }

    /// An Abort PDU arrived for this transaction.
    pub fn abort(&mut self, invoke_id: u8, source: &BacnetAddress, reason: AbortReason) -> bool {
        match self.live_entry(invoke_id, source) {
            Some(transaction) => {
                transaction.state = TransactionState::Failed(TransactionFailure::Aborted(reason));
                true
            }
            None => false,
        }
    }

    fn live_entry(&mut self, invoke_id: u8, source: &BacnetAddress) -> Option<&mut Transaction> {
        self.transactions.iter_mut().find(|transaction| {
            transaction.invoke_id == invoke_id
                && transaction.state == TransactionState::AwaitConfirmation
                && transaction.destination.matches(source)
        })
    }

    /// Advance every retry timer by `elapsed_ms`. Expired transactions are
    /// retransmitted until the retry budget runs out, then marked failed.
    /// Returns the invoke-ids that newly failed this tick.
    pub fn tick(&mut self, elapsed_ms: u64, link: &mut dyn DataLink) -> Vec<u8> {
        let mut failed = Vec::new();
        let retries = self.apdu_retries;
        let timeout = self.apdu_timeout_ms;

        for transaction in &mut self.transactions {
            if transaction.state != TransactionState::AwaitConfirmation {
                continue;
            }
            if transaction.retry_timer_ms > elapsed_ms {
                transaction.retry_timer_ms -= elapsed_ms;
                continue;
            }
            if transaction.retry_count < retries {
                transaction.retry_count += 1;
                transaction.retry_timer_ms = timeout;
                log::debug!(
                    "retransmitting invoke id {} (attempt {})",
                    transaction.invoke_id,
                    transaction.retry_count + 1
                );
                // A send failure does not advance state; the next expiry
                // retransmits again.
                if let Err(error) =
                    link.send_pdu(&transaction.destination, &transaction.npdu, &transaction.pdu)
                {
                    log::warn!(
                        "retransmit of invoke id {} failed: {}",
                        transaction.invoke_id,
                        error
                    );
                }
            } else {
                transaction.state = TransactionState::Failed(TransactionFailure::Timeout);
                failed.push(transaction.invoke_id);
                log::debug!("invoke id {} timed out", transaction.invoke_id);
            }
        }
        failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datalink::LoopbackLink;

    fn peer() -> BacnetAddress {
        BacnetAddress::local(&[0x0A])
    }

    fn arm(tsm: &mut TransactionStateMachine) -> u8 {
        let invoke_id = tsm.next_free_invoke_id();
        tsm.set(invoke_id, peer(), Npdu::for_request(true), &[0x00, 0x05, invoke_id, 12]);
        invoke_id
    }

    #[test]
    fn test_invoke_id_never_repeats_without_free() {
        let mut tsm = TransactionStateMachine::new();
        let mut seen = [false; 256];
        for _ in 0..255 {
            let id = tsm.next_free_invoke_id();
            assert_ne!(id, 0);
            assert!(!seen[id as usize], "id {} handed out twice", id);
            seen[id as usize] = true;
            tsm.set(id, peer(), Npdu::for_request(true), &[0]);
        }
        // Pool exhausted.
        assert_eq!(tsm.next_free_invoke_id(), 0);

        tsm.free(17);
        assert_eq!(tsm.next_free_invoke_id(), 17);
    }

    #[test]
    fn test_matching_ack_completes() {
        let mut tsm = TransactionStateMachine::new();
        let invoke_id = arm(&mut tsm);
        assert_eq!(tsm.state(invoke_id), TransactionState::AwaitConfirmation);

        assert!(tsm.confirmation(invoke_id, &peer()));
        assert_eq!(tsm.state(invoke_id), TransactionState::Completed);

        tsm.free(invoke_id);
        assert_eq!(tsm.state(invoke_id), TransactionState::Idle);
    }

    #[test]
    fn test_address_mismatch_leaves_state() {
        let mut tsm = TransactionStateMachine::new();
        let invoke_id = arm(&mut tsm);

        let wrong_peer = BacnetAddress::local(&[0x0B]);
        assert!(!tsm.confirmation(invoke_id, &wrong_peer));
        assert_eq!(tsm.state(invoke_id), TransactionState::AwaitConfirmation);
    }

    #[test]
    fn test_unknown_ack_discarded() {
        let mut tsm = TransactionStateMachine::new();
        assert!(!tsm.confirmation(200, &peer()));
    }

    #[test]
    fn test_retries_then_failure() {
        let mut tsm = TransactionStateMachine::with_timing(1000, 3);
        let mut link = LoopbackLink::new(&[0x01]);
        let invoke_id = arm(&mut tsm);

        // Three expiries retransmit.
        for attempt in 1..=3 {
            let failed = tsm.tick(1000, &mut link);
            assert!(failed.is_empty());
            assert_eq!(link.sent_count(), attempt);
        }
        // The fourth expiry exhausts the budget.
        let failed = tsm.tick(1000, &mut link);
        assert_eq!(failed, [invoke_id]);
        assert_eq!(
            tsm.state(invoke_id),
            TransactionState::Failed(TransactionFailure::Timeout)
        );
        assert_eq!(link.sent_count(), 3);
    }

    #[test]
    fn test_partial_tick_keeps_timer() {
        let mut tsm = TransactionStateMachine::with_timing(3000, 3);
        let mut link = LoopbackLink::new(&[0x01]);
        arm(&mut tsm);

        tsm.tick(1000, &mut link);
        tsm.tick(1000, &mut link);
        assert_eq!(link.sent_count(), 0);
        tsm.tick(1000, &mut link);
        assert_eq!(link.sent_count(), 1);
    }

    #[test]
    fn test_reject_and_abort_mark_failed() {
        let mut tsm = TransactionStateMachine::new();
        let invoke_id = arm(&mut tsm);
        assert!(tsm.reject(invoke_id, &peer(), RejectReason::UnrecognizedService));
        assert_eq!(
            tsm.state(invoke_id),
            TransactionState::Failed(TransactionFailure::Rejected(
                RejectReason::UnrecognizedService
            ))
        );

        let invoke_id = arm(&mut tsm);
        assert!(tsm.abort(invoke_id, &peer(), AbortReason::SegmentationNotSupported));
        assert_eq!(
            tsm.state(invoke_id),
            TransactionState::Failed(TransactionFailure::Aborted(
                AbortReason::SegmentationNotSupported
            ))
        );
    }
}
