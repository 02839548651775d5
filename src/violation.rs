//! Claim protocol violations and the hook that receives them.
//!
//! A violation is a bug in the caller (out-of-order completion, cancelling more than was
//! claimed, handing back the wrong slot), never a runtime condition. The default hook panics.

use core::fmt;

use thiserror::Error;

/// Which half of the ring a claim belongs to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    Write,
    Read,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Side::Write => "write",
            Side::Read => "read",
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("claim layer bound to an uninitialized ring")]
    Uninitialized,

    #[error("no outstanding {0} claim to cancel")]
    NothingToCancel(Side),

    #[error("no outstanding {0} claim to complete")]
    NothingToComplete(Side),

    /// Addresses of the slot the caller handed back and the one the protocol expected.
    #[error("{side} slot {given:#x} handed back out of order, expected {expected:#x}")]
    SlotMismatch {
        side: Side,
        expected: usize,
        given: usize,
    },

    /// The ring refused to commit/advance a slot that a claim had reserved.
    #[error("ring refused a reserved {0} slot")]
    Refused(Side),

    #[error("evicting the oldest element freed no writeable slot")]
    EvictionFailed,
}

/// Receives protocol violations from a [`ClaimedAccess`](crate::ClaimedAccess).
///
/// The reporting call leaves the claim state untouched; a handler that returns lets the caller
/// carry on as if the offending call had not been made.
pub trait ViolationHandler {
    fn on_violation(&mut self, violation: Violation);
}

/// Default handler: treat every violation as fatal.
#[derive(Copy, Clone, Debug, Default)]
pub struct PanicOnViolation;

impl ViolationHandler for PanicOnViolation {
    #[track_caller]
    fn on_violation(&mut self, violation: Violation) {
        panic!("ring claim protocol violated: {violation}");
    }
}

impl<F: FnMut(Violation)> ViolationHandler for F {
    #[inline]
    fn on_violation(&mut self, violation: Violation) {
        self(violation)
    }
}
