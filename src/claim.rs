//! Claim-ahead access to a [`RingBuffer`].
//!
//! # Overview
//! A `ClaimedAccess` keeps its own "next write" and "next read" cursors that run ahead of the
//! ring's committed positions. Slots can be claimed several at a time and later either
//! completed (made visible to the other side) or canceled (given back).
//!
//! - Completion is FIFO: only the oldest outstanding claim can be completed.
//! - Cancellation is LIFO: only the most recent outstanding claim can be canceled.
//! - [`ClaimedAccess::wrapping_write`] never refuses: on a full ring it evicts the oldest
//!   unread element first.
//!
//! Breaking the ordering rules is a [`Violation`], routed to the instance's
//! [`ViolationHandler`]. Every operation that can violate has a `try_*` twin returning the
//! violation instead.
//!
//! # Notes
//! - Do not mix claimed writes with direct `write`/`commit` on the same ring, nor claimed reads
//!   with direct `read`/`advance`.
//! - One instance belongs to one thread of control. A producer and a consumer may each bind
//!   their own instance to the same ring.
//! - `wrapping_write` moves the read position as well, so it is only for an instance that owns
//!   both sides of the ring.

use core::fmt;
use core::ptr::NonNull;

use crate::position::Position;
use crate::ring::RingBuffer;
use crate::violation::{PanicOnViolation, Side, Violation, ViolationHandler};

pub struct ClaimedAccess<'q, H: ViolationHandler = PanicOnViolation> {
    ring: &'q RingBuffer,
    next_write: Position,
    next_read: Position,
    outstanding_reads: usize,
    handler: H,
}

impl<'q> ClaimedAccess<'q> {
    /// Bind to an initialized ring; violations panic.
    #[inline]
    pub fn bind(ring: &'q RingBuffer) -> Self {
        Self::with_handler(ring, PanicOnViolation)
    }
}

impl<'q, H: ViolationHandler> ClaimedAccess<'q, H> {
    /// Bind to an initialized ring, reporting violations to `handler`.
    pub fn with_handler(ring: &'q RingBuffer, handler: H) -> Self {
        let mut access = Self::seeded(ring, handler);
        if !ring.is_initialized() {
            access.report(Violation::Uninitialized);
        }
        access
    }

    pub fn try_with_handler(ring: &'q RingBuffer, handler: H) -> Result<Self, Violation> {
        if !ring.is_initialized() {
            return Err(Violation::Uninitialized);
        }
        Ok(Self::seeded(ring, handler))
    }

    fn seeded(ring: &'q RingBuffer, handler: H) -> Self {
        let access = Self {
            ring,
            next_write: ring.write_position(),
            next_read: ring.read_position(),
            outstanding_reads: 0,
            handler,
        };
        tracing::debug!(write = %access.next_write, read = %access.next_read, "claim layer bound");
        access
    }

    #[inline]
    pub fn ring(&self) -> &'q RingBuffer {
        self.ring
    }

    #[inline]
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Read claims that are neither completed nor canceled.
    #[inline]
    pub fn outstanding_reads(&self) -> usize {
        self.outstanding_reads
    }

    /// Write claims that are neither completed nor canceled.
    #[inline]
    pub fn outstanding_writes(&self) -> usize {
        self.ring.distance(self.ring.write_position(), self.next_write)
    }

    /// Nothing left to claim for reading.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.next_read == self.ring.write_position()
    }

    /// Nothing left to claim for writing.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.ring.capacity() == 0 || self.next_write.is_lap_ahead_of(self.ring.read_position())
    }

    /// Claim the next writeable slot, or `None` when every free slot is already claimed.
    ///
    /// Latches the ring's overflow flag to the outcome, like
    /// [`RingBuffer::get_writeable`].
    pub fn claim_write(&mut self) -> Option<NonNull<u8>> {
        let full = self.is_full();
        self.ring.set_overflow(full);
        if full {
            return None;
        }
        let slot = self.ring.slot(self.next_write)?;
        self.next_write = self.ring.next_position(self.next_write);
        self.trace("claim write");
        Some(slot)
    }

    /// Give back the most recent write claim. `slot`, when given, must be that claim.
    pub fn cancel_write(&mut self, slot: Option<NonNull<u8>>) {
        if let Err(violation) = self.try_cancel_write(slot) {
            self.report(violation);
        }
    }

    pub fn try_cancel_write(&mut self, slot: Option<NonNull<u8>>) -> Result<(), Violation> {
        if self.next_write == self.ring.write_position() {
            return Err(Violation::NothingToCancel(Side::Write));
        }
        let prev = self.ring.prev_position(self.next_write);
        check_slot(Side::Write, self.ring.slot(prev), slot)?;
        self.next_write = prev;
        self.trace("cancel write");
        Ok(())
    }

    /// Publish the oldest write claim. `slot`, when given, must be that claim.
    pub fn complete_write(&mut self, slot: Option<NonNull<u8>>) {
        if let Err(violation) = self.try_complete_write(slot) {
            self.report(violation);
        }
    }

    pub fn try_complete_write(&mut self, slot: Option<NonNull<u8>>) -> Result<(), Violation> {
        let committed = self.ring.write_position();
        if self.next_write == committed {
            return Err(Violation::NothingToComplete(Side::Write));
        }
        check_slot(Side::Write, self.ring.slot(committed), slot)?;
        if !self.ring.commit() {
            return Err(Violation::Refused(Side::Write));
        }
        self.trace("complete write");
        Ok(())
    }

    /// Claim the next unclaimed readable slot, or `None` when all data is claimed.
    pub fn claim_read(&mut self) -> Option<NonNull<u8>> {
        if self.is_empty() {
            return None;
        }
        let slot = self.ring.slot(self.next_read)?;
        self.next_read = self.ring.next_position(self.next_read);
        self.outstanding_reads += 1;
        self.trace("claim read");
        Some(slot)
    }

    /// Give back the most recent read claim; its element becomes claimable again.
    pub fn cancel_read(&mut self, slot: Option<NonNull<u8>>) {
        if let Err(violation) = self.try_cancel_read(slot) {
            self.report(violation);
        }
    }

    pub fn try_cancel_read(&mut self, slot: Option<NonNull<u8>>) -> Result<(), Violation> {
        if self.outstanding_reads == 0 {
            return Err(Violation::NothingToCancel(Side::Read));
        }
        let prev = self.ring.prev_position(self.next_read);
        check_slot(Side::Read, self.ring.slot(prev), slot)?;
        self.next_read = prev;
        self.outstanding_reads -= 1;
        self.trace("cancel read");
        Ok(())
    }

    /// Release the oldest read claim back to the writer.
    pub fn complete_read(&mut self, slot: Option<NonNull<u8>>) {
        if let Err(violation) = self.try_complete_read(slot) {
            self.report(violation);
        }
    }

    pub fn try_complete_read(&mut self, slot: Option<NonNull<u8>>) -> Result<(), Violation> {
        if self.outstanding_reads == 0 {
            return Err(Violation::NothingToComplete(Side::Read));
        }
        check_slot(Side::Read, self.ring.get_readable(), slot)?;
        if !self.ring.advance() {
            return Err(Violation::Refused(Side::Read));
        }
        self.outstanding_reads -= 1;
        self.trace("complete read");
        Ok(())
    }

    /// Complete every outstanding read claim, oldest first.
    pub fn complete_all_reads(&mut self) {
        if let Err(violation) = self.try_complete_all_reads() {
            self.report(violation);
        }
    }

    pub fn try_complete_all_reads(&mut self) -> Result<(), Violation> {
        for _ in 0..self.outstanding_reads {
            self.try_complete_read(None)?;
        }
        Ok(())
    }

    /// Cancel every outstanding read claim, newest first.
    pub fn cancel_all_reads(&mut self) {
        if let Err(violation) = self.try_cancel_all_reads() {
            self.report(violation);
        }
    }

    pub fn try_cancel_all_reads(&mut self) -> Result<(), Violation> {
        for _ in 0..self.outstanding_reads {
            self.try_cancel_read(None)?;
        }
        Ok(())
    }

    /// Claim a write slot, evicting the oldest unread element if the ring is full.
    ///
    /// An outstanding read claim on the oldest element is completed; otherwise that element is
    /// claimed and completed on the spot. Either way the caller loses it.
    ///
    /// # Panics
    /// If no slot can be produced, which only happens after a reported violation (a
    /// zero-capacity ring, or reads consumed behind this instance's back) that the handler
    /// chose to survive.
    pub fn wrapping_write(&mut self) -> NonNull<u8> {
        match self.try_wrapping_write() {
            Ok(slot) => slot,
            Err(violation) => {
                self.report(violation);
                panic!("no writeable slot after {violation}");
            }
        }
    }

    pub fn try_wrapping_write(&mut self) -> Result<NonNull<u8>, Violation> {
        if let Some(slot) = self.claim_write() {
            return Ok(slot);
        }
        let oldest = if self.outstanding_reads == 0 {
            self.claim_read()
        } else {
            None
        };
        self.try_complete_read(oldest)?;
        tracing::trace!("evicted oldest element");
        self.claim_write().ok_or(Violation::EvictionFailed)
    }

    fn report(&mut self, violation: Violation) {
        tracing::error!(%violation, "ring claim protocol violated");
        self.handler.on_violation(violation);
    }

    #[inline]
    fn trace(&self, op: &'static str) {
        tracing::trace!(
            op,
            read = %self.ring.read_position(),
            next_read = %self.next_read,
            write = %self.ring.write_position(),
            next_write = %self.next_write,
            outstanding_reads = self.outstanding_reads
        );
    }
}

fn check_slot(
    side: Side,
    expected: Option<NonNull<u8>>,
    given: Option<NonNull<u8>>,
) -> Result<(), Violation> {
    let Some(given) = given else {
        return Ok(());
    };
    if expected == Some(given) {
        return Ok(());
    }
    Err(Violation::SlotMismatch {
        side,
        expected: expected.map_or(0, |p| p.as_ptr() as usize),
        given: given.as_ptr() as usize,
    })
}

impl<H: ViolationHandler> fmt::Debug for ClaimedAccess<'_, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClaimedAccess")
            .field("ring", self.ring)
            .field("next_write", &self.next_write)
            .field("next_read", &self.next_read)
            .field("outstanding_reads", &self.outstanding_reads)
            .finish_non_exhaustive()
    }
}
