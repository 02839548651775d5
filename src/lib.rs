//! Fixed-size circular queue primitives for no-std embedded targets.
//!
//! # Highlights
//! - SPSC circular queue of fixed-size records over caller-owned memory.
//! - No allocation, no locks, no dynamic dispatch.
//! - Fixed 32-byte `repr(C)` ring object, usable from shared memory between cores.
//! - Claim layer: reserve several slots ahead, then complete them in order or cancel the newest.
//! - Overwrite-oldest writes for producers that must never block.
//!
//! # Quick start
//! ```
//! use ph_ringbuffer::{ClaimedAccess, RingBuffer};
//!
//! static mut STORAGE: [u8; 4 * 8] = [0; 4 * 8];
//! static RING: RingBuffer = RingBuffer::new();
//!
//! // SAFETY: STORAGE is only ever touched through RING.
//! unsafe { RING.init((&raw mut STORAGE).cast::<u8>(), 4, 8) };
//!
//! assert_eq!(RING.write(&7u32.to_le_bytes()), 1);
//!
//! let mut consumer = ClaimedAccess::bind(&RING);
//! let slot = consumer.claim_read().unwrap();
//! let value = unsafe { slot.as_ptr().cast::<[u8; 4]>().read() };
//! assert_eq!(u32::from_le_bytes(value), 7);
//! consumer.complete_read(Some(slot));
//! assert!(RING.is_empty());
//! ```
//!
//! # No-std
//! The crate is `#![no_std]` by default. Tests require `std`.
//!
//! # Safety and concurrency
//! One producer context and one consumer context may use a ring at the same time. The ring does
//! not enforce this; the caller arranges it. `init` and `clear` must finish before either side
//! starts. A [`ClaimedAccess`] is single-threaded: bind one per side.
//!
//! # Semantics
//! - A full ring refuses writes and latches an overflow flag; `wrapping_write` evicts instead.
//! - Completing or canceling claims out of order is a [`Violation`], fatal by default.
#![no_std]

pub mod claim;
pub mod position;
pub mod ring;
mod sync;
pub mod violation;

pub use claim::ClaimedAccess;
pub use position::Position;
pub use ring::RingBuffer;
pub use violation::{PanicOnViolation, Side, Violation, ViolationHandler};

#[cfg(test)]
extern crate std;
