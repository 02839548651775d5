//! Atomic backend selection.
//!
//! With the `portable-atomic` feature the ring uses `portable_atomic` types, which keep the
//! size and alignment of their `core` counterparts, so the shared-memory layout does not change.

#[cfg(feature = "portable-atomic")]
pub(crate) use portable_atomic::{AtomicBool, AtomicPtr, AtomicU16, AtomicU32, Ordering};

#[cfg(not(feature = "portable-atomic"))]
pub(crate) use core::sync::atomic::{AtomicBool, AtomicPtr, AtomicU16, AtomicU32, Ordering};
