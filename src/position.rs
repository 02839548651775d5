//! Ring positions: a byte offset plus a wrap bit.
//!
//! Two positions with the same offset but a different wrap bit are distinct; that difference is
//! what separates a full ring from an empty one when the read and write offsets coincide.

use core::fmt;

use crate::sync::{AtomicU32, Ordering};

/// Largest byte capacity a ring may have. The offset shares a `u32` with the wrap bit.
pub const MAX_CAPACITY_BYTES: u32 = u32::MAX >> 1;

/// A read or write cursor inside a ring.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Position {
    /// Byte offset from the start of the storage, always a multiple of the element size.
    pub offset: u32,
    /// Toggles every time `offset` wraps back to zero.
    pub wrap: bool,
}

impl Position {
    pub const START: Position = Position {
        offset: 0,
        wrap: false,
    };

    #[inline]
    pub const fn new(offset: u32, wrap: bool) -> Self {
        Self { offset, wrap }
    }

    /// Step one element forward, wrapping to the start of a `num_bytes` ring.
    #[inline]
    pub const fn next(self, elem_size: u32, num_bytes: u32) -> Self {
        let offset = self.offset + elem_size;
        if offset >= num_bytes {
            Self {
                offset: 0,
                wrap: !self.wrap,
            }
        } else {
            Self {
                offset,
                wrap: self.wrap,
            }
        }
    }

    /// Step one element back. Inverse of [`Position::next`].
    #[inline]
    pub const fn prev(self, elem_size: u32, num_bytes: u32) -> Self {
        if self.offset < elem_size {
            Self {
                offset: num_bytes.saturating_sub(elem_size),
                wrap: !self.wrap,
            }
        } else {
            Self {
                offset: self.offset - elem_size,
                wrap: self.wrap,
            }
        }
    }

    /// True when `self` (a write cursor) sits exactly one lap ahead of `read`.
    #[inline]
    pub const fn is_lap_ahead_of(self, read: Position) -> bool {
        self.offset == read.offset && self.wrap != read.wrap
    }

    #[inline]
    const fn pack(self) -> u32 {
        (self.offset << 1) | self.wrap as u32
    }

    #[inline]
    const fn unpack(raw: u32) -> Self {
        Self {
            offset: raw >> 1,
            wrap: raw & 1 == 1,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.offset, u8::from(self.wrap))
    }
}

/// A [`Position`] published as a single atomic word.
#[repr(transparent)]
pub(crate) struct AtomicPosition(AtomicU32);

impl AtomicPosition {
    pub(crate) const fn new(pos: Position) -> Self {
        Self(AtomicU32::new(pos.pack()))
    }

    #[inline]
    pub(crate) fn load(&self, order: Ordering) -> Position {
        Position::unpack(self.0.load(order))
    }

    #[inline]
    pub(crate) fn store(&self, pos: Position, order: Ordering) {
        self.0.store(pos.pack(), order);
    }
}
