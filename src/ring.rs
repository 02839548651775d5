//! Fixed-element-size SPSC circular queue over caller-owned memory.
//!
//! # Overview
//! - Single producer, single consumer, no allocation, no locks.
//! - Records are opaque byte chunks of `element_size` bytes.
//! - Bulk copy (`write`/`read`) or zero-copy access (`get_writeable` + `commit`,
//!   `get_readable` + `advance`).
//! - A full ring refuses writes; the refusal latches an overflow flag.
//!
//! # Memory ordering
//! The producer owns the write position and the overflow flag, the consumer owns the read
//! position. Each side publishes its own cursor with `Release` after touching the slot and loads
//! the other side's cursor with `Acquire`, so slot contents are visible before the cursor that
//! covers them.
//!
//! # Shared memory
//! `RingBuffer` is `repr(C)` and exactly [`RingBuffer::LAYOUT_SIZE`] bytes on 32- and 64-bit
//! targets. An all-zero `RingBuffer` is a valid, uninitialized ring: a second context can map the
//! same memory and poll [`RingBuffer::is_initialized`] until the owner has run `init`.

use core::fmt;
use core::ptr::{self, NonNull};

use crate::position::{AtomicPosition, MAX_CAPACITY_BYTES, Position};
use crate::sync::{AtomicBool, AtomicPtr, AtomicU16, AtomicU32, Ordering};

/// Marker stored by `init`. Zeroed memory reads as "not initialized".
const INITIALIZED: u16 = 0xC0DE;
const NOT_INITIALIZED: u16 = 0x0000;

const PTR_PAD: usize = 8 - core::mem::size_of::<*mut u8>();

/// Circular queue of `element_size`-byte records in caller-provided storage.
#[repr(C)]
pub struct RingBuffer {
    base: AtomicPtr<u8>,
    _ptr_pad: [u8; PTR_PAD],
    num_bytes: AtomicU32,
    elem_size: AtomicU32,
    read: AtomicPosition,
    write: AtomicPosition,
    overflow: AtomicBool,
    _pad: u8,
    init_status: AtomicU16,
    _reserved: u32,
}

const _: () = assert!(core::mem::size_of::<RingBuffer>() == RingBuffer::LAYOUT_SIZE);

impl RingBuffer {
    /// Size of the ring object in bytes, identical on every supported target.
    pub const LAYOUT_SIZE: usize = 32;

    /// A zeroed ring. Call [`RingBuffer::init`] before any other operation.
    pub const fn new() -> Self {
        Self {
            base: AtomicPtr::new(ptr::null_mut()),
            _ptr_pad: [0; PTR_PAD],
            num_bytes: AtomicU32::new(0),
            elem_size: AtomicU32::new(0),
            read: AtomicPosition::new(Position::START),
            write: AtomicPosition::new(Position::START),
            overflow: AtomicBool::new(false),
            _pad: 0,
            init_status: AtomicU16::new(NOT_INITIALIZED),
            _reserved: 0,
        }
    }

    /// Attach storage and reset the ring.
    ///
    /// Only one context may initialize a shared ring, and never while it is in use.
    ///
    /// # Panics
    /// If `element_size` is zero or the byte capacity exceeds [`MAX_CAPACITY_BYTES`].
    ///
    /// # Safety
    /// `storage` must be valid for reads and writes of `element_size * element_count` bytes for
    /// as long as the ring is used, and must not be accessed other than through this ring.
    pub unsafe fn init(&self, storage: *mut u8, element_size: usize, element_count: usize) {
        assert!(element_size > 0, "element size must be non-zero");
        let limit = MAX_CAPACITY_BYTES as usize;
        let num_bytes = element_size
            .checked_mul(element_count)
            .filter(|&n| n <= limit && element_size <= limit);
        let Some(num_bytes) = num_bytes else {
            panic!("ring capacity of {element_count} x {element_size} bytes is too large");
        };

        self.base.store(storage, Ordering::Relaxed);
        self.num_bytes.store(num_bytes as u32, Ordering::Relaxed);
        self.elem_size.store(element_size as u32, Ordering::Relaxed);
        self.clear();
        self.init_status.store(INITIALIZED, Ordering::Release);

        tracing::debug!(element_size, element_count, "ring initialized");
    }

    /// Safe `init` over a `'static` buffer, holding `storage.len() / element_size` elements.
    pub fn init_static(&self, storage: &'static mut [u8], element_size: usize) {
        assert!(element_size > 0, "element size must be non-zero");
        let element_count = storage.len() / element_size;
        // SAFETY: the buffer lives forever and the exclusive borrow is handed to the ring.
        unsafe { self.init(storage.as_mut_ptr(), element_size, element_count) }
    }

    /// For rings in memory another context may or may not have initialized yet.
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.init_status.load(Ordering::Acquire) == INITIALIZED
    }

    #[inline]
    pub fn element_size(&self) -> usize {
        self.elem_size() as usize
    }

    /// Maximum number of elements the ring holds.
    #[inline]
    pub fn capacity(&self) -> usize {
        match self.elem_size() {
            0 => 0,
            e => (self.num_bytes() / e) as usize,
        }
    }

    /// Drop all content and the overflow flag.
    ///
    /// Touches both cursors: call it only while neither side is using the ring.
    pub fn clear(&self) {
        self.read.store(Position::START, Ordering::Release);
        self.write.store(Position::START, Ordering::Release);
        self.overflow.store(false, Ordering::Release);
        tracing::debug!("ring cleared");
    }

    /// Copy whole records from `records` until it is exhausted or the ring is full.
    /// Returns the number of records written.
    ///
    /// Producer side. At most one context may run `write`, `get_writeable` or `commit` at a
    /// time; two concurrent producers would copy into the same slot.
    pub fn write(&self, records: &[u8]) -> usize {
        let elem = self.element_size();
        if elem == 0 {
            return 0;
        }
        let mut written = 0;
        for record in records.chunks_exact(elem) {
            let Some(slot) = self.get_writeable() else {
                break;
            };
            // SAFETY: `slot` points at `elem` free bytes inside the storage given to `init`.
            unsafe { ptr::copy_nonoverlapping(record.as_ptr(), slot.as_ptr(), elem) };
            let committed = self.commit();
            debug_assert!(committed, "slot handed out by get_writeable was refused");
            written += 1;
        }
        written
    }

    /// Copy records into `out` until it is full or the ring is empty.
    /// Returns the number of records read.
    ///
    /// Consumer side. At most one context may run `read`, `get_readable*`, `advance` or
    /// `flush` at a time.
    pub fn read(&self, out: &mut [u8]) -> usize {
        let elem = self.element_size();
        if elem == 0 {
            return 0;
        }
        let mut read = 0;
        for record in out.chunks_exact_mut(elem) {
            let Some(slot) = self.get_readable() else {
                break;
            };
            // SAFETY: `slot` points at `elem` committed bytes inside the storage given to `init`.
            unsafe { ptr::copy_nonoverlapping(slot.as_ptr(), record.as_mut_ptr(), elem) };
            let advanced = self.advance();
            debug_assert!(advanced, "slot handed out by get_readable was refused");
            read += 1;
        }
        read
    }

    /// Discard up to `max_count` unread elements.
    pub fn flush(&self, max_count: usize) {
        for _ in 0..max_count {
            if !self.advance() {
                break;
            }
        }
    }

    /// Slot for the next write, or `None` when full.
    ///
    /// Latches the overflow flag to whether the ring was full, so zero-copy producers get
    /// overflow detection too.
    pub fn get_writeable(&self) -> Option<NonNull<u8>> {
        let full = self.is_full();
        self.set_overflow(full);
        if full {
            return None;
        }
        self.slot(self.write_position())
    }

    /// Publish the slot returned by `get_writeable`. Fails when full.
    ///
    /// Finding the ring non-full clears the overflow flag, as `get_writeable` does.
    pub fn commit(&self) -> bool {
        if self.is_full() {
            return false;
        }
        self.set_overflow(false);
        let next = self.next_position(self.write_position());
        self.write.store(next, Ordering::Release);
        true
    }

    /// Oldest unread slot, or `None` when empty.
    #[inline]
    pub fn get_readable(&self) -> Option<NonNull<u8>> {
        if self.is_empty() {
            return None;
        }
        self.slot(self.read_position())
    }

    /// Unread slot `n` elements past the read position; same as after `n` advances.
    pub fn get_readable_offset(&self, n: usize) -> Option<NonNull<u8>> {
        if n >= self.used_count() {
            return None;
        }
        let num_bytes = self.num_bytes() as usize;
        let mut offset = n * self.element_size() + self.read_position().offset as usize;
        if offset >= num_bytes {
            offset -= num_bytes;
        }
        debug_assert!(offset < num_bytes);
        let base = NonNull::new(self.base.load(Ordering::Relaxed))?;
        // SAFETY: `offset` is inside the storage handed to `init`.
        Some(unsafe { base.add(offset) })
    }

    /// Release the oldest unread slot. Fails when empty.
    pub fn advance(&self) -> bool {
        if self.is_empty() {
            return false;
        }
        let next = self.next_position(self.read_position());
        self.read.store(next, Ordering::Release);
        true
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.read_position() == self.write_position()
    }

    /// Zero-capacity rings are always full (and empty).
    #[inline]
    pub fn is_full(&self) -> bool {
        self.num_bytes() == 0 || self.write_position().is_lap_ahead_of(self.read_position())
    }

    /// A write was refused and the ring is still full.
    #[inline]
    pub fn is_overflowed(&self) -> bool {
        self.overflow.load(Ordering::Acquire) && self.is_full()
    }

    #[inline]
    pub fn free_count(&self) -> usize {
        self.capacity() - self.used_count()
    }

    #[inline]
    pub fn used_count(&self) -> usize {
        self.distance(self.read_position(), self.write_position())
    }

    /// Number of elements `to` is ahead of `from`.
    pub(crate) fn distance(&self, from: Position, to: Position) -> usize {
        // equal offsets mean empty only when the wrap bits match too
        if from == to {
            return 0;
        }
        let num_bytes = self.num_bytes();

        let mut diff = to.offset.wrapping_sub(from.offset);
        // zero: full; past the end: write already wrapped
        if diff == 0 || diff >= num_bytes {
            diff = diff.wrapping_add(num_bytes);
        }
        match self.elem_size() {
            0 => 0,
            e => (diff / e) as usize,
        }
    }

    #[inline]
    pub fn read_position(&self) -> Position {
        self.read.load(Ordering::Acquire)
    }

    #[inline]
    pub fn write_position(&self) -> Position {
        self.write.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn next_position(&self, pos: Position) -> Position {
        pos.next(self.elem_size(), self.num_bytes())
    }

    #[inline]
    pub(crate) fn prev_position(&self, pos: Position) -> Position {
        pos.prev(self.elem_size(), self.num_bytes())
    }

    /// Address of the slot at `pos`.
    #[inline]
    pub(crate) fn slot(&self, pos: Position) -> Option<NonNull<u8>> {
        let base = NonNull::new(self.base.load(Ordering::Relaxed))?;
        // SAFETY: positions handed around by the ring stay below `num_bytes`.
        Some(unsafe { base.add(pos.offset as usize) })
    }

    #[inline]
    pub(crate) fn set_overflow(&self, overflow: bool) {
        if overflow && !self.overflow.load(Ordering::Relaxed) {
            tracing::warn!(used = self.used_count(), "ring full, write refused");
        }
        self.overflow.store(overflow, Ordering::Release);
    }

    #[inline]
    fn elem_size(&self) -> u32 {
        self.elem_size.load(Ordering::Relaxed)
    }

    #[inline]
    fn num_bytes(&self) -> u32 {
        self.num_bytes.load(Ordering::Relaxed)
    }
}

impl Default for RingBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RingBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingBuffer")
            .field("initialized", &self.is_initialized())
            .field("element_size", &self.element_size())
            .field("capacity", &self.capacity())
            .field("read", &self.read_position())
            .field("write", &self.write_position())
            .field("overflow", &self.overflow.load(Ordering::Relaxed))
            .finish()
    }
}
