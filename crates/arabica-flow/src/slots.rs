//! Variable slot allocation.
//!
//! Every local variable in scope owns a dense index into the flow
//! bit-vectors. Slots are handed out in declaration order and recycled when
//! the owning scope closes, so sibling scopes share indices and the tracked
//! window stays as narrow as the deepest live nesting.

use std::fmt;

/// Index of a tracked variable in the flow bit-vectors.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Slot(u32);

impl Slot {
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Slot(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Slot({})", self.0)
    }
}

/// Watermark taken before a scope opens; releasing it frees every slot
/// allocated since.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotMark(u32);

impl SlotMark {
    /// Number of slots live when the mark was taken, which is also the first
    /// slot index releasing the mark frees.
    #[must_use]
    pub const fn slot_count(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Default)]
pub struct SlotAllocator {
    next: u32,
}

impl SlotAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self) -> Slot {
        let slot = Slot(self.next);
        self.next += 1;
        slot
    }

    #[must_use]
    pub fn mark(&self) -> SlotMark {
        SlotMark(self.next)
    }

    pub fn release(&mut self, mark: SlotMark) {
        debug_assert!(mark.0 <= self.next, "released a mark from a closed scope");
        self.next = mark.0;
    }

    #[must_use]
    pub fn live_slots(&self) -> u32 {
        self.next
    }
}
