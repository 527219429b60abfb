//! Per-point definite-assignment facts.
//!
//! A [`FlowState`] records, for every live variable slot, whether the
//! variable is definitely assigned (DA) and whether it is definitely
//! unassigned (DU) when execution reaches a program point. Both planes are
//! needed: DA guards reads, DU guards writes to blank finals, and on any
//! path a slot can satisfy at most one of the two.
//!
//! Unreachable points use a dedicated `Dead` variant that answers `true` to
//! every query. That is exactly the identity the merge operators need, and it
//! is what makes checking inside dead code silent: no read is "unassigned"
//! and no write is "already assigned" on a path that cannot execute.

use std::fmt;

use crate::slots::Slot;

pub(crate) const WORD_BITS: u32 = u64::BITS;

/// Definite-assignment facts at one program point.
///
/// `Dead` marks a point no execution reaches. `diagnosed` records whether the
/// surrounding dead region has already produced an unreachable-statement
/// diagnostic: it is `false` at the jump that killed the flow and flips to
/// `true` at the first statement reported, which limits reporting to one
/// diagnostic per contiguous dead region.
#[derive(Clone, PartialEq, Eq)]
pub enum FlowState {
    Live(LiveBits),
    Dead { diagnosed: bool },
}

impl FlowState {
    /// Live state with no facts: nothing assigned, nothing unassigned.
    #[must_use]
    pub fn new() -> FlowState {
        FlowState::Live(LiveBits::default())
    }

    /// Unreachable state that has not yet been diagnosed.
    #[must_use]
    pub fn dead_end() -> FlowState {
        FlowState::Dead { diagnosed: false }
    }

    #[must_use]
    pub fn is_dead_end(&self) -> bool {
        matches!(self, FlowState::Dead { .. })
    }

    /// True for a dead end whose region has not been reported yet.
    #[must_use]
    pub fn is_unreported_dead_end(&self) -> bool {
        matches!(self, FlowState::Dead { diagnosed: false })
    }

    /// Marks the dead region as reported; identity on live states.
    #[must_use]
    pub fn reported(self) -> FlowState {
        match self {
            FlowState::Dead { .. } => FlowState::Dead { diagnosed: true },
            live => live,
        }
    }

    /// Is the variable definitely assigned here?
    #[must_use]
    pub fn assigned(&self, slot: Slot) -> bool {
        match self {
            FlowState::Live(bits) => bits.bit(Plane::Da, slot.raw()),
            FlowState::Dead { .. } => true,
        }
    }

    /// Is the variable definitely unassigned here?
    #[must_use]
    pub fn unassigned(&self, slot: Slot) -> bool {
        match self {
            FlowState::Live(bits) => bits.bit(Plane::Du, slot.raw()),
            FlowState::Dead { .. } => true,
        }
    }

    /// Records an assignment: definitely assigned, no longer definitely
    /// unassigned. No-op on dead states.
    pub fn mark_assigned(&mut self, slot: Slot) {
        if let FlowState::Live(bits) = self {
            bits.set_bit(Plane::Da, slot.raw());
            bits.clear_bit(Plane::Du, slot.raw());
        }
    }

    /// Records a fresh declaration: definitely unassigned, not assigned.
    /// No-op on dead states.
    pub fn mark_unassigned(&mut self, slot: Slot) {
        if let FlowState::Live(bits) = self {
            bits.set_bit(Plane::Du, slot.raw());
            bits.clear_bit(Plane::Da, slot.raw());
        }
    }

    /// Drops both facts for the slot. No-op on dead states.
    pub fn clear(&mut self, slot: Slot) {
        if let FlowState::Live(bits) = self {
            bits.clear_bit(Plane::Da, slot.raw());
            bits.clear_bit(Plane::Du, slot.raw());
        }
    }

    /// Zeroes every fact at slot indices `>= first_removed`, so recycled
    /// slots start clean in whatever scope claims them next. No-op on dead
    /// states.
    pub fn remove_slots_from(&mut self, first_removed: u32) {
        if let FlowState::Live(bits) = self {
            bits.remove_from(first_removed);
        }
    }

    /// One past the highest slot index with any fact recorded, or
    /// `u32::MAX` for dead states, which claim every fact.
    #[must_use]
    pub fn slot_limit(&self) -> u32 {
        match self {
            FlowState::Live(bits) => bits.limit(),
            FlowState::Dead { .. } => u32::MAX,
        }
    }
}

impl Default for FlowState {
    fn default() -> Self {
        FlowState::new()
    }
}

impl fmt::Debug for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowState::Dead { diagnosed: false } => write!(f, "Dead"),
            FlowState::Dead { diagnosed: true } => write!(f, "Dead(diagnosed)"),
            FlowState::Live(bits) => f
                .debug_struct("Live")
                .field("da", &SetSlots(bits, Plane::Da))
                .field("du", &SetSlots(bits, Plane::Du))
                .finish(),
        }
    }
}

struct SetSlots<'a>(&'a LiveBits, Plane);

impl fmt::Debug for SetSlots<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries((0..self.0.limit()).filter(|&slot| self.0.bit(self.1, slot)))
            .finish()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum Plane {
    Da,
    Du,
}

/// Bit storage for a live state.
///
/// Slots below 64 live in the inline `da`/`du` words. Higher slots spill into
/// `ext`, which holds a (DA word, DU word) pair per additional 64-slot
/// stride: slot `i` maps to pair `i / 64 - 1`. The vector grows on demand and
/// missing words read as zero, so equality and the merge operators treat
/// short and zero-padded storage identically.
#[derive(Clone, Default)]
pub struct LiveBits {
    pub(crate) da: u64,
    pub(crate) du: u64,
    pub(crate) ext: Vec<u64>,
}

impl LiveBits {
    pub(crate) fn bit(&self, plane: Plane, slot: u32) -> bool {
        if slot < WORD_BITS {
            let word = match plane {
                Plane::Da => self.da,
                Plane::Du => self.du,
            };
            word & bit_mask(slot) != 0
        } else {
            self.ext
                .get(ext_index(plane, slot))
                .is_some_and(|word| word & bit_mask(slot) != 0)
        }
    }

    pub(crate) fn set_bit(&mut self, plane: Plane, slot: u32) {
        if slot < WORD_BITS {
            match plane {
                Plane::Da => self.da |= bit_mask(slot),
                Plane::Du => self.du |= bit_mask(slot),
            }
        } else {
            let idx = ext_index(plane, slot);
            let pair_end = (idx | 1) + 1;
            if self.ext.len() < pair_end {
                self.ext.resize(pair_end, 0);
            }
            self.ext[idx] |= bit_mask(slot);
        }
    }

    pub(crate) fn clear_bit(&mut self, plane: Plane, slot: u32) {
        if slot < WORD_BITS {
            match plane {
                Plane::Da => self.da &= !bit_mask(slot),
                Plane::Du => self.du &= !bit_mask(slot),
            }
        } else if let Some(word) = self.ext.get_mut(ext_index(plane, slot)) {
            *word &= !bit_mask(slot);
        }
    }

    pub(crate) fn remove_from(&mut self, first_removed: u32) {
        if first_removed == 0 {
            self.da = 0;
            self.du = 0;
            self.ext.clear();
            return;
        }
        if first_removed < WORD_BITS {
            let keep = low_mask(first_removed);
            self.da &= keep;
            self.du &= keep;
            self.ext.clear();
            return;
        }
        let stride = (first_removed / WORD_BITS) as usize;
        let bit = first_removed % WORD_BITS;
        // Pairs strictly below the boundary stride survive untouched.
        let full_words = (stride - 1) * 2;
        if bit == 0 {
            self.ext.truncate(full_words);
        } else if self.ext.len() > full_words {
            let keep = low_mask(bit);
            if let Some(word) = self.ext.get_mut(full_words) {
                *word &= keep;
            }
            if let Some(word) = self.ext.get_mut(full_words + 1) {
                *word &= keep;
            }
            self.ext.truncate(full_words + 2);
        }
    }

    pub(crate) fn limit(&self) -> u32 {
        for pair in (0..self.ext.len() / 2).rev() {
            let da = self.ext[pair * 2];
            let du = self.ext.get(pair * 2 + 1).copied().unwrap_or(0);
            let merged = da | du;
            if merged != 0 {
                return (pair as u32 + 1) * WORD_BITS + (WORD_BITS - merged.leading_zeros());
            }
        }
        let merged = self.da | self.du;
        WORD_BITS - merged.leading_zeros()
    }
}

// Storage lengths differ after growth; compare with zero extension so states
// with identical facts are equal regardless of history.
impl PartialEq for LiveBits {
    fn eq(&self, other: &Self) -> bool {
        if self.da != other.da || self.du != other.du {
            return false;
        }
        let words = self.ext.len().max(other.ext.len());
        (0..words).all(|i| {
            self.ext.get(i).copied().unwrap_or(0) == other.ext.get(i).copied().unwrap_or(0)
        })
    }
}

impl Eq for LiveBits {}

fn bit_mask(slot: u32) -> u64 {
    1u64 << (slot % WORD_BITS)
}

fn ext_index(plane: Plane, slot: u32) -> usize {
    let pair = (slot / WORD_BITS - 1) as usize;
    match plane {
        Plane::Da => pair * 2,
        Plane::Du => pair * 2 + 1,
    }
}

fn low_mask(bits: u32) -> u64 {
    debug_assert!(bits >= 1 && bits <= WORD_BITS);
    !0u64 >> (WORD_BITS - bits)
}
