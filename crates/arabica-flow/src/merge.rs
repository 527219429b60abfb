//! Merge operators for flow states.
//!
//! Where control flow reconverges, the facts that survive are those that held
//! on every incoming path, so [`FlowState::join`] is a pointwise AND with
//! dead operands as identity. Try statements need two further shapes: a
//! finally block runs *after* whatever part of the try ran, which calls for
//! sequential composition rather than a join, and a catch block entry mixes
//! facts taken from two different program points.

use crate::state::{FlowState, LiveBits};

impl FlowState {
    /// Pointwise AND of both fact planes.
    ///
    /// A dead operand is the identity: control never arrives from that side,
    /// so the other side's facts pass through unchanged. Joining two dead
    /// ends stays dead, and the result counts as diagnosed if either side
    /// was, so a region reported once is not re-reported after its dead
    /// branches reconverge.
    #[must_use]
    pub fn join(self, other: &FlowState) -> FlowState {
        match (self, other) {
            (FlowState::Dead { diagnosed: a }, FlowState::Dead { diagnosed: b }) => {
                FlowState::Dead { diagnosed: a || *b }
            }
            (FlowState::Dead { .. }, live) => live.clone(),
            (live, FlowState::Dead { .. }) => live,
            (FlowState::Live(mut a), FlowState::Live(b)) => {
                a.join_with(b);
                FlowState::Live(a)
            }
        }
    }

    /// State after `self` completes and `finalizer` then runs to completion.
    ///
    /// Assignments accumulate: a variable assigned in either part is
    /// assigned after both, so DA is the union. Definite unassignment must
    /// survive both parts and is canceled by anything the finalizer assigns,
    /// so DU is the intersection minus the finalizer's DA. If the finalizer
    /// cannot complete normally, neither can the whole construct; if `self`
    /// is already dead the finalizer changes nothing about that.
    #[must_use]
    pub fn then_finally(self, finalizer: &FlowState) -> FlowState {
        match (self, finalizer) {
            (_, FlowState::Dead { diagnosed }) => FlowState::Dead {
                diagnosed: *diagnosed,
            },
            (dead @ FlowState::Dead { .. }, FlowState::Live(_)) => dead,
            (FlowState::Live(mut a), FlowState::Live(b)) => {
                a.then_finally_with(b);
                FlowState::Live(a)
            }
        }
    }

    /// Keeps `self`'s DA facts but adopts the DU facts of `du_source`.
    ///
    /// Catch-clause entry is pessimistic about how much of the try body ran:
    /// nothing beyond the try-entry facts may be assumed assigned. Blank
    /// final tracking goes the other way: every assignment the body could
    /// have made must cancel definite unassignment, so DU comes from the
    /// body's exit. A dead `du_source` carries no assignments and leaves
    /// `self` unchanged.
    #[must_use]
    pub fn with_du_from(self, du_source: &FlowState) -> FlowState {
        match (self, du_source) {
            (dead @ FlowState::Dead { .. }, _) => dead,
            (live, FlowState::Dead { .. }) => live,
            (FlowState::Live(mut a), FlowState::Live(b)) => {
                a.replace_du_with(b);
                FlowState::Live(a)
            }
        }
    }
}

impl LiveBits {
    fn join_with(&mut self, other: &LiveBits) {
        self.da &= other.da;
        self.du &= other.du;
        // Words the other side never grew are zero, so the AND is zero.
        let shared = self.ext.len().min(other.ext.len());
        for (word, other_word) in self.ext.iter_mut().zip(&other.ext[..shared]) {
            *word &= other_word;
        }
        self.ext.truncate(shared);
    }

    fn then_finally_with(&mut self, finalizer: &LiveBits) {
        if self.ext.len() < finalizer.ext.len() {
            self.ext.resize(finalizer.ext.len(), 0);
        }
        self.da |= finalizer.da;
        self.du = self.du & finalizer.du & !finalizer.da;
        for pair in 0..self.ext.len() / 2 {
            let fin_da = finalizer.ext.get(pair * 2).copied().unwrap_or(0);
            let fin_du = finalizer.ext.get(pair * 2 + 1).copied().unwrap_or(0);
            self.ext[pair * 2] |= fin_da;
            self.ext[pair * 2 + 1] = self.ext[pair * 2 + 1] & fin_du & !fin_da;
        }
    }

    fn replace_du_with(&mut self, du_source: &LiveBits) {
        if self.ext.len() < du_source.ext.len() {
            self.ext.resize(du_source.ext.len(), 0);
        }
        self.du = du_source.du;
        for pair in 0..self.ext.len() / 2 {
            self.ext[pair * 2 + 1] = du_source.ext.get(pair * 2 + 1).copied().unwrap_or(0);
        }
    }
}
