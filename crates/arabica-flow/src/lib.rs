//! Definite-assignment analysis for Arabica method bodies.
//!
//! The entry point is [`analyze`]: one pass over a lowered
//! [`Body`](arabica_hir::Body) that checks, per the Java rules,
//!
//! * that every local variable read is definitely assigned,
//! * that every write to a `final` local hits a definitely unassigned
//!   variable,
//! * that no local declaration shadows or duplicates another live one,
//! * and which statements are reachable at all.
//!
//! Findings come back as [`Diagnostic`](arabica_core::Diagnostic) values in
//! [`FlowAnalysisResult::diagnostics`]; malformed bodies (unbound locals,
//! jumps without a target) abort with a [`FlowError`] instead, since those
//! are lowering bugs rather than things to report against user code.

mod diagnostics;
mod merge;
mod slots;
mod state;
mod walk;

pub use diagnostics::{FlowConfig, FlowDiagnosticKind};
pub use slots::{Slot, SlotAllocator, SlotMark};
pub use state::{FlowState, LiveBits};
pub use walk::{analyze, Condition, FlowAnalysisResult, FlowError, JumpKind};
