use arabica_core::{Diagnostic, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowDiagnosticKind {
    /// A local variable may be read before every path assigns it.
    UseBeforeAssignment,
    /// A final variable may be assigned more than once on some path.
    FinalReassignment,
    /// No execution path reaches the statement.
    UnreachableStatement,
    /// A declaration reuses a name already bound in an enclosing scope.
    DuplicateLocal,
}

#[derive(Debug, Clone, Copy)]
pub struct FlowConfig {
    /// Emit warnings for unreachable statements.
    pub report_unreachable: bool,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            report_unreachable: true,
        }
    }
}

pub(crate) fn diagnostic(
    kind: FlowDiagnosticKind,
    span: Option<Span>,
    message: String,
) -> Diagnostic {
    match kind {
        FlowDiagnosticKind::UseBeforeAssignment => {
            Diagnostic::error("FLOW_UNASSIGNED", message, span)
        }
        FlowDiagnosticKind::FinalReassignment => {
            Diagnostic::error("FLOW_FINAL_REASSIGNED", message, span)
        }
        FlowDiagnosticKind::UnreachableStatement => {
            Diagnostic::warning("FLOW_UNREACHABLE", message, span)
        }
        FlowDiagnosticKind::DuplicateLocal => {
            Diagnostic::error("FLOW_DUPLICATE_LOCAL", message, span)
        }
    }
}
