//! Definite-assignment walker.
//!
//! One recursive pass over a [`Body`] in Java evaluation order. Every
//! statement visit consumes the state flowing in and returns the state after
//! the statement; branching constructs hand each arm its own copy and join
//! the arm results. Loops are walked once: the condition sees the loop entry
//! state and back-edge states are discarded, which is sound for definite
//! assignment because facts only ever grow along a path, and deliberately
//! imprecise for definite unassignment across iterations.

use std::fmt;
use std::mem;

use arabica_core::{Diagnostic, Span};
use arabica_hir::{
    BinaryOp, Body, CatchClause, ExprId, ExprKind, LocalId, StmtId, StmtKind, SwitchCase, UnaryOp,
};
use thiserror::Error;

use crate::diagnostics::{diagnostic, FlowConfig, FlowDiagnosticKind};
use crate::slots::{Slot, SlotAllocator, SlotMark};
use crate::state::FlowState;

/// Everything one body analysis produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowAnalysisResult {
    /// State at the body's normal exit; dead when no path completes normally.
    pub exit: FlowState,
    /// Indexed by statement id: whether analysis reached the statement.
    pub reachable: Vec<bool>,
    pub diagnostics: Vec<Diagnostic>,
}

impl FlowAnalysisResult {
    #[must_use]
    pub fn completes_normally(&self) -> bool {
        !self.exit.is_dead_end()
    }
}

/// Structural defects that abort analysis.
///
/// These point at lowering bugs, not user errors: a well-formed body never
/// triggers them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    #[error("local `{name}` has no declaration in scope")]
    UnboundLocal { name: String, span: Span },
    #[error("`{kind}` has no matching enclosing statement")]
    UnresolvedJump {
        kind: JumpKind,
        label: Option<String>,
        span: Span,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpKind {
    Break,
    Continue,
}

impl fmt::Display for JumpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JumpKind::Break => "break",
            JumpKind::Continue => "continue",
        })
    }
}

/// Paired states produced by checking an expression for its boolean value.
#[derive(Debug, Clone)]
pub struct Condition {
    pub when_true: FlowState,
    pub when_false: FlowState,
}

/// Runs definite-assignment and reachability checking over one body.
pub fn analyze(body: &Body, config: FlowConfig) -> Result<FlowAnalysisResult, FlowError> {
    let _span = tracing::debug_span!("definite_assignment", locals = body.locals().len()).entered();
    let mut checker = FlowChecker::new(body, config);
    let exit = checker.run()?;
    tracing::debug!(
        diagnostics = checker.diagnostics.len(),
        completes_normally = !exit.is_dead_end(),
        "definite assignment finished"
    );
    Ok(FlowAnalysisResult {
        exit,
        reachable: checker.reachable,
        diagnostics: checker.diagnostics,
    })
}

/// Collects the states flowing into `break`/`continue` targets of one
/// breakable statement. Loops own their labels: `a: b: while (..)` puts both
/// labels on the loop's frame so `continue a` resolves.
struct ExitFrame {
    kind: ExitKind,
    labels: Vec<String>,
    on_break: FlowState,
    on_continue: FlowState,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ExitKind {
    Loop,
    Switch,
    Labeled,
}

impl ExitFrame {
    fn new(kind: ExitKind, labels: Vec<String>) -> Self {
        ExitFrame {
            kind,
            labels,
            on_break: FlowState::dead_end(),
            on_continue: FlowState::dead_end(),
        }
    }
}

/// One open declaration scope: the slot watermark to rewind to and the
/// locals declared here, whose slot bindings end with the scope.
struct ScopeFrame {
    mark: SlotMark,
    declared: Vec<LocalId>,
}

struct FlowChecker<'a> {
    body: &'a Body,
    config: FlowConfig,
    slots: SlotAllocator,
    /// Current slot per local; `None` outside the local's scope.
    slot_of: Vec<Option<Slot>>,
    scopes: Vec<ScopeFrame>,
    exits: Vec<ExitFrame>,
    reachable: Vec<bool>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> FlowChecker<'a> {
    fn new(body: &'a Body, config: FlowConfig) -> Self {
        FlowChecker {
            body,
            config,
            slots: SlotAllocator::new(),
            slot_of: vec![None; body.locals().len()],
            scopes: Vec::new(),
            exits: Vec::new(),
            reachable: vec![false; body.stmts.len()],
            diagnostics: Vec::new(),
        }
    }

    fn run(&mut self) -> Result<FlowState, FlowError> {
        let mut state = FlowState::new();
        self.push_scope();
        for &param in self.body.params() {
            let slot = self.declare(param);
            state.mark_assigned(slot);
        }
        let exit = self.check_stmt(self.body.root(), state)?;
        Ok(self.pop_scope(exit))
    }

    // === Statements ===

    fn check_stmt(&mut self, stmt: StmtId, state: FlowState) -> Result<FlowState, FlowError> {
        let state = self.check_reach(stmt, state);
        let stmt_data = self.body.stmt(stmt);
        match &stmt_data.kind {
            StmtKind::Block(statements) => {
                self.push_scope();
                let mut state = state;
                for &statement in statements {
                    state = self.check_stmt(statement, state)?;
                }
                Ok(self.pop_scope(state))
            }
            StmtKind::Let { local, initializer } => self.check_let(*local, *initializer, state),
            StmtKind::Expr(expr) => self.check_expr(*expr, state),
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let cond = self.check_condition(*condition, state)?;
                let after_then = self.check_stmt(*then_branch, cond.when_true)?;
                let after_else = match else_branch {
                    Some(else_branch) => self.check_stmt(*else_branch, cond.when_false)?,
                    None => cond.when_false,
                };
                Ok(after_then.join(&after_else))
            }
            StmtKind::While { condition, body } => {
                self.check_while(*condition, *body, Vec::new(), state)
            }
            StmtKind::DoWhile { body, condition } => {
                self.check_do_while(*body, *condition, Vec::new(), state)
            }
            StmtKind::For {
                init,
                condition,
                update,
                body,
            } => self.check_for(init, *condition, update, *body, Vec::new(), state),
            StmtKind::ForEach {
                local,
                iterable,
                body,
            } => self.check_for_each(*local, *iterable, *body, Vec::new(), state),
            StmtKind::Labeled { label, body } => self.check_labeled(label, *body, state),
            StmtKind::Switch { selector, cases } => self.check_switch(*selector, cases, state),
            StmtKind::Try {
                body,
                catches,
                finally,
            } => self.check_try(*body, catches, *finally, state),
            StmtKind::Synchronized { lock, body } => {
                let state = self.check_expr(*lock, state)?;
                self.check_stmt(*body, state)
            }
            StmtKind::Return(expr) => {
                if let Some(expr) = expr {
                    self.check_expr(*expr, state)?;
                }
                Ok(FlowState::dead_end())
            }
            StmtKind::Throw(exception) => {
                self.check_expr(*exception, state)?;
                Ok(FlowState::dead_end())
            }
            StmtKind::Break { label } => self.check_break(stmt_data.span, label.as_deref(), state),
            StmtKind::Continue { label } => {
                self.check_continue(stmt_data.span, label.as_deref(), state)
            }
            StmtKind::Empty => Ok(state),
        }
    }

    /// Reports the first statement of a dead region and records per-statement
    /// reachability for downstream consumers.
    fn check_reach(&mut self, stmt: StmtId, state: FlowState) -> FlowState {
        self.reachable[stmt.index()] = !state.is_dead_end();
        if state.is_unreported_dead_end() && self.config.report_unreachable {
            let span = Some(self.body.stmt(stmt).span);
            self.report(
                FlowDiagnosticKind::UnreachableStatement,
                span,
                "unreachable statement".to_string(),
            );
            return state.reported();
        }
        state
    }

    fn check_let(
        &mut self,
        local: LocalId,
        initializer: Option<ExprId>,
        mut state: FlowState,
    ) -> Result<FlowState, FlowError> {
        let slot = self.declare(local);
        // The local is in scope (and unassigned) inside its own initializer,
        // so `int x = x;` reads an unassigned variable.
        state.mark_unassigned(slot);
        match initializer {
            None => Ok(state),
            Some(initializer) => {
                let mut state = self.check_expr(initializer, state)?;
                state.mark_assigned(slot);
                Ok(state)
            }
        }
    }

    fn check_while(
        &mut self,
        condition: ExprId,
        body: StmtId,
        labels: Vec<String>,
        state: FlowState,
    ) -> Result<FlowState, FlowError> {
        let cond = self.check_condition(condition, state)?;
        self.exits.push(ExitFrame::new(ExitKind::Loop, labels));
        let body_result = self.check_stmt(body, cond.when_true);
        let frame = self.pop_exit();
        // Body fall-through and continues feed the back edge only.
        body_result?;
        Ok(cond.when_false.join(&frame.on_break))
    }

    fn check_do_while(
        &mut self,
        body: StmtId,
        condition: ExprId,
        labels: Vec<String>,
        state: FlowState,
    ) -> Result<FlowState, FlowError> {
        self.exits.push(ExitFrame::new(ExitKind::Loop, labels));
        let body_result = self.check_stmt(body, state);
        let frame = self.pop_exit();
        // The body runs at least once; continues re-test the condition.
        let after_body = body_result?.join(&frame.on_continue);
        let cond = self.check_condition(condition, after_body)?;
        Ok(cond.when_false.join(&frame.on_break))
    }

    fn check_for(
        &mut self,
        init: &[StmtId],
        condition: Option<ExprId>,
        update: &[ExprId],
        body: StmtId,
        labels: Vec<String>,
        state: FlowState,
    ) -> Result<FlowState, FlowError> {
        self.push_scope();
        let mut state = state;
        for &statement in init {
            state = self.check_stmt(statement, state)?;
        }
        let cond = match condition {
            Some(condition) => self.check_condition(condition, state)?,
            // A missing condition is the constant `true`.
            None => Condition {
                when_true: state,
                when_false: FlowState::dead_end(),
            },
        };
        self.exits.push(ExitFrame::new(ExitKind::Loop, labels));
        let body_result = self.check_stmt(body, cond.when_true);
        let frame = self.pop_exit();
        // Updates run on the back edge, after body fall-through or continue;
        // they are checked for their own errors and the state is discarded.
        let mut back_edge = body_result?.join(&frame.on_continue);
        for &update_expr in update {
            back_edge = self.check_expr(update_expr, back_edge)?;
        }
        let after = cond.when_false.join(&frame.on_break);
        Ok(self.pop_scope(after))
    }

    fn check_for_each(
        &mut self,
        local: LocalId,
        iterable: ExprId,
        body: StmtId,
        labels: Vec<String>,
        state: FlowState,
    ) -> Result<FlowState, FlowError> {
        let state = self.check_expr(iterable, state)?;
        self.push_scope();
        let slot = self.declare(local);
        let mut loop_entry = state.clone();
        loop_entry.mark_assigned(slot);
        self.exits.push(ExitFrame::new(ExitKind::Loop, labels));
        let body_result = self.check_stmt(body, loop_entry);
        let frame = self.pop_exit();
        body_result?;
        // The iteration may run zero times, so the pre-loop facts reach the
        // exit unchanged.
        let after = state.join(&frame.on_break);
        Ok(self.pop_scope(after))
    }

    fn check_labeled(
        &mut self,
        label: &str,
        body: StmtId,
        state: FlowState,
    ) -> Result<FlowState, FlowError> {
        let mut labels = vec![label.to_owned()];
        let mut target = body;
        // Collapse `a: b: stmt` so every label names the same statement.
        while let StmtKind::Labeled { label, body } = &self.body.stmt(target).kind {
            self.reachable[target.index()] = !state.is_dead_end();
            labels.push(label.clone());
            target = *body;
        }
        self.reachable[target.index()] = !state.is_dead_end();
        let target_data = self.body.stmt(target);
        match &target_data.kind {
            // A label on a loop names the loop, so `continue label` works.
            StmtKind::While { condition, body } => {
                self.check_while(*condition, *body, labels, state)
            }
            StmtKind::DoWhile { body, condition } => {
                self.check_do_while(*body, *condition, labels, state)
            }
            StmtKind::For {
                init,
                condition,
                update,
                body,
            } => self.check_for(init, *condition, update, *body, labels, state),
            StmtKind::ForEach {
                local,
                iterable,
                body,
            } => self.check_for_each(*local, *iterable, *body, labels, state),
            _ => {
                self.exits.push(ExitFrame::new(ExitKind::Labeled, labels));
                let body_result = self.check_stmt(target, state);
                let frame = self.pop_exit();
                Ok(body_result?.join(&frame.on_break))
            }
        }
    }

    fn check_switch(
        &mut self,
        selector: ExprId,
        cases: &[SwitchCase],
        state: FlowState,
    ) -> Result<FlowState, FlowError> {
        let selector_state = self.check_expr(selector, state)?;
        // Case groups share one scope: a local declared under `case 0` is in
        // scope (though not assigned) under every later group.
        self.push_scope();
        self.exits.push(ExitFrame::new(ExitKind::Switch, Vec::new()));
        let mut fall_through = FlowState::dead_end();
        let mut has_default = false;
        for case in cases {
            has_default |= case.is_default;
            let mut case_state = selector_state.clone().join(&fall_through);
            for &statement in &case.stmts {
                case_state = self.check_stmt(statement, case_state)?;
            }
            fall_through = case_state;
        }
        let frame = self.pop_exit();
        let mut after = fall_through.join(&frame.on_break);
        if !has_default {
            // The selector may match no case at all.
            after = after.join(&selector_state);
        }
        Ok(self.pop_scope(after))
    }

    fn check_try(
        &mut self,
        body: StmtId,
        catches: &[CatchClause],
        finally: Option<StmtId>,
        entry: FlowState,
    ) -> Result<FlowState, FlowError> {
        let body_exit = self.check_stmt(body, entry.clone())?;
        let mut merged = body_exit.clone();
        for catch in catches {
            // The exception may have flown from any point in the body, so DA
            // is pessimistic (try-entry facts only) while DU must honor every
            // assignment the body could have made before throwing.
            let mut catch_entry = entry.clone().with_du_from(&body_exit);
            self.push_scope();
            let slot = self.declare(catch.param);
            catch_entry.mark_assigned(slot);
            let catch_exit = self.check_stmt(catch.body, catch_entry)?;
            let catch_exit = self.pop_scope(catch_exit);
            merged = merged.join(&catch_exit);
        }
        match finally {
            None => Ok(merged),
            Some(finally) => {
                // The finally block runs from any point inside the try
                // statement and therefore sees only the entry facts.
                let finally_exit = self.check_stmt(finally, entry)?;
                Ok(merged.then_finally(&finally_exit))
            }
        }
    }

    fn check_break(
        &mut self,
        span: Span,
        label: Option<&str>,
        state: FlowState,
    ) -> Result<FlowState, FlowError> {
        let Some(index) = self.break_target(label) else {
            return Err(FlowError::UnresolvedJump {
                kind: JumpKind::Break,
                label: label.map(str::to_owned),
                span,
            });
        };
        let frame = &mut self.exits[index];
        let merged = mem::replace(&mut frame.on_break, FlowState::dead_end()).join(&state);
        frame.on_break = merged;
        Ok(FlowState::dead_end())
    }

    fn check_continue(
        &mut self,
        span: Span,
        label: Option<&str>,
        state: FlowState,
    ) -> Result<FlowState, FlowError> {
        let Some(index) = self.continue_target(label) else {
            return Err(FlowError::UnresolvedJump {
                kind: JumpKind::Continue,
                label: label.map(str::to_owned),
                span,
            });
        };
        let frame = &mut self.exits[index];
        let merged = mem::replace(&mut frame.on_continue, FlowState::dead_end()).join(&state);
        frame.on_continue = merged;
        Ok(FlowState::dead_end())
    }

    fn break_target(&self, label: Option<&str>) -> Option<usize> {
        match label {
            None => self
                .exits
                .iter()
                .rposition(|frame| matches!(frame.kind, ExitKind::Loop | ExitKind::Switch)),
            Some(name) => self
                .exits
                .iter()
                .rposition(|frame| frame.labels.iter().any(|label| label == name)),
        }
    }

    fn continue_target(&self, label: Option<&str>) -> Option<usize> {
        match label {
            None => self
                .exits
                .iter()
                .rposition(|frame| frame.kind == ExitKind::Loop),
            Some(name) => self.exits.iter().rposition(|frame| {
                frame.kind == ExitKind::Loop && frame.labels.iter().any(|label| label == name)
            }),
        }
    }

    // === Expressions ===

    fn check_expr(&mut self, expr: ExprId, state: FlowState) -> Result<FlowState, FlowError> {
        let expr_data = self.body.expr(expr);
        match &expr_data.kind {
            ExprKind::Local(local) => self.check_local_read(*local, expr_data.span, state),
            ExprKind::Int(_)
            | ExprKind::Bool(_)
            | ExprKind::String(_)
            | ExprKind::Null
            | ExprKind::Invalid => Ok(state),
            ExprKind::Unary { op, expr: operand } => match op {
                UnaryOp::PreInc | UnaryOp::PreDec | UnaryOp::PostInc | UnaryOp::PostDec => {
                    self.check_inc_dec(*operand, state)
                }
                UnaryOp::Not | UnaryOp::Neg | UnaryOp::BitNot => self.check_expr(*operand, state),
            },
            // Short-circuit operators assign conditionally even in value
            // position, so route through the condition form and join.
            ExprKind::Binary {
                op: BinaryOp::AndAnd | BinaryOp::OrOr,
                ..
            }
            | ExprKind::Conditional { .. } => {
                let cond = self.check_condition(expr, state)?;
                Ok(cond.when_true.join(&cond.when_false))
            }
            ExprKind::Binary { lhs, rhs, .. } => {
                let state = self.check_expr(*lhs, state)?;
                self.check_expr(*rhs, state)
            }
            ExprKind::Assign { target, op, value } => {
                self.check_assign(*target, *op, *value, state)
            }
            ExprKind::FieldAccess { receiver, .. } => self.check_expr(*receiver, state),
            ExprKind::ArrayAccess { array, index } => {
                let state = self.check_expr(*array, state)?;
                self.check_expr(*index, state)
            }
            ExprKind::Call { callee, args, .. } => {
                let mut state = self.check_expr(*callee, state)?;
                for &arg in args {
                    state = self.check_expr(arg, state)?;
                }
                Ok(state)
            }
            ExprKind::New { args } => {
                let mut state = state;
                for &arg in args {
                    state = self.check_expr(arg, state)?;
                }
                Ok(state)
            }
            ExprKind::Cast(inner) | ExprKind::InstanceOf(inner) => self.check_expr(*inner, state),
        }
    }

    /// Checks an expression for its boolean value, producing separate states
    /// for the true and false outcomes. Constant conditions kill the arm
    /// that cannot be taken.
    fn check_condition(&mut self, expr: ExprId, state: FlowState) -> Result<Condition, FlowError> {
        let expr_data = self.body.expr(expr);
        match &expr_data.kind {
            ExprKind::Bool(true) => Ok(Condition {
                when_true: state,
                when_false: FlowState::dead_end(),
            }),
            ExprKind::Bool(false) => Ok(Condition {
                when_true: FlowState::dead_end(),
                when_false: state,
            }),
            ExprKind::Unary {
                op: UnaryOp::Not,
                expr: operand,
            } => {
                let cond = self.check_condition(*operand, state)?;
                Ok(Condition {
                    when_true: cond.when_false,
                    when_false: cond.when_true,
                })
            }
            ExprKind::Binary {
                op: BinaryOp::AndAnd,
                lhs,
                rhs,
            } => {
                // The right operand only runs when the left was true.
                let lhs_cond = self.check_condition(*lhs, state)?;
                let rhs_cond = self.check_condition(*rhs, lhs_cond.when_true)?;
                Ok(Condition {
                    when_true: rhs_cond.when_true,
                    when_false: lhs_cond.when_false.join(&rhs_cond.when_false),
                })
            }
            ExprKind::Binary {
                op: BinaryOp::OrOr,
                lhs,
                rhs,
            } => {
                let lhs_cond = self.check_condition(*lhs, state)?;
                let rhs_cond = self.check_condition(*rhs, lhs_cond.when_false)?;
                Ok(Condition {
                    when_true: lhs_cond.when_true.join(&rhs_cond.when_true),
                    when_false: rhs_cond.when_false,
                })
            }
            ExprKind::Conditional {
                condition,
                then_expr,
                else_expr,
            } => {
                let cond = self.check_condition(*condition, state)?;
                let then_cond = self.check_condition(*then_expr, cond.when_true)?;
                let else_cond = self.check_condition(*else_expr, cond.when_false)?;
                Ok(Condition {
                    when_true: then_cond.when_true.join(&else_cond.when_true),
                    when_false: then_cond.when_false.join(&else_cond.when_false),
                })
            }
            _ => {
                let after = self.check_expr(expr, state)?;
                Ok(Condition {
                    when_true: after.clone(),
                    when_false: after,
                })
            }
        }
    }

    fn check_local_read(
        &mut self,
        local: LocalId,
        span: Span,
        mut state: FlowState,
    ) -> Result<FlowState, FlowError> {
        let slot = self.slot(local)?;
        if !state.assigned(slot) {
            let name = &self.body.locals[local].name;
            let message = format!("variable `{name}` may not have been initialized");
            self.report(FlowDiagnosticKind::UseBeforeAssignment, Some(span), message);
            // Pretend it was assigned so one broken variable reports once.
            state.mark_assigned(slot);
        }
        Ok(state)
    }

    fn check_assign(
        &mut self,
        target: ExprId,
        op: Option<BinaryOp>,
        value: ExprId,
        state: FlowState,
    ) -> Result<FlowState, FlowError> {
        let target_data = self.body.expr(target);
        let local = match &target_data.kind {
            ExprKind::Local(local) => *local,
            // Field and array stores evaluate their subexpressions left to
            // right and track no assignment facts.
            _ => {
                let state = self.check_expr(target, state)?;
                return self.check_expr(value, state);
            }
        };
        let slot = self.slot(local)?;
        let local_data = &self.body.locals[local];
        let mut state = state;
        // Whether this write can still be a blank final's first assignment.
        // For a compound assignment the question is settled before the right
        // side runs; a simple assignment lets the right side assign first.
        let first_write_before_value = state.unassigned(slot);
        if op.is_some() {
            // Compound assignment reads the target before writing it.
            if !state.assigned(slot) {
                let message = format!(
                    "variable `{}` may not have been initialized",
                    local_data.name
                );
                self.report(
                    FlowDiagnosticKind::UseBeforeAssignment,
                    Some(target_data.span),
                    message,
                );
            }
            state.mark_assigned(slot);
        }
        let mut state = self.check_expr(value, state)?;
        let first_write = if op.is_some() {
            first_write_before_value
        } else {
            state.unassigned(slot)
        };
        if local_data.is_final && !first_write {
            let message = format!(
                "final variable `{}` may already have been assigned",
                local_data.name
            );
            self.report(
                FlowDiagnosticKind::FinalReassignment,
                Some(target_data.span),
                message,
            );
        }
        state.mark_assigned(slot);
        Ok(state)
    }

    fn check_inc_dec(
        &mut self,
        operand: ExprId,
        state: FlowState,
    ) -> Result<FlowState, FlowError> {
        let operand_data = self.body.expr(operand);
        let local = match &operand_data.kind {
            ExprKind::Local(local) => *local,
            _ => return self.check_expr(operand, state),
        };
        let slot = self.slot(local)?;
        let local_data = &self.body.locals[local];
        let mut state = state;
        if !state.assigned(slot) {
            let message = format!(
                "variable `{}` may not have been initialized",
                local_data.name
            );
            self.report(
                FlowDiagnosticKind::UseBeforeAssignment,
                Some(operand_data.span),
                message,
            );
        }
        if local_data.is_final && !state.unassigned(slot) {
            let message = format!(
                "final variable `{}` may already have been assigned",
                local_data.name
            );
            self.report(
                FlowDiagnosticKind::FinalReassignment,
                Some(operand_data.span),
                message,
            );
        }
        state.mark_assigned(slot);
        Ok(state)
    }

    // === Scopes and slots ===

    fn push_scope(&mut self) {
        self.scopes.push(ScopeFrame {
            mark: self.slots.mark(),
            declared: Vec::new(),
        });
    }

    /// Closes the top scope: forgets its locals' slot bindings, zeroes their
    /// facts out of the state, and recycles the slot indices.
    fn pop_scope(&mut self, mut state: FlowState) -> FlowState {
        let Some(frame) = self.scopes.pop() else {
            return state;
        };
        for local in frame.declared {
            self.slot_of[local.index()] = None;
        }
        state.remove_slots_from(frame.mark.slot_count());
        self.slots.release(frame.mark);
        state
    }

    fn declare(&mut self, local: LocalId) -> Slot {
        let data = &self.body.locals[local];
        if self.lookup_declared(&data.name).is_some() {
            let message = format!("variable `{}` is already defined in this scope", data.name);
            self.report(
                FlowDiagnosticKind::DuplicateLocal,
                Some(data.name_span),
                message,
            );
        }
        let slot = self.slots.alloc();
        self.slot_of[local.index()] = Some(slot);
        if let Some(frame) = self.scopes.last_mut() {
            frame.declared.push(local);
        }
        slot
    }

    /// Finds a live declaration with this name in any open scope. Java
    /// forbids shadowing one local with another, so the whole stack counts.
    fn lookup_declared(&self, name: &str) -> Option<LocalId> {
        self.scopes
            .iter()
            .rev()
            .flat_map(|frame| frame.declared.iter().rev())
            .copied()
            .find(|&local| self.body.locals[local].name == name)
    }

    fn slot(&self, local: LocalId) -> Result<Slot, FlowError> {
        let data = &self.body.locals[local];
        self.slot_of[local.index()].ok_or_else(|| FlowError::UnboundLocal {
            name: data.name.clone(),
            span: data.name_span,
        })
    }

    fn pop_exit(&mut self) -> ExitFrame {
        match self.exits.pop() {
            Some(frame) => frame,
            None => unreachable!("exit frames are pushed and popped by the same check"),
        }
    }

    fn report(&mut self, kind: FlowDiagnosticKind, span: Option<Span>, message: String) {
        tracing::trace!(?kind, ?span, %message, "flow diagnostic");
        self.diagnostics.push(diagnostic(kind, span, message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arabica_hir::body::{BodyBuilder, ExprKind, LocalKind, StmtKind};

    fn count_kind(diags: &[Diagnostic], code: &str) -> usize {
        diags.iter().filter(|d| d.code == code).count()
    }

    #[test]
    fn definite_assignment_if_else() {
        // int x;
        // if (cond) { x = 1; } else { x = 2; }
        // use(x);
        let mut b = BodyBuilder::new();
        let cond_local = b.param("cond");
        let use_fn = b.param("sink");
        let x = b.local("x", LocalKind::Local);

        let decl_x = b.stmt(StmtKind::Let {
            local: x,
            initializer: None,
        });

        let cond_expr = b.expr(ExprKind::Local(cond_local));

        let then_target = b.expr(ExprKind::Local(x));
        let one = b.expr(ExprKind::Int(1));
        let assign_then = b.expr(ExprKind::Assign {
            target: then_target,
            op: None,
            value: one,
        });
        let then_stmt = b.stmt(StmtKind::Expr(assign_then));
        let then_block = b.stmt(StmtKind::Block(vec![then_stmt]));

        let else_target = b.expr(ExprKind::Local(x));
        let two = b.expr(ExprKind::Int(2));
        let assign_else = b.expr(ExprKind::Assign {
            target: else_target,
            op: None,
            value: two,
        });
        let else_stmt = b.stmt(StmtKind::Expr(assign_else));
        let else_block = b.stmt(StmtKind::Block(vec![else_stmt]));

        let if_stmt = b.stmt(StmtKind::If {
            condition: cond_expr,
            then_branch: then_block,
            else_branch: Some(else_block),
        });

        let use_callee = b.expr(ExprKind::Local(use_fn));
        let x_use = b.expr(ExprKind::Local(x));
        let use_call = b.expr(ExprKind::Call {
            callee: use_callee,
            name: "accept".into(),
            args: vec![x_use],
        });
        let use_stmt = b.stmt(StmtKind::Expr(use_call));

        let root = b.stmt(StmtKind::Block(vec![decl_x, if_stmt, use_stmt]));
        let body = b.finish(root);

        let result = analyze(&body, FlowConfig::default()).unwrap();
        assert_eq!(count_kind(&result.diagnostics, "FLOW_UNASSIGNED"), 0);
        assert!(result.completes_normally());
    }

    #[test]
    fn unreachable_after_return() {
        // return;
        // x = 1; // unreachable
        let mut b = BodyBuilder::new();
        let x = b.local("x", LocalKind::Local);

        let decl_x = b.stmt(StmtKind::Let {
            local: x,
            initializer: None,
        });
        let ret = b.stmt(StmtKind::Return(None));
        let target = b.expr(ExprKind::Local(x));
        let one = b.expr(ExprKind::Int(1));
        let assign = b.expr(ExprKind::Assign {
            target,
            op: None,
            value: one,
        });
        let assign_stmt = b.stmt(StmtKind::Expr(assign));

        let root = b.stmt(StmtKind::Block(vec![decl_x, ret, assign_stmt]));
        let body = b.finish(root);

        let result = analyze(&body, FlowConfig::default()).unwrap();
        assert_eq!(count_kind(&result.diagnostics, "FLOW_UNREACHABLE"), 1);
        assert!(!result.completes_normally());
        assert!(!result.reachable[assign_stmt.index()]);
        assert!(result.reachable[ret.index()]);
    }

    #[test]
    fn empty_body_completes_with_no_facts() {
        let mut b = BodyBuilder::new();
        let root = b.stmt(StmtKind::Block(vec![]));
        let body = b.finish(root);

        let result = analyze(&body, FlowConfig::default()).unwrap();
        assert!(result.diagnostics.is_empty());
        assert_eq!(result.exit, FlowState::new());
    }
}
