use arabica_core::Diagnostic;
use arabica_flow::{analyze, FlowAnalysisResult, FlowConfig, FlowError, JumpKind};
use arabica_hir::{
    BinaryOp, BodyBuilder, CatchClause, ExprKind, LocalId, LocalKind, StmtId, StmtKind, SwitchCase,
    UnaryOp,
};

fn run(b: BodyBuilder, root: StmtId) -> FlowAnalysisResult {
    let body = b.finish(root);
    analyze(&body, FlowConfig::default()).expect("well-formed body")
}

fn count_kind(diags: &[Diagnostic], code: &str) -> usize {
    diags.iter().filter(|d| d.code == code).count()
}

fn declare(b: &mut BodyBuilder, local: LocalId) -> StmtId {
    b.stmt(StmtKind::Let {
        local,
        initializer: None,
    })
}

fn declare_init(b: &mut BodyBuilder, local: LocalId, value: i64) -> StmtId {
    let value = b.expr(ExprKind::Int(value));
    b.stmt(StmtKind::Let {
        local,
        initializer: Some(value),
    })
}

fn assign(b: &mut BodyBuilder, local: LocalId, value: i64) -> StmtId {
    let target = b.expr(ExprKind::Local(local));
    let value = b.expr(ExprKind::Int(value));
    let assign = b.expr(ExprKind::Assign {
        target,
        op: None,
        value,
    });
    b.stmt(StmtKind::Expr(assign))
}

fn read(b: &mut BodyBuilder, local: LocalId) -> StmtId {
    let callee = b.expr(ExprKind::Local(local));
    let call = b.expr(ExprKind::Call {
        callee,
        name: "toString".into(),
        args: vec![],
    });
    b.stmt(StmtKind::Expr(call))
}

#[test]
fn shadowing_an_outer_local_is_reported() {
    // int x;
    // { int x; }
    let mut b = BodyBuilder::new();
    let outer = b.local("x", LocalKind::Local);
    let inner = b.local("x", LocalKind::Local);
    let outer_decl = declare(&mut b, outer);
    let inner_decl = declare(&mut b, inner);
    let inner_block = b.stmt(StmtKind::Block(vec![inner_decl]));
    let root = b.stmt(StmtKind::Block(vec![outer_decl, inner_block]));

    let result = run(b, root);
    assert_eq!(count_kind(&result.diagnostics, "FLOW_DUPLICATE_LOCAL"), 1);
}

#[test]
fn duplicate_declaration_in_one_scope_is_reported() {
    // int x;
    // int x;
    let mut b = BodyBuilder::new();
    let first = b.local("x", LocalKind::Local);
    let second = b.local("x", LocalKind::Local);
    let first_decl = declare(&mut b, first);
    let second_decl = declare(&mut b, second);
    let root = b.stmt(StmtKind::Block(vec![first_decl, second_decl]));
    let body = b.finish(root);

    let result = analyze(&body, FlowConfig::default()).expect("well-formed body");
    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(result.diagnostics[0].code, "FLOW_DUPLICATE_LOCAL");
    // The second declaration is the one at fault.
    assert_eq!(result.diagnostics[0].span, Some(body.local(second).name_span));
}

#[test]
fn sibling_scopes_may_reuse_a_name() {
    // { int x; }
    // { int x; }
    let mut b = BodyBuilder::new();
    let first = b.local("x", LocalKind::Local);
    let second = b.local("x", LocalKind::Local);
    let first_decl = declare(&mut b, first);
    let first_block = b.stmt(StmtKind::Block(vec![first_decl]));
    let second_decl = declare(&mut b, second);
    let second_block = b.stmt(StmtKind::Block(vec![second_decl]));
    let root = b.stmt(StmtKind::Block(vec![first_block, second_block]));

    let result = run(b, root);
    assert!(result.diagnostics.is_empty());
}

#[test]
fn a_local_may_not_shadow_a_parameter() {
    // void m(int p) { int p; }
    let mut b = BodyBuilder::new();
    let _p = b.param("p");
    let shadow = b.local("p", LocalKind::Local);
    let decl = declare(&mut b, shadow);
    let root = b.stmt(StmtKind::Block(vec![decl]));

    let result = run(b, root);
    assert_eq!(count_kind(&result.diagnostics, "FLOW_DUPLICATE_LOCAL"), 1);
}

#[test]
fn slot_recycling_does_not_leak_facts() {
    // { int x = 1; }
    // int y;
    // y.toString();
    //
    // y reuses x's slot; the assignment fact must not travel with it.
    let mut b = BodyBuilder::new();
    let x = b.local("x", LocalKind::Local);
    let y = b.local("y", LocalKind::Local);
    let x_decl = declare_init(&mut b, x, 1);
    let x_block = b.stmt(StmtKind::Block(vec![x_decl]));
    let y_decl = declare(&mut b, y);
    let use_y = read(&mut b, y);
    let root = b.stmt(StmtKind::Block(vec![x_block, y_decl, use_y]));

    let result = run(b, root);
    assert_eq!(count_kind(&result.diagnostics, "FLOW_UNASSIGNED"), 1);
}

#[test]
fn labeled_break_joins_assignments_at_the_label() {
    // int x;
    // outer: { if (c) { x = 1; break outer; } x = 2; }
    // x.toString();
    let mut b = BodyBuilder::new();
    let c = b.param("c");
    let x = b.local("x", LocalKind::Local);
    let decl = declare(&mut b, x);
    let cond = b.expr(ExprKind::Local(c));
    let then_assign = assign(&mut b, x, 1);
    let brk = b.stmt(StmtKind::Break {
        label: Some("outer".into()),
    });
    let then_block = b.stmt(StmtKind::Block(vec![then_assign, brk]));
    let if_stmt = b.stmt(StmtKind::If {
        condition: cond,
        then_branch: then_block,
        else_branch: None,
    });
    let tail_assign = assign(&mut b, x, 2);
    let labeled_body = b.stmt(StmtKind::Block(vec![if_stmt, tail_assign]));
    let labeled = b.stmt(StmtKind::Labeled {
        label: "outer".into(),
        body: labeled_body,
    });
    let use_x = read(&mut b, x);
    let root = b.stmt(StmtKind::Block(vec![decl, labeled, use_x]));

    let result = run(b, root);
    assert!(result.diagnostics.is_empty());
}

#[test]
fn labeled_break_with_a_partial_assignment_is_caught() {
    // int x;
    // outer: { if (c) { break outer; } x = 2; }
    // x.toString();
    let mut b = BodyBuilder::new();
    let c = b.param("c");
    let x = b.local("x", LocalKind::Local);
    let decl = declare(&mut b, x);
    let cond = b.expr(ExprKind::Local(c));
    let brk = b.stmt(StmtKind::Break {
        label: Some("outer".into()),
    });
    let then_block = b.stmt(StmtKind::Block(vec![brk]));
    let if_stmt = b.stmt(StmtKind::If {
        condition: cond,
        then_branch: then_block,
        else_branch: None,
    });
    let tail_assign = assign(&mut b, x, 2);
    let labeled_body = b.stmt(StmtKind::Block(vec![if_stmt, tail_assign]));
    let labeled = b.stmt(StmtKind::Labeled {
        label: "outer".into(),
        body: labeled_body,
    });
    let use_x = read(&mut b, x);
    let root = b.stmt(StmtKind::Block(vec![decl, labeled, use_x]));

    let result = run(b, root);
    assert_eq!(count_kind(&result.diagnostics, "FLOW_UNASSIGNED"), 1);
}

#[test]
fn switch_cases_join_with_the_fall_through() {
    // int x;
    // switch (c) { case 0: x = 2; default: x.toString(); }
    //
    // The default group is reachable both by falling through (x assigned)
    // and by matching no earlier case (x unassigned).
    let mut b = BodyBuilder::new();
    let c = b.param("c");
    let x = b.local("x", LocalKind::Local);
    let decl = declare(&mut b, x);
    let selector = b.expr(ExprKind::Local(c));
    let case_assign = assign(&mut b, x, 2);
    let default_read = read(&mut b, x);
    let switch_stmt = b.stmt(StmtKind::Switch {
        selector,
        cases: vec![
            SwitchCase {
                is_default: false,
                stmts: vec![case_assign],
            },
            SwitchCase {
                is_default: true,
                stmts: vec![default_read],
            },
        ],
    });
    let root = b.stmt(StmtKind::Block(vec![decl, switch_stmt]));

    let result = run(b, root);
    assert_eq!(count_kind(&result.diagnostics, "FLOW_UNASSIGNED"), 1);
}

#[test]
fn switch_assigning_on_every_path_is_definite() {
    // int x;
    // switch (c) { case 0: x = 1; break; default: x = 2; }
    // x.toString();
    let mut b = BodyBuilder::new();
    let c = b.param("c");
    let x = b.local("x", LocalKind::Local);
    let decl = declare(&mut b, x);
    let selector = b.expr(ExprKind::Local(c));
    let case_assign = assign(&mut b, x, 1);
    let brk = b.stmt(StmtKind::Break { label: None });
    let default_assign = assign(&mut b, x, 2);
    let switch_stmt = b.stmt(StmtKind::Switch {
        selector,
        cases: vec![
            SwitchCase {
                is_default: false,
                stmts: vec![case_assign, brk],
            },
            SwitchCase {
                is_default: true,
                stmts: vec![default_assign],
            },
        ],
    });
    let use_x = read(&mut b, x);
    let root = b.stmt(StmtKind::Block(vec![decl, switch_stmt, use_x]));

    let result = run(b, root);
    assert!(result.diagnostics.is_empty());
}

#[test]
fn switch_without_default_may_skip_every_case() {
    // int x;
    // switch (c) { case 0: x = 1; break; }
    // x.toString();
    let mut b = BodyBuilder::new();
    let c = b.param("c");
    let x = b.local("x", LocalKind::Local);
    let decl = declare(&mut b, x);
    let selector = b.expr(ExprKind::Local(c));
    let case_assign = assign(&mut b, x, 1);
    let brk = b.stmt(StmtKind::Break { label: None });
    let switch_stmt = b.stmt(StmtKind::Switch {
        selector,
        cases: vec![SwitchCase {
            is_default: false,
            stmts: vec![case_assign, brk],
        }],
    });
    let use_x = read(&mut b, x);
    let root = b.stmt(StmtKind::Block(vec![decl, switch_stmt, use_x]));

    let result = run(b, root);
    assert_eq!(count_kind(&result.diagnostics, "FLOW_UNASSIGNED"), 1);
}

#[test]
fn break_inside_a_switch_targets_the_switch() {
    // while (c) { switch (c) { default: break; } c.toString(); }
    let mut b = BodyBuilder::new();
    let c = b.param("c");
    let selector = b.expr(ExprKind::Local(c));
    let brk = b.stmt(StmtKind::Break { label: None });
    let switch_stmt = b.stmt(StmtKind::Switch {
        selector,
        cases: vec![SwitchCase {
            is_default: true,
            stmts: vec![brk],
        }],
    });
    let after_switch = read(&mut b, c);
    let loop_body = b.stmt(StmtKind::Block(vec![switch_stmt, after_switch]));
    let cond = b.expr(ExprKind::Local(c));
    let loop_stmt = b.stmt(StmtKind::While {
        condition: cond,
        body: loop_body,
    });
    let root = b.stmt(StmtKind::Block(vec![loop_stmt]));

    let result = run(b, root);
    assert!(result.diagnostics.is_empty());
    // The statement after the switch still runs on every iteration.
    assert!(result.reachable[after_switch.index()]);
}

#[test]
fn continue_skips_the_rest_of_the_iteration() {
    // int x;
    // while (c) { if (d) { continue; } x = 1; }
    let mut b = BodyBuilder::new();
    let c = b.param("c");
    let d = b.param("d");
    let x = b.local("x", LocalKind::Local);
    let decl = declare(&mut b, x);
    let inner_cond = b.expr(ExprKind::Local(d));
    let cont = b.stmt(StmtKind::Continue { label: None });
    let then_block = b.stmt(StmtKind::Block(vec![cont]));
    let if_stmt = b.stmt(StmtKind::If {
        condition: inner_cond,
        then_branch: then_block,
        else_branch: None,
    });
    let tail_assign = assign(&mut b, x, 1);
    let loop_body = b.stmt(StmtKind::Block(vec![if_stmt, tail_assign]));
    let cond = b.expr(ExprKind::Local(c));
    let loop_stmt = b.stmt(StmtKind::While {
        condition: cond,
        body: loop_body,
    });
    let root = b.stmt(StmtKind::Block(vec![decl, loop_stmt]));

    let result = run(b, root);
    assert!(result.diagnostics.is_empty());
    assert!(result.reachable[tail_assign.index()]);
}

#[test]
fn stacked_labels_name_the_same_loop() {
    // a: b: while (c) { if (d) { continue a; } break b; }
    let mut b = BodyBuilder::new();
    let c = b.param("c");
    let d = b.param("d");
    let inner_cond = b.expr(ExprKind::Local(d));
    let cont = b.stmt(StmtKind::Continue {
        label: Some("a".into()),
    });
    let then_block = b.stmt(StmtKind::Block(vec![cont]));
    let if_stmt = b.stmt(StmtKind::If {
        condition: inner_cond,
        then_branch: then_block,
        else_branch: None,
    });
    let brk = b.stmt(StmtKind::Break {
        label: Some("b".into()),
    });
    let loop_body = b.stmt(StmtKind::Block(vec![if_stmt, brk]));
    let cond = b.expr(ExprKind::Local(c));
    let loop_stmt = b.stmt(StmtKind::While {
        condition: cond,
        body: loop_body,
    });
    let labeled_b = b.stmt(StmtKind::Labeled {
        label: "b".into(),
        body: loop_stmt,
    });
    let labeled_a = b.stmt(StmtKind::Labeled {
        label: "a".into(),
        body: labeled_b,
    });
    let root = b.stmt(StmtKind::Block(vec![labeled_a]));

    let result = run(b, root);
    assert!(result.diagnostics.is_empty());
    assert!(result.reachable[loop_stmt.index()]);
}

#[test]
fn break_without_a_target_is_a_structural_error() {
    let mut b = BodyBuilder::new();
    let brk = b.stmt(StmtKind::Break { label: None });
    let root = b.stmt(StmtKind::Block(vec![brk]));
    let body = b.finish(root);

    let err = analyze(&body, FlowConfig::default()).unwrap_err();
    assert!(matches!(
        err,
        FlowError::UnresolvedJump {
            kind: JumpKind::Break,
            label: None,
            ..
        }
    ));
    assert_eq!(err.to_string(), "`break` has no matching enclosing statement");
}

#[test]
fn continue_cannot_target_a_labeled_block() {
    // outer: { continue outer; }
    let mut b = BodyBuilder::new();
    let cont = b.stmt(StmtKind::Continue {
        label: Some("outer".into()),
    });
    let block = b.stmt(StmtKind::Block(vec![cont]));
    let labeled = b.stmt(StmtKind::Labeled {
        label: "outer".into(),
        body: block,
    });
    let root = b.stmt(StmtKind::Block(vec![labeled]));
    let body = b.finish(root);

    let err = analyze(&body, FlowConfig::default()).unwrap_err();
    assert!(matches!(
        err,
        FlowError::UnresolvedJump {
            kind: JumpKind::Continue,
            ..
        }
    ));
}

#[test]
fn a_jump_to_an_unknown_label_is_a_structural_error() {
    // while (c) { break missing; }
    let mut b = BodyBuilder::new();
    let c = b.param("c");
    let cond = b.expr(ExprKind::Local(c));
    let brk = b.stmt(StmtKind::Break {
        label: Some("missing".into()),
    });
    let loop_body = b.stmt(StmtKind::Block(vec![brk]));
    let loop_stmt = b.stmt(StmtKind::While {
        condition: cond,
        body: loop_body,
    });
    let root = b.stmt(StmtKind::Block(vec![loop_stmt]));
    let body = b.finish(root);

    let err = analyze(&body, FlowConfig::default()).unwrap_err();
    assert!(matches!(
        err,
        FlowError::UnresolvedJump {
            kind: JumpKind::Break,
            label: Some(ref label),
            ..
        } if label == "missing"
    ));
}

#[test]
fn catch_parameters_live_in_their_own_scope() {
    // try { } catch (Exception e) { e.toString(); } catch (Error e) { e.toString(); }
    let mut b = BodyBuilder::new();
    let e1 = b.local("e", LocalKind::Param);
    let e2 = b.local("e", LocalKind::Param);
    let try_body = b.stmt(StmtKind::Block(vec![]));
    let first_read = read(&mut b, e1);
    let first_body = b.stmt(StmtKind::Block(vec![first_read]));
    let second_read = read(&mut b, e2);
    let second_body = b.stmt(StmtKind::Block(vec![second_read]));
    let try_stmt = b.stmt(StmtKind::Try {
        body: try_body,
        catches: vec![
            CatchClause {
                param: e1,
                body: first_body,
            },
            CatchClause {
                param: e2,
                body: second_body,
            },
        ],
        finally: None,
    });
    let root = b.stmt(StmtKind::Block(vec![try_stmt]));

    let result = run(b, root);
    assert!(result.diagnostics.is_empty());
}

#[test]
fn a_catch_parameter_may_not_shadow_a_local() {
    // int e;
    // try { } catch (Exception e) { }
    let mut b = BodyBuilder::new();
    let outer = b.local("e", LocalKind::Local);
    let param = b.local("e", LocalKind::Param);
    let decl = declare(&mut b, outer);
    let try_body = b.stmt(StmtKind::Block(vec![]));
    let catch_body = b.stmt(StmtKind::Block(vec![]));
    let try_stmt = b.stmt(StmtKind::Try {
        body: try_body,
        catches: vec![CatchClause {
            param,
            body: catch_body,
        }],
        finally: None,
    });
    let root = b.stmt(StmtKind::Block(vec![decl, try_stmt]));

    let result = run(b, root);
    assert_eq!(count_kind(&result.diagnostics, "FLOW_DUPLICATE_LOCAL"), 1);
}

#[test]
fn for_header_locals_are_scoped_to_the_loop() {
    // for (int i = 0; c; ) { }
    // int i;
    let mut b = BodyBuilder::new();
    let c = b.param("c");
    let header = b.local("i", LocalKind::Local);
    let again = b.local("i", LocalKind::Local);
    let init = declare_init(&mut b, header, 0);
    let cond = b.expr(ExprKind::Local(c));
    let loop_body = b.stmt(StmtKind::Block(vec![]));
    let for_stmt = b.stmt(StmtKind::For {
        init: vec![init],
        condition: Some(cond),
        update: vec![],
        body: loop_body,
    });
    let redecl = declare(&mut b, again);
    let root = b.stmt(StmtKind::Block(vec![for_stmt, redecl]));

    let result = run(b, root);
    assert!(result.diagnostics.is_empty());
}

#[test]
fn for_loop_flow_covers_header_condition_and_update() {
    // for (int i = 0; i < 3; i++) { i.toString(); }
    let mut b = BodyBuilder::new();
    let i = b.local("i", LocalKind::Local);
    let init = declare_init(&mut b, i, 0);
    let i_read = b.expr(ExprKind::Local(i));
    let three = b.expr(ExprKind::Int(3));
    let cond = b.expr(ExprKind::Binary {
        op: BinaryOp::Lt,
        lhs: i_read,
        rhs: three,
    });
    let i_ref = b.expr(ExprKind::Local(i));
    let inc = b.expr(ExprKind::Unary {
        op: UnaryOp::PostInc,
        expr: i_ref,
    });
    let body_read = read(&mut b, i);
    let loop_body = b.stmt(StmtKind::Block(vec![body_read]));
    let for_stmt = b.stmt(StmtKind::For {
        init: vec![init],
        condition: Some(cond),
        update: vec![inc],
        body: loop_body,
    });
    let root = b.stmt(StmtKind::Block(vec![for_stmt]));

    let result = run(b, root);
    assert!(result.diagnostics.is_empty());
}

#[test]
fn foreach_variable_is_assigned_in_the_body() {
    // for (Object s : c) { s.toString(); }
    let mut b = BodyBuilder::new();
    let c = b.param("c");
    let s = b.local("s", LocalKind::Local);
    let iterable = b.expr(ExprKind::Local(c));
    let body_read = read(&mut b, s);
    let loop_body = b.stmt(StmtKind::Block(vec![body_read]));
    let foreach = b.stmt(StmtKind::ForEach {
        local: s,
        iterable,
        body: loop_body,
    });
    let root = b.stmt(StmtKind::Block(vec![foreach]));

    let result = run(b, root);
    assert!(result.diagnostics.is_empty());
}

#[test]
fn an_unbound_local_is_a_structural_error() {
    // x is read without ever being declared by a statement.
    let mut b = BodyBuilder::new();
    let x = b.local("x", LocalKind::Local);
    let use_x = read(&mut b, x);
    let root = b.stmt(StmtKind::Block(vec![use_x]));
    let body = b.finish(root);

    let err = analyze(&body, FlowConfig::default()).unwrap_err();
    assert!(matches!(
        err,
        FlowError::UnboundLocal { ref name, .. } if name == "x"
    ));
}
