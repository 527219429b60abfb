//! Method-body IR for Arabica analyses.
//!
//! A [`body::Body`] is the lowered, name-resolved form of a single method or
//! initializer body: arenas of statements, expressions, and local-variable
//! declarations, plus the root block. Every name that survives lowering is a
//! [`body::LocalId`]; unresolved or non-local names are lowered to field and
//! call expressions and carry no local id. Analyses walk the arenas directly
//! and never look back at syntax.

pub mod body;

pub use crate::body::{
    Arena, BinaryOp, Body, BodyBuilder, CatchClause, Expr, ExprId, ExprKind, Local, LocalId,
    LocalKind, Stmt, StmtId, StmtKind, SwitchCase, UnaryOp,
};
