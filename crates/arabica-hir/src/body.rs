use std::fmt;

use arabica_core::Span;

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(u32);

impl ExprId {
    pub const fn from_raw(raw: u32) -> Self {
        ExprId(raw)
    }

    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExprId({})", self.0)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StmtId(u32);

impl StmtId {
    pub const fn from_raw(raw: u32) -> Self {
        StmtId(raw)
    }

    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for StmtId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StmtId({})", self.0)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalId(u32);

impl LocalId {
    pub const fn from_raw(raw: u32) -> Self {
        LocalId(raw)
    }

    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LocalId({})", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arena<T> {
    data: Vec<T>,
}

impl<T> Arena<T> {
    pub fn alloc(&mut self, value: T) -> u32 {
        let idx = self.data.len() as u32;
        self.data.push(value);
        idx
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = (u32, &T)> {
        self.data.iter().enumerate().map(|(i, v)| (i as u32, v))
    }

    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Arena { data: Vec::new() }
    }
}

impl<T> std::ops::Index<ExprId> for Arena<T> {
    type Output = T;

    fn index(&self, index: ExprId) -> &Self::Output {
        &self.data[index.index()]
    }
}

impl<T> std::ops::Index<StmtId> for Arena<T> {
    type Output = T;

    fn index(&self, index: StmtId) -> &Self::Output {
        &self.data[index.index()]
    }
}

impl<T> std::ops::Index<LocalId> for Arena<T> {
    type Output = T;

    fn index(&self, index: LocalId) -> &Self::Output {
        &self.data[index.index()]
    }
}

/// A lowered method, constructor, or initializer body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Body {
    pub root: StmtId,
    /// Entry parameters in declaration order. Catch-clause parameters are
    /// not listed here; they enter scope at their clause.
    pub params: Vec<LocalId>,
    pub stmts: Arena<Stmt>,
    pub exprs: Arena<Expr>,
    pub locals: Arena<Local>,
}

impl Body {
    #[must_use]
    pub fn root(&self) -> StmtId {
        self.root
    }

    #[must_use]
    pub fn params(&self) -> &[LocalId] {
        &self.params
    }

    #[must_use]
    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id]
    }

    #[must_use]
    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id]
    }

    #[must_use]
    pub fn local(&self, id: LocalId) -> &Local {
        &self.locals[id]
    }

    #[must_use]
    pub fn locals(&self) -> &[Local] {
        self.locals.as_slice()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocalKind {
    /// Method, constructor, or catch-clause parameter.
    Param,
    Local,
}

/// A declared local variable or parameter.
///
/// `is_final` marks locals declared `final`; a final local may be assigned at
/// most once on every path, which the flow checker enforces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Local {
    pub name: String,
    pub kind: LocalKind,
    pub is_final: bool,
    pub name_span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

/// One `case`/`default` group of a switch body, in source order.
///
/// Groups fall through to the next group unless a statement transfers control
/// out; an empty `stmts` list is a bare label that always falls through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchCase {
    pub is_default: bool,
    pub stmts: Vec<StmtId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatchClause {
    pub param: LocalId,
    pub body: StmtId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StmtKind {
    Block(Vec<StmtId>),
    Let {
        local: LocalId,
        initializer: Option<ExprId>,
    },
    Expr(ExprId),
    If {
        condition: ExprId,
        then_branch: StmtId,
        else_branch: Option<StmtId>,
    },
    While {
        condition: ExprId,
        body: StmtId,
    },
    DoWhile {
        body: StmtId,
        condition: ExprId,
    },
    For {
        init: Vec<StmtId>,
        condition: Option<ExprId>,
        update: Vec<ExprId>,
        body: StmtId,
    },
    ForEach {
        local: LocalId,
        iterable: ExprId,
        body: StmtId,
    },
    Labeled {
        label: String,
        body: StmtId,
    },
    Switch {
        selector: ExprId,
        cases: Vec<SwitchCase>,
    },
    Try {
        body: StmtId,
        catches: Vec<CatchClause>,
        finally: Option<StmtId>,
    },
    Synchronized {
        lock: ExprId,
        body: StmtId,
    },
    Return(Option<ExprId>),
    Throw(ExprId),
    Break {
        label: Option<String>,
    },
    Continue {
        label: Option<String>,
    },
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    Neg,
    BitNot,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    UShr,
    BitAnd,
    BitOr,
    BitXor,
    Lt,
    Le,
    Gt,
    Ge,
    EqEq,
    NotEq,
    /// Short-circuit `&&`.
    AndAnd,
    /// Short-circuit `||`.
    OrOr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprKind {
    Local(LocalId),
    Int(i64),
    Bool(bool),
    String(String),
    Null,
    Unary {
        op: UnaryOp,
        expr: ExprId,
    },
    Binary {
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
    },
    /// Simple (`op == None`) or compound (`op == Some(..)`) assignment.
    ///
    /// The target is an arbitrary expression; lowering guarantees only that
    /// assignable targets are locals, field accesses, or array accesses.
    Assign {
        target: ExprId,
        op: Option<BinaryOp>,
        value: ExprId,
    },
    Conditional {
        condition: ExprId,
        then_expr: ExprId,
        else_expr: ExprId,
    },
    FieldAccess {
        receiver: ExprId,
        name: String,
    },
    ArrayAccess {
        array: ExprId,
        index: ExprId,
    },
    Call {
        callee: ExprId,
        name: String,
        args: Vec<ExprId>,
    },
    New {
        args: Vec<ExprId>,
    },
    Cast(ExprId),
    InstanceOf(ExprId),
    /// Placeholder for expressions lowering could not produce.
    Invalid,
}

/// Builds a [`Body`] programmatically.
///
/// Lowering and tests both go through this builder. Nodes allocated without
/// an explicit span get distinct synthetic one-byte spans so diagnostics stay
/// attributable even for generated bodies.
#[derive(Default)]
pub struct BodyBuilder {
    params: Vec<LocalId>,
    stmts: Arena<Stmt>,
    exprs: Arena<Expr>,
    locals: Arena<Local>,
    cursor: usize,
}

impl BodyBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares an entry parameter of the body.
    pub fn param(&mut self, name: impl Into<String>) -> LocalId {
        let id = self.local(name, LocalKind::Param);
        self.params.push(id);
        id
    }

    pub fn final_param(&mut self, name: impl Into<String>) -> LocalId {
        let id = self.final_local(name, LocalKind::Param);
        self.params.push(id);
        id
    }

    pub fn local(&mut self, name: impl Into<String>, kind: LocalKind) -> LocalId {
        let span = self.next_span();
        LocalId::from_raw(self.locals.alloc(Local {
            name: name.into(),
            kind,
            is_final: false,
            name_span: span,
        }))
    }

    pub fn final_local(&mut self, name: impl Into<String>, kind: LocalKind) -> LocalId {
        let span = self.next_span();
        LocalId::from_raw(self.locals.alloc(Local {
            name: name.into(),
            kind,
            is_final: true,
            name_span: span,
        }))
    }

    pub fn expr(&mut self, kind: ExprKind) -> ExprId {
        let span = self.next_span();
        self.expr_at(kind, span)
    }

    pub fn expr_at(&mut self, kind: ExprKind, span: Span) -> ExprId {
        ExprId::from_raw(self.exprs.alloc(Expr { kind, span }))
    }

    pub fn stmt(&mut self, kind: StmtKind) -> StmtId {
        let span = self.next_span();
        self.stmt_at(kind, span)
    }

    pub fn stmt_at(&mut self, kind: StmtKind, span: Span) -> StmtId {
        StmtId::from_raw(self.stmts.alloc(Stmt { kind, span }))
    }

    #[must_use]
    pub fn finish(self, root: StmtId) -> Body {
        Body {
            root,
            params: self.params,
            stmts: self.stmts,
            exprs: self.exprs,
            locals: self.locals,
        }
    }

    fn next_span(&mut self) -> Span {
        let start = self.cursor;
        self.cursor += 1;
        Span::new(start, start + 1)
    }
}
