//! Typed AST produced by the parser and consumed by the evaluator.
//!
//! Every node carries its source line (`line` field) so runtime errors and
//! recorded events can report a useful location. Nodes are immutable once
//! parsed and may be shared (e.g. a function's body is `Rc`-shared between
//! every call), per spec.md §3's entity-lifecycle notes.

use std::rc::Rc;

use num_bigint::BigInt;

pub type Line = u32;

#[derive(Debug, Clone)]
pub struct Module {
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct Params {
    pub positional: Vec<Param>,
    pub star_args: Option<String>,
    pub kwonly: Vec<Param>,
    pub star_kwargs: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub default: Option<Expr>,
    pub annotation: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct ExceptHandler {
    pub exc_type: Option<String>,
    pub name: Option<String>,
    pub body: Vec<Stmt>,
    pub line: Line,
}

#[derive(Debug, Clone)]
pub struct IfClause {
    pub test: Expr,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct WithItem {
    pub ctx_expr: Expr,
    pub target: Option<AssignTarget>,
}

#[derive(Debug, Clone)]
pub struct MatchCase {
    pub pattern: Pattern,
    pub guard: Option<Expr>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub enum Pattern {
    Literal(Literal),
    Capture(String),
    Wildcard,
    Sequence { elements: Vec<Pattern>, star_at: Option<usize> },
    Mapping { keys: Vec<Literal>, patterns: Vec<Pattern> },
    Class { name: String, positional: Vec<Pattern>, keyword: Vec<(String, Pattern)> },
    Or(Vec<Pattern>),
}

/// An assignment target: a plain name, a (possibly nested/starred) tuple
/// pattern, a subscript, or an attribute, per spec.md §4.6 "Assignment".
#[derive(Debug, Clone)]
pub enum AssignTarget {
    Name(String),
    Tuple { elements: Vec<AssignTarget>, star_at: Option<usize> },
    Subscript { object: Expr, index: Expr },
    Attribute { object: Expr, attr: String },
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Assign { target: AssignTarget, value: Expr, line: Line },
    /// `a = b = value`: every target in `targets` is bound to the same
    /// evaluated `value`, left to right.
    ChainedAssign { targets: Vec<AssignTarget>, value: Expr, line: Line },
    AugAssign { target: AssignTarget, op: BinOp, value: Expr, line: Line },
    AnnotatedAssign { target: AssignTarget, annotation: Expr, value: Option<Expr>, line: Line },
    Def { name: String, params: Params, body: Vec<Stmt>, decorators: Vec<Expr>, is_generator: bool, line: Line },
    Class { name: String, bases: Vec<Expr>, body: Vec<Stmt>, decorators: Vec<Expr>, line: Line },
    If { clauses: Vec<IfClause>, orelse: Vec<Stmt>, line: Line },
    While { test: Expr, body: Vec<Stmt>, orelse: Vec<Stmt>, line: Line },
    For { target: AssignTarget, iter: Expr, body: Vec<Stmt>, orelse: Vec<Stmt>, line: Line },
    Try { body: Vec<Stmt>, handlers: Vec<ExceptHandler>, orelse: Vec<Stmt>, finalbody: Vec<Stmt>, line: Line },
    Raise { exc: Option<Expr>, cause: Option<Expr>, line: Line },
    Return { value: Option<Expr>, line: Line },
    Yield { value: Option<Expr>, line: Line },
    YieldFrom { value: Expr, line: Line },
    Import { modules: Vec<(String, Option<String>)>, line: Line },
    FromImport { module: String, names: Vec<(String, Option<String>)>, line: Line },
    With { items: Vec<WithItem>, body: Vec<Stmt>, line: Line },
    Match { subject: Expr, cases: Vec<MatchCase>, line: Line },
    Del { targets: Vec<Expr>, line: Line },
    Assert { test: Expr, msg: Option<Expr>, line: Line },
    Global { names: Vec<String>, line: Line },
    Nonlocal { names: Vec<String>, line: Line },
    Pass,
    Break,
    Continue,
    Expr { value: Expr, line: Line },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(BigInt),
    Float(f64),
    Bool(bool),
    Str(Rc<str>),
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    MatMul,
    BitAnd,
    BitOr,
    BitXor,
    LShift,
    RShift,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    In,
    NotIn,
    Is,
    IsNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Pos,
    Not,
    Invert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
}

#[derive(Debug, Clone)]
pub struct Comprehension {
    pub target: AssignTarget,
    pub iter: Expr,
    pub ifs: Vec<Expr>,
}

#[derive(Debug, Clone)]
pub enum FStringPart {
    Literal(String),
    Expr { value: Box<Expr>, conversion: Option<char>, format_spec: Option<String> },
}

#[derive(Debug, Clone)]
pub enum Expr {
    Lit { value: Literal, line: Line },
    Var { name: String, line: Line },
    Tuple { elements: Vec<Expr>, line: Line },
    List { elements: Vec<Expr>, line: Line },
    Dict { items: Vec<(Option<Expr>, Expr)>, line: Line },
    Set { elements: Vec<Expr>, line: Line },
    Call { func: Box<Expr>, args: Vec<Expr>, starred: Vec<usize>, kwargs: Vec<(String, Expr)>, double_star: Option<Box<Expr>>, line: Line },
    GetAttr { object: Box<Expr>, attr: String, line: Line },
    Subscript { object: Box<Expr>, index: Box<Expr>, line: Line },
    Slice { start: Option<Box<Expr>>, stop: Option<Box<Expr>>, step: Option<Box<Expr>>, line: Line },
    BinOp { left: Box<Expr>, op: BinOp, right: Box<Expr>, line: Line },
    BoolOp { op: BoolOp, values: Vec<Expr>, line: Line },
    ChainedCompare { first: Box<Expr>, rest: Vec<(CmpOp, Expr)>, line: Line },
    UnaryOp { op: UnaryOp, operand: Box<Expr>, line: Line },
    Ternary { test: Box<Expr>, body: Box<Expr>, orelse: Box<Expr>, line: Line },
    Lambda { params: Params, body: Box<Expr>, line: Line },
    FString { parts: Vec<FStringPart>, line: Line },
    ListComp { element: Box<Expr>, generators: Vec<Comprehension>, line: Line },
    DictComp { key: Box<Expr>, value: Box<Expr>, generators: Vec<Comprehension>, line: Line },
    SetComp { element: Box<Expr>, generators: Vec<Comprehension>, line: Line },
    GenExpr { element: Box<Expr>, generators: Vec<Comprehension>, line: Line },
    Walrus { name: String, value: Box<Expr>, line: Line },
    Starred { value: Box<Expr>, line: Line },
}

impl Expr {
    #[must_use]
    pub fn line(&self) -> Line {
        match self {
            Expr::Lit { line, .. }
            | Expr::Var { line, .. }
            | Expr::Tuple { line, .. }
            | Expr::List { line, .. }
            | Expr::Dict { line, .. }
            | Expr::Set { line, .. }
            | Expr::Call { line, .. }
            | Expr::GetAttr { line, .. }
            | Expr::Subscript { line, .. }
            | Expr::Slice { line, .. }
            | Expr::BinOp { line, .. }
            | Expr::BoolOp { line, .. }
            | Expr::ChainedCompare { line, .. }
            | Expr::UnaryOp { line, .. }
            | Expr::Ternary { line, .. }
            | Expr::Lambda { line, .. }
            | Expr::FString { line, .. }
            | Expr::ListComp { line, .. }
            | Expr::DictComp { line, .. }
            | Expr::SetComp { line, .. }
            | Expr::GenExpr { line, .. }
            | Expr::Walrus { line, .. }
            | Expr::Starred { line, .. } => *line,
        }
    }
}
