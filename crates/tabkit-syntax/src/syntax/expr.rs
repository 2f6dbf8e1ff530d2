use itertools::Itertools;

use crate::LiteralValue;

/// The location of part of an expression in the parsed text.
///
/// Contains the start and end position in bytes within the source.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Location {
    start: usize,
    end: usize,
}

impl Location {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    /// The smallest location covering both `self` and `other`.
    pub fn to(&self, other: &Location) -> Location {
        Location::new(self.start.min(other.start), self.end.max(other.end))
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Located<T> {
    value: T,
    location: Location,
}

impl<T: std::fmt::Display> std::fmt::Display for Located<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.value.fmt(f)
    }
}

impl<T> Located<T> {
    pub fn new(value: T, location: Location) -> Self {
        Self { value, location }
    }

    pub fn inner(&self) -> &T {
        &self.value
    }

    pub fn take(self) -> T {
        self.value
    }

    pub fn location(&self) -> &Location {
        &self.location
    }
}

impl<T> std::ops::Deref for Located<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, derive_more::Display)]
pub enum BinaryOp {
    #[display(fmt = "+")]
    Add,
    #[display(fmt = "-")]
    Sub,
    #[display(fmt = "*")]
    Mul,
    #[display(fmt = "/")]
    Div,
    #[display(fmt = "//")]
    FloorDiv,
    #[display(fmt = "%")]
    Mod,
    #[display(fmt = "**")]
    Pow,
    #[display(fmt = "&")]
    BitAnd,
    #[display(fmt = "|")]
    BitOr,
    #[display(fmt = "<<")]
    LShift,
    #[display(fmt = ">>")]
    RShift,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, derive_more::Display)]
pub enum UnaryOp {
    #[display(fmt = "-")]
    Neg,
    #[display(fmt = "~")]
    Invert,
    #[display(fmt = "not")]
    Not,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, derive_more::Display)]
pub enum BoolOp {
    #[display(fmt = "and")]
    And,
    #[display(fmt = "or")]
    Or,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, derive_more::Display)]
pub enum CompareOp {
    #[display(fmt = "==")]
    Eq,
    #[display(fmt = "!=")]
    NotEq,
    #[display(fmt = "<")]
    Lt,
    #[display(fmt = "<=")]
    LtE,
    #[display(fmt = ">")]
    Gt,
    #[display(fmt = ">=")]
    GtE,
    #[display(fmt = "in")]
    In,
    #[display(fmt = "not in")]
    NotIn,
}

/// The positional and keyword arguments of a call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Arguments {
    positional: Vec<Expr>,
    keyword: Vec<(Located<String>, Expr)>,
}

impl Arguments {
    pub fn new(positional: Vec<Expr>, keyword: Vec<(Located<String>, Expr)>) -> Self {
        Self {
            positional,
            keyword,
        }
    }

    pub fn positional(&self) -> &[Expr] {
        &self.positional
    }

    pub fn keyword(&self) -> &[(Located<String>, Expr)] {
        &self.keyword
    }

    pub fn len(&self) -> usize {
        self.positional.len() + self.keyword.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    Literal(LiteralValue),
    Name(String),
    /// `(a, b)` or a bare `a, b`.
    Tuple(Vec<Expr>),
    /// `[a, b]`. Only meaningful as the right side of `in`.
    List(Vec<Expr>),
    Call {
        function: Located<String>,
        args: Arguments,
    },
    Subscript {
        base: Box<Expr>,
        index: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// A chain of `and` / `or`, flattened into all of its operands.
    Bool {
        op: BoolOp,
        operands: Vec<Expr>,
    },
    Compare {
        op: CompareOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// `then if test else otherwise`
    Conditional {
        test: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    kind: ExprKind,
    location: Location,
}

impl Expr {
    pub fn new(kind: ExprKind, location: Location) -> Self {
        Self { kind, location }
    }

    pub fn kind(&self) -> &ExprKind {
        &self.kind
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Returns the name if this is a bare reference.
    pub fn as_name(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Name(name) => Some(name),
            _ => None,
        }
    }
}

/// Renders the expression fully parenthesized. Used for diagnostics and tests.
impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            ExprKind::Literal(literal) => write!(f, "{literal}"),
            ExprKind::Name(name) => write!(f, "{name}"),
            ExprKind::Tuple(elements) => write!(f, "({})", elements.iter().format(", ")),
            ExprKind::List(elements) => write!(f, "[{}]", elements.iter().format(", ")),
            ExprKind::Call { function, args } => {
                let keyword = args
                    .keyword()
                    .iter()
                    .map(|(name, value)| format!("{name}={value}"));
                let args = args.positional().iter().map(|arg| arg.to_string());
                write!(f, "{function}({})", args.chain(keyword).format(", "))
            }
            ExprKind::Subscript { base, index } => write!(f, "{base}[{index}]"),
            ExprKind::Unary { op, operand } => match op {
                UnaryOp::Not => write!(f, "(not {operand})"),
                op => write!(f, "({op}{operand})"),
            },
            ExprKind::Binary { op, lhs, rhs } => write!(f, "({lhs} {op} {rhs})"),
            ExprKind::Bool { op, operands } => {
                write!(f, "({})", operands.iter().format(&format!(" {op} ")))
            }
            ExprKind::Compare { op, lhs, rhs } => write!(f, "({lhs} {op} {rhs})"),
            ExprKind::Conditional {
                test,
                then,
                otherwise,
            } => write!(f, "({then} if {test} else {otherwise})"),
        }
    }
}

/// A single statement of a source text.
#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    Assign { target: Located<String>, value: Expr },
    Expr(Expr),
}

impl std::fmt::Display for Stmt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stmt::Assign { target, value } => write!(f, "{target} = {value}"),
            Stmt::Expr(expr) => write!(f, "{expr}"),
        }
    }
}
