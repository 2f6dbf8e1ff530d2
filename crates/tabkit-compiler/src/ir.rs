//! The row expression IR.
//!
//! Expressions are immutable trees shared through [ExprRef]. A [RowExpr::Var]
//! carries the statement it was bound to, so traversal and type inference
//! can see through aliases without consulting the owning context.

use std::sync::Arc;

use itertools::Itertools;
use smallvec::SmallVec;
use tabkit_schema::FieldType;

use crate::AggregateInstance;

pub type ExprRef = Arc<RowExpr>;

/// Arguments of calls and operators.
pub type Args = SmallVec<[ExprRef; 2]>;

/// A literal value and its type.
#[derive(Clone, Debug, PartialEq)]
pub enum ConstValue {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
}

impl ConstValue {
    pub fn field_type(&self) -> FieldType {
        match self {
            ConstValue::Int(_) => FieldType::Int,
            ConstValue::Float(_) => FieldType::Float,
            ConstValue::Str(_) => FieldType::Str,
            ConstValue::Bool(_) => FieldType::Bool,
        }
    }
}

/// Renders the value as an awk literal.
impl std::fmt::Display for ConstValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConstValue::Int(n) => write!(f, "{n}"),
            ConstValue::Float(x) => {
                let text = x.to_string();
                if text.contains(['.', 'e', 'E']) || !x.is_finite() {
                    write!(f, "{text}")
                } else {
                    write!(f, "{text}.0")
                }
            }
            ConstValue::Str(s) => {
                f.write_str("\"")?;
                for c in s.chars() {
                    match c {
                        '\\' => f.write_str("\\\\")?,
                        '"' => f.write_str("\\\"")?,
                        '\n' => f.write_str("\\n")?,
                        '\t' => f.write_str("\\t")?,
                        '\r' => f.write_str("\\r")?,
                        c => write!(f, "{c}")?,
                    }
                }
                f.write_str("\"")
            }
            ConstValue::Bool(b) => write!(f, "{}", u8::from(*b)),
        }
    }
}

/// Operators rendered infix between all of their arguments.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, derive_more::Display)]
pub enum NAryOp {
    /// String concatenation.
    #[display(fmt = "")]
    Concat,
    /// Space-separated juxtaposition, used to build statements such as
    /// `cmd | getline var`.
    #[display(fmt = " ")]
    Juxtapose,
    #[display(fmt = "+")]
    Add,
    #[display(fmt = "-")]
    Sub,
    #[display(fmt = "*")]
    Mul,
    #[display(fmt = "/")]
    Div,
    #[display(fmt = "^")]
    Pow,
    #[display(fmt = "%")]
    Mod,
    #[display(fmt = "&&")]
    And,
    #[display(fmt = "||")]
    Or,
    #[display(fmt = "==")]
    Eq,
    #[display(fmt = "!=")]
    NotEq,
    #[display(fmt = ">")]
    Gt,
    #[display(fmt = "<")]
    Lt,
    #[display(fmt = ">=")]
    GtE,
    #[display(fmt = "<=")]
    LtE,
}

impl NAryOp {
    /// Returns true for operators producing a boolean.
    pub fn is_predicate(&self) -> bool {
        matches!(
            self,
            NAryOp::And
                | NAryOp::Or
                | NAryOp::Eq
                | NAryOp::NotEq
                | NAryOp::Gt
                | NAryOp::Lt
                | NAryOp::GtE
                | NAryOp::LtE
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum RowExpr {
    Const(ConstValue),
    /// A field of the input, read from its 1-based column.
    Field {
        name: String,
        position: usize,
        field_type: FieldType,
    },
    /// A reference to a name bound in a context.
    ///
    /// `binding` is the bound statement: usually an [RowExpr::Assign], or
    /// the statement itself for bindings with side effects.
    Var { name: String, binding: ExprRef },
    /// An awk builtin variable or keyword rendered verbatim.
    Builtin(String),
    /// A name set as a side effect of evaluating `wrapped`.
    SideEffectVar { name: String, wrapped: ExprRef },
    Call { function: String, args: Args },
    Subscript { base: ExprRef, index: ExprRef },
    Op { op: NAryOp, args: Args },
    Conditional {
        test: ExprRef,
        then: ExprRef,
        otherwise: ExprRef,
    },
    Assign { target: String, value: ExprRef },
    Aggregate(AggregateInstance),
}

impl RowExpr {
    pub fn constant(value: ConstValue) -> ExprRef {
        Arc::new(RowExpr::Const(value))
    }

    pub fn int(value: i64) -> ExprRef {
        Self::constant(ConstValue::Int(value))
    }

    pub fn string(value: impl Into<String>) -> ExprRef {
        Self::constant(ConstValue::Str(value.into()))
    }

    pub fn var(name: impl Into<String>, binding: ExprRef) -> ExprRef {
        Arc::new(RowExpr::Var {
            name: name.into(),
            binding,
        })
    }

    pub fn builtin(name: impl Into<String>) -> ExprRef {
        Arc::new(RowExpr::Builtin(name.into()))
    }

    pub fn side_effect_var(name: impl Into<String>, wrapped: ExprRef) -> ExprRef {
        Arc::new(RowExpr::SideEffectVar {
            name: name.into(),
            wrapped,
        })
    }

    pub fn call(function: impl Into<String>, args: impl IntoIterator<Item = ExprRef>) -> ExprRef {
        Arc::new(RowExpr::Call {
            function: function.into(),
            args: args.into_iter().collect(),
        })
    }

    pub fn subscript(base: ExprRef, index: ExprRef) -> ExprRef {
        Arc::new(RowExpr::Subscript { base, index })
    }

    pub fn op(op: NAryOp, args: impl IntoIterator<Item = ExprRef>) -> ExprRef {
        Arc::new(RowExpr::Op {
            op,
            args: args.into_iter().collect(),
        })
    }

    pub fn conditional(test: ExprRef, then: ExprRef, otherwise: ExprRef) -> ExprRef {
        Arc::new(RowExpr::Conditional {
            test,
            then,
            otherwise,
        })
    }

    pub fn assign(target: impl Into<String>, value: ExprRef) -> ExprRef {
        Arc::new(RowExpr::Assign {
            target: target.into(),
            value,
        })
    }

    pub fn as_const(&self) -> Option<&ConstValue> {
        match self {
            RowExpr::Const(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_str_const(&self) -> Option<&str> {
        match self {
            RowExpr::Const(ConstValue::Str(value)) => Some(value),
            _ => None,
        }
    }

    pub fn is_field(&self) -> bool {
        matches!(self, RowExpr::Field { .. })
    }

    /// The name of a variable reference.
    pub fn var_name(&self) -> Option<&str> {
        match self {
            RowExpr::Var { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Returns every node of the tree matching `predicate`, in pre-order.
    ///
    /// Traversal continues through a variable into the expression it is bound
    /// to, and through the wrapped expression of a side-effect variable. The
    /// arguments of aggregates belong to another scope and are not visited.
    pub fn find<'a>(&'a self, predicate: impl Fn(&RowExpr) -> bool) -> Vec<&'a RowExpr> {
        let mut found = Vec::new();
        self.visit(&mut |node| {
            if predicate(node) {
                found.push(node)
            }
        });
        found
    }

    fn visit<'a, F: FnMut(&'a RowExpr)>(&'a self, f: &mut F) {
        f(self);
        match self {
            RowExpr::Const(_)
            | RowExpr::Field { .. }
            | RowExpr::Builtin(_)
            | RowExpr::Aggregate(_) => {}
            RowExpr::Var { binding, .. } => match binding.as_ref() {
                RowExpr::Assign { value, .. } => value.visit(f),
                statement => statement.visit(f),
            },
            RowExpr::SideEffectVar { wrapped, .. } => wrapped.visit(f),
            RowExpr::Call { args, .. } | RowExpr::Op { args, .. } => {
                args.iter().for_each(|arg| arg.visit(f))
            }
            RowExpr::Subscript { base, index } => {
                base.visit(f);
                index.visit(f);
            }
            RowExpr::Conditional {
                test,
                then,
                otherwise,
            } => {
                test.visit(f);
                then.visit(f);
                otherwise.visit(f);
            }
            RowExpr::Assign { value, .. } => value.visit(f),
        }
    }

    /// Names of all variables referenced by this expression, including
    /// those referenced through other variables.
    pub fn referenced_vars(&self) -> impl Iterator<Item = &str> {
        self.find(|node| matches!(node, RowExpr::Var { .. }))
            .into_iter()
            .filter_map(RowExpr::var_name)
    }
}

/// Renders the expression as awk source.
///
/// Variables render as their name; the expression they are bound to is
/// never inlined.
impl std::fmt::Display for RowExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowExpr::Const(value) => write!(f, "{value}"),
            RowExpr::Field { position, .. } => write!(f, "${position}"),
            RowExpr::Var { name, .. }
            | RowExpr::Builtin(name)
            | RowExpr::SideEffectVar { name, .. } => write!(f, "{name}"),
            RowExpr::Call { function, args } => {
                write!(f, "{function}({})", args.iter().format(", "))
            }
            RowExpr::Subscript { base, index } => write!(f, "{base}[{index}]"),
            RowExpr::Op {
                op: NAryOp::Juxtapose,
                args,
            } => write!(f, "({})", args.iter().format(" ")),
            RowExpr::Op { op, args } => {
                write!(f, "({})", args.iter().format(&format!(" {op} ")))
            }
            RowExpr::Conditional {
                test,
                then,
                otherwise,
            } => write!(f, "({test}?{then}:{otherwise})"),
            RowExpr::Assign { target, value } => write!(f, "{target} = {value}"),
            RowExpr::Aggregate(aggregate) => write!(f, "{}", aggregate.name()),
        }
    }
}
