//! Lowering of parsed expressions into the row expression IR.

use std::str::FromStr;

use error_stack::{bail, ensure, report, ResultExt};
use tabkit_syntax::{
    Arguments, BinaryOp, BoolOp, CompareOp, Expr, ExprKind, LiteralValue, Located, Stmt, UnaryOp,
};

use crate::aggregation::expand_aggregate;
use crate::functions::get_function;
use crate::{
    AggregateCategory, AggregateFunction, ConstValue, Error, ExprContext, ExprRef, NAryOp, Namer,
    NearestMatches, RowExpr, Snippet, Snippets,
};

/// Awk variables that may be referenced by name.
const PSEUDO_VARIABLES: [&str; 5] = ["NR", "NF", "FILENAME", "RSTART", "RLENGTH"];

/// Parse `source` into statements, reporting failures as grammar errors.
pub(crate) fn parse_statements(source: &str) -> error_stack::Result<Vec<Stmt>, Error> {
    tabkit_syntax::parse_statements(source)
        .change_context_lazy(|| Error::Grammar(format!("failed to parse '{source}'")))
}

/// Where calls to aggregate functions are lowered.
pub(crate) struct AggregateTarget<'a, 's> {
    /// The context in which aggregate arguments are evaluated for every row.
    row_ctx: &'a mut ExprContext<'s>,
    category: AggregateCategory,
}

/// Lowers expressions within a context.
///
/// Helper bindings introduced by function expansion are bound into the same
/// context. Aggregate calls are only recognized when an [AggregateTarget] is
/// present; their arguments are lowered within its row context.
pub(crate) struct Lowering<'a, 's> {
    ctx: &'a mut ExprContext<'s>,
    namer: &'a mut Namer,
    snippets: &'a mut Snippets,
    aggregates: Option<AggregateTarget<'a, 's>>,
}

impl<'a, 's> Lowering<'a, 's> {
    pub(crate) fn new(
        ctx: &'a mut ExprContext<'s>,
        namer: &'a mut Namer,
        snippets: &'a mut Snippets,
    ) -> Self {
        Self {
            ctx,
            namer,
            snippets,
            aggregates: None,
        }
    }

    pub(crate) fn with_aggregates(
        ctx: &'a mut ExprContext<'s>,
        namer: &'a mut Namer,
        snippets: &'a mut Snippets,
        row_ctx: &'a mut ExprContext<'s>,
        category: AggregateCategory,
    ) -> Self {
        Self {
            ctx,
            namer,
            snippets,
            aggregates: Some(AggregateTarget { row_ctx, category }),
        }
    }

    pub(crate) fn ctx(&self) -> &ExprContext<'s> {
        self.ctx
    }

    pub(crate) fn require(&mut self, snippet: Snippet) {
        self.snippets.require(snippet)
    }

    pub(crate) fn name_for(&mut self, prefix: &str, key: &str) -> String {
        self.namer.name_for(prefix, key)
    }

    pub(crate) fn name_for_parts(&mut self, prefix: &str, parts: &[&str]) -> String {
        self.namer.name_for_parts(prefix, parts)
    }

    pub(crate) fn bind(&mut self, name: &str, statement: ExprRef) -> error_stack::Result<(), Error> {
        self.ctx.bind(name, statement, None)
    }

    /// Bind `statement` to `name` unless already bound, returning a
    /// reference to the binding.
    pub(crate) fn bind_helper(
        &mut self,
        name: &str,
        statement: ExprRef,
    ) -> error_stack::Result<ExprRef, Error> {
        let binding = match self.ctx.binding(name) {
            Some(binding) => binding.clone(),
            None => {
                self.ctx.bind(name, statement.clone(), None)?;
                statement
            }
        };
        Ok(RowExpr::var(name, binding))
    }

    /// A variable holding `expr`, so it is evaluated once however often the
    /// result refers to it.
    ///
    /// Fields are cheap to read and are returned unchanged.
    pub(crate) fn helper_var(
        &mut self,
        prefix: &str,
        expr: ExprRef,
    ) -> error_stack::Result<ExprRef, Error> {
        if expr.is_field() {
            return Ok(expr);
        }
        let name = self.name_for(prefix, &expr.to_string());
        self.bind_helper(&name, RowExpr::assign(name.clone(), expr))
    }

    /// Lower an assignment statement into its target and bound statement.
    ///
    /// A bare name `x` is treated as `x = x`.
    pub(crate) fn lower_assignment(
        &mut self,
        stmt: &Stmt,
    ) -> error_stack::Result<(String, ExprRef), Error> {
        match stmt {
            Stmt::Assign { target, value } => {
                let value = self.lower(value)?;
                Ok((target.inner().clone(), RowExpr::assign(target.inner(), value)))
            }
            Stmt::Expr(expr) => match expr.as_name() {
                Some(name) => {
                    let value = self.lower(expr)?;
                    Ok((name.to_owned(), RowExpr::assign(name, value)))
                }
                None => Err(report!(Error::Grammar(
                    "please assign expression to a variable".to_owned()
                ))
                .attach_printable(format!("statement: {stmt}"))),
            },
        }
    }

    /// Lower a statement which must produce a value.
    pub(crate) fn lower_value(&mut self, stmt: &Stmt) -> error_stack::Result<ExprRef, Error> {
        match stmt {
            Stmt::Expr(expr) => self.lower(expr),
            Stmt::Assign { .. } => Err(report!(Error::Grammar(
                "assignment where a value is required".to_owned()
            ))
            .attach_printable(format!("statement: {stmt}"))),
        }
    }

    pub(crate) fn lower(&mut self, expr: &Expr) -> error_stack::Result<ExprRef, Error> {
        match expr.kind() {
            ExprKind::Literal(literal) => lower_literal(literal),
            ExprKind::Name(name) => self.resolve(name),
            ExprKind::Tuple(elements) => {
                ensure!(
                    !elements.is_empty(),
                    Error::Grammar("empty tuple".to_owned())
                );
                let elements = self.lower_all(elements)?;
                Ok(RowExpr::op(NAryOp::Concat, elements))
            }
            ExprKind::List(_) => Err(report!(Error::Grammar(
                "lists are only supported on the right of 'in'".to_owned()
            ))
            .attach_printable(format!("at {}", expr.location()))),
            ExprKind::Call { function, args } => self.lower_call(function, args),
            ExprKind::Subscript { base, index } => {
                let base = self.lower(base)?;
                let index = match index.kind() {
                    ExprKind::Literal(literal @ (LiteralValue::Number(_) | LiteralValue::String(_))) => {
                        lower_literal(literal)?
                    }
                    _ => bail!(Error::Grammar(format!(
                        "subscript must be a string or number literal, saw '{index}'"
                    ))),
                };
                Ok(RowExpr::subscript(base, index))
            }
            ExprKind::Unary { op, operand } => {
                let operand = self.lower(operand)?;
                let function = match op {
                    UnaryOp::Neg => "-",
                    UnaryOp::Invert => "compl",
                    UnaryOp::Not => "!",
                };
                Ok(RowExpr::call(function, [operand]))
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let args = [self.lower(lhs)?, self.lower(rhs)?];
                let lowered = match op {
                    BinaryOp::Add => RowExpr::op(NAryOp::Add, args),
                    BinaryOp::Sub => RowExpr::op(NAryOp::Sub, args),
                    BinaryOp::Mul => RowExpr::op(NAryOp::Mul, args),
                    BinaryOp::Div => RowExpr::op(NAryOp::Div, args),
                    BinaryOp::Mod => RowExpr::op(NAryOp::Mod, args),
                    BinaryOp::Pow => RowExpr::op(NAryOp::Pow, args),
                    BinaryOp::FloorDiv => {
                        RowExpr::call("int", [RowExpr::op(NAryOp::Div, args)])
                    }
                    BinaryOp::BitAnd => RowExpr::call("and", args),
                    BinaryOp::BitOr => RowExpr::call("or", args),
                    BinaryOp::LShift => RowExpr::call("lshift", args),
                    BinaryOp::RShift => RowExpr::call("rshift", args),
                };
                Ok(lowered)
            }
            ExprKind::Bool { op, operands } => {
                let operands = self.lower_all(operands)?;
                let op = match op {
                    BoolOp::And => NAryOp::And,
                    BoolOp::Or => NAryOp::Or,
                };
                Ok(RowExpr::op(op, operands))
            }
            ExprKind::Compare { op, lhs, rhs } => self.lower_compare(*op, lhs, rhs),
            ExprKind::Conditional {
                test,
                then,
                otherwise,
            } => Ok(RowExpr::conditional(
                self.lower(test)?,
                self.lower(then)?,
                self.lower(otherwise)?,
            )),
        }
    }

    fn lower_all(&mut self, exprs: &[Expr]) -> error_stack::Result<Vec<ExprRef>, Error> {
        let mut lowered = Vec::with_capacity(exprs.len());
        for expr in exprs {
            lowered.push(self.lower(expr)?);
        }
        Ok(lowered)
    }

    /// Resolve a name as a field, a bound variable or an awk pseudo-variable.
    fn resolve(&self, name: &str) -> error_stack::Result<ExprRef, Error> {
        if let Some(field) = self.ctx.field(name) {
            ensure!(
                !name.starts_with("__"),
                Error::ReservedName(name.to_owned())
            );
            return Ok(field);
        }
        if let Some(var) = self.ctx.var(name) {
            return Ok(var);
        }
        if PSEUDO_VARIABLES.contains(&name) {
            return Ok(RowExpr::builtin(name));
        }

        let candidates = self
            .ctx
            .schema()
            .field_names()
            .chain(self.ctx.iter().map(|(name, _)| name))
            .filter(|candidate| !candidate.starts_with("__"))
            .chain(PSEUDO_VARIABLES);
        let nearest = NearestMatches::new_nearest_strings(name, candidates);
        Err(report!(Error::NameResolution {
            name: name.to_owned(),
            nearest,
        }))
    }

    fn lower_compare(
        &mut self,
        op: CompareOp,
        lhs: &Expr,
        rhs: &Expr,
    ) -> error_stack::Result<ExprRef, Error> {
        let (test, join) = match op {
            CompareOp::Eq => return self.lower_binary_compare(NAryOp::Eq, lhs, rhs),
            CompareOp::NotEq => return self.lower_binary_compare(NAryOp::NotEq, lhs, rhs),
            CompareOp::Lt => return self.lower_binary_compare(NAryOp::Lt, lhs, rhs),
            CompareOp::LtE => return self.lower_binary_compare(NAryOp::LtE, lhs, rhs),
            CompareOp::Gt => return self.lower_binary_compare(NAryOp::Gt, lhs, rhs),
            CompareOp::GtE => return self.lower_binary_compare(NAryOp::GtE, lhs, rhs),
            CompareOp::In => (NAryOp::Eq, NAryOp::Or),
            CompareOp::NotIn => (NAryOp::NotEq, NAryOp::And),
        };

        let elements = match rhs.kind() {
            ExprKind::List(elements) | ExprKind::Tuple(elements) if !elements.is_empty() => {
                elements
            }
            _ => bail!(Error::Grammar(format!(
                "'{op}' requires a non-empty literal list, saw '{rhs}'"
            ))),
        };

        let lhs = self.lower(lhs)?;
        let mut tests = Vec::with_capacity(elements.len());
        for element in elements {
            let element = self.lower(element)?;
            tests.push(RowExpr::op(test, [lhs.clone(), element]));
        }
        match tests.len() {
            1 => Ok(tests.remove(0)),
            _ => Ok(RowExpr::op(join, tests)),
        }
    }

    fn lower_binary_compare(
        &mut self,
        op: NAryOp,
        lhs: &Expr,
        rhs: &Expr,
    ) -> error_stack::Result<ExprRef, Error> {
        let args = [self.lower(lhs)?, self.lower(rhs)?];
        Ok(RowExpr::op(op, args))
    }

    fn lower_call(
        &mut self,
        function: &Located<String>,
        args: &Arguments,
    ) -> error_stack::Result<ExprRef, Error> {
        let name = function.inner().as_str();

        if let Some(target) = &mut self.aggregates {
            if let Ok(aggregate) = AggregateFunction::from_str(name) {
                ensure!(
                    args.keyword().is_empty(),
                    Error::argument_kind(name, "aggregates take positional arguments only")
                );
                let mut row = Lowering {
                    ctx: &mut *target.row_ctx,
                    namer: &mut *self.namer,
                    snippets: &mut *self.snippets,
                    aggregates: None,
                };
                let lowered = row.lower_all(args.positional())?;
                let category = target.category;
                return expand_aggregate(aggregate, category, lowered, self.namer);
            }
        }

        let positional = self.lower_all(args.positional())?;
        match get_function(name) {
            Some(function) => {
                let mut keyword = Vec::with_capacity(args.keyword().len());
                for (keyword_name, value) in args.keyword() {
                    keyword.push((keyword_name.inner().as_str(), self.lower(value)?));
                }
                let bound = function.bind(positional, keyword)?;
                function.expand(self, bound)
            }
            None => {
                ensure!(
                    args.keyword().is_empty(),
                    Error::argument_kind(name, "keyword arguments are not supported")
                );
                Ok(RowExpr::call(name, positional))
            }
        }
    }
}

fn lower_literal(literal: &LiteralValue) -> error_stack::Result<ExprRef, Error> {
    let value = match literal {
        LiteralValue::True => ConstValue::Bool(true),
        LiteralValue::False => ConstValue::Bool(false),
        LiteralValue::String(value) => ConstValue::Str(value.clone()),
        LiteralValue::Number(text) => match text.parse::<i64>() {
            Ok(value) if !literal.is_float() => ConstValue::Int(value),
            _ => ConstValue::Float(
                text.parse::<f64>()
                    .map_err(|_| report!(Error::Grammar(format!("invalid number '{text}'"))))?,
            ),
        },
    };
    Ok(RowExpr::constant(value))
}
