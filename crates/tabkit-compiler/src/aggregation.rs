//! Aggregate functions of the group compiler.
//!
//! Each primitive aggregate is an [AggregateInstance]: an accumulator
//! variable with awk templates to initialize, update and finalize it. In the
//! templates `{var}` stands for the accumulator and `{argN}` for the rendered
//! arguments. Instances are named by the [Namer] after their templates and
//! arguments, so identical aggregates share one accumulator.
//!
//! Finalizing leaves the accumulator state intact, so it may run any number
//! of times before the next reset.
//!
//! `avg` and `var` are expanded into arithmetic over primitive aggregates.

use std::sync::Arc;

use error_stack::{bail, ensure};
use itertools::Itertools;
use tracing::debug;

use crate::{ConstValue, Error, ExprRef, NAryOp, Namer, RowExpr};

/// The aggregate functions available in group expressions.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum AggregateFunction {
    #[strum(serialize = "ifmin")]
    IfMin,
    #[strum(serialize = "ifmax")]
    IfMax,
    Min,
    Max,
    Sum,
    Product,
    Concat,
    ConcatUniq,
    ConcatSorted,
    ChainConcatUniq,
    ConcatSample,
    Cnt,
    Avg,
    Median,
    #[strum(to_string = "var", serialize = "variance")]
    Var,
    First,
    Last,
}

/// Whether an aggregate is reset for every group or accumulates over the
/// whole stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AggregateCategory {
    /// Reset whenever the key changes.
    Group,
    /// Never reset.
    Accumulator,
}

impl AggregateCategory {
    pub fn prefix(&self) -> &'static str {
        match self {
            AggregateCategory::Group => "__grp_",
            AggregateCategory::Accumulator => "__acc_",
        }
    }
}

/// An aggregate accumulator and its templates.
#[derive(Clone, Debug, PartialEq)]
pub struct AggregateInstance {
    name: String,
    function: AggregateFunction,
    category: AggregateCategory,
    init: String,
    update: String,
    end: Option<String>,
    args: Vec<ExprRef>,
}

impl AggregateInstance {
    /// The name of the accumulator variable.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn function(&self) -> AggregateFunction {
        self.function
    }

    pub fn category(&self) -> AggregateCategory {
        self.category
    }

    pub fn args(&self) -> &[ExprRef] {
        &self.args
    }

    /// The statement resetting the accumulator.
    pub fn init(&self) -> String {
        self.expand(&self.init)
    }

    /// The statement folding the current row into the accumulator.
    pub fn update(&self) -> String {
        self.expand(&self.update)
    }

    /// The statement computing the final value, for aggregates that need one.
    pub fn end(&self) -> Option<String> {
        self.end.as_ref().map(|end| self.expand(end))
    }

    fn expand(&self, template: &str) -> String {
        let mut expanded = String::with_capacity(template.len());
        let mut rest = template;
        while !rest.is_empty() {
            if let Some(tail) = rest.strip_prefix("{var}") {
                expanded.push_str(&self.name);
                rest = tail;
                continue;
            }
            if let Some((index, tail)) = placeholder_arg(rest) {
                match self.args.get(index) {
                    Some(arg) => expanded.push_str(&arg.to_string()),
                    None => expanded.push_str(&rest[..rest.len() - tail.len()]),
                }
                rest = tail;
                continue;
            }
            let mut chars = rest.chars();
            if let Some(c) = chars.next() {
                expanded.push(c);
            }
            rest = chars.as_str();
        }
        expanded
    }
}

/// Parses a leading `{argN}`, returning `N` and the remaining text.
fn placeholder_arg(text: &str) -> Option<(usize, &str)> {
    let digits = text.strip_prefix("{arg")?;
    let end = digits.find('}')?;
    let index = digits[..end].parse().ok()?;
    Some((index, &digits[end + 1..]))
}

const ACCUMULATE_DELIM: &str = "{var} = \"\"; {var}_nitems = asorti({var}_heap, {var}_sorted);\
for ({var}_i=1; {var}_i<={var}_nitems; {var}_i++) \
{var} = ({var}==\"\")?({var}_sorted[{var}_i]):({var} DELIM {var}_sorted[{var}_i]);\
delete {var}_sorted;";

struct Builder<'a> {
    function: AggregateFunction,
    category: AggregateCategory,
    namer: &'a mut Namer,
}

impl<'a> Builder<'a> {
    fn build(
        &mut self,
        function: AggregateFunction,
        init: impl Into<String>,
        update: impl Into<String>,
        end: Option<String>,
        args: Vec<ExprRef>,
    ) -> ExprRef {
        let init = init.into();
        let update = update.into();
        let rendered: Vec<String> = args.iter().map(|arg| arg.to_string()).collect();
        let key: Vec<&str> = [init.as_str(), update.as_str(), end.as_deref().unwrap_or("")]
            .into_iter()
            .chain(rendered.iter().map(String::as_str))
            .collect();
        let name = self.namer.name_for_parts(self.category.prefix(), &key);
        debug!(name = %name, %function, "aggregate instance");

        Arc::new(RowExpr::Aggregate(AggregateInstance {
            name,
            function,
            category: self.category,
            init,
            update,
            end,
            args,
        }))
    }

    fn function_name(&self) -> &'static str {
        self.function.into()
    }

    fn expect_args(&self, args: &[ExprRef], count: usize) -> error_stack::Result<(), Error> {
        ensure!(
            args.len() == count,
            Error::arity(
                self.function_name(),
                format!("expected {count} arguments, got {}", args.len())
            )
        );
        Ok(())
    }

    /// Splits off the optional trailing delimiter, rendered as an awk string.
    fn delimited(
        &self,
        mut args: Vec<ExprRef>,
        required: usize,
    ) -> error_stack::Result<(Vec<ExprRef>, String), Error> {
        let name = self.function_name();
        ensure!(
            args.len() == required || args.len() == required + 1,
            Error::arity(
                name,
                format!(
                    "expected {required} or {} arguments, got {}",
                    required + 1,
                    args.len()
                )
            )
        );
        let delim = if args.len() > required {
            args.pop()
        } else {
            None
        };
        let delim = match delim {
            None => ",".to_owned(),
            Some(delim) => match delim.as_str_const() {
                Some(delim) => delim.to_owned(),
                None => bail!(Error::argument_kind(
                    name,
                    format!("delimiter must be a string literal, got '{delim}'")
                )),
            },
        };
        Ok((args, ConstValue::Str(delim).to_string()))
    }

    fn sum(&mut self, args: Vec<ExprRef>) -> ExprRef {
        self.build(
            AggregateFunction::Sum,
            "{var} = 0;",
            "{var} += {arg0};",
            None,
            args,
        )
    }

    fn cnt(&mut self) -> ExprRef {
        self.build(
            AggregateFunction::Cnt,
            "{var} = 0;",
            "{var} += 1;",
            None,
            vec![],
        )
    }

    fn expand(&mut self, args: Vec<ExprRef>) -> error_stack::Result<ExprRef, Error> {
        use AggregateFunction::*;

        let function = self.function;
        let aggregate = match function {
            IfMin | IfMax => {
                self.expect_args(&args, 2)?;
                let (seed, cmp) = if function == IfMin {
                    ("10^1000000", "<")
                } else {
                    ("-10^1000000", ">")
                };
                self.build(
                    function,
                    format!("{{var}}_cmp = {seed}; {{var}} = \"\";"),
                    format!(
                        "__tmp__={{arg0}}; if(__tmp__{cmp}{{var}}_cmp){{{{var}}_cmp=__tmp__; {{var}}={{arg1}}}};"
                    ),
                    None,
                    args,
                )
            }
            // The first value seeds the accumulator.
            Min | Max => {
                self.expect_args(&args, 1)?;
                let cmp = if function == Min { "<" } else { ">" };
                self.build(
                    function,
                    "{var}_init = 0",
                    format!(
                        "__tmp__={{arg0}};if ({{var}}_init==0) {{{{var}}_init=1; {{var}}=__tmp__;}}if(__tmp__{cmp}{{var}}){{{{var}}=__tmp__}};"
                    ),
                    None,
                    args,
                )
            }
            Sum => {
                self.expect_args(&args, 1)?;
                self.sum(args)
            }
            Product => {
                self.expect_args(&args, 1)?;
                self.build(function, "{var} = 1;", "{var} *= {arg0};", None, args)
            }
            Cnt => {
                self.expect_args(&args, 0)?;
                self.cnt()
            }
            Avg => {
                self.expect_args(&args, 1)?;
                let sum = self.sum(args);
                let cnt = self.cnt();
                RowExpr::op(NAryOp::Div, [sum, cnt])
            }
            Var => {
                self.expect_args(&args, 1)?;
                let squared = RowExpr::op(NAryOp::Pow, [args[0].clone(), RowExpr::int(2)]);
                let sum_of_squares = self.sum(vec![squared]);
                let sum = self.sum(args);
                let cnt = self.cnt();
                let mean_of_squares = RowExpr::op(NAryOp::Div, [sum_of_squares, cnt.clone()]);
                let mean = RowExpr::op(NAryOp::Div, [sum, cnt]);
                RowExpr::op(
                    NAryOp::Sub,
                    [
                        mean_of_squares,
                        RowExpr::op(NAryOp::Pow, [mean, RowExpr::int(2)]),
                    ],
                )
            }
            Median => {
                self.expect_args(&args, 1)?;
                self.build(
                    function,
                    "delete {var}_arr; {var}_cnt = 0;",
                    "{var}_arr[++{var}_cnt] = {arg0};",
                    Some(
                        "__tmp__ = asort({var}_arr) / 2; {var} = int(__tmp__) == __tmp__ ? \
                         ({var}_arr[int(__tmp__)] + {var}_arr[int(__tmp__) + 1]) / 2 : \
                         {var}_arr[int(__tmp__) + 1]"
                            .to_owned(),
                    ),
                    args,
                )
            }
            First => {
                self.expect_args(&args, 1)?;
                self.build(
                    function,
                    "{var} = \"\"; {var}_unset = 1;",
                    "if({var}_unset) {{var} = {arg0}; {var}_unset = 0;}",
                    None,
                    args,
                )
            }
            Last => {
                self.expect_args(&args, 1)?;
                self.build(function, "{var} = \"\";", "{var} = {arg0};", None, args)
            }
            Concat => {
                let (args, delim) = self.delimited(args, 1)?;
                let update = [
                    "{var} = ({var}==\"\")?({arg0}):({var} ",
                    &delim,
                    " {arg0});",
                ]
                .concat();
                self.build(function, "{var} = \"\";", update, None, args)
            }
            ConcatUniq => {
                let (args, delim) = self.delimited(args, 1)?;
                self.build(
                    function,
                    "{var} = \"\"; delete {var}_heap;",
                    "{var}_heap[{arg0}]=\"\"",
                    Some(ACCUMULATE_DELIM.replace("DELIM", &delim)),
                    args,
                )
            }
            ConcatSorted => {
                let (args, delim) = self.delimited(args, 1)?;
                let end = [
                    "{var} = \"\"; {var}_nitems = asorti({var}_heap, {var}_sorted); \
                     for({var}_i=1; {var}_i<={var}_nitems; {var}_i++) {\
                     for ({var}_j=0; {var}_j<{var}_heap_count[{var}_sorted[{var}_i]]; {var}_j++) {\
                     if ({var} == \"\") {{var} = {var}_sorted[{var}_i];} \
                     else {{var} = {var} ",
                    &delim,
                    " {var}_sorted[{var}_i];}}} \
                     delete {var}_sorted",
                ]
                .concat();
                self.build(
                    function,
                    "{var} = \"\"; delete {var}_heap; delete {var}_heap_count;",
                    "{var}_heap[{arg0}]=\"\"; \
                     if ({arg0} in {var}_heap_count) {{var}_heap_count[{arg0}]++;} \
                     else {{var}_heap_count[{arg0}] = 1;}",
                    Some(end),
                    args,
                )
            }
            ChainConcatUniq => {
                let (args, delim) = self.delimited(args, 1)?;
                let update = [
                    "split({arg0}, {var}_unjoin, ",
                    &delim,
                    ");for ({var}_item in {var}_unjoin) {var}_heap[{var}_unjoin[{var}_item]]=\"\"",
                ]
                .concat();
                self.build(
                    function,
                    "{var} = \"\"; delete {var}_heap;",
                    update,
                    Some(ACCUMULATE_DELIM.replace("DELIM", &delim)),
                    args,
                )
            }
            ConcatSample => {
                let (mut args, delim) = self.delimited(args, 2)?;
                let limit = args.pop();
                let limit = match limit.as_deref().and_then(RowExpr::as_const) {
                    Some(ConstValue::Int(limit)) => *limit,
                    _ => bail!(Error::argument_kind(
                        self.function_name(),
                        "limit must be an integer literal"
                    )),
                };
                let update = [
                    "if (!({arg0} in {var}_heap) && {var}_cnt<",
                    &limit.to_string(),
                    ") {{var}_heap[{arg0}]=\"\"; {var}_cnt += 1;}",
                ]
                .concat();
                self.build(
                    function,
                    "{var} = \"\"; {var}_cnt=0; delete {var}_heap;",
                    update,
                    Some(ACCUMULATE_DELIM.replace("DELIM", &delim)),
                    args,
                )
            }
        };
        Ok(aggregate)
    }
}

/// Expand a call to an aggregate function over already lowered arguments.
pub(crate) fn expand_aggregate(
    function: AggregateFunction,
    category: AggregateCategory,
    args: Vec<ExprRef>,
    namer: &mut Namer,
) -> error_stack::Result<ExprRef, Error> {
    let mut builder = Builder {
        function,
        category,
        namer,
    };
    builder.expand(args)
}

/// Every distinct aggregate instance of `category` referenced by `exprs`, in
/// order of first appearance.
pub(crate) fn collect_aggregates<'a>(
    exprs: impl IntoIterator<Item = &'a ExprRef>,
    category: AggregateCategory,
) -> Vec<&'a AggregateInstance> {
    exprs
        .into_iter()
        .flat_map(|expr| expr.find(|node| matches!(node, RowExpr::Aggregate(_))))
        .filter_map(|node| match node {
            RowExpr::Aggregate(aggregate) if aggregate.category == category => Some(aggregate),
            _ => None,
        })
        .unique_by(|aggregate| aggregate.name.clone())
        .collect()
}
