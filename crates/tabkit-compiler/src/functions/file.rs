//! Lookups in tab separated files loaded once per run.

use crate::ast_to_ir::Lowering;
use crate::functions::function::BoundArguments;
use crate::functions::{Registry, Snippet};
use crate::{Error, ExprRef, RowExpr};

pub(super) fn register(registry: &mut Registry) {
    registry.register("map_from_file(fname, key, default)", map_from_file);
    registry.register("is_in_file(fname, key)", is_in_file);
}

/// Call the snippet `function` with each argument held in a helper variable.
fn lookup(
    lowering: &mut Lowering<'_, '_>,
    function: &str,
    args: &[&ExprRef],
) -> error_stack::Result<ExprRef, Error> {
    let prefix = format!("_{function}");
    let mut values = Vec::with_capacity(args.len());
    for arg in args {
        values.push(lowering.helper_var(&prefix, (*arg).clone())?);
    }
    Ok(RowExpr::call(function, values))
}

fn map_from_file(
    lowering: &mut Lowering<'_, '_>,
    args: BoundArguments,
) -> error_stack::Result<ExprRef, Error> {
    lowering.require(Snippet::MapFromFile);
    lookup(
        lowering,
        "map_from_file",
        &[args.value(0), args.value(1), args.value(2)],
    )
}

fn is_in_file(
    lowering: &mut Lowering<'_, '_>,
    args: BoundArguments,
) -> error_stack::Result<ExprRef, Error> {
    lowering.require(Snippet::IsInFile);
    lookup(lowering, "is_in_file", &[args.value(0), args.value(1)])
}
