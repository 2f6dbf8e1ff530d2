use crate::ast_to_ir::Lowering;
use crate::functions::function::BoundArguments;
use crate::functions::{Registry, Snippet};
use crate::{Error, ExprRef, NAryOp, RowExpr};

pub(super) fn register(registry: &mut Registry) {
    registry.register("domain(url)", domain);
    registry.register("netlocator(url)", netlocator);
    registry.register("join(delim, *strs)", join);
    registry.register("strip(value)", strip);
    registry.register("unjoin_count(delim, value)", unjoin_count);
    registry.register("unjoin(delim, value, index)", unjoin);
    registry.register("uniq(delim, value)", uniq);
}

/// Extract the host of an http(s) url with `gensub`.
fn host(pattern: &str, url: &ExprRef) -> ExprRef {
    RowExpr::call(
        "gensub",
        [
            RowExpr::string(pattern),
            RowExpr::string("\\1"),
            RowExpr::string(""),
            url.clone(),
        ],
    )
}

fn domain(_: &mut Lowering<'_, '_>, args: BoundArguments) -> error_stack::Result<ExprRef, Error> {
    Ok(host("^https?://([^/?:#]+).*$", args.value(0)))
}

fn netlocator(
    _: &mut Lowering<'_, '_>,
    args: BoundArguments,
) -> error_stack::Result<ExprRef, Error> {
    Ok(host("^https?://([^/?#]+).*$", args.value(0)))
}

fn join(_: &mut Lowering<'_, '_>, args: BoundArguments) -> error_stack::Result<ExprRef, Error> {
    if args.rest().is_empty() {
        return Ok(RowExpr::string(""));
    }
    let delim = args.value(0);
    let mut parts = Vec::with_capacity(args.rest().len() * 2);
    for value in args.rest() {
        if !parts.is_empty() {
            parts.push(delim.clone());
        }
        parts.push(value.clone());
    }
    Ok(RowExpr::op(NAryOp::Concat, parts))
}

fn strip(lowering: &mut Lowering<'_, '_>, args: BoundArguments) -> error_stack::Result<ExprRef, Error> {
    let value = lowering.helper_var("_strip", args.value(0).clone())?;
    Ok(RowExpr::call(
        "gensub",
        [
            RowExpr::string("^[[:space:]]+|[[:space:]]+$"),
            RowExpr::string(""),
            RowExpr::string("G"),
            value,
        ],
    ))
}

/// Split `value` on `delim` once per row, returning the array and the number
/// of elements.
///
/// The array is only filled once the count is evaluated, so the array is
/// a side effect of the count variable.
fn split(
    lowering: &mut Lowering<'_, '_>,
    delim: &ExprRef,
    value: &ExprRef,
) -> error_stack::Result<(ExprRef, ExprRef), Error> {
    let value_text = value.to_string();
    let delim_text = delim.to_string();
    let parts = [value_text.as_str(), delim_text.as_str()];
    let count_name = lowering.name_for_parts("_spcnt", &parts);
    let array_name = lowering.name_for_parts("_split", &parts);

    let count = lowering.bind_helper(
        &count_name,
        RowExpr::assign(
            count_name.clone(),
            RowExpr::call(
                "split",
                [value.clone(), RowExpr::builtin(array_name.clone()), delim.clone()],
            ),
        ),
    )?;
    let array = RowExpr::side_effect_var(array_name, count.clone());
    Ok((array, count))
}

fn unjoin_count(
    lowering: &mut Lowering<'_, '_>,
    args: BoundArguments,
) -> error_stack::Result<ExprRef, Error> {
    let (_, count) = split(lowering, args.value(0), args.value(1))?;
    Ok(count)
}

fn unjoin(lowering: &mut Lowering<'_, '_>, args: BoundArguments) -> error_stack::Result<ExprRef, Error> {
    let (array, _) = split(lowering, args.value(0), args.value(1))?;
    let index = RowExpr::op(NAryOp::Add, [args.value(2).clone(), RowExpr::int(1)]);
    Ok(RowExpr::subscript(array, index))
}

fn uniq(lowering: &mut Lowering<'_, '_>, args: BoundArguments) -> error_stack::Result<ExprRef, Error> {
    lowering.require(Snippet::Uniq);
    let value = lowering.helper_var("_uniq", args.value(1).clone())?;
    Ok(RowExpr::call("uniq", [args.value(0).clone(), value]))
}
