use error_stack::report;

use crate::ast_to_ir::Lowering;
use crate::functions::function::BoundArguments;
use crate::functions::{Registry, Snippet};
use crate::{Error, ExprRef, NAryOp, RowExpr};

pub(super) fn register(registry: &mut Registry) {
    registry.register("min(*values)", min);
    registry.register("max(*values)", max);
    registry.register("abs(value)", abs);
    registry.register("crc32(value)", crc32);
}

/// Reduce `values` with a balanced tree of comparisons.
///
/// Each node selects the left side if `op` holds between the sides. Leaves
/// are held in helper variables so each value is computed once.
fn comparison_tree(
    lowering: &mut Lowering<'_, '_>,
    function: &str,
    op: NAryOp,
    values: &[ExprRef],
) -> error_stack::Result<ExprRef, Error> {
    match values {
        [] => Err(report!(Error::arity(
            function,
            "expected at least one argument"
        ))),
        [value] => lowering.helper_var(&format!("_{function}"), value.clone()),
        values => {
            let (left, right) = values.split_at(values.len() / 2);
            let left = comparison_tree(lowering, function, op, left)?;
            let right = comparison_tree(lowering, function, op, right)?;
            Ok(RowExpr::conditional(
                RowExpr::op(op, [left.clone(), right.clone()]),
                left,
                right,
            ))
        }
    }
}

fn min(lowering: &mut Lowering<'_, '_>, args: BoundArguments) -> error_stack::Result<ExprRef, Error> {
    comparison_tree(lowering, "min", NAryOp::Lt, args.rest())
}

fn max(lowering: &mut Lowering<'_, '_>, args: BoundArguments) -> error_stack::Result<ExprRef, Error> {
    comparison_tree(lowering, "max", NAryOp::Gt, args.rest())
}

fn abs(lowering: &mut Lowering<'_, '_>, args: BoundArguments) -> error_stack::Result<ExprRef, Error> {
    let value = lowering.helper_var("_abs", args.value(0).clone())?;
    Ok(RowExpr::conditional(
        RowExpr::op(NAryOp::Lt, [value.clone(), RowExpr::int(0)]),
        RowExpr::call("-", [value.clone()]),
        value,
    ))
}

fn crc32(lowering: &mut Lowering<'_, '_>, args: BoundArguments) -> error_stack::Result<ExprRef, Error> {
    lowering.require(Snippet::Crc32);
    let value = lowering.helper_var("_crc32", args.value(0).clone())?;
    Ok(RowExpr::call("crc32", [value]))
}

#[cfg(test)]
mod tests {
    use tabkit_schema::{Field, FieldType, Schema};

    use crate::ast_to_ir::{parse_statements, Lowering};
    use crate::{Error, ExprContext, ExprRef, Namer, RowExpr, Snippets};

    fn schema() -> Schema {
        Schema::try_new(
            ["a", "b", "c", "d", "e"]
                .into_iter()
                .map(|name| Field::new(name, FieldType::Int))
                .collect(),
            vec![],
        )
        .unwrap()
    }

    fn lower(source: &str) -> (error_stack::Result<ExprRef, Error>, Vec<String>, Snippets) {
        let schema = schema();
        let mut ctx = ExprContext::new(&schema);
        let mut namer = Namer::new();
        let mut snippets = Snippets::default();
        let stmt = parse_statements(source).unwrap().remove(0);
        let value = Lowering::new(&mut ctx, &mut namer, &mut snippets).lower_value(&stmt);
        let helpers = ctx.iter().map(|(_, stmt)| stmt.to_string()).collect();
        (value, helpers, snippets)
    }

    fn depth(expr: &RowExpr) -> usize {
        match expr {
            RowExpr::Conditional { then, otherwise, .. } => 1 + depth(then).max(depth(otherwise)),
            _ => 0,
        }
    }

    #[test]
    fn test_min_max_of_fields() {
        let (value, helpers, _) = lower("min(a, b)");
        insta::assert_display_snapshot!(value.unwrap(), @"(($1 < $2)?$1:$2)");
        assert!(helpers.is_empty());

        let (value, _, _) = lower("max(a, b, c)");
        insta::assert_display_snapshot!(value.unwrap(), @"(($1 > (($2 > $3)?$2:$3))?$1:(($2 > $3)?$2:$3))");

        let (value, _, _) = lower("max(a)");
        insta::assert_display_snapshot!(value.unwrap(), @"$1");
    }

    #[test]
    fn test_min_tree_is_balanced() {
        let (value, _, _) = lower("min(a, b, c, d, e)");
        assert_eq!(depth(&value.unwrap()), 3);
    }

    #[test]
    fn test_min_leaves_are_helpers() {
        let (value, helpers, _) = lower("min(a + 1, b, a + 1)");
        insta::assert_display_snapshot!(value.unwrap(), @"((_min0 < (($2 < _min0)?$2:_min0))?_min0:(($2 < _min0)?$2:_min0))");
        assert_eq!(helpers, vec!["_min0 = ($1 + 1)"]);
    }

    #[test]
    fn test_min_requires_arguments() {
        let (value, _, _) = lower("min()");
        insta::assert_display_snapshot!(value.unwrap_err().current_context(), @"wrong number of arguments to 'min': expected at least one argument");
    }

    #[test]
    fn test_abs() {
        let (value, helpers, _) = lower("abs(a - b)");
        insta::assert_display_snapshot!(value.unwrap(), @"((_abs0 < 0)?-(_abs0):_abs0)");
        assert_eq!(helpers, vec!["_abs0 = ($1 - $2)"]);
    }

    #[test]
    fn test_crc32() {
        let (value, helpers, snippets) = lower("crc32(a)");
        insta::assert_display_snapshot!(value.unwrap(), @"crc32($1)");
        assert!(helpers.is_empty());
        let names: Vec<_> = snippets.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["crc32"]);

        let (value, helpers, _) = lower("crc32((a, b))");
        insta::assert_display_snapshot!(value.unwrap(), @"crc32(_crc320)");
        assert_eq!(helpers, vec!["_crc320 = ($1  $2)"]);
    }
}
