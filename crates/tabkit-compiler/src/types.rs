//! Inference of output field types.

use tabkit_schema::FieldType;

use crate::{AggregateFunction, ExprRef, NAryOp, RowExpr};

/// Infer the type of the values produced by `expr`.
pub fn infer_type(expr: &RowExpr) -> FieldType {
    match expr {
        RowExpr::Const(value) => value.field_type(),
        RowExpr::Field { field_type, .. } => *field_type,
        RowExpr::Var { binding, .. } => match binding.as_ref() {
            RowExpr::Assign { value, .. } => infer_type(value),
            statement => infer_type(statement),
        },
        RowExpr::Op { op, args } => infer_op_type(*op, args),
        RowExpr::Conditional {
            then, otherwise, ..
        } => {
            let branches = [infer_type(then), infer_type(otherwise)];
            [
                FieldType::Any,
                FieldType::Str,
                FieldType::Float,
                FieldType::Int,
            ]
            .into_iter()
            .find(|preferred| branches.contains(preferred))
            .unwrap_or(FieldType::Any)
        }
        RowExpr::Call { function, args } => infer_call_type(function, args),
        RowExpr::Aggregate(aggregate) => {
            let arg_type = |index: usize| {
                aggregate
                    .args()
                    .get(index)
                    .map_or(FieldType::Any, |arg| infer_type(arg))
            };
            match aggregate.function() {
                AggregateFunction::IfMin | AggregateFunction::IfMax => arg_type(1),
                AggregateFunction::First | AggregateFunction::Last => arg_type(0),
                AggregateFunction::Min
                | AggregateFunction::Max
                | AggregateFunction::Sum
                | AggregateFunction::Product
                | AggregateFunction::Median
                | AggregateFunction::Var => match arg_type(0) {
                    FieldType::Int => FieldType::Int,
                    _ => FieldType::Float,
                },
                AggregateFunction::Cnt => FieldType::Int,
                AggregateFunction::Avg => FieldType::Float,
                AggregateFunction::Concat
                | AggregateFunction::ConcatUniq
                | AggregateFunction::ConcatSorted
                | AggregateFunction::ChainConcatUniq
                | AggregateFunction::ConcatSample => FieldType::Str,
            }
        }
        RowExpr::Builtin(_)
        | RowExpr::SideEffectVar { .. }
        | RowExpr::Subscript { .. }
        | RowExpr::Assign { .. } => FieldType::Any,
    }
}

fn infer_op_type(op: NAryOp, args: &[ExprRef]) -> FieldType {
    if op.is_predicate() {
        return FieldType::Bool;
    }
    let types: Vec<_> = args.iter().map(|arg| infer_type(arg)).collect();
    let any = types.contains(&FieldType::Any);
    match op {
        NAryOp::Concat if any => FieldType::Any,
        NAryOp::Concat => FieldType::Str,
        NAryOp::Add | NAryOp::Sub | NAryOp::Mul | NAryOp::Pow | NAryOp::Mod => {
            if any {
                FieldType::Any
            } else if types.contains(&FieldType::Float) {
                FieldType::Float
            } else {
                FieldType::Int
            }
        }
        NAryOp::Div if any => FieldType::Any,
        NAryOp::Div => FieldType::Float,
        _ => FieldType::Any,
    }
}

fn infer_call_type(function: &str, args: &[ExprRef]) -> FieldType {
    match function {
        "int" | "length" | "mktime" | "index" | "match" | "split" | "crc32" | "and" | "or"
        | "compl" | "lshift" | "rshift" => FieldType::Int,
        "sprintf" | "substr" | "tolower" | "toupper" | "gensub" | "uniq" => FieldType::Str,
        "log" | "exp" | "sqrt" | "sin" | "cos" | "atan2" | "rand" => FieldType::Float,
        "!" => FieldType::Bool,
        "-" => args.first().map_or(FieldType::Any, |arg| infer_type(arg)),
        _ => FieldType::Any,
    }
}
