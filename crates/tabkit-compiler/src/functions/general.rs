use crate::ast_to_ir::Lowering;
use crate::functions::function::BoundArguments;
use crate::functions::Registry;
use crate::{Error, ExprRef, NAryOp, RowExpr};

pub(super) fn register(registry: &mut Registry) {
    registry.register("shell(cmd)", shell);
}

/// Read the first line printed by a command.
///
/// The command runs when its variable is first bound. Calls with the same
/// command text share the variable, so the command runs once per run.
fn shell(lowering: &mut Lowering<'_, '_>, args: BoundArguments) -> error_stack::Result<ExprRef, Error> {
    let cmd = args.value(0);
    let name = lowering.name_for("_sh", &cmd.to_string());
    let statement = RowExpr::op(
        NAryOp::Juxtapose,
        [
            cmd.clone(),
            RowExpr::builtin("|"),
            RowExpr::builtin("getline"),
            RowExpr::builtin(name.clone()),
        ],
    );
    let var = lowering.bind_helper(&name, statement)?;
    Ok(RowExpr::side_effect_var(name, var))
}
