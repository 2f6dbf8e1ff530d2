//! Compilation of filters and projections over single rows.

use error_stack::{ensure, ResultExt};
use hashbrown::{HashMap, HashSet};
use tabkit_schema::{Field, FieldOrder, Schema};
use tabkit_syntax::Stmt;
use tracing::{debug, info_span};

use crate::ast_to_ir::{parse_statements, Lowering};
use crate::{infer_type, Block, Error, ExprContext, ExprRef, NAryOp, Namer, Program, RowExpr, Snippets};

/// Projection directive binding every field of the input.
const ALL_FIELDS: &str = "__all__";
/// Projection directive binding every field of the input not yet bound.
const REST_FIELDS: &str = "__rest__";

/// The statement setting the output field separator.
pub(crate) const SET_OUTPUT_SEPARATOR: &str = "OFS=\"\\t\"";

/// A compiled awk program and the schema of its output.
#[derive(Clone, Debug, PartialEq)]
pub struct Compiled {
    program: Program,
    schema: Schema,
}

impl Compiled {
    pub(crate) fn new(program: Program, schema: Schema) -> Self {
        Self { program, schema }
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn into_parts(self) -> (Program, Schema) {
        (self.program, self.schema)
    }
}

/// Compile `filters` and projection statements `maps` over rows of `schema`.
///
/// Rows are printed if all filters hold. Each bound name not starting with
/// `_` becomes an output field, in the order bound. With no projection
/// statements every input field is output unchanged.
pub fn compile_filter_map(
    schema: &Schema,
    filters: &[&str],
    maps: &[&str],
) -> error_stack::Result<Compiled, Error> {
    let _span = info_span!("compile_filter_map", ?filters, ?maps).entered();

    let mut ctx = ExprContext::new(schema);
    let mut namer = Namer::new();
    let mut snippets = Snippets::default();
    let mut lowering = Lowering::new(&mut ctx, &mut namer, &mut snippets);

    let maps = if maps.is_empty() { &[ALL_FIELDS][..] } else { maps };
    for source in maps {
        for stmt in parse_statements(source)? {
            match directive(&stmt) {
                Some(ALL_FIELDS) => {
                    for field in schema.fields() {
                        bind_field(&mut lowering, field.name())?;
                    }
                }
                Some(REST_FIELDS) => {
                    for field in schema.fields() {
                        if !lowering.ctx().has_var(field.name()) {
                            bind_field(&mut lowering, field.name())?;
                        }
                    }
                }
                _ => {
                    let (name, statement) = lowering
                        .lower_assignment(&stmt)
                        .attach_printable_lazy(|| format!("projection: {source}"))?;
                    lowering.bind(&name, statement)?;
                }
            }
        }
    }

    let mut conditions = Vec::new();
    for source in filters {
        for stmt in parse_statements(source)? {
            let condition = lowering
                .lower_value(&stmt)
                .attach_printable_lazy(|| format!("filter: {source}"))?;
            conditions.push(condition);
        }
    }
    let filter = match conditions.len() {
        0 => None,
        1 => conditions.pop(),
        _ => Some(RowExpr::op(NAryOp::And, conditions)),
    };

    let projection = project(&ctx, filter.as_ref(), schema.order())?;
    let size = if filter.is_none() { schema.size() } else { None };
    let derived = Schema::try_new(projection.fields, projection.order)
        .change_context(Error::SchemaValidation)?
        .with_meta(schema.meta().clone())
        .with_size(size);
    debug!(schema = %derived, "derived output schema");

    let program = Program {
        snippets,
        begin: Block::from_iter([SET_OUTPUT_SEPARATOR]),
        main: projection.main,
        end: Block::new(),
    };
    Ok(Compiled::new(program, derived))
}

/// The directive named by a bare `__all__` or `__rest__` statement.
fn directive(stmt: &Stmt) -> Option<&str> {
    match stmt {
        Stmt::Expr(expr) => expr
            .as_name()
            .filter(|name| *name == ALL_FIELDS || *name == REST_FIELDS),
        Stmt::Assign { .. } => None,
    }
}

fn bind_field(lowering: &mut Lowering<'_, '_>, name: &str) -> error_stack::Result<(), Error> {
    match lowering.ctx().field(name) {
        Some(field) => lowering.bind(name, RowExpr::assign(name, field)),
        None => Ok(()),
    }
}

/// The statements printing the outputs of a context, and their schema.
pub(crate) struct Projection {
    pub main: Block,
    pub fields: Vec<Field>,
    pub order: Vec<FieldOrder>,
}

/// Render the bindings of `assigned`-excluded variables referenced by
/// `exprs`, and mark every referenced variable as assigned.
///
/// Names starting with `__` belong to the group machinery and are never
/// assigned here.
fn assignments_for<'e>(
    ctx: &ExprContext<'_>,
    exprs: impl IntoIterator<Item = &'e ExprRef>,
    assigned: &mut HashSet<String>,
) -> Vec<String> {
    let referenced: HashSet<&str> = exprs
        .into_iter()
        .flat_map(|expr| expr.referenced_vars())
        .collect();
    let statements = ctx
        .iter()
        .filter(|(name, _)| {
            !name.starts_with("__") && referenced.contains(name) && !assigned.contains(*name)
        })
        .map(|(_, statement)| statement.to_string())
        .collect();
    assigned.extend(referenced.into_iter().map(str::to_owned));
    statements
}

/// Build the statements printing every output of `ctx` for rows matching
/// `filter`.
///
/// Bindings needed by the filter are computed before it, the others only
/// for matching rows. The sort order of the input carries through as long as
/// its fields are passed through to outputs.
pub(crate) fn project(
    ctx: &ExprContext<'_>,
    filter: Option<&ExprRef>,
    order: &[FieldOrder],
) -> error_stack::Result<Projection, Error> {
    let mut assigned = HashSet::new();
    let before = match filter {
        Some(filter) => assignments_for(ctx, [filter], &mut assigned),
        None => Vec::new(),
    };
    let after = assignments_for(ctx, ctx.iter().map(|(_, binding)| binding), &mut assigned);

    let mut outputs = Vec::new();
    let mut fields = Vec::new();
    let mut kept_fields: HashMap<&str, &str> = HashMap::new();
    for (name, binding) in ctx.iter().filter(|(name, _)| !name.starts_with('_')) {
        let output = if assigned.contains(name) {
            RowExpr::var(name, binding.clone())
        } else {
            match ctx.get_value(name) {
                Some(value) => value.clone(),
                None => binding.clone(),
            }
        };
        fields.push(Field::new(name, infer_type(&output)));
        outputs.push(output.to_string());

        if let Some(field) = ctx.traces_to_field(name) {
            if kept_fields.get(field).map_or(true, |kept| kept != &field) {
                kept_fields.insert(field, name);
            }
        }
    }
    ensure!(!outputs.is_empty(), Error::EmptyProjection);

    let order = order
        .iter()
        .map_while(|order| {
            kept_fields.get(order.name()).map(|name| {
                FieldOrder::new(*name, order.sort_kind(), order.is_descending())
            })
        })
        .collect();

    let mut body = Block::new();
    if !after.is_empty() {
        body.line(after.join("; "));
    }
    body.line(format!("print({})", outputs.join(",")));

    let mut main = Block::new();
    if !before.is_empty() {
        main.line(before.join("; "));
    }
    match filter {
        Some(filter) => main.head(format!("if({filter})"), body),
        None => main.extend(body),
    }

    Ok(Projection {
        main,
        fields,
        order,
    })
}
