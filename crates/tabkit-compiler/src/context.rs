use std::sync::Arc;

use error_stack::ensure;
use hashbrown::HashMap;
use tabkit_schema::Schema;
use tracing::debug;

use crate::{ConstValue, Error, ExprRef, NAryOp, RowExpr};

/// A scope binding names to their defining statements.
///
/// Bindings are kept in insertion order, which becomes the projection order
/// of the outputs. Each name is bound at most once.
#[derive(Debug)]
pub struct ExprContext<'s> {
    schema: &'s Schema,
    bindings: HashMap<String, ExprRef>,
    order: Vec<String>,
}

impl<'s> ExprContext<'s> {
    pub fn new(schema: &'s Schema) -> Self {
        Self {
            schema,
            bindings: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn schema(&self) -> &'s Schema {
        self.schema
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.schema.has_field(name)
    }

    /// A reference to the named field of the schema.
    pub fn field(&self, name: &str) -> Option<ExprRef> {
        let position = self.schema.field_index(name)?;
        let field = &self.schema.fields()[position];
        Some(Arc::new(RowExpr::Field {
            name: name.to_owned(),
            position: position + 1,
            field_type: field.field_type(),
        }))
    }

    pub fn has_var(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// A reference to the named binding.
    pub fn var(&self, name: &str) -> Option<ExprRef> {
        let binding = self.bindings.get(name)?;
        Some(RowExpr::var(name, binding.clone()))
    }

    /// Bind `name` to `statement`.
    ///
    /// The binding is appended to the order, or inserted at `position`.
    pub fn bind(
        &mut self,
        name: &str,
        statement: ExprRef,
        position: Option<usize>,
    ) -> error_stack::Result<(), Error> {
        ensure!(
            !self.bindings.contains_key(name),
            Error::DuplicateBinding(name.to_owned())
        );
        debug!(name, statement = %statement, "bound expression");

        self.bindings.insert(name.to_owned(), statement);
        match position {
            Some(position) => self
                .order
                .insert(position.min(self.order.len()), name.to_owned()),
            None => self.order.push(name.to_owned()),
        }
        Ok(())
    }

    /// The statement bound to `name`.
    pub fn binding(&self, name: &str) -> Option<&ExprRef> {
        self.bindings.get(name)
    }

    /// The value bound to `name`: the right side of an assignment, or the
    /// bound statement itself.
    pub fn get_value(&self, name: &str) -> Option<&ExprRef> {
        self.bindings.get(name).map(|binding| match binding.as_ref() {
            RowExpr::Assign { value, .. } => value,
            _ => binding,
        })
    }

    /// Iterate over the bindings in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ExprRef)> + '_ {
        self.order.iter().filter_map(|name| {
            self.bindings
                .get(name)
                .map(|binding| (name.as_str(), binding))
        })
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// The schema field `name` passes through unchanged, if any.
    ///
    /// A binding passes a field through if it assigns the field directly,
    /// concatenated with an empty string, or through a chain of variables.
    pub fn traces_to_field(&self, name: &str) -> Option<&str> {
        self.bindings.get(name).and_then(|binding| passthrough_field(binding))
    }
}

fn passthrough_field(statement: &RowExpr) -> Option<&str> {
    let RowExpr::Assign { value, .. } = statement else {
        return None;
    };
    match value.as_ref() {
        RowExpr::Field { name, .. } => Some(name),
        RowExpr::Op {
            op: NAryOp::Concat,
            args,
        } => match args.as_slice() {
            [field, suffix] => match (field.as_ref(), suffix.as_ref()) {
                (RowExpr::Field { name, .. }, RowExpr::Const(ConstValue::Str(suffix)))
                    if suffix.is_empty() =>
                {
                    Some(name)
                }
                _ => None,
            },
            _ => None,
        },
        RowExpr::Var { binding, .. } => passthrough_field(binding),
        _ => None,
    }
}
