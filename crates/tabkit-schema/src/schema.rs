use std::collections::BTreeMap;

use error_stack::ensure;
use itertools::Itertools;

use crate::{Error, Field, FieldOrder};

/// Free-form metadata carried in the `#META:` zone of a header.
pub type Meta = BTreeMap<String, serde_yaml::Value>;

/// The description of a stream: typed fields, sort order, size and metadata.
///
/// Field position is meaningful; it is the 1-based column a field is read
/// from. Every field in the sort order must be one of the fields, and field
/// names are unique.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Schema {
    fields: Vec<Field>,
    order: Vec<FieldOrder>,
    size: Option<u64>,
    meta: Meta,
}

impl Schema {
    pub fn try_new(fields: Vec<Field>, order: Vec<FieldOrder>) -> error_stack::Result<Self, Error> {
        let duplicates: Vec<_> = fields.iter().map(Field::name).duplicates().collect();
        ensure!(
            duplicates.is_empty(),
            Error::ConflictingFieldNames(
                duplicates
                    .iter()
                    .format_with(", ", |name, f| f(&format_args!("'{name}'")))
                    .to_string()
            )
        );

        for order_field in &order {
            ensure!(
                fields.iter().any(|field| field.name() == order_field.name()),
                Error::UnknownOrderField(order_field.name().to_owned())
            );
        }

        Ok(Self {
            fields,
            order,
            size: None,
            meta: Meta::new(),
        })
    }

    pub fn with_size(mut self, size: Option<u64>) -> Self {
        self.size = size;
        self
    }

    pub fn with_meta(mut self, meta: Meta) -> Self {
        self.meta = meta;
        self
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn order(&self) -> &[FieldOrder] {
        &self.order
    }

    pub fn size(&self) -> Option<u64> {
        self.size
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    /// Returns the 0-based position of the named field.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.name() == name)
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name() == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field_index(name).is_some()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields.iter().map(Field::name)
    }

    /// Returns true if the stream is sorted by `required` or by an order that
    /// starts with it.
    pub fn is_ordered_by(&self, required: &[FieldOrder]) -> bool {
        self.order.len() >= required.len() && self.order.iter().zip(required).all(|(a, b)| a == b)
    }

    /// Returns true if the leading sort fields are exactly `names`, ignoring
    /// sort kind and direction.
    pub fn fields_are_ordered<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> bool {
        let names: Vec<_> = names.into_iter().collect();
        self.order.len() >= names.len()
            && self
                .order
                .iter()
                .zip(names)
                .all(|(order, name)| order.name() == name)
    }
}
