//! The single-line textual header describing a stream.
//!
//! ```text
//! # shows:int clicks:int ctr:float url #ORDER: url ctr:desc:num #SIZE: 12 #META: {source: log}
//! ```
//!
//! The first zone lists the fields. The optional `ORDER:`, `SIZE:` and
//! `META:` zones follow, each introduced by `#`. The `META:` zone extends to
//! the end of the line and may itself contain `#`.

use std::str::FromStr;

use error_stack::{bail, IntoReport, ResultExt};
use itertools::Itertools;

use crate::{Error, Field, FieldOrder, FieldType, Meta, Schema};

/// Parse a header line into a [Schema].
pub fn parse_header(header: &str) -> error_stack::Result<Schema, Error> {
    let header = header.trim_end_matches(['\n', '\r']);
    let mut zones = split_header(header)?.into_iter();

    let fields = zones
        .next()
        .map(|zone| split_fields(zone).map(parse_field).collect::<Result<Vec<_>, _>>())
        .transpose()?
        .unwrap_or_default();

    let mut order = Vec::new();
    let mut size = None;
    let mut meta = Meta::new();
    for zone in zones {
        let Some((name, data)) = zone.trim().split_once(char::is_whitespace) else {
            bail!(Error::InvalidZone(zone.trim().to_owned()));
        };
        match name {
            "ORDER:" => {
                order = split_fields(data)
                    .map(|order_field| {
                        let mut parts = order_field.split(':');
                        // `split` always yields at least one part.
                        let name = parts.next().unwrap_or_default();
                        let modifiers: Vec<_> = parts.collect();
                        FieldOrder::try_from_modifiers(name, &modifiers)
                    })
                    .collect::<Result<_, _>>()?;
            }
            "SIZE:" => {
                let data = data.trim();
                size = Some(
                    data.parse()
                        .into_report()
                        .change_context_lazy(|| Error::InvalidSize(data.to_owned()))?,
                );
            }
            "META:" => meta = parse_meta(data)?,
            _ => bail!(Error::InvalidZone(name.to_owned())),
        }
    }

    Ok(Schema::try_new(fields, order)?.with_size(size).with_meta(meta))
}

/// Parse the text of a `#META:` zone.
///
/// Unquoted metadata is written `key:value, key2:value2`; a space is inserted
/// after the first colon of each pair so it reads as a YAML flow mapping.
/// Braces are optional.
pub fn parse_meta(text: &str) -> error_stack::Result<Meta, Error> {
    let mut meta = if text.contains('"') {
        text.to_owned()
    } else {
        text.split(',').map(|pair| pair.replacen(':', ": ", 1)).join(",")
    };
    if !meta.trim_start().starts_with('{') {
        meta = format!("{{{meta}}}");
    }

    serde_yaml::from_str(&meta)
        .into_report()
        .change_context_lazy(|| Error::InvalidMeta(text.to_owned()))
}

/// Splits the header into zones, dropping the leading `#` of each.
fn split_header(header: &str) -> error_stack::Result<Vec<&str>, Error> {
    let Some(mut rest) = header.strip_prefix('#') else {
        bail!(Error::MissingHeaderMarker(header.to_owned()))
    };

    let mut zones = Vec::new();
    loop {
        match rest.find('#') {
            Some(pos) if !rest.starts_with("META") => {
                zones.push(&rest[..pos]);
                rest = &rest[pos + 1..];
            }
            _ => {
                zones.push(rest);
                return Ok(zones);
            }
        }
    }
}

fn split_fields(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| c == ';' || c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
}

fn parse_field(text: &str) -> error_stack::Result<Field, Error> {
    match text.split(':').collect::<Vec<_>>()[..] {
        [name] => Ok(Field::new(name, FieldType::Any)),
        [name, field_type] => {
            let field_type = FieldType::from_str(field_type)
                .into_report()
                .change_context_lazy(|| Error::UnknownFieldType(field_type.to_owned()))?;
            Ok(Field::new(name, field_type))
        }
        _ => bail!(Error::InvalidField(text.to_owned())),
    }
}

/// Renders the schema as a header line, without the trailing newline.
impl std::fmt::Display for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "# {}", self.fields().iter().format("\t"))?;
        if !self.order().is_empty() {
            write!(f, " #ORDER: {}", self.order().iter().format("\t"))?;
        }
        if let Some(size) = self.size() {
            write!(f, " #SIZE: {size}")?;
        }
        if !self.meta().is_empty() {
            // JSON is a single-line YAML flow mapping.
            let meta = serde_json::to_string(self.meta()).map_err(|_| std::fmt::Error)?;
            write!(f, " #META: {meta}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SortKind;

    #[test]
    fn test_split_header() {
        let header = "# shows:int clicks:int ctr:float rel url #ORDER: url:asc, ctr:desc:num #SIZE: 12312 #META: # #ANYTHING";
        assert_eq!(
            split_header(header).unwrap(),
            vec![
                " shows:int clicks:int ctr:float rel url ",
                "ORDER: url:asc, ctr:desc:num ",
                "SIZE: 12312 ",
                "META: # #ANYTHING"
            ]
        );
    }

    #[test]
    fn test_parse_header() {
        let schema =
            parse_header("# shows:int clicks:int ctr:float rel url #ORDER: url:asc, ctr:desc:num")
                .unwrap();
        assert_eq!(
            schema.fields(),
            &[
                Field::new("shows", FieldType::Int),
                Field::new("clicks", FieldType::Int),
                Field::new("ctr", FieldType::Float),
                Field::new("rel", FieldType::Any),
                Field::new("url", FieldType::Any),
            ]
        );
        assert_eq!(
            schema.order(),
            &[
                FieldOrder::ascending("url"),
                FieldOrder::new("ctr", SortKind::Numeric, true),
            ]
        );
        assert_eq!(schema.size(), None);
        assert!(schema.meta().is_empty());
    }

    #[test]
    fn test_parse_size_and_meta() {
        let schema = parse_header("# a b #SIZE: 12 #META: spam:spam, n:1\n").unwrap();
        assert_eq!(schema.size(), Some(12));
        assert_eq!(
            schema.meta().get("spam"),
            Some(&serde_yaml::Value::String("spam".to_owned()))
        );
        assert_eq!(
            schema.meta().get("n").and_then(serde_yaml::Value::as_u64),
            Some(1)
        );
    }

    #[test]
    fn test_parse_meta_forms() {
        for text in [
            "spam:spam",
            "'spam':'spam'",
            "'spam': 'spam'",
            "{'spam': 'spam'}",
            " {spam:spam}",
        ] {
            let meta = parse_meta(text).unwrap();
            assert_eq!(
                meta.get("spam"),
                Some(&serde_yaml::Value::String("spam".to_owned())),
                "parsing {text:?}"
            );
        }
    }

    #[test]
    fn test_header_errors() {
        let err = parse_header("a b").unwrap_err();
        assert_eq!(
            err.current_context(),
            &Error::MissingHeaderMarker("a b".to_owned())
        );

        let err = parse_header("# a:int:str").unwrap_err();
        assert_eq!(
            err.current_context(),
            &Error::InvalidField("a:int:str".to_owned())
        );

        let err = parse_header("# a:long").unwrap_err();
        assert_eq!(
            err.current_context(),
            &Error::UnknownFieldType("long".to_owned())
        );

        let err = parse_header("# a #SORT: a").unwrap_err();
        assert_eq!(err.current_context(), &Error::InvalidZone("SORT:".to_owned()));

        let err = parse_header("# a #SIZE: many").unwrap_err();
        assert_eq!(err.current_context(), &Error::InvalidSize("many".to_owned()));

        let err = parse_header("# a b #ORDER: c").unwrap_err();
        assert_eq!(
            err.current_context(),
            &Error::UnknownOrderField("c".to_owned())
        );
    }

    #[test]
    fn test_make_header() {
        let mut meta = Meta::new();
        meta.insert(
            "foo".to_owned(),
            serde_yaml::Value::Sequence(vec!["array".into(), "with, commas".into()]),
        );
        meta.insert(
            "bar".to_owned(),
            serde_yaml::Value::Sequence(vec!["array".into()]),
        );
        let schema = Schema::try_new(
            vec![
                Field::new("shows", FieldType::Int),
                Field::new("url", FieldType::Any),
            ],
            vec![
                FieldOrder::new("url", SortKind::String, true),
                FieldOrder::new("shows", SortKind::Numeric, false),
            ],
        )
        .unwrap()
        .with_meta(meta);

        assert_eq!(
            schema.to_string(),
            "# shows:int\turl #ORDER: url:desc\tshows:num \
             #META: {\"bar\":[\"array\"],\"foo\":[\"array\",\"with, commas\"]}"
        );

        // The rendered header parses back to the same schema.
        assert_eq!(parse_header(&schema.to_string()).unwrap(), schema);
    }
}
