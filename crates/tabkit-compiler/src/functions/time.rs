use error_stack::{bail, report};

use crate::ast_to_ir::Lowering;
use crate::functions::function::BoundArguments;
use crate::functions::Registry;
use crate::{Error, ExprRef, RowExpr};

pub(super) fn register(registry: &mut Registry) {
    registry.register("strptime(format, timestr)", strptime);
}

/// The supported format codes, in the order `mktime` expects them, with the
/// width they match and the value used when absent.
const TIME_PARTS: [(char, usize, &str); 6] = [
    ('Y', 4, "1970"),
    ('m', 2, "01"),
    ('d', 2, "01"),
    ('H', 2, "00"),
    ('M', 2, "00"),
    ('S', 2, "00"),
];

/// Translate a strptime format into a regular expression and the `gensub`
/// replacement producing a `mktime` datespec.
fn translate_format(format: &str) -> error_stack::Result<(String, String), Error> {
    let mut pattern = String::with_capacity(format.len() * 2);
    let mut groups: [Option<usize>; 6] = [None; 6];
    let mut group_count = 0;

    let mut chars = format.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            pattern.push(c);
            continue;
        }
        let Some(code) = chars.next() else {
            bail!(Error::argument_kind(
                "strptime",
                format!("incomplete format specifier at the end of '{format}'")
            ))
        };
        let Some(part) = TIME_PARTS.iter().position(|(part, _, _)| *part == code) else {
            bail!(Error::argument_kind(
                "strptime",
                format!("unrecognized format specifier '%{code}'")
            ))
        };
        group_count += 1;
        groups[part] = Some(group_count);
        pattern.push('(');
        pattern.extend(std::iter::repeat('.').take(TIME_PARTS[part].1));
        pattern.push(')');
    }

    let replacement = TIME_PARTS
        .iter()
        .zip(groups)
        .map(|((_, _, default), group)| match group {
            Some(group) => format!("\\{group}"),
            None => (*default).to_owned(),
        })
        .collect::<Vec<_>>()
        .join(" ");
    Ok((format!("^{pattern}.*$"), replacement))
}

fn strptime(_: &mut Lowering<'_, '_>, args: BoundArguments) -> error_stack::Result<ExprRef, Error> {
    let format = args.value(0).as_str_const().ok_or_else(|| {
        report!(Error::argument_kind(
            "strptime",
            "'format' must be a string literal"
        ))
    })?;
    let (pattern, replacement) = translate_format(format)?;
    Ok(RowExpr::call(
        "mktime",
        [RowExpr::call(
            "gensub",
            [
                RowExpr::string(pattern),
                RowExpr::string(replacement),
                RowExpr::string(""),
                args.value(1).clone(),
            ],
        )],
    ))
}
