use itertools::Itertools;

use crate::parser::{is_valid_ident, parse_expr, parse_statements, ParseError};
use crate::*;

fn statements(input: &str) -> String {
    parse_statements(input)
        .unwrap()
        .iter()
        .format("; ")
        .to_string()
}

fn expr(input: &str) -> String {
    parse_expr(input).unwrap().to_string()
}

fn error(input: &str) -> ParseError {
    parse_statements(input).unwrap_err().current_context().clone()
}

#[test]
fn test_is_valid_ident() {
    assert!(is_valid_ident("ctr"));
    assert!(is_valid_ident("_ctr_1"));
    assert!(!is_valid_ident("1ctr"));
    assert!(!is_valid_ident("c tr"));
    assert!(!is_valid_ident(""));
}

#[test]
fn test_precedence() {
    insta::assert_snapshot!(expr("a + b * c"), @"(a + (b * c))");
    insta::assert_snapshot!(expr("a - b - c"), @"((a - b) - c)");
    insta::assert_snapshot!(expr("-a ** 2"), @"(-(a ** 2))");
    insta::assert_snapshot!(expr("a ** b ** c"), @"(a ** (b ** c))");
    insta::assert_snapshot!(expr("a | b & c << 1"), @"(a | (b & (c << 1)))");
    insta::assert_snapshot!(expr("a // b % c"), @"((a // b) % c)");
    insta::assert_snapshot!(expr("not a == b"), @"(not (a == b))");
}

#[test]
fn test_boolean_chains_are_flattened() {
    insta::assert_snapshot!(expr("a and b and c or d"), @"((a and b and c) or d)");
    insta::assert_snapshot!(
        expr("e==157 and (s>100 or s in [15,30,45])"),
        @"((e == 157) and ((s > 100) or (s in [15, 30, 45])))"
    );
    insta::assert_snapshot!(expr("x not in (1, 2)"), @"(x not in (1, 2))");
}

#[test]
fn test_conditional() {
    insta::assert_snapshot!(expr("a if a > b else b"), @"(a if (a > b) else b)");
    insta::assert_snapshot!(expr("1 if a else 2 if b else 3"), @"(1 if a else (2 if b else 3))");
}

#[test]
fn test_calls_and_subscripts() {
    insta::assert_snapshot!(expr("f()"), @"f()");
    insta::assert_snapshot!(expr("map_from_file('f.tsv', key=a, default=0)"), @r###"map_from_file("f.tsv", key=a, default=0)"###);
    insta::assert_snapshot!(expr("unjoin(',', x, 2)[0]"), @r###"unjoin(",", x, 2)[0]"###);
    insta::assert_snapshot!(expr("max(a, b,)"), @"max(a, b)");
}

#[test]
fn test_tuples() {
    insta::assert_snapshot!(expr("(a, b)"), @"(a, b)");
    insta::assert_snapshot!(expr("a, 'x'"), @r###"(a, "x")"###);
    insta::assert_snapshot!(expr("(a,)"), @"(a)");
}

#[test]
fn test_statements() {
    insta::assert_snapshot!(statements("ctr=c/s; cpm=ctr*m"), @"ctr = (c / s); cpm = (ctr * m)");
    insta::assert_snapshot!(statements("d;p"), @"d; p");
    insta::assert_snapshot!(statements("\n; a = 1\n\nb\n"), @"a = 1; b");
    insta::assert_snapshot!(statements("x = f(a,\n  b)\ny = 2"), @"x = f(a, b); y = 2");
    assert!(parse_statements("").unwrap().is_empty());
}

#[test]
fn test_statement_locations() {
    let parsed = parse_statements("total = sum(v)").unwrap();
    let Stmt::Assign { target, value } = &parsed[0] else {
        panic!("expected assignment, got {:?}", parsed[0]);
    };
    assert_eq!(target.inner(), "total");
    assert_eq!(target.location(), &Location::new(0, 5));
    assert_eq!(value.location(), &Location::new(8, 14));
}

#[test]
fn test_literals() {
    let parsed = parse_expr("1.5").unwrap();
    assert_eq!(
        parsed.kind(),
        &ExprKind::Literal(LiteralValue::Number("1.5".to_owned()))
    );
    assert!(LiteralValue::Number("1e3".to_owned()).is_float());
    assert!(!LiteralValue::Number("13".to_owned()).is_float());
    insta::assert_snapshot!(expr("True"), @"True");
}

#[test]
fn test_errors() {
    insta::assert_snapshot!(error("a = b = 1").to_string(), @"assignment target must be a single name at 6..7");
    insta::assert_snapshot!(error("(a) = 1").to_string(), @"assignment target must be a single name at 4..5");
    insta::assert_snapshot!(error("a < b < c").to_string(), @"chained comparisons are not supported at 6..7");
    insta::assert_snapshot!(error("f(*a)").to_string(), @"* and ** are not supported in function calls at 2..3");
    insta::assert_snapshot!(error("f(**a)").to_string(), @"* and ** are not supported in function calls at 2..4");
    insta::assert_snapshot!(error("f(a=1, b)").to_string(), @"positional argument follows keyword argument at 7..8");
    insta::assert_snapshot!(error("(a + 1)(2)").to_string(), @"only named functions may be called at 7..8");
    insta::assert_snapshot!(error("a +").to_string(), @"unexpected end of input, expected expression");
    insta::assert_snapshot!(error("a b").to_string(), @"unexpected 'b' at 2..3, expected ';' or newline");
    insta::assert_snapshot!(error("a $ b").to_string(), @"unrecognized token '$' at 2..3");
    insta::assert_snapshot!(error("f(a").to_string(), @"unexpected end of input, expected ')'");
}
