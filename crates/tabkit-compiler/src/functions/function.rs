use error_stack::{bail, ensure, report};
use tabkit_syntax::is_valid_ident;

use crate::ast_to_ir::Lowering;
use crate::{Error, ExprRef};

/// Expands a call with bound arguments into IR.
pub(crate) type Expander =
    fn(&mut Lowering<'_, '_>, BoundArguments) -> error_stack::Result<ExprRef, Error>;

/// A function of the library and its parameters.
///
/// Signatures take the form `name(a, b, *rest)`, where a parameter prefixed
/// with `*` collects all remaining positional arguments.
pub struct Function {
    signature: &'static str,
    name: &'static str,
    parameters: Vec<&'static str>,
    variadic: Option<&'static str>,
    expander: Expander,
}

impl std::fmt::Debug for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Function")
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

/// Arguments of a call resolved against the parameters of a [Function].
#[derive(Debug)]
pub struct BoundArguments {
    values: Vec<ExprRef>,
    rest: Vec<ExprRef>,
}

impl BoundArguments {
    /// The argument for the `index`-th named parameter.
    pub fn value(&self, index: usize) -> &ExprRef {
        &self.values[index]
    }

    /// The arguments collected by the variadic parameter.
    pub fn rest(&self) -> &[ExprRef] {
        &self.rest
    }
}

impl Function {
    pub(super) fn try_new(
        signature: &'static str,
        expander: Expander,
    ) -> error_stack::Result<Self, Error> {
        let invalid = || Error::Grammar(format!("invalid signature '{signature}'"));

        let Some((name, parameters)) = signature
            .strip_suffix(')')
            .and_then(|signature| signature.split_once('('))
        else {
            bail!(invalid())
        };
        ensure!(is_valid_ident(name), invalid());

        let mut named = Vec::new();
        let mut variadic = None;
        let parameters = parameters.split(',').map(str::trim);
        for parameter in parameters.filter(|parameter| !parameter.is_empty()) {
            ensure!(variadic.is_none(), invalid());
            match parameter.strip_prefix('*') {
                Some(rest) => {
                    ensure!(is_valid_ident(rest), invalid());
                    variadic = Some(rest);
                }
                None => {
                    ensure!(is_valid_ident(parameter), invalid());
                    ensure!(!named.contains(&parameter), invalid());
                    named.push(parameter);
                }
            }
        }

        Ok(Self {
            signature,
            name,
            parameters: named,
            variadic,
            expander,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn signature(&self) -> &'static str {
        self.signature
    }

    pub fn parameters(&self) -> &[&'static str] {
        &self.parameters
    }

    pub fn variadic(&self) -> Option<&'static str> {
        self.variadic
    }

    /// Resolve positional and keyword arguments against the parameters.
    pub(crate) fn bind(
        &self,
        positional: Vec<ExprRef>,
        keyword: Vec<(&str, ExprRef)>,
    ) -> error_stack::Result<BoundArguments, Error> {
        let count = positional.len();
        let mut values: Vec<Option<ExprRef>> = vec![None; self.parameters.len()];
        let mut rest = Vec::new();

        for (index, arg) in positional.into_iter().enumerate() {
            if let Some(slot) = values.get_mut(index) {
                *slot = Some(arg);
            } else if self.variadic.is_some() {
                rest.push(arg);
            } else {
                bail!(Error::arity(
                    self.name,
                    format!(
                        "expected at most {} arguments, got {count}",
                        self.parameters.len()
                    )
                ));
            }
        }

        for (name, arg) in keyword {
            let Some(index) = self.parameters.iter().position(|parameter| *parameter == name)
            else {
                bail!(Error::argument_kind(
                    self.name,
                    format!("unknown keyword argument '{name}'")
                ))
            };
            ensure!(
                values[index].is_none(),
                Error::argument_kind(self.name, format!("argument '{name}' given more than once"))
            );
            values[index] = Some(arg);
        }

        let values = values
            .into_iter()
            .zip(&self.parameters)
            .map(|(value, parameter)| {
                value.ok_or_else(|| {
                    report!(Error::arity(
                        self.name,
                        format!("missing argument '{parameter}'")
                    ))
                })
            })
            .collect::<error_stack::Result<Vec<_>, _>>()?;

        Ok(BoundArguments { values, rest })
    }

    pub(crate) fn expand(
        &self,
        lowering: &mut Lowering<'_, '_>,
        args: BoundArguments,
    ) -> error_stack::Result<ExprRef, Error> {
        (self.expander)(lowering, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RowExpr;

    fn unused(
        _: &mut Lowering<'_, '_>,
        _: BoundArguments,
    ) -> error_stack::Result<ExprRef, Error> {
        Ok(RowExpr::int(0))
    }

    fn function(signature: &'static str) -> Function {
        Function::try_new(signature, unused).unwrap()
    }

    #[test]
    fn test_parse_signatures() {
        let join = function("join(delim, *strs)");
        assert_eq!(join.name(), "join");
        assert_eq!(join.parameters(), &["delim"]);
        assert_eq!(join.variadic(), Some("strs"));

        let shell = function("shell(cmd)");
        assert_eq!(shell.parameters(), &["cmd"]);
        assert_eq!(shell.variadic(), None);

        for invalid in ["join", "join(a, *b, c)", "1x(a)", "f(a, a)", "f(*)"] {
            assert!(
                Function::try_new(invalid, unused).is_err(),
                "{invalid} should be rejected"
            );
        }
    }

    #[test]
    fn test_bind_positional_and_keyword() {
        let unjoin = function("unjoin(delim, value, index)");
        let bound = unjoin
            .bind(
                vec![RowExpr::string(",")],
                vec![("index", RowExpr::int(2)), ("value", RowExpr::string("a,b"))],
            )
            .unwrap();
        assert_eq!(bound.value(0), &RowExpr::string(","));
        assert_eq!(bound.value(1), &RowExpr::string("a,b"));
        assert_eq!(bound.value(2), &RowExpr::int(2));
        assert!(bound.rest().is_empty());
    }

    #[test]
    fn test_bind_variadic() {
        let join = function("join(delim, *strs)");
        let bound = join
            .bind(
                vec![RowExpr::string(","), RowExpr::int(1), RowExpr::int(2)],
                vec![],
            )
            .unwrap();
        assert_eq!(bound.rest(), &[RowExpr::int(1), RowExpr::int(2)]);
    }

    #[test]
    fn test_bind_errors() {
        let strip = function("strip(value)");

        let err = strip
            .bind(vec![RowExpr::int(1), RowExpr::int(2)], vec![])
            .unwrap_err();
        insta::assert_display_snapshot!(err.current_context(), @"wrong number of arguments to 'strip': expected at most 1 arguments, got 2");

        let err = strip.bind(vec![], vec![]).unwrap_err();
        insta::assert_display_snapshot!(err.current_context(), @"wrong number of arguments to 'strip': missing argument 'value'");

        let err = strip
            .bind(vec![], vec![("text", RowExpr::int(1))])
            .unwrap_err();
        insta::assert_display_snapshot!(err.current_context(), @"invalid argument to 'strip': unknown keyword argument 'text'");

        let err = strip
            .bind(vec![RowExpr::int(1)], vec![("value", RowExpr::int(1))])
            .unwrap_err();
        insta::assert_display_snapshot!(err.current_context(), @"invalid argument to 'strip': argument 'value' given more than once");
    }
}
