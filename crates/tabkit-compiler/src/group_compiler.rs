//! Compilation of aggregations over clustered streams.
//!
//! Rows are assumed to be clustered by the grouping key. The generated
//! program remembers the key of the previous row; when it changes the
//! aggregates of the finished group are printed and reset. Accumulators are
//! never reset, so they aggregate over everything seen so far. Statements over
//! group aggregates may refer to accumulators bound before them.

use error_stack::ResultExt;
use hashbrown::HashSet;
use itertools::Itertools;
use tabkit_schema::Schema;
use tabkit_syntax::Stmt;
use tracing::{debug, info_span};

use crate::aggregation::collect_aggregates;
use crate::ast_to_ir::{parse_statements, Lowering};
use crate::row_compiler::{project, SET_OUTPUT_SEPARATOR};
use crate::{
    AggregateCategory, Block, Compiled, Error, ExprContext, ExprRef, NAryOp, Namer, Program,
    RowExpr, Snippets,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GroupOptions {
    /// Output every key, requiring keys that are not plain field names to be
    /// assigned a name. Otherwise only assigned keys are output.
    pub output_all_keys: bool,
    /// Print the running aggregates after every row instead of once per
    /// group.
    pub expose_groups: bool,
}

/// A grouping key, held in `name` and compared against `row_name`.
struct Key {
    expr: ExprRef,
    name: String,
    row_name: String,
}

/// Compile a grouping of rows of `schema` by `key`.
///
/// `aggregates` are statements over aggregate functions, evaluated either
/// per group or accumulated over the whole stream. Without a key all rows
/// form a single group.
pub fn compile_group(
    schema: &Schema,
    key: Option<&str>,
    aggregates: &[(AggregateCategory, &str)],
    options: &GroupOptions,
) -> error_stack::Result<Compiled, Error> {
    let _span = info_span!("compile_group", ?key, ?aggregates).entered();

    let empty = Schema::default();
    let mut key_ctx = ExprContext::new(schema);
    let mut row_ctx = ExprContext::new(schema);
    let mut grp_ctx = ExprContext::new(&empty);
    let mut acc_ctx = ExprContext::new(&empty);
    let mut out_ctx = ExprContext::new(&empty);
    let mut namer = Namer::new();
    let mut snippets = Snippets::default();

    // The implicit key of a global aggregation is never output.
    let output_all_keys = options.output_all_keys && key.is_some();
    let mut keys: Vec<Key> = Vec::new();
    let mut key_position = 0;
    for stmt in parse_statements(key.unwrap_or("1"))? {
        let (name, expr) = {
            let mut lowering = Lowering::new(&mut key_ctx, &mut namer, &mut snippets);
            match &stmt {
                Stmt::Assign { target, value } => {
                    (Some(target.inner().clone()), lowering.lower(value)?)
                }
                Stmt::Expr(expr) if output_all_keys => match expr.as_name() {
                    Some(name) => (Some(name.to_owned()), lowering.lower(expr)?),
                    None => {
                        return Err(error_stack::report!(Error::Grammar(
                            "please assign expression to a variable".to_owned()
                        ))
                        .attach_printable(format!("key: {stmt}")))
                    }
                },
                Stmt::Expr(expr) => (None, lowering.lower(expr)?),
            }
        };

        let rendered = expr.to_string();
        let key_name = namer.name_for("__key", &rendered);
        let row_name = namer.name_for("__row_key", &rendered);

        if let Some(name) = name {
            let key_binding = match out_ctx.binding(&key_name) {
                Some(binding) => binding.clone(),
                None => {
                    let binding = RowExpr::assign(&key_name, expr.clone());
                    out_ctx.bind(&key_name, binding.clone(), None)?;
                    binding
                }
            };
            let statement = RowExpr::assign(&name, RowExpr::var(&key_name, key_binding));
            out_ctx.bind(&name, statement.clone(), Some(key_position))?;
            grp_ctx.bind(&name, statement, None)?;
            key_position += 1;
        }

        if keys.iter().any(|key| key.name == key_name) {
            continue;
        }
        // Compare fields as strings.
        let expr = if expr.is_field() {
            RowExpr::op(NAryOp::Concat, [expr, RowExpr::string("")])
        } else {
            expr
        };
        keys.push(Key {
            expr,
            name: key_name,
            row_name,
        });
    }

    for (category, source) in aggregates {
        for stmt in parse_statements(source)? {
            let ctx = match category {
                AggregateCategory::Group => &mut grp_ctx,
                AggregateCategory::Accumulator => &mut acc_ctx,
            };
            let known = ctx.len();
            let (name, statement) = Lowering::with_aggregates(
                ctx,
                &mut namer,
                &mut snippets,
                &mut row_ctx,
                *category,
            )
            .lower_assignment(&stmt)
            .attach_printable_lazy(|| format!("aggregation: {source}"))?;

            let helpers: Vec<(String, ExprRef)> = ctx
                .iter()
                .skip(known)
                .map(|(name, binding)| (name.to_owned(), binding.clone()))
                .collect();
            for (helper, binding) in helpers {
                if !out_ctx.has_var(&helper) {
                    out_ctx.bind(&helper, binding, None)?;
                }
            }

            ctx.bind(&name, statement.clone(), None)?;
            out_ctx.bind(&name, statement.clone(), None)?;
            if *category == AggregateCategory::Accumulator {
                grp_ctx.bind(&name, statement, None)?;
            }
        }
    }

    let grp_aggregates = collect_aggregates(
        grp_ctx.iter().map(|(_, binding)| binding),
        AggregateCategory::Group,
    );
    let acc_aggregates = collect_aggregates(
        acc_ctx.iter().map(|(_, binding)| binding),
        AggregateCategory::Accumulator,
    );
    debug!(
        groups = grp_aggregates.len(),
        accumulators = acc_aggregates.len(),
        "collected aggregates"
    );

    let init_grps: Block = grp_aggregates.iter().map(|aggregate| aggregate.init()).collect();
    let init_accs: Block = acc_aggregates.iter().map(|aggregate| aggregate.init()).collect();
    let update_grps: Block = grp_aggregates
        .iter()
        .map(|aggregate| aggregate.update())
        .collect();
    let update_accs: Block = acc_aggregates
        .iter()
        .map(|aggregate| aggregate.update())
        .collect();
    let ends: Block = grp_aggregates
        .iter()
        .chain(&acc_aggregates)
        .filter_map(|aggregate| aggregate.end())
        .collect();

    let projection = project(&out_ctx, None, schema.order())?;
    let print = projection.main;

    let mut main = Block::new();
    let mut computed = HashSet::new();
    for (name, binding) in key_ctx.iter().chain(row_ctx.iter()) {
        if computed.insert(name) {
            main.line(binding.to_string());
        }
    }
    for key in &keys {
        main.line(format!("{} = {}", key.row_name, key.expr));
    }

    let update_keys: Block = keys
        .iter()
        .map(|key| format!("{} = {}", key.name, key.row_name))
        .collect();
    let changed = keys
        .iter()
        .map(|key| format!("{}!={}", key.name, key.row_name))
        .join(" || ");

    let mut on_change = Block::new();
    if !options.expose_groups {
        on_change.extend(ends.clone());
        on_change.extend(print.clone());
    }
    on_change.extend(update_keys.clone());
    on_change.extend(init_grps.clone());
    let mut otherwise = Block::new();
    otherwise.head(format!("if({changed})"), on_change);

    main.head("if(NR==1)", update_keys);
    main.head("else", otherwise);
    main.extend(update_grps);
    main.extend(update_accs);

    let mut finish = ends;
    finish.extend(print);
    let end = if options.expose_groups {
        main.extend(finish);
        Block::new()
    } else {
        let mut end = Block::new();
        end.head("if(NR!=0)", finish);
        end
    };

    let mut begin = Block::from_iter([SET_OUTPUT_SEPARATOR]);
    begin.extend(init_grps);
    begin.extend(init_accs);

    let derived = Schema::try_new(projection.fields, projection.order)
        .change_context(Error::SchemaValidation)?
        .with_meta(schema.meta().clone());
    debug!(schema = %derived, "derived output schema");

    let program = Program {
        snippets,
        begin,
        main,
        end,
    };
    Ok(Compiled::new(program, derived))
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use tabkit_schema::parse_header;

    use super::*;
    use crate::Layout;

    fn compile_with(
        header: &str,
        key: Option<&str>,
        aggregates: &[(AggregateCategory, &str)],
        options: GroupOptions,
    ) -> error_stack::Result<Compiled, Error> {
        compile_group(&parse_header(header).unwrap(), key, aggregates, &options)
    }

    fn compile(
        header: &str,
        key: Option<&str>,
        aggregates: &[(AggregateCategory, &str)],
    ) -> Compiled {
        compile_with(header, key, aggregates, GroupOptions::default()).unwrap()
    }

    fn all_keys() -> GroupOptions {
        GroupOptions {
            output_all_keys: true,
            ..GroupOptions::default()
        }
    }

    #[test]
    fn test_groups_and_accumulators() {
        let compiled = compile(
            "# d p e s c m",
            Some("d;p"),
            &[
                (AggregateCategory::Group, "ctr=sum(c)/sum(s); cpm=ctr*avg(m)"),
                (AggregateCategory::Accumulator, "cnt=cnt()"),
                (AggregateCategory::Group, "xctr=avg(c/s)"),
            ],
        );
        assert_eq!(
            compiled.program().render(&Layout::pretty(4)),
            indoc! {r#"
                BEGIN{
                    OFS="\t";
                    __grp_0 = 0;
                    __grp_1 = 0;
                    __grp_2 = 0;
                    __grp_3 = 0;
                    __grp_4 = 0;
                    __acc_0 = 0;
                }
                {
                    __row_key0 = ($1  "");
                    __row_key1 = ($2  "");
                    if(NR==1)
                    {
                        __key0 = __row_key0;
                        __key1 = __row_key1;
                    }
                    else
                    {
                        if(__key0!=__row_key0 || __key1!=__row_key1)
                        {
                            ctr = (__grp_0 / __grp_1);
                            print(ctr,(ctr * (__grp_2 / __grp_3)),__acc_0,(__grp_4 / __grp_3));
                            __key0 = __row_key0;
                            __key1 = __row_key1;
                            __grp_0 = 0;
                            __grp_1 = 0;
                            __grp_2 = 0;
                            __grp_3 = 0;
                            __grp_4 = 0;
                        }
                    }
                    __grp_0 += $5;
                    __grp_1 += $4;
                    __grp_2 += $6;
                    __grp_3 += 1;
                    __grp_4 += ($5 / $4);
                    __acc_0 += 1;
                }
                END{
                    if(NR!=0)
                    {
                        ctr = (__grp_0 / __grp_1);
                        print(ctr,(ctr * (__grp_2 / __grp_3)),__acc_0,(__grp_4 / __grp_3));
                    }
                }
            "#}
        );
        assert_eq!(
            compiled.schema().to_string(),
            "# ctr:float\tcpm:float\tcnt:int\txctr:float"
        );
    }

    #[test]
    fn test_assigned_key() {
        let compiled = compile(
            "# d p e s c m",
            Some("grp=int(d)"),
            &[
                (
                    AggregateCategory::Accumulator,
                    "_ctr=sum(c)/(sum(s)+0.0000001)*100",
                ),
                (AggregateCategory::Accumulator, "m=sprintf(\"%0.2f\",sum(m)/1000000)"),
                (AggregateCategory::Accumulator, "cpm=sprintf(\"%0.20f\",_ctr*m)"),
                (AggregateCategory::Group, "cnt=cnt()"),
                (AggregateCategory::Group, "r=sum(p)+grp"),
            ],
        );
        assert_eq!(
            compiled.program().render(&Layout::pretty(4)),
            indoc! {r#"
                BEGIN{
                    OFS="\t";
                    __grp_0 = 0;
                    __grp_1 = 0;
                    __acc_0 = 0;
                    __acc_1 = 0;
                    __acc_2 = 0;
                }
                {
                    __row_key0 = int($1);
                    if(NR==1)
                    {
                        __key0 = __row_key0;
                    }
                    else
                    {
                        if(__key0!=__row_key0)
                        {
                            grp = __key0; _ctr = ((__acc_0 / (__acc_1 + 0.0000001)) * 100); m = sprintf("%0.2f", (__acc_2 / 1000000));
                            print(grp,m,sprintf("%0.20f", (_ctr * m)),__grp_0,(__grp_1 + grp));
                            __key0 = __row_key0;
                            __grp_0 = 0;
                            __grp_1 = 0;
                        }
                    }
                    __grp_0 += 1;
                    __grp_1 += $2;
                    __acc_0 += $5;
                    __acc_1 += $4;
                    __acc_2 += $6;
                }
                END{
                    if(NR!=0)
                    {
                        grp = __key0; _ctr = ((__acc_0 / (__acc_1 + 0.0000001)) * 100); m = sprintf("%0.2f", (__acc_2 / 1000000));
                        print(grp,m,sprintf("%0.20f", (_ctr * m)),__grp_0,(__grp_1 + grp));
                    }
                }
            "#}
        );
        assert_eq!(
            compiled.schema().to_string(),
            "# grp:int\tm:str\tcpm:str\tcnt:int\tr:float"
        );
    }

    #[test]
    fn test_output_all_keys() {
        let compiled = compile_with(
            "# k:str v:int",
            Some("k"),
            &[(AggregateCategory::Group, "total=sum(v)")],
            all_keys(),
        )
        .unwrap();
        assert_eq!(
            compiled.program().to_string(),
            concat!(
                r#"BEGIN{OFS="\t";__grp_0 = 0;}"#,
                r#"{__row_key0 = ($1  "");if(NR==1){__key0 = __row_key0;}"#,
                r#"else{if(__key0!=__row_key0){print(__key0,__grp_0);__key0 = __row_key0;__grp_0 = 0;}}"#,
                r#"__grp_0 += $2;}"#,
                r#"END{if(NR!=0){print(__key0,__grp_0);}}"#,
            )
        );
        assert_eq!(compiled.schema().to_string(), "# k:str\ttotal:int");

        // Without the option, unassigned keys only delimit groups.
        let compiled = compile(
            "# k:str v:int",
            Some("k"),
            &[(AggregateCategory::Group, "total=sum(v)")],
        );
        assert_eq!(compiled.schema().to_string(), "# total:int");
    }

    #[test]
    fn test_unnamed_key_expression() {
        let err = compile_with(
            "# k v",
            Some("int(k)"),
            &[(AggregateCategory::Group, "total=sum(v)")],
            all_keys(),
        )
        .unwrap_err();
        assert_eq!(
            err.current_context(),
            &Error::Grammar("please assign expression to a variable".to_owned())
        );

        let compiled = compile_with(
            "# k v",
            Some("x = int(k)"),
            &[(AggregateCategory::Group, "total=sum(v)")],
            all_keys(),
        )
        .unwrap();
        assert_eq!(compiled.schema().to_string(), "# x:int\ttotal:float");
    }

    #[test]
    fn test_key_order_carries_through() {
        let compiled = compile_with(
            "# k v #ORDER: k",
            Some("k"),
            &[(AggregateCategory::Group, "total=sum(v)")],
            all_keys(),
        )
        .unwrap();
        assert_eq!(compiled.schema().to_string(), "# k\ttotal:float #ORDER: k");
    }

    #[test]
    fn test_expose_groups() {
        let compiled = compile_with(
            "# k:str v:int",
            Some("k"),
            &[(AggregateCategory::Group, "total=sum(v)")],
            GroupOptions {
                output_all_keys: true,
                expose_groups: true,
            },
        )
        .unwrap();
        assert_eq!(
            compiled.program().to_string(),
            concat!(
                r#"BEGIN{OFS="\t";__grp_0 = 0;}"#,
                r#"{__row_key0 = ($1  "");if(NR==1){__key0 = __row_key0;}"#,
                r#"else{if(__key0!=__row_key0){__key0 = __row_key0;__grp_0 = 0;}}"#,
                r#"__grp_0 += $2;print(__key0,__grp_0);}"#,
            )
        );
        assert!(compiled.program().end.is_empty());
    }

    #[test]
    fn test_global_aggregation() {
        let compiled = compile(
            "# k v:int",
            None,
            &[
                (AggregateCategory::Group, "total=sum(v)"),
                (AggregateCategory::Group, "mean=avg(v)"),
            ],
        );
        assert_eq!(
            compiled.program().to_string(),
            concat!(
                r#"BEGIN{OFS="\t";__grp_0 = 0;__grp_1 = 0;}"#,
                r#"{__row_key0 = 1;if(NR==1){__key0 = __row_key0;}"#,
                r#"else{if(__key0!=__row_key0){print(__grp_0,(__grp_0 / __grp_1));__key0 = __row_key0;__grp_0 = 0;__grp_1 = 0;}}"#,
                r#"__grp_0 += $2;__grp_1 += 1;}"#,
                r#"END{if(NR!=0){print(__grp_0,(__grp_0 / __grp_1));}}"#,
            )
        );
        assert_eq!(compiled.schema().to_string(), "# total:int\tmean:float");
    }

    #[test]
    fn test_median_is_finalized() {
        let compiled = compile(
            "# d p e s c m",
            Some("d;p"),
            &[
                (AggregateCategory::Group, "median_ctr=median(c/s)"),
                (AggregateCategory::Group, "variance_ctr=var(c/s)"),
            ],
        );
        let program = compiled.program().to_string();
        let finalize = "__tmp__ = asort(__grp_0_arr) / 2; __grp_0 = int(__tmp__) == __tmp__ ? \
                        (__grp_0_arr[int(__tmp__)] + __grp_0_arr[int(__tmp__) + 1]) / 2 : \
                        __grp_0_arr[int(__tmp__) + 1];";
        let print = "print(__grp_0,((__grp_1 / __grp_3) - ((__grp_2 / __grp_3) ^ 2)));";
        assert_eq!(
            program.matches(&format!("{finalize}{print}")).count(),
            2,
            "finalized on key change and at the end"
        );
        assert!(program.contains("__grp_0_arr[++__grp_0_cnt] = ($5 / $4);"));
        assert!(program.starts_with(
            r#"BEGIN{OFS="\t";delete __grp_0_arr; __grp_0_cnt = 0;__grp_1 = 0;__grp_3 = 0;__grp_2 = 0;}"#
        ));
    }

    #[test]
    fn test_helpers() {
        // Helpers of aggregate arguments are computed for every row.
        let compiled = compile(
            "# k v",
            Some("k"),
            &[(AggregateCategory::Group, "total=sum(abs(v - 1))")],
        );
        assert!(compiled
            .program()
            .to_string()
            .contains(r#"{_abs0 = ($2 - 1);__row_key0 = ($1  "");"#));

        // Helpers over aggregates are computed before printing.
        let compiled = compile(
            "# k v",
            Some("k"),
            &[(AggregateCategory::Group, "x = abs(sum(v) - 10)")],
        );
        assert_eq!(
            compiled.program().end.render(&Layout::compact()),
            "if(NR!=0){_abs0 = (__grp_0 - 10);print(((_abs0 < 0)?-(_abs0):_abs0));}"
        );
    }

    #[test]
    fn test_errors() {
        let err = compile_with("# k v", Some("k"), &[], GroupOptions::default()).unwrap_err();
        assert_eq!(err.current_context(), &Error::EmptyProjection);

        let err = compile_with(
            "# k v",
            Some("k"),
            &[(AggregateCategory::Group, "total=sum(w)")],
            GroupOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err.current_context(),
            Error::NameResolution { name, .. } if name == "w"
        ));

        let err = compile_with(
            "# k v",
            Some("k"),
            &[
                (AggregateCategory::Group, "total=sum(v)"),
                (AggregateCategory::Accumulator, "total=cnt()"),
            ],
            GroupOptions::default(),
        )
        .unwrap_err();
        assert_eq!(
            err.current_context(),
            &Error::DuplicateBinding("total".to_owned())
        );
    }

    #[test]
    fn test_groups_refer_to_accumulators() {
        let compiled = compile(
            "# k v:int",
            Some("k"),
            &[
                (AggregateCategory::Accumulator, "n=cnt()"),
                (AggregateCategory::Group, "share=sum(v)/n"),
            ],
        );
        assert_eq!(
            compiled.program().to_string(),
            concat!(
                r#"BEGIN{OFS="\t";__grp_0 = 0;__acc_0 = 0;}"#,
                r#"{__row_key0 = ($1  "");if(NR==1){__key0 = __row_key0;}"#,
                r#"else{if(__key0!=__row_key0){n = __acc_0;print(n,(__grp_0 / n));__key0 = __row_key0;__grp_0 = 0;}}"#,
                r#"__grp_0 += $2;__acc_0 += 1;}"#,
                r#"END{if(NR!=0){n = __acc_0;print(n,(__grp_0 / n));}}"#,
            )
        );
        assert_eq!(compiled.schema().to_string(), "# n:int\tshare:float");

        // Accumulators are only visible once bound.
        let err = compile_with(
            "# k v:int",
            Some("k"),
            &[
                (AggregateCategory::Group, "share=sum(v)/n"),
                (AggregateCategory::Accumulator, "n=cnt()"),
            ],
            GroupOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err.current_context(),
            Error::NameResolution { name, .. } if name == "n"
        ));
    }

    #[test]
    fn test_concat_delimiters_are_kept_apart() {
        let compiled = compile(
            "# k x",
            Some("k"),
            &[
                (AggregateCategory::Group, "a=concat_uniq(x, ',')"),
                (AggregateCategory::Group, "b=concat_uniq(x, ';')"),
            ],
        );
        let program = compiled.program().to_string();
        assert!(program.starts_with(
            r#"BEGIN{OFS="\t";__grp_0 = ""; delete __grp_0_heap;__grp_1 = ""; delete __grp_1_heap;}"#
        ));
        assert!(program.contains(r#"(__grp_0 "," __grp_0_sorted[__grp_0_i])"#));
        assert!(program.contains(r#"(__grp_1 ";" __grp_1_sorted[__grp_1_i])"#));
        assert!(program.contains("print(__grp_0,__grp_1);"));
        assert_eq!(compiled.schema().to_string(), "# a:str\tb:str");
    }

    #[test]
    fn test_expose_groups_finalizes_every_row() {
        let compiled = compile_with(
            "# k v:int",
            Some("k"),
            &[(AggregateCategory::Group, "m=median(v)")],
            GroupOptions {
                output_all_keys: false,
                expose_groups: true,
            },
        )
        .unwrap();
        let finalize = "__tmp__ = asort(__grp_0_arr) / 2; __grp_0 = int(__tmp__) == __tmp__ ? \
                        (__grp_0_arr[int(__tmp__)] + __grp_0_arr[int(__tmp__) + 1]) / 2 : \
                        __grp_0_arr[int(__tmp__) + 1];";
        assert_eq!(
            compiled.program().to_string(),
            [
                r#"BEGIN{OFS="\t";delete __grp_0_arr; __grp_0_cnt = 0;}"#,
                r#"{__row_key0 = ($1  "");if(NR==1){__key0 = __row_key0;}"#,
                r#"else{if(__key0!=__row_key0){__key0 = __row_key0;delete __grp_0_arr; __grp_0_cnt = 0;}}"#,
                "__grp_0_arr[++__grp_0_cnt] = $2;",
                finalize,
                "print(__grp_0);}",
            ]
            .concat()
        );
    }
}
