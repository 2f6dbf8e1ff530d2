use assert_cmd::Command;
use indoc::indoc;

fn tabkit() -> Command {
    let mut cmd = Command::cargo_bin("tabkit").unwrap();
    cmd.env_remove("TABKIT_LOG_FILTER");
    cmd
}

fn stdout(cmd: &mut Command) -> String {
    let assert = cmd.assert().success();
    String::from_utf8(assert.get_output().stdout.clone()).unwrap()
}

#[test]
fn test_help() {
    let output = stdout(tabkit().arg("--help"));
    assert!(output.contains("map"));
    assert!(output.contains("group"));
    assert!(output.contains("--log-filters"));
}

#[test]
fn test_map_command_line() {
    let output = stdout(tabkit().args([
        "map",
        "--header",
        "# d p e s c m",
        "--filter",
        "e==157 and (s>100 or s in [15,30,45])",
        "--map",
        "ctr=c/s; cpm=ctr*m",
        "--command-line",
    ]));
    assert_eq!(
        output,
        concat!(
            r#"LC_ALL=C awk  -F $'\t' 'BEGIN{OFS="\t";}{if((($3 == 157) && (($4 > 100) || (($4 == 15) || ($4 == 30) || ($4 == 45))))){ctr = ($5 / $4);print(ctr,(ctr * $6));}}'"#,
            "\n"
        )
    );
}

#[test]
fn test_map_print_header() {
    let output = stdout(tabkit().args([
        "map",
        "--header",
        "# a:int b #ORDER: a",
        "--map",
        "a; c = a * 2",
        "--print-header",
        "--pretty",
        "4",
    ]));
    let (header, program) = output.split_once('\n').unwrap();
    assert_eq!(header, "# a:int\tc:int #ORDER: a");
    assert_eq!(
        program,
        indoc! {r#"
            BEGIN{
                OFS="\t";
            }
            {
                print($1,($1 * 2));
            }
        "#}
    );
}

#[test]
fn test_map_reads_header_from_input() {
    let path = std::env::temp_dir().join(format!("tabkit-cli-{}.tsv", std::process::id()));
    std::fs::write(&path, "# k:str v:int\nx\t1\n").unwrap();

    let output = stdout(
        tabkit()
            .args(["map", "--print-header", "--input"])
            .arg(&path)
            .args(["--filter", "v > 0"]),
    );
    std::fs::remove_file(&path).unwrap();

    assert_eq!(
        output,
        "# k:str\tv:int\nBEGIN{OFS=\"\\t\";}{if(($2 > 0)){print($1,$2);}}\n"
    );
}

#[test]
fn test_group() {
    let output = stdout(tabkit().args([
        "group",
        "--header",
        "# k:str v:int",
        "--key",
        "k",
        "--grp",
        "total=sum(v)",
        "--output-all-keys",
        "--print-header",
    ]));
    assert_eq!(
        output,
        concat!(
            "# k:str\ttotal:int\n",
            r#"BEGIN{OFS="\t";__grp_0 = 0;}"#,
            r#"{__row_key0 = ($1  "");if(NR==1){__key0 = __row_key0;}"#,
            r#"else{if(__key0!=__row_key0){print(__key0,__grp_0);__key0 = __row_key0;__grp_0 = 0;}}"#,
            r#"__grp_0 += $2;}"#,
            r#"END{if(NR!=0){print(__key0,__grp_0);}}"#,
            "\n"
        )
    );
}

#[test]
fn test_group_keeps_statement_order() {
    let output = stdout(tabkit().args([
        "group",
        "--header",
        "# k v:int",
        "--key",
        "k",
        "--grp",
        "total=sum(v)",
        "--acc",
        "n=cnt()",
        "--grp",
        "share=total/n",
        "--print-header",
    ]));
    assert!(
        output.starts_with("# total:int\tn:int\tshare:float\n"),
        "output: {output}"
    );
    assert!(output.contains("__grp_0 = 0;__acc_0 = 0;}"));
}

#[test]
fn test_compile_error_exits_with_failure() {
    let assert = tabkit()
        .args(["map", "--header", "# a b", "--filter", "w > 10"])
        .assert()
        .failure()
        .code(1);
    let stderr = String::from_utf8(assert.get_output().stderr.clone()).unwrap();
    assert!(stderr.contains("unknown name 'w'"), "stderr: {stderr}");
    assert!(assert.get_output().stdout.is_empty());
}

#[test]
fn test_missing_input_is_a_usage_error() {
    tabkit().args(["map", "--map", "a"]).assert().failure();
}
