//! Pattern matching and scoping.

use ozk::{
    Runner,
    ast::{Stmt, ValueExpr},
};
use pretty_assertions::assert_eq;

fn run(program: &Stmt) -> ozk::RunOutput {
    Runner::new(program).unwrap().run_no_limits().unwrap()
}

#[test]
fn match_binds_pattern_identifiers_to_the_fields() {
    let program = Stmt::var(
        "x",
        Stmt::var(
            "y",
            Stmt::seq(vec![
                Stmt::bind(
                    ValueExpr::ident("x"),
                    ValueExpr::record(
                        "pair",
                        vec![(1.into(), ValueExpr::int(7)), (2.into(), ValueExpr::int(8))],
                    ),
                ),
                Stmt::match_on(
                    "x",
                    ValueExpr::record(
                        "pair",
                        vec![
                            (1.into(), ValueExpr::ident("a")),
                            (2.into(), ValueExpr::ident("b")),
                        ],
                    ),
                    Stmt::bind(
                        ValueExpr::ident("y"),
                        ValueExpr::sum(ValueExpr::ident("a"), ValueExpr::ident("b")),
                    ),
                    Stmt::bind(ValueExpr::ident("y"), ValueExpr::int(0)),
                ),
            ]),
        ),
    );
    let output = run(&program);
    assert_eq!(output.int_of("y"), Some(15));
}

#[test]
fn match_on_a_non_record_takes_the_else_branch() {
    let program = Stmt::var(
        "x",
        Stmt::var(
            "y",
            Stmt::seq(vec![
                Stmt::bind(ValueExpr::ident("x"), ValueExpr::int(3)),
                Stmt::match_on(
                    "x",
                    ValueExpr::record("pair", vec![(1.into(), ValueExpr::ident("a"))]),
                    Stmt::bind(ValueExpr::ident("y"), ValueExpr::int(1)),
                    Stmt::bind(ValueExpr::ident("y"), ValueExpr::int(2)),
                ),
            ]),
        ),
    );
    assert_eq!(run(&program).int_of("y"), Some(2));
}

#[test]
fn match_on_a_procedure_takes_the_else_branch() {
    let program = Stmt::var(
        "x",
        Stmt::var(
            "y",
            Stmt::seq(vec![
                Stmt::bind(ValueExpr::ident("x"), ValueExpr::proc(&[], Stmt::Nop)),
                Stmt::match_on(
                    "x",
                    ValueExpr::record("pair", vec![(1.into(), ValueExpr::ident("a"))]),
                    Stmt::bind(ValueExpr::ident("y"), ValueExpr::int(1)),
                    Stmt::bind(ValueExpr::ident("y"), ValueExpr::int(2)),
                ),
            ]),
        ),
    );
    assert_eq!(run(&program).int_of("y"), Some(2));
}

/// Pattern binders alias the record's fields: binding one afterwards
/// constrains the record itself.
#[test]
fn pattern_binders_share_the_field_slots() {
    let program = Stmt::var(
        "x",
        Stmt::var(
            "u",
            Stmt::seq(vec![
                Stmt::bind(
                    ValueExpr::ident("x"),
                    ValueExpr::record("box", vec![(1.into(), ValueExpr::ident("u"))]),
                ),
                Stmt::match_on(
                    "x",
                    ValueExpr::record("box", vec![(1.into(), ValueExpr::ident("a"))]),
                    Stmt::bind(ValueExpr::ident("a"), ValueExpr::int(11)),
                    Stmt::Nop,
                ),
            ]),
        ),
    );
    let output = run(&program);
    assert_eq!(output.int_of("u"), Some(11));
    assert_eq!(output.render("x").unwrap(), "box(1:11)");
}

/// Inner `var` shadows; the outer binding is untouched by the inner scope.
#[test]
fn var_shadows_without_disturbing_the_outer_binding() {
    // x = 10, then an inner x is passed to p1 which binds it to x*x of the
    // *outer* x captured by the nested procedure
    let inner_proc = ValueExpr::proc(
        &["z"],
        Stmt::conditional(
            "z",
            Stmt::bind(
                ValueExpr::ident("y"),
                ValueExpr::product(ValueExpr::ident("x"), ValueExpr::ident("x")),
            ),
            Stmt::bind(ValueExpr::ident("x"), ValueExpr::ident("z")),
        ),
    );
    let outer_proc = ValueExpr::proc(
        &["y"],
        Stmt::var(
            "p2",
            Stmt::seq(vec![
                Stmt::bind(ValueExpr::ident("p2"), inner_proc),
                Stmt::var(
                    "w",
                    Stmt::seq(vec![
                        Stmt::bind(ValueExpr::ident("w"), ValueExpr::boolean(true)),
                        Stmt::apply("p2", &["w"]),
                    ]),
                ),
            ]),
        ),
    );
    let program = Stmt::var(
        "x",
        Stmt::var(
            "p1",
            Stmt::seq(vec![
                Stmt::bind(ValueExpr::ident("p1"), outer_proc),
                Stmt::bind(ValueExpr::ident("x"), ValueExpr::int(10)),
                Stmt::var("x", Stmt::apply("p1", &["x"])),
            ]),
        ),
    );
    let output = run(&program);
    // the last declaration of x is the inner one, bound by the call
    assert_eq!(output.int_of("x"), Some(100));
}
