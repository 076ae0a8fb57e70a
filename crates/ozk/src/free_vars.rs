//! Free-variable analysis.
//!
//! Pure structural computation over prepared statements and expressions.
//! Its one consumer is closure capture: a procedure closes over exactly the
//! free identifiers of its body (minus its parameters), and the same walk
//! over the program root rejects programs that mention undeclared names.

use ahash::AHashSet;

use crate::{
    intern::NameId,
    prepare::{Expr, Node, ProcDef},
};

/// The free identifiers of `node`.
///
/// Procedure expressions contribute their precomputed free set, which the
/// `procs` table holds; definitions are registered bottom-up during
/// lowering so every `Expr::Proc` met here is already resolved.
pub(crate) fn stmt_free_vars(node: &Node, procs: &[ProcDef]) -> AHashSet<NameId> {
    let mut free = AHashSet::new();
    collect_stmt(node, procs, &mut free);
    free
}

fn collect_stmt(node: &Node, procs: &[ProcDef], out: &mut AHashSet<NameId>) {
    match node {
        Node::Nop => {}
        Node::Seq(stmts) => {
            for stmt in stmts {
                collect_stmt(stmt, procs, out);
            }
        }
        Node::Var { name, body } => {
            let mut inner = AHashSet::new();
            collect_stmt(body, procs, &mut inner);
            inner.remove(name);
            out.extend(inner);
        }
        Node::Bind { lhs, rhs } => {
            collect_expr(lhs, procs, out);
            collect_expr(rhs, procs, out);
        }
        Node::Conditional { cond, then, orelse } => {
            out.insert(*cond);
            collect_stmt(then, procs, out);
            collect_stmt(orelse, procs, out);
        }
        Node::Match {
            subject,
            pattern,
            then,
            orelse,
        } => {
            out.insert(*subject);
            collect_stmt(orelse, procs, out);
            // pattern binders are bound in the match arm only
            let mut then_free = AHashSet::new();
            collect_stmt(then, procs, &mut then_free);
            for (_, binder) in &pattern.fields {
                then_free.remove(binder);
            }
            out.extend(then_free);
        }
        Node::Apply { target, args } => {
            out.insert(*target);
            out.extend(args.iter().copied());
        }
        Node::Thread(body) => collect_stmt(body, procs, out),
    }
}

fn collect_expr(expr: &Expr, procs: &[ProcDef], out: &mut AHashSet<NameId>) {
    match expr {
        Expr::Ident(name) => {
            out.insert(*name);
        }
        Expr::Literal(_) => {}
        Expr::Record { fields, .. } => {
            for (_, value) in fields {
                collect_expr(value, procs, out);
            }
        }
        Expr::Proc(id) => out.extend(procs[id.index()].free.iter().copied()),
        Expr::Sum(lhs, rhs) | Expr::Product(lhs, rhs) => {
            collect_expr(lhs, procs, out);
            collect_expr(rhs, procs, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ast::{Stmt, ValueExpr},
        prepare,
    };

    fn free_names_of_root(program_ast: &Stmt) -> Vec<String> {
        let program = prepare::lower_unchecked(program_ast);
        let mut names: Vec<String> = stmt_free_vars(&program.root, &program.procs)
            .into_iter()
            .map(|id| program.interns.get(id).to_owned())
            .collect();
        names.sort_unstable();
        names
    }

    #[test]
    fn var_binds_its_name_inside_the_body_only() {
        let ast = Stmt::var("x", Stmt::bind(ValueExpr::ident("x"), ValueExpr::ident("y")));
        assert_eq!(free_names_of_root(&ast), vec!["y"]);
    }

    #[test]
    fn match_binders_are_scoped_to_the_arm() {
        let ast = Stmt::match_on(
            "x",
            ValueExpr::record("pair", vec![(1.into(), ValueExpr::ident("a"))]),
            Stmt::bind(ValueExpr::ident("a"), ValueExpr::ident("b")),
            Stmt::bind(ValueExpr::ident("a"), ValueExpr::int(0)),
        );
        // `a` is free in the else branch but bound by the pattern in `then`
        assert_eq!(free_names_of_root(&ast), vec!["a", "b", "x"]);
    }

    #[test]
    fn procedures_subtract_their_parameters() {
        let ast = Stmt::bind(
            ValueExpr::ident("p"),
            ValueExpr::proc(
                &["k"],
                Stmt::bind(ValueExpr::ident("k"), ValueExpr::sum(ValueExpr::ident("y"), ValueExpr::int(1))),
            ),
        );
        assert_eq!(free_names_of_root(&ast), vec!["p", "y"]);
    }

    #[test]
    fn apply_contributes_target_and_arguments() {
        let ast = Stmt::apply("p", &["a", "b"]);
        assert_eq!(free_names_of_root(&ast), vec!["a", "b", "p"]);
    }
}
