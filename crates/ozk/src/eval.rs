//! Resolving value expressions into computed values.

use num_bigint::BigInt;

use crate::{
    env::Env,
    error::{RunError, RunResult},
    prepare::{Expr, Program},
    store::Store,
    value::{Closure, FieldMap, Literal, Record, Value},
};

/// Computes the value of `expr` under `env`.
///
/// Identifiers reify into `Var` slot references and never survive into the
/// store as names. Records compute field-wise. A procedure expression
/// closes over the restriction of `env` to its free identifiers. Arithmetic
/// requires bound integer operands; an unbound operand raises
/// `RunError::Unbound` carrying the slot, which the scheduler turns into
/// dataflow suspension.
pub(crate) fn compute(program: &Program, store: &Store, env: &Env, expr: &Expr) -> RunResult<Value> {
    match expr {
        Expr::Ident(name) => Ok(Value::Var(env.lookup(*name))),
        Expr::Literal(literal) => Ok(Value::Literal(literal.clone())),
        Expr::Record { label, fields } => {
            let mut computed = FieldMap::default();
            for (feature, value) in fields {
                computed.insert(feature.clone(), compute(program, store, env, value)?);
            }
            Ok(Value::Record(Record {
                label: label.clone(),
                fields: computed,
            }))
        }
        Expr::Proc(id) => {
            let def = program.proc(*id);
            Ok(Value::Proc(Closure {
                def: *id,
                arity: def.params.len(),
                env: env.restrict(&def.free),
            }))
        }
        Expr::Sum(lhs, rhs) => {
            let lhs = numeric_operand(program, store, env, lhs)?;
            let rhs = numeric_operand(program, store, env, rhs)?;
            Ok(Value::Literal(Literal::Int(lhs + rhs)))
        }
        Expr::Product(lhs, rhs) => {
            let lhs = numeric_operand(program, store, env, lhs)?;
            let rhs = numeric_operand(program, store, env, rhs)?;
            Ok(Value::Literal(Literal::Int(lhs * rhs)))
        }
    }
}

/// An arithmetic operand: an identifier must resolve to a *bound* integer
/// (suspending on the slot otherwise); anything else computes recursively
/// and must come out an integer literal.
fn numeric_operand(program: &Program, store: &Store, env: &Env, expr: &Expr) -> RunResult<BigInt> {
    match expr {
        Expr::Ident(name) => {
            let slot = env.lookup(*name);
            match store.class_of(slot).value() {
                None => Err(RunError::Unbound(slot)),
                Some(Value::Literal(Literal::Int(n))) => Ok(n.clone()),
                Some(other) => Err(RunError::type_error(format!(
                    "arithmetic operand must be an integer, found a {}",
                    other.kind()
                ))),
            }
        }
        other => match compute(program, store, env, other)? {
            Value::Literal(Literal::Int(n)) => Ok(n),
            other => Err(RunError::type_error(format!(
                "arithmetic operand must be an integer, found a {}",
                other.kind()
            ))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ast::{Stmt, ValueExpr},
        prepare::{self, Node},
    };

    #[test]
    fn closures_capture_exactly_their_free_identifiers() {
        // p = proc {k a} if k then a = y else a = d end — free: {y, d}
        let proc_expr = ValueExpr::proc(
            &["k", "a"],
            Stmt::conditional(
                "k",
                Stmt::bind(ValueExpr::ident("a"), ValueExpr::ident("y")),
                Stmt::bind(ValueExpr::ident("a"), ValueExpr::ident("d")),
            ),
        );
        let program_ast = Stmt::bind(ValueExpr::ident("p"), proc_expr);
        let mut program = prepare::lower_unchecked(&program_ast);
        assert_eq!(program.procs.len(), 1);

        // the defining environment holds more names than the body uses
        let extra = program.interns.intern("unused");
        let mut store = Store::new();
        let mut env = Env::default();
        for id in [
            program.interns.lookup("y").expect("interned"),
            program.interns.lookup("d").expect("interned"),
            program.interns.lookup("p").expect("interned"),
            extra,
        ] {
            env = env.bind_new(id, store.alloc());
        }

        let Node::Bind { rhs, .. } = &program.root else {
            panic!("expected a bind at the root");
        };
        let value = compute(&program, &store, &env, rhs).expect("compute should succeed");
        let Value::Proc(closure) = value else {
            panic!("expected a procedure value");
        };
        assert_eq!(closure.arity(), 2);

        let mut expected = vec![
            program.interns.lookup("y").expect("interned"),
            program.interns.lookup("d").expect("interned"),
        ];
        expected.sort_unstable();
        assert_eq!(closure.env.names(), expected);
    }

    #[test]
    fn arithmetic_on_an_unbound_operand_suspends() {
        let program_ast = Stmt::bind(
            ValueExpr::ident("x"),
            ValueExpr::sum(ValueExpr::ident("y"), ValueExpr::int(2)),
        );
        let program = prepare::lower_unchecked(&program_ast);
        let mut store = Store::new();
        let y = program.interns.lookup("y").expect("interned");
        let x = program.interns.lookup("x").expect("interned");
        let slot_y = store.alloc();
        let env = Env::default().bind_all([(x, store.alloc()), (y, slot_y)]);

        let Node::Bind { rhs, .. } = &program.root else {
            panic!("expected a bind at the root");
        };
        match compute(&program, &store, &env, rhs) {
            Err(RunError::Unbound(slot)) => assert_eq!(slot, slot_y),
            other => panic!("expected suspension on the unbound operand, got {other:?}"),
        }
    }
}
