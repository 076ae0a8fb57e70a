//! Unification over the single-assignment store.
//!
//! `bind` statements and pattern-match binders both come through here.
//! Dispatch happens in three layers: expression-level (identifiers are
//! resolved through the environment), slot-level (equivalence classes are
//! joined), and value-level (computed values are compared structurally).
//! Cycles through records always pass through at least one slot, and the
//! slot-level path marks the pair before recursing into the previously
//! bound values, so unification of cyclic records terminates.

use ahash::AHashSet;

use crate::{
    env::Env,
    error::{RunError, RunResult},
    eval,
    prepare::{Expr, Program},
    store::{Slot, Store, UnionOutcome},
    value::{Value, literal_repr},
};

/// One unification activation.
///
/// `marked` holds the slot pairs whose classes are already being unified
/// higher up the recursion; meeting one again means a cycle closed and the
/// pair needs no further work.
pub(crate) struct Unifier<'a> {
    store: &'a mut Store,
    program: &'a Program,
    marked: AHashSet<(Slot, Slot)>,
}

impl<'a> Unifier<'a> {
    pub fn new(store: &'a mut Store, program: &'a Program) -> Self {
        Self {
            store,
            program,
            marked: AHashSet::new(),
        }
    }

    /// Unifies two value expressions under `env`.
    ///
    /// Both sides are computed before any store mutation, so a suspension
    /// raised by an arithmetic operand leaves the store untouched and the
    /// statement can be retried verbatim.
    pub fn unify_exprs(&mut self, env: &Env, lhs: &Expr, rhs: &Expr) -> RunResult<()> {
        match (lhs, rhs) {
            (Expr::Ident(x), Expr::Ident(y)) => self.unify_slots(env.lookup(*x), env.lookup(*y)),
            (Expr::Ident(x), value) | (value, Expr::Ident(x)) => {
                let slot = env.lookup(*x);
                let value = eval::compute(self.program, self.store, env, value)?;
                self.unify_slot_value(slot, value)
            }
            (lhs, rhs) => {
                let lhs = eval::compute(self.program, self.store, env, lhs)?;
                let rhs = eval::compute(self.program, self.store, env, rhs)?;
                self.unify_values(&lhs, &rhs)
            }
        }
    }

    /// var/var: joins the two equivalence classes.
    pub fn unify_slots(&mut self, a: Slot, b: Slot) -> RunResult<()> {
        if self.marked.contains(&(a, b)) || self.marked.contains(&(b, a)) {
            return Ok(());
        }
        match self.store.union(a, b) {
            UnionOutcome::Same | UnionOutcome::Merged => Ok(()),
            UnionOutcome::BothBound(kept, absorbed) => {
                // The redirect is already committed, so the recursion below
                // sees one class even when the two values reference each
                // other's slots.
                self.marked.insert((a, b));
                self.unify_values(&kept, &absorbed)
            }
        }
    }

    /// var/value: binds an unbound class, otherwise unifies with the
    /// stored value.
    pub fn unify_slot_value(&mut self, slot: Slot, value: Value) -> RunResult<()> {
        if let Value::Var(other) = value {
            return self.unify_slots(slot, other);
        }
        match self.store.class_of(slot).value() {
            None => {
                self.store.bind(slot, value);
                Ok(())
            }
            Some(stored) => {
                let stored = stored.clone();
                self.unify_values(&stored, &value)
            }
        }
    }

    /// value/value: structural dispatch on the value kinds.
    pub fn unify_values(&mut self, lhs: &Value, rhs: &Value) -> RunResult<()> {
        match (lhs, rhs) {
            (Value::Var(a), Value::Var(b)) => self.unify_slots(*a, *b),
            (Value::Var(slot), value) | (value, Value::Var(slot)) => self.unify_slot_value(*slot, value.clone()),
            (Value::Proc(_), _) | (_, Value::Proc(_)) => Err(RunError::unify("procedures never unify")),
            (Value::Literal(a), Value::Literal(b)) => {
                if a == b {
                    Ok(())
                } else {
                    Err(RunError::unify(format!(
                        "cannot unify {} with {}",
                        literal_repr(a, &self.program.interns),
                        literal_repr(b, &self.program.interns),
                    )))
                }
            }
            (Value::Record(a), Value::Record(b)) => {
                if a.label != b.label {
                    return Err(RunError::unify(format!(
                        "record labels differ: {} vs {}",
                        literal_repr(&a.label, &self.program.interns),
                        literal_repr(&b.label, &self.program.interns),
                    )));
                }
                if a.fields.len() != b.fields.len() {
                    return Err(RunError::unify(format!(
                        "record arities differ: {} vs {}",
                        a.fields.len(),
                        b.fields.len()
                    )));
                }
                // feature sets are compared as sets; field order is identity-free
                for feature in a.fields.keys() {
                    if !b.fields.contains_key(feature) {
                        return Err(RunError::unify(format!(
                            "record feature {} has no counterpart",
                            literal_repr(feature, &self.program.interns),
                        )));
                    }
                }
                for (feature, field) in &a.fields {
                    self.unify_values(field, &b.fields[feature])?;
                }
                Ok(())
            }
            (lhs, rhs) => Err(RunError::type_error(format!(
                "cannot unify a {} with a {}",
                lhs.kind(),
                rhs.kind()
            ))),
        }
    }
}
