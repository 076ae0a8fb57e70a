//! Statement reduction.
//!
//! One statement of one thread is reduced per scheduler dispatch. The
//! reduction either pushes continuations onto the thread's stack, mutates
//! the store through the unifier, or raises: `Unbound` for dataflow
//! suspension, anything else to halt the run. `thread` statements never
//! reach here; the scheduler intercepts them.

use crate::{
    env::Env,
    error::{RunError, RunResult},
    prepare::{Node, Pattern},
    resource::ResourceTracker,
    schedule::{Frame, Machine, Thread},
    tracer::Tracer,
    unify::Unifier,
    value::{Literal, Record, Value},
};

impl<'p, R: ResourceTracker, T: Tracer> Machine<'p, '_, R, T> {
    /// Reduces `node` against `thread`'s stack under `env`.
    ///
    /// No store or stack state is committed before a possible `Unbound` is
    /// raised, so the scheduler can push the frame back and retry the
    /// identical statement once the slot is bound.
    pub(crate) fn reduce(&mut self, thread: &mut Thread<'p>, node: &'p Node, env: &Env) -> RunResult<()> {
        match node {
            Node::Nop => Ok(()),
            Node::Seq(stmts) => {
                // reversed, so the first child is reduced first
                for stmt in stmts.iter().rev() {
                    thread.stack.push(Frame::new(stmt, env.clone()));
                }
                Ok(())
            }
            Node::Var { name, body } => {
                self.tracker.on_alloc()?;
                let slot = self.store.alloc();
                self.declarations.push((*name, slot));
                thread.stack.push(Frame::new(body, env.bind_new(*name, slot)));
                Ok(())
            }
            Node::Bind { lhs, rhs } => Unifier::new(&mut self.store, self.program).unify_exprs(env, lhs, rhs),
            Node::Conditional { cond, then, orelse } => {
                let slot = env.lookup(*cond);
                let Some(value) = self.store.class_of(slot).value() else {
                    return Err(RunError::Unbound(slot));
                };
                match value {
                    Value::Literal(Literal::Bool(truth)) => {
                        let branch = if *truth { then } else { orelse };
                        thread.stack.push(Frame::new(branch, env.clone()));
                        Ok(())
                    }
                    other => Err(RunError::type_error(format!(
                        "conditional requires a boolean, found a {}",
                        other.kind()
                    ))),
                }
            }
            Node::Match {
                subject,
                pattern,
                then,
                orelse,
            } => {
                let slot = env.lookup(*subject);
                let Some(value) = self.store.class_of(slot).value() else {
                    return Err(RunError::Unbound(slot));
                };
                // clone the matched fields out so the store can be grown below
                let picked = match value {
                    Value::Record(record) if pattern_matches(pattern, record) => Some(
                        pattern
                            .fields
                            .iter()
                            .map(|(feature, binder)| (*binder, record.fields[feature].clone()))
                            .collect::<Vec<_>>(),
                    ),
                    _ => None,
                };
                match picked {
                    Some(bindings) => {
                        let mut pairs = Vec::with_capacity(bindings.len());
                        for (binder, field) in bindings {
                            self.tracker.on_alloc()?;
                            let fresh = self.store.alloc();
                            self.declarations.push((binder, fresh));
                            Unifier::new(&mut self.store, self.program).unify_slot_value(fresh, field)?;
                            pairs.push((binder, fresh));
                        }
                        thread.stack.push(Frame::new(then, env.bind_all(pairs)));
                    }
                    None => thread.stack.push(Frame::new(orelse, env.clone())),
                }
                Ok(())
            }
            Node::Apply { target, args } => {
                let slot = env.lookup(*target);
                let Some(value) = self.store.class_of(slot).value() else {
                    return Err(RunError::Unbound(slot));
                };
                let Value::Proc(closure) = value else {
                    return Err(RunError::type_error(format!("cannot apply a {}", value.kind())));
                };
                if closure.arity != args.len() {
                    return Err(RunError::type_error(format!(
                        "procedure expects {} argument(s), got {}",
                        closure.arity,
                        args.len()
                    )));
                }
                let closure = closure.clone();
                let def = self.program.proc(closure.def);
                // argument slots are shared with the caller, not copied
                let call_env = closure.env.bind_all(
                    def.params
                        .iter()
                        .zip(args.iter())
                        .map(|(param, arg)| (*param, env.lookup(*arg))),
                );
                thread.stack.push(Frame::new(&def.body, call_env));
                Ok(())
            }
            Node::Thread(_) => unreachable!("thread statements are reduced by the scheduler"),
        }
    }
}

/// Shape check: label, arity, and feature set (order-insensitive).
fn pattern_matches(pattern: &Pattern, record: &Record) -> bool {
    pattern.label == record.label
        && pattern.fields.len() == record.fields.len()
        && pattern
            .fields
            .iter()
            .all(|(feature, _)| record.fields.contains_key(feature))
}
