//! Runtime values.

use indexmap::IndexMap;
use num_bigint::BigInt;

use crate::{
    env::Env,
    intern::{Interns, NameId},
    prepare::ProcId,
    store::{Slot, Store},
};

/// Record fields keyed by feature literal.
///
/// Insertion order is preserved for rendering; identity is decided by the
/// feature *set*, so order never affects unification.
pub type FieldMap = IndexMap<Literal, Value, ahash::RandomState>;

/// An atomic value: a boolean, an integer, or an atom.
///
/// Atoms carry their interned spelling; resolving it back to text needs the
/// program's interner, which is why rendering goes through the run output
/// rather than a `Display` impl.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Literal {
    Bool(bool),
    Int(#[serde(with = "crate::ast::int_repr")] BigInt),
    Atom(NameId),
}

/// A computed value as stored in equivalence classes and record fields.
///
/// `Ident` never survives into the store: the evaluator reifies identifiers
/// into `Var` slot references first.
#[derive(Debug, Clone)]
pub enum Value {
    Literal(Literal),
    /// Reified reference to a store slot, used inside computed records to
    /// break the identifier-to-slot dependency.
    Var(Slot),
    Record(Record),
    Proc(Closure),
}

/// A record value: a label plus feature-indexed fields.
#[derive(Debug, Clone)]
pub struct Record {
    pub label: Literal,
    pub fields: FieldMap,
}

/// A procedure value: the hoisted definition plus its capture environment,
/// the defining environment restricted to the body's free identifiers.
#[derive(Debug, Clone)]
pub struct Closure {
    pub(crate) def: ProcId,
    pub(crate) arity: usize,
    pub(crate) env: Env,
}

impl Closure {
    /// Number of formal parameters.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.arity
    }
}

impl Value {
    /// Kind name for error messages.
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Self::Literal(_) => "literal",
            Self::Var(_) => "variable",
            Self::Record(_) => "record",
            Self::Proc(_) => "procedure",
        }
    }
}

/// Renders `value` in Oz-style concrete syntax, resolving `Var` references
/// through the store. Unbound variables print as `_sN`; a cycle back into a
/// class already being rendered prints as `...`.
pub(crate) fn render_value(value: &Value, store: &Store, interns: &Interns) -> String {
    let mut out = String::new();
    write_value(&mut out, value, store, interns, &mut Vec::new());
    out
}

/// Renders a literal on its own, for error messages.
pub(crate) fn literal_repr(literal: &Literal, interns: &Interns) -> String {
    let mut out = String::new();
    write_literal(&mut out, literal, interns);
    out
}

fn write_value(out: &mut String, value: &Value, store: &Store, interns: &Interns, active: &mut Vec<Slot>) {
    use std::fmt::Write;
    match value {
        Value::Literal(literal) => write_literal(out, literal, interns),
        Value::Var(slot) => {
            if active.iter().any(|open| store.same_class(*open, *slot)) {
                out.push_str("...");
                return;
            }
            match store.class_of(*slot).value() {
                None => {
                    let _ = write!(out, "_{slot}");
                }
                Some(inner) => {
                    active.push(*slot);
                    write_value(out, inner, store, interns, active);
                    active.pop();
                }
            }
        }
        Value::Record(record) => {
            write_literal(out, &record.label, interns);
            out.push('(');
            for (i, (feature, field)) in record.fields.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                write_literal(out, feature, interns);
                out.push(':');
                write_value(out, field, store, interns, active);
            }
            out.push(')');
        }
        Value::Proc(closure) => {
            let _ = write!(out, "<P/{}>", closure.arity);
        }
    }
}

fn write_literal(out: &mut String, literal: &Literal, interns: &Interns) {
    use std::fmt::Write;
    match literal {
        Literal::Bool(v) => {
            let _ = write!(out, "{v}");
        }
        Literal::Int(v) => {
            let _ = write!(out, "{v}");
        }
        Literal::Atom(id) => {
            let name = interns.get(*id);
            if is_plain_atom(name) {
                out.push_str(name);
            } else {
                let _ = write!(out, "'{name}'");
            }
        }
    }
}

/// True when an atom prints without quotes: a lowercase letter followed by
/// alphanumerics or underscores.
fn is_plain_atom(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
