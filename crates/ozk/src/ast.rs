//! The parser-facing AST contract.
//!
//! There is no concrete-syntax parser in this crate: programs arrive as
//! already-built statement trees. Hosts either construct them through the
//! builder helpers below or deserialize them (the derives use serde's
//! externally-tagged form with snake_case variant names, which is what the
//! JSON test cases under `testcases/` contain).

use std::fmt;

use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

/// A kernel-language statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stmt {
    /// Does nothing.
    Nop,
    /// Children execute in order, under the same environment.
    Seq(Vec<Stmt>),
    /// Introduces a fresh logic variable scoped to `body`, shadowing any
    /// outer binding of the same name.
    Var { name: String, body: Box<Stmt> },
    /// Unifies two value expressions.
    Bind { lhs: ValueExpr, rhs: ValueExpr },
    /// Branches on a boolean variable; suspends while it is unbound.
    Conditional {
        cond: String,
        then: Box<Stmt>,
        orelse: Box<Stmt>,
    },
    /// Matches a variable against a record pattern; the pattern's field
    /// values must be identifiers, each binding a fresh variable in `then`.
    Match {
        subject: String,
        pattern: ValueExpr,
        then: Box<Stmt>,
        orelse: Box<Stmt>,
    },
    /// Calls the procedure bound to `proc` with argument variables.
    Apply { proc: String, args: Vec<String> },
    /// Spawns a new thread running `body` under the current environment.
    Thread(Box<Stmt>),
}

/// An uncomputed value expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueExpr {
    Ident(String),
    Literal(Lit),
    Record {
        label: Lit,
        fields: Vec<(Lit, ValueExpr)>,
    },
    Proc {
        params: Vec<String>,
        body: Box<Stmt>,
    },
    Sum(Box<ValueExpr>, Box<ValueExpr>),
    Product(Box<ValueExpr>, Box<ValueExpr>),
}

/// An atomic literal: a boolean, an integer, or an atom.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lit {
    Bool(bool),
    Int(#[serde(with = "int_repr")] BigInt),
    Atom(String),
}

impl fmt::Display for Lit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Atom(name) => write!(f, "{name}"),
        }
    }
}

impl From<i64> for Lit {
    fn from(v: i64) -> Self {
        Self::Int(BigInt::from(v))
    }
}

impl From<bool> for Lit {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for Lit {
    fn from(v: &str) -> Self {
        Self::Atom(v.to_owned())
    }
}

impl Stmt {
    #[must_use]
    pub fn seq(stmts: Vec<Self>) -> Self {
        Self::Seq(stmts)
    }

    #[must_use]
    pub fn var(name: impl Into<String>, body: Self) -> Self {
        Self::Var {
            name: name.into(),
            body: Box::new(body),
        }
    }

    #[must_use]
    pub fn bind(lhs: ValueExpr, rhs: ValueExpr) -> Self {
        Self::Bind { lhs, rhs }
    }

    #[must_use]
    pub fn conditional(cond: impl Into<String>, then: Self, orelse: Self) -> Self {
        Self::Conditional {
            cond: cond.into(),
            then: Box::new(then),
            orelse: Box::new(orelse),
        }
    }

    #[must_use]
    pub fn match_on(subject: impl Into<String>, pattern: ValueExpr, then: Self, orelse: Self) -> Self {
        Self::Match {
            subject: subject.into(),
            pattern,
            then: Box::new(then),
            orelse: Box::new(orelse),
        }
    }

    #[must_use]
    pub fn apply(proc: impl Into<String>, args: &[&str]) -> Self {
        Self::Apply {
            proc: proc.into(),
            args: args.iter().map(|a| (*a).to_owned()).collect(),
        }
    }

    #[must_use]
    pub fn thread(body: Self) -> Self {
        Self::Thread(Box::new(body))
    }
}

impl ValueExpr {
    #[must_use]
    pub fn ident(name: impl Into<String>) -> Self {
        Self::Ident(name.into())
    }

    #[must_use]
    pub fn int(v: i64) -> Self {
        Self::Literal(Lit::from(v))
    }

    #[must_use]
    pub fn boolean(v: bool) -> Self {
        Self::Literal(Lit::Bool(v))
    }

    #[must_use]
    pub fn atom(name: impl Into<String>) -> Self {
        Self::Literal(Lit::Atom(name.into()))
    }

    #[must_use]
    pub fn record(label: impl Into<Lit>, fields: Vec<(Lit, Self)>) -> Self {
        Self::Record {
            label: label.into(),
            fields,
        }
    }

    #[must_use]
    pub fn proc(params: &[&str], body: Stmt) -> Self {
        Self::Proc {
            params: params.iter().map(|p| (*p).to_owned()).collect(),
            body: Box::new(body),
        }
    }

    #[must_use]
    pub fn sum(lhs: Self, rhs: Self) -> Self {
        Self::Sum(Box::new(lhs), Box::new(rhs))
    }

    #[must_use]
    pub fn product(lhs: Self, rhs: Self) -> Self {
        Self::Product(Box::new(lhs), Box::new(rhs))
    }
}

/// Serde representation for integer literals.
///
/// Human-readable formats get a plain number when the value fits `i64` and
/// a decimal string otherwise; binary formats use num-bigint's native
/// encoding. Deserialization accepts either form.
pub(crate) mod int_repr {
    use std::fmt;

    use num_bigint::BigInt;
    use num_traits::ToPrimitive;
    use serde::{Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(value: &BigInt, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            match value.to_i64() {
                Some(small) => serializer.serialize_i64(small),
                None => serializer.serialize_str(&value.to_string()),
            }
        } else {
            serde::Serialize::serialize(value, serializer)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigInt, D::Error> {
        if deserializer.is_human_readable() {
            deserializer.deserialize_any(IntVisitor)
        } else {
            serde::Deserialize::deserialize(deserializer)
        }
    }

    struct IntVisitor;

    impl de::Visitor<'_> for IntVisitor {
        type Value = BigInt;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("an integer or a decimal string")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<BigInt, E> {
            Ok(BigInt::from(v))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<BigInt, E> {
            Ok(BigInt::from(v))
        }

        fn visit_i128<E: de::Error>(self, v: i128) -> Result<BigInt, E> {
            Ok(BigInt::from(v))
        }

        fn visit_u128<E: de::Error>(self, v: u128) -> Result<BigInt, E> {
            Ok(BigInt::from(v))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<BigInt, E> {
            v.parse()
                .map_err(|_| E::custom(format_args!("invalid integer literal: {v}")))
        }
    }
}
