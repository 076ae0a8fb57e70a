//! Lowering from the boundary AST to the interned internal program.
//!
//! Preparation interns every identifier and atom, hoists procedure bodies
//! into a definition table, precomputes each procedure's free-identifier
//! set, and validates the shapes the executor later relies on: no duplicate
//! record features, record patterns whose field values are identifiers, no
//! duplicate binders or parameters, and no free identifiers at the program
//! root. A prepared [`Program`] is immutable and can be run any number of
//! times.

use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use strum::IntoStaticStr;

use crate::{
    ast,
    error::Exception,
    free_vars,
    intern::{Interns, NameId},
    value::Literal,
};

/// Index into the program's procedure table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub(crate) struct ProcId(u32);

impl ProcId {
    fn new(index: usize) -> Self {
        Self(index.try_into().expect("procedure table overflow"))
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A prepared statement.
#[derive(Debug, Clone, Serialize, Deserialize, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub(crate) enum Node {
    Nop,
    Seq(Vec<Node>),
    Var { name: NameId, body: Box<Node> },
    Bind { lhs: Expr, rhs: Expr },
    Conditional {
        cond: NameId,
        then: Box<Node>,
        orelse: Box<Node>,
    },
    Match {
        subject: NameId,
        pattern: Pattern,
        then: Box<Node>,
        orelse: Box<Node>,
    },
    Apply {
        target: NameId,
        args: SmallVec<[NameId; 4]>,
    },
    Thread(Box<Node>),
}

/// A prepared value expression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) enum Expr {
    Ident(NameId),
    Literal(Literal),
    Record {
        label: Literal,
        fields: Vec<(Literal, Expr)>,
    },
    Proc(ProcId),
    Sum(Box<Expr>, Box<Expr>),
    Product(Box<Expr>, Box<Expr>),
}

/// A record pattern: a label plus one fresh binder per feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Pattern {
    pub label: Literal,
    pub fields: Vec<(Literal, NameId)>,
}

/// A hoisted procedure definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ProcDef {
    pub params: SmallVec<[NameId; 4]>,
    /// Free identifiers of the body minus the parameters, sorted for
    /// deterministic capture environments.
    pub free: Vec<NameId>,
    pub body: Node,
}

/// A validated, interned program ready to run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Program {
    pub root: Node,
    pub procs: Vec<ProcDef>,
    pub interns: Interns,
}

impl Program {
    pub fn proc(&self, id: ProcId) -> &ProcDef {
        &self.procs[id.index()]
    }
}

/// Lowers and validates `root`.
pub(crate) fn prepare(root: &ast::Stmt) -> Result<Program, Exception> {
    let mut lowerer = Lowerer::default();
    let root = lowerer.lower_stmt(root)?;

    let free = free_vars::stmt_free_vars(&root, &lowerer.procs);
    if !free.is_empty() {
        let mut names: Vec<&str> = free.iter().map(|id| lowerer.interns.get(*id)).collect();
        names.sort_unstable();
        return Err(Exception::prepare(format!(
            "unbound identifier(s): {}",
            names.join(", ")
        )));
    }

    Ok(Program {
        root,
        procs: lowerer.procs,
        interns: lowerer.interns,
    })
}

/// Lowering without the root free-identifier check, for analysis tests
/// that deliberately build open statements.
#[cfg(test)]
pub(crate) fn lower_unchecked(root: &ast::Stmt) -> Program {
    let mut lowerer = Lowerer::default();
    let root = lowerer.lower_stmt(root).expect("test statement failed validation");
    Program {
        root,
        procs: lowerer.procs,
        interns: lowerer.interns,
    }
}

#[derive(Default)]
struct Lowerer {
    interns: Interns,
    procs: Vec<ProcDef>,
}

impl Lowerer {
    fn lower_stmt(&mut self, stmt: &ast::Stmt) -> Result<Node, Exception> {
        Ok(match stmt {
            ast::Stmt::Nop => Node::Nop,
            ast::Stmt::Seq(stmts) => Node::Seq(
                stmts
                    .iter()
                    .map(|stmt| self.lower_stmt(stmt))
                    .collect::<Result<_, _>>()?,
            ),
            ast::Stmt::Var { name, body } => Node::Var {
                name: self.interns.intern(name),
                body: Box::new(self.lower_stmt(body)?),
            },
            ast::Stmt::Bind { lhs, rhs } => Node::Bind {
                lhs: self.lower_expr(lhs)?,
                rhs: self.lower_expr(rhs)?,
            },
            ast::Stmt::Conditional { cond, then, orelse } => Node::Conditional {
                cond: self.interns.intern(cond),
                then: Box::new(self.lower_stmt(then)?),
                orelse: Box::new(self.lower_stmt(orelse)?),
            },
            ast::Stmt::Match {
                subject,
                pattern,
                then,
                orelse,
            } => Node::Match {
                subject: self.interns.intern(subject),
                pattern: self.lower_pattern(pattern)?,
                then: Box::new(self.lower_stmt(then)?),
                orelse: Box::new(self.lower_stmt(orelse)?),
            },
            ast::Stmt::Apply { proc, args } => Node::Apply {
                target: self.interns.intern(proc),
                args: args.iter().map(|arg| self.interns.intern(arg)).collect(),
            },
            ast::Stmt::Thread(body) => Node::Thread(Box::new(self.lower_stmt(body)?)),
        })
    }

    fn lower_expr(&mut self, expr: &ast::ValueExpr) -> Result<Expr, Exception> {
        Ok(match expr {
            ast::ValueExpr::Ident(name) => Expr::Ident(self.interns.intern(name)),
            ast::ValueExpr::Literal(lit) => Expr::Literal(self.lower_lit(lit)),
            ast::ValueExpr::Record { label, fields } => {
                let label = self.lower_lit(label);
                let mut seen = AHashSet::new();
                let mut lowered = Vec::with_capacity(fields.len());
                for (feature, value) in fields {
                    let lowered_feature = self.lower_lit(feature);
                    if !seen.insert(lowered_feature.clone()) {
                        return Err(Exception::prepare(format!(
                            "duplicate feature {feature} in record construction"
                        )));
                    }
                    lowered.push((lowered_feature, self.lower_expr(value)?));
                }
                Expr::Record { label, fields: lowered }
            }
            ast::ValueExpr::Proc { params, body } => {
                let params: SmallVec<[NameId; 4]> =
                    params.iter().map(|param| self.interns.intern(param)).collect();
                let mut seen = AHashSet::new();
                for param in &params {
                    if !seen.insert(*param) {
                        return Err(Exception::prepare(format!(
                            "duplicate parameter {} in procedure definition",
                            self.interns.get(*param)
                        )));
                    }
                }
                let body = self.lower_stmt(body)?;
                let mut free = free_vars::stmt_free_vars(&body, &self.procs);
                for param in &params {
                    free.remove(param);
                }
                let mut free: Vec<NameId> = free.into_iter().collect();
                free.sort_unstable();
                let id = ProcId::new(self.procs.len());
                self.procs.push(ProcDef { params, free, body });
                Expr::Proc(id)
            }
            ast::ValueExpr::Sum(lhs, rhs) => {
                Expr::Sum(Box::new(self.lower_expr(lhs)?), Box::new(self.lower_expr(rhs)?))
            }
            ast::ValueExpr::Product(lhs, rhs) => {
                Expr::Product(Box::new(self.lower_expr(lhs)?), Box::new(self.lower_expr(rhs)?))
            }
        })
    }

    fn lower_pattern(&mut self, pattern: &ast::ValueExpr) -> Result<Pattern, Exception> {
        let ast::ValueExpr::Record { label, fields } = pattern else {
            return Err(Exception::prepare("match pattern must be a record"));
        };
        let label = self.lower_lit(label);
        let mut features = AHashSet::new();
        let mut binders = AHashSet::new();
        let mut lowered = Vec::with_capacity(fields.len());
        for (feature, value) in fields {
            let ast::ValueExpr::Ident(binder) = value else {
                return Err(Exception::prepare(format!(
                    "record pattern field {feature} must be an identifier"
                )));
            };
            let lowered_feature = self.lower_lit(feature);
            if !features.insert(lowered_feature.clone()) {
                return Err(Exception::prepare(format!(
                    "duplicate feature {feature} in record pattern"
                )));
            }
            let binder = self.interns.intern(binder);
            if !binders.insert(binder) {
                return Err(Exception::prepare(format!(
                    "duplicate binder {} in record pattern",
                    self.interns.get(binder)
                )));
            }
            lowered.push((lowered_feature, binder));
        }
        Ok(Pattern { label, fields: lowered })
    }

    fn lower_lit(&mut self, lit: &ast::Lit) -> Literal {
        match lit {
            ast::Lit::Bool(v) => Literal::Bool(*v),
            ast::Lit::Int(v) => Literal::Int(v.clone()),
            ast::Lit::Atom(name) => Literal::Atom(self.interns.intern(name)),
        }
    }
}
