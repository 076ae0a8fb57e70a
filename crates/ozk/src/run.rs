//! Public interface for preparing and running Oz kernel programs.

use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::{
    ast,
    error::Exception,
    intern::{Interns, NameId},
    prepare::{self, Program},
    resource::{NoLimitTracker, ResourceTracker},
    schedule::Machine,
    store::{Slot, Store},
    tracer::{NoopTracer, Tracer},
    value::{Literal, Value, render_value},
};

/// Primary interface for running Oz kernel programs.
///
/// A `Runner` holds a prepared program: the boundary AST lowered onto
/// interned identifiers, validated, with procedure bodies hoisted into a
/// definition table. Preparation happens once; the program can then be run
/// any number of times, each run against a fresh store.
///
/// # Example
/// ```
/// use ozk::{Runner, ast::{Stmt, ValueExpr}};
///
/// let program = Stmt::var("x", Stmt::bind(ValueExpr::ident("x"), ValueExpr::int(41)));
/// let runner = Runner::new(&program).unwrap();
/// let output = runner.run_no_limits().unwrap();
/// assert_eq!(output.int_of("x"), Some(41));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Runner {
    program: Program,
}

impl Runner {
    /// Prepares `root` for execution.
    ///
    /// # Errors
    /// Returns a `Prepare` exception when the program mentions undeclared
    /// identifiers, repeats a record feature, or uses a malformed pattern.
    pub fn new(root: &ast::Stmt) -> Result<Self, Exception> {
        prepare::prepare(root).map(|program| Self { program })
    }

    /// Runs the program to completion under the given resource limits,
    /// reporting scheduler events to `tracer`.
    ///
    /// One statement of one thread is reduced per dispatch; a thread that
    /// touches an unbound slot suspends until another thread binds it.
    ///
    /// # Errors
    /// Returns an `Exception` on unification failure, type error,
    /// deadlock, or an exceeded resource limit. Any such error in any
    /// thread halts the whole run.
    pub fn run(&self, tracker: impl ResourceTracker, tracer: &mut impl Tracer) -> Result<RunOutput, Exception> {
        Machine::new(&self.program, tracker, tracer).run()
    }

    /// Runs with no resource limits and no tracing.
    pub fn run_no_limits(&self) -> Result<RunOutput, Exception> {
        self.run(NoLimitTracker, &mut NoopTracer)
    }

    /// Serializes the prepared program to a binary format.
    ///
    /// The bytes can be stored and later restored with [`Runner::load`],
    /// skipping preparation on subsequent runs.
    pub fn dump(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    /// Deserializes a runner from the binary format produced by
    /// [`Runner::dump`].
    pub fn load(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }
}

/// Counters accumulated over one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Scheduler dispatches, parked-thread retries included.
    pub dispatches: u64,
    /// Successfully reduced statements.
    pub reductions: u64,
    /// Times a thread suspended on an unbound slot.
    pub suspensions: u64,
    /// Threads created by `thread` statements (the root thread is not
    /// counted).
    pub threads_spawned: u64,
}

/// Final state of a successful run.
///
/// Holds the single-assignment store as it stood at termination together
/// with the declaration log: every `var` statement and pattern binder, in
/// execution order. Name lookups resolve the *last* declaration of that
/// name, matching lexical shadowing for the straight-line programs these
/// accessors are meant to inspect.
#[derive(Debug)]
pub struct RunOutput {
    store: Store,
    interns: Interns,
    declarations: Vec<(NameId, Slot)>,
    stats: RunStats,
}

impl RunOutput {
    pub(crate) fn new(store: Store, interns: Interns, declarations: Vec<(NameId, Slot)>, stats: RunStats) -> Self {
        Self {
            store,
            interns,
            declarations,
            stats,
        }
    }

    /// The store slot of the last declaration of `name`.
    #[must_use]
    pub fn slot_of(&self, name: &str) -> Option<Slot> {
        let id = self.interns.lookup(name)?;
        self.declarations
            .iter()
            .rev()
            .find(|(declared, _)| *declared == id)
            .map(|(_, slot)| *slot)
    }

    /// The bound value of `name`, or `None` when the name was never
    /// declared or its class is still unbound.
    #[must_use]
    pub fn value_of(&self, name: &str) -> Option<&Value> {
        self.store.class_of(self.slot_of(name)?).value()
    }

    /// The bound integer value of `name`, when it is one that fits `i64`.
    #[must_use]
    pub fn int_of(&self, name: &str) -> Option<i64> {
        match self.value_of(name)? {
            Value::Literal(Literal::Int(n)) => n.to_i64(),
            _ => None,
        }
    }

    /// True when both names resolve into the same equivalence class.
    #[must_use]
    pub fn same_class(&self, a: &str, b: &str) -> bool {
        match (self.slot_of(a), self.slot_of(b)) {
            (Some(a), Some(b)) => self.store.same_class(a, b),
            _ => false,
        }
    }

    /// Oz-style rendering of the value `name` is bound to; unbound
    /// variables render as `_sN`, cycles as `...`.
    #[must_use]
    pub fn render(&self, name: &str) -> Option<String> {
        let slot = self.slot_of(name)?;
        Some(render_value(&Value::Var(slot), &self.store, &self.interns))
    }

    /// `(name, rendered value)` for every declared name, in first-
    /// declaration order, each resolved through its last declaration.
    #[must_use]
    pub fn final_bindings(&self) -> Vec<(&str, String)> {
        let mut order: Vec<NameId> = Vec::new();
        let mut seen = ahash::AHashSet::new();
        for (name, _) in &self.declarations {
            if seen.insert(*name) {
                order.push(*name);
            }
        }
        order
            .into_iter()
            .map(|id| {
                let slot = self
                    .declarations
                    .iter()
                    .rev()
                    .find(|(declared, _)| *declared == id)
                    .map(|(_, slot)| *slot)
                    .expect("name taken from the declaration log");
                (
                    self.interns.get(id),
                    render_value(&Value::Var(slot), &self.store, &self.interns),
                )
            })
            .collect()
    }

    /// The single-assignment store at termination.
    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// The run's counters.
    #[must_use]
    pub fn stats(&self) -> &RunStats {
        &self.stats
    }
}
