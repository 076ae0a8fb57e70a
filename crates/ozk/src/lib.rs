#![doc = include_str!("../../../README.md")]

pub mod ast;
mod env;
mod error;
mod eval;
mod exec;
mod free_vars;
mod intern;
mod prepare;
mod resource;
mod run;
mod schedule;
mod store;
mod tracer;
mod unify;
mod value;

pub use crate::{
    error::{Exception, ExceptionKind},
    intern::NameId,
    resource::{LimitedTracker, NoLimitTracker, ResourceError, ResourceTracker},
    run::{RunOutput, RunStats, Runner},
    store::{EqClass, Slot, Store},
    tracer::{NoopTracer, RecordingTracer, StderrTracer, TraceEvent, Tracer},
    value::{Closure, FieldMap, Literal, Record, Value},
};
