//! Thread scheduling, dataflow suspension, and deadlock detection.

use ozk::{
    NoLimitTracker, RecordingTracer, Runner, TraceEvent,
    ast::{Stmt, ValueExpr},
};
use pretty_assertions::assert_eq;

/// `thread nop nop x = 1 + 2 end  var y in y = x * 3` — the main thread
/// suspends on x, retries the same statement once it is bound.
#[test]
fn suspension_resumes_on_the_awaited_slot() {
    let program = Stmt::var(
        "x",
        Stmt::seq(vec![
            Stmt::thread(Stmt::seq(vec![
                Stmt::Nop,
                Stmt::Nop,
                Stmt::bind(
                    ValueExpr::ident("x"),
                    ValueExpr::sum(ValueExpr::int(1), ValueExpr::int(2)),
                ),
            ])),
            Stmt::var(
                "y",
                Stmt::bind(
                    ValueExpr::ident("y"),
                    ValueExpr::product(ValueExpr::ident("x"), ValueExpr::int(3)),
                ),
            ),
        ]),
    );
    let runner = Runner::new(&program).unwrap();
    let mut tracer = RecordingTracer::new();
    let output = runner.run(NoLimitTracker, &mut tracer).unwrap();
    assert_eq!(output.int_of("y"), Some(9));

    let events = tracer.events();
    let suspended = events.iter().find_map(|event| match event {
        TraceEvent::Suspend { thread: 0, slot } => Some(*slot),
        _ => None,
    });
    let slot = suspended.expect("the main thread suspended on x");
    assert!(
        events.contains(&TraceEvent::Resume { thread: 0, slot }),
        "the main thread resumed on the same slot"
    );
    assert!(
        events.contains(&TraceEvent::Spawn { parent: 0, child: 1 }),
        "the worker thread was spawned by the root"
    );
}

/// A chain of spawns: the innermost thread supplies the value everyone
/// else is waiting for.
#[test]
fn nested_spawns_still_synchronize() {
    let program = Stmt::var(
        "x",
        Stmt::var(
            "y",
            Stmt::seq(vec![
                Stmt::thread(Stmt::thread(Stmt::bind(ValueExpr::ident("x"), ValueExpr::int(4)))),
                Stmt::bind(
                    ValueExpr::ident("y"),
                    ValueExpr::product(ValueExpr::ident("x"), ValueExpr::int(2)),
                ),
            ]),
        ),
    );
    let output = Runner::new(&program).unwrap().run_no_limits().unwrap();
    assert_eq!(output.int_of("y"), Some(8));
    assert_eq!(output.stats().threads_spawned, 2);
}

/// A single thread that needs its own unbound variable can never run.
#[test]
fn self_dependency_deadlocks() {
    // y = y * 1 with nothing else around
    let program = Stmt::var(
        "y",
        Stmt::bind(
            ValueExpr::ident("y"),
            ValueExpr::product(ValueExpr::ident("y"), ValueExpr::int(1)),
        ),
    );
    let err = Runner::new(&program).unwrap().run_no_limits().unwrap_err();
    assert!(err.is_deadlock(), "expected deadlock, got: {err}");
}

/// Two threads waiting on each other deadlock even though a third thread
/// runs to completion in between.
#[test]
fn deadlock_waits_out_unrelated_progress() {
    let program = Stmt::var(
        "x",
        Stmt::var(
            "y",
            Stmt::var(
                "z",
                Stmt::seq(vec![
                    Stmt::thread(Stmt::bind(
                        ValueExpr::ident("x"),
                        ValueExpr::sum(ValueExpr::ident("y"), ValueExpr::int(1)),
                    )),
                    Stmt::thread(Stmt::bind(
                        ValueExpr::ident("y"),
                        ValueExpr::sum(ValueExpr::ident("x"), ValueExpr::int(1)),
                    )),
                    Stmt::bind(ValueExpr::ident("z"), ValueExpr::int(5)),
                ]),
            ),
        ),
    );
    let err = Runner::new(&program).unwrap().run_no_limits().unwrap_err();
    assert!(err.is_deadlock(), "expected deadlock, got: {err}");
    assert!(err.message().contains("waiting on"));
}

/// A suspended producer is still a producer: once its own input arrives it
/// wakes up and unblocks the consumer. (`thread y = x + 2 end` plus
/// `thread nop nop x = 5 end` plus `y = y * 1` resolves to y = 7.)
#[test]
fn chained_suspensions_resolve_once_the_root_binding_lands() {
    let program = Stmt::var(
        "x",
        Stmt::var(
            "y",
            Stmt::seq(vec![
                Stmt::thread(Stmt::bind(
                    ValueExpr::ident("y"),
                    ValueExpr::sum(ValueExpr::ident("x"), ValueExpr::int(2)),
                )),
                Stmt::thread(Stmt::seq(vec![
                    Stmt::Nop,
                    Stmt::Nop,
                    Stmt::bind(ValueExpr::ident("x"), ValueExpr::int(5)),
                ])),
                Stmt::bind(
                    ValueExpr::ident("y"),
                    ValueExpr::product(ValueExpr::ident("y"), ValueExpr::int(1)),
                ),
            ]),
        ),
    );
    let output = Runner::new(&program).unwrap().run_no_limits().unwrap();
    assert_eq!(output.int_of("x"), Some(5));
    assert_eq!(output.int_of("y"), Some(7));
    assert!(output.stats().suspensions >= 2);
}

/// FIFO dispatch interleaves threads one statement at a time.
#[test]
fn threads_interleave_at_statement_granularity() {
    let program = Stmt::var(
        "x",
        Stmt::seq(vec![
            Stmt::thread(Stmt::bind(ValueExpr::ident("x"), ValueExpr::int(1))),
            Stmt::Nop,
        ]),
    );
    let runner = Runner::new(&program).unwrap();
    let mut tracer = RecordingTracer::new();
    runner.run(NoLimitTracker, &mut tracer).unwrap();

    // after the spawn, the child's bind runs before the parent's trailing
    // nop: the child was enqueued first
    let order: Vec<(u32, &str)> = tracer
        .events()
        .iter()
        .filter_map(|event| match event {
            TraceEvent::Dispatch { thread, stmt, .. } => Some((*thread, *stmt)),
            _ => None,
        })
        .collect();
    let spawn_pos = order.iter().position(|(_, stmt)| *stmt == "thread").unwrap();
    assert_eq!(order[spawn_pos + 1], (1, "bind"));
    assert_eq!(order[spawn_pos + 2], (0, "nop"));
}
