//! Scheduler execution tracing.
//!
//! Trait-based tracing with zero-cost abstraction: the machine carries the
//! tracer as a type parameter, so with [`NoopTracer`] every hook compiles
//! away entirely via monomorphization.
//!
//! | Tracer | Purpose |
//! |--------|---------|
//! | [`NoopTracer`] | Zero-cost no-op (the default) |
//! | [`StderrTracer`] | One human-readable log line per dispatch |
//! | [`RecordingTracer`] | Full event recording for tests and post-mortem |

use crate::store::Slot;

/// Trace event emitted during a run.
///
/// Collected by [`RecordingTracer`]; thread ids are the raw diagnostic
/// numbers also used in error messages (`t0` is the root thread).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    /// A thread was dispatched and a statement reduction attempted.
    Dispatch {
        /// Scheduler tick of this dispatch.
        tick: u64,
        /// Thread id.
        thread: u32,
        /// Statement kind name ("var", "bind", ...).
        stmt: &'static str,
        /// Stack depth at the time of dispatch.
        depth: usize,
    },
    /// A `thread` statement created a new thread.
    Spawn { parent: u32, child: u32 },
    /// A statement required this unbound slot; the thread now waits on it.
    Suspend { thread: u32, slot: Slot },
    /// The awaited slot is bound; the thread retries the failed statement.
    Resume { thread: u32, slot: Slot },
    /// A suspended thread was dispatched but its slot is still unbound.
    Park { thread: u32, slot: Slot },
    /// A thread's stack emptied; it leaves the scheduler.
    Exit { thread: u32 },
}

/// Trait for scheduler tracing.
///
/// All methods have default no-op implementations, so [`NoopTracer`]
/// requires zero lines of code and compiles to zero instructions.
/// Implementations only override the hooks they care about.
pub trait Tracer: std::fmt::Debug {
    /// Called once per dispatch of a runnable thread, before reduction.
    #[inline(always)]
    fn on_dispatch(&mut self, _tick: u64, _thread: u32, _stmt: &'static str, _depth: usize) {}

    /// Called when a `thread` statement spawns a new thread.
    #[inline(always)]
    fn on_spawn(&mut self, _parent: u32, _child: u32) {}

    /// Called when a reduction touched an unbound slot and the thread
    /// suspended on it.
    #[inline(always)]
    fn on_suspend(&mut self, _thread: u32, _slot: Slot) {}

    /// Called when a suspended thread's slot became bound and the thread
    /// is about to retry.
    #[inline(always)]
    fn on_resume(&mut self, _thread: u32, _slot: Slot) {}

    /// Called when a suspended thread was dispatched but its slot is still
    /// unbound and it goes back to the end of the queue.
    #[inline(always)]
    fn on_park(&mut self, _thread: u32, _slot: Slot) {}

    /// Called when a thread's stack empties.
    #[inline(always)]
    fn on_exit(&mut self, _thread: u32) {}
}

/// Zero-cost no-op tracer.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

impl Tracer for NoopTracer {}

/// Human-readable execution log to stderr, one line per event.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrTracer;

impl StderrTracer {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Tracer for StderrTracer {
    fn on_dispatch(&mut self, tick: u64, thread: u32, stmt: &'static str, depth: usize) {
        eprintln!("tick={tick} thread=t{thread} reduce {stmt} depth={depth}");
    }

    fn on_spawn(&mut self, parent: u32, child: u32) {
        eprintln!("thread=t{parent} spawned t{child}");
    }

    fn on_suspend(&mut self, thread: u32, slot: Slot) {
        eprintln!("thread=t{thread} suspended on {slot}");
    }

    fn on_resume(&mut self, thread: u32, slot: Slot) {
        eprintln!("thread=t{thread} resumed, {slot} is bound");
    }

    fn on_park(&mut self, thread: u32, slot: Slot) {
        eprintln!("thread=t{thread} parked, {slot} still unbound");
    }

    fn on_exit(&mut self, thread: u32) {
        eprintln!("thread=t{thread} finished");
    }
}

/// Records every event for later inspection.
#[derive(Debug, Default)]
pub struct RecordingTracer {
    events: Vec<TraceEvent>,
}

impl RecordingTracer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The events recorded so far, in emission order.
    #[must_use]
    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }
}

impl Tracer for RecordingTracer {
    fn on_dispatch(&mut self, tick: u64, thread: u32, stmt: &'static str, depth: usize) {
        self.events.push(TraceEvent::Dispatch {
            tick,
            thread,
            stmt,
            depth,
        });
    }

    fn on_spawn(&mut self, parent: u32, child: u32) {
        self.events.push(TraceEvent::Spawn { parent, child });
    }

    fn on_suspend(&mut self, thread: u32, slot: Slot) {
        self.events.push(TraceEvent::Suspend { thread, slot });
    }

    fn on_resume(&mut self, thread: u32, slot: Slot) {
        self.events.push(TraceEvent::Resume { thread, slot });
    }

    fn on_park(&mut self, thread: u32, slot: Slot) {
        self.events.push(TraceEvent::Park { thread, slot });
    }

    fn on_exit(&mut self, thread: u32) {
        self.events.push(TraceEvent::Exit { thread });
    }
}
