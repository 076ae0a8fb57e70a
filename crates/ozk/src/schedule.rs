//! Threads and the cooperative scheduler.
//!
//! Execution is single-threaded and cooperative: exactly one statement is
//! reduced per dispatch, so the store needs no locking and mutations are
//! atomic at statement granularity. The scheduler owns a FIFO queue of
//! threads; FIFO ordering guarantees every runnable thread eventually runs.
//!
//! Deadlock detection relies on two counters. `global_tick` increments on
//! every dispatch; `change_tick` records the tick of the last *productive*
//! step (a reduced statement or a spawn). A suspended thread whose slot is
//! still unbound and whose previous attempt postdates `change_tick` is the
//! witness that a full round of the queue made no progress — and since
//! only progress can bind slots, no thread ever will.

use std::{collections::VecDeque, fmt};

use crate::{
    env::Env,
    error::{Exception, RunError},
    intern::NameId,
    prepare::{Node, Program},
    resource::ResourceTracker,
    run::{RunOutput, RunStats},
    store::{Slot, Store},
    tracer::Tracer,
};

/// Thread identity, for diagnostics and trace lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ThreadId(u32);

impl ThreadId {
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// One stack frame: a statement to reduce under its environment.
#[derive(Debug)]
pub(crate) struct Frame<'p> {
    pub node: &'p Node,
    pub env: Env,
}

impl<'p> Frame<'p> {
    pub fn new(node: &'p Node, env: Env) -> Self {
        Self { node, env }
    }
}

/// A lightweight Oz thread: a statement stack plus suspension state.
///
/// Stacks and environments are strictly thread-local; the store is the
/// only state shared between threads.
#[derive(Debug)]
pub(crate) struct Thread<'p> {
    pub id: ThreadId,
    pub stack: Vec<Frame<'p>>,
    /// Slot this thread is waiting on, if any.
    pub suspended_on: Option<Slot>,
    /// Tick of this thread's previous dispatch.
    pub last_tick: u64,
}

impl<'p> Thread<'p> {
    fn new(id: ThreadId, frame: Frame<'p>) -> Self {
        Self {
            id,
            stack: vec![frame],
            suspended_on: None,
            last_tick: 0,
        }
    }
}

/// The whole runtime state of one run.
pub(crate) struct Machine<'p, 't, R: ResourceTracker, T: Tracer> {
    pub(crate) program: &'p Program,
    pub(crate) store: Store,
    pub(crate) tracker: R,
    pub(crate) tracer: &'t mut T,
    /// Every `var` and pattern binder, in execution order, for diagnostics.
    pub(crate) declarations: Vec<(NameId, Slot)>,
    queue: VecDeque<Thread<'p>>,
    global_tick: u64,
    change_tick: u64,
    next_thread: u32,
    stats: RunStats,
}

impl<'p, 't, R: ResourceTracker, T: Tracer> Machine<'p, 't, R, T> {
    pub fn new(program: &'p Program, tracker: R, tracer: &'t mut T) -> Self {
        Self {
            program,
            store: Store::new(),
            tracker,
            tracer,
            declarations: Vec::new(),
            queue: VecDeque::new(),
            global_tick: 0,
            change_tick: 0,
            next_thread: 0,
            stats: RunStats::default(),
        }
    }

    fn fresh_thread(&mut self, frame: Frame<'p>) -> Thread<'p> {
        let id = ThreadId(self.next_thread);
        self.next_thread += 1;
        Thread::new(id, frame)
    }

    /// Runs the program to completion, deadlock, or error.
    pub fn run(mut self) -> Result<RunOutput, Exception> {
        let root = self.fresh_thread(Frame::new(&self.program.root, Env::default()));
        self.queue.push_back(root);

        while let Some(mut thread) = self.queue.pop_front() {
            if let Err(err) = self.tracker.on_dispatch() {
                return Err(RunError::from(err).into_exception(thread.id));
            }
            let old_tick = thread.last_tick;
            self.global_tick += 1;
            thread.last_tick = self.global_tick;
            self.stats.dispatches += 1;

            if let Some(slot) = thread.suspended_on {
                if !self.store.class_of(slot).is_bound() {
                    if self.change_tick < old_tick {
                        // nothing has progressed since this thread last
                        // looked, so nothing ever will
                        return Err(self.deadlock(&thread));
                    }
                    self.tracer.on_park(thread.id.raw(), slot);
                    self.queue.push_back(thread);
                    continue;
                }
                thread.suspended_on = None;
                self.tracer.on_resume(thread.id.raw(), slot);
            }

            let frame = thread.stack.pop().expect("runnable thread with an empty stack");
            let depth = thread.stack.len() + 1;
            let kind: &'static str = frame.node.into();
            self.tracer.on_dispatch(self.global_tick, thread.id.raw(), kind, depth);

            if let Node::Thread(body) = frame.node {
                if let Err(err) = self.tracker.on_spawn() {
                    return Err(RunError::from(err).into_exception(thread.id));
                }
                let child = self.fresh_thread(Frame::new(body, frame.env.clone()));
                self.tracer.on_spawn(thread.id.raw(), child.id.raw());
                self.stats.threads_spawned += 1;
                self.queue.push_back(child);
                // spawning counts as progress
                self.change_tick = self.global_tick;
            } else {
                match self.reduce(&mut thread, frame.node, &frame.env) {
                    Ok(()) => {
                        self.stats.reductions += 1;
                        self.change_tick = self.global_tick;
                    }
                    Err(RunError::Unbound(slot)) => {
                        // nothing was committed; retry the identical
                        // statement once the slot is bound
                        thread.suspended_on = Some(slot);
                        thread.stack.push(frame);
                        self.stats.suspensions += 1;
                        self.tracer.on_suspend(thread.id.raw(), slot);
                    }
                    Err(err) => return Err(err.into_exception(thread.id)),
                }
            }

            if thread.stack.is_empty() {
                self.tracer.on_exit(thread.id.raw());
            } else {
                self.queue.push_back(thread);
            }
        }

        Ok(RunOutput::new(
            self.store,
            self.program.interns.clone(),
            self.declarations,
            self.stats,
        ))
    }

    fn deadlock(&self, current: &Thread<'p>) -> Exception {
        use std::fmt::Write;
        let mut waiting = String::new();
        for thread in std::iter::once(current).chain(self.queue.iter()) {
            if let Some(slot) = thread.suspended_on {
                if !waiting.is_empty() {
                    waiting.push_str(", ");
                }
                let _ = write!(waiting, "{} waiting on {}", thread.id, slot);
            }
        }
        Exception::deadlock(format!("no thread can make progress: {waiting}"))
    }
}
