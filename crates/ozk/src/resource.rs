//! Execution resource limits.
//!
//! The only loop in the kernel language is recursion, so a buggy or
//! adversarial program can dispatch and allocate forever. The machine
//! carries a [`ResourceTracker`] as a type parameter; [`NoLimitTracker`]
//! compiles to nothing, [`LimitedTracker`] enforces optional caps.

use std::fmt;

/// Error returned when a resource limit is exceeded during execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    /// Maximum number of scheduler dispatches exceeded.
    Dispatches { limit: u64, count: u64 },
    /// Maximum number of store slots exceeded.
    Slots { limit: usize, count: usize },
    /// Maximum number of spawned threads exceeded.
    Threads { limit: u32, count: u32 },
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dispatches { limit, count } => {
                write!(f, "dispatch limit exceeded: {count} > {limit}")
            }
            Self::Slots { limit, count } => {
                write!(f, "store slot limit exceeded: {count} > {limit}")
            }
            Self::Threads { limit, count } => {
                write!(f, "thread limit exceeded: {count} > {limit}")
            }
        }
    }
}

impl std::error::Error for ResourceError {}

/// Trait for tracking resource usage during a run.
pub trait ResourceTracker: fmt::Debug {
    /// Called once per scheduler dispatch, parked-thread retries included.
    fn on_dispatch(&mut self) -> Result<(), ResourceError>;

    /// Called before each store slot allocation.
    fn on_alloc(&mut self) -> Result<(), ResourceError>;

    /// Called before each thread spawn.
    fn on_spawn(&mut self) -> Result<(), ResourceError>;
}

/// Tracker that imposes no limits; all hooks compile to nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLimitTracker;

impl ResourceTracker for NoLimitTracker {
    #[inline(always)]
    fn on_dispatch(&mut self) -> Result<(), ResourceError> {
        Ok(())
    }

    #[inline(always)]
    fn on_alloc(&mut self) -> Result<(), ResourceError> {
        Ok(())
    }

    #[inline(always)]
    fn on_spawn(&mut self) -> Result<(), ResourceError> {
        Ok(())
    }
}

/// Tracker enforcing optional caps on dispatches, store slots, and thread
/// spawns. Caps left unset are unlimited.
#[derive(Debug, Clone, Default)]
pub struct LimitedTracker {
    max_dispatches: Option<u64>,
    max_slots: Option<usize>,
    max_threads: Option<u32>,
    dispatches: u64,
    slots: usize,
    threads: u32,
}

impl LimitedTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_max_dispatches(mut self, limit: u64) -> Self {
        self.max_dispatches = Some(limit);
        self
    }

    #[must_use]
    pub fn with_max_slots(mut self, limit: usize) -> Self {
        self.max_slots = Some(limit);
        self
    }

    #[must_use]
    pub fn with_max_threads(mut self, limit: u32) -> Self {
        self.max_threads = Some(limit);
        self
    }
}

impl ResourceTracker for LimitedTracker {
    fn on_dispatch(&mut self) -> Result<(), ResourceError> {
        self.dispatches += 1;
        match self.max_dispatches {
            Some(limit) if self.dispatches > limit => Err(ResourceError::Dispatches {
                limit,
                count: self.dispatches,
            }),
            _ => Ok(()),
        }
    }

    fn on_alloc(&mut self) -> Result<(), ResourceError> {
        self.slots += 1;
        match self.max_slots {
            Some(limit) if self.slots > limit => Err(ResourceError::Slots {
                limit,
                count: self.slots,
            }),
            _ => Ok(()),
        }
    }

    fn on_spawn(&mut self) -> Result<(), ResourceError> {
        self.threads += 1;
        match self.max_threads {
            Some(limit) if self.threads > limit => Err(ResourceError::Threads {
                limit,
                count: self.threads,
            }),
            _ => Ok(()),
        }
    }
}
