//! Data-parallel loops over local node ids.
//!
//! A pass hands the executor an id range and a per-node operator. `Serial`
//! runs it on the calling thread; `Parallel` fans it out over a rayon pool
//! owned by the host. Either way the call returns only once every node has
//! been visited, which is the barrier between passes.

use crate::error::Result;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::ops::Range;

pub trait Executor: Sync {
    fn name(&self) -> &'static str;

    fn for_each<F>(&self, range: Range<usize>, op: F)
    where
        F: Fn(usize) + Send + Sync;

    /// Like `for_each`, stopping at the first error.
    fn try_for_each<F>(&self, range: Range<usize>, op: F) -> Result<()>
    where
        F: Fn(usize) -> Result<()> + Send + Sync;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Serial;

impl Executor for Serial {
    fn name(&self) -> &'static str {
        "serial"
    }

    fn for_each<F>(&self, range: Range<usize>, op: F)
    where
        F: Fn(usize) + Send + Sync,
    {
        range.for_each(op)
    }

    fn try_for_each<F>(&self, range: Range<usize>, op: F) -> Result<()>
    where
        F: Fn(usize) -> Result<()> + Send + Sync,
    {
        range.into_iter().try_for_each(op)
    }
}

pub struct Parallel {
    pool: ThreadPool,
}

impl Parallel {
    pub fn new(threads: usize, host: usize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(move |i| format!("distbc-h{}-w{}", host, i))
            .build()?;
        Ok(Self { pool })
    }

    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

impl Executor for Parallel {
    fn name(&self) -> &'static str {
        "parallel"
    }

    fn for_each<F>(&self, range: Range<usize>, op: F)
    where
        F: Fn(usize) + Send + Sync,
    {
        self.pool.install(|| range.into_par_iter().for_each(op))
    }

    fn try_for_each<F>(&self, range: Range<usize>, op: F) -> Result<()>
    where
        F: Fn(usize) -> Result<()> + Send + Sync,
    {
        self.pool.install(|| range.into_par_iter().try_for_each(op))
    }
}

/// Executor chosen at runtime from the cluster configuration.
pub enum Backend {
    Serial(Serial),
    Parallel(Parallel),
}

impl Backend {
    pub fn new(threads: Option<usize>, host: usize) -> Result<Self> {
        Ok(match threads {
            None => Backend::Serial(Serial),
            Some(threads) => Backend::Parallel(Parallel::new(threads, host)?),
        })
    }
}

impl Executor for Backend {
    fn name(&self) -> &'static str {
        match self {
            Backend::Serial(e) => e.name(),
            Backend::Parallel(e) => e.name(),
        }
    }

    fn for_each<F>(&self, range: Range<usize>, op: F)
    where
        F: Fn(usize) + Send + Sync,
    {
        match self {
            Backend::Serial(e) => e.for_each(range, op),
            Backend::Parallel(e) => e.for_each(range, op),
        }
    }

    fn try_for_each<F>(&self, range: Range<usize>, op: F) -> Result<()>
    where
        F: Fn(usize) -> Result<()> + Send + Sync,
    {
        match self {
            Backend::Serial(e) => e.try_for_each(range, op),
            Backend::Parallel(e) => e.try_for_each(range, op),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn sums_to<E: Executor>(exec: &E) -> usize {
        let total = AtomicUsize::new(0);
        exec.for_each(0..100, |i| {
            total.fetch_add(i, Ordering::Relaxed);
        });
        total.into_inner()
    }

    #[test]
    fn both_backends_visit_every_index() {
        assert_eq!(sums_to(&Serial), 4950);
        assert_eq!(sums_to(&Parallel::new(4, 0).unwrap()), 4950);
        assert_eq!(sums_to(&Backend::new(Some(2), 1).unwrap()), 4950);
    }

    #[test]
    fn errors_stop_the_loop() {
        let fail = |i: usize| {
            if i == 7 {
                Err(Error::Config("boom".into()))
            } else {
                Ok(())
            }
        };
        assert!(Serial.try_for_each(0..10, fail).is_err());
        assert!(Parallel::new(2, 0).unwrap().try_for_each(0..10, fail).is_err());
        assert!(Serial.try_for_each(0..5, fail).is_ok());
    }

    #[test]
    fn backend_defaults_to_serial() {
        assert_eq!(Backend::new(None, 0).unwrap().name(), "serial");
    }
}
