//! Update strategies
//!
//! Three interchangeable ways of running the phases over the entity store.
//! They share the transition functions in [`phases`](super::phases) and
//! differ only in scheduling:
//!
//! - [`SingleThreaded`]: three whole-store passes on the calling thread
//! - [`WorkerPool`]: each phase split into contiguous ranges, one per worker,
//!   with a barrier between phases
//! - [`DataParallel`]: one fused pass over fixed-size chunks
//!
//! All of them finish with the same bone step: per-chunk bone demand, an
//! exclusive prefix sum over it, then a parallel upload from each chunk's
//! base. Offsets therefore follow slot order whatever the chunking, and every
//! strategy leaves the same offsets and bone buffer behind.

use std::ops::Range;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::core::{EnvironmentConfig, UpdateStrategyKind};
use crate::ecs::EntityStore;

use super::environment::EnvironmentError;
use super::phases::{self, Phase, TickInputs};

/// Runs the update phases over every entity of a store
pub trait UpdateStrategy: Send + Sync {
    /// Name for logs
    fn name(&self) -> &'static str;

    /// Run one update
    fn run(&self, store: &mut EntityStore, inputs: &TickInputs<'_>);
}

/// Split `0..len` into at most `workers` contiguous, non-empty ranges.
///
/// Sizes differ by at most one, larger ranges first.
pub fn split_loop_index(len: usize, workers: usize) -> Vec<Range<usize>> {
    if len == 0 {
        return Vec::new();
    }
    let workers = workers.clamp(1, len);
    let base = len / workers;
    let extra = len % workers;

    let mut start = 0;
    (0..workers)
        .map(|worker| {
            let size = base + usize::from(worker < extra);
            let range = start..start + size;
            start += size;
            range
        })
        .collect()
}

/// Split `0..len` into ranges of `grain` slots, the last one shorter
pub fn grain_ranges(len: usize, grain: usize) -> Vec<Range<usize>> {
    let grain = grain.max(1);
    (0..len).step_by(grain).map(|start| start..(start + grain).min(len)).collect()
}

/// First bone of every chunk when chunks are laid out back to back, and the total
fn bone_bases(demands: &[usize]) -> (Vec<usize>, usize) {
    let mut total = 0;
    let bases = demands
        .iter()
        .map(|&demand| {
            let base = total;
            total += demand;
            base
        })
        .collect();
    (bases, total)
}

fn build_pool(workers: usize) -> Result<ThreadPool, EnvironmentError> {
    let pool = ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|index| format!("scene-update-{index}"))
        .build()?;
    Ok(pool)
}

/// Three sequential passes on the calling thread
#[derive(Debug, Default)]
pub struct SingleThreaded;

impl UpdateStrategy for SingleThreaded {
    fn name(&self) -> &'static str {
        "single"
    }

    fn run(&self, store: &mut EntityStore, inputs: &TickInputs<'_>) {
        let mut chunk = store.chunk_all();
        for phase in Phase::SEQUENCE {
            phases::run(&mut chunk, phase, inputs);
        }
        phases::stage_bones(&mut chunk, inputs.bones);
    }
}

/// Fixed pool of workers, one contiguous range each, phase by phase
pub struct WorkerPool {
    pool: ThreadPool,
    workers: usize,
}

impl WorkerPool {
    /// Start `workers` threads
    pub fn new(workers: usize) -> Result<Self, EnvironmentError> {
        let workers = workers.max(1);
        Ok(Self { pool: build_pool(workers)?, workers })
    }

    /// Number of workers
    pub fn workers(&self) -> usize {
        self.workers
    }
}

impl UpdateStrategy for WorkerPool {
    fn name(&self) -> &'static str {
        "pooled"
    }

    fn run(&self, store: &mut EntityStore, inputs: &TickInputs<'_>) {
        let ranges = split_loop_index(store.slot_count(), self.workers);
        let mut chunks = store.chunk_all().split(&ranges);
        for phase in Phase::SEQUENCE {
            // the scope returns once every worker is done, which is the barrier
            self.pool.scope(|scope| {
                for chunk in chunks.iter_mut() {
                    scope.spawn(move |_| phases::run(chunk, phase, inputs));
                }
            });
        }

        let mut demands = vec![0; chunks.len()];
        self.pool.scope(|scope| {
            for (chunk, demand) in chunks.iter_mut().zip(demands.iter_mut()) {
                scope.spawn(move |_| *demand = phases::bone_demand(chunk));
            }
        });
        let (bases, total) = bone_bases(&demands);
        inputs.bones.reserve(total);
        self.pool.scope(|scope| {
            for (chunk, base) in chunks.iter_mut().zip(bases) {
                scope.spawn(move |_| phases::upload(chunk, base, inputs.bones));
            }
        });
    }
}

/// One fused pass as a parallel-for over `grain_size` chunks
pub struct DataParallel {
    pool: ThreadPool,
    grain_size: usize,
}

impl DataParallel {
    /// Start `workers` threads processing `grain_size` entities per task
    pub fn new(workers: usize, grain_size: usize) -> Result<Self, EnvironmentError> {
        Ok(Self { pool: build_pool(workers.max(1))?, grain_size: grain_size.max(1) })
    }
}

impl UpdateStrategy for DataParallel {
    fn name(&self) -> &'static str {
        "data_parallel"
    }

    fn run(&self, store: &mut EntityStore, inputs: &TickInputs<'_>) {
        let ranges = grain_ranges(store.slot_count(), self.grain_size);
        let mut chunks = store.chunk_all().split(&ranges);
        self.pool.install(|| {
            chunks
                .par_iter_mut()
                .for_each(|chunk| phases::run(chunk, Phase::Fused, inputs));

            let demands: Vec<usize> = chunks.par_iter_mut().map(|chunk| phases::bone_demand(chunk)).collect();
            let (bases, total) = bone_bases(&demands);
            inputs.bones.reserve(total);
            chunks
                .par_iter_mut()
                .zip(bases)
                .for_each(|(chunk, base)| phases::upload(chunk, base, inputs.bones));
        });
    }
}

/// Build the strategy named by `config`
pub fn build_strategy(config: &EnvironmentConfig) -> Result<Box<dyn UpdateStrategy>, EnvironmentError> {
    let strategy: Box<dyn UpdateStrategy> = match config.strategy {
        UpdateStrategyKind::Single => Box::new(SingleThreaded),
        UpdateStrategyKind::Pooled => Box::new(WorkerPool::new(config.resolved_worker_threads())?),
        UpdateStrategyKind::DataParallel => {
            Box::new(DataParallel::new(config.resolved_worker_threads(), config.grain_size)?)
        }
    };
    log::debug!("Update strategy: {}", strategy.name());
    Ok(strategy)
}
