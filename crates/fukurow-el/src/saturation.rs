//! 飽和 (saturation) engine
//!
//! Workers repeatedly take an active context off the shared queue, drain it
//! and deactivate it. New work only comes from a worker that is currently
//! draining, so once the queue is empty and every worker has returned the
//! closure is complete.

use crate::config::ReasonerConfig;
use crate::manager::ContextManager;
use crate::model::{Axiom, ConceptInterner};
use crate::normalizer::NormalizedOntology;
use crate::rules::RuleRegistry;
use crate::{ElError, Result};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Counters of one saturation run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaturationStats {
    pub contexts: usize,
    pub processed: usize,
    pub discarded: usize,
    pub workers: usize,
    pub elapsed: Duration,
}

/// Deductive closure of a normalized ontology
#[derive(Debug, Clone, Default)]
pub struct Closure {
    axioms: BTreeSet<Axiom>,
    stats: SaturationStats,
}

impl Closure {
    pub fn axioms(&self) -> &BTreeSet<Axiom> {
        &self.axioms
    }

    pub fn contains(&self, axiom: &Axiom) -> bool {
        self.axioms.contains(axiom)
    }

    pub fn stats(&self) -> &SaturationStats {
        &self.stats
    }

    pub fn len(&self) -> usize {
        self.axioms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.axioms.is_empty()
    }
}

/// Fixed-size pool of OS threads saturating the context population
#[derive(Debug, Clone)]
pub struct SaturationEngine {
    workers: usize,
}

impl Default for SaturationEngine {
    fn default() -> Self {
        Self::with_config(&ReasonerConfig::default())
    }
}

impl SaturationEngine {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    pub fn with_config(config: &ReasonerConfig) -> Self {
        Self::new(config.saturation_workers)
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Register the six default rules and saturate
    pub fn saturate(&self, normalized: &NormalizedOntology, interner: &ConceptInterner) -> Result<Closure> {
        let mut registry = RuleRegistry::default();
        registry.register_ontology(normalized, interner);
        self.saturate_with(&registry, normalized, interner)
    }

    /// Saturate with an already registered rule set
    pub fn saturate_with(
        &self,
        registry: &RuleRegistry,
        normalized: &NormalizedOntology,
        interner: &ConceptInterner,
    ) -> Result<Closure> {
        let start = Instant::now();
        let manager = ContextManager::new(registry, interner, normalized.entities());

        for &entity in normalized.entities() {
            manager.initialize_entity(entity)?;
        }
        for &axiom in normalized.axioms() {
            manager.initialize_axiom(axiom)?;
        }
        debug!(
            "Initialized {} contexts, {} active",
            manager.context_count(),
            manager.active_contexts().len()
        );

        let processed = if self.workers == 1 {
            run_worker(0, &manager, &AtomicBool::new(false))?
        } else {
            self.run_pool(&manager)?
        };

        if !manager.active_contexts().is_empty() {
            warn!(
                "{} contexts still active after all workers returned",
                manager.active_contexts().len()
            );
        }

        let discarded = manager.discarded().len();
        let axioms = manager.closure();
        let stats = SaturationStats {
            contexts: manager.context_count(),
            processed,
            discarded,
            workers: self.workers,
            elapsed: start.elapsed(),
        };

        info!(
            "Saturation complete: {} axioms from {} contexts with {} workers in {:?}",
            axioms.len(),
            stats.contexts,
            stats.workers,
            stats.elapsed
        );

        Ok(Closure { axioms, stats })
    }

    fn run_pool(&self, manager: &ContextManager<'_>) -> Result<usize> {
        let abort = AtomicBool::new(false);

        let outcomes = thread::scope(|scope| -> Result<Vec<Result<usize>>> {
            let mut handles = Vec::with_capacity(self.workers);
            for index in 0..self.workers {
                let abort = &abort;
                let handle = thread::Builder::new()
                    .name(format!("el-saturation-{}", index))
                    .spawn_scoped(scope, move || run_worker(index, manager, abort))?;
                handles.push(handle);
            }

            Ok(handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|panic| Err(ElError::WorkerPanicked(panic_message(panic))))
                })
                .collect())
        })?;

        let mut processed = 0;
        for outcome in outcomes {
            processed += outcome?;
        }
        Ok(processed)
    }
}

fn run_worker(index: usize, manager: &ContextManager<'_>, abort: &AtomicBool) -> Result<usize> {
    debug!("Saturation worker {} started", index);
    let queue = manager.active_contexts();
    let mut processed = 0;

    while !abort.load(Ordering::SeqCst) {
        let Some(context) = queue.pop() else {
            break;
        };
        match manager.process(&context) {
            Ok(count) => processed += count,
            Err(error) => {
                abort.store(true, Ordering::SeqCst);
                return Err(error);
            }
        }
        context.deactivate(queue);
    }

    debug!("Saturation worker {} finished after {} axioms", index, processed);
    Ok(processed)
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "worker panicked".to_string()
    }
}
