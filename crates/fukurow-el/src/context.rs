//! Saturation contexts
//!
//! A [`Context`] is the unit of sequential work of the saturation: one per
//! (entity, rule). Only the worker that won the activation of a context
//! processes it, so its processed set and rule state are never touched
//! concurrently; other workers only append to its schedule.

use crate::model::{Axiom, ConceptId, ConceptInterner};
use crate::rules::{InferenceRule, RuleKind, RuleState};
use crate::{ElError, Result};
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Schedules and processed sets only grow, so a poisoned lock still holds
/// consistent data.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct ContextState {
    processed: HashSet<Axiom>,
    rule_state: RuleState,
}

pub struct Context {
    entity: ConceptId,
    rule_index: usize,
    kind: RuleKind,
    scheduled: Mutex<VecDeque<Axiom>>,
    active: AtomicBool,
    initialized: AtomicBool,
    state: Mutex<ContextState>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("entity", &self.entity)
            .field("kind", &self.kind)
            .field("active", &self.is_active())
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

impl Context {
    pub fn new(entity: ConceptId, rule_index: usize, kind: RuleKind, rule_state: RuleState) -> Self {
        Self {
            entity,
            rule_index,
            kind,
            scheduled: Mutex::new(VecDeque::new()),
            active: AtomicBool::new(false),
            initialized: AtomicBool::new(false),
            state: Mutex::new(ContextState {
                processed: HashSet::new(),
                rule_state,
            }),
        }
    }

    pub fn entity(&self) -> ConceptId {
        self.entity
    }

    pub fn kind(&self) -> RuleKind {
        self.kind
    }

    pub fn rule_index(&self) -> usize {
        self.rule_index
    }

    /// One-time transition out of Uninitialized
    pub fn initialize(&self, interner: &ConceptInterner) -> Result<()> {
        self.initialized
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| ())
            .map_err(|_| {
                ElError::AlreadyInitialized(format!(
                    "{} context of {}",
                    self.kind,
                    interner.render(self.entity)
                ))
            })
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn schedule(&self, axiom: Axiom) {
        lock(&self.scheduled).push_back(axiom);
    }

    pub fn has_pending(&self) -> bool {
        !lock(&self.scheduled).is_empty()
    }

    fn next_scheduled(&self) -> Option<Axiom> {
        lock(&self.scheduled).pop_front()
    }

    /// Idle → Active; only the caller that flips the flag enqueues the context
    pub fn activate(self: &Arc<Self>, queue: &ActiveContexts) -> bool {
        if self
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            queue.push(Arc::clone(self));
            true
        } else {
            false
        }
    }

    /// Active → Idle. Work scheduled while the flag was still set would
    /// otherwise be stranded, so the queue is re-checked after clearing it.
    pub fn deactivate(self: &Arc<Self>, queue: &ActiveContexts) -> bool {
        if self
            .active
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }
        if self.has_pending() {
            return self.activate(queue);
        }
        false
    }

    /// Drain the schedule in FIFO order, handing every conclusion to `dispatch`.
    /// Returns the number of newly processed axioms.
    pub fn process<F>(
        &self,
        rule: &dyn InferenceRule,
        interner: &ConceptInterner,
        mut dispatch: F,
    ) -> Result<usize>
    where
        F: FnMut(Axiom) -> Result<()>,
    {
        let mut state = lock(&self.state);
        let ContextState { processed, rule_state } = &mut *state;
        let mut conclusions = Vec::new();
        let mut count = 0;

        while let Some(axiom) = self.next_scheduled() {
            if !processed.insert(axiom) {
                continue;
            }
            count += 1;

            rule.compute(self.entity, rule_state, axiom, interner, &mut conclusions)?;
            for conclusion in conclusions.drain(..) {
                dispatch(conclusion)?;
            }
        }
        Ok(count)
    }

    /// Snapshot of the processed set
    pub fn processed(&self) -> Vec<Axiom> {
        lock(&self.state).processed.iter().copied().collect()
    }
}

/// Shared queue of Active contexts
#[derive(Debug, Default)]
pub struct ActiveContexts {
    queue: Mutex<VecDeque<Arc<Context>>>,
}

impl ActiveContexts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, context: Arc<Context>) {
        lock(&self.queue).push_back(context);
    }

    pub fn pop(&self) -> Option<Arc<Context>> {
        lock(&self.queue).pop_front()
    }

    pub fn len(&self) -> usize {
        lock(&self.queue).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.queue).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::ToldSubsumptionRule;

    fn told_context(interner: &mut ConceptInterner) -> (Arc<Context>, ToldSubsumptionRule, ConceptId) {
        let a = interner.class("A");
        let rule = ToldSubsumptionRule::default();
        let context = Arc::new(Context::new(a, 0, RuleKind::Told, rule.new_state()));
        (context, rule, a)
    }

    #[test]
    fn test_initialize_twice_fails() {
        let mut interner = ConceptInterner::new();
        let (context, _, _) = told_context(&mut interner);

        assert!(!context.is_initialized());
        context.initialize(&interner).unwrap();
        assert!(context.is_initialized());
        assert!(matches!(
            context.initialize(&interner),
            Err(ElError::AlreadyInitialized(_))
        ));
    }

    #[test]
    fn test_activation_enqueues_once() {
        let mut interner = ConceptInterner::new();
        let (context, _, _) = told_context(&mut interner);
        let queue = ActiveContexts::new();

        assert!(context.activate(&queue));
        assert!(!context.activate(&queue));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_deactivate_reactivates_on_late_arrival() {
        let mut interner = ConceptInterner::new();
        let (context, _, a) = told_context(&mut interner);
        let queue = ActiveContexts::new();

        context.activate(&queue);
        let popped = queue.pop().unwrap();
        context.schedule(Axiom::new(a, a));

        assert!(popped.deactivate(&queue));
        assert!(context.is_active());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_deactivate_idle_when_drained() {
        let mut interner = ConceptInterner::new();
        let (context, _, _) = told_context(&mut interner);
        let queue = ActiveContexts::new();

        context.activate(&queue);
        queue.pop();

        assert!(!context.deactivate(&queue));
        assert!(!context.is_active());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_process_skips_duplicates() {
        let mut interner = ConceptInterner::new();
        let (context, rule, a) = told_context(&mut interner);
        let top = Axiom::new(a, ConceptId::TOP);

        context.schedule(Axiom::new(a, a));
        context.schedule(top);
        context.schedule(top);

        let mut dispatched = Vec::new();
        let count = context
            .process(&rule, &interner, |axiom| {
                dispatched.push(axiom);
                Ok(())
            })
            .unwrap();

        assert_eq!(count, 2);
        assert_eq!(context.processed().len(), 2);
        assert!(dispatched.is_empty());
        assert!(!context.has_pending());
    }
}
