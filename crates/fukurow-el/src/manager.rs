//! Context construction, seeding and routing

use crate::context::{lock, ActiveContexts, Context};
use crate::model::{Axiom, ConceptId, ConceptInterner};
use crate::rules::RuleRegistry;
use crate::{ElError, Result};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

/// Owns every context of one saturation run and the queue of active ones.
///
/// The context maps are built up front and never change afterwards, so
/// lookups from worker threads need no locking.
pub struct ContextManager<'a> {
    registry: &'a RuleRegistry,
    interner: &'a ConceptInterner,
    contexts: Vec<HashMap<ConceptId, Arc<Context>>>,
    active: ActiveContexts,
    discarded: Mutex<Vec<Axiom>>,
}

impl<'a> ContextManager<'a> {
    /// Create one context per (entity, rule) the rule accepts
    pub fn new(registry: &'a RuleRegistry, interner: &'a ConceptInterner, entities: &[ConceptId]) -> Self {
        let contexts = registry
            .rules()
            .iter()
            .enumerate()
            .map(|(index, rule)| {
                entities
                    .iter()
                    .filter(|&&entity| rule.has_context(entity, interner))
                    .map(|&entity| {
                        let context = Context::new(entity, index, rule.kind(), rule.new_state());
                        (entity, Arc::new(context))
                    })
                    .collect()
            })
            .collect();

        Self {
            registry,
            interner,
            contexts,
            active: ActiveContexts::new(),
            discarded: Mutex::new(Vec::new()),
        }
    }

    pub fn interner(&self) -> &ConceptInterner {
        self.interner
    }

    pub fn context(&self, rule_index: usize, entity: ConceptId) -> Option<&Arc<Context>> {
        self.contexts.get(rule_index)?.get(&entity)
    }

    pub fn contexts(&self) -> impl Iterator<Item = &Arc<Context>> + '_ {
        self.contexts.iter().flat_map(HashMap::values)
    }

    pub fn context_count(&self) -> usize {
        self.contexts.iter().map(HashMap::len).sum()
    }

    pub fn active_contexts(&self) -> &ActiveContexts {
        &self.active
    }

    /// Initialize every context of `entity` and seed `entity ⊑ entity`, `entity ⊑ ⊤`
    pub fn initialize_entity(&self, entity: ConceptId) -> Result<()> {
        for contexts in &self.contexts {
            if let Some(context) = contexts.get(&entity) {
                context.initialize(self.interner)?;
            }
        }
        self.dispatch(Axiom::new(entity, entity))?;
        self.dispatch(Axiom::new(entity, ConceptId::TOP))?;
        Ok(())
    }

    /// Schedule an input axiom; axioms no rule routes are kept as discarded
    pub fn initialize_axiom(&self, axiom: Axiom) -> Result<()> {
        if !self.dispatch(axiom)? {
            lock(&self.discarded).push(axiom);
        }
        Ok(())
    }

    /// Schedule `axiom` into every context some rule routes it to, and
    /// activate those contexts. Returns whether any context received it.
    pub fn dispatch(&self, axiom: Axiom) -> Result<bool> {
        let mut targets = Vec::new();
        let mut routed = false;

        for (index, rule) in self.registry.rules().iter().enumerate() {
            targets.clear();
            rule.route(axiom, self.interner, &mut targets);
            for &target in &targets {
                let context = self.context(index, target).ok_or_else(|| {
                    ElError::ContractViolation(format!(
                        "no {} context for {} (routing {})",
                        rule.kind(),
                        self.interner.render(target),
                        self.interner.render_axiom(axiom)
                    ))
                })?;
                context.schedule(axiom);
                context.activate(&self.active);
                routed = true;
            }
        }
        Ok(routed)
    }

    /// Drain one context, routing its conclusions
    pub fn process(&self, context: &Arc<Context>) -> Result<usize> {
        let rule = self
            .registry
            .rules()
            .get(context.rule_index())
            .ok_or_else(|| ElError::ContractViolation(format!("unknown rule index {}", context.rule_index())))?;
        context.process(rule.as_ref(), self.interner, |conclusion| {
            self.dispatch(conclusion).map(|_| ())
        })
    }

    pub fn discarded(&self) -> Vec<Axiom> {
        lock(&self.discarded).clone()
    }

    /// Union of all processed sets plus the discarded input
    pub fn closure(&self) -> BTreeSet<Axiom> {
        let mut closure: BTreeSet<Axiom> = self.contexts().flat_map(|context| context.processed()).collect();
        closure.extend(lock(&self.discarded).iter().copied());
        closure
    }
}
