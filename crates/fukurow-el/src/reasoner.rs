//! EL++ リーズナー
//!
//! Runs the three phases in order: normalization, saturation and taxonomy
//! construction. The result is a [`Classification`] that answers
//! subsumption, satisfiability and hierarchy queries.

use crate::config::ReasonerConfig;
use crate::model::{Axiom, ConceptExpression, ConceptId, ConceptInterner, Ontology};
use crate::normalizer::{normalize_ontology, NormalizedOntology};
use crate::saturation::{Closure, SaturationEngine};
use crate::taxonomy::{Taxonomy, TaxonomyBuilder, TaxonomyNode};
use crate::{ElError, Result};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::info;

/// Timings and sizes of one classification
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasoningStats {
    pub normalization: Duration,
    pub saturation: Duration,
    pub taxonomy: Duration,
    pub input_axioms: usize,
    pub normalized_axioms: usize,
    pub closure_axioms: usize,
    pub taxonomy_nodes: usize,
}

/// EL++ reasoner
#[derive(Debug, Clone, Default)]
pub struct ElReasoner {
    config: ReasonerConfig,
}

impl ElReasoner {
    pub fn new(config: ReasonerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReasonerConfig {
        &self.config
    }

    pub fn normalize(&self, ontology: &mut Ontology) -> NormalizedOntology {
        normalize_ontology(ontology)
    }

    /// Normalize, saturate and build the taxonomy
    pub fn classify(&self, ontology: &mut Ontology) -> Result<Classification> {
        self.config.validate()?;

        let start = Instant::now();
        let normalized = self.normalize(ontology);
        let normalization = start.elapsed();
        info!(
            "Normalization: {} -> {} axioms ({} fresh names) in {:?}",
            normalized.stats().input,
            normalized.len(),
            normalized.stats().fresh_names,
            normalization
        );

        let interner = ontology.interner();
        let start = Instant::now();
        let closure = SaturationEngine::with_config(&self.config).saturate(&normalized, interner)?;
        let saturation = start.elapsed();

        let builder = if self.config.concurrent_taxonomy {
            TaxonomyBuilder::concurrent(self.config.taxonomy_workers)
        } else {
            TaxonomyBuilder::sequential()
        };
        let start = Instant::now();
        let taxonomy = builder.build(&closure, interner)?;
        let taxonomy_time = start.elapsed();

        let stats = ReasoningStats {
            normalization,
            saturation,
            taxonomy: taxonomy_time,
            input_axioms: normalized.stats().input,
            normalized_axioms: normalized.len(),
            closure_axioms: closure.len(),
            taxonomy_nodes: taxonomy.len(),
        };
        info!(
            "Classification complete: {} closure axioms, {} taxonomy nodes",
            stats.closure_axioms, stats.taxonomy_nodes
        );

        Ok(Classification {
            interner: interner.clone(),
            normalized,
            closure,
            taxonomy,
            stats,
        })
    }
}

/// Result of [`ElReasoner::classify`]
#[derive(Debug, Clone)]
pub struct Classification {
    interner: ConceptInterner,
    normalized: NormalizedOntology,
    closure: Closure,
    taxonomy: Taxonomy,
    stats: ReasoningStats,
}

impl Classification {
    pub fn interner(&self) -> &ConceptInterner {
        &self.interner
    }

    pub fn normalized(&self) -> &NormalizedOntology {
        &self.normalized
    }

    pub fn closure(&self) -> &Closure {
        &self.closure
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    pub fn stats(&self) -> &ReasoningStats {
        &self.stats
    }

    /// Check if `sub` ⊑ `sup` holds; both must be basic concepts or ⊥
    pub fn is_subsumed_by(&self, sub: ConceptId, sup: ConceptId) -> Result<bool> {
        self.check_basic(sub)?;
        self.check_basic(sup)?;

        Ok(sub == sup
            || sup == ConceptId::TOP
            || sub == ConceptId::BOTTOM
            || self.closure.contains(&Axiom::new(sub, sup))
            || self.closure.contains(&Axiom::new(sub, ConceptId::BOTTOM)))
    }

    pub fn is_satisfiable(&self, concept: ConceptId) -> Result<bool> {
        self.check_basic(concept)?;
        Ok(concept != ConceptId::BOTTOM && !self.closure.contains(&Axiom::new(concept, ConceptId::BOTTOM)))
    }

    /// Named classes equivalent to ⊥
    pub fn unsatisfiable_classes(&self) -> Vec<ConceptId> {
        self.taxonomy
            .bottom_node()
            .members()
            .iter()
            .copied()
            .filter(|&concept| self.interner.is_named_class(concept))
            .collect()
    }

    /// False iff ⊤ or some individual is subsumed by ⊥
    pub fn is_consistent(&self) -> bool {
        let bottom = |concept: ConceptId| self.closure.contains(&Axiom::new(concept, ConceptId::BOTTOM));
        !bottom(ConceptId::TOP)
            && !self
                .normalized
                .entities()
                .iter()
                .any(|&entity| matches!(self.interner.get(entity), ConceptExpression::Nominal(_)) && bottom(entity))
    }

    /// Non-reflexive subsumptions between named classes
    pub fn inferred_subsumptions(&self) -> Vec<(ConceptId, ConceptId)> {
        self.closure
            .axioms()
            .iter()
            .filter(|axiom| {
                axiom.sub_class != axiom.super_class
                    && self.interner.is_named_class(axiom.sub_class)
                    && self.interner.is_named_class(axiom.super_class)
            })
            .map(|axiom| (axiom.sub_class, axiom.super_class))
            .collect()
    }

    pub fn super_classes(&self, concept: ConceptId, direct: bool) -> Result<Vec<&TaxonomyNode>> {
        self.taxonomy.super_classes(concept, direct, &self.interner)
    }

    pub fn sub_classes(&self, concept: ConceptId, direct: bool) -> Result<Vec<&TaxonomyNode>> {
        self.taxonomy.sub_classes(concept, direct, &self.interner)
    }

    pub fn equivalent_classes(&self, concept: ConceptId) -> Result<&[ConceptId]> {
        self.taxonomy.equivalent_classes(concept, &self.interner)
    }

    fn check_basic(&self, concept: ConceptId) -> Result<()> {
        if self.interner.is_basic_or_bottom(concept) {
            Ok(())
        } else {
            Err(ElError::UnsupportedQuery(format!(
                "anonymous class expression {}",
                self.interner.render(concept)
            )))
        }
    }
}
