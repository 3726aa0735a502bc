//! EL++ 正規化
//!
//! Rewrites arbitrary inclusions into the four normal forms
//! `C ⊑ D`, `C1 ⊓ C2 ⊑ D`, `C ⊑ ∃r.C2` and `∃r.C1 ⊑ D`, where every `C` is
//! basic and `D` may also be ⊥.

use crate::model::{Axiom, ConceptExpression, ConceptId, ConceptInterner, Ontology};
use serde::{Deserialize, Serialize};
use smallvec::{smallvec, SmallVec};
use std::collections::{BTreeSet, HashSet, VecDeque};
use tracing::{debug, trace};

/// Classification of an inclusion, in rewrite priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NormalForm {
    /// Already one of the four normal forms
    Canonical,
    /// ⊥ ⊑ D, vacuous
    Discard,
    /// C ⊓ D' ⊑ E  ⇒  D' ⊑ A, C ⊓ A ⊑ E
    SplitIntersectionOperand,
    /// ∃r.C' ⊑ D  ⇒  C' ⊑ A, ∃r.A ⊑ D
    SplitExistentialFiller,
    /// B ⊑ ∃r.C'  ⇒  B ⊑ ∃r.A, A ⊑ C'
    SplitSuperclassFiller,
    /// B ⊑ C ⊓ D  ⇒  B ⊑ C, B ⊑ D
    SplitSuperclassIntersection,
    /// C' ⊑ D'  ⇒  C' ⊑ A, A ⊑ D'
    SplitGeneral,
}

/// Classify `axiom` by the first rewrite that applies to it
pub fn classify(interner: &ConceptInterner, axiom: Axiom) -> NormalForm {
    use ConceptExpression::*;

    let sub = interner.get(axiom.sub_class);
    let sup = interner.get(axiom.super_class);

    if sub == Bottom {
        return NormalForm::Discard;
    }

    match (sub, sup) {
        (sub, sup) if sub.is_basic() && sup.is_basic_or_bottom() => NormalForm::Canonical,
        (Intersection(left, right), sup) if sup.is_basic_or_bottom() => {
            if interner.is_basic(left) && interner.is_basic(right) {
                NormalForm::Canonical
            } else {
                NormalForm::SplitIntersectionOperand
            }
        }
        (Existential(_, filler), sup) if sup.is_basic_or_bottom() => {
            if interner.is_basic(filler) {
                NormalForm::Canonical
            } else {
                NormalForm::SplitExistentialFiller
            }
        }
        (sub, Existential(_, filler)) if sub.is_basic() => {
            if interner.is_basic(filler) {
                NormalForm::Canonical
            } else {
                NormalForm::SplitSuperclassFiller
            }
        }
        (sub, Intersection(..)) if sub.is_basic() => NormalForm::SplitSuperclassIntersection,
        _ => NormalForm::SplitGeneral,
    }
}

pub fn is_normalized(interner: &ConceptInterner, axiom: Axiom) -> bool {
    classify(interner, axiom) == NormalForm::Canonical
}

/// Counters of one normalization run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizationStats {
    pub input: usize,
    pub output: usize,
    pub discarded: usize,
    pub rewrites: usize,
    pub fresh_names: usize,
}

/// Worklist rewrite engine over an explicit interner
pub struct Normalizer<'a> {
    interner: &'a mut ConceptInterner,
    stats: NormalizationStats,
}

impl<'a> Normalizer<'a> {
    pub fn new(interner: &'a mut ConceptInterner) -> Self {
        Self {
            interner,
            stats: NormalizationStats::default(),
        }
    }

    pub fn stats(&self) -> &NormalizationStats {
        &self.stats
    }

    /// Rewrite `input` to a fixpoint; the result keeps first-emission order
    pub fn normalize<I>(&mut self, input: I) -> Vec<Axiom>
    where
        I: IntoIterator<Item = Axiom>,
    {
        let generated_before = self.interner.generated_count();
        let mut queue: VecDeque<Axiom> = input.into_iter().collect();
        self.stats.input += queue.len();

        let mut seen = HashSet::new();
        let mut output = Vec::new();

        while let Some(axiom) = queue.pop_front() {
            if !seen.insert(axiom) {
                continue;
            }

            match classify(self.interner, axiom) {
                NormalForm::Canonical => output.push(axiom),
                NormalForm::Discard => self.stats.discarded += 1,
                form => {
                    let produced = self.rewrite(axiom, form);
                    trace!(
                        "{:?}: {} => {}",
                        form,
                        self.interner.render_axiom(axiom),
                        produced.len()
                    );
                    self.stats.rewrites += 1;
                    queue.extend(produced);
                }
            }
        }

        self.stats.output += output.len();
        self.stats.fresh_names += self.interner.generated_count() - generated_before;
        output
    }

    fn rewrite(&mut self, axiom: Axiom, form: NormalForm) -> SmallVec<[Axiom; 2]> {
        let Axiom { sub_class, super_class } = axiom;

        match (form, self.interner.get(sub_class), self.interner.get(super_class)) {
            (NormalForm::SplitIntersectionOperand, ConceptExpression::Intersection(left, right), _) => {
                if !self.interner.is_basic(left) {
                    let fresh = self.interner.fresh_class(left, super_class);
                    let rest = self.interner.intersection(fresh, right);
                    smallvec![Axiom::new(left, fresh), Axiom::new(rest, super_class)]
                } else {
                    let fresh = self.interner.fresh_class(right, super_class);
                    let rest = self.interner.intersection(left, fresh);
                    smallvec![Axiom::new(right, fresh), Axiom::new(rest, super_class)]
                }
            }
            (NormalForm::SplitExistentialFiller, ConceptExpression::Existential(role, filler), _) => {
                let fresh = self.interner.fresh_class(filler, super_class);
                let restriction = self.interner.intern(ConceptExpression::Existential(role, fresh));
                smallvec![Axiom::new(filler, fresh), Axiom::new(restriction, super_class)]
            }
            (NormalForm::SplitSuperclassFiller, _, ConceptExpression::Existential(role, filler)) => {
                let fresh = self.interner.fresh_class(sub_class, filler);
                let restriction = self.interner.intern(ConceptExpression::Existential(role, fresh));
                smallvec![Axiom::new(sub_class, restriction), Axiom::new(fresh, filler)]
            }
            (NormalForm::SplitSuperclassIntersection, _, ConceptExpression::Intersection(left, right)) => {
                smallvec![Axiom::new(sub_class, left), Axiom::new(sub_class, right)]
            }
            _ => {
                let fresh = self.interner.fresh_class(sub_class, super_class);
                smallvec![Axiom::new(sub_class, fresh), Axiom::new(fresh, super_class)]
            }
        }
    }
}

/// Normalized statement set plus the entities that get saturation contexts
#[derive(Debug, Clone, Default)]
pub struct NormalizedOntology {
    axioms: Vec<Axiom>,
    entities: Vec<ConceptId>,
    stats: NormalizationStats,
}

impl NormalizedOntology {
    /// Build from already normalized axioms and extra signature concepts
    pub fn new<I>(axioms: Vec<Axiom>, signature: I, interner: &ConceptInterner) -> Self
    where
        I: IntoIterator<Item = ConceptId>,
    {
        let mut entities = BTreeSet::new();
        entities.insert(ConceptId::TOP);
        for concept in signature {
            collect_basic(interner, concept, &mut entities);
        }
        for axiom in &axioms {
            collect_basic(interner, axiom.sub_class, &mut entities);
            collect_basic(interner, axiom.super_class, &mut entities);
        }

        Self {
            axioms,
            entities: entities.into_iter().collect(),
            stats: NormalizationStats::default(),
        }
    }

    pub fn axioms(&self) -> &[Axiom] {
        &self.axioms
    }

    /// Basic concepts of the signature, Top included, in id order
    pub fn entities(&self) -> &[ConceptId] {
        &self.entities
    }

    pub fn stats(&self) -> &NormalizationStats {
        &self.stats
    }

    pub fn len(&self) -> usize {
        self.axioms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.axioms.is_empty()
    }
}

fn collect_basic(interner: &ConceptInterner, concept: ConceptId, entities: &mut BTreeSet<ConceptId>) {
    match interner.get(concept) {
        ConceptExpression::Name(_) | ConceptExpression::Nominal(_) | ConceptExpression::Top => {
            entities.insert(concept);
        }
        ConceptExpression::Intersection(left, right) => {
            collect_basic(interner, left, entities);
            collect_basic(interner, right, entities);
        }
        ConceptExpression::Existential(_, filler) => collect_basic(interner, filler, entities),
        ConceptExpression::Bottom => {}
    }
}

/// Normalize every statement of `ontology`, equivalences split into pairs
pub fn normalize_ontology(ontology: &mut Ontology) -> NormalizedOntology {
    let inclusions = ontology.inclusions();
    let signature: Vec<ConceptId> = ontology.signature().collect();

    let mut normalizer = Normalizer::new(ontology.interner_mut());
    let axioms = normalizer.normalize(inclusions);
    let stats = normalizer.stats().clone();

    debug!(
        "Normalized {} inclusions into {} axioms ({} rewrites, {} fresh names, {} discarded)",
        stats.input, stats.output, stats.rewrites, stats.fresh_names, stats.discarded
    );

    let mut normalized = NormalizedOntology::new(axioms, signature, ontology.interner());
    normalized.stats = stats;
    normalized
}
