//! CR6: nominal chain expansion

use super::{contract_violation, AxiomShape, InferenceRule, RuleKind, RuleState};
use crate::model::{Axiom, ConceptExpression, ConceptId, ConceptInterner};
use crate::Result;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

/// Directed graph of derived links X ⊑ ∃r.Y, as edges X → Y
#[derive(Debug, Clone, Default)]
pub struct RelationGraph {
    edges: HashMap<ConceptId, BTreeSet<ConceptId>>,
}

impl RelationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the edge was already present
    pub fn add_edge(&mut self, from: ConceptId, to: ConceptId) -> bool {
        self.edges.entry(from).or_default().insert(to)
    }

    pub fn successors(&self, node: ConceptId) -> impl Iterator<Item = ConceptId> + '_ {
        self.edges.get(&node).into_iter().flatten().copied()
    }

    /// Breadth-first closure of `starts`, the starts included
    pub fn reachable_from<I>(&self, starts: I) -> HashSet<ConceptId>
    where
        I: IntoIterator<Item = ConceptId>,
    {
        let mut visited = HashSet::new();
        for start in starts {
            self.extend_reachable(&mut visited, start);
        }
        visited
    }

    /// Adds to `visited` everything reachable from `start` not already in it
    pub fn extend_reachable(&self, visited: &mut HashSet<ConceptId>, start: ConceptId) {
        if !visited.insert(start) {
            return;
        }
        let mut queue = VecDeque::from([start]);
        while let Some(node) = queue.pop_front() {
            for next in self.successors(node) {
                if visited.insert(next) {
                    queue.push_back(next);
                }
            }
        }
    }
}

/// State of the context of one individual {a}
#[derive(Debug, Clone, Default)]
pub struct NominalState {
    /// Every X with X ⊑ {a}
    members: BTreeSet<ConceptId>,
    graph: RelationGraph,
    /// Reachable from some individual
    anchored: HashSet<ConceptId>,
    /// Reachable from each member
    reach: HashMap<ConceptId, HashSet<ConceptId>>,
    derived: HashSet<(ConceptId, ConceptId)>,
}

impl NominalState {
    pub fn members(&self) -> &BTreeSet<ConceptId> {
        &self.members
    }

    pub fn graph(&self) -> &RelationGraph {
        &self.graph
    }
}

/// C ⊑ {a}, D ⊑ {a}, D reachable from C or from some nominal ⇒ C ⊑ D
///
/// A concept reachable from a nominal is non-empty in every model, so two
/// such concepts below the same singleton coincide; the other rules then
/// carry the subsumers of D over to C.
#[derive(Debug, Default)]
pub struct NominalChainRule {
    individuals: Vec<ConceptId>,
}

impl NominalChainRule {
    fn add_member(state: &mut NominalState, member: ConceptId) -> bool {
        if !state.members.insert(member) {
            return false;
        }
        let mut reach = HashSet::new();
        state.graph.extend_reachable(&mut reach, member);
        state.reach.insert(member, reach);
        true
    }

    /// Only the sets that already hold `from` can grow
    fn add_edge(state: &mut NominalState, from: ConceptId, to: ConceptId) -> bool {
        if !state.graph.add_edge(from, to) {
            return false;
        }
        if state.anchored.contains(&from) {
            state.graph.extend_reachable(&mut state.anchored, to);
        }
        for reach in state.reach.values_mut() {
            if reach.contains(&from) {
                state.graph.extend_reachable(reach, to);
            }
        }
        true
    }

    fn merge(&self, entity: ConceptId, state: &mut NominalState, conclusions: &mut Vec<Axiom>) {
        if state.members.len() < 2 {
            return;
        }

        for &c in &state.members {
            let Some(reach) = state.reach.get(&c) else {
                continue;
            };
            for &d in &state.members {
                // every member is already below {a}
                if c == d || d == entity {
                    continue;
                }
                if (state.anchored.contains(&d) || reach.contains(&d)) && state.derived.insert((c, d)) {
                    conclusions.push(Axiom::new(c, d));
                }
            }
        }
    }
}

impl InferenceRule for NominalChainRule {
    fn kind(&self) -> RuleKind {
        RuleKind::Nominal
    }

    fn description(&self) -> &'static str {
        "Nominal chain: C ⊑ {a}, D ⊑ {a} and C ⇝ D entail C ⊑ D"
    }

    fn register(&mut self, _axiom: Axiom, _interner: &ConceptInterner) {}

    fn register_entity(&mut self, entity: ConceptId, interner: &ConceptInterner) {
        if self.has_context(entity, interner) && !self.individuals.contains(&entity) {
            self.individuals.push(entity);
        }
    }

    fn has_context(&self, entity: ConceptId, interner: &ConceptInterner) -> bool {
        matches!(interner.get(entity), ConceptExpression::Nominal(_))
    }

    fn new_state(&self) -> RuleState {
        RuleState::Nominal(NominalState::default())
    }

    fn route(&self, axiom: Axiom, interner: &ConceptInterner, targets: &mut Vec<ConceptId>) {
        match AxiomShape::of(axiom, interner) {
            AxiomShape::Subsumption { sup, .. } if self.has_context(sup, interner) => targets.push(sup),
            AxiomShape::Link { .. } => targets.extend(self.individuals.iter().copied()),
            _ => {}
        }
    }

    fn compute(
        &self,
        entity: ConceptId,
        state: &mut RuleState,
        axiom: Axiom,
        interner: &ConceptInterner,
        conclusions: &mut Vec<Axiom>,
    ) -> Result<()> {
        let RuleState::Nominal(state) = state else {
            return Err(contract_violation(self.kind(), entity, axiom, interner));
        };

        if state.anchored.is_empty() {
            for &individual in &self.individuals {
                state.graph.extend_reachable(&mut state.anchored, individual);
            }
        }

        let changed = match AxiomShape::of(axiom, interner) {
            AxiomShape::Subsumption { sub, sup } if sup == entity => Self::add_member(state, sub),
            AxiomShape::Link { sub, filler, .. } => Self::add_edge(state, sub, filler),
            _ => return Err(contract_violation(self.kind(), entity, axiom, interner)),
        };

        if changed {
            self.merge(entity, state, conclusions);
        }
        Ok(())
    }
}
