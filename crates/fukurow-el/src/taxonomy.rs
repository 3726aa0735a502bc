//! クラス階層 (taxonomy)
//!
//! Built from the closure in three steps: the superconcept map, the
//! per-concept reduction into equivalents and direct superconcepts
//! (optionally sharded over threads), and the assembly of nodes.

use crate::model::{Axiom, ConceptExpression, ConceptId, ConceptInterner};
use crate::rules::AxiomShape;
use crate::saturation::Closure;
use crate::{ElError, Result};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::thread;
use std::time::Instant;
use tracing::{debug, info};

pub type NodeId = usize;

/// One equivalence class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyNode {
    id: NodeId,
    members: Vec<ConceptId>,
}

impl TaxonomyNode {
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Equivalent concepts, in id order
    pub fn members(&self) -> &[ConceptId] {
        &self.members
    }

    /// Smallest member id
    pub fn representative(&self) -> ConceptId {
        self.members[0]
    }

    pub fn contains(&self, concept: ConceptId) -> bool {
        self.members.binary_search(&concept).is_ok()
    }
}

/// Reduced class hierarchy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Taxonomy {
    nodes: Vec<TaxonomyNode>,
    class_to_node: HashMap<ConceptId, NodeId>,
    direct_supers: Vec<BTreeSet<NodeId>>,
    direct_subs: Vec<BTreeSet<NodeId>>,
    all_supers: Vec<BTreeSet<NodeId>>,
    all_subs: Vec<BTreeSet<NodeId>>,
    top: NodeId,
    bottom: NodeId,
}

impl Taxonomy {
    pub fn top_node(&self) -> &TaxonomyNode {
        &self.nodes[self.top]
    }

    pub fn bottom_node(&self) -> &TaxonomyNode {
        &self.nodes[self.bottom]
    }

    pub fn nodes(&self) -> &[TaxonomyNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node of a named concept, Top, Bottom or nominal
    pub fn node(&self, concept: ConceptId, interner: &ConceptInterner) -> Result<&TaxonomyNode> {
        self.node_id(concept, interner).map(|id| &self.nodes[id])
    }

    pub fn equivalent_classes(&self, concept: ConceptId, interner: &ConceptInterner) -> Result<&[ConceptId]> {
        self.node(concept, interner).map(TaxonomyNode::members)
    }

    pub fn super_classes(
        &self,
        concept: ConceptId,
        direct: bool,
        interner: &ConceptInterner,
    ) -> Result<Vec<&TaxonomyNode>> {
        let id = self.node_id(concept, interner)?;
        let edges = if direct { &self.direct_supers[id] } else { &self.all_supers[id] };
        Ok(edges.iter().map(|&node| &self.nodes[node]).collect())
    }

    pub fn sub_classes(
        &self,
        concept: ConceptId,
        direct: bool,
        interner: &ConceptInterner,
    ) -> Result<Vec<&TaxonomyNode>> {
        let id = self.node_id(concept, interner)?;
        let edges = if direct { &self.direct_subs[id] } else { &self.all_subs[id] };
        Ok(edges.iter().map(|&node| &self.nodes[node]).collect())
    }

    fn node_id(&self, concept: ConceptId, interner: &ConceptInterner) -> Result<NodeId> {
        match interner.get(concept) {
            ConceptExpression::Intersection(..) | ConceptExpression::Existential(..) => Err(
                ElError::UnsupportedQuery(format!("anonymous class expression {}", interner.render(concept))),
            ),
            _ => self
                .class_to_node
                .get(&concept)
                .copied()
                .ok_or_else(|| ElError::UnknownEntity(interner.render(concept))),
        }
    }
}

/// Equivalents and direct superconcepts of one concept
#[derive(Debug, Clone, PartialEq, Eq)]
struct Reduction {
    concept: ConceptId,
    equivalents: Vec<ConceptId>,
    direct: Vec<ConceptId>,
}

type SuperConcepts = HashMap<ConceptId, HashSet<ConceptId>>;

/// Builds a [`Taxonomy`] from a closure
#[derive(Debug, Clone)]
pub struct TaxonomyBuilder {
    concurrent: bool,
    workers: usize,
}

impl Default for TaxonomyBuilder {
    fn default() -> Self {
        Self::sequential()
    }
}

impl TaxonomyBuilder {
    pub fn sequential() -> Self {
        Self {
            concurrent: false,
            workers: 1,
        }
    }

    pub fn concurrent(workers: usize) -> Self {
        Self {
            concurrent: workers > 1,
            workers: workers.max(1),
        }
    }

    pub fn build(&self, closure: &Closure, interner: &ConceptInterner) -> Result<Taxonomy> {
        self.build_from_axioms(closure.axioms().iter().copied(), interner)
    }

    pub fn build_from_axioms<I>(&self, axioms: I, interner: &ConceptInterner) -> Result<Taxonomy>
    where
        I: IntoIterator<Item = Axiom>,
    {
        let start = Instant::now();
        let supers = super_concepts(axioms, interner);
        let reductions = if self.concurrent {
            self.reduce_sharded(&supers)?
        } else {
            let keys: Vec<ConceptId> = supers.keys().copied().sorted().collect();
            reduce_partition(&keys, &supers)
        };
        let taxonomy = assemble(&supers, reductions);

        info!(
            "Taxonomy built: {} nodes from {} concepts in {:?}",
            taxonomy.len(),
            supers.len(),
            start.elapsed()
        );
        Ok(taxonomy)
    }

    fn reduce_sharded(&self, supers: &SuperConcepts) -> Result<Vec<Reduction>> {
        let keys: Vec<ConceptId> = supers.keys().copied().sorted().collect();
        let chunk = keys.len().div_ceil(self.workers).max(1);

        thread::scope(|scope| -> Result<Vec<Reduction>> {
            let mut handles = Vec::new();
            for (index, partition) in keys.chunks(chunk).enumerate() {
                let handle = thread::Builder::new()
                    .name(format!("el-taxonomy-{}", index))
                    .spawn_scoped(scope, move || {
                        debug!("Taxonomy shard {} reducing {} concepts", index, partition.len());
                        reduce_partition(partition, supers)
                    })?;
                handles.push(handle);
            }

            let mut reductions = Vec::with_capacity(keys.len());
            for handle in handles {
                let partition = handle
                    .join()
                    .map_err(|_| ElError::WorkerPanicked("taxonomy shard".to_string()))?;
                reductions.extend(partition);
            }
            Ok(reductions)
        })
    }
}

/// Step 1: superconcepts of every basic concept, Top and Bottom wired in
fn super_concepts<I>(axioms: I, interner: &ConceptInterner) -> SuperConcepts
where
    I: IntoIterator<Item = Axiom>,
{
    let mut supers: SuperConcepts = HashMap::new();
    let mut seen = BTreeSet::from([ConceptId::TOP, ConceptId::BOTTOM]);
    let register = |concept: ConceptId, seen: &mut BTreeSet<ConceptId>| {
        if !interner.is_generated(concept) {
            seen.insert(concept);
        }
    };

    for axiom in axioms {
        match AxiomShape::of(axiom, interner) {
            AxiomShape::Subsumption { sub, sup } => {
                if interner.is_generated(sub) || interner.is_generated(sup) {
                    continue;
                }
                supers.entry(sub).or_default().insert(sup);
                register(sub, &mut seen);
                register(sup, &mut seen);
            }
            AxiomShape::Link { sub, filler, .. } => {
                register(sub, &mut seen);
                register(filler, &mut seen);
            }
            AxiomShape::Conjunction { left, right, sup } => {
                register(left, &mut seen);
                register(right, &mut seen);
                register(sup, &mut seen);
            }
            AxiomShape::RoleRestriction { filler, sup, .. } => {
                register(filler, &mut seen);
                register(sup, &mut seen);
            }
            AxiomShape::Other => {}
        }
    }

    for &concept in &seen {
        let entry = supers.entry(concept).or_default();
        entry.insert(concept);
        entry.insert(ConceptId::TOP);
    }
    supers
        .entry(ConceptId::BOTTOM)
        .or_default()
        .extend(seen.iter().copied());
    supers
}

/// Step 2 for a contiguous range of concepts
fn reduce_partition(keys: &[ConceptId], supers: &SuperConcepts) -> Vec<Reduction> {
    keys.iter().map(|&concept| reduce(concept, supers)).collect()
}

fn reduce(concept: ConceptId, supers: &SuperConcepts) -> Reduction {
    let empty = HashSet::new();
    let supers_of = |c: ConceptId| supers.get(&c).unwrap_or(&empty);

    let mut equivalents = vec![concept];
    let mut direct: Vec<ConceptId> = Vec::new();

    for candidate in supers_of(concept).iter().copied().sorted() {
        if candidate == concept {
            continue;
        }
        if supers_of(candidate).contains(&concept) {
            equivalents.push(candidate);
            continue;
        }
        // one decision per candidate: redundant if below some current direct
        // superconcept, otherwise it replaces every direct one it is below of
        if direct.iter().any(|&existing| supers_of(existing).contains(&candidate)) {
            continue;
        }
        direct.retain(|&existing| !supers_of(candidate).contains(&existing));
        direct.push(candidate);
    }

    equivalents.sort();
    Reduction {
        concept,
        equivalents,
        direct,
    }
}

/// Step 3: nodes and adjacency
fn assemble(supers: &SuperConcepts, reductions: Vec<Reduction>) -> Taxonomy {
    let reductions: BTreeMap<ConceptId, Reduction> = reductions
        .into_iter()
        .map(|reduction| (reduction.concept, reduction))
        .collect();

    let mut classes = UnionFind::default();
    for reduction in reductions.values() {
        for &equivalent in &reduction.equivalents {
            classes.union(reduction.concept, equivalent);
        }
    }

    let mut groups: BTreeMap<ConceptId, Vec<ConceptId>> = BTreeMap::new();
    for &concept in reductions.keys() {
        groups.entry(classes.find(concept)).or_default().push(concept);
    }
    let mut members: Vec<Vec<ConceptId>> = groups.into_values().collect();
    for group in &mut members {
        group.sort();
    }
    members.sort();

    let mut class_to_node = HashMap::new();
    let nodes: Vec<TaxonomyNode> = members
        .into_iter()
        .enumerate()
        .map(|(id, members)| {
            for &member in &members {
                class_to_node.insert(member, id);
            }
            TaxonomyNode { id, members }
        })
        .collect();

    let top = class_to_node[&ConceptId::TOP];
    let bottom = class_to_node[&ConceptId::BOTTOM];
    let mut direct_supers = vec![BTreeSet::new(); nodes.len()];
    let mut all_supers = vec![BTreeSet::new(); nodes.len()];

    for node in &nodes {
        // the Bottom class is reduced through ⊥ itself, whose superconcepts are complete
        let representative = if node.id == bottom {
            ConceptId::BOTTOM
        } else {
            node.representative()
        };
        if let Some(reduction) = reductions.get(&representative) {
            direct_supers[node.id] = reduction
                .direct
                .iter()
                .map(|concept| class_to_node[concept])
                .filter(|&id| id != node.id)
                .collect();
        }
        if let Some(concept_supers) = supers.get(&representative) {
            all_supers[node.id] = concept_supers
                .iter()
                .filter_map(|concept| class_to_node.get(concept).copied())
                .filter(|&id| id != node.id)
                .collect();
        }
    }

    let mut direct_subs = vec![BTreeSet::new(); nodes.len()];
    let mut all_subs = vec![BTreeSet::new(); nodes.len()];
    for id in 0..nodes.len() {
        for &sup in &direct_supers[id] {
            direct_subs[sup].insert(id);
        }
        for &sup in &all_supers[id] {
            all_subs[sup].insert(id);
        }
    }

    Taxonomy {
        nodes,
        class_to_node,
        direct_supers,
        direct_subs,
        all_supers,
        all_subs,
        top,
        bottom,
    }
}

#[derive(Debug, Default)]
struct UnionFind {
    parent: HashMap<ConceptId, ConceptId>,
}

impl UnionFind {
    fn find(&mut self, concept: ConceptId) -> ConceptId {
        let parent = *self.parent.entry(concept).or_insert(concept);
        if parent == concept {
            return concept;
        }
        let root = self.find(parent);
        self.parent.insert(concept, root);
        root
    }

    fn union(&mut self, a: ConceptId, b: ConceptId) {
        let (root_a, root_b) = (self.find(a), self.find(b));
        if root_a != root_b {
            // keep the smaller id as root so roots are stable
            let (root, child) = if root_a < root_b { (root_a, root_b) } else { (root_b, root_a) };
            self.parent.insert(child, root);
        }
    }
}
