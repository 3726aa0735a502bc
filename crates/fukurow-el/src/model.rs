//! EL++ データモデル
//!
//! Concept expressions are hash-consed in a [`ConceptInterner`]. Every other
//! component works with the `Copy` handles it hands out, so structurally equal
//! expressions compare equal by id.

use crate::{ElError, Result};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::hash::{Hash, Hasher};

/// Interned IRI of a class, individual or object property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Symbol(u32);

/// Handle of an interned concept expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ConceptId(u32);

impl ConceptId {
    /// owl:Thing (⊤)
    pub const TOP: ConceptId = ConceptId(0);
    /// owl:Nothing (⊥)
    pub const BOTTOM: ConceptId = ConceptId(1);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// EL++ concept expression (no role inclusions, no concrete domains)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConceptExpression {
    /// ⊤
    Top,
    /// ⊥
    Bottom,
    /// Named class
    Name(Symbol),
    /// Singleton individual {a}
    Nominal(Symbol),
    /// C ⊓ D
    Intersection(ConceptId, ConceptId),
    /// ∃r.C
    Existential(Symbol, ConceptId),
}

impl ConceptExpression {
    /// Top, a concept name or a nominal
    pub fn is_basic(&self) -> bool {
        matches!(self, Self::Top | Self::Name(_) | Self::Nominal(_))
    }

    /// A basic concept, or ⊥ (allowed on the right of a normal form)
    pub fn is_basic_or_bottom(&self) -> bool {
        self.is_basic() || matches!(self, Self::Bottom)
    }
}

/// Concept inclusion C ⊑ D
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Axiom {
    pub sub_class: ConceptId,
    pub super_class: ConceptId,
}

impl Axiom {
    pub fn new(sub_class: ConceptId, super_class: ConceptId) -> Self {
        Self { sub_class, super_class }
    }
}

/// Arena of symbols and hash-consed concept expressions.
///
/// Passed explicitly by reference: mutably while an ontology is built and
/// normalized, shared read-only by the saturation workers afterwards.
#[derive(Debug, Clone)]
pub struct ConceptInterner {
    symbols: Vec<String>,
    symbol_ids: HashMap<String, Symbol>,
    expressions: Vec<ConceptExpression>,
    expression_ids: HashMap<ConceptExpression, ConceptId>,
    generated: HashSet<Symbol>,
    fresh: HashMap<(ConceptId, ConceptId), ConceptId>,
}

impl Default for ConceptInterner {
    fn default() -> Self {
        Self::new()
    }
}

impl ConceptInterner {
    pub fn new() -> Self {
        let mut interner = Self {
            symbols: Vec::new(),
            symbol_ids: HashMap::new(),
            expressions: Vec::new(),
            expression_ids: HashMap::new(),
            generated: HashSet::new(),
            fresh: HashMap::new(),
        };
        let top = interner.intern(ConceptExpression::Top);
        let bottom = interner.intern(ConceptExpression::Bottom);
        debug_assert_eq!((top, bottom), (ConceptId::TOP, ConceptId::BOTTOM));
        interner
    }

    /// Intern a name
    pub fn symbol(&mut self, name: &str) -> Symbol {
        if let Some(&symbol) = self.symbol_ids.get(name) {
            return symbol;
        }
        let symbol = Symbol(self.symbols.len() as u32);
        self.symbols.push(name.to_string());
        self.symbol_ids.insert(name.to_string(), symbol);
        symbol
    }

    pub fn find_symbol(&self, name: &str) -> Option<Symbol> {
        self.symbol_ids.get(name).copied()
    }

    pub fn symbol_name(&self, symbol: Symbol) -> &str {
        &self.symbols[symbol.0 as usize]
    }

    /// Intern an expression, reusing the id of a structurally equal one
    pub fn intern(&mut self, expression: ConceptExpression) -> ConceptId {
        if let Some(&id) = self.expression_ids.get(&expression) {
            return id;
        }
        let id = ConceptId(self.expressions.len() as u32);
        self.expressions.push(expression);
        self.expression_ids.insert(expression, id);
        id
    }

    pub fn lookup(&self, expression: &ConceptExpression) -> Option<ConceptId> {
        self.expression_ids.get(expression).copied()
    }

    pub fn get(&self, id: ConceptId) -> ConceptExpression {
        self.expressions[id.index()]
    }

    pub fn class(&mut self, name: &str) -> ConceptId {
        let symbol = self.symbol(name);
        self.intern(ConceptExpression::Name(symbol))
    }

    pub fn nominal(&mut self, individual: &str) -> ConceptId {
        let symbol = self.symbol(individual);
        self.intern(ConceptExpression::Nominal(symbol))
    }

    pub fn intersection(&mut self, left: ConceptId, right: ConceptId) -> ConceptId {
        self.intern(ConceptExpression::Intersection(left, right))
    }

    /// Fold an n-ary intersection to the right; `None` when empty
    pub fn intersection_of(&mut self, operands: &[ConceptId]) -> Option<ConceptId> {
        let (&last, rest) = operands.split_last()?;
        Some(rest.iter().rev().fold(last, |acc, &operand| self.intersection(operand, acc)))
    }

    pub fn some(&mut self, role: &str, filler: ConceptId) -> ConceptId {
        let role = self.symbol(role);
        self.intern(ConceptExpression::Existential(role, filler))
    }

    pub fn find_class(&self, name: &str) -> Option<ConceptId> {
        let symbol = self.find_symbol(name)?;
        self.lookup(&ConceptExpression::Name(symbol))
    }

    pub fn find_nominal(&self, individual: &str) -> Option<ConceptId> {
        let symbol = self.find_symbol(individual)?;
        self.lookup(&ConceptExpression::Nominal(symbol))
    }

    /// Fresh class standing for the split of `first` against `second`.
    ///
    /// The name hashes the rendering of both expressions, so the same pair
    /// always yields the same class. The hash is `DefaultHasher`, whose
    /// algorithm may change between Rust releases, so names are only
    /// stable for binaries built with the same toolchain.
    pub fn fresh_class(&mut self, first: ConceptId, second: ConceptId) -> ConceptId {
        if let Some(&class) = self.fresh.get(&(first, second)) {
            return class;
        }

        let base = format!(
            "#GENERATED{:016x}{:016x}",
            stable_hash(&self.render(first)),
            stable_hash(&self.render(second))
        );
        let mut name = base.clone();
        let mut suffix = 1;
        while self.symbol_ids.contains_key(&name) {
            name = format!("{}_{}", base, suffix);
            suffix += 1;
        }

        let symbol = self.symbol(&name);
        self.generated.insert(symbol);
        let class = self.intern(ConceptExpression::Name(symbol));
        self.fresh.insert((first, second), class);
        class
    }

    pub fn is_basic(&self, id: ConceptId) -> bool {
        self.get(id).is_basic()
    }

    pub fn is_basic_or_bottom(&self, id: ConceptId) -> bool {
        self.get(id).is_basic_or_bottom()
    }

    /// True for classes introduced by normalization
    pub fn is_generated(&self, id: ConceptId) -> bool {
        match self.get(id) {
            ConceptExpression::Name(symbol) => self.generated.contains(&symbol),
            _ => false,
        }
    }

    /// A named class that was not introduced by normalization
    pub fn is_named_class(&self, id: ConceptId) -> bool {
        matches!(self.get(id), ConceptExpression::Name(_)) && !self.is_generated(id)
    }

    pub fn generated_count(&self) -> usize {
        self.generated.len()
    }

    /// Nesting depth; basic concepts and ⊥ have depth 0
    pub fn depth(&self, id: ConceptId) -> usize {
        match self.get(id) {
            ConceptExpression::Intersection(left, right) => 1 + self.depth(left).max(self.depth(right)),
            ConceptExpression::Existential(_, filler) => 1 + self.depth(filler),
            _ => 0,
        }
    }

    /// Functional-style rendering, e.g. `ObjectSomeValuesFrom(r A)`
    pub fn render(&self, id: ConceptId) -> String {
        match self.get(id) {
            ConceptExpression::Top => "owl:Thing".to_string(),
            ConceptExpression::Bottom => "owl:Nothing".to_string(),
            ConceptExpression::Name(symbol) => self.symbol_name(symbol).to_string(),
            ConceptExpression::Nominal(symbol) => format!("ObjectOneOf({})", self.symbol_name(symbol)),
            ConceptExpression::Intersection(..) => {
                let mut operands = Vec::new();
                self.flatten_intersection(id, &mut operands);
                format!(
                    "ObjectIntersectionOf({})",
                    operands.iter().map(|&operand| self.render(operand)).join(" ")
                )
            }
            ConceptExpression::Existential(role, filler) => format!(
                "ObjectSomeValuesFrom({} {})",
                self.symbol_name(role),
                self.render(filler)
            ),
        }
    }

    pub fn render_axiom(&self, axiom: Axiom) -> String {
        format!(
            "SubClassOf({} {})",
            self.render(axiom.sub_class),
            self.render(axiom.super_class)
        )
    }

    fn flatten_intersection(&self, id: ConceptId, operands: &mut Vec<ConceptId>) {
        match self.get(id) {
            ConceptExpression::Intersection(left, right) => {
                self.flatten_intersection(left, operands);
                self.flatten_intersection(right, operands);
            }
            _ => operands.push(id),
        }
    }

    pub fn len(&self) -> usize {
        self.expressions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expressions.is_empty()
    }
}

fn stable_hash(value: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Ontology signature entity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Entity {
    Class(String),
    NamedIndividual(String),
    ObjectProperty(String),
    DataProperty(String),
    Datatype(String),
}

impl Entity {
    pub fn iri(&self) -> &str {
        match self {
            Entity::Class(iri)
            | Entity::NamedIndividual(iri)
            | Entity::ObjectProperty(iri)
            | Entity::DataProperty(iri)
            | Entity::Datatype(iri) => iri,
        }
    }

    /// Concept standing for this entity: a class or a nominal
    pub fn to_concept(&self, interner: &mut ConceptInterner) -> Result<ConceptId> {
        match self {
            Entity::Class(iri) => Ok(interner.class(iri)),
            Entity::NamedIndividual(iri) => Ok(interner.nominal(iri)),
            other => Err(ElError::UnsupportedEntityType(format!(
                "{:?} is neither a class nor an individual",
                other
            ))),
        }
    }
}

/// Input statement shapes accepted by the reasoner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// SubClassOf(C D)
    SubClassOf(Axiom),
    /// EquivalentClasses(C1 ... Cn)
    EquivalentClasses(Vec<ConceptId>),
}

impl Statement {
    /// Decompose into inclusions; equivalences become a chain in both directions
    pub fn inclusions(&self) -> Vec<Axiom> {
        match self {
            Statement::SubClassOf(axiom) => vec![*axiom],
            Statement::EquivalentClasses(classes) => classes
                .iter()
                .tuple_windows()
                .flat_map(|(&a, &b)| [Axiom::new(a, b), Axiom::new(b, a)])
                .collect(),
        }
    }
}

/// EL++ ontology: statements plus the signature collected from them
#[derive(Debug, Clone, Default)]
pub struct Ontology {
    pub iri: Option<String>,
    interner: ConceptInterner,
    statements: Vec<Statement>,
    classes: BTreeSet<ConceptId>,
    individuals: BTreeSet<ConceptId>,
    roles: BTreeSet<Symbol>,
}

impl Ontology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_iri(iri: impl Into<String>) -> Self {
        Self {
            iri: Some(iri.into()),
            ..Self::default()
        }
    }

    pub fn interner(&self) -> &ConceptInterner {
        &self.interner
    }

    pub fn interner_mut(&mut self) -> &mut ConceptInterner {
        &mut self.interner
    }

    pub fn class(&mut self, name: &str) -> ConceptId {
        let class = self.interner.class(name);
        self.classes.insert(class);
        class
    }

    pub fn nominal(&mut self, individual: &str) -> ConceptId {
        let nominal = self.interner.nominal(individual);
        self.individuals.insert(nominal);
        nominal
    }

    pub fn and(&mut self, left: ConceptId, right: ConceptId) -> ConceptId {
        self.interner.intersection(left, right)
    }

    pub fn some(&mut self, role: &str, filler: ConceptId) -> ConceptId {
        let role_symbol = self.interner.symbol(role);
        self.roles.insert(role_symbol);
        self.interner.some(role, filler)
    }

    /// Declare a signature entity without any axiom mentioning it
    pub fn declare(&mut self, entity: &Entity) -> Result<()> {
        match entity {
            Entity::ObjectProperty(iri) => {
                let role = self.interner.symbol(iri);
                self.roles.insert(role);
                Ok(())
            }
            other => {
                let concept = other.to_concept(&mut self.interner)?;
                self.collect_signature(concept);
                Ok(())
            }
        }
    }

    pub fn add_statement(&mut self, statement: Statement) {
        match &statement {
            Statement::SubClassOf(axiom) => {
                self.collect_signature(axiom.sub_class);
                self.collect_signature(axiom.super_class);
            }
            Statement::EquivalentClasses(classes) => {
                for &class in classes {
                    self.collect_signature(class);
                }
            }
        }
        self.statements.push(statement);
    }

    pub fn add_sub_class_of(&mut self, sub_class: ConceptId, super_class: ConceptId) {
        self.add_statement(Statement::SubClassOf(Axiom::new(sub_class, super_class)));
    }

    pub fn add_equivalent_classes(&mut self, classes: Vec<ConceptId>) {
        self.add_statement(Statement::EquivalentClasses(classes));
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// All statements decomposed into inclusions
    pub fn inclusions(&self) -> Vec<Axiom> {
        self.statements.iter().flat_map(Statement::inclusions).collect()
    }

    pub fn classes(&self) -> &BTreeSet<ConceptId> {
        &self.classes
    }

    pub fn individuals(&self) -> &BTreeSet<ConceptId> {
        &self.individuals
    }

    pub fn roles(&self) -> &BTreeSet<Symbol> {
        &self.roles
    }

    /// Concept names and nominals of the signature
    pub fn signature(&self) -> impl Iterator<Item = ConceptId> + '_ {
        self.classes.iter().chain(self.individuals.iter()).copied()
    }

    fn collect_signature(&mut self, concept: ConceptId) {
        match self.interner.get(concept) {
            ConceptExpression::Name(_) => {
                self.classes.insert(concept);
            }
            ConceptExpression::Nominal(_) => {
                self.individuals.insert(concept);
            }
            ConceptExpression::Intersection(left, right) => {
                self.collect_signature(left);
                self.collect_signature(right);
            }
            ConceptExpression::Existential(role, filler) => {
                self.roles.insert(role);
                self.collect_signature(filler);
            }
            ConceptExpression::Top | ConceptExpression::Bottom => {}
        }
    }
}
