use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::{Hash, Hasher};

use indexmap::IndexSet;
use thiserror::Error;

use crate::grammar::{AugmentedGrammar, GrammarTable, ProductionRef, SymbolRef};
use crate::sets::{FollowSets, Lookahead, SymbolSets};

pub mod table;

pub use table::{Action, Column, LrTable, StateId, TableLoadError, TableLoadErrorKind};

/// Markers for the type of error encountered in table generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TableGenErrorKind {
    #[error("state has no recorded transition")]
    MissingTransition,
}

/// Represents errors that can occur in the table generation process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableGenError {
    kind: TableGenErrorKind,
    data: Option<String>,
}

impl TableGenError {
    pub(crate) fn new(kind: TableGenErrorKind) -> Self {
        Self { kind, data: None }
    }

    pub(crate) fn with_data_mut<S: AsRef<str>>(&mut self, data: S) {
        let data = data.as_ref().to_string();

        self.data = Some(data)
    }

    pub(crate) fn with_data<S: AsRef<str>>(mut self, data: S) -> Self {
        self.with_data_mut(data);
        self
    }

    pub fn kind(&self) -> TableGenErrorKind {
        self.kind
    }
}

impl std::fmt::Display for TableGenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.data {
            Some(ctx) => write!(f, "{}: {}", &self.kind, ctx),
            None => write!(f, "{}", &self.kind),
        }
    }
}

impl std::error::Error for TableGenError {}

/// Exposes a trait for generating an LR table from a grammar.
pub(crate) trait LrTableGenerator {
    fn generate_table(grammar_table: &GrammarTable) -> Result<LrTable, TableGenError> {
        let sets = SymbolSets::solve(grammar_table);

        Self::generate_table_with_sets(grammar_table, &sets)
    }

    /// Generates the table from FIRST and FOLLOW sets already solved for
    /// `grammar_table`.
    fn generate_table_with_sets(
        grammar_table: &GrammarTable,
        sets: &SymbolSets,
    ) -> Result<LrTable, TableGenError>;
}

/// A wrapper type for SLR(1) parser tables. States are the canonical LR(0)
/// collection and reduce actions are placed on the FOLLOW set of the
/// production's head rather than on per-item lookaheads, so grammars that
/// need LR(1) lookahead splitting produce overwritten cells instead of an
/// error.
pub(crate) struct Slr1;

impl LrTableGenerator for Slr1 {
    fn generate_table_with_sets(
        grammar_table: &GrammarTable,
        sets: &SymbolSets,
    ) -> Result<LrTable, TableGenError> {
        let augmented = grammar_table.augmented();
        let collection = build_canonical_collection(&augmented);

        log::debug!("canonical collection has {} states", collection.states());
        if log::log_enabled!(log::Level::Trace) {
            log::trace!("{}", collection.human_readable_format(augmented.table()));
        }

        build_table(&augmented, &collection, sets.follow())
    }
}

/// An LR(0) item: a production paired with the index of the body symbol
/// following the dot.
#[derive(Debug, Clone, Copy)]
struct ItemRef<'a> {
    production_idx: usize,
    production: &'a ProductionRef,
    dot_position: usize,
}

impl<'a> ItemRef<'a> {
    fn new(production_idx: usize, production: &'a ProductionRef, dot_position: usize) -> Self {
        Self {
            production_idx,
            production,
            dot_position,
        }
    }

    fn key(&self) -> (usize, usize) {
        (self.production_idx, self.dot_position)
    }

    fn is_completed(&self) -> bool {
        self.dot_position == self.production.rhs.len()
    }

    /// Advances the dot position of a previous ItemRef, returning a new
    /// ItemRef if the position is not the last element in the Item.
    fn advance_dot_position(&self) -> Option<Self> {
        if self.is_completed() {
            None
        } else {
            Some(Self::new(
                self.production_idx,
                self.production,
                self.dot_position + 1,
            ))
        }
    }

    /// Returns `Some(B)` in the production `[ A -> α.Bβ ]`.
    fn symbol_after_dot(&self) -> Option<SymbolRef> {
        self.production.rhs.get(self.dot_position).copied()
    }

    fn human_readable_format(&self, grammar_table: &GrammarTable) -> String {
        let lhs = grammar_table
            .non_terminal(self.production.lhs)
            .map(|nt| nt.to_string())
            .unwrap_or_default();
        let mut rhs = self
            .production
            .rhs
            .iter()
            .filter_map(|&sym| grammar_table.symbol(sym))
            .map(|sym| sym.to_string())
            .collect::<Vec<_>>();
        rhs.insert(self.dot_position.min(rhs.len()), ".".to_string());

        format!("{} -> {}", lhs, rhs.join(" "))
    }
}

impl<'a> PartialEq for ItemRef<'a> {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl<'a> Eq for ItemRef<'a> {}

impl<'a> Hash for ItemRef<'a> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state)
    }
}

/// ItemSet contains an insertion-ordered set of items. Equality and hashing
/// ignore the insertion order.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
struct ItemSet<'a> {
    items: IndexSet<ItemRef<'a>>,
}

impl<'a> ItemSet<'a> {
    fn new(items: Vec<ItemRef<'a>>) -> Self {
        Self {
            items: items.into_iter().collect(),
        }
    }

    fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[allow(unused)]
    fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns every distinct symbol following a dot, in item order.
    fn symbols_after_dot(&self) -> IndexSet<SymbolRef> {
        self.items
            .iter()
            .filter_map(|item| item.symbol_after_dot())
            .collect()
    }

    fn human_readable_format(&self, grammar_table: &GrammarTable) -> String {
        self.items
            .iter()
            .map(|item_ref| format!("{}\n", item_ref.human_readable_format(grammar_table)))
            .collect::<String>()
    }
}

impl<'a> Hash for ItemSet<'a> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let mut keys = self.items.iter().map(ItemRef::key).collect::<Vec<_>>();
        keys.sort_unstable();
        keys.hash(state)
    }
}

impl<'a> FromIterator<ItemRef<'a>> for ItemSet<'a> {
    fn from_iter<T: IntoIterator<Item = ItemRef<'a>>>(iter: T) -> Self {
        let set = iter.into_iter().collect::<Vec<_>>();
        Self::new(set)
    }
}

fn initial_item_set(grammar: &AugmentedGrammar) -> ItemSet<'_> {
    let goal = ItemRef::new(grammar.goal_production_idx(), grammar.goal_production(), 0);

    ItemSet::new(vec![goal])
}

/// Generates the closure of a `ItemSet` using the following algorithm.
///
/// ```ignore
/// Closure(I)
/// repeat
///     for (each item [ A -> α.Bβ ] in I where B is not yet expanded)
///         for (each production B -> γ in G’)
///             add [ B -> .γ ] to set I;
///         mark B expanded;
/// until no more items are added to I;
/// return I;
/// ```
fn closure<'a>(grammar: &'a AugmentedGrammar, i: ItemSet<'a>) -> ItemSet<'a> {
    // if the itemset is empty exit early
    if i.is_empty() {
        return i;
    }

    let mut set = i.items;
    let mut expanded = HashSet::new();

    // items appended during the walk are visited in turn.
    let mut idx = 0;
    while let Some(item) = set.get_index(idx).copied() {
        idx += 1;

        let non_terminal = match item.symbol_after_dot() {
            Some(SymbolRef::NonTerminal(nt)) => nt,
            _ => continue,
        };
        if !expanded.insert(non_terminal) {
            continue;
        }

        for (production_idx, production) in grammar.indexed_productions_with_head(non_terminal) {
            set.insert(ItemRef::new(production_idx, production, 0));
        }
    }

    ItemSet { items: set }
}

/// Generates the goto of an `ItemSet` using the following algorithm.
///
/// ```ignore
/// Goto(I, X)
/// Initialise J to be the empty set;
/// for ( each item [ A -> α.Xβ ] in I )
///     Add item [ A -> αX.β ] to set J;   /* move the dot one step */
/// return Closure(J);    /* apply closure to the set */
/// ```
fn goto<'a>(grammar: &'a AugmentedGrammar, i: &ItemSet<'a>, x: SymbolRef) -> ItemSet<'a> {
    let j = i
        .items
        .iter()
        .filter(|item_ref| item_ref.symbol_after_dot() == Some(x))
        .filter_map(|item| item.advance_dot_position())
        .collect();

    closure(grammar, j)
}

/// Contains the canonical collection of `ItemSet` states ordered by their
/// state id, along with every transition recorded while discovering them.
#[derive(Default, Debug, Clone)]
struct ItemCollection<'a> {
    item_sets: IndexSet<ItemSet<'a>>,
    transitions: HashMap<(StateId, SymbolRef), StateId>,
}

impl<'a> ItemCollection<'a> {
    fn states(&self) -> usize {
        self.item_sets.len()
    }

    /// Inserts a set, returning its state id and `true` if it was not
    /// already in the collection.
    fn insert(&mut self, new_set: ItemSet<'a>) -> (StateId, bool) {
        let (id, inserted) = self.item_sets.insert_full(new_set);

        (StateId::unchecked_new(id), inserted)
    }

    fn transition(&self, from: StateId, symbol: SymbolRef) -> Option<StateId> {
        self.transitions.get(&(from, symbol)).copied()
    }

    /// Prints a human readable representation of a given collection.
    fn human_readable_format(&self, grammar_table: &GrammarTable) -> String {
        self.item_sets
            .iter()
            .enumerate()
            .map(|(id, i)| format!("\nS{}:\n{}", id, &i.human_readable_format(grammar_table)))
            .collect::<String>()
    }
}

/// Constructs a canonical collection from an augmented grammar using the
/// following algorithm.
///
/// ```ignore
/// s0 ← closure ( [S’→.S] )
/// S ← { s0 }
/// W ← [ s0 ]
/// while W is not empty
///     sj ← pop(W)
///     ∀ x after a dot in sj
///         sk ← goto(sj ,x)
///         record sj → sk on x
///         if sk ∉ S then
///             S ← S ∪ sk
///             push(W, sk)
/// ```
fn build_canonical_collection(grammar: &AugmentedGrammar) -> ItemCollection<'_> {
    let mut collection = ItemCollection::default();

    let s0 = closure(grammar, initial_item_set(grammar));
    let (s0_id, _) = collection.insert(s0);
    let mut unexpanded = VecDeque::from([s0_id]);

    while let Some(sj) = unexpanded.pop_front() {
        let successors = match collection.item_sets.get_index(sj.as_usize()) {
            Some(parent_state) => parent_state
                .symbols_after_dot()
                .into_iter()
                .map(|x| (x, goto(grammar, parent_state, x)))
                .collect::<Vec<_>>(),
            None => continue,
        };

        for (x, new_state) in successors {
            let (sk, is_new) = collection.insert(new_state);
            collection.transitions.insert((sj, x), sk);

            if is_new {
                unexpanded.push_back(sk);
            }
        }
    }

    collection
}

/// Constructs action table from a canonical collection.
///
/// ```ignore
/// ∀ set sx ∈ S
///     ∀ item i ∈ sx
///         if i is [S’→S •]
///             then ACTION[x, $] ← “accept”
///         else if i is [A → β •]
///             ∀ a ∈ FOLLOW(A)
///                 ACTION[x, a] ← “reduce A → β”
///         else if i is [A → β • a δ] and goto(sx, a) = sk, a ∈ T
///             then ACTION[x, a] ← “shift k”
///         else if i is [A → β • n δ] and goto(sx, n) = sk, n ∈ NT
///             then GOTO[x, n] ← k
/// ```
fn build_table(
    grammar: &AugmentedGrammar,
    canonical_collection: &ItemCollection<'_>,
    follow_sets: &FollowSets,
) -> Result<LrTable, TableGenError> {
    let grammar_table = grammar.table();
    // the goal nonterminal has no column.
    let non_terminals = grammar_table.non_terminal_count() - 1;
    let mut table = LrTable::new(
        canonical_collection.states(),
        grammar_table.terminal_count(),
        non_terminals,
    );

    for (x, sx) in canonical_collection.item_sets.iter().enumerate() {
        let state = StateId::unchecked_new(x);

        for i in sx.items.iter() {
            match i.symbol_after_dot() {
                None if i.production_idx == grammar.goal_production_idx() => {
                    write_action(&mut table, grammar_table, state, Column::Eof, Action::Accept);
                }
                None => {
                    let reduce = Action::Reduce(i.production.id);

                    for lookahead in follow_sets.follow_of(i.production.lhs) {
                        let column = match lookahead {
                            Lookahead::Terminal(t) => Column::Terminal(t),
                            Lookahead::Eof => Column::Eof,
                            Lookahead::Epsilon => continue,
                        };

                        write_action(&mut table, grammar_table, state, column, reduce);
                    }
                }
                Some(symbol) => {
                    let k = canonical_collection
                        .transition(state, symbol)
                        .ok_or_else(|| {
                            TableGenError::new(TableGenErrorKind::MissingTransition)
                                .with_data(format!("S{} on {}", state, symbol))
                        })?;

                    let (column, action) = match symbol {
                        SymbolRef::Terminal(t) => (Column::Terminal(t), Action::Shift(k)),
                        SymbolRef::NonTerminal(n) => (Column::NonTerminal(n), Action::Goto(k)),
                    };

                    write_action(&mut table, grammar_table, state, column, action);
                }
            }
        }
    }

    Ok(table)
}

/// Writes a cell, the last write winning when two different actions land in
/// the same cell.
fn write_action(
    table: &mut LrTable,
    grammar_table: &GrammarTable,
    state: StateId,
    column: Column,
    action: Action,
) {
    match table.set_action_mut(state, column, action) {
        Some(previous) if previous != Action::Error && previous != action => {
            log::warn!(
                "conflict in state {} on `{}`: {} replaced by {}",
                state,
                column.human_readable_format(grammar_table),
                previous,
                action
            );
        }
        _ => (),
    }
}
