use std::collections::VecDeque;

use indexmap::IndexSet;

use crate::grammar::{GrammarTable, NonTerminalRef, SymbolRef, TerminalRef, END_MARKER};

/// An element of a FIRST or FOLLOW set.
#[derive(Debug, Hash, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Lookahead {
    Terminal(TerminalRef),
    /// The empty derivation. Only ever found in FIRST sets.
    Epsilon,
    /// The end-of-input marker. Only ever found in FOLLOW sets.
    Eof,
}

impl Lookahead {
    pub fn human_readable_format(&self, grammar_table: &GrammarTable) -> String {
        match self {
            Lookahead::Terminal(t) => grammar_table
                .terminal(*t)
                .map(|t| t.to_string())
                .unwrap_or_else(|| t.to_string()),
            Lookahead::Epsilon => "ε".to_string(),
            Lookahead::Eof => END_MARKER.to_string(),
        }
    }
}

impl From<TerminalRef> for Lookahead {
    fn from(terminal: TerminalRef) -> Self {
        Lookahead::Terminal(terminal)
    }
}

pub type LookaheadSet = IndexSet<Lookahead>;

/// A mapping of non-terminal symbols to a set of lookaheads, indexed by
/// [NonTerminalRef].
#[derive(Debug, Clone, PartialEq, Eq)]
struct SymbolRefSet {
    sets: Vec<LookaheadSet>,
}

impl SymbolRefSet {
    fn new(non_terminals: usize) -> Self {
        Self {
            sets: vec![LookaheadSet::new(); non_terminals],
        }
    }

    fn get(&self, key: NonTerminalRef) -> Option<&LookaheadSet> {
        self.sets.get(key.as_usize())
    }

    fn human_readable_format(&self, grammar_table: &GrammarTable) -> String {
        let lines = grammar_table
            .non_terminals()
            .zip(self.sets.iter())
            .map(|(nonterm, lookaheads)| {
                let rhs = lookaheads
                    .iter()
                    .map(|lookahead| lookahead.human_readable_format(grammar_table))
                    .collect::<Vec<_>>();

                format!("{}: {}", nonterm, rhs.join(", "))
            })
            .collect::<Vec<_>>();

        lines.join("\n")
    }
}

/// FIRST sets for every nonterminal of a grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirstSets(SymbolRefSet);

impl FirstSets {
    /// Solves FIRST for every nonterminal. A single pass handles
    /// non-recursive productions before the productions that mention their
    /// own head, with visiting/finished guards breaking recursion. Passes are
    /// repeated, each seeded with its predecessor's sets, until none grow.
    pub fn solve(grammar_table: &GrammarTable) -> Self {
        let mut sets = SymbolRefSet::new(grammar_table.non_terminal_count());
        let mut passes = 0;

        loop {
            passes += 1;
            let mut solver = FirstSolver::new(grammar_table, sets.clone());
            for non_terminal in grammar_table.non_terminal_refs() {
                solver.solve_non_terminal(non_terminal);
            }

            if solver.sets == sets {
                break;
            }
            sets = solver.sets;
        }

        log::debug!("FIRST sets converged after {} passes", passes);
        Self(sets)
    }

    pub fn get(&self, non_terminal: NonTerminalRef) -> Option<&LookaheadSet> {
        self.0.get(non_terminal)
    }

    /// FIRST of a single symbol. A terminal is its own FIRST set.
    pub fn first_of_symbol(&self, symbol: SymbolRef) -> LookaheadSet {
        match symbol {
            SymbolRef::Terminal(t) => [Lookahead::Terminal(t)].into_iter().collect(),
            SymbolRef::NonTerminal(nt) => self.get(nt).cloned().unwrap_or_default(),
        }
    }

    /// FIRST of a symbol sequence. Contains [Lookahead::Epsilon] only when
    /// every symbol of the sequence is nullable, including the empty sequence.
    pub fn first_of_sequence(&self, symbols: &[SymbolRef]) -> LookaheadSet {
        first_of_sequence_with(symbols, |symbol| self.first_of_symbol(symbol))
    }

    pub fn human_readable_format(&self, grammar_table: &GrammarTable) -> String {
        self.0.human_readable_format(grammar_table)
    }
}

fn first_of_sequence_with<F>(symbols: &[SymbolRef], mut first_of_symbol: F) -> LookaheadSet
where
    F: FnMut(SymbolRef) -> LookaheadSet,
{
    let mut first = LookaheadSet::new();

    for &symbol in symbols {
        let symbol_first = first_of_symbol(symbol);
        let nullable = symbol_first.contains(&Lookahead::Epsilon);
        first.extend(
            symbol_first
                .into_iter()
                .filter(|lookahead| *lookahead != Lookahead::Epsilon),
        );

        if !nullable {
            return first;
        }
    }

    first.insert(Lookahead::Epsilon);
    first
}

struct FirstSolver<'a> {
    grammar_table: &'a GrammarTable,
    sets: SymbolRefSet,
    visiting: Vec<bool>,
    finished: Vec<bool>,
}

impl<'a> FirstSolver<'a> {
    fn new(grammar_table: &'a GrammarTable, seed: SymbolRefSet) -> Self {
        let non_terminals = grammar_table.non_terminal_count();

        Self {
            grammar_table,
            sets: seed,
            visiting: vec![false; non_terminals],
            finished: vec![false; non_terminals],
        }
    }

    fn solve_non_terminal(&mut self, x: NonTerminalRef) -> LookaheadSet {
        let idx = x.as_usize();
        if self.finished[idx] || self.visiting[idx] {
            // either final, or the partial result that breaks a cycle.
            return self.sets.sets[idx].clone();
        }
        self.visiting[idx] = true;

        let grammar_table = self.grammar_table;
        let x_symbol = SymbolRef::NonTerminal(x);
        let (recursive, direct): (Vec<_>, Vec<_>) = grammar_table
            .productions_with_head(x)
            .partition(|production| production.contains(x_symbol));

        let mut first = self.sets.sets[idx].clone();
        for production in direct {
            let body_first = self.first_of_sequence(&production.rhs);
            first.extend(body_first);
        }
        self.sets.sets[idx] = first.clone();
        self.finished[idx] = true;

        for production in recursive {
            let pos = match production.rhs.iter().position(|&sym| sym == x_symbol) {
                Some(pos) => pos,
                None => continue,
            };
            let (prefix, suffix) = (&production.rhs[..pos], &production.rhs[pos + 1..]);

            let prefix_first = self.first_of_sequence(prefix);
            let prefix_nullable = prefix_first.contains(&Lookahead::Epsilon);
            first.extend(
                prefix_first
                    .into_iter()
                    .filter(|lookahead| *lookahead != Lookahead::Epsilon),
            );

            // the suffix is only reachable through a nullable X.
            if prefix_nullable && !suffix.is_empty() && first.contains(&Lookahead::Epsilon) {
                let suffix_first = self.first_of_sequence(suffix);
                first.extend(suffix_first);
            }
            self.sets.sets[idx] = first.clone();
        }

        self.visiting[idx] = false;
        first
    }

    fn first_of_sequence(&mut self, symbols: &[SymbolRef]) -> LookaheadSet {
        first_of_sequence_with(symbols, |symbol| match symbol {
            SymbolRef::Terminal(t) => [Lookahead::Terminal(t)].into_iter().collect(),
            SymbolRef::NonTerminal(nt) => self.solve_non_terminal(nt),
        })
    }
}

/// FOLLOW sets for every nonterminal of a grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowSets(SymbolRefSet);

impl FollowSets {
    /// Solves FOLLOW with a worklist fixpoint using the following algorithm.
    ///
    /// ```ignore
    /// FOLLOW(S) ← { $ }
    /// W ← all nonterminals
    /// while W is not empty
    ///     X ← pop(W)
    ///     for (each production A → αXβ)
    ///         add FIRST(β) - { ε } to FOLLOW(X)
    ///         if ε ∈ FIRST(β) and A ≠ X
    ///             add FOLLOW(A) to FOLLOW(X)
    ///     if FOLLOW(X) grew
    ///         for (each production X → γBδ where ε ∈ FIRST(δ))
    ///             push(W, B)
    /// ```
    pub fn solve(grammar_table: &GrammarTable, first_sets: &FirstSets) -> Self {
        let non_terminals = grammar_table.non_terminal_count();
        let mut sets = SymbolRefSet::new(non_terminals);
        sets.sets[grammar_table.start().as_usize()].insert(Lookahead::Eof);

        let mut worklist = grammar_table.non_terminal_refs().collect::<VecDeque<_>>();
        let mut queued = vec![true; non_terminals];
        let mut steps = 0;

        while let Some(x) = worklist.pop_front() {
            steps += 1;
            let idx = x.as_usize();
            queued[idx] = false;

            let x_symbol = SymbolRef::NonTerminal(x);
            let mut follow = sets.sets[idx].clone();
            for production in grammar_table.productions_containing(x_symbol) {
                let occurrences = production
                    .rhs
                    .iter()
                    .enumerate()
                    .filter(|(_, &sym)| sym == x_symbol)
                    .map(|(pos, _)| pos);

                for pos in occurrences {
                    let rest_first = first_sets.first_of_sequence(&production.rhs[pos + 1..]);
                    follow.extend(
                        rest_first
                            .iter()
                            .filter(|lookahead| **lookahead != Lookahead::Epsilon)
                            .copied(),
                    );

                    if rest_first.contains(&Lookahead::Epsilon) && production.lhs != x {
                        follow.extend(sets.sets[production.lhs.as_usize()].iter().copied());
                    }
                }
            }

            if follow.len() == sets.sets[idx].len() {
                continue;
            }
            sets.sets[idx] = follow;

            // anything at a nullable tail of an X-production inherits FOLLOW(X).
            for production in grammar_table.productions_with_head(x) {
                for (pos, sym) in production.rhs.iter().enumerate() {
                    let dependent = match sym {
                        SymbolRef::NonTerminal(b) if *b != x => *b,
                        _ => continue,
                    };
                    let tail_nullable = first_sets
                        .first_of_sequence(&production.rhs[pos + 1..])
                        .contains(&Lookahead::Epsilon);

                    if tail_nullable && !queued[dependent.as_usize()] {
                        queued[dependent.as_usize()] = true;
                        worklist.push_back(dependent);
                    }
                }
            }
        }

        log::debug!("FOLLOW sets converged after {} worklist steps", steps);
        Self(sets)
    }

    pub fn get(&self, non_terminal: NonTerminalRef) -> Option<&LookaheadSet> {
        self.0.get(non_terminal)
    }

    /// FOLLOW of a nonterminal, empty for a nonterminal unknown to the
    /// solved grammar.
    pub fn follow_of(&self, non_terminal: NonTerminalRef) -> LookaheadSet {
        self.get(non_terminal).cloned().unwrap_or_default()
    }

    pub fn human_readable_format(&self, grammar_table: &GrammarTable) -> String {
        self.0.human_readable_format(grammar_table)
    }
}

/// Both FIRST and FOLLOW sets of a single grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolSets {
    first: FirstSets,
    follow: FollowSets,
}

impl SymbolSets {
    pub fn solve(grammar_table: &GrammarTable) -> Self {
        let first = FirstSets::solve(grammar_table);
        let follow = FollowSets::solve(grammar_table, &first);

        Self { first, follow }
    }

    pub fn first(&self) -> &FirstSets {
        &self.first
    }

    pub fn follow(&self) -> &FollowSets {
        &self.follow
    }

    pub fn human_readable_format(&self, grammar_table: &GrammarTable) -> String {
        format!(
            "FIRST\n{}\n\nFOLLOW\n{}",
            self.first.human_readable_format(grammar_table),
            self.follow.human_readable_format(grammar_table)
        )
    }
}
