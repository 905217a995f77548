use std::collections::HashSet;

use crate::grammar::{GrammarTable, NonTerminalRef, SymbolRef, Terminal, TerminalRef, END_MARKER};
use crate::lr::{Action, Column, LrTable, StateId};

/// The outcome of running the recognizer over an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStatus {
    Accepted,
    Rejected,
}

impl ParseStatus {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ParseStatus::Accepted)
    }
}

impl std::fmt::Display for ParseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseStatus::Accepted => write!(f, "accepted"),
            ParseStatus::Rejected => write!(f, "rejected"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Terminal(TerminalRef),
    Eof,
}

impl Token {
    fn column(&self) -> Column {
        match self {
            Token::Terminal(t) => Column::Terminal(*t),
            Token::Eof => Column::Eof,
        }
    }
}

/// A symbol recorded on the parse stack next to its state.
#[derive(Debug, Hash, Clone, Copy, PartialEq, Eq)]
enum StackSymbol {
    Terminal(TerminalRef),
    NonTerminal(NonTerminalRef),
    Eof,
}

impl From<Token> for StackSymbol {
    fn from(token: Token) -> Self {
        match token {
            Token::Terminal(t) => StackSymbol::Terminal(t),
            Token::Eof => StackSymbol::Eof,
        }
    }
}

impl From<SymbolRef> for StackSymbol {
    fn from(symbol: SymbolRef) -> Self {
        match symbol {
            SymbolRef::Terminal(t) => StackSymbol::Terminal(t),
            SymbolRef::NonTerminal(nt) => StackSymbol::NonTerminal(nt),
        }
    }
}

/// Splits whitespace-free input into tokens. Characters accumulate from the
/// cursor until the span is exactly a declared terminal or the end marker.
struct TokenStream<'a> {
    grammar_table: &'a GrammarTable,
    input: String,
    cursor: usize,
}

impl<'a> TokenStream<'a> {
    fn new(grammar_table: &'a GrammarTable, input: &str) -> Self {
        let input = input
            .chars()
            .filter(|c| !c.is_whitespace())
            .chain(END_MARKER.chars())
            .collect();

        Self {
            grammar_table,
            input,
            cursor: 0,
        }
    }

    /// Returns the next token, or `None` if no terminal can be scanned at
    /// the cursor.
    fn next_token(&mut self) -> Option<Token> {
        let rest = self.input.get(self.cursor..)?;

        for (offset, c) in rest.char_indices() {
            let span = &rest[..offset + c.len_utf8()];

            let token = match self.grammar_table.terminal_mapping(&Terminal::new(span)) {
                Some(t) => Token::Terminal(t),
                None if span == END_MARKER => Token::Eof,
                None => continue,
            };

            self.cursor += span.len();
            return Some(token);
        }

        None
    }
}

type StackEntry = (StateId, StackSymbol);

/// Detects a run of reductions between two shifts that can never reach
/// another action. Every entry below the floor, the lowest stack length
/// reached since the last shift, is untouched by the run. With a fixed
/// lookahead the run is deterministic, so it loops forever once the entries
/// above the floor repeat or outnumber the table's states.
struct ReductionGuard {
    states: usize,
    floor: usize,
    seen: HashSet<Vec<StackEntry>>,
}

impl ReductionGuard {
    fn new(states: usize, stack_len: usize) -> Self {
        Self {
            states,
            floor: stack_len,
            seen: HashSet::new(),
        }
    }

    fn reset_mut(&mut self, stack_len: usize) {
        self.floor = stack_len;
        self.seen.clear();
    }

    /// Records the stack after a reduction that popped it down to `lowest`
    /// entries. Returns `false` once the run can not terminate.
    fn record_mut(&mut self, stack: &[StackEntry], lowest: usize) -> bool {
        if lowest < self.floor {
            self.floor = lowest;
            self.seen.clear();
        }

        let above_floor = &stack[self.floor.min(stack.len())..];
        above_floor.len() <= self.states && self.seen.insert(above_floor.to_vec())
    }
}

/// Runs a shift/reduce pushdown automaton driven by an [LrTable].
#[derive(Debug, Clone, Copy)]
pub struct Recognizer<'a> {
    grammar_table: &'a GrammarTable,
    table: &'a LrTable,
}

impl<'a> Recognizer<'a> {
    pub fn new(grammar_table: &'a GrammarTable, table: &'a LrTable) -> Self {
        Self {
            grammar_table,
            table,
        }
    }

    /// Decides whether `input` is a sentence of the grammar. Whitespace
    /// anywhere in the input is ignored and `None` is always rejected.
    pub fn parse<'i, I: Into<Option<&'i str>>>(&self, input: I) -> ParseStatus {
        let status = match input.into() {
            Some(input) => self.run(input),
            None => ParseStatus::Rejected,
        };

        log::debug!("input {}", status);
        status
    }

    fn run(&self, input: &str) -> ParseStatus {
        let mut tokens = TokenStream::new(self.grammar_table, input);
        let mut stack: Vec<StackEntry> = vec![(StateId::unchecked_new(0), StackSymbol::Eof)];

        let mut token = match tokens.next_token() {
            Some(token) => token,
            None => return self.reject("no terminal matches the start of input"),
        };

        let mut guard = ReductionGuard::new(self.table.states(), stack.len());

        loop {
            let state = match stack.last() {
                Some((state, _)) => *state,
                None => return self.reject("stack underflow"),
            };
            let action = self.table.action(state, token.column());

            log::trace!(
                "state {} on `{}`: {}",
                state,
                token
                    .column()
                    .human_readable_format(self.grammar_table),
                action
            );

            match action {
                Action::Shift(next) => {
                    stack.push((next, token.into()));
                    guard.reset_mut(stack.len());

                    token = match tokens.next_token() {
                        Some(token) => token,
                        None => return self.reject("no terminal matches at the cursor"),
                    };
                }
                Action::Reduce(id) => {
                    let production = match self.grammar_table.production(id) {
                        Some(production) => production,
                        None => return self.reject("reduce by unknown production"),
                    };

                    for &expected in production.rhs.iter().rev() {
                        match stack.pop() {
                            Some((_, symbol)) if symbol == StackSymbol::from(expected) => (),
                            _ => return self.reject("stack does not match production body"),
                        }
                    }

                    let lowest = stack.len();
                    let exposed = match stack.last() {
                        Some((state, _)) => *state,
                        None => return self.reject("stack underflow"),
                    };
                    match self
                        .table
                        .action(exposed, Column::NonTerminal(production.lhs))
                    {
                        Action::Goto(next) => {
                            stack.push((next, StackSymbol::NonTerminal(production.lhs)))
                        }
                        _ => return self.reject("no goto after reduce"),
                    }

                    if !guard.record_mut(&stack, lowest) {
                        return self.reject("reductions never reach another action");
                    }
                }
                Action::Accept => return ParseStatus::Accepted,
                Action::Goto(_) | Action::Error => return self.reject("no action"),
            }
        }
    }

    fn reject(&self, reason: &str) -> ParseStatus {
        log::trace!("reject: {}", reason);
        ParseStatus::Rejected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::load_grammar;
    use crate::lr::{LrTableGenerator, Slr1};
    use pretty_assertions::assert_eq;

    const TEST_GRAMMAR: &str = "E T
i + * ( )
E:E+T|T
T:T*i|i
E
";

    #[test]
    fn should_accept_and_reject_toy_grammar_inputs() {
        let grammar_table = load_grammar(TEST_GRAMMAR).unwrap();
        let table = Slr1::generate_table(&grammar_table).unwrap();
        let recognizer = Recognizer::new(&grammar_table, &table);

        let cases = [
            ("i", ParseStatus::Accepted),
            ("i+i*i", ParseStatus::Accepted),
            ("i*i*i+i", ParseStatus::Accepted),
            (" i + i\t* i\n", ParseStatus::Accepted),
            ("i+", ParseStatus::Rejected),
            ("(i)", ParseStatus::Rejected),
            ("", ParseStatus::Rejected),
            ("i i", ParseStatus::Rejected),
            ("i+q", ParseStatus::Rejected),
        ];

        for (input, expected) in cases {
            assert_eq!(expected, recognizer.parse(input), "{:?}", input);
        }
    }

    #[test]
    fn should_reject_missing_input() {
        let grammar_table = load_grammar(TEST_GRAMMAR).unwrap();
        let table = Slr1::generate_table(&grammar_table).unwrap();

        assert_eq!(
            ParseStatus::Rejected,
            Recognizer::new(&grammar_table, &table).parse(None)
        );
    }

    #[test]
    fn should_accept_empty_input_when_start_is_nullable() {
        let grammar_table = load_grammar("S\na b\nS:aSb|\nS\n").unwrap();
        let table = Slr1::generate_table(&grammar_table).unwrap();
        let recognizer = Recognizer::new(&grammar_table, &table);

        assert_eq!(ParseStatus::Accepted, recognizer.parse(""));
        assert_eq!(ParseStatus::Accepted, recognizer.parse("ab"));
        assert_eq!(ParseStatus::Accepted, recognizer.parse("aaabbb"));
        assert_eq!(ParseStatus::Rejected, recognizer.parse("aab"));
        assert_eq!(ParseStatus::Rejected, recognizer.parse("ba"));
    }

    #[test]
    fn should_emit_first_exact_terminal_match() {
        let grammar_table = load_grammar("S\nid i\nS:id|i\nS\n").unwrap();
        let table = Slr1::generate_table(&grammar_table).unwrap();
        let recognizer = Recognizer::new(&grammar_table, &table);

        assert_eq!(ParseStatus::Accepted, recognizer.parse("i"));
        // `i` is matched before `id` can accumulate.
        assert_eq!(ParseStatus::Rejected, recognizer.parse("id"));
    }

    #[test]
    fn should_reject_table_that_reduces_forever() {
        let grammar_table = load_grammar("S\na\nS:\nS\n").unwrap();
        let table = crate::lr::table::deserialize("x r1 0\n", &grammar_table).unwrap();

        assert_eq!(
            ParseStatus::Rejected,
            Recognizer::new(&grammar_table, &table).parse("")
        );
    }

    #[test]
    fn should_accept_long_run_of_epsilon_reductions() {
        let grammar_table = load_grammar("S A\na\nS:AAAAAAAAAAa\nA:\nS\n").unwrap();
        let table = Slr1::generate_table(&grammar_table).unwrap();
        let recognizer = Recognizer::new(&grammar_table, &table);

        assert_eq!(ParseStatus::Accepted, recognizer.parse("a"));
        assert_eq!(ParseStatus::Rejected, recognizer.parse("aa"));
        assert_eq!(ParseStatus::Rejected, recognizer.parse(""));
    }

    #[test]
    fn should_accept_deep_unit_chain() {
        let grammar_table = load_grammar(
            "A B C D E F G H
a
A:B
B:C
C:D
D:E
E:F
F:G
G:H
H:a
A
",
        )
        .unwrap();
        let table = Slr1::generate_table(&grammar_table).unwrap();
        let recognizer = Recognizer::new(&grammar_table, &table);

        assert_eq!(ParseStatus::Accepted, recognizer.parse("a"));
        assert_eq!(ParseStatus::Rejected, recognizer.parse("aa"));
    }

    #[test]
    fn should_reject_table_that_cycles_through_unit_reductions() {
        let grammar_table = load_grammar("S\na\nS:a|S\nS\n").unwrap();
        let table = crate::lr::table::deserialize(
            "d1 x 2
x r1 x
x r2 2
",
            &grammar_table,
        )
        .unwrap();

        assert_eq!(
            ParseStatus::Rejected,
            Recognizer::new(&grammar_table, &table).parse("a")
        );
    }

    #[test]
    fn should_display_status() {
        assert_eq!("accepted", ParseStatus::Accepted.to_string());
        assert_eq!("rejected", ParseStatus::Rejected.to_string());
        assert!(ParseStatus::Accepted.is_accepted());
        assert!(!ParseStatus::Rejected.is_accepted());
    }
}
