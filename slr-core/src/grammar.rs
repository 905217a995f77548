use indexmap::IndexSet;
use thiserror::Error;

/// The textual end-of-input marker appended to every parsed input.
pub const END_MARKER: &str = "$";

/// A wrapper type for nonterminals borrowed from the grammar table.
#[derive(Debug, Hash, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct NonTerminal<'a>(&'a str);

impl<'a> NonTerminal<'a> {
    pub fn new(non_terminal: &'a str) -> Self {
        Self(non_terminal)
    }
}

impl<'a> AsRef<str> for NonTerminal<'a> {
    fn as_ref(&self) -> &str {
        self.0
    }
}

impl<'a> From<&'a str> for NonTerminal<'a> {
    fn from(val: &'a str) -> Self {
        Self::new(val)
    }
}

impl<'a> std::fmt::Display for NonTerminal<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", &self.0)
    }
}

/// A wrapper type for terminals borrowed from the grammar table.
#[derive(Debug, Hash, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Terminal<'a>(&'a str);

impl<'a> Terminal<'a> {
    pub fn new(terminal: &'a str) -> Self {
        Self(terminal)
    }
}

impl<'a> AsRef<str> for Terminal<'a> {
    fn as_ref(&self) -> &str {
        self.0
    }
}

impl<'a> From<&'a str> for Terminal<'a> {
    fn from(val: &'a str) -> Self {
        Self::new(val)
    }
}

impl<'a> std::fmt::Display for Terminal<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", &self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol<'a> {
    NonTerminal(NonTerminal<'a>),
    Terminal(Terminal<'a>),
}

impl<'a> std::fmt::Display for Symbol<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Symbol::NonTerminal(nt) => write!(f, "{}", nt),
            Symbol::Terminal(t) => write!(f, "{}", t),
        }
    }
}

/// A wrapper type for nonterminals that reference the grammar table.
#[derive(Debug, Hash, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct NonTerminalRef(usize);

impl NonTerminalRef {
    pub(crate) fn new(non_terminal: usize) -> Self {
        Self(non_terminal)
    }

    pub fn as_usize(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for NonTerminalRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // 1-indexed in human-readable format, 0-indexed internally.
        write!(f, "N{}", &self.0 + 1)
    }
}

/// A wrapper type for terminals that reference the grammar table.
#[derive(Debug, Hash, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TerminalRef(usize);

impl TerminalRef {
    pub(crate) fn new(terminal: usize) -> Self {
        Self(terminal)
    }

    pub fn as_usize(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for TerminalRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "T{}", &self.0 + 1)
    }
}

#[derive(Debug, Hash, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SymbolRef {
    NonTerminal(NonTerminalRef),
    Terminal(TerminalRef),
}

impl std::fmt::Display for SymbolRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SymbolRef::NonTerminal(id) => write!(f, "{}", id),
            SymbolRef::Terminal(id) => write!(f, "{}", id),
        }
    }
}

/// The ordinal of a production, assigned in file order starting at 1. The
/// augmented goal production is the only production numbered 0.
#[derive(Debug, Hash, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ProductionId(usize);

impl ProductionId {
    /// Instantiates a new [ProductionId] from a reference id.
    ///
    /// # Safety
    ///
    /// Caller guarantees that the id usize corresponds to a valid production
    /// id in the corresponding grammar.
    pub fn unchecked_new(id: usize) -> Self {
        ProductionId(id)
    }

    pub fn as_usize(&self) -> usize {
        self.0
    }
}

impl From<ProductionId> for usize {
    fn from(value: ProductionId) -> Self {
        value.as_usize()
    }
}

impl std::fmt::Display for ProductionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Hash, Clone, PartialEq, Eq)]
pub struct ProductionRef {
    pub id: ProductionId,
    pub lhs: NonTerminalRef,
    pub rhs: Vec<SymbolRef>,
}

impl ProductionRef {
    pub(crate) fn new(id: ProductionId, lhs: NonTerminalRef, rhs: Vec<SymbolRef>) -> Self {
        Self { id, lhs, rhs }
    }

    pub fn rhs_len(&self) -> usize {
        self.rhs.len()
    }

    /// An epsilon production derives the empty string directly.
    pub fn is_epsilon(&self) -> bool {
        self.rhs.is_empty()
    }

    /// Returns `true` if `symbol` occurs anywhere in the body.
    pub fn contains(&self, symbol: SymbolRef) -> bool {
        self.rhs.contains(&symbol)
    }
}

impl std::fmt::Display for ProductionRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rhs = self
            .rhs
            .iter()
            .map(|sot| sot.to_string())
            .collect::<Vec<_>>()
            .join(" ");

        write!(f, "{}. {} ::= {}", self.id, self.lhs, rhs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarTable {
    non_terminals: IndexSet<String>,
    terminals: IndexSet<String>,
    productions: Vec<ProductionRef>,
    start: NonTerminalRef,
}

impl GrammarTable {
    /// Declares the symbol sets and the start symbol of a grammar with no
    /// productions. Declaration order is preserved and fixes both the
    /// iteration order and the column layout of generated tables.
    pub fn new<N, T, S>(
        non_terminals: N,
        terminals: T,
        start: &str,
    ) -> Result<Self, GrammarLoadError>
    where
        N: IntoIterator<Item = S>,
        T: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let non_terminals = collect_names(non_terminals);
        let terminals = collect_names(terminals);

        let start = non_terminals
            .get_index_of(start.trim())
            .map(NonTerminalRef::new)
            .ok_or_else(|| {
                GrammarLoadError::new(GrammarLoadErrorKind::UndeclaredSymbol)
                    .with_data(format!("start symbol `{}`", start.trim()))
            })?;

        Ok(Self {
            non_terminals,
            terminals,
            productions: vec![],
            start,
        })
    }

    /// Tokenizes `body` against the declared symbols and appends the
    /// production `head -> body`, returning its id.
    pub fn define_production_mut<S: AsRef<str>>(
        &mut self,
        head: &str,
        body: S,
    ) -> Result<ProductionId, GrammarLoadError> {
        let lhs = self
            .non_terminal_mapping(&NonTerminal::new(head.trim()))
            .ok_or_else(|| {
                GrammarLoadError::new(GrammarLoadErrorKind::UndeclaredSymbol)
                    .with_data(format!("production head `{}`", head.trim()))
            })?;
        let rhs = self.tokenize_body(body.as_ref())?;

        let id = ProductionId::unchecked_new(self.productions.len() + 1);
        self.productions.push(ProductionRef::new(id, lhs, rhs));

        Ok(id)
    }

    /// Splits an undelimited production body into symbols. At each cursor
    /// position a terminal starting exactly there is preferred, then a
    /// nonterminal. Whitespace between symbols is skipped.
    fn tokenize_body(&self, body: &str) -> Result<Vec<SymbolRef>, GrammarLoadError> {
        let mut symbols = vec![];
        let mut cursor = 0;

        loop {
            let rest = &body[cursor..];
            let trimmed = rest.trim_start();
            cursor += rest.len() - trimmed.len();
            if trimmed.is_empty() {
                break;
            }

            let terminal_at_cursor = self
                .earliest_terminal(body, cursor)
                .filter(|(_, offset)| *offset == cursor)
                .and_then(|(terminal, _)| {
                    self.terminal_mapping(&terminal)
                        .map(|t| (SymbolRef::Terminal(t), terminal.as_ref().len()))
                });
            let symbol_at_cursor = terminal_at_cursor.or_else(|| {
                self.earliest_nonterminal(body, cursor)
                    .filter(|(_, offset)| *offset == cursor)
                    .and_then(|(nt, _)| {
                        self.non_terminal_mapping(&nt)
                            .map(|n| (SymbolRef::NonTerminal(n), nt.as_ref().len()))
                    })
            });

            let (symbol, len) = symbol_at_cursor.ok_or_else(|| {
                GrammarLoadError::new(GrammarLoadErrorKind::InvalidProduction)
                    .with_data(format!("no declared symbol at `{}`", trimmed))
            })?;

            symbols.push(symbol);
            cursor += len;
        }

        Ok(symbols)
    }

    /// Locates the declared terminal with the smallest start offset at or
    /// after `from` in `text`. Ties go to the earliest declared terminal.
    pub fn earliest_terminal(&self, text: &str, from: usize) -> Option<(Terminal<'_>, usize)> {
        earliest_match(&self.terminals, text, from).map(|(name, offset)| (Terminal(name), offset))
    }

    /// Locates the declared nonterminal with the smallest start offset at or
    /// after `from` in `text`. Ties go to the earliest declared nonterminal.
    pub fn earliest_nonterminal(
        &self,
        text: &str,
        from: usize,
    ) -> Option<(NonTerminal<'_>, usize)> {
        earliest_match(&self.non_terminals, text, from)
            .map(|(name, offset)| (NonTerminal(name), offset))
    }

    pub fn start(&self) -> NonTerminalRef {
        self.start
    }

    pub fn non_terminals(&self) -> impl Iterator<Item = NonTerminal<'_>> {
        self.non_terminals.iter().map(|nt| NonTerminal(nt))
    }

    pub fn terminals(&self) -> impl Iterator<Item = Terminal<'_>> {
        self.terminals.iter().map(|t| Terminal(t))
    }

    pub fn non_terminal_refs(&self) -> impl Iterator<Item = NonTerminalRef> {
        (0..self.non_terminals.len()).map(NonTerminalRef::new)
    }

    pub fn terminal_refs(&self) -> impl Iterator<Item = TerminalRef> {
        (0..self.terminals.len()).map(TerminalRef::new)
    }

    pub fn non_terminal_count(&self) -> usize {
        self.non_terminals.len()
    }

    pub fn terminal_count(&self) -> usize {
        self.terminals.len()
    }

    pub fn non_terminal_mapping(&self, non_terminal: &NonTerminal) -> Option<NonTerminalRef> {
        self.non_terminals
            .get_index_of(non_terminal.0)
            .map(NonTerminalRef::new)
    }

    pub fn terminal_mapping(&self, terminal: &Terminal) -> Option<TerminalRef> {
        self.terminals.get_index_of(terminal.0).map(TerminalRef::new)
    }

    pub fn non_terminal(&self, non_terminal: NonTerminalRef) -> Option<NonTerminal<'_>> {
        self.non_terminals
            .get_index(non_terminal.as_usize())
            .map(|nt| NonTerminal(nt))
    }

    pub fn terminal(&self, terminal: TerminalRef) -> Option<Terminal<'_>> {
        self.terminals.get_index(terminal.as_usize()).map(|t| Terminal(t))
    }

    pub fn symbol(&self, symbol: SymbolRef) -> Option<Symbol<'_>> {
        match symbol {
            SymbolRef::NonTerminal(nt) => self.non_terminal(nt).map(Symbol::NonTerminal),
            SymbolRef::Terminal(t) => self.terminal(t).map(Symbol::Terminal),
        }
    }

    pub fn productions(&self) -> impl Iterator<Item = &ProductionRef> {
        self.productions.iter()
    }

    pub fn production_count(&self) -> usize {
        self.productions.len()
    }

    pub fn production(&self, id: ProductionId) -> Option<&ProductionRef> {
        self.productions.iter().find(|production| production.id == id)
    }

    /// All productions whose head is `non_terminal`, in file order.
    pub fn productions_with_head(
        &self,
        non_terminal: NonTerminalRef,
    ) -> impl Iterator<Item = &ProductionRef> {
        self.productions
            .iter()
            .filter(move |production| production.lhs == non_terminal)
    }

    /// All productions whose body mentions `symbol`, in file order.
    pub fn productions_containing(
        &self,
        symbol: SymbolRef,
    ) -> impl Iterator<Item = &ProductionRef> {
        self.productions
            .iter()
            .filter(move |production| production.contains(symbol))
    }

    /// Formats a production with symbol names, e.g. `E -> E + T`.
    pub fn human_readable_production(&self, production: &ProductionRef) -> String {
        let lhs = self
            .non_terminal(production.lhs)
            .map(|nt| nt.to_string())
            .unwrap_or_default();
        let rhs = if production.is_epsilon() {
            "ε".to_string()
        } else {
            production
                .rhs
                .iter()
                .filter_map(|&sym| self.symbol(sym))
                .map(|sym| sym.to_string())
                .collect::<Vec<_>>()
                .join(" ")
        };

        format!("{} -> {}", lhs, rhs)
    }

    /// Returns a copy of the grammar extended with a fresh goal nonterminal
    /// and the production `goal -> start`. The receiver is left untouched.
    pub fn augmented(&self) -> AugmentedGrammar {
        let start_name = self
            .non_terminal(self.start)
            .map(|nt| nt.to_string())
            .unwrap_or_default();

        let mut goal_name = format!("{}'", start_name);
        while self.non_terminals.contains(&goal_name) || self.terminals.contains(&goal_name) {
            goal_name.push('\'');
        }

        let mut table = self.clone();
        let (goal_idx, _) = table.non_terminals.insert_full(goal_name);
        let goal = NonTerminalRef::new(goal_idx);

        let goal_production = table.productions.len();
        table.productions.push(ProductionRef::new(
            ProductionId::unchecked_new(0),
            goal,
            vec![SymbolRef::NonTerminal(self.start)],
        ));

        AugmentedGrammar {
            table,
            goal,
            goal_production,
        }
    }
}

impl std::str::FromStr for GrammarTable {
    type Err = GrammarLoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        load_grammar(s)
    }
}

impl std::fmt::Display for GrammarTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let header = "Grammar Table
-------------";

        let non_terminals = self
            .non_terminals()
            .enumerate()
            .map(|(id, nt)| format!("{}. '{}'\n", id + 1, nt))
            .collect::<String>();
        let terminals = self
            .terminals()
            .enumerate()
            .map(|(id, t)| format!("{}. '{}'\n", id + 1, t))
            .collect::<String>();
        let productions = self
            .productions
            .iter()
            .map(|production| {
                format!(
                    "{}. {}\n",
                    production.id,
                    self.human_readable_production(production)
                )
            })
            .collect::<String>();
        let start = self
            .non_terminal(self.start)
            .map(|nt| nt.to_string())
            .unwrap_or_default();

        write!(
            f,
            "{}\nNONTERMINALS\n{}\nTERMINALS\n{}\nPRODUCTIONS\n{}\nSTART\n{}\n",
            header, non_terminals, terminals, productions, start
        )
    }
}

/// A grammar extended with a goal production for automaton construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AugmentedGrammar {
    table: GrammarTable,
    goal: NonTerminalRef,
    goal_production: usize,
}

impl AugmentedGrammar {
    pub fn table(&self) -> &GrammarTable {
        &self.table
    }

    /// The fresh nonterminal heading the goal production.
    pub fn goal(&self) -> NonTerminalRef {
        self.goal
    }

    /// The production `goal -> start`.
    pub fn goal_production(&self) -> &ProductionRef {
        &self.table.productions[self.goal_production]
    }

    pub(crate) fn goal_production_idx(&self) -> usize {
        self.goal_production
    }

    /// All productions headed by `non_terminal` paired with their position
    /// in the augmented production list.
    pub(crate) fn indexed_productions_with_head(
        &self,
        non_terminal: NonTerminalRef,
    ) -> impl Iterator<Item = (usize, &ProductionRef)> {
        self.table
            .productions
            .iter()
            .enumerate()
            .filter(move |(_, production)| production.lhs == non_terminal)
    }
}

fn collect_names<I, S>(names: I) -> IndexSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names
        .into_iter()
        .map(|name| name.as_ref().trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

fn earliest_match<'a>(
    names: &'a IndexSet<String>,
    text: &str,
    from: usize,
) -> Option<(&'a str, usize)> {
    let haystack = text.get(from..)?;

    names
        .iter()
        .filter_map(|name| {
            haystack
                .find(name.as_str())
                .map(|offset| (name.as_str(), from + offset))
        })
        // only a strictly smaller offset displaces an earlier declared name.
        .fold(None, |best, (name, offset)| match best {
            Some((_, best_offset)) if best_offset <= offset => best,
            _ => Some((name, offset)),
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GrammarLoadErrorKind {
    #[error("grammar does not declare its nonterminals")]
    MissingNonTerminals,
    #[error("grammar does not declare its terminals")]
    MissingTerminals,
    #[error("grammar does not end with a start symbol")]
    MissingStartSymbol,
    #[error("symbol is not a declared nonterminal")]
    UndeclaredSymbol,
    #[error("production body cannot be split into declared symbols")]
    InvalidProduction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarLoadError {
    kind: GrammarLoadErrorKind,
    data: Option<String>,
}

impl GrammarLoadError {
    pub fn new(kind: GrammarLoadErrorKind) -> Self {
        Self { kind, data: None }
    }

    pub fn with_data_mut(&mut self, data: String) {
        self.data = Some(data)
    }

    pub fn with_data(mut self, data: String) -> Self {
        self.with_data_mut(data);
        self
    }

    pub fn kind(&self) -> GrammarLoadErrorKind {
        self.kind
    }

    fn at_line(self, lineno: usize) -> Self {
        match self.data {
            Some(data) => {
                let line_annotated_data = format!("lineno {}: {}", lineno, data);
                GrammarLoadError::new(self.kind).with_data(line_annotated_data)
            }
            None => GrammarLoadError::new(self.kind).with_data(format!("lineno {}", lineno)),
        }
    }
}

impl std::fmt::Display for GrammarLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.data {
            Some(ctx) => write!(f, "{}: {}", &self.kind, ctx),
            None => write!(f, "{}", &self.kind),
        }
    }
}

impl std::error::Error for GrammarLoadError {}

/// Loads a grammar from its source text.
///
/// ```text
/// E T                 <- nonterminals
/// i + * ( )           <- terminals
/// E:E+T|T             <- productions, `|` separates alternatives
/// T:T*i|i
/// E                   <- start symbol
/// ```
///
/// Blank lines are ignored and an empty alternative is an epsilon
/// production.
pub fn load_grammar<S: AsRef<str>>(input: S) -> Result<GrammarTable, GrammarLoadError> {
    let mut lines = input
        .as_ref()
        .lines()
        .enumerate()
        .map(|(lineno, line)| (lineno + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty());

    let (_, non_terminals) = lines
        .next()
        .ok_or_else(|| GrammarLoadError::new(GrammarLoadErrorKind::MissingNonTerminals))?;
    let (_, terminals) = lines
        .next()
        .ok_or_else(|| GrammarLoadError::new(GrammarLoadErrorKind::MissingTerminals))?;

    let mut production_lines = vec![];
    let mut start = None;
    for (lineno, line) in lines {
        match line.split_once(':') {
            Some((head, bodies)) => production_lines.push((lineno, head, bodies)),
            None => {
                start = Some((lineno, line));
                break;
            }
        }
    }

    let (start_lineno, start) =
        start.ok_or_else(|| GrammarLoadError::new(GrammarLoadErrorKind::MissingStartSymbol))?;
    let mut grammar_table = GrammarTable::new(
        non_terminals.split_whitespace(),
        terminals.split_whitespace(),
        start,
    )
    .map_err(|e| e.at_line(start_lineno))?;

    for (lineno, head, bodies) in production_lines {
        for body in bodies.split('|') {
            grammar_table
                .define_production_mut(head, body.trim())
                .map_err(|e| e.at_line(lineno))?;
        }
    }

    log::debug!(
        "loaded grammar with {} nonterminals, {} terminals and {} productions",
        grammar_table.non_terminal_count(),
        grammar_table.terminal_count(),
        grammar_table.production_count()
    );

    Ok(grammar_table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TEST_GRAMMAR: &str = "E T
i + * ( )
E:E+T|T
T:T*i|i
E
";

    fn body_names(grammar_table: &GrammarTable, production: &ProductionRef) -> Vec<String> {
        production
            .rhs
            .iter()
            .filter_map(|&sym| grammar_table.symbol(sym))
            .map(|sym| sym.to_string())
            .collect()
    }

    #[test]
    fn should_parse_table_with_valid_test_grammar() {
        let grammar_table = load_grammar(TEST_GRAMMAR).unwrap();

        assert_eq!(2, grammar_table.non_terminal_count());
        assert_eq!(5, grammar_table.terminal_count());
        assert_eq!(4, grammar_table.production_count());
        assert_eq!(
            Some(NonTerminal::new("E")),
            grammar_table.non_terminal(grammar_table.start())
        );
    }

    #[test]
    fn should_assign_production_ids_in_file_order() {
        let grammar_table = load_grammar(TEST_GRAMMAR).unwrap();

        let got = grammar_table
            .productions()
            .map(|production| {
                (
                    production.id.as_usize(),
                    grammar_table.human_readable_production(production),
                )
            })
            .collect::<Vec<_>>();

        assert_eq!(
            vec![
                (1, "E -> E + T".to_string()),
                (2, "E -> T".to_string()),
                (3, "T -> T * i".to_string()),
                (4, "T -> i".to_string()),
            ],
            got
        );
    }

    #[test]
    fn should_iterate_symbols_in_declaration_order() {
        let grammar_table = load_grammar(TEST_GRAMMAR).unwrap();

        let non_terminals = grammar_table
            .non_terminals()
            .map(|nt| nt.to_string())
            .collect::<Vec<_>>();
        let terminals = grammar_table
            .terminals()
            .map(|t| t.to_string())
            .collect::<Vec<_>>();

        assert_eq!(vec!["E", "T"], non_terminals);
        assert_eq!(vec!["i", "+", "*", "(", ")"], terminals);
    }

    #[test]
    fn should_treat_empty_alternative_as_epsilon() {
        let grammar_table = load_grammar("S\na b\nS:aSb|\nS\n").unwrap();

        let epsilon_productions = grammar_table
            .productions()
            .filter(|production| production.is_epsilon())
            .map(|production| production.id.as_usize())
            .collect::<Vec<_>>();

        assert_eq!(vec![2], epsilon_productions);
    }

    #[test]
    fn should_skip_whitespace_between_body_symbols() {
        let grammar_table = load_grammar("E T\ni +\nE: E + T | T\nT: i\nE").unwrap();
        let first = grammar_table.productions().next().unwrap();

        assert_eq!(vec!["E", "+", "T"], body_names(&grammar_table, first));
    }

    #[test]
    fn should_locate_earliest_symbols_from_offset() {
        let grammar_table = load_grammar(TEST_GRAMMAR).unwrap();

        assert_eq!(
            Some((Terminal::new("+"), 1)),
            grammar_table.earliest_terminal("E+T", 0)
        );
        assert_eq!(
            Some((NonTerminal::new("T"), 2)),
            grammar_table.earliest_nonterminal("E+T", 1)
        );
        assert_eq!(None, grammar_table.earliest_terminal("E+T", 2));
        assert_eq!(None, grammar_table.earliest_nonterminal("E+T", 3));
    }

    #[test]
    fn should_break_scan_ties_by_declaration_order() {
        let grammar_table = load_grammar("S\nid i d\nS:id\nS").unwrap();

        assert_eq!(
            Some((Terminal::new("id"), 0)),
            grammar_table.earliest_terminal("id", 0)
        );

        let production = grammar_table.productions().next().unwrap();
        assert_eq!(vec!["id"], body_names(&grammar_table, production));
    }

    #[test]
    fn should_prefer_terminals_over_nonterminals_at_same_offset() {
        let grammar_table = load_grammar("A a\na b\nA:ab|a\na:b\nA").unwrap();
        let first = grammar_table.productions().next().unwrap();

        assert_eq!(
            vec![
                SymbolRef::Terminal(TerminalRef::new(0)),
                SymbolRef::Terminal(TerminalRef::new(1))
            ],
            first.rhs
        );
    }

    #[test]
    fn should_filter_productions_by_head_and_occurrence() {
        let grammar_table = load_grammar(TEST_GRAMMAR).unwrap();
        let e = grammar_table
            .non_terminal_mapping(&NonTerminal::new("E"))
            .unwrap();
        let t = grammar_table
            .non_terminal_mapping(&NonTerminal::new("T"))
            .unwrap();

        let with_head_e = grammar_table
            .productions_with_head(e)
            .map(|p| p.id.as_usize())
            .collect::<Vec<_>>();
        let containing_t = grammar_table
            .productions_containing(SymbolRef::NonTerminal(t))
            .map(|p| p.id.as_usize())
            .collect::<Vec<_>>();

        assert_eq!(vec![1, 2], with_head_e);
        assert_eq!(vec![1, 2, 3], containing_t);
    }

    #[test]
    fn should_augment_without_touching_original() {
        let grammar_table = load_grammar(TEST_GRAMMAR).unwrap();
        let augmented = grammar_table.augmented();

        assert_eq!(2, grammar_table.non_terminal_count());
        assert_eq!(4, grammar_table.production_count());

        let augmented_table = augmented.table();
        assert_eq!(3, augmented_table.non_terminal_count());
        assert_eq!(
            Some(NonTerminal::new("E'")),
            augmented_table.non_terminal(augmented.goal())
        );
        assert_eq!(
            "E' -> E",
            augmented_table.human_readable_production(augmented.goal_production())
        );
        assert_eq!(0, augmented.goal_production().id.as_usize());
    }

    #[test]
    fn should_pick_unused_goal_name() {
        let grammar_table = load_grammar("S S'\na\nS:S'\nS':a\nS").unwrap();
        let augmented = grammar_table.augmented();

        assert_eq!(
            Some(NonTerminal::new("S''")),
            augmented.table().non_terminal(augmented.goal())
        );
    }

    #[test]
    fn should_error_on_missing_start_symbol() {
        let res = load_grammar("E\ni\nE:i\n");

        assert_eq!(
            Err(GrammarLoadErrorKind::MissingStartSymbol),
            res.map_err(|e| e.kind())
        );
    }

    #[test]
    fn should_error_on_missing_terminal_line() {
        let res = load_grammar("E\n");

        assert_eq!(
            Err(GrammarLoadErrorKind::MissingTerminals),
            res.map_err(|e| e.kind())
        );
    }

    #[test]
    fn should_error_on_undeclared_start_symbol() {
        let res = load_grammar("E\ni\nE:i\nX\n");

        assert_eq!(
            Err(GrammarLoadErrorKind::UndeclaredSymbol),
            res.map_err(|e| e.kind())
        );
    }

    #[test]
    fn should_error_with_line_number_on_untokenizable_body() {
        let res = load_grammar("E\ni\nE:i\nE:iq\nE\n");

        let err = res.unwrap_err();
        assert_eq!(GrammarLoadErrorKind::InvalidProduction, err.kind());
        assert!(err.to_string().contains("lineno 4"), "{}", err);
    }
}
