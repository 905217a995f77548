use grammar::{GrammarLoadError, GrammarTable};
use lr::{LrTable, TableGenError, TableLoadError};
use parser::{ParseStatus, Recognizer};
use sets::SymbolSets;
use thiserror::Error;

pub mod grammar;
pub mod lr;
pub mod parser;
pub mod sets;

/// Represents the kind of table that can be generated
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorKind {
    /// SLR(1) Grammar
    #[default]
    Slr1,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    #[error("grammar error: {0}")]
    GrammarError(GrammarLoadError),
    #[error("table generation error: {0}")]
    TableGenerationError(TableGenError),
    #[error("table load error: {0}")]
    TableLoadError(TableLoadError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
    data: Option<String>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, data: None }
    }

    pub fn with_data_mut(&mut self, data: String) {
        self.data = Some(data)
    }

    pub fn with_data(mut self, data: String) -> Self {
        self.with_data_mut(data);
        self
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.data {
            Some(ctx) => write!(f, "{}: {}", &self.kind, ctx),
            None => write!(f, "{}", &self.kind),
        }
    }
}

impl std::error::Error for Error {}

impl From<GrammarLoadError> for Error {
    fn from(err: GrammarLoadError) -> Self {
        Error::new(ErrorKind::GrammarError(err))
    }
}

impl From<TableGenError> for Error {
    fn from(err: TableGenError) -> Self {
        Error::new(ErrorKind::TableGenerationError(err))
    }
}

impl From<TableLoadError> for Error {
    fn from(err: TableLoadError) -> Self {
        Error::new(ErrorKind::TableLoadError(err))
    }
}

/// Loads a grammar from its source text and generates its parse table.
pub fn generate_table_from_source<G: AsRef<str>>(
    kind: GeneratorKind,
    grammar: G,
) -> Result<LrTable, Error> {
    let grammar_table = grammar::load_grammar(grammar)?;

    generate_table_from_grammar(kind, &grammar_table)
}

pub fn generate_table_from_grammar(
    kind: GeneratorKind,
    grammar_table: &GrammarTable,
) -> Result<LrTable, Error> {
    let sets = SymbolSets::solve(grammar_table);

    generate_table_with_sets(kind, grammar_table, &sets)
}

fn generate_table_with_sets(
    kind: GeneratorKind,
    grammar_table: &GrammarTable,
    sets: &SymbolSets,
) -> Result<LrTable, Error> {
    match kind {
        GeneratorKind::Slr1 => {
            use crate::lr::LrTableGenerator;

            crate::lr::Slr1::generate_table_with_sets(grammar_table, sets).map_err(Error::from)
        }
    }
}

/// An analysis session pairing a grammar, and its FIRST and FOLLOW sets, with
/// the parse table built for, or loaded against, it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parser {
    grammar_table: GrammarTable,
    sets: SymbolSets,
    table: LrTable,
}

impl Parser {
    /// Solves the grammar's sets and builds its SLR(1) table.
    pub fn build(grammar_table: GrammarTable) -> Result<Self, Error> {
        Self::build_with(GeneratorKind::default(), grammar_table)
    }

    pub fn build_with(kind: GeneratorKind, grammar_table: GrammarTable) -> Result<Self, Error> {
        let sets = SymbolSets::solve(&grammar_table);
        let table = generate_table_with_sets(kind, &grammar_table, &sets)?;

        Ok(Self {
            grammar_table,
            sets,
            table,
        })
    }

    /// Pairs the grammar with a previously persisted table, skipping table
    /// generation entirely.
    pub fn with_table<S: AsRef<str>>(grammar_table: GrammarTable, table: S) -> Result<Self, Error> {
        let table = lr::table::deserialize(table, &grammar_table)?;
        let sets = SymbolSets::solve(&grammar_table);

        Ok(Self {
            grammar_table,
            sets,
            table,
        })
    }

    pub fn parse<'i, I: Into<Option<&'i str>>>(&self, input: I) -> ParseStatus {
        self.recognizer().parse(input)
    }

    pub fn recognizer(&self) -> Recognizer<'_> {
        Recognizer::new(&self.grammar_table, &self.table)
    }

    pub fn grammar(&self) -> &GrammarTable {
        &self.grammar_table
    }

    /// The FIRST and FOLLOW sets solved once for this session's grammar.
    pub fn sets(&self) -> &SymbolSets {
        &self.sets
    }

    pub fn table(&self) -> &LrTable {
        &self.table
    }

    /// Renders the table in its persisted matrix format.
    pub fn serialize_table(&self) -> String {
        lr::table::serialize(&self.table, &self.grammar_table)
    }
}

impl std::str::FromStr for Parser {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let grammar_table = grammar::load_grammar(s)?;

        Self::build(grammar_table)
    }
}
