use thiserror::Error;

use crate::grammar::{GrammarTable, NonTerminalRef, ProductionId, TerminalRef, END_MARKER};

/// A wrapper type for annotating a state.
#[derive(Debug, Hash, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct StateId(usize);

impl StateId {
    /// Instantiates a new [StateId] from a reference id.
    ///
    /// # Safety
    ///
    /// Caller guarantees that the id usize corresponds to a valid state in
    /// the parse table.
    pub fn unchecked_new(id: usize) -> Self {
        StateId(id)
    }

    pub fn as_usize(&self) -> usize {
        self.0
    }
}

impl From<StateId> for usize {
    fn from(value: StateId) -> Self {
        value.as_usize()
    }
}

impl std::fmt::Display for StateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Represents one of 5 valid cells of the parse table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Action {
    /// Consume the input token and push the next state.
    Shift(StateId),
    /// Reduce the production's body on the stack to its head.
    Reduce(ProductionId),
    /// The state to enter after reducing to a nonterminal.
    Goto(StateId),
    /// The goal state has been reached and a parse can be accepted.
    Accept,
    /// No valid action. The parse rejects.
    #[default]
    Error,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Shift(state) => write!(f, "d{}", state),
            Action::Reduce(production) => write!(f, "r{}", production),
            Action::Goto(state) => write!(f, "{}", state),
            Action::Accept => write!(f, "acc"),
            Action::Error => write!(f, "x"),
        }
    }
}

impl std::str::FromStr for Action {
    type Err = TableLoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid_cell = || {
            TableLoadError::new(TableLoadErrorKind::InvalidCell).with_data(format!("`{}`", s))
        };
        let parse_id = |digits: &str| {
            // a bare `+` would otherwise be accepted by usize::from_str.
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid_cell());
            }
            digits.parse::<usize>().map_err(|_| invalid_cell())
        };

        match s {
            "acc" => Ok(Action::Accept),
            "x" => Ok(Action::Error),
            _ => {
                if let Some(state) = s.strip_prefix('d') {
                    parse_id(state).map(|id| Action::Shift(StateId::unchecked_new(id)))
                } else if let Some(production) = s.strip_prefix('r') {
                    parse_id(production).map(|id| Action::Reduce(ProductionId::unchecked_new(id)))
                } else {
                    parse_id(s).map(|id| Action::Goto(StateId::unchecked_new(id)))
                }
            }
        }
    }
}

/// A column of the parse table. Columns are laid out as every terminal in
/// declaration order, then the end marker, then every nonterminal in
/// declaration order.
#[derive(Debug, Hash, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Terminal(TerminalRef),
    Eof,
    NonTerminal(NonTerminalRef),
}

impl Column {
    pub fn human_readable_format(&self, grammar_table: &GrammarTable) -> String {
        match self {
            Column::Terminal(t) => grammar_table
                .terminal(*t)
                .map(|t| t.to_string())
                .unwrap_or_else(|| t.to_string()),
            Column::Eof => END_MARKER.to_string(),
            Column::NonTerminal(nt) => grammar_table
                .non_terminal(*nt)
                .map(|nt| nt.to_string())
                .unwrap_or_else(|| nt.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LrTable {
    terminals: usize,
    non_terminals: usize,
    rows: Vec<Vec<Action>>,
}

impl LrTable {
    /// Creates a table of `states` rows where every cell is
    /// [Action::Error].
    pub(crate) fn new(states: usize, terminals: usize, non_terminals: usize) -> Self {
        let width = terminals + 1 + non_terminals;

        Self {
            terminals,
            non_terminals,
            rows: vec![vec![Action::default(); width]; states],
        }
    }

    pub fn states(&self) -> usize {
        self.rows.len()
    }

    fn width(&self) -> usize {
        self.terminals + 1 + self.non_terminals
    }

    /// All columns in layout order.
    pub fn columns(&self) -> impl Iterator<Item = Column> {
        let terminals = (0..self.terminals).map(|t| Column::Terminal(TerminalRef::new(t)));
        let non_terminals =
            (0..self.non_terminals).map(|nt| Column::NonTerminal(NonTerminalRef::new(nt)));

        terminals.chain(std::iter::once(Column::Eof)).chain(non_terminals)
    }

    fn column_idx(&self, column: Column) -> Option<usize> {
        match column {
            Column::Terminal(t) if t.as_usize() < self.terminals => Some(t.as_usize()),
            Column::Eof => Some(self.terminals),
            Column::NonTerminal(nt) if nt.as_usize() < self.non_terminals => {
                Some(self.terminals + 1 + nt.as_usize())
            }
            _ => None,
        }
    }

    /// Looks up a cell, treating any cell outside the table as
    /// [Action::Error].
    pub fn action(&self, state: StateId, column: Column) -> Action {
        self.column_idx(column)
            .and_then(|col| self.rows.get(state.as_usize())?.get(col).copied())
            .unwrap_or_default()
    }

    /// Writes a cell, returning the action it replaced.
    pub(crate) fn set_action_mut(
        &mut self,
        state: StateId,
        column: Column,
        action: Action,
    ) -> Option<Action> {
        let col = self.column_idx(column)?;
        let cell = self.rows.get_mut(state.as_usize())?.get_mut(col)?;

        Some(std::mem::replace(cell, action))
    }

    /// Outputs a human-readable representation of the parse table.
    pub fn human_readable_format(&self, grammar_table: &GrammarTable) -> String {
        const ERROR_STR: &str = " ";

        let left_side_padding = 8;
        let row_header = self
            .columns()
            .map(|column| format!("{: >8}", column.human_readable_format(grammar_table)))
            .collect::<String>();
        let table_width_without_left_side_padding = row_header.chars().count();

        let first_row = format!("{}{}", " ".repeat(left_side_padding), &row_header);
        let table_padding = format!(
            "{}{}",
            " ".repeat(left_side_padding),
            "-".repeat(table_width_without_left_side_padding)
        );

        let rows = self.rows.iter().enumerate().map(|(state, row)| {
            let cells = row
                .iter()
                .map(|action| match action {
                    Action::Error => format!("{: >8}", ERROR_STR),
                    Action::Accept => format!("{: >8}", "accept"),
                    Action::Shift(id) => format!("{: >8}", format!("s{}", id)),
                    other => format!("{: >8}", other.to_string()),
                })
                .collect::<String>();

            format!("{: >6} |{}", state, cells)
        });

        [first_row, table_padding]
            .into_iter()
            .chain(rows)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Writes the table as a whitespace separated matrix, one line per state, in
/// the column layout of `grammar_table`.
pub fn serialize(table: &LrTable, grammar_table: &GrammarTable) -> String {
    let terminals = grammar_table.terminal_refs().map(Column::Terminal);
    let non_terminals = grammar_table.non_terminal_refs().map(Column::NonTerminal);
    let columns = terminals
        .chain(std::iter::once(Column::Eof))
        .chain(non_terminals)
        .collect::<Vec<_>>();

    (0..table.states())
        .map(StateId::unchecked_new)
        .map(|state| {
            let cells = columns
                .iter()
                .map(|&column| table.action(state, column).to_string())
                .collect::<Vec<_>>();

            format!("{}\n", cells.join(" "))
        })
        .collect()
}

/// Reads a matrix written by [serialize] back into a table for
/// `grammar_table`. Every cell is validated against the grammar and the
/// number of rows.
pub fn deserialize<S: AsRef<str>>(
    input: S,
    grammar_table: &GrammarTable,
) -> Result<LrTable, TableLoadError> {
    let rows = input
        .as_ref()
        .lines()
        .enumerate()
        .map(|(lineno, line)| (lineno + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
        .collect::<Vec<_>>();

    if rows.is_empty() {
        return Err(TableLoadError::new(TableLoadErrorKind::Empty));
    }

    let mut table = LrTable::new(
        rows.len(),
        grammar_table.terminal_count(),
        grammar_table.non_terminal_count(),
    );
    let states = table.states();
    let width = table.width();
    let columns = table.columns().collect::<Vec<_>>();

    for (state, (lineno, line)) in rows.into_iter().enumerate() {
        let cells = line.split_whitespace().collect::<Vec<_>>();
        if cells.len() != width {
            return Err(
                TableLoadError::new(TableLoadErrorKind::IncompleteRow).with_data(format!(
                    "lineno {}: expected {} cells, found {}",
                    lineno,
                    width,
                    cells.len()
                )),
            );
        }

        for (&column, cell) in columns.iter().zip(cells) {
            let action = cell
                .parse::<Action>()
                .and_then(|action| validate_cell(action, column, states, grammar_table))
                .map_err(|e| e.at_line(lineno))?;

            table.set_action_mut(StateId::unchecked_new(state), column, action);
        }
    }

    log::debug!("loaded table with {} states", table.states());
    Ok(table)
}

fn validate_cell(
    action: Action,
    column: Column,
    states: usize,
    grammar_table: &GrammarTable,
) -> Result<Action, TableLoadError> {
    let on_non_terminal = matches!(column, Column::NonTerminal(_));
    let valid = match action {
        Action::Shift(state) => !on_non_terminal && state.as_usize() < states,
        Action::Goto(state) => on_non_terminal && state.as_usize() < states,
        Action::Reduce(id) => {
            !on_non_terminal && (1..=grammar_table.production_count()).contains(&id.as_usize())
        }
        Action::Accept => column == Column::Eof,
        Action::Error => true,
    };

    if valid {
        Ok(action)
    } else {
        Err(TableLoadError::new(TableLoadErrorKind::InvalidCell)
            .with_data(format!("`{}` in column {:?}", action, column)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TableLoadErrorKind {
    #[error("table is empty")]
    Empty,
    #[error("row does not match the grammar's column count")]
    IncompleteRow,
    #[error("invalid table cell")]
    InvalidCell,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLoadError {
    kind: TableLoadErrorKind,
    data: Option<String>,
}

impl TableLoadError {
    pub fn new(kind: TableLoadErrorKind) -> Self {
        Self { kind, data: None }
    }

    pub fn with_data_mut(&mut self, data: String) {
        self.data = Some(data)
    }

    pub fn with_data(mut self, data: String) -> Self {
        self.with_data_mut(data);
        self
    }

    pub fn kind(&self) -> TableLoadErrorKind {
        self.kind
    }

    fn at_line(self, lineno: usize) -> Self {
        let data = match self.data {
            Some(data) => format!("lineno {}: {}", lineno, data),
            None => format!("lineno {}", lineno),
        };

        TableLoadError::new(self.kind).with_data(data)
    }
}

impl std::fmt::Display for TableLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.data {
            Some(ctx) => write!(f, "{}: {}", &self.kind, ctx),
            None => write!(f, "{}", &self.kind),
        }
    }
}

impl std::error::Error for TableLoadError {}
