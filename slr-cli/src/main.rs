use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use slr_core::grammar::{load_grammar, GrammarTable};
use slr_core::sets::SymbolSets;

#[derive(Parser)]
#[command(name = "slr", version, about = "SLR(1) parse table generator and recognizer")]
struct Cli {
    /// Increase log verbosity, repeatable.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Silence all log output.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the FIRST and FOLLOW sets of every nonterminal.
    Sets {
        /// Grammar source file.
        grammar: PathBuf,
    },
    /// Build the parse table and write it in its persisted format.
    Table {
        /// Grammar source file.
        grammar: PathBuf,

        /// Destination of the table. Defaults to the grammar path with an
        /// `out` extension.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print a human-readable table to stdout instead of writing it.
        #[arg(long)]
        pretty: bool,
    },
    /// Decide whether each input is accepted by the grammar.
    Parse {
        /// Grammar source file.
        grammar: PathBuf,

        /// Parse with a previously written table instead of building one.
        /// Defaults to the grammar path with an `out` extension when that
        /// file exists.
        #[arg(long)]
        table: Option<PathBuf>,

        #[arg(required = true)]
        inputs: Vec<String>,
    },
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // warnings, e.g. table conflicts, are shown by default.
    stderrlog::new()
        .quiet(cli.quiet)
        .verbosity(usize::from(cli.verbose) + 1)
        .init()
        .context("failed to initialise logging")?;

    match cli.command {
        Command::Sets { grammar } => {
            let grammar_table = read_grammar(&grammar)?;
            let sets = SymbolSets::solve(&grammar_table);

            println!("{}", sets.human_readable_format(&grammar_table));
            Ok(ExitCode::SUCCESS)
        }
        Command::Table {
            grammar,
            output,
            pretty,
        } => {
            let parser = slr_core::Parser::build(read_grammar(&grammar)?)
                .with_context(|| format!("failed to build table for {}", grammar.display()))?;

            if pretty {
                println!("{}", parser.table().human_readable_format(parser.grammar()));
                return Ok(ExitCode::SUCCESS);
            }

            let output = output.unwrap_or_else(|| default_table_path(&grammar));
            fs::write(&output, parser.serialize_table())
                .with_context(|| format!("failed to write table to {}", output.display()))?;
            log::info!(
                "wrote {} states to {}",
                parser.table().states(),
                output.display()
            );

            Ok(ExitCode::SUCCESS)
        }
        Command::Parse {
            grammar,
            table,
            inputs,
        } => {
            let grammar_table = read_grammar(&grammar)?;
            let parser = match persisted_table_path(&grammar, table) {
                Some(table_path) => {
                    let persisted = fs::read_to_string(&table_path).with_context(|| {
                        format!("failed to read table {}", table_path.display())
                    })?;

                    slr_core::Parser::with_table(grammar_table, persisted).with_context(|| {
                        format!("failed to load table {}", table_path.display())
                    })?
                }
                None => slr_core::Parser::build(grammar_table)
                    .with_context(|| format!("failed to build table for {}", grammar.display()))?,
            };

            let mut all_accepted = true;
            for input in &inputs {
                let status = parser.parse(input.as_str());
                all_accepted &= status.is_accepted();

                println!("{}: {}", input, status);
            }

            if all_accepted {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
    }
}

fn read_grammar(path: &Path) -> anyhow::Result<GrammarTable> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("failed to read grammar {}", path.display()))?;
    let grammar_table = load_grammar(source)
        .with_context(|| format!("failed to load grammar {}", path.display()))?;

    log::debug!("{}", grammar_table);
    Ok(grammar_table)
}

/// `expr.grammar` persists to `expr.out`.
fn default_table_path(grammar: &Path) -> PathBuf {
    grammar.with_extension("out")
}

/// An explicit table path wins, otherwise a table previously written next to
/// the grammar is reused.
fn persisted_table_path(grammar: &Path, explicit: Option<PathBuf>) -> Option<PathBuf> {
    explicit.or_else(|| {
        let default = default_table_path(grammar);

        if default.is_file() {
            log::debug!("reusing table {}", default.display());
            Some(default)
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn should_have_valid_command_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn should_replace_grammar_extension_for_default_table_path() {
        assert_eq!(
            PathBuf::from("grammars/expr.out"),
            default_table_path(Path::new("grammars/expr.grammar"))
        );
        assert_eq!(
            PathBuf::from("expr.out"),
            default_table_path(Path::new("expr"))
        );
    }

    #[test]
    fn should_reuse_table_written_next_to_grammar() {
        let dir = std::env::temp_dir().join(format!("slr-cli-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        let grammar = dir.join("expr.grammar");
        let explicit = dir.join("other.out");

        assert_eq!(None, persisted_table_path(&grammar, None));
        assert_eq!(
            Some(explicit.clone()),
            persisted_table_path(&grammar, Some(explicit.clone()))
        );

        fs::write(dir.join("expr.out"), "acc\n").unwrap();
        let reused = persisted_table_path(&grammar, None);
        let preferred = persisted_table_path(&grammar, Some(explicit.clone()));
        fs::remove_dir_all(&dir).unwrap();

        assert_eq!(Some(dir.join("expr.out")), reused);
        assert_eq!(Some(explicit), preferred);
    }

    #[test]
    fn should_parse_parse_subcommand_arguments() {
        let cli = Cli::try_parse_from(["slr", "-vv", "parse", "g.txt", "--table", "g.out", "i+i", "i"])
            .unwrap();

        assert_eq!(2, cli.verbose);
        match cli.command {
            Command::Parse {
                grammar,
                table,
                inputs,
            } => {
                assert_eq!(PathBuf::from("g.txt"), grammar);
                assert_eq!(Some(PathBuf::from("g.out")), table);
                assert_eq!(vec!["i+i".to_string(), "i".to_string()], inputs);
            }
            _ => panic!("expected parse subcommand"),
        }
    }
}
