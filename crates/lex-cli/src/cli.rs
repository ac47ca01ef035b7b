//! Top-level CLI parser for the `lex` binary.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output rendering for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Machine-readable JSON (default).
    Json,
    /// Aligned plain-text table.
    Table,
    /// Raw content only.
    Raw,
}

/// Retrieval strategy flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
    SummaryFirst,
    Direct,
}

impl From<StrategyArg> for lex_retrieve::RetrievalStrategy {
    fn from(value: StrategyArg) -> Self {
        match value {
            StrategyArg::SummaryFirst => Self::SummaryFirst,
            StrategyArg::Direct => Self::Direct,
        }
    }
}

/// lexis — hierarchical retrieval for statute corpora.
#[derive(Debug, Parser)]
#[command(name = "lex", version, about = "lexis - statute indexing and retrieval")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "json")]
    pub format: OutputFormat,

    /// Database file override (defaults to configuration)
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// Quiet mode (suppress non-essential output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Index one or more statute markdown files
    Index {
        /// Files to index
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Replace documents that are already indexed
        #[arg(long)]
        force: bool,

        /// Abort the whole run on the first failing file
        #[arg(long)]
        no_skip_errors: bool,

        /// Explicit document id (single file only)
        #[arg(long)]
        id: Option<String>,
    },

    /// Query the corpus
    Query {
        /// Query text
        text: String,

        /// Retrieval strategy
        #[arg(long, value_enum, default_value = "summary-first")]
        strategy: StrategyArg,

        /// Number of result groups (1-50)
        #[arg(long)]
        top_k: Option<usize>,

        /// Phase-1 breadth for summary-first
        #[arg(long)]
        summary_k: Option<usize>,

        /// Phase-2 depth per summary hit
        #[arg(long)]
        details_per_summary: Option<usize>,

        /// Restrict to these document ids (comma separated)
        #[arg(long, value_delimiter = ',')]
        documents: Option<Vec<String>>,

        /// Per-chunk character cap for returned content (100-2000)
        #[arg(long)]
        max_content_length: Option<usize>,

        /// Include immediate siblings of each primary chunk
        #[arg(long)]
        siblings: bool,

        /// Do not include ancestor chunks
        #[arg(long)]
        no_ancestors: bool,
    },

    /// List indexed documents
    List,

    /// Show one document's tree
    Show {
        /// Document id
        id: String,
    },

    /// Delete a document and all derived rows
    Delete {
        /// Document id
        id: String,
    },
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::{Cli, Commands, OutputFormat};
    use clap::Parser;

    #[test]
    fn clap_command_tree_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn index_flags_parse() {
        let cli = Cli::try_parse_from(["lex", "index", "a.md", "b.md", "--force"])
            .expect("cli should parse");
        match cli.command {
            Commands::Index { paths, force, no_skip_errors, id } => {
                assert_eq!(paths.len(), 2);
                assert!(force);
                assert!(!no_skip_errors);
                assert!(id.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn query_flags_parse() {
        let cli = Cli::try_parse_from([
            "lex",
            "query",
            "第7條",
            "--strategy",
            "direct",
            "--top-k",
            "3",
            "--documents",
            "a,b",
            "--siblings",
        ])
        .expect("cli should parse");
        match cli.command {
            Commands::Query { text, top_k, documents, siblings, no_ancestors, .. } => {
                assert_eq!(text, "第7條");
                assert_eq!(top_k, Some(3));
                assert_eq!(documents.as_deref(), Some(&["a".to_string(), "b".to_string()][..]));
                assert!(siblings);
                assert!(!no_ancestors);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from(["lex", "list", "--format", "table", "--quiet"])
            .expect("cli should parse");
        assert_eq!(cli.format, OutputFormat::Table);
        assert!(cli.quiet);
        assert!(matches!(cli.command, Commands::List));
    }

    #[test]
    fn invalid_format_is_rejected() {
        assert!(Cli::try_parse_from(["lex", "list", "--format", "xml"]).is_err());
    }

    #[test]
    fn index_requires_at_least_one_path() {
        assert!(Cli::try_parse_from(["lex", "index"]).is_err());
    }
}
