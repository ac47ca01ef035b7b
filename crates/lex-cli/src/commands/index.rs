//! `lex index` — index statute files.

use std::path::PathBuf;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use lex_core::DocumentId;
use lex_index::IndexRequest;

use crate::cli::OutputFormat;
use crate::context::AppContext;
use crate::error::CliError;
use crate::output;

pub struct IndexArgs {
    pub paths: Vec<PathBuf>,
    pub force: bool,
    pub no_skip_errors: bool,
    pub id: Option<String>,
}

pub async fn handle(
    ctx: &AppContext,
    args: IndexArgs,
    format: OutputFormat,
    quiet: bool,
) -> Result<(), CliError> {
    let indexer = ctx.indexer();

    if let Some(raw_id) = args.id {
        if args.paths.len() != 1 {
            return Err(CliError::Usage(
                "--id applies to exactly one file".to_string(),
            ));
        }
        let document_id =
            DocumentId::parse(&raw_id).map_err(|e| CliError::Usage(e.to_string()))?;
        let request = IndexRequest {
            document_id: Some(document_id),
            force: args.force,
            deadline: None,
        };
        let doc = indexer.index_document(&args.paths[0], request).await?;
        return output::print_json(&serde_json::json!({
            "indexed": [doc.id],
            "chunks": doc.chunk_count,
            "chars": doc.total_chars,
        }));
    }

    let spinner = if quiet {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new_spinner().with_message(format!(
            "indexing {} file(s)",
            args.paths.len()
        ));
        bar.set_style(ProgressStyle::default_spinner());
        bar.enable_steady_tick(Duration::from_millis(120));
        bar
    };

    let report = indexer
        .index_many(&args.paths, args.force, !args.no_skip_errors)
        .await?;
    spinner.finish_and_clear();

    output::print_report(&report, format)?;

    // Nothing succeeded: surface the first failure so the exit code reflects it.
    if report.indexed.is_empty() {
        if let Some((_, error)) = report.failures.into_iter().next() {
            return Err(error.into());
        }
    }
    Ok(())
}
