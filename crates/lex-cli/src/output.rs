//! Result rendering for the three output formats.

use lex_core::Document;
use lex_db::DocumentRecord;
use lex_index::BulkIndexReport;
use lex_retrieve::ResultPack;
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::error::CliError;

/// Serialize any value as pretty JSON to stdout.
///
/// # Errors
///
/// Returns [`CliError`] if serialization fails.
pub fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| CliError::Other(e.into()))?;
    println!("{json}");
    Ok(())
}

/// Render a retrieval pack.
///
/// # Errors
///
/// Returns [`CliError`] on serialization failure (JSON format only).
pub fn print_pack(pack: &ResultPack, format: OutputFormat) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => print_json(pack),
        OutputFormat::Table => {
            println!(
                "query: {}  strategy: {}  groups: {}",
                pack.query,
                pack.strategy,
                pack.groups.len()
            );
            for (i, group) in pack.groups.iter().enumerate() {
                println!();
                println!(
                    "#{} [{:.4}] {} ({})",
                    i + 1,
                    group.primary.score,
                    group.primary.path_display,
                    group.primary.kind
                );
                println!("  {}", first_line(&group.primary.content));
                for ancestor in &group.ancestors {
                    println!("  ^ {} ({})", ancestor.path_display, ancestor.kind);
                }
                for sibling in group.siblings.iter().flatten() {
                    println!("  ~ {}", sibling.path_display);
                }
            }
            Ok(())
        }
        OutputFormat::Raw => {
            for group in &pack.groups {
                println!("{}", group.primary.content);
            }
            Ok(())
        }
    }
}

/// Render the document listing.
///
/// # Errors
///
/// Returns [`CliError`] on serialization failure (JSON format only).
pub fn print_records(records: &[DocumentRecord], format: OutputFormat) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => print_json(&records),
        OutputFormat::Table | OutputFormat::Raw => {
            let id_width = records
                .iter()
                .map(|r| r.id.as_str().len())
                .max()
                .unwrap_or(2)
                .max(2);
            println!("{:<id_width$}  {:>6}  {:>9}  TITLE", "ID", "CHUNKS", "CHARS");
            for record in records {
                println!(
                    "{:<id_width$}  {:>6}  {:>9}  {}",
                    record.id.as_str(),
                    record.chunk_count,
                    record.total_chars,
                    record.title
                );
            }
            Ok(())
        }
    }
}

/// Render one document's chunk tree.
///
/// # Errors
///
/// Returns [`CliError`] on serialization failure (JSON format only).
pub fn print_document(doc: &Document, format: OutputFormat) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => print_json(doc),
        OutputFormat::Table | OutputFormat::Raw => {
            println!("{} — {} chunks, {} chars", doc.id, doc.chunk_count, doc.total_chars);
            for chunk in &doc.chunks {
                let indent = "  ".repeat(chunk.depth());
                let label = chunk
                    .article_number
                    .as_deref()
                    .or_else(|| chunk.title())
                    .unwrap_or_else(|| chunk.kind.as_str());
                println!(
                    "{indent}{label} [{} / {}] {} chars",
                    chunk.kind, chunk.indexing_layer, chunk.char_count
                );
            }
            Ok(())
        }
    }
}

/// Render a bulk indexing report.
///
/// # Errors
///
/// Returns [`CliError`] on serialization failure (JSON format only).
pub fn print_report(report: &BulkIndexReport, format: OutputFormat) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => {
            let value = serde_json::json!({
                "indexed": report.indexed,
                "failures": report
                    .failures
                    .iter()
                    .map(|(path, error)| serde_json::json!({
                        "path": path.display().to_string(),
                        "kind": error.kind(),
                        "message": error.to_string(),
                    }))
                    .collect::<Vec<_>>(),
            });
            print_json(&value)
        }
        OutputFormat::Table | OutputFormat::Raw => {
            for id in &report.indexed {
                println!("indexed {id}");
            }
            for (path, error) in &report.failures {
                println!("failed  {} ({})", path.display(), error);
            }
            Ok(())
        }
    }
}

fn first_line(content: &str) -> &str {
    content.lines().next().unwrap_or("")
}
