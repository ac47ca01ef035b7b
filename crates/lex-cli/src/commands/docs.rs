//! `lex list` / `lex show` / `lex delete` — document management.

use lex_core::DocumentId;

use crate::cli::OutputFormat;
use crate::context::AppContext;
use crate::error::CliError;
use crate::output;

pub async fn list(ctx: &AppContext, format: OutputFormat) -> Result<(), CliError> {
    let records = ctx.store.list_documents().await?;
    output::print_records(&records, format)
}

pub async fn show(ctx: &AppContext, id: &str, format: OutputFormat) -> Result<(), CliError> {
    let document_id = DocumentId::parse(id).map_err(|e| CliError::Usage(e.to_string()))?;
    let doc = ctx.store.get_document(&document_id).await?;
    output::print_document(&doc, format)
}

pub async fn delete(ctx: &AppContext, id: &str) -> Result<(), CliError> {
    let document_id = DocumentId::parse(id).map_err(|e| CliError::Usage(e.to_string()))?;
    ctx.store.delete_document(&document_id).await?;
    println!("deleted {document_id}");
    Ok(())
}
