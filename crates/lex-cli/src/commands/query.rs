//! `lex query` — retrieve from the corpus.

use lex_core::DocumentId;
use lex_retrieve::RetrieveOptions;

use crate::cli::{OutputFormat, StrategyArg};
use crate::context::AppContext;
use crate::error::CliError;
use crate::output;

pub struct QueryArgs {
    pub text: String,
    pub strategy: StrategyArg,
    pub top_k: Option<usize>,
    pub summary_k: Option<usize>,
    pub details_per_summary: Option<usize>,
    pub documents: Option<Vec<String>>,
    pub max_content_length: Option<usize>,
    pub siblings: bool,
    pub no_ancestors: bool,
}

pub async fn handle(
    ctx: &AppContext,
    args: QueryArgs,
    format: OutputFormat,
) -> Result<(), CliError> {
    let defaults = &ctx.config.retrieval;
    let document_filter = match args.documents {
        Some(raw) => {
            let mut ids = Vec::with_capacity(raw.len());
            for id in raw {
                ids.push(DocumentId::parse(&id).map_err(|e| CliError::Usage(e.to_string()))?);
            }
            Some(ids)
        }
        None => None,
    };

    let opts = RetrieveOptions {
        strategy: args.strategy.into(),
        document_filter,
        top_k: args.top_k.unwrap_or(defaults.top_k),
        summary_k: args.summary_k.unwrap_or(defaults.summary_k),
        details_per_summary: args
            .details_per_summary
            .unwrap_or(defaults.details_per_summary),
        content_max_length: args
            .max_content_length
            .unwrap_or(defaults.content_max_length),
        include_ancestors: !args.no_ancestors,
        include_siblings: args.siblings,
        deadline: None,
    };

    let pack = ctx.retriever().retrieve(&args.text, &opts).await?;
    output::print_pack(&pack, format)
}
