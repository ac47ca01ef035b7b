//! lexis CLI entry point.

use clap::Parser;

mod cli;
mod commands;
mod context;
mod error;
mod output;

use error::CliError;

#[tokio::main]
async fn main() {
    let code = match run().await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("lex error: {e}");
            e.exit_code()
        }
    };
    std::process::exit(code);
}

async fn run() -> Result<(), CliError> {
    let cli = cli::Cli::parse();
    init_tracing(cli.quiet, cli.verbose)?;

    let cwd = std::env::current_dir().map_err(|e| CliError::Other(e.into()))?;
    let config = lex_config::LexisConfig::load(Some(cwd.as_path()))?;
    let ctx = context::AppContext::init(config, cli.db.as_deref()).await?;

    match cli.command {
        cli::Commands::Index {
            paths,
            force,
            no_skip_errors,
            id,
        } => {
            commands::index::handle(
                &ctx,
                commands::index::IndexArgs {
                    paths,
                    force,
                    no_skip_errors,
                    id,
                },
                cli.format,
                cli.quiet,
            )
            .await
        }
        cli::Commands::Query {
            text,
            strategy,
            top_k,
            summary_k,
            details_per_summary,
            documents,
            max_content_length,
            siblings,
            no_ancestors,
        } => {
            commands::query::handle(
                &ctx,
                commands::query::QueryArgs {
                    text,
                    strategy,
                    top_k,
                    summary_k,
                    details_per_summary,
                    documents,
                    max_content_length,
                    siblings,
                    no_ancestors,
                },
                cli.format,
            )
            .await
        }
        cli::Commands::List => commands::docs::list(&ctx, cli.format).await,
        cli::Commands::Show { id } => commands::docs::show(&ctx, &id, cli.format).await,
        cli::Commands::Delete { id } => commands::docs::delete(&ctx, &id).await,
    }
}

fn init_tracing(quiet: bool, verbose: bool) -> Result<(), CliError> {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env("LEXIS_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| {
            CliError::Other(anyhow::anyhow!(
                "failed to initialize tracing subscriber: {e}"
            ))
        })?;

    Ok(())
}
