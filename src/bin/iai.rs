/*!
 * iai - AI assistant for GRASS GIS
 *
 * Sends a natural-language query to a local Ollama service together with
 * the current GRASS environment, prints the response, and optionally
 * executes the commands found in it.
 */

use anyhow::{bail, Result};
use clap::Parser;
use iai_core::context::{system_prompt, ModuleCatalog, SystemContext};
use iai_core::dispatcher::{Dispatcher, ExecutionResult};
use iai_core::extractor::CommandExtractor;
use iai_core::host::GrassRunner;
use iai_core::ollama::{OllamaClient, DEFAULT_MODEL, DEFAULT_URL};
use iai_core::session::{compose_prompt, Session};
use std::io::{self, BufRead, Write};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "iai")]
#[command(about = "AI assistant for GRASS GIS", long_about = None)]
struct Cli {
    /// Question or task for the assistant
    query: Option<String>,

    /// Ollama model to use
    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,

    /// Ollama service URL
    #[arg(long, default_value = DEFAULT_URL)]
    ollama_url: String,

    /// Continue a previous session id
    #[arg(long)]
    session: Option<String>,

    /// Execute suggested commands automatically
    #[arg(short, long)]
    execute: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Stay in an interactive session
    #[arg(short, long)]
    interactive: bool,

    /// Show system information and exit
    #[arg(short = 's', long)]
    system_info: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let runner = Arc::new(GrassRunner);
    let catalog = ModuleCatalog::default();

    if cli.system_info {
        let ctx = SystemContext::gather(runner.as_ref()).await;
        print_system_info(&ctx, &catalog);
        return Ok(());
    }

    let query = match &cli.query {
        Some(q) => q.clone(),
        None if cli.interactive => String::new(),
        None => bail!("a query is required unless --system-info or --interactive is given"),
    };

    let client = OllamaClient::new(&cli.ollama_url, &cli.model);
    if !client.is_reachable().await {
        bail!(
            "cannot connect to Ollama at {} - start it with: ollama serve",
            cli.ollama_url
        );
    }

    if cli.verbose {
        println!("iai - AI assistant for GRASS GIS");
        println!("using model: {}", client.model());
    }

    let ctx = SystemContext::gather(runner.as_ref()).await;
    let system = system_prompt(&ctx, &catalog);

    let mut session = match &cli.session {
        Some(id) => Session::resume(id.clone()),
        None => Session::new(),
    };

    let extractor = CommandExtractor::new();
    let dispatcher = Dispatcher::new(runner.clone());

    if !query.is_empty() {
        run_turn(
            &client,
            &system,
            &mut session,
            &query,
            cli.execute,
            &extractor,
            &dispatcher,
        )
        .await?;
    }

    if cli.interactive {
        println!("\nInteractive mode - type 'iai close' to leave");
        let stdin = io::stdin();
        loop {
            print!("\niai> ");
            io::stdout().flush()?;

            let mut line = String::new();
            if stdin.lock().read_line(&mut line)? == 0 {
                break;
            }
            let input = line.trim();
            if matches!(
                input.to_lowercase().as_str(),
                "iai close" | "close" | "quit" | "exit" | "q"
            ) {
                break;
            }
            if input.is_empty() {
                continue;
            }

            run_turn(
                &client,
                &system,
                &mut session,
                input,
                cli.execute,
                &extractor,
                &dispatcher,
            )
            .await?;
        }
    }

    Ok(())
}

async fn run_turn(
    client: &OllamaClient,
    system: &str,
    session: &mut Session,
    query: &str,
    execute: bool,
    extractor: &CommandExtractor,
    dispatcher: &Dispatcher,
) -> Result<()> {
    let prompt = compose_prompt(system, &session.context_block(), query);
    let response = client.generate(&prompt, None).await?;

    println!("{}", "=".repeat(70));
    println!("{}", response);
    println!("{}", "=".repeat(70));
    session.record(query, &response);

    if execute {
        let candidates = extractor.extract(&response);
        if candidates.is_empty() {
            println!("No executable commands found in response");
            return Ok(());
        }

        println!("\nExecuting {} commands:", candidates.len());
        let results = dispatcher.dispatch(&candidates).await;
        for (i, result) in results.iter().enumerate() {
            print_result(i + 1, result);
        }
    }

    Ok(())
}

fn print_result(index: usize, result: &ExecutionResult) {
    println!("\n{}. {}", index, result.command);
    if result.success {
        println!("ok:");
        if let Some(output) = &result.output {
            println!("{}", output);
        }
    } else {
        println!(
            "failed: {}",
            result.error.as_deref().unwrap_or("unknown error")
        );
    }
}

fn print_system_info(ctx: &SystemContext, catalog: &ModuleCatalog) {
    let unknown = "unknown";
    println!("iai system information");
    println!("{}", "=".repeat(50));
    println!(
        "GRASS version: {}",
        ctx.grass_version.as_deref().unwrap_or(unknown)
    );
    println!("Database: {}", ctx.database.as_deref().unwrap_or(unknown));
    println!("Location: {}", ctx.location.as_deref().unwrap_or(unknown));
    println!("Mapset: {}", ctx.mapset.as_deref().unwrap_or(unknown));
    println!("GDAL tools: {} available", ctx.gdal_tools.len());
    println!("System tools: {} available", ctx.system_tools.len());
    println!("GRASS modules: {} cataloged", catalog.total_modules());
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}
