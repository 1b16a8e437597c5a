use clap::{Parser, Subcommand};
use env_logger::{Env, Target};
use repolink::RepolinkServer;
use repolink::config::user_config_path;
use tokio::io::{stdin, stdout};
use tower_lsp_server::{LspService, Server};

/// Go-to-definition for remote repository documents, as a language server
#[derive(Parser)]
#[command(name = "repolink")]
#[command(version)]
#[command(about = "Go-to-definition for remote repository documents, as a language server")]
struct Cli {
    /// Communicate over stdio (the only supported transport; accepted for editor compatibility)
    #[arg(long)]
    stdio: bool,

    /// Log filter, e.g. `debug` or `repolink::remote=trace` (overrides RUST_LOG)
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the path of the user configuration file
    ConfigPath,
}

fn init_logging(log_level: Option<&str>) {
    // stdout carries the LSP stream, so logs go to stderr.
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("warn"));
    builder.target(Target::Stderr);
    if let Some(filters) = log_level {
        builder.parse_filters(filters);
    }
    let _ = builder.try_init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    match cli.command {
        Some(Commands::ConfigPath) => match user_config_path() {
            Some(path) => println!("{}", path.display()),
            None => {
                eprintln!("Error: could not determine the user configuration directory");
                std::process::exit(1);
            }
        },
        None => {
            log::debug!(
                target: "repolink::main",
                "Serving LSP on stdio (--stdio: {})",
                cli.stdio
            );
            let (service, socket) = LspService::new(RepolinkServer::new);
            Server::new(stdin(), stdout(), socket).serve(service).await;
        }
    }
}
