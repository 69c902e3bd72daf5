use clap::Parser;
use tabnotes::cli::{handle_list, handle_read, handle_write, Cli, Commands};
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let default = if verbose { "tabnotes=debug" } else { "tabnotes=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.options.verbose);

    let result = match cli.command {
        Commands::Write => handle_write(&cli.options),
        Commands::Read => handle_read(&cli.options),
        Commands::List { json } => handle_list(&cli.options, json),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
