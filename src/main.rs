use clap::Parser;
use taskflow::cli::commands::{Cli, Commands};
use taskflow::cli::{handlers, init_logging};

fn main() {
    let cli = Cli::parse();

    // The daemon reports what it does; one-shot commands only warn
    match cli.command {
        Commands::Run => init_logging("info"),
        _ => init_logging("warn"),
    }

    if let Err(e) = handlers::dispatch(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
