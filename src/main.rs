use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use classforge::config::Config;
use classforge::loader;
use classforge::scorer::Scorer;
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod cmd;
mod reports;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON config; flags given on the command line override it
    #[arg(global = true, long)]
    config: Option<String>,

    #[arg(global = true, long, default_value_t = false)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Run(cmd::run::RunArgs),
    Score(cmd::score::ScoreArgs),
}

fn fail(msg: impl std::fmt::Display) -> ! {
    eprintln!("\n❌ {}", msg);
    process::exit(1);
}

fn main() {
    // 1. Parse raw matches so user input can be told apart from defaults
    let matches = Cli::command().get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    let level = if cli.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    println!("\n🚀 Initializing ClassForge...");

    // 2. CLI config plus the subcommand's own matches (flattened args live there)
    let (cli_config, input, sub_name) = match &cli.command {
        Commands::Run(args) => (&args.config, &args.input, "run"),
        Commands::Score(args) => (&args.config, &args.input, "score"),
    };
    let Some(sub_matches) = matches.subcommand_matches(sub_name) else {
        fail(format!("missing arguments for '{}'", sub_name));
    };

    // 3. JSON file as the base, explicit CLI flags on top
    let config = match &cli.config {
        Some(path) => {
            println!("⚖️  Loading config from: {}", path);
            let mut file_config = Config::load_from_file(path).unwrap_or_else(|e| fail(e));
            file_config.merge_from_cli(cli_config, sub_matches);
            file_config
        }
        None => cli_config.clone(),
    };
    if let Err(e) = config.validate() {
        fail(e);
    }

    // 4. Roster
    println!("📂 Loading roster: {}", input);
    let roster = loader::load_roster(input).unwrap_or_else(|e| fail(e));
    let scorer = Arc::new(Scorer::new(roster, &config));

    // 5. Execute
    let result = match cli.command {
        Commands::Run(args) => cmd::run::run(args, config, scorer),
        Commands::Score(args) => cmd::score::run(args, config, scorer),
    };
    if let Err(e) = result {
        fail(e);
    }
}
