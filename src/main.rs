mod logger;

/// Path of the default config.toml file.
const DEFAULT_CONFIG: &str = "./config.toml";

use clap::{Parser, Subcommand};
use hotcmd::command::CommandSnapshot;
use hotcmd::source::FsSource;
use hotcmd::{builtin, help, CommandSet, Config, Context, Error, Reloader, Result, Validator};

use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[clap(name = "hotcmd", version, about = "Inspect and reload command definitions")]
struct Args {
    /// Provide a path to the config file
    #[clap(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG)]
    config: String,

    /// Prefix shown in help output
    #[clap(short, long, default_value = "!")]
    prefix: String,

    #[clap(subcommand)]
    action: Action,
}

#[derive(Debug, Subcommand)]
enum Action {
    /// Load and validate all definitions
    Check,
    /// Print the global help or the help of a single command
    Help { path: Vec<String> },
    /// Print the command tree as JSON
    Json,
    /// Run a command. Words after the command path are passed as arguments
    Run {
        #[clap(required = true)]
        input: Vec<String>,
    },
    /// Reload a command from its definition and print the touched resources
    Reload {
        #[clap(required = true)]
        path: Vec<String>,
    },
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = if args.config == DEFAULT_CONFIG && !Path::new(DEFAULT_CONFIG).exists() {
        Config::default()
    } else {
        match Config::from_file(&args.config) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("Failed to load config `{}`: {}", args.config, err);
                std::process::exit(1);
            }
        }
    };

    if let Err(err) = logger::init(&config) {
        eprintln!("Failed to install logger: {}", err);
    }

    if let Err(err) = run(args, config).await {
        log::error!("[CORE] {}", err);
        log::error!("[CORE] Fatal error, exiting");
        std::process::exit(1);
    }
}

async fn run(args: Args, config: Config) -> Result<()> {
    let source = Arc::new(FsSource::from_config(&config.commands, builtin::handlers()));

    let commands = CommandSet::new(Validator::new(config.permissions.clone())?);

    log::info!(
        "[CORE] Loading commands from `{}`",
        config.commands.directory.display()
    );

    let (loaded, failed) = commands.load_all(&*source).await?;

    match args.action {
        Action::Check => {
            println!("{} loaded, {} failed", loaded.len(), failed.len());

            for (locator, err) in &failed {
                println!("- {}: {}", locator, err);
            }

            if !failed.is_empty() {
                return Err(Error::msg("some definitions failed to load"));
            }
        }
        Action::Help { path } => {
            let text = match commands.find(&path) {
                Some((command, _)) => help::command(&command.serialize(), &args.prefix),
                None => {
                    let snapshots: Vec<CommandSnapshot> =
                        commands.list().iter().map(|c| c.serialize()).collect();
                    help::global(&snapshots, &args.prefix)
                }
            };

            print!("{}", text);
        }
        Action::Json => {
            let snapshots: Vec<CommandSnapshot> =
                commands.list().iter().map(|c| c.serialize()).collect();

            println!("{}", serde_json::to_string_pretty(&snapshots)?);
        }
        Action::Run { input } => {
            let (command, depth) = commands
                .find(&input)
                .ok_or_else(|| Error::NotFound(input.join(" ")))?;

            if !command.is_enabled() {
                println!("{}", command.disabled_message());
                return Ok(());
            }

            let ctx = Context::new(format!("{}{}", args.prefix, input.join(" ")))
                .args(&input[depth..]);

            let value = command.run(ctx).await?;
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        Action::Reload { path } => {
            let (command, depth) = commands
                .find(&path)
                .ok_or_else(|| Error::NotFound(path.join(" ")))?;

            if depth != path.len() {
                return Err(Error::NotFound(path.join(" ")));
            }

            let reloader = Reloader::new(source.clone(), source)
                .sweep_resource_dir(config.commands.sweep_resource_dir);

            let report = reloader.reload(&command).await?;

            println!("Reloaded {}", command.full_label());
            for locator in &report.refreshed {
                println!("~ {}", locator);
            }
            for locator in &report.evicted {
                println!("- {}", locator);
            }
        }
    }

    Ok(())
}
