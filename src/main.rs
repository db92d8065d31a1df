use clap::Parser;
use kv_keeper::config::cli::parse_params;
use kv_keeper::utils::error::ErrorCategory;
use kv_keeper::utils::{logger, validation::Validate};
use kv_keeper::{CliCommand, CliConfig, KeeperConfig, KeeperError, ModelRegistry};

fn main() {
    let cli = CliConfig::parse();

    // logging
    logger::init_cli_logger(cli.verbose);
    tracing::debug!("CLI config: {:?}", cli);

    if let Err(e) = run(&cli) {
        tracing::error!("❌ {} (Category: {:?})", e, e.category());
        eprintln!("❌ {}", e);
        eprintln!("💡 {}", e.recovery_suggestion());

        let exit_code = match e.category() {
            ErrorCategory::Configuration => 1,
            ErrorCategory::Registration => 2,
            ErrorCategory::KeyResolution => 3,
            ErrorCategory::Command | ErrorCategory::Store => 4,
        };
        std::process::exit(exit_code);
    }
}

fn run(cli: &CliConfig) -> Result<(), KeeperError> {
    tracing::info!("📁 Loading models from: {}", cli.config);
    let config = KeeperConfig::from_file(&cli.config)?;
    config.validate()?;

    let registry = config.build_registry(None)?;

    match &cli.command {
        CliCommand::Types => {
            for name in registry.model_types() {
                let commands = registry
                    .model_type(name)
                    .map(|entry| entry.commands().len())
                    .unwrap_or(0);
                println!("{:<16} {} commands", name, commands);
            }
        }
        CliCommand::Models => {
            for name in registry.model_names() {
                if let Some(definition) = registry.definition(name) {
                    println!(
                        "{:<24} {:<12} {}",
                        name,
                        definition.model_type(),
                        definition.template().raw()
                    );
                }
            }
        }
        CliCommand::Commands { model } => {
            let definition = lookup(&registry, model)?;
            let commands: Vec<&str> = definition.commands().iter().collect();
            println!("{}", commands.join(" "));
        }
        CliCommand::Render { model, params } => {
            let definition = lookup(&registry, model)?;
            let key = definition.key(parse_params(params))?;
            println!("{}", key);
        }
    }

    Ok(())
}

fn lookup<'r>(
    registry: &'r ModelRegistry,
    model: &str,
) -> Result<&'r std::sync::Arc<kv_keeper::ModelDefinition>, KeeperError> {
    registry
        .definition(model)
        .ok_or_else(|| KeeperError::ConfigError {
            message: format!("no model named `{}` in the configuration", model),
        })
}
