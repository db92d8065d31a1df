use crate::domain::model::KeyParams;
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Parser)]
#[command(name = "kv-keeper")]
#[command(about = "Inspect key-value models declared in a TOML file")]
pub struct CliConfig {
    /// Path to the model configuration file
    #[arg(short, long, default_value = "keeper.toml")]
    pub config: String,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Clone, Subcommand)]
pub enum CliCommand {
    /// List the registered storage types
    Types,
    /// List the registered models with their key patterns
    Models,
    /// Show the commands a model's accessors expose
    Commands { model: String },
    /// Render a model key: `name=value` pairs, or positional values
    Render {
        model: String,
        params: Vec<String>,
    },
}

/// Turn command-line values into key parameters.
///
/// All `name=value` pairs give a keyed aggregate; otherwise the values are
/// positional, and a single value is passed as a scalar. Numeric text
/// becomes a number.
pub fn parse_params(raw: &[String]) -> KeyParams {
    match raw {
        [] => KeyParams::Empty,
        _ if raw.iter().all(|p| p.contains('=')) => {
            let mut map = Map::new();
            for pair in raw {
                if let Some((name, value)) = pair.split_once('=') {
                    map.insert(name.to_string(), parse_value(value));
                }
            }
            KeyParams::Map(map)
        }
        [single] => KeyParams::Scalar(parse_value(single)),
        _ => KeyParams::List(raw.iter().map(|p| parse_value(p)).collect()),
    }
}

fn parse_value(raw: &str) -> Value {
    if let Ok(n) = raw.parse::<i64>() {
        return Value::from(n);
    }
    match raw.parse::<f64>() {
        Ok(f) if f.is_finite() => Value::from(f),
        _ => Value::String(raw.to_string()),
    }
}
