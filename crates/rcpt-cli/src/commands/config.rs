//! Config command - inspect and create configuration files.

use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use console::style;
use serde_json::Value;

use rcpt_core::RcptConfig;

use super::default_config_path;

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the effective configuration as JSON
    Show,

    /// Write the default configuration to a file
    Init(InitArgs),

    /// Print one value, addressed by a dotted path (e.g. "limits.max_items")
    Get {
        key: String,
    },

    /// Show which configuration file is in effect
    Path,
}

#[derive(Args)]
struct InitArgs {
    /// Output path for configuration file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Overwrite existing file
    #[arg(long)]
    force: bool,
}

/// Where the effective configuration comes from.
enum Source {
    File(PathBuf),
    Defaults,
}

impl Source {
    /// `--config` if given, else the default file when it exists.
    fn resolve(config_path: Option<&str>) -> Self {
        match config_path {
            Some(path) => Source::File(PathBuf::from(path)),
            None => {
                let default_path = default_config_path();
                if default_path.exists() {
                    Source::File(default_path)
                } else {
                    Source::Defaults
                }
            }
        }
    }

    fn load(&self) -> anyhow::Result<RcptConfig> {
        match self {
            Source::File(path) => Ok(RcptConfig::from_file(path)?),
            Source::Defaults => Ok(RcptConfig::default()),
        }
    }
}

pub fn run(args: ConfigArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let source = Source::resolve(config_path);

    match args.command {
        ConfigCommand::Show => {
            if let Source::Defaults = source {
                eprintln!("{} No config file found, showing defaults.", style("ℹ").blue());
            }
            println!("{}", serde_json::to_string_pretty(&source.load()?)?);
            Ok(())
        }
        ConfigCommand::Init(init_args) => init_config(init_args),
        ConfigCommand::Get { key } => {
            let config = serde_json::to_value(source.load()?)?;
            let value = lookup(&config, &key)
                .ok_or_else(|| anyhow::anyhow!("Configuration key not found: {}", key))?;
            println!("{}", serde_json::to_string_pretty(value)?);
            Ok(())
        }
        ConfigCommand::Path => {
            match &source {
                Source::File(path) => println!("Active configuration: {}", path.display()),
                Source::Defaults => println!(
                    "Active configuration: built-in defaults ({} not created; run 'rcpt config init')",
                    default_config_path().display()
                ),
            }
            Ok(())
        }
    }
}

/// Follow a dotted path through objects and arrays (numeric segments index arrays).
fn lookup<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    key.split('.').try_fold(value, |current, part| match current {
        Value::Array(items) => part.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => current.get(part),
    })
}

fn init_config(args: InitArgs) -> anyhow::Result<()> {
    let path = args.output.unwrap_or_else(default_config_path);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let file = open_for_init(&path, args.force).map_err(|e| match e.kind() {
        ErrorKind::AlreadyExists => anyhow::anyhow!(
            "Config file already exists at {}. Use --force to overwrite.",
            path.display()
        ),
        _ => e.into(),
    })?;
    serde_json::to_writer_pretty(file, &RcptConfig::default())?;

    println!(
        "{} Created configuration file at {}",
        style("✓").green(),
        path.display()
    );
    Ok(())
}

fn open_for_init(path: &Path, force: bool) -> std::io::Result<fs::File> {
    let mut options = OpenOptions::new();
    options.write(true);
    if force {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }
    options.open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_dotted_path() {
        let value = json!({ "limits": { "max_items": 200 }, "categories": [{ "category": "coffee" }] });

        assert_eq!(lookup(&value, "limits.max_items"), Some(&json!(200)));
        assert_eq!(lookup(&value, "categories.0.category"), Some(&json!("coffee")));
        assert_eq!(lookup(&value, "categories.5"), None);
        assert_eq!(lookup(&value, "limits.missing"), None);
    }

    #[test]
    fn test_explicit_path_wins() {
        match Source::resolve(Some("/tmp/custom.json")) {
            Source::File(path) => assert_eq!(path, PathBuf::from("/tmp/custom.json")),
            Source::Defaults => panic!("explicit path ignored"),
        }
    }
}
