//! Command line interface definition using clap.
//!
//! This module defines the [`Cli`] structure, its subcommands, and the
//! configuration merge that layers defaults, discovered configuration files,
//! `TRANSMARK_*` environment variables and explicit flags.

use clap::parser::ValueSource;
use clap::{ArgMatches, Args, CommandFactory, FromArgMatches, Parser, Subcommand};
use ortho_config::declarative::LayerComposition;
use ortho_config::figment::{Figment, providers::Env};
use ortho_config::uncased::Uncased;
use ortho_config::{
    ConfigDiscovery, MergeComposer, OrthoConfig, OrthoMergeExt, OrthoResult, sanitize_value,
};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;

use crate::record::DEFAULT_DOMAIN;

mod parsing;

pub use parsing::{parse_variable, split_dependency};
use parsing::{parse_dependency, parse_exclude, parse_locale};

const CONFIG_ENV_VAR: &str = "TRANSMARK_CONFIG_PATH";
const ENV_PREFIX: &str = "TRANSMARK_";
const DEFAULT_OUTPUT_DIR: &str = "translations";

/// Extract translatable messages from Rust sources and inspect their identities.
#[derive(Debug, Parser, Serialize, Deserialize, OrthoConfig)]
#[command(author, version, about, long_about = None)]
#[ortho_config(prefix = "TRANSMARK")]
pub struct Cli {
    /// Run as if started in this directory.
    ///
    /// This affects source roots, the output directory, and config discovery.
    #[arg(short = 'C', long, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Directory that receives one `<domain>.json` catalog per domain.
    #[arg(short, long, value_name = "DIR", default_value = DEFAULT_OUTPUT_DIR)]
    #[ortho_config(default = default_output_dir())]
    pub output: PathBuf,

    /// Source tree to scan; defaults to the working directory.
    #[arg(short, long, value_name = "DIR")]
    #[ortho_config(merge_strategy = "append")]
    pub root: Vec<PathBuf>,

    /// Dependency source tree whose messages join the catalog.
    #[arg(short, long, value_name = "NAME=PATH", value_parser = parse_dependency)]
    #[ortho_config(merge_strategy = "append")]
    pub dependency: Vec<String>,

    /// Glob of root-relative paths to skip, for example `tests/**`.
    #[arg(short = 'x', long, value_name = "GLOB", value_parser = parse_exclude)]
    #[ortho_config(merge_strategy = "append")]
    pub exclude: Vec<String>,

    /// Locale tag used when rendering (for example: en-US, it-IT).
    #[arg(long, value_name = "LOCALE", value_parser = parse_locale)]
    pub locale: Option<String>,

    /// Treat variable consistency warnings as errors.
    #[arg(long)]
    #[ortho_config(default = false)]
    pub strict: bool,

    /// Enable verbose diagnostic logging.
    #[arg(short, long)]
    #[ortho_config(default = false)]
    pub verbose: bool,

    /// Optional subcommand to execute; defaults to `extract` when omitted.
    ///
    /// `OrthoConfig` merging ignores this field; CLI parsing supplies it.
    #[serde(skip)]
    #[command(subcommand)]
    #[ortho_config(skip_cli)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Apply the default command if none was specified.
    #[must_use]
    pub fn with_default_command(mut self) -> Self {
        if self.command.is_none() {
            self.command = Some(Commands::Extract);
        }
        self
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            directory: None,
            output: default_output_dir(),
            root: Vec::new(),
            dependency: Vec::new(),
            exclude: Vec::new(),
            locale: None,
            strict: false,
            verbose: false,
            command: None,
        }
        .with_default_command()
    }
}

/// The message triple accepted by `id` and `render`.
#[derive(Debug, Args, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct MessageArgs {
    /// Source text exactly as written in the marking macro.
    #[arg(value_name = "TEXT")]
    pub text: String,

    /// Message domain.
    #[arg(long, default_value = DEFAULT_DOMAIN)]
    pub domain: String,

    /// Disambiguating context.
    #[arg(long, default_value = "")]
    pub context: String,
}

/// Arguments accepted by the `render` command.
#[derive(Debug, Args, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct RenderArgs {
    /// Message to render.
    #[command(flatten)]
    pub message: MessageArgs,

    /// Placeholder value; integers and `YYYY-MM-DD` dates are detected.
    #[arg(long = "var", value_name = "NAME=VALUE")]
    pub vars: Vec<String>,
}

/// Available top-level commands.
#[derive(Debug, Subcommand, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Commands {
    /// Scan the source roots and write the catalog.
    Extract,

    /// Print the identity of a message.
    Id(MessageArgs),

    /// Render a message's source text with placeholder values.
    Render(RenderArgs),
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

/// Parse CLI arguments.
///
/// Returns both the parsed CLI struct and the `ArgMatches` required for
/// configuration merging.
///
/// # Errors
///
/// Returns a `clap::Error` when parsing fails.
pub fn parse_from<I, T>(iter: I) -> Result<(Cli, ArgMatches), clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let mut command = Cli::command();
    let matches = command.try_get_matches_from_mut(iter)?;
    // Clone matches before from_arg_matches_mut consumes the values.
    let matches_for_merge = matches.clone();
    let mut matches_for_parse = matches;
    let cli = Cli::from_arg_matches_mut(&mut matches_for_parse)
        .map_err(|clap_err| clap_err.with_cmd(&command))?;
    Ok((cli.with_default_command(), matches_for_merge))
}

/// Return the prefixed environment provider for CLI configuration.
fn env_provider() -> Env {
    Env::prefixed(ENV_PREFIX)
}

/// Build configuration discovery rooted in the optional working directory.
fn config_discovery(directory: Option<&PathBuf>) -> ConfigDiscovery {
    let mut builder = ConfigDiscovery::builder("transmark").env_var(CONFIG_ENV_VAR);
    if let Some(dir) = directory {
        builder = builder.clear_project_roots().add_project_root(dir);
    }
    builder.build()
}

/// Return `true` when no CLI overrides were supplied.
///
/// The merge pipeline treats an empty JSON object as "no overrides".
fn is_empty_value(value: &serde_json::Value) -> bool {
    matches!(value, serde_json::Value::Object(map) if map.is_empty())
}

fn cli_overrides_from_matches(cli: &Cli, matches: &ArgMatches) -> OrthoResult<serde_json::Value> {
    let value = sanitize_value(cli)?;
    let mut map = match value {
        serde_json::Value::Object(map) => map,
        other => {
            return Err(Arc::new(ortho_config::OrthoError::Validation {
                key: String::from("cli"),
                message: format!(
                    "expected parsed CLI values to serialize to an object, got {other:?}"
                ),
            }));
        }
    };

    map.remove("command");
    for field in ["output", "root", "dependency", "exclude", "strict", "verbose"] {
        if matches.value_source(field) != Some(ValueSource::CommandLine) {
            map.remove(field);
        }
    }

    Ok(serde_json::Value::Object(map))
}

/// Merge configuration layers over the parsed CLI values.
///
/// # Errors
///
/// Returns an [`ortho_config::OrthoError`] if layer composition or merging
/// fails.
pub fn merge_with_config(cli: &Cli, matches: &ArgMatches) -> OrthoResult<Cli> {
    let command = cli.command.clone();
    let mut errors = Vec::new();
    let mut composer = MergeComposer::with_capacity(4);

    match sanitize_value(&Cli::default()) {
        Ok(value) => composer.push_defaults(value),
        Err(err) => errors.push(err),
    }

    let discovery = config_discovery(cli.directory.as_ref());
    let mut file_layers = discovery.compose_layers();
    errors.append(&mut file_layers.required_errors);
    if file_layers.value.is_empty() {
        errors.append(&mut file_layers.optional_errors);
    }
    for layer in file_layers.value {
        composer.push_layer(layer);
    }

    let env_provider = env_provider()
        .map(|key| Uncased::new(key.as_str().to_ascii_uppercase()))
        .split("__");
    match Figment::from(env_provider)
        .extract::<serde_json::Value>()
        .into_ortho_merge()
    {
        Ok(value) => composer.push_environment(value),
        Err(err) => errors.push(err),
    }

    match cli_overrides_from_matches(cli, matches) {
        Ok(value) if !is_empty_value(&value) => composer.push_cli(value),
        Ok(_) => {}
        Err(err) => errors.push(err),
    }

    let composition = LayerComposition::new(composer.layers(), errors);
    let mut merged = composition.into_merge_result(Cli::merge_from_layers)?;
    merged.command = command;
    Ok(merged)
}
