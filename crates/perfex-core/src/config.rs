//! Collector configuration binding.
//!
//! Each collector declares its options as [`ConfigOption`]s. Binding turns
//! them into [`ConfigInstance`]s from one of two sources:
//!
//! - a plain settings map (`"collector.net.nic-whitelist" → "eth.*"`), used
//!   when the exporter is embedded as a library or read from a config file;
//! - command-line flags registered on a clap `Command` (feature `cli`).
//!
//! Both paths share one resolution rule: an explicitly supplied value wins,
//! otherwise the option default applies. Bound settings are immutable.

use std::collections::HashMap;

use thiserror::Error;

/// Configuration problems detected before the first scrape.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {option}: {reason}")]
    InvalidValue {
        option: String,
        value: String,
        reason: String,
    },
    #[error("invalid pattern for {option}: {source}")]
    InvalidPattern {
        option: String,
        #[source]
        source: regex::Error,
    },
    #[error("unknown source {value:?} in {option}")]
    UnknownSource { option: String, value: String },
    #[error("config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("config file: {0}")]
    Io(#[from] std::io::Error),
}

/// A declared configuration option of a collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigOption {
    /// Dotted option name, also used as the long flag.
    pub name: &'static str,
    pub help: &'static str,
    pub default: &'static str,
}

/// An option bound to its resolved value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigInstance {
    pub option: ConfigOption,
    pub value: String,
    /// `true` when the value came from the user rather than the default.
    pub explicit: bool,
}

impl ConfigInstance {
    fn resolve(option: ConfigOption, supplied: Option<String>) -> Self {
        match supplied {
            Some(value) => Self {
                option,
                value,
                explicit: true,
            },
            None => Self {
                option,
                value: option.default.to_string(),
                explicit: false,
            },
        }
    }
}

/// Resolved configuration of one collector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectorSettings {
    instances: Vec<ConfigInstance>,
}

impl CollectorSettings {
    /// Binds `options` with `lookup` supplying explicit values.
    pub fn bind(options: &[ConfigOption], lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            instances: options
                .iter()
                .map(|opt| ConfigInstance::resolve(*opt, lookup(opt.name)))
                .collect(),
        }
    }

    /// Binds from a settings map. A missing key means "not supplied".
    pub fn from_map(options: &[ConfigOption], settings: &HashMap<String, String>) -> Self {
        Self::bind(options, |name| settings.get(name).cloned())
    }

    /// Resolved value of an option, `None` if the option was never declared.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.instance(name).map(|i| i.value.as_str())
    }

    /// Resolved value, or the empty string for undeclared options.
    pub fn value(&self, name: &str) -> &str {
        self.get(name).unwrap_or_default()
    }

    pub fn instance(&self, name: &str) -> Option<&ConfigInstance> {
        self.instances.iter().find(|i| i.option.name == name)
    }

    pub fn instances(&self) -> &[ConfigInstance] {
        &self.instances
    }
}

/// Flattens a nested YAML mapping into dotted keys.
///
/// ```
/// let map = perfex_core::config::flatten_yaml("collector:\n  net:\n    nic-whitelist: eth.*\n").unwrap();
/// assert_eq!(map["collector.net.nic-whitelist"], "eth.*");
/// ```
///
/// Sequences are joined with `,` so list-valued options such as
/// `collectors.enabled` can be written either way.
pub fn flatten_yaml(source: &str) -> Result<HashMap<String, String>, ConfigError> {
    let root: serde_yaml::Value = serde_yaml::from_str(source)?;
    let mut out = HashMap::new();
    flatten_value(&root, String::new(), &mut out);
    Ok(out)
}

fn flatten_value(value: &serde_yaml::Value, prefix: String, out: &mut HashMap<String, String>) {
    use serde_yaml::Value;

    match value {
        Value::Null => {}
        Value::Mapping(map) => {
            for (k, v) in map {
                let Some(key) = scalar_to_string(k) else {
                    continue;
                };
                let path = if prefix.is_empty() {
                    key
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_value(v, path, out);
            }
        }
        Value::Sequence(items) => {
            let joined: Vec<String> = items.iter().filter_map(scalar_to_string).collect();
            out.insert(prefix, joined.join(","));
        }
        Value::Tagged(tagged) => flatten_value(&tagged.value, prefix, out),
        scalar => {
            if let Some(s) = scalar_to_string(scalar) {
                out.insert(prefix, s);
            }
        }
    }
}

fn scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    use serde_yaml::Value;

    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Reads and flattens a YAML config file.
pub fn load_yaml_file(path: &std::path::Path) -> Result<HashMap<String, String>, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    flatten_yaml(&content)
}

#[cfg(feature = "cli")]
mod cli {
    use std::collections::HashMap;

    use clap::parser::ValueSource;
    use clap::{Arg, ArgAction, ArgMatches, Command};

    use super::{CollectorSettings, ConfigOption};

    /// Adds one `--<option.name>` flag per option.
    pub fn register_flags<'a>(
        mut cmd: Command,
        options: impl IntoIterator<Item = &'a ConfigOption>,
    ) -> Command {
        for opt in options {
            let mut arg = Arg::new(opt.name)
                .long(opt.name)
                .help(opt.help)
                .value_name("VALUE")
                .action(ArgAction::Set);
            if !opt.default.is_empty() {
                arg = arg.default_value(opt.default);
            }
            cmd = cmd.arg(arg);
        }
        cmd
    }

    /// Value of a flag the user actually passed (defaults do not count).
    fn explicit_flag(matches: &ArgMatches, name: &str) -> Option<String> {
        match matches.value_source(name) {
            Some(ValueSource::CommandLine) | Some(ValueSource::EnvVariable) => matches
                .try_get_one::<String>(name)
                .ok()
                .flatten()
                .cloned(),
            _ => None,
        }
    }

    impl CollectorSettings {
        /// Binds from parsed flags only.
        pub fn from_matches(options: &[ConfigOption], matches: &ArgMatches) -> Self {
            Self::bind(options, |name| explicit_flag(matches, name))
        }

        /// Binds from parsed flags, falling back to `file` for flags that were
        /// not given on the command line.
        pub fn from_matches_with_file(
            options: &[ConfigOption],
            matches: &ArgMatches,
            file: &HashMap<String, String>,
        ) -> Self {
            Self::bind(options, |name| {
                explicit_flag(matches, name).or_else(|| file.get(name).cloned())
            })
        }
    }
}

#[cfg(feature = "cli")]
pub use cli::register_flags;
