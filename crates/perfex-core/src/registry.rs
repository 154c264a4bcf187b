//! Catalog of available collectors.
//!
//! The registry is an ordinary value: built at startup, filled with
//! [`CollectorDescriptor`]s, and handed to whoever needs it. It is never
//! mutated once scrapes are being served.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::collector::{Collector, dfsr, msmq, net};
use crate::config::{CollectorSettings, ConfigError, ConfigOption};

#[derive(Debug, Error)]
pub enum RegistryError {
    /// Two descriptors share a name. A programming error, fatal at startup.
    #[error("collector {0:?} is already registered")]
    DuplicateCollector(String),
    #[error("unknown collector {name:?} (available: {available})")]
    UnknownCollector { name: String, available: String },
    /// The collector refused its configuration.
    #[error("collector {collector:?}: {source}")]
    Config {
        collector: String,
        #[source]
        source: ConfigError,
    },
}

type BuildFn =
    Box<dyn Fn(&CollectorSettings) -> Result<Box<dyn Collector>, ConfigError> + Send + Sync>;

/// Registration record of one collector.
pub struct CollectorDescriptor {
    name: String,
    options: &'static [ConfigOption],
    dependencies: &'static [&'static str],
    build: BuildFn,
}

impl CollectorDescriptor {
    /// `build` validates settings and constructs the collector.
    pub fn new<F>(name: impl Into<String>, build: F) -> Self
    where
        F: Fn(&CollectorSettings) -> Result<Box<dyn Collector>, ConfigError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            options: &[],
            dependencies: &[],
            build: Box::new(build),
        }
    }

    /// Declares the collector's configuration options.
    pub fn with_options(mut self, options: &'static [ConfigOption]) -> Self {
        self.options = options;
        self
    }

    /// Declares the counter objects the collector reads.
    pub fn with_dependencies(mut self, dependencies: &'static [&'static str]) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &'static [ConfigOption] {
        self.options
    }

    pub fn dependencies(&self) -> &'static [&'static str] {
        self.dependencies
    }
}

impl fmt::Debug for CollectorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectorDescriptor")
            .field("name", &self.name)
            .field("options", &self.options)
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}

/// A collector built from its descriptor, with its resolved dependencies.
pub struct BuiltCollector {
    pub name: String,
    pub collector: Box<dyn Collector>,
    pub dependencies: Vec<String>,
}

/// Name → descriptor catalog.
#[derive(Debug, Default)]
pub struct Registry {
    descriptors: BTreeMap<String, CollectorDescriptor>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with all bundled collectors.
    pub fn with_builtin() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        registry.register(net::descriptor())?;
        registry.register(dfsr::descriptor())?;
        registry.register(msmq::descriptor())?;
        Ok(registry)
    }

    /// Adds a descriptor. Names are case-sensitive and must be unique.
    pub fn register(&mut self, descriptor: CollectorDescriptor) -> Result<(), RegistryError> {
        if self.descriptors.contains_key(&descriptor.name) {
            return Err(RegistryError::DuplicateCollector(descriptor.name));
        }
        self.descriptors.insert(descriptor.name.clone(), descriptor);
        Ok(())
    }

    /// All registered names, sorted.
    pub fn available(&self) -> Vec<&str> {
        self.descriptors.keys().map(String::as_str).collect()
    }

    pub fn descriptor(&self, name: &str) -> Result<&CollectorDescriptor, RegistryError> {
        self.descriptors.get(name).ok_or_else(|| self.unknown(name))
    }

    /// Options of every registered collector, for flag registration.
    pub fn options(&self) -> impl Iterator<Item = &'static ConfigOption> + '_ {
        self.descriptors.values().flat_map(|d| d.options.iter())
    }

    /// Rejects the first name that is not registered.
    pub fn validate<S: AsRef<str>>(&self, names: &[S]) -> Result<(), RegistryError> {
        match names
            .iter()
            .find(|n| !self.descriptors.contains_key(n.as_ref()))
        {
            Some(name) => Err(self.unknown(name.as_ref())),
            None => Ok(()),
        }
    }

    /// Builds the named collector with `settings`.
    ///
    /// Configuration errors from the collector come back unchanged inside
    /// [`RegistryError::Config`].
    pub fn build(
        &self,
        name: &str,
        settings: &CollectorSettings,
    ) -> Result<BuiltCollector, RegistryError> {
        let descriptor = self.descriptor(name)?;
        let collector = (descriptor.build)(settings).map_err(|source| RegistryError::Config {
            collector: name.to_string(),
            source,
        })?;
        let dependencies = collector.dependencies(descriptor.dependencies);
        Ok(BuiltCollector {
            name: name.to_string(),
            collector,
            dependencies,
        })
    }

    fn unknown(&self, name: &str) -> RegistryError {
        RegistryError::UnknownCollector {
            name: name.to_string(),
            available: self.available().join(", "),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::CollectError;
    use crate::context::ScrapeContext;
    use crate::metric::MetricSink;
    use std::collections::HashMap;

    struct Noop;

    impl Collector for Noop {
        fn collect(&self, _: &ScrapeContext, _: &dyn MetricSink) -> Result<(), CollectError> {
            Ok(())
        }
    }

    fn noop(name: &str) -> CollectorDescriptor {
        CollectorDescriptor::new(name, |_| Ok(Box::new(Noop) as Box<dyn Collector>))
            .with_dependencies(&["Processor"])
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = Registry::new();
        registry.register(noop("cpu")).unwrap();
        let err = registry.register(noop("cpu")).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateCollector(name) if name == "cpu"));
        assert_eq!(registry.available(), vec!["cpu"]);
    }

    #[test]
    fn test_names_are_case_sensitive() {
        let mut registry = Registry::new();
        registry.register(noop("cpu")).unwrap();
        registry.register(noop("CPU")).unwrap();
        assert_eq!(registry.available().len(), 2);
    }

    #[test]
    fn test_build_unknown() {
        let registry = Registry::new();
        let err = registry
            .build("nope", &CollectorSettings::default())
            .err()
            .unwrap();
        assert!(matches!(err, RegistryError::UnknownCollector { .. }));
    }

    #[test]
    fn test_build_resolves_declared_dependencies() {
        let mut registry = Registry::new();
        registry.register(noop("cpu")).unwrap();
        let built = registry.build("cpu", &CollectorSettings::default()).unwrap();
        assert_eq!(built.dependencies, vec!["Processor".to_string()]);
    }

    #[test]
    fn test_builder_error_propagates() {
        let mut registry = Registry::new();
        registry
            .register(CollectorDescriptor::new("strict", |_| {
                Err(ConfigError::InvalidValue {
                    option: "x".into(),
                    value: "y".into(),
                    reason: "nope".into(),
                })
            }))
            .unwrap();

        let err = registry
            .build("strict", &CollectorSettings::default())
            .err()
            .unwrap();
        assert!(matches!(
            err,
            RegistryError::Config { ref collector, source: ConfigError::InvalidValue { .. } }
                if collector == "strict"
        ));
    }

    #[test]
    fn test_validate_lists_available() {
        let registry = Registry::with_builtin().unwrap();
        registry.validate(&["net", "dfsr"]).unwrap();

        let err = registry.validate(&["net", "bogus"]).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("bogus"));
        assert!(msg.contains("dfsr, msmq, net"));
    }

    #[test]
    fn test_builtin_registry() {
        let registry = Registry::with_builtin().unwrap();
        assert_eq!(registry.available(), vec!["dfsr", "msmq", "net"]);
        assert!(registry.options().count() >= 4);

        let options = registry.descriptor("net").unwrap().options();
        let settings = CollectorSettings::from_map(options, &HashMap::new());
        let built = registry.build("net", &settings).unwrap();
        assert_eq!(built.dependencies, vec!["Network Interface".to_string()]);
    }
}
