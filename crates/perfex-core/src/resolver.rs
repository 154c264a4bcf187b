//! Counter-object dependency resolution.
//!
//! Dependencies are computed once, when collectors are built, and only looked
//! up per scrape.

use std::collections::{BTreeMap, BTreeSet};

/// Maps collector names to the counter objects they read.
#[derive(Debug, Clone, Default)]
pub struct DependencyResolver {
    dependencies: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the dependencies of one collector, replacing earlier ones.
    pub fn insert(
        &mut self,
        collector: impl Into<String>,
        objects: impl IntoIterator<Item = String>,
    ) {
        self.dependencies
            .insert(collector.into(), objects.into_iter().collect());
    }

    pub fn dependencies_of(&self, collector: &str) -> Option<&BTreeSet<String>> {
        self.dependencies.get(collector)
    }

    /// Union of the counter objects needed by `enabled`.
    ///
    /// Unknown names and collectors without dependencies contribute nothing.
    pub fn resolve<S: AsRef<str>>(&self, enabled: &[S]) -> BTreeSet<String> {
        enabled
            .iter()
            .filter_map(|name| self.dependencies.get(name.as_ref()))
            .flatten()
            .cloned()
            .collect()
    }

    /// Space-separated, sorted serialization of [`resolve`](Self::resolve).
    pub fn query<S: AsRef<str>>(&self, enabled: &[S]) -> String {
        self.resolve(enabled)
            .into_iter()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> DependencyResolver {
        let mut r = DependencyResolver::new();
        r.insert("net", vec!["Network Interface".to_string()]);
        r.insert(
            "dfsr",
            vec![
                "DFS Replication Connections".to_string(),
                "DFS Replicated Folders".to_string(),
            ],
        );
        r.insert("textfile", Vec::new());
        r.insert("nic2", vec!["Network Interface".to_string()]);
        r
    }

    #[test]
    fn test_resolve_union_is_deduplicated() {
        let set = resolver().resolve(&["net", "nic2"]);
        assert_eq!(set.len(), 1);
        assert!(set.contains("Network Interface"));
    }

    #[test]
    fn test_resolve_is_stable() {
        let r = resolver();
        let a = r.resolve(&["net", "dfsr"]);
        let b = r.resolve(&["dfsr", "net"]);
        assert_eq!(a, b);
        assert_eq!(a, r.resolve(&["net", "dfsr"]));
    }

    #[test]
    fn test_collector_without_dependencies_contributes_nothing() {
        let r = resolver();
        assert!(r.resolve(&["textfile"]).is_empty());
        assert_eq!(r.resolve(&["textfile", "net"]), r.resolve(&["net"]));
    }

    #[test]
    fn test_unknown_names_are_ignored() {
        assert!(resolver().resolve(&["nope"]).is_empty());
    }

    #[test]
    fn test_query_is_sorted() {
        assert_eq!(
            resolver().query(&["net", "dfsr"]),
            "DFS Replicated Folders DFS Replication Connections Network Interface"
        );
    }
}
