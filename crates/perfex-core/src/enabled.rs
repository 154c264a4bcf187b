//! Parsing of comma-separated collector lists.

use std::collections::BTreeSet;

/// Token in the enabled list that stands for [`DEFAULT_COLLECTORS`].
pub const DEFAULTS_PLACEHOLDER: &str = "[defaults]";

/// Collectors enabled when the operator does not choose.
pub const DEFAULT_COLLECTORS: &str = "net,msmq";

/// Splits a comma-separated list, dropping empty entries and duplicates.
///
/// The result is sorted so the same set always serializes the same way.
pub fn expand_child_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Expands the enabled-collectors flag into a sorted, deduplicated list.
///
/// Every occurrence of [`DEFAULTS_PLACEHOLDER`] is replaced by the default
/// collector list. Names are case-sensitive and not validated here; see
/// [`Registry::validate`](crate::registry::Registry::validate).
pub fn expand_enabled_collectors(enabled: &str) -> Vec<String> {
    let expanded: Vec<&str> = enabled
        .split(',')
        .map(str::trim)
        .flat_map(|name| {
            if name == DEFAULTS_PLACEHOLDER {
                DEFAULT_COLLECTORS.split(',').collect::<Vec<_>>()
            } else {
                vec![name]
            }
        })
        .collect();
    expand_child_list(&expanded.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> Vec<String> {
        let mut d: Vec<String> = DEFAULT_COLLECTORS.split(',').map(String::from).collect();
        d.sort();
        d
    }

    #[test]
    fn test_expand_empty() {
        assert!(expand_enabled_collectors("").is_empty());
        assert!(expand_enabled_collectors(",,").is_empty());
    }

    #[test]
    fn test_expand_plain_list() {
        assert_eq!(expand_enabled_collectors("cs,os"), vec!["cs", "os"]);
    }

    #[test]
    fn test_expand_deduplicates() {
        assert_eq!(
            expand_enabled_collectors("cs,cs"),
            expand_enabled_collectors("cs")
        );
    }

    #[test]
    fn test_expand_is_order_independent() {
        assert_eq!(
            expand_enabled_collectors("foo,bar"),
            expand_enabled_collectors("bar,foo")
        );
    }

    #[test]
    fn test_expand_placeholder() {
        assert_eq!(expand_enabled_collectors(DEFAULTS_PLACEHOLDER), defaults());
        let twice = format!("{DEFAULTS_PLACEHOLDER},{DEFAULTS_PLACEHOLDER}");
        assert_eq!(expand_enabled_collectors(&twice), defaults());
    }

    #[test]
    fn test_expand_placeholder_with_names() {
        let input = format!("foo,{DEFAULTS_PLACEHOLDER},bar");
        let mut expected = defaults();
        expected.push("foo".to_string());
        expected.push("bar".to_string());
        expected.sort();
        expected.dedup();

        assert_eq!(expand_enabled_collectors(&input), expected);
    }

    #[test]
    fn test_names_are_case_sensitive() {
        assert_eq!(expand_enabled_collectors("Net,net"), vec!["Net", "net"]);
    }

    #[test]
    fn test_child_list() {
        assert_eq!(
            expand_child_list("volume,connection,,volume"),
            vec!["connection", "volume"]
        );
    }
}
