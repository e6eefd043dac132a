use std::collections::{HashMap, HashSet};

use anyhow::Result;

use crate::{config::Config, error::Error};

/// Parent/child relations between configured devices.
///
/// A parent only remembers one child: when several devices name the same
/// parent, the last one declared wins.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DependencyGraph {
    parents: HashMap<String, String>,
    children: HashMap<String, String>,
}

impl DependencyGraph {
    pub fn build(config: &Config) -> Self {
        let mut graph = Self::default();
        for (name, device) in config.devices() {
            if let Some(parent) = &device.parent {
                graph.children.insert(parent.to_owned(), name.to_owned());
                graph.parents.insert(name.to_owned(), parent.to_owned());
            }
        }
        graph
    }

    pub fn parent_of(&self, name: &str) -> Option<&str> {
        self.parents.get(name).map(String::as_str)
    }

    pub fn child_of(&self, name: &str) -> Option<&str> {
        self.children.get(name).map(String::as_str)
    }

    /// Devices to mount for `name`, outermost ancestor first and `name` last.
    pub fn mount_order(&self, name: &str) -> Result<Vec<String>> {
        let mut order = self.walk(name, |name| self.parent_of(name))?;
        order.reverse();
        Ok(order)
    }

    /// Devices to unmount for `name`, innermost descendant first and `name` last.
    pub fn unmount_order(&self, name: &str) -> Result<Vec<String>> {
        let mut order = self.walk(name, |name| self.child_of(name))?;
        order.reverse();
        Ok(order)
    }

    fn walk<'a>(
        &'a self,
        name: &'a str,
        next: impl Fn(&str) -> Option<&'a str>,
    ) -> Result<Vec<String>> {
        let mut seen = HashSet::new();
        let mut chain = vec![];
        let mut current = Some(name);
        while let Some(name) = current {
            if !seen.insert(name) {
                Err(Error::Config(format!(
                    "dependency cycle through device `{name}`"
                )))?
            }
            chain.push(name.to_owned());
            current = next(name);
        }
        Ok(chain)
    }
}

#[cfg(test)]
pub mod tests {
    use anyhow::Result;

    use super::*;

    fn graph(raw: &str) -> DependencyGraph {
        DependencyGraph::build(&Config::from_toml(raw).unwrap())
    }

    #[test]
    fn test_chain_order() -> Result<()> {
        let graph = graph(
            r#"
            [devices.disk]
            [devices.crypt]
            parent = "disk"
            [devices.data]
            parent = "crypt"
            [devices.other]
            "#,
        );

        assert_eq!(graph.parent_of("data"), Some("crypt"));
        assert_eq!(graph.child_of("disk"), Some("crypt"));
        assert_eq!(graph.parent_of("disk"), None);

        assert_eq!(graph.mount_order("data")?, vec!["disk", "crypt", "data"]);
        assert_eq!(graph.mount_order("disk")?, vec!["disk"]);
        assert_eq!(graph.unmount_order("disk")?, vec!["data", "crypt", "disk"]);
        assert_eq!(graph.unmount_order("data")?, vec!["data"]);
        assert_eq!(graph.mount_order("other")?, vec!["other"]);
        Ok(())
    }

    #[test]
    fn test_last_child_wins() {
        let graph = graph(
            r#"
            [devices.crypt]
            [devices.first]
            parent = "crypt"
            [devices.second]
            parent = "crypt"
            "#,
        );
        assert_eq!(graph.child_of("crypt"), Some("second"));
        assert_eq!(graph.parent_of("first"), Some("crypt"));
    }

    #[test]
    fn test_templates_are_skipped() {
        let graph = graph(
            r#"
            [devices.crypt]
            [devices._nested]
            parent = "crypt"
            "#,
        );
        assert_eq!(graph.child_of("crypt"), None);
    }

    #[test]
    fn test_cycle_is_detected() {
        let graph = DependencyGraph {
            parents: HashMap::from([
                ("a".to_owned(), "b".to_owned()),
                ("b".to_owned(), "a".to_owned()),
            ]),
            children: HashMap::new(),
        };
        assert!(graph.mount_order("a").is_err());
    }
}
