use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Error, Result};

/// Address of a participant on the hub, written `name@domain/instance`.
///
/// Every part is optional on its own, but an address must carry at least a
/// name or a domain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Node {
    pub name: Option<String>,
    pub domain: Option<String>,
    pub instance: Option<String>,
}

impl Node {
    pub fn new(name: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            domain: Some(domain.into()),
            instance: None,
        }
    }

    #[must_use]
    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    /// The same address without the instance part.
    #[must_use]
    pub fn to_identity(&self) -> Self {
        Self {
            name: self.name.clone(),
            domain: self.domain.clone(),
            instance: None,
        }
    }

    /// `name@domain`, the key used when tracking per-sender state.
    pub fn identity(&self) -> String {
        self.to_identity().to_string()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            f.write_str(name)?;
            if self.domain.is_some() {
                f.write_str("@")?;
            }
        }
        if let Some(domain) = &self.domain {
            f.write_str(domain)?;
        }
        if let Some(instance) = &self.instance {
            write!(f, "/{instance}")?;
        }
        Ok(())
    }
}

impl FromStr for Node {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        let invalid = || Error::InvalidNode {
            value: value.to_string(),
        };
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(invalid());
        }

        let (identity, instance) = match trimmed.split_once('/') {
            Some((identity, instance)) => (identity, non_empty(instance)),
            None => (trimmed, None),
        };
        let (name, domain) = match identity.split_once('@') {
            Some((name, domain)) => (non_empty(name), non_empty(domain)),
            None => (None, non_empty(identity)),
        };
        if name.is_none() && domain.is_none() {
            return Err(invalid());
        }

        Ok(Self {
            name,
            domain,
            instance,
        })
    }
}

fn non_empty(part: &str) -> Option<String> {
    (!part.is_empty()).then(|| part.to_string())
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("alice@msging.net", Some("alice"), Some("msging.net"), None)]
    #[case("alice@msging.net/home", Some("alice"), Some("msging.net"), Some("home"))]
    #[case("postmaster.msging.net", None, Some("postmaster.msging.net"), None)]
    #[case("msging.net/node1", None, Some("msging.net"), Some("node1"))]
    fn parses_addresses(
        #[case] raw: &str,
        #[case] name: Option<&str>,
        #[case] domain: Option<&str>,
        #[case] instance: Option<&str>,
    ) {
        let node: Node = raw.parse().unwrap();
        assert_eq!(node.name.as_deref(), name);
        assert_eq!(node.domain.as_deref(), domain);
        assert_eq!(node.instance.as_deref(), instance);
        assert_eq!(node.to_string(), raw);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("@/home")]
    fn rejects_empty_addresses(#[case] raw: &str) {
        assert!(matches!(
            raw.parse::<Node>(),
            Err(Error::InvalidNode { .. })
        ));
    }

    #[test]
    fn identity_drops_instance() {
        let node = Node::new("bob", "msging.net").with_instance("phone");
        assert_eq!(node.identity(), "bob@msging.net");
    }

    #[test]
    fn serde_uses_string_form() {
        let node = Node::new("bob", "msging.net");
        let json = serde_json::to_string(&node).unwrap();
        assert_eq!(json, "\"bob@msging.net\"");
        let back: Node = serde_json::from_str(&json).unwrap();
        assert_eq!(back, node);
    }
}
