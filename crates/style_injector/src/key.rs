//! Logical stylesheet identity.

use core::fmt;
use dom::{Document, NodeKey};

/// Marker attribute of the main runtime stylesheet.
pub const RUNTIME_ATTR: &str = "runtime";
/// Marker attribute of extension stylesheets; its value is the extension name.
pub const EXTENSION_ATTR: &str = "extension";
/// Extension names that never dedupe and are tagged free-form.
pub const UNCACHED_EXTENSIONS: [&str; 2] = ["custom", "keyframes"];

/// Caller-independent identity used to deduplicate stylesheets within a root.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum StyleKey {
    Runtime,
    Extension(String),
}

impl StyleKey {
    /// Derive the logical key of a stylesheet; `None` means every install creates a new node.
    pub fn resolve(is_runtime: bool, extension: Option<&str>) -> Option<Self> {
        if is_runtime {
            return Some(Self::Runtime);
        }
        extension
            .filter(|name| !name.is_empty() && !UNCACHED_EXTENSIONS.contains(name))
            .map(|name| Self::Extension(name.to_owned()))
    }

    /// Attribute name and value the owning style node is tagged with.
    pub fn marker(&self) -> (&'static str, &str) {
        match self {
            Self::Runtime => (RUNTIME_ATTR, ""),
            Self::Extension(name) => (EXTENSION_ATTR, name.as_str()),
        }
    }

    /// Whether `node` is a style element carrying this key's marker.
    pub fn is_marked(&self, document: &Document, node: NodeKey) -> bool {
        if document.tag_name(node) != Some("style") {
            return false;
        }
        match self {
            Self::Runtime => document.has_attribute(node, RUNTIME_ATTR),
            Self::Extension(name) => document.attribute(node, EXTENSION_ATTR) == Some(name.as_str()),
        }
    }
}

impl fmt::Display for StyleKey {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Runtime => formatter.write_str(RUNTIME_ATTR),
            Self::Extension(name) => write!(formatter, "{EXTENSION_ATTR}={name}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_wins_over_extension_name() {
        assert_eq!(StyleKey::resolve(true, Some("foo")), Some(StyleKey::Runtime));
    }

    #[test]
    fn reserved_extensions_are_uncached() {
        assert_eq!(StyleKey::resolve(false, Some("custom")), None);
        assert_eq!(StyleKey::resolve(false, Some("keyframes")), None);
        assert_eq!(StyleKey::resolve(false, None), None);
    }

    #[test]
    fn empty_extension_name_is_uncached() {
        assert_eq!(StyleKey::resolve(false, Some("")), None);
    }

    #[test]
    fn display_matches_logical_key() {
        assert_eq!(StyleKey::Runtime.to_string(), "runtime");
        assert_eq!(StyleKey::Extension("foo".into()).to_string(), "extension=foo");
    }
}
