//! Logical paths inside a filesystem image.

use std::fmt;

/// A sequence of name components identifying an entry relative to a
/// traversal root.
///
/// A logical path is never a host path: it is derived from directory
/// enumeration and only turned into a destination path by the naming policy.
/// `Display` joins the components with `/` and renders the root as an empty
/// string.
///
/// # Examples
///
/// ```
/// use ext4cp_core::LogicalPath;
///
/// let etc = LogicalPath::root().join("etc");
/// let ssh = etc.join("ssh");
/// assert_eq!(ssh.to_string(), "etc/ssh");
/// assert_eq!(ssh.to_absolute(), "/etc/ssh");
/// assert_eq!(LogicalPath::root().to_absolute(), "/");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct LogicalPath {
    components: Vec<String>,
}

impl LogicalPath {
    /// The empty path naming the traversal root itself.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Builds a path from already-split components.
    #[must_use]
    pub fn from_components<I, S>(components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            components: components.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns a new path with `name` appended.
    #[must_use]
    pub fn join(&self, name: &str) -> Self {
        let mut components = Vec::with_capacity(self.components.len() + 1);
        components.extend(self.components.iter().cloned());
        components.push(name.to_string());
        Self { components }
    }

    /// Returns the components in order.
    #[must_use]
    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// Returns `true` for the traversal root.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.components.is_empty()
    }

    /// Number of components.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.components.len()
    }

    /// Joins the components with `separator`.
    #[must_use]
    pub fn join_with(&self, separator: &str) -> String {
        self.components.join(separator)
    }

    /// Renders the path with a leading `/`, as shown in diagnostics.
    #[must_use]
    pub fn to_absolute(&self) -> String {
        format!("/{}", self.components.join("/"))
    }
}

impl fmt::Display for LogicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.components.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root() {
        let root = LogicalPath::root();
        assert!(root.is_root());
        assert_eq!(root.depth(), 0);
        assert_eq!(root.to_string(), "");
    }

    #[test]
    fn test_join_does_not_mutate() {
        let base = LogicalPath::from_components(["usr", "lib"]);
        let child = base.join("firmware");
        assert_eq!(base.depth(), 2);
        assert_eq!(child.components(), ["usr", "lib", "firmware"]);
    }

    #[test]
    fn test_join_with_separator() {
        let path = LogicalPath::from_components(["a", "b", "c"]);
        assert_eq!(path.join_with("_"), "a_b_c");
        assert_eq!(path.to_absolute(), "/a/b/c");
    }
}
