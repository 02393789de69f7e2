//! Configuration for Go emission.

/// Configuration for Go emission.
#[derive(Clone, Debug)]
pub struct GenerateConfig {
    /// Name in the `package` clause
    pub(crate) package_name: String,
    /// One level of indentation
    pub(crate) indent: String,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            package_name: "main".to_string(),
            indent: "\t".to_string(),
        }
    }
}

impl GenerateConfig {
    /// Create a new GenerateConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the package name.
    pub fn package_name(mut self, value: impl Into<String>) -> Self {
        self.package_name = value.into();
        self
    }

    /// Set the indentation unit.
    pub fn indent(mut self, value: impl Into<String>) -> Self {
        self.indent = value.into();
        self
    }
}
