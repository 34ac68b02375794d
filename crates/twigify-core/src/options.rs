//! Conversion options.

/// Settings shared by every document a [`Converter`](crate::Converter) handles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Extension of source templates, without the leading dot.
    pub source_extension: String,
    /// Extension of generated templates, without the leading dot.
    pub target_extension: String,
    /// Template imported as `macros` by documents that call macros.
    pub macro_library: String,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            source_extension: "mtt".to_owned(),
            target_extension: "twig".to_owned(),
            macro_library: "macros.html".to_owned(),
        }
    }
}

impl ConvertOptions {
    /// Set the source template extension.
    #[must_use]
    pub fn with_source_extension(mut self, extension: impl Into<String>) -> Self {
        self.source_extension = extension.into();
        self
    }

    /// Set the generated template extension.
    #[must_use]
    pub fn with_target_extension(mut self, extension: impl Into<String>) -> Self {
        self.target_extension = extension.into();
        self
    }

    /// Set the imported macro library.
    #[must_use]
    pub fn with_macro_library(mut self, library: impl Into<String>) -> Self {
        self.macro_library = library.into();
        self
    }
}
