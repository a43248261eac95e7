//! Builder patterns for constructing test inputs.

use snipvault_core::{FileInput, SnippetInput};

/// Builder for snippet input.
///
/// # Example
///
/// ```rust
/// use snipvault_test_utils::builders::SnippetInputBuilder;
///
/// let input = SnippetInputBuilder::new("Quick sort")
///     .description("In place")
///     .tag("sorting")
///     .file("qsort.rs", "fn sort() {}")
///     .private()
///     .build();
///
/// assert_eq!(input.files.len(), 1);
/// assert!(!input.is_public);
/// ```
#[derive(Debug, Clone)]
pub struct SnippetInputBuilder {
    input: SnippetInput,
}

impl SnippetInputBuilder {
    /// Start a public snippet with a title and no files.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            input: SnippetInput {
                title: title.into(),
                description: String::new(),
                tags: Vec::new(),
                is_public: true,
                files: Vec::new(),
            },
        }
    }

    /// Start from an existing input, e.g. to build an update.
    pub fn from_input(input: SnippetInput) -> Self {
        Self { input }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.input.title = title.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.input.description = description.into();
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.input.tags.push(tag.into());
        self
    }

    pub fn private(mut self) -> Self {
        self.input.is_public = false;
        self
    }

    /// Add a file whose language is inferred from its name.
    pub fn file(mut self, filename: impl Into<String>, code: impl Into<String>) -> Self {
        self.input.files.push(FileInput::new(filename, code));
        self
    }

    /// Add a file with an explicit language.
    pub fn file_with_language(
        mut self,
        filename: impl Into<String>,
        language: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        self.input
            .files
            .push(FileInput::new(filename, code).with_language(language));
        self
    }

    /// Drop a file by name.
    pub fn without_file(mut self, filename: &str) -> Self {
        self.input.files.retain(|f| f.filename != filename);
        self
    }

    /// Replace the content of a file by name, adding it if absent.
    pub fn replace_file(mut self, filename: &str, code: impl Into<String>) -> Self {
        let code = code.into();
        match self.input.files.iter_mut().find(|f| f.filename == filename) {
            Some(file) => file.code = code,
            None => self.input.files.push(FileInput::new(filename, code)),
        }
        self
    }

    pub fn build(self) -> SnippetInput {
        self.input
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let input = SnippetInputBuilder::new("T").file("a.py", "").build();
        assert!(input.is_public);
        assert!(input.validate().is_ok());
        assert_eq!(input.files[0].resolved_language(), "python");
    }

    #[test]
    fn test_replace_and_remove_files() {
        let input = SnippetInputBuilder::new("T")
            .file("a.rs", "1")
            .file("b.rs", "2")
            .replace_file("b.rs", "3")
            .replace_file("c.rs", "4")
            .without_file("a.rs")
            .build();
        let files: Vec<_> = input
            .files
            .iter()
            .map(|f| (f.filename.as_str(), f.code.as_str()))
            .collect();
        assert_eq!(files, vec![("b.rs", "3"), ("c.rs", "4")]);
    }
}
