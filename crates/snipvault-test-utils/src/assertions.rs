//! Assertion helpers comparing stored snippets with their input.

use snipvault_core::{Snippet, SnippetInput};

/// Assert that a snippet holds exactly the metadata and files of `input`.
pub fn assert_snippet_matches(snippet: &Snippet, input: &SnippetInput) {
    assert_eq!(snippet.title, input.title, "title differs");
    assert_eq!(snippet.description, input.description, "description differs");
    assert_eq!(snippet.tags, input.tags, "tags differ");
    assert_eq!(snippet.is_public, input.is_public, "visibility differs");

    let expected: Vec<_> = input.files.iter().map(|f| f.to_file()).collect();
    assert_eq!(
        snippet.files, expected,
        "files of snippet {} differ from input",
        snippet.id
    );
}

/// Assert the file names of a snippet, in order.
pub fn assert_file_names(snippet: &Snippet, expected: &[&str]) {
    let actual: Vec<_> = snippet.files.iter().map(|f| f.filename.as_str()).collect();
    assert_eq!(
        actual, expected,
        "files of snippet {} differ",
        snippet.id
    );
}

/// Assert that a JSON body carries an error with the given code.
pub fn assert_error_code(body: &serde_json::Value, code: &str) {
    assert_eq!(
        body.get("code").and_then(|c| c.as_str()),
        Some(code),
        "unexpected error body: {body}"
    );
}
