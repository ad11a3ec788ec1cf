// src/notify/template.rs

//! Webhook URL templating.
//!
//! A template is a URL with `{name}` placeholders drawn from a fixed
//! vocabulary. Rendering is a single left-to-right scan: recognised tokens
//! are replaced, everything else (unknown tokens, stray braces) is copied
//! through untouched so operators can embed unrelated parameters.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::metadata::ProjectMetadata;

/// Characters escaped in substituted identifiers: everything except the
/// RFC 3986 unreserved set.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    ProjectCreated,
    ProjectCreatedBy,
    ProjectId,
    ProjectModified,
    ProjectModifiedBy,
    RepoId,
    TranslationsUpToDate,
}

impl Placeholder {
    pub const ALL: [Placeholder; 7] = [
        Placeholder::ProjectCreated,
        Placeholder::ProjectCreatedBy,
        Placeholder::ProjectId,
        Placeholder::ProjectModified,
        Placeholder::ProjectModifiedBy,
        Placeholder::RepoId,
        Placeholder::TranslationsUpToDate,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Placeholder::ProjectCreated => "project_created",
            Placeholder::ProjectCreatedBy => "project_created_by",
            Placeholder::ProjectId => "project_id",
            Placeholder::ProjectModified => "project_modified",
            Placeholder::ProjectModifiedBy => "project_modified_by",
            Placeholder::RepoId => "repo_id",
            Placeholder::TranslationsUpToDate => "translations_up_to_date",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    /// Wire representation of this placeholder for `metadata`.
    pub fn value(self, metadata: &ProjectMetadata) -> String {
        match self {
            Placeholder::ProjectCreated => metadata.created.to_string(),
            Placeholder::ProjectModified => metadata.modified.to_string(),
            Placeholder::ProjectCreatedBy => escape(&metadata.created_by),
            Placeholder::ProjectModifiedBy => {
                metadata.modified_by.as_deref().map(escape).unwrap_or_default()
            }
            Placeholder::ProjectId => escape(&metadata.project_id),
            Placeholder::RepoId => escape(&metadata.repo_id),
            Placeholder::TranslationsUpToDate => {
                let literal = if metadata.translations_up_to_date { "True" } else { "False" };
                literal.to_string()
            }
        }
    }
}

fn escape(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT).to_string()
}

/// Substitute every recognised placeholder in `template`.
pub fn render(template: &str, metadata: &ProjectMetadata) -> String {
    let mut out = String::with_capacity(template.len() + 32);
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let Some(close) = after.find(['{', '}']) else {
            // No closing brace anywhere: the remainder is literal.
            out.push_str(&rest[open..]);
            return out;
        };

        if after.as_bytes()[close] == b'{' {
            // Another opening brace first; this one was literal.
            out.push('{');
            rest = after;
            continue;
        }

        let name = &after[..close];
        match Placeholder::from_name(name) {
            Some(placeholder) => out.push_str(&placeholder.value(metadata)),
            None => {
                out.push('{');
                out.push_str(name);
                out.push('}');
            }
        }
        rest = &after[close + 1..];
    }

    out.push_str(rest);
    out
}

/// Brace tokens in `template` that are not part of the vocabulary.
///
/// Used for `--dry-run` output; they are not errors.
pub fn unknown_tokens(template: &str) -> Vec<&str> {
    let mut found = Vec::new();
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        let Some(close) = after.find(['{', '}']) else {
            break;
        };
        if after.as_bytes()[close] == b'}' {
            let name = &after[..close];
            if Placeholder::from_name(name).is_none() {
                found.push(name);
            }
            rest = &after[close + 1..];
        } else {
            rest = after;
        }
    }
    found
}
