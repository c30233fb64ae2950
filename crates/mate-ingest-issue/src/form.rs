//! Issue-form sections.
//!
//! GitHub renders each form field as a `### <label>` heading followed by the
//! answer. Unanswered optional fields read `_No response_`.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::fields::FieldError;

pub const NO_RESPONSE: &str = "_No response_";

fn heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^###\s*(.*?)\s*$").expect("heading pattern is valid"))
}

/// `-> Model Authors ` → `model authors`.
pub fn normalize_heading(heading: &str) -> String {
    let heading = heading.trim();
    let heading = heading.strip_prefix("->").unwrap_or(heading);
    heading
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Split an issue body into its `###` sections.
pub fn parse_sections(body: &str) -> IssueForm {
    IssueForm::parse(body)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueForm {
    sections: BTreeMap<String, String>,
}

impl IssueForm {
    pub fn parse(body: &str) -> Self {
        let mut sections = BTreeMap::new();
        let mut current: Option<(String, Vec<&str>)> = None;

        for line in body.lines() {
            let line = line.trim_end_matches('\r');
            if let Some(caps) = heading_re().captures(line) {
                if let Some((key, lines)) = current.take() {
                    sections.insert(key, lines.join("\n").trim().to_string());
                }
                let key = normalize_heading(caps.get(1).map_or("", |m| m.as_str()));
                current = Some((key, Vec::new()));
            } else if let Some((_, lines)) = current.as_mut() {
                lines.push(line);
            }
        }
        if let Some((key, lines)) = current {
            sections.insert(key, lines.join("\n").trim().to_string());
        }

        Self { sections }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Raw text of a section. `label` is matched against normalized headings,
    /// exactly first and then as a prefix, so long labels such as
    /// `name of primary software framework (e.g. ...)` can be found by their
    /// stable start.
    pub fn raw(&self, label: &str) -> Option<&str> {
        let label = normalize_heading(label);
        self.sections
            .get(&label)
            .or_else(|| {
                self.sections
                    .iter()
                    .find(|(key, _)| key.starts_with(&label))
                    .map(|(_, value)| value)
            })
            .map(String::as_str)
    }

    /// Answer text; `Ok(None)` when the field was left empty.
    pub fn answer(&self, label: &str) -> Result<Option<&str>, FieldError> {
        let raw = self
            .raw(label)
            .ok_or_else(|| FieldError::MissingSection(normalize_heading(label)))?;
        if raw.is_empty() || raw == NO_RESPONSE {
            Ok(None)
        } else {
            Ok(Some(raw))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = "### -> slug\r\n\r\nsubduction-2d\r\n\r\n### -> title\r\n\r\n_No response_\r\n\r\n### -> name of primary software framework (e.g. Underworld, ASPECT)\r\n\r\nUnderworld\r\n\r\n### -> model authors\r\n\r\nLovelace, Ada\r\nNoether, Emmy\r\n";

    #[test]
    fn splits_headings_and_answers() {
        let form = IssueForm::parse(BODY);
        assert_eq!(form.len(), 4);
        assert_eq!(form.raw("slug"), Some("subduction-2d"));
        assert_eq!(form.raw("model authors"), Some("Lovelace, Ada\nNoether, Emmy"));
    }

    #[test]
    fn no_response_reads_as_none() {
        let form = IssueForm::parse(BODY);
        assert_eq!(form.answer("title"), Ok(None));
        assert_eq!(
            form.answer("funder"),
            Err(FieldError::MissingSection("funder".into()))
        );
    }

    #[test]
    fn long_labels_match_by_prefix() {
        let form = IssueForm::parse(BODY);
        assert_eq!(
            form.answer("-> name of primary software framework"),
            Ok(Some("Underworld"))
        );
    }

    #[test]
    fn text_before_first_heading_is_ignored() {
        let form = parse_sections("preamble\n### Slug\nx\n");
        assert_eq!(form.keys().collect::<Vec<_>>(), vec!["slug"]);
    }
}
