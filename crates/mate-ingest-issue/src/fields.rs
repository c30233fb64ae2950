//! Parsers for individual issue-form answers.
//!
//! Each parser takes the trimmed answer text and returns either a JSON value
//! ready to be stored in the submission record or a [`FieldError`] describing
//! what the submitter has to fix.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{json, Value};
use thiserror::Error;
use url::Url;

use crate::registry::{parse_author, RecordKind, RegistryLookup};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("section `{0}` is missing from the issue")]
    MissingSection(String),

    #[error("name `{0}` in unexpected format; expected `last name(s), first name(s)` or an ORCID iD")]
    NameFormat(String),

    #[error("both 'yes' and 'no' selected")]
    BothSelected,

    #[error("no selection made")]
    NoSelection,

    #[error("`{value}` is not a usable URI: {reason}")]
    InvalidUri { value: String, reason: String },

    #[error("no image link found in `{0}`")]
    MissingImage(String),

    #[error("`{0}` is not a Field of Research code")]
    InvalidForCode(String),

    #[error("registry lookup failed for {kind} `{id}`: {message}")]
    Registry {
        kind: RecordKind,
        id: String,
        message: String,
    },
}

// ============================================================================
// Patterns
// ============================================================================

fn orcid_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:https?://orcid\.org/)?(\d{4}-\d{4}-\d{4}-\d{3}[0-9X])/?$")
            .expect("orcid pattern is valid")
    })
}

fn doi_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?i:doi:\s*)?(10\.\d{4,9}/\S+)$").expect("doi pattern is valid")
    })
}

fn image_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"!?\[[^\]]*\]\(\s*([^)\s]+)\s*\)|<img[^>]*\bsrc="([^"]+)"[^>]*>"#)
            .expect("image pattern is valid")
    })
}

fn for_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{2,6})(?:\s*[-:]\s*(.+))?$").expect("FoR pattern is valid"))
}

// ============================================================================
// People
// ============================================================================

/// The bare ORCID iD (`0000-0002-1825-0097`) in `input`, if it is one.
/// Profile URLs are accepted too.
pub fn orcid_id(input: &str) -> Option<&str> {
    orcid_re()
        .captures(input.trim())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

pub fn is_orcid(input: &str) -> bool {
    orcid_id(input).is_some()
}

/// `Family, Given` or an ORCID iD → schema.org `Person`.
///
/// ORCID records are looked up through `lookup`; when the registry has no
/// copy the person is kept as a bare identifier.
pub fn parse_name_or_orcid(input: &str, lookup: &dyn RegistryLookup) -> Result<Value, FieldError> {
    let input = input.trim();

    if let Some(id) = orcid_id(input) {
        let registry_error = |message: String| FieldError::Registry {
            kind: RecordKind::Author,
            id: id.to_string(),
            message,
        };
        return match lookup.fetch(RecordKind::Author, id) {
            Ok(Some(record)) => parse_author(&record).map_err(|err| registry_error(err.to_string())),
            Ok(None) => Ok(json!({
                "@type": "Person",
                "@id": format!("https://orcid.org/{id}"),
            })),
            Err(err) => Err(registry_error(err.to_string())),
        };
    }

    match input.split_once(',') {
        Some((family, given))
            if !family.trim().is_empty() && !given.trim().is_empty() && !given.contains(',') =>
        {
            Ok(json!({
                "@type": "Person",
                "givenName": given.trim(),
                "familyName": family.trim(),
            }))
        }
        _ => Err(FieldError::NameFormat(input.to_string())),
    }
}

// ============================================================================
// Choices and lists
// ============================================================================

/// Rendered checkbox pair: the first line is "yes", the second "no".
pub fn parse_yes_no_choice(input: &str) -> Result<bool, FieldError> {
    let mut boxes = input.lines().map(str::trim).filter(|line| !line.is_empty());
    let checked = |line: Option<&str>| line.map_or(false, |l| l.contains("[X]") || l.contains("[x]"));
    let yes = checked(boxes.next());
    let no = checked(boxes.next());

    match (yes, no) {
        (true, true) => Err(FieldError::BothSelected),
        (true, false) => Ok(true),
        (false, true) => Ok(false),
        (false, false) => Err(FieldError::NoSelection),
    }
}

/// Comma-separated answer; empty items are dropped.
pub fn parse_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

/// One item per line; blank lines are dropped.
pub fn parse_lines(input: &str) -> Vec<String> {
    input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

// ============================================================================
// Links
// ============================================================================

/// Syntactic URI check. Bare DOIs (`10.1000/xyz`, `doi:10.1000/xyz`) are
/// rewritten to their `https://doi.org/` resolver form.
pub fn parse_uri(input: &str) -> Result<String, FieldError> {
    let input = input.trim();
    if let Some(doi) = doi_re().captures(input).and_then(|caps| caps.get(1)) {
        return Ok(format!("https://doi.org/{}", doi.as_str()));
    }

    let invalid = |reason: String| FieldError::InvalidUri {
        value: input.to_string(),
        reason,
    };
    let url = Url::parse(input).map_err(|err| invalid(err.to_string()))?;
    match url.scheme() {
        "http" | "https" if url.host().is_some() => Ok(input.to_string()),
        "http" | "https" => Err(invalid("missing host".into())),
        other => Err(invalid(format!("unsupported scheme `{other}`"))),
    }
}

/// Markdown image (or `<img>` tag) plus free-text caption → `ImageObject`.
/// The caption is whatever text surrounds the link.
pub fn parse_image_and_caption(input: &str, name: &str) -> Result<Value, FieldError> {
    let caps = image_re()
        .captures(input)
        .ok_or_else(|| FieldError::MissingImage(input.trim().to_string()))?;
    let url = caps
        .get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str())
        .ok_or_else(|| FieldError::MissingImage(input.trim().to_string()))?;
    let url = parse_uri(url)?;

    let whole = caps.get(0).map_or(0..0, |m| m.range());
    let caption = format!("{} {}", &input[..whole.start], &input[whole.end..]);
    let caption = caption.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut image = json!({
        "@type": "ImageObject",
        "name": name,
        "url": url,
    });
    if !caption.is_empty() {
        image["caption"] = Value::String(caption);
    }
    Ok(image)
}

// ============================================================================
// Controlled terms
// ============================================================================

/// ANZSRC Field of Research code (`0403` or `0403 - Geology`) →
/// `DefinedTerm` with the local identifier `#FoR_<code>`.
pub fn parse_for_code(input: &str) -> Result<Value, FieldError> {
    let input = input.trim();
    let caps = for_code_re()
        .captures(input)
        .ok_or_else(|| FieldError::InvalidForCode(input.to_string()))?;
    let code = caps.get(1).map_or("", |m| m.as_str());

    let mut term = json!({
        "@id": format!("#FoR_{code}"),
        "@type": "DefinedTerm",
        "inDefinedTermSet": "https://linked.data.gov.au/def/anzsrc-for/2020",
    });
    if let Some(name) = caps.get(2) {
        term["name"] = Value::String(name.as_str().trim().to_string());
    }
    Ok(term)
}

/// License by name. `No license` is kept verbatim so the choice stays
/// visible in the crate.
pub fn parse_license(input: &str) -> Value {
    json!({
        "@type": "CreativeWork",
        "name": input.trim(),
    })
}

/// Funder URL (usually a ROR link) or plain organisation name →
/// `Organization`.
pub fn parse_funder(input: &str) -> Value {
    let input = input.trim();
    match parse_uri(input) {
        Ok(url) => json!({"@type": "Organization", "url": url}),
        Err(_) => json!({"@type": "Organization", "name": input}),
    }
}
