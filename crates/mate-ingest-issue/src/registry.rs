//! Registry records (ORCID, ROR, Zenodo, Crossref) → schema.org entities.
//!
//! Fetching is out of scope here: a [`RegistryLookup`] hands over JSON that
//! was retrieved elsewhere, and the `parse_*` functions are pure transforms.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Author,
    Organization,
    Software,
    Publication,
}

impl RecordKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordKind::Author => "author",
            RecordKind::Organization => "organization",
            RecordKind::Software => "software",
            RecordKind::Publication => "publication",
        }
    }

    /// Public API endpoint the record would be fetched from.
    pub fn api_url(self, id: &str) -> String {
        let base = match self {
            RecordKind::Author => "https://pub.orcid.org/v3.0/",
            RecordKind::Organization => "https://api.ror.org/organizations/",
            RecordKind::Software => "https://zenodo.org/api/records/",
            RecordKind::Publication => "https://api.crossref.org/works/",
        };
        format!("{base}{id}")
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unable to parse {kind} record: {reason}")]
    Malformed { kind: RecordKind, reason: String },
}

impl RegistryError {
    fn missing(kind: RecordKind, pointer: &str) -> Self {
        Self::Malformed {
            kind,
            reason: format!("missing `{pointer}`"),
        }
    }
}

// ============================================================================
// Lookup
// ============================================================================

/// Source of pre-fetched registry JSON. `Ok(None)` means "no copy", which
/// callers treat as a soft miss.
pub trait RegistryLookup {
    fn fetch(&self, kind: RecordKind, id: &str) -> Result<Option<Value>, RegistryError>;
}

/// Offline: every lookup misses.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLookup;

impl RegistryLookup for NoLookup {
    fn fetch(&self, _kind: RecordKind, _id: &str) -> Result<Option<Value>, RegistryError> {
        Ok(None)
    }
}

/// Cache directory laid out as `<root>/<kind>/<id>.json`. Characters outside
/// `[A-Za-z0-9._-]` in the id are replaced with `_`, so DOIs map to flat
/// file names.
#[derive(Debug, Clone)]
pub struct DirectoryLookup {
    root: PathBuf,
}

impl DirectoryLookup {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, kind: RecordKind, id: &str) -> PathBuf {
        let file: String = id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.root.join(kind.as_str()).join(format!("{file}.json"))
    }
}

impl RegistryLookup for DirectoryLookup {
    fn fetch(&self, kind: RecordKind, id: &str) -> Result<Option<Value>, RegistryError> {
        let path = self.path_for(kind, id);
        if !path.is_file() {
            debug!(%kind, id, path = %path.display(), "registry cache miss");
            return Ok(None);
        }
        let text = fs::read_to_string(&path).map_err(|source| RegistryError::Io {
            path: path.clone(),
            source,
        })?;
        let record = serde_json::from_str(&text)
            .map_err(|source| RegistryError::Json { path, source })?;
        Ok(Some(record))
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn required_str<'a>(
    record: &'a Value,
    kind: RecordKind,
    pointer: &str,
) -> Result<&'a str, RegistryError> {
    record
        .pointer(pointer)
        .and_then(Value::as_str)
        .ok_or_else(|| RegistryError::missing(kind, pointer))
}

fn optional_str<'a>(record: &'a Value, pointer: &str) -> Option<&'a str> {
    record
        .pointer(pointer)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

fn array_at<'a>(record: &'a Value, pointer: &str) -> &'a [Value] {
    record
        .pointer(pointer)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn orcid_uri(id: &str) -> String {
    let bare = id.rsplit('/').next().unwrap_or(id);
    format!("https://orcid.org/{bare}")
}

fn organization(name: &str) -> Value {
    json!({"@type": "Organization", "name": name})
}

/// Crossref `date-parts` (`[[2021, 3, 9]]`) → `2021-03-09`; year-only and
/// year-month dates keep their precision.
fn date_from_parts(parts: &Value) -> Option<String> {
    let parts: Vec<u64> = parts
        .pointer("/date-parts/0")?
        .as_array()?
        .iter()
        .map(Value::as_u64)
        .collect::<Option<_>>()?;
    match parts.as_slice() {
        [year] => Some(format!("{year:04}")),
        [year, month] => Some(format!("{year:04}-{month:02}")),
        [year, month, day, ..] => Some(format!("{year:04}-{month:02}-{day:02}")),
        [] => None,
    }
}

fn jats_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").expect("tag pattern is valid"))
}

/// Drop JATS markup (`<jats:title>`, `<jats:p>`, ...) from a Crossref
/// abstract. A leading `Abstract` heading is removed too.
pub fn strip_jats(text: &str) -> String {
    let text = jats_tag_re().replace_all(text, " ");
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if let Some(rest) = text.strip_prefix("Abstract ") {
        return rest.to_string();
    }
    text
}

/// Person fields from a free-text `Family, Given` name, or `name` otherwise.
fn person_from_name(person: &mut Value, name: &str) {
    match name.split_once(',') {
        Some((family, given)) if !family.trim().is_empty() && !given.trim().is_empty() => {
            person["familyName"] = Value::from(family.trim());
            person["givenName"] = Value::from(given.trim());
        }
        _ => person["name"] = Value::from(name.trim()),
    }
}

// ============================================================================
// Parsers
// ============================================================================

/// ORCID v3 record → `Person`, with current employers as affiliations.
pub fn parse_author(record: &Value) -> Result<Value, RegistryError> {
    let kind = RecordKind::Author;
    let id = required_str(record, kind, "/orcid-identifier/uri")?;
    let given = required_str(record, kind, "/person/name/given-names/value")?;
    let family = required_str(record, kind, "/person/name/family-name/value")?;

    let mut person = json!({
        "@type": "Person",
        "@id": id,
        "givenName": given,
        "familyName": family,
    });

    let affiliations: Vec<Value> = array_at(
        record,
        "/activities-summary/employments/affiliation-group",
    )
    .iter()
    .filter_map(|group| group.pointer("/summaries/0/employment-summary"))
    .filter(|summary| summary.get("end-date").map_or(true, Value::is_null))
    .filter_map(|summary| optional_str(summary, "/organization/name"))
    .map(organization)
    .collect();
    if !affiliations.is_empty() {
        person["affiliation"] = Value::Array(affiliations);
    }
    Ok(person)
}

/// ROR organization record → `Organization`.
pub fn parse_organization(record: &Value) -> Result<Value, RegistryError> {
    let kind = RecordKind::Organization;
    let id = required_str(record, kind, "/id")?;
    let name = required_str(record, kind, "/name")?;
    Ok(json!({"@type": "Organization", "@id": id, "name": name}))
}

/// Zenodo record → `SoftwareApplication` with its creators as authors.
pub fn parse_software(record: &Value) -> Result<Value, RegistryError> {
    let kind = RecordKind::Software;
    let id = required_str(record, kind, "/doi_url")?;
    let name = optional_str(record, "/title")
        .or_else(|| optional_str(record, "/metadata/title"))
        .ok_or_else(|| RegistryError::missing(kind, "/title"))?;

    let mut software = json!({
        "@type": "SoftwareApplication",
        "@id": id,
        "name": name,
    });
    if let Some(version) = optional_str(record, "/metadata/version") {
        software["softwareVersion"] = Value::from(version);
    }

    let authors: Vec<Value> = array_at(record, "/metadata/creators")
        .iter()
        .map(|creator| {
            let mut person = json!({"@type": "Person"});
            if let Some(orcid) = optional_str(creator, "/orcid") {
                person["@id"] = Value::from(orcid_uri(orcid));
            }
            if let Some(name) = optional_str(creator, "/name") {
                person_from_name(&mut person, name);
            }
            if let Some(affiliation) = optional_str(creator, "/affiliation") {
                person["affiliation"] = json!([organization(affiliation)]);
            }
            person
        })
        .collect();
    if !authors.is_empty() {
        software["author"] = Value::Array(authors);
    }
    Ok(software)
}

/// Crossref work (`{"message": {...}}` envelope or the bare message) →
/// `ScholarlyArticle`. Journal articles with an issue number nest
/// `PublicationIssue` → `PublicationVolume`/`Periodical` under `isPartOf`.
pub fn parse_publication(record: &Value) -> Result<Value, RegistryError> {
    let kind = RecordKind::Publication;
    let work = record.get("message").unwrap_or(record);
    let id = required_str(work, kind, "/URL")?;
    let title = required_str(work, kind, "/title/0")?;

    let mut article = json!({
        "@type": "ScholarlyArticle",
        "@id": id,
        "name": title,
    });
    let published = work.get("published").and_then(date_from_parts);

    if let Some(issue) = work.get("issue").filter(|v| !v.is_null()) {
        let mut volume = json!({"@type": ["PublicationVolume", "Periodical"]});
        let container = work
            .pointer("/container-title/0")
            .or_else(|| work.get("container-title"));
        for (attribute, value) in [
            ("name", container),
            ("issn", work.get("ISSN")),
            ("volumeNumber", work.get("volume")),
            ("publisher", work.get("publisher")),
        ] {
            if let Some(value) = value.filter(|v| !v.is_null()) {
                volume[attribute] = value.clone();
            }
        }

        let mut publication_issue = json!({
            "@type": "PublicationIssue",
            "issueNumber": issue,
            "isPartOf": volume,
        });
        if let Some(date) = &published {
            publication_issue["datePublished"] = Value::from(date.as_str());
        }
        article["isPartOf"] = publication_issue;
    } else {
        if let Some(date) = published {
            article["datePublished"] = Value::from(date);
        }
        if let Some(publisher) = optional_str(work, "/publisher") {
            article["publisher"] = Value::from(publisher);
        }
    }

    let authors: Vec<Value> = array_at(work, "/author")
        .iter()
        .map(|author| {
            let mut person = json!({"@type": "Person"});
            if let Some(orcid) = optional_str(author, "/ORCID") {
                person["@id"] = Value::from(orcid_uri(orcid));
            }
            match (optional_str(author, "/given"), optional_str(author, "/family")) {
                (Some(given), Some(family)) => {
                    person["givenName"] = Value::from(given);
                    person["familyName"] = Value::from(family);
                }
                (None, Some(family)) => person["familyName"] = Value::from(family),
                _ => {
                    if let Some(name) = optional_str(author, "/name") {
                        person["name"] = Value::from(name);
                    }
                }
            }
            let affiliations: Vec<Value> = array_at(author, "/affiliation")
                .iter()
                .filter_map(|a| optional_str(a, "/name"))
                .map(organization)
                .collect();
            if !affiliations.is_empty() {
                person["affiliation"] = Value::Array(affiliations);
            }
            person
        })
        .collect();
    if !authors.is_empty() {
        article["author"] = Value::Array(authors);
    }

    if let Some(abstract_text) = optional_str(work, "/abstract") {
        article["abstract"] = Value::from(strip_jats(abstract_text));
    }
    if let Some(page) = optional_str(work, "/page") {
        article["pagination"] = Value::from(page);
    }
    if let Some(ids) = work.get("alternative-id").filter(|v| !v.is_null()) {
        article["identifier"] = ids.clone();
    }

    let funders: Vec<Value> = array_at(work, "/funder")
        .iter()
        .filter_map(|f| optional_str(f, "/name"))
        .map(organization)
        .collect();
    if !funders.is_empty() {
        article["funder"] = Value::Array(funders);
    }
    Ok(article)
}

/// Dispatch on `kind`.
pub fn parse_record(kind: RecordKind, record: &Value) -> Result<Value, RegistryError> {
    match kind {
        RecordKind::Author => parse_author(record),
        RecordKind::Organization => parse_organization(record),
        RecordKind::Software => parse_software(record),
        RecordKind::Publication => parse_publication(record),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orcid_record() -> Value {
        json!({
            "orcid-identifier": {"uri": "https://orcid.org/0000-0002-1825-0097", "path": "0000-0002-1825-0097"},
            "person": {"name": {
                "given-names": {"value": "Josiah"},
                "family-name": {"value": "Carberry"}
            }},
            "activities-summary": {"employments": {"affiliation-group": [
                {"summaries": [{"employment-summary": {"end-date": null, "organization": {"name": "Brown University"}}}]},
                {"summaries": [{"employment-summary": {"end-date": {"year": {"value": "2001"}}, "organization": {"name": "Wesleyan University"}}}]}
            ]}}
        })
    }

    fn crossref_work() -> Value {
        json!({"status": "ok", "message": {
            "URL": "https://doi.org/10.1029/2019gc008669",
            "title": ["Plumes and slabs"],
            "issue": "4",
            "volume": "21",
            "container-title": ["Geochemistry, Geophysics, Geosystems"],
            "ISSN": ["1525-2027"],
            "publisher": "American Geophysical Union (AGU)",
            "published": {"date-parts": [[2020, 4, 1]]},
            "abstract": "<jats:title>Abstract</jats:title><jats:p>Mantle plumes   rise.</jats:p>",
            "page": "e2019GC008669",
            "author": [
                {"ORCID": "http://orcid.org/0000-0001-0000-0002", "given": "Emmy", "family": "Noether", "affiliation": [{"name": "Erlangen"}]},
                {"given": "Ada", "family": "Lovelace", "affiliation": []}
            ],
            "funder": [{"name": "Australian Research Council"}]
        }})
    }

    #[test]
    fn orcid_record_keeps_current_employers() {
        let person = parse_author(&orcid_record()).unwrap();
        assert_eq!(
            person,
            json!({
                "@type": "Person",
                "@id": "https://orcid.org/0000-0002-1825-0097",
                "givenName": "Josiah",
                "familyName": "Carberry",
                "affiliation": [{"@type": "Organization", "name": "Brown University"}]
            })
        );
    }

    #[test]
    fn incomplete_orcid_record_is_malformed() {
        let mut record = orcid_record();
        record["person"]["name"] = Value::Null;
        let err = parse_author(&record).unwrap_err();
        assert!(matches!(err, RegistryError::Malformed { kind: RecordKind::Author, .. }));
        assert!(err.to_string().contains("/person/name/given-names/value"));
    }

    #[test]
    fn crossref_journal_article_nests_issue_and_volume() {
        let article = parse_publication(&crossref_work()).unwrap();
        assert_eq!(article["@id"], "https://doi.org/10.1029/2019gc008669");
        assert_eq!(article["abstract"], "Mantle plumes rise.");
        assert_eq!(article["isPartOf"]["datePublished"], "2020-04-01");
        assert_eq!(
            article["isPartOf"]["isPartOf"]["name"],
            "Geochemistry, Geophysics, Geosystems"
        );
        assert_eq!(article["isPartOf"]["isPartOf"]["volumeNumber"], "21");
        assert_eq!(article["author"][0]["@id"], "https://orcid.org/0000-0001-0000-0002");
        assert!(article["author"][1].get("affiliation").is_none());
        assert_eq!(article["funder"], json!([{"@type": "Organization", "name": "Australian Research Council"}]));
    }

    #[test]
    fn crossref_without_issue_keeps_date_on_article() {
        let mut work = crossref_work();
        work["message"].as_object_mut().unwrap().remove("issue");
        work["message"]["published"] = json!({"date-parts": [[2020, 4]]});
        let article = parse_publication(&work).unwrap();
        assert_eq!(article["datePublished"], "2020-04");
        assert_eq!(article["publisher"], "American Geophysical Union (AGU)");
        assert!(article.get("isPartOf").is_none());
    }

    #[test]
    fn zenodo_creators_become_authors() {
        let record = json!({
            "doi_url": "https://doi.org/10.5281/zenodo.8004185",
            "title": "underworld2",
            "metadata": {
                "version": "v2.15.1b",
                "creators": [
                    {"name": "Mansour, John", "affiliation": "Monash University", "orcid": "0000-0001-5865-1664"},
                    {"name": "Underworld Team"}
                ]
            }
        });
        let software = parse_software(&record).unwrap();
        assert_eq!(software["softwareVersion"], "v2.15.1b");
        assert_eq!(
            software["author"][0],
            json!({
                "@type": "Person",
                "@id": "https://orcid.org/0000-0001-5865-1664",
                "familyName": "Mansour",
                "givenName": "John",
                "affiliation": [{"@type": "Organization", "name": "Monash University"}]
            })
        );
        assert_eq!(software["author"][1]["name"], "Underworld Team");
    }

    #[test]
    fn ror_record() {
        let record = json!({"id": "https://ror.org/04s1nv328", "name": "AuScope", "types": ["Facility"]});
        assert_eq!(
            parse_record(RecordKind::Organization, &record).unwrap(),
            json!({"@type": "Organization", "@id": "https://ror.org/04s1nv328", "name": "AuScope"})
        );
    }

    #[test]
    fn directory_lookup_reads_sanitized_paths() {
        let dir = tempfile::tempdir().unwrap();
        let lookup = DirectoryLookup::new(dir.path());
        let path = lookup.path_for(RecordKind::Publication, "10.1029/2019GC008669");
        assert_eq!(path, dir.path().join("publication").join("10.1029_2019GC008669.json"));

        assert!(lookup.fetch(RecordKind::Publication, "10.1029/2019GC008669").unwrap().is_none());

        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, crossref_work().to_string()).unwrap();
        let record = lookup
            .fetch(RecordKind::Publication, "10.1029/2019GC008669")
            .unwrap()
            .unwrap();
        assert_eq!(record, crossref_work());

        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            lookup.fetch(RecordKind::Publication, "10.1029/2019GC008669"),
            Err(RegistryError::Json { .. })
        ));
    }

    #[test]
    fn api_urls_follow_registry() {
        assert_eq!(
            RecordKind::Software.api_url("8004185"),
            "https://zenodo.org/api/records/8004185"
        );
        assert_eq!(RecordKind::Author.to_string(), "author");
    }
}
