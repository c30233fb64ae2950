use std::fs;

use mate_ingest_issue::{parse_issue, DirectoryLookup, RecordKind, Severity, NO_RESPONSE};
use serde_json::json;

fn issue_body(doi: &str, authors: &str, title: &str) -> String {
    [
        ("creator/contributor ORCID (or name)", "0000-0002-1825-0097"),
        ("slug", "plume-2d"),
        ("field of Research (FoR) Codes", "370401, 3705"),
        ("license", "CC-BY-4.0"),
        ("model category", "mantle convection, plumes"),
        ("associated publication DOI", doi),
        ("title", title),
        ("description", NO_RESPONSE),
        ("model authors", authors),
        ("scientific keywords", "plume"),
        ("funder", NO_RESPONSE),
        ("include model code ?", "- [X] Yes\r\n- [ ] No"),
        ("model code URI/DOI", "10.5281/zenodo.8004185"),
        ("software framework DOI/URI", "https://doi.org/10.5281/zenodo.8004185"),
    ]
    .iter()
    .map(|(label, value)| format!("### -> {label}\r\n\r\n{value}\r\n\r\n"))
    .collect()
}

fn write_cache(dir: &std::path::Path) -> DirectoryLookup {
    let lookup = DirectoryLookup::new(dir);
    let records = [
        (
            RecordKind::Author,
            "0000-0002-1825-0097",
            json!({
                "orcid-identifier": {"uri": "https://orcid.org/0000-0002-1825-0097"},
                "person": {"name": {"given-names": {"value": "Josiah"}, "family-name": {"value": "Carberry"}}},
                "activities-summary": {"employments": {"affiliation-group": []}}
            }),
        ),
        (
            RecordKind::Publication,
            "10.1029/2019GC008669",
            json!({"message": {
                "URL": "https://doi.org/10.1029/2019gc008669",
                "title": ["Plumes and slabs"],
                "published": {"date-parts": [[2020, 4, 1]]},
                "publisher": "AGU",
                "abstract": "<jats:p>Mantle plumes rise.</jats:p>",
                "author": [{"given": "Emmy", "family": "Noether", "affiliation": []}],
                "funder": [{"name": "Australian Research Council"}]
            }}),
        ),
        (
            RecordKind::Software,
            "8004185",
            json!({
                "doi_url": "https://doi.org/10.5281/zenodo.8004185",
                "title": "underworld2",
                "metadata": {"version": "v2.15.1b", "creators": [{"name": "Underworld Team"}]}
            }),
        ),
    ];
    for (kind, id, record) in records {
        let path = lookup.path_for(kind, id);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, record.to_string()).unwrap();
    }
    lookup
}

#[test]
fn cached_registry_records_fill_unanswered_fields() {
    let dir = tempfile::tempdir().unwrap();
    let lookup = write_cache(dir.path());

    let parsed = parse_issue(
        &issue_body("10.1029/2019GC008669", NO_RESPONSE, NO_RESPONSE),
        &lookup,
        &mut |_| false,
    );
    let record = &parsed.record;

    assert!(!parsed.report.has_errors(), "{:?}", parsed.report);
    assert_eq!(record.get("creator").unwrap()["givenName"], "Josiah");
    assert_eq!(record.get("title"), Some(&json!("Plumes and slabs")));
    assert_eq!(record.get("description"), Some(&json!("Mantle plumes rise.")));
    assert_eq!(record.get("authors").unwrap()[0]["familyName"], "Noether");
    assert_eq!(
        record.get("funder"),
        Some(&json!([{"@type": "Organization", "name": "Australian Research Council"}]))
    );
    assert_eq!(record.get("include_model_code"), Some(&json!(true)));
    assert_eq!(
        record.get("model_code_uri"),
        Some(&json!("https://doi.org/10.5281/zenodo.8004185"))
    );
    assert_eq!(record.get("software").unwrap()["softwareVersion"], "v2.15.1b");
    assert_eq!(record.get("for_codes").unwrap().as_array().unwrap().len(), 2);
}

#[test]
fn cache_misses_are_warnings_and_leave_bare_identifiers() {
    let dir = tempfile::tempdir().unwrap();
    let lookup = DirectoryLookup::new(dir.path());

    let parsed = parse_issue(
        &issue_body("10.1000/unknown", "Lovelace, Ada", "Plume model"),
        &lookup,
        &mut |_| false,
    );

    assert_eq!(
        parsed.record.get("publication"),
        Some(&json!({"@type": "ScholarlyArticle", "@id": "https://doi.org/10.1000/unknown"}))
    );
    let publication: Vec<_> = parsed.report.for_field("publication").collect();
    assert_eq!(publication.len(), 1);
    assert_eq!(publication[0].severity, Severity::Warning);
    assert!(publication[0].message.contains("https://api.crossref.org/works/10.1000/unknown"));

    // No abstract to fall back on.
    assert!(parsed.report.for_field("description").any(|i| i.severity == Severity::Error));
}

#[test]
fn corrupt_cache_entry_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let lookup = DirectoryLookup::new(dir.path());
    let path = lookup.path_for(RecordKind::Author, "0000-0002-1825-0097");
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, "{").unwrap();

    let parsed = parse_issue(
        &issue_body(NO_RESPONSE, "Lovelace, Ada", "Plume model"),
        &lookup,
        &mut |_| false,
    );
    assert!(parsed.record.get("creator").is_none());
    assert!(parsed.report.for_field("creator").any(|i| i.severity == Severity::Error));
}
