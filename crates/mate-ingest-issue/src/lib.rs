//! M@TE model-submission issues → [`SubmissionRecord`].
//!
//! The submission form is a GitHub issue template; its rendered body is a
//! sequence of `### -> <label>` sections. [`parse_issue`] reads every section,
//! turns answers into schema.org-shaped values, and collects everything the
//! submitter needs to fix in a [`ParseReport`] instead of failing on the
//! first problem.
//!
//! Registry metadata (ORCID, ROR, Zenodo, Crossref) is never fetched here; it
//! comes through a [`RegistryLookup`].

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use mate_rocrate::SubmissionRecord;

pub mod fields;
pub mod form;
pub mod registry;
pub mod report;
pub mod slug;

pub use fields::{
    is_orcid, parse_for_code, parse_funder, parse_image_and_caption, parse_license, parse_lines,
    parse_list, parse_name_or_orcid, parse_uri, parse_yes_no_choice, FieldError,
};
pub use form::{parse_sections, IssueForm, NO_RESPONSE};
pub use registry::{
    parse_author, parse_organization, parse_publication, parse_record, parse_software,
    DirectoryLookup, NoLookup, RecordKind, RegistryError, RegistryLookup,
};
pub use report::{FieldIssue, ParseReport, Severity};
pub use slug::{choose_slug, SlugError};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedIssue {
    pub record: SubmissionRecord,
    pub report: ParseReport,
}

/// Figure sections: record field and form label.
const FIGURES: [(&str, &str); 4] = [
    ("landing_image", "add landing page image and caption"),
    ("animation", "add an animation"),
    ("graphic_abstract", "add a graphic abstract figure"),
    ("model_setup_figure", "add a model setup figure"),
];

fn zenodo_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"zenodo\.(\d+)").expect("zenodo pattern is valid"))
}

fn bare_doi(uri: &str) -> Option<&str> {
    uri.strip_prefix("https://doi.org/")
        .or_else(|| uri.strip_prefix("http://doi.org/"))
}

/// Parse a rendered submission issue.
///
/// `slug_exists` answers whether a repository name is already taken.
pub fn parse_issue(
    body: &str,
    lookup: &dyn RegistryLookup,
    slug_exists: &mut dyn FnMut(&str) -> bool,
) -> ParsedIssue {
    let mut parser = IssueParser {
        form: IssueForm::parse(body),
        lookup,
        record: SubmissionRecord::new(),
        report: ParseReport::new(),
    };
    debug!(sections = parser.form.len(), "issue sections found");

    parser.creator();
    parser.slug(slug_exists);
    parser.for_codes();
    parser.license();
    parser.model_category();
    let publication = parser.publication();
    parser.title(publication.as_ref());
    parser.description(publication.as_ref());
    parser.authors(publication.as_ref());
    parser.keywords();
    parser.funders(publication.as_ref());

    parser.choice("include_model_code", "include model code");
    parser.uri("model_code_uri", "model code uri/doi", true);
    parser.choice("include_model_output", "include model output data");
    parser.uri("model_output_uri", "model output uri/doi", true);

    parser.software();
    parser.uri("computer_uri", "computer uri/doi", false);

    parser.figures();
    if let Some(Some(text)) =
        parser.answer("model_setup_description", "add a description of your model setup", false)
    {
        parser.record.insert("model_setup_description", text);
    }

    let IssueParser { record, report, .. } = parser;
    info!(
        fields = record.len(),
        errors = report.errors().count(),
        warnings = report.warnings().count(),
        "issue parsed"
    );
    ParsedIssue { record, report }
}

struct IssueParser<'a> {
    form: IssueForm,
    lookup: &'a dyn RegistryLookup,
    record: SubmissionRecord,
    report: ParseReport,
}

impl IssueParser<'_> {
    /// `None` when the section is absent (reported as an error if
    /// `required`), `Some(None)` when it was left empty.
    fn answer(&mut self, field: &str, label: &str, required: bool) -> Option<Option<String>> {
        match self.form.answer(label) {
            Ok(answer) => Some(answer.map(str::to_string)),
            Err(err) if required => {
                self.report.error(field, err.to_string());
                None
            }
            Err(err) => {
                debug!(field, %err, "optional section absent");
                None
            }
        }
    }

    fn fetch(&mut self, kind: RecordKind, id: &str, field: &str) -> Option<Value> {
        match self.lookup.fetch(kind, id) {
            Ok(Some(record)) => match parse_record(kind, &record) {
                Ok(entity) => Some(entity),
                Err(err) => {
                    self.report.error(field, err.to_string());
                    None
                }
            },
            Ok(None) => {
                self.report.warn(
                    field,
                    format!("no {kind} record available for `{id}` ({})", kind.api_url(id)),
                );
                None
            }
            Err(err) => {
                self.report.error(field, err.to_string());
                None
            }
        }
    }

    fn people(&mut self, field: &str, text: &str) -> Vec<Value> {
        let mut people = Vec::new();
        for line in parse_lines(text) {
            match parse_name_or_orcid(&line, self.lookup) {
                Ok(person) => people.push(person),
                Err(err) => self.report.error(field, err.to_string()),
            }
        }
        people
    }

    // ------------------------------------------------------------------
    // Section 1: model and submitter
    // ------------------------------------------------------------------

    fn creator(&mut self) {
        let Some(answer) = self.answer("creator", "creator/contributor orcid (or name)", true)
        else {
            return;
        };
        let Some(text) = answer else {
            self.report.error("creator", "no creator/contributor given");
            return;
        };
        match parse_name_or_orcid(&text, self.lookup) {
            Ok(person) => self.record.insert("creator", person),
            Err(err) => self.report.error("creator", err.to_string()),
        }
    }

    fn slug(&mut self, exists: &mut dyn FnMut(&str) -> bool) {
        let Some(answer) = self.answer("slug", "slug", true) else {
            return;
        };
        let proposed = answer.unwrap_or_default();
        match choose_slug(&proposed, exists) {
            Ok(slug) => {
                if slug != proposed.trim() {
                    self.report.warn(
                        "slug",
                        format!(
                            "repository cannot be created as `{}`; propose a new slug or it will be created as `{slug}`",
                            proposed.trim()
                        ),
                    );
                }
                self.record.insert("slug", slug);
            }
            Err(err) => {
                self.report.error("slug", err.to_string());
                self.record.insert("slug", "");
            }
        }
    }

    fn for_codes(&mut self) {
        let Some(answer) = self.answer("for_codes", "field of research (for) codes", true) else {
            return;
        };
        let mut terms = Vec::new();
        for code in parse_list(answer.as_deref().unwrap_or_default()) {
            match parse_for_code(&code) {
                Ok(term) => terms.push(term),
                Err(err) => self.report.error("for_codes", err.to_string()),
            }
        }
        if terms.is_empty() {
            self.report.warn("for_codes", "no Field of Research codes given");
        }
        self.record.insert("for_codes", terms);
    }

    fn license(&mut self) {
        match self.answer("license", "license", true) {
            Some(Some(text)) => self.record.insert("license", parse_license(&text)),
            Some(None) => self.report.warn("license", "no license selected"),
            None => {}
        }
    }

    fn model_category(&mut self) {
        let Some(answer) = self.answer("model_category", "model category", true) else {
            return;
        };
        let categories = parse_list(answer.as_deref().unwrap_or_default());
        if categories.is_empty() {
            self.report.warn("model_category", "no category selected");
        }
        self.record.insert("model_category", categories);
    }

    fn publication(&mut self) -> Option<Value> {
        let answer = self.answer("publication", "associated publication doi", true)?;
        let Some(text) = answer else {
            self.report.warn("publication", "no DOI provided");
            return None;
        };
        let uri = match parse_uri(&text) {
            Ok(uri) => uri,
            Err(err) => {
                self.report.error("publication", err.to_string());
                return None;
            }
        };

        let fetched = match bare_doi(&uri) {
            Some(doi) => {
                let doi = doi.to_string();
                self.fetch(RecordKind::Publication, &doi, "publication")
            }
            None => None,
        };
        let publication =
            fetched.unwrap_or_else(|| json!({"@type": "ScholarlyArticle", "@id": uri}));
        self.record.insert("publication", publication.clone());
        Some(publication)
    }

    fn title(&mut self, publication: Option<&Value>) {
        let Some(answer) = self.answer("title", "title", true) else {
            return;
        };
        let title = answer.or_else(|| {
            publication
                .and_then(|p| p.get("name"))
                .and_then(Value::as_str)
                .map(str::to_string)
        });
        match title {
            Some(title) => self.record.insert("title", title),
            None => {
                self.report.error("title", "no title found");
                self.record.insert("title", "");
            }
        }
    }

    fn description(&mut self, publication: Option<&Value>) {
        let Some(answer) = self.answer("description", "description", true) else {
            return;
        };
        let description = answer.or_else(|| {
            publication
                .and_then(|p| p.get("abstract"))
                .and_then(Value::as_str)
                .map(str::to_string)
        });
        match description {
            Some(description) => self.record.insert("description", description),
            None => {
                self.report.error(
                    "description",
                    "no description found, nor abstract for associated publication",
                );
                self.record.insert("description", "");
            }
        }
    }

    fn authors(&mut self, publication: Option<&Value>) {
        let Some(answer) = self.answer("authors", "model authors", true) else {
            return;
        };
        let authors = match answer {
            Some(text) => self.people("authors", &text),
            None => match publication.and_then(|p| p.get("author")).and_then(Value::as_array) {
                Some(authors) => authors.clone(),
                None => {
                    self.report.error("authors", "no authors found");
                    Vec::new()
                }
            },
        };
        self.record.insert("authors", authors);
    }

    fn keywords(&mut self) {
        let Some(answer) = self.answer("keywords", "scientific keywords", true) else {
            return;
        };
        let keywords = parse_list(answer.as_deref().unwrap_or_default());
        if keywords.is_empty() {
            self.report.warn("keywords", "no keywords given");
        }
        self.record.insert("keywords", keywords);
    }

    fn funders(&mut self, publication: Option<&Value>) {
        let Some(answer) = self.answer("funder", "funder", true) else {
            return;
        };
        let funders: Vec<Value> = match answer {
            Some(text) => parse_list(&text).iter().map(|f| parse_funder(f)).collect(),
            None => match publication.and_then(|p| p.get("funder")).and_then(Value::as_array) {
                Some(funders) => funders.clone(),
                None => {
                    self.report
                        .warn("funder", "no funders provided or found in publication");
                    Vec::new()
                }
            },
        };
        self.record.insert("funder", funders);
    }

    // ------------------------------------------------------------------
    // Section 2: model code and output
    // ------------------------------------------------------------------

    fn choice(&mut self, field: &str, label: &str) {
        let Some(answer) = self.answer(field, label, false) else {
            return;
        };
        match parse_yes_no_choice(answer.as_deref().unwrap_or_default()) {
            Ok(choice) => self.record.insert(field, choice),
            Err(err) => self.report.error(field, err.to_string()),
        }
    }

    fn uri(&mut self, field: &str, label: &str, warn_if_empty: bool) {
        match self.answer(field, label, false) {
            Some(Some(text)) => match parse_uri(&text) {
                Ok(uri) => self.record.insert(field, uri),
                Err(err) => self.report.error(field, err.to_string()),
            },
            Some(None) if warn_if_empty => self.report.warn(field, "no URI/DOI provided"),
            _ => {}
        }
    }

    // ------------------------------------------------------------------
    // Section 3: software framework
    // ------------------------------------------------------------------

    fn software(&mut self) {
        let mut software = json!({"@type": "SoftwareApplication"});

        if let Some(Some(text)) = self.answer("software", "software framework doi/uri", false) {
            match parse_uri(&text) {
                Ok(uri) => {
                    let record_id = zenodo_re()
                        .captures(&uri)
                        .and_then(|caps| caps.get(1))
                        .map(|m| m.as_str().to_string());
                    software = record_id
                        .and_then(|id| self.fetch(RecordKind::Software, &id, "software"))
                        .unwrap_or_else(|| json!({"@type": "SoftwareApplication", "url": uri}));
                }
                Err(err) => self.report.error("software", err.to_string()),
            }
        }

        if let Some(Some(text)) =
            self.answer("software", "software framework source repository", false)
        {
            match parse_uri(&text) {
                Ok(uri) => software["codeRepository"] = Value::from(uri),
                Err(err) => self.report.error("software", err.to_string()),
            }
        }
        if let Some(Some(name)) = self.answer("software", "name of primary software framework", false) {
            software["name"] = Value::from(name);
        }
        if let Some(Some(text)) = self.answer("software", "software framework authors", false) {
            let authors = self.people("software", &text);
            if !authors.is_empty() {
                software["author"] = Value::Array(authors);
            }
        }
        if let Some(Some(text)) = self.answer("software", "software & algorithm keywords", false) {
            software["keywords"] = json!(parse_list(&text));
        }

        if software.as_object().map_or(false, |s| s.len() > 1) {
            self.record.insert("software", software);
        }
    }

    // ------------------------------------------------------------------
    // Section 4: website material
    // ------------------------------------------------------------------

    fn figures(&mut self) {
        for (field, label) in FIGURES {
            if let Some(Some(text)) = self.answer(field, label, false) {
                match parse_image_and_caption(&text, field) {
                    Ok(image) => self.record.insert(field, image),
                    Err(err) => self.report.error(field, err.to_string()),
                }
            }
        }
    }
}
