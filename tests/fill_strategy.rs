mod common;

use common::{Field, acroform_template, field_value, flat_template, needs_appearances, record, shown, write_file};
use pln_form_pdf::{Error, FillStrategy, FillerConfig, FormFiller, Locator, detect, list_form_fields};

const RECORD: &str = r#"{
    "referenceId": "PLN-2024-0193",
    "idType": "Namibia ID-doc",
    "idNumber": "85010112345",
    "surname": "Nangolo",
    "initials": "TK",
    "plateFormat": "Square",
    "quantity": 1,
    "plateChoices": [{"text": "NAM 1"}],
    "declarationAccepted": true,
    "declarationDate": "2024-01-15"
}"#;

fn filler() -> FormFiller {
    FormFiller::new(FillerConfig::default().with_position_locators(Vec::new()))
}

#[test]
fn interactive_template_is_filled_natively() {
    let template = acroform_template(&[
        Field::Text("idNumber"),
        Field::Text("fullName"),
        Field::Check("idType_IDDoc"),
        Field::Check("idType_TrafficRegister"),
        Field::Check("plateFormat_Square"),
    ]);
    assert_eq!(detect(&template).field_count, 5);

    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "PLN2.pdf", &template);
    let result = filler().fill(&record(RECORD), &path).unwrap();
    assert_eq!(result.strategy, FillStrategy::Native);

    let bytes = &result.bytes;
    assert_eq!(field_value(bytes, "idNumber").as_deref(), Some("85010112345"));
    assert_eq!(field_value(bytes, "fullName").as_deref(), Some("Nangolo TK"));
    assert_eq!(field_value(bytes, "idType_IDDoc").as_deref(), Some("Yes"));
    assert_eq!(field_value(bytes, "idType_TrafficRegister").as_deref(), Some("Off"));
    assert_eq!(field_value(bytes, "plateFormat_Square").as_deref(), Some("Yes"));
    assert!(needs_appearances(bytes));

    // The overlay never ran: only the template's own text is on the page.
    let runs = shown(bytes);
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].text, "PLN2");
}

#[test]
fn flattened_template_gets_an_overlay() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "PLN2.pdf", &flat_template());
    let result = filler().fill(&record(RECORD), &path).unwrap();
    assert_eq!(result.strategy, FillStrategy::Overlay);

    let runs = shown(&result.bytes);
    assert!(runs.iter().any(|r| r.text == "PLN2"), "template content kept");
    assert!(runs.iter().any(|r| r.text == "85010112345"));
    assert!(runs.iter().any(|r| r.text == "NANGOLO"));
}

#[test]
fn corrupt_template_is_synthesized() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "PLN2.pdf", b"%PDF-1.5\n%%EOF\n");
    assert_eq!(detect(&std::fs::read(&path).unwrap()).field_count, 0);

    let result = filler().fill(&record(RECORD), &path).unwrap();
    assert_eq!(result.strategy, FillStrategy::Synthesized);
    let text: Vec<String> = shown(&result.bytes).into_iter().map(|r| r.text).collect();
    assert!(text.iter().any(|t| t.starts_with("A. PARTICULARS OF OWNER")));
    assert!(text.iter().any(|t| t.starts_with("F. FOR OFFICE USE")));
}

#[test]
fn missing_template_without_candidates_is_an_error() {
    let err = filler()
        .fill(&record(RECORD), std::path::Path::new("/nonexistent/PLN2.pdf"))
        .unwrap_err();
    assert!(matches!(err, Error::TemplateNotFound(_)), "got {err}");
}

#[test]
fn configured_template_candidate_is_used() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "PLN2.pdf", &flat_template());
    let config = FillerConfig::default()
        .with_position_locators(Vec::new())
        .with_template_locator(Locator::Path(path));
    let result = FormFiller::new(config)
        .fill(&record(RECORD), &dir.path().join("elsewhere.pdf"))
        .unwrap();
    assert_eq!(result.strategy, FillStrategy::Overlay);
}

#[test]
fn form_fields_are_listed_by_name() {
    let dir = tempfile::tempdir().unwrap();
    let template = acroform_template(&[Field::Text("surname"), Field::Check("hasRepresentative")]);
    let path = write_file(dir.path(), "PLN2.pdf", &template);
    let names = list_form_fields(&path).unwrap();
    assert_eq!(names, ["surname", "hasRepresentative"]);
}
