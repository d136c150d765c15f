mod common;

use common::{record, shown, write_file};
use pln_form_pdf::{FillStrategy, FillerConfig, FormFiller, synthesize_to_file};

const FULL_RECORD: &str = r#"{
    "referenceId": "PLN-2024-0193",
    "transactionType": "Allocate a personalised licence number to another vehicle",
    "idType": "Traffic Register Number",
    "trafficRegisterNumber": "TRN0042",
    "surname": "Nangolo",
    "initials": "TK",
    "postalAddress": {"line1": "PO Box 2231", "line2": "Windhoek"},
    "streetAddress": {"line1": "12 Robert Mugabe Ave", "line2": "Klein Windhoek", "line3": "Windhoek"},
    "telephoneHome": {"code": "061", "number": "223344"},
    "cellNumber": {"code": "081", "number": "1234567"},
    "email": "t.nangolo@example.na",
    "plateFormat": "Long/German",
    "quantity": 2,
    "plateChoices": [{"text": "NAM 1", "meaning": "first"}, {"text": "TK 2"}],
    "hasRepresentative": true,
    "representativeIdType": "Namibia ID-doc",
    "representativeIdNumber": "90020254321",
    "representativeSurname": "Shikongo",
    "representativeInitials": "P",
    "vehicleRegisterNumber": "N 12345 W",
    "chassisNumber": "WVWZZZ1JZXW000001",
    "vehicleMake": "Volkswagen",
    "declarationAccepted": true,
    "declarationPlace": "Windhoek",
    "declarationDate": "2024-01-15T09:30:00Z",
    "declarationRole": "applicant"
}"#;

fn texts(bytes: &[u8]) -> Vec<String> {
    shown(bytes).into_iter().map(|r| r.text).collect()
}

fn has_heading(texts: &[String], prefix: &str) -> bool {
    texts.iter().any(|t| t.starts_with(prefix))
}

#[test]
fn broken_template_yields_replica_with_all_populated_sections() {
    let dir = tempfile::tempdir().unwrap();
    let template = write_file(dir.path(), "PLN2.pdf", b"%PDF-1.7\ntruncated");
    let filler = FormFiller::new(FillerConfig::default().with_position_locators(Vec::new()));
    let result = filler.fill(&record(FULL_RECORD), &template).unwrap();
    assert_eq!(result.strategy, FillStrategy::Synthesized);

    let texts = texts(&result.bytes);
    for heading in [
        "A. PARTICULARS OF OWNER",
        "B. PERSONALISED NUMBER PLATE",
        "C. APPLICANT'S REPRESENTATIVE",
        "D. PARTICULARS OF VEHICLE",
        "E. DECLARATION",
        "F. FOR OFFICE USE",
    ] {
        assert!(has_heading(&texts, heading), "missing {heading}");
    }
}

#[test]
fn replica_spans_pages_of_a4() {
    let filler = FormFiller::new(FillerConfig::default());
    let bytes = filler.synthesize(&record(FULL_RECORD)).unwrap();
    let doc = lopdf::Document::load_mem(&bytes).unwrap();
    let pages = doc.get_pages();
    assert!(pages.len() >= 2, "full record fits on {} page(s)", pages.len());
    for id in pages.values() {
        let media = doc
            .get_dictionary(*id)
            .unwrap()
            .get(b"MediaBox")
            .unwrap()
            .as_array()
            .unwrap()
            .clone();
        let height = media[3].as_float().unwrap();
        assert!((height - 841.89).abs() < 0.01);
    }
}

#[test]
fn grids_carry_one_capital_per_box() {
    let filler = FormFiller::new(FillerConfig::default());
    let bytes = filler.synthesize(&record(FULL_RECORD)).unwrap();
    let texts = texts(&bytes);
    // Traffic register number "TRN0042" box by box.
    let start = texts
        .windows(7)
        .position(|w| w.iter().map(String::as_str).eq(["T", "R", "N", "0", "0", "4", "2"]));
    assert!(start.is_some(), "identification number grid not found");
    assert!(!texts.iter().any(|t| t == "TRN0042"));
    // Declaration date parts.
    for part in ["2", "4", "0", "1", "1", "5"] {
        assert!(texts.iter().any(|t| t == part));
    }
}

#[test]
fn sections_without_data_are_left_out() {
    let filler = FormFiller::new(FillerConfig::default());
    let bytes = filler
        .synthesize(&record(r#"{"idType": "Namibia ID-doc", "idNumber": "85010112345"}"#))
        .unwrap();
    let texts = texts(&bytes);
    assert!(has_heading(&texts, "A. PARTICULARS OF OWNER"));
    assert!(has_heading(&texts, "E. DECLARATION"));
    assert!(!has_heading(&texts, "C. APPLICANT"));
    assert!(!has_heading(&texts, "D. PARTICULARS OF VEHICLE"));
}

#[test]
fn unknown_font_family_falls_back_to_helvetica() {
    let dir = tempfile::tempdir().unwrap();
    let filler = FormFiller::new(
        FillerConfig::default()
            .with_font_dir(dir.path())
            .with_font_family("No Such Family"),
    );
    let bytes = filler.synthesize(&record(FULL_RECORD)).unwrap();
    let doc = lopdf::Document::load_mem(&bytes).unwrap();
    let base_fonts: Vec<Vec<u8>> = doc
        .objects
        .values()
        .filter_map(|o| o.as_dict().ok())
        .filter_map(|d| d.get(b"BaseFont").ok())
        .filter_map(|n| n.as_name().ok())
        .map(<[u8]>::to_vec)
        .collect();
    assert!(base_fonts.contains(&b"Helvetica".to_vec()));
    assert!(base_fonts.contains(&b"Helvetica-Bold".to_vec()));
}

#[test]
fn synthesize_writes_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let record = write_file(dir.path(), "record.json", FULL_RECORD.as_bytes());
    let output = dir.path().join("out.pdf");
    synthesize_to_file(&FormFiller::new(FillerConfig::default()), &record, &output).unwrap();
    let bytes = std::fs::read(&output).unwrap();
    assert!(bytes.starts_with(b"%PDF"));
}
