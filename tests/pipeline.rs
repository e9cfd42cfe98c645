//! Integration tests: fill small AcroForm templates built with lopdf and
//! read the result back.
//!
//! Nothing here needs an LLM or a pdfium shared library: text comes from
//! plain-text transcripts and records, and the heuristic extractor stands in
//! for LLM structuring.

use idfill::{
    fill_pdf, fill_pdf_bytes, gender_checkboxes, inspect_widgets, run_pipeline, Autofill, AutofillConfig,
    AutofillError, FieldSet, FieldValue, FormConfig, MappedData, OcrRecord, PipelineOutcome,
    TextSourceKind, WidgetInfo, WidgetKind,
};
use lopdf::{dictionary, Dictionary, Document, Object, Stream};
use std::path::{Path, PathBuf};

// ── Template fixture ─────────────────────────────────────────────────────────

fn name(s: &str) -> Object {
    Object::Name(s.as_bytes().to_vec())
}

fn rect() -> Object {
    Object::Array(vec![0.into(), 0.into(), 100.into(), 20.into()])
}

fn widget(field_type: &str, title: &str) -> Dictionary {
    dictionary! {
        "Type" => name("Annot"),
        "Subtype" => name("Widget"),
        "FT" => name(field_type),
        "T" => Object::string_literal(title),
        "Rect" => rect(),
    }
}

/// Two-page form:
///
/// * page 1: `Applicant_Name` (text, with an appearance stream),
///   `Applicant_DOB`, the `Gender_*` checkbox group and a kid widget whose
///   name `Aadhaar_Number` lives on its parent field
/// * page 2: an indirect `/Annots` array holding an inline `Update_Request`
///   checkbox and an `Address` text widget
fn build_template(path: &Path) {
    let mut doc = Document::with_version("1.5");
    let blank = doc.add_object(Object::Stream(Stream::new(dictionary! {}, Vec::new())));

    let mut applicant = widget("Tx", "Applicant_Name");
    applicant.set("AP", dictionary! { "N" => Object::Reference(blank) });
    let applicant_id = doc.add_object(applicant);
    let dob_id = doc.add_object(widget("Tx", "Applicant_DOB"));

    let mut male = widget("Btn", "Gender_Male");
    male.set("AS", name("Off"));
    male.set(
        "AP",
        dictionary! {
            "N" => dictionary! {
                "Off" => Object::Reference(blank),
                "On" => Object::Reference(blank),
            },
        },
    );
    let male_id = doc.add_object(male);

    let mut female = widget("Btn", "Gender_Female");
    female.set("AS", name("Off"));
    let female_id = doc.add_object(female);

    let mut third = widget("Btn", "Gender_Third");
    third.set("AS", name("Off"));
    let third_id = doc.add_object(third);

    let aadhaar_id = doc.add_object(dictionary! {
        "FT" => name("Tx"),
        "T" => Object::string_literal("Aadhaar_Number"),
    });
    let kid_id = doc.add_object(dictionary! {
        "Type" => name("Annot"),
        "Subtype" => name("Widget"),
        "Parent" => Object::Reference(aadhaar_id),
        "Rect" => rect(),
    });
    if let Ok(Object::Dictionary(ref mut parent)) = doc.get_object_mut(aadhaar_id) {
        parent.set("Kids", vec![Object::Reference(kid_id)]);
    }

    let mut update = widget("Btn", "Update_Request");
    update.set("AS", name("Off"));
    let address_id = doc.add_object(widget("Tx", "Address"));
    let page2_annots = doc.add_object(Object::Array(vec![
        Object::Dictionary(update),
        Object::Reference(address_id),
    ]));

    let page1_id = doc.add_object(dictionary! {
        "Type" => name("Page"),
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        "Annots" => vec![
            Object::Reference(applicant_id),
            Object::Reference(dob_id),
            Object::Reference(male_id),
            Object::Reference(female_id),
            Object::Reference(third_id),
            Object::Reference(kid_id),
        ],
    });
    let page2_id = doc.add_object(dictionary! {
        "Type" => name("Page"),
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        "Annots" => Object::Reference(page2_annots),
    });

    let pages_id = doc.add_object(dictionary! {
        "Type" => name("Pages"),
        "Kids" => vec![Object::Reference(page1_id), Object::Reference(page2_id)],
        "Count" => Object::Integer(2),
    });
    for page_id in [page1_id, page2_id] {
        if let Ok(Object::Dictionary(ref mut page)) = doc.get_object_mut(page_id) {
            page.set("Parent", Object::Reference(pages_id));
        }
    }

    let acro_form_id = doc.add_object(dictionary! {
        "Fields" => vec![
            Object::Reference(applicant_id),
            Object::Reference(dob_id),
            Object::Reference(male_id),
            Object::Reference(female_id),
            Object::Reference(third_id),
            Object::Reference(aadhaar_id),
            Object::Reference(address_id),
        ],
    });
    let catalog_id = doc.add_object(dictionary! {
        "Type" => name("Catalog"),
        "Pages" => Object::Reference(pages_id),
        "AcroForm" => Object::Reference(acro_form_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    doc.save(path).unwrap();
}

const MAPPING: &str = r#"{
    "fields": {
        "name":           { "pdf_field": "Applicant_Name" },
        "dob":            { "pdf_field": "Applicant_DOB" },
        "aadhaar_number": { "pdf_field": "Aadhaar_Number" },
        "address":        { "pdf_field": "Address" },
        "male":           { "pdf_field": "Gender_Male", "kind": "checkbox" },
        "female":         { "pdf_field": "Gender_Female", "kind": "checkbox" },
        "third_gender":   { "pdf_field": "Gender_Third", "kind": "checkbox" },
        "update":         { "pdf_field": "Update_Request", "kind": "checkbox" }
    },
    "defaults": { "update": true }
}"#;

const CARD: &str = "GOVERNMENT OF INDIA\n\
    Asha Rao\n\
    DOB: 01/02/1990\n\
    FEMALE\n\
    1234 5678 9012\n\
    Address: 12 MG Road, Pune, Maharashtra 411001";

// ── Read-back helpers ────────────────────────────────────────────────────────

fn values(path: &Path) -> Vec<(String, Option<String>)> {
    inspect_widgets(path)
        .unwrap()
        .into_iter()
        .map(|w| (w.name, w.value))
        .collect()
}

fn value_of(path: &Path, field: &str) -> Option<String> {
    inspect_widgets(path)
        .unwrap()
        .into_iter()
        .find(|w| w.name == field)
        .unwrap_or_else(|| panic!("no widget {field}"))
        .value
}

/// Field dictionary (an indirect object) carrying `/T (title)`.
fn field<'a>(doc: &'a Document, title: &str) -> &'a Dictionary {
    doc.objects
        .values()
        .filter_map(|o| o.as_dict().ok())
        .find(|d| matches!(d.get(b"T"), Ok(Object::String(s, _)) if s.as_slice() == title.as_bytes()))
        .unwrap_or_else(|| panic!("no field {title}"))
}

fn acro_form(doc: &Document) -> &Dictionary {
    let root = doc.trailer.get(b"Root").and_then(Object::as_reference).unwrap();
    let acro = doc
        .get_object(root)
        .and_then(Object::as_dict)
        .and_then(|c| c.get(b"AcroForm"))
        .and_then(Object::as_reference)
        .unwrap();
    doc.get_object(acro).and_then(Object::as_dict).unwrap()
}

fn data(pairs: &[(&str, FieldValue)]) -> MappedData {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn sample_data() -> MappedData {
    data(&[
        ("Applicant_Name", "Asha Rao".into()),
        ("Applicant_DOB", "01/02/1990".into()),
        ("Aadhaar_Number", "123456789012".into()),
        ("Address", "12 MG Road, Pune".into()),
        ("Gender_Male", false.into()),
        ("Gender_Female", true.into()),
        ("Update_Request", true.into()),
        ("Not_A_Widget", "ignored".into()),
    ])
}

// ── Form filler ──────────────────────────────────────────────────────────────

#[test]
fn inspect_lists_every_widget_in_page_order() {
    let dir = tempfile::tempdir().unwrap();
    let template = dir.path().join("form.pdf");
    build_template(&template);

    let widgets = inspect_widgets(&template).unwrap();
    let names: Vec<&str> = widgets.iter().map(|w| w.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "Applicant_Name",
            "Applicant_DOB",
            "Gender_Male",
            "Gender_Female",
            "Gender_Third",
            "Aadhaar_Number",
            "Update_Request",
            "Address",
        ]
    );
    assert_eq!(
        widgets[2],
        WidgetInfo {
            page: 1,
            name: "Gender_Male".into(),
            kind: WidgetKind::Checkbox,
            value: None,
        }
    );
    // Field type is inherited from the parent of a nameless kid.
    assert_eq!(widgets[5].kind, WidgetKind::Text);
    assert_eq!(widgets[6].page, 2);
    assert!(widgets.iter().all(|w| w.value.is_none()));
}

#[test]
fn fill_writes_text_and_checkboxes() {
    let dir = tempfile::tempdir().unwrap();
    let template = dir.path().join("form.pdf");
    let out = dir.path().join("filled.pdf");
    build_template(&template);

    let stats = fill_pdf(&template, &out, &sample_data()).unwrap();
    assert_eq!(stats.widgets_seen, 8);
    assert_eq!(stats.text_written, 4);
    assert_eq!(stats.checkboxes_written, 3);
    assert_eq!(stats.unmatched_keys, 1);

    assert_eq!(value_of(&out, "Applicant_Name").as_deref(), Some("Asha Rao"));
    assert_eq!(value_of(&out, "Applicant_DOB").as_deref(), Some("01/02/1990"));
    assert_eq!(value_of(&out, "Address").as_deref(), Some("12 MG Road, Pune"));
    assert_eq!(value_of(&out, "Gender_Male").as_deref(), Some("Off"));
    assert_eq!(value_of(&out, "Gender_Female").as_deref(), Some("Yes"));
    assert_eq!(value_of(&out, "Gender_Third"), None);

    // The template is never modified.
    assert_eq!(value_of(&template, "Applicant_Name"), None);
}

#[test]
fn checked_box_uses_its_appearance_on_state() {
    let dir = tempfile::tempdir().unwrap();
    let template = dir.path().join("form.pdf");
    let out = dir.path().join("filled.pdf");
    build_template(&template);

    fill_pdf(&template, &out, &data(&[("Gender_Male", "yes".into())])).unwrap();

    let doc = Document::load(&out).unwrap();
    let male = field(&doc, "Gender_Male");
    assert_eq!(male.get(b"V").and_then(Object::as_name).unwrap(), b"On");
    assert_eq!(male.get(b"AS").and_then(Object::as_name).unwrap(), b"On");
    assert!(male.get(b"AP").is_err(), "appearance must be dropped");

    // Untouched boxes keep their state.
    let third = field(&doc, "Gender_Third");
    assert_eq!(third.get(b"AS").and_then(Object::as_name).unwrap(), b"Off");
    assert!(third.get(b"V").is_err());
}

#[test]
fn text_fill_drops_appearance_and_requests_regeneration() {
    let dir = tempfile::tempdir().unwrap();
    let template = dir.path().join("form.pdf");
    let out = dir.path().join("filled.pdf");
    build_template(&template);

    fill_pdf(&template, &out, &data(&[("Applicant_Name", "Asha Rao".into())])).unwrap();

    let doc = Document::load(&out).unwrap();
    assert!(field(&doc, "Applicant_Name").get(b"AP").is_err());
    assert!(acro_form(&doc).get(b"NeedAppearances").and_then(Object::as_bool).unwrap());
}

#[test]
fn kid_widget_value_goes_on_named_parent() {
    let dir = tempfile::tempdir().unwrap();
    let template = dir.path().join("form.pdf");
    let out = dir.path().join("filled.pdf");
    build_template(&template);

    fill_pdf(&template, &out, &data(&[("Aadhaar_Number", "123456789012".into())])).unwrap();

    let doc = Document::load(&out).unwrap();
    let parent = field(&doc, "Aadhaar_Number");
    assert!(matches!(parent.get(b"V"), Ok(Object::String(s, _)) if s.as_slice() == b"123456789012"));

    let kid = doc
        .objects
        .values()
        .filter_map(|o| o.as_dict().ok())
        .find(|d| d.has(b"Parent") && d.has(b"Subtype"))
        .unwrap();
    assert!(kid.get(b"V").is_err());
}

#[test]
fn inline_widget_in_indirect_annots_is_filled() {
    let dir = tempfile::tempdir().unwrap();
    let template = dir.path().join("form.pdf");
    let out = dir.path().join("filled.pdf");
    build_template(&template);

    let stats = fill_pdf(&template, &out, &data(&[("Update_Request", FieldValue::Int(1))])).unwrap();
    assert_eq!(stats.checkboxes_written, 1);
    assert_eq!(value_of(&out, "Update_Request").as_deref(), Some("Yes"));
}

#[test]
fn unknown_keys_leave_the_document_alone() {
    let dir = tempfile::tempdir().unwrap();
    let template = dir.path().join("form.pdf");
    let out = dir.path().join("filled.pdf");
    build_template(&template);

    let stats = fill_pdf(&template, &out, &data(&[("Nope", "x".into())])).unwrap();
    assert_eq!(stats.text_written + stats.checkboxes_written, 0);
    assert_eq!(stats.unmatched_keys, 1);
    assert_eq!(values(&out), values(&template));

    let doc = Document::load(&out).unwrap();
    assert!(acro_form(&doc).get(b"NeedAppearances").is_err());
    assert!(field(&doc, "Applicant_Name").has(b"AP"));
}

#[test]
fn filling_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let template = dir.path().join("form.pdf");
    let once = dir.path().join("once.pdf");
    let twice = dir.path().join("twice.pdf");
    build_template(&template);

    let mut mapped = sample_data();
    mapped.insert("Gender_Male".into(), true.into());
    fill_pdf(&template, &once, &mapped).unwrap();
    fill_pdf(&once, &twice, &mapped).unwrap();

    assert_eq!(values(&once), values(&twice));
    assert_eq!(value_of(&twice, "Gender_Male").as_deref(), Some("On"));
}

#[test]
fn non_ascii_text_survives() {
    let dir = tempfile::tempdir().unwrap();
    let template = dir.path().join("form.pdf");
    let out = dir.path().join("filled.pdf");
    build_template(&template);

    fill_pdf(&template, &out, &data(&[("Applicant_Name", "आशा राव".into())])).unwrap();
    assert_eq!(value_of(&out, "Applicant_Name").as_deref(), Some("आशा राव"));
}

#[test]
fn in_memory_fill_matches_file_fill() {
    let dir = tempfile::tempdir().unwrap();
    let template = dir.path().join("form.pdf");
    let out = dir.path().join("filled.pdf");
    let from_bytes = dir.path().join("bytes.pdf");
    build_template(&template);

    fill_pdf(&template, &out, &sample_data()).unwrap();
    let bytes = fill_pdf_bytes(&std::fs::read(&template).unwrap(), &sample_data()).unwrap();
    std::fs::write(&from_bytes, bytes).unwrap();

    assert_eq!(values(&out), values(&from_bytes));
}

#[test]
fn unwritable_output_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let template = dir.path().join("form.pdf");
    build_template(&template);

    let out = dir.path().join("missing").join("filled.pdf");
    let err = fill_pdf(&template, &out, &sample_data()).unwrap_err();
    assert!(matches!(err, AutofillError::OutputWriteFailed { .. }));
    assert!(!out.exists());
}

// ── Radio groups ─────────────────────────────────────────────────────────────

/// One-page form with a `Gender` radio field whose two kids carry the
/// on-states `Male` and `Female`.
fn radio_template() -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let blank = doc.add_object(Object::Stream(Stream::new(dictionary! {}, Vec::new())));

    let group_id = doc.add_object(dictionary! {
        "FT" => name("Btn"),
        "Ff" => Object::Integer(49152),
        "T" => Object::string_literal("Gender"),
    });
    let kid = |on: &str| {
        dictionary! {
            "Type" => name("Annot"),
            "Subtype" => name("Widget"),
            "Parent" => Object::Reference(group_id),
            "Rect" => rect(),
            "AS" => name("Off"),
            "AP" => dictionary! {
                "N" => dictionary! {
                    on => Object::Reference(blank),
                    "Off" => Object::Reference(blank),
                },
            },
        }
    };
    let male_id = doc.add_object(kid("Male"));
    let female_id = doc.add_object(kid("Female"));
    if let Ok(Object::Dictionary(ref mut group)) = doc.get_object_mut(group_id) {
        group.set("Kids", vec![Object::Reference(male_id), Object::Reference(female_id)]);
    }

    let page_id = doc.add_object(dictionary! {
        "Type" => name("Page"),
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        "Annots" => vec![Object::Reference(male_id), Object::Reference(female_id)],
    });
    let pages_id = doc.add_object(dictionary! {
        "Type" => name("Pages"),
        "Kids" => vec![Object::Reference(page_id)],
        "Count" => Object::Integer(1),
    });
    if let Ok(Object::Dictionary(ref mut page)) = doc.get_object_mut(page_id) {
        page.set("Parent", Object::Reference(pages_id));
    }
    let acro_form_id = doc.add_object(dictionary! {
        "Fields" => vec![Object::Reference(group_id)],
    });
    let catalog_id = doc.add_object(dictionary! {
        "Type" => name("Catalog"),
        "Pages" => Object::Reference(pages_id),
        "AcroForm" => Object::Reference(acro_form_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// Parent `/V` and the kids' `/AS`, in `/Kids` order.
fn radio_states(bytes: &[u8]) -> (Option<Vec<u8>>, Vec<Vec<u8>>) {
    let doc = Document::load_mem(bytes).unwrap();
    let group = field(&doc, "Gender");
    let value = group.get(b"V").and_then(Object::as_name).ok().map(<[u8]>::to_vec);
    let kids = group
        .get(b"Kids")
        .and_then(Object::as_array)
        .unwrap()
        .iter()
        .map(|k| {
            let kid = doc.get_object(k.as_reference().unwrap()).and_then(Object::as_dict).unwrap();
            kid.get(b"AS").and_then(Object::as_name).unwrap().to_vec()
        })
        .collect();
    (value, kids)
}

#[test]
fn checked_radio_group_selects_exactly_one_kid() {
    let filled = fill_pdf_bytes(&radio_template(), &data(&[("Gender", true.into())])).unwrap();

    let (value, kids) = radio_states(&filled);
    assert_eq!(value.as_deref(), Some(&b"Male"[..]));
    assert_eq!(kids, vec![b"Male".to_vec(), b"Off".to_vec()]);
}

#[test]
fn unchecked_radio_group_turns_every_kid_off() {
    let filled = fill_pdf_bytes(&radio_template(), &data(&[("Gender", false.into())])).unwrap();

    let (value, kids) = radio_states(&filled);
    assert_eq!(value.as_deref(), Some(&b"Off"[..]));
    assert_eq!(kids, vec![b"Off".to_vec(), b"Off".to_vec()]);
}

#[test]
fn refilling_a_radio_group_keeps_one_selection() {
    let mapped = data(&[("Gender", "yes".into())]);
    let once = fill_pdf_bytes(&radio_template(), &mapped).unwrap();
    let twice = fill_pdf_bytes(&once, &mapped).unwrap();

    assert_eq!(radio_states(&once), radio_states(&twice));
}

// ── run_pipeline ─────────────────────────────────────────────────────────────

fn form() -> FormConfig {
    FormConfig::from_json(MAPPING).unwrap()
}

fn valid_fields() -> FieldSet {
    let mut fields = FieldSet::new();
    fields.insert("name", "Asha Rao");
    fields.insert("dob", "01/02/1990");
    fields.insert("gender", "Female");
    fields.insert("aadhaar_number", "1234 5678 9012");
    for (key, on) in gender_checkboxes("Female") {
        fields.insert(key, on);
    }
    fields
}

#[test]
fn pipeline_success_reports_mapped_data() {
    let dir = tempfile::tempdir().unwrap();
    let template = dir.path().join("form.pdf");
    let out = dir.path().join("filled.pdf");
    build_template(&template);

    let outcome = run_pipeline(&form(), &valid_fields(), &template, &out).unwrap();
    let PipelineOutcome::Success { mapped_data } = outcome else {
        panic!("expected success, got {outcome:?}");
    };
    assert_eq!(mapped_data["Applicant_Name"], FieldValue::from("Asha Rao"));
    assert_eq!(mapped_data["Gender_Female"], FieldValue::Bool(true));
    assert_eq!(mapped_data["Gender_Male"], FieldValue::Bool(false));
    assert!(!mapped_data.contains_key("Address"));
    assert!(!mapped_data.contains_key("Update_Request"));

    assert_eq!(value_of(&out, "Aadhaar_Number").as_deref(), Some("1234 5678 9012"));
    assert_eq!(value_of(&out, "Gender_Female").as_deref(), Some("Yes"));
}

#[test]
fn pipeline_collects_every_validation_error_and_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let template = dir.path().join("form.pdf");
    let out = dir.path().join("filled.pdf");
    build_template(&template);

    let mut fields = FieldSet::new();
    fields.insert("dob", "31/02/1990");
    fields.insert("gender", "Unknown");
    fields.insert("aadhaar_number", "12345");

    let outcome = run_pipeline(&form(), &fields, &template, &out).unwrap();
    assert_eq!(
        outcome.errors(),
        [
            "Name is missing",
            "DOB format invalid",
            "Invalid gender",
            "Invalid Aadhaar number (expect 12 digits)",
        ]
    );
    assert!(!out.exists());
}

#[test]
fn pipeline_requires_the_template() {
    let dir = tempfile::tempdir().unwrap();
    let err = run_pipeline(
        &form(),
        &valid_fields(),
        &dir.path().join("absent.pdf"),
        &dir.path().join("out.pdf"),
    )
    .unwrap_err();
    assert!(matches!(err, AutofillError::FileNotFound { .. }));
}

// ── Autofill service ─────────────────────────────────────────────────────────

struct Workspace {
    _dir: tempfile::TempDir,
    root: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        std::fs::create_dir_all(root.join("config")).unwrap();
        std::fs::create_dir_all(root.join("forms")).unwrap();
        std::fs::write(root.join("config/test_form_mapping.json"), MAPPING).unwrap();
        build_template(&root.join("forms/test_form.pdf"));
        Self { _dir: dir, root }
    }

    fn output_dir(&self) -> PathBuf {
        self.root.join("out")
    }

    fn outputs(&self) -> Vec<PathBuf> {
        match std::fs::read_dir(self.output_dir()) {
            Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
            Err(_) => Vec::new(),
        }
    }

    fn transcript(&self, text: &str) -> String {
        let path = self.root.join("card.txt");
        std::fs::write(&path, text).unwrap();
        path.to_string_lossy().into_owned()
    }

    async fn service(&self) -> Autofill {
        let config = AutofillConfig::builder()
            .config_dir(self.root.join("config"))
            .forms_dir(self.root.join("forms"))
            .output_dir(self.output_dir())
            .text_source(TextSourceKind::PlainText)
            .structure_with_llm(false)
            .build()
            .unwrap();
        Autofill::new(config).await.unwrap()
    }
}

#[tokio::test]
async fn transcript_to_filled_form() {
    let ws = Workspace::new();
    let service = ws.service().await;
    let input = ws.transcript(CARD);

    let report = service.process_document(&input, "test_form").await.unwrap();
    assert!(report.outcome.is_success(), "{:?}", report.outcome);

    let out = report.output_path.expect("output path");
    assert_eq!(out.parent(), Some(ws.output_dir().as_path()));
    let file_name = out.file_name().unwrap().to_string_lossy().into_owned();
    assert!(file_name.starts_with("test_form_filled_") && file_name.ends_with(".pdf"));

    assert_eq!(value_of(&out, "Applicant_Name").as_deref(), Some("Asha Rao"));
    assert_eq!(value_of(&out, "Applicant_DOB").as_deref(), Some("01/02/1990"));
    assert_eq!(value_of(&out, "Aadhaar_Number").as_deref(), Some("123456789012"));
    assert_eq!(value_of(&out, "Gender_Female").as_deref(), Some("Yes"));
    assert_eq!(value_of(&out, "Gender_Male").as_deref(), Some("Off"));
    // From the form's defaults.
    assert_eq!(value_of(&out, "Update_Request").as_deref(), Some("Yes"));

    let stats = report.stats.expect("stats");
    assert_eq!(stats.widgets_seen, 8);
}

#[tokio::test]
async fn concurrent_requests_get_distinct_outputs() {
    let ws = Workspace::new();
    let service = ws.service().await;
    let input = ws.transcript(CARD);

    let (a, b) = tokio::join!(
        service.process_document(&input, "test_form"),
        service.process_document(&input, "test_form"),
    );
    let (a, b) = (a.unwrap(), b.unwrap());
    assert_ne!(a.output_path, b.output_path);
    assert_eq!(ws.outputs().len(), 2);
}

#[tokio::test]
async fn rejected_transcript_leaves_no_output() {
    let ws = Workspace::new();
    let service = ws.service().await;
    let input = ws.transcript("Asha Rao\nFEMALE\n1234 5678 9012");

    let report = service.process_document(&input, "test_form").await.unwrap();
    assert_eq!(report.outcome.errors(), ["DOB is missing"]);
    assert!(report.output_path.is_none());
    assert!(ws.outputs().is_empty());
}

#[tokio::test]
async fn unknown_form_is_reported_not_raised() {
    let ws = Workspace::new();
    let service = ws.service().await;
    let input = ws.transcript(CARD);

    let report = service.process_document(&input, "nope").await.unwrap();
    assert_eq!(report.outcome.errors(), ["Config file not found for nope"]);
}

#[tokio::test]
async fn record_fill_normalises_ids() {
    let ws = Workspace::new();
    let service = ws.service().await;
    let record: OcrRecord = serde_json::from_str(
        r#"{
            "DocumentType": "Aadhaar Card",
            "Name": "Ravi Kumar",
            "DOB": "15/08/1985",
            "Gender": "MALE",
            "AadhaarNo": "1234 5678 9O12",
            "Address": "4 Station Road, Shivaji Nagar, Near Temple, Nashik, Maharashtra"
        }"#,
    )
    .unwrap();

    let report = service.fill_from_record(record, "test_form").await.unwrap();
    assert!(report.outcome.is_success(), "{:?}", report.outcome);
    let out = report.output_path.unwrap();

    assert_eq!(value_of(&out, "Aadhaar_Number").as_deref(), Some("123456789012"));
    assert_eq!(value_of(&out, "Gender_Male").as_deref(), Some("On"));
    assert_eq!(value_of(&out, "Gender_Female").as_deref(), Some("Off"));
}

#[tokio::test]
async fn missing_record_file_is_reported() {
    let ws = Workspace::new();
    let service = ws.service().await;

    let report = service
        .fill_from_record_file(&ws.root.join("absent.json"), "test_form")
        .await
        .unwrap();
    assert_eq!(report.outcome.errors(), ["OCR data file not found for test_form"]);
}

#[tokio::test]
async fn direct_data_fill_only_adds_defaults() {
    let ws = Workspace::new();
    let service = ws.service().await;

    let mut fields = FieldSet::new();
    fields.insert("name", "Asha Rao");
    fields.insert("dob", "01/02/1990");
    fields.insert("update", false);

    let report = service.fill_form_with_data(fields, "test_form").await.unwrap();
    let PipelineOutcome::Success { ref mapped_data } = report.outcome else {
        panic!("expected success, got {:?}", report.outcome);
    };
    assert_eq!(mapped_data.len(), 3);
    assert_eq!(mapped_data["Update_Request"], FieldValue::Bool(false));
}
