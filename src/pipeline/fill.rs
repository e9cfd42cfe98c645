//! Form Filler: write widget values into a PDF template.
//!
//! The document is loaded with `lopdf`, mutated in memory and serialised in
//! one go. Widgets are collected first (read-only pass) and edited second,
//! so the walk over pages never holds a borrow while writing.
//!
//! Per widget:
//! * the name is the widget's `/T`, else the nearest `/Parent` with a `/T`;
//!   the value goes on whichever dictionary owns the name
//! * `/FT /Btn` widgets get a two-state name (`on-state` or `/Off`) in both
//!   `/V` and `/AS`; everything else gets a text string in `/V`
//! * kids of one button field (radio groups) share a single on-state: the
//!   first kid's. Kids with a different on-state are set to `/Off`, so the
//!   parent's `/V` always names the one selected kid
//! * `/AP` is dropped after writing and the AcroForm is flagged
//!   `/NeedAppearances true` so viewers rebuild the rendering
//!
//! Keys with no matching widget are counted and otherwise ignored.

use crate::error::AutofillError;
use crate::fields::MappedData;
use crate::form_config::WidgetKind;
use crate::output::{FillStats, WidgetInfo};
use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Parent-chain depth after which a malformed field tree is abandoned.
const MAX_PARENT_DEPTH: usize = 32;

const DEFAULT_ON_STATE: &[u8] = b"Yes";
const OFF_STATE: &[u8] = b"Off";

/// Fill `input` with `data` and write the result to `output`.
///
/// The output is written to a temp file beside `output` and renamed into
/// place, so a failed save never leaves a partial PDF at `output`.
pub fn fill_pdf(input: &Path, output: &Path, data: &MappedData) -> Result<FillStats, AutofillError> {
    let mut doc = load_document(input)?;
    let stats = fill_document(&mut doc, data);
    save_atomic(&mut doc, output)?;
    info!(
        "Filled {} → {} ({} text, {} checkbox, {} unmatched)",
        input.display(),
        output.display(),
        stats.text_written,
        stats.checkboxes_written,
        stats.unmatched_keys
    );
    Ok(stats)
}

/// In-memory variant of [`fill_pdf`].
pub fn fill_pdf_bytes(template: &[u8], data: &MappedData) -> Result<Vec<u8>, AutofillError> {
    let mut doc = Document::load_mem(template).map_err(|e| AutofillError::CorruptPdf {
        path: PathBuf::from("<memory>"),
        detail: e.to_string(),
    })?;
    fill_document(&mut doc, data);
    let mut buf = Vec::new();
    doc.save_to(&mut buf).map_err(|e| AutofillError::OutputWriteFailed {
        path: PathBuf::from("<memory>"),
        source: std::io::Error::other(e.to_string()),
    })?;
    Ok(buf)
}

/// List every widget in a PDF without modifying it.
pub fn inspect_widgets(path: &Path) -> Result<Vec<WidgetInfo>, AutofillError> {
    let doc = load_document(path)?;
    Ok(collect_widgets(&doc)
        .into_iter()
        .map(|w| WidgetInfo {
            page: w.page,
            name: w.name,
            kind: w.kind,
            value: w.value,
        })
        .collect())
}

/// Reserve a fresh `<form_type>_filled_<timestamp>.pdf` in `output_dir`.
///
/// The file is created with create-new semantics; on a name clash a `-n`
/// suffix is tried instead, so two concurrent requests never share a path.
pub fn unique_output_path(output_dir: &Path, form_type: &str) -> Result<PathBuf, AutofillError> {
    let write_err = |path: &Path, source: std::io::Error| AutofillError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };
    std::fs::create_dir_all(output_dir).map_err(|e| write_err(output_dir, e))?;

    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S_%6f");
    let base = format!("{form_type}_filled_{stamp}");
    for n in 0u32.. {
        let name = match n {
            0 => format!("{base}.pdf"),
            n => format!("{base}-{n}.pdf"),
        };
        let path = output_dir.join(name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => return Ok(path),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(write_err(&path, e)),
        }
    }
    Err(AutofillError::Internal("output name space exhausted".into()))
}

fn load_document(path: &Path) -> Result<Document, AutofillError> {
    crate::pipeline::input::open_checked(path)?;
    Document::load(path).map_err(|e| AutofillError::CorruptPdf {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })
}

fn save_atomic(doc: &mut Document, output: &Path) -> Result<(), AutofillError> {
    let write_err = |source: std::io::Error| AutofillError::OutputWriteFailed {
        path: output.to_path_buf(),
        source,
    };
    let dir = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    doc.save_to(&mut tmp)
        .map_err(|e| write_err(std::io::Error::other(e.to_string())))?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(output).map_err(|e| write_err(e.error))?;
    Ok(())
}

// ── Widget discovery ─────────────────────────────────────────────────────

/// Where a page's `/Annots` array lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AnnotsHolder {
    /// Inline in the page dictionary.
    Page(ObjectId),
    /// An indirect array object.
    Array(ObjectId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WidgetLoc {
    Object(ObjectId),
    Inline { holder: AnnotsHolder, index: usize },
}

#[derive(Debug, Clone)]
struct Widget {
    page: u32,
    loc: WidgetLoc,
    name: String,
    /// Ancestor carrying `/T` when the widget has none of its own.
    name_owner: Option<ObjectId>,
    kind: WidgetKind,
    on_state: Vec<u8>,
    value: Option<String>,
}

fn collect_widgets(doc: &Document) -> Vec<Widget> {
    let mut widgets = Vec::new();
    for (page_no, page_id) in doc.get_pages() {
        let Ok(page) = doc.get_object(page_id).and_then(Object::as_dict) else {
            continue;
        };
        let (holder, annots) = match page.get(b"Annots") {
            Ok(Object::Array(items)) => (AnnotsHolder::Page(page_id), items),
            Ok(Object::Reference(id)) => match doc.get_object(*id).and_then(Object::as_array) {
                Ok(items) => (AnnotsHolder::Array(*id), items),
                Err(_) => continue,
            },
            _ => continue,
        };

        for (index, entry) in annots.iter().enumerate() {
            let (loc, dict) = match entry {
                Object::Reference(id) => match doc.get_object(*id).and_then(Object::as_dict) {
                    Ok(d) => (WidgetLoc::Object(*id), d),
                    Err(_) => continue,
                },
                Object::Dictionary(d) => (WidgetLoc::Inline { holder, index }, d),
                _ => continue,
            };
            if let Some(widget) = read_widget(doc, page_no, loc, dict) {
                widgets.push(widget);
            }
        }
    }
    debug!("Found {} widgets", widgets.len());
    widgets
}

fn read_widget(doc: &Document, page: u32, loc: WidgetLoc, dict: &Dictionary) -> Option<Widget> {
    if dict.get(b"Subtype").and_then(Object::as_name).ok()? != b"Widget" {
        return None;
    }

    let (name, name_owner) = match dict.get(b"T") {
        Ok(t) => (decode_text(resolve(doc, t))?, None),
        Err(_) => {
            let (id, parent) = ancestors(doc, dict).find(|(_, d)| d.has(b"T"))?;
            (decode_text(resolve(doc, parent.get(b"T").ok()?))?, Some(id))
        }
    };

    let field_type = dict
        .get(b"FT")
        .ok()
        .or_else(|| ancestors(doc, dict).find_map(|(_, d)| d.get(b"FT").ok()))
        .and_then(|ft| resolve(doc, ft).as_name().ok());
    let kind = match field_type {
        Some(b"Btn") => WidgetKind::Checkbox,
        _ => WidgetKind::Text,
    };

    let owner = match name_owner {
        Some(id) => doc.get_object(id).and_then(Object::as_dict).ok()?,
        None => dict,
    };
    let value = owner.get(b"V").ok().and_then(|v| decode_text(resolve(doc, v)));

    Some(Widget {
        page,
        loc,
        name,
        name_owner,
        kind,
        on_state: on_state(doc, dict, name_owner.is_none().then_some(owner)),
        value,
    })
}

/// `/Parent` chain of a field dictionary, nearest first.
fn ancestors<'a>(
    doc: &'a Document,
    dict: &'a Dictionary,
) -> impl Iterator<Item = (ObjectId, &'a Dictionary)> + 'a {
    let mut next = dict.get(b"Parent").and_then(Object::as_reference).ok();
    let mut depth = 0;
    std::iter::from_fn(move || {
        let id = next?;
        depth += 1;
        if depth > MAX_PARENT_DEPTH {
            warn!("Field parent chain deeper than {}; stopping", MAX_PARENT_DEPTH);
            return None;
        }
        let parent = doc.get_object(id).and_then(Object::as_dict).ok()?;
        next = parent.get(b"Parent").and_then(Object::as_reference).ok();
        Some((id, parent))
    })
}

/// Name of the "checked" appearance: first non-Off key of `/AP /N`, else a
/// non-Off `/AS`, else the widget's own non-Off `/V`, else `/Yes`.
///
/// A parent's `/V` is not consulted: in a radio group it names a sibling.
fn on_state(doc: &Document, widget: &Dictionary, own_field: Option<&Dictionary>) -> Vec<u8> {
    let from_ap = widget
        .get(b"AP")
        .ok()
        .and_then(|ap| resolve(doc, ap).as_dict().ok())
        .and_then(|ap| ap.get(b"N").ok())
        .and_then(|n| resolve(doc, n).as_dict().ok())
        .and_then(|n| n.iter().map(|(k, _)| k).find(|k| k.as_slice() != OFF_STATE).cloned());

    let current = |d: &Dictionary, key: &[u8]| {
        d.get(key)
            .and_then(Object::as_name)
            .ok()
            .filter(|n| *n != OFF_STATE)
            .map(<[u8]>::to_vec)
    };

    from_ap
        .or_else(|| current(widget, b"AS"))
        .or_else(|| own_field.and_then(|d| current(d, b"V")))
        .unwrap_or_else(|| DEFAULT_ON_STATE.to_vec())
}

/// Follow indirect references to the object they point at.
fn resolve<'a>(doc: &'a Document, mut obj: &'a Object) -> &'a Object {
    for _ in 0..MAX_PARENT_DEPTH {
        match obj {
            Object::Reference(id) => match doc.get_object(*id) {
                Ok(target) => obj = target,
                Err(_) => return obj,
            },
            _ => return obj,
        }
    }
    obj
}

// ── Text codec ───────────────────────────────────────────────────────────

/// Decode a field name or value.
///
/// Strings may be UTF-16BE (with BOM), UTF-8 or PDFDocEncoding. Text that
/// only decodes through the byte-wise fallback may carry leaked `/Name` or
/// `(name)` delimiters, which are stripped there.
fn decode_text(obj: &Object) -> Option<String> {
    match obj {
        Object::String(bytes, _) => Some(decode_pdf_string(bytes)),
        Object::Name(bytes) => Some(match std::str::from_utf8(bytes) {
            Ok(s) => s.to_string(),
            Err(_) => strip_delimiters(&String::from_utf8_lossy(bytes)),
        }),
        _ => None,
    }
}

fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let latin1: String = bytes.iter().map(|&b| b as char).collect();
            strip_delimiters(&latin1)
        }
    }
}

fn strip_delimiters(raw: &str) -> String {
    let s = raw.trim();
    let s = s.strip_prefix('/').unwrap_or(s);
    let s = s
        .strip_prefix('(')
        .and_then(|inner| inner.strip_suffix(')'))
        .unwrap_or(s);
    s.to_string()
}

/// ASCII as a literal string, anything else as UTF-16BE with BOM.
fn encode_text(s: &str) -> Object {
    if s.is_ascii() {
        Object::String(s.as_bytes().to_vec(), StringFormat::Literal)
    } else {
        let mut bytes = vec![0xFE, 0xFF];
        for unit in s.encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        Object::String(bytes, StringFormat::Hexadecimal)
    }
}

// ── Writing ──────────────────────────────────────────────────────────────

fn fill_document(doc: &mut Document, data: &MappedData) -> FillStats {
    let widgets = collect_widgets(doc);
    let mut stats = FillStats {
        widgets_seen: widgets.len(),
        ..FillStats::default()
    };
    let mut matched: BTreeSet<&str> = BTreeSet::new();

    // One on-state per button field with kids, taken from its first kid.
    let mut group_on: BTreeMap<ObjectId, &[u8]> = BTreeMap::new();
    for w in widgets.iter().filter(|w| w.kind == WidgetKind::Checkbox) {
        if let Some(owner) = w.name_owner {
            group_on.entry(owner).or_insert(w.on_state.as_slice());
        }
    }

    for widget in &widgets {
        let Some(value) = data.get(&widget.name) else {
            continue;
        };
        matched.insert(widget.name.as_str());

        match widget.kind {
            WidgetKind::Checkbox => {
                let field_on = widget
                    .name_owner
                    .and_then(|id| group_on.get(&id).copied())
                    .unwrap_or(widget.on_state.as_slice());
                let (field_state, widget_state) = if !value.as_checked() {
                    (OFF_STATE, OFF_STATE)
                } else if widget.on_state == field_on {
                    (field_on, field_on)
                } else {
                    (field_on, OFF_STATE)
                };
                debug!(
                    "Checkbox '{}' (page {}) → /{}",
                    widget.name,
                    widget.page,
                    String::from_utf8_lossy(widget_state)
                );
                set_field_value(doc, widget, Object::Name(field_state.to_vec()));
                if let Some(d) = widget_dict_mut(doc, widget.loc) {
                    d.set("AS", Object::Name(widget_state.to_vec()));
                    d.remove(b"AP");
                }
                stats.checkboxes_written += 1;
            }
            WidgetKind::Text => {
                let text = value.to_widget_text();
                debug!("Text '{}' (page {}) → {:?}", widget.name, widget.page, text);
                set_field_value(doc, widget, encode_text(&text));
                if let Some(d) = widget_dict_mut(doc, widget.loc) {
                    d.remove(b"AP");
                }
                stats.text_written += 1;
            }
        }
    }

    let unmatched: Vec<&String> = data
        .keys()
        .filter(|k| !matched.contains(k.as_str()))
        .collect();
    if !unmatched.is_empty() {
        debug!("No widget for keys: {:?}", unmatched);
    }
    stats.unmatched_keys = unmatched.len();

    if stats.text_written + stats.checkboxes_written > 0 {
        set_need_appearances(doc);
    }
    stats
}

fn set_field_value(doc: &mut Document, widget: &Widget, value: Object) {
    let target = match widget.name_owner {
        Some(id) => doc.get_object_mut(id).and_then(Object::as_dict_mut).ok(),
        None => widget_dict_mut(doc, widget.loc),
    };
    match target {
        Some(d) => d.set("V", value),
        None => warn!("Widget '{}' vanished before write", widget.name),
    }
}

fn widget_dict_mut(doc: &mut Document, loc: WidgetLoc) -> Option<&mut Dictionary> {
    match loc {
        WidgetLoc::Object(id) => doc.get_object_mut(id).and_then(Object::as_dict_mut).ok(),
        WidgetLoc::Inline { holder, index } => {
            let annots = match holder {
                AnnotsHolder::Page(page_id) => doc
                    .get_object_mut(page_id)
                    .and_then(Object::as_dict_mut)
                    .ok()?
                    .get_mut(b"Annots")
                    .ok()?,
                AnnotsHolder::Array(id) => doc.get_object_mut(id).ok()?,
            };
            match annots {
                Object::Array(items) => items.get_mut(index)?.as_dict_mut().ok(),
                _ => None,
            }
        }
    }
}

fn set_need_appearances(doc: &mut Document) {
    let Ok(root_id) = doc.trailer.get(b"Root").and_then(Object::as_reference) else {
        return;
    };
    let acro_ref = match doc
        .get_object(root_id)
        .and_then(Object::as_dict)
        .and_then(|catalog| catalog.get(b"AcroForm"))
    {
        Ok(Object::Reference(id)) => Some(*id),
        Ok(Object::Dictionary(_)) => None,
        _ => return,
    };
    let acro_form = match acro_ref {
        Some(id) => doc.get_object_mut(id).and_then(Object::as_dict_mut),
        None => doc
            .get_object_mut(root_id)
            .and_then(Object::as_dict_mut)
            .and_then(|catalog| catalog.get_mut(b"AcroForm"))
            .and_then(Object::as_dict_mut),
    };
    if let Ok(d) = acro_form {
        d.set("NeedAppearances", Object::Boolean(true));
    }
}
