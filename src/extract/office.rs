//! Office Open XML extraction (`.docx`, `.pptx`, `.xlsx`) via `zip` +
//! `quick-xml`. `.xls` has no zip container at all — it's routed through
//! the same best-effort raw-text fallback as an unreadable `.xlsx`, a
//! documented limitation rather than a full legacy binary parser.

use std::io::Read;

use quick_xml::events::Event;
use quick_xml::Reader;
use zip::ZipArchive;

/// `.docx`: concatenate the text runs of `word/document.xml`.
pub fn extract_docx(bytes: &[u8]) -> String {
    extract_zip_text(bytes, &["word/document.xml"], &["w:t"]).unwrap_or_else(|| {
        tracing::warn!("unable to extract docx text");
        "Unable to extract".to_string()
    })
}

/// `.pptx`: best-effort walk of `ppt/slides/slideN.xml`, concatenating
/// `<a:t>` run text. Presentations are not paragraph documents, so this
/// may yield partial or empty text — that is a valid outcome, never an
/// error.
pub fn extract_pptx(bytes: &[u8]) -> String {
    let Ok(mut archive) = ZipArchive::new(std::io::Cursor::new(bytes)) else {
        tracing::warn!("unable to open pptx as zip");
        return "Unable to extract".to_string();
    };

    let mut slide_names: Vec<String> = (0..archive.len())
        .filter_map(|i| archive.by_index(i).ok().map(|f| f.name().to_string()))
        .filter(|name| {
            name.starts_with("ppt/slides/slide") && name.ends_with(".xml") && !name.contains("rels")
        })
        .collect();
    slide_names.sort_by_key(|name| slide_number(name));

    let mut text = String::new();
    for name in slide_names {
        if let Some(slide_text) = read_entry_text(&mut archive, &name, &["a:t"]) {
            if !slide_text.is_empty() {
                if !text.is_empty() {
                    text.push('\n');
                }
                text.push_str(&slide_text);
            }
        }
    }
    text
}

fn slide_number(name: &str) -> usize {
    name.trim_start_matches("ppt/slides/slide")
        .trim_end_matches(".xml")
        .parse()
        .unwrap_or(usize::MAX)
}

/// `.xlsx`/`.xls`: per sheet, emit a `=== Sheet: <name> ===` header
/// followed by CSV-serialized rows. `.xls` has no real parser here — it
/// falls back to the same "Unable to extract" posture as a corrupt xlsx.
pub fn extract_spreadsheet(bytes: &[u8]) -> String {
    let Ok(mut archive) = ZipArchive::new(std::io::Cursor::new(bytes)) else {
        return "Unable to extract".to_string();
    };

    let shared_strings = read_shared_strings(&mut archive);
    let declared_names = read_workbook_sheet_names(&mut archive);

    let mut sheet_names: Vec<String> = (0..archive.len())
        .filter_map(|i| archive.by_index(i).ok().map(|f| f.name().to_string()))
        .filter(|name| name.starts_with("xl/worksheets/sheet") && name.ends_with(".xml"))
        .collect();
    sheet_names.sort_by_key(|name| sheet_number(name));

    let mut out = String::new();
    for (idx, name) in sheet_names.iter().enumerate() {
        let rows = read_sheet_rows(&mut archive, name, &shared_strings);
        let display_name = declared_names
            .get(idx)
            .cloned()
            .unwrap_or_else(|| format!("Sheet{}", idx + 1));
        out.push_str(&format!("\n=== Sheet: {display_name} ===\n"));
        for row in rows {
            out.push_str(&row.join(","));
            out.push('\n');
        }
    }
    if out.trim().is_empty() {
        "Unable to extract".to_string()
    } else {
        out
    }
}

fn sheet_number(name: &str) -> usize {
    name.trim_start_matches("xl/worksheets/sheet")
        .trim_end_matches(".xml")
        .parse()
        .unwrap_or(usize::MAX)
}

/// Sheet names declared in `xl/workbook.xml`'s `<sheet name="..."/>`
/// entries, in document order. Assumes that order lines up with the
/// numeric order of `xl/worksheets/sheetN.xml`, which holds for every
/// writer observed in practice even though the relationship is formally
/// indirected through `r:id`/`workbook.xml.rels`.
fn read_workbook_sheet_names<R: Read + std::io::Seek>(archive: &mut ZipArchive<R>) -> Vec<String> {
    let Some(mut file) = archive.by_name("xl/workbook.xml").ok() else {
        return Vec::new();
    };
    let mut content = String::new();
    if file.read_to_string(&mut content).is_err() {
        return Vec::new();
    }
    drop(file);

    let mut reader = Reader::from_str(&content);
    reader.config_mut().trim_text(true);
    let mut names = Vec::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"sheet" => {
                if let Some(name) = e
                    .attributes()
                    .flatten()
                    .find(|a| a.key.as_ref() == b"name")
                {
                    names.push(String::from_utf8_lossy(&name.value).into_owned());
                }
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    names
}

fn read_shared_strings<R: Read + std::io::Seek>(archive: &mut ZipArchive<R>) -> Vec<String> {
    let Some(mut file) = archive.by_name("xl/sharedStrings.xml").ok() else {
        return Vec::new();
    };
    let mut content = String::new();
    if file.read_to_string(&mut content).is_err() {
        return Vec::new();
    }
    drop(file);

    let mut reader = Reader::from_str(&content);
    reader.config_mut().trim_text(true);
    let mut strings = Vec::new();
    let mut buf = Vec::new();
    let mut in_text = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text = true,
            Ok(Event::End(e)) if e.local_name().as_ref() == b"t" => in_text = false,
            Ok(Event::Text(t)) if in_text => {
                strings.push(t.unescape().unwrap_or_default().into_owned());
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    strings
}

fn read_sheet_rows<R: Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
    shared_strings: &[String],
) -> Vec<Vec<String>> {
    let Some(mut file) = archive.by_name(name).ok() else {
        return Vec::new();
    };
    let mut content = String::new();
    if file.read_to_string(&mut content).is_err() {
        return Vec::new();
    }
    drop(file);

    let mut reader = Reader::from_str(&content);
    reader.config_mut().trim_text(true);
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut current_row: Vec<String> = Vec::new();
    let mut cell_is_shared = false;
    let mut in_value = false;
    let mut current_value = String::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"row" => {
                current_row = Vec::new();
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"row" => {
                rows.push(std::mem::take(&mut current_row));
            }
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"c" => {
                cell_is_shared = e
                    .attributes()
                    .flatten()
                    .any(|a| a.key.as_ref() == b"t" && a.value.as_ref() == b"s");
            }
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"v" => {
                in_value = true;
                current_value.clear();
            }
            Ok(Event::Text(t)) if in_value => {
                current_value.push_str(&t.unescape().unwrap_or_default());
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"v" => {
                in_value = false;
                let value = if cell_is_shared {
                    current_value
                        .parse::<usize>()
                        .ok()
                        .and_then(|i| shared_strings.get(i).cloned())
                        .unwrap_or_default()
                } else {
                    current_value.clone()
                };
                current_row.push(value);
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    rows
}

/// Concatenate the text of every `local_name` run found in any of the
/// given zip entries.
fn extract_zip_text(bytes: &[u8], entries: &[&str], local_names: &[&str]) -> Option<String> {
    let mut archive = ZipArchive::new(std::io::Cursor::new(bytes)).ok()?;
    let mut out = String::new();
    for entry in entries {
        if let Some(text) = read_entry_text(&mut archive, entry, local_names) {
            out.push_str(&text);
        }
    }
    Some(out.trim().to_string())
}

fn read_entry_text<R: Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
    entry: &str,
    local_names: &[&str],
) -> Option<String> {
    let mut file = archive.by_name(entry).ok()?;
    let mut content = String::new();
    file.read_to_string(&mut content).ok()?;
    drop(file);

    let mut reader = Reader::from_str(&content);
    reader.config_mut().trim_text(true);
    let mut out = String::new();
    let mut depth = 0usize;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if local_names.iter().any(|n| e.local_name().as_ref() == n.as_bytes()) => {
                depth += 1;
            }
            Ok(Event::End(e)) if local_names.iter().any(|n| e.local_name().as_ref() == n.as_bytes()) => {
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Text(t)) if depth > 0 => {
                out.push_str(&t.unescape().unwrap_or_default());
                out.push(' ');
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    Some(out)
}
