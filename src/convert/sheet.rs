//! Tabular data: CSV into SpreadsheetML, JSON into CSV or text.

use super::docx::xml_escape;
use super::ConvertError;
use serde_json::Value;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#;

const ROOT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/></sheets></workbook>"#;

const WORKBOOK_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;

fn csv_err(e: csv::Error) -> ConvertError {
    ConvertError::Malformed(format!("invalid CSV: {e}"))
}

fn zip_err(e: impl std::fmt::Display) -> ConvertError {
    ConvertError::Backend(format!("xlsx: {e}"))
}

/// Rows of a CSV document. Ragged rows are accepted as-is.
pub fn read_csv(bytes: &[u8]) -> Result<Vec<Vec<String>>, ConvertError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);
    reader
        .records()
        .map(|record| {
            record
                .map(|r| r.iter().map(str::to_string).collect())
                .map_err(csv_err)
        })
        .collect()
}

/// Spreadsheet column letters for a zero-based index: 0 → A, 25 → Z, 26 → AA.
fn column_name(mut index: usize) -> String {
    let mut name = Vec::new();
    loop {
        name.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    name.reverse();
    String::from_utf8_lossy(&name).into_owned()
}

fn sheet_xml(rows: &[Vec<String>]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );
    for (r, row) in rows.iter().enumerate() {
        let row_num = r + 1;
        xml.push_str(&format!(r#"<row r="{row_num}">"#));
        for (c, cell) in row.iter().enumerate() {
            if cell.is_empty() {
                continue;
            }
            xml.push_str(&format!(
                r#"<c r="{}{row_num}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
                column_name(c),
                xml_escape(cell)
            ));
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData></worksheet>");
    xml
}

pub fn csv_to_xlsx(bytes: &[u8]) -> Result<Vec<u8>, ConvertError> {
    let rows = read_csv(bytes)?;
    let sheet = sheet_xml(&rows);

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, contents) in [
        ("[Content_Types].xml", CONTENT_TYPES_XML),
        ("_rels/.rels", ROOT_RELS_XML),
        ("xl/workbook.xml", WORKBOOK_XML),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS_XML),
        ("xl/worksheets/sheet1.xml", sheet.as_str()),
    ] {
        writer.start_file(name, options).map_err(zip_err)?;
        writer.write_all(contents.as_bytes())?;
    }
    Ok(writer.finish().map_err(zip_err)?.into_inner())
}

/// Render CSV rows as aligned plain text for the PDF writer.
pub fn csv_to_text(bytes: &[u8]) -> Result<String, ConvertError> {
    let rows = read_csv(bytes)?;
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut widths = vec![0usize; columns];
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let lines: Vec<String> = rows
        .iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .map(|(i, cell)| format!("{cell:<width$}", width = widths[i]))
                .collect::<Vec<_>>()
                .join(" | ")
                .trim_end()
                .to_string()
        })
        .collect();
    Ok(lines.join("\n"))
}

pub fn parse_json(bytes: &[u8]) -> Result<Value, ConvertError> {
    serde_json::from_slice(bytes).map_err(|e| ConvertError::Malformed(format!("invalid JSON: {e}")))
}

pub fn json_to_text(bytes: &[u8]) -> Result<String, ConvertError> {
    let value = parse_json(bytes)?;
    serde_json::to_string_pretty(&value).map_err(|e| ConvertError::Backend(e.to_string()))
}

fn scalar_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// A JSON array of objects as CSV. The header row is the first object's keys.
pub fn json_to_csv(bytes: &[u8]) -> Result<Vec<u8>, ConvertError> {
    let value = parse_json(bytes)?;
    let rows = value
        .as_array()
        .filter(|rows| !rows.is_empty())
        .ok_or_else(|| {
            ConvertError::Malformed("JSON to CSV needs a non-empty array of objects".into())
        })?;

    let objects = rows
        .iter()
        .map(|row| {
            row.as_object().ok_or_else(|| {
                ConvertError::Malformed("every array element must be an object".into())
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let header: Vec<&String> = objects[0].keys().collect();

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(header.iter().map(|k| k.as_str())).map_err(csv_err)?;
    for object in &objects {
        writer
            .write_record(header.iter().map(|key| scalar_text(object.get(*key))))
            .map_err(csv_err)?;
    }
    writer
        .into_inner()
        .map_err(|e| ConvertError::Backend(format!("csv: {e}")))
}
