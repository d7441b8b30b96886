//! Minimal WordprocessingML: paragraph text out of a `.docx`, and plain
//! paragraphs back into one.

use super::ConvertError;
use crate::util::escape_html;
use regex::Regex;
use std::io::{Cursor, Read, Write};
use std::sync::OnceLock;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const DOCUMENT_PART: &str = "word/document.xml";

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const ROOT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

fn paragraph_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)<w:p\b[^>]*/>|<w:p(?:\s[^>]*)?>(.*?)</w:p>")
            .expect("paragraph regex is valid")
    })
}

fn run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Paragraph properties hold tab stop definitions, not tab characters.
        Regex::new(
            r"(?s)<w:pPr>.*?</w:pPr>|<w:t(?:\s[^>]*)?>([^<]*)</w:t>|<w:tab\b[^>]*/>|<w:br\b[^>]*/>",
        )
        .expect("run regex is valid")
    })
}

pub(crate) fn xml_escape(s: &str) -> String {
    // Same entity set as HTML minus the apostrophe form Word never emits.
    escape_html(s).replace("&#39;", "&apos;")
}

fn xml_unescape(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn zip_err(e: impl std::fmt::Display) -> ConvertError {
    ConvertError::Backend(format!("docx: {e}"))
}

/// Paragraph texts of a `.docx`, in document order.
pub fn read_paragraphs(bytes: &[u8]) -> Result<Vec<String>, ConvertError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ConvertError::Malformed(format!("not a docx package: {e}")))?;
    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_PART)
        .map_err(|_| ConvertError::Malformed(format!("docx package has no {DOCUMENT_PART}")))?
        .read_to_string(&mut xml)?;

    let paragraphs = paragraph_re()
        .captures_iter(&xml)
        .map(|para| {
            let Some(body) = para.get(1) else {
                return String::new();
            };
            let mut text = String::new();
            for token in run_re().captures_iter(body.as_str()) {
                match token.get(1) {
                    Some(t) => text.push_str(&xml_unescape(t.as_str())),
                    None if token[0].starts_with("<w:pPr") => {}
                    None if token[0].starts_with("<w:tab") => text.push('\t'),
                    None => text.push('\n'),
                }
            }
            text
        })
        .collect();
    Ok(paragraphs)
}

pub fn to_text(bytes: &[u8]) -> Result<String, ConvertError> {
    Ok(read_paragraphs(bytes)?.join("\n"))
}

pub fn to_html(bytes: &[u8]) -> Result<String, ConvertError> {
    let mut html = String::new();
    for paragraph in read_paragraphs(bytes)? {
        if paragraph.is_empty() {
            continue;
        }
        html.push_str("<p>");
        html.push_str(&escape_html(&paragraph).replace('\n', "<br />"));
        html.push_str("</p>");
    }
    Ok(html)
}

/// Build a `.docx` with one paragraph per input line.
pub fn from_text(text: &str) -> Result<Vec<u8>, ConvertError> {
    let mut body = String::new();
    for line in text.lines() {
        if line.is_empty() {
            body.push_str("<w:p/>");
            continue;
        }
        body.push_str(r#"<w:p><w:r><w:t xml:space="preserve">"#);
        body.push_str(&xml_escape(line));
        body.push_str("</w:t></w:r></w:p>");
    }
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
    );

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, contents) in [
        ("[Content_Types].xml", CONTENT_TYPES_XML),
        ("_rels/.rels", ROOT_RELS_XML),
        (DOCUMENT_PART, document.as_str()),
    ] {
        writer.start_file(name, options).map_err(zip_err)?;
        writer.write_all(contents.as_bytes())?;
    }
    Ok(writer.finish().map_err(zip_err)?.into_inner())
}
