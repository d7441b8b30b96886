//! Text-ish sources: plain text, Markdown, HTML.

use super::ConvertError;
use crate::util::escape_html;
use pulldown_cmark::{html, Options, Parser};

/// Decode an upload as UTF-8, dropping a leading BOM.
pub fn decode_utf8(bytes: &[u8]) -> Result<String, ConvertError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| ConvertError::Malformed(format!("input is not valid UTF-8: {e}")))?;
    Ok(text.trim_start_matches('\u{feff}').to_string())
}

pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, Parser::new_ext(markdown, options));
    out
}

pub fn html_to_text(markup: &str) -> String {
    nanohtml2text::html2text(markup).trim().to_string()
}

pub fn text_to_html(text: &str) -> String {
    format!("<pre>{}</pre>", escape_html(text))
}
