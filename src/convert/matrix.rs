//! Static source → target compatibility table for the document converter.
//!
//! The table is consulted before any backend runs; a pair missing here never
//! reaches a conversion library or external process.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A file format the converter knows about, identified by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Jpg,
    Jpeg,
    Png,
    Webp,
    Tiff,
    Pdf,
    Docx,
    Doc,
    Txt,
    Html,
    Rtf,
    Odt,
    Xlsx,
    Pptx,
    Md,
    Csv,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatCategory {
    Image,
    Document,
    Spreadsheet,
    Presentation,
    Data,
}

impl Format {
    pub const ALL: [Format; 17] = [
        Format::Jpg,
        Format::Jpeg,
        Format::Png,
        Format::Webp,
        Format::Tiff,
        Format::Pdf,
        Format::Docx,
        Format::Doc,
        Format::Txt,
        Format::Html,
        Format::Rtf,
        Format::Odt,
        Format::Xlsx,
        Format::Pptx,
        Format::Md,
        Format::Csv,
        Format::Json,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            Format::Jpg => "jpg",
            Format::Jpeg => "jpeg",
            Format::Png => "png",
            Format::Webp => "webp",
            Format::Tiff => "tiff",
            Format::Pdf => "pdf",
            Format::Docx => "docx",
            Format::Doc => "doc",
            Format::Txt => "txt",
            Format::Html => "html",
            Format::Rtf => "rtf",
            Format::Odt => "odt",
            Format::Xlsx => "xlsx",
            Format::Pptx => "pptx",
            Format::Md => "md",
            Format::Csv => "csv",
            Format::Json => "json",
        }
    }

    pub fn category(self) -> FormatCategory {
        match self {
            Format::Jpg | Format::Jpeg | Format::Png | Format::Webp | Format::Tiff => {
                FormatCategory::Image
            }
            Format::Pdf
            | Format::Docx
            | Format::Doc
            | Format::Txt
            | Format::Html
            | Format::Rtf
            | Format::Odt
            | Format::Md => FormatCategory::Document,
            Format::Xlsx | Format::Csv => FormatCategory::Spreadsheet,
            Format::Pptx => FormatCategory::Presentation,
            Format::Json => FormatCategory::Data,
        }
    }

    pub fn is_image(self) -> bool {
        self.category() == FormatCategory::Image
    }

    /// `jpg` and `jpeg` name the same encoding.
    pub fn is_jpeg(self) -> bool {
        matches!(self, Format::Jpg | Format::Jpeg)
    }

    /// Extension of `file_name` after the last dot, lowercased.
    ///
    /// Names without a dot yield `"tmp"`, which no format matches.
    pub fn extension_of(file_name: &str) -> String {
        file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.trim().to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .unwrap_or_else(|| "tmp".to_string())
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown format '{0}'")]
pub struct UnknownFormat(pub String);

impl FromStr for Format {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().trim_start_matches('.').to_ascii_lowercase();
        Format::ALL
            .into_iter()
            .find(|f| f.extension() == normalized)
            .ok_or(UnknownFormat(normalized))
    }
}

/// Allowed targets for `from`.
pub fn targets(from: Format) -> &'static [Format] {
    use Format::{
        Csv, Doc, Docx, Html, Jpeg, Jpg, Json, Md, Odt, Pdf, Png, Pptx, Rtf, Tiff, Txt, Webp, Xlsx,
    };
    match from {
        Jpg | Jpeg => &[Png, Pdf, Webp, Tiff],
        Png => &[Jpg, Jpeg, Pdf, Webp, Tiff],
        Webp => &[Jpg, Jpeg, Png, Pdf, Tiff],
        Tiff => &[Jpg, Jpeg, Png, Pdf, Webp],
        Pdf => &[Txt, Docx, Jpg, Png],
        Docx => &[Pdf, Txt, Html],
        Doc => &[Pdf, Txt, Html, Docx],
        Txt => &[Pdf, Docx, Html],
        Html => &[Pdf, Docx, Txt],
        Rtf | Odt => &[Pdf, Docx, Txt],
        Xlsx => &[Pdf, Csv],
        Pptx => &[Pdf],
        Md => &[Pdf, Html, Txt],
        Csv => &[Xlsx, Pdf],
        Json => &[Txt, Pdf, Csv],
    }
}

pub fn is_supported(from: Format, to: Format) -> bool {
    targets(from).contains(&to)
}

/// The whole table keyed by extension, as served by `GET /api/convert`.
pub fn as_table() -> BTreeMap<&'static str, Vec<&'static str>> {
    Format::ALL
        .into_iter()
        .map(|from| {
            (
                from.extension(),
                targets(from).iter().map(|to| to.extension()).collect(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive_and_accepts_leading_dot() {
        assert_eq!("PNG".parse::<Format>().unwrap(), Format::Png);
        assert_eq!(".Docx".parse::<Format>().unwrap(), Format::Docx);
        assert_eq!(" md ".parse::<Format>().unwrap(), Format::Md);
        assert!("gif".parse::<Format>().is_err());
        assert!("".parse::<Format>().is_err());
    }

    #[test]
    fn extension_roundtrips_through_parse() {
        for format in Format::ALL {
            assert_eq!(format.extension().parse::<Format>().unwrap(), format);
        }
    }

    #[test]
    fn extension_of_takes_last_segment() {
        assert_eq!(Format::extension_of("report.final.DOCX"), "docx");
        assert_eq!(Format::extension_of("README"), "tmp");
        assert_eq!(Format::extension_of("trailing."), "tmp");
    }

    #[test]
    fn no_format_converts_to_itself() {
        for format in Format::ALL {
            assert!(
                !is_supported(format, format),
                "{format} must not list itself as a target"
            );
        }
    }

    #[test]
    fn image_sources_only_target_images_or_pdf() {
        for from in Format::ALL.into_iter().filter(|f| f.is_image()) {
            for to in targets(from) {
                assert!(
                    to.is_image() || *to == Format::Pdf,
                    "{from} -> {to} leaves the image category"
                );
            }
        }
    }

    #[test]
    fn jpg_and_jpeg_share_targets() {
        assert_eq!(targets(Format::Jpg), targets(Format::Jpeg));
        // pdftoppm only writes .jpg, so pdf is the one source with a single spelling.
        for from in Format::ALL.into_iter().filter(|f| *f != Format::Pdf) {
            let list = targets(from);
            assert_eq!(
                list.contains(&Format::Jpg),
                list.contains(&Format::Jpeg),
                "{from} lists only one jpeg spelling"
            );
        }
    }

    #[test]
    fn image_to_image_pairs_are_symmetric() {
        for from in Format::ALL.into_iter().filter(|f| f.is_image()) {
            for to in targets(from).iter().filter(|t| t.is_image()) {
                if from.is_jpeg() && to.is_jpeg() {
                    continue;
                }
                assert!(is_supported(*to, from), "{from} -> {to} has no reverse");
            }
        }
    }

    #[test]
    fn every_format_has_at_least_one_target() {
        for format in Format::ALL {
            assert!(!targets(format).is_empty(), "{format} is a dead end");
        }
    }

    #[test]
    fn table_lists_every_source() {
        let table = as_table();
        assert_eq!(table.len(), Format::ALL.len());
        assert_eq!(table["csv"], vec!["xlsx", "pdf"]);
        assert_eq!(table["pptx"], vec!["pdf"]);
    }
}
