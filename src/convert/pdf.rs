//! PDF writing (plain text pages, single-image pages) and text extraction.

use super::ConvertError;
use crate::util::wrap_lines;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

/// A4 portrait, in points.
const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
/// 20mm.
const MARGIN: i64 = 57;
const FONT_SIZE: i64 = 10;
const LEADING: i64 = 14;
/// Courier advances 0.6em per glyph.
const CHARS_PER_LINE: usize = ((PAGE_WIDTH - 2 * MARGIN) * 10 / (FONT_SIZE * 6)) as usize;
const LINES_PER_PAGE: usize = ((PAGE_HEIGHT - 2 * MARGIN) / LEADING) as usize;

/// Page size used when an image reports zero dimensions.
const FALLBACK_IMAGE_PAGE: (u32, u32) = (800, 600);

fn backend_err(e: impl std::fmt::Display) -> ConvertError {
    ConvertError::Backend(format!("pdf: {e}"))
}

/// Map text to WinAnsi-compatible bytes; anything outside Latin-1 becomes `?`.
fn encode_latin1(line: &str) -> Vec<u8> {
    line.chars()
        .filter(|c| !c.is_control())
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

struct PdfSkeleton {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
}

impl PdfSkeleton {
    fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
        }
    }

    fn add_page(
        &mut self,
        operations: Vec<Operation>,
        resources_id: ObjectId,
        media_box: (i64, i64),
    ) -> Result<(), ConvertError> {
        let content = Content { operations };
        let content_id = self
            .doc
            .add_object(Stream::new(dictionary! {}, content.encode().map_err(backend_err)?));
        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), media_box.0.into(), media_box.1.into()],
        });
        self.kids.push(page_id.into());
        Ok(())
    }

    fn finish(mut self) -> Result<Vec<u8>, ConvertError> {
        let count = i64::try_from(self.kids.len()).map_err(backend_err)?;
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => self.kids,
                "Count" => count,
            }),
        );
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);
        self.doc.compress();

        let mut out = Vec::new();
        self.doc.save_to(&mut out).map_err(backend_err)?;
        Ok(out)
    }
}

/// Render plain text onto A4 pages, wrapping long lines and paginating.
///
/// Empty input still yields a single blank page.
pub fn text_to_pdf(text: &str) -> Result<Vec<u8>, ConvertError> {
    let lines = wrap_lines(text, CHARS_PER_LINE);
    let mut pdf = PdfSkeleton::new();

    let font_id = pdf.doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = pdf.doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut chunks: Vec<&[String]> = lines.chunks(LINES_PER_PAGE).collect();
    if chunks.is_empty() {
        chunks.push(&[]);
    }

    for page_lines in chunks {
        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), FONT_SIZE.into()]),
            Operation::new("TL", vec![LEADING.into()]),
            Operation::new("Td", vec![MARGIN.into(), (PAGE_HEIGHT - MARGIN).into()]),
        ];
        for line in page_lines {
            operations.push(Operation::new(
                "Tj",
                vec![Object::string_literal(encode_latin1(line))],
            ));
            operations.push(Operation::new("T*", vec![]));
        }
        operations.push(Operation::new("ET", vec![]));
        pdf.add_page(operations, resources_id, (PAGE_WIDTH, PAGE_HEIGHT))?;
    }

    pdf.finish()
}

/// Wrap a baseline JPEG in a one-page PDF sized to the image.
pub fn jpeg_to_pdf(jpeg: Vec<u8>, width: u32, height: u32) -> Result<Vec<u8>, ConvertError> {
    let (page_w, page_h) = if width == 0 || height == 0 {
        FALLBACK_IMAGE_PAGE
    } else {
        (width, height)
    };
    let (page_w, page_h) = (i64::from(page_w), i64::from(page_h));

    let mut pdf = PdfSkeleton::new();
    let image_id = pdf.doc.add_object(
        Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(width.max(1)),
                "Height" => i64::from(height.max(1)),
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            },
            jpeg,
        )
        .with_compression(false),
    );
    let resources_id = pdf.doc.add_object(dictionary! {
        "XObject" => dictionary! { "Im0" => image_id },
    });

    let operations = vec![
        Operation::new("q", vec![]),
        Operation::new(
            "cm",
            vec![
                page_w.into(),
                0.into(),
                0.into(),
                page_h.into(),
                0.into(),
                0.into(),
            ],
        ),
        Operation::new("Do", vec!["Im0".into()]),
        Operation::new("Q", vec![]),
    ];
    pdf.add_page(operations, resources_id, (page_w, page_h))?;
    pdf.finish()
}

/// Extract the text layer of a PDF.
pub fn extract_text(bytes: &[u8]) -> Result<String, ConvertError> {
    if !bytes.starts_with(b"%PDF-") {
        return Err(ConvertError::Malformed("input is not a PDF".into()));
    }
    pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| ConvertError::Malformed(format!("could not read PDF text: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_count(bytes: &[u8]) -> usize {
        Document::load_mem(bytes).unwrap().get_pages().len()
    }

    #[test]
    fn layout_constants_fit_a4() {
        assert_eq!(CHARS_PER_LINE, 80);
        assert_eq!(LINES_PER_PAGE, 52);
    }

    #[test]
    fn short_text_is_one_page() {
        let bytes = text_to_pdf("hello\nworld").unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));
        assert_eq!(page_count(&bytes), 1);
    }

    #[test]
    fn empty_text_still_produces_a_page() {
        let bytes = text_to_pdf("").unwrap();
        assert_eq!(page_count(&bytes), 1);
    }

    #[test]
    fn long_text_paginates() {
        let text = (0..(LINES_PER_PAGE * 2 + 5))
            .map(|i| format!("line {i}"))
            .collect::<Vec<_>>()
            .join("\n");
        let bytes = text_to_pdf(&text).unwrap();
        assert_eq!(page_count(&bytes), 3);
    }

    #[test]
    fn written_text_can_be_extracted() {
        let bytes = text_to_pdf("Quarterly numbers look fine").unwrap();
        let text = extract_text(&bytes).unwrap();
        assert!(text.contains("Quarterly"), "got: {text:?}");
    }

    #[test]
    fn non_latin_characters_are_replaced() {
        assert_eq!(encode_latin1("café 🦀"), b"caf\xe9 ?".to_vec());
        assert_eq!(encode_latin1("a\tb"), b"ab".to_vec());
    }

    #[test]
    fn extract_rejects_non_pdf() {
        assert!(matches!(
            extract_text(b"not a pdf"),
            Err(ConvertError::Malformed(_))
        ));
    }

    #[test]
    fn image_page_uses_image_size_or_fallback() {
        let bytes = jpeg_to_pdf(vec![0xFF, 0xD8, 0xFF, 0xD9], 0, 0).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        let (_, page_id) = doc.get_pages().into_iter().next().unwrap();
        let page = doc.get_dictionary(page_id).unwrap();
        let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
        assert_eq!(media_box[2].as_i64().unwrap(), 800);
        assert_eq!(media_box[3].as_i64().unwrap(), 600);
    }
}
