use crate::error::IngestError;
use crate::models::FileKind;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read};

pub trait TextExtractor {
    fn extract(&self, bytes: &[u8], filename: &str) -> Result<String, IngestError>;
}

#[derive(Default)]
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract(&self, bytes: &[u8], filename: &str) -> Result<String, IngestError> {
        let document = lopdf::Document::load_mem(bytes)
            .map_err(|error| IngestError::PdfParse(error.to_string()))?;

        let mut pages = Vec::new();
        for (page_no, _page_id) in document.get_pages() {
            let text = document
                .extract_text(&[page_no])
                .map_err(|error| IngestError::PdfParse(error.to_string()))?;

            if !text.trim().is_empty() {
                pages.push(text.trim().to_string());
            }
        }

        if pages.is_empty() {
            return Err(IngestError::NoText(filename.to_string()));
        }

        Ok(pages.join("\n"))
    }
}

/// Pulls plain text out of `word/document.xml`: the content of `w:t` runs,
/// with a newline at each paragraph boundary.
#[derive(Default)]
pub struct DocxTextExtractor;

impl TextExtractor for DocxTextExtractor {
    fn extract(&self, bytes: &[u8], filename: &str) -> Result<String, IngestError> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
            .map_err(|error| IngestError::DocxParse(error.to_string()))?;

        let mut document_xml = String::new();
        archive
            .by_name("word/document.xml")
            .map_err(|error| IngestError::DocxParse(error.to_string()))?
            .read_to_string(&mut document_xml)
            .map_err(|error| IngestError::DocxParse(error.to_string()))?;

        let text = document_xml_to_text(&document_xml)?;
        if text.trim().is_empty() {
            return Err(IngestError::NoText(filename.to_string()));
        }

        Ok(text)
    }
}

fn document_xml_to_text(document_xml: &str) -> Result<String, IngestError> {
    let mut reader = Reader::from_str(document_xml);
    let mut text = String::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(element)) if element.name().as_ref() == b"w:t" => {
                in_text_run = true;
            }
            Ok(Event::End(element)) => match element.name().as_ref() {
                b"w:t" => in_text_run = false,
                b"w:p" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(element)) if element.name().as_ref() == b"w:tab" => {
                text.push(' ');
            }
            Ok(Event::Text(content)) if in_text_run => {
                let unescaped = content
                    .unescape()
                    .map_err(|error| IngestError::DocxParse(error.to_string()))?;
                text.push_str(&unescaped);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(error) => return Err(IngestError::DocxParse(error.to_string())),
        }
    }

    Ok(text.trim().to_string())
}

pub fn extract_text(kind: FileKind, bytes: &[u8], filename: &str) -> Result<String, IngestError> {
    match kind {
        FileKind::Pdf => PdfTextExtractor.extract(bytes, filename),
        FileKind::Docx => DocxTextExtractor.extract(bytes, filename),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn docx_with_body(body_xml: &str) -> Vec<u8> {
        let mut archive = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        archive.start_file("word/document.xml", options).unwrap();
        archive
            .write_all(
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8"?><w:document><w:body>{body_xml}</w:body></w:document>"#
                )
                .as_bytes(),
            )
            .unwrap();
        archive.finish().unwrap().into_inner()
    }

    #[test]
    fn docx_paragraphs_become_lines() {
        let bytes = docx_with_body(
            "<w:p><w:r><w:t>First paragraph</w:t></w:r></w:p>\
             <w:p><w:r><w:t>Second</w:t></w:r><w:r><w:t> paragraph</w:t></w:r></w:p>",
        );

        let text = DocxTextExtractor.extract(&bytes, "test.docx").unwrap();
        assert_eq!(text, "First paragraph\nSecond paragraph");
    }

    #[test]
    fn docx_entities_are_unescaped() {
        let bytes = docx_with_body("<w:p><w:r><w:t>a &amp; b</w:t></w:r></w:p>");
        let text = DocxTextExtractor.extract(&bytes, "test.docx").unwrap();
        assert_eq!(text, "a & b");
    }

    #[test]
    fn docx_without_text_is_rejected() {
        let bytes = docx_with_body("<w:p></w:p>");
        assert!(matches!(
            DocxTextExtractor.extract(&bytes, "empty.docx"),
            Err(IngestError::NoText(_))
        ));
    }

    #[test]
    fn garbage_bytes_are_a_parse_error_not_a_panic() {
        assert!(matches!(
            DocxTextExtractor.extract(b"not a zip archive", "bad.docx"),
            Err(IngestError::DocxParse(_))
        ));
        assert!(matches!(
            PdfTextExtractor.extract(b"%PDF-1.4\n%broken", "bad.pdf"),
            Err(IngestError::PdfParse(_))
        ));
    }
}
