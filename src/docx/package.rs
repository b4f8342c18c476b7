//! OPC package handling: a `.docx` is a zip archive whose main story lives
//! in `word/document.xml`. Every other part is carried through untouched.

use std::io::{Cursor, Read, Write};
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::wordml::{paragraph_text, PARAGRAPH};
use super::xml::{Element, XmlDocument};
use super::DocxError;

pub const MAIN_DOCUMENT_PART: &str = "word/document.xml";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const DOCUMENT_OPEN: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><w:body>"#;

const DOCUMENT_CLOSE: &str = r#"<w:sectPr><w:pgSz w:w="11906" w:h="16838"/><w:pgMar w:top="1417" w:right="1701" w:bottom="1417" w:left="1701" w:header="708" w:footer="708" w:gutter="0"/></w:sectPr></w:body></w:document>"#;

#[derive(Debug, Clone)]
struct PackagePart {
    name: String,
    data: Vec<u8>,
    compression: CompressionMethod,
    is_dir: bool,
}

/// An opened `.docx` with its main document parsed for editing.
#[derive(Debug, Clone)]
pub struct DocxDocument {
    parts: Vec<PackagePart>,
    document: XmlDocument,
}

impl DocxDocument {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DocxError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut parts = Vec::with_capacity(archive.len());
        let mut document_source: Option<Vec<u8>> = None;

        for index in 0..archive.len() {
            let mut file = archive.by_index(index)?;
            let name = file.name().to_string();
            let compression = file.compression();
            let is_dir = file.is_dir();

            let mut data = Vec::with_capacity(file.size() as usize);
            if !is_dir {
                file.read_to_end(&mut data)?;
            }
            if name == MAIN_DOCUMENT_PART {
                document_source = Some(data.clone());
            }
            parts.push(PackagePart {
                name,
                data,
                compression,
                is_dir,
            });
        }

        let source = document_source.ok_or(DocxError::MissingPart(MAIN_DOCUMENT_PART))?;
        let source = std::str::from_utf8(&source)
            .map_err(|e| DocxError::Xml(format!("{MAIN_DOCUMENT_PART} is not UTF-8: {e}")))?;
        let document = XmlDocument::parse(source)?;
        if document.root.child("w:body").is_none() {
            return Err(DocxError::MissingBody);
        }

        Ok(Self { parts, document })
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, DocxError> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::from_bytes(&bytes)
    }

    /// Minimal package around a `w:body` fragment. The fragment is the
    /// inner XML of the body, without the section properties.
    pub fn from_document_xml(body_xml: &str) -> Result<Self, DocxError> {
        let document = format!("{DOCUMENT_OPEN}{body_xml}{DOCUMENT_CLOSE}");
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for (name, content) in [
            ("[Content_Types].xml", CONTENT_TYPES),
            ("_rels/.rels", PACKAGE_RELS),
            (MAIN_DOCUMENT_PART, document.as_str()),
        ] {
            writer.start_file(name, options)?;
            writer.write_all(content.as_bytes())?;
        }
        let bytes = writer.finish()?.into_inner();
        Self::from_bytes(&bytes)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, DocxError> {
        let document_bytes = self.document.to_bytes()?;
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

        for part in &self.parts {
            let method = match part.compression {
                CompressionMethod::Stored => CompressionMethod::Stored,
                _ => CompressionMethod::Deflated,
            };
            let options = SimpleFileOptions::default().compression_method(method);

            if part.is_dir {
                writer.add_directory(part.name.as_str(), options)?;
                continue;
            }

            writer.start_file(part.name.as_str(), options)?;
            if part.name == MAIN_DOCUMENT_PART {
                writer.write_all(&document_bytes)?;
            } else {
                writer.write_all(&part.data)?;
            }
        }

        Ok(writer.finish()?.into_inner())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), DocxError> {
        std::fs::write(path.as_ref(), self.to_bytes()?)?;
        Ok(())
    }

    pub fn body(&self) -> &Element {
        // Checked in `from_bytes`.
        self.document
            .root
            .child("w:body")
            .unwrap_or_else(|| unreachable!("document without w:body"))
    }

    pub fn body_mut(&mut self) -> &mut Element {
        self.document
            .root
            .child_mut("w:body")
            .unwrap_or_else(|| unreachable!("document without w:body"))
    }

    #[cfg(test)]
    pub(crate) fn document_xml(&self) -> Result<String, DocxError> {
        self.document.to_string_lossy()
    }

    /// Every paragraph's text, in document order, tables included.
    pub fn paragraphs(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.body()
            .for_each_named(PARAGRAPH, &mut |p| out.push(paragraph_text(p)));
        out
    }

    pub fn text(&self) -> String {
        self.paragraphs().join("\n")
    }
}
