use async_trait::async_trait;
use axon_sdk::collaborators::DocumentLoader;
use axon_sdk::errors::{Result, TutorError};
use axon_sdk::types::{DocumentKind, PageText};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Loader for plain text and CSV uploads.
///
/// Text files load as a single unpaged block. CSV files load one block per
/// data row, rendered as `column: value` lines.
pub struct PlainTextLoader;

#[async_trait]
impl DocumentLoader for PlainTextLoader {
    fn supports(&self, kind: DocumentKind) -> bool {
        matches!(kind, DocumentKind::Text | DocumentKind::Csv)
    }

    async fn load(&self, path: &Path, kind: DocumentKind) -> Result<Vec<PageText>> {
        let bytes = tokio::fs::read(path).await?;
        let text = String::from_utf8(bytes).map_err(|_| {
            TutorError::UnsupportedInput("File is not valid UTF-8 text".to_string())
        })?;

        match kind {
            DocumentKind::Text => Ok(vec![PageText {
                text,
                page: None,
            }]),
            DocumentKind::Csv => Ok(csv_rows(&text)),
            other => Err(TutorError::UnsupportedInput(format!(
                "{:?} files need a dedicated loader",
                other
            ))),
        }
    }
}

/// Loader for PDF uploads, one `PageText` per page with its 1-based number
pub struct PdfLoader;

#[async_trait]
impl DocumentLoader for PdfLoader {
    fn supports(&self, kind: DocumentKind) -> bool {
        kind == DocumentKind::Pdf
    }

    async fn load(&self, path: &Path, _kind: DocumentKind) -> Result<Vec<PageText>> {
        let path = path.to_path_buf();
        run_blocking(move || pdf_pages(&path)).await
    }
}

fn pdf_pages(path: &Path) -> Result<Vec<PageText>> {
    let doc = lopdf::Document::load(path)
        .map_err(|e| TutorError::UnsupportedInput(format!("Not a readable PDF: {}", e)))?;

    let mut pages = Vec::new();
    for page in doc.get_pages().into_keys() {
        match doc.extract_text(&[page]) {
            Ok(text) => pages.push(PageText {
                text,
                page: Some(page),
            }),
            Err(e) => warn!("Failed to extract text from page {}: {}", page, e),
        }
    }

    debug!("Loaded {} pages from {:?}", pages.len(), path);
    Ok(pages)
}

/// Loader for Word uploads.
///
/// Reads `word/document.xml` from the archive and keeps one line per
/// paragraph. Legacy binary `.doc` files are not archives and are rejected.
pub struct DocxLoader;

#[async_trait]
impl DocumentLoader for DocxLoader {
    fn supports(&self, kind: DocumentKind) -> bool {
        kind == DocumentKind::Docx
    }

    async fn load(&self, path: &Path, _kind: DocumentKind) -> Result<Vec<PageText>> {
        let path: PathBuf = path.to_path_buf();
        run_blocking(move || {
            let xml = read_docx_body(&path)?;
            Ok(vec![PageText {
                text: docx_paragraphs(&xml),
                page: None,
            }])
        })
        .await
    }
}

fn read_docx_body(path: &Path) -> Result<String> {
    let invalid = |e: zip::result::ZipError| {
        TutorError::UnsupportedInput(format!("Not a readable DOCX file: {}", e))
    };

    let file = std::fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file).map_err(invalid)?;
    let mut body = archive.by_name("word/document.xml").map_err(invalid)?;

    let mut xml = String::new();
    body.read_to_string(&mut xml)?;
    Ok(xml)
}

/// Text of each `<w:p>` paragraph, one per line, with XML entities decoded
fn docx_paragraphs(xml: &str) -> String {
    xml.split("</w:p>")
        .map(strip_xml_tags)
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn strip_xml_tags(xml: &str) -> String {
    let mut text = String::new();
    let mut inside_tag = false;

    for c in xml.chars() {
        match c {
            '<' => inside_tag = true,
            '>' => inside_tag = false,
            _ if !inside_tag => text.push(c),
            _ => {}
        }
    }

    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
        .trim()
        .to_string()
}

/// Run a blocking parser off the async runtime
async fn run_blocking<F>(parse: F) -> Result<Vec<PageText>>
where
    F: FnOnce() -> Result<Vec<PageText>> + Send + 'static,
{
    tokio::task::spawn_blocking(parse)
        .await
        .map_err(|e| TutorError::Processing(format!("Document parser task failed: {}", e)))?
}

fn csv_rows(text: &str) -> Vec<PageText> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let Some(header_line) = lines.next() else {
        return Vec::new();
    };
    let headers = split_csv_line(header_line);

    lines
        .map(|line| {
            let values = split_csv_line(line);
            let text = headers
                .iter()
                .zip(values.iter().chain(std::iter::repeat(&String::new())))
                .map(|(h, v)| format!("{}: {}", h, v))
                .collect::<Vec<_>>()
                .join("\n");
            PageText { text, page: None }
        })
        .collect()
}

/// Split one CSV line, honouring double-quoted fields
fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current).trim().to_string()),
            _ => current.push(ch),
        }
    }
    fields.push(current.trim().to_string());

    fields
}
