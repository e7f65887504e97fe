//! Document text provider: turns an uploaded file into plain text.
//!
//! Contract: never fails. Unreadable, corrupt or unsupported files yield an
//! empty string, which the batch processor records as "No text extracted".

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use tracing::warn;

static XML_TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

const DOCX_BODY: &str = "word/document.xml";

#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract_text(&self, path: &Path) -> String;
}

/// PDF (via `pdf-extract`) and DOCX (via `zip`) reader.
/// Parsing runs on the blocking pool; a panic inside a parser is treated as a read failure.
pub struct FileTextExtractor;

#[async_trait]
impl TextExtractor for FileTextExtractor {
    async fn extract_text(&self, path: &Path) -> String {
        let owned = path.to_path_buf();
        let result = tokio::task::spawn_blocking(move || read_document(&owned)).await;

        match result {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                warn!(file = %path.display(), "Text extraction failed: {e}");
                String::new()
            }
            Err(e) => {
                warn!(file = %path.display(), "Text extraction task aborted: {e}");
                String::new()
            }
        }
    }
}

fn read_document(path: &Path) -> anyhow::Result<String> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "pdf" => Ok(pdf_extract::extract_text(path)?),
        "docx" => read_docx(path),
        _ => Ok(String::new()),
    }
}

fn read_docx(path: &Path) -> anyhow::Result<String> {
    let mut archive = zip::ZipArchive::new(File::open(path)?)?;
    let mut xml = String::new();
    archive.by_name(DOCX_BODY)?.read_to_string(&mut xml)?;
    Ok(docx_xml_to_text(&xml))
}

/// One output line per `<w:p>` paragraph, markup removed, entities decoded.
fn docx_xml_to_text(xml: &str) -> String {
    let with_breaks = xml.replace("</w:p>", "\n").replace("<w:tab/>", "\t");
    let stripped = XML_TAG_RE.replace_all(&with_breaks, "");
    decode_entities(&stripped)
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
