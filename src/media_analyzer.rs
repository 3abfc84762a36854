use std::io::Cursor;
use zip::ZipArchive;

/// Byte markers for PDF JavaScript actions
const PDF_SCRIPT_MARKERS: [&[u8]; 2] = [b"/JavaScript", b"/JS"];

const VBA_PROJECT_ENTRY: &str = "vbaProject.bin";

/// Content inspection for attachment payloads and media-type URL classification.
#[derive(Debug, Clone)]
pub struct MediaAnalyzer {
    media_extensions: Vec<String>,
}

impl MediaAnalyzer {
    pub fn new(media_extensions: &[String]) -> Self {
        Self {
            media_extensions: media_extensions.iter().map(|e| e.to_lowercase()).collect(),
        }
    }

    /// A URL whose path ends in an image/audio/video/archive extension.
    pub fn is_media_url(&self, url: &str) -> bool {
        let lower = url.to_lowercase();
        let path = lower
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .trim_end_matches('/');
        self.media_extensions.iter().any(|ext| path.ends_with(ext))
    }

    /// Entry names of a zip-structured payload, `None` when it does not open.
    pub fn list_archive_entries(&self, payload: &[u8]) -> Option<Vec<String>> {
        match ZipArchive::new(Cursor::new(payload)) {
            Ok(archive) => Some(archive.file_names().map(str::to_string).collect()),
            Err(e) => {
                log::debug!("Payload is not a readable zip container: {}", e);
                None
            }
        }
    }

    /// Office container carrying a VBA project. Unreadable containers count as no macros.
    pub fn has_vba_project(&self, payload: &[u8]) -> bool {
        self.list_archive_entries(payload)
            .map(|entries| {
                entries.iter().any(|name| {
                    name.rsplit('/')
                        .next()
                        .is_some_and(|file| file.eq_ignore_ascii_case(VBA_PROJECT_ENTRY))
                })
            })
            .unwrap_or(false)
    }

    pub fn has_pdf_script(&self, payload: &[u8]) -> bool {
        PDF_SCRIPT_MARKERS
            .iter()
            .any(|marker| payload.windows(marker.len()).any(|window| window == *marker))
    }
}
