//! File type labels, size formatting, and the accepted upload types.

#[cfg(test)]
#[path = "files_test.rs"]
mod tests;

use std::path::Path;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_PPT: &str = "application/vnd.ms-powerpoint";
pub const MIME_PPTX: &str = "application/vnd.openxmlformats-officedocument.presentationml.presentation";
pub const MIME_CSV: &str = "text/csv";
pub const MIME_XLS: &str = "application/vnd.ms-excel";
pub const MIME_XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const MIME_DOC: &str = "application/msword";
pub const MIME_DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const MIME_TXT: &str = "text/plain";

/// Upload-accepted MIME types with the extension each one is recognized by.
pub const ACCEPTED_TYPES: [(&str, &str); 9] = [
    (MIME_PDF, "pdf"),
    (MIME_PPT, "ppt"),
    (MIME_PPTX, "pptx"),
    (MIME_CSV, "csv"),
    (MIME_XLS, "xls"),
    (MIME_XLSX, "xlsx"),
    (MIME_DOC, "doc"),
    (MIME_DOCX, "docx"),
    (MIME_TXT, "txt"),
];

/// MIME type used when a file's extension is not recognized.
pub const MIME_UNKNOWN: &str = "application/octet-stream";

#[must_use]
pub fn is_accepted_type(mime_type: &str) -> bool {
    ACCEPTED_TYPES.iter().any(|(mime, _)| *mime == mime_type)
}

/// Guess the MIME type from the file extension (case-insensitive).
#[must_use]
pub fn mime_for_path(path: &Path) -> &'static str {
    let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
        return MIME_UNKNOWN;
    };
    let ext = ext.to_ascii_lowercase();
    ACCEPTED_TYPES
        .iter()
        .find(|(_, known)| *known == ext)
        .map_or(MIME_UNKNOWN, |(mime, _)| *mime)
}

/// Short human label for a MIME type.
#[must_use]
pub fn file_type_label(mime_type: &str) -> &'static str {
    match mime_type {
        MIME_PDF => "PDF",
        MIME_PPT | MIME_PPTX => "PowerPoint",
        MIME_CSV => "CSV",
        MIME_XLS | MIME_XLSX => "Excel",
        MIME_DOC | MIME_DOCX => "Word",
        MIME_TXT => "Text",
        _ => "Document",
    }
}

/// Format a byte count as `"1.5 KB"` style text, base 1024.
#[must_use]
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];
    if bytes == 0 {
        return "0 Bytes".to_owned();
    }

    let mut unit = 0;
    let mut scaled = bytes;
    while scaled >= 1024 && unit < UNITS.len() - 1 {
        scaled /= 1024;
        unit += 1;
    }

    #[allow(clippy::cast_precision_loss)]
    let value = bytes as f64 / 1024_f64.powi(i32::try_from(unit).unwrap_or(0));
    let rounded = (value * 10.0).round() / 10.0;
    if rounded.fract() == 0.0 {
        format!("{rounded:.0} {}", UNITS[unit])
    } else {
        format!("{rounded:.1} {}", UNITS[unit])
    }
}
