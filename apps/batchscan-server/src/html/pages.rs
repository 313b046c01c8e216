//! Page templates

use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::batch::BatchPattern;
use crate::scan::ScanOutcome;
use crate::upload::ACCEPTED_MIME_TYPES;

const STYLE: &str = "body{font-family:sans-serif;max-width:40rem;margin:2rem auto;padding:0 1rem}\
.ok{color:#1a7f37}.fail{color:#cf222e}\
pre{background:#f6f8fa;padding:1rem;white-space:pre-wrap;word-break:break-word}\
code.batch{font-size:1.4rem}";

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
<title>{}</title>\n<style>{}</style>\n</head>\n<body>\n{}\n</body>\n</html>\n",
        encode_text(title),
        STYLE,
        body
    )
}

fn accept_attribute() -> String {
    ACCEPTED_MIME_TYPES
        .iter()
        .map(|(mime, _)| *mime)
        .collect::<Vec<_>>()
        .join(",")
}

/// Upload form
pub fn render_index(pattern: &BatchPattern) -> String {
    let body = format!(
        "<h1>Batch number scanner</h1>\n\
<p>Upload a photo of the label. The text is read with OCR and searched for a batch number \
(<code>{}</code> followed by {} letters or digits).</p>\n\
<form action=\"/scan\" method=\"post\" enctype=\"multipart/form-data\">\n\
<p><input type=\"file\" name=\"image\" accept=\"{}\" required></p>\n\
<p><button type=\"submit\">Extract batch number</button></p>\n\
</form>",
        encode_text(pattern.prefix()),
        pattern.suffix_len(),
        encode_double_quoted_attribute(&accept_attribute()),
    );
    layout("Batch number scanner", &body)
}

/// Result page for a completed scan
pub fn render_result(outcome: &ScanOutcome) -> String {
    let mut body = String::from("<h1>Scan result</h1>\n");

    match &outcome.batch_number {
        Some(batch) => {
            body.push_str(&format!(
                "<p class=\"ok\">{}</p>\n<p><code class=\"batch\">{}</code></p>\n",
                encode_text(outcome.message),
                encode_text(batch)
            ));
        }
        None => {
            body.push_str(&format!(
                "<p class=\"fail\">{}</p>\n",
                encode_text(outcome.message)
            ));
        }
    }

    body.push_str("<h2>Recognized text</h2>\n");
    if outcome.raw_text.is_empty() {
        body.push_str("<p><em>No text was recognized.</em></p>\n");
    } else {
        body.push_str(&format!("<pre>{}</pre>\n", encode_text(&outcome.raw_text)));
    }

    body.push_str("<p><a href=\"/\">Scan another image</a></p>");
    layout("Scan result", &body)
}

/// Error page
pub fn render_error(message: &str) -> String {
    let body = format!(
        "<h1>Scan failed</h1>\n<p class=\"fail\">{}</p>\n<p><a href=\"/\">Try again</a></p>",
        encode_text(message)
    );
    layout("Scan failed", &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::ScanService;

    fn outcome(text: &str) -> ScanOutcome {
        ScanService::new(BatchPattern::default(), 1, 0).match_text(Some(text))
    }

    #[test]
    fn test_index_lists_accepted_types() {
        let page = render_index(&BatchPattern::default());
        assert!(page.contains("name=\"image\""));
        assert!(page.contains("image/jpeg"));
        assert!(page.contains("image/webp"));
        assert!(page.contains("<code>medplus</code> followed by 12"));
    }

    #[test]
    fn test_result_shows_batch_number() {
        let page = render_result(&outcome("Lot medplusABC123456789"));
        assert!(page.contains("Batch number found"));
        assert!(page.contains("<code class=\"batch\">medplusABC123456789</code>"));
    }

    #[test]
    fn test_result_not_found() {
        let page = render_result(&outcome("foo bar"));
        assert!(page.contains("class=\"fail\">Batch number not found"));
        assert!(page.contains("<pre>foo bar</pre>"));
    }

    #[test]
    fn test_ocr_text_is_escaped() {
        let page = render_result(&outcome("<script>alert(1)</script>"));
        assert!(!page.contains("<script>"));
        assert!(page.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_error_page() {
        let page = render_error("Error processing image. Please try again.");
        assert!(page.contains("Error processing image. Please try again."));
    }
}
