use html_escape::encode_double_quoted_attribute;
use tracing::debug;

use crate::reserved::{INSTRUMENTATION_SCRIPT_ID, RESET_STYLE_ID, RUNTIME_SCRIPT_ID};

/// Design-system runtime loaded into every preview.
pub const DEFAULT_RUNTIME_SRC: &str = "https://cdn.tailwindcss.com";

const RESET_CSS: &str = "html, body { margin: 0; padding: 0; width: 100%; height: 100%; }";

const INSTRUMENTATION_JS: &str = include_str!("../assets/instrumentation.js");

/// Turns generated markup into a complete, instrumented preview document.
///
/// The output must never be fed back in: normalizing an instrumented
/// document injects a second copy of everything. Normalize raw markup or
/// serializer output only.
#[derive(Debug, Clone)]
pub struct Normalizer {
    runtime_src: String,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(DEFAULT_RUNTIME_SRC)
    }
}

impl Normalizer {
    pub fn new(runtime_src: impl Into<String>) -> Self {
        Self {
            runtime_src: runtime_src.into(),
        }
    }

    pub fn runtime_src(&self) -> &str {
        &self.runtime_src
    }

    /// Empty input yields an empty string: nothing to preview.
    pub fn normalize(&self, raw: &str) -> String {
        if raw.trim().is_empty() {
            return String::new();
        }

        let lowered = raw.to_ascii_lowercase();
        if lowered.contains("<html") {
            debug!(target = "normalize", "injecting into full document");
            self.inject_into_document(raw, &lowered)
        } else {
            debug!(target = "normalize", "wrapping fragment");
            self.wrap_fragment(raw)
        }
    }

    fn head_injection(&self) -> String {
        format!(
            r#"<script id="{RUNTIME_SCRIPT_ID}" src="{}"></script><style id="{RESET_STYLE_ID}">{RESET_CSS}</style>"#,
            encode_double_quoted_attribute(&self.runtime_src)
        )
    }

    fn body_injection(&self) -> String {
        format!(r#"<script id="{INSTRUMENTATION_SCRIPT_ID}">{INSTRUMENTATION_JS}</script>"#)
    }

    // `lowered` is `raw` ASCII-lowercased, so byte offsets line up.
    fn inject_into_document(&self, raw: &str, lowered: &str) -> String {
        let head = self.head_injection();
        let body = self.body_injection();
        let mut output = String::with_capacity(raw.len() + head.len() + body.len() + 16);

        let head_at = lowered.find("</head>");
        let body_at = lowered.rfind("</body>").filter(|at| Some(*at) > head_at);
        let html_close_at = lowered.rfind("</html>");

        let mut cursor = 0;
        match head_at {
            Some(at) => {
                output.push_str(&raw[..at]);
                output.push_str(&head);
                cursor = at;
            }
            None => {
                if let Some(at) = start_tag_end(lowered, "<html") {
                    output.push_str(&raw[..at]);
                    output.push_str("<head>");
                    output.push_str(&head);
                    output.push_str("</head>");
                    cursor = at;
                }
            }
        }

        let body_insert_at = body_at
            .or(html_close_at.filter(|at| *at >= cursor))
            .unwrap_or(raw.len());
        output.push_str(&raw[cursor..body_insert_at]);
        output.push_str(&body);
        output.push_str(&raw[body_insert_at..]);
        output
    }

    fn wrap_fragment(&self, raw: &str) -> String {
        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8" />
<meta name="viewport" content="width=device-width, initial-scale=1.0" />
{head}</head>
<body>
{raw}
{body}</body>
</html>
"#,
            head = self.head_injection(),
            body = self.body_injection(),
        )
    }
}

/// Normalize with the default runtime.
pub fn normalize(raw: &str) -> String {
    Normalizer::default().normalize(raw)
}

/// Byte offset just past the `>` closing the first `tag` start tag.
fn start_tag_end(lowered: &str, tag: &str) -> Option<usize> {
    let start = lowered.find(tag)?;
    lowered[start..].find('>').map(|offset| start + offset + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(haystack: &str, needle: &str) -> usize {
        haystack.matches(needle).count()
    }

    #[test]
    fn empty_input_means_nothing_to_preview() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("  \n\t"), "");
    }

    #[test]
    fn wraps_fragments_in_a_document() {
        let document = normalize("<h1>Hi</h1>");
        assert!(document.starts_with("<!DOCTYPE html>"));
        let head_end = document.find("</head>").unwrap();
        let body_start = document.find("<body>").unwrap();
        assert!(document[..head_end].contains(DEFAULT_RUNTIME_SRC));
        assert!(document[body_start..].contains("<h1>Hi</h1>"));
        assert_eq!(count(&document, RUNTIME_SCRIPT_ID), 1);
        assert_eq!(count(&document, INSTRUMENTATION_SCRIPT_ID), 1);
    }

    #[test]
    fn injects_into_full_documents_in_place() {
        let raw = "<!doctype html><HTML><Head><title>x</title></HEAD><body><p>a</p></BODY></html>";
        let document = normalize(raw);
        assert!(document.starts_with("<!doctype html><HTML><Head><title>x</title><script id=\"ai-preview-runtime\""));
        assert!(document.contains("</style></HEAD><body><p>a</p><script id=\"ai-preview-script\">"));
        assert!(document.ends_with("</script></BODY></html>"));
        assert_eq!(count(&document, RUNTIME_SCRIPT_ID), 1);
        assert_eq!(count(&document, RESET_STYLE_ID), 1);
        assert_eq!(count(&document, INSTRUMENTATION_SCRIPT_ID), 1);
    }

    #[test]
    fn opens_a_head_when_missing() {
        let document = normalize(r#"<html lang="fr"><body>x</body></html>"#);
        assert!(document.starts_with(r#"<html lang="fr"><head><script id="ai-preview-runtime""#));
        assert!(document.ends_with("</script></body></html>"));
    }

    #[test]
    fn appends_script_without_closing_tags() {
        let document = normalize("<html><head></head><p>unterminated");
        assert!(document.contains("<p>unterminated<script id=\"ai-preview-script\">"));
        assert!(document.ends_with("</script>"));
    }

    #[test]
    fn escapes_runtime_source() {
        let document = Normalizer::new("https://cdn.example/rt.js?a=1&b=\"2\"").normalize("<p>x</p>");
        assert!(document.contains(r#"src="https://cdn.example/rt.js?a=1&amp;b=&quot;2&quot;""#));
    }

    #[test]
    fn instrumentation_script_never_closes_early() {
        assert!(!INSTRUMENTATION_JS.to_ascii_lowercase().contains("</script"));
    }
}
