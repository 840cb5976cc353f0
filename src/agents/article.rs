//! Article post-processing: title extraction, slugs and sanitization.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use scraper::{ElementRef, Html, Node};

/// Title used when the draft has no `<h1>`.
pub const DEFAULT_TITLE: &str = "Untitled Dispatch";

static H1: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h1[^>]*>(.*?)</h1>").expect("valid h1 regex"));
static TAGS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid tag regex"));

/// Elements dropped together with everything inside them.
const STRIPPED_ELEMENTS: &[&str] = &[
    "script", "style", "iframe", "object", "embed", "frame", "frameset", "applet",
];

/// Elements serialized without a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// URL schemes that execute code when followed.
const SCRIPT_SCHEMES: &[&str] = &["javascript:", "vbscript:"];

/// Split the first `<h1>` off an HTML draft.
///
/// Returns the heading text (tags stripped) and the body with that heading
/// removed. Falls back to [`DEFAULT_TITLE`] and the untouched body.
#[must_use]
pub fn extract_title(html: &str) -> (String, String) {
    let Some(captures) = H1.captures(html) else {
        return (DEFAULT_TITLE.to_string(), html.trim().to_string());
    };
    let (Some(whole), Some(inner)) = (captures.get(0), captures.get(1)) else {
        return (DEFAULT_TITLE.to_string(), html.trim().to_string());
    };

    let title = TAGS.replace_all(inner.as_str(), "");
    let title = title.split_whitespace().collect::<Vec<_>>().join(" ");
    let body = format!("{}{}", &html[..whole.start()], &html[whole.end()..]);

    let title = if title.is_empty() {
        DEFAULT_TITLE.to_string()
    } else {
        title
    };
    (title, body.trim().to_string())
}

/// Deterministic URL slug: lowercase ASCII alphanumerics joined by single hyphens.
#[must_use]
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;
    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }
    if slug.is_empty() {
        "article".to_string()
    } else {
        slug
    }
}

/// Slug with a time-based base-36 suffix, e.g. `hello-world-m1x2y3z4`.
#[must_use]
pub fn slug_with_suffix(title: &str, now: DateTime<Utc>) -> String {
    let millis = u64::try_from(now.timestamp_millis()).unwrap_or_default();
    format!("{}-{}", slugify(title), to_base36(millis))
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// Remove active content from generated HTML.
///
/// The draft is parsed as an HTML fragment and re-serialized from the tree.
/// Script-like elements go with their content, `on*` attributes are
/// dropped, and so is any attribute whose entity-decoded value is a script
/// URL. Comments are not kept.
#[must_use]
pub fn sanitize_html(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut out = String::with_capacity(html.len());
    write_children(fragment.root_element(), &mut out);
    out
}

fn write_children(parent: ElementRef<'_>, out: &mut String) {
    for child in parent.children() {
        match child.value() {
            Node::Text(text) => escape_into(text, false, out),
            Node::Element(_) => {
                if let Some(element) = ElementRef::wrap(child) {
                    write_element(element, out);
                }
            }
            _ => {}
        }
    }
}

fn write_element(element: ElementRef<'_>, out: &mut String) {
    let name = element.value().name();
    if STRIPPED_ELEMENTS.contains(&name) {
        return;
    }

    out.push('<');
    out.push_str(name);
    for (attr, value) in element.value().attrs() {
        if attr.to_ascii_lowercase().starts_with("on") || is_script_url(value) {
            continue;
        }
        out.push(' ');
        out.push_str(attr);
        out.push_str("=\"");
        escape_into(value, true, out);
        out.push('"');
    }
    out.push('>');

    if VOID_ELEMENTS.contains(&name) {
        return;
    }
    write_children(element, out);
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

/// Browsers ignore whitespace and control characters inside a scheme.
fn is_script_url(value: &str) -> bool {
    let compact: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();
    SCRIPT_SCHEMES.iter().any(|scheme| compact.starts_with(scheme))
}

fn escape_into(text: &str, in_attribute: bool, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if in_attribute => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_is_extracted_and_removed() {
        let (title, body) = extract_title("<h1 class=\"x\">Hello <em>World</em></h1>\n<p>Body</p>");
        assert_eq!(title, "Hello World");
        assert_eq!(body, "<p>Body</p>");
    }

    #[test]
    fn only_first_heading_is_removed() {
        let (title, body) = extract_title("<H1>One</H1><p>a</p><h1>Two</h1>");
        assert_eq!(title, "One");
        assert_eq!(body, "<p>a</p><h1>Two</h1>");
    }

    #[test]
    fn missing_heading_uses_default_title() {
        let (title, body) = extract_title("<p>No heading</p>");
        assert_eq!(title, DEFAULT_TITLE);
        assert_eq!(body, "<p>No heading</p>");
    }

    #[test]
    fn slug_is_lowercase_hyphenated() {
        assert_eq!(slugify("Hello World!"), "hello-world");
        assert_eq!(slugify("  Rust & the -- Web  "), "rust-the-web");
        assert_eq!(slugify("!!!"), "article");
    }

    #[test]
    fn slug_base_is_idempotent() {
        let once = slugify("Hello World!");
        assert_eq!(slugify(&once), once);
    }

    #[test]
    fn suffixed_slug_keeps_base() {
        let slug = slug_with_suffix("Hello World!", Utc::now());
        let suffix = slug.strip_prefix("hello-world-").unwrap();
        assert!(!suffix.is_empty());
        assert!(suffix.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn base36_encoding() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
    }

    #[test]
    fn sanitizer_strips_active_content() {
        let dirty = "<p onclick=\"steal()\">Hi</p><script>alert(1)</script>\
<a href=\"javascript:alert(1)\">x</a><iframe src=\"https://evil\"></iframe><img src=x onerror=boom>";
        let clean = sanitize_html(dirty);
        assert!(!clean.contains("script"));
        assert!(!clean.contains("onclick"));
        assert!(!clean.contains("onerror"));
        assert!(!clean.contains("javascript:"));
        assert!(!clean.contains("iframe"));
        assert!(clean.contains("<p>Hi</p>"));
    }

    #[test]
    fn sanitizer_strips_slash_separated_handlers() {
        let clean = sanitize_html("<svg/onload=alert(1)><p>x</p>");
        assert!(!clean.contains("onload"), "{clean}");
        assert!(!clean.contains("alert"), "{clean}");
        assert!(clean.contains("<p>x</p>"), "{clean}");
    }

    #[test]
    fn sanitizer_decodes_entities_before_checking_schemes() {
        for dirty in [
            "<a href=\"jav&#x61;script:alert(1)\">x</a>",
            "<a href=\"java&#9;script:alert(1)\">x</a>",
            "<a href=\" JAVASCRIPT:alert(1)\">x</a>",
            "<img src=\"vbscript:msgbox(1)\">",
        ] {
            let clean = sanitize_html(dirty);
            assert!(!clean.contains("alert") && !clean.contains("msgbox"), "{dirty} -> {clean}");
        }
        assert_eq!(sanitize_html("<a href=\"jav&#x61;script:alert(1)\">x</a>"), "<a>x</a>");
    }

    #[test]
    fn sanitizer_drops_unclosed_script_and_comments() {
        let clean = sanitize_html("<p>kept</p><!-- note --><script>never()");
        assert_eq!(clean, "<p>kept</p>");
    }

    #[test]
    fn sanitizer_escapes_text_and_attributes() {
        let clean = sanitize_html("<p title='a \"b\"'>1 &lt; 2 &amp; 3</p>");
        assert_eq!(clean, "<p title=\"a &quot;b&quot;\">1 &lt; 2 &amp; 3</p>");
    }

    #[test]
    fn sanitizer_keeps_plain_markup() {
        let html = "<h2>Section</h2><p>Text with <a href=\"https://example.com\">link</a>.</p>";
        assert_eq!(sanitize_html(html), html);
    }
}
