//! Output file and folder names derived from service-supplied titles.
//!
//! Names arrive HTML-escaped and in arbitrary scripts. They are folded to
//! ASCII so the same archive unpacks identically on every filesystem.

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Anything but word characters, whitespace, dots and hyphens.
#[allow(clippy::expect_used)]
static DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s.-]").expect("disallowed-char regex is valid"));

#[allow(clippy::expect_used)]
static SEPARATOR_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-\s]+").expect("separator regex is valid"));

/// Folds a title into a safe file name.
///
/// Compatibility-decomposes and drops non-ASCII, removes everything except
/// word characters, whitespace, `.` and `-`, trims whitespace then dots, and
/// collapses runs of whitespace and hyphens into a single hyphen. A title
/// with nothing left after folding becomes `_`.
///
/// ```
/// use archiver_core::archive::sanitise_file_name;
///
/// assert_eq!(sanitise_file_name("3_Café Menu (final).pdf"), "3_Cafe-Menu-final.pdf");
/// ```
#[must_use]
pub fn sanitise_file_name(value: &str) -> String {
    let ascii: String = value.nfkd().filter(char::is_ascii).collect();
    let kept = DISALLOWED.replace_all(&ascii, "");
    let trimmed = kept.trim().trim_matches('.');
    let name = SEPARATOR_RUN.replace_all(trimmed, "-");
    if name.is_empty() {
        return "_".to_string();
    }
    name.into_owned()
}

/// Like [`sanitise_file_name`], with dots replaced so no folder looks like a file.
#[must_use]
pub fn sanitise_folder_name(value: &str) -> String {
    sanitise_file_name(value).replace('.', "_")
}

/// Decodes the HTML entities the service leaves in titles.
///
/// Covers every HTML5 named entity plus decimal and hex character
/// references. Text that is not a known entity is left untouched.
#[must_use]
pub fn html_unescape(value: &str) -> String {
    html_escape::decode_html_entities(value).into_owned()
}

/// Last path segment of a URL without its query string.
#[must_use]
pub fn url_basename(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/').next().unwrap_or(path)
}
