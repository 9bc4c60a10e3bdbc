//! Redaction of credentials that vendors echo back in error bodies.

use std::borrow::Cow;
use std::ops::Range;

/// Longest detail string carried into a problem, in characters.
const MAX_DETAIL_CHARS: usize = 200;

const REDACTED: &str = "[REDACTED]";

const SECRET_MARKERS: [&str; 10] = [
    "Bearer ",
    "bearer ",
    "access_token=",
    "refresh_token=",
    "client_secret=",
    "\"access_token\":\"",
    "\"refresh_token\":\"",
    "\"client_secret\":\"",
    "\"id_token\":\"",
    "\"token\":\"",
];

fn is_secret_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~' | '+' | '/' | '=')
}

/// Byte ranges of the values following each marker, sorted and disjoint.
fn secret_spans(input: &str) -> Vec<Range<usize>> {
    let mut spans: Vec<Range<usize>> = SECRET_MARKERS
        .iter()
        .copied()
        .flat_map(|marker| input.match_indices(marker))
        .filter_map(|(at, marker)| {
            let start = at + marker.len();
            let rest = &input[start..];
            let len = rest.find(|c: char| !is_secret_char(c)).unwrap_or(rest.len());
            (len > 0).then_some(start..start + len)
        })
        .collect();

    // Nested markers ("Authorization: Bearer " vs "Bearer ") yield spans that
    // end at the same byte.
    spans.sort_by_key(|span| span.start);
    spans.dedup_by(|later, earlier| later.start < earlier.end);
    spans
}

/// Replace every credential value with `[REDACTED]`. Borrows when nothing
/// needed redacting.
pub fn scrub_secret_patterns(input: &str) -> Cow<'_, str> {
    let spans = secret_spans(input);
    if spans.is_empty() {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len());
    let mut cursor = 0;
    for span in spans {
        out.push_str(&input[cursor..span.start]);
        out.push_str(REDACTED);
        cursor = span.end;
    }
    out.push_str(&input[cursor..]);
    Cow::Owned(out)
}

/// Scrub and cap a free-text error for use as problem `detail`.
pub fn sanitize_detail(input: &str) -> String {
    let scrubbed = scrub_secret_patterns(input);
    match scrubbed.char_indices().nth(MAX_DETAIL_CHARS) {
        Some((cut, _)) => format!("{}...", &scrubbed[..cut]),
        None => scrubbed.into_owned(),
    }
}

/// [`sanitize_detail`] for a raw response body that may not be UTF-8.
pub fn sanitize_body(body: &[u8]) -> String {
    sanitize_detail(String::from_utf8_lossy(body).trim())
}
