// src/markup/mod.rs
use once_cell::sync::Lazy;
use regex::Regex;

/// Anything that looks like a tag: `<b>`, `</dd>`, `<br/>`, `<!-- x -->`, `<?xml ?>`.
///
/// Comments run to the first `-->` and quoted attribute values may contain `>`.
/// A tag with an unbalanced quote falls back to ending at the first `>`.
static TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?s)<!--.*?-->|<[/!?]?[A-Za-z](?:[^<>"']|"[^"]*"|'[^']*')*>|<[/!?]?[A-Za-z][^<>]*>"#,
    )
    .expect("tag regex")
});

/// A comment or tag left open at the end of the text, e.g. `A <span class="x`.
static DANGLING_TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<!--.*$|<[/!?]?[A-Za-z][^<>]*$").expect("dangling tag regex")
});

static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// Strip every tag, collapse whitespace runs to one space and trim.
///
/// Stripping is repeated until nothing tag-shaped is left, so nested
/// fragments like `<<b>i>` cannot reassemble into a new tag. The result
/// never matches [`contains_markup`], and `clean_markup(clean_markup(x)) ==
/// clean_markup(x)` holds for every input.
pub fn clean_markup(raw: &str) -> String {
    let mut text = raw.to_string();
    loop {
        let stripped = TAG_RE.replace_all(&text, "").into_owned();
        let stripped = DANGLING_TAG_RE.replace(&stripped, "").into_owned();
        if stripped == text {
            break;
        }
        text = stripped;
    }
    WS_RE.replace_all(text.trim(), " ").into_owned()
}

/// True if `text` still carries something tag-shaped.
pub fn contains_markup(text: &str) -> bool {
    TAG_RE.is_match(text) || DANGLING_TAG_RE.is_match(text)
}
