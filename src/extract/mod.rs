// src/extract/mod.rs
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::trace;

use crate::markup::clean_markup;
use crate::table::Cell;

/// `<xml>` wrappers and `<?xml ... ?>` declarations around the fragment.
static XML_WRAPPER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</?xml>|<\?xml[^>]*\?>").expect("xml wrapper regex"));

static DT_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("dt").expect("dt selector"));

/// Question → answer pairs from one cell, in document order.
///
/// Keys are unique; inserting an existing question replaces its answer in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QaPairs {
    entries: Vec<(String, String)>,
}

impl QaPairs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the previous answer if `question` was already present.
    pub fn insert(&mut self, question: String, answer: String) -> Option<String> {
        match self.entries.iter_mut().find(|(q, _)| *q == question) {
            Some((_, slot)) => Some(std::mem::replace(slot, answer)),
            None => {
                self.entries.push((question, answer));
                None
            }
        }
    }

    pub fn get(&self, question: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(q, _)| q == question)
            .map(|(_, a)| a.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(q, a)| (q.as_str(), a.as_str()))
    }

    pub fn questions(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(q, _)| q.as_str())
    }
}

impl<Q: Into<String>, A: Into<String>> FromIterator<(Q, A)> for QaPairs {
    fn from_iter<I: IntoIterator<Item = (Q, A)>>(iter: I) -> Self {
        let mut pairs = QaPairs::new();
        for (q, a) in iter {
            pairs.insert(q.into(), a.into());
        }
        pairs
    }
}

/// Extract the definition-list pairs of a single cell.
///
/// Non-text cells and anything that yields no `dt` produce an empty mapping.
pub fn extract_cell(cell: &Cell) -> QaPairs {
    match cell.as_text() {
        Some(raw) => extract_pairs(raw),
        None => QaPairs::new(),
    }
}

/// Parse `raw` leniently and pair every `dt` with the `dd` that directly follows it.
///
/// - question and answer are the text nodes of the `dt` / `dd`, cleaned the same way
/// - blank questions are skipped
/// - a `dt` whose next sibling element is not a `dd` gets an empty answer
/// - a repeated question keeps the last answer
pub fn extract_pairs(raw: &str) -> QaPairs {
    let mut pairs = QaPairs::new();
    let body = XML_WRAPPER_RE.replace_all(raw, "");
    if body.trim().is_empty() {
        return pairs;
    }

    // html5ever never rejects input; unclosed dt/dd are closed implicitly
    let fragment = Html::parse_fragment(&body);

    for dt in fragment.select(&DT_SELECTOR) {
        let question = element_text(dt);
        if question.is_empty() {
            trace!("skipping dt with blank question");
            continue;
        }

        let answer = dt
            .next_siblings()
            .find_map(ElementRef::wrap)
            .filter(|next| next.value().name() == "dd")
            .map(element_text)
            .unwrap_or_default();

        if let Some(prev) = pairs.insert(question.clone(), answer) {
            trace!(question = %question, previous = %prev, "duplicate question, keeping last");
        }
    }

    pairs
}

/// Text content of `el` with nested formatting flattened.
///
/// Entities are already decoded by the parser and comments are not text
/// nodes; escaped markup such as `&lt;b&gt;` decodes to a tag and is stripped.
fn element_text(el: ElementRef<'_>) -> String {
    clean_markup(&el.text().collect::<String>())
}
