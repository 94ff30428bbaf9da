//! Attribute layout preservation.
//!
//! While a start tag is parsed, the exact text around its attributes is
//! recorded in an [`AttributeLayout`]: every attribute token as written, and
//! the gaps between them. The writer replays a layout to reproduce the
//! original bytes, and consults it to lay out attributes a transform added.

use crate::document::NodeId;
use std::collections::HashMap;

/// One attribute exactly as it was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeToken {
    /// Qualified attribute name.
    pub name: String,
    /// The whole token: name, `=`, any surrounding whitespace, quotes and raw value.
    pub raw: String,
    /// Byte index in `raw` where the value text starts, just after the opening quote.
    pub value_start: usize,
    /// The quote character used.
    pub quote: char,
    /// The decoded value the token produced when parsed.
    pub value: String,
}

impl AttributeToken {
    /// Render this token with a different value, keeping the name spelling
    /// and quote character.
    pub fn with_value(&self, value: &str) -> String {
        let mut out = String::with_capacity(self.value_start + value.len() + 1);
        out.push_str(&self.raw[..self.value_start]);
        out.push_str(&quick_xml::escape::escape(value));
        out.push(self.quote);
        out
    }
}

/// The recorded layout of one start tag.
///
/// `gaps` always holds one more entry than `tokens`: `gaps[i]` is the text
/// before `tokens[i]`, and the last gap is the text between the last
/// attribute and `>` or `/>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeLayout {
    pub tokens: Vec<AttributeToken>,
    pub gaps: Vec<String>,
}

impl AttributeLayout {
    /// Attribute names in recorded order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(|t| t.name.as_str())
    }

    pub fn token(&self, name: &str) -> Option<&AttributeToken> {
        self.tokens.iter().find(|t| t.name == name)
    }

    /// Text between the element name and the first attribute.
    ///
    /// For an element recorded without attributes this is the trailing gap.
    pub fn leading_gap(&self) -> &str {
        self.gaps.first().map(String::as_str).unwrap_or("")
    }

    /// Text between the last attribute and the end of the tag.
    pub fn trailing_gap(&self) -> &str {
        self.gaps.last().map(String::as_str).unwrap_or("")
    }

    /// The separator to use for an attribute added after the recorded ones.
    ///
    /// Majority vote over the gaps between attributes, ties going to the gap
    /// seen last. Without any such gap the leading gap is used, and a single
    /// space when the element had no attributes at all.
    pub fn dominant_gap(&self) -> &str {
        let inter = self
            .gaps
            .get(1..self.tokens.len())
            .unwrap_or_default();

        let mut votes: HashMap<&str, (usize, usize)> = HashMap::new();
        for (index, gap) in inter.iter().enumerate() {
            let entry = votes.entry(gap.as_str()).or_insert((0, index));
            entry.0 += 1;
            entry.1 = index;
        }

        if let Some((gap, _)) = votes.into_iter().max_by_key(|(_, vote)| *vote) {
            return gap;
        }

        if self.tokens.is_empty() {
            " "
        } else {
            self.leading_gap()
        }
    }
}

/// Layouts of every start tag parsed into a document, keyed by the
/// element's id in that document.
#[derive(Debug, Clone, Default)]
pub struct LayoutStore {
    layouts: HashMap<NodeId, AttributeLayout>,
}

impl LayoutStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the layout of an element's start tag.
    pub fn record(&mut self, element: NodeId, layout: AttributeLayout) {
        self.layouts.insert(element, layout);
    }

    pub fn lookup(&self, element: NodeId) -> Option<&AttributeLayout> {
        self.layouts.get(&element)
    }

    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }
}
