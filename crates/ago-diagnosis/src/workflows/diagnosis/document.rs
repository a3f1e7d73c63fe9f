//! Selector queries against fetched markup.
//!
//! Parsing uses `scraper`. Query results are copied out into an owned [`ElementSet`] so
//! that no borrowed DOM state outlives the synchronous evaluation pass.

use scraper::{ElementRef, Html, Selector};

/// Read-only query surface over one parsed document.
pub trait DocumentAccessor {
    fn query(&self, selector: &str) -> Result<ElementSet, DocumentError>;
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DocumentError {
    #[error("invalid selector `{selector}`: {reason}")]
    InvalidSelector { selector: String, reason: String },
}

/// Owned snapshot of one matched element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchedElement {
    pub text: String,
    pub html: String,
    pub attributes: Vec<(String, String)>,
}

impl MatchedElement {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Elements matched by one selector, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementSet {
    elements: Vec<MatchedElement>,
}

impl ElementSet {
    pub fn new(elements: Vec<MatchedElement>) -> Self {
        Self { elements }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn elements(&self) -> &[MatchedElement] {
        &self.elements
    }

    /// Visible text of every match, one element per line.
    pub fn text(&self) -> String {
        self.elements
            .iter()
            .map(|element| element.text.as_str())
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Outer markup of every match, concatenated.
    pub fn html(&self) -> String {
        self.elements
            .iter()
            .map(|element| element.html.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Attribute of the first match.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.elements.first().and_then(|element| element.attr(name))
    }
}

/// HTML document parsed with `scraper`.
pub struct HtmlDocument {
    html: Html,
}

impl HtmlDocument {
    pub fn parse(markup: &str) -> Self {
        Self {
            html: Html::parse_document(markup),
        }
    }
}

impl DocumentAccessor for HtmlDocument {
    fn query(&self, selector: &str) -> Result<ElementSet, DocumentError> {
        let parsed = Selector::parse(selector.trim()).map_err(|err| DocumentError::InvalidSelector {
            selector: selector.to_string(),
            reason: format!("{err:?}"),
        })?;

        let elements = self.html.select(&parsed).map(snapshot).collect();
        Ok(ElementSet::new(elements))
    }
}

fn snapshot(element: ElementRef<'_>) -> MatchedElement {
    let text = element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ");

    MatchedElement {
        text,
        html: element.html(),
        attributes: element
            .value()
            .attrs()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!DOCTYPE html>
<html lang="ja">
  <head>
    <title>Sample   page</title>
    <script type="application/ld+json">{"@type": "Organization"}</script>
  </head>
  <body>
    <h1>Welcome</h1>
    <p class="lead">First <b>paragraph</b></p>
    <p>Second paragraph</p>
  </body>
</html>"#;

    #[test]
    fn counts_matching_elements() {
        let document = HtmlDocument::parse(PAGE);
        assert_eq!(document.query("p").expect("valid selector").len(), 2);
        assert_eq!(
            document
                .query(r#"script[type="application/ld+json"]"#)
                .expect("valid selector")
                .len(),
            1
        );
        assert!(document.query("article").expect("valid selector").is_empty());
    }

    #[test]
    fn exposes_text_markup_and_attributes() {
        let document = HtmlDocument::parse(PAGE);

        let html = document.query("html").expect("valid selector");
        assert_eq!(html.attr("lang"), Some("ja"));

        let title = document.query("title").expect("valid selector");
        assert_eq!(title.text(), "Sample page");

        let lead = document.query("p.lead").expect("valid selector");
        assert_eq!(lead.text(), "First paragraph");
        assert!(lead.html().contains("<b>paragraph</b>"));
    }

    #[test]
    fn malformed_selectors_are_reported() {
        let document = HtmlDocument::parse(PAGE);
        match document.query("p[") {
            Err(DocumentError::InvalidSelector { selector, .. }) => assert_eq!(selector, "p["),
            other => panic!("expected invalid selector error, got {other:?}"),
        }
    }
}
