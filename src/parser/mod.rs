use crate::error::{EtlError, Result};
use crate::types::RawTable;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Which structure in the document is "the table".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableSelector {
    /// First `<table>` carrying this class.
    Class(String),
    /// The n-th `<tbody>` in document order, zero-based.
    NthBody(usize),
}

pub trait TableParser {
    /// Returns `Ok(None)` when the document has no matching structure.
    fn parse(&self, html: &str) -> Result<Option<RawTable>>;
}

pub struct HtmlTableParser {
    selector: TableSelector,
}

impl HtmlTableParser {
    pub fn new(selector: TableSelector) -> Self {
        Self { selector }
    }

    fn css(&self) -> Result<(Selector, usize)> {
        let (css, index) = match &self.selector {
            TableSelector::Class(class) => (format!("table.{}", class), 0),
            TableSelector::NthBody(n) => ("tbody".to_string(), *n),
        };
        let selector = Selector::parse(&css).map_err(|e| EtlError::Selector(format!("{}: {:?}", css, e)))?;
        Ok((selector, index))
    }
}

impl TableParser for HtmlTableParser {
    fn parse(&self, html: &str) -> Result<Option<RawTable>> {
        debug!("HtmlTableParser: start html_len={}", html.len());
        let (selector, index) = self.css()?;
        let document = Html::parse_document(html);

        let Some(table) = document.select(&selector).nth(index) else {
            warn!("No table matched {:?}; the page structure may have changed", self.selector);
            return Ok(None);
        };

        let raw = table_rows(table);
        info!("HtmlTableParser: captured {} rows", raw.num_rows());
        Ok(Some(raw))
    }
}

fn table_rows(table: ElementRef<'_>) -> RawTable {
    // Selector literals are valid CSS
    let row_selector = Selector::parse("tr").unwrap();

    let rows = table
        .select(&row_selector)
        .map(|tr| {
            tr.children()
                .filter_map(ElementRef::wrap)
                .filter(|cell| cell.value().name() == "td")
                .map(|cell| cell.text().collect::<String>().trim().to_string())
                .collect()
        })
        .collect();

    RawTable::new(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <table class="infobox"><tr><td>ignored</td></tr></table>
          <table class="wikitable sortable">
            <tr><th>Rank</th><th>Bank name</th><th>Market cap</th></tr>
            <tr><td>1</td><td><a href="/jpm">JPMorgan Chase</a> </td><td>432.92
            </td></tr>
            <tr><td>2</td><td>Bank of America</td><td>231.52</td></tr>
          </table>
        </body></html>
    "#;

    #[test]
    fn test_class_selector_finds_marked_table() {
        let parser = HtmlTableParser::new(TableSelector::Class("wikitable".into()));
        let raw = parser.parse(PAGE).unwrap().unwrap();

        assert_eq!(raw.num_rows(), 3);
        assert!(raw.rows()[0].is_empty());
        assert_eq!(raw.rows()[1], vec!["1", "JPMorgan Chase", "432.92"]);
    }

    #[test]
    fn test_nth_body_counts_from_zero() {
        let parser = HtmlTableParser::new(TableSelector::NthBody(1));
        let raw = parser.parse(PAGE).unwrap().unwrap();
        assert_eq!(raw.rows()[2], vec!["2", "Bank of America", "231.52"]);

        let first = HtmlTableParser::new(TableSelector::NthBody(0)).parse(PAGE).unwrap().unwrap();
        assert_eq!(first.rows(), &[vec!["ignored".to_string()]]);
    }

    #[test]
    fn test_missing_structure_is_none_not_error() {
        let by_class = HtmlTableParser::new(TableSelector::Class("nothere".into()));
        assert!(by_class.parse(PAGE).unwrap().is_none());

        let by_index = HtmlTableParser::new(TableSelector::NthBody(9));
        assert!(by_index.parse("<p>no tables</p>").unwrap().is_none());
    }

    #[test]
    fn test_bad_class_is_selector_error() {
        let parser = HtmlTableParser::new(TableSelector::Class("a b[".into()));
        assert!(matches!(parser.parse(PAGE), Err(EtlError::Selector(_))));
    }
}
