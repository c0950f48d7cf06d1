// HTML table extraction: first <table> in a page -> Table of text cells.

use scraper::{ElementRef, Html};

use crate::engine::types::{unique_columns, Row, Table};

/// Every `<table>` in `body`, in document order.
pub fn extract_tables(body: &str) -> Vec<Table> {
    let document = Html::parse_document(body);
    elements(document.root_element(), "table").map(parse_table).collect()
}

/// The first `<table>` in `body`, if any.
pub fn first_table(body: &str) -> Option<Table> {
    let document = Html::parse_document(body);
    let table = elements(document.root_element(), "table").next()?;
    Some(parse_table(table))
}

pub(crate) fn elements<'a>(root: ElementRef<'a>, name: &'static str) -> impl Iterator<Item = ElementRef<'a>> {
    root.descendants()
        .filter_map(ElementRef::wrap)
        .filter(move |el| el.value().name() == name)
}

pub(crate) fn text_of(el: ElementRef<'_>) -> String {
    el.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" ")
}

fn cells(tr: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    tr.children()
        .filter_map(ElementRef::wrap)
        .filter(|c| matches!(c.value().name(), "td" | "th"))
        .collect()
}

fn parse_table(table: ElementRef<'_>) -> Table {
    let trs: Vec<_> = elements(table, "tr").map(cells).filter(|c| !c.is_empty()).collect();

    // header = first row made only of <th>
    let header_at = trs
        .iter()
        .position(|row| row.iter().all(|c| c.value().name() == "th"));
    let mut columns: Vec<String> = header_at
        .map(|i| trs[i].iter().map(|c| text_of(*c)).collect())
        .unwrap_or_default();

    let width = trs.iter().map(Vec::len).max().unwrap_or(0);
    while columns.len() < width {
        columns.push(columns.len().to_string());
    }
    let columns = unique_columns(columns);

    let mut out = Table::with_columns(columns.iter().cloned());
    for (i, row) in trs.iter().enumerate() {
        if Some(i) == header_at {
            continue;
        }
        let values: Vec<String> = row.iter().map(|c| text_of(*c)).collect();
        out.push(Row::from_pairs(columns.iter().enumerate().map(|(j, column)| {
            (column.clone(), values.get(j).cloned().unwrap_or_default())
        })));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
        <form><select id="Code"><option>ALK</option></select></form>
        <table id="resultsTable">
          <thead><tr><th>Date</th><th>Last trade price</th><th>Volume</th></tr></thead>
          <tbody>
            <tr><td>3/7/2023</td><td>23,500.00</td><td>1,234</td></tr>
            <tr><td>3/6/2023</td><td>
                23,450.00 </td></tr>
          </tbody>
        </table>
        <table><tr><td>other</td></tr></table>
        </body></html>"#;

    #[test]
    fn test_first_table_with_header() {
        let table = first_table(PAGE).unwrap();
        assert_eq!(table.columns(), &["Date", "Last trade price", "Volume"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0].get("Last trade price"), Some("23,500.00"));
        assert_eq!(table.rows()[1].get("Last trade price"), Some("23,450.00"));
        assert_eq!(table.rows()[1].get("Volume"), Some(""));
    }

    #[test]
    fn test_all_tables_in_order() {
        let tables = extract_tables(PAGE);
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[1].columns(), &["0"]);
        assert_eq!(tables[1].rows()[0].get("0"), Some("other"));
    }

    #[test]
    fn test_repeated_header_names_get_suffix() {
        let table = first_table(
            "<table><tr><th>Date</th><th>Price</th><th>Price</th></tr>\
             <tr><td>d</td><td>10</td><td>20</td></tr></table>",
        )
        .unwrap();
        assert_eq!(table.columns(), &["Date", "Price", "Price.1"]);
        assert_eq!(table.rows()[0].get("Price"), Some("10"));
        assert_eq!(table.rows()[0].get("Price.1"), Some("20"));
        assert_eq!(table.rows()[0].len(), 3);
    }

    #[test]
    fn test_no_table() {
        assert!(first_table("<html><body><p>No data</p></body></html>").is_none());
        assert!(extract_tables("").is_empty());
    }

    #[test]
    fn test_header_only_table_has_no_rows() {
        let table = first_table("<table><tr><th>Date</th></tr></table>").unwrap();
        assert!(table.is_empty());
        assert_eq!(table.columns(), &["Date"]);
    }
}
