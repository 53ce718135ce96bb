use crate::models::NewItem;

/// Column order for bulk-entry files. Kept in the operators' working
/// language to match the sheets they already maintain.
pub const TEMPLATE_HEADERS: [&str; 6] =
    ["제품명", "카테고리", "창고", "랙위치", "총수량", "팔레트수"];

/// Sample row shipped with the template so the column meanings are
/// obvious without documentation.
pub const TEMPLATE_EXAMPLE_ROW: [&str; 6] =
    ["예시품목", "예시카테고리", "A창고", "A-01", "100", "10"];

/// Renders the bulk-entry template: header row plus one example row.
pub fn render_template(delimiter: char) -> String {
    let mut out = String::new();
    out.push_str(&join_row(&TEMPLATE_HEADERS, delimiter));
    out.push('\n');
    out.push_str(&join_row(&TEMPLATE_EXAMPLE_ROW, delimiter));
    out.push('\n');
    out
}

fn join_row(cells: &[&str], delimiter: char) -> String {
    cells
        .iter()
        .map(|cell| escape_field(cell, delimiter))
        .collect::<Vec<_>>()
        .join(&delimiter.to_string())
}

/// Quotes a field when it would otherwise break the row structure.
/// Embedded quotes are doubled.
pub fn escape_field(value: &str, delimiter: char) -> String {
    if value.contains(delimiter) || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Parses bulk-entry file content into draft items.
///
/// The first row is assumed to be the header and skipped. Columns are
/// positional per [`TEMPLATE_HEADERS`]; missing trailing cells read as
/// empty. Rows that are entirely blank, or whose name cell is empty, are
/// dropped. Numeric cells that fail to parse fall back to their defaults
/// (quantity 0, pallet count 1), decimals are rounded, and out-of-range
/// values are clamped rather than rejected.
pub fn parse_rows(content: &str, delimiter: char) -> Vec<NewItem> {
    read_delimited(content, delimiter)
        .into_iter()
        .skip(1)
        .filter_map(row_to_item)
        .collect()
}

fn row_to_item(row: Vec<String>) -> Option<NewItem> {
    if row.iter().all(|cell| cell.trim().is_empty()) {
        return None;
    }
    let cell = |index: usize| row.get(index).map(String::as_str).unwrap_or("");
    let name = cell(0);
    if name.is_empty() {
        return None;
    }
    Some(NewItem {
        name: name.to_string(),
        category: cell(1).to_string(),
        warehouse: cell(2).to_string(),
        rack_location: cell(3).to_string(),
        quantity: parse_quantity(cell(4)),
        pallet_count: parse_pallet_count(cell(5)),
    })
}

fn parse_quantity(raw: &str) -> u32 {
    match raw.trim().parse::<f64>() {
        Ok(value) if value > 0.0 => value.round() as u32,
        _ => 0,
    }
}

fn parse_pallet_count(raw: &str) -> u32 {
    match raw.trim().parse::<f64>() {
        Ok(value) if value >= 1.0 => value.round() as u32,
        _ => 1,
    }
}

/// Splits delimited text into rows of cells. Fields may be quoted with
/// `"`; inside quotes the delimiter and newlines are literal and a
/// doubled quote is an escaped quote. Handles `\r\n` and bare `\n` line
/// ends.
pub fn read_delimited(content: &str, delimiter: char) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            if ch == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(ch);
            }
            continue;
        }
        match ch {
            '"' if field.is_empty() => in_quotes = true,
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                row.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut row));
            }
            '\n' => {
                row.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut row));
            }
            ch if ch == delimiter => row.push(std::mem::take(&mut field)),
            ch => field.push(ch),
        }
    }

    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_carries_headers_and_example_row() {
        let template = render_template(',');
        let mut lines = template.lines();

        assert_eq!(lines.next(), Some("제품명,카테고리,창고,랙위치,총수량,팔레트수"));
        assert_eq!(lines.next(), Some("예시품목,예시카테고리,A창고,A-01,100,10"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn template_round_trips_through_parse() {
        let items = parse_rows(&render_template(','), ',');

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "예시품목");
        assert_eq!(items[0].category, "예시카테고리");
        assert_eq!(items[0].warehouse, "A창고");
        assert_eq!(items[0].rack_location, "A-01");
        assert_eq!(items[0].quantity, 100);
        assert_eq!(items[0].pallet_count, 10);
    }

    #[test]
    fn row_maps_positionally() {
        let content = "name,cat,wh,rack,qty,pallets\nWidget,Tools,W1,A-01,50,5\n";
        let items = parse_rows(content, ',');

        assert_eq!(items.len(), 1);
        let item = &items[0];
        assert_eq!(item.name, "Widget");
        assert_eq!(item.category, "Tools");
        assert_eq!(item.warehouse, "W1");
        assert_eq!(item.rack_location, "A-01");
        assert_eq!(item.quantity, 50);
        assert_eq!(item.pallet_count, 5);
    }

    #[test]
    fn header_row_is_skipped_even_when_it_looks_like_data() {
        let content = "Widget,Tools,W1,A-01,50,5\nBolt,Fasteners,W2,B-01,10,1\n";
        let items = parse_rows(content, ',');

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Bolt");
    }

    #[test]
    fn rows_without_a_name_are_dropped() {
        let content = "h1,h2,h3,h4,h5,h6\n,Tools,W1,A-01,50,5\nBolt,F,W2,B-01,1,1\n";
        let items = parse_rows(content, ',');

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Bolt");
    }

    #[test]
    fn blank_rows_are_dropped() {
        let content = "h1,h2\n,,\n\nBolt,F,W2,B-01,1,1\n";
        let items = parse_rows(content, ',');

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Bolt");
    }

    #[test]
    fn missing_trailing_cells_read_as_defaults() {
        let content = "header\nWidget\n";
        let items = parse_rows(content, ',');

        assert_eq!(items.len(), 1);
        let item = &items[0];
        assert_eq!(item.category, "");
        assert_eq!(item.quantity, 0);
        assert_eq!(item.pallet_count, 1);
    }

    #[test]
    fn unparsable_numbers_fall_back_to_defaults() {
        let content = "header\nWidget,Tools,W1,A-01,many,few\n";
        let item = &parse_rows(content, ',')[0];

        assert_eq!(item.quantity, 0);
        assert_eq!(item.pallet_count, 1);
    }

    #[test]
    fn decimal_counts_are_rounded() {
        let content = "header\nWidget,Tools,W1,A-01,3.6,2.4\n";
        let item = &parse_rows(content, ',')[0];

        assert_eq!(item.quantity, 4);
        assert_eq!(item.pallet_count, 2);
    }

    #[test]
    fn out_of_range_counts_are_clamped() {
        let content = "header\nWidget,Tools,W1,A-01,-5,0\n";
        let item = &parse_rows(content, ',')[0];

        assert_eq!(item.quantity, 0);
        assert_eq!(item.pallet_count, 1);
    }

    #[test]
    fn quoted_fields_keep_delimiters_and_quotes() {
        let content = "header\n\"Widget, large\",\"say \"\"hi\"\"\",W1,A-01,1,1\n";
        let item = &parse_rows(content, ',')[0];

        assert_eq!(item.name, "Widget, large");
        assert_eq!(item.category, "say \"hi\"");
    }

    #[test]
    fn quoted_fields_may_span_lines() {
        let rows = read_delimited("\"a\nb\",c\n", ',');

        assert_eq!(rows, vec![vec!["a\nb".to_string(), "c".to_string()]]);
    }

    #[test]
    fn crlf_line_ends_are_accepted() {
        let rows = read_delimited("a,b\r\nc,d\r\n", ',');

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], vec!["c", "d"]);
    }

    #[test]
    fn escape_field_round_trips_awkward_values() {
        for value in ["plain", "a,b", "he said \"no\"", "two\nlines"] {
            let escaped = escape_field(value, ',');
            let rows = read_delimited(&format!("{}\n", escaped), ',');
            assert_eq!(rows[0][0], value);
        }
    }
}
