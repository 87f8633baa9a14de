//! Property Tests
//!
//! テーブル検出の性質をproptestで検証します。
//! 検出結果は参照用の正規表現（regexクレート）と一致しなければなりません。

use doc2xlsx::{find_tables, scan_blocks, Block, Document};
use proptest::prelude::*;
use regex::Regex;

const TABLE_PATTERN: &str = r"(?:\|[^\n]+\|\n\|[-:| ]+\|\n)(?:\|[^\n]+\|\n)+";

/// テーブルらしい行とそうでない行を混ぜた行
fn line() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("| a | b |".to_string()),
        Just("|---|---|".to_string()),
        Just("| :-: | --- |".to_string()),
        Just("|-|".to_string()),
        Just("| x |".to_string()),
        Just("|".to_string()),
        Just("||".to_string()),
        Just("|||".to_string()),
        Just("text | a | b |".to_string()),
        Just("| open".to_string()),
        Just("| crlf |\r".to_string()),
        Just(String::new()),
        "[|a :\\-]{0,8}",
    ]
}

fn document() -> impl Strategy<Value = String> {
    (prop::collection::vec(line(), 0..24), any::<bool>()).prop_map(|(lines, trailing)| {
        let mut text = lines.join("\n");
        if trailing {
            text.push('\n');
        }
        text
    })
}

fn cell() -> impl Strategy<Value = String> {
    "[a-z0-9]{1,6}"
}

fn rows() -> impl Strategy<Value = Vec<Vec<String>>> {
    prop::collection::vec(prop::collection::vec(cell(), 1..5), 2..7)
}

proptest! {
    #[test]
    fn scanner_matches_reference_regex(text in document()) {
        let re = Regex::new(TABLE_PATTERN).unwrap();
        let expected: Vec<(usize, usize)> = re
            .find_iter(&text)
            .map(|m| (m.start(), m.end()))
            .collect();
        let actual: Vec<(usize, usize)> = scan_blocks(&text)
            .iter()
            .map(|block| (block.start, block.end))
            .collect();
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn find_tables_is_idempotent(text in document()) {
        prop_assert_eq!(find_tables(&text), find_tables(&text));
    }

    #[test]
    fn rows_match_header_width(text in document()) {
        for table in find_tables(&text) {
            for row in table.rows() {
                prop_assert_eq!(row.len(), table.headers().len());
            }
        }
    }

    #[test]
    fn rendered_tables_parse_back(rows in rows()) {
        let markdown = Document::new(vec![Block::Table(rows.clone())]).render_markdown();
        let tables = find_tables(&markdown);
        prop_assert_eq!(tables.len(), 1);

        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        let padded: Vec<Vec<String>> = rows
            .iter()
            .map(|row| {
                let mut row = row.clone();
                row.resize(width, String::new());
                row
            })
            .collect();
        prop_assert_eq!(tables[0].headers(), padded[0].as_slice());
        prop_assert_eq!(tables[0].rows(), &padded[1..]);
    }
}
