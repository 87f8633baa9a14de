//! Table Parser Module
//!
//! Markdownテキストからパイプ区切りのテーブルを検出し、`TableBlock`に変換するモジュール。
//!
//! 検出する文法は次の正規表現と完全に等価です（最左優先・貪欲・重複なし）。
//!
//! ```text
//! (?:\|[^\n]+\|\n\|[-:| ]+\|\n)(?:\|[^\n]+\|\n)+
//! ```
//!
//! バックトラッキングに頼らず、行単位の状態機械（ヘッダー探索 → 区切り行 → データ行の蓄積）
//! として実装しています。

use tracing::{debug, info, warn};

use crate::error::Doc2XlsxError;
use crate::types::TableBlock;

/// スキャナーが検出した生のテーブルブロック
///
/// `text`は元のMarkdown内の該当範囲（末尾の改行を含む）を指します。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawBlock<'a> {
    /// ブロック先頭のバイト位置
    pub start: usize,
    /// ブロック末尾のバイト位置（排他的）
    pub end: usize,
    /// ブロックのテキスト
    pub text: &'a str,
}

/// 改行で終わる1行の範囲（改行文字は含まない）
#[derive(Debug, Clone, Copy)]
struct LineSpan {
    start: usize,
    end: usize,
}

/// スキャナーの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    /// ヘッダー行を探索中
    SeekHeader,
    /// ヘッダー行を検出済み、区切り行を期待
    ExpectSeparator { header: usize, offset: usize },
    /// 区切り行を検出済み、最初のデータ行を期待
    ExpectFirstRow { header: usize, offset: usize },
    /// データ行を蓄積中
    Rows { header: usize, offset: usize },
}

/// Markdownテキストからテーブルを検出して構築する
///
/// 構築に失敗したブロックは警告ログを出力してスキップします。
/// 1つのブロックの失敗が残りのブロックの処理を妨げることはありません。
///
/// # 使用例
///
/// ```rust
/// use doc2xlsx::find_tables;
///
/// let tables = find_tables("| A | B |\n|---|---|\n| 1 | 2 |\n| 3 |\n");
/// assert_eq!(tables.len(), 1);
/// assert_eq!(tables[0].headers(), ["A", "B"]);
/// assert_eq!(tables[0].rows()[1], vec!["3", ""]);
/// ```
pub fn find_tables(text: &str) -> Vec<TableBlock> {
    let blocks = scan_blocks(text);
    info!("Found {} tables in markdown", blocks.len());

    let mut tables = Vec::with_capacity(blocks.len());
    for (i, block) in blocks.iter().enumerate() {
        match build_table(i + 1, block.text) {
            Ok(table) => tables.push(table),
            Err(e) => warn!("{}", e),
        }
    }
    tables
}

/// テーブル文法に一致するブロックを出現順に列挙する
///
/// 改行で終わらない最終行は、どの行の役割にも一致しません。
pub fn scan_blocks(text: &str) -> Vec<RawBlock<'_>> {
    let lines = terminated_lines(text);
    let line = |idx: usize| &text[lines[idx].start..lines[idx].end];

    let mut blocks = Vec::new();
    let mut state = ScanState::SeekHeader;
    let mut idx = 0;

    while idx < lines.len() {
        state = match state {
            ScanState::SeekHeader => {
                let next = match header_offset(line(idx)) {
                    Some(offset) => ScanState::ExpectSeparator {
                        header: idx,
                        offset,
                    },
                    None => ScanState::SeekHeader,
                };
                idx += 1;
                next
            }
            ScanState::ExpectSeparator { header, offset } => {
                if is_separator_line(line(idx)) {
                    idx += 1;
                    ScanState::ExpectFirstRow { header, offset }
                } else {
                    // ヘッダー候補の次の行から探索をやり直す
                    idx = header + 1;
                    ScanState::SeekHeader
                }
            }
            ScanState::ExpectFirstRow { header, offset } => {
                if is_row_line(line(idx)) {
                    idx += 1;
                    ScanState::Rows { header, offset }
                } else {
                    idx = header + 1;
                    ScanState::SeekHeader
                }
            }
            ScanState::Rows { header, offset } => {
                if is_row_line(line(idx)) {
                    idx += 1;
                    ScanState::Rows { header, offset }
                } else {
                    blocks.push(make_block(text, &lines, header, offset, idx - 1));
                    // 一致しなかった行は次のヘッダー候補として再評価する
                    ScanState::SeekHeader
                }
            }
        };
    }

    // 入力終端での状態の後始末
    match state {
        ScanState::Rows { header, offset } => {
            blocks.push(make_block(text, &lines, header, offset, lines.len() - 1));
        }
        ScanState::ExpectSeparator { .. } | ScanState::ExpectFirstRow { .. } => {
            // 終端で中断された候補。以降の行にもヘッダー・区切り・データの3行は揃わない
        }
        ScanState::SeekHeader => {}
    }

    debug!("Scanned {} lines, {} table blocks", lines.len(), blocks.len());
    blocks
}

/// 生のブロックテキストから`TableBlock`を構築する
///
/// # 引数
///
/// * `index` - ブロック番号（1始まり、ログ・エラー用）
/// * `block` - ブロックのテキスト
///
/// # 戻り値
///
/// * `Ok(TableBlock)` - 構築に成功した場合
/// * `Err(Doc2XlsxError::Table)` - 空でない行が2行未満、またはヘッダーにセルがない場合
pub(crate) fn build_table(index: usize, block: &str) -> Result<TableBlock, Doc2XlsxError> {
    let rows: Vec<&str> = block
        .trim()
        .split('\n')
        .filter(|row| !row.is_empty())
        .collect();

    if rows.len() < 2 {
        return Err(Doc2XlsxError::Table {
            index,
            message: format!("block has {} non-empty rows (need at least 2)", rows.len()),
        });
    }

    let headers = split_cells(rows[0]);
    if headers.is_empty() {
        return Err(Doc2XlsxError::Table {
            index,
            message: "header row has no cells".to_string(),
        });
    }

    // 2行目（区切り行）は捨てる
    let data = rows[2..].iter().map(|row| split_cells(row)).collect();

    Ok(TableBlock::new(headers, data))
}

/// 行を`|`で分割し、最初と最後の区間を除いて各セルをtrimする
fn split_cells(row: &str) -> Vec<String> {
    let parts: Vec<&str> = row.split('|').collect();
    if parts.len() <= 2 {
        return Vec::new();
    }
    parts[1..parts.len() - 1]
        .iter()
        .map(|cell| cell.trim().to_string())
        .collect()
}

/// 改行で終わる行の範囲を列挙する
fn terminated_lines(text: &str) -> Vec<LineSpan> {
    let mut lines = Vec::new();
    let mut start = 0;
    for (pos, _) in text.match_indices('\n') {
        lines.push(LineSpan { start, end: pos });
        start = pos + 1;
    }
    lines
}

/// ヘッダー行として一致する場合、その開始位置（行内オフセット）を返す
///
/// ヘッダーは行内の最初の`|`から始まり、行末の`|`で終わる必要があります。
fn header_offset(line: &str) -> Option<usize> {
    let offset = line.find('|')?;
    is_row_line(&line[offset..]).then_some(offset)
}

/// `|`で始まり`|`で終わる3文字以上の行
fn is_row_line(line: &str) -> bool {
    line.len() >= 3 && line.starts_with('|') && line.ends_with('|')
}

/// `-`, `:`, `|`, 空白のみからなる行
fn is_separator_line(line: &str) -> bool {
    is_row_line(line)
        && line
            .bytes()
            .all(|b| matches!(b, b'-' | b':' | b'|' | b' '))
}

fn make_block<'a>(
    text: &'a str,
    lines: &[LineSpan],
    header: usize,
    offset: usize,
    last: usize,
) -> RawBlock<'a> {
    let start = lines[header].start + offset;
    // 最終データ行の改行まで含める
    let end = lines[last].end + 1;
    RawBlock {
        start,
        end,
        text: &text[start..end],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_basic_table_with_padding() {
        let tables = find_tables("| A | B |\n|---|---|\n| 1 | 2 |\n| 3 |\n");
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].headers(), strings(&["A", "B"]).as_slice());
        assert_eq!(
            tables[0].rows(),
            &[strings(&["1", "2"]), strings(&["3", ""])]
        );
    }

    #[test]
    fn test_extra_cells_truncated() {
        let tables = find_tables("| A |\n|---|\n| 1 | 2 | 3 |\n");
        assert_eq!(tables[0].rows(), &[strings(&["1"])]);
    }

    #[test]
    fn test_no_tables_in_plain_text() {
        assert!(find_tables("# Title\n\nJust a paragraph.\n").is_empty());
        assert!(find_tables("").is_empty());
    }

    #[test]
    fn test_header_and_separator_without_data_rows() {
        assert!(scan_blocks("| A | B |\n|---|---|\n").is_empty());
        assert!(scan_blocks("| A | B |\n|---|---|\n\n| 1 | 2 |\n").is_empty());
    }

    #[test]
    fn test_last_row_requires_trailing_newline() {
        // 改行のない最終行はデータ行にならない
        assert!(scan_blocks("| A |\n|---|\n| 1 |").is_empty());

        let blocks = scan_blocks("| A |\n|---|\n| 1 |\n| 2 |");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text, "| A |\n|---|\n| 1 |\n");
    }

    #[test]
    fn test_crlf_rows_do_not_match() {
        assert!(scan_blocks("| A |\r\n|---|\r\n| 1 |\r\n").is_empty());
    }

    #[test]
    fn test_header_may_start_mid_line() {
        let text = "Summary: | Name | Qty |\n| :--- | ---: |\n| apple | 3 |\n";
        let blocks = scan_blocks(text);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].start, "Summary: ".len());

        let tables = find_tables(text);
        assert_eq!(tables[0].headers(), strings(&["Name", "Qty"]).as_slice());
    }

    #[test]
    fn test_separator_rejects_other_characters() {
        assert!(scan_blocks("| A |\n| x |\n| 1 |\n").is_empty());
        assert!(scan_blocks("| A |\n|-\t-|\n| 1 |\n").is_empty());
        assert_eq!(scan_blocks("| A |\n|:-:|\n| 1 |\n").len(), 1);
    }

    #[test]
    fn test_data_rows_are_greedy() {
        // 隣接する2つ目のテーブルはデータ行として吸収される
        let text = "| a |\n|---|\n| 1 |\n| b |\n|---|\n| 2 |\n";
        let blocks = scan_blocks(text);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text, text);

        let tables = find_tables(text);
        assert_eq!(tables[0].rows().len(), 4);
        assert_eq!(tables[0].rows()[2], strings(&["---"]));
    }

    #[test]
    fn test_separate_tables_in_order() {
        let text = "intro\n\n| a |\n|---|\n| 1 |\n\ntext\n| b | c |\n|---|---|\n| 2 | 3 |\n";
        let tables = find_tables(text);
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].headers(), strings(&["a"]).as_slice());
        assert_eq!(tables[1].headers(), strings(&["b", "c"]).as_slice());
    }

    #[test]
    fn test_failed_candidate_rescans_following_lines() {
        // 1行目はヘッダー候補だが区切り行が続かない。2行目から正しいテーブルが始まる
        let text = "| x |\n| A |\n|---|\n| 1 |\n";
        let blocks = scan_blocks(text);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text, "| A |\n|---|\n| 1 |\n");
    }

    #[test]
    fn test_non_row_line_after_data_can_start_next_table() {
        let text = "| a |\n|---|\n| 1 |\nx | b |\n|---|\n| 2 |\n";
        let blocks = scan_blocks(text);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].text, "| b |\n|---|\n| 2 |\n");
    }

    #[test]
    fn test_minimum_row_width() {
        // "||"は3文字未満なので行にならない
        assert!(scan_blocks("||\n|-|\n| 1 |\n").is_empty());
        let tables = find_tables("|||\n|-|\n|x|\n");
        assert_eq!(tables[0].headers(), strings(&["", ""]).as_slice());
        assert_eq!(tables[0].rows(), &[strings(&["x", ""])]);
    }

    #[test]
    fn test_escaped_pipes_are_split() {
        let tables = find_tables("| a | b |\n|---|---|\n| x \\| y | z |\n");
        assert_eq!(tables[0].rows(), &[strings(&["x \\", "y"])]);
    }

    #[test]
    fn test_build_table_too_few_rows() {
        match build_table(4, "| A |\n") {
            Err(Doc2XlsxError::Table { index, .. }) => assert_eq!(index, 4),
            other => panic!("Expected Table error, got {:?}", other),
        }
    }

    #[test]
    fn test_build_table_without_header_cells() {
        assert!(matches!(
            build_table(1, "|\n|\n|\n"),
            Err(Doc2XlsxError::Table { .. })
        ));
    }

    #[test]
    fn test_unicode_cells() {
        let tables = find_tables("| 品名 | 数量 |\n|---|---|\n| りんご | ３ |\n");
        assert_eq!(tables[0].headers(), strings(&["品名", "数量"]).as_slice());
        assert_eq!(tables[0].rows(), &[strings(&["りんご", "３"])]);
    }

    #[test]
    fn test_idempotent() {
        let text = "| A | B |\n|---|---|\n| 1 |\n\n| C |\n|:-|\n| 2 | 3 |\n";
        assert_eq!(find_tables(text), find_tables(text));
    }
}
