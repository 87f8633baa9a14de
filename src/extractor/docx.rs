//! DOCX Reader Module
//!
//! Word文書（ZIPアーカイブ内の`word/document.xml`）をストリーミング解析し、
//! 見出し・段落・テーブルのブロック列に変換するモジュール。

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::ZipArchive;

use crate::error::Doc2XlsxError;
use crate::extractor::document::{Block, Document};
use crate::security::SecurityConfig;

/// 本文XMLのエントリ名
const DOCUMENT_XML: &str = "word/document.xml";

/// DOCXファイルを読み込み、ドキュメントに変換する
pub(crate) fn convert_docx(path: &Path, security: &SecurityConfig) -> Result<Document, Doc2XlsxError> {
    let file = BufReader::new(File::open(path)?);
    let mut archive = ZipArchive::new(file).map_err(|e| Doc2XlsxError::Zip(e.to_string()))?;

    // 展開前にアーカイブ全体を検証
    security.check_zip_archive(&mut archive)?;

    let mut entry = archive
        .by_name(DOCUMENT_XML)
        .map_err(|e| Doc2XlsxError::Zip(format!("{}: {}", DOCUMENT_XML, e)))?;
    let mut xml = String::new();
    entry.read_to_string(&mut xml)?;

    Ok(Document::new(parse_document_xml(&xml)?))
}

/// 解析中の状態
#[derive(Debug, Default)]
struct DocxState {
    blocks: Vec<Block>,
    /// `w:t`要素の内側かどうか
    in_text: bool,
    /// `w:tbl`のネスト深さ
    table_depth: usize,
    /// `w:pPr`のネスト深さ（タブ位置の定義を本文のタブと区別する）
    paragraph_props: usize,
    paragraph: String,
    paragraph_style: Option<String>,
    cell: Option<String>,
    row: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl DocxState {
    fn push_text(&mut self, text: &str) {
        match self.cell.as_mut() {
            Some(cell) => cell.push_str(text),
            None => self.paragraph.push_str(text),
        }
    }

    fn start_element(&mut self, e: &BytesStart) {
        match e.local_name().as_ref() {
            b"p" if self.cell.is_none() => {
                self.paragraph.clear();
                self.paragraph_style = None;
            }
            b"tbl" => {
                self.table_depth += 1;
                if self.table_depth == 1 {
                    self.rows.clear();
                }
            }
            b"tr" if self.table_depth == 1 => self.row.clear(),
            b"tc" if self.table_depth == 1 => self.cell = Some(String::new()),
            b"t" => self.in_text = true,
            b"pPr" => self.paragraph_props += 1,
            _ => self.empty_element(e),
        }
    }

    /// 内容を持たない要素（`<w:tab/>`など）と、開始タグ側の共通処理
    fn empty_element(&mut self, e: &BytesStart) {
        match e.local_name().as_ref() {
            b"pStyle" if self.cell.is_none() => {
                self.paragraph_style = attribute(e, b"val");
            }
            b"tab" if self.paragraph_props == 0 => self.push_text("\t"),
            b"br" | b"cr" => self.push_text("\n"),
            _ => {}
        }
    }

    fn end_element(&mut self, local: &[u8]) {
        match local {
            b"t" => self.in_text = false,
            b"pPr" => self.paragraph_props = self.paragraph_props.saturating_sub(1),
            b"p" => {
                if let Some(cell) = self.cell.as_mut() {
                    // セル内の段落は空白で連結
                    if !cell.is_empty() && !cell.ends_with(' ') {
                        cell.push(' ');
                    }
                } else {
                    self.finish_paragraph();
                }
            }
            b"tc" if self.table_depth == 1 => {
                if let Some(cell) = self.cell.take() {
                    self.row.push(collapse_whitespace(&cell));
                }
            }
            b"tr" if self.table_depth == 1 => {
                if !self.row.is_empty() {
                    self.rows.push(std::mem::take(&mut self.row));
                }
            }
            b"tbl" => {
                if self.table_depth == 1 && !self.rows.is_empty() {
                    self.blocks.push(Block::Table(std::mem::take(&mut self.rows)));
                }
                self.table_depth = self.table_depth.saturating_sub(1);
            }
            _ => {}
        }
    }

    fn finish_paragraph(&mut self) {
        let text = collapse_whitespace(&self.paragraph);
        if !text.is_empty() {
            let block = match heading_level(self.paragraph_style.as_deref()) {
                Some(level) => Block::Heading { level, text },
                None => Block::Paragraph(text),
            };
            self.blocks.push(block);
        }
        self.paragraph.clear();
        self.paragraph_style = None;
    }
}

/// `word/document.xml`の内容をブロック列に変換する
pub(crate) fn parse_document_xml(xml: &str) -> Result<Vec<Block>, Doc2XlsxError> {
    let mut reader = Reader::from_str(xml);
    let mut state = DocxState::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => state.start_element(&e),
            Ok(Event::Empty(e)) => state.empty_element(&e),
            Ok(Event::Text(e)) if state.in_text => {
                let text = e
                    .unescape()
                    .map_err(|err| Doc2XlsxError::Xml(err.to_string()))?;
                state.push_text(&text);
            }
            Ok(Event::End(e)) => state.end_element(e.local_name().as_ref()),
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Doc2XlsxError::Xml(format!(
                    "{} at position {}: {}",
                    DOCUMENT_XML,
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
    }

    Ok(state.blocks)
}

/// 要素の属性値をローカル名で取得する
fn attribute(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .with_checks(false)
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == key)
        .and_then(|attr| {
            let raw = std::str::from_utf8(&attr.value).ok()?;
            quick_xml::escape::unescape(raw)
                .ok()
                .map(|value| value.into_owned())
        })
}

/// 段落スタイル名から見出しレベルを判定する
///
/// `Heading1`〜`Heading6`はそのレベル、`Title`と番号のない`Heading`はレベル1。
fn heading_level(style: Option<&str>) -> Option<usize> {
    let style = style?.trim().to_ascii_lowercase();
    if style == "title" {
        return Some(1);
    }
    let rest = style.strip_prefix("heading")?;
    let digits: String = rest.chars().filter(char::is_ascii_digit).collect();
    match digits.parse::<usize>() {
        Ok(level) if (1..=6).contains(&level) => Some(level),
        Ok(_) => None,
        Err(_) => Some(1),
    }
}

/// 連続する空白（改行を除く）を1つにまとめ、前後をtrimする
///
/// 改行は行単位で保持します。
fn collapse_whitespace(text: &str) -> String {
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
