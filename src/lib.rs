//! doc2xlsx - Document to Markdown to Excel converter
//!
//! This crate converts a document (PDF, DOCX, HTML, spreadsheets, plain text) into
//! Markdown, detects pipe tables in that Markdown, and writes them into an XLSX
//! workbook: one sheet per table plus a sheet holding the full text.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use doc2xlsx::PipelineBuilder;
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Writes output.md and output.xlsx
//!     let pipeline = PipelineBuilder::new().build()?;
//!     let report = pipeline.run(Path::new("report.docx"))?;
//!
//!     println!("{} tables -> {}", report.table_count, report.workbook_path.display());
//!     Ok(())
//! }
//! ```
//!
//! # Custom Converter
//!
//! Any `DocumentConverter` (including a closure) can replace the built-in converter:
//!
//! ```rust,no_run
//! use doc2xlsx::{Doc2XlsxError, Document, PipelineBuilder};
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pipeline = PipelineBuilder::new()
//!         .with_markdown_path("tables.md")
//!         .with_workbook_path("tables.xlsx")
//!         .with_converter(|path: &Path| -> Result<Document, Doc2XlsxError> {
//!             let text = std::fs::read_to_string(path)?;
//!             Ok(Document::from_markdown(text))
//!         })
//!         .build()?;
//!
//!     pipeline.run(Path::new("notes.txt"))?;
//!     Ok(())
//! }
//! ```
//!
//! # Tables Only
//!
//! ```rust
//! use doc2xlsx::find_tables;
//!
//! let tables = find_tables("| A | B |\n|---|---|\n| 1 | 2 |\n| 3 |\n");
//! assert_eq!(tables[0].headers(), ["A", "B"]);
//! assert_eq!(tables[0].rows()[1], ["3", ""]);
//! ```

mod api;
mod builder;
mod error;
mod extractor;
mod output;
mod security;
mod table;
mod types;

// 公開API
pub use api::InputFormat;
pub use builder::{Pipeline, PipelineBuilder, DEFAULT_MARKDOWN_PATH};
pub use error::Doc2XlsxError;
pub use extractor::{Block, Document, DocumentConverter, Extraction, Extractor, NativeConverter};
pub use output::{
    default_workbook_path, markdown_to_workbook, normalize_workbook_path, read_markdown,
    table_sheet_name, write_markdown, write_workbook, WorkbookWriter, FULL_TEXT_SHEET, INFO_SHEET,
    WORKBOOK_EXTENSION,
};
pub use security::SecurityConfig;
pub use table::{find_tables, scan_blocks, RawBlock};
pub use types::{PipelineState, RunReport, TableBlock, WorkbookReport};
