//! shiporder-xml - Convert shaded Excel rows into shiporder XML documents
//!
//! This crate reads the first worksheet of an uploaded XLSX workbook, selects the data rows
//! whose gate cell (column C) carries a background fill, and turns each of them into a
//! standalone `shiporder` XML document named `record_<n>.xml`.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::fs::File;
//! use shiporder_xml::ConverterBuilder;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Documents are written to wwwroot/xml_output by default
//!     let converter = ConverterBuilder::new().build()?;
//!
//!     let run = converter.convert(File::open("orders.xlsx")?)?;
//!
//!     println!("{}", run.status());
//!     for document in run.documents() {
//!         println!("{}", document.reference());
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # In-memory Conversion
//!
//! ```rust,no_run
//! use std::io::Cursor;
//! use shiporder_xml::{ConverterBuilder, OutputTarget};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let converter = ConverterBuilder::new()
//!     .with_output_target(OutputTarget::Memory)
//!     .build()?;
//! let excel_data: Vec<u8> = vec![]; // Your Excel file bytes
//! let run = converter.convert(Cursor::new(excel_data))?;
//!
//! for document in run.documents() {
//!     println!("{}", document.xml());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Other Table Sources
//!
//! The conversion only needs a [`TableSource`]: row count, cell text, cell fill colour.
//! [`MemoryTable`] is a ready-made implementation.
//!
//! ```rust
//! use shiporder_xml::{Cell, MemoryTable, OrderConverter};
//!
//! # fn main() -> Result<(), shiporder_xml::XlsxToXmlError> {
//! let table = MemoryTable::new()
//!     .with_row(vec![Cell::text("OrderID")])
//!     .with_row(vec![
//!         Cell::text("1001"),
//!         Cell::text("2024-03-15"),
//!         Cell::text("Springfield").with_fill("FFFF00"),
//!         Cell::text("Hardware"),
//!         Cell::text("Hammer"),
//!         Cell::number(2.0),
//!         Cell::text("123 Main St, Springfield, IL, USA"),
//!         Cell::text("12.50"),
//!     ]);
//!
//! let run = OrderConverter::default().convert_workbook(&table)?;
//! assert_eq!(run.orders()[0].region(), "IL");
//! assert_eq!(run.orders()[0].total().to_string(), "25.00");
//! # Ok(())
//! # }
//! ```

mod api;
mod builder;
mod classifier;
mod error;
mod format;
mod order;
mod output;
mod parser;
mod security;
mod source;
mod types;
mod xml;

// 公開API
pub use api::OutputTarget;
pub use builder::{Converter, ConverterBuilder};
pub use classifier::is_shaded;
pub use error::XlsxToXmlError;
pub use order::{
    extract_region, ConversionRun, OrderConverter, RunSummary, ShipOrder, GATE_COLUMN,
};
pub use output::GeneratedDocument;
pub use source::{Cell, CellValue, MemoryTable, TableRow, TableSource};
pub use xml::{read_ship_order, write_ship_order};
