//! Parser Module
//!
//! XLSXファイルの読み込み。calamineで値を、XMLの直接解析で背景色を取得します。

mod metadata;
mod workbook;

pub(crate) use metadata::XlsxStyleParser;
pub(crate) use workbook::WorkbookParser;
