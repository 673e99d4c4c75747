//! Workbook Loader Module
//!
//! calamineで最初のワークシートの値を読み込み、XMLから取得した背景色・表示形式と
//! 組み合わせて`MemoryTable`を構築します。

use std::io::{Cursor, Read};

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader, Sheets, Xlsx};
use log::debug;

use crate::error::XlsxToXmlError;
use crate::format::format_number;
use crate::parser::XlsxStyleParser;
use crate::security::{check_input_size, SecurityConfig};
use crate::source::{
    excel_serial_to_datetime, parse_datetime_text, Cell, CellValue, MemoryTable, TableSource,
};
use crate::types::CellCoord;

/// ワークブックパーサー
///
/// calamineのラッパーとして、最初のワークシートの読み込みを提供します。
pub(crate) struct WorkbookParser {
    /// calamineのワークブック（XLSX形式のみサポート）
    workbook: Xlsx<Cursor<Vec<u8>>>,
    /// 背景色と1904年エポックの情報
    styles: XlsxStyleParser,
}

impl WorkbookParser {
    /// ワークブックを開き、スタイル情報も解析する
    ///
    /// 入力全体をメモリに読み込むため、`security_config.max_input_file_size`を
    /// 超える入力は拒否されます。
    ///
    /// # エラー
    ///
    /// * `XlsxToXmlError::SecurityViolation` - サイズ制限・アーカイブ検証に違反した場合
    /// * `XlsxToXmlError::Parse` - calamineがワークブックを開けない場合
    /// * `XlsxToXmlError::Config` - XLSX形式でない場合
    pub fn open<R: Read>(
        mut reader: R,
        security_config: &SecurityConfig,
    ) -> Result<Self, XlsxToXmlError> {
        let mut buffer = Vec::new();
        let bytes_read = reader.read_to_end(&mut buffer)?;
        check_input_size(bytes_read as u64, security_config)?;

        // スタイルを先に解析（アーカイブの検証を兼ねる）
        let styles = XlsxStyleParser::new(Cursor::new(buffer.as_slice()), security_config)?;

        let sheets = open_workbook_auto_from_rs(Cursor::new(buffer)).map_err(XlsxToXmlError::Parse)?;
        let workbook = match sheets {
            Sheets::Xlsx(workbook) => workbook,
            _ => {
                return Err(XlsxToXmlError::Config(
                    "Only XLSX format is supported".to_string(),
                ))
            }
        };

        Ok(WorkbookParser { workbook, styles })
    }

    /// 最初のワークシートを`MemoryTable`として読み込む
    ///
    /// 使用範囲の最終行までを行数とし、各セルに値と背景色を設定します。
    pub fn load_first_sheet(&mut self) -> Result<MemoryTable, XlsxToXmlError> {
        let sheet_name = self
            .workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| XlsxToXmlError::Config("Workbook contains no sheets".to_string()))?;

        let range = self
            .workbook
            .worksheet_range(&sheet_name)
            .map_err(|e| XlsxToXmlError::Parse(e.into()))?;

        let table = build_table(&range, &self.styles);
        debug!("loaded sheet '{}': {} rows", sheet_name, table.row_count());
        Ok(table)
    }
}

/// calamineの範囲とスタイル情報から`MemoryTable`を構築
fn build_table(range: &Range<Data>, styles: &XlsxStyleParser) -> MemoryTable {
    let is_1904 = styles.is_1904();
    let mut table = MemoryTable::new().with_1904(is_1904);

    // 範囲は使用領域の左上から始まるため、絶対座標に変換する
    let (start_row, start_col) = match range.start() {
        Some(start) => start,
        None => return table,
    };
    let (end_row, end_col) = range.end().unwrap_or((start_row, start_col));

    for (row, col, data) in range.cells() {
        let value = to_cell_value(data, is_1904);
        if value.is_empty() {
            continue;
        }
        let coord = CellCoord::new(start_row + row as u32, start_col + col as u32);

        // 数値は表示形式を適用したテキストを保持する（例: 書式`0.00`の12.5 -> "12.50"）
        let display = match (&value, styles.format_code_at(coord)) {
            (CellValue::Number(n), Some(code)) => format_number(*n, code),
            _ => None,
        };

        let cell = table.cell_mut(coord.row + 1, coord.col + 1);
        *cell = Cell::new(value);
        if let Some(text) = display {
            cell.set_display(text);
        }
    }

    // 値のない最終行も行数に含める
    table.cell_mut(end_row + 1, 1);

    let last_col = styles
        .max_styled_col()
        .map_or(end_col, |styled| styled.max(end_col));
    for row in 0..=end_row {
        for col in 0..=last_col {
            if let Some(fill) = styles.fill_at(CellCoord::new(row, col)) {
                table.cell_mut(row + 1, col + 1).set_fill(Some(fill.to_string()));
            }
        }
    }

    table
}

/// calamineのセル値を`CellValue`に変換
fn to_cell_value(data: &Data, is_1904: bool) -> CellValue {
    match data {
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) => CellValue::String(s.clone()),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => {
            let serial = dt.as_f64();
            excel_serial_to_datetime(serial, is_1904)
                .map(CellValue::DateTime)
                .unwrap_or(CellValue::Number(serial))
        }
        Data::DateTimeIso(s) => match parse_datetime_text(s) {
            Some(datetime) => CellValue::DateTime(datetime),
            None => CellValue::String(s.clone()),
        },
        Data::DurationIso(s) => CellValue::String(s.clone()),
        Data::Error(e) => CellValue::Error(e.to_string()),
        Data::Empty => CellValue::Empty,
    }
}
