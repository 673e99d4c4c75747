//! Table Source Module
//!
//! 変換ロジックとスプレッドシート読み込みライブラリを切り離すための
//! 最小限の表データ抽象を定義するモジュール。
//!
//! 行番号・列番号はすべて1始まりです（1行目はヘッダー行）。

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

/// セルの値を表す列挙型
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// 数値（f64）
    Number(f64),
    /// 文字列
    String(String),
    /// 論理値
    Bool(bool),
    /// 日時（日付書式のセル）
    DateTime(NaiveDateTime),
    /// エラー値（例: #DIV/0!）
    Error(String),
    /// 空セル
    Empty,
}

impl CellValue {
    /// 値が空かどうかを判定
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// 「標準」書式での表示テキストを取得
    ///
    /// 整数値の数値は小数部なし（`5`）、それ以外は最短の往復可能表現（`12.5`）、
    /// 論理値は`TRUE`/`FALSE`になります。
    pub fn to_text(&self) -> String {
        match self {
            CellValue::Number(n) => format_general(*n),
            CellValue::String(s) => s.clone(),
            CellValue::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            CellValue::DateTime(dt) => {
                if dt.time() == NaiveTime::MIN {
                    dt.format("%Y-%m-%d").to_string()
                } else {
                    dt.format("%Y-%m-%d %H:%M:%S").to_string()
                }
            }
            CellValue::Error(e) => e.clone(),
            CellValue::Empty => String::new(),
        }
    }

    /// セルの値を日付として取得
    ///
    /// 日時セルはそのまま、数値はExcelのシリアル値、文字列は代表的な日付書式として
    /// 解釈します。解釈できない場合は`None`を返します。
    pub fn as_date(&self, is_1904: bool) -> Option<NaiveDate> {
        match self {
            CellValue::DateTime(dt) => Some(dt.date()),
            CellValue::Number(n) => excel_serial_to_datetime(*n, is_1904).map(|dt| dt.date()),
            CellValue::String(s) => parse_date_text(s.trim()),
            _ => None,
        }
    }
}

/// 1セル分のデータ（値、表示テキスト、背景色）
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    value: CellValue,
    /// 表示形式を適用済みのテキスト（「標準」書式の場合は`None`）
    display: Option<String>,
    fill: Option<String>,
}

impl Cell {
    /// 値から背景色なしのセルを生成
    pub fn new(value: CellValue) -> Self {
        Self {
            value,
            display: None,
            fill: None,
        }
    }

    /// 文字列セルを生成
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(CellValue::String(text.into()))
    }

    /// 数値セルを生成
    pub fn number(value: f64) -> Self {
        Self::new(CellValue::Number(value))
    }

    /// 日付セルを生成
    pub fn date(date: NaiveDate) -> Self {
        Self::new(CellValue::DateTime(date.and_time(NaiveTime::MIN)))
    }

    /// 空セルを生成
    pub fn empty() -> Self {
        Self::new(CellValue::Empty)
    }

    /// 背景色（RGB16進文字列）を設定
    pub fn with_fill(mut self, rgb: impl Into<String>) -> Self {
        self.fill = Some(rgb.into());
        self
    }

    /// 表示形式を適用したテキストを設定
    ///
    /// 例: 値`12.5`に書式`0.00`を適用したセルは`"12.50"`を表示します。
    pub fn with_display(mut self, text: impl Into<String>) -> Self {
        self.display = Some(text.into());
        self
    }

    pub(crate) fn set_display(&mut self, text: String) {
        self.display = Some(text);
    }

    /// 背景色を設定または解除
    pub(crate) fn set_fill(&mut self, fill: Option<String>) {
        self.fill = fill;
    }

    /// セルの値
    pub fn value(&self) -> &CellValue {
        &self.value
    }

    /// セルの表示テキスト
    ///
    /// 表示形式が設定されていればそのテキスト、なければ値の「標準」表示です。
    pub fn to_text(&self) -> String {
        match &self.display {
            Some(text) => text.clone(),
            None => self.value.to_text(),
        }
    }

    /// セルの背景色（未設定の場合は`None`）
    pub fn fill_color(&self) -> Option<&str> {
        self.fill.as_deref()
    }
}

/// 表データソースの抽象
///
/// 変換処理が必要とする「値」「背景色」「行数」だけを提供します。
pub trait TableSource {
    /// 最終行の行番号（1始まり、ヘッダー行を含む）
    fn row_count(&self) -> u32;

    /// 指定位置のセル（1始まり）。存在しない場合は`None`
    fn cell(&self, row: u32, col: u32) -> Option<&Cell>;

    /// 1904年エポックを使用するかどうか
    fn is_1904(&self) -> bool {
        false
    }
}

/// データソース上の1行を表すビュー
#[derive(Clone, Copy)]
pub struct TableRow<'a> {
    source: &'a dyn TableSource,
    number: u32,
}

impl<'a> TableRow<'a> {
    pub fn new(source: &'a dyn TableSource, number: u32) -> Self {
        Self { source, number }
    }

    /// 行番号（1始まり）
    pub fn number(&self) -> u32 {
        self.number
    }

    /// 列のセル（1始まり）
    pub fn cell(&self, col: u32) -> Option<&'a Cell> {
        self.source.cell(self.number, col)
    }

    /// 列の表示テキスト。セルがなければ空文字列
    pub fn text(&self, col: u32) -> String {
        self.cell(col).map(Cell::to_text).unwrap_or_default()
    }

    /// 列の値。セルがなければ`CellValue::Empty`
    pub fn value(&self, col: u32) -> CellValue {
        self.cell(col)
            .map(|cell| cell.value().clone())
            .unwrap_or(CellValue::Empty)
    }

    /// 列の背景色
    pub fn fill_color(&self, col: u32) -> Option<&'a str> {
        self.cell(col).and_then(Cell::fill_color)
    }

    /// 列の値を日付として取得
    pub fn date(&self, col: u32) -> Option<NaiveDate> {
        self.value(col).as_date(self.source.is_1904())
    }
}

impl std::fmt::Debug for TableRow<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableRow").field("number", &self.number).finish()
    }
}

/// メモリ上に展開された表データ
///
/// XLSXパーサーの出力先であり、テストやCSVなど別形式のホストからも利用できます。
///
/// # 使用例
///
/// ```rust
/// use shiporder_xml::{Cell, MemoryTable, TableSource};
///
/// let table = MemoryTable::new()
///     .with_row(vec![Cell::text("OrderID"), Cell::text("OrderDate")])
///     .with_row(vec![Cell::text("1001"), Cell::text("2024-03-15")]);
///
/// assert_eq!(table.row_count(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryTable {
    rows: Vec<Vec<Cell>>,
    is_1904: bool,
}

impl MemoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 行を追加（ビルダー形式）
    pub fn with_row(mut self, cells: Vec<Cell>) -> Self {
        self.push_row(cells);
        self
    }

    /// 行を追加
    pub fn push_row(&mut self, cells: Vec<Cell>) {
        self.rows.push(cells);
    }

    /// 1904年エポックフラグを設定
    pub fn with_1904(mut self, is_1904: bool) -> Self {
        self.is_1904 = is_1904;
        self
    }

    /// 指定位置のセルを可変参照で取得（1始まり）。必要に応じて行・列を拡張する
    pub(crate) fn cell_mut(&mut self, row: u32, col: u32) -> &mut Cell {
        let (row_idx, col_idx) = ((row.max(1) - 1) as usize, (col.max(1) - 1) as usize);
        if self.rows.len() <= row_idx {
            self.rows.resize_with(row_idx + 1, Vec::new);
        }
        let cells = &mut self.rows[row_idx];
        if cells.len() <= col_idx {
            cells.resize_with(col_idx + 1, Cell::empty);
        }
        &mut cells[col_idx]
    }
}

impl TableSource for MemoryTable {
    fn row_count(&self) -> u32 {
        self.rows.len() as u32
    }

    fn cell(&self, row: u32, col: u32) -> Option<&Cell> {
        if row == 0 || col == 0 {
            return None;
        }
        self.rows
            .get((row - 1) as usize)
            .and_then(|cells| cells.get((col - 1) as usize))
    }

    fn is_1904(&self) -> bool {
        self.is_1904
    }
}

/// 数値を「標準」書式の表示テキストに変換
fn format_general(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Excelのシリアル値を日時に変換
///
/// - 1900年システム: 1899年12月30日起算（シリアル値1 = 1899-12-31、
///   60以降はExcelの1900年うるう年バグと相殺されて正しい日付になる）
/// - 1904年システム: 1904年1月1日起算
pub(crate) fn excel_serial_to_datetime(serial: f64, is_1904: bool) -> Option<NaiveDateTime> {
    // 9999-12-31 = 2958465
    if !serial.is_finite() || !(0.0..2_958_466.0).contains(&serial) {
        return None;
    }

    let epoch = if is_1904 {
        NaiveDate::from_ymd_opt(1904, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    };

    let days = serial.floor();
    let seconds = ((serial - days) * 86_400.0).round() as i64;
    epoch
        .and_time(NaiveTime::MIN)
        .checked_add_signed(Duration::days(days as i64))?
        .checked_add_signed(Duration::seconds(seconds))
}

/// ISO 8601形式の日時文字列を解析
pub(crate) fn parse_datetime_text(text: &str) -> Option<NaiveDateTime> {
    const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"];

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
}

/// 日付を表す文字列を解析
fn parse_date_text(text: &str) -> Option<NaiveDate> {
    const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

    parse_datetime_text(text).map(|dt| dt.date()).or_else(|| {
        DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
    })
}
