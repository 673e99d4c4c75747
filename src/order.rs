//! Order Converter Module
//!
//! 網掛け行を`ShipOrder`に変換し、XMLドキュメントを生成・保存するモジュール。
//! 変換結果は呼び出しごとの`ConversionRun`として返されます。

use std::str::FromStr;

use chrono::NaiveDate;
use log::{debug, info};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::api::OutputTarget;
use crate::classifier::is_shaded;
use crate::error::XlsxToXmlError;
use crate::output::{DocumentWriter, GeneratedDocument};
use crate::source::{CellValue, TableRow, TableSource};
use crate::types::CellCoord;

/// 網掛け判定に使用する列（1始まり）
///
/// 都市名の列と同じ列です。
pub const GATE_COLUMN: u32 = 3;

/// 最初のデータ行（1行目はヘッダー）
const FIRST_DATA_ROW: u32 = 2;

/// 住所から地域を取得できなかった場合の値
const UNKNOWN_REGION: &str = "Unknown";

/// 列番号の固定マッピング（1始まり）
mod columns {
    pub const ORDER_ID: u32 = 1;
    pub const ORDER_DATE: u32 = 2;
    pub const CITY: u32 = 3;
    pub const PRODUCT_CATEGORY: u32 = 4;
    pub const PRODUCT_NAME: u32 = 5;
    pub const QUANTITY: u32 = 6;
    pub const ADDRESS: u32 = 7;
    pub const PRICE: u32 = 8;
}

/// 1行分の出荷注文
///
/// 生成後は不変です。`total`は常に`quantity * price`で、個別に指定することはできません。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipOrder {
    order_id: String,
    order_date: NaiveDate,
    address: String,
    city: String,
    region: String,
    product_category: String,
    product_name: String,
    quantity: u32,
    price: Decimal,
    total: Decimal,
}

impl ShipOrder {
    /// 各フィールドから注文を生成し、`region`と`total`を導出する
    ///
    /// `quantity * price`が`Decimal`の範囲を超える場合は`None`を返します。
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        order_id: String,
        order_date: NaiveDate,
        address: String,
        city: String,
        product_category: String,
        product_name: String,
        quantity: u32,
        price: Decimal,
    ) -> Option<Self> {
        let total = Decimal::from(quantity).checked_mul(price)?;
        let region = extract_region(&address);

        Some(Self {
            order_id,
            order_date,
            address,
            city,
            region,
            product_category,
            product_name,
            quantity,
            price,
            total,
        })
    }

    /// 行から注文を抽出
    ///
    /// 注文日のセルが空の場合は`0001-01-01`になります。
    ///
    /// # エラー
    ///
    /// * `XlsxToXmlError::Format` - 注文日、数量、価格のいずれかを解析できない場合
    pub fn from_row(row: &TableRow<'_>) -> Result<Self, XlsxToXmlError> {
        let order_date = match row.value(columns::ORDER_DATE) {
            CellValue::Empty => NaiveDate::from_ymd_opt(1, 1, 1),
            CellValue::String(text) if text.trim().is_empty() => NaiveDate::from_ymd_opt(1, 1, 1),
            _ => row.date(columns::ORDER_DATE),
        }
        .ok_or_else(|| {
            format_error(row, columns::ORDER_DATE, "orderdate", "not a date".to_string())
        })?;

        let quantity_text = row.text(columns::QUANTITY);
        let quantity = parse_quantity(&quantity_text)
            .map_err(|message| format_error(row, columns::QUANTITY, "quantity", message))?;

        let price_text = row.text(columns::PRICE);
        let price = parse_price(&price_text)
            .map_err(|message| format_error(row, columns::PRICE, "price", message))?;

        Self::new(
            row.text(columns::ORDER_ID),
            order_date,
            row.text(columns::ADDRESS),
            row.text(columns::CITY),
            row.text(columns::PRODUCT_CATEGORY),
            row.text(columns::PRODUCT_NAME),
            quantity,
            price,
        )
        .ok_or_else(|| {
            format_error(
                row,
                columns::PRICE,
                "total",
                format!("{} * {} overflows", quantity, price),
            )
        })
    }

    pub fn order_id(&self) -> &str {
        &self.order_id
    }

    pub fn order_date(&self) -> NaiveDate {
        self.order_date
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn city(&self) -> &str {
        &self.city
    }

    /// 住所から導出した地域
    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn product_category(&self) -> &str {
        &self.product_category
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn price(&self) -> Decimal {
        self.price
    }

    /// `quantity * price`
    pub fn total(&self) -> Decimal {
        self.total
    }
}

/// 住所から地域を抽出
///
/// カンマで分割した要素が2つ以上ある場合は、後ろから2番目の要素（前後の空白を除去）を
/// 返します。それ以外は`"Unknown"`を返します。
///
/// # 使用例
///
/// ```rust
/// use shiporder_xml::extract_region;
///
/// assert_eq!(extract_region("123 Main St, Springfield, IL, USA"), "IL");
/// assert_eq!(extract_region("123 Main St"), "Unknown");
/// ```
pub fn extract_region(address: &str) -> String {
    let parts: Vec<&str> = address.split(',').collect();
    if parts.len() >= 2 {
        parts[parts.len() - 2].trim().to_string()
    } else {
        UNKNOWN_REGION.to_string()
    }
}

/// 数量を解析（整数リテラルのみ。桁区切り・小数は不可）
fn parse_quantity(text: &str) -> Result<u32, String> {
    text.trim()
        .parse::<u32>()
        .map_err(|e| format!("not a non-negative integer: {}", e))
}

/// 価格を10進数として解析（浮動小数点は経由しない）
///
/// 整数部の桁区切り（`1,299.00`）は許可します。表示形式`#,##0.00`のセルの
/// 表示テキストをそのまま解析できるようにするためです。
fn parse_price(text: &str) -> Result<Decimal, String> {
    let trimmed = text.trim();
    let unsigned = trimmed
        .strip_prefix('-')
        .or_else(|| trimmed.strip_prefix('+'))
        .unwrap_or(trimmed);

    let mut digits = 0usize;
    let mut points = 0usize;
    for ch in unsigned.chars() {
        match ch {
            '0'..='9' => digits += 1,
            '.' => points += 1,
            ',' if points == 0 && digits > 0 => {}
            _ => return Err(format!("unexpected character '{}' in decimal", ch)),
        }
    }
    if digits == 0 || points > 1 {
        return Err("not a decimal number".to_string());
    }

    let literal: String = trimmed
        .strip_prefix('+')
        .unwrap_or(trimmed)
        .chars()
        .filter(|ch| *ch != ',')
        .collect();
    Decimal::from_str(&literal).map_err(|e| format!("not a decimal number: {}", e))
}

fn format_error(row: &TableRow<'_>, col: u32, field: &'static str, message: String) -> XlsxToXmlError {
    XlsxToXmlError::Format {
        cell: CellCoord::from_one_based(row.number(), col).to_a1_notation(),
        field,
        value: row.text(col),
        message,
    }
}

/// 1回の変換処理の結果
///
/// 注文リストとドキュメントリストは同じ順序で1対1に対応します。
/// 変換の途中でエラーが発生した場合、それ以前の行の結果は保持されたままになります。
#[derive(Debug, Clone, Default)]
pub struct ConversionRun {
    orders: Vec<ShipOrder>,
    documents: Vec<GeneratedDocument>,
    status: String,
}

impl ConversionRun {
    pub fn new() -> Self {
        Self::default()
    }

    /// 変換された注文（行の出現順）
    pub fn orders(&self) -> &[ShipOrder] {
        &self.orders
    }

    /// 生成されたドキュメント（`orders()`と同じ順序）
    pub fn documents(&self) -> &[GeneratedDocument] {
        &self.documents
    }

    /// ステータスメッセージ。変換が完了するまでは空
    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// JSON出力用のサマリー
    pub fn summary(&self) -> RunSummary<'_> {
        RunSummary {
            status: &self.status,
            count: self.orders.len(),
            documents: self.documents.iter().map(|d| d.reference()).collect(),
            orders: &self.orders,
        }
    }

    fn clear(&mut self) {
        self.orders.clear();
        self.documents.clear();
        self.status.clear();
    }

    fn push(&mut self, order: ShipOrder, document: GeneratedDocument) {
        self.orders.push(order);
        self.documents.push(document);
    }

    fn finish(&mut self) {
        self.status = if self.orders.is_empty() {
            "No shaded rows found.".to_string()
        } else {
            format!(
                "{} shaded rows loaded and XMLs generated.",
                self.orders.len()
            )
        };
    }
}

/// `ConversionRun`のシリアライズ用ビュー
#[derive(Debug, Serialize)]
pub struct RunSummary<'a> {
    pub status: &'a str,
    pub count: usize,
    pub documents: Vec<&'a str>,
    pub orders: &'a [ShipOrder],
}

/// 網掛け行をXMLドキュメントに変換するコンバーター
///
/// # 使用例
///
/// ```rust
/// use shiporder_xml::{Cell, MemoryTable, OrderConverter, OutputTarget};
///
/// # fn main() -> Result<(), shiporder_xml::XlsxToXmlError> {
/// let table = MemoryTable::new().with_row(vec![Cell::text("OrderID")]);
/// let run = OrderConverter::new(&OutputTarget::Memory).convert_workbook(&table)?;
/// assert_eq!(run.status(), "No shaded rows found.");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct OrderConverter {
    writer: DocumentWriter,
}

impl Default for OrderConverter {
    fn default() -> Self {
        Self::new(&OutputTarget::Memory)
    }
}

impl OrderConverter {
    pub fn new(target: &OutputTarget) -> Self {
        Self {
            writer: DocumentWriter::from_target(target),
        }
    }

    /// 1行を注文とXMLドキュメントに変換
    ///
    /// 網掛け判定は行いません。呼び出し側で`is_shaded`が`true`の行に対してのみ使用します。
    pub fn convert_row(row: &TableRow<'_>) -> Result<(ShipOrder, String), XlsxToXmlError> {
        let order = ShipOrder::from_row(row)?;
        let xml = crate::xml::write_ship_order(&order)?;
        Ok((order, xml))
    }

    /// データソース全体を変換し、新しい`ConversionRun`を返す
    pub fn convert_workbook(&self, source: &dyn TableSource) -> Result<ConversionRun, XlsxToXmlError> {
        let mut run = ConversionRun::new();
        self.convert_into(source, &mut run)?;
        Ok(run)
    }

    /// データソース全体を変換し、結果を`run`に蓄積する
    ///
    /// `run`は最初にクリアされます。エラーが発生した場合はその行で処理を打ち切り、
    /// それ以前の行の結果は`run`に残ります（ステータスは空のまま）。
    ///
    /// # 処理フロー
    ///
    /// 1. 出力先の準備（ディレクトリ作成）
    /// 2. 2行目から最終行まで、判定列の背景色で網掛け行を選択
    /// 3. 網掛け行を変換し、`record_<n>`として保存
    /// 4. ステータスメッセージの設定
    pub fn convert_into(
        &self,
        source: &dyn TableSource,
        run: &mut ConversionRun,
    ) -> Result<(), XlsxToXmlError> {
        run.clear();
        self.writer.prepare()?;

        for number in FIRST_DATA_ROW..=source.row_count() {
            let row = TableRow::new(source, number);
            let fill = row.fill_color(GATE_COLUMN);

            if !is_shaded(fill) {
                debug!("row {}: skipped (fill {:?})", number, fill);
                continue;
            }

            let (order, xml) = Self::convert_row(&row)?;
            let document = self.writer.persist(run.len() + 1, xml)?;
            debug!(
                "row {}: order '{}' -> {}",
                number,
                order.order_id(),
                document.reference()
            );
            run.push(order, document);
        }

        run.finish();
        info!("{}", run.status());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{Cell, MemoryTable};

    fn header() -> Vec<Cell> {
        [
            "OrderID", "OrderDate", "City", "Category", "Product", "Quantity", "Address", "Price",
        ]
        .iter()
        .map(|h| Cell::text(*h))
        .collect()
    }

    fn data_row(id: &str, fill: Option<&str>, quantity: &str, price: &str) -> Vec<Cell> {
        let mut city = Cell::text("Springfield");
        if let Some(rgb) = fill {
            city = city.with_fill(rgb);
        }
        vec![
            Cell::text(id),
            Cell::date(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()),
            city,
            Cell::text("Hardware"),
            Cell::text("Hammer"),
            Cell::text(quantity),
            Cell::text("123 Main St, Springfield, IL, USA"),
            Cell::text(price),
        ]
    }

    #[test]
    fn test_extract_region() {
        assert_eq!(extract_region("123 Main St, Springfield, IL, USA"), "IL");
        assert_eq!(extract_region("123 Main St"), "Unknown");
        assert_eq!(extract_region("A, B"), "A");
        assert_eq!(extract_region(""), "Unknown");
        assert_eq!(extract_region("A,,B"), "");
        assert_eq!(extract_region("Dock 4 ,  Bergen  , Norway"), "Bergen");
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("5"), Ok(5));
        assert_eq!(parse_quantity(" 12 "), Ok(12));
        assert!(parse_quantity("1,000").is_err());
        assert!(parse_quantity("2.5").is_err());
        assert!(parse_quantity("-1").is_err());
        assert!(parse_quantity("ten").is_err());
        assert!(parse_quantity("").is_err());
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("12.50").unwrap().to_string(), "12.50");
        assert_eq!(parse_price("3").unwrap().to_string(), "3");
        assert_eq!(parse_price("+0.1").unwrap().to_string(), "0.1");
        assert_eq!(parse_price("-4.25").unwrap().to_string(), "-4.25");
        assert_eq!(parse_price("1,299.00").unwrap().to_string(), "1299.00");
        assert_eq!(parse_price("-12,345").unwrap().to_string(), "-12345");
        assert!(parse_price(",5").is_err());
        assert!(parse_price("1.2,5").is_err());
        assert!(parse_price("12;50").is_err());
        assert!(parse_price("$5").is_err());
        assert!(parse_price("1e3").is_err());
        assert!(parse_price("1.2.3").is_err());
        assert!(parse_price(".").is_err());
        assert!(parse_price("").is_err());
    }

    #[test]
    fn test_total_is_exact_decimal_product() {
        let table = MemoryTable::new()
            .with_row(header())
            .with_row(data_row("1001", Some("FFFF00"), "3", "0.10"));
        let order = ShipOrder::from_row(&TableRow::new(&table, 2)).unwrap();

        assert_eq!(order.total(), Decimal::from_str("0.30").unwrap());
        assert_eq!(order.total().to_string(), "0.30");
        assert_eq!(order.region(), "IL");
        assert_eq!(order.city(), "Springfield");
    }

    #[test]
    fn test_from_row_reports_cell_of_bad_quantity() {
        let table = MemoryTable::new()
            .with_row(header())
            .with_row(data_row("1001", Some("FFFF00"), "many", "1.00"));

        match ShipOrder::from_row(&TableRow::new(&table, 2)) {
            Err(XlsxToXmlError::Format {
                cell, field, value, ..
            }) => {
                assert_eq!(cell, "F2");
                assert_eq!(field, "quantity");
                assert_eq!(value, "many");
            }
            other => panic!("Expected Format error, got {:?}", other),
        }
    }

    #[test]
    fn test_from_row_empty_date_is_minimum_date() {
        for blank in [Cell::empty(), Cell::text(""), Cell::text("  ")] {
            let mut row = data_row("1001", Some("FFFF00"), "1", "1.00");
            row[1] = blank;
            let table = MemoryTable::new().with_row(header()).with_row(row);

            let order = ShipOrder::from_row(&TableRow::new(&table, 2)).unwrap();
            assert_eq!(order.order_date(), NaiveDate::from_ymd_opt(1, 1, 1).unwrap());
            assert_eq!(order.order_date().format("%Y-%m-%d").to_string(), "0001-01-01");
        }
    }

    #[test]
    fn test_from_row_rejects_unparseable_date() {
        let mut row = data_row("1001", Some("FFFF00"), "1", "1.00");
        row[1] = Cell::text("someday");
        let table = MemoryTable::new().with_row(header()).with_row(row);

        match ShipOrder::from_row(&TableRow::new(&table, 2)) {
            Err(XlsxToXmlError::Format { cell, field, .. }) => {
                assert_eq!(cell, "B2");
                assert_eq!(field, "orderdate");
            }
            other => panic!("Expected Format error, got {:?}", other),
        }
    }

    #[test]
    fn test_convert_workbook_selects_shaded_rows() {
        let table = MemoryTable::new()
            .with_row(header())
            .with_row(data_row("1001", Some("FFFFFF"), "1", "1.00"))
            .with_row(data_row("1002", Some("FFFF00"), "2", "9.99"));

        let run = OrderConverter::default().convert_workbook(&table).unwrap();

        assert_eq!(run.len(), 1);
        assert_eq!(run.orders()[0].order_id(), "1002");
        assert_eq!(run.documents()[0].name(), "record_1");
        assert_eq!(run.status(), "1 shaded rows loaded and XMLs generated.");
    }

    #[test]
    fn test_header_row_is_never_classified() {
        let mut shaded_header = header();
        shaded_header[2] = Cell::text("City").with_fill("FF0000");
        let table = MemoryTable::new().with_row(shaded_header);

        let run = OrderConverter::default().convert_workbook(&table).unwrap();
        assert!(run.is_empty());
        assert_eq!(run.status(), "No shaded rows found.");
    }

    #[test]
    fn test_sequence_follows_qualifying_rows() {
        let table = MemoryTable::new()
            .with_row(header())
            .with_row(data_row("1001", None, "1", "1"))
            .with_row(data_row("1002", Some("00B050"), "1", "1"))
            .with_row(data_row("1003", Some("000000"), "1", "1"))
            .with_row(data_row("1004", Some("ffffff"), "1", "1"));

        let run = OrderConverter::default().convert_workbook(&table).unwrap();
        let names: Vec<&str> = run.documents().iter().map(|d| d.name()).collect();
        let ids: Vec<&str> = run.orders().iter().map(|o| o.order_id()).collect();

        assert_eq!(names, vec!["record_1", "record_2"]);
        assert_eq!(ids, vec!["1002", "1004"]);
    }

    #[test]
    fn test_format_error_keeps_prior_rows() {
        let table = MemoryTable::new()
            .with_row(header())
            .with_row(data_row("1001", Some("FFFF00"), "1", "2.00"))
            .with_row(data_row("1002", Some("FFFF00"), "oops", "2.00"))
            .with_row(data_row("1003", Some("FFFF00"), "1", "2.00"));

        let mut run = ConversionRun::new();
        let result = OrderConverter::default().convert_into(&table, &mut run);

        assert!(matches!(result, Err(XlsxToXmlError::Format { .. })));
        assert_eq!(run.len(), 1);
        assert_eq!(run.documents().len(), 1);
        assert_eq!(run.orders()[0].order_id(), "1001");
        assert_eq!(run.status(), "");
    }

    #[test]
    fn test_convert_into_clears_previous_run() {
        let converter = OrderConverter::default();
        let shaded = MemoryTable::new()
            .with_row(header())
            .with_row(data_row("1001", Some("FFFF00"), "1", "2.00"));
        let plain = MemoryTable::new()
            .with_row(header())
            .with_row(data_row("1001", None, "1", "2.00"));

        let mut run = ConversionRun::new();
        converter.convert_into(&shaded, &mut run).unwrap();
        assert_eq!(run.len(), 1);

        converter.convert_into(&plain, &mut run).unwrap();
        assert!(run.is_empty());
        assert!(run.documents().is_empty());
        assert_eq!(run.status(), "No shaded rows found.");
    }

    #[test]
    fn test_summary_serializes() {
        let table = MemoryTable::new()
            .with_row(header())
            .with_row(data_row("1001", Some("FFFF00"), "2", "1.25"));
        let run = OrderConverter::default().convert_workbook(&table).unwrap();

        let json = serde_json::to_value(run.summary()).unwrap();
        assert_eq!(json["count"], 1);
        assert_eq!(json["documents"][0], "record_1.xml");
        assert_eq!(json["orders"][0]["orderId"], "1001");
        assert_eq!(json["orders"][0]["total"], "2.50");
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_region_without_comma_is_unknown(address in "[^,]*") {
                prop_assert_eq!(extract_region(&address), "Unknown");
            }

            #[test]
            fn test_region_is_second_to_last_part(
                parts in proptest::collection::vec("[a-zA-Z0-9 ]{0,12}", 2..6)
            ) {
                let address = parts.join(",");
                let expected = parts[parts.len() - 2].trim();
                prop_assert_eq!(extract_region(&address), expected);
            }

            #[test]
            fn test_total_equals_quantity_times_price(
                quantity in 0u32..100_000,
                cents in 0i64..10_000_000,
            ) {
                let price = Decimal::new(cents, 2);
                let order = ShipOrder::new(
                    "1".into(),
                    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                    "a, b".into(),
                    "c".into(),
                    "d".into(),
                    "e".into(),
                    quantity,
                    price,
                ).unwrap();
                prop_assert_eq!(order.total(), Decimal::from(quantity) * price);
            }
        }
    }
}
