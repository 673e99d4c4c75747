//! Ship Order XML Module
//!
//! `ShipOrder`と`shiporder`XMLドキュメントの相互変換を提供するモジュール。
//!
//! ```xml
//! <?xml version="1.0" encoding="utf-8"?>
//! <shiporder orderid="1001" orderdate="2024-03-15">
//!   <shipto>
//!     <orderid>1001</orderid>
//!     <address>123 Main St, Springfield, IL, USA</address>
//!     <city>Springfield</city>
//!     <region>IL</region>
//!   </shipto>
//!   <item>
//!     <productCategory>Hardware</productCategory>
//!     <productName>Hammer</productName>
//!     <quantity>2</quantity>
//!     <price>12.50</price>
//!     <total>25.00</total>
//!   </item>
//! </shiporder>
//! ```

use std::collections::HashMap;
use std::str::FromStr;

use chrono::NaiveDate;
use quick_xml::escape::partial_escape;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use rust_decimal::Decimal;

use crate::error::XlsxToXmlError;
use crate::order::ShipOrder;

/// `orderdate`属性の書式
const DATE_FORMAT: &str = "%Y-%m-%d";

/// 値を持つ要素（親要素名, 要素名）
const LEAF_ELEMENTS: [(&str, &str); 9] = [
    ("shipto", "orderid"),
    ("shipto", "address"),
    ("shipto", "city"),
    ("shipto", "region"),
    ("item", "productCategory"),
    ("item", "productName"),
    ("item", "quantity"),
    ("item", "price"),
    ("item", "total"),
];

/// 注文をXMLドキュメントに変換
///
/// XML宣言に続けて、2スペースのインデントで`shiporder`要素を出力します。
/// テキストでエスケープするのは`<`、`>`、`&`のみで、引用符はそのまま出力します。
/// 属性値ではさらに`"`を`&quot;`にします。
pub fn write_ship_order(order: &ShipOrder) -> Result<String, XlsxToXmlError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    let order_date = order.order_date().format(DATE_FORMAT).to_string();

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
        .map_err(XlsxToXmlError::xml)?;

    let order_id = escape_attribute(order.order_id());
    let order_date = escape_attribute(&order_date);
    let root = BytesStart::new("shiporder").with_attributes([
        Attribute::from((b"orderid".as_slice(), order_id.as_bytes())),
        Attribute::from((b"orderdate".as_slice(), order_date.as_bytes())),
    ]);
    writer
        .write_event(Event::Start(root))
        .map_err(XlsxToXmlError::xml)?;

    write_group(
        &mut writer,
        "shipto",
        &[
            ("orderid", order.order_id()),
            ("address", order.address()),
            ("city", order.city()),
            ("region", order.region()),
        ],
    )?;

    let quantity = order.quantity().to_string();
    let price = order.price().to_string();
    let total = order.total().to_string();
    write_group(
        &mut writer,
        "item",
        &[
            ("productCategory", order.product_category()),
            ("productName", order.product_name()),
            ("quantity", quantity.as_str()),
            ("price", price.as_str()),
            ("total", total.as_str()),
        ],
    )?;

    writer
        .write_event(Event::End(BytesEnd::new("shiporder")))
        .map_err(XlsxToXmlError::xml)?;

    String::from_utf8(writer.into_inner()).map_err(XlsxToXmlError::xml)
}

/// 子要素を持つグループ要素を書き込む
fn write_group(
    writer: &mut Writer<Vec<u8>>,
    name: &str,
    children: &[(&str, &str)],
) -> Result<(), XlsxToXmlError> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(XlsxToXmlError::xml)?;

    for (child, value) in children {
        writer
            .write_event(Event::Start(BytesStart::new(*child)))
            .map_err(XlsxToXmlError::xml)?;
        writer
            .write_event(Event::Text(BytesText::from_escaped(partial_escape(value))))
            .map_err(XlsxToXmlError::xml)?;
        writer
            .write_event(Event::End(BytesEnd::new(*child)))
            .map_err(XlsxToXmlError::xml)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(XlsxToXmlError::xml)
}

/// 属性値をエスケープ（`<`、`>`、`&`、`"`）
fn escape_attribute(value: &str) -> String {
    partial_escape(value).replace('"', "&quot;")
}

/// XMLドキュメントを読み込み、注文に戻す
///
/// 9つの葉要素はすべて必須です（空要素`<address/>`は空文字列として扱います）。
/// `region`と`total`は住所・数量・価格から再計算され、`shipto/orderid`は
/// ルートの`orderid`属性と照合されます。一致しない場合はエラーになります。
///
/// # エラー
///
/// * `XlsxToXmlError::Xml` - XMLが不正、必須要素の欠落、値の不整合
pub fn read_ship_order(xml: &str) -> Result<ShipOrder, XlsxToXmlError> {
    let mut reader = Reader::from_reader(xml.as_bytes());

    let mut buf = Vec::new();
    let mut stack: Vec<String> = Vec::new();
    let mut attributes: HashMap<String, String> = HashMap::new();
    let mut values: HashMap<(String, String), String> = HashMap::new();
    let mut seen_root = false;

    loop {
        buf.clear();
        let (e, is_empty) = match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => (e, false),
            Ok(Event::Empty(e)) => (e, true),
            Ok(Event::Text(e)) => {
                // 葉要素の中のテキストのみを値として扱う（インデントの空白は無視）
                if let [.., parent, leaf] = stack.as_slice() {
                    if is_leaf(parent, leaf) {
                        let text = e.unescape().map_err(XlsxToXmlError::xml)?;
                        values
                            .entry((parent.clone(), leaf.clone()))
                            .or_default()
                            .push_str(&text);
                    }
                }
                continue;
            }
            Ok(Event::End(_)) => {
                stack.pop();
                continue;
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxToXmlError::xml(e)),
            _ => continue,
        };

        let name = std::str::from_utf8(e.name().as_ref())?.to_string();

        if stack.is_empty() {
            if name != "shiporder" || seen_root {
                return Err(XlsxToXmlError::Xml(format!(
                    "unexpected root element <{}>",
                    name
                )));
            }
            seen_root = true;
            for attr in e.attributes() {
                let attr = attr.map_err(XlsxToXmlError::xml)?;
                let key = std::str::from_utf8(attr.key.as_ref())?.to_string();
                let value = attr
                    .decode_and_unescape_value(&reader)
                    .map_err(XlsxToXmlError::xml)?;
                attributes.insert(key, value.into_owned());
            }
        } else if let Some(parent) = stack.last() {
            // 要素の存在を記録する（`<address></address>`や`<address/>`は空文字列）
            if is_leaf(parent, &name) {
                values.entry((parent.clone(), name.clone())).or_default();
            }
        }

        if !is_empty {
            stack.push(name);
        }
    }

    if !seen_root {
        return Err(XlsxToXmlError::Xml("missing <shiporder> element".to_string()));
    }

    if let Some((parent, leaf)) = LEAF_ELEMENTS
        .iter()
        .find(|(parent, leaf)| !values.contains_key(&(parent.to_string(), leaf.to_string())))
    {
        return Err(XlsxToXmlError::Xml(format!(
            "missing <{}>/<{}> element",
            parent, leaf
        )));
    }

    let field = |parent: &str, leaf: &str| -> String {
        values
            .get(&(parent.to_string(), leaf.to_string()))
            .cloned()
            .unwrap_or_default()
    };

    let order_id = attributes
        .get("orderid")
        .cloned()
        .ok_or_else(|| XlsxToXmlError::Xml("missing orderid attribute".to_string()))?;
    let shipto_order_id = field("shipto", "orderid");
    if shipto_order_id != order_id {
        return Err(XlsxToXmlError::Xml(format!(
            "shipto orderid '{}' does not match orderid attribute '{}'",
            shipto_order_id, order_id
        )));
    }

    let order_date = attributes
        .get("orderdate")
        .ok_or_else(|| XlsxToXmlError::Xml("missing orderdate attribute".to_string()))
        .and_then(|text| {
            NaiveDate::parse_from_str(text, DATE_FORMAT).map_err(|e| {
                XlsxToXmlError::Xml(format!("invalid orderdate '{}': {}", text, e))
            })
        })?;

    let quantity_text = field("item", "quantity");
    let quantity = quantity_text.parse::<u32>().map_err(|e| {
        XlsxToXmlError::Xml(format!("invalid quantity '{}': {}", quantity_text, e))
    })?;
    let price = parse_decimal(&field("item", "price"), "price")?;
    let total = parse_decimal(&field("item", "total"), "total")?;

    let order = ShipOrder::new(
        order_id,
        order_date,
        field("shipto", "address"),
        field("shipto", "city"),
        field("item", "productCategory"),
        field("item", "productName"),
        quantity,
        price,
    )
    .ok_or_else(|| XlsxToXmlError::Xml("total overflows".to_string()))?;

    if order.total() != total {
        return Err(XlsxToXmlError::Xml(format!(
            "total {} does not equal quantity * price ({})",
            total,
            order.total()
        )));
    }

    let region = field("shipto", "region");
    if order.region() != region {
        return Err(XlsxToXmlError::Xml(format!(
            "region '{}' does not match address (expected '{}')",
            region,
            order.region()
        )));
    }

    Ok(order)
}

fn is_leaf(parent: &str, leaf: &str) -> bool {
    LEAF_ELEMENTS.contains(&(parent, leaf))
}

fn parse_decimal(text: &str, field: &str) -> Result<Decimal, XlsxToXmlError> {
    Decimal::from_str(text)
        .map_err(|e| XlsxToXmlError::Xml(format!("invalid {} '{}': {}", field, text, e)))
}
