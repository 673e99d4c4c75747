//! Row Classifier Module
//!
//! セルの背景色によって、その行を変換対象とするかどうかを判定するモジュール。

/// 網掛けとみなさない色（大文字・小文字を区別して比較する）
const UNSHADED_COLORS: [&str; 2] = ["FFFFFF", "000000"];

/// セルの背景色が「網掛け」かどうかを判定
///
/// # 引数
///
/// * `color` - RGB16進文字列（例: `"FFFF00"`）。背景色が未設定の場合は`None`
///
/// # 戻り値
///
/// * `false` - 未設定、空文字列、`"FFFFFF"`、`"000000"`の場合
/// * `true` - それ以外の空でない値
///
/// 比較は文字列の完全一致です。`"ffffff"`のような小文字表記は網掛けとして扱われます。
///
/// # 使用例
///
/// ```rust
/// use shiporder_xml::is_shaded;
///
/// assert!(is_shaded(Some("FFFF00")));
/// assert!(!is_shaded(Some("FFFFFF")));
/// assert!(!is_shaded(None));
/// ```
pub fn is_shaded(color: Option<&str>) -> bool {
    match color {
        None | Some("") => false,
        Some(rgb) => !UNSHADED_COLORS.contains(&rgb),
    }
}
