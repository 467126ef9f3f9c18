//! Order rows and stable order identity

use serde::{Deserialize, Serialize};

/// Spreadsheet cells that hold a formula error instead of a value.
///
/// These arrive as literal text and must be tolerated, not treated as row
/// corruption.
pub const FORMULA_ERROR_TOKENS: [&str; 6] = [
    "#ERROR!",
    "#REF!",
    "#VALUE!",
    "#NAME?",
    "#DIV/0!",
    "Formula parse error",
];

/// Whether a cell carries a spreadsheet formula error.
#[must_use]
pub fn is_formula_error(cell: &str) -> bool {
    let trimmed = cell.trim();
    FORMULA_ERROR_TOKENS
        .iter()
        .any(|token| trimmed.contains(token))
}

/// An immutable snapshot of one order-book row, taken once per poll.
///
/// All fields are raw cell text; canonicalization and parsing happen at the
/// point of use so a malformed cell never poisons the whole row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderRow {
    /// 1-based position in the sheet, header excluded
    pub row_index: u32,
    /// Explicit order identifier, possibly empty
    pub order_id: String,
    /// Customer name as entered
    pub customer_name: String,
    /// Primary phone, raw
    pub primary_phone: String,
    /// Alternate phone, raw
    pub alternate_phone: String,
    /// Product name
    pub product_name: String,
    /// Total price cell, raw
    pub total_price: String,
    /// Governorate or address
    pub governorate: String,
    /// Order status, possibly empty
    pub status: String,
    /// Order date cell, raw
    pub order_date: String,
}

impl OrderRow {
    /// Derive the stable key identifying this order across polls.
    ///
    /// Preference order: the explicit order id; a composite of name prefix,
    /// phone tail and date digits; finally a row-position fallback. The key
    /// is the primary coordinate of observation history and one of the
    /// duplicate guard's key families, so it must survive sheet edits that
    /// shuffle row positions.
    #[must_use]
    pub fn stable_key(&self) -> String {
        let order_id = self.order_id.trim();
        if !order_id.is_empty() {
            return order_id.to_string();
        }

        let name_prefix: String = self.customer_name.trim().chars().take(3).collect();
        let phone_digits: String = self
            .primary_phone
            .chars()
            .chain(self.alternate_phone.chars())
            .filter(char::is_ascii_digit)
            .collect();
        let date_digits: String = self
            .order_date
            .chars()
            .filter(char::is_ascii_digit)
            .take(6)
            .collect();

        if !name_prefix.is_empty() && phone_digits.len() >= 4 && date_digits.len() == 6 {
            let tail = &phone_digits[phone_digits.len() - 4..];
            return format!("{name_prefix}-{tail}-{date_digits}");
        }

        format!("row_{}_{name_prefix}", self.row_index)
    }

    /// Parse the total price cell, tolerating currency text and formula
    /// errors. Returns zero when nothing numeric can be recovered.
    #[must_use]
    pub fn amount(&self) -> f64 {
        let cleaned: String = self
            .total_price
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        cleaned.parse().unwrap_or(0.0)
    }
}
