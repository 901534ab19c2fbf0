//! # Money Formatting
//!
//! Receipt amounts are carried as [`Decimal`] values and printed with
//! exactly two fraction digits. Negative amounts (discounts, refunds,
//! deductions) get a leading minus sign in front of the symbol:
//!
//! ```text
//! 12.5    →  $12.50
//! -2      →  -$2.00
//! 0.125   →  $0.13   (half away from zero)
//! ```
//!
//! ## Example
//!
//! ```
//! use recibo::money::Currency;
//! use rust_decimal::Decimal;
//!
//! let usd = Currency::by_code("USD").unwrap();
//! assert_eq!(usd.format(Decimal::new(-250, 2)), "-$2.50");
//! ```

use rust_decimal::{Decimal, RoundingStrategy};

/// Where the currency symbol goes relative to the number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SymbolPlacement {
    #[default]
    Prefix,
    /// Separated from the number by one space (`12.50 €`)
    Suffix,
}

/// A currency and how its amounts are written on paper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Currency {
    pub code: &'static str,
    pub symbol: &'static str,
    pub placement: SymbolPlacement,
}

impl Currency {
    pub const USD: Self = Self::prefix("USD", "$");
    pub const AUD: Self = Self::prefix("AUD", "$");
    pub const NZD: Self = Self::prefix("NZD", "$");
    pub const GBP: Self = Self::prefix("GBP", "\u{a3}");
    pub const JPY: Self = Self::prefix("JPY", "\u{a5}");
    pub const ZAR: Self = Self::prefix("ZAR", "R");
    pub const EUR: Self = Self {
        code: "EUR",
        symbol: "\u{20ac}",
        placement: SymbolPlacement::Suffix,
    };

    const fn prefix(code: &'static str, symbol: &'static str) -> Self {
        Self {
            code,
            symbol,
            placement: SymbolPlacement::Prefix,
        }
    }

    /// All built-in currencies.
    pub fn built_in() -> &'static [Currency] {
        &[
            Self::USD,
            Self::EUR,
            Self::GBP,
            Self::ZAR,
            Self::AUD,
            Self::NZD,
            Self::JPY,
        ]
    }

    /// Look up a currency by ISO 4217 code (case-insensitive).
    pub fn by_code(code: &str) -> Option<Currency> {
        Self::built_in()
            .iter()
            .find(|c| c.code.eq_ignore_ascii_case(code.trim()))
            .copied()
    }

    /// Format an amount with two fraction digits and this currency's symbol.
    pub fn format(&self, amount: Decimal) -> String {
        let number = two_places(amount.abs());
        let sign = if is_negative(amount) { "-" } else { "" };
        match self.placement {
            SymbolPlacement::Prefix => format!("{sign}{}{number}", self.symbol),
            SymbolPlacement::Suffix => format!("{sign}{number} {}", self.symbol),
        }
    }

    /// Format an amount that is always a deduction (`-$2.00`), whatever its sign.
    pub fn format_deduction(&self, amount: Decimal) -> String {
        self.format(-amount.abs())
    }
}

impl Default for Currency {
    fn default() -> Self {
        Self::USD
    }
}

/// Round half away from zero to two places and render with exactly two digits.
fn two_places(amount: Decimal) -> String {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded.to_string()
}

/// True when the amount is still negative after rounding to cents.
fn is_negative(amount: Decimal) -> bool {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.is_sign_negative() && !rounded.is_zero()
}
