//! # Receipt Document Model
//!
//! An immutable, structured description of one receipt. Documents are
//! built by the surrounding application after it has validated the
//! transaction; this crate only lays them out and prints them.
//!
//! Documents deserialize from JSON:
//!
//! ```
//! use recibo::document::{ReceiptDocument, TransactionKind};
//!
//! let json = r#"{
//!     "header": { "name": "CORNER STORE" },
//!     "meta": { "number": "R-0001", "issued_at": "2026-03-01T10:15:00", "kind": "sale" },
//!     "lines": [
//!         { "name": "Coffee", "quantity": 2, "unit_price": "3.50", "total": "7.00" }
//!     ],
//!     "totals": { "subtotal": "7.00", "tax": "0.00", "total": "7.00" },
//!     "payment": { "method": "Cash", "tendered": "10.00", "change": "3.00" }
//! }"#;
//!
//! let doc: ReceiptDocument = serde_json::from_str(json).unwrap();
//! assert_eq!(doc.meta.kind, TransactionKind::Sale);
//! assert!(doc.check().is_ok());
//! ```

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::DocumentError;

/// One receipt, as handed over by the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptDocument {
    pub header: BusinessInfo,
    pub meta: ReceiptMeta,
    #[serde(default)]
    pub lines: Vec<LineItem>,
    pub totals: TotalsBlock,
    pub payment: PaymentBlock,
    #[serde(default)]
    pub policy: PolicyText,
    #[serde(default)]
    pub footer: FooterBlock,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BusinessInfo {
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub social: Option<String>,
    #[serde(default)]
    pub tagline: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptMeta {
    pub number: String,
    pub issued_at: NaiveDateTime,
    #[serde(default)]
    pub cashier: Option<String>,
    #[serde(default)]
    pub customer: Option<String>,
    pub kind: TransactionKind,
}

/// What kind of transaction the receipt records.
///
/// Decided once when the document is built; the renderer matches on it
/// to pick the title and the transaction-specific block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Sale,
    /// First payment on a layby (installment) purchase
    LaybyOpen,
    /// Subsequent installment payment
    LaybyPayment,
    LaybyCancel,
    Refund,
    CashDrop,
    Statement,
}

impl TransactionKind {
    /// Receipt title printed under the business header.
    pub fn title(self) -> &'static str {
        match self {
            TransactionKind::Sale => "TAX INVOICE",
            TransactionKind::LaybyOpen => "LAYBY AGREEMENT",
            TransactionKind::LaybyPayment => "LAYBY PAYMENT",
            TransactionKind::LaybyCancel => "LAYBY CANCELLED",
            TransactionKind::Refund => "REFUND",
            TransactionKind::CashDrop => "CASH DROP",
            TransactionKind::Statement => "STATEMENT",
        }
    }

    /// Installment transactions carry balance and progress fields.
    pub fn is_installment(self) -> bool {
        matches!(self, TransactionKind::LaybyOpen | TransactionKind::LaybyPayment)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub total: Decimal,
    /// Free-form category tag; the renderer may show its initial as a glyph
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TotalsBlock {
    pub subtotal: Decimal,
    pub tax: Decimal,
    #[serde(default)]
    pub discount: Decimal,
    pub total: Decimal,
    #[serde(default)]
    pub points_used: u32,
    #[serde(default)]
    pub points_earned: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentBlock {
    pub method: String,
    pub tendered: Decimal,
    #[serde(default)]
    pub change: Decimal,
    /// Present for layby/hire-purchase style transactions
    #[serde(default)]
    pub installment: Option<Installment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Installment {
    /// Paid on earlier receipts
    pub prior_paid: Decimal,
    pub remaining_balance: Decimal,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    /// Share of the purchase price paid so far, 0.0 to 1.0
    pub progress: f32,
}

impl Installment {
    pub fn is_complete(&self) -> bool {
        self.remaining_balance.is_zero()
    }
}

/// Policy paragraphs, optionally in a second language.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PolicyText {
    #[serde(default)]
    pub primary: Option<String>,
    #[serde(default)]
    pub secondary: Option<String>,
}

impl PolicyText {
    pub fn is_empty(&self) -> bool {
        self.primary.is_none() && self.secondary.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FooterBlock {
    #[serde(default)]
    pub promo: Option<String>,
    /// Payload for the contact QR code
    #[serde(default)]
    pub contact_qr: Option<String>,
    #[serde(default)]
    pub thank_you: Option<String>,
}

impl ReceiptDocument {
    /// Check the money invariants the renderer relies on.
    ///
    /// - `total == subtotal + tax - discount`
    /// - `change == tendered - total` for immediate (non-installment) payments
    pub fn check(&self) -> Result<(), DocumentError> {
        let t = &self.totals;
        let expected = t.subtotal + t.tax - t.discount;
        if expected != t.total {
            return Err(DocumentError::TotalsMismatch {
                expected,
                actual: t.total,
            });
        }

        if self.payment.installment.is_none() && !self.meta.kind.is_installment() {
            let expected = self.payment.tendered - t.total;
            if expected != self.payment.change {
                return Err(DocumentError::ChangeMismatch {
                    expected,
                    actual: self.payment.change,
                });
            }
        }

        Ok(())
    }

    /// Amount taken on this receipt (tendered minus change given back).
    pub fn amount_paid(&self) -> Decimal {
        self.payment.tendered - self.payment.change
    }
}

// ============================================================================
// DEMO DOCUMENTS
// ============================================================================

/// A small cash sale: 95.50 + 14.33 tax = 109.83, paid with 110.00.
pub fn demo_sale() -> ReceiptDocument {
    let dec = |units: i64| Decimal::new(units, 2);
    ReceiptDocument {
        header: BusinessInfo {
            name: "CHURRA MART".into(),
            address: Some("12 Harbour Road, Cape Town".into()),
            phone: Some("+27 21 555 0100".into()),
            website: Some("churra.example".into()),
            social: Some("@churramart".into()),
            tagline: Some("Fresh every morning".into()),
        },
        meta: ReceiptMeta {
            number: "R-2026-0001".into(),
            issued_at: NaiveDate::from_ymd_opt(2026, 1, 20)
                .and_then(|d| d.and_hms_opt(12, 0, 0))
                .unwrap_or_default(),
            cashier: Some("Ana".into()),
            customer: None,
            kind: TransactionKind::Sale,
        },
        lines: vec![
            LineItem {
                name: "Espresso Beans 1kg".into(),
                quantity: Decimal::ONE,
                unit_price: dec(4500),
                total: dec(4500),
                category: Some("grocery".into()),
            },
            LineItem {
                name: "Thermal Paper Roll".into(),
                quantity: Decimal::from(3),
                unit_price: dec(1250),
                total: dec(3750),
                category: Some("office".into()),
            },
            LineItem {
                name: "Oat Milk".into(),
                quantity: Decimal::from(2),
                unit_price: dec(650),
                total: dec(1300),
                category: Some("grocery".into()),
            },
        ],
        totals: TotalsBlock {
            subtotal: dec(9550),
            tax: dec(1433),
            discount: Decimal::ZERO,
            total: dec(10983),
            points_used: 0,
            points_earned: 109,
        },
        payment: PaymentBlock {
            method: "Cash".into(),
            tendered: dec(11000),
            change: dec(17),
            installment: None,
        },
        policy: PolicyText {
            primary: Some("Returns accepted within 30 days with this receipt.".into()),
            secondary: Some("Terugsendings binne 30 dae met hierdie kwitansie.".into()),
        },
        footer: FooterBlock {
            promo: Some("10% off coffee every Tuesday".into()),
            contact_qr: Some("https://churra.example/contact".into()),
            thank_you: Some("THANK YOU, COME AGAIN".into()),
        },
    }
}

/// The final payment on a layby: the balance reaches zero.
pub fn demo_layby_completed() -> ReceiptDocument {
    let dec = |units: i64| Decimal::new(units, 2);
    let mut doc = demo_sale();
    doc.meta.number = "L-2026-0042".into();
    doc.meta.kind = TransactionKind::LaybyPayment;
    doc.meta.customer = Some("J. Mokoena".into());
    doc.payment = PaymentBlock {
        method: "Card".into(),
        tendered: dec(2983),
        change: Decimal::ZERO,
        installment: Some(Installment {
            prior_paid: dec(8000),
            remaining_balance: Decimal::ZERO,
            due_date: None,
            progress: 1.0,
        }),
    };
    doc.policy = PolicyText {
        primary: Some("Layby goods are released once paid in full.".into()),
        secondary: None,
    };
    doc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_sale_is_consistent() {
        let doc = demo_sale();
        assert!(doc.check().is_ok());
        assert_eq!(doc.payment.change, Decimal::new(17, 2));
        assert_eq!(doc.amount_paid(), Decimal::new(10983, 2));
    }

    #[test]
    fn test_totals_mismatch_detected() {
        let mut doc = demo_sale();
        doc.totals.total = Decimal::new(10000, 2);
        assert_eq!(
            doc.check(),
            Err(DocumentError::TotalsMismatch {
                expected: Decimal::new(10983, 2),
                actual: Decimal::new(10000, 2),
            })
        );
    }

    #[test]
    fn test_change_mismatch_detected() {
        let mut doc = demo_sale();
        doc.payment.change = Decimal::ZERO;
        assert!(matches!(
            doc.check(),
            Err(DocumentError::ChangeMismatch { .. })
        ));
    }

    #[test]
    fn test_installment_skips_change_check() {
        let doc = demo_layby_completed();
        assert!(doc.check().is_ok());
        assert!(doc.payment.installment.as_ref().unwrap().is_complete());
    }

    #[test]
    fn test_kind_serde_names() {
        let kind: TransactionKind = serde_json::from_str("\"layby_payment\"").unwrap();
        assert_eq!(kind, TransactionKind::LaybyPayment);
        assert!(kind.is_installment());
        assert!(!TransactionKind::Refund.is_installment());
        assert_eq!(
            serde_json::to_string(&TransactionKind::CashDrop).unwrap(),
            "\"cash_drop\""
        );
    }

    #[test]
    fn test_json_round_trip_keeps_amounts() {
        let doc = demo_sale();
        let json = serde_json::to_string(&doc).unwrap();
        let back: ReceiptDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(back, doc);
    }
}
