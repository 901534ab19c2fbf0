//! # Layout Renderer
//!
//! Turns a [`ReceiptDocument`] and a [`TemplateConfig`] into a
//! [`VisualDocument`]. Rendering is a pure function: no I/O, no clock,
//! no randomness, so the same input always yields the same blocks.
//!
//! ## Block Order
//!
//! ```text
//! header → meta → ---- → items table → ---- → totals → payment
//!        → transaction block → tagline → ---- → policy → footer/QR
//!        → ---- → thank-you line
//! ```
//!
//! ## Example
//!
//! ```
//! use recibo::document;
//! use recibo::layout::{self, Section};
//! use recibo::template::TemplateConfig;
//!
//! let doc = document::demo_sale();
//! let view = layout::render(&doc, &TemplateConfig::default()).unwrap();
//! let order = view.section_order();
//! let totals = order.iter().position(|s| *s == Section::Totals).unwrap();
//! assert_eq!(order[totals + 1], Section::Payment);
//! ```

mod blocks;

pub use blocks::*;

use rust_decimal::Decimal;

use crate::document::{Installment, LineItem, ReceiptDocument, TransactionKind};
use crate::error::RenderError;
use crate::money::Currency;
use crate::protocol::text::Alignment;
use crate::template::{DEFAULT_COLUMNS, TemplateConfig};

/// Width of the installment progress bar, in characters
const PROGRESS_BAR_WIDTH: usize = 20;

/// Lay out a receipt.
///
/// Fails only on template problems (an unknown currency); an empty item
/// list is valid and renders the table header alone.
pub fn render(doc: &ReceiptDocument, cfg: &TemplateConfig) -> Result<VisualDocument, RenderError> {
    let currency = cfg.currency()?;
    let columns = cfg.columns.unwrap_or(DEFAULT_COLUMNS).max(1);
    let ctx = Ctx {
        doc,
        cfg,
        currency,
        columns,
    };

    let mut view = VisualDocument::new(columns);

    view.section(Section::Header, |v| ctx.header(v));
    view.section(Section::Meta, |v| ctx.meta(v));
    view.push(Block::rule(RuleStyle::Dashed));
    view.section(Section::Items, |v| ctx.items(v));
    view.push(Block::rule(RuleStyle::Dashed));
    view.section(Section::Totals, |v| ctx.totals(v));
    view.section(Section::Payment, |v| ctx.payment(v));

    match &doc.payment.installment {
        Some(plan) if plan.is_complete() => {
            view.section(Section::InstallmentComplete, |v| ctx.installment_complete(v, plan));
        }
        Some(plan) => {
            view.section(Section::InstallmentProgress, |v| ctx.installment_progress(v, plan));
        }
        None => view.section(Section::TransactionNote, |v| ctx.transaction_note(v)),
    }

    if cfg.show_tagline {
        view.section(Section::Tagline, |v| ctx.tagline(v));
    }
    view.push(Block::rule(RuleStyle::Dashed));
    if cfg.show_policy {
        view.section(Section::Policy, |v| ctx.policy(v));
    }
    view.section(Section::Footer, |v| ctx.footer(v));
    view.push(Block::rule(RuleStyle::Dashed));
    view.section(Section::ThankYou, |v| ctx.thank_you(v));

    Ok(view)
}

/// Everything a section needs, resolved once per render.
struct Ctx<'a> {
    doc: &'a ReceiptDocument,
    cfg: &'a TemplateConfig,
    currency: Currency,
    columns: usize,
}

impl Ctx<'_> {
    fn money(&self, amount: Decimal) -> String {
        self.currency.format(amount)
    }

    fn pair(&self, label: &str, value: &str) -> Block {
        Block::text(pair_line(label, value, self.columns))
    }

    fn wrapped(&self, v: &mut VisualDocument, text: &str, align: Alignment) {
        for line in wrap(text, self.columns) {
            v.push(match align {
                Alignment::Center => Block::centered(line),
                _ => Block::text(line),
            });
        }
    }

    fn header(&self, v: &mut VisualDocument) {
        let info = &self.doc.header;
        if let Some(key) = &self.cfg.logo {
            v.push(Block::ImageRef {
                source: ImageSource::Stored { key: key.clone() },
            });
        }
        v.push(Block::centered(info.name.as_str()).bold().sized(TextSize::Double));
        for line in [&info.address, &info.phone, &info.website, &info.social]
            .into_iter()
            .flatten()
        {
            self.wrapped(v, line, Alignment::Center);
        }
    }

    fn meta(&self, v: &mut VisualDocument) {
        let meta = &self.doc.meta;
        v.push(Block::centered(meta.kind.title()).bold());
        v.push(self.pair("Receipt", &meta.number));
        v.push(self.pair("Date", &meta.issued_at.format("%Y-%m-%d %H:%M").to_string()));
        if let Some(cashier) = &meta.cashier {
            v.push(self.pair("Cashier", cashier));
        }
        if let Some(customer) = &meta.customer {
            v.push(self.pair("Customer", customer));
        }
    }

    fn items(&self, v: &mut VisualDocument) {
        let rows = self
            .doc
            .lines
            .iter()
            .map(|item| vec![self.describe(item), self.money(item.total)])
            .collect();
        v.push(Block::Table {
            columns: vec![
                Column::new("ITEM", Alignment::Left),
                Column::new(self.currency.code, Alignment::Right),
            ],
            rows,
        });
    }

    /// Item description: optional category glyph, name, quantity suffix.
    fn describe(&self, item: &LineItem) -> String {
        let mut out = String::new();
        if self.cfg.show_category_glyphs {
            if let Some(initial) = item
                .category
                .as_deref()
                .and_then(|c| c.trim().chars().next())
            {
                out.push('[');
                out.extend(initial.to_uppercase());
                out.push_str("] ");
            }
        }
        out.push_str(&item.name);
        if item.quantity != Decimal::ONE {
            out.push_str(&format!(" x{}", item.quantity.normalize()));
        }
        out
    }

    fn totals(&self, v: &mut VisualDocument) {
        let t = &self.doc.totals;
        v.push(self.pair("Subtotal", &self.money(t.subtotal)));
        v.push(self.pair("Tax", &self.money(t.tax)));
        if !t.discount.is_zero() {
            v.push(self.pair("Discount", &self.currency.format_deduction(t.discount)));
        }
        if self.cfg.show_points {
            if t.points_used > 0 {
                v.push(self.pair("Points used", &t.points_used.to_string()));
            }
            if t.points_earned > 0 {
                v.push(self.pair("Points earned", &t.points_earned.to_string()));
            }
        }
        v.push(self.pair("TOTAL", &self.money(t.total)).bold().sized(TextSize::Tall));
    }

    fn payment(&self, v: &mut VisualDocument) {
        let p = &self.doc.payment;
        v.push(self.pair("Paid by", &p.method));
        v.push(self.pair("Tendered", &self.money(p.tendered)));
        if p.installment.is_none() {
            v.push(self.pair("Change", &self.money(p.change)));
        }
    }

    fn installment_progress(&self, v: &mut VisualDocument, plan: &Installment) {
        v.push(Block::rule(RuleStyle::Blank));
        v.push(self.pair("Previously paid", &self.money(plan.prior_paid)));
        v.push(self.pair("Paid today", &self.money(self.doc.amount_paid())));
        v.push(self.pair("Balance due", &self.money(plan.remaining_balance)).bold());
        if let Some(due) = plan.due_date {
            v.push(self.pair("Next payment due", &due.format("%Y-%m-%d").to_string()));
        }
        v.push(Block::centered(progress_bar(plan.progress)));
    }

    fn installment_complete(&self, v: &mut VisualDocument, plan: &Installment) {
        v.push(Block::rule(RuleStyle::Double));
        v.push(Block::centered("PAID IN FULL").bold().sized(TextSize::Double));
        v.push(self.pair(
            "Total paid",
            &self.money(plan.prior_paid + self.doc.amount_paid()),
        ));
        self.wrapped(v, "Your goods are ready for collection", Alignment::Center);
        v.push(Block::rule(RuleStyle::Double));
    }

    fn transaction_note(&self, v: &mut VisualDocument) {
        let total = self.doc.totals.total;
        match self.doc.meta.kind {
            TransactionKind::Sale
            | TransactionKind::LaybyOpen
            | TransactionKind::LaybyPayment => {}
            TransactionKind::Refund => {
                v.push(self.pair("Refunded", &self.currency.format_deduction(total)).bold());
                v.push(Block::text("Customer signature:"));
                v.push(Block::text("_".repeat(self.columns)));
            }
            TransactionKind::LaybyCancel => {
                v.push(Block::centered("Layby cancelled").bold());
                v.push(self.pair("Refunded", &self.currency.format_deduction(total)));
            }
            TransactionKind::CashDrop => {
                v.push(self.pair("Cash removed", &self.money(total)).bold());
                v.push(Block::text("Supervisor signature:"));
                v.push(Block::text("_".repeat(self.columns)));
            }
            TransactionKind::Statement => {
                v.push(self.pair("Balance", &self.money(total)).bold());
                v.push(Block::centered("This is not a tax invoice"));
            }
        }
    }

    fn tagline(&self, v: &mut VisualDocument) {
        let text = self
            .cfg
            .tagline
            .as_deref()
            .or(self.doc.header.tagline.as_deref());
        if let Some(text) = text {
            self.wrapped(v, text, Alignment::Center);
        }
    }

    fn policy(&self, v: &mut VisualDocument) {
        let policy = &self.doc.policy;
        if let Some(primary) = &policy.primary {
            self.wrapped(v, primary, Alignment::Left);
        }
        if let Some(secondary) = &policy.secondary {
            if policy.primary.is_some() {
                v.push(Block::rule(RuleStyle::Blank));
            }
            self.wrapped(v, secondary, Alignment::Left);
        }
    }

    fn footer(&self, v: &mut VisualDocument) {
        let footer = &self.doc.footer;
        if let Some(promo) = &footer.promo {
            self.wrapped(v, promo, Alignment::Center);
        }
        if self.cfg.show_qr {
            if let Some(payload) = &footer.contact_qr {
                v.push(Block::QrBlock {
                    payload: payload.clone(),
                });
            }
        }
    }

    fn thank_you(&self, v: &mut VisualDocument) {
        let line = self.doc.footer.thank_you.as_deref().unwrap_or("THANK YOU");
        v.push(Block::centered(line).bold());
    }
}

/// `[##########----------] 50%`
fn progress_bar(progress: f32) -> String {
    let fraction = if progress.is_finite() {
        progress.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let filled = (fraction * PROGRESS_BAR_WIDTH as f32).round() as usize;
    format!(
        "[{}{}] {}%",
        "#".repeat(filled),
        "-".repeat(PROGRESS_BAR_WIDTH - filled),
        (fraction * 100.0).round() as u32
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{self, Installment};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn text_of(blocks: &[Block]) -> Vec<String> {
        blocks
            .iter()
            .filter_map(|b| match b {
                Block::TextLine { content, .. } => Some(content.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_section_order_for_sale() {
        let view = render(&document::demo_sale(), &TemplateConfig::default()).unwrap();
        assert_eq!(
            view.section_order(),
            vec![
                Section::Header,
                Section::Meta,
                Section::Items,
                Section::Totals,
                Section::Payment,
                Section::Tagline,
                Section::Policy,
                Section::Footer,
                Section::ThankYou,
            ]
        );
    }

    #[test]
    fn test_dividers_between_sections() {
        let view = render(&document::demo_sale(), &TemplateConfig::default()).unwrap();
        let meta_end = view.sections[1].1.end;
        assert_eq!(view.blocks[meta_end], Block::rule(RuleStyle::Dashed));
        let items_end = view.sections[2].1.end;
        assert_eq!(view.blocks[items_end], Block::rule(RuleStyle::Dashed));
        let thank_you_start = view.sections.last().unwrap().1.start;
        assert_eq!(view.blocks[thank_you_start - 1], Block::rule(RuleStyle::Dashed));
    }

    #[test]
    fn test_item_table_has_two_columns() {
        let cfg = TemplateConfig {
            show_category_glyphs: true,
            ..Default::default()
        };
        let view = render(&document::demo_sale(), &cfg).unwrap();
        let Block::Table { columns, rows } = &view.section_blocks(Section::Items)[0] else {
            panic!("items section must start with a table");
        };
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[1].align, Alignment::Right);
        assert_eq!(rows[0], vec!["[G] Espresso Beans 1kg".to_string(), "$45.00".to_string()]);
        assert_eq!(rows[1], vec!["[O] Thermal Paper Roll x3".to_string(), "$37.50".to_string()]);
    }

    #[test]
    fn test_empty_lines_render_header_only() {
        let mut doc = document::demo_sale();
        doc.lines.clear();
        let view = render(&doc, &TemplateConfig::default()).unwrap();
        let items = view.section_blocks(Section::Items);
        assert_eq!(items.len(), 1);
        assert!(matches!(&items[0], Block::Table { rows, columns } if rows.is_empty() && columns.len() == 2));
    }

    #[test]
    fn test_discount_is_negative() {
        let mut doc = document::demo_sale();
        doc.totals.discount = Decimal::new(200, 2);
        let view = render(&doc, &TemplateConfig::default()).unwrap();
        let lines = text_of(view.section_blocks(Section::Totals));
        let discount = lines.iter().find(|l| l.starts_with("Discount")).unwrap();
        assert!(discount.ends_with("-$2.00"));
        assert!(!discount.contains('('));
    }

    #[test]
    fn test_points_follow_template() {
        let doc = document::demo_sale();
        let shown = render(&doc, &TemplateConfig::default()).unwrap();
        assert!(text_of(shown.section_blocks(Section::Totals))
            .iter()
            .any(|l| l.starts_with("Points earned")));

        let cfg = TemplateConfig {
            show_points: false,
            ..Default::default()
        };
        let hidden = render(&doc, &cfg).unwrap();
        assert!(!text_of(hidden.section_blocks(Section::Totals))
            .iter()
            .any(|l| l.starts_with("Points")));
    }

    #[test]
    fn test_optional_sections_follow_template() {
        let cfg = TemplateConfig {
            show_policy: false,
            show_qr: false,
            show_tagline: false,
            ..Default::default()
        };
        let view = render(&document::demo_sale(), &cfg).unwrap();
        let order = view.section_order();
        assert!(!order.contains(&Section::Policy));
        assert!(!order.contains(&Section::Tagline));
        assert!(!view.blocks.iter().any(|b| matches!(b, Block::QrBlock { .. })));
        // promo text stays in the footer
        assert!(order.contains(&Section::Footer));
    }

    #[test]
    fn test_logo_leads_header() {
        let cfg = TemplateConfig {
            logo: Some("A1".into()),
            ..Default::default()
        };
        let view = render(&document::demo_sale(), &cfg).unwrap();
        assert_eq!(
            view.blocks[0],
            Block::ImageRef {
                source: ImageSource::Stored { key: "A1".into() }
            }
        );
    }

    #[test]
    fn test_progress_block_for_open_installment() {
        let mut doc = document::demo_layby_completed();
        doc.payment.installment = Some(Installment {
            prior_paid: Decimal::new(2000, 2),
            remaining_balance: Decimal::new(6000, 2),
            due_date: NaiveDate::from_ymd_opt(2026, 2, 20),
            progress: 0.5,
        });
        let view = render(&doc, &TemplateConfig::default()).unwrap();
        assert!(view.section_order().contains(&Section::InstallmentProgress));
        let lines = text_of(view.section_blocks(Section::InstallmentProgress));
        assert!(lines.contains(&format!("[{}{}] 50%", "#".repeat(10), "-".repeat(10))));
        assert!(lines.iter().any(|l| l.ends_with("2026-02-20")));
    }

    #[test]
    fn test_completion_block_for_zero_balance() {
        let view = render(&document::demo_layby_completed(), &TemplateConfig::default()).unwrap();
        let order = view.section_order();
        assert!(order.contains(&Section::InstallmentComplete));
        assert!(!order.contains(&Section::InstallmentProgress));
        let lines = text_of(view.section_blocks(Section::InstallmentComplete));
        assert!(lines.contains(&"PAID IN FULL".to_string()));
        assert!(lines.iter().any(|l| l.starts_with("Total paid") && l.ends_with("$109.83")));
    }

    #[test]
    fn test_refund_note() {
        let mut doc = document::demo_sale();
        doc.meta.kind = TransactionKind::Refund;
        let view = render(&doc, &TemplateConfig::default()).unwrap();
        let lines = text_of(view.section_blocks(Section::TransactionNote));
        assert!(lines[0].ends_with("-$109.83"));
    }

    #[test]
    fn test_unknown_currency_fails() {
        let cfg = TemplateConfig {
            currency: "XYZ".into(),
            ..Default::default()
        };
        assert_eq!(
            render(&document::demo_sale(), &cfg),
            Err(RenderError::UnknownCurrency("XYZ".into()))
        );
    }

    #[test]
    fn test_lines_respect_columns() {
        let cfg = TemplateConfig {
            columns: Some(32),
            ..Default::default()
        };
        let view = render(&document::demo_sale(), &cfg).unwrap();
        for line in text_of(&view.blocks) {
            assert!(char_len(&line) <= 32, "line too wide: {line:?}");
        }
    }

    #[test]
    fn test_progress_bar_clamps() {
        assert_eq!(progress_bar(1.7), format!("[{}] 100%", "#".repeat(20)));
        assert_eq!(progress_bar(f32::NAN), format!("[{}] 0%", "-".repeat(20)));
    }
}
