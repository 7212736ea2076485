//! Order summary

use std::{fmt::Write, io};

use decimal_percentage::Percentage;
use tabled::{
    builder::Builder,
    grid::config::HorizontalLine,
    settings::{
        Alignment, Color, Style, Theme,
        object::{Columns, Rows},
    },
};
use thiserror::Error;

use crate::{
    cart::Cart,
    discounts::whole_percent_points,
    listings::Listing,
    prices::{Price, format_price},
    pricing::{PricingError, Totals},
};

/// Errors that can occur when building or printing a summary.
#[derive(Debug, Error)]
pub enum ReceiptError {
    /// Totals could not be calculated.
    #[error(transparent)]
    Pricing(#[from] PricingError),

    /// IO error
    #[error("IO error")]
    IO,
}

#[derive(Debug, Clone, PartialEq)]
struct SummaryLine {
    title: String,
    quantity: String,
    location: String,
    price: Price,
}

/// Checkout order summary: one row per cart line followed by the totals.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSummary {
    lines: Vec<SummaryLine>,
    totals: Totals,
}

impl OrderSummary {
    /// Build a summary from lines and their totals.
    pub fn new(items: &[Listing], totals: Totals) -> Self {
        let lines = items
            .iter()
            .map(|item| SummaryLine {
                title: item.title.clone(),
                quantity: item.quantity.to_string(),
                location: item.location.to_string(),
                price: item.asking_price,
            })
            .collect();

        Self { lines, totals }
    }

    /// Build a summary for the active lines of `cart`.
    ///
    /// # Errors
    ///
    /// Returns an error if the totals cannot be calculated.
    pub fn from_cart(cart: &Cart, tax_rate: Percentage) -> Result<Self, ReceiptError> {
        Ok(Self::new(cart.items(), cart.totals(tax_rate)?))
    }

    /// Totals shown at the bottom.
    pub fn totals(&self) -> &Totals {
        &self.totals
    }

    /// Number of item rows.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the summary has no item rows.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// `Discount (5%)`, or `None` when nothing is taken off.
    pub fn discount_label(&self) -> Option<String> {
        self.totals.has_discount().then(|| {
            format!(
                "Discount ({}%)",
                whole_percent_points(self.totals.discount_rate()).normalize()
            )
        })
    }

    /// `VAT (16%)`.
    pub fn tax_label(&self) -> String {
        format!(
            "VAT ({}%)",
            whole_percent_points(self.totals.tax_rate()).normalize()
        )
    }

    /// Prints the summary.
    ///
    /// # Errors
    ///
    /// Returns an error if the summary cannot be written.
    pub fn write_to(&self, mut out: impl io::Write) -> Result<(), ReceiptError> {
        let mut builder = Builder::default();

        builder.push_record(["", "Item", "Quantity", "Location", "Price"]);

        for (i, line) in self.lines.iter().enumerate() {
            builder.push_record([
                format!("#{}", i + 1),
                line.title.clone(),
                line.quantity.clone(),
                line.location.clone(),
                format_price(&line.price),
            ]);
        }

        write_summary_table(&mut out, builder)?;
        write_totals(&mut out, self)
    }
}

fn write_summary_table(out: &mut impl io::Write, builder: Builder) -> Result<(), ReceiptError> {
    let mut table = builder.build();
    let mut theme = Theme::from(Style::modern_rounded());

    theme.remove_horizontal_lines();
    theme.insert_horizontal_line(
        1,
        HorizontalLine::new(Some('─'), Some('┼'), Some('├'), Some('┤')),
    );

    table.with(theme);
    table.modify(Rows::first(), Color::BOLD);
    table.modify(Columns::new(4..5), Alignment::right());

    let table_str = colorize_borders(&table.to_string());

    writeln!(out, "\n{table_str}").map_err(|_err| ReceiptError::IO)
}

fn write_totals(out: &mut impl io::Write, summary: &OrderSummary) -> Result<(), ReceiptError> {
    let totals = summary.totals();

    let mut rows = vec![(" Subtotal:".to_string(), format!("{}  ", format_price(&totals.subtotal())))];

    if let Some(label) = summary.discount_label() {
        rows.push((
            format!(" {label}:"),
            format!("-{}  ", format_price(&totals.discount())),
        ));
    }

    rows.push((
        format!(" {}:", summary.tax_label()),
        format!("{}  ", format_price(&totals.tax())),
    ));

    rows.push((
        " \x1b[1mTotal:\x1b[0m".to_string(),
        format!("\x1b[1m{}  \x1b[0m", format_price(&totals.total())),
    ));

    let label_width = rows
        .iter()
        .map(|(label, _)| visible_width(label))
        .max()
        .unwrap_or_default();

    let value_width = rows
        .iter()
        .map(|(_, value)| visible_width(value))
        .max()
        .unwrap_or_default();

    for (label, value) in &rows {
        write_summary_line(out, label, value, label_width, value_width)?;
    }

    writeln!(out).map_err(|_err| ReceiptError::IO)
}

/// Wraps runs of box-drawing characters (U+2500..U+257F) in dark-grey escapes.
fn colorize_borders(table: &str) -> String {
    let mut out = String::with_capacity(table.len() + 256);
    let mut in_run = false;

    for ch in table.chars() {
        let box_char = ('\u{2500}'..='\u{257F}').contains(&ch);

        if box_char && !in_run {
            _ = out.write_str("\x1b[90m");
            in_run = true;
        } else if !box_char && in_run {
            _ = out.write_str("\x1b[0m");
            in_run = false;
        }

        out.push(ch);
    }

    if in_run {
        _ = out.write_str("\x1b[0m");
    }

    out
}

/// Returns the visible (non-ANSI) width of a string.
fn visible_width(s: &str) -> usize {
    let mut width = 0usize;
    let mut in_escape = false;

    for ch in s.chars() {
        if in_escape {
            if ch.is_ascii_alphabetic() {
                in_escape = false;
            }
        } else if ch == '\x1b' {
            in_escape = true;
        } else {
            width += 1;
        }
    }

    width
}

fn write_summary_line(
    out: &mut impl io::Write,
    label: &str,
    value: &str,
    label_col_width: usize,
    value_col_width: usize,
) -> Result<(), ReceiptError> {
    let label_pad = label_col_width.saturating_sub(visible_width(label));
    let value_pad = value_col_width.saturating_sub(visible_width(value));

    writeln!(
        out,
        "{:>label_pad$}{label}  {value_pad}{value}",
        "",
        value_pad = " ".repeat(value_pad)
    )
    .map_err(|_err| ReceiptError::IO)
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use rusty_money::iso::KES;
    use testresult::TestResult;

    use crate::{listings::glass_bottles, promotions::PromoTable};

    use super::*;

    fn vat() -> Percentage {
        Percentage::from(Decimal::new(16, 2))
    }

    fn render(summary: &OrderSummary) -> Result<String, Box<dyn std::error::Error>> {
        let mut out = Vec::new();

        summary.write_to(&mut out)?;

        Ok(String::from_utf8(out)?)
    }

    #[test]
    fn labels_use_whole_percent_points() -> TestResult {
        let mut cart = Cart::with_items([glass_bottles()], KES)?;

        cart.apply_promo(&PromoTable::default(), "WASTE10")?;

        let summary = OrderSummary::from_cart(&cart, vat())?;

        assert_eq!(summary.discount_label().as_deref(), Some("Discount (100%)"));
        assert_eq!(summary.tax_label(), "VAT (16%)");

        Ok(())
    }

    #[test]
    fn no_discount_line_without_promo() -> TestResult {
        let cart = Cart::with_items([glass_bottles()], KES)?;

        let summary = OrderSummary::from_cart(&cart, vat())?;
        let printed = render(&summary)?;

        assert!(summary.discount_label().is_none());
        assert!(!printed.contains("Discount"));
        assert!(printed.contains("22620.00 KES"));

        Ok(())
    }

    #[test]
    fn printed_summary_lists_items_and_totals() -> TestResult {
        let mut cart = Cart::with_items([glass_bottles()], KES)?;

        cart.apply_promo(&PromoTable::default(), "RECYCLE5")?;

        let summary = OrderSummary::from_cart(&cart, vat())?;
        let printed = render(&summary)?;

        assert_eq!(summary.len(), 1);
        assert!(printed.contains("Glass Bottles - Mixed"));
        assert!(printed.contains("500 kg"));
        assert!(printed.contains("Thika, Kenya"));
        assert!(printed.contains("Discount (5%):"));
        assert!(printed.contains("-975.00 KES"));
        assert!(printed.contains("VAT (16%):"));
        assert!(printed.contains("2964.00 KES"));
        assert!(printed.contains("21489.00 KES"));

        Ok(())
    }

    #[test]
    fn visible_width_ignores_escapes() {
        assert_eq!(visible_width("\x1b[1mTotal:\x1b[0m"), 6);
    }
}
