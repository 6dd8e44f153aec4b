//! Read model of an order at checkout and the provider start request derived
//! from it.

use super::status::Money;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Address {
    pub given_name: String,
    pub family_name: String,
    pub organization: Option<String>,
    pub line1: String,
    pub line2: String,
    pub postal_code: String,
    pub locality: String,
    pub country_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub email: String,
    pub billing: Address,
    /// Only set when the order ships to exactly one destination.
    pub shipping: Option<Address>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: String,
    pub title: String,
    pub unit_price: Decimal,
    pub quantity: Decimal,
    /// Tax rate as a fraction, e.g. `0.21`.
    pub tax_rate: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingCharge {
    pub label: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub order_number: String,
    pub ip_address: Option<String>,
    pub customer: CustomerInfo,
    pub items: Vec<OrderItem>,
    pub shipping: Vec<ShippingCharge>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineItemKind {
    Article,
    Shipping,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: String,
    pub name: String,
    pub price: Decimal,
    pub quantity: Decimal,
    pub vat_percentage: Decimal,
    pub kind: LineItemKind,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StreetAddress {
    pub street_name: String,
    pub house_number: String,
    pub zip_code: String,
    pub city: String,
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndUser {
    pub initials: String,
    pub last_name: String,
    pub email: String,
    pub company: Option<String>,
    pub invoice_address: StreetAddress,
    pub shipping_address: Option<StreetAddress>,
}

/// Everything the provider needs to open an offsite transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartRequest {
    pub amount: Money,
    pub return_url: String,
    pub notify_url: String,
    pub order_number: String,
    pub description: String,
    pub ip_address: Option<String>,
    pub end_user: EndUser,
    pub line_items: Vec<LineItem>,
    pub payment_method: Option<String>,
    pub test_mode: bool,
}

/// Result of a successful transaction start.
#[derive(Debug, Clone, PartialEq)]
pub struct StartedTransaction {
    pub remote_id: String,
    pub redirect_url: String,
}

const MAX_INITIALS_LEN: usize = 10;

fn vat_percentage(item: &OrderItem) -> Decimal {
    item.tax_rate
        .map(|rate| rate * Decimal::ONE_HUNDRED)
        .unwrap_or(Decimal::ZERO)
}

/// Builds the provider line items for an order.
///
/// One article line per order item, then each order-level shipping charge
/// exactly once, taxed at the highest VAT percentage found on the items.
pub fn build_line_items(summary: &OrderSummary) -> Vec<LineItem> {
    let mut lines = Vec::with_capacity(summary.items.len() + summary.shipping.len());
    let mut highest_vat = Decimal::ZERO;

    for item in &summary.items {
        let vat = vat_percentage(item);
        if vat > highest_vat {
            highest_vat = vat;
        }
        lines.push(LineItem {
            id: item.product_id.clone(),
            name: item.title.clone(),
            price: item.unit_price,
            quantity: item.quantity,
            vat_percentage: vat,
            kind: LineItemKind::Article,
        });
    }

    for charge in &summary.shipping {
        lines.push(LineItem {
            id: "shipping".to_string(),
            name: charge.label.clone(),
            price: charge.amount,
            quantity: Decimal::ONE,
            vat_percentage: highest_vat,
            kind: LineItemKind::Shipping,
        });
    }

    lines
}

/// Splits a single address line into street name and house number.
///
/// The house number starts at the last whitespace-separated token that
/// begins with a digit, so "Kerkstraat 12 B" yields ("Kerkstraat", "12 B").
pub fn split_address(address: &str) -> (String, String) {
    let tokens: Vec<&str> = address.split_whitespace().collect();
    let split_at = tokens
        .iter()
        .rposition(|t| t.starts_with(|c: char| c.is_ascii_digit()))
        .filter(|&idx| idx > 0);

    match split_at {
        Some(idx) => (tokens[..idx].join(" "), tokens[idx..].join(" ")),
        None => (tokens.join(" "), String::new()),
    }
}

fn street_address(address: &Address) -> StreetAddress {
    let joined = format!("{} {}", address.line1, address.line2);
    let (street_name, house_number) = split_address(joined.trim());
    StreetAddress {
        street_name,
        house_number,
        zip_code: address.postal_code.clone(),
        city: address.locality.clone(),
        country: address.country_code.clone(),
    }
}

fn initials(given_name: &str) -> String {
    given_name.chars().take(MAX_INITIALS_LEN).collect()
}

/// Builds the end-user block: names come from the shipping address when
/// the order has one, otherwise from the billing address.
pub fn build_end_user(customer: &CustomerInfo) -> EndUser {
    let name_source = customer.shipping.as_ref().unwrap_or(&customer.billing);
    EndUser {
        initials: initials(&name_source.given_name),
        last_name: name_source.family_name.clone(),
        email: customer.email.clone(),
        company: customer
            .billing
            .organization
            .clone()
            .filter(|o| !o.trim().is_empty()),
        invoice_address: street_address(&customer.billing),
        shipping_address: customer.shipping.as_ref().map(street_address),
    }
}
