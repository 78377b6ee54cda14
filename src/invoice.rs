//! Invoice Schema
//!
//! Record shapes for invoices and their line items, the writable form
//! projections clients submit, and the minimal client-side variant.
//!
//! Totals are never derived here; `subtotal`, `vat` and `total` come from
//! the data store as-is.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Invoice line item as persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    pub invoice_id: String,
    pub description: String,
    pub quantity: f64,
    pub price: f64,
}

/// Invoice header as persisted. Owns its items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    pub user_id: String,
    pub customer_id: String,
    pub number: String,
    pub date: NaiveDate,
    pub delivery_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_items: Option<Vec<InvoiceItem>>,
    pub subtotal: f64,
    pub vat: f64,
    pub total: f64,
    pub paid: bool,
    pub currency_exchange_rate: Option<f64>,
}

impl Invoice {
    /// Writable projection of this invoice
    pub fn to_form_data(&self) -> InvoiceFormData {
        InvoiceFormData::from(self)
    }
}

impl InvoiceItem {
    /// Writable projection of this item
    pub fn to_form_data(&self) -> InvoiceItemFormData {
        InvoiceItemFormData::from(self)
    }
}

/// Fields a client submits to create or update an invoice.
///
/// Server-assigned fields (identity, owner, audit timestamps, `total`,
/// `paid`) are not part of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceFormData {
    pub customer_id: String,
    pub number: String,
    pub date: NaiveDate,
    pub delivery_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    /// Items as new line items. They carry no ids, so changes to existing
    /// items cannot be expressed through this projection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_items: Option<Vec<InvoiceItemFormData>>,
    pub subtotal: f64,
    pub vat: f64,
    pub currency_exchange_rate: Option<f64>,
}

/// Fields a client submits for a line item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceItemFormData {
    pub description: String,
    pub quantity: f64,
    pub price: f64,
}

impl From<&InvoiceItem> for InvoiceItemFormData {
    fn from(item: &InvoiceItem) -> Self {
        Self {
            description: item.description.clone(),
            quantity: item.quantity,
            price: item.price,
        }
    }
}

impl From<&Invoice> for InvoiceFormData {
    fn from(invoice: &Invoice) -> Self {
        Self {
            customer_id: invoice.customer_id.clone(),
            number: invoice.number.clone(),
            date: invoice.date,
            delivery_date: invoice.delivery_date,
            due_date: invoice.due_date,
            invoice_items: invoice
                .invoice_items
                .as_ref()
                .map(|items| items.iter().map(InvoiceItemFormData::from).collect()),
            subtotal: invoice.subtotal,
            vat: invoice.vat,
            currency_exchange_rate: invoice.currency_exchange_rate,
        }
    }
}

// Minimal client-side variant. It only narrows the canonical records above;
// it lacks owner, tax and exchange fields, so there is no way back.

/// Line item in the minimal client shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientInvoiceItem {
    pub id: String,
    pub description: String,
    pub quantity: f64,
    pub price: f64,
}

/// Invoice in the minimal client shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientInvoice {
    pub id: String,
    pub customer_id: String,
    pub number: String,
    pub date: NaiveDate,
    pub items: Vec<ClientInvoiceItem>,
    pub total: f64,
    pub paid: bool,
}

impl From<&InvoiceItem> for ClientInvoiceItem {
    fn from(item: &InvoiceItem) -> Self {
        Self {
            id: item.id.clone(),
            description: item.description.clone(),
            quantity: item.quantity,
            price: item.price,
        }
    }
}

impl From<&Invoice> for ClientInvoice {
    fn from(invoice: &Invoice) -> Self {
        Self {
            id: invoice.id.clone(),
            customer_id: invoice.customer_id.clone(),
            number: invoice.number.clone(),
            date: invoice.date,
            items: invoice
                .invoice_items
                .as_deref()
                .unwrap_or_default()
                .iter()
                .map(ClientInvoiceItem::from)
                .collect(),
            total: invoice.total,
            paid: invoice.paid,
        }
    }
}
