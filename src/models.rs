// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const DEFAULT_BILLING_INCREMENT_MINUTES: u32 = 15;
pub const DEFAULT_MINIMUM_BILLING_MINUTES: u32 = 0;
pub const DEFAULT_PAYMENT_TERMS_DAYS: u32 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub default_rate: Option<Decimal>,
}

/// A rate with no category is the project default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourlyRate {
    pub id: i64,
    pub category: Option<Category>,
    pub rate: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeEntry {
    pub id: i64,
    pub minutes: u32,
    pub category: Option<Category>,
    pub ticket_id: Option<i64>,
    pub description: String,
    pub created_at: NaiveDate,
    pub invoice_id: Option<i64>, // set once billed
}

impl TimeEntry {
    pub fn is_billed(&self) -> bool {
        self.invoice_id.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceSettings {
    pub default_hourly_rate: Option<Decimal>,
    pub billing_increment_minutes: u32,
    pub minimum_billing_minutes: u32,
    pub payment_terms_days: u32,
}

impl Default for InvoiceSettings {
    fn default() -> Self {
        InvoiceSettings {
            default_hourly_rate: None,
            billing_increment_minutes: DEFAULT_BILLING_INCREMENT_MINUTES,
            minimum_billing_minutes: DEFAULT_MINIMUM_BILLING_MINUTES,
            payment_terms_days: DEFAULT_PAYMENT_TERMS_DAYS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomLineItem {
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

/// Invoice being composed; nothing is persisted until `invoice create`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceDraft {
    pub selected_time_entry_ids: BTreeSet<i64>,
    pub custom_line_items: Vec<CustomLineItem>,
    pub discount_amount: Decimal,
    pub credit_amount: Decimal,
    pub tax_rate: Decimal, // percent, 0..=100
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceTotals {
    pub subtotal: Decimal,
    pub adjusted_subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: i64,
    pub number: String,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub credit_amount: Decimal,
    pub adjusted_subtotal: Decimal,
    pub tax_rate: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub amount: Decimal,
    pub time_entry_id: Option<i64>,
}
