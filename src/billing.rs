// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Billing arithmetic: increment rounding of worked time, hourly rate
//! resolution and invoice totals. Everything here is a pure function of its
//! arguments and works in `Decimal`; rounding to cents only happens in
//! [`InvoiceTotals::to_cents`] when figures are persisted.

use crate::error::BillingError;
use crate::models::{
    CustomLineItem, HourlyRate, InvoiceDraft, InvoiceSettings, InvoiceTotals, TimeEntry,
};
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::HashMap;
use tracing::trace;

const MINUTES_PER_HOUR: Decimal = Decimal::from_parts(60, 0, 0, false, 0);

/// Upper bound for rates, prices, quantities, discounts and credits. Keeps
/// `minutes × rate` and `quantity × price` well inside `Decimal` range.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// Round worked minutes up to the billing increment, then raise to the
/// minimum. Zero minutes is never billed, whatever the minimum.
///
/// A minimum that is not a multiple of the increment is returned as is
/// (increment 15, minimum 20: 5 minutes bills as 20).
pub fn billable_minutes(raw_minutes: u32, settings: &InvoiceSettings) -> u32 {
    if raw_minutes == 0 {
        return 0;
    }
    let increment = settings.billing_increment_minutes.max(1);
    let rounded = raw_minutes.div_ceil(increment).saturating_mul(increment);
    if rounded < settings.minimum_billing_minutes {
        settings.minimum_billing_minutes
    } else {
        rounded
    }
}

/// True when the minimum can produce billable minutes off the increment grid.
pub fn minimum_breaks_increment(settings: &InvoiceSettings) -> bool {
    let increment = settings.billing_increment_minutes.max(1);
    settings.minimum_billing_minutes > 0 && settings.minimum_billing_minutes % increment != 0
}

/// Category rate, then the rate with no category, then the settings default,
/// then zero.
pub fn hourly_rate_for(
    entry: &TimeEntry,
    rates: &[HourlyRate],
    settings: &InvoiceSettings,
) -> Decimal {
    if let Some(cat) = &entry.category {
        let hit = rates
            .iter()
            .find(|r| r.category.as_ref().is_some_and(|c| c.id == cat.id));
        if let Some(r) = hit {
            trace!(entry = entry.id, category = %cat.name, rate = %r.rate, "category rate");
            return r.rate;
        }
    }
    if let Some(r) = rates.iter().find(|r| r.category.is_none()) {
        trace!(entry = entry.id, rate = %r.rate, "project default rate");
        return r.rate;
    }
    match settings.default_hourly_rate {
        Some(rate) => {
            trace!(entry = entry.id, rate = %rate, "settings default rate");
            rate
        }
        None => {
            trace!(entry = entry.id, "no rate configured, billing at zero");
            Decimal::ZERO
        }
    }
}

pub fn line_amount(entry: &TimeEntry, rates: &[HourlyRate], settings: &InvoiceSettings) -> Decimal {
    let minutes = Decimal::from(billable_minutes(entry.minutes, settings));
    // multiply before dividing so quarter hours stay exact
    minutes * hourly_rate_for(entry, rates, settings) / MINUTES_PER_HOUR
}

pub fn custom_line_amount(item: &CustomLineItem) -> Decimal {
    item.quantity * item.unit_price
}

/// Subtotal over time entries and custom items, less discount and credit
/// (floored at zero), plus tax at `tax_rate_percent`.
pub fn compute_invoice_totals(
    selected_entries: &[TimeEntry],
    rates: &[HourlyRate],
    settings: &InvoiceSettings,
    custom_line_items: &[CustomLineItem],
    discount_amount: Decimal,
    credit_amount: Decimal,
    tax_rate_percent: Decimal,
) -> InvoiceTotals {
    let time_total: Decimal = selected_entries
        .iter()
        .map(|e| line_amount(e, rates, settings))
        .sum();
    let items_total: Decimal = custom_line_items.iter().map(custom_line_amount).sum();
    let subtotal = time_total + items_total;
    let adjusted_subtotal = (subtotal - discount_amount - credit_amount).max(Decimal::ZERO);
    let tax = adjusted_subtotal * tax_rate_percent / Decimal::ONE_HUNDRED;
    InvoiceTotals {
        subtotal,
        adjusted_subtotal,
        tax,
        total: adjusted_subtotal + tax,
    }
}

/// Half-cent rounds away from zero.
pub fn round_to_cents(d: Decimal) -> Decimal {
    d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

impl InvoiceTotals {
    /// Round to cents for storage. The total is rebuilt from the rounded
    /// parts so that `adjusted_subtotal + tax == total` holds on disk.
    pub fn to_cents(&self) -> InvoiceTotals {
        let adjusted_subtotal = round_to_cents(self.adjusted_subtotal);
        let tax = round_to_cents(self.tax);
        InvoiceTotals {
            subtotal: round_to_cents(self.subtotal),
            adjusted_subtotal,
            tax,
            total: adjusted_subtotal + tax,
        }
    }
}

impl InvoiceSettings {
    pub fn validate(&self) -> Result<(), BillingError> {
        if self.billing_increment_minutes == 0 {
            return Err(BillingError::invalid(
                "billing increment",
                "must be greater than zero",
            ));
        }
        if self.payment_terms_days == 0 {
            return Err(BillingError::invalid(
                "payment terms",
                "must be greater than zero",
            ));
        }
        if let Some(rate) = self.default_hourly_rate {
            check_amount("default hourly rate", rate)?;
        }
        Ok(())
    }
}

/// Rejects negatives and anything above [`MAX_AMOUNT`].
pub fn check_amount(field: &'static str, value: Decimal) -> Result<(), BillingError> {
    if value < Decimal::ZERO {
        return Err(BillingError::invalid(field, format!("{} is negative", value)));
    }
    if value > MAX_AMOUNT {
        return Err(BillingError::invalid(
            field,
            format!("{} exceeds {}", value, MAX_AMOUNT),
        ));
    }
    Ok(())
}

impl InvoiceDraft {
    pub fn validate(&self) -> Result<(), BillingError> {
        check_amount("discount", self.discount_amount)?;
        check_amount("credit", self.credit_amount)?;
        if self.tax_rate < Decimal::ZERO || self.tax_rate > Decimal::ONE_HUNDRED {
            return Err(BillingError::invalid(
                "tax rate",
                format!("{} is outside 0..100", self.tax_rate),
            ));
        }
        for item in &self.custom_line_items {
            if item.description.trim().is_empty() {
                return Err(BillingError::invalid(
                    "line item",
                    "description is empty",
                ));
            }
            check_amount("quantity", item.quantity)?;
            check_amount("unit price", item.unit_price)?;
        }
        if self.selected_time_entry_ids.is_empty() && self.custom_line_items.is_empty() {
            return Err(BillingError::EmptyDraft);
        }
        Ok(())
    }

    /// Pick the selected entries out of `entries`, in id order. Every
    /// selected id must exist and be unbilled.
    pub fn select_entries(&self, entries: &[TimeEntry]) -> Result<Vec<TimeEntry>, BillingError> {
        let by_id: HashMap<i64, &TimeEntry> = entries.iter().map(|e| (e.id, e)).collect();
        let mut out = Vec::with_capacity(self.selected_time_entry_ids.len());
        for id in &self.selected_time_entry_ids {
            let entry = by_id.get(id).ok_or(BillingError::UnknownEntry(*id))?;
            if entry.is_billed() {
                return Err(BillingError::AlreadyBilled(*id));
            }
            out.push((*entry).clone());
        }
        Ok(out)
    }

    pub fn totals(
        &self,
        entries: &[TimeEntry],
        rates: &[HourlyRate],
        settings: &InvoiceSettings,
    ) -> Result<InvoiceTotals, BillingError> {
        let selected = self.select_entries(entries)?;
        Ok(compute_invoice_totals(
            &selected,
            rates,
            settings,
            &self.custom_line_items,
            self.discount_amount,
            self.credit_amount,
            self.tax_rate,
        ))
    }
}
