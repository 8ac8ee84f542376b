// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::billing::{hourly_rate_for, minimum_breaks_increment};
use crate::commands::invoices::invoice_exists;
use crate::utils::{load_rates, load_settings, load_time_entries, pretty_table};
use anyhow::Result;
use rusqlite::Connection;

pub fn find_issues(conn: &Connection) -> Result<Vec<Vec<String>>> {
    let mut rows = Vec::new();
    let settings = load_settings(conn)?;

    // 1) Minimum off the increment grid
    if minimum_breaks_increment(&settings) {
        rows.push(vec![
            "minimum_off_increment".into(),
            format!(
                "minimum {} min is not a multiple of increment {} min",
                settings.minimum_billing_minutes, settings.billing_increment_minutes
            ),
        ]);
    }

    // 2) Unbilled time that would be invoiced at zero
    let rates = load_rates(conn)?;
    for e in load_time_entries(conn, true)? {
        if e.minutes > 0 && hourly_rate_for(&e, &rates, &settings).is_zero() {
            rows.push(vec!["zero_rate".into(), format!("time entry {}", e.id)]);
        }
    }

    // 3) Billed entries whose invoice is gone
    for e in load_time_entries(conn, false)? {
        if let Some(inv) = e.invoice_id {
            if !invoice_exists(conn, inv)? {
                rows.push(vec![
                    "missing_invoice".into(),
                    format!("time entry {} -> invoice {}", e.id, inv),
                ]);
            }
        }
    }
    Ok(rows)
}

pub fn handle(conn: &Connection) -> Result<()> {
    let rows = find_issues(conn)?;
    if rows.is_empty() {
        println!("✅ doctor: no issues found");
    } else {
        println!("{}", pretty_table(&["Issue", "Detail"], rows));
    }
    Ok(())
}
