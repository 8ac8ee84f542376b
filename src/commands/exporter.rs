// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::invoices::load_invoices;
use anyhow::{Result, bail};
use rusqlite::Connection;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("invoices", sub)) => export_invoices(conn, sub),
        _ => Ok(()),
    }
}

fn export_invoices(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let fmt = sub.get_one::<String>("format").unwrap().trim().to_lowercase();
    let out = sub.get_one::<String>("out").unwrap().trim();
    let invoices = load_invoices(conn)?;

    match fmt.as_str() {
        "csv" => {
            let mut wtr = csv::Writer::from_path(out)?;
            wtr.write_record([
                "number",
                "issue_date",
                "due_date",
                "subtotal",
                "discount",
                "credit",
                "adjusted_subtotal",
                "tax_rate",
                "tax",
                "total",
            ])?;
            for i in &invoices {
                wtr.write_record([
                    i.number.clone(),
                    i.issue_date.to_string(),
                    i.due_date.to_string(),
                    format!("{:.2}", i.subtotal),
                    format!("{:.2}", i.discount_amount),
                    format!("{:.2}", i.credit_amount),
                    format!("{:.2}", i.adjusted_subtotal),
                    i.tax_rate.normalize().to_string(),
                    format!("{:.2}", i.tax),
                    format!("{:.2}", i.total),
                ])?;
            }
            wtr.flush()?;
        }
        "json" => {
            std::fs::write(out, serde_json::to_string_pretty(&invoices)?)?;
        }
        _ => bail!("Unknown format: {} (use csv|json)", fmt),
    }
    println!("Exported {} invoice(s) to {}", invoices.len(), out);
    Ok(())
}
