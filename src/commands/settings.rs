// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::billing::minimum_breaks_increment;
use crate::utils::{fmt_money, load_settings, maybe_print_json, parse_decimal, pretty_table, save_settings};
use anyhow::Result;
use rusqlite::Connection;
use tracing::{info, warn};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("show", sub)) => show(conn, sub)?,
        Some(("set", sub)) => set(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn show(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let s = load_settings(conn)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &s)? {
        let rows = vec![
            vec![
                "Default hourly rate".into(),
                s.default_hourly_rate
                    .map(|d| fmt_money(&d))
                    .unwrap_or_else(|| "-".into()),
            ],
            vec![
                "Billing increment (min)".into(),
                s.billing_increment_minutes.to_string(),
            ],
            vec![
                "Minimum billing (min)".into(),
                s.minimum_billing_minutes.to_string(),
            ],
            vec!["Payment terms (days)".into(), s.payment_terms_days.to_string()],
        ];
        println!("{}", pretty_table(&["Setting", "Value"], rows));
    }
    Ok(())
}

fn set(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let mut s = load_settings(conn)?;
    if let Some(raw) = sub.get_one::<String>("default_rate") {
        s.default_hourly_rate = Some(parse_decimal(raw)?);
    }
    if sub.get_flag("clear_default_rate") {
        s.default_hourly_rate = None;
    }
    if let Some(v) = sub.get_one::<u32>("increment") {
        s.billing_increment_minutes = *v;
    }
    if let Some(v) = sub.get_one::<u32>("minimum") {
        s.minimum_billing_minutes = *v;
    }
    if let Some(v) = sub.get_one::<u32>("terms") {
        s.payment_terms_days = *v;
    }
    save_settings(conn, &s)?;
    info!(?s, "invoice settings saved");
    if minimum_breaks_increment(&s) {
        warn!(
            minimum = s.minimum_billing_minutes,
            increment = s.billing_increment_minutes,
            "minimum is not a multiple of the increment"
        );
        eprintln!(
            "warning: minimum {} min is not a multiple of the {} min increment; short entries will bill off-grid",
            s.minimum_billing_minutes, s.billing_increment_minutes
        );
    }
    println!("Settings saved");
    Ok(())
}
