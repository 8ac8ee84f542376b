// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::billing::check_amount;
use crate::utils::{fmt_money, get_category, load_rates, maybe_print_json, parse_decimal, pretty_table};
use anyhow::{Result, anyhow};
use rusqlite::{Connection, params};
use tracing::info;

const DEFAULT_LABEL: &str = "(project default)";

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("set", sub)) => set(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        Some(("rm", sub)) => {
            let cat_id = match sub.get_one::<String>("category") {
                Some(name) => Some(get_category(conn, name)?.id),
                None => None,
            };
            let n = conn.execute(
                "DELETE FROM hourly_rates WHERE category_id IS ?1",
                params![cat_id],
            )?;
            println!("Removed {} rate(s)", n);
        }
        _ => {}
    }
    Ok(())
}

/// Upsert the rate for a category, or the project default without one. A
/// category's own default_rate is used when no explicit rate is given.
fn set(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let category = sub
        .get_one::<String>("category")
        .map(|name| get_category(conn, name))
        .transpose()?;
    let rate = match sub.get_one::<String>("rate") {
        Some(raw) => parse_decimal(raw)?,
        None => category
            .as_ref()
            .and_then(|c| c.default_rate)
            .ok_or_else(|| anyhow!("--rate is required unless the category has a default rate"))?,
    };
    check_amount("hourly rate", rate)?;
    let cat_id = category.as_ref().map(|c| c.id);

    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "DELETE FROM hourly_rates WHERE category_id IS ?1",
        params![cat_id],
    )?;
    tx.execute(
        "INSERT INTO hourly_rates(category_id, rate) VALUES (?1, ?2)",
        params![cat_id, rate.to_string()],
    )?;
    tx.commit()?;

    let label = category
        .as_ref()
        .map(|c| c.name.as_str())
        .unwrap_or(DEFAULT_LABEL);
    info!(category = label, %rate, "hourly rate set");
    println!("Rate for {} = {}/hr", label, fmt_money(&rate));
    Ok(())
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let rates = load_rates(conn)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &rates)? {
        let rows = rates
            .iter()
            .map(|r| {
                vec![
                    r.category
                        .as_ref()
                        .map(|c| c.name.clone())
                        .unwrap_or_else(|| DEFAULT_LABEL.to_string()),
                    fmt_money(&r.rate),
                ]
            })
            .collect();
        println!("{}", pretty_table(&["Category", "Rate/hr"], rows));
    }
    Ok(())
}
