// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::billing::check_amount;
use crate::utils::{decimal_column, fmt_money, id_for_category, parse_decimal, pretty_table};
use anyhow::{Result, bail};
use rusqlite::{Connection, OptionalExtension, params};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = sub.get_one::<String>("name").unwrap().trim();
            let rate = sub
                .get_one::<String>("default_rate")
                .map(|s| parse_decimal(s))
                .transpose()?;
            if let Some(r) = rate {
                check_amount("default rate", r)?;
            }
            conn.execute(
                "INSERT INTO categories(name, default_rate) VALUES (?1, ?2)",
                params![name, rate.map(|r| r.to_string())],
            )?;
            println!("Added category '{}'", name);
        }
        Some(("list", _)) => {
            let mut stmt =
                conn.prepare("SELECT name, default_rate FROM categories ORDER BY name")?;
            let rows = stmt.query_map([], |r| {
                Ok((r.get::<_, String>(0)?, r.get::<_, Option<String>>(1)?))
            })?;
            let mut data = Vec::new();
            for row in rows {
                let (name, rate) = row?;
                let rate = match rate {
                    Some(s) => fmt_money(&decimal_column(&s, "default rate")?),
                    None => "-".into(),
                };
                data.push(vec![name, rate]);
            }
            println!("{}", pretty_table(&["Category", "Default rate"], data));
        }
        Some(("rm", sub)) => {
            let name = sub.get_one::<String>("name").unwrap().trim();
            rm(conn, name)?;
            println!("Removed category '{}'", name);
        }
        _ => {}
    }
    Ok(())
}

/// Delete a category and its hourly rate. Categories that time entries still
/// point at are kept, so billed work never loses its pricing.
pub fn rm(conn: &Connection, name: &str) -> Result<()> {
    let id = id_for_category(conn, name)?;
    let used: Option<i64> = conn
        .query_row(
            "SELECT id FROM time_entries WHERE category_id=?1 LIMIT 1",
            params![id],
            |r| r.get(0),
        )
        .optional()?;
    if let Some(entry) = used {
        bail!(
            "Category '{}' is used by time entry {} and cannot be removed",
            name.trim(),
            entry
        );
    }
    conn.execute("DELETE FROM categories WHERE id=?1", params![id])?;
    Ok(())
}
