// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::billing::{billable_minutes, hourly_rate_for, line_amount};
use crate::error::BillingError;
use crate::utils::{
    fmt_money, id_for_category, load_rates, load_settings, load_time_entries, maybe_print_json,
    parse_date, parse_minutes, pretty_table,
};
use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use tracing::debug;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("log", sub)) => log(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        Some(("rm", sub)) => rm(conn, *sub.get_one::<i64>("id").unwrap())?,
        _ => {}
    }
    Ok(())
}

fn log(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let minutes = parse_minutes(sub.get_one::<String>("minutes").unwrap())?;
    let category_id = sub
        .get_one::<String>("category")
        .map(|c| id_for_category(conn, c))
        .transpose()?;
    let ticket = sub.get_one::<i64>("ticket").copied();
    let description = sub
        .get_one::<String>("description")
        .map(|s| s.trim().to_string())
        .unwrap_or_default();
    let date = match sub.get_one::<String>("date") {
        Some(d) => parse_date(d)?,
        None => chrono::Local::now().date_naive(),
    };

    conn.execute(
        "INSERT INTO time_entries(date, minutes, category_id, ticket_id, description)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![date.to_string(), minutes, category_id, ticket, description],
    )?;
    let id = conn.last_insert_rowid();
    let settings = load_settings(conn)?;
    debug!(id, minutes, ?category_id, ?ticket, "time entry logged");
    println!(
        "Logged entry {}: {} min on {} (bills as {} min)",
        id,
        minutes,
        date,
        billable_minutes(minutes, &settings)
    );
    Ok(())
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let data = query_rows(conn, sub)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|r| {
                vec![
                    r.id.to_string(),
                    r.date.clone(),
                    r.ticket.map(|t| t.to_string()).unwrap_or_default(),
                    r.category.clone(),
                    r.minutes.to_string(),
                    r.billable_minutes.to_string(),
                    r.rate.clone(),
                    r.amount.clone(),
                    r.invoice.clone(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &[
                    "ID", "Date", "Ticket", "Category", "Min", "Billable", "Rate", "Amount",
                    "Invoice",
                ],
                rows,
            )
        );
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct TimeEntryRow {
    pub id: i64,
    pub date: String,
    pub ticket: Option<i64>,
    pub category: String,
    pub description: String,
    pub minutes: u32,
    pub billable_minutes: u32,
    pub rate: String,
    pub amount: String,
    pub invoice: String,
}

/// Newest first, priced with the current settings and rates.
pub fn query_rows(conn: &Connection, sub: &clap::ArgMatches) -> Result<Vec<TimeEntryRow>> {
    let settings = load_settings(conn)?;
    let rates = load_rates(conn)?;
    let mut entries = load_time_entries(conn, sub.get_flag("unbilled"))?;
    if let Some(ticket) = sub.get_one::<i64>("ticket") {
        entries.retain(|e| e.ticket_id == Some(*ticket));
    }
    entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    if let Some(limit) = sub.get_one::<usize>("limit") {
        entries.truncate(*limit);
    }

    let mut invoice_numbers = conn.prepare_cached("SELECT number FROM invoices WHERE id=?1")?;
    let mut data = Vec::with_capacity(entries.len());
    for e in &entries {
        let invoice = match e.invoice_id {
            Some(inv) => invoice_numbers
                .query_row(params![inv], |r| r.get::<_, String>(0))
                .optional()?
                .unwrap_or_else(|| format!("#{}", inv)),
            None => String::new(),
        };
        data.push(TimeEntryRow {
            id: e.id,
            date: e.created_at.to_string(),
            ticket: e.ticket_id,
            category: e.category.as_ref().map(|c| c.name.clone()).unwrap_or_default(),
            description: e.description.clone(),
            minutes: e.minutes,
            billable_minutes: billable_minutes(e.minutes, &settings),
            rate: fmt_money(&hourly_rate_for(e, &rates, &settings)),
            amount: fmt_money(&line_amount(e, &rates, &settings)),
            invoice,
        });
    }
    Ok(data)
}

/// Billed entries are immutable.
pub fn rm(conn: &Connection, id: i64) -> Result<()> {
    let invoice: Option<i64> = conn
        .query_row(
            "SELECT invoice_id FROM time_entries WHERE id=?1",
            params![id],
            |r| r.get(0),
        )
        .optional()?
        .ok_or(BillingError::UnknownEntry(id))?;
    if invoice.is_some() {
        return Err(BillingError::AlreadyBilled(id).into());
    }
    conn.execute("DELETE FROM time_entries WHERE id=?1", params![id])
        .with_context(|| format!("Delete time entry {}", id))?;
    println!("Removed time entry {}", id);
    Ok(())
}
