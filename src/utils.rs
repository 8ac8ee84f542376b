// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::billing::round_to_cents;
use crate::models::{Category, CustomLineItem, HourlyRate, InvoiceSettings, TimeEntry};
use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use comfy_table::{Cell, Table, presets::UTF8_FULL};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;

static CLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+):([0-5]\d)$").expect("clock duration regex"));
static UNITS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:(\d+)\s*h)?\s*(?:(\d+)\s*m(?:in)?)?$").expect("unit duration regex")
});

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", s))
}

pub fn parse_decimal(s: &str) -> Result<Decimal> {
    s.trim()
        .parse::<Decimal>()
        .with_context(|| format!("Invalid decimal '{}'", s))
}

/// Worked time as plain minutes (`90`), clock form (`1:30`) or units
/// (`1h30m`, `2h`, `45m`).
pub fn parse_minutes(s: &str) -> Result<u32> {
    let s = s.trim();
    let bad = || anyhow!("Invalid duration '{}', expected e.g. 90, 1:30 or 1h30m", s);
    if let Ok(m) = s.parse::<u32>() {
        return Ok(m);
    }
    let (hours, minutes) = if let Some(c) = CLOCK_RE.captures(s) {
        (c.get(1), c.get(2))
    } else if let Some(c) = UNITS_RE.captures(s) {
        if c.get(1).is_none() && c.get(2).is_none() {
            return Err(bad());
        }
        (c.get(1), c.get(2))
    } else {
        return Err(bad());
    };
    let h = capture_u32(hours).ok_or_else(bad)?;
    let m = capture_u32(minutes).ok_or_else(bad)?;
    h.checked_mul(60)
        .and_then(|h| h.checked_add(m))
        .ok_or_else(bad)
}

fn capture_u32(m: Option<regex::Match<'_>>) -> Option<u32> {
    match m {
        Some(m) => m.as_str().parse::<u32>().ok(),
        None => Some(0),
    }
}

/// `description:quantity:unit_price`; the description may itself contain
/// colons.
pub fn parse_line_item(s: &str) -> Result<CustomLineItem> {
    let mut parts = s.rsplitn(3, ':');
    let (price, qty, desc) = match (parts.next(), parts.next(), parts.next()) {
        (Some(p), Some(q), Some(d)) => (p, q, d),
        _ => {
            return Err(anyhow!(
                "Invalid line item '{}', expected description:quantity:unit_price",
                s
            ));
        }
    };
    Ok(CustomLineItem {
        description: desc.trim().to_string(),
        quantity: parse_decimal(qty).with_context(|| format!("Line item '{}'", s))?,
        unit_price: parse_decimal(price).with_context(|| format!("Line item '{}'", s))?,
    })
}

pub fn fmt_money(d: &Decimal) -> String {
    format!("{:.2}", round_to_cents(*d))
}

pub fn pretty_table(headers: &[&str], rows: Vec<Vec<String>>) -> Table {
    let mut t = Table::new();
    t.load_preset(UTF8_FULL);
    t.set_header(headers.iter().map(|h| Cell::new(*h)));
    for r in rows {
        t.add_row(r.into_iter().map(Cell::new));
    }
    t
}

pub fn maybe_print_json<T: serde::Serialize>(
    json_flag: bool,
    jsonl_flag: bool,
    v: &T,
) -> Result<bool> {
    if json_flag {
        println!("{}", serde_json::to_string_pretty(v)?);
        return Ok(true);
    }
    if jsonl_flag {
        // arrays stream one element per line
        let val = serde_json::to_value(v)?;
        if let Some(arr) = val.as_array() {
            for item in arr {
                println!("{}", serde_json::to_string(item)?);
            }
        } else {
            println!("{}", serde_json::to_string(&val)?);
        }
        return Ok(true);
    }
    Ok(false)
}

pub fn id_for_category(conn: &Connection, name: &str) -> Result<i64> {
    let mut stmt = conn.prepare("SELECT id FROM categories WHERE name=?1")?;
    let id: i64 = stmt
        .query_row(params![name.trim()], |r| r.get(0))
        .with_context(|| format!("Category '{}' not found", name.trim()))?;
    Ok(id)
}

pub fn decimal_column(raw: &str, what: &str) -> Result<Decimal> {
    raw.parse::<Decimal>()
        .with_context(|| format!("Invalid {} '{}' in database", what, raw))
}

fn opt_decimal_column(raw: Option<String>, what: &str) -> Result<Option<Decimal>> {
    raw.map(|s| decimal_column(&s, what)).transpose()
}

pub fn get_category(conn: &Connection, name: &str) -> Result<Category> {
    let (id, name, rate): (i64, String, Option<String>) = conn
        .query_row(
            "SELECT id, name, default_rate FROM categories WHERE name=?1",
            params![name.trim()],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .with_context(|| format!("Category '{}' not found", name.trim()))?;
    Ok(Category {
        id,
        name,
        default_rate: opt_decimal_column(rate, "category default rate")?,
    })
}

// Invoice settings live in the key/value settings table
const KEY_DEFAULT_RATE: &str = "default_hourly_rate";
const KEY_INCREMENT: &str = "billing_increment_minutes";
const KEY_MINIMUM: &str = "minimum_billing_minutes";
const KEY_TERMS: &str = "payment_terms_days";

fn get_setting(conn: &Connection, key: &str) -> Result<Option<String>> {
    let v: Option<String> = conn
        .query_row("SELECT value FROM settings WHERE key=?1", params![key], |r| {
            r.get(0)
        })
        .optional()?;
    Ok(v)
}

fn set_setting(conn: &Connection, key: &str, value: Option<String>) -> Result<()> {
    match value {
        Some(v) => conn.execute(
            "INSERT INTO settings(key, value) VALUES(?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value=excluded.value",
            params![key, v],
        )?,
        None => conn.execute("DELETE FROM settings WHERE key=?1", params![key])?,
    };
    Ok(())
}

fn get_u32_setting(conn: &Connection, key: &str, default: u32) -> Result<u32> {
    match get_setting(conn, key)? {
        Some(s) => s
            .parse::<u32>()
            .with_context(|| format!("Invalid setting {}='{}'", key, s)),
        None => Ok(default),
    }
}

pub fn load_settings(conn: &Connection) -> Result<InvoiceSettings> {
    let defaults = InvoiceSettings::default();
    Ok(InvoiceSettings {
        default_hourly_rate: opt_decimal_column(
            get_setting(conn, KEY_DEFAULT_RATE)?,
            KEY_DEFAULT_RATE,
        )?,
        billing_increment_minutes: get_u32_setting(
            conn,
            KEY_INCREMENT,
            defaults.billing_increment_minutes,
        )?,
        minimum_billing_minutes: get_u32_setting(
            conn,
            KEY_MINIMUM,
            defaults.minimum_billing_minutes,
        )?,
        payment_terms_days: get_u32_setting(conn, KEY_TERMS, defaults.payment_terms_days)?,
    })
}

pub fn save_settings(conn: &Connection, s: &InvoiceSettings) -> Result<()> {
    s.validate()?;
    set_setting(conn, KEY_DEFAULT_RATE, s.default_hourly_rate.map(|d| d.to_string()))?;
    set_setting(conn, KEY_INCREMENT, Some(s.billing_increment_minutes.to_string()))?;
    set_setting(conn, KEY_MINIMUM, Some(s.minimum_billing_minutes.to_string()))?;
    set_setting(conn, KEY_TERMS, Some(s.payment_terms_days.to_string()))?;
    Ok(())
}

pub fn load_rates(conn: &Connection) -> Result<Vec<HourlyRate>> {
    let mut stmt = conn.prepare(
        "SELECT r.id, r.rate, c.id, c.name, c.default_rate
         FROM hourly_rates r LEFT JOIN categories c ON r.category_id=c.id
         ORDER BY c.name IS NOT NULL, c.name",
    )?;
    let mut cur = stmt.query([])?;
    let mut out = Vec::new();
    while let Some(r) = cur.next()? {
        let id: i64 = r.get(0)?;
        let rate: String = r.get(1)?;
        let cat_id: Option<i64> = r.get(2)?;
        let category = match cat_id {
            Some(cid) => Some(Category {
                id: cid,
                name: r.get(3)?,
                default_rate: opt_decimal_column(r.get(4)?, "category default rate")?,
            }),
            None => None,
        };
        out.push(HourlyRate {
            id,
            category,
            rate: decimal_column(&rate, "hourly rate")?,
        });
    }
    Ok(out)
}

pub fn load_time_entries(conn: &Connection, unbilled_only: bool) -> Result<Vec<TimeEntry>> {
    let mut sql = String::from(
        "SELECT t.id, t.minutes, c.id, c.name, c.default_rate, t.ticket_id, t.description, t.date, t.invoice_id
         FROM time_entries t LEFT JOIN categories c ON t.category_id=c.id",
    );
    if unbilled_only {
        sql.push_str(" WHERE t.invoice_id IS NULL");
    }
    sql.push_str(" ORDER BY t.id");
    let mut stmt = conn.prepare(&sql)?;
    let mut cur = stmt.query([])?;
    let mut out = Vec::new();
    while let Some(r) = cur.next()? {
        let id: i64 = r.get(0)?;
        let minutes: i64 = r.get(1)?;
        let cat_id: Option<i64> = r.get(2)?;
        let category = match cat_id {
            Some(cid) => Some(Category {
                id: cid,
                name: r.get(3)?,
                default_rate: opt_decimal_column(r.get(4)?, "category default rate")?,
            }),
            None => None,
        };
        let date: String = r.get(7)?;
        out.push(TimeEntry {
            id,
            minutes: u32::try_from(minutes)
                .with_context(|| format!("Invalid minutes {} on time entry {}", minutes, id))?,
            category,
            ticket_id: r.get(5)?,
            description: r.get(6)?,
            created_at: parse_date(&date)?,
            invoice_id: r.get(8)?,
        });
    }
    Ok(out)
}
