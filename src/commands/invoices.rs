// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::billing::{
    billable_minutes, compute_invoice_totals, custom_line_amount, hourly_rate_for, line_amount,
    round_to_cents,
};
use crate::error::BillingError;
use crate::models::{
    HourlyRate, Invoice, InvoiceDraft, InvoiceLine, InvoiceSettings, InvoiceTotals, TimeEntry,
};
use crate::utils::{
    decimal_column, fmt_money, load_rates, load_settings, load_time_entries, maybe_print_json,
    parse_date, parse_decimal, parse_line_item, pretty_table,
};
use anyhow::{Context, Result, anyhow};
use chrono::{Datelike, Days, NaiveDate};
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("preview", sub)) => preview_cmd(conn, sub)?,
        Some(("create", sub)) => create_cmd(conn, sub)?,
        Some(("list", sub)) => list_cmd(conn, sub)?,
        Some(("show", sub)) => show_cmd(conn, sub)?,
        _ => {}
    }
    Ok(())
}

/// Assemble and validate a draft from `--entries`, `--unbilled`, `--item`,
/// `--discount`, `--credit` and `--tax-rate`.
pub fn build_draft(conn: &Connection, sub: &clap::ArgMatches) -> Result<InvoiceDraft> {
    let mut draft = InvoiceDraft::default();
    if let Some(ids) = sub.get_many::<i64>("entries") {
        draft.selected_time_entry_ids.extend(ids.copied());
    }
    if sub.get_flag("unbilled") {
        let unbilled = load_time_entries(conn, true)?;
        draft
            .selected_time_entry_ids
            .extend(unbilled.iter().map(|e| e.id));
    }
    if let Some(items) = sub.get_many::<String>("item") {
        for raw in items {
            draft.custom_line_items.push(parse_line_item(raw)?);
        }
    }
    draft.discount_amount = parse_decimal(sub.get_one::<String>("discount").unwrap())?;
    draft.credit_amount = parse_decimal(sub.get_one::<String>("credit").unwrap())?;
    draft.tax_rate = parse_decimal(sub.get_one::<String>("tax_rate").unwrap())?;
    if let Err(e) = draft.validate() {
        warn!(error = %e, "invoice draft rejected");
        return Err(e.into());
    }
    Ok(draft)
}

#[derive(Debug, Serialize)]
pub struct InvoicePreview {
    pub lines: Vec<InvoiceLine>,
    pub discount_amount: Decimal,
    pub credit_amount: Decimal,
    pub tax_rate: Decimal,
    pub totals: InvoiceTotals,
}

fn entry_description(e: &TimeEntry) -> String {
    let mut d = match e.ticket_id {
        Some(t) => format!("Ticket #{}", t),
        None => format!("Time entry {}", e.id),
    };
    if let Some(c) = &e.category {
        d.push_str(&format!(" [{}]", c.name));
    }
    if !e.description.is_empty() {
        d.push_str(": ");
        d.push_str(&e.description);
    }
    d
}

/// One line per selected entry (billable hours × rate) followed by the
/// custom items in draft order. Amounts are unrounded.
fn draft_lines(
    selected: &[TimeEntry],
    draft: &InvoiceDraft,
    rates: &[HourlyRate],
    settings: &InvoiceSettings,
) -> Vec<InvoiceLine> {
    let hour = Decimal::from(60);
    let mut lines: Vec<InvoiceLine> = selected
        .iter()
        .map(|e| InvoiceLine {
            description: entry_description(e),
            quantity: (Decimal::from(billable_minutes(e.minutes, settings)) / hour).round_dp(4),
            unit_price: hourly_rate_for(e, rates, settings),
            amount: line_amount(e, rates, settings),
            time_entry_id: Some(e.id),
        })
        .collect();
    lines.extend(draft.custom_line_items.iter().map(|item| InvoiceLine {
        description: item.description.clone(),
        quantity: item.quantity,
        unit_price: item.unit_price,
        amount: custom_line_amount(item),
        time_entry_id: None,
    }));
    lines
}

pub fn preview(conn: &Connection, draft: &InvoiceDraft) -> Result<InvoicePreview> {
    draft.validate()?;
    let settings = load_settings(conn)?;
    let rates = load_rates(conn)?;
    let entries = load_time_entries(conn, false)?;
    let selected = draft.select_entries(&entries)?;
    let totals = compute_invoice_totals(
        &selected,
        &rates,
        &settings,
        &draft.custom_line_items,
        draft.discount_amount,
        draft.credit_amount,
        draft.tax_rate,
    );
    Ok(InvoicePreview {
        lines: draft_lines(&selected, draft, &rates, &settings),
        discount_amount: draft.discount_amount,
        credit_amount: draft.credit_amount,
        tax_rate: draft.tax_rate,
        totals: totals.to_cents(),
    })
}

fn next_invoice_number(conn: &Connection, issue_date: NaiveDate) -> Result<String> {
    let prefix = format!("INV-{}-", issue_date.year());
    let mut stmt = conn.prepare("SELECT number FROM invoices WHERE number LIKE ?1")?;
    let mut cur = stmt.query(params![format!("{}%", prefix)])?;
    let mut last = 0u32;
    while let Some(r) = cur.next()? {
        let n: String = r.get(0)?;
        if let Some(seq) = n.strip_prefix(&prefix).and_then(|s| s.parse::<u32>().ok()) {
            last = last.max(seq);
        }
    }
    Ok(format!("{}{:04}", prefix, last + 1))
}

/// Record the draft as an invoice dated `issue_date`, store its lines and
/// mark the selected time entries billed, all in one transaction.
pub fn create_invoice(
    conn: &mut Connection,
    draft: &InvoiceDraft,
    issue_date: NaiveDate,
) -> Result<Invoice> {
    draft.validate()?;
    let settings = load_settings(conn)?;
    let rates = load_rates(conn)?;
    let entries = load_time_entries(conn, false)?;
    let selected = draft.select_entries(&entries)?;
    let totals = compute_invoice_totals(
        &selected,
        &rates,
        &settings,
        &draft.custom_line_items,
        draft.discount_amount,
        draft.credit_amount,
        draft.tax_rate,
    )
    .to_cents();
    let lines = draft_lines(&selected, draft, &rates, &settings);
    let due_date = issue_date
        .checked_add_days(Days::new(u64::from(settings.payment_terms_days)))
        .ok_or_else(|| anyhow!("Due date overflows for issue date {}", issue_date))?;

    let tx = conn.transaction()?;
    let number = next_invoice_number(&tx, issue_date)?;
    tx.execute(
        "INSERT INTO invoices(number, issue_date, due_date, subtotal, discount_amount, credit_amount,
                              adjusted_subtotal, tax_rate, tax, total)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10)",
        params![
            number,
            issue_date.to_string(),
            due_date.to_string(),
            totals.subtotal.to_string(),
            draft.discount_amount.to_string(),
            draft.credit_amount.to_string(),
            totals.adjusted_subtotal.to_string(),
            draft.tax_rate.to_string(),
            totals.tax.to_string(),
            totals.total.to_string(),
        ],
    )
    .with_context(|| format!("Insert invoice {}", number))?;
    let invoice_id = tx.last_insert_rowid();

    for (i, line) in lines.iter().enumerate() {
        tx.execute(
            "INSERT INTO invoice_lines(invoice_id, sort_order, description, quantity, unit_price, amount, time_entry_id)
             VALUES (?1,?2,?3,?4,?5,?6,?7)",
            params![
                invoice_id,
                i as i64,
                line.description,
                line.quantity.to_string(),
                line.unit_price.to_string(),
                round_to_cents(line.amount).to_string(),
                line.time_entry_id,
            ],
        )?;
    }
    for e in &selected {
        let n = tx.execute(
            "UPDATE time_entries SET invoice_id=?1 WHERE id=?2 AND invoice_id IS NULL",
            params![invoice_id, e.id],
        )?;
        if n != 1 {
            return Err(BillingError::AlreadyBilled(e.id).into());
        }
    }
    tx.commit()?;

    info!(
        %number,
        entries = selected.len(),
        items = draft.custom_line_items.len(),
        total = %totals.total,
        "invoice created"
    );
    Ok(Invoice {
        id: invoice_id,
        number,
        issue_date,
        due_date,
        subtotal: totals.subtotal,
        discount_amount: draft.discount_amount,
        credit_amount: draft.credit_amount,
        adjusted_subtotal: totals.adjusted_subtotal,
        tax_rate: draft.tax_rate,
        tax: totals.tax,
        total: totals.total,
    })
}

const INVOICE_COLUMNS: &str = "id, number, issue_date, due_date, subtotal, discount_amount, credit_amount, adjusted_subtotal, tax_rate, tax, total";

fn invoice_from_row(r: &rusqlite::Row<'_>) -> Result<Invoice> {
    let text = |i: usize, what: &str| -> Result<Decimal> {
        let raw: String = r.get(i)?;
        decimal_column(&raw, what)
    };
    let issue: String = r.get(2)?;
    let due: String = r.get(3)?;
    Ok(Invoice {
        id: r.get(0)?,
        number: r.get(1)?,
        issue_date: parse_date(&issue)?,
        due_date: parse_date(&due)?,
        subtotal: text(4, "subtotal")?,
        discount_amount: text(5, "discount")?,
        credit_amount: text(6, "credit")?,
        adjusted_subtotal: text(7, "adjusted subtotal")?,
        tax_rate: text(8, "tax rate")?,
        tax: text(9, "tax")?,
        total: text(10, "total")?,
    })
}

pub fn load_invoices(conn: &Connection) -> Result<Vec<Invoice>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM invoices ORDER BY issue_date, id",
        INVOICE_COLUMNS
    ))?;
    let mut cur = stmt.query([])?;
    let mut out = Vec::new();
    while let Some(r) = cur.next()? {
        out.push(invoice_from_row(r)?);
    }
    Ok(out)
}

pub fn find_invoice(conn: &Connection, number: &str) -> Result<Option<Invoice>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM invoices WHERE number=?1",
        INVOICE_COLUMNS
    ))?;
    let mut cur = stmt.query(params![number.trim()])?;
    let row = cur.next()?;
    row.map(invoice_from_row).transpose()
}

pub fn load_invoice_lines(conn: &Connection, invoice_id: i64) -> Result<Vec<InvoiceLine>> {
    let mut stmt = conn.prepare(
        "SELECT description, quantity, unit_price, amount, time_entry_id
         FROM invoice_lines WHERE invoice_id=?1 ORDER BY sort_order",
    )?;
    let mut cur = stmt.query(params![invoice_id])?;
    let mut out = Vec::new();
    while let Some(r) = cur.next()? {
        let qty: String = r.get(1)?;
        let price: String = r.get(2)?;
        let amount: String = r.get(3)?;
        out.push(InvoiceLine {
            description: r.get(0)?,
            quantity: decimal_column(&qty, "quantity")?,
            unit_price: decimal_column(&price, "unit price")?,
            amount: decimal_column(&amount, "line amount")?,
            time_entry_id: r.get(4)?,
        });
    }
    Ok(out)
}

fn line_rows(lines: &[InvoiceLine]) -> Vec<Vec<String>> {
    lines
        .iter()
        .map(|l| {
            vec![
                l.description.clone(),
                l.quantity.normalize().to_string(),
                fmt_money(&l.unit_price),
                fmt_money(&l.amount),
            ]
        })
        .collect()
}

fn totals_rows(
    subtotal: &Decimal,
    discount: &Decimal,
    credit: &Decimal,
    tax_rate: &Decimal,
    tax: &Decimal,
    total: &Decimal,
) -> Vec<Vec<String>> {
    vec![
        vec!["Subtotal".into(), fmt_money(subtotal)],
        vec!["Discount".into(), format!("-{}", fmt_money(discount))],
        vec!["Credit".into(), format!("-{}", fmt_money(credit))],
        vec![format!("Tax ({}%)", tax_rate.normalize()), fmt_money(tax)],
        vec!["Total".into(), fmt_money(total)],
    ]
}

fn preview_cmd(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let draft = build_draft(conn, sub)?;
    let p = preview(conn, &draft)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &p)? {
        println!(
            "{}",
            pretty_table(&["Description", "Qty", "Unit price", "Amount"], line_rows(&p.lines))
        );
        println!(
            "{}",
            pretty_table(
                &["", "Amount"],
                totals_rows(
                    &p.totals.subtotal,
                    &p.discount_amount,
                    &p.credit_amount,
                    &p.tax_rate,
                    &p.totals.tax,
                    &p.totals.total,
                )
            )
        );
    }
    Ok(())
}

fn create_cmd(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let draft = build_draft(conn, sub)?;
    let issue_date = match sub.get_one::<String>("date") {
        Some(d) => parse_date(d)?,
        None => chrono::Local::now().date_naive(),
    };
    let inv = create_invoice(conn, &draft, issue_date)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &inv)? {
        println!(
            "Created invoice {} dated {} due {}: total {}",
            inv.number,
            inv.issue_date,
            inv.due_date,
            fmt_money(&inv.total)
        );
    }
    Ok(())
}

fn list_cmd(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let invoices = load_invoices(conn)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &invoices)? {
        let rows = invoices
            .iter()
            .map(|i| {
                vec![
                    i.number.clone(),
                    i.issue_date.to_string(),
                    i.due_date.to_string(),
                    fmt_money(&i.subtotal),
                    fmt_money(&i.tax),
                    fmt_money(&i.total),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["Number", "Issued", "Due", "Subtotal", "Tax", "Total"], rows)
        );
    }
    Ok(())
}

#[derive(Serialize)]
struct InvoiceDetail {
    #[serde(flatten)]
    invoice: Invoice,
    lines: Vec<InvoiceLine>,
}

fn show_cmd(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let number = sub.get_one::<String>("number").unwrap();
    let invoice = find_invoice(conn, number)?
        .with_context(|| format!("Invoice '{}' not found", number.trim()))?;
    let lines = load_invoice_lines(conn, invoice.id)?;
    let detail = InvoiceDetail { invoice, lines };
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &detail)? {
        let inv = &detail.invoice;
        println!(
            "Invoice {}  issued {}  due {}",
            inv.number, inv.issue_date, inv.due_date
        );
        println!(
            "{}",
            pretty_table(&["Description", "Qty", "Unit price", "Amount"], line_rows(&detail.lines))
        );
        println!(
            "{}",
            pretty_table(
                &["", "Amount"],
                totals_rows(
                    &inv.subtotal,
                    &inv.discount_amount,
                    &inv.credit_amount,
                    &inv.tax_rate,
                    &inv.tax,
                    &inv.total,
                )
            )
        );
    }
    Ok(())
}

pub fn invoice_exists(conn: &Connection, id: i64) -> Result<bool> {
    Ok(conn
        .query_row("SELECT 1 FROM invoices WHERE id=?1", params![id], |r| {
            r.get::<_, i64>(0)
        })
        .optional()?
        .is_some())
}
