// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use rusqlite::{Connection, params};
use rust_decimal::Decimal;
use timebill::{cli, commands::invoices, db, utils::parse_line_item};

fn d(s: &str) -> Decimal {
    s.parse().unwrap()
}

/// Support at 100/hr, project default 60/hr, default settings (15 min, 30 days).
/// Entry 1: 90 min Support, entry 2: 7 min uncategorised.
fn setup() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    conn.execute_batch(
        r#"
        INSERT INTO categories(id, name) VALUES (1, 'Support');
        INSERT INTO hourly_rates(category_id, rate) VALUES (1, '100');
        INSERT INTO hourly_rates(category_id, rate) VALUES (NULL, '60');
        INSERT INTO time_entries(id, date, minutes, category_id, ticket_id, description)
            VALUES (1, '2025-03-01', 90, 1, 1042, 'printer queue');
        INSERT INTO time_entries(id, date, minutes, category_id, ticket_id, description)
            VALUES (2, '2025-03-02', 7, NULL, NULL, '');
        "#,
    )
    .unwrap();
    conn
}

fn invoice_matches(args: &[&str]) -> clap::ArgMatches {
    let mut full = vec!["timebill", "invoice"];
    full.extend_from_slice(args);
    let matches = cli::build_cli().get_matches_from(full);
    match matches.subcommand() {
        Some(("invoice", sub)) => sub.clone(),
        _ => panic!("invoice command not parsed"),
    }
}

fn draft_for(conn: &Connection, args: &[&str]) -> anyhow::Result<timebill::models::InvoiceDraft> {
    let m = invoice_matches(args);
    let (_, sub) = m.subcommand().unwrap();
    invoices::build_draft(conn, sub)
}

#[test]
fn line_item_parsing_splits_from_the_right() {
    let item = parse_line_item("Consulting: phase 1:2:75.50").unwrap();
    assert_eq!(item.description, "Consulting: phase 1");
    assert_eq!(item.quantity, d("2"));
    assert_eq!(item.unit_price, d("75.5"));
    assert!(parse_line_item("no price").is_err());
    assert!(parse_line_item("Cable:x:1").is_err());
}

#[test]
fn preview_totals_entries_items_discount_and_tax() {
    let conn = setup();
    let draft = draft_for(
        &conn,
        &[
            "preview", "--entries", "1,2", "--item", "Setup fee:1:50", "--discount", "15",
            "--tax-rate", "8",
        ],
    )
    .unwrap();
    let p = invoices::preview(&conn, &draft).unwrap();

    assert_eq!(p.lines.len(), 3);
    assert_eq!(p.lines[0].description, "Ticket #1042 [Support]: printer queue");
    assert_eq!(p.lines[0].quantity, d("1.5"));
    assert_eq!(p.lines[0].amount, d("150"));
    assert_eq!(p.lines[1].quantity, d("0.25"));
    assert_eq!(p.lines[1].unit_price, d("60"));
    assert_eq!(p.lines[1].amount, d("15"));
    assert_eq!(p.lines[2].time_entry_id, None);

    // 150 + 15 + 50 = 215, less 15 = 200, 8% tax = 16
    assert_eq!(p.totals.subtotal, d("215"));
    assert_eq!(p.totals.adjusted_subtotal, d("200"));
    assert_eq!(p.totals.tax, d("16"));
    assert_eq!(p.totals.total, d("216"));

    let billed: i64 = conn
        .query_row("SELECT COUNT(*) FROM time_entries WHERE invoice_id IS NOT NULL", [], |r| r.get(0))
        .unwrap();
    assert_eq!(billed, 0);
}

#[test]
fn create_records_invoice_and_bills_entries() {
    let mut conn = setup();
    let m = invoice_matches(&[
        "create", "--unbilled", "--item", "Setup fee:1:50", "--discount", "15", "--tax-rate",
        "8", "--date", "2025-03-10",
    ]);
    invoices::handle(&mut conn, &m).unwrap();

    let all = invoices::load_invoices(&conn).unwrap();
    assert_eq!(all.len(), 1);
    let inv = &all[0];
    assert_eq!(inv.number, "INV-2025-0001");
    assert_eq!(inv.issue_date, NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
    assert_eq!(inv.due_date, NaiveDate::from_ymd_opt(2025, 4, 9).unwrap());
    assert_eq!(inv.subtotal, d("215"));
    assert_eq!(inv.discount_amount, d("15"));
    assert_eq!(inv.adjusted_subtotal, d("200"));
    assert_eq!(inv.tax_rate, d("8"));
    assert_eq!(inv.tax, d("16"));
    assert_eq!(inv.total, d("216"));

    let lines = invoices::load_invoice_lines(&conn, inv.id).unwrap();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0].time_entry_id, Some(1));
    assert_eq!(lines[2].description, "Setup fee");

    let unbilled: i64 = conn
        .query_row("SELECT COUNT(*) FROM time_entries WHERE invoice_id IS NULL", [], |r| r.get(0))
        .unwrap();
    assert_eq!(unbilled, 0);

    let found = invoices::find_invoice(&conn, " INV-2025-0001 ").unwrap();
    assert_eq!(found.as_ref().map(|i| i.id), Some(inv.id));
    assert!(invoices::find_invoice(&conn, "INV-1999-0001").unwrap().is_none());
}

#[test]
fn billed_entries_cannot_be_invoiced_twice() {
    let mut conn = setup();
    let issue = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
    let first = draft_for(&conn, &["create", "--entries", "1"]).unwrap();
    invoices::create_invoice(&mut conn, &first, issue).unwrap();

    let again = draft_for(&conn, &["create", "--entries", "1,2"]).unwrap();
    let err = invoices::create_invoice(&mut conn, &again, issue).unwrap_err();
    assert!(err.to_string().contains("already billed"));

    // the failed attempt left entry 2 untouched
    let inv2: Option<i64> = conn
        .query_row("SELECT invoice_id FROM time_entries WHERE id=?1", params![2], |r| r.get(0))
        .unwrap();
    assert_eq!(inv2, None);
    assert_eq!(invoices::load_invoices(&conn).unwrap().len(), 1);

    // --unbilled now only picks entry 2
    let rest = draft_for(&conn, &["create", "--unbilled"]).unwrap();
    let inv = invoices::create_invoice(&mut conn, &rest, issue).unwrap();
    assert_eq!(inv.number, "INV-2025-0002");
    assert_eq!(inv.total, d("15"));
}

#[test]
fn invalid_drafts_are_rejected() {
    let conn = setup();
    let err = draft_for(&conn, &["preview"]).unwrap_err();
    assert!(err.to_string().contains("no time entries"));

    let err = draft_for(&conn, &["preview", "--entries", "1", "--discount", "-5"]).unwrap_err();
    assert!(err.to_string().contains("discount"));

    let err = draft_for(&conn, &["preview", "--entries", "1", "--tax-rate", "120"]).unwrap_err();
    assert!(err.to_string().contains("tax rate"));

    let draft = draft_for(&conn, &["preview", "--entries", "1,99"]).unwrap();
    let err = invoices::preview(&conn, &draft).unwrap_err();
    assert!(err.to_string().contains("Time entry 99 not found"));
}

#[test]
fn due_date_follows_payment_terms_and_numbers_restart_per_year() {
    let mut conn = setup();
    conn.execute(
        "INSERT INTO settings(key, value) VALUES ('payment_terms_days', '14')",
        [],
    )
    .unwrap();
    let d1 = draft_for(&conn, &["create", "--entries", "1"]).unwrap();
    let a = invoices::create_invoice(&mut conn, &d1, NaiveDate::from_ymd_opt(2024, 12, 28).unwrap())
        .unwrap();
    assert_eq!(a.number, "INV-2024-0001");
    assert_eq!(a.due_date, NaiveDate::from_ymd_opt(2025, 1, 11).unwrap());

    let d2 = draft_for(&conn, &["create", "--entries", "2"]).unwrap();
    let b = invoices::create_invoice(&mut conn, &d2, NaiveDate::from_ymd_opt(2025, 1, 2).unwrap())
        .unwrap();
    assert_eq!(b.number, "INV-2025-0001");
}
