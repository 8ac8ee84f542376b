// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use rusqlite::Connection;
use serde_json::Value;
use tempfile::tempdir;
use timebill::models::{CustomLineItem, InvoiceDraft};
use timebill::{cli, commands::exporter, commands::invoices, db};

fn with_invoice() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    conn.execute_batch(
        r#"
        INSERT INTO hourly_rates(category_id, rate) VALUES (NULL, '80');
        INSERT INTO time_entries(id, date, minutes) VALUES (1, '2025-05-01', 50);
        "#,
    )
    .unwrap();
    let mut draft = InvoiceDraft::default();
    draft.selected_time_entry_ids.insert(1);
    draft.custom_line_items.push(CustomLineItem {
        description: "Toner".into(),
        quantity: "2".parse().unwrap(),
        unit_price: "12.5".parse().unwrap(),
    });
    draft.tax_rate = "10".parse().unwrap();
    invoices::create_invoice(&mut conn, &draft, NaiveDate::from_ymd_opt(2025, 5, 2).unwrap())
        .unwrap();
    conn
}

fn export(conn: &Connection, format: &str, out: &str) -> anyhow::Result<()> {
    let matches = cli::build_cli().get_matches_from([
        "timebill", "export", "invoices", "--format", format, "--out", out,
    ]);
    match matches.subcommand() {
        Some(("export", sub)) => exporter::handle(conn, sub),
        _ => panic!("export command not parsed"),
    }
}

#[test]
fn export_invoices_csv_has_cent_amounts() {
    let conn = with_invoice();
    let dir = tempdir().unwrap();
    let out = dir.path().join("invoices.csv");
    export(&conn, "csv", out.to_str().unwrap()).unwrap();

    let mut rdr = csv::Reader::from_path(&out).unwrap();
    let headers = rdr.headers().unwrap().clone();
    assert_eq!(&headers[0], "number");
    assert_eq!(&headers[9], "total");
    let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 1);
    // 60 min at 80 + 2 x 12.50 = 105.00, 10% tax
    assert_eq!(&rows[0][0], "INV-2025-0001");
    assert_eq!(&rows[0][2], "2025-06-01");
    assert_eq!(&rows[0][3], "105.00");
    assert_eq!(&rows[0][8], "10.50");
    assert_eq!(&rows[0][9], "115.50");
}

#[test]
fn export_invoices_json_keeps_decimal_strings() {
    let conn = with_invoice();
    let dir = tempdir().unwrap();
    let out = dir.path().join("invoices.json");
    export(&conn, " JSON ", out.to_str().unwrap()).unwrap();

    let v: Value = serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    let arr = v.as_array().unwrap();
    assert_eq!(arr.len(), 1);
    assert_eq!(arr[0]["number"], "INV-2025-0001");
    let total: rust_decimal::Decimal = arr[0]["total"].as_str().unwrap().parse().unwrap();
    assert_eq!(total, "115.5".parse().unwrap());
}

#[test]
fn unknown_format_is_an_error() {
    let conn = with_invoice();
    let dir = tempdir().unwrap();
    let out = dir.path().join("invoices.xml");
    let err = export(&conn, "xml", out.to_str().unwrap()).unwrap_err();
    assert!(err.to_string().contains("Unknown format"));
}
