// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rusqlite::{Connection, params};
use rust_decimal::Decimal;
use timebill::{
    cli,
    commands::time,
    db,
    utils::{fmt_money, parse_minutes},
};

fn setup() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    conn.execute("INSERT INTO categories(id, name) VALUES (1, 'Support')", [])
        .unwrap();
    conn.execute(
        "INSERT INTO hourly_rates(category_id, rate) VALUES (1, '100')",
        [],
    )
    .unwrap();
    conn
}

fn log(conn: &Connection, args: &[&str]) {
    let mut full = vec!["timebill", "time", "log"];
    full.extend_from_slice(args);
    let matches = cli::build_cli().get_matches_from(full);
    if let Some(("time", sub)) = matches.subcommand() {
        time::handle(conn, sub).unwrap();
    } else {
        panic!("time command not parsed");
    }
}

#[test]
fn parses_duration_forms() {
    assert_eq!(parse_minutes("90").unwrap(), 90);
    assert_eq!(parse_minutes(" 1:30 ").unwrap(), 90);
    assert_eq!(parse_minutes("1h30m").unwrap(), 90);
    assert_eq!(parse_minutes("2h").unwrap(), 120);
    assert_eq!(parse_minutes("45m").unwrap(), 45);
    assert_eq!(parse_minutes("1H 5M").unwrap(), 65);
    assert_eq!(parse_minutes("0").unwrap(), 0);
    for bad in ["", "h", "abc", "1:75", "-5", "1.5h"] {
        assert!(parse_minutes(bad).is_err(), "{} should not parse", bad);
    }
}

#[test]
fn log_and_list_shows_billable_time() {
    let conn = setup();
    log(
        &conn,
        &["--minutes", "1h30m", "--category", "Support", "--ticket", "1042", "--date", "2025-03-01"],
    );
    log(&conn, &["--minutes", "7", "--date", "2025-03-02", "--description", "call back"]);

    let matches = cli::build_cli().get_matches_from(["timebill", "time", "list"]);
    let Some(("time", tm)) = matches.subcommand() else {
        panic!("no time subcommand");
    };
    let Some(("list", lm)) = tm.subcommand() else {
        panic!("no list subcommand");
    };
    let rows = time::query_rows(&conn, lm).unwrap();
    assert_eq!(rows.len(), 2);
    // newest first
    assert_eq!(rows[0].date, "2025-03-02");
    assert_eq!(rows[0].minutes, 7);
    assert_eq!(rows[0].billable_minutes, 15);
    assert_eq!(rows[0].rate, "0.00");
    assert_eq!(rows[1].ticket, Some(1042));
    assert_eq!(rows[1].category, "Support");
    assert_eq!(rows[1].billable_minutes, 90);
    assert_eq!(rows[1].amount, "150.00");
}

#[test]
fn list_filters_by_ticket_and_limit() {
    let conn = setup();
    for day in 1..=3 {
        let date = format!("2025-03-0{}", day);
        log(&conn, &["--minutes", "30", "--ticket", "7", "--date", date.as_str()]);
    }
    log(&conn, &["--minutes", "30", "--ticket", "8", "--date", "2025-03-04"]);

    let matches = cli::build_cli().get_matches_from([
        "timebill", "time", "list", "--ticket", "7", "--limit", "2",
    ]);
    let Some(("time", tm)) = matches.subcommand() else {
        panic!("no time subcommand");
    };
    let Some(("list", lm)) = tm.subcommand() else {
        panic!("no list subcommand");
    };
    let rows = time::query_rows(&conn, lm).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].date, "2025-03-03");
    assert!(rows.iter().all(|r| r.ticket == Some(7)));
}

#[test]
fn rm_refuses_billed_entries() {
    let conn = setup();
    log(&conn, &["--minutes", "30", "--date", "2025-03-01"]);
    log(&conn, &["--minutes", "30", "--date", "2025-03-01"]);
    conn.execute(
        "INSERT INTO invoices(id, number, issue_date, due_date, subtotal, adjusted_subtotal, tax, total)
         VALUES (1, 'INV-2025-0001', '2025-03-05', '2025-04-04', '0', '0', '0', '0')",
        [],
    )
    .unwrap();
    conn.execute("UPDATE time_entries SET invoice_id=1 WHERE id=2", [])
        .unwrap();

    time::rm(&conn, 1).unwrap();
    let err = time::rm(&conn, 2).unwrap_err();
    assert!(err.to_string().contains("already billed"));
    assert!(time::rm(&conn, 99).unwrap_err().to_string().contains("not found"));

    let left: i64 = conn
        .query_row("SELECT COUNT(*) FROM time_entries WHERE id=?1", params![2], |r| r.get(0))
        .unwrap();
    assert_eq!(left, 1);
}

#[test]
fn money_is_rounded_to_cents_not_truncated() {
    let eleven_sixty_six = Decimal::from(35) / Decimal::from(3);
    assert_eq!(fmt_money(&eleven_sixty_six), "11.67");
    assert_eq!(fmt_money(&"0.125".parse::<Decimal>().unwrap()), "0.13");
    assert_eq!(fmt_money(&"2.5".parse::<Decimal>().unwrap()), "2.50");

    // 10 minutes bills as a quarter hour: 46.66 / 4 = 11.665
    let conn = setup();
    conn.execute("UPDATE hourly_rates SET rate='46.66' WHERE category_id=1", [])
        .unwrap();
    log(&conn, &["--minutes", "10", "--category", "Support", "--date", "2025-03-01"]);
    let matches = cli::build_cli().get_matches_from(["timebill", "time", "list"]);
    let Some(("time", tm)) = matches.subcommand() else {
        panic!("no time subcommand");
    };
    let Some(("list", lm)) = tm.subcommand() else {
        panic!("no list subcommand");
    };
    let rows = time::query_rows(&conn, lm).unwrap();
    assert_eq!(rows[0].rate, "46.66");
    assert_eq!(rows[0].amount, "11.67");
}
