// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command, value_parser};

/// Money values are validated by the handlers, so negatives must parse.
fn money(id: &'static str, long: &'static str) -> Arg {
    Arg::new(id).long(long).allow_negative_numbers(true)
}

fn json_flags(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print pretty JSON"),
    )
    .arg(
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .conflicts_with("json")
            .help("Print one JSON object per line"),
    )
}

fn draft_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("entries")
            .long("entries")
            .value_delimiter(',')
            .action(ArgAction::Append)
            .value_parser(value_parser!(i64))
            .help("Time entry ids to bill, comma separated"),
    )
    .arg(
        Arg::new("unbilled")
            .long("unbilled")
            .action(ArgAction::SetTrue)
            .help("Bill every unbilled time entry"),
    )
    .arg(
        Arg::new("item")
            .long("item")
            .action(ArgAction::Append)
            .help("Custom line item as description:quantity:unit_price (repeatable)"),
    )
    .arg(money("discount", "discount").default_value("0"))
    .arg(money("credit", "credit").default_value("0"))
    .arg(
        money("tax_rate", "tax-rate")
            .default_value("0")
            .help("Tax rate in percent"),
    )
}

pub fn build_cli() -> Command {
    Command::new("timebill")
        .about("Helpdesk time tracking, billing-increment rounding, and invoices")
        .version(clap::crate_version!())
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::Count)
                .help("Increase log verbosity (-v debug, -vv trace)"),
        )
        .subcommand(Command::new("init").about("Create the database"))
        .subcommand(
            Command::new("settings")
                .about("Invoice settings")
                .subcommand(json_flags(Command::new("show")))
                .subcommand(
                    Command::new("set")
                        .arg(money("default_rate", "default-rate"))
                        .arg(
                            Arg::new("clear_default_rate")
                                .long("clear-default-rate")
                                .action(ArgAction::SetTrue)
                                .conflicts_with("default_rate"),
                        )
                        .arg(
                            Arg::new("increment")
                                .long("increment")
                                .value_parser(value_parser!(u32)),
                        )
                        .arg(
                            Arg::new("minimum")
                                .long("minimum")
                                .value_parser(value_parser!(u32)),
                        )
                        .arg(
                            Arg::new("terms")
                                .long("terms")
                                .value_parser(value_parser!(u32)),
                        ),
                ),
        )
        .subcommand(
            Command::new("category")
                .about("Time categories")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(money("default_rate", "default-rate")),
                )
                .subcommand(Command::new("list"))
                .subcommand(Command::new("rm").arg(Arg::new("name").long("name").required(true))),
        )
        .subcommand(
            Command::new("rate")
                .about("Hourly rates; no --category means the project default")
                .subcommand(
                    Command::new("set")
                        .arg(Arg::new("category").long("category"))
                        .arg(money("rate", "rate")),
                )
                .subcommand(json_flags(Command::new("list")))
                .subcommand(Command::new("rm").arg(Arg::new("category").long("category"))),
        )
        .subcommand(
            Command::new("time")
                .about("Time entries")
                .subcommand(
                    Command::new("log")
                        .arg(
                            Arg::new("minutes")
                                .long("minutes")
                                .required(true)
                                .help("90, 1:30 or 1h30m"),
                        )
                        .arg(Arg::new("category").long("category"))
                        .arg(
                            Arg::new("ticket")
                                .long("ticket")
                                .value_parser(value_parser!(i64)),
                        )
                        .arg(Arg::new("description").long("description"))
                        .arg(Arg::new("date").long("date").help("YYYY-MM-DD, default today")),
                )
                .subcommand(json_flags(
                    Command::new("list")
                        .arg(
                            Arg::new("unbilled")
                                .long("unbilled")
                                .action(ArgAction::SetTrue),
                        )
                        .arg(
                            Arg::new("ticket")
                                .long("ticket")
                                .value_parser(value_parser!(i64)),
                        )
                        .arg(
                            Arg::new("limit")
                                .long("limit")
                                .value_parser(value_parser!(usize)),
                        ),
                ))
                .subcommand(
                    Command::new("rm").arg(
                        Arg::new("id")
                            .long("id")
                            .required(true)
                            .value_parser(value_parser!(i64)),
                    ),
                ),
        )
        .subcommand(
            Command::new("invoice")
                .about("Compose and record invoices")
                .subcommand(json_flags(draft_args(
                    Command::new("preview").about("Compute totals without saving"),
                )))
                .subcommand(json_flags(draft_args(
                    Command::new("create")
                        .about("Record an invoice and mark its time entries billed")
                        .arg(Arg::new("date").long("date").help("Issue date, default today")),
                )))
                .subcommand(json_flags(Command::new("list")))
                .subcommand(json_flags(
                    Command::new("show").arg(Arg::new("number").long("number").required(true)),
                )),
        )
        .subcommand(
            Command::new("export").subcommand(
                Command::new("invoices")
                    .arg(
                        Arg::new("format")
                            .long("format")
                            .default_value("csv")
                            .help("csv|json"),
                    )
                    .arg(Arg::new("out").long("out").required(true)),
            ),
        )
        .subcommand(Command::new("doctor").about("Check billing configuration and data"))
}
