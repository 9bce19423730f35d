// SPDX-FileCopyrightText: 2026 Perks Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `perks shell` command implementation.
//!
//! A line transport for the bot: slash commands select menu actions, any
//! other line is sent as free text from the contact given with `--as`.

use std::str::FromStr;

use colored::Colorize;
use perks_access::Identity;
use perks_bot::{Action, Bot, Input, Reply};
use perks_config::PerksConfig;
use perks_core::{Client, ClientField, PerksError, SettingKey, StaffField, Transaction};
use perks_session::{EditTarget, WaitingFor};
use perks_storage::Database;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

const HELP: &str = "\
/register              register yourself as a client
/new                   register a walk-in client
/search                find a client by card, phone or name
/balance [client]      show a card (your own without an id)
/history [client]      show recent ledger entries
/select <client>       show a client card
/earn <client>         add points
/spend <client>        redeem points
/adjust <client>       correct a balance
/note <client>         append a note
/edit client <id> <name|phone|birth_date|notes>
/edit staff <id> <name|role>
/deactivate <client>   deactivate a client
/staff new             create a staff account
/staff off <id>        deactivate a staff account
/staff on <id>         reactivate a staff account
/set <quick_command_limit|manual_amount_limit>
/cancel                abandon the current flow
/quit                  leave the shell
Staff can also type `<card> <+/-points>`, e.g. `7 +15`.";

/// What a shell line asks for.
#[derive(Debug, PartialEq, Eq)]
enum Line {
    Send(Input),
    Help,
    Quit,
}

/// Runs the `perks shell` interactive REPL as `user`.
pub async fn run_shell(config: PerksConfig, user: &str) -> Result<(), PerksError> {
    let db = Database::open_with(&config.storage).await?;
    let bot = Bot::with_system_clock(db.clone(), &config);

    let mut rl = DefaultEditor::new()
        .map_err(|e| PerksError::Internal(format!("failed to initialize readline: {e}")))?;

    println!("{}", "perks shell".bold().green());
    println!("{}", describe(&bot.access().identify(user).await).dimmed());
    println!("Type {} for commands, {} to exit.\n", "/help".yellow(), "/quit".yellow());

    let prompt = format!("{}> ", user.green());
    loop {
        match rl.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(&line);

                match parse_line(trimmed) {
                    Ok(Line::Quit) => break,
                    Ok(Line::Help) => println!("{HELP}"),
                    Ok(Line::Send(input)) => {
                        let reply = bot.handle(user, input).await;
                        println!("{}", render(&reply));
                    }
                    Err(problem) => eprintln!("{}: {problem}", "usage".yellow()),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}: {e}", "error".red());
                break;
            }
        }
    }

    db.close().await?;
    println!("{}", "goodbye".dimmed());
    Ok(())
}

fn describe(identity: &Identity) -> String {
    match identity {
        Identity::Staff(staff) => format!("acting as {} ({})", staff.name, staff.role),
        Identity::Client(client) => {
            format!("acting as {} (card {})", client.name, client.card_number)
        }
        Identity::Unknown => "acting as an unregistered contact".to_string(),
    }
}

fn parse_line(line: &str) -> Result<Line, String> {
    let Some(command) = line.strip_prefix('/') else {
        return Ok(Line::Send(Input::text(line)));
    };
    let words: Vec<&str> = command.split_whitespace().collect();
    let action = match words.as_slice() {
        ["quit"] | ["exit"] => return Ok(Line::Quit),
        ["help"] => return Ok(Line::Help),
        ["register"] => Action::Register,
        ["new"] => Action::CreateClient,
        ["search"] => Action::Search,
        ["balance"] => Action::ShowBalance { client_id: None },
        ["balance", id] => Action::ShowBalance {
            client_id: Some(id_arg(id)?),
        },
        ["history"] => Action::ShowHistory { client_id: None },
        ["history", id] => Action::ShowHistory {
            client_id: Some(id_arg(id)?),
        },
        ["select", id] => Action::SelectClient {
            client_id: id_arg(id)?,
        },
        ["earn", id] => Action::Earn {
            client_id: id_arg(id)?,
        },
        ["spend", id] => Action::Spend {
            client_id: id_arg(id)?,
        },
        ["adjust", id] => Action::Adjust {
            client_id: id_arg(id)?,
        },
        ["note", id] => Action::AddNote {
            client_id: id_arg(id)?,
        },
        ["edit", "client", id, field] => Action::EditField {
            target: EditTarget::Client {
                id: id_arg(id)?,
                field: named::<ClientField>(field)?,
            },
        },
        ["edit", "staff", id, field] => Action::EditField {
            target: EditTarget::Staff {
                id: id_arg(id)?,
                field: named::<StaffField>(field)?,
            },
        },
        ["deactivate", id] => Action::DeactivateClient {
            client_id: id_arg(id)?,
        },
        ["staff", "new"] => Action::CreateStaff,
        ["staff", "off", id] => Action::DeactivateStaff {
            staff_id: id_arg(id)?,
        },
        ["staff", "on", id] => Action::ReactivateStaff {
            staff_id: id_arg(id)?,
        },
        ["set", key] => Action::EditSetting {
            key: named::<SettingKey>(key)?,
        },
        ["cancel"] => Action::Cancel,
        _ => return Err(format!("unknown command `/{command}`, try /help")),
    };
    Ok(Line::Send(Input::Action(action)))
}

fn id_arg(raw: &str) -> Result<i64, String> {
    raw.parse()
        .map_err(|_| format!("`{raw}` is not a numeric id"))
}

fn named<T: FromStr>(raw: &str) -> Result<T, String> {
    raw.parse().map_err(|_| format!("unknown name `{raw}`"))
}

fn render(reply: &Reply) -> String {
    match reply {
        Reply::Prompt { step, problem } => {
            let question = prompt_text(*step).cyan().to_string();
            match problem {
                Some(problem) => format!("{}\n{question}", problem.red()),
                None => question,
            }
        }
        Reply::ClientCard(client) => client_line(client),
        Reply::SearchResults(clients) => clients
            .iter()
            .map(client_line)
            .collect::<Vec<_>>()
            .join("\n"),
        Reply::Registered(client) => {
            format!("{} {}", "registered".green(), client_line(client))
        }
        Reply::AlreadyRegistered(client) => {
            format!("{} {}", "already registered".yellow(), client_line(client))
        }
        Reply::Recorded {
            client,
            transaction,
        } => format!(
            "{} {}\n{}",
            "recorded".green(),
            transaction_line(transaction),
            client_line(client)
        ),
        Reply::History {
            client,
            transactions,
        } => {
            let mut lines = vec![client_line(client)];
            if transactions.is_empty() {
                lines.push("no ledger entries yet".dimmed().to_string());
            }
            lines.extend(transactions.iter().map(transaction_line));
            lines.join("\n")
        }
        Reply::ClientUpdated(client) => format!("{} {}", "updated".green(), client_line(client)),
        Reply::StaffCreated(staff) => format!(
            "{} staff #{} {} ({})",
            "created".green(),
            staff.id,
            staff.name,
            staff.role
        ),
        Reply::StaffUpdated(staff) => format!(
            "{} staff #{} {} ({}{})",
            "updated".green(),
            staff.id,
            staff.name,
            staff.role,
            if staff.is_active { "" } else { ", inactive" }
        ),
        Reply::SettingStored { key, value } => format!("{} {key} = {value}", "stored".green()),
        Reply::Cancelled => "cancelled".dimmed().to_string(),
        Reply::Menu => "type /help for what you can do here".dimmed().to_string(),
        Reply::QuickUsage { problem } => {
            let usage = "quick command: <card> <+points|-points>, e.g. 7 +15".dimmed();
            match problem {
                Some(problem) => format!("{}\n{usage}", problem.red()),
                None => usage.to_string(),
            }
        }
        Reply::Denied(reason) => format!("{} {reason}", "denied".red()),
        Reply::Rejected(reason) => format!("{} {reason}", "rejected".red()),
        Reply::Failed => format!("{} something went wrong, try again later", "failed".red()),
    }
}

fn prompt_text(step: WaitingFor) -> String {
    match step {
        WaitingFor::FullName => "Full name?".to_string(),
        WaitingFor::Phone => "Phone number? (or `skip`)".to_string(),
        WaitingFor::BirthDate => "Birth date, YYYY-MM-DD or DD.MM.YYYY? (or `skip`)".to_string(),
        WaitingFor::CardSearch => "Card number, phone or name?".to_string(),
        WaitingFor::EarnAmount => "Points to add?".to_string(),
        WaitingFor::SpendAmount => "Points to redeem?".to_string(),
        WaitingFor::AdjustAmount => "Signed correction, e.g. -5?".to_string(),
        WaitingFor::AdjustReason => "Reason for the correction?".to_string(),
        WaitingFor::NoteText => "Note text?".to_string(),
        WaitingFor::StaffPayload => "<contact id> <barista|manager|admin> <name>?".to_string(),
        WaitingFor::SettingValue { key } => format!("New value for {key}?"),
        WaitingFor::FieldEdit { target } => match target {
            EditTarget::Client {
                field: ClientField::Name,
                ..
            } => "New name?".to_string(),
            EditTarget::Client { field, .. } => format!("New {field}? (or `skip` to clear)"),
            EditTarget::Staff { field, .. } => format!("New {field}?"),
        },
    }
}

fn client_line(client: &Client) -> String {
    let mut line = format!(
        "#{} {} [client {}] {} pts, {} visit(s)",
        client.card_number,
        client.name.bold(),
        client.id,
        client.balance,
        client.visit_count
    );
    if let Some(phone) = &client.phone {
        line.push_str(&format!(", {phone}"));
    }
    if !client.is_active {
        line.push_str(&format!(" {}", "(inactive)".red()));
    }
    line
}

fn transaction_line(txn: &Transaction) -> String {
    let points = if txn.points > 0 {
        format!("+{}", txn.points).green()
    } else {
        txn.points.to_string().red()
    };
    let mut line = format!("{} {} {points}", txn.created_at.dimmed(), txn.kind);
    if let Some(description) = &txn.description {
        line.push_str(&format!(" {description}"));
    }
    line
}
