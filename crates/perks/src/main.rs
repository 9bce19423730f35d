// SPDX-FileCopyrightText: 2026 Perks Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Perks - a loyalty-points bot core.
//!
//! This is the binary entry point: the session sweeper daemon, a line-based
//! shell that talks to the bot as a given contact, and administrative
//! commands that work directly on the database.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod admin;
mod serve;
mod shell;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use perks_core::Role;

/// Perks - a loyalty-points bot core.
#[derive(Parser, Debug)]
#[command(name = "perks", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the session sweeper until interrupted.
    Serve,
    /// Talk to the bot interactively as the given contact id.
    Shell {
        #[arg(long = "as", value_name = "EXTERNAL_ID")]
        user: String,
    },
    /// Delete expired sessions once and exit.
    Sweep,
    /// Manage staff accounts.
    Staff {
        #[command(subcommand)]
        action: StaffCommands,
    },
    /// Credit bonus points to a card, attributed to the system operator.
    Bonus {
        /// Card number of the client.
        card: String,
        /// Points to credit.
        points: i64,
        /// Ledger comment.
        #[arg(long)]
        comment: String,
        /// Skip the client if a bonus was credited within this many days.
        #[arg(long, value_name = "DAYS")]
        cooldown: Option<u32>,
    },
    /// Compare every stored balance with its ledger rows.
    Audit,
}

#[derive(Subcommand, Debug)]
enum StaffCommands {
    /// Create a staff account.
    Add {
        /// Chat contact id of the staff member.
        external_id: String,
        /// Display name.
        name: String,
        /// barista, manager or admin.
        #[arg(long, default_value = "barista")]
        role: Role,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => perks_config::load_and_validate_path(path),
        None => perks_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            perks_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Shell { user }) => shell::run_shell(config, &user).await,
        Some(Commands::Sweep) => admin::run_sweep(&config).await,
        Some(Commands::Staff {
            action:
                StaffCommands::Add {
                    external_id,
                    name,
                    role,
                },
        }) => admin::run_staff_add(&config, &external_id, &name, role).await,
        Some(Commands::Bonus {
            card,
            points,
            comment,
            cooldown,
        }) => admin::run_bonus(&config, &card, points, &comment, cooldown).await,
        Some(Commands::Audit) => admin::run_audit(&config).await,
        None => {
            println!("perks: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
