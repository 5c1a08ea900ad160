//! CLI module - Command-line interface for the logbook server
//!
//! This module provides a structured CLI using clap for argument parsing.

mod commands;

use clap::{Parser, Subcommand};

/// Logbook - multi-user activity log
#[derive(Parser)]
#[command(name = "logbook")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the web server (default)
    #[command(alias = "daemon")]
    Serve,

    /// Create the database schema if it is missing
    Setup,

    /// List registered users
    #[command(alias = "ls")]
    Users,

    /// Allow a user to log in again
    Activate {
        /// Username
        username: String,
    },

    /// Block a user from logging in
    Deactivate {
        /// Username
        username: String,
    },

    /// Drop all tables and data
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },

    /// Create default config file
    Init,
}

pub use commands::*;
