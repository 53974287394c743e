//! CLI command definitions for taskboard
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

pub mod write;

use crate::format::OutputFormat;
use crate::types::{Collection, Role, StatusFilter, TaskView};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use write::{AddUserArgs, AssignArgs, MarkDoneArgs, SubmitCommand};

/// Checklist and delegation dashboard
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Path to database file (overrides config)
    #[arg(short, long, global = true)]
    pub database: Option<String>,

    /// Caller role: user or admin
    #[arg(long, default_value = "admin", global = true)]
    pub role: Role,

    /// Caller's own assignee name
    #[arg(short, long, default_value = "", global = true)]
    pub user: String,

    /// Comma-separated departments an admin may see
    #[arg(long, global = true)]
    pub access: Option<String>,

    /// Evaluate views as of this day instead of today (YYYY-MM-DD)
    #[arg(long, global = true)]
    pub today: Option<NaiveDate>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t, global = true)]
    pub format: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the dashboard JSON API
    Serve(ServeArgs),

    /// Total, completed, pending and overdue counts with completion rate
    Summary(ScopeArgs),

    /// One page of a task view
    Tasks(TasksArgs),

    /// Checklist tasks in a date range
    Range(RangeArgs),

    /// Tasks still awaiting submission
    Pending(PendingArgs),

    /// Submitted checklist tasks
    History(SearchArgs),

    /// Per-staff rollup
    Staff(StaffArgs),

    /// Assign new tasks
    Assign(AssignArgs),

    /// Submit checklist or delegation work
    #[command(subcommand)]
    Submit(SubmitCommand),

    /// Administratively mark checklist tasks done
    MarkDone(MarkDoneArgs),

    /// Departments known to the user directory
    Departments,

    /// Staff names, optionally limited to one department
    StaffNames(StaffNamesArgs),

    /// Add an account to the user directory
    AddUser(AddUserArgs),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to bind (overrides config)
    #[arg(long)]
    pub bind: Option<String>,

    /// Port to listen on (overrides config)
    #[arg(long)]
    pub port: Option<u16>,
}

/// Collection plus the dashboard staff and department filters.
#[derive(Args, Debug)]
pub struct ScopeArgs {
    /// checklist or delegation
    pub collection: Collection,

    /// Staff name, or "all"
    #[arg(long)]
    pub staff: Option<String>,

    /// Department name, or "all" (checklist only)
    #[arg(long)]
    pub department: Option<String>,
}

#[derive(Args, Debug)]
pub struct PageArgs {
    /// 1-based page number
    #[arg(long, default_value_t = 1)]
    pub page: u32,

    /// Rows per page (default from config)
    #[arg(long)]
    pub page_size: Option<u32>,
}

#[derive(Args, Debug)]
pub struct TasksArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,

    /// recent, upcoming, overdue or all
    #[arg(long, default_value = "recent")]
    pub view: TaskView,

    #[command(flatten)]
    pub paging: PageArgs,

    /// Print only the matching row count
    #[arg(long)]
    pub count: bool,
}

#[derive(Args, Debug)]
pub struct RangeArgs {
    /// First day (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Last day, inclusive (YYYY-MM-DD)
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// all, completed, pending or overdue
    #[arg(long, default_value = "all")]
    pub status: StatusFilter,

    #[arg(long)]
    pub staff: Option<String>,

    #[arg(long)]
    pub department: Option<String>,

    #[command(flatten)]
    pub paging: PageArgs,

    /// Print statistics for the range instead of rows
    #[arg(long, conflicts_with = "count")]
    pub stats: bool,

    /// Print only the matching row count
    #[arg(long)]
    pub count: bool,
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Case-insensitive text to look for
    #[arg(long)]
    pub search: Option<String>,

    #[command(flatten)]
    pub paging: PageArgs,
}

#[derive(Args, Debug)]
pub struct PendingArgs {
    /// checklist or delegation
    pub collection: Collection,

    #[command(flatten)]
    pub search: SearchArgs,
}

#[derive(Args, Debug)]
pub struct StaffArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,

    /// 1-based page number
    #[arg(long, default_value_t = 1)]
    pub page: u32,

    /// Staff per page (default from config)
    #[arg(long)]
    pub page_size: Option<u32>,

    /// Keep paging until the roster is complete
    #[arg(long)]
    pub all: bool,
}

#[derive(Args, Debug)]
pub struct StaffNamesArgs {
    /// Department to filter by
    #[arg(long)]
    pub department: Option<String>,
}
