//! taskboard
//!
//! Checklist and delegation dashboard: task views, completion summaries and
//! staff rollups over a SQLite task database, from the command line or as a
//! JSON API.

use anyhow::Result;
use clap::Parser;
use serde::Serialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use taskboard::aggregate::{date_range_stats, summarize};
use taskboard::cli::write::SubmitCommand;
use taskboard::cli::{Cli, Command, PendingArgs, RangeArgs, StaffArgs, TasksArgs};
use taskboard::config::{Config, ConfigPaths};
use taskboard::context::RequestContext;
use taskboard::dashboard::{DashboardServer, start_server};
use taskboard::db::Database;
use taskboard::directory::{fetch_departments, fetch_staff_names};
use taskboard::format::{
    OutputFormat, format_range_stats_markdown, format_staff_markdown, format_summary_markdown,
    format_task_page_markdown, format_tasks_markdown, to_json,
};
use taskboard::lifecycle::{assign_tasks, mark_done, submit_checklist, submit_delegation};
use taskboard::logging::{LogTarget, init_logging};
use taskboard::query::{DateRangeParams, ViewParams};
use taskboard::rollup::{StaffRoster, fetch_staff_page};
use taskboard::store::TaskStore;
use taskboard::types::Collection;
use taskboard::views::{
    count_date_range, count_view, fetch_checklist_history, fetch_checklist_pending,
    fetch_date_range, fetch_delegation_pending, fetch_view,
};
use tracing::{debug, info};

/// Print a result in the requested format.
fn emit<T: Serialize>(format: OutputFormat, value: &T, markdown: impl FnOnce(&T) -> String) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", to_json(value)?),
        OutputFormat::Markdown => print!("{}", markdown(value)),
    }
    Ok(())
}

fn request_context(cli: &Cli) -> RequestContext {
    let mut ctx = RequestContext::new(cli.role, cli.user.clone());
    if let Some(access) = &cli.access {
        ctx = ctx.with_access(access);
    }
    if let Some(today) = cli.today {
        ctx = ctx.with_today(today);
    }
    ctx
}

async fn run_tasks(
    store: &dyn TaskStore,
    ctx: &RequestContext,
    config: &Config,
    format: OutputFormat,
    args: TasksArgs,
) -> Result<()> {
    let params = ViewParams {
        collection: args.scope.collection,
        staff: args.scope.staff,
        department: args.scope.department,
        view: args.view,
        page: args.paging.page,
        page_size: args.paging.page_size.unwrap_or(config.dashboard.page_size),
    };
    if args.count {
        let count = count_view(store, ctx, &params).await;
        return emit(format, &count, |c| format!("{}\n", c));
    }
    let page = fetch_view(store, ctx, &params).await?;
    emit(format, &page, format_task_page_markdown)
}

async fn run_range(
    store: &dyn TaskStore,
    ctx: &RequestContext,
    config: &Config,
    format: OutputFormat,
    args: RangeArgs,
) -> Result<()> {
    let params = DateRangeParams {
        start: args.start,
        end: args.end,
        staff: args.staff,
        department: args.department,
        status: args.status,
        page: args.paging.page,
        page_size: args.paging.page_size.unwrap_or(config.dashboard.page_size),
    };
    if args.stats {
        let stats = date_range_stats(store, ctx, &params).await?;
        return emit(format, &stats, format_range_stats_markdown);
    }
    if args.count {
        let count = count_date_range(store, ctx, &params).await;
        return emit(format, &count, |c| format!("{}\n", c));
    }
    let page = fetch_date_range(store, ctx, &params).await?;
    emit(format, &page, format_task_page_markdown)
}

async fn run_pending(
    store: &dyn TaskStore,
    ctx: &RequestContext,
    config: &Config,
    format: OutputFormat,
    args: PendingArgs,
) -> Result<()> {
    match args.collection {
        Collection::Checklist => {
            let page = fetch_checklist_pending(
                store,
                ctx,
                args.search.search.as_deref(),
                args.search.paging.page,
                args.search
                    .paging
                    .page_size
                    .unwrap_or(config.dashboard.page_size),
            )
            .await?;
            emit(format, &page, format_task_page_markdown)
        }
        Collection::Delegation => {
            let rows = fetch_delegation_pending(store, ctx).await;
            emit(format, &rows, |rows| format_tasks_markdown(rows))
        }
    }
}

async fn run_staff(
    store: &dyn TaskStore,
    ctx: &RequestContext,
    config: &Config,
    format: OutputFormat,
    args: StaffArgs,
) -> Result<()> {
    let page_size = args.page_size.unwrap_or(config.dashboard.staff_page_size);
    let scope = &args.scope;
    if !args.all {
        let page = fetch_staff_page(
            store,
            ctx,
            scope.collection,
            scope.staff.as_deref(),
            scope.department.as_deref(),
            args.page,
            page_size,
        )
        .await?;
        return emit(format, &page, format_staff_markdown);
    }

    let mut roster = StaffRoster::new();
    let mut last = None;
    while let Some(page_no) = roster.begin_next() {
        let page = fetch_staff_page(
            store,
            ctx,
            scope.collection,
            scope.staff.as_deref(),
            scope.department.as_deref(),
            page_no,
            page_size,
        )
        .await?;
        debug!(page = page_no, staff = page.staff.len(), "staff page");
        roster.finish(page.clone());
        last = Some(page);
    }
    let Some(mut page) = last else {
        return Ok(());
    };
    page.staff = roster.staff;
    page.page = 1;
    page.total_staff = roster.total_staff;
    page.total_users = roster.total_users;
    emit(format, &page, format_staff_markdown)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&LogTarget::parse(&cli.log), cli.verbose)?;

    let paths = ConfigPaths::discover(cli.config.as_ref().map(PathBuf::from));
    let mut config = Config::resolve(&paths)?;
    if let Some(db_path) = &cli.database {
        config.server.db_path = db_path.into();
    }
    config.ensure_db_dir()?;

    let db = Database::open(&config.server.db_path)?;
    debug!(path = %config.server.db_path.display(), "database opened");
    let ctx = request_context(&cli);
    let format = cli.format;
    let store: &dyn TaskStore = &db;

    match cli.command {
        Command::Serve(args) => {
            let bind = args.bind.unwrap_or_else(|| config.server.bind.clone());
            let port = args.port.unwrap_or(config.server.port);
            let addr: SocketAddr = format!("{}:{}", bind, port).parse()?;
            let state = DashboardServer::new(Arc::new(db.clone()), config.dashboard.clone());
            let (shutdown_tx, bound) = start_server(state, addr).await?;
            info!("Serving dashboard API on http://{}", bound);
            tokio::signal::ctrl_c().await?;
            let _ = shutdown_tx.send(());
        }
        Command::Summary(args) => {
            let summary = summarize(
                store,
                &ctx,
                args.collection,
                args.staff.as_deref(),
                args.department.as_deref(),
            )
            .await;
            let title = format!("{} summary", args.collection);
            emit(format, &summary, |s| format_summary_markdown(&title, s))?;
        }
        Command::Tasks(args) => run_tasks(store, &ctx, &config, format, args).await?,
        Command::Range(args) => run_range(store, &ctx, &config, format, args).await?,
        Command::Pending(args) => run_pending(store, &ctx, &config, format, args).await?,
        Command::History(args) => {
            let page = fetch_checklist_history(
                store,
                &ctx,
                args.search.as_deref(),
                args.paging.page,
                args.paging.page_size.unwrap_or(config.dashboard.page_size),
            )
            .await?;
            emit(format, &page, format_task_page_markdown)?;
        }
        Command::Staff(args) => run_staff(store, &ctx, &config, format, args).await?,
        Command::Assign(args) => {
            let task = args.to_task()?;
            let rows = assign_tasks(store, std::slice::from_ref(&task)).await?;
            emit(format, &rows, |rows| format_tasks_markdown(rows))?;
        }
        Command::Submit(SubmitCommand::Checklist(args)) => {
            let rows = submit_checklist(store, &args.to_submissions()).await?;
            emit(format, &rows, |rows| format_tasks_markdown(rows))?;
        }
        Command::Submit(SubmitCommand::Delegation(args)) => {
            let row = submit_delegation(store, &args.to_submission()?).await?;
            emit(format, &row, |row| format_tasks_markdown(std::slice::from_ref(row)))?;
        }
        Command::MarkDone(args) => {
            let affected = mark_done(store, &ctx, &args.task_ids).await?;
            emit(format, &affected, |n| format!("Marked {} task(s) done.\n", n))?;
        }
        Command::Departments => {
            let departments = fetch_departments(store).await?;
            emit(format, &departments, |d| format!("{}\n", d.join("\n")))?;
        }
        Command::StaffNames(args) => {
            let names = fetch_staff_names(store, args.department.as_deref()).await?;
            emit(format, &names, |n| format!("{}\n", n.join("\n")))?;
        }
        Command::AddUser(args) => {
            let user = db.insert_user(
                &args.name,
                &args.account_role,
                args.account_access.as_deref(),
                args.department.as_deref(),
            )?;
            emit(format, &user, |u| format!("Added user {} (id {}).\n", args.name, u.id))?;
        }
    }

    Ok(())
}
