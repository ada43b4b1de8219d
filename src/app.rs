use chrono::Utc;
use serde_json::json;
use std::path::Path;
use std::time::Duration;

use crate::cli::{AddArgs, Commands, ListArgs, OriginArgs};
use crate::context::{ContextProvider, resolve_or_empty};
use crate::core::{
    DedupCriteria, DedupOptions, Filter, FilterOptions, GroupMode, Level, NewNotification,
    SortOptions, State, deduplicate, get_group_counts, group_notifications, search_notifications,
    sort_notifications, sort_with_unread_first,
};
use crate::error::AppError;
use crate::output::{
    StatusView, TableOptions, group_counts_json, print_dedup_table, print_group_counts,
    print_group_tables, print_notification_table, print_status, status_json, to_json,
};
use crate::storage::migrate::{MigrationReport, migrate_tsv_to_sqlite};
use crate::storage::sqlite::DB_FILE;
use crate::storage::{Backend, SqliteStore, Store};
use crate::utils::parse_duration;

/// Collaborators built once in `main` and handed to every handler
pub(crate) struct CommandContext<'a> {
    pub(crate) store: &'a dyn Store,
    pub(crate) context: &'a dyn ContextProvider,
    pub(crate) state_dir: &'a Path,
    pub(crate) lock_timeout: Duration,
    /// `[dedup]` defaults from config
    pub(crate) dedup: DedupOptions,
    pub(crate) json: bool,
    pub(crate) use_color: bool,
}

fn print_json(json: &str) {
    println!("{json}");
}

pub(crate) fn parse_id(input: &str) -> Result<i64, AppError> {
    match input.trim().parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(AppError::InvalidId {
            input: input.to_string(),
        }),
    }
}

fn origin_part(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or_default()
}

fn handle_add(args: &AddArgs, ctx: &CommandContext<'_>) -> Result<(), AppError> {
    let level: Level = args.level.parse().map_err(|_| AppError::InvalidLevel {
        input: args.level.clone(),
    })?;

    let mut new = NewNotification::new(args.message.join(" ")).with_level(level);
    if args.origin.is_empty() && !args.no_context {
        let origin = resolve_or_empty(ctx.context);
        new = new
            .with_origin(origin.session, origin.window, origin.pane)
            .with_pane_created(origin.pane_created);
    } else {
        new = new.with_origin(
            origin_part(&args.origin.session),
            origin_part(&args.origin.window),
            origin_part(&args.origin.pane),
        );
    }
    if let Some(marker) = &args.pane_created {
        new = new.with_pane_created(marker.as_str());
    }
    if let Some(ts) = &args.timestamp {
        new = new.with_timestamp(ts.as_str());
    }

    let id = ctx.store.add(new)?;
    if ctx.json {
        print_json(&to_json(&json!({ "id": id }))?);
    } else {
        println!("Added notification {id}");
    }
    Ok(())
}

/// Dedup options for `list`: flags override the configured defaults.
fn list_dedup_options(args: &ListArgs, defaults: DedupOptions) -> Result<DedupOptions, AppError> {
    let criteria = match args.dedup_criteria.as_deref() {
        None => defaults.criteria,
        Some(raw) => DedupCriteria::parse(raw).unwrap_or_else(|| {
            log::warn!("event=dedup_fallback criteria={raw} default=message");
            DedupCriteria::default()
        }),
    };
    let window = match args.dedup_window.as_deref() {
        None => defaults.window,
        Some(raw) => Some(parse_duration(raw).map_err(|_| AppError::InvalidDuration {
            input: raw.to_string(),
        })?),
    };
    Ok(DedupOptions { criteria, window })
}

fn list_filter(args: &ListArgs) -> Filter {
    FilterOptions {
        state: Some(args.state.clone()),
        level: args.level.clone(),
        session: args.origin.session.clone(),
        window: args.origin.window.clone(),
        pane: args.origin.pane.clone(),
        older_than_days: args.older_than,
        newer_than_days: args.newer_than,
        read: args.filter.clone(),
    }
    .to_filter(Utc::now())
}

/// List → search → sort → group or dedup → render.
fn handle_list(args: &ListArgs, ctx: &CommandContext<'_>) -> Result<(), AppError> {
    let filter = list_filter(args);
    let mut notifs = ctx.store.list(&filter)?;
    if let Some(query) = &args.search {
        notifs = search_notifications(notifs, query, args.ignore_case);
    }

    let sort = SortOptions::from_names(
        args.sort.as_deref().unwrap_or("timestamp"),
        args.order.as_deref().unwrap_or("desc"),
        args.ignore_case,
    );
    let sorted = if args.unread_first {
        sort_with_unread_first(&notifs, &sort)
    } else {
        sort_notifications(&notifs, &sort)
    };

    let dedup = list_dedup_options(args, ctx.dedup)?;
    let mode = args
        .group_by
        .as_deref()
        .map_or(GroupMode::None, GroupMode::parse_or_none);
    let table_opts = TableOptions {
        use_color: ctx.use_color,
        show_state: filter.state != Some(State::Active),
    };

    if args.group_count {
        if mode == GroupMode::None {
            log::warn!("event=group_count_ignored reason=no_group_mode");
        } else {
            let counts = get_group_counts(&sorted, mode, &dedup);
            if ctx.json {
                print_json(&to_json(&group_counts_json(mode, &counts))?);
            } else {
                print_group_counts(mode, &counts, ctx.use_color);
            }
            return Ok(());
        }
    }

    if mode != GroupMode::None {
        if args.dedup {
            log::warn!("event=dedup_ignored reason=grouped hint=\"use --group-by message\"");
        }
        let result = group_notifications(&sorted, mode, &dedup);
        if ctx.json {
            print_json(&to_json(&result)?);
        } else {
            print_group_tables(&result, &table_opts);
        }
    } else if args.dedup {
        let entries = deduplicate(&sorted, &dedup);
        if ctx.json {
            print_json(&to_json(&entries)?);
        } else {
            print_dedup_table(&entries, &table_opts);
        }
    } else if ctx.json {
        print_json(&to_json(&sorted)?);
    } else {
        print_notification_table(&sorted, &table_opts);
    }
    Ok(())
}

fn report_count(ctx: &CommandContext<'_>, key: &str, count: usize, text: &str) -> Result<(), AppError> {
    if ctx.json {
        let mut obj = serde_json::Map::new();
        obj.insert(key.to_string(), json!(count));
        print_json(&to_json(&obj)?);
    } else {
        println!("{text}");
    }
    Ok(())
}

fn handle_dismiss(id: &str, ctx: &CommandContext<'_>) -> Result<(), AppError> {
    let id = parse_id(id)?;
    ctx.store.dismiss(id)?;
    if ctx.json {
        print_json(&to_json(&json!({ "dismissed": id }))?);
    } else {
        println!("Dismissed notification {id}");
    }
    Ok(())
}

fn handle_dismiss_by(origin: &OriginArgs, ctx: &CommandContext<'_>) -> Result<(), AppError> {
    if origin.is_empty() {
        return Err(AppError::MissingOrigin);
    }
    let count = ctx.store.dismiss_by_filter(
        origin_part(&origin.session),
        origin_part(&origin.window),
        origin_part(&origin.pane),
    )?;
    report_count(ctx, "dismissed", count, &format!("Dismissed {count} notification(s)"))
}

fn handle_mark(id: &str, read: bool, ctx: &CommandContext<'_>) -> Result<(), AppError> {
    let id = parse_id(id)?;
    if read {
        ctx.store.mark_read(id)?;
    } else {
        ctx.store.mark_unread(id)?;
    }
    let state = if read { "read" } else { "unread" };
    if ctx.json {
        let n = ctx.store.get(id)?;
        print_json(&to_json(&json!({
            "id": id,
            "status": state,
            "read_timestamp": n.read_timestamp,
        }))?);
    } else {
        println!("Marked notification {id} as {state}");
    }
    Ok(())
}

fn handle_cleanup(days: u32, dry_run: bool, ctx: &CommandContext<'_>) -> Result<(), AppError> {
    let report = ctx.store.cleanup_old(days, dry_run)?;
    if ctx.json {
        print_json(&to_json(&json!({
            "days": days,
            "dry_run": dry_run,
            "candidates": report.candidates,
            "deleted": report.deleted,
        }))?);
    } else if dry_run {
        println!(
            "Would delete {} dismissed notification(s) older than {days} day(s)",
            report.candidates.len()
        );
        for id in &report.candidates {
            println!("  {id}");
        }
    } else {
        println!("Deleted {} dismissed notification(s)", report.deleted);
    }
    Ok(())
}

fn handle_status(group_by: &str, ctx: &CommandContext<'_>) -> Result<(), AppError> {
    let active = ctx.store.list(&Filter::active())?;
    let mode = GroupMode::parse_or_none(group_by);
    let counts = get_group_counts(&active, mode, &ctx.dedup);
    let view = StatusView {
        backend: ctx.store.backend(),
        active: ctx.store.active_count()?,
        unread: active.iter().filter(|n| !n.is_read()).count(),
        mode,
        counts: &counts,
    };
    if ctx.json {
        print_json(&to_json(&status_json(&view))?);
    } else {
        print_status(&view, ctx.use_color);
    }
    Ok(())
}

fn print_migration(report: &MigrationReport, ctx: &CommandContext<'_>) -> Result<(), AppError> {
    if ctx.json {
        print_json(&to_json(report)?);
        return Ok(());
    }
    let verb = if report.dry_run { "Would migrate" } else { "Migrated" };
    println!(
        "{verb} {} notification(s) from {} line(s): {} superseded, {} skipped",
        report.migrated_rows, report.total_rows, report.duplicate_rows, report.skipped_rows
    );
    if let Some(backup) = &report.backup_path {
        println!("TSV backup written to {}", backup.display());
    }
    Ok(())
}

fn handle_migrate(dry_run: bool, ctx: &CommandContext<'_>) -> Result<(), AppError> {
    let tsv_path = Backend::Tsv.data_path(ctx.state_dir);
    let db = SqliteStore::open(&ctx.state_dir.join(DB_FILE), ctx.lock_timeout)?;
    let report = migrate_tsv_to_sqlite(&tsv_path, &db, dry_run)?;
    print_migration(&report, ctx)
}

pub(crate) fn run(command: &Commands, ctx: &CommandContext<'_>) -> Result<(), AppError> {
    match command {
        Commands::Add(args) => handle_add(args, ctx),
        Commands::List(args) => handle_list(args, ctx),
        Commands::Dismiss { id } => handle_dismiss(id, ctx),
        Commands::DismissAll => {
            let count = ctx.store.dismiss_all()?;
            report_count(ctx, "dismissed", count, &format!("Dismissed {count} notification(s)"))
        }
        Commands::DismissBy(origin) => handle_dismiss_by(origin, ctx),
        Commands::MarkRead { id } => handle_mark(id, true, ctx),
        Commands::MarkUnread { id } => handle_mark(id, false, ctx),
        Commands::Cleanup { days, dry_run } => {
            handle_cleanup(days.unwrap_or(crate::config::DEFAULT_CLEANUP_DAYS), *dry_run, ctx)
        }
        Commands::Status { group_by } => handle_status(group_by, ctx),
        Commands::Migrate { dry_run } => handle_migrate(*dry_run, ctx),
    }
}
