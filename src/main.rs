//! Quota Console - administration CLI for memberships and quota grants
//!
//! Grants and edits individual memberships, queries quota usage with
//! spreadsheet export, and manages enterprise accounts and their rosters.

use std::process::ExitCode;

use anyhow::Context;
use chrono::{DateTime, FixedOffset, Offset, Utc};
use tracing::{debug, warn};

use quota_console::cli::{self, Command, EnterpriseCommand};
use quota_console::models::{Enterprise, MemberInfo, MembersInfo};
use quota_console::services::export::QuotaWorkbook;
use quota_console::services::membership::{self, MembershipMutationBuilder, MutationOutcome};
use quota_console::services::quota_query::QueryResult;
use quota_console::services::RosterDraft;
use quota_console::utils::error::{AppError, AppResult};
use quota_console::config::{self, LogFormat};
use quota_console::{AppConfig, ConsoleContext};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = cli::parse();

    // Load configuration first (before logging, so we know log format)
    let config = match AppConfig::load(cli.config_path.as_deref())
        .context("Failed to load configuration")
    {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    // The guard must be kept alive for the duration of the program
    let _log_guard = init_logging(&config);
    debug!(backend = %config.backend.url, "Configuration loaded");

    let ctx = match ConsoleContext::new(config) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(&ctx, cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", err.user_message());
            if err.is_retryable() {
                eprintln!("(the request can be retried)");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(ctx: &ConsoleContext, command: Command) -> AppResult<()> {
    let display = display_offset(&ctx.config);

    match command {
        Command::Emails { search } => {
            let directory = ctx.refresh_directory().await?;
            let matches = directory.search(search.as_deref().unwrap_or(""));
            for email in &matches {
                println!("{}", email);
            }
            eprintln!("{} of {} registered emails", matches.len(), directory.len());
            Ok(())
        }

        Command::Members { member_type } => {
            let members = membership::list_members(ctx.client.as_ref(), member_type).await?;
            println!("{} members ({})", member_type, members.len());
            print_members(&members, &display);
            Ok(())
        }

        Command::MembersInfo { emails } => {
            let info = membership::lookup_members(ctx.client.as_ref(), &emails).await?;
            print_members_info(&info, &display);
            Ok(())
        }

        Command::Grant(args) => {
            let form = args.into_form(ctx.config.membership.local_utc_offset_hours)?;
            let directory = ctx.directory().await?;
            let request =
                MembershipMutationBuilder::new(&directory, &ctx.config.membership).build(&form)?;

            match membership::submit(ctx.client.as_ref(), &request).await {
                outcome @ MutationOutcome::Succeeded { .. } => {
                    println!("{} ({} accounts)", outcome.message(), request.emails.len());
                    Ok(())
                }
                MutationOutcome::Failed { message, retryable } => Err(if retryable {
                    AppError::Transport(message)
                } else {
                    AppError::DomainRejection(message)
                }),
            }
        }

        Command::Query(args) => {
            let mut usage = ctx.usage.lock().await;
            let result = usage.query(&args.email, args.range()).await?;
            print_usage(result, &display, ctx.config.export.usage_divisor);

            if args.export {
                let today = Utc::now().with_timezone(&display).date_naive();
                let workbook = QuotaWorkbook::build(result, today, &ctx.config.export)?;
                let path = workbook.save(&ctx.config.export.output_dir)?;
                println!("Exported to {}", path.display());
            }
            Ok(())
        }

        Command::Enterprise { command } => run_enterprise(ctx, command, &display).await,
    }
}

async fn run_enterprise(
    ctx: &ConsoleContext,
    command: EnterpriseCommand,
    display: &FixedOffset,
) -> AppResult<()> {
    let service = ctx.enterprises();
    let local_offset = ctx.config.membership.local_utc_offset_hours;

    match command {
        EnterpriseCommand::List(args) => {
            let page = service.list(&args.to_query()).await?;
            for enterprise in &page.data {
                println!(
                    "{}\t{}\t{}\t{}/{}\t{}",
                    enterprise.id,
                    enterprise.name,
                    enterprise.status,
                    enterprise.used_quota,
                    enterprise.account_quota,
                    fmt_time(enterprise.expire_at, display)
                );
            }
            if let Some(total) = page.total {
                eprintln!("{} of {} enterprises", page.data.len(), total);
            }
            Ok(())
        }

        EnterpriseCommand::Show { id } => {
            let enterprise = service.get(&id).await?;
            print_enterprise(&enterprise, display);
            Ok(())
        }

        EnterpriseCommand::Create {
            fields,
            members,
            admins,
        } => {
            let params = fields.into_create_params(local_offset)?;
            let directory = ctx.directory().await?;
            let draft = RosterDraft::with(&members, &admins);
            let message = service.create(&directory, params, &draft).await?;
            println!("{}", message.as_deref().unwrap_or("Enterprise created"));
            Ok(())
        }

        EnterpriseCommand::Update { id, fields, status } => {
            let params = fields.into_update_params(status, local_offset)?;
            let message = service.update(&id, &params).await?;
            println!("{}", message.as_deref().unwrap_or("Enterprise updated"));
            Ok(())
        }

        EnterpriseCommand::AddMembers {
            id,
            members,
            admins,
        } => {
            let directory = ctx.directory().await?;
            let message = service
                .add_members(&directory, &id, &members, &admins)
                .await?;
            println!("{}", message.as_deref().unwrap_or("Members added"));
            Ok(())
        }

        EnterpriseCommand::RemoveMember { id, user_id } => {
            let message = service.remove_member(&id, &user_id).await?;
            println!("{}", message.as_deref().unwrap_or("Member removed"));
            Ok(())
        }
    }
}

fn display_offset(config: &AppConfig) -> FixedOffset {
    FixedOffset::east_opt(config.export.utc_offset_hours * 3600).unwrap_or_else(|| {
        warn!("Invalid display offset, falling back to UTC");
        Utc.fix()
    })
}

fn fmt_time(value: Option<DateTime<Utc>>, offset: &FixedOffset) -> String {
    value
        .map(|dt| dt.with_timezone(offset).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn print_members(members: &[MemberInfo], display: &FixedOffset) {
    println!("EMAIL\tQUOTA\tUSED\tAVAILABLE\tEFFECTIVE\tEXPIRES");
    for member in members {
        println!(
            "{}\t{}\t{}\t{}\t{}\t{}",
            member.email,
            member.account_quota,
            member.used_quota,
            member.available_quota(),
            fmt_time(member.effective_at, display),
            fmt_time(member.expire_at, display)
        );
    }
}

fn print_members_info(info: &MembersInfo, display: &FixedOffset) {
    for user in &info.users {
        match &user.membership {
            Some(window) => println!(
                "{}\t{} {:?}\tquota {}/{} (available {})\t{} - {}",
                user.email,
                window.member_type,
                window.status,
                window.used_quota,
                window.account_quota,
                window.available_quota(),
                fmt_time(window.effective_at, display),
                fmt_time(window.expire_at, display)
            ),
            None => println!("{}\tno membership", user.email),
        }
    }
    for email in &info.stats.not_found_emails {
        println!("{}\tnot registered", email);
    }
    eprintln!(
        "{} requested, {} found, {} not found",
        info.stats.total, info.stats.found, info.stats.not_found
    );
}

fn print_usage(result: &QueryResult, display: &FixedOffset, divisor: f64) {
    println!("Usage for {}", result.email);
    println!("TIME\tCOST\tTYPE\tDESCRIPTION");
    for event in &result.events {
        println!(
            "{}\t{}\t{}\t{}",
            event
                .time
                .with_timezone(display)
                .format("%Y-%m-%d %H:%M:%S"),
            event.quota_cost / divisor,
            event.quota_type,
            event.description.as_deref().unwrap_or("")
        );
    }
    println!("Total\t{}", result.total_cost() / divisor);
    println!();
    println!("DATE\tDAILY USAGE");
    for day in &result.daily {
        let date = day
            .day(display)
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| day.date.clone());
        println!("{}\t{}", date, day.daily_usage / divisor);
    }
    for slot in &result.degraded {
        eprintln!("warning: {:?} lookup failed, section left empty", slot);
    }
}

fn print_enterprise(enterprise: &Enterprise, display: &FixedOffset) {
    println!("{} ({})", enterprise.name, enterprise.id);
    println!("  Status:   {}", enterprise.status);
    println!(
        "  Quota:    {}/{}",
        enterprise.used_quota, enterprise.account_quota
    );
    if let Some(limit) = enterprise.member_usage_daily_limit {
        println!("  Daily member limit: {}", limit);
    }
    println!(
        "  Window:   {} - {}",
        fmt_time(enterprise.effective_at, display),
        fmt_time(enterprise.expire_at, display)
    );
    if let Some(ref contact) = enterprise.contact_person {
        println!("  Contact:  {}", contact);
    }
    println!(
        "  Members ({}, {} admins):",
        enterprise.members.len(),
        enterprise.admin_count()
    );
    for member in &enterprise.members {
        let role = if member.is_enterprise_admin {
            "admin"
        } else {
            "member"
        };
        println!("    {}\t{}\t{}", member.user_id, member.email(), role);
    }
}

fn init_logging(config: &AppConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use config::LogTarget;
    use tracing_subscriber::{prelude::*, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    let log_config = &config.logging;

    match &log_config.target {
        LogTarget::Console => {
            let subscriber = tracing_subscriber::registry().with(env_filter);
            init_console_logging(subscriber, &log_config.format);
            None
        }
        LogTarget::File => {
            let (writer, guard) = create_file_writer(log_config);
            let subscriber = tracing_subscriber::registry().with(env_filter);
            init_file_logging(subscriber, &log_config.format, writer);
            Some(guard)
        }
        LogTarget::Both => {
            let (writer, guard) = create_file_writer(log_config);
            let subscriber = tracing_subscriber::registry().with(env_filter);
            init_both_logging(subscriber, &log_config.format, writer);
            Some(guard)
        }
    }
}

fn create_file_writer(
    log_config: &config::LoggingConfig,
) -> (
    tracing_appender::non_blocking::NonBlocking,
    tracing_appender::non_blocking::WorkerGuard,
) {
    if let Err(e) = std::fs::create_dir_all(&log_config.log_dir) {
        eprintln!(
            "Warning: Failed to create log directory {:?}: {}",
            log_config.log_dir, e
        );
    }

    let file_appender = if log_config.daily_rotation {
        tracing_appender::rolling::daily(&log_config.log_dir, &log_config.log_prefix)
    } else {
        tracing_appender::rolling::never(&log_config.log_dir, &log_config.log_prefix)
    };

    tracing_appender::non_blocking(file_appender)
}

// Console output goes to stderr; stdout carries command results.
fn init_console_logging<S>(subscriber: S, format: &LogFormat)
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a> + Send + Sync,
{
    use tracing_subscriber::{fmt, prelude::*};

    match format {
        LogFormat::Json => {
            subscriber
                .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Compact => {
            subscriber
                .with(
                    fmt::layer()
                        .compact()
                        .with_target(false)
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        LogFormat::Pretty => {
            subscriber
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_thread_ids(false)
                        .with_file(false)
                        .with_line_number(false)
                        .with_writer(std::io::stderr),
                )
                .init();
        }
    }
}

fn init_file_logging<S>(
    subscriber: S,
    format: &LogFormat,
    writer: tracing_appender::non_blocking::NonBlocking,
) where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a> + Send + Sync,
{
    use tracing_subscriber::{fmt, prelude::*};

    match format {
        LogFormat::Json => {
            subscriber
                .with(fmt::layer().json().with_target(true).with_writer(writer))
                .init();
        }
        LogFormat::Compact => {
            subscriber
                .with(
                    fmt::layer()
                        .compact()
                        .with_target(false)
                        .with_ansi(false)
                        .with_writer(writer),
                )
                .init();
        }
        LogFormat::Pretty => {
            subscriber
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_ansi(false)
                        .with_writer(writer),
                )
                .init();
        }
    }
}

fn init_both_logging<S>(
    subscriber: S,
    format: &LogFormat,
    writer: tracing_appender::non_blocking::NonBlocking,
) where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a> + Send + Sync,
{
    use tracing_subscriber::{fmt, prelude::*};

    match format {
        LogFormat::Json => {
            subscriber
                .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr)) // Console
                .with(fmt::layer().json().with_target(true).with_writer(writer)) // File
                .init();
        }
        LogFormat::Compact => {
            subscriber
                .with(
                    fmt::layer()
                        .compact()
                        .with_target(false)
                        .with_writer(std::io::stderr),
                ) // Console
                .with(
                    fmt::layer()
                        .compact()
                        .with_target(false)
                        .with_ansi(false)
                        .with_writer(writer),
                ) // File
                .init();
        }
        LogFormat::Pretty => {
            subscriber
                .with(fmt::layer().with_target(true).with_writer(std::io::stderr)) // Console
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_ansi(false)
                        .with_writer(writer),
                ) // File
                .init();
        }
    }
}
