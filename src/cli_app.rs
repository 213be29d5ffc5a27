//! Top-level CLI definition and dispatch.

#[cfg(feature = "sqlite")]
use std::fs::File;
#[cfg(feature = "sqlite")]
use std::io::BufReader;
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;

use chrono::NaiveDate;
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

use swift_dashboard_analytics::analytics::aggregate::{
    CompletionCounts, ErrorStatistics, TimeBucket,
};
use swift_dashboard_analytics::analytics::logs::LogFilter;
use swift_dashboard_analytics::analytics::service::{
    AnalyticsService, PeriodMessages, RecentMessages, ServiceLimits, TopTypesReport,
};
use swift_dashboard_analytics::cache::query_cache::QueryCache;
use swift_dashboard_analytics::core::config::{Config, SourceKind};
use swift_dashboard_analytics::core::errors::SwdError;
use swift_dashboard_analytics::logger::activity::{
    ActivityLoggerConfig, ActivityLoggerHandle, spawn_logger,
};
use swift_dashboard_analytics::records::jsonl::JsonlRecordSource;
#[cfg(feature = "sqlite")]
use swift_dashboard_analytics::records::jsonl::read_jsonl_hits;
use swift_dashboard_analytics::records::model::{ActionKind, DirectionFilter, LogEntry, Message};
use swift_dashboard_analytics::records::source::{RecordSource, TimedSource};
#[cfg(feature = "sqlite")]
use swift_dashboard_analytics::records::sqlite::SqliteRecordSource;
use swift_dashboard_analytics::window::ranges::{PeriodType, whole_days};

/// SWIFT dashboard analytics over exported translation records.
#[derive(Debug, Parser)]
#[command(
    name = "swiftdash",
    author,
    version,
    about = "SWIFT message translation analytics",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Increase verbosity.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,
    /// Quiet mode (errors only).
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Rolling message chart (7 days, 52 weeks or 12 months).
    Chart(ScopeArgs),
    /// Most frequent message types in the current period.
    TopTypes(TopTypesArgs),
    /// Newest messages in the current period.
    Recent(RecentArgs),
    /// Error taxonomy of failed messages in the current period.
    Errors(ScopeArgs),
    /// Success/fail and inward/outward counts in the current period.
    Counts(ScopeArgs),
    /// Hourly or daily buckets inside the current period.
    Breakdown(ScopeArgs),
    /// List messages of the current period or of a date range.
    Messages(MessagesArgs),
    /// Show one message by id.
    Message(MessageArgs),
    /// Browse log entries.
    Logs(LogsArgs),
    /// Import exported JSONL hits into the local event store.
    Import(ImportArgs),
    /// View configuration state.
    Config(ConfigArgs),
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Args)]
struct ScopeArgs {
    /// Period granularity: daily, weekly or monthly.
    #[arg(long, short, default_value = "weekly", value_name = "PERIOD")]
    period: PeriodType,
    /// Direction filter: All, Inward or Outward.
    #[arg(long, short, default_value = "All", value_name = "DIRECTION")]
    direction: DirectionFilter,
}

#[derive(Debug, Clone, Args)]
struct TopTypesArgs {
    #[command(flatten)]
    scope: ScopeArgs,
    /// Maximum rows (defaults to analytics.top_types_limit).
    #[arg(long, value_name = "N")]
    limit: Option<usize>,
    /// Include success/failure sub-counts and success rate.
    #[arg(long)]
    stats: bool,
}

#[derive(Debug, Clone, Args)]
struct RecentArgs {
    /// Maximum rows (defaults to analytics.recent_limit).
    #[arg(long, value_name = "N")]
    limit: Option<usize>,
    /// Direction filter: All, Inward or Outward.
    #[arg(long, short, default_value = "All", value_name = "DIRECTION")]
    direction: DirectionFilter,
    /// Period to search (current month when omitted).
    #[arg(long, short, value_name = "PERIOD")]
    period: Option<PeriodType>,
}

#[derive(Debug, Clone, Args)]
struct MessagesArgs {
    /// Period granularity for the current-period listing.
    #[arg(long, short, value_name = "PERIOD", conflicts_with_all = ["from", "to"])]
    period: Option<PeriodType>,
    /// First day of a date-range listing (YYYY-MM-DD, UTC).
    #[arg(long, value_name = "DATE")]
    from: Option<NaiveDate>,
    /// Last day of a date-range listing (YYYY-MM-DD, UTC).
    #[arg(long, value_name = "DATE")]
    to: Option<NaiveDate>,
    /// Direction filter: All, Inward or Outward.
    #[arg(long, short, default_value = "All", value_name = "DIRECTION")]
    direction: DirectionFilter,
}

#[derive(Debug, Clone, Args)]
struct MessageArgs {
    /// Message identifier.
    id: String,
}

#[derive(Debug, Clone, Args)]
struct LogsArgs {
    /// First day included (YYYY-MM-DD, UTC).
    #[arg(long, value_name = "DATE")]
    from: Option<NaiveDate>,
    /// Last day included (YYYY-MM-DD, UTC).
    #[arg(long, value_name = "DATE")]
    to: Option<NaiveDate>,
    /// Exact level (case-insensitive); ALL disables the filter.
    #[arg(long, value_name = "LEVEL")]
    level: Option<String>,
    /// Module name substring.
    #[arg(long, value_name = "TEXT")]
    module: Option<String>,
    /// Regular expression matched against the message text.
    #[arg(long, value_name = "REGEX")]
    grep: Option<String>,
    /// Maximum rows to print.
    #[arg(long, value_name = "N")]
    limit: Option<usize>,
    /// Print the distinct log levels instead of entries.
    #[arg(long, conflicts_with_all = ["from", "to", "level", "module", "grep", "limit"])]
    levels: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum RecordKindArg {
    Messages,
    Logs,
}

impl From<RecordKindArg> for ActionKind {
    fn from(kind: RecordKindArg) -> Self {
        match kind {
            RecordKindArg::Messages => Self::Message,
            RecordKindArg::Logs => Self::Log,
        }
    }
}

#[derive(Debug, Clone, Args)]
struct ImportArgs {
    /// Record stream the file holds.
    #[arg(long, value_enum, default_value = "messages")]
    kind: RecordKindArg,
    /// JSONL file of exported hits.
    file: PathBuf,
    /// Remove existing records of this kind before importing.
    #[arg(long)]
    replace: bool,
}

#[derive(Debug, Clone, Args)]
struct ConfigArgs {
    #[command(subcommand)]
    command: Option<ConfigCommand>,
}

#[derive(Debug, Clone, Subcommand)]
enum ConfigCommand {
    /// Print resolved config file path.
    Path,
    /// Print effective merged configuration.
    Show,
    /// Validate configuration and exit.
    Validate,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Shell to generate completion script for.
    #[arg(value_enum)]
    shell: CompletionShell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input or configuration.
    #[error("{0}")]
    User(String),
    /// Source, storage or environment failure.
    #[error("{0}")]
    Runtime(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Runtime(_) | Self::Io(_) => 2,
            Self::Json(_) => 3,
        }
    }
}

impl From<SwdError> for CliError {
    fn from(error: SwdError) -> Self {
        match error {
            SwdError::InvalidConfig { .. }
            | SwdError::MissingConfig { .. }
            | SwdError::ConfigParse { .. }
            | SwdError::NotFound { .. }
            | SwdError::MalformedInput { .. } => Self::User(error.to_string()),
            _ => Self::Runtime(error.to_string()),
        }
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Chart(args) => with_service(cli, |service| {
            let buckets = service.message_chart_data(args.period, &args.direction)?;
            emit(cli, "chart", &buckets, |b| print_buckets(b, args.period.period_noun()))
        }),
        Command::TopTypes(args) => with_service(cli, |service| {
            let report = service.top_message_types(
                args.scope.period,
                &args.scope.direction,
                args.limit,
                args.stats,
            )?;
            emit(cli, "top-types", &report, print_top_types)
        }),
        Command::Recent(args) => with_service(cli, |service| {
            let recent = service.recent_messages(args.limit, &args.direction, args.period);
            emit(cli, "recent", &recent, print_recent)
        }),
        Command::Errors(args) => with_service(cli, |service| {
            let stats = service.error_statistics(args.period, &args.direction)?;
            emit(cli, "errors", &stats, print_error_statistics)
        }),
        Command::Counts(args) => with_service(cli, |service| {
            let counts = service.completion_counts(args.period, &args.direction)?;
            emit(cli, "counts", &counts, print_counts)
        }),
        Command::Breakdown(args) => with_service(cli, |service| {
            let buckets = service.period_breakdown(args.period, &args.direction)?;
            emit(cli, "breakdown", &buckets, |b| print_buckets(b, "slot"))
        }),
        Command::Messages(args) => with_service(cli, |service| run_messages(cli, service, args)),
        Command::Message(args) => with_service(cli, |service| {
            let message = service.message_by_id(&args.id)?;
            emit(cli, "message", &message, print_message_detail)
        }),
        Command::Logs(args) => with_service(cli, |service| run_logs(cli, service, args)),
        Command::Import(args) => run_import(cli, args),
        Command::Config(args) => run_config(cli, args),
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
    }
}

// ──────────────────── service wiring ────────────────────

struct ActivitySession {
    handle: ActivityLoggerHandle,
    join: JoinHandle<()>,
}

impl ActivitySession {
    fn finish(self) {
        self.handle.shutdown();
        if self.join.join().is_err() {
            eprintln!("[SWD-CLI] activity logger thread panicked");
        }
    }
}

/// Build the service from config, run `body`, then flush the activity log.
fn with_service<F>(cli: &Cli, body: F) -> Result<(), CliError>
where
    F: FnOnce(&AnalyticsService) -> Result<(), CliError>,
{
    let config = Config::load(cli.config.as_deref())?;
    let source = build_source(&config)?;

    let cache = config
        .cache
        .enabled
        .then(|| Arc::new(QueryCache::new(config.cache.ttl())));
    let mut service = AnalyticsService::new(source)
        .with_cache(cache)
        .with_limits(ServiceLimits {
            top_types_limit: config.analytics.top_types_limit,
            recent_limit: config.analytics.recent_limit,
        });

    let mut session = None;
    if config.logging.enabled {
        let logger_config = ActivityLoggerConfig {
            jsonl_config: config.logging.jsonl_config(),
            ..ActivityLoggerConfig::default()
        };
        match spawn_logger(logger_config) {
            Ok((handle, join)) => {
                service = service.with_activity(handle.clone(), &config.stable_hash()?);
                session = Some(ActivitySession { handle, join });
            }
            Err(e) => eprintln!("[SWD-CLI] activity logging disabled: {e}"),
        }
    }

    if cli.verbose {
        eprintln!(
            "[SWD-CLI] source={} layout={} cache={}",
            service.source_name(),
            config.source.layout,
            if config.cache.enabled { "on" } else { "off" }
        );
    }

    let result = body(&service);
    drop(service);
    if let Some(session) = session {
        session.finish();
    }
    result
}

fn build_source(config: &Config) -> Result<Arc<dyn RecordSource>, CliError> {
    let inner: Arc<dyn RecordSource> = match config.source.kind {
        SourceKind::Jsonl => Arc::new(JsonlRecordSource::new(
            config.source.layout,
            config.source.messages_path.clone(),
            config.source.logs_path.clone(),
        )),
        SourceKind::Sqlite => open_store(config)?,
    };
    Ok(Arc::new(TimedSource::new(inner, config.source.fetch_timeout())))
}

#[cfg(feature = "sqlite")]
fn open_store(config: &Config) -> Result<Arc<dyn RecordSource>, CliError> {
    let store = SqliteRecordSource::open(&config.source.sqlite_db, config.source.layout)?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "sqlite"))]
fn open_store(_config: &Config) -> Result<Arc<dyn RecordSource>, CliError> {
    Err(CliError::User(
        "source.kind = \"sqlite\" requires the `sqlite` feature".to_string(),
    ))
}

// ──────────────────── commands ────────────────────

fn run_messages(cli: &Cli, service: &AnalyticsService, args: &MessagesArgs) -> Result<(), CliError> {
    if args.from.is_none() && args.to.is_none() {
        let listing = service.period_messages(args.period.unwrap_or(PeriodType::Monthly), &args.direction)?;
        return emit(cli, "messages", &listing, print_period_messages);
    }

    if let (Some(from), Some(to)) = (args.from, args.to) {
        if from > to {
            return Err(CliError::User(format!(
                "--from {from} is after --to {to}"
            )));
        }
    }
    let from = args.from.map(|d| whole_days(d, d).start);
    let to = args.to.map(|d| whole_days(d, d).end);
    let messages = service.messages_in_range(from, to, &args.direction)?;
    emit(cli, "messages", &messages, |m: &Vec<Message>| print_message_rows(m))
}

fn run_logs(cli: &Cli, service: &AnalyticsService, args: &LogsArgs) -> Result<(), CliError> {
    if args.levels {
        let levels = service.log_levels()?;
        return emit(cli, "logs levels", &levels, |levels| {
            for level in levels {
                println!("{level}");
            }
        });
    }

    let mut filter = LogFilter::default().with_dates(args.from, args.to);
    if let Some(level) = &args.level {
        filter = filter.with_level(level.as_str());
    }
    if let Some(module) = &args.module {
        filter = filter.with_module(module.as_str());
    }
    if let Some(pattern) = &args.grep {
        filter = filter.with_message_pattern(pattern)?;
    }

    let mut entries = service.logs(&filter)?;
    if let Some(limit) = args.limit {
        entries.truncate(limit);
    }
    emit(cli, "logs", &entries, |entries| print_logs(entries, cli.quiet))
}

#[cfg(feature = "sqlite")]
fn run_import(cli: &Cli, args: &ImportArgs) -> Result<(), CliError> {
    let config = Config::load(cli.config.as_deref())?;
    let file = File::open(&args.file).map_err(|e| SwdError::io(&args.file, e))?;
    let hits = read_jsonl_hits(BufReader::new(file), &args.file)?;

    let store = SqliteRecordSource::open(&config.source.sqlite_db, config.source.layout)?;
    let kind = ActionKind::from(args.kind);
    let removed = if args.replace { store.clear(kind)? } else { 0 };
    let imported = store.ingest(kind, &hits)?;
    let total = store.count(kind)?;

    match output_mode(cli) {
        OutputMode::Human => {
            if !cli.quiet {
                println!(
                    "Imported {} {} record(s) into {}",
                    imported.to_string().bold(),
                    kind,
                    store.path().display()
                );
                if args.replace {
                    println!("  Replaced: {removed}");
                }
                println!("  Stored total: {total}");
            }
        }
        OutputMode::Json => {
            let payload = json!({
                "command": "import",
                "kind": kind.as_str(),
                "file": args.file.to_string_lossy(),
                "store": store.path().to_string_lossy(),
                "imported": imported,
                "removed": removed,
                "total": total,
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

#[cfg(not(feature = "sqlite"))]
fn run_import(_cli: &Cli, _args: &ImportArgs) -> Result<(), CliError> {
    Err(CliError::User(
        "import requires the `sqlite` feature".to_string(),
    ))
}

fn run_config(cli: &Cli, args: &ConfigArgs) -> Result<(), CliError> {
    match &args.command {
        None | Some(ConfigCommand::Path) => {
            let path = cli.config.clone().unwrap_or_else(Config::default_path);
            let exists = path.exists();

            match output_mode(cli) {
                OutputMode::Human => {
                    println!("{}", path.display());
                    if !exists {
                        println!("  (file does not exist; defaults will be used)");
                    }
                }
                OutputMode::Json => {
                    let payload = json!({
                        "command": "config path",
                        "path": path.to_string_lossy(),
                        "exists": exists,
                    });
                    write_json_line(&payload)?;
                }
            }
            Ok(())
        }
        Some(ConfigCommand::Show) => {
            let config = Config::load(cli.config.as_deref())?;

            match output_mode(cli) {
                OutputMode::Human => {
                    let toml_str = toml::to_string_pretty(&config)
                        .map_err(|e| CliError::Runtime(format!("serialize config: {e}")))?;
                    println!("{toml_str}");
                }
                OutputMode::Json => {
                    let payload = json!({
                        "command": "config show",
                        "config": serde_json::to_value(&config)?,
                    });
                    write_json_line(&payload)?;
                }
            }
            Ok(())
        }
        Some(ConfigCommand::Validate) => match Config::load(cli.config.as_deref()) {
            Ok(config) => {
                let hash = config.stable_hash()?;
                match output_mode(cli) {
                    OutputMode::Human => {
                        println!("Configuration is valid.");
                        println!("  Source: {}", config.paths.config_file.display());
                        println!("  Hash: {hash}");
                    }
                    OutputMode::Json => {
                        let payload = json!({
                            "command": "config validate",
                            "valid": true,
                            "path": config.paths.config_file.to_string_lossy(),
                            "hash": hash,
                        });
                        write_json_line(&payload)?;
                    }
                }
                Ok(())
            }
            Err(e) => {
                match output_mode(cli) {
                    OutputMode::Human => eprintln!("Configuration is INVALID: {e}"),
                    OutputMode::Json => {
                        let payload = json!({
                            "command": "config validate",
                            "valid": false,
                            "error": e.to_string(),
                        });
                        write_json_line(&payload)?;
                    }
                }
                Err(CliError::User(format!("invalid config: {e}")))
            }
        },
    }
}

// ──────────────────── output ────────────────────

fn emit<T, P>(cli: &Cli, command: &str, data: &T, print_human: P) -> Result<(), CliError>
where
    T: Serialize,
    P: FnOnce(&T),
{
    match output_mode(cli) {
        OutputMode::Human => {
            print_human(data);
            Ok(())
        }
        OutputMode::Json => {
            let payload = json!({
                "command": command,
                "data": serde_json::to_value(data)?,
            });
            write_json_line(&payload)
        }
    }
}

fn print_buckets(buckets: &[TimeBucket], unit: &str) {
    println!(
        "{:<12} {:<16} {:>10} {:>10} {:>10} {:>10}",
        unit.bold(),
        "label".bold(),
        "in ok".bold(),
        "in fail".bold(),
        "out ok".bold(),
        "out fail".bold()
    );
    for bucket in buckets {
        println!(
            "{:<12} {:<16} {:>10} {:>10} {:>10} {:>10}",
            bucket.key,
            bucket.display_label,
            bucket.inward.success,
            bucket.inward.fail,
            bucket.outward.success,
            bucket.outward.fail
        );
    }
}

fn print_top_types(report: &TopTypesReport) {
    let info = &report.period_info;
    match &info.month_name {
        Some(month) => println!("Top message types, {month} ({} .. {})", info.start_date, info.end_date),
        None => println!(
            "Top message types this {} ({} .. {})",
            info.period, info.start_date, info.end_date
        ),
    }
    if report.types.is_empty() {
        println!("  (no messages)");
        return;
    }
    for (rank, entry) in report.types.iter().enumerate() {
        match (entry.successful, entry.failed, entry.success_rate_int) {
            (Some(ok), Some(failed), Some(rate)) => println!(
                "  {:>2}. {:<10} {:>6}  ok {ok:>5}  failed {failed:>5}  {rate:>3}%",
                rank + 1,
                entry.type_name,
                entry.count
            ),
            _ => println!("  {:>2}. {:<10} {:>6}", rank + 1, entry.type_name, entry.count),
        }
    }
}

fn print_recent(recent: &RecentMessages) {
    if let Some(error) = &recent.error {
        eprintln!("{} {error}", "warning:".yellow());
    }
    for row in &recent.messages {
        println!(
            "{:<16} {:<24} {:<8} {:<8} {}",
            row.time,
            row.id,
            row.mt_message_type,
            row.direction,
            colored_status(&row.status)
        );
    }
    if recent.messages.is_empty() && recent.error.is_none() {
        println!("(no recent messages)");
    }
}

fn print_error_statistics(stats: &ErrorStatistics) {
    println!("{:<16} {:>8}", "field", stats.field_errors);
    println!("{:<16} {:>8}", "not supported", stats.not_supported_errors);
    println!("{:<16} {:>8}", "invalid", stats.invalid_errors);
    println!("{:<16} {:>8}", "other", stats.other_errors);
    println!("{:<16} {:>8}", "total failed".bold(), stats.total_errors);
}

fn print_counts(counts: &CompletionCounts) {
    println!(
        "{} {} ({}%)",
        "successful".green(),
        counts.success_count,
        counts.success_percentage
    );
    println!(
        "{} {} ({}%)",
        "failed".red(),
        counts.fail_count,
        counts.fail_percentage
    );
    println!("total {}", counts.total_count);
    println!("inward {}  outward {}", counts.inward_count, counts.outward_count);
}

fn print_period_messages(listing: &PeriodMessages) {
    let label = listing.month_name.clone().unwrap_or_else(|| format!("this {}", listing.period));
    println!(
        "{} message(s), {label} ({} .. {})",
        listing.total, listing.start_date, listing.end_date
    );
    print_message_rows(&listing.messages);
}

fn print_message_rows(messages: &[Message]) {
    for message in messages {
        let date = message
            .date
            .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{date:<19} {:<24} {:<8} {:<8} {}",
            message.id,
            message.type_label(),
            message.direction,
            colored_status(&message.status)
        );
    }
}

fn print_message_detail(message: &Message) {
    let fields = [
        ("id", message.id.as_str()),
        ("ref", message.ref_id.as_str()),
        ("mt type", message.mt_message_type.as_str()),
        ("mx type", message.mx_message_type.as_str()),
        ("direction", message.direction.as_str()),
        ("amount", message.amount.as_str()),
        ("currency", message.currency.as_str()),
        ("status", message.status.as_str()),
        ("field error", message.field_error.as_str()),
        ("not supported", message.not_supported_error.as_str()),
        ("invalid", message.invalid_error.as_str()),
        ("other error", message.other_error.as_str()),
    ];
    for (label, value) in fields {
        if !value.is_empty() {
            println!("{:<14} {value}", label.bold());
        }
    }
    if let Some(date) = message.date {
        println!("{:<14} {}", "date".bold(), date.to_rfc3339());
    }
    for (label, body) in [
        ("original", &message.original_message),
        ("translated", &message.translated_message),
    ] {
        if !body.is_empty() {
            println!("\n{}\n{body}", label.bold());
        }
    }
}

fn print_logs(entries: &[LogEntry], quiet: bool) {
    for entry in entries {
        let time = entry
            .time
            .map(|t| t.format("%Y-%m-%d %H:%M:%S%.3f").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("{time:<23} {:<7} {:<20} {}", entry.level, entry.module, entry.message);
    }
    if entries.is_empty() && !quiet {
        println!("(no matching log entries)");
    }
}

fn colored_status(status: &str) -> String {
    if status.eq_ignore_ascii_case("successful") {
        status.green().to_string()
    } else if status.eq_ignore_ascii_case("failed") {
        status.red().to_string()
    } else {
        status.to_string()
    }
}

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("SWD_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref(), io::stdout().is_terminal())
}

fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>, stdout_is_tty: bool) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }

    let fallback = if stdout_is_tty {
        OutputMode::Human
    } else {
        OutputMode::Json
    };

    match env_mode
        .map(str::trim)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => OutputMode::Json,
        Some("human") => OutputMode::Human,
        _ => fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_flags_before_and_after_subcommand() {
        let before = Cli::try_parse_from([
            "swiftdash",
            "--config",
            "/tmp/swiftdash.toml",
            "--json",
            "--no-color",
            "-v",
            "chart",
        ]);
        assert!(before.is_ok());

        let after = Cli::try_parse_from(["swiftdash", "chart", "--json", "--no-color", "-q"]);
        assert!(after.is_ok());
    }

    #[test]
    fn parses_every_subcommand() {
        let cases = [
            vec!["swiftdash", "chart", "--period", "daily", "--direction", "Inward"],
            vec!["swiftdash", "top-types", "-p", "monthly", "--limit", "3", "--stats"],
            vec!["swiftdash", "recent", "--limit", "10", "--period", "week"],
            vec!["swiftdash", "errors", "--period", "daily"],
            vec!["swiftdash", "counts", "-d", "outward"],
            vec!["swiftdash", "breakdown", "--period", "monthly"],
            vec!["swiftdash", "messages", "--period", "daily"],
            vec!["swiftdash", "messages", "--from", "2025-03-01", "--to", "2025-03-14"],
            vec!["swiftdash", "message", "abc-123"],
            vec!["swiftdash", "logs", "--level", "ERROR", "--grep", "MT1\\d\\d"],
            vec!["swiftdash", "logs", "--levels"],
            vec!["swiftdash", "import", "--kind", "logs", "/tmp/logs.jsonl", "--replace"],
            vec!["swiftdash", "config", "validate"],
        ];

        for case in cases {
            let parsed = Cli::try_parse_from(case.clone());
            assert!(parsed.is_ok(), "failed to parse case: {case:?}");
        }
    }

    #[test]
    fn rejects_bad_period_and_direction() {
        assert!(Cli::try_parse_from(["swiftdash", "chart", "--period", "hourly"]).is_err());
        assert!(Cli::try_parse_from(["swiftdash", "chart", "--direction", "sideways"]).is_err());
        assert!(Cli::try_parse_from(["swiftdash", "logs", "--from", "14/03/2025"]).is_err());
    }

    #[test]
    fn period_conflicts_with_date_range() {
        assert!(
            Cli::try_parse_from(["swiftdash", "messages", "--period", "daily", "--from", "2025-03-01"])
                .is_err()
        );
        assert!(Cli::try_parse_from(["swiftdash", "logs", "--levels", "--level", "INFO"]).is_err());
    }

    #[test]
    fn completions_support_bash_zsh_and_fish() {
        for shell in ["bash", "zsh", "fish"] {
            let parsed = Cli::try_parse_from(["swiftdash", "completions", shell]);
            assert!(parsed.is_ok(), "failed shell parse for {shell}");
        }
    }

    #[test]
    fn output_mode_resolution_honors_precedence() {
        assert_eq!(resolve_output_mode(true, Some("human"), true), OutputMode::Json);
        assert_eq!(resolve_output_mode(false, Some("json"), true), OutputMode::Json);
        assert_eq!(resolve_output_mode(false, Some("human"), false), OutputMode::Human);
        assert_eq!(resolve_output_mode(false, Some("auto"), true), OutputMode::Human);
        assert_eq!(resolve_output_mode(false, None, false), OutputMode::Json);
    }

    #[test]
    fn core_errors_map_to_exit_codes() {
        let not_found = CliError::from(SwdError::NotFound {
            what: "message",
            id: "x".to_string(),
        });
        assert_eq!(not_found.exit_code(), 1);
        let unavailable = CliError::from(SwdError::source_unavailable("jsonl", "gone"));
        assert_eq!(unavailable.exit_code(), 2);
        assert!(unavailable.to_string().contains("SWD-2001"));
    }

    #[test]
    fn record_kind_maps_to_action_kind() {
        assert_eq!(ActionKind::from(RecordKindArg::Messages), ActionKind::Message);
        assert_eq!(ActionKind::from(RecordKindArg::Logs), ActionKind::Log);
    }
}
