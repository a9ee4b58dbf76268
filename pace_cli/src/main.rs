use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use pace_core::config::DataConfig;
use pace_core::history::{self, PROGRESS_BAR_BLOCKS};
use pace_core::session::offer_delay;
use pace_core::*;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "quitpace")]
#[command(about = "Smoking interval coach: wait a little longer each time", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Act on this user id instead of the configured profile
    #[arg(long, global = true)]
    user: Option<i64>,

    /// Pretend the current time is this RFC 3339 timestamp
    #[arg(long, global = true)]
    now: Option<DateTime<Utc>>,

    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Set up a profile (no-op if one exists)
    Init {
        /// Cigarettes smoked on a usual day (zero or less counts as one)
        #[arg(allow_negative_numbers = true)]
        cigarettes_per_day: i64,
        /// Price of one pack
        price_per_pack: f64,
        /// Cigarettes in one pack
        cigarettes_per_pack: u32,
    },

    /// Show whether a cigarette is allowed now (default)
    Status,

    /// Log a cigarette, or get an alternative if it is too early
    Smoke,

    /// Undo the last cigarette (within 10 minutes)
    Undo,

    /// Mark the offered alternative task as done
    AltDone,

    /// Run the nightly interval growth over all users
    Grow,

    /// Summarize the last seven days
    Report,

    /// Check in with users who have been quiet for a while
    Ping,

    /// Show spending, savings and interval progress
    Stats,

    /// Append the event history to a CSV file
    Export {
        /// Destination CSV file
        path: PathBuf,
    },

    /// Delete the profile and its history
    Reset,

    /// Show the effective configuration
    Config {
        /// Also write it to the config file
        #[arg(long)]
        write: bool,
    },
}

/// Stores for one command, held under the data directory lock
struct Workspace {
    users: JsonUserStore,
    events: JsonlEventLog,
    session: SessionState,
    session_path: PathBuf,
    _lock: DataDirLock,
}

impl Workspace {
    fn open(data_dir: &Path) -> Result<Self> {
        let lock = DataDirLock::acquire(data_dir)?;
        let session_path = DataConfig::session_path(data_dir);
        Ok(Self {
            users: JsonUserStore::new(DataConfig::users_path(data_dir)),
            events: JsonlEventLog::new(DataConfig::events_path(data_dir)),
            session: SessionState::load(&session_path)?,
            session_path,
            _lock: lock,
        })
    }

    fn save_session(&self) -> Result<()> {
        self.session.save(&self.session_path)
    }
}

fn main() -> ExitCode {
    // Initialize logging
    pace_core::logging::init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", describe_error(&e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.unwrap_or_else(Config::default_config_path);
    let config = Config::load_or_default(&config_path)?;
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    let id = cli.user.map(UserId).unwrap_or_else(|| config.profile.id());
    let now = cli.now.unwrap_or_else(Utc::now);

    let mut ws = Workspace::open(&data_dir)?;

    match cli.command.unwrap_or(Commands::Status) {
        Commands::Init {
            cigarettes_per_day,
            price_per_pack,
            cigarettes_per_pack,
        } => cmd_init(&mut ws, id, now, cigarettes_per_day, price_per_pack, cigarettes_per_pack),
        Commands::Status => cmd_status(&mut ws, id, now, &config),
        Commands::Smoke => cmd_smoke(&mut ws, id, now, &config),
        Commands::Undo => cmd_undo(&mut ws, id, now),
        Commands::AltDone => cmd_alt_done(&mut ws, id, now, &config),
        Commands::Grow => cmd_grow(&mut ws, now),
        Commands::Report => cmd_report(&ws, id, now, &config),
        Commands::Ping => cmd_ping(&mut ws, now, &config),
        Commands::Stats => cmd_stats(&ws, id, &config),
        Commands::Export { path } => cmd_export(&ws, id, &path),
        Commands::Reset => cmd_reset(&mut ws, id),
        Commands::Config { write } => cmd_config(&config, &config_path, write),
    }
}

fn cmd_init(
    ws: &mut Workspace,
    id: UserId,
    now: DateTime<Utc>,
    cigarettes_per_day: i64,
    price_per_pack: f64,
    cigarettes_per_pack: u32,
) -> Result<()> {
    let cigarettes_per_day = u32::try_from(cigarettes_per_day.max(1)).unwrap_or(u32::MAX);
    let user = initialize_user(
        &mut ws.users,
        id,
        cigarettes_per_day,
        price_per_pack,
        cigarettes_per_pack,
        now,
    )?;

    println!("✓ Setup complete");
    println!("  Starting interval: {} minutes", user.interval_minutes);
    println!("  Run `quitpace` to see whether you can smoke");
    Ok(())
}

fn cmd_status(ws: &mut Workspace, id: UserId, now: DateTime<Utc>, config: &Config) -> Result<()> {
    let answer = check_availability(&ws.users, id, now)?;
    let mut user = ws.users.find(id)?.ok_or(Error::NotInitialized(id))?;
    let events = ws.events.list_for_user(id, None)?;
    let currency = &config.notifications.currency;

    if let Some(alt) = ws.session.active_alternative(id, now) {
        println!("Alternative: {} (until {})", alt.task, alt.expires_at.format("%H:%M"));
    }

    let today = history::daily_summary(&user, &events, now);
    let ratio = f64::from(today.smoked_today) / f64::from(today.plan_today.max(1));
    println!(
        "Today: {}/{}  {}",
        today.smoked_today,
        today.plan_today,
        history::progress_bar(ratio, PROGRESS_BAR_BLOCKS)
    );

    if answer.can_act {
        println!("✓ You can smoke now");
    } else {
        println!("✗ Too early. Next cigarette in {}", format_wait(answer.seconds_left));
    }

    println!("Spent: {:.2} {}", user.spent, currency);
    println!("Saved: {:.2} {}", user.savings, currency);

    if history::undo_available(events.first(), now) {
        println!("(`quitpace undo` can still take back the last one)");
    }

    let chance = config.notifications.delay_offer_chance;
    if let Some(extra) = offer_delay(&mut user, answer, now, chance, &mut rand::thread_rng()) {
        println!(
            "Only {} minutes left. Could you wait {} more?",
            answer.seconds_left / 60,
            extra
        );
        ws.users.save(&user)?;
    }

    Ok(())
}

fn cmd_smoke(ws: &mut Workspace, id: UserId, now: DateTime<Utc>, config: &Config) -> Result<()> {
    let outcome = smoke_now(
        &mut ws.users,
        &mut ws.events,
        &mut ws.session,
        &config.alternatives,
        id,
        now,
        &mut rand::thread_rng(),
    )?;
    ws.save_session()?;

    match outcome {
        SmokeOutcome::Registered(event) => {
            println!("✓ Cigarette logged");
            print_next_allowed(ws, id, event.was_early)?;
        }
        SmokeOutcome::Relapse(event) => {
            println!("Relapse logged");
            print_next_allowed(ws, id, event.was_early)?;
        }
        SmokeOutcome::AlternativeProposed { task, expires_at } => {
            println!("Too early. Try this instead: {}", task);
            println!(
                "  Finish by {} and run `quitpace alt-done`",
                expires_at.format("%H:%M")
            );
        }
        SmokeOutcome::TooEarly { seconds_left } => {
            println!("✗ Too early. Next cigarette in {}", format_wait(seconds_left));
        }
    }
    Ok(())
}

fn print_next_allowed(ws: &Workspace, id: UserId, was_early: bool) -> Result<()> {
    let user = ws.users.find(id)?.ok_or(Error::NotInitialized(id))?;
    if was_early {
        println!("  That one was early");
    }
    if let Some(next) = user.next_allowed_time {
        println!(
            "  Next allowed at {} ({} min interval)",
            next.format("%Y-%m-%d %H:%M"),
            user.interval_minutes
        );
    }
    Ok(())
}

fn cmd_undo(ws: &mut Workspace, id: UserId, now: DateTime<Utc>) -> Result<()> {
    undo_last(&mut ws.users, &mut ws.events, id, now)?;
    println!("✓ Undone");
    Ok(())
}

fn cmd_alt_done(ws: &mut Workspace, id: UserId, now: DateTime<Utc>, config: &Config) -> Result<()> {
    let outcome = complete_alternative(&mut ws.users, &mut ws.session, &config.alternatives, id, now)?;
    ws.save_session()?;

    match outcome {
        AlternativeOutcome::Completed { next_allowed_time } => {
            println!("✓ Well done!");
            println!("  Next allowed at {}", next_allowed_time.format("%Y-%m-%d %H:%M"));
        }
        AlternativeOutcome::Expired => println!("Time ran out for that alternative"),
        AlternativeOutcome::NonePending => println!("No alternative pending"),
    }
    Ok(())
}

fn cmd_grow(ws: &mut Workspace, now: DateTime<Utc>) -> Result<()> {
    let report = run_growth_sweep(&mut ws.users, now)?;

    println!(
        "✓ Growth sweep: {} users, {} grown, {} paused",
        report.processed,
        report.grown.len(),
        report.paused.len()
    );

    if report.is_clean() {
        return Ok(());
    }
    for (user, error) in &report.failures {
        eprintln!("  user {}: {}", user, error);
    }
    Err(Error::State(format!(
        "growth sweep failed for {} users",
        report.failures.len()
    )))
}

fn cmd_report(ws: &Workspace, id: UserId, now: DateTime<Utc>, config: &Config) -> Result<()> {
    let user = ws.users.find(id)?.ok_or(Error::NotInitialized(id))?;
    let events = ws.events.list_for_user(id, None)?;
    let report = history::weekly_report(&user, &events, now);
    let currency = &config.notifications.currency;

    println!("Week in review:");
    println!("  Smoked: {} ({} under plan)", report.smoked, report.not_smoked);
    println!("  Spent: {:.2} {}", report.spent, currency);
    println!("  Saved: {:.2} {}", report.saved, currency);
    Ok(())
}

fn cmd_ping(ws: &mut Workspace, now: DateTime<Utc>, config: &Config) -> Result<()> {
    let hours = config.notifications.inactivity_hours;
    let mut pinged = 0;

    for user in ws.users.list_all()? {
        let last_event = ws.events.most_recent_for_user(user.id)?;
        let last_ping = ws.session.last_ping(user.id);
        if let Some(ping) = history::inactivity_ping(&user, last_event.as_ref(), last_ping, now, hours) {
            println!(
                "user {}: quiet for {}+ hours, about {:.2} {} saved. Keep it up!",
                user.id, hours, ping.saved, config.notifications.currency
            );
            ws.session.record_ping(user.id, now);
            pinged += 1;
        }
    }

    ws.save_session()?;
    if pinged == 0 {
        println!("Nobody to ping");
    }
    Ok(())
}

fn cmd_stats(ws: &Workspace, id: UserId, config: &Config) -> Result<()> {
    let user = ws.users.find(id)?.ok_or(Error::NotInitialized(id))?;
    let currency = &config.notifications.currency;

    println!("Spent: {:.2} {}", user.spent, currency);
    println!("Saved: {:.2} {}", user.savings, currency);
    println!("Current interval: {} min", user.interval_minutes);
    if let Some(target) = user.target_cigs_per_day {
        println!("Daily target: {}", target);
    }
    println!(
        "Progress: {}",
        history::progress_bar(history::progress_ratio(&user), PROGRESS_BAR_BLOCKS)
    );
    Ok(())
}

fn cmd_export(ws: &Workspace, id: UserId, path: &Path) -> Result<()> {
    let mut events = ws.events.list_for_user(id, None)?;
    events.reverse();
    let count = export_events_csv(&events, path)?;
    println!("✓ Exported {} events to {}", count, path.display());
    Ok(())
}

fn cmd_reset(ws: &mut Workspace, id: UserId) -> Result<()> {
    let removed = reset_user(&mut ws.users, &mut ws.events, id)?;
    ws.session.forget(id);
    ws.save_session()?;
    println!("✓ Profile reset ({} events removed)", removed);
    println!("  Run `quitpace init` to start again");
    Ok(())
}

fn cmd_config(config: &Config, path: &Path, write: bool) -> Result<()> {
    print!("{}", config.to_toml()?);
    if write {
        config.save_to(path)?;
        println!("✓ Saved config to {}", path.display());
    }
    Ok(())
}

fn format_wait(seconds: u64) -> String {
    let minutes = (seconds + 59) / 60;
    format!("{}h {:02}m", minutes / 60, minutes % 60)
}

fn describe_error(error: &Error) -> String {
    match error {
        Error::NotInitialized(_) => {
            "No profile yet. Run `quitpace init <cigs/day> <price/pack> <cigs/pack>` first.".into()
        }
        Error::CannotUndo(reason) => format!("Cannot undo: {}", reason),
        Error::UndoIncomplete { .. } => format!(
            "{}\nThe schedule was restored but the history still lists the event; please check the data directory.",
            error
        ),
        other => format!("Error: {}", other),
    }
}
