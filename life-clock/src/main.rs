use anyhow::{anyhow, Context, Result};
use chrono::{Local, NaiveDate, NaiveTime};
use clap::{Parser, Subcommand, ValueEnum};
use log::{debug, info};
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;

use life_clock::backend::config::resolve_data_directory;
use life_clock::backend::domain::commands::bucket_list::AddBucketItemCommand;
use life_clock::backend::domain::commands::milestone::CreateMilestoneCommand;
use life_clock::backend::domain::commands::profile::{CreateProfileCommand, UpdateProfileCommand};
use life_clock::backend::domain::live_age::{pad, LiveAge, LiveAgeController};
use life_clock::backend::domain::milestone_service::local_to_utc;
use life_clock::backend::domain::week_grid::{project, row_label, WeekGrid};
use life_clock::Backend;
use shared::{BucketStatus, MilestoneCategory, Theme, WeekState};

#[derive(Debug, Parser)]
#[command(name = "life-clock", about = "Your life, counted in weeks", version)]
struct Cli {
    /// Data directory (defaults to $LIFE_CLOCK_DATA_DIR or the platform data dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    /// Refresh interval in milliseconds for `age` and `grid --watch`
    #[arg(long, global = true)]
    interval_ms: Option<u64>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Manage profiles
    #[command(subcommand)]
    Profile(ProfileCommand),
    /// Live age counter for the active profile
    Age {
        /// Stop after this many seconds (runs until Ctrl-C otherwise)
        #[arg(long)]
        seconds: Option<u64>,
    },
    /// Life in weeks for the active profile
    Grid {
        /// Keep redrawing at the configured grid cadence
        #[arg(long)]
        watch: bool,
        /// Stop watching after this many seconds
        #[arg(long, requires = "watch")]
        seconds: Option<u64>,
    },
    /// Today's goals for the active profile
    #[command(subcommand)]
    Goal(GoalCommand),
    #[command(subcommand)]
    Milestone(MilestoneCommand),
    #[command(subcommand)]
    Journal(JournalCommand),
    #[command(subcommand)]
    Bucket(BucketCommand),
    /// Show or change the theme
    Theme {
        #[arg(value_enum)]
        action: Option<ThemeAction>,
    },
    /// Quote of the day
    Quote,
}

#[derive(Debug, Subcommand)]
enum ProfileCommand {
    Add {
        #[arg(long)]
        name: String,
        /// Date of birth, YYYY-MM-DD
        #[arg(long)]
        dob: String,
        #[arg(long)]
        target_age: Option<u32>,
    },
    List,
    /// Make a profile active
    Use { id: String },
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        dob: Option<String>,
        #[arg(long)]
        target_age: Option<u32>,
    },
    Delete { id: String },
}

#[derive(Debug, Subcommand)]
enum GoalCommand {
    Add { text: String },
    List,
    /// Toggle a goal between done and open
    Done { id: String },
    Edit { id: String, text: String },
    Delete { id: String },
}

#[derive(Debug, Subcommand)]
enum MilestoneCommand {
    Add {
        #[arg(long)]
        title: String,
        /// Target date, YYYY-MM-DD
        #[arg(long)]
        date: String,
        /// Local time of day, HH:MM
        #[arg(long)]
        time: Option<String>,
        #[arg(long, default_value = "Other")]
        category: String,
    },
    /// Import a schedule, one `M/D - H - Title` per line (stdin if no file)
    Import {
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long, default_value = "Education")]
        category: String,
    },
    List {
        #[arg(long)]
        category: Option<String>,
    },
    Delete { id: String },
}

#[derive(Debug, Subcommand)]
enum JournalCommand {
    /// Write a reflection on today's quote
    Write { reflection: String },
    List,
    Delete { id: String },
}

#[derive(Debug, Subcommand)]
enum BucketCommand {
    Add {
        title: String,
        #[arg(long)]
        image: Option<String>,
    },
    List,
    /// Toggle between pending and achieved
    Toggle { id: String },
    Image { id: String, url: String },
    Remove { id: String },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ThemeAction {
    Toggle,
    Dark,
    Light,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let data_dir = resolve_data_directory(cli.data_dir.as_deref())?;
    let mut backend = Backend::open(&data_dir)?;
    info!("life-clock started with data directory {}", data_dir.display());

    match cli.command {
        Commands::Profile(command) => run_profile(&backend, command),
        Commands::Age { seconds } => {
            backend.start_watching()?;
            let interval_ms = cli.interval_ms.unwrap_or(backend.config.counter_interval_ms);
            run_age(&backend, interval_ms, seconds).await
        }
        Commands::Grid { watch: false, .. } => run_grid(&backend),
        Commands::Grid { watch: true, seconds } => {
            backend.start_watching()?;
            let interval_ms = cli.interval_ms.unwrap_or(backend.config.grid_interval_ms);
            let controller = backend.live_age_for_active_profile(interval_ms)?;
            follow_live_age(&backend, controller, seconds, |controller, live| {
                let grid = project(&live.insights, controller.target_age());
                print!("\x1b[2J\x1b[H{}", render_grid(&grid));
                print_grid_summary(&grid);
                Ok(())
            })
            .await
        }
        Commands::Goal(command) => run_goal(&backend, command),
        Commands::Milestone(command) => run_milestone(&backend, command),
        Commands::Journal(command) => run_journal(&backend, command).await,
        Commands::Bucket(command) => run_bucket(&backend, command),
        Commands::Theme { action } => run_theme(&backend, action),
        Commands::Quote => {
            let quote = backend.quote_service.daily_quote(backend.time_source().today()).await;
            println!("\"{}\"\n  - {}", quote.text, quote.author);
            Ok(())
        }
    }
}

fn run_profile(backend: &Backend, command: ProfileCommand) -> Result<()> {
    let profiles = &backend.profile_service;
    match command {
        ProfileCommand::Add { name, dob, target_age } => {
            let profile = profiles.add_profile(CreateProfileCommand {
                name,
                date_of_birth: dob,
                target_age: target_age.or(Some(backend.config.default_target_age().years())),
            })?;
            println!("Added {} ({})", profile.name, profile.id);
        }
        ProfileCommand::List => {
            let active = profiles.active_profile().map(|p| p.id);
            for profile in profiles.list_profiles() {
                let marker = if active.as_deref() == Some(profile.id.as_str()) { "*" } else { " " };
                println!(
                    "{} {}  {}  born {}  target {}",
                    marker, profile.id, profile.name, profile.date_of_birth, profile.target_age
                );
            }
        }
        ProfileCommand::Use { id } => {
            let profile = profiles.set_active_profile(&id)?;
            println!("Active profile: {}", profile.name);
        }
        ProfileCommand::Edit { id, name, dob, target_age } => {
            let profile = profiles.update_profile(UpdateProfileCommand {
                profile_id: id,
                name,
                date_of_birth: dob,
                target_age,
            })?;
            println!("Updated {}", profile.name);
        }
        ProfileCommand::Delete { id } => {
            let result = profiles.delete_profile(&id)?;
            println!("Deleted {} and {} goals", result.deleted.name, result.removed_goals);
        }
    }
    Ok(())
}

async fn run_age(backend: &Backend, interval_ms: u64, seconds: Option<u64>) -> Result<()> {
    let profile = backend
        .profile_service
        .active_profile()
        .ok_or_else(|| anyhow!("No active profile - run `life-clock profile add` first"))?;
    println!("{}  (target age {})", profile.name, profile.target_age);

    let controller = backend.live_age_for_active_profile(interval_ms)?;
    follow_live_age(backend, controller, seconds, |_, live| draw_counter(live)).await?;
    println!();
    Ok(())
}

/// Redraw on every tick until the deadline or Ctrl-C. Profile changes made
/// elsewhere (another terminal, for instance) restart the controller.
async fn follow_live_age<F>(
    backend: &Backend,
    mut controller: LiveAgeController,
    seconds: Option<u64>,
    mut draw: F,
) -> Result<()>
where
    F: FnMut(&LiveAgeController, &LiveAge) -> Result<()>,
{
    let mut updates = controller.subscribe();
    let mut changes = backend.change_feed().subscribe();
    let deadline = seconds.map(|s| tokio::time::Instant::now() + Duration::from_secs(s));

    if let Some(live) = controller.snapshot() {
        draw(&controller, &live)?;
    }

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let live = *updates.borrow_and_update();
                if let Some(live) = live {
                    draw(&controller, &live)?;
                }
            }
            change = changes.recv() => {
                if let Err(RecvError::Closed) = change {
                    break;
                }
                if backend.follow_active_profile(&mut controller)? {
                    match backend.profile_service.active_profile() {
                        Some(profile) => println!("\nNow showing {}  (target age {})", profile.name, profile.target_age),
                        None => {
                            println!("\nNo active profile left");
                            break;
                        }
                    }
                }
            }
            _ = sleep_until_deadline(deadline) => break,
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    debug!("Live view finished");
    Ok(())
}

async fn sleep_until_deadline(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

fn draw_counter(live: &LiveAge) -> Result<()> {
    let age = &live.age;
    let insights = &live.insights;
    let mut stdout = io::stdout().lock();
    write!(
        stdout,
        "\r{}y {}m {}d {}:{}:{}.{}  |  {} days  {} weeks  |  {:.4}% lived, {} weeks left   ",
        age.years,
        age.months,
        age.days,
        pad(age.hours, 2),
        pad(age.minutes, 2),
        pad(age.seconds, 2),
        pad(age.milliseconds, 3),
        age.total_days,
        age.total_weeks,
        insights.percent_complete,
        insights.weeks_remaining,
    )?;
    stdout.flush()?;
    Ok(())
}

fn run_grid(backend: &Backend) -> Result<()> {
    let grid = backend
        .week_grid_now()
        .ok_or_else(|| anyhow!("No active profile - run `life-clock profile add` first"))?;
    print!("{}", render_grid(&grid));
    print_grid_summary(&grid);
    Ok(())
}

fn print_grid_summary(grid: &WeekGrid) {
    println!(
        "{} lived, {} remaining",
        grid.count(WeekState::Lived),
        grid.count(WeekState::Remaining)
    );
}

fn render_grid(grid: &WeekGrid) -> String {
    let mut out = String::new();
    for (row_index, row) in grid.rows().enumerate() {
        match row_label(row_index) {
            Some(year) => out.push_str(&format!("{:>4} ", year)),
            None => out.push_str("     "),
        }
        for cell in row {
            out.push(match cell.state {
                WeekState::Lived => '#',
                WeekState::Current => '@',
                WeekState::Remaining => '.',
            });
        }
        out.push('\n');
    }
    out
}

fn run_goal(backend: &Backend, command: GoalCommand) -> Result<()> {
    let goals = &backend.goal_service;
    match command {
        GoalCommand::Add { text } => {
            let goal = goals.add_goal(&text)?;
            println!("Added goal {}", goal.id);
        }
        GoalCommand::List => {
            for goal in goals.today_goals() {
                println!("[{}] {}  {}", if goal.completed { "x" } else { " " }, goal.id, goal.goal);
            }
        }
        GoalCommand::Done { id } => {
            let goal = goals.toggle_goal(&id)?;
            println!("{} is now {}", goal.goal, if goal.completed { "done" } else { "open" });
        }
        GoalCommand::Edit { id, text } => {
            goals.update_goal(&id, &text)?;
        }
        GoalCommand::Delete { id } => {
            goals.delete_goal(&id)?;
        }
    }
    Ok(())
}

fn run_milestone(backend: &Backend, command: MilestoneCommand) -> Result<()> {
    let milestones = &backend.milestone_service;
    match command {
        MilestoneCommand::Add { title, date, time, category } => {
            let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d").context("Date must be YYYY-MM-DD")?;
            let time = match time {
                Some(time) => NaiveTime::parse_from_str(&time, "%H:%M").context("Time must be HH:MM")?,
                None => NaiveTime::MIN,
            };
            let milestone = milestones.add_milestone(CreateMilestoneCommand {
                title,
                target_date: local_to_utc(date.and_time(time)),
                category: MilestoneCategory::from_label(&category),
                icon: None,
                color: None,
            })?;
            println!("Added milestone {}", milestone.id);
        }
        MilestoneCommand::Import { file, category } => {
            let text = match file {
                Some(path) => std::fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?,
                None => {
                    let mut text = String::new();
                    io::stdin().read_to_string(&mut text)?;
                    text
                }
            };
            let result = milestones.import_schedule(&text, MilestoneCategory::from_label(&category))?;
            println!("Imported {} milestones", result.imported.len());
            for line in result.skipped_lines {
                println!("  skipped: {}", line);
            }
        }
        MilestoneCommand::List { category } => {
            let filter = category.as_deref().map(MilestoneCategory::from_label);
            for milestone in milestones.list_sorted(filter) {
                let countdown = milestones.countdown(&milestone);
                let status = if countdown.is_completed {
                    "done".to_string()
                } else {
                    format!(
                        "{}d {}h {}m",
                        countdown.days_remaining, countdown.hours_remaining, countdown.minutes_remaining
                    )
                };
                println!(
                    "{}  {:<14} {}  {}  [{}]  {:.0}%",
                    milestone.id,
                    milestone.category_or_default(),
                    milestone.target_date.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
                    milestone.title,
                    status,
                    countdown.progress_percent
                );
            }
        }
        MilestoneCommand::Delete { id } => {
            let removed = milestones.remove_milestone(&id)?;
            println!("Removed {}", removed.title);
        }
    }
    Ok(())
}

async fn run_journal(backend: &Backend, command: JournalCommand) -> Result<()> {
    let journal = &backend.journal_service;
    match command {
        JournalCommand::Write { reflection } => {
            let quote = backend.quote_service.daily_quote(backend.time_source().today()).await;
            let entry = journal.add_entry(&quote.text, &quote.author, &reflection)?;
            println!("Saved reflection on \"{}\" ({})", quote.text, entry.id);
        }
        JournalCommand::List => {
            for entry in journal.entries() {
                println!(
                    "{}  {}\n  \"{}\" - {}\n  {}\n",
                    entry.date.with_timezone(&Local).format("%Y-%m-%d"),
                    entry.id,
                    entry.quote_text,
                    entry.quote_author,
                    entry.reflection
                );
            }
        }
        JournalCommand::Delete { id } => {
            journal.delete_entry(&id)?;
        }
    }
    Ok(())
}

fn run_bucket(backend: &Backend, command: BucketCommand) -> Result<()> {
    let bucket_list = &backend.bucket_list_service;
    match command {
        BucketCommand::Add { title, image } => {
            let item = bucket_list.add_item(AddBucketItemCommand { title, image_url: image })?;
            println!("Added {}", item.id);
        }
        BucketCommand::List => {
            for item in bucket_list.items() {
                let mark = match item.status {
                    BucketStatus::Achieved => "x",
                    BucketStatus::Pending => " ",
                };
                println!("[{}] {}  {}", mark, item.id, item.title);
            }
        }
        BucketCommand::Toggle { id } => {
            let item = bucket_list.toggle_status(&id)?;
            println!("{} is now {:?}", item.title, item.status);
        }
        BucketCommand::Image { id, url } => {
            bucket_list.update_item_image(&id, &url)?;
        }
        BucketCommand::Remove { id } => {
            bucket_list.remove_item(&id)?;
        }
    }
    Ok(())
}

fn run_theme(backend: &Backend, action: Option<ThemeAction>) -> Result<()> {
    let themes = &backend.theme_service;
    let theme = match action {
        None => themes.theme(),
        Some(ThemeAction::Toggle) => themes.toggle_theme()?,
        Some(ThemeAction::Dark) => themes.set_theme(Theme::Dark)?,
        Some(ThemeAction::Light) => themes.set_theme(Theme::Light)?,
    };
    println!("{}", theme);
    Ok(())
}
