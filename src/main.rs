// Event Timeline preview
// Prints the timeline for a JSON list of events, optionally following the clock

use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;

use event_timeline::models::event::Event;
use event_timeline::models::settings::TimelineSettings;
use event_timeline::services::clock::{SharedClock, SystemClock};
use event_timeline::services::event_list::{EventListBuilder, EventListSnapshot, ListItem};
use event_timeline::services::next_event::{NextEvent, NextEventSelector};
use event_timeline::services::temporal::TemporalState;

#[derive(Parser, Debug)]
#[command(name = "timeline-preview", version, about = "Print a live day timeline for a set of events")]
struct Cli {
    /// JSON file holding an array of events
    #[arg(long)]
    events: PathBuf,

    /// Day to show (YYYY-MM-DD); defaults to today
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Settings file; defaults to the platform config location
    #[arg(long)]
    config: Option<PathBuf>,

    /// Keep running and reprint whenever the timeline changes
    #[arg(long)]
    watch: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let settings = load_settings(cli.config.as_deref())?;
    let calendar = settings
        .calendar_context()
        .context("invalid calendar settings")?;
    let events = read_events(&cli.events)?;
    log::info!("Loaded {} events from {}", events.len(), cli.events.display());

    let system = Rc::new(SystemClock::new());
    let clock: SharedClock = system.clone();

    let list = EventListBuilder::with_settings(clock.clone(), &settings, calendar);
    if let Some(date) = cli.date {
        let start = calendar
            .start_of_day(date)
            .with_context(|| format!("{} has no start of day in {}", date, calendar.time_zone()))?;
        list.set_selected_date(start);
    }
    list.set_events(events.clone());

    let next = NextEventSelector::new(clock, calendar, settings.next_event.clone());
    next.set_events(events);

    if !cli.watch {
        print_snapshot(&list.snapshot());
        print_next(next.current().as_ref(), &next.countdown_label());
        return Ok(());
    }

    let _list_printer = list.subscribe(print_snapshot);
    let _next_printer = next.subscribe_countdown(|label| {
        if !label.is_empty() {
            println!("next: {}", label);
        }
    });

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start the timer runtime")?;

    runtime.block_on(async {
        tokio::select! {
            _ = system.run() => log::info!("No pending timers, exiting"),
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for ctrl-c")?;
                log::info!("Interrupted");
            }
        }
        Ok::<(), anyhow::Error>(())
    })
}

fn load_settings(path: Option<&Path>) -> Result<TimelineSettings> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => match TimelineSettings::default_path() {
            Some(path) => path,
            None => {
                log::warn!("No config directory available, using default settings");
                return Ok(TimelineSettings::default());
            }
        },
    };
    TimelineSettings::load(&path).with_context(|| format!("failed to load settings from {}", path.display()))
}

fn read_events(path: &Path) -> Result<Vec<Event>> {
    let data = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("{} is not a JSON array of events", path.display()))
}

fn print_snapshot(snapshot: &EventListSnapshot) {
    println!();
    if snapshot.is_empty() {
        println!("(no events)");
    }
    for item in &snapshot.items {
        match item {
            ListItem::SectionHeader(title) => println!("== {} ==", title),
            ListItem::IntervalGap(gap) => {
                let marker = if gap.fade { "  ." } else { "  :" };
                println!("{} {} free", marker, gap.label);
            }
            ListItem::EventRow(row) => {
                let status = match row.state {
                    TemporalState::InProgress(progress) => format!(" [{:.0}%]", progress * 100.0),
                    _ if row.is_faded => " [done]".to_string(),
                    _ => String::new(),
                };
                let when = row.duration_label.replace('\n', " -> ");
                let ago = row
                    .relative_label
                    .as_deref()
                    .map(|label| format!(" ({})", label))
                    .unwrap_or_default();
                println!("  {:<24} {}{}{}", when, row.title, ago, status);
            }
        }
    }
    println!(
        "overdue: {}  all-day: {}  pending: {}",
        snapshot.overdue_count, snapshot.all_day_count, snapshot.pending_count
    );
}

fn print_next(next: Option<&NextEvent>, label: &str) {
    match next {
        Some(event) => println!("next: {} {}", event.title, label),
        None => println!("next: nothing else today"),
    }
}
