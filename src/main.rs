//! CLI entry: generation commands plus a terminal rendering of the daily
//! card. An external scheduler is expected to invoke `tomorrow` once a day.

use anyhow::Context as _;
use chrono::{Days, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use efemerides::config::Config;
use efemerides::generator::{DayReport, GenerationOutcome, Generator};
use efemerides::llm::OpenAiClient;
use efemerides::resolver::Resolver;
use efemerides::store::SupabaseStore;

#[derive(Parser)]
#[command(
    name = "efemerides",
    about = "Generador y visor de efemérides astronómicas",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Generate tomorrow's ephemeris (default).
    Tomorrow,
    /// Generate the next 7 days.
    Week,
    /// Generate the next 30 days.
    Month,
    /// Generate the next N days.
    Multiple {
        #[arg(default_value_t = 7)]
        days: u32,
    },
    /// Render today's ephemeris.
    Today,
    /// Export every stored ephemeris as JSON.
    Export,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let store = SupabaseStore::new(&config)?;

    match cli.command.unwrap_or(Command::Tomorrow) {
        Command::Tomorrow => {
            let generator = Generator::new(store, OpenAiClient::new(&config)?);
            let tomorrow = Utc::now()
                .date_naive()
                .checked_add_days(Days::new(1))
                .context("calendar overflow")?;

            match generator.generate_for_date(tomorrow).await? {
                GenerationOutcome::Created(row) => {
                    println!("Efeméride generada para {tomorrow}: {}", row.event);
                }
                GenerationOutcome::AlreadyExists => {
                    println!("Ya existe una efeméride para {tomorrow}");
                }
            }
        }
        Command::Week => run_batch(&config, store, 7).await?,
        Command::Month => run_batch(&config, store, 30).await?,
        Command::Multiple { days } => run_batch(&config, store, days).await?,
        Command::Today => {
            let resolver = Resolver::new(store);
            let today = Utc::now().date_naive();
            print_card(today, &resolver.resolve(today).await);
        }
        Command::Export => {
            let resolver = Resolver::new(store);
            let all = resolver.resolve_all().await;
            println!("{}", serde_json::to_string_pretty(&all)?);
        }
    }

    Ok(())
}

async fn run_batch(config: &Config, store: SupabaseStore, days: u32) -> anyhow::Result<()> {
    let generator = Generator::new(store, OpenAiClient::new(config)?);

    tracing::info!(days, "starting batch generation");
    let reports = generator.generate_upcoming(days).await;

    println!("Resumen de generación:");
    for report in &reports {
        println!("  {}", summary_line(report));
    }
    Ok(())
}

fn summary_line(report: &DayReport) -> String {
    match &report.event {
        Some(event) => format!("{}  {:<7}  {}", report.date, report.status, excerpt(event)),
        None => format!("{}  {}", report.date, report.status),
    }
}

/// First 50 characters of the event, for one-line summaries.
fn excerpt(event: &str) -> String {
    let mut excerpt: String = event.chars().take(50).collect();
    if excerpt.len() < event.len() {
        excerpt.push_str("...");
    }
    excerpt
}

fn print_card(date: NaiveDate, card: &efemerides::Ephemeris) {
    println!("{}  {}", date, card.title);
    println!("[{}]", card.category);
    println!("{}", card.description);
    if let Some(constellation) = &card.constellation {
        println!("Constelación: {constellation}");
    }
    if let Some(magnitude) = card.magnitude {
        println!("Magnitud: {magnitude}");
    }
}
