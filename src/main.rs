use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};

use visa_timeline::{compute, report, Profile, TimelineResult};

#[derive(Parser)]
#[command(name = "visa-timeline")]
#[command(about = "Immigration deadline timeline and risk computation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the timeline, risks, and status for a profile
    Compute {
        #[arg(long)]
        profile: PathBuf,
        /// Reference date (defaults to today, captured once at startup)
        #[arg(long)]
        as_of: Option<NaiveDate>,
        /// Emit the full result as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Generate a markdown report
    Report {
        #[arg(long)]
        profile: PathBuf,
        #[arg(long)]
        as_of: Option<NaiveDate>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Recompute under field overrides to explore a scenario
    WhatIf {
        #[arg(long)]
        profile: PathBuf,
        #[arg(long)]
        as_of: Option<NaiveDate>,
        /// Field override, e.g. --set is_stem=false --set cpt_months_used=12
        #[arg(long = "set", value_name = "FIELD=VALUE")]
        overrides: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // The reference date is captured exactly once and threaded explicitly;
    // recomputation within one invocation sees the same "now".
    match cli.command {
        Commands::Compute {
            profile,
            as_of,
            json,
            limit,
        } => {
            let as_of = as_of.unwrap_or_else(|| Utc::now().date_naive());
            let profile = load_profile(&profile)?;
            let result = compute(&profile, as_of)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_summary(&result, as_of, limit);
            }
        }
        Commands::Report {
            profile,
            as_of,
            out,
        } => {
            let as_of = as_of.unwrap_or_else(|| Utc::now().date_naive());
            let profile = load_profile(&profile)?;
            let result = compute(&profile, as_of)?;
            let rendered = report::build_report(&result, as_of);
            std::fs::write(&out, rendered)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::WhatIf {
            profile,
            as_of,
            overrides,
        } => {
            let as_of = as_of.unwrap_or_else(|| Utc::now().date_naive());
            let baseline_profile = load_profile(&profile)?;
            let mut scenario_profile = baseline_profile.clone();
            for entry in &overrides {
                apply_override(&mut scenario_profile, entry)?;
            }

            let baseline = compute(&baseline_profile, as_of)?;
            let scenario = compute(&scenario_profile, as_of)?;

            println!("Baseline:");
            print_status_line(&baseline);
            println!("Scenario ({} overrides):", overrides.len());
            print_status_line(&scenario);
            println!();
            print_summary(&scenario, as_of, 10);
        }
    }

    Ok(())
}

fn load_profile(path: &Path) -> anyhow::Result<Profile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read profile {}", path.display()))?;
    let profile: Profile = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse profile {}", path.display()))?;
    Ok(profile)
}

fn print_status_line(result: &TimelineResult) {
    match (
        &result.current_status.next_deadline,
        result.current_status.days_until_next_deadline,
    ) {
        (Some(title), Some(days)) => {
            println!(
                "  {} ({}), next: {title} in {days} days",
                result.current_status.visa, result.current_status.work_auth
            );
        }
        _ => println!(
            "  {} ({}), no upcoming deadlines",
            result.current_status.visa, result.current_status.work_auth
        ),
    }
}

fn print_summary(result: &TimelineResult, as_of: NaiveDate, limit: usize) {
    println!("Status as of {as_of}:");
    print_status_line(result);

    println!();
    if result.risk_alerts.is_empty() {
        println!("No risks detected.");
    } else {
        println!("Risks:");
        for alert in &result.risk_alerts {
            println!("- [{}] {}", alert.severity.label(), alert.message);
        }
    }

    println!();
    println!("Upcoming events:");
    let upcoming: Vec<_> = result
        .timeline_events
        .iter()
        .filter(|event| !event.is_past)
        .take(limit)
        .collect();
    if upcoming.is_empty() {
        println!("- none");
    }
    for event in upcoming {
        println!("- {}: {}", event.date, event.title);
    }
}

/// Applies one `field=value` override to a profile. Enum-valued fields
/// accept their wire tags (e.g. `visa_type=H-1B`, `opt_status=active`).
fn apply_override(profile: &mut Profile, entry: &str) -> anyhow::Result<()> {
    let Some((field, value)) = entry.split_once('=') else {
        bail!("override `{entry}` is not in FIELD=VALUE form");
    };
    let field = field.trim();
    let value = value.trim();

    fn enum_value<T: serde::de::DeserializeOwned>(field: &str, value: &str) -> anyhow::Result<T> {
        serde_json::from_value(serde_json::Value::String(value.to_string()))
            .with_context(|| format!("invalid value `{value}` for {field}"))
    }

    match field {
        "visa_type" => profile.visa_type = enum_value(field, value)?,
        "degree_level" => profile.degree_level = enum_value(field, value)?,
        "opt_status" => profile.opt_status = enum_value(field, value)?,
        "career_goal" => profile.career_goal = enum_value(field, value)?,
        "is_stem" => profile.is_stem = parse_as(field, value)?,
        "program_extended" => profile.program_extended = parse_as(field, value)?,
        "currently_employed" => profile.currently_employed = parse_as(field, value)?,
        "has_job_offer" => profile.has_job_offer = parse_as(field, value)?,
        "cpt_months_used" => profile.cpt_months_used = parse_as(field, value)?,
        "unemployment_days" => profile.unemployment_days = parse_as(field, value)?,
        "h1b_attempts" => profile.h1b_attempts = parse_as(field, value)?,
        "country" => profile.country = value.to_string(),
        "major_field" => profile.major_field = Some(value.to_string()),
        "program_start" => profile.program_start = Some(parse_as(field, value)?),
        "expected_graduation" => profile.expected_graduation = Some(parse_as(field, value)?),
        "original_graduation" => profile.original_graduation = Some(parse_as(field, value)?),
        other => bail!("unknown profile field `{other}`"),
    }
    Ok(())
}

fn parse_as<T>(field: &str, value: &str) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse::<T>()
        .with_context(|| format!("invalid value `{value}` for {field}"))
}
