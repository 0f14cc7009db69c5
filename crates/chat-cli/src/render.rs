use std::fmt::Write as _;

use chrono::SecondsFormat;
use shared::chat::{
    EMPTY_LOG_MESSAGE, EntryDetail, IntegrityLogReport, IntegrityLogView, NO_PLAN_MESSAGE,
    ProgressStage, SessionSnapshot, Turn,
};
use shared::models::TurnRole;
use shared::tools::{RepositoryDetails, RepositoryList, ToolOutput, WeatherReport};

pub const GREETING: &str = "How can I assist you today?";
pub const CAPABILITIES: &str = "I can give weather-based event advice, research tech repos, and provide verified, empathy-driven operations assistance.";
pub const REFINING_NOTICE: &str = "Assistant is refining information...";
const VERIFIED_BADGE: &str = "Verified by Integrity Guard";
const MAX_LISTED_REPOSITORIES: usize = 5;

pub fn greeting() -> String {
    format!("{GREETING}\n{CAPABILITIES}\n")
}

/// Full transcript, or the greeting when nothing has been exchanged yet.
pub fn transcript(snapshot: &SessionSnapshot) -> String {
    if snapshot.turns.is_empty() && !snapshot.in_flight {
        return greeting();
    }

    snapshot.turns.iter().map(turn).collect::<Vec<_>>().join("\n")
}

pub fn turn(turn: &Turn) -> String {
    match turn.role() {
        TurnRole::User => format!("you> \"{}\"\n", turn.content()),
        TurnRole::Assistant => {
            let mut out = format!("assistant [{VERIFIED_BADGE}]\n");
            for line in turn.content().lines() {
                let _ = writeln!(out, "  {line}");
            }
            if let Some(card) = turn.structured_payload().and_then(payload_card) {
                out.push_str(&card);
            }
            out
        }
    }
}

fn payload_card(payload: &ToolOutput) -> Option<String> {
    match payload {
        ToolOutput::Weather(report) => Some(weather_card(report)),
        ToolOutput::RepositoryList(list) => Some(repository_list_card(list)),
        ToolOutput::RepositoryDetails(details) => Some(repository_details_card(details)),
        ToolOutput::Unparsed { .. } => None,
    }
}

pub fn weather_card(report: &WeatherReport) -> String {
    let mut out = String::new();
    let condition = report.condition();
    let _ = write!(
        out,
        "  {} {}°C  {}",
        condition.glyph(),
        report.rounded_temperature(),
        report.label()
    );
    if let Some(city) = report.city.as_deref().filter(|city| !city.trim().is_empty()) {
        let _ = write!(out, " in {city}");
    }
    out.push('\n');

    let details: Vec<String> = [
        report
            .humidity
            .map(|humidity| format!("{}% humidity", format_number(humidity))),
        report
            .wind_speed
            .map(|wind| format!("{} km/h wind", format_number(wind))),
    ]
    .into_iter()
    .flatten()
    .collect();
    if !details.is_empty() {
        let _ = writeln!(out, "  {}", details.join(" · "));
    }
    out
}

fn repository_list_card(list: &RepositoryList) -> String {
    if list.repositories.is_empty() {
        return "  (no repositories found)\n".to_string();
    }

    let mut out = String::new();
    for repo in list.repositories.iter().take(MAX_LISTED_REPOSITORIES) {
        let name = repo.name.as_deref().unwrap_or("unnamed");
        let _ = write!(out, "  - {name}");
        if let Some(stars) = repo.stars {
            let _ = write!(out, " ★{stars}");
        }
        if repo.is_fork == Some(true) {
            out.push_str(" (fork)");
        }
        if let Some(description) = repo.description.as_deref() {
            let _ = write!(out, ": {description}");
        }
        out.push('\n');
    }
    let hidden = list.repositories.len().saturating_sub(MAX_LISTED_REPOSITORIES);
    if hidden > 0 {
        let _ = writeln!(out, "  ... and {hidden} more");
    }
    out
}

fn repository_details_card(details: &RepositoryDetails) -> String {
    let mut out = format!("  {}", details.name);
    if let Some(stars) = details.stars {
        let _ = write!(out, " ★{stars}");
    }
    if let Some(forks) = details.forks {
        let _ = write!(out, " forks:{forks}");
    }
    out.push('\n');
    if let Some(description) = details.description.as_deref() {
        let _ = writeln!(out, "  {description}");
    }
    if !details.topics.is_empty() {
        let _ = writeln!(out, "  topics: {}", details.topics.join(", "));
    }
    if let Some(parent) = details
        .parent
        .as_ref()
        .and_then(|parent| parent.full_name.as_deref())
    {
        let _ = writeln!(out, "  forked from {parent}");
    }
    out
}

/// Stage checklist shown while a cycle is in flight. `None` when idle.
pub fn stage_indicator(stage: ProgressStage) -> Option<String> {
    if !stage.is_active() {
        return None;
    }

    let current = ProgressStage::ACTIVE
        .iter()
        .position(|candidate| *candidate == stage)
        .unwrap_or_default();
    let mut out = String::new();
    for (index, candidate) in ProgressStage::ACTIVE.iter().enumerate() {
        let marker = match index.cmp(&current) {
            std::cmp::Ordering::Less => "[x]",
            std::cmp::Ordering::Equal => "[>]",
            std::cmp::Ordering::Greater => "[ ]",
        };
        let _ = writeln!(
            out,
            "  {marker} {:<9} {}",
            candidate.title(),
            candidate.caption()
        );
    }
    let _ = writeln!(out, "  {REFINING_NOTICE}");
    Some(out)
}

pub fn integrity_log(view: &IntegrityLogView) -> String {
    match view {
        IntegrityLogView::Empty => format!("== Integrity Log ==\n{EMPTY_LOG_MESSAGE}\n"),
        IntegrityLogView::Populated(report) => integrity_report(report),
    }
}

fn integrity_report(report: &IntegrityLogReport) -> String {
    let mut out = format!(
        "== Integrity Log ==\nquery: \"{}\" (received {})\n",
        report.query,
        report
            .received_at
            .to_rfc3339_opts(SecondsFormat::Secs, true)
    );
    if report.planner_found_no_steps {
        let _ = writeln!(out, "{NO_PLAN_MESSAGE}");
    }

    for entry in &report.entries {
        let _ = writeln!(out, "-- {} [{}]", entry.tool, entry.status_label);
        if !entry.reason.is_empty() {
            let _ = writeln!(out, "   {}", entry.reason);
        }
        match &entry.detail {
            EntryDetail::Output(json) => {
                for line in json.lines() {
                    let _ = writeln!(out, "   | {line}");
                }
            }
            EntryDetail::Error(error) => {
                let _ = writeln!(out, "   ! {error}");
            }
            EntryDetail::Missing => {
                let _ = writeln!(out, "   (no output)");
            }
        }
    }
    out
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value:.1}")
    }
}
