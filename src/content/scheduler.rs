use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::ai::prompts;
use crate::ai::{parse_structured, GenerateRequest, GenerativeBackend};
use crate::db::models::{GroundingSource, LibraryItem};
use crate::db::{Collection, SqliteStore};
use crate::error::{AppError, AppResult};

const ANALYSIS_KEY: &str = "timing_analysis";

const DAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// A recommended posting window. `day` is 0 = Sunday; hours are `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub day: u32,
    pub start: u32,
    pub end: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingAnalysis {
    pub text: String,
    #[serde(default)]
    pub sources: Vec<GroundingSource>,
    pub fetched_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotStatus {
    Optimal,
    Suboptimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleStatus {
    pub status: SlotStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_best_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostTypeSuggestion {
    pub suggestion: String,
    pub post_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibrarySuggestion {
    pub suggestion: String,
    pub item_id: String,
}

fn slot_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)(domenica|luned[iì]|marted[iì]|mercoled[iì]|gioved[iì]|venerd[iì]|sabato|sunday|monday|tuesday|wednesday|thursday|friday|saturday)[\s,*:]*(\d{1,2}):00\s*[-–]\s*(\d{1,2}):00",
        )
        .expect("valid regex")
    })
}

fn day_number(name: &str) -> Option<u32> {
    let name = name.to_lowercase();
    let day = match name.trim_end_matches(&['i', 'ì'][..]) {
        "domenica" | "sunday" => 0,
        "luned" | "monday" => 1,
        "marted" | "tuesday" => 2,
        "mercoled" | "wednesday" => 3,
        "gioved" | "thursday" => 4,
        "venerd" | "friday" => 5,
        "sabato" | "saturday" => 6,
        _ => return None,
    };
    Some(day)
}

/// Extracts every `<weekday> HH:00 - HH:00` window from free text.
pub fn parse_slots(analysis: &str) -> Vec<TimeSlot> {
    slot_pattern()
        .captures_iter(analysis)
        .filter_map(|caps| {
            let day = day_number(caps.get(1)?.as_str())?;
            let start: u32 = caps.get(2)?.as_str().parse().ok()?;
            let end: u32 = caps.get(3)?.as_str().parse().ok()?;
            (start < end && end <= 24).then_some(TimeSlot { day, start, end })
        })
        .collect()
}

/// Whether `hour` on `weekday` (0 = Sunday) falls in a slot, and if not,
/// when the next one opens.
pub fn status_at(slots: &[TimeSlot], weekday: u32, hour: u32) -> ScheduleStatus {
    if slots.is_empty() {
        return ScheduleStatus {
            status: SlotStatus::Suboptimal,
            next_best_time: Some("No optimal time slots are known yet.".to_string()),
        };
    }

    if slots
        .iter()
        .any(|s| s.day == weekday && s.start <= hour && hour < s.end)
    {
        return ScheduleStatus {
            status: SlotStatus::Optimal,
            next_best_time: None,
        };
    }

    let later_today = slots
        .iter()
        .filter(|s| s.day == weekday && hour < s.start)
        .map(|s| s.start)
        .min();

    let next_best_time = match later_today {
        Some(start) => format!("Today at {}:00", start),
        None => (1..=7)
            .map(|offset| (weekday + offset) % 7)
            .find_map(|day| {
                slots
                    .iter()
                    .filter(|s| s.day == day)
                    .map(|s| s.start)
                    .min()
                    .map(|start| format!("{} at {}:00", DAY_NAMES[day as usize], start))
            })
            .unwrap_or_else(|| "No optimal slot found in the next 7 days.".to_string()),
    };

    ScheduleStatus {
        status: SlotStatus::Suboptimal,
        next_best_time: Some(next_best_time),
    }
}

/// The cached timing analysis, fetched with web search on first use or
/// when `refresh` is set.
pub async fn analysis(
    store: &SqliteStore,
    backend: &dyn GenerativeBackend,
    refresh: bool,
) -> AppResult<TimingAnalysis> {
    if !refresh {
        if let Some(cached) = store.get::<TimingAnalysis>(Collection::Settings, ANALYSIS_KEY)? {
            return Ok(cached);
        }
    }

    let response = backend
        .generate(GenerateRequest::new(prompts::TIMING_ANALYSIS).with_web_search())
        .await?;
    let analysis = TimingAnalysis {
        text: response.text,
        sources: response.sources,
        fetched_at: chrono::Utc::now().to_rfc3339(),
    };
    store.put(Collection::Settings, ANALYSIS_KEY, &analysis)?;
    tracing::info!(
        "Cached timing analysis ({} slots)",
        parse_slots(&analysis.text).len()
    );
    Ok(analysis)
}

pub async fn suggest_post_type(
    backend: &dyn GenerativeBackend,
    analysis: &str,
    next_best_time: &str,
) -> AppResult<PostTypeSuggestion> {
    let request = GenerateRequest::new(prompts::post_type_for_slot(analysis, next_best_time))
        .with_schema(prompts::post_type_schema());
    let response = backend.generate(request).await?;
    parse_structured(&response.text)
}

/// Picks a library item for the post type. An id the library does not
/// contain counts as malformed output.
pub async fn suggest_from_library(
    backend: &dyn GenerativeBackend,
    post_type: &str,
    items: &[LibraryItem],
) -> AppResult<LibrarySuggestion> {
    if items.is_empty() {
        return Err(AppError::BadRequest("The content library is empty".to_string()));
    }

    let request = GenerateRequest::new(prompts::library_suggestion(post_type, items))
        .with_schema(prompts::library_suggestion_schema());
    let response = backend.generate(request).await?;
    let suggestion: LibrarySuggestion = parse_structured(&response.text)?;

    if !items.iter().any(|item| item.id == suggestion.item_id) {
        return Err(AppError::MalformedOutput(format!(
            "suggested unknown library item '{}'",
            suggestion.item_id
        )));
    }
    Ok(suggestion)
}
