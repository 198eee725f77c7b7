use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::ai::prompts;
use crate::ai::{parse_structured, GenerateRequest, GenerativeBackend};
use crate::db::models::{PlannedPost, Post};
use crate::db::{Collection, SqliteStore};
use crate::error::{AppError, AppResult};

const DATE_FORMAT: &str = "%Y-%m-%d";

// --- Calendar math ---

pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((next - first).num_days() as u32)
}

/// Weekday of the 1st, 0 = Sunday.
pub fn first_weekday(year: i32, month: u32) -> Option<u32> {
    NaiveDate::from_ymd_opt(year, month, 1).map(|d| d.weekday().num_days_from_sunday())
}

/// Cells of a Sunday-first month view: leading blanks, then day numbers.
pub fn month_grid(year: i32, month: u32) -> Option<Vec<Option<u32>>> {
    let blanks = first_weekday(year, month)?;
    let days = days_in_month(year, month)?;
    let mut cells: Vec<Option<u32>> = (0..blanks).map(|_| None).collect();
    cells.extend((1..=days).map(Some));
    Some(cells)
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok()
}

fn month_prefix(year: i32, month: u32) -> String {
    format!("{:04}-{:02}-", year, month)
}

// --- Plan generation ---

#[derive(Debug, Deserialize)]
struct PlanReply {
    #[serde(default)]
    posts: Vec<PlanEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlanEntry {
    date: String,
    post_type: String,
    topic: String,
    post_content: String,
    #[serde(default)]
    hashtags: Vec<String>,
}

/// Asks for a month's editorial plan and replaces whatever was planned for
/// that month. Entries dated outside the month are dropped; a plan with no
/// usable entries leaves the stored plan untouched.
pub async fn generate_plan(
    store: &SqliteStore,
    backend: &dyn GenerativeBackend,
    language: &str,
    year: i32,
    month: u32,
) -> AppResult<Vec<PlannedPost>> {
    let days = days_in_month(year, month)
        .ok_or_else(|| AppError::BadRequest(format!("Invalid month {}/{}", month, year)))?;

    let request = GenerateRequest::new(prompts::month_plan(month, year, days, language))
        .with_schema(prompts::month_plan_schema());
    let response = backend.generate(request).await?;
    let reply: PlanReply = parse_structured(&response.text)?;

    let mut planned: Vec<PlannedPost> = Vec::with_capacity(reply.posts.len());
    for entry in reply.posts {
        let date = match parse_date(&entry.date) {
            Some(d) if d.year() == year && d.month() == month => d,
            _ => {
                tracing::debug!("Dropping plan entry dated {}", entry.date);
                continue;
            }
        };
        if entry.post_content.trim().is_empty() {
            continue;
        }

        let mut post = Post::new(entry.post_content.trim(), entry.hashtags);
        post.topic = entry.topic.clone();
        post.style = entry.post_type.clone();

        let key = date.format(DATE_FORMAT).to_string();
        planned.retain(|p| p.date != key);
        planned.push(PlannedPost {
            date: key,
            post_type: entry.post_type,
            topic: entry.topic,
            post,
        });
    }

    if planned.is_empty() {
        return Err(AppError::MalformedOutput(format!(
            "plan had no entries for {:02}/{}",
            month, year
        )));
    }

    let prefix = month_prefix(year, month);
    for key in store.keys(Collection::Calendar)? {
        if key.starts_with(&prefix) {
            store.remove(Collection::Calendar, &key)?;
        }
    }

    planned.sort_by(|a, b| a.date.cmp(&b.date));
    for entry in &planned {
        store.put(Collection::Calendar, &entry.date, entry)?;
    }

    tracing::info!("Planned {} posts for {}", planned.len(), &prefix[..7]);
    Ok(planned)
}

// --- Stored plan ---

/// Puts a post on a day, replacing anything already planned there.
pub fn accept_suggestion(
    store: &SqliteStore,
    date: &str,
    post_type: &str,
    topic: &str,
    post: Post,
) -> AppResult<PlannedPost> {
    let date = parse_date(date)
        .ok_or_else(|| AppError::BadRequest(format!("Invalid date '{}'", date)))?;
    let entry = PlannedPost {
        date: date.format(DATE_FORMAT).to_string(),
        post_type: post_type.trim().to_string(),
        topic: topic.trim().to_string(),
        post,
    };
    store.put(Collection::Calendar, &entry.date, &entry)?;
    Ok(entry)
}

/// Planned posts ordered by date, optionally limited to one month.
pub fn list(store: &SqliteStore, month: Option<(i32, u32)>) -> AppResult<Vec<PlannedPost>> {
    let prefix = month.map(|(year, month)| month_prefix(year, month));
    let mut entries: Vec<PlannedPost> = store
        .list::<PlannedPost>(Collection::Calendar)?
        .into_iter()
        .filter(|p| prefix.as_ref().map_or(true, |pre| p.date.starts_with(pre)))
        .collect();
    entries.sort_by(|a, b| a.date.cmp(&b.date));
    Ok(entries)
}

/// Planned posts on or after `from`, ordered by date.
pub fn upcoming(store: &SqliteStore, from: NaiveDate) -> AppResult<Vec<PlannedPost>> {
    let from = from.format(DATE_FORMAT).to_string();
    Ok(list(store, None)?
        .into_iter()
        .filter(|p| p.date >= from)
        .collect())
}

pub fn remove(store: &SqliteStore, date: &str) -> AppResult<()> {
    if store.remove(Collection::Calendar, date.trim())? {
        Ok(())
    } else {
        Err(AppError::NotFound)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthView {
    pub year: i32,
    pub month: u32,
    pub days_in_month: u32,
    pub first_weekday: u32,
    /// Sunday-first cells, `None` for the blanks before the 1st
    pub grid: Vec<Option<u32>>,
    pub posts: Vec<PlannedPost>,
}

pub fn month_view(store: &SqliteStore, year: i32, month: u32) -> AppResult<MonthView> {
    let invalid = || AppError::BadRequest(format!("Invalid month {}/{}", month, year));
    let days = days_in_month(year, month).ok_or_else(invalid)?;
    let grid = month_grid(year, month).ok_or_else(invalid)?;
    Ok(MonthView {
        year,
        month,
        days_in_month: days,
        first_weekday: first_weekday(year, month).unwrap_or(0),
        grid,
        posts: list(store, Some((year, month)))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::testing::ScriptedBackend;

    fn store() -> SqliteStore {
        let pool = crate::db::memory_pool().unwrap();
        crate::db::run_migrations(&pool).unwrap();
        SqliteStore::new(pool)
    }

    #[test]
    fn month_lengths() {
        assert_eq!(days_in_month(2024, 2), Some(29));
        assert_eq!(days_in_month(2023, 2), Some(28));
        assert_eq!(days_in_month(2025, 12), Some(31));
        assert_eq!(days_in_month(2025, 4), Some(30));
        assert_eq!(days_in_month(2025, 13), None);
    }

    #[test]
    fn first_weekday_is_sunday_based() {
        // 1 June 2025 was a Sunday, 1 January 2025 a Wednesday.
        assert_eq!(first_weekday(2025, 6), Some(0));
        assert_eq!(first_weekday(2025, 1), Some(3));
    }

    #[test]
    fn grid_has_leading_blanks() {
        let grid = month_grid(2025, 1).unwrap();
        assert_eq!(grid.len(), 3 + 31);
        assert_eq!(&grid[..4], &[None, None, None, Some(1)]);
        assert_eq!(grid.last(), Some(&Some(31)));
    }

    #[test]
    fn month_view_carries_grid_and_month_posts() {
        let store = store();
        accept_suggestion(&store, "2025-06-14", "Poll", "june", Post::new("a", vec![])).unwrap();
        accept_suggestion(&store, "2025-07-01", "Meme", "july", Post::new("b", vec![])).unwrap();

        let view = month_view(&store, 2025, 6).unwrap();
        assert_eq!(view.days_in_month, 30);
        assert_eq!(view.grid.len(), 30);
        assert_eq!(view.grid[0], Some(1));
        assert_eq!(view.posts.len(), 1);
        assert_eq!(view.posts[0].date, "2025-06-14");

        assert!(matches!(
            month_view(&store, 2025, 0),
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn plan_keeps_only_requested_month_and_replaces_it() {
        let store = store();
        accept_suggestion(&store, "2025-03-20", "Meme", "old", Post::new("old", vec![])).unwrap();
        accept_suggestion(&store, "2025-04-01", "Poll", "april", Post::new("keep", vec![]))
            .unwrap();

        let reply = r#"{"posts": [
            {"date": "2025-03-10", "postType": "Quick Tip", "topic": "Git", "postContent": "Use bisect", "hashtags": ["git"]},
            {"date": "2025-02-28", "postType": "Poll", "topic": "stray", "postContent": "x"},
            {"date": "2025-03-03", "postType": "Question", "topic": "Hiring", "postContent": "Why?"},
            {"date": "not a date", "postType": "Poll", "topic": "bad", "postContent": "y"}
        ]}"#;
        let backend = ScriptedBackend::new().reply(reply);

        let plan = generate_plan(&store, &backend, "it", 2025, 3).await.unwrap();
        let dates: Vec<&str> = plan.iter().map(|p| p.date.as_str()).collect();
        assert_eq!(dates, vec!["2025-03-03", "2025-03-10"]);
        assert_eq!(plan[1].post.hashtags, vec!["git"]);

        let march = list(&store, Some((2025, 3))).unwrap();
        assert_eq!(march.len(), 2);
        assert!(march.iter().all(|p| p.topic != "old"));
        assert_eq!(list(&store, Some((2025, 4))).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_plan_keeps_existing_entries() {
        let store = store();
        accept_suggestion(&store, "2025-03-20", "Meme", "old", Post::new("old", vec![])).unwrap();
        let backend = ScriptedBackend::new().reply(r#"{"posts": []}"#);

        let err = generate_plan(&store, &backend, "it", 2025, 3).await.unwrap_err();
        assert!(matches!(err, AppError::MalformedOutput(_)));
        assert_eq!(list(&store, None).unwrap().len(), 1);
    }

    #[test]
    fn accepting_twice_replaces_the_day() {
        let store = store();
        accept_suggestion(&store, "2025-05-02", "Poll", "a", Post::new("a", vec![])).unwrap();
        accept_suggestion(&store, "2025-05-01", "Poll", "b", Post::new("b", vec![])).unwrap();
        accept_suggestion(&store, "2025-05-02", "Meme", "c", Post::new("c", vec![])).unwrap();

        let all = list(&store, None).unwrap();
        let summary: Vec<(&str, &str)> = all
            .iter()
            .map(|p| (p.date.as_str(), p.topic.as_str()))
            .collect();
        assert_eq!(summary, vec![("2025-05-01", "b"), ("2025-05-02", "c")]);
    }

    #[test]
    fn invalid_dates_are_rejected() {
        let store = store();
        let err = accept_suggestion(&store, "2025-02-30", "Poll", "x", Post::new("x", vec![]))
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn upcoming_and_remove() {
        let store = store();
        accept_suggestion(&store, "2025-05-01", "Poll", "past", Post::new("a", vec![])).unwrap();
        accept_suggestion(&store, "2025-05-09", "Poll", "next", Post::new("b", vec![])).unwrap();
        let from = NaiveDate::from_ymd_opt(2025, 5, 5).unwrap();
        let next = upcoming(&store, from).unwrap();
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].topic, "next");

        remove(&store, "2025-05-09").unwrap();
        assert!(matches!(remove(&store, "2025-05-09"), Err(AppError::NotFound)));
    }
}
