use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::db::{Collection, SqliteStore};
use crate::error::AppResult;

const STATE_KEY: &str = "reminder";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReminderState {
    last_published: Option<DateTime<Utc>>,
    #[serde(default)]
    permission_dismissed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderStatus {
    pub due: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    pub last_published: Option<DateTime<Utc>>,
    /// Whether the client should still offer to enable reminders
    pub ask_permission: bool,
}

fn load(store: &SqliteStore) -> AppResult<ReminderState> {
    Ok(store
        .get(Collection::Settings, STATE_KEY)?
        .unwrap_or_default())
}

fn save(store: &SqliteStore, state: &ReminderState) -> AppResult<()> {
    store.put(Collection::Settings, STATE_KEY, state)?;
    Ok(())
}

/// Decides whether a reminder is due at `now`. A due reminder restarts the
/// timer; a missing timer is started and nothing is due.
pub fn check(store: &SqliteStore, interval: Duration, now: DateTime<Utc>) -> AppResult<ReminderStatus> {
    let mut state = load(store)?;

    let due = match state.last_published {
        Some(last) => now - last > interval,
        None => false,
    };
    if due || state.last_published.is_none() {
        state.last_published = Some(now);
        save(store, &state)?;
    }

    let (title, body) = if due {
        let drafts_ready = store.count(Collection::Drafts)? > 0;
        let (title, body) = message(drafts_ready, interval);
        tracing::info!("Publication reminder due: {}", title);
        (Some(title), Some(body))
    } else {
        (None, None)
    };

    Ok(ReminderStatus {
        due,
        title,
        body,
        last_published: state.last_published,
        ask_permission: !state.permission_dismissed,
    })
}

fn message(drafts_ready: bool, interval: Duration) -> (String, String) {
    if drafts_ready {
        (
            "Your posts are ready!".to_string(),
            "Some drafts are waiting for you. Take a look and pick the best one!".to_string(),
        )
    } else {
        let days = interval.num_days();
        let elapsed = if days >= 1 {
            format!("{} days", days)
        } else {
            format!("{} hours", interval.num_hours())
        };
        (
            "Time to shine on LinkedIn!".to_string(),
            format!(
                "It has been {}. Generate a new post to keep your profile active!",
                elapsed
            ),
        )
    }
}

pub fn mark_published(store: &SqliteStore, now: DateTime<Utc>) -> AppResult<()> {
    let mut state = load(store)?;
    state.last_published = Some(now);
    save(store, &state)
}

pub fn dismiss(store: &SqliteStore) -> AppResult<()> {
    let mut state = load(store)?;
    state.permission_dismissed = true;
    save(store, &state)
}
