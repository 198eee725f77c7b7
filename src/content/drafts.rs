use serde::Deserialize;

use crate::db::models::{normalize_hashtags, Poll, Post};
use crate::db::{Collection, SqliteStore};
use crate::error::{AppError, AppResult};

/// User edits to a draft. Absent fields are left alone; an empty meme text
/// clears it.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftUpdate {
    pub post_content: Option<String>,
    pub hashtags: Option<Vec<String>>,
    pub meme_text: Option<String>,
    pub meme_text_color: Option<String>,
    pub meme_stroke_color: Option<String>,
    pub poll: Option<Poll>,
    #[serde(default)]
    pub remove_poll: bool,
}

impl DraftUpdate {
    pub fn apply(self, post: &mut Post) -> AppResult<()> {
        if let Some(content) = self.post_content {
            if content.trim().is_empty() {
                return Err(AppError::BadRequest("Post content cannot be empty".to_string()));
            }
            post.content = content;
        }
        if let Some(tags) = self.hashtags {
            post.hashtags = normalize_hashtags(tags);
        }
        if let Some(text) = self.meme_text {
            post.meme_text = Some(text.trim().to_string()).filter(|t| !t.is_empty());
        }
        if let Some(color) = self.meme_text_color {
            post.meme_text_color = Some(color);
        }
        if let Some(color) = self.meme_stroke_color {
            post.meme_stroke_color = Some(color);
        }
        if self.remove_poll {
            post.poll = None;
        } else if let Some(poll) = self.poll {
            let poll = Poll::new(&poll.question, poll.options).ok_or_else(|| {
                AppError::BadRequest("A poll needs a question and 2 to 4 options".to_string())
            })?;
            post.poll = Some(poll);
        }
        Ok(())
    }
}

// --- Drafts ---

pub fn save(store: &SqliteStore, post: &Post) -> AppResult<()> {
    store.put(Collection::Drafts, &post.id, post)?;
    Ok(())
}

pub fn list(store: &SqliteStore) -> AppResult<Vec<Post>> {
    Ok(store.list(Collection::Drafts)?)
}

pub fn get(store: &SqliteStore, id: &str) -> AppResult<Post> {
    store.get(Collection::Drafts, id)?.ok_or(AppError::NotFound)
}

pub fn update(store: &SqliteStore, id: &str, changes: DraftUpdate) -> AppResult<Post> {
    let mut post = get(store, id)?;
    changes.apply(&mut post)?;
    save(store, &post)?;
    Ok(post)
}

pub fn delete(store: &SqliteStore, id: &str) -> AppResult<()> {
    if store.remove(Collection::Drafts, id)? {
        Ok(())
    } else {
        Err(AppError::NotFound)
    }
}

/// A post by id from drafts, falling back to favorites.
pub fn find(store: &SqliteStore, id: &str) -> AppResult<Post> {
    if let Some(post) = store.get(Collection::Drafts, id)? {
        return Ok(post);
    }
    store.get(Collection::Favorites, id)?.ok_or(AppError::NotFound)
}

// --- Favorites ---

/// Stores a copy of the post. Adding the same id again refreshes the copy.
pub fn add_favorite(store: &SqliteStore, post: &Post) -> AppResult<()> {
    store.put(Collection::Favorites, &post.id, post)?;
    Ok(())
}

pub fn remove_favorite(store: &SqliteStore, id: &str) -> AppResult<()> {
    if store.remove(Collection::Favorites, id)? {
        Ok(())
    } else {
        Err(AppError::NotFound)
    }
}

pub fn favorites(store: &SqliteStore) -> AppResult<Vec<Post>> {
    Ok(store.list(Collection::Favorites)?)
}

pub fn is_favorite(store: &SqliteStore, id: &str) -> AppResult<bool> {
    Ok(store.contains(Collection::Favorites, id)?)
}
