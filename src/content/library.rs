use crate::db::models::{InlineImage, LibraryItem, LibraryKind};
use crate::db::{Collection, SqliteStore};
use crate::error::{AppError, AppResult};

/// Turns an uploaded file into a library item, or `None` for unsupported
/// types. Text is decoded as UTF-8, lossily.
pub fn classify(name: &str, content_type: Option<&str>, bytes: &[u8]) -> Option<LibraryItem> {
    let content_type = content_type
        .map(|ct| ct.split(';').next().unwrap_or(ct).trim().to_ascii_lowercase())
        .filter(|ct| !ct.is_empty() && ct != "application/octet-stream")
        .unwrap_or_else(|| {
            mime_guess::from_path(name)
                .first_or_octet_stream()
                .essence_str()
                .to_string()
        });

    let lower_name = name.to_ascii_lowercase();
    let is_text_file = lower_name.ends_with(".txt") || lower_name.ends_with(".md");

    let (kind, data, mime_type) = if content_type.starts_with("image/") {
        let image = InlineImage::new(content_type.clone(), bytes.to_vec());
        (LibraryKind::Image, image.to_data_uri(), Some(content_type))
    } else if content_type == "text/plain" || content_type == "text/markdown" || is_text_file {
        let text = String::from_utf8_lossy(bytes).into_owned();
        (LibraryKind::Text, text, Some(content_type))
    } else {
        return None;
    };

    Some(LibraryItem {
        id: uuid::Uuid::now_v7().to_string(),
        name: name.to_string(),
        kind,
        data,
        mime_type,
    })
}

/// Adds items ahead of the existing ones and trims the library to
/// `max_items`, dropping the oldest. The first item in `items` ends up newest.
pub fn add_items(
    store: &SqliteStore,
    max_items: usize,
    items: Vec<LibraryItem>,
) -> AppResult<Vec<LibraryItem>> {
    for item in items.iter().rev() {
        store.put(Collection::Library, &item.id, item)?;
    }

    let keys = store.keys(Collection::Library)?;
    for stale in keys.iter().skip(max_items) {
        store.remove(Collection::Library, stale)?;
        tracing::debug!("Evicted library item {}", stale);
    }

    list(store)
}

/// Newest first.
pub fn list(store: &SqliteStore) -> AppResult<Vec<LibraryItem>> {
    Ok(store.list(Collection::Library)?)
}

pub fn get(store: &SqliteStore, id: &str) -> AppResult<LibraryItem> {
    store.get(Collection::Library, id)?.ok_or(AppError::NotFound)
}

pub fn remove(store: &SqliteStore, id: &str) -> AppResult<()> {
    if store.remove(Collection::Library, id)? {
        Ok(())
    } else {
        Err(AppError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SqliteStore {
        let pool = crate::db::memory_pool().unwrap();
        crate::db::run_migrations(&pool).unwrap();
        SqliteStore::new(pool)
    }

    fn text(name: &str) -> LibraryItem {
        classify(name, Some("text/plain"), name.as_bytes()).unwrap()
    }

    #[test]
    fn classifies_by_content_type_and_extension() {
        let img = classify("a.png", Some("image/png"), &[1, 2]).unwrap();
        assert_eq!(img.kind, LibraryKind::Image);
        assert_eq!(img.image().unwrap().bytes, vec![1, 2]);

        let md = classify("notes.md", None, b"# Title").unwrap();
        assert_eq!(md.kind, LibraryKind::Text);
        assert_eq!(md.data, "# Title");

        let guessed = classify("photo.JPG", Some("application/octet-stream"), &[9]).unwrap();
        assert_eq!(guessed.mime_type.as_deref(), Some("image/jpeg"));

        assert!(classify("deck.pdf", Some("application/pdf"), b"%PDF").is_none());
    }

    #[test]
    fn invalid_utf8_is_decoded_lossily() {
        let item = classify("x.txt", Some("text/plain; charset=utf-8"), &[b'o', b'k', 0xff]).unwrap();
        assert_eq!(item.data, "ok\u{fffd}");
    }

    #[test]
    fn new_items_go_first_and_library_is_capped() {
        let store = store();
        add_items(&store, 3, vec![text("1"), text("2")]).unwrap();
        let items = add_items(&store, 3, vec![text("3"), text("4")]).unwrap();

        let names: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["3", "4", "1"]);
    }

    #[test]
    fn remove_unknown_is_not_found() {
        let store = store();
        let items = add_items(&store, 5, vec![text("a")]).unwrap();
        remove(&store, &items[0].id).unwrap();
        assert!(matches!(remove(&store, &items[0].id), Err(AppError::NotFound)));
        assert!(matches!(get(&store, "nope"), Err(AppError::NotFound)));
    }
}
