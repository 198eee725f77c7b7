use crate::db::models::Post;

/// Post text as it should be pasted: body, hashtags, then the poll.
pub fn format_for_clipboard(post: &Post) -> String {
    let mut out = post.content.trim_end().to_string();

    if !post.hashtags.is_empty() {
        let tags: Vec<String> = post.hashtags.iter().map(|t| format!("#{}", t)).collect();
        out.push_str("\n\n");
        out.push_str(&tags.join(" "));
    }

    if let Some(poll) = &post.poll {
        out.push_str("\n\n");
        out.push_str(&poll.question);
        for (i, option) in poll.options.iter().enumerate() {
            out.push_str(&format!("\n{}. {}", i + 1, option));
        }
    }

    out
}

/// Download name for a post's image.
pub fn image_filename(post: &Post, extension: &str) -> String {
    let slug: String = post
        .topic
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    let slug = slug
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    if slug.is_empty() {
        format!("post-{}.{}", post.id, extension)
    } else {
        format!("{}.{}", slug, extension)
    }
}
