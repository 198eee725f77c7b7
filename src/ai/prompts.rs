//! Prompt text and response schemas for every backend call.

use serde_json::{json, Value};

use crate::db::models::{LibraryItem, LibraryKind, Post};

/// Human-readable language name for a config code.
pub fn language_name(code: &str) -> &str {
    match code.trim().to_ascii_lowercase().as_str() {
        "it" => "Italian",
        "en" => "English",
        "es" => "Spanish",
        "fr" => "French",
        "de" => "German",
        "pt" => "Portuguese",
        _ => code,
    }
}

pub struct PostPrompt<'a> {
    pub topic: &'a str,
    pub style: &'a str,
    pub tone: &'a str,
    pub language: &'a str,
    pub meme: bool,
    pub source_text: Option<&'a str>,
}

pub fn post(p: &PostPrompt<'_>) -> String {
    let mut prompt = format!(
        "Act as an expert IT recruiter and LinkedIn content creator. Your tone is {tone}: \
         authoritative yet approachable, never sarcastic.\n\
         Write a post about '{topic}' in the '{style}' style.\n\n\
         The post MUST follow this structure:\n\
         1. A bold headline that builds anticipation.\n\
         2. An empty line after the headline.\n\
         3. Two or three paragraphs.\n\
         4. Every paragraph starts with an emoji that fits its content.\n\n\
         Include 3-5 relevant professional hashtags. Write the post in {language}.\n",
        tone = p.tone,
        topic = p.topic,
        style = p.style,
        language = language_name(p.language),
    );

    if let Some(source) = p.source_text {
        prompt.push_str(&format!(
            "\nBase the post on this source material:\n---\n{}\n---\n",
            source
        ));
    }

    if p.style.eq_ignore_ascii_case("poll") || p.style.eq_ignore_ascii_case("sondaggio") {
        prompt.push_str(
            "\nAlso propose a poll: a short question with 2 to 4 answer options \
             (keys \"poll.question\" and \"poll.options\").\n",
        );
    }

    if p.meme {
        prompt.push_str(
            "\nAlso write a short, punchy meme caption (max 12 words) for an image that \
             accompanies the post (key \"memeText\"), plus a fill color and an outline color \
             as hex codes that stay readable over a photo (keys \"memeTextColor\" and \
             \"memeStrokeColor\").\n",
        );
    }

    prompt.push_str(
        "\nThe whole reply MUST be a single JSON object with the keys \"postContent\" \
         (the full post text, headline and paragraphs, using \\n for new lines) and \
         \"hashtags\" (an array of strings without the '#' symbol), plus any optional keys \
         requested above. No text, backticks or markdown before or after the object.",
    );
    prompt
}

pub fn post_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "postContent": { "type": "STRING" },
            "hashtags": { "type": "ARRAY", "items": { "type": "STRING" } },
            "memeText": { "type": "STRING" },
            "memeTextColor": { "type": "STRING" },
            "memeStrokeColor": { "type": "STRING" },
            "poll": {
                "type": "OBJECT",
                "properties": {
                    "question": { "type": "STRING" },
                    "options": { "type": "ARRAY", "items": { "type": "STRING" } }
                }
            }
        },
        "required": ["postContent", "hashtags"]
    })
}

pub fn image(topic: &str, meme: bool) -> String {
    if meme {
        format!(
            "A striking, humorous photographic scene about \"{}\" suitable as a meme \
             background for tech professionals. Leave the bottom fifth of the frame calm \
             and uncluttered for a caption. No text in the image.",
            topic
        )
    } else {
        format!(
            "An abstract, professional tech-style image for a LinkedIn post about \"{}\". \
             Metaphorical and visually engaging, suited to an audience of professionals. \
             No text in the image.",
            topic
        )
    }
}

pub fn refinement_opening(post: &Post) -> String {
    format!(
        "You are a communication and social-media expert for the tech industry. Your style \
         is professional, constructive and encouraging. Help me refine this LinkedIn post, \
         improving its clarity, impact and effectiveness. Here is the draft:\n\n---\n\n{}",
        post.content
    )
}

pub const REFINEMENT_ACK: &str = "Draft received. It is a solid base. Shall we work on the \
    clarity of the message, strengthen the call to action, or tighten the structure for \
    an easier read? Tell me where to start.";

pub fn refinement_turn(message: &str, post: &Post) -> String {
    format!(
        "Current post:\n---\n{}\n---\nHashtags: {}\n\nRequest: {}\n\n\
         Reply with one JSON object whose \"action\" is one of:\n\
         - \"reply\" with \"text\" for advice or questions;\n\
         - \"rewrite\" with \"postContent\" and optionally \"hashtags\" to replace the post;\n\
         - \"set_meme_text\" with \"text\" and optionally \"color\" and \"strokeColor\";\n\
         - \"add_poll\" with \"question\" and \"options\" (2-4);\n\
         - \"remove_poll\";\n\
         - \"set_hashtags\" with \"hashtags\".\n\
         Rewrites may include a short \"note\" explaining the change.",
        post.content,
        post.hashtags.join(", "),
        message
    )
}

pub fn refinement_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "action": {
                "type": "STRING",
                "enum": ["reply", "rewrite", "set_meme_text", "add_poll", "remove_poll", "set_hashtags"]
            },
            "text": { "type": "STRING" },
            "note": { "type": "STRING" },
            "postContent": { "type": "STRING" },
            "hashtags": { "type": "ARRAY", "items": { "type": "STRING" } },
            "color": { "type": "STRING" },
            "strokeColor": { "type": "STRING" },
            "question": { "type": "STRING" },
            "options": { "type": "ARRAY", "items": { "type": "STRING" } }
        },
        "required": ["action"]
    })
}

pub fn month_plan(month: u32, year: i32, days: u32, language: &str) -> String {
    format!(
        "You are a LinkedIn content strategist for an IT recruiter. Build an editorial \
         calendar for {month:02}/{year} ({days} days). Pick 8 to 12 publishing days spread \
         across the month, favouring weekdays. Vary the post types among: Question, \
         Point of View, Tech News, Quick Tip, Myth Busting, Poll, Meme.\n\
         For each day give the date as YYYY-MM-DD, the post type, a specific topic, a full \
         draft (\"postContent\") in {language} and 3-5 hashtags without '#'.\n\
         Reply with a JSON object {{\"posts\": [...]}} where each element has the keys \
         \"date\", \"postType\", \"topic\", \"postContent\" and \"hashtags\".",
        month = month,
        year = year,
        days = days,
        language = language_name(language),
    )
}

pub fn month_plan_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "posts": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "date": { "type": "STRING" },
                        "postType": { "type": "STRING" },
                        "topic": { "type": "STRING" },
                        "postContent": { "type": "STRING" },
                        "hashtags": { "type": "ARRAY", "items": { "type": "STRING" } }
                    },
                    "required": ["date", "postType", "topic", "postContent"]
                }
            }
        },
        "required": ["posts"]
    })
}

pub const TIMING_ANALYSIS: &str = "Using current data, analyse the best days and times to \
    publish on LinkedIn for an audience of IT professionals in Italy. List the best time \
    slots one per line in the exact form '<weekday> HH:00 - HH:00' (for example \
    'Tuesday 08:00 - 10:00'), then briefly explain why each slot works.";

pub fn post_type_for_slot(analysis: &str, next_best_time: &str) -> String {
    format!(
        "Here is an analysis of the best times to post on LinkedIn:\n---\n{}\n---\n\
         The next ideal slot is: {}.\n\
         Suggest which type of post would perform best in that slot (one of: Question, \
         Point of View, Tech News, Quick Tip, Myth Busting, Poll, Meme) and give a \
         one-sentence strategic reason.\n\
         Reply with a JSON object {{\"suggestion\": string, \"postType\": string}}.",
        analysis, next_best_time
    )
}

pub fn post_type_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "suggestion": { "type": "STRING" },
            "postType": { "type": "STRING" }
        },
        "required": ["suggestion", "postType"]
    })
}

pub fn library_suggestion(post_type: &str, items: &[LibraryItem]) -> String {
    let listing: Vec<String> = items
        .iter()
        .map(|item| {
            let kind = match item.kind {
                LibraryKind::Image => "image",
                LibraryKind::Text => "text",
            };
            let preview: String = match item.kind {
                LibraryKind::Text => item.data.chars().take(200).collect(),
                LibraryKind::Image => String::new(),
            };
            format!(
                "- id: {} | {} | {} | {}",
                item.id, kind, item.name, preview
            )
        })
        .collect();

    format!(
        "The next post should be a '{}'. From this content library, pick the single item \
         that would make the best starting point and explain why in one sentence:\n{}\n\
         Reply with a JSON object {{\"suggestion\": string, \"itemId\": string}} where \
         itemId is one of the ids above.",
        post_type,
        listing.join("\n")
    )
}

pub fn library_suggestion_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "suggestion": { "type": "STRING" },
            "itemId": { "type": "STRING" }
        },
        "required": ["suggestion", "itemId"]
    })
}

pub fn quick_query(query: &str, today: &str, planned: &[String]) -> String {
    let plan = if planned.is_empty() {
        "nothing planned yet".to_string()
    } else {
        planned.join("\n")
    };
    format!(
        "You are a planning assistant for a LinkedIn creator. Today is {}.\n\
         Planned posts:\n{}\n\n\
         User question: {}\n\n\
         If the user asks what to post (for a day, tomorrow, this week), propose ONE post \
         and reply with {{\"kind\": \"suggestion\", \"date\": \"YYYY-MM-DD\", \
         \"postType\": string, \"topic\": string}}. Otherwise answer briefly with \
         {{\"kind\": \"text\", \"text\": string}}.",
        today, plan, query
    )
}

pub fn quick_query_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "kind": { "type": "STRING", "enum": ["text", "suggestion"] },
            "text": { "type": "STRING" },
            "date": { "type": "STRING" },
            "postType": { "type": "STRING" },
            "topic": { "type": "STRING" }
        },
        "required": ["kind"]
    })
}
