use msgraph_lite::types::ChatMessage;

/// Shorten to at most `max_chars` characters, ending in `…` when cut
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().nth(max_chars).is_none() {
        return s.to_string();
    }
    let cut = s
        .char_indices()
        .nth(max_chars.saturating_sub(1))
        .map_or(s.len(), |(i, _)| i);
    format!("{}…", &s[..cut])
}

/// Tags that end a line or block in Teams and Outlook HTML
const BREAKING_TAGS: [&str; 6] = ["p", "div", "br", "li", "tr", "hr"];

/// `&amp;` last so that `&amp;lt;` stays `&lt;`
const ENTITIES: [(&str, &str); 6] = [
    ("&nbsp;", " "),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&amp;", "&"),
];

/// Message HTML as one line of plain text
pub fn strip_html(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(open) = rest.find('<') {
        text.push_str(&rest[..open]);
        let tag = &rest[open + 1..];
        let name: String = tag
            .trim_start_matches('/')
            .chars()
            .take_while(char::is_ascii_alphanumeric)
            .collect::<String>()
            .to_ascii_lowercase();
        if BREAKING_TAGS.contains(&name.as_str()) {
            text.push(' ');
        }
        rest = match tag.find('>') {
            Some(close) => &tag[close + 1..],
            None => "",
        };
    }
    text.push_str(rest);

    let decoded = ENTITIES
        .iter()
        .fold(text, |acc, (entity, plain)| acc.replace(entity, plain));
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `2024-05-01T09:30:00.0000000Z` -> `05-01 09:30`
pub fn short_time(dt: &str) -> String {
    match (dt.get(5..10), dt.get(11..16)) {
        (Some(day), Some(time)) => format!("{} {}", day, time),
        _ => dt.to_string(),
    }
}

/// Sender, time and plain-text content of a chat or channel message
pub fn message_columns(message: &ChatMessage) -> (String, String, String) {
    let from = message
        .from
        .as_ref()
        .and_then(|from| from.display_name())
        .unwrap_or("system")
        .to_string();
    let time = message
        .created_date_time
        .as_deref()
        .map(short_time)
        .unwrap_or_default();
    let content = message
        .body
        .as_ref()
        .and_then(|body| body.content.as_deref())
        .map(strip_html)
        .unwrap_or_default();
    (from, time, truncate(&content, 60))
}
