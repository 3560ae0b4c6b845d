use std::fs;
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use log::{info, warn};

use super::export::{RawExport, RawMessage};
use super::message::{ChatExport, Message, MessageKind, Reaction};

pub fn load_export(path: &Path) -> Result<ChatExport> {
    let started = Instant::now();
    let raw_json = fs::read_to_string(path)
        .with_context(|| format!("failed to read export file {}", path.display()))?;

    let raw: RawExport = serde_json::from_str(&raw_json)
        .with_context(|| format!("invalid export JSON in {}", path.display()))?;

    let mut messages = Vec::with_capacity(raw.messages.len());
    let mut skipped = 0usize;
    for raw_message in raw.messages {
        match normalize_message(raw_message) {
            Some(message) => messages.push(message),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        warn!("skipped {skipped} export records without a usable id");
    }

    let name = raw
        .name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| "Unnamed chat".to_string());

    info!(
        "loaded {} messages from {} in {:.1?}",
        messages.len(),
        path.display(),
        started.elapsed()
    );

    Ok(ChatExport { name, messages })
}

fn normalize_message(raw: RawMessage) -> Option<Message> {
    let id = raw.id?;

    let kind = match raw.kind.as_deref() {
        Some("message") => MessageKind::Regular,
        _ => MessageKind::Service,
    };

    let date = parse_date(raw.date_unixtime.as_deref(), raw.date.as_deref()).unwrap_or_else(|| {
        warn!("message {id} has no parseable timestamp, using epoch zero");
        DateTime::UNIX_EPOCH
    });

    let reactions = raw
        .reactions
        .into_iter()
        .map(|reaction| Reaction {
            emoji: reaction.emoji.unwrap_or_else(|| "❓".to_string()),
            count: reaction.count,
        })
        .collect();

    let has_media = raw.photo.is_some() || raw.file.is_some() || raw.media_type.is_some();

    Some(Message {
        id,
        kind,
        date,
        from: raw.from,
        reply_to: raw.reply_to_message_id,
        text: raw.text.flatten(),
        reactions,
        has_media,
    })
}

/// Exports carry both a unix epoch string and a local ISO timestamp.
/// The epoch field is authoritative when present.
fn parse_date(unixtime: Option<&str>, iso: Option<&str>) -> Option<DateTime<Utc>> {
    if let Some(raw) = unixtime
        && let Ok(seconds) = raw.trim().parse::<i64>()
        && let Some(parsed) = DateTime::from_timestamp(seconds, 0)
    {
        return Some(parsed);
    }

    let iso = iso?;
    let naive = NaiveDateTime::parse_from_str(iso, "%Y-%m-%dT%H:%M:%S").ok()?;
    Some(naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "name": "Test Channel",
        "type": "public_channel",
        "id": 123,
        "messages": [
            {
                "id": 1,
                "type": "message",
                "date": "2023-06-01T10:00:00",
                "date_unixtime": "1685613600",
                "from": "alice",
                "text": "hello"
            },
            {
                "id": 2,
                "type": "message",
                "date": "2023-06-01T10:05:00",
                "date_unixtime": "1685613900",
                "from": "bob",
                "reply_to_message_id": 1,
                "text": ["reply with ", {"type": "bold", "text": "emphasis"}],
                "reactions": [{"type": "emoji", "emoji": "👍", "count": 2}],
                "photo": "photos/photo_1.jpg"
            },
            {
                "id": 3,
                "type": "service",
                "date": "2023-06-01T10:06:00",
                "date_unixtime": "1685613960",
                "text": ""
            }
        ]
    }"#;

    #[test]
    fn loads_and_normalizes_a_sample_export() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let export = load_export(file.path()).unwrap();
        assert_eq!(export.name, "Test Channel");
        assert_eq!(export.message_count(), 3);

        let reply = &export.messages[1];
        assert_eq!(reply.id, 2);
        assert_eq!(reply.kind, MessageKind::Regular);
        assert_eq!(reply.reply_to, Some(1));
        assert_eq!(reply.text, "reply with emphasis");
        assert_eq!(reply.reaction_total(), 2);
        assert!(reply.has_media);

        let service = &export.messages[2];
        assert_eq!(service.kind, MessageKind::Service);
        assert!(!service.has_media);
    }

    #[test]
    fn records_without_an_id_are_skipped() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"name": "x", "messages": [{"type": "message"}, {"id": 4, "type": "message"}]}"#)
            .unwrap();

        let export = load_export(file.path()).unwrap();
        assert_eq!(export.message_count(), 1);
        assert_eq!(export.messages[0].id, 4);
    }

    #[test]
    fn missing_file_reports_the_path() {
        let error = load_export(Path::new("/nonexistent/result.json")).unwrap_err();
        assert!(error.to_string().contains("/nonexistent/result.json"));
    }

    #[test]
    fn iso_date_is_used_when_unixtime_is_absent() {
        let parsed = parse_date(None, Some("2023-06-01T10:00:00")).unwrap();
        assert_eq!(parsed.timestamp(), 1_685_613_600);
    }
}
