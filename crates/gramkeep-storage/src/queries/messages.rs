// SPDX-FileCopyrightText: 2026 Gramkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Archived message operations.
//!
//! Inserts are idempotent: the (`channel_id`, `message_id`) primary key
//! plus `INSERT OR IGNORE` make re-archiving a range a no-op.

use gramkeep_core::GramkeepError;
use regex::RegexBuilder;
use rusqlite::{params, Row};

use crate::database::Database;
use crate::models::{MessageStats, NewMessage, StoredMessage};

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<StoredMessage> {
    Ok(StoredMessage {
        channel_id: row.get(0)?,
        message_id: row.get(1)?,
        date: row.get(2)?,
        from_id: row.get(3)?,
        text: row.get(4)?,
        raw_json: row.get(5)?,
        created_at: row.get(6)?,
    })
}

/// Insert a chunk of messages in one transaction.
///
/// Conflicting rows are silently ignored. Returns how many rows were
/// actually inserted.
pub async fn insert_messages(
    db: &Database,
    records: &[NewMessage],
) -> Result<usize, GramkeepError> {
    if records.is_empty() {
        return Ok(0);
    }
    let records = records.to_vec();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let mut inserted = 0;
            {
                let mut stmt = tx.prepare(
                    "INSERT OR IGNORE INTO messages
                         (channel_id, message_id, date, from_id, text, raw_json)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )?;
                for record in &records {
                    inserted += stmt.execute(params![
                        record.channel_id,
                        record.message_id,
                        record.date,
                        record.from_id,
                        record.text,
                        record.raw_json,
                    ])?;
                }
            }
            tx.commit()?;
            Ok(inserted)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// How many messages are archived for a channel.
pub async fn count_messages(db: &Database, channel_id: &str) -> Result<i64, GramkeepError> {
    let channel_id = channel_id.to_string();
    db.connection()
        .call(move |conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM messages WHERE channel_id = ?1",
                params![channel_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Aggregate statistics over one channel's archive.
pub async fn message_stats(db: &Database, channel_id: &str) -> Result<MessageStats, GramkeepError> {
    let channel_id = channel_id.to_string();
    db.connection()
        .call(move |conn| {
            let stats = conn.query_row(
                "SELECT COUNT(*), MIN(message_id), MAX(message_id), MIN(date), MAX(date)
                 FROM messages WHERE channel_id = ?1",
                params![channel_id],
                |row| {
                    Ok(MessageStats {
                        total: row.get(0)?,
                        min_id: row.get(1)?,
                        max_id: row.get(2)?,
                        min_date: row.get(3)?,
                        max_date: row.get(4)?,
                    })
                },
            )?;
            Ok(stats)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Linear pattern scan over a channel's archived texts, newest first.
///
/// The pattern is a Rust `regex` expression (no backreferences or
/// lookaround; PCRE-style character classes are supported). Invalid
/// patterns fail with `InvalidPattern`.
pub async fn search_messages(
    db: &Database,
    channel_id: &str,
    pattern: &str,
    limit: usize,
    case_insensitive: bool,
) -> Result<Vec<StoredMessage>, GramkeepError> {
    let re = RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .build()
        .map_err(|e| GramkeepError::InvalidPattern(e.to_string()))?;

    let channel_id = channel_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT channel_id, message_id, date, from_id, text, raw_json, created_at
                 FROM messages WHERE channel_id = ?1
                 ORDER BY message_id DESC",
            )?;
            let rows = stmt.query_map(params![channel_id], message_from_row)?;
            let mut matches = Vec::new();
            for row in rows {
                let msg = row?;
                if msg.text.as_deref().is_some_and(|t| re.is_match(t)) {
                    matches.push(msg);
                    if matches.len() >= limit {
                        break;
                    }
                }
            }
            Ok(matches)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("test.db")).await.unwrap();
        (db, dir)
    }

    fn make_msg(channel_id: &str, id: i64, text: &str) -> NewMessage {
        NewMessage {
            channel_id: channel_id.to_string(),
            message_id: id,
            date: Some(1_700_000_000 + id),
            from_id: Some("42".to_string()),
            text: Some(text.to_string()),
            raw_json: format!(r#"{{"id":{id}}}"#),
        }
    }

    #[tokio::test]
    async fn insert_is_idempotent() {
        let (db, _dir) = setup_db().await;
        let batch = vec![make_msg("-1001", 1, "hello"), make_msg("-1001", 2, "world")];

        let first = insert_messages(&db, &batch).await.unwrap();
        assert_eq!(first, 2);

        // Re-inserting the same rows (even with different text) changes nothing.
        let mut again = batch.clone();
        again[0].text = Some("mutated".to_string());
        let second = insert_messages(&db, &again).await.unwrap();
        assert_eq!(second, 0);
        assert_eq!(count_messages(&db, "-1001").await.unwrap(), 2);

        let found = search_messages(&db, "-1001", "hello", 10, false).await.unwrap();
        assert_eq!(found.len(), 1, "original text survives the re-insert");
        assert_eq!(found[0].raw_json, r#"{"id":1}"#);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn count_is_per_channel() {
        let (db, _dir) = setup_db().await;
        insert_messages(&db, &[make_msg("-1001", 1, "a"), make_msg("-1002", 1, "b")])
            .await
            .unwrap();
        assert_eq!(count_messages(&db, "-1001").await.unwrap(), 1);
        assert_eq!(count_messages(&db, "-1003").await.unwrap(), 0);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn stats_report_id_and_date_ranges() {
        let (db, _dir) = setup_db().await;
        let batch: Vec<NewMessage> = (10..=20).map(|i| make_msg("-1001", i, "m")).collect();
        insert_messages(&db, &batch).await.unwrap();

        let stats = message_stats(&db, "-1001").await.unwrap();
        assert_eq!(stats.total, 11);
        assert_eq!(stats.min_id, Some(10));
        assert_eq!(stats.max_id, Some(20));
        assert_eq!(stats.min_date, Some(1_700_000_010));
        assert_eq!(stats.max_date, Some(1_700_000_020));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn stats_on_empty_channel_are_all_none() {
        let (db, _dir) = setup_db().await;
        let stats = message_stats(&db, "-1001").await.unwrap();
        assert_eq!(stats.total, 0);
        assert_eq!(stats.min_id, None);
        assert_eq!(stats.max_date, None);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn search_applies_regex_with_case_flag() {
        let (db, _dir) = setup_db().await;
        insert_messages(
            &db,
            &[
                make_msg("-1001", 1, "Release v1.2 is out"),
                make_msg("-1001", 2, "no version here"),
                make_msg("-1001", 3, "RELEASE notes"),
            ],
        )
        .await
        .unwrap();

        let exact = search_messages(&db, "-1001", r"v\d+\.\d+", 10, false).await.unwrap();
        assert_eq!(exact.len(), 1);
        assert_eq!(exact[0].message_id, 1);

        let ci = search_messages(&db, "-1001", "release", 10, true).await.unwrap();
        assert_eq!(ci.len(), 2);
        assert_eq!(ci[0].message_id, 3, "newest first");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn search_rejects_invalid_pattern() {
        let (db, _dir) = setup_db().await;
        let result = search_messages(&db, "-1001", "(", 10, false).await;
        assert!(matches!(result, Err(GramkeepError::InvalidPattern(_))));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn search_honors_limit() {
        let (db, _dir) = setup_db().await;
        let batch: Vec<NewMessage> = (1..=10).map(|i| make_msg("-1001", i, "match me")).collect();
        insert_messages(&db, &batch).await.unwrap();

        let found = search_messages(&db, "-1001", "match", 3, false).await.unwrap();
        assert_eq!(found.len(), 3);
        db.close().await.unwrap();
    }
}
