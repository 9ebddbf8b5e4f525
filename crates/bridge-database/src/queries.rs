//! Standalone query functions.
//!
//! Each function takes a `&Connection` as its first parameter so several can
//! run inside one executor call or one transaction.

use crate::{AnnotationMessage, DatabaseError, DatabaseResult, NewAnnotationMessage};
use bridge_core::{ChatId, MessageId, Subscription};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

// ==========================================
// Subscriptions
// ==========================================

/// Insert a subscription. Fails with a constraint violation on a duplicate
/// (group, chat) pair.
pub fn insert_subscription(conn: &Connection, sub: &Subscription) -> DatabaseResult<()> {
    conn.execute(
        "INSERT INTO subscriptions (hyp_token, hyp_group, search_after, chat_id)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            sub.token,
            sub.group,
            sub.watermark.timestamp_micros(),
            sub.chat_id
        ],
    )?;
    debug!(key = %sub.key(), "Inserted subscription");
    Ok(())
}

/// Get the subscription for (chat, group).
pub fn get_subscription(
    conn: &Connection,
    chat_id: ChatId,
    group: &str,
) -> DatabaseResult<Option<Subscription>> {
    let mut stmt = conn.prepare_cached(
        "SELECT hyp_token, hyp_group, search_after, chat_id
         FROM subscriptions WHERE chat_id = ?1 AND hyp_group = ?2",
    )?;

    let raw = stmt
        .query_row(params![chat_id, group], read_subscription_row)
        .optional()?;
    raw.map(decode_subscription).transpose()
}

/// List all subscriptions in insertion order.
pub fn list_subscriptions(conn: &Connection) -> DatabaseResult<Vec<Subscription>> {
    let mut stmt = conn.prepare_cached(
        "SELECT hyp_token, hyp_group, search_after, chat_id
         FROM subscriptions ORDER BY rowid",
    )?;

    let rows = stmt
        .query_map([], read_subscription_row)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(decode_subscription).collect()
}

/// Overwrite token and watermark of the subscription with the same key.
/// Returns the number of rows changed.
pub fn update_subscription(conn: &Connection, sub: &Subscription) -> DatabaseResult<usize> {
    let changed = conn.execute(
        "UPDATE subscriptions SET hyp_token = ?1, search_after = ?2
         WHERE hyp_group = ?3 AND chat_id = ?4",
        params![
            sub.token,
            sub.watermark.timestamp_micros(),
            sub.group,
            sub.chat_id
        ],
    )?;
    Ok(changed)
}

/// Delete the subscription for (chat, group). Returns whether a row was removed.
pub fn delete_subscription(conn: &Connection, chat_id: ChatId, group: &str) -> DatabaseResult<bool> {
    let changed = conn.execute(
        "DELETE FROM subscriptions WHERE chat_id = ?1 AND hyp_group = ?2",
        params![chat_id, group],
    )?;
    Ok(changed > 0)
}

type RawSubscription = (String, String, i64, ChatId);

fn read_subscription_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawSubscription> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn decode_subscription(raw: RawSubscription) -> DatabaseResult<Subscription> {
    let (token, group, micros, chat_id) = raw;
    Ok(Subscription {
        token,
        group,
        chat_id,
        watermark: micros_to_datetime(micros)?,
    })
}

// ==========================================
// Document URIs
// ==========================================

/// Return the id of `uri`, inserting it first if it is new.
pub fn upsert_document_uri(conn: &Connection, uri: &str) -> DatabaseResult<i64> {
    conn.execute(
        "INSERT INTO document_uris (uri) VALUES (?1) ON CONFLICT(uri) DO NOTHING",
        params![uri],
    )?;
    let id = conn.query_row(
        "SELECT id FROM document_uris WHERE uri = ?1",
        params![uri],
        |row| row.get(0),
    )?;
    Ok(id)
}

// ==========================================
// Annotation messages
// ==========================================

/// Insert a mapping, URI row included. Both writes happen in one transaction,
/// so a constraint violation leaves the database untouched.
pub fn insert_annotation_message(
    conn: &Connection,
    new: &NewAnnotationMessage<'_>,
) -> DatabaseResult<()> {
    let refs = serde_json::to_string(&new.metadata.references)?;

    let tx = conn.unchecked_transaction()?;
    let uri_id = upsert_document_uri(&tx, &new.metadata.document_uri)?;
    tx.execute(
        "INSERT INTO annotation_messages (annotation_id, refs, hyp_group, uri_id, chat_id, message_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            new.annotation_id,
            refs,
            new.metadata.group,
            uri_id,
            new.chat_id,
            new.message_id
        ],
    )?;
    tx.commit()?;

    debug!(
        annotation_id = new.annotation_id,
        chat_id = new.chat_id,
        message_id = new.message_id,
        "Inserted annotation mapping"
    );
    Ok(())
}

/// Message id mapped to `annotation_id` in `chat_id`.
pub fn get_message_id(
    conn: &Connection,
    annotation_id: &str,
    chat_id: ChatId,
) -> DatabaseResult<Option<MessageId>> {
    let mut stmt = conn.prepare_cached(
        "SELECT message_id FROM annotation_messages WHERE annotation_id = ?1 AND chat_id = ?2",
    )?;
    let id = stmt
        .query_row(params![annotation_id, chat_id], |row| row.get(0))
        .optional()?;
    Ok(id)
}

/// Mapping for (chat, message), with its document URI resolved.
pub fn get_annotation_message(
    conn: &Connection,
    chat_id: ChatId,
    message_id: MessageId,
) -> DatabaseResult<Option<AnnotationMessage>> {
    let mut stmt = conn.prepare_cached(
        "SELECT m.annotation_id, m.refs, m.hyp_group, u.uri, m.chat_id, m.message_id
         FROM annotation_messages m
         JOIN document_uris u ON u.id = m.uri_id
         WHERE m.chat_id = ?1 AND m.message_id = ?2",
    )?;

    let raw = stmt
        .query_row(params![chat_id, message_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, ChatId>(4)?,
                row.get::<_, MessageId>(5)?,
            ))
        })
        .optional()?;

    let Some((annotation_id, refs, group, document_uri, chat_id, message_id)) = raw
    else {
        return Ok(None);
    };

    let references: Vec<String> = serde_json::from_str(&refs).map_err(|e| {
        DatabaseError::InvalidData(format!("refs of {}: {}", annotation_id, e))
    })?;

    Ok(Some(AnnotationMessage {
        annotation_id,
        references,
        group,
        document_uri,
        chat_id,
        message_id,
    }))
}

// ==========================================
// Helpers
// ==========================================

fn micros_to_datetime(micros: i64) -> DatabaseResult<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros)
        .ok_or_else(|| DatabaseError::InvalidData(format!("watermark out of range: {}", micros)))
}
