use sqlx::PgExecutor;
use uuid::Uuid;

use acontext_domain::entities::{MessageId, Session};
use acontext_domain::Result;

use crate::map_sqlx;
use crate::model::SessionRow;

pub async fn get_session<'e, E>(exec: E, session_id: Uuid) -> Result<Session>
where
    E: PgExecutor<'e>,
{
    let row: SessionRow = sqlx::query_as(
        r#"SELECT id, project_id, user_id, configs, learning_space_id, last_processed_message_id, created_at
           FROM sessions WHERE id = $1"#,
    )
    .bind(session_id)
    .fetch_one(exec)
    .await
    .map_err(map_sqlx)?;
    Ok(row.into())
}

/// Pending-message accounting for the buffer module (§4.1): count of
/// messages after `last_processed_message_id`, and the id of the most
/// recent one (used for the supersede check).
pub struct PendingState {
    pub pending_count: i64,
    pub latest_pending_message_id: Option<MessageId>,
}

pub async fn pending_state<'e, E>(exec: E, session_id: Uuid) -> Result<PendingState>
where
    E: PgExecutor<'e>,
{
    #[derive(sqlx::FromRow)]
    struct Row {
        pending_count: i64,
        latest_pending_message_id: Option<Uuid>,
    }

    let row: Row = sqlx::query_as(
        r#"
        SELECT
            COUNT(m.id) AS pending_count,
            (ARRAY_AGG(m.id ORDER BY m.created_at DESC))[1] AS latest_pending_message_id
        FROM messages m
        JOIN sessions s ON s.id = m.session_id
        WHERE m.session_id = $1
          AND (s.last_processed_message_id IS NULL OR m.created_at > (
              SELECT created_at FROM messages WHERE id = s.last_processed_message_id
          ))
        "#,
    )
    .bind(session_id)
    .fetch_one(exec)
    .await
    .map_err(map_sqlx)?;

    Ok(PendingState {
        pending_count: row.pending_count,
        latest_pending_message_id: row.latest_pending_message_id,
    })
}

/// Ids of messages not yet folded into a task-agent run, oldest first — the
/// batch handed to the task agent by the buffer's process path.
pub async fn pending_message_ids<'e, E>(exec: E, session_id: Uuid) -> Result<Vec<Uuid>>
where
    E: PgExecutor<'e>,
{
    let rows: Vec<(Uuid,)> = sqlx::query_as(
        r#"
        SELECT m.id
        FROM messages m
        JOIN sessions s ON s.id = m.session_id
        WHERE m.session_id = $1
          AND (s.last_processed_message_id IS NULL OR m.created_at > (
              SELECT created_at FROM messages WHERE id = s.last_processed_message_id
          ))
        ORDER BY m.created_at ASC
        "#,
    )
    .bind(session_id)
    .fetch_all(exec)
    .await
    .map_err(map_sqlx)?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

pub async fn advance_processed_cursor<'e, E>(exec: E, session_id: Uuid, message_id: Uuid) -> Result<()>
where
    E: PgExecutor<'e>,
{
    sqlx::query(r#"UPDATE sessions SET last_processed_message_id = $2 WHERE id = $1"#)
        .bind(session_id)
        .bind(message_id)
        .execute(exec)
        .await
        .map_err(map_sqlx)?;
    Ok(())
}

pub async fn learning_space_for_session<'e, E>(exec: E, session_id: Uuid) -> Result<Option<Uuid>>
where
    E: PgExecutor<'e>,
{
    let row: Option<(Option<Uuid>,)> = sqlx::query_as(r#"SELECT learning_space_id FROM sessions WHERE id = $1"#)
        .bind(session_id)
        .fetch_optional(exec)
        .await
        .map_err(map_sqlx)?;
    Ok(row.and_then(|(v,)| v))
}
