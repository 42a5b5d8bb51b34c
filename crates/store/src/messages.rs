use sqlx::types::Json;
use sqlx::PgExecutor;
use uuid::Uuid;

use acontext_domain::entities::{Message, MessagePart, Role};
use acontext_domain::meta::MetaMap;
use acontext_domain::Result;

use crate::map_sqlx;
use crate::model::{role_as_text, MessageRow};

pub async fn insert_message<'e, E>(
    exec: E,
    session_id: Uuid,
    role: Role,
    parts: Vec<MessagePart>,
    meta: MetaMap,
) -> Result<Message>
where
    E: PgExecutor<'e>,
{
    let row: MessageRow = sqlx::query_as(
        r#"INSERT INTO messages (id, session_id, role, parts, meta, created_at)
           VALUES ($1, $2, $3, $4, $5, now())
           RETURNING id, session_id, role, parts, meta, created_at"#,
    )
    .bind(Uuid::new_v4())
    .bind(session_id)
    .bind(role_as_text(role))
    .bind(Json(parts))
    .bind(Json(meta.0))
    .fetch_one(exec)
    .await
    .map_err(map_sqlx)?;
    Ok(row.into())
}

pub async fn get_message<'e, E>(exec: E, message_id: Uuid) -> Result<Message>
where
    E: PgExecutor<'e>,
{
    let row: MessageRow = sqlx::query_as(
        r#"SELECT id, session_id, role, parts, meta, created_at FROM messages WHERE id = $1"#,
    )
    .bind(message_id)
    .fetch_one(exec)
    .await
    .map_err(map_sqlx)?;
    Ok(row.into())
}

pub async fn patch_message_meta<'e, E>(exec: E, message_id: Uuid, patch: &serde_json::Value) -> Result<()>
where
    E: PgExecutor<'e>,
{
    // Shallow JSONB merge patch computed in Rust, not Postgres, so the
    // `null`-deletes-key rule stays in one place (`MetaMap::patch`).
    let mut current = get_message(exec, message_id).await?.meta;
    current.patch(patch);
    sqlx::query(r#"UPDATE messages SET meta = $2 WHERE id = $1"#)
        .bind(message_id)
        .bind(Json(current.0))
        .execute(exec)
        .await
        .map_err(map_sqlx)?;
    Ok(())
}

pub async fn get_messages<'e, E>(exec: E, message_ids: &[Uuid]) -> Result<Vec<Message>>
where
    E: PgExecutor<'e>,
{
    let rows: Vec<MessageRow> = sqlx::query_as(
        r#"SELECT id, session_id, role, parts, meta, created_at FROM messages
           WHERE id = ANY($1) ORDER BY created_at ASC"#,
    )
    .bind(message_ids)
    .fetch_all(exec)
    .await
    .map_err(map_sqlx)?;
    Ok(rows.into_iter().map(Into::into).collect())
}
