use sqlx::types::Json;
use sqlx::{PgConnection, PgExecutor};
use uuid::Uuid;

use acontext_domain::entities::{Task, TaskData, TaskStatus};
use acontext_domain::Result;

use crate::map_sqlx;
use crate::model::TaskRow;

/// Non-planning tasks for a session, in plan order (§3: "planning task is
/// excluded from agent task-context queries").
pub async fn list_tasks<'e, E>(exec: E, session_id: Uuid) -> Result<Vec<Task>>
where
    E: PgExecutor<'e>,
{
    let rows: Vec<TaskRow> = sqlx::query_as(
        r#"SELECT id, session_id, "order" AS order_idx, status, data, is_planning, created_at, updated_at
           FROM tasks WHERE session_id = $1 AND is_planning = false ORDER BY "order" ASC"#,
    )
    .bind(session_id)
    .fetch_all(exec)
    .await
    .map_err(map_sqlx)?;
    rows.into_iter().map(Task::try_from).collect()
}

pub async fn get_task_by_order<'e, E>(exec: E, session_id: Uuid, order: i32) -> Result<Task>
where
    E: PgExecutor<'e>,
{
    let row: TaskRow = sqlx::query_as(
        r#"SELECT id, session_id, "order" AS order_idx, status, data, is_planning, created_at, updated_at
           FROM tasks WHERE session_id = $1 AND "order" = $2"#,
    )
    .bind(session_id)
    .bind(order)
    .fetch_one(exec)
    .await
    .map_err(map_sqlx)?;
    Task::try_from(row)
}

pub async fn get_task<'e, E>(exec: E, task_id: Uuid) -> Result<Task>
where
    E: PgExecutor<'e>,
{
    let row: TaskRow = sqlx::query_as(
        r#"SELECT id, session_id, "order" AS order_idx, status, data, is_planning, created_at, updated_at
           FROM tasks WHERE id = $1"#,
    )
    .bind(task_id)
    .fetch_one(exec)
    .await
    .map_err(map_sqlx)?;
    Task::try_from(row)
}

/// `insert_task(description, order_after?)` — appends when `order_after` is
/// `None`, otherwise inserts immediately after it by shifting subsequent
/// orders up by one. The row lock taken by the shift (§4.2.3: "row-level
/// locks taken by insert_task") is held for the rest of the transaction.
pub async fn insert_task(
    conn: &mut PgConnection,
    session_id: Uuid,
    description: &str,
    order_after: Option<i32>,
) -> Result<Task> {
    let next_order = match order_after {
        Some(after) => {
            sqlx::query(
                r#"UPDATE tasks SET "order" = "order" + 1
                   WHERE session_id = $1 AND is_planning = false AND "order" > $2"#,
            )
            .bind(session_id)
            .bind(after)
            .execute(&mut *conn)
            .await
            .map_err(map_sqlx)?;
            after + 1
        }
        None => {
            let (max,): (Option<i32>,) = sqlx::query_as(
                r#"SELECT MAX("order") FROM tasks WHERE session_id = $1 AND is_planning = false
                   FOR UPDATE"#,
            )
            .bind(session_id)
            .fetch_one(&mut *conn)
            .await
            .map_err(map_sqlx)?;
            max.map(|m| m + 1).unwrap_or(1)
        }
    };

    let data = TaskData {
        description: description.to_string(),
        progresses: Vec::new(),
        user_preferences: Vec::new(),
    };

    let row: TaskRow = sqlx::query_as(
        r#"INSERT INTO tasks (id, session_id, "order", status, data, is_planning, created_at, updated_at)
           VALUES ($1, $2, $3, 'pending', $4, false, now(), now())
           RETURNING id, session_id, "order" AS order_idx, status, data, is_planning, created_at, updated_at"#,
    )
    .bind(Uuid::new_v4())
    .bind(session_id)
    .bind(next_order)
    .bind(Json(data))
    .fetch_one(&mut *conn)
    .await
    .map_err(map_sqlx)?;
    Task::try_from(row)
}

/// `update_task(order, description?, status?)`. Status transitions keep
/// `progresses`/`user_preferences` untouched — Open Question #3 (§9) is
/// decided in favor of preserving residual progress data even across a
/// failed→running re-entry, since the source keeps it and nothing in the
/// spec calls for clearing it.
pub async fn update_task(
    conn: &mut PgConnection,
    session_id: Uuid,
    order: i32,
    description: Option<&str>,
    status: Option<TaskStatus>,
) -> Result<Task> {
    let mut task = get_task_by_order(&mut *conn, session_id, order).await?;
    if let Some(d) = description {
        task.data.description = d.to_string();
    }
    if let Some(s) = status {
        task.status = s;
    }

    let row: TaskRow = sqlx::query_as(
        r#"UPDATE tasks SET status = $3, data = $4, updated_at = now()
           WHERE session_id = $1 AND "order" = $2
           RETURNING id, session_id, "order" AS order_idx, status, data, is_planning, created_at, updated_at"#,
    )
    .bind(session_id)
    .bind(order)
    .bind(crate::model::status_as_text(task.status))
    .bind(Json(task.data))
    .fetch_one(&mut *conn)
    .await
    .map_err(map_sqlx)?;
    Task::try_from(row)
}

/// `append_task_progress(order, progress)`. Rejects on a terminal status
/// (§4.2.2).
pub async fn append_task_progress(
    conn: &mut PgConnection,
    session_id: Uuid,
    order: i32,
    progress: &str,
) -> Result<Task> {
    let mut task = get_task_by_order(&mut *conn, session_id, order).await?;
    if task.status.is_terminal() {
        return Err(acontext_domain::Error::ToolReject(format!(
            "task #{order} is already {:?}; cannot append progress",
            task.status
        )));
    }
    task.data.progresses.push(progress.to_string());

    let row: TaskRow = sqlx::query_as(
        r#"UPDATE tasks SET data = $3, updated_at = now()
           WHERE session_id = $1 AND "order" = $2
           RETURNING id, session_id, "order" AS order_idx, status, data, is_planning, created_at, updated_at"#,
    )
    .bind(session_id)
    .bind(order)
    .bind(Json(task.data))
    .fetch_one(&mut *conn)
    .await
    .map_err(map_sqlx)?;
    Task::try_from(row)
}

/// `set_task_user_preference(order, pref)` — replaces the list wholesale,
/// with no status guard (§4.2.2 table: "no status restriction").
pub async fn set_task_user_preference(
    conn: &mut PgConnection,
    session_id: Uuid,
    order: i32,
    pref: &str,
) -> Result<Task> {
    let mut task = get_task_by_order(&mut *conn, session_id, order).await?;
    task.data.user_preferences = vec![pref.to_string()];

    let row: TaskRow = sqlx::query_as(
        r#"UPDATE tasks SET data = $3, updated_at = now()
           WHERE session_id = $1 AND "order" = $2
           RETURNING id, session_id, "order" AS order_idx, status, data, is_planning, created_at, updated_at"#,
    )
    .bind(session_id)
    .bind(order)
    .bind(Json(task.data))
    .fetch_one(&mut *conn)
    .await
    .map_err(map_sqlx)?;
    Task::try_from(row)
}

/// `append_messages_to_task(order, message_ids)` — links messages and
/// auto-transitions `pending -> running`; rejects on a terminal status.
pub async fn append_messages_to_task(
    conn: &mut PgConnection,
    session_id: Uuid,
    order: i32,
    message_ids: &[Uuid],
) -> Result<Task> {
    let task = get_task_by_order(&mut *conn, session_id, order).await?;
    if task.status.is_terminal() {
        return Err(acontext_domain::Error::ToolReject(format!(
            "task #{order} is already {:?}; cannot link more messages",
            task.status
        )));
    }

    for message_id in message_ids {
        sqlx::query(
            r#"INSERT INTO task_messages (task_id, message_id) VALUES ($1, $2)
               ON CONFLICT (task_id, message_id) DO NOTHING"#,
        )
        .bind(task.id)
        .bind(message_id)
        .execute(&mut *conn)
        .await
        .map_err(map_sqlx)?;
    }

    let new_status = if task.status == TaskStatus::Pending {
        TaskStatus::Running
    } else {
        task.status
    };

    let row: TaskRow = sqlx::query_as(
        r#"UPDATE tasks SET status = $3, updated_at = now()
           WHERE session_id = $1 AND "order" = $2
           RETURNING id, session_id, "order" AS order_idx, status, data, is_planning, created_at, updated_at"#,
    )
    .bind(session_id)
    .bind(order)
    .bind(crate::model::status_as_text(new_status))
    .fetch_one(&mut *conn)
    .await
    .map_err(map_sqlx)?;
    Task::try_from(row)
}

pub async fn task_message_ids<'e, E>(exec: E, task_id: Uuid) -> Result<Vec<Uuid>>
where
    E: PgExecutor<'e>,
{
    let rows: Vec<(Uuid,)> = sqlx::query_as(
        r#"SELECT message_id FROM task_messages WHERE task_id = $1 ORDER BY message_id"#,
    )
    .bind(task_id)
    .fetch_all(exec)
    .await
    .map_err(map_sqlx)?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Finds the session's planning task (order 0, `is_planning=true`),
/// creating it if absent (§4.3).
pub async fn find_or_create_planning_task(conn: &mut PgConnection, session_id: Uuid) -> Result<Task> {
    let existing: Option<TaskRow> = sqlx::query_as(
        r#"SELECT id, session_id, "order" AS order_idx, status, data, is_planning, created_at, updated_at
           FROM tasks WHERE session_id = $1 AND is_planning = true"#,
    )
    .bind(session_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(map_sqlx)?;

    if let Some(row) = existing {
        return Task::try_from(row);
    }

    let data = TaskData::default();
    let row: TaskRow = sqlx::query_as(
        r#"INSERT INTO tasks (id, session_id, "order", status, data, is_planning, created_at, updated_at)
           VALUES ($1, $2, 0, 'running', $3, true, now(), now())
           ON CONFLICT (session_id) WHERE is_planning DO NOTHING
           RETURNING id, session_id, "order" AS order_idx, status, data, is_planning, created_at, updated_at"#,
    )
    .bind(Uuid::new_v4())
    .bind(session_id)
    .bind(Json(data))
    .fetch_optional(&mut *conn)
    .await
    .map_err(map_sqlx)?;

    match row {
        Some(row) => Task::try_from(row),
        // Lost the create race to a concurrent caller; re-read.
        None => {
            let row: TaskRow = sqlx::query_as(
                r#"SELECT id, session_id, "order" AS order_idx, status, data, is_planning, created_at, updated_at
                   FROM tasks WHERE session_id = $1 AND is_planning = true"#,
            )
            .bind(session_id)
            .fetch_one(&mut *conn)
            .await
            .map_err(map_sqlx)?;
            Task::try_from(row)
        }
    }
}

pub async fn append_messages_to_planning_section(
    conn: &mut PgConnection,
    session_id: Uuid,
    message_ids: &[Uuid],
) -> Result<Task> {
    let task = find_or_create_planning_task(&mut *conn, session_id).await?;
    for message_id in message_ids {
        sqlx::query(
            r#"INSERT INTO task_messages (task_id, message_id) VALUES ($1, $2)
               ON CONFLICT (task_id, message_id) DO NOTHING"#,
        )
        .bind(task.id)
        .bind(message_id)
        .execute(&mut *conn)
        .await
        .map_err(map_sqlx)?;
    }
    Ok(task)
}

pub async fn append_planning_user_preference(
    conn: &mut PgConnection,
    session_id: Uuid,
    pref: &str,
) -> Result<()> {
    let mut task = find_or_create_planning_task(&mut *conn, session_id).await?;
    task.data.user_preferences.push(pref.to_string());
    sqlx::query(r#"UPDATE tasks SET data = $2, updated_at = now() WHERE id = $1"#)
        .bind(task.id)
        .bind(Json(task.data))
        .execute(&mut *conn)
        .await
        .map_err(map_sqlx)?;
    Ok(())
}
