use sqlx::types::Json;
use sqlx::PgExecutor;
use uuid::Uuid;

use acontext_domain::entities::{LearnStatus, LearningSpace};
use acontext_domain::meta::MetaMap;
use acontext_domain::Result;

use crate::map_sqlx;
use crate::model::{learn_status_as_text, LearningSpaceRow};

pub async fn create_learning_space<'e, E>(
    exec: E,
    project_id: Uuid,
    user_id: Option<Uuid>,
    meta: MetaMap,
) -> Result<LearningSpace>
where
    E: PgExecutor<'e>,
{
    let row: LearningSpaceRow = sqlx::query_as(
        r#"INSERT INTO learning_spaces (id, project_id, user_id, meta, created_at)
           VALUES ($1, $2, $3, $4, now())
           RETURNING id, project_id, user_id, meta, created_at"#,
    )
    .bind(Uuid::new_v4())
    .bind(project_id)
    .bind(user_id)
    .bind(Json(meta.0))
    .fetch_one(exec)
    .await
    .map_err(map_sqlx)?;
    Ok(row.into())
}

pub async fn delete_learning_space<'e, E>(exec: E, learning_space_id: Uuid) -> Result<()>
where
    E: PgExecutor<'e>,
{
    sqlx::query(r#"DELETE FROM learning_spaces WHERE id = $1"#)
        .bind(learning_space_id)
        .execute(exec)
        .await
        .map_err(map_sqlx)?;
    Ok(())
}

pub async fn link_skill_to_space<'e, E>(exec: E, learning_space_id: Uuid, skill_id: Uuid) -> Result<()>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        r#"INSERT INTO learning_space_skills (learning_space_id, skill_id)
           VALUES ($1, $2) ON CONFLICT (learning_space_id, skill_id) DO NOTHING"#,
    )
    .bind(learning_space_id)
    .bind(skill_id)
    .execute(exec)
    .await
    .map_err(map_sqlx)?;
    Ok(())
}

pub async fn unlink_skill_from_space<'e, E>(exec: E, learning_space_id: Uuid, skill_id: Uuid) -> Result<()>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        r#"DELETE FROM learning_space_skills WHERE learning_space_id = $1 AND skill_id = $2"#,
    )
    .bind(learning_space_id)
    .bind(skill_id)
    .execute(exec)
    .await
    .map_err(map_sqlx)?;
    Ok(())
}

/// `(name, description)` of every skill in the space, as packed into the
/// skill-agent's per-iteration user input (§4.5.2).
pub async fn skills_in_space<'e, E>(exec: E, learning_space_id: Uuid) -> Result<Vec<(Uuid, String, String)>>
where
    E: PgExecutor<'e>,
{
    let rows: Vec<(Uuid, String, String)> = sqlx::query_as(
        r#"SELECT s.id, s.name, s.description
           FROM skills s
           JOIN learning_space_skills ls ON ls.skill_id = s.id
           WHERE ls.learning_space_id = $1
           ORDER BY s.name"#,
    )
    .bind(learning_space_id)
    .fetch_all(exec)
    .await
    .map_err(map_sqlx)?;
    Ok(rows)
}

/// Creates (or leaves alone, on conflict) the session's link to a Learning
/// Space (§3: "unique on session").
pub async fn link_session_to_space<'e, E>(exec: E, learning_space_id: Uuid, session_id: Uuid) -> Result<()>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        r#"INSERT INTO learning_space_sessions (learning_space_id, session_id, status)
           VALUES ($1, $2, 'pending')
           ON CONFLICT (session_id) DO NOTHING"#,
    )
    .bind(learning_space_id)
    .bind(session_id)
    .execute(exec)
    .await
    .map_err(map_sqlx)?;
    Ok(())
}

pub async fn set_learn_status<'e, E>(exec: E, session_id: Uuid, status: LearnStatus) -> Result<()>
where
    E: PgExecutor<'e>,
{
    sqlx::query(r#"UPDATE learning_space_sessions SET status = $2 WHERE session_id = $1"#)
        .bind(session_id)
        .bind(learn_status_as_text(status))
        .execute(exec)
        .await
        .map_err(map_sqlx)?;
    Ok(())
}
