use sqlx::types::Json;
use sqlx::{PgConnection, PgExecutor};
use uuid::Uuid;

use acontext_domain::entities::{Artifact, AssetMeta, Disk, Skill};
use acontext_domain::meta::MetaMap;
use acontext_domain::Result;

use crate::map_sqlx;
use crate::model::{ArtifactRow, DiskRow, SkillRow};

pub async fn create_disk<'e, E>(exec: E, project_id: Uuid, user_id: Option<Uuid>) -> Result<Disk>
where
    E: PgExecutor<'e>,
{
    let row: DiskRow = sqlx::query_as(
        r#"INSERT INTO disks (id, project_id, user_id, created_at)
           VALUES ($1, $2, $3, now())
           RETURNING id, project_id, user_id, created_at"#,
    )
    .bind(Uuid::new_v4())
    .bind(project_id)
    .bind(user_id)
    .fetch_one(exec)
    .await
    .map_err(map_sqlx)?;
    Ok(row.into())
}

pub async fn create_skill(
    conn: &mut PgConnection,
    project_id: Uuid,
    user_id: Option<Uuid>,
    name: &str,
    description: &str,
) -> Result<Skill> {
    let disk = create_disk(&mut *conn, project_id, user_id).await?;
    let row: SkillRow = sqlx::query_as(
        r#"INSERT INTO skills (id, project_id, user_id, name, description, disk_id, meta, created_at, updated_at)
           VALUES ($1, $2, $3, $4, $5, $6, $7, now(), now())
           RETURNING id, project_id, user_id, name, description, disk_id, meta, created_at, updated_at"#,
    )
    .bind(Uuid::new_v4())
    .bind(project_id)
    .bind(user_id)
    .bind(name)
    .bind(description)
    .bind(disk.id)
    .bind(Json(MetaMap::new().0))
    .fetch_one(&mut *conn)
    .await
    .map_err(map_sqlx)?;
    Ok(row.into())
}

pub async fn get_skill_by_name<'e, E>(exec: E, project_id: Uuid, name: &str) -> Result<Skill>
where
    E: PgExecutor<'e>,
{
    let row: SkillRow = sqlx::query_as(
        r#"SELECT id, project_id, user_id, name, description, disk_id, meta, created_at, updated_at
           FROM skills WHERE project_id = $1 AND name = $2"#,
    )
    .bind(project_id)
    .bind(name)
    .fetch_one(exec)
    .await
    .map_err(map_sqlx)?;
    Ok(row.into())
}

pub async fn update_skill_description<'e, E>(exec: E, skill_id: Uuid, description: &str) -> Result<()>
where
    E: PgExecutor<'e>,
{
    sqlx::query(r#"UPDATE skills SET description = $2, updated_at = now() WHERE id = $1"#)
        .bind(skill_id)
        .bind(description)
        .execute(exec)
        .await
        .map_err(map_sqlx)?;
    Ok(())
}

pub async fn delete_skill<'e, E>(exec: E, skill_id: Uuid) -> Result<()>
where
    E: PgExecutor<'e>,
{
    // Cascades to disks/artifacts via FK ON DELETE CASCADE (§3: "deleted
    // cascades disk->artifacts").
    sqlx::query(r#"DELETE FROM skills WHERE id = $1"#)
        .bind(skill_id)
        .execute(exec)
        .await
        .map_err(map_sqlx)?;
    Ok(())
}

pub async fn list_artifacts<'e, E>(exec: E, disk_id: Uuid) -> Result<Vec<Artifact>>
where
    E: PgExecutor<'e>,
{
    let rows: Vec<ArtifactRow> = sqlx::query_as(
        r#"SELECT id, disk_id, path, filename, asset_meta, meta, created_at, updated_at
           FROM artifacts WHERE disk_id = $1 ORDER BY path, filename"#,
    )
    .bind(disk_id)
    .fetch_all(exec)
    .await
    .map_err(map_sqlx)?;
    Ok(rows.into_iter().map(Into::into).collect())
}

pub async fn get_artifact<'e, E>(exec: E, disk_id: Uuid, path: &str, filename: &str) -> Result<Artifact>
where
    E: PgExecutor<'e>,
{
    let row: ArtifactRow = sqlx::query_as(
        r#"SELECT id, disk_id, path, filename, asset_meta, meta, created_at, updated_at
           FROM artifacts WHERE disk_id = $1 AND path = $2 AND filename = $3"#,
    )
    .bind(disk_id)
    .bind(path)
    .bind(filename)
    .fetch_one(exec)
    .await
    .map_err(map_sqlx)?;
    Ok(row.into())
}

/// Upserts the (disk, path, filename) unique row (§3, §5: "Artifact writes
/// use upsert semantics").
pub async fn upsert_artifact<'e, E>(
    exec: E,
    disk_id: Uuid,
    path: &str,
    filename: &str,
    asset_meta: AssetMeta,
    artifact_info_patch: serde_json::Value,
) -> Result<Artifact>
where
    E: PgExecutor<'e>,
{
    let row: ArtifactRow = sqlx::query_as(
        r#"INSERT INTO artifacts (id, disk_id, path, filename, asset_meta, meta, created_at, updated_at)
           VALUES ($1, $2, $3, $4, $5, $6, now(), now())
           ON CONFLICT (disk_id, path, filename) DO UPDATE SET
             asset_meta = EXCLUDED.asset_meta,
             meta = artifacts.meta || EXCLUDED.meta,
             updated_at = now()
           RETURNING id, disk_id, path, filename, asset_meta, meta, created_at, updated_at"#,
    )
    .bind(Uuid::new_v4())
    .bind(disk_id)
    .bind(path)
    .bind(filename)
    .bind(Json(asset_meta))
    .bind(Json(
        artifact_info_patch.as_object().cloned().unwrap_or_default(),
    ))
    .fetch_one(exec)
    .await
    .map_err(map_sqlx)?;
    Ok(row.into())
}

pub async fn rename_artifact<'e, E>(
    exec: E,
    artifact_id: Uuid,
    new_path: &str,
    new_filename: &str,
    artifact_info: serde_json::Value,
) -> Result<Artifact>
where
    E: PgExecutor<'e>,
{
    let row: ArtifactRow = sqlx::query_as(
        r#"UPDATE artifacts SET path = $2, filename = $3,
             meta = jsonb_set(meta, '{__artifact_info__}', $4::jsonb, true),
             updated_at = now()
           WHERE id = $1
           RETURNING id, disk_id, path, filename, asset_meta, meta, created_at, updated_at"#,
    )
    .bind(artifact_id)
    .bind(new_path)
    .bind(new_filename)
    .bind(artifact_info)
    .fetch_one(exec)
    .await
    .map_err(map_sqlx)?;
    Ok(row.into())
}

pub async fn delete_artifact<'e, E>(exec: E, disk_id: Uuid, path: &str, filename: &str) -> Result<()>
where
    E: PgExecutor<'e>,
{
    sqlx::query(r#"DELETE FROM artifacts WHERE disk_id = $1 AND path = $2 AND filename = $3"#)
        .bind(disk_id)
        .bind(path)
        .bind(filename)
        .execute(exec)
        .await
        .map_err(map_sqlx)?;
    Ok(())
}
