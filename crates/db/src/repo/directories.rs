use cinelog_core::types::DirectoryKind;
use sqlx::SqlitePool;

/// A configured source directory registration.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DirectoryRow {
    pub id: i64,
    pub path: String,
    pub kind: String,
    pub label: String,
}

/// List registered directories, optionally filtered by role.
pub async fn list(
    pool: &SqlitePool,
    kind: Option<DirectoryKind>,
) -> Result<Vec<DirectoryRow>, sqlx::Error> {
    let rows: Vec<(i64, String, String, String)> = if let Some(kind) = kind {
        sqlx::query_as("SELECT id, path, kind, label FROM directories WHERE kind = ? ORDER BY id")
            .bind(kind.as_str())
            .fetch_all(pool)
            .await?
    } else {
        sqlx::query_as("SELECT id, path, kind, label FROM directories ORDER BY id")
            .fetch_all(pool)
            .await?
    };

    Ok(rows
        .into_iter()
        .map(|(id, path, kind, label)| DirectoryRow {
            id,
            path,
            kind,
            label,
        })
        .collect())
}

/// Register a directory for a role. Returns the new row.
pub async fn add(
    pool: &SqlitePool,
    path: &str,
    kind: DirectoryKind,
    label: &str,
) -> Result<DirectoryRow, sqlx::Error> {
    let result = sqlx::query("INSERT INTO directories (path, kind, label) VALUES (?, ?, ?)")
        .bind(path)
        .bind(kind.as_str())
        .bind(label)
        .execute(pool)
        .await?;

    Ok(DirectoryRow {
        id: result.last_insert_rowid(),
        path: path.to_string(),
        kind: kind.as_str().to_string(),
        label: label.to_string(),
    })
}

/// Remove a directory registration by id.
pub async fn remove(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM directories WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
