use sqlx::SqlitePool;

/// A user-declared custom metadata field.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CustomFieldRow {
    pub id: i64,
    pub name: String,
    pub field_type: String,
}

/// List declared custom fields.
pub async fn list(pool: &SqlitePool) -> Result<Vec<CustomFieldRow>, sqlx::Error> {
    let rows: Vec<(i64, String, String)> =
        sqlx::query_as("SELECT id, name, field_type FROM custom_fields ORDER BY name")
            .fetch_all(pool)
            .await?;
    Ok(rows
        .into_iter()
        .map(|(id, name, field_type)| CustomFieldRow {
            id,
            name,
            field_type,
        })
        .collect())
}

/// Declare a new custom field.
pub async fn create(
    pool: &SqlitePool,
    name: &str,
    field_type: &str,
) -> Result<CustomFieldRow, sqlx::Error> {
    let result = sqlx::query("INSERT INTO custom_fields (name, field_type) VALUES (?, ?)")
        .bind(name)
        .bind(field_type)
        .execute(pool)
        .await?;
    Ok(CustomFieldRow {
        id: result.last_insert_rowid(),
        name: name.to_string(),
        field_type: field_type.to_string(),
    })
}

/// Delete a field declaration; per-movie values cascade.
pub async fn delete(pool: &SqlitePool, field_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM custom_fields WHERE id = ?")
        .bind(field_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Set a field's value on a movie (upsert).
pub async fn set_value(
    pool: &SqlitePool,
    movie_id: i64,
    field_id: i64,
    value: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO movie_custom_fields (movie_id, field_id, value) VALUES (?, ?, ?) \
         ON CONFLICT(movie_id, field_id) DO UPDATE SET value = excluded.value",
    )
    .bind(movie_id)
    .bind(field_id)
    .bind(value)
    .execute(pool)
    .await?;
    Ok(())
}
