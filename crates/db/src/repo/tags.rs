use sqlx::SqlitePool;

use super::movies::TagRow;

/// List all tags, scraped and user-created alike.
pub async fn list(pool: &SqlitePool) -> Result<Vec<TagRow>, sqlx::Error> {
    let rows: Vec<(i64, String, bool)> =
        sqlx::query_as("SELECT id, name, is_custom FROM tags ORDER BY name")
            .fetch_all(pool)
            .await?;
    Ok(rows
        .into_iter()
        .map(|(id, name, is_custom)| TagRow {
            id,
            name,
            is_custom,
        })
        .collect())
}

/// Create a user-defined tag. Reuses an existing row with the same name.
pub async fn create_custom(pool: &SqlitePool, name: &str) -> Result<TagRow, sqlx::Error> {
    sqlx::query("INSERT OR IGNORE INTO tags (name, is_custom) VALUES (?, 1)")
        .bind(name)
        .execute(pool)
        .await?;
    let (id, is_custom): (i64, bool) =
        sqlx::query_as("SELECT id, is_custom FROM tags WHERE name = ?")
            .bind(name)
            .fetch_one(pool)
            .await?;
    Ok(TagRow {
        id,
        name: name.to_string(),
        is_custom,
    })
}

/// Rename a tag.
pub async fn rename(pool: &SqlitePool, tag_id: i64, name: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE tags SET name = ? WHERE id = ?")
        .bind(name)
        .bind(tag_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Delete a tag; movie links cascade.
pub async fn delete(pool: &SqlitePool, tag_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM tags WHERE id = ?")
        .bind(tag_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Attach a tag to a movie.
pub async fn attach(pool: &SqlitePool, movie_id: i64, tag_id: i64) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT OR IGNORE INTO movie_tags (movie_id, tag_id) VALUES (?, ?)")
        .bind(movie_id)
        .bind(tag_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Detach a tag from a movie.
pub async fn detach(pool: &SqlitePool, movie_id: i64, tag_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM movie_tags WHERE movie_id = ? AND tag_id = ?")
        .bind(movie_id)
        .bind(tag_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
