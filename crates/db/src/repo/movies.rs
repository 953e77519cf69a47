use std::collections::{HashMap, HashSet};
use std::path::Path;

use cinelog_core::types::ParsedNfo;
use sqlx::sqlite::Sqlite;
use sqlx::{QueryBuilder, SqliteConnection, SqlitePool};

/// One row of the `movies` table.
#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct MovieRow {
    pub id: i64,
    pub title: String,
    pub original_title: String,
    pub sort_title: String,
    pub year: Option<i64>,
    pub plot: String,
    pub rating_local: Option<f64>,
    pub rating_nfo: Option<f64>,
    pub runtime: Option<i64>,
    pub studio: String,
    pub director: String,
    pub file_path: String,
    pub nfo_path: String,
    pub poster_path: String,
    pub fanart_path: String,
    pub nfo_imported: bool,
    pub is_favorite: bool,
    pub created_ts: i64,
    pub updated_ts: i64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct GenreRow {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MovieActorRow {
    pub id: i64,
    pub name: String,
    pub thumb: String,
    pub role: String,
    pub sort_order: i64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct TagRow {
    pub id: i64,
    pub name: String,
    pub is_custom: bool,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct CustomFieldValueRow {
    pub field_id: i64,
    pub name: String,
    pub field_type: String,
    pub value: String,
}

/// A movie plus all of its relations, for the detail view.
#[derive(Debug, Clone, serde::Serialize)]
pub struct MovieDetail {
    #[serde(flatten)]
    pub movie: MovieRow,
    pub genres: Vec<GenreRow>,
    pub actors: Vec<MovieActorRow>,
    pub tags: Vec<TagRow>,
    pub custom_fields: Vec<CustomFieldValueRow>,
}

/// Browsing filter for `list_movies`. All criteria are optional and ANDed.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct MovieFilter {
    pub search: Option<String>,
    pub year_from: Option<i64>,
    pub year_to: Option<i64>,
    pub rating_from: Option<f64>,
    pub rating_to: Option<f64>,
    pub is_favorite: Option<bool>,
    pub genres: Option<Vec<i64>>,
    pub tags: Option<Vec<i64>>,
    pub actors: Option<Vec<i64>>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MoviePage {
    pub items: Vec<MovieRow>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
}

/// Import-relevant state of a catalogued video, keyed by its file path.
#[derive(Debug, Clone)]
pub struct MovieImportState {
    pub id: i64,
    pub title: String,
    pub nfo_imported: bool,
}

const MOVIE_COLUMNS: &str = "id, title, original_title, sort_title, year, plot, \
     rating_local, rating_nfo, runtime, studio, director, file_path, nfo_path, \
     poster_path, fanart_path, nfo_imported, is_favorite, created_ts, updated_ts";

fn push_filter_conditions(qb: &mut QueryBuilder<'_, Sqlite>, filter: &MovieFilter) {
    let mut sep = " WHERE ";
    macro_rules! cond {
        ($block:block) => {{
            qb.push(sep);
            $block
            sep = " AND ";
        }};
    }

    if let Some(search) = filter.search.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{search}%");
        cond!({
            qb.push("(m.title LIKE ")
                .push_bind(pattern.clone())
                .push(" OR m.original_title LIKE ")
                .push_bind(pattern)
                .push(")");
        });
    }
    if let Some(from) = filter.year_from {
        cond!({
            qb.push("m.year >= ").push_bind(from);
        });
    }
    if let Some(to) = filter.year_to {
        cond!({
            qb.push("m.year <= ").push_bind(to);
        });
    }
    if let Some(from) = filter.rating_from {
        cond!({
            qb.push("m.rating_local >= ").push_bind(from);
        });
    }
    if let Some(to) = filter.rating_to {
        cond!({
            qb.push("m.rating_local <= ").push_bind(to);
        });
    }
    if let Some(fav) = filter.is_favorite {
        cond!({
            qb.push("m.is_favorite = ").push_bind(fav as i64);
        });
    }

    for (ids, table, column) in [
        (&filter.genres, "movie_genres", "genre_id"),
        (&filter.tags, "movie_tags", "tag_id"),
        (&filter.actors, "movie_actors", "actor_id"),
    ] {
        if let Some(ids) = ids.as_ref().filter(|v| !v.is_empty()) {
            cond!({
                qb.push(format!("m.id IN (SELECT movie_id FROM {table} WHERE {column} IN ("));
                let mut inner = qb.separated(", ");
                for id in ids {
                    inner.push_bind(*id);
                }
                qb.push("))");
            });
        }
    }

    let _ = sep;
}

/// Whitelisted sort column; anything unknown falls back to creation time.
fn sort_column(requested: Option<&str>) -> &'static str {
    match requested {
        Some("title") => "title",
        Some("sort_title") => "sort_title",
        Some("year") => "year",
        Some("rating_local") => "rating_local",
        Some("rating_nfo") => "rating_nfo",
        Some("updated_ts") => "updated_ts",
        _ => "created_ts",
    }
}

/// List movies matching a browsing filter, paginated.
pub async fn list_movies(
    pool: &SqlitePool,
    filter: &MovieFilter,
) -> Result<MoviePage, sqlx::Error> {
    let page = filter.page.unwrap_or(1).max(1);
    let page_size = filter.page_size.unwrap_or(50).clamp(1, 500);
    let offset = (page - 1) * page_size;

    let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM movies m");
    push_filter_conditions(&mut count_qb, filter);
    let (total,): (i64,) = count_qb.build_query_as().fetch_one(pool).await?;

    let cols = MOVIE_COLUMNS
        .split(',')
        .map(|c| format!("m.{}", c.trim()))
        .collect::<Vec<_>>()
        .join(", ");
    let mut qb = QueryBuilder::new(format!("SELECT {cols} FROM movies m"));
    push_filter_conditions(&mut qb, filter);

    let order = match filter.sort_order.as_deref() {
        Some("asc") => "ASC",
        _ => "DESC",
    };
    qb.push(format!(
        " ORDER BY m.{} {} LIMIT ",
        sort_column(filter.sort_by.as_deref()),
        order
    ));
    qb.push_bind(page_size as i64);
    qb.push(" OFFSET ");
    qb.push_bind(offset as i64);

    let items: Vec<MovieRow> = qb.build_query_as().fetch_all(pool).await?;

    Ok(MoviePage {
        items,
        total,
        page,
        page_size,
    })
}

/// Fetch one movie row.
pub async fn get_movie(pool: &SqlitePool, id: i64) -> Result<Option<MovieRow>, sqlx::Error> {
    let query = format!("SELECT {} FROM movies WHERE id = ?", MOVIE_COLUMNS);
    sqlx::query_as(&query).bind(id).fetch_optional(pool).await
}

/// Fetch one movie with genres, actors, tags and custom-field values joined in.
pub async fn get_movie_detail(
    pool: &SqlitePool,
    id: i64,
) -> Result<Option<MovieDetail>, sqlx::Error> {
    let Some(movie) = get_movie(pool, id).await? else {
        return Ok(None);
    };

    let genres: Vec<(i64, String)> = sqlx::query_as(
        "SELECT g.id, g.name FROM genres g \
         JOIN movie_genres mg ON g.id = mg.genre_id WHERE mg.movie_id = ? ORDER BY g.name",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    let actors: Vec<(i64, String, String, String, i64)> = sqlx::query_as(
        "SELECT a.id, a.name, a.thumb, ma.role, ma.sort_order FROM actors a \
         JOIN movie_actors ma ON a.id = ma.actor_id WHERE ma.movie_id = ? ORDER BY ma.sort_order",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    let tags: Vec<(i64, String, bool)> = sqlx::query_as(
        "SELECT t.id, t.name, t.is_custom FROM tags t \
         JOIN movie_tags mt ON t.id = mt.tag_id WHERE mt.movie_id = ? ORDER BY t.name",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    let custom_fields: Vec<(i64, String, String, String)> = sqlx::query_as(
        "SELECT cf.id, cf.name, cf.field_type, mcf.value FROM custom_fields cf \
         JOIN movie_custom_fields mcf ON cf.id = mcf.field_id WHERE mcf.movie_id = ?",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    Ok(Some(MovieDetail {
        movie,
        genres: genres
            .into_iter()
            .map(|(id, name)| GenreRow { id, name })
            .collect(),
        actors: actors
            .into_iter()
            .map(|(id, name, thumb, role, sort_order)| MovieActorRow {
                id,
                name,
                thumb,
                role,
                sort_order,
            })
            .collect(),
        tags: tags
            .into_iter()
            .map(|(id, name, is_custom)| TagRow {
                id,
                name,
                is_custom,
            })
            .collect(),
        custom_fields: custom_fields
            .into_iter()
            .map(|(field_id, name, field_type, value)| CustomFieldValueRow {
                field_id,
                name,
                field_type,
                value,
            })
            .collect(),
    }))
}

/// Register a bare movie for a newly discovered video file. Title is the
/// file stem; metadata comes later via NFO import.
pub async fn insert_from_video(
    conn: &mut SqliteConnection,
    video_path: &str,
) -> Result<i64, sqlx::Error> {
    let title = Path::new(video_path)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let now = chrono::Utc::now().timestamp();

    let result = sqlx::query(
        "INSERT INTO movies (title, sort_title, file_path, created_ts, updated_ts) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&title)
    .bind(&title)
    .bind(video_path)
    .bind(now)
    .bind(now)
    .execute(conn)
    .await?;

    Ok(result.last_insert_rowid())
}

/// All video paths currently in the catalog.
pub async fn existing_video_paths(pool: &SqlitePool) -> Result<HashSet<String>, sqlx::Error> {
    let rows: Vec<(String,)> =
        sqlx::query_as("SELECT file_path FROM movies WHERE file_path != ''")
            .fetch_all(pool)
            .await?;
    Ok(rows.into_iter().map(|(p,)| p).collect())
}

/// All sidecar paths already represented in the catalog.
pub async fn existing_nfo_paths(pool: &SqlitePool) -> Result<HashSet<String>, sqlx::Error> {
    let rows: Vec<(String,)> = sqlx::query_as("SELECT nfo_path FROM movies WHERE nfo_path != ''")
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(|(p,)| p).collect())
}

/// Map of video path → (id, title, imported flag) for every catalogued video.
pub async fn nfo_import_state(
    pool: &SqlitePool,
) -> Result<HashMap<String, MovieImportState>, sqlx::Error> {
    let rows: Vec<(i64, String, String, bool)> = sqlx::query_as(
        "SELECT id, title, file_path, nfo_imported FROM movies WHERE file_path != ''",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, title, file_path, nfo_imported)| {
            (
                file_path,
                MovieImportState {
                    id,
                    title,
                    nfo_imported,
                },
            )
        })
        .collect())
}

/// Write a parsed sidecar record onto an existing movie: all scalar columns,
/// the imported flag, and a full replacement of scraped relations. Genre and
/// actor links are rebuilt from scratch; tag links are rebuilt for scraped
/// tags only, leaving user-created custom tags attached.
pub async fn apply_nfo(
    conn: &mut SqliteConnection,
    movie_id: i64,
    parsed: &ParsedNfo,
) -> Result<(), sqlx::Error> {
    let now = chrono::Utc::now().timestamp();
    let sort_title = if parsed.sort_title.is_empty() {
        &parsed.title
    } else {
        &parsed.sort_title
    };

    sqlx::query(
        "UPDATE movies SET \
           title = ?, original_title = ?, sort_title = ?, year = ?, \
           plot = ?, rating_nfo = ?, runtime = ?, studio = ?, director = ?, \
           nfo_path = ?, poster_path = ?, fanart_path = ?, \
           nfo_imported = 1, updated_ts = ? \
         WHERE id = ?",
    )
    .bind(&parsed.title)
    .bind(&parsed.original_title)
    .bind(sort_title)
    .bind(parsed.year)
    .bind(&parsed.plot)
    .bind(parsed.rating)
    .bind(parsed.runtime)
    .bind(&parsed.studio)
    .bind(&parsed.director)
    .bind(&parsed.nfo_path)
    .bind(&parsed.poster_path)
    .bind(&parsed.fanart_path)
    .bind(now)
    .bind(movie_id)
    .execute(&mut *conn)
    .await?;

    // Clear scraped relations; custom tag links survive
    sqlx::query("DELETE FROM movie_genres WHERE movie_id = ?")
        .bind(movie_id)
        .execute(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM movie_actors WHERE movie_id = ?")
        .bind(movie_id)
        .execute(&mut *conn)
        .await?;
    sqlx::query(
        "DELETE FROM movie_tags WHERE movie_id = ? \
         AND tag_id IN (SELECT id FROM tags WHERE is_custom = 0)",
    )
    .bind(movie_id)
    .execute(&mut *conn)
    .await?;

    for genre in &parsed.genres {
        sqlx::query("INSERT OR IGNORE INTO genres (name) VALUES (?)")
            .bind(genre)
            .execute(&mut *conn)
            .await?;
        let (genre_id,): (i64,) = sqlx::query_as("SELECT id FROM genres WHERE name = ?")
            .bind(genre)
            .fetch_one(&mut *conn)
            .await?;
        sqlx::query("INSERT OR IGNORE INTO movie_genres (movie_id, genre_id) VALUES (?, ?)")
            .bind(movie_id)
            .bind(genre_id)
            .execute(&mut *conn)
            .await?;
    }

    for actor in &parsed.actors {
        sqlx::query(
            "INSERT INTO actors (name, thumb) VALUES (?, ?) \
             ON CONFLICT(name) DO UPDATE SET thumb = excluded.thumb",
        )
        .bind(&actor.name)
        .bind(&actor.thumb)
        .execute(&mut *conn)
        .await?;
        let (actor_id,): (i64,) = sqlx::query_as("SELECT id FROM actors WHERE name = ?")
            .bind(&actor.name)
            .fetch_one(&mut *conn)
            .await?;
        sqlx::query(
            "INSERT OR IGNORE INTO movie_actors (movie_id, actor_id, role, sort_order) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(movie_id)
        .bind(actor_id)
        .bind(&actor.role)
        .bind(actor.sort_order)
        .execute(&mut *conn)
        .await?;
    }

    for tag in &parsed.tags {
        sqlx::query("INSERT OR IGNORE INTO tags (name, is_custom) VALUES (?, 0)")
            .bind(tag)
            .execute(&mut *conn)
            .await?;
        let (tag_id,): (i64,) = sqlx::query_as("SELECT id FROM tags WHERE name = ?")
            .bind(tag)
            .fetch_one(&mut *conn)
            .await?;
        sqlx::query("INSERT OR IGNORE INTO movie_tags (movie_id, tag_id) VALUES (?, ?)")
            .bind(movie_id)
            .bind(tag_id)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

/// Set the user-assigned rating.
pub async fn update_rating(
    pool: &SqlitePool,
    movie_id: i64,
    rating: f64,
) -> Result<bool, sqlx::Error> {
    let now = chrono::Utc::now().timestamp();
    let result = sqlx::query("UPDATE movies SET rating_local = ?, updated_ts = ? WHERE id = ?")
        .bind(rating)
        .bind(now)
        .bind(movie_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Flip the favorite flag. Returns the new value, or None if the movie is gone.
pub async fn toggle_favorite(
    pool: &SqlitePool,
    movie_id: i64,
) -> Result<Option<bool>, sqlx::Error> {
    let row: Option<(bool,)> = sqlx::query_as("SELECT is_favorite FROM movies WHERE id = ?")
        .bind(movie_id)
        .fetch_optional(pool)
        .await?;
    let Some((current,)) = row else {
        return Ok(None);
    };

    let new_val = !current;
    let now = chrono::Utc::now().timestamp();
    sqlx::query("UPDATE movies SET is_favorite = ?, updated_ts = ? WHERE id = ?")
        .bind(new_val)
        .bind(now)
        .bind(movie_id)
        .execute(pool)
        .await?;
    Ok(Some(new_val))
}

/// Delete a movie; relation rows cascade.
pub async fn delete_movie(pool: &SqlitePool, movie_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM movies WHERE id = ?")
        .bind(movie_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
