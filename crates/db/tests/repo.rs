use cinelog_core::types::{DirectoryKind, NfoActor, ParsedNfo};
use cinelog_db::repo;
use sqlx::SqlitePool;

async fn test_pool(dir: &tempfile::TempDir) -> SqlitePool {
    let db_path = dir.path().join("catalog.db");
    let pool = cinelog_db::connect(db_path.to_str().unwrap()).await.unwrap();
    cinelog_db::migrate::run(&pool).await.unwrap();
    pool
}

async fn insert_video(pool: &SqlitePool, path: &str) -> i64 {
    let mut conn = pool.acquire().await.unwrap();
    repo::movies::insert_from_video(&mut *conn, path).await.unwrap()
}

fn sample_nfo(title: &str) -> ParsedNfo {
    ParsedNfo {
        title: title.to_string(),
        year: Some(1999),
        plot: "A plot.".to_string(),
        genres: vec!["Drama".to_string(), "Crime".to_string()],
        tags: vec!["classic".to_string()],
        actors: vec![
            NfoActor {
                name: "Ana".to_string(),
                role: "Lead".to_string(),
                thumb: "/t/ana.jpg".to_string(),
                sort_order: 0,
            },
            NfoActor {
                name: "Ben".to_string(),
                role: "Support".to_string(),
                thumb: String::new(),
                sort_order: 1,
            },
        ],
        rating: Some(8.1),
        nfo_path: format!("/meta/{title}.nfo"),
        ..Default::default()
    }
}

#[tokio::test]
async fn insert_from_video_uses_file_stem_as_title() {
    let state = tempfile::tempdir().unwrap();
    let pool = test_pool(&state).await;

    let id = insert_video(&pool, "/media/Some Movie (1999).mkv").await;
    let movie = repo::movies::get_movie(&pool, id).await.unwrap().unwrap();
    assert_eq!(movie.title, "Some Movie (1999)");
    assert_eq!(movie.sort_title, "Some Movie (1999)");
    assert_eq!(movie.file_path, "/media/Some Movie (1999).mkv");
    assert!(!movie.nfo_imported);
    assert!(movie.created_ts > 0);
}

#[tokio::test]
async fn apply_nfo_writes_scalars_and_relations() {
    let state = tempfile::tempdir().unwrap();
    let pool = test_pool(&state).await;

    let id = insert_video(&pool, "/media/foo.mp4").await;
    let mut conn = pool.acquire().await.unwrap();
    repo::movies::apply_nfo(&mut *conn, id, &sample_nfo("Foo"))
        .await
        .unwrap();
    drop(conn);

    let detail = repo::movies::get_movie_detail(&pool, id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(detail.movie.title, "Foo");
    assert_eq!(detail.movie.year, Some(1999));
    assert_eq!(detail.movie.rating_nfo, Some(8.1));
    assert_eq!(detail.movie.rating_local, None);
    assert!(detail.movie.nfo_imported);

    let genres: Vec<_> = detail.genres.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(genres, ["Crime", "Drama"]);
    assert_eq!(detail.actors.len(), 2);
    assert_eq!(detail.actors[0].name, "Ana");
    assert_eq!(detail.actors[0].role, "Lead");
    assert_eq!(detail.tags.len(), 1);
    assert!(!detail.tags[0].is_custom);
}

#[tokio::test]
async fn reimport_replaces_scraped_relations_but_keeps_custom_tags() {
    let state = tempfile::tempdir().unwrap();
    let pool = test_pool(&state).await;

    let id = insert_video(&pool, "/media/foo.mp4").await;
    let mut conn = pool.acquire().await.unwrap();
    repo::movies::apply_nfo(&mut *conn, id, &sample_nfo("Foo"))
        .await
        .unwrap();
    drop(conn);

    let watchlist = repo::tags::create_custom(&pool, "watchlist").await.unwrap();
    assert!(watchlist.is_custom);
    repo::tags::attach(&pool, id, watchlist.id).await.unwrap();

    // Second import with a disjoint relation set
    let update = ParsedNfo {
        title: "Foo".to_string(),
        genres: vec!["Horror".to_string()],
        tags: vec!["remaster".to_string()],
        actors: vec![NfoActor {
            name: "Cara".to_string(),
            role: "Lead".to_string(),
            thumb: String::new(),
            sort_order: 0,
        }],
        nfo_path: "/meta/foo.nfo".to_string(),
        ..Default::default()
    };
    let mut conn = pool.acquire().await.unwrap();
    repo::movies::apply_nfo(&mut *conn, id, &update).await.unwrap();
    drop(conn);

    let detail = repo::movies::get_movie_detail(&pool, id)
        .await
        .unwrap()
        .unwrap();
    let genres: Vec<_> = detail.genres.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(genres, ["Horror"]);
    let actors: Vec<_> = detail.actors.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(actors, ["Cara"]);

    // The scraped "classic" link is gone, the user's custom tag survived
    let tags: Vec<_> = detail.tags.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(tags, ["remaster", "watchlist"]);
}

#[tokio::test]
async fn actor_reuse_updates_thumb_in_place() {
    let state = tempfile::tempdir().unwrap();
    let pool = test_pool(&state).await;

    let first = insert_video(&pool, "/media/a.mp4").await;
    let second = insert_video(&pool, "/media/b.mp4").await;

    let mut conn = pool.acquire().await.unwrap();
    repo::movies::apply_nfo(&mut *conn, first, &sample_nfo("A"))
        .await
        .unwrap();
    let mut later = sample_nfo("B");
    later.actors[0].thumb = "/t/ana-new.jpg".to_string();
    repo::movies::apply_nfo(&mut *conn, second, &later).await.unwrap();
    drop(conn);

    // Same actor row on both movies, thumb taken from the latest import
    let detail_a = repo::movies::get_movie_detail(&pool, first)
        .await
        .unwrap()
        .unwrap();
    let detail_b = repo::movies::get_movie_detail(&pool, second)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(detail_a.actors[0].id, detail_b.actors[0].id);
    assert_eq!(detail_b.actors[0].thumb, "/t/ana-new.jpg");
}

#[tokio::test]
async fn list_movies_filters_and_paginates() {
    let state = tempfile::tempdir().unwrap();
    let pool = test_pool(&state).await;

    let mut conn = pool.acquire().await.unwrap();
    for (title, year) in [("Alpha", 1990), ("Beta", 2000), ("Gamma", 2010)] {
        let id = repo::movies::insert_from_video(&mut *conn, &format!("/m/{title}.mp4"))
            .await
            .unwrap();
        let nfo = ParsedNfo {
            title: title.to_string(),
            year: Some(year),
            nfo_path: format!("/meta/{title}.nfo"),
            ..Default::default()
        };
        repo::movies::apply_nfo(&mut *conn, id, &nfo).await.unwrap();
    }
    drop(conn);

    let all = repo::movies::list_movies(&pool, &Default::default())
        .await
        .unwrap();
    assert_eq!(all.total, 3);

    let filter = repo::movies::MovieFilter {
        year_from: Some(1995),
        year_to: Some(2005),
        ..Default::default()
    };
    let page = repo::movies::list_movies(&pool, &filter).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].title, "Beta");

    let filter = repo::movies::MovieFilter {
        search: Some("amm".to_string()),
        ..Default::default()
    };
    let page = repo::movies::list_movies(&pool, &filter).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].title, "Gamma");

    let filter = repo::movies::MovieFilter {
        sort_by: Some("title".to_string()),
        sort_order: Some("asc".to_string()),
        page: Some(2),
        page_size: Some(2),
        ..Default::default()
    };
    let page = repo::movies::list_movies(&pool, &filter).await.unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].title, "Gamma");
}

#[tokio::test]
async fn list_movies_filters_by_genre_link() {
    let state = tempfile::tempdir().unwrap();
    let pool = test_pool(&state).await;

    let mut conn = pool.acquire().await.unwrap();
    let with_genre = repo::movies::insert_from_video(&mut *conn, "/m/a.mp4")
        .await
        .unwrap();
    repo::movies::apply_nfo(&mut *conn, with_genre, &sample_nfo("A"))
        .await
        .unwrap();
    repo::movies::insert_from_video(&mut *conn, "/m/plain.mp4")
        .await
        .unwrap();
    drop(conn);

    let detail = repo::movies::get_movie_detail(&pool, with_genre)
        .await
        .unwrap()
        .unwrap();
    let drama = detail.genres.iter().find(|g| g.name == "Drama").unwrap();

    let filter = repo::movies::MovieFilter {
        genres: Some(vec![drama.id]),
        ..Default::default()
    };
    let page = repo::movies::list_movies(&pool, &filter).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].id, with_genre);
}

#[tokio::test]
async fn toggle_favorite_flips_and_reports_missing() {
    let state = tempfile::tempdir().unwrap();
    let pool = test_pool(&state).await;

    let id = insert_video(&pool, "/m/f.mp4").await;
    assert_eq!(repo::movies::toggle_favorite(&pool, id).await.unwrap(), Some(true));
    assert_eq!(repo::movies::toggle_favorite(&pool, id).await.unwrap(), Some(false));
    assert_eq!(repo::movies::toggle_favorite(&pool, 9999).await.unwrap(), None);
}

#[tokio::test]
async fn update_rating_touches_local_only() {
    let state = tempfile::tempdir().unwrap();
    let pool = test_pool(&state).await;

    let id = insert_video(&pool, "/m/r.mp4").await;
    let mut conn = pool.acquire().await.unwrap();
    repo::movies::apply_nfo(&mut *conn, id, &sample_nfo("R")).await.unwrap();
    drop(conn);

    assert!(repo::movies::update_rating(&pool, id, 4.5).await.unwrap());
    let movie = repo::movies::get_movie(&pool, id).await.unwrap().unwrap();
    assert_eq!(movie.rating_local, Some(4.5));
    assert_eq!(movie.rating_nfo, Some(8.1));

    assert!(!repo::movies::update_rating(&pool, 9999, 1.0).await.unwrap());
}

#[tokio::test]
async fn delete_movie_cascades_relation_rows() {
    let state = tempfile::tempdir().unwrap();
    let pool = test_pool(&state).await;

    let id = insert_video(&pool, "/m/d.mp4").await;
    let mut conn = pool.acquire().await.unwrap();
    repo::movies::apply_nfo(&mut *conn, id, &sample_nfo("D")).await.unwrap();
    drop(conn);

    assert!(repo::movies::delete_movie(&pool, id).await.unwrap());
    assert!(repo::movies::get_movie(&pool, id).await.unwrap().is_none());

    let (links,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM movie_genres WHERE movie_id = ?")
        .bind(id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(links, 0);
}

#[tokio::test]
async fn import_state_maps_video_paths() {
    let state = tempfile::tempdir().unwrap();
    let pool = test_pool(&state).await;

    let imported = insert_video(&pool, "/m/done.mp4").await;
    insert_video(&pool, "/m/pending.mp4").await;
    let mut conn = pool.acquire().await.unwrap();
    repo::movies::apply_nfo(&mut *conn, imported, &sample_nfo("Done"))
        .await
        .unwrap();
    drop(conn);

    let states = repo::movies::nfo_import_state(&pool).await.unwrap();
    assert_eq!(states.len(), 2);
    assert!(states["/m/done.mp4"].nfo_imported);
    assert!(!states["/m/pending.mp4"].nfo_imported);

    let nfo_paths = repo::movies::existing_nfo_paths(&pool).await.unwrap();
    assert!(nfo_paths.contains("/meta/Done.nfo"));
    assert_eq!(nfo_paths.len(), 1);

    let video_paths = repo::movies::existing_video_paths(&pool).await.unwrap();
    assert_eq!(video_paths.len(), 2);
}

#[tokio::test]
async fn directories_roundtrip_by_kind() {
    let state = tempfile::tempdir().unwrap();
    let pool = test_pool(&state).await;

    let nfo = repo::directories::add(&pool, "/meta", DirectoryKind::Nfo, "sidecars")
        .await
        .unwrap();
    repo::directories::add(&pool, "/media", DirectoryKind::Video, "")
        .await
        .unwrap();

    let all = repo::directories::list(&pool, None).await.unwrap();
    assert_eq!(all.len(), 2);
    let nfos = repo::directories::list(&pool, Some(DirectoryKind::Nfo))
        .await
        .unwrap();
    assert_eq!(nfos.len(), 1);
    assert_eq!(nfos[0].path, "/meta");
    assert_eq!(nfos[0].label, "sidecars");

    assert!(repo::directories::remove(&pool, nfo.id).await.unwrap());
    assert!(!repo::directories::remove(&pool, nfo.id).await.unwrap());
    let nfos = repo::directories::list(&pool, Some(DirectoryKind::Nfo))
        .await
        .unwrap();
    assert!(nfos.is_empty());
}

#[tokio::test]
async fn settings_upsert_and_delete() {
    let state = tempfile::tempdir().unwrap();
    let pool = test_pool(&state).await;

    assert_eq!(repo::settings::get(&pool, "theme").await.unwrap(), None);
    repo::settings::set(&pool, "theme", "dark").await.unwrap();
    assert_eq!(
        repo::settings::get(&pool, "theme").await.unwrap().as_deref(),
        Some("dark")
    );
    repo::settings::set(&pool, "theme", "light").await.unwrap();
    assert_eq!(
        repo::settings::get(&pool, "theme").await.unwrap().as_deref(),
        Some("light")
    );
    assert!(repo::settings::delete(&pool, "theme").await.unwrap());
    assert!(!repo::settings::delete(&pool, "theme").await.unwrap());
}

#[tokio::test]
async fn custom_tags_attach_and_rename() {
    let state = tempfile::tempdir().unwrap();
    let pool = test_pool(&state).await;

    let id = insert_video(&pool, "/m/t.mp4").await;
    let tag = repo::tags::create_custom(&pool, "seen").await.unwrap();
    repo::tags::attach(&pool, id, tag.id).await.unwrap();
    // Attaching twice is a no-op
    repo::tags::attach(&pool, id, tag.id).await.unwrap();

    let detail = repo::movies::get_movie_detail(&pool, id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(detail.tags.len(), 1);

    assert!(repo::tags::rename(&pool, tag.id, "watched").await.unwrap());
    let listed = repo::tags::list(&pool).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "watched");

    assert!(repo::tags::detach(&pool, id, tag.id).await.unwrap());
    assert!(!repo::tags::detach(&pool, id, tag.id).await.unwrap());

    assert!(repo::tags::delete(&pool, tag.id).await.unwrap());
    assert!(repo::tags::list(&pool).await.unwrap().is_empty());
}

#[tokio::test]
async fn custom_field_values_upsert_per_movie() {
    let state = tempfile::tempdir().unwrap();
    let pool = test_pool(&state).await;

    let id = insert_video(&pool, "/m/c.mp4").await;
    let field = repo::custom_fields::create(&pool, "source", "text")
        .await
        .unwrap();

    repo::custom_fields::set_value(&pool, id, field.id, "bluray")
        .await
        .unwrap();
    repo::custom_fields::set_value(&pool, id, field.id, "remux")
        .await
        .unwrap();

    let detail = repo::movies::get_movie_detail(&pool, id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(detail.custom_fields.len(), 1);
    assert_eq!(detail.custom_fields[0].name, "source");
    assert_eq!(detail.custom_fields[0].value, "remux");

    assert!(repo::custom_fields::delete(&pool, field.id).await.unwrap());
    let detail = repo::movies::get_movie_detail(&pool, id)
        .await
        .unwrap()
        .unwrap();
    assert!(detail.custom_fields.is_empty());
}
