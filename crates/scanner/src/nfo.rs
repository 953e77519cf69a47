//! Sidecar (NFO) parsing: one XML file in, one normalized [`ParsedNfo`]
//! record out. Optional fields degrade to empty/absent instead of failing;
//! only an unreadable file, malformed XML, or a missing top-level `<movie>`
//! element count as a parse failure — and even those are per-file outcomes
//! the pipeline records and moves past.

use std::path::{Path, PathBuf};

use cinelog_core::types::{NfoActor, ParsedNfo, UniqueId};

use crate::xml::{self, XmlElement};

/// Image extensions probed when locating companion poster/fanart files.
pub static IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

#[derive(Debug, thiserror::Error)]
pub enum NfoError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid XML in {path}: {source}")]
    Xml {
        path: PathBuf,
        source: quick_xml::Error,
    },
    #[error("no <movie> element in {path}")]
    NoMovieElement { path: PathBuf },
}

/// Parse one sidecar file into a normalized record.
pub fn parse_nfo_file(path: &Path) -> Result<ParsedNfo, NfoError> {
    let content = std::fs::read_to_string(path).map_err(|source| NfoError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let root = xml::parse_document(&content).map_err(|source| NfoError::Xml {
        path: path.to_path_buf(),
        source,
    })?;

    if root.name != "movie" {
        return Err(NfoError::NoMovieElement {
            path: path.to_path_buf(),
        });
    }

    let dir = path.parent().unwrap_or_else(|| Path::new(""));
    let base = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    let title = root.text_of("title").to_string();
    let sort_title = match root.text_of("sorttitle") {
        "" => title.clone(),
        s => s.to_string(),
    };

    let actors = root
        .children_named("actor")
        .enumerate()
        .map(|(idx, actor)| NfoActor {
            name: actor.text_of("name").to_string(),
            role: actor.text_of("role").to_string(),
            thumb: actor.text_of("thumb").to_string(),
            sort_order: idx as i64,
        })
        .collect();

    let genres = non_empty_texts(&root, "genre");
    let tags = non_empty_texts(&root, "tag");

    let unique_ids = root
        .children_named("uniqueid")
        .map(|uid| UniqueId {
            scheme: uid.attr("type").unwrap_or("unknown").to_string(),
            value: uid.text.trim().to_string(),
        })
        .collect();

    let poster_path = find_image(dir, "poster")
        .or_else(|| find_image(dir, &format!("{base}-poster")))
        .map(path_string)
        .unwrap_or_default();
    let fanart_path = find_image(dir, "fanart")
        .or_else(|| find_image(dir, &format!("{base}-fanart")))
        .or_else(|| find_image(dir, "thumb"))
        .map(path_string)
        .unwrap_or_default();

    Ok(ParsedNfo {
        original_title: root.text_of("originaltitle").to_string(),
        sort_title,
        year: parse_int_prefix(root.text_of("year")),
        plot: root.text_of("plot").to_string(),
        runtime: parse_int_prefix(root.text_of("runtime")),
        studio: root.text_of("studio").to_string(),
        director: root.text_of("director").to_string(),
        genres,
        tags,
        actors,
        rating: resolve_rating(&root),
        unique_ids,
        poster_path,
        fanart_path,
        nfo_path: path_string(path.to_path_buf()),
        title,
    })
}

/// Rating resolution order: a direct `<rating>` scalar first; failing that,
/// the nested `<ratings><rating value="…">` container, where the `value`
/// attribute wins over inline text. First valid float wins.
fn resolve_rating(movie: &XmlElement) -> Option<f64> {
    if let Some(rating) = parse_float_prefix(movie.text_of("rating")) {
        return Some(rating);
    }

    let ratings = movie.child("ratings")?;
    ratings.children_named("rating").find_map(|r| {
        r.attr("value")
            .and_then(parse_float_prefix)
            .or_else(|| parse_float_prefix(r.text.trim()))
    })
}

fn non_empty_texts(root: &XmlElement, name: &str) -> Vec<String> {
    root.children_named(name)
        .map(|c| c.text.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Permissive integer parse: leading integer prefix, or absent. `"2005"` and
/// `"2005-06-01"` both give 2005; `"n/a"` gives None, never an error.
fn parse_int_prefix(s: &str) -> Option<i64> {
    let s = s.trim();
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().ok().map(|v| sign * v)
}

/// Permissive float parse: leading decimal prefix, or absent.
fn parse_float_prefix(s: &str) -> Option<f64> {
    let s = s.trim();
    let bytes = s.as_bytes();
    let mut end = 0;
    if end < bytes.len() && (bytes[end] == b'-' || bytes[end] == b'+') {
        end += 1;
    }
    let mut seen_dot = false;
    while end < bytes.len() {
        match bytes[end] {
            b'0'..=b'9' => end += 1,
            b'.' if !seen_dot => {
                seen_dot = true;
                end += 1;
            }
            _ => break,
        }
    }
    s[..end].parse::<f64>().ok()
}

/// First existing `<stem>.<ext>` in the sidecar's directory, probing the
/// image extensions in a fixed order.
fn find_image(dir: &Path, stem: &str) -> Option<PathBuf> {
    IMAGE_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{stem}.{ext}")))
        .find(|candidate| candidate.is_file())
}

fn path_string(path: PathBuf) -> String {
    path.to_string_lossy().to_string()
}
