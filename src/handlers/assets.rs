//! Entity pictures: a file in the assets directory whose stem matches the entity's asset key.

use super::entity::{authorize, entity_for};
use crate::config::Operation;
use crate::error::AppError;
use crate::extractors::BearerToken;
use crate::service::Repository;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use base64::Engine;
use serde::Deserialize;
use std::path::{Path as FsPath, PathBuf};

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    #[default]
    Redirect,
    File,
    Base64,
}

#[derive(Debug, Default, Deserialize)]
pub struct PictureQuery {
    #[serde(default)]
    pub response_type: ResponseType,
}

/// Lowercase alphanumerics only, so "Cap'n'Crunch" matches "capncrunch.jpg".
fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Exact normalized stem wins; otherwise the closest stem that contains, or is
/// contained in, the key. Ties go to the lexicographically first file name.
fn best_match(key: &str, file_names: &[String]) -> Option<String> {
    let target = normalize(key);
    if target.is_empty() {
        return None;
    }
    let mut best: Option<(usize, &String)> = None;
    for name in file_names {
        let stem = FsPath::new(name)
            .file_stem()
            .and_then(|s| s.to_str())
            .map(normalize)
            .unwrap_or_default();
        if stem.is_empty() {
            continue;
        }
        let distance = if stem == target {
            0
        } else if stem.contains(&target) || target.contains(&stem) {
            stem.len().abs_diff(target.len())
        } else {
            continue;
        };
        let better = match best {
            None => true,
            Some((d, n)) => distance < d || (distance == d && name < n),
        };
        if better {
            best = Some((distance, name));
        }
    }
    best.map(|(_, n)| n.clone())
}

fn content_type(name: &str) -> &'static str {
    let ext = FsPath::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

async fn list_files(dir: &FsPath) -> Result<Vec<String>, AppError> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(e) => e,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "assets directory unreadable");
            return Ok(Vec::new());
        }
    };
    let mut names = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| AppError::Internal(format!("reading assets: {}", e)))?
    {
        let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
        if let (true, Some(name)) = (is_file, entry.file_name().to_str()) {
            names.push(name.to_string());
        }
    }
    Ok(names)
}

/// Public URL of an asset file, relative to the `/static` mount of the assets directory's parent.
fn static_url(assets_dir: &FsPath, file: &str) -> String {
    match assets_dir.file_name().and_then(|d| d.to_str()) {
        Some(dir) => format!("/static/{}/{}", dir, file),
        None => format!("/static/{}", file),
    }
}

pub async fn picture(
    State(state): State<AppState>,
    Path((path_segment, id_str)): Path<(String, String)>,
    Query(query): Query<PictureQuery>,
    token: BearerToken,
) -> Result<Response, AppError> {
    let entity = entity_for(&state, &path_segment, Operation::Read)?;
    authorize(&state, entity, Operation::Read, &token).await?;
    let key_field = entity
        .asset_key
        .as_deref()
        .ok_or_else(|| AppError::NotFound(format!("{} has no pictures", path_segment)))?;
    let id = entity.parse_id(&id_str)?;
    let row = Repository::new(&state.pool, entity).get_by_id(&id).await?;
    let key = row
        .get(key_field)
        .and_then(|v| v.as_str())
        .ok_or_else(|| AppError::NotFound("No picture for this record".into()))?;

    let dir: &PathBuf = &state.assets_dir;
    let files = list_files(dir).await?;
    let file = best_match(key, &files)
        .ok_or_else(|| AppError::NotFound(format!("No picture found for {}", key)))?;
    tracing::debug!(%key, %file, "matched picture");

    match query.response_type {
        ResponseType::Redirect => Ok(Redirect::temporary(&static_url(dir, &file)).into_response()),
        ResponseType::File => {
            let bytes = tokio::fs::read(dir.join(&file))
                .await
                .map_err(|e| AppError::Internal(format!("reading {}: {}", file, e)))?;
            Ok((StatusCode::OK, [(header::CONTENT_TYPE, content_type(&file))], bytes).into_response())
        }
        ResponseType::Base64 => {
            let bytes = tokio::fs::read(dir.join(&file))
                .await
                .map_err(|e| AppError::Internal(format!("reading {}: {}", file, e)))?;
            let image = base64::engine::general_purpose::STANDARD.encode(bytes);
            Ok(Json(serde_json::json!({ "image": image })).into_response())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn exact_normalized_stem_wins() {
        let files = names(&["Cap_n_Crunch_Crunchberries.png", "Capn_Crunch.jpg", "Cheerios.jpg"]);
        assert_eq!(best_match("Cap'n'Crunch", &files).as_deref(), Some("Capn_Crunch.jpg"));
        assert_eq!(best_match("cheerios", &files).as_deref(), Some("Cheerios.jpg"));
    }

    #[test]
    fn falls_back_to_closest_containing_stem() {
        let files = names(&["100_Bran.jpg", "All-Bran_with_Extra_Fiber.jpg", "All-Bran.jpg"]);
        assert_eq!(best_match("All-Bran with Extra", &files).as_deref(), Some("All-Bran_with_Extra_Fiber.jpg"));
        assert_eq!(best_match("Total Raisin Bran", &files), None);
        assert_eq!(best_match("!!!", &files), None);
    }

    #[test]
    fn content_types_follow_extension() {
        assert_eq!(content_type("a.JPG"), "image/jpeg");
        assert_eq!(content_type("a.png"), "image/png");
        assert_eq!(content_type("a"), "application/octet-stream");
    }

    #[test]
    fn redirect_targets_static_mount() {
        assert_eq!(static_url(FsPath::new("static/images"), "x.jpg"), "/static/images/x.jpg");
    }

    #[tokio::test]
    async fn lists_only_regular_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Cheerios.jpg"), b"jpg").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        let files = list_files(dir.path()).await.unwrap();
        assert_eq!(files, vec!["Cheerios.jpg".to_string()]);
        assert!(list_files(&dir.path().join("missing")).await.unwrap().is_empty());
    }
}
