//! Secondary Resource Resolver: image reference -> durable file URL.

use crate::api::{self, WikiApi};
use crate::error::ApiError;
use serde::Deserialize;
use tracing::debug;

#[derive(Deserialize)]
struct ImageInfoResponse {
    query: Option<ImageQuery>,
}

#[derive(Deserialize)]
struct ImageQuery {
    #[serde(default)]
    pages: Vec<ImagePage>,
}

#[derive(Deserialize)]
struct ImagePage {
    #[serde(default)]
    missing: bool,
    #[serde(default)]
    imageinfo: Vec<ImageInfo>,
}

#[derive(Deserialize)]
struct ImageInfo {
    url: Option<String>,
}

/// File name behind an image reference: `[[File:X.png|130px]]`, `File:X.png`
/// and `X.png` all give `X.png`. Empty when nothing usable remains.
pub fn resource_name(reference: &str) -> String {
    let mut name = reference.trim();
    name = name.strip_prefix("[[").unwrap_or(name);
    name = name.strip_suffix("]]").unwrap_or(name);
    if let Some((head, _)) = name.split_once('|') {
        name = head;
    }
    let name = name.trim();
    let name = match name.split_once(':') {
        Some((ns, rest))
            if ns.trim().eq_ignore_ascii_case("file") || ns.trim().eq_ignore_ascii_case("image") =>
        {
            rest
        }
        _ => name,
    };
    name.trim().to_string()
}

/// Looks up the URL of `reference`. `Ok(None)` is the normal negative result
/// (no reference, no such file, or no URL); only failed calls are errors.
pub fn resolve<A: WikiApi + ?Sized>(api: &A, reference: Option<&str>) -> Result<Option<String>, ApiError> {
    let name = match reference.map(resource_name) {
        Some(name) if !name.is_empty() => name,
        _ => return Ok(None),
    };

    let params = [
        ("action", "query".to_string()),
        ("titles", format!("File:{}", name)),
        ("prop", "imageinfo".to_string()),
        ("iiprop", "url".to_string()),
    ];
    let value = api::request(api, &params)?;
    let parsed: ImageInfoResponse = serde_json::from_value(value)
        .map_err(|e| ApiError::Malformed(format!("imageinfo response for '{}': {}", name, e)))?;

    let url = parsed
        .query
        .and_then(|q| q.pages.into_iter().next())
        .filter(|page| !page.missing)
        .and_then(|page| page.imageinfo.into_iter().next())
        .and_then(|info| info.url)
        .filter(|url| !url.is_empty());

    if url.is_none() {
        debug!(file = %name, "No image URL found");
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::cell::Cell;

    #[test]
    fn resource_name_normalises_references() {
        assert_eq!(resource_name("[[File:Rune sword.png|130px]]"), "Rune sword.png");
        assert_eq!(resource_name("File:Rune sword.png"), "Rune sword.png");
        assert_eq!(resource_name("image: Zulrah (serpentine).png"), "Zulrah (serpentine).png");
        assert_eq!(resource_name(" Rune sword.png "), "Rune sword.png");
        assert_eq!(resource_name("[[File:]]"), "");
    }

    #[test]
    fn empty_reference_makes_no_request() {
        let calls = Cell::new(0);
        let api = |_: &[(&str, String)]| -> Result<Value, ApiError> {
            calls.set(calls.get() + 1);
            Ok(json!({}))
        };
        assert_eq!(resolve(&api, None), Ok(None));
        assert_eq!(resolve(&api, Some("")), Ok(None));
        assert_eq!(resolve(&api, Some("[[File:]]")), Ok(None));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn resolves_url() {
        let api = |params: &[(&str, String)]| -> Result<Value, ApiError> {
            assert!(params.contains(&("titles", "File:Rune sword.png".to_string())));
            Ok(json!({"query": {"pages": [{"title": "File:Rune sword.png", "imageinfo": [
                {"url": "https://oldschool.runescape.wiki/images/Rune_sword.png"}
            ]}]}}))
        };
        assert_eq!(
            resolve(&api, Some("[[File:Rune sword.png]]")),
            Ok(Some("https://oldschool.runescape.wiki/images/Rune_sword.png".to_string()))
        );
    }

    #[test]
    fn missing_file_is_none() {
        let api = |_: &[(&str, String)]| -> Result<Value, ApiError> {
            Ok(json!({"query": {"pages": [{"title": "File:Nope.png", "missing": true}]}}))
        };
        assert_eq!(resolve(&api, Some("Nope.png")), Ok(None));
    }

    #[test]
    fn page_without_url_is_none() {
        let api = |_: &[(&str, String)]| -> Result<Value, ApiError> {
            Ok(json!({"query": {"pages": [{"title": "File:X.png", "imageinfo": [{}]}]}}))
        };
        assert_eq!(resolve(&api, Some("X.png")), Ok(None));
    }

    #[test]
    fn transport_failure_is_error() {
        let api = |_: &[(&str, String)]| -> Result<Value, ApiError> {
            Err(ApiError::Transport("timeout".into()))
        };
        assert!(matches!(resolve(&api, Some("X.png")), Err(ApiError::Transport(_))));
    }
}
