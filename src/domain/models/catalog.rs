use serde::Deserialize;

/// Response envelope used by the catalog endpoints.
#[derive(Debug, Deserialize)]
pub struct CatalogEnvelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    pub id: i64,
    #[serde(alias = "name", default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(alias = "location", default)]
    pub venue: String,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CarouselItem {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AboutSection {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: Option<String>,
}

/// Join an image path returned by the catalog with the backend origin.
///
/// The backend emits either absolute URLs or root-relative paths; a single
/// leading slash is stripped so the join never produces a double slash.
pub fn resolve_asset_url(base_origin: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    let relative = path.strip_prefix('/').unwrap_or(path);
    format!("{}/{}", base_origin.trim_end_matches('/'), relative)
}
