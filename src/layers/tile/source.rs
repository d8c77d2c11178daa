use super::types::TileKey;
use crate::core::constants::OSM_URL_TEMPLATE;

/// Produces the fetch URL for a tile
pub trait TileSource: Send + Sync {
    fn url(&self, key: TileKey) -> String;
}

impl<F> TileSource for F
where
    F: Fn(TileKey) -> String + Send + Sync,
{
    fn url(&self, key: TileKey) -> String {
        self(key)
    }
}

/// `{s}`, `{z}`, `{x}`, `{y}` URL template.
///
/// `{s}` rotates through the subdomains by `(x + y) % len`, so neighbouring
/// tiles spread over hosts while a given tile always maps to the same one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate {
    template: String,
    subdomains: Vec<String>,
}

impl UrlTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            subdomains: Vec::new(),
        }
    }

    pub fn with_subdomains<I, S>(mut self, subdomains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subdomains = subdomains.into_iter().map(Into::into).collect();
        self
    }

    /// Public OpenStreetMap tile servers
    pub fn openstreetmap() -> Self {
        Self::new(OSM_URL_TEMPLATE).with_subdomains(["a", "b", "c"])
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    fn subdomain(&self, key: &TileKey) -> &str {
        if self.subdomains.is_empty() {
            return "";
        }
        let index = (key.x + key.y).rem_euclid(self.subdomains.len() as i64) as usize;
        &self.subdomains[index]
    }
}

impl Default for UrlTemplate {
    fn default() -> Self {
        Self::openstreetmap()
    }
}

impl TileSource for UrlTemplate {
    fn url(&self, key: TileKey) -> String {
        self.template
            .replace("{s}", self.subdomain(&key))
            .replace("{z}", &key.z.to_string())
            .replace("{x}", &key.x.to_string())
            .replace("{y}", &key.y.to_string())
    }
}
