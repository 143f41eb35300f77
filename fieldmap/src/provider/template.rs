//! URL-template tile provider.
//!
//! Most public slippy-map servers expose tiles under a templated URL such as
//! `https://tile.openstreetmap.org/{z}/{x}/{y}.png`. The template supports:
//!
//! - `{z}`, `{x}`, `{y}` - tile address (required)
//! - `{s}` - optional subdomain, rotated over `a`, `b`, `c` to spread load

use crate::coord::{TileKey, MAX_ZOOM, MIN_ZOOM};
use crate::provider::{HttpClient, Provider, ProviderError};

/// Default OpenStreetMap tile template.
pub const DEFAULT_TILE_URL: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";

const SUBDOMAINS: [&str; 3] = ["a", "b", "c"];

/// A validated tile URL template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileUrlTemplate {
    template: String,
}

impl TileUrlTemplate {
    /// Parses a template, requiring the `{z}`, `{x}` and `{y}` placeholders.
    pub fn parse(template: &str) -> Result<Self, ProviderError> {
        for placeholder in ["{z}", "{x}", "{y}"] {
            if !template.contains(placeholder) {
                return Err(ProviderError::InvalidTemplate(format!(
                    "'{}' is missing {}",
                    template, placeholder
                )));
            }
        }
        Ok(Self {
            template: template.to_string(),
        })
    }

    /// Builds the URL of one tile.
    pub fn build_url(&self, key: &TileKey) -> String {
        let server = SUBDOMAINS[((key.x as u64 + key.y as u64) % 3) as usize];
        self.template
            .replace("{s}", server)
            .replace("{z}", &key.zoom.to_string())
            .replace("{x}", &key.x.to_string())
            .replace("{y}", &key.y.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }
}

/// Provider that downloads tiles from a templated URL.
///
/// # Example
///
/// ```no_run
/// use fieldmap::provider::{ReqwestClient, TileUrlTemplate, UrlTemplateProvider};
///
/// let client = ReqwestClient::new("fieldmap/0.1").unwrap();
/// let template = TileUrlTemplate::parse("https://tile.openstreetmap.org/{z}/{x}/{y}.png").unwrap();
/// let provider = UrlTemplateProvider::new(client, template, "osm");
/// ```
pub struct UrlTemplateProvider<C: HttpClient> {
    http_client: C,
    template: TileUrlTemplate,
    name: String,
    min_zoom: u8,
    max_zoom: u8,
}

impl<C: HttpClient> UrlTemplateProvider<C> {
    /// Creates a provider serving zoom levels 0 to 18.
    pub fn new(http_client: C, template: TileUrlTemplate, name: impl Into<String>) -> Self {
        Self {
            http_client,
            template,
            name: name.into(),
            min_zoom: MIN_ZOOM,
            max_zoom: MAX_ZOOM,
        }
    }

    /// Restricts the zoom levels requested from the server.
    pub fn with_zoom_range(mut self, min_zoom: u8, max_zoom: u8) -> Self {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self
    }

    pub fn template(&self) -> &TileUrlTemplate {
        &self.template
    }
}

impl<C: HttpClient> Provider for UrlTemplateProvider<C> {
    fn download_tile(&self, key: &TileKey) -> Result<Vec<u8>, ProviderError> {
        if !self.supports_zoom(key.zoom) {
            return Err(ProviderError::UnsupportedZoom(key.zoom));
        }

        let url = self.template.build_url(key);
        self.http_client.get(&url)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn min_zoom(&self) -> u8 {
        self.min_zoom
    }

    fn max_zoom(&self) -> u8 {
        self.max_zoom
    }
}
