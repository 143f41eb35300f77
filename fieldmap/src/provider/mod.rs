//! Raster tile provider abstraction
//!
//! This module provides the network tier of the tile cache: a [`Provider`]
//! trait for downloading encoded tile images, an [`HttpClient`] seam so the
//! transport can be mocked in tests, and a [`UrlTemplateProvider`] for the
//! common `{z}/{x}/{y}` slippy-map servers.
//!
//! ```ignore
//! use fieldmap::provider::{ReqwestClient, TileUrlTemplate, UrlTemplateProvider};
//!
//! let client = ReqwestClient::new("fieldmap/0.1")?;
//! let template = TileUrlTemplate::parse("https://tile.openstreetmap.org/{z}/{x}/{y}.png")?;
//! let provider = UrlTemplateProvider::new(client, template, "osm");
//! ```

mod http;
mod template;
mod types;

pub use http::{HttpClient, ReqwestClient, DEFAULT_TIMEOUT_SECS};
pub use template::{TileUrlTemplate, UrlTemplateProvider, DEFAULT_TILE_URL};
pub use types::{Provider, ProviderError};

#[cfg(test)]
pub use http::tests::MockHttpClient;
