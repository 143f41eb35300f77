//! fieldmap - slippy-map engine for field-mapping clients
//!
//! This library provides the map core of a field-mapping application:
//! a three-tier tile cache (memory, disk, network) with deduplicated
//! background fetches, Web-Mercator coordinate math, an interactive
//! viewport with distance measurement, and a frame renderer that composes
//! tiles, overlays and markers.
//!
//! The usual entry point is [`session::MapSession`].

pub mod cache;
pub mod config;
pub mod coord;
pub mod logging;
pub mod provider;
pub mod render;
pub mod session;
pub mod signal;
pub mod viewport;
