//! Distance measurement by dragging across the map.

use serde::{Deserialize, Serialize};

use crate::coord::{great_circle_distance, GeoPoint};

/// Points collected during one measuring drag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasurementSession {
    points: Vec<GeoPoint>,
    cumulative_distance: f64,
}

impl MeasurementSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a point and returns the length of the segment it closes.
    pub fn add_point(&mut self, point: GeoPoint) -> f64 {
        let segment = self
            .points
            .last()
            .map(|previous| great_circle_distance(previous, &point))
            .unwrap_or(0.0);
        self.cumulative_distance += segment;
        self.points.push(point);
        segment
    }

    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    /// Length of the path so far in meters.
    pub fn cumulative_distance(&self) -> f64 {
        self.cumulative_distance
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Hands out the collected path and resets the session.
    ///
    /// Returns `None` when no point was collected.
    pub fn finish(&mut self) -> Option<MeasurementResult> {
        if self.points.is_empty() {
            return None;
        }
        let session = std::mem::take(self);
        Some(MeasurementResult {
            points: session.points,
            total_distance_meters: session.cumulative_distance,
        })
    }
}

/// A completed measurement, delivered once per finished drag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementResult {
    pub points: Vec<GeoPoint>,
    pub total_distance_meters: f64,
}

/// Whether drags pan the map or measure.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum MeasureMode {
    #[default]
    Idle,
    Measuring(MeasurementSession),
}

impl MeasureMode {
    pub fn is_measuring(&self) -> bool {
        matches!(self, MeasureMode::Measuring(_))
    }

    pub fn session(&self) -> Option<&MeasurementSession> {
        match self {
            MeasureMode::Measuring(session) => Some(session),
            MeasureMode::Idle => None,
        }
    }

    pub fn session_mut(&mut self) -> Option<&mut MeasurementSession> {
        match self {
            MeasureMode::Measuring(session) => Some(session),
            MeasureMode::Idle => None,
        }
    }
}
