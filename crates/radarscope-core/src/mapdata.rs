// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Loading static map geometry.
//!
//! Two formats are understood, both optionally gzip-compressed (`.gz`):
//!
//! - a packed binary polyline file: little-endian `f32` pairs of
//!   `(longitude, latitude)`, where a `(0, 0)` pair ends the current polyline
//! - GeoJSON (`.json` / `.geojson`) with line and polygon geometries, given
//!   bare, as a Feature, or as a FeatureCollection

use std::fs;
use std::io::Read;
use std::path::Path;

use flate2::read::GzDecoder;
use log::info;
use serde::Deserialize;
use thiserror::Error;

use crate::geo::{GeoPoint, LineSegment};

/// Errors that can occur while loading map data.
#[derive(Debug, Error)]
pub enum MapDataError {
    #[error("failed to read map data: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid GeoJSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed map data: {0}")]
    Format(String),

    #[error("map data contains no line segments")]
    Empty,
}

/// Load every line segment from a map file, picking the format from its
/// extension.
pub fn load_map_file(path: &Path) -> Result<Vec<LineSegment>, MapDataError> {
    let raw = fs::read(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let (bytes, name) = match name.strip_suffix(".gz") {
        Some(inner) => (decompress(&raw)?, inner.to_string()),
        None => (raw, name),
    };

    let segments = if name.ends_with(".json") || name.ends_with(".geojson") {
        let text = String::from_utf8(bytes)
            .map_err(|e| MapDataError::Format(format!("not UTF-8: {e}")))?;
        parse_geojson(&text)?
    } else {
        parse_binary(&bytes)?
    };

    info!("Loaded {} map segments from {}", segments.len(), path.display());
    Ok(segments)
}

/// Inflate gzip data.
pub fn decompress(bytes: &[u8]) -> Result<Vec<u8>, MapDataError> {
    let mut decoder = GzDecoder::new(bytes);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

/// Parse the packed binary polyline format.
pub fn parse_binary(bytes: &[u8]) -> Result<Vec<LineSegment>, MapDataError> {
    if bytes.len() % 8 != 0 {
        return Err(MapDataError::Format(format!(
            "{} bytes is not a whole number of coordinate pairs",
            bytes.len()
        )));
    }

    let mut segments = Vec::new();
    let mut polyline: Vec<GeoPoint> = Vec::new();
    for pair in bytes.chunks_exact(8) {
        let lon = f32::from_le_bytes([pair[0], pair[1], pair[2], pair[3]]);
        let lat = f32::from_le_bytes([pair[4], pair[5], pair[6], pair[7]]);
        if lon == 0.0 && lat == 0.0 {
            push_polyline(&polyline, &mut segments);
            polyline.clear();
        } else {
            polyline.push(GeoPoint::new(f64::from(lat), f64::from(lon)));
        }
    }
    push_polyline(&polyline, &mut segments);

    non_empty(segments)
}

// A GeoJSON position: [lon, lat] with an optional altitude.
type Position = Vec<f64>;

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum GeoJson {
    FeatureCollection {
        features: Vec<GeoJson>,
    },
    Feature {
        geometry: Option<Box<GeoJson>>,
    },
    GeometryCollection {
        geometries: Vec<GeoJson>,
    },
    LineString {
        coordinates: Vec<Position>,
    },
    MultiLineString {
        coordinates: Vec<Vec<Position>>,
    },
    Polygon {
        coordinates: Vec<Vec<Position>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<Position>>>,
    },
    // points carry no line geometry
    #[serde(other)]
    Other,
}

/// Parse GeoJSON line and polygon geometries into segments.
pub fn parse_geojson(text: &str) -> Result<Vec<LineSegment>, MapDataError> {
    let doc: GeoJson = serde_json::from_str(text)?;
    let mut segments = Vec::new();
    collect(&doc, &mut segments)?;
    non_empty(segments)
}

fn collect(doc: &GeoJson, out: &mut Vec<LineSegment>) -> Result<(), MapDataError> {
    match doc {
        GeoJson::FeatureCollection { features } => {
            for feature in features {
                collect(feature, out)?;
            }
        }
        GeoJson::Feature { geometry } => {
            if let Some(geometry) = geometry {
                collect(geometry, out)?;
            }
        }
        GeoJson::GeometryCollection { geometries } => {
            for geometry in geometries {
                collect(geometry, out)?;
            }
        }
        GeoJson::LineString { coordinates } => push_line(coordinates, false, out)?,
        GeoJson::MultiLineString { coordinates } => {
            for line in coordinates {
                push_line(line, false, out)?;
            }
        }
        GeoJson::Polygon { coordinates } => {
            for ring in coordinates {
                push_line(ring, true, out)?;
            }
        }
        GeoJson::MultiPolygon { coordinates } => {
            for ring in coordinates.iter().flatten() {
                push_line(ring, true, out)?;
            }
        }
        GeoJson::Other => {}
    }
    Ok(())
}

fn push_line(positions: &[Position], closed: bool, out: &mut Vec<LineSegment>) -> Result<(), MapDataError> {
    let mut points = positions
        .iter()
        .map(|p| match p.as_slice() {
            [lon, lat, ..] => Ok(GeoPoint::new(*lat, *lon)),
            _ => Err(MapDataError::Format(format!("position {p:?} needs two coordinates"))),
        })
        .collect::<Result<Vec<_>, _>>()?;

    if closed && points.len() > 2 && points.first() != points.last() {
        points.push(points[0]);
    }
    push_polyline(&points, out);
    Ok(())
}

fn push_polyline(points: &[GeoPoint], out: &mut Vec<LineSegment>) {
    out.extend(
        points
            .windows(2)
            .filter(|w| w[0] != w[1])
            .map(|w| LineSegment::new(w[0], w[1])),
    );
}

fn non_empty(segments: Vec<LineSegment>) -> Result<Vec<LineSegment>, MapDataError> {
    if segments.is_empty() {
        Err(MapDataError::Empty)
    } else {
        Ok(segments)
    }
}
