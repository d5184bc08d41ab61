//! Worker-side annotation geometry.
//!
//! Pure functions over route geometry: partitioning raw segment features
//! into distinct chunks, clipping chunks against a viewport, and picking one
//! representative anchor point per surviving chunk. Everything here is
//! synchronous and allocation-only so it can run behind either engine role.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::geo::{BBox, LngLat};
use crate::route::types::SegmentFeature;

/// Rounding scale for coordinate identity. Two vertices within ~0.11 m of
/// each other collapse to the same key.
const COORD_KEY_SCALE: f64 = 1e6;

/// One distinct navigable line, the unit that receives an annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub coordinates: Vec<LngLat>,
    pub route_index: u32,
    pub waypoint_index: u32,
}

/// Which side of the anchor point the annotation should extend from,
/// relative to the viewport. Lets the host place a popup that stays
/// on-screen near clipped edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnchorSide {
    Top,
    Bottom,
    Left,
    Right,
}

/// A candidate anchor before main-side hit-testing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorCandidate {
    pub position: LngLat,
    pub anchor: AnchorSide,
    /// Index of the source chunk within the engine's chunk list.
    pub chunk_index: usize,
}

/// Result of one placement pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlacementResult {
    pub points: Vec<AnchorCandidate>,
    /// True when every chunk survived clipping, i.e. the viewport covered
    /// all of them.
    pub all_in_bbox: bool,
}

fn coord_key(coord: LngLat) -> (i64, i64) {
    (
        (coord.lng * COORD_KEY_SCALE).round() as i64,
        (coord.lat * COORD_KEY_SCALE).round() as i64,
    )
}

/// Partitions raw segment features into distinct chunks.
///
/// Alternative routes share long common stretches; annotating each raw
/// feature would stack labels on top of each other. Vertices already claimed
/// by an earlier feature are skipped, so every chunk represents geometry no
/// other chunk covers. A run may start on a shared vertex to stay connected
/// to the junction it branches from.
pub fn distinct_segments(features: &[SegmentFeature]) -> Vec<Chunk> {
    let mut seen: HashSet<(i64, i64)> = HashSet::new();
    let mut chunks = Vec::new();

    for feature in features {
        let mut run: Vec<LngLat> = Vec::new();

        for &coord in &feature.coordinates {
            let key = coord_key(coord);
            if seen.contains(&key) {
                flush_run(&mut run, feature, &mut chunks);
                run.push(coord);
            } else {
                seen.insert(key);
                run.push(coord);
            }
        }
        flush_run(&mut run, feature, &mut chunks);
    }

    chunks
}

fn flush_run(run: &mut Vec<LngLat>, source: &SegmentFeature, chunks: &mut Vec<Chunk>) {
    // A run of one vertex carries no line to annotate.
    if run.len() >= 2 {
        chunks.push(Chunk {
            coordinates: std::mem::take(run),
            route_index: source.route_index,
            waypoint_index: source.waypoint_index,
        });
    } else {
        run.clear();
    }
}

/// Clips a polyline against a bounding box, returning the contiguous parts
/// that remain inside. Parts preserve coordinate order; an empty result
/// means the line misses the box entirely.
pub fn clip_to_bbox(coordinates: &[LngLat], bbox: &BBox) -> Vec<Vec<LngLat>> {
    let mut parts: Vec<Vec<LngLat>> = Vec::new();
    let mut current: Vec<LngLat> = Vec::new();

    for window in coordinates.windows(2) {
        match clip_segment(window[0], window[1], bbox) {
            Some((start, end)) => {
                let continues = current
                    .last()
                    .is_some_and(|last| coord_key(*last) == coord_key(start));
                if !continues {
                    if current.len() >= 2 {
                        parts.push(std::mem::take(&mut current));
                    } else {
                        current.clear();
                    }
                    current.push(start);
                }
                current.push(end);
            }
            None => {
                if current.len() >= 2 {
                    parts.push(std::mem::take(&mut current));
                } else {
                    current.clear();
                }
            }
        }
    }
    if current.len() >= 2 {
        parts.push(current);
    }

    parts
}

/// Liang–Barsky clip of a single segment. Returns the clipped endpoints or
/// `None` when the segment lies fully outside.
fn clip_segment(a: LngLat, b: LngLat, bbox: &BBox) -> Option<(LngLat, LngLat)> {
    let dx = b.lng - a.lng;
    let dy = b.lat - a.lat;
    let mut t0 = 0.0_f64;
    let mut t1 = 1.0_f64;

    let edges = [
        (-dx, a.lng - bbox.west),
        (dx, bbox.east - a.lng),
        (-dy, a.lat - bbox.south),
        (dy, bbox.north - a.lat),
    ];

    for (p, q) in edges {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
        } else {
            let r = q / p;
            if p < 0.0 {
                if r > t1 {
                    return None;
                }
                if r > t0 {
                    t0 = r;
                }
            } else {
                if r < t0 {
                    return None;
                }
                if r < t1 {
                    t1 = r;
                }
            }
        }
    }

    let at = |t: f64| LngLat::new(a.lng + dx * t, a.lat + dy * t);
    Some((at(t0), at(t1)))
}

/// One placement pass: clip every chunk against the viewport and derive one
/// representative anchor per surviving chunk.
///
/// "No chunks" and "nothing in the viewport" are normal empty results.
pub fn place_annotations(chunks: &[Chunk], viewport: &BBox) -> PlacementResult {
    let mut points = Vec::new();

    for (chunk_index, chunk) in chunks.iter().enumerate() {
        let parts = clip_to_bbox(&chunk.coordinates, viewport);
        if let Some((position, anchor)) = representative_anchor(&parts, viewport) {
            points.push(AnchorCandidate {
                position,
                anchor,
                chunk_index,
            });
        }
    }

    let all_in_bbox = points.len() == chunks.len();
    PlacementResult { points, all_in_bbox }
}

/// Middle vertex of the longest clipped part, plus the side the annotation
/// should extend toward so it leans away from the nearest viewport edge.
fn representative_anchor(parts: &[Vec<LngLat>], viewport: &BBox) -> Option<(LngLat, AnchorSide)> {
    let longest = parts.iter().max_by_key(|part| part.len())?;
    let position = longest[longest.len() / 2];

    let center = viewport.center();
    let dlng = position.lng - center.lng;
    let dlat = position.lat - center.lat;
    let width = (viewport.east - viewport.west).max(f64::EPSILON);
    let height = (viewport.north - viewport.south).max(f64::EPSILON);

    // Dominant axis in viewport-relative terms decides the side.
    let side = if (dlng / width).abs() >= (dlat / height).abs() {
        if dlng >= 0.0 {
            AnchorSide::Right
        } else {
            AnchorSide::Left
        }
    } else if dlat >= 0.0 {
        AnchorSide::Top
    } else {
        AnchorSide::Bottom
    };

    Some((position, side))
}
