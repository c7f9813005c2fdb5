//! Coordinate aggregation.
//!
//! Collapses a raw list of event coordinates into the distinct points and
//! how often each one occurred. Distinct points keep first-seen order so the
//! precise renderer draws markers in a stable order.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::error::{HeatmapError, HeatmapResult};

/// A single event position in map coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Hashable identity. `-0.0` and `0.0` collapse to the same key.
    fn key(&self) -> (u64, u64) {
        ((self.x + 0.0).to_bits(), (self.y + 0.0).to_bits())
    }
}

/// Distinct points with a parallel list of occurrence counts.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedPoints {
    points: Vec<Point>,
    frequencies: Vec<u32>,
}

impl AggregatedPoints {
    /// Distinct points in first-seen order.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// `frequencies()[i]` is the number of times `points()[i]` appeared.
    pub fn frequencies(&self) -> &[u32] {
        &self.frequencies
    }

    /// Number of distinct points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of input records that were aggregated.
    pub fn total_count(&self) -> u64 {
        self.frequencies.iter().map(|&f| f as u64).sum()
    }

    pub fn xs(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.x).collect()
    }

    pub fn ys(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.y).collect()
    }

    /// Iterate `(point, frequency)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (Point, u32)> + '_ {
        self.points.iter().copied().zip(self.frequencies.iter().copied())
    }
}

/// Aggregate raw JSON coordinate records.
///
/// Every record must be an object with numeric `x` and `y` members. The
/// offending record is quoted in the error so callers can report it.
pub fn aggregate(records: &[Value]) -> HeatmapResult<AggregatedPoints> {
    let points = records
        .iter()
        .enumerate()
        .map(|(i, record)| parse_record(i, record))
        .collect::<HeatmapResult<Vec<_>>>()?;

    aggregate_points(&points)
}

/// Aggregate already-typed points.
pub fn aggregate_points(points: &[Point]) -> HeatmapResult<AggregatedPoints> {
    if points.is_empty() {
        return Err(HeatmapError::InvalidCoordinates(
            "at least one coordinate is required".to_string(),
        ));
    }

    let mut index: HashMap<(u64, u64), usize> = HashMap::with_capacity(points.len());
    let mut distinct = Vec::new();
    let mut frequencies: Vec<u32> = Vec::new();

    for point in points {
        match index.get(&point.key()) {
            Some(&i) => frequencies[i] += 1,
            None => {
                index.insert(point.key(), distinct.len());
                distinct.push(*point);
                frequencies.push(1);
            }
        }
    }

    Ok(AggregatedPoints {
        points: distinct,
        frequencies,
    })
}

fn parse_record(i: usize, record: &Value) -> HeatmapResult<Point> {
    let obj = record.as_object().ok_or_else(|| {
        HeatmapError::InvalidCoordinates(format!("record {} ({}) is not an object", i, record))
    })?;

    let field = |name: &str| {
        obj.get(name).and_then(Value::as_f64).ok_or_else(|| {
            HeatmapError::InvalidCoordinates(format!(
                "record {} ({}) is missing numeric field '{}'",
                i, record, name
            ))
        })
    };

    Ok(Point::new(field("x")?, field("y")?))
}
