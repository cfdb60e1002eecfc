//! GeoJSON in and out.
//!
//! Line work comes in as `LineString`, `MultiLineString` and polygon rings;
//! each coordinate run becomes one line feature. Points come in as point
//! features, or as labels when they carry a `"label"` property. Polygons go
//! out with their islands as interior rings.

use geo_types::{Coord, LineString, Polygon};
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, JsonValue, Value};
use slotmap::Key;

use crate::error::{Result, TopologyError};
use crate::geometry::LineShape;
use crate::graph::islands;
use crate::map::TopologyMap;
use crate::model::{LineId, TerminalId};

/// Counts of what an import added.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub points: usize,
    pub lines: usize,
    pub labels: usize,
    /// Geometries that were degenerate or refused by the map.
    pub skipped: usize,
}

struct Options<'a> {
    topological: bool,
    label: Option<&'a str>,
}

/// Adds every feature of `geojson` to the map. Rejected features are
/// skipped and counted; any other failure stops the import. The map is not
/// settled.
pub fn import(map: &mut TopologyMap, geojson: &GeoJson) -> Result<ImportSummary> {
    let mut summary = ImportSummary::default();
    match geojson {
        GeoJson::FeatureCollection(collection) => {
            for feature in &collection.features {
                import_feature(map, feature, &mut summary)?;
            }
        }
        GeoJson::Feature(feature) => import_feature(map, feature, &mut summary)?,
        GeoJson::Geometry(geometry) => {
            let options = Options {
                topological: true,
                label: None,
            };
            import_geometry(map, geometry, &options, &mut summary)?;
        }
    }
    log::debug!(
        "imported {} point(s), {} line(s), {} label(s); skipped {}",
        summary.points,
        summary.lines,
        summary.labels,
        summary.skipped
    );
    Ok(summary)
}

fn import_feature(map: &mut TopologyMap, feature: &Feature, summary: &mut ImportSummary) -> Result<()> {
    let Some(geometry) = &feature.geometry else {
        return Ok(());
    };
    let options = Options {
        topological: feature
            .property("topological")
            .and_then(JsonValue::as_bool)
            .unwrap_or(true),
        label: feature.property("label").and_then(JsonValue::as_str),
    };
    import_geometry(map, geometry, &options, summary)
}

fn import_geometry(
    map: &mut TopologyMap,
    geometry: &Geometry,
    options: &Options,
    summary: &mut ImportSummary,
) -> Result<()> {
    match &geometry.value {
        Value::Point(position) => import_point(map, position, options, summary)?,
        Value::MultiPoint(points) => {
            for position in points {
                import_point(map, position, options, summary)?;
            }
        }
        Value::LineString(run) => import_run(map, run, options, summary)?,
        Value::MultiLineString(runs) | Value::Polygon(runs) => {
            for run in runs {
                import_run(map, run, options, summary)?;
            }
        }
        Value::MultiPolygon(polygons) => {
            for run in polygons.iter().flatten() {
                import_run(map, run, options, summary)?;
            }
        }
        Value::GeometryCollection(members) => {
            for member in members {
                import_geometry(map, member, options, summary)?;
            }
        }
    }
    Ok(())
}

fn to_coord(position: &[f64]) -> Option<Coord<f64>> {
    match position {
        [x, y, ..] => Some(Coord { x: *x, y: *y }),
        _ => None,
    }
}

fn import_point(
    map: &mut TopologyMap,
    position: &[f64],
    options: &Options,
    summary: &mut ImportSummary,
) -> Result<()> {
    let Some(position) = to_coord(position) else {
        summary.skipped += 1;
        return Ok(());
    };
    let added = match options.label {
        Some(text) => map.add_label(position, text).map(|_| true),
        None => map.add_point(position).map(|_| false),
    };
    match added {
        Ok(true) => summary.labels += 1,
        Ok(false) => summary.points += 1,
        Err(err) => skip(err, summary)?,
    }
    Ok(())
}

fn import_run(
    map: &mut TopologyMap,
    run: &[Vec<f64>],
    options: &Options,
    summary: &mut ImportSummary,
) -> Result<()> {
    let tolerance = map.config().length_tolerance;
    let mut coords: Vec<Coord<f64>> = Vec::with_capacity(run.len());
    for position in run {
        let Some(c) = to_coord(position) else {
            summary.skipped += 1;
            return Ok(());
        };
        let repeated = coords
            .last()
            .map_or(false, |last| (c.x - last.x).hypot(c.y - last.y) <= tolerance);
        if !repeated {
            coords.push(c);
        }
    }
    let closed = coords.len() > 2 && {
        let (first, last) = (coords[0], coords[coords.len() - 1]);
        (first.x - last.x).hypot(first.y - last.y) <= tolerance
    };
    // a closed run needs three distinct corners to enclose anything
    if coords.len() < 2 || (closed && coords.len() < 4) {
        summary.skipped += 1;
        return Ok(());
    }

    match add_run(map, &coords, closed, options.topological) {
        Ok(_) => summary.lines += 1,
        Err(err) => skip(err, summary)?,
    }
    Ok(())
}

/// Adds a run as one line. On failure, end points this run created are
/// removed again.
fn add_run(
    map: &mut TopologyMap,
    coords: &[Coord<f64>],
    closed: bool,
    topological: bool,
) -> Result<LineId> {
    let mut fresh = Vec::with_capacity(2);
    let added = add_run_line(map, coords, closed, topological, &mut fresh);
    if matches!(&added, Err(err) if !err.is_fatal()) {
        for id in fresh {
            map.delete_point(id)?;
        }
    }
    added
}

fn add_run_line(
    map: &mut TopologyMap,
    coords: &[Coord<f64>],
    closed: bool,
    topological: bool,
    fresh: &mut Vec<TerminalId>,
) -> Result<LineId> {
    let start = add_end(map, coords[0], fresh)?;
    let end = if closed {
        start
    } else {
        add_end(map, coords[coords.len() - 1], fresh)?
    };
    let interior = coords[1..coords.len() - 1].to_vec();
    let shape = if interior.is_empty() {
        LineShape::Segment
    } else {
        LineShape::MultiSegment(interior)
    };
    map.add_line(start, end, shape, topological)
}

/// The point feature at `position`, recorded in `fresh` unless a point
/// feature was already there.
fn add_end(
    map: &mut TopologyMap,
    position: Coord<f64>,
    fresh: &mut Vec<TerminalId>,
) -> Result<TerminalId> {
    let existing = map
        .index()
        .find_terminal(position, map.tolerance())
        .and_then(|t| map.terminal(t))
        .map_or(false, |t| t.is_point());
    let id = map.add_point(position)?;
    if !existing {
        fresh.push(id);
    }
    Ok(id)
}

fn skip(err: TopologyError, summary: &mut ImportSummary) -> Result<()> {
    if err.is_fatal() {
        return Err(err);
    }
    log::warn!("skipping feature: {}", err);
    summary.skipped += 1;
    Ok(())
}

/// Every polygon as a feature, islands as interior rings.
pub fn export_polygons(map: &TopologyMap) -> FeatureCollection {
    let features = map
        .polygons()
        .filter_map(|(id, ring)| {
            let exterior = islands::outline(map, id)?;
            let interiors: Vec<LineString<f64>> = ring
                .islands()
                .iter()
                .filter_map(|island| islands::outline(map, *island))
                .collect();
            let polygon = Polygon::new(exterior, interiors);

            let labels: Vec<JsonValue> = map
                .labels_of(id)
                .iter()
                .filter_map(|label| map.label(*label))
                .map(|label| JsonValue::from(label.text.clone()))
                .collect();
            let mut properties = JsonObject::new();
            properties.insert("id".to_string(), JsonValue::from(id.data().as_ffi()));
            properties.insert("area".to_string(), JsonValue::from(ring.area));
            properties.insert(
                "net_area".to_string(),
                JsonValue::from(map.net_area(id).unwrap_or(ring.area)),
            );
            properties.insert("labels".to_string(), JsonValue::Array(labels));

            Some(Feature {
                bbox: None,
                geometry: Some(Geometry::new(Value::from(&polygon))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            })
        })
        .collect();
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}
