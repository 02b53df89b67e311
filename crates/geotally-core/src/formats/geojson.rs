//! GeoJSON reader and writer for point and region tables

use geo::{Centroid, MultiPolygon};
use geojson::{feature::Id, Feature, FeatureCollection, GeoJson, JsonObject};
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::aggregate::RegionSummary;
use crate::config::DEFAULT_REGION_ID_FIELDS;
use crate::error::{GeotallyError, Result};
use crate::formats::ADDRESS_FIELDS;
use crate::models::{normalize_key, AssignmentTable, Crs, PointTable, Region, RegionTable, StorePoint};

/// GeoJSON reader for point and region tables
#[derive(Debug, Clone)]
pub struct GeoJsonReader {
    region_id_fields: Vec<String>,
}

impl Default for GeoJsonReader {
    fn default() -> Self {
        Self { region_id_fields: DEFAULT_REGION_ID_FIELDS.iter().map(|f| f.to_string()).collect() }
    }
}

impl GeoJsonReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Property names tried, in order, for a region's identifier
    pub fn with_region_id_fields(mut self, fields: Vec<String>) -> Self {
        self.region_id_fields = fields;
        self
    }

    /// Read a point table from a file
    pub fn read_points(&self, path: &Path) -> Result<PointTable> {
        let table = self.points_from_str(&read_input(path)?)?;
        tracing::info!(path = %path.display(), count = table.len(), crs = %table.crs, "Loaded points");
        Ok(table)
    }

    /// Read a region table from a file
    pub fn read_regions(&self, path: &Path) -> Result<RegionTable> {
        let table = self.regions_from_str(&read_input(path)?)?;
        tracing::info!(path = %path.display(), count = table.len(), crs = %table.crs, "Loaded regions");
        Ok(table)
    }

    /// Parse a point table from GeoJSON text
    pub fn points_from_str(&self, content: &str) -> Result<PointTable> {
        let (features, crs) = parse_features(content)?;
        if features.is_empty() {
            return Err(GeotallyError::EmptyInput { what: "points".to_string() });
        }

        let points = features.iter().enumerate().map(|(idx, f)| convert_point(f, idx)).collect();
        Ok(PointTable::new(crs, points))
    }

    /// Parse a region table from GeoJSON text
    pub fn regions_from_str(&self, content: &str) -> Result<RegionTable> {
        let (features, crs) = parse_features(content)?;
        if features.is_empty() {
            return Err(GeotallyError::EmptyInput { what: "regions".to_string() });
        }

        let regions: Vec<Region> =
            features.iter().enumerate().map(|(idx, f)| self.convert_region(f, idx)).collect();

        for (i, region) in regions.iter().enumerate() {
            if regions[..i].iter().any(|r| r.id == region.id) {
                tracing::warn!(region = %region.id, "Duplicate region id; only the first is used for lookups");
            }
        }

        Ok(RegionTable::new(crs, regions))
    }

    /// Convert a GeoJSON feature to a region
    fn convert_region(&self, feature: &Feature, idx: usize) -> Region {
        let properties = feature.properties.clone().unwrap_or_default();

        let id = self
            .region_id_fields
            .iter()
            .find_map(|field| property_string(&properties, field))
            .map(|name| normalize_key(&name))
            .or_else(|| feature.id.as_ref().map(id_to_string))
            .unwrap_or_else(|| {
                tracing::warn!(
                    index = idx,
                    fields = ?self.region_id_fields,
                    "Region has no identifier property; using a positional name"
                );
                format!("REGION_{}", idx)
            });

        let geometry = match feature.geometry.as_ref().map(|g| geo::Geometry::<f64>::try_from(&g.value)) {
            Some(Ok(geo::Geometry::Polygon(polygon))) => MultiPolygon::new(vec![polygon]),
            Some(Ok(geo::Geometry::MultiPolygon(multi))) => multi,
            Some(Ok(other)) => {
                tracing::warn!(region = %id, kind = geometry_kind(&other), "Region geometry is not polygonal");
                MultiPolygon::new(vec![])
            }
            Some(Err(e)) => {
                tracing::warn!(region = %id, error = %e, "Region geometry could not be read");
                MultiPolygon::new(vec![])
            }
            None => {
                tracing::warn!(region = %id, "Region has no geometry");
                MultiPolygon::new(vec![])
            }
        };

        Region { id, geometry, properties }
    }
}

/// Convert a GeoJSON feature to a point record
fn convert_point(feature: &Feature, idx: usize) -> StorePoint {
    let properties = feature.properties.clone().unwrap_or_default();

    // Feature id, then an `id` property, then the position in the file
    let id = feature
        .id
        .as_ref()
        .map(id_to_string)
        .or_else(|| property_string(&properties, "id"))
        .unwrap_or_else(|| idx.to_string());

    let location = match feature.geometry.as_ref().map(|g| geo::Geometry::<f64>::try_from(&g.value)) {
        Some(Ok(geo::Geometry::Point(point))) => Some(point),
        Some(Ok(other)) => {
            tracing::debug!(point = %id, kind = geometry_kind(&other), "Using centroid of non-point geometry");
            other.centroid()
        }
        Some(Err(e)) => {
            tracing::warn!(point = %id, error = %e, "Point geometry could not be read");
            None
        }
        None => None,
    };

    let name = property_string(&properties, "name").unwrap_or_default();
    let address = ADDRESS_FIELDS.iter().find_map(|field| property_string(&properties, field));

    StorePoint { id, location, name, address, properties }
}

/// GeoJSON writer for augmented tables
#[derive(Debug, Clone, Default)]
pub struct GeoJsonWriter;

impl GeoJsonWriter {
    /// Write the point table, in its own CRS, with the assigned region of each point
    pub fn write_points(
        &self,
        path: &Path,
        points: &PointTable,
        assignments: &AssignmentTable,
    ) -> Result<()> {
        let features = points
            .points
            .iter()
            .enumerate()
            .map(|(idx, point)| {
                let mut properties = point.properties.clone();
                if let Some(assignment) = assignments.get(idx) {
                    properties.insert("region_id".to_string(), Value::from(assignment.region_id.clone()));
                    properties.insert(
                        "assignment_method".to_string(),
                        Value::from(assignment.method.as_str()),
                    );
                }

                Feature {
                    bbox: None,
                    geometry: point
                        .location
                        .as_ref()
                        .map(|p| geojson::Geometry::new(geojson::Value::from(p))),
                    id: Some(Id::String(point.id.clone())),
                    properties: Some(properties),
                    foreign_members: None,
                }
            })
            .collect();

        write_collection(path, features, &points.crs)?;
        tracing::info!(path = %path.display(), count = points.len(), "Wrote assigned points");
        Ok(())
    }

    /// Write the region table with its counts and attributes
    pub fn write_regions(
        &self,
        path: &Path,
        regions: &RegionTable,
        summaries: &[RegionSummary],
    ) -> Result<()> {
        let features = regions
            .regions
            .iter()
            .enumerate()
            .map(|(index, region)| {
                let mut properties = region.properties.clone();
                properties.insert("region_id".to_string(), Value::from(region.id.clone()));

                // Summaries are in canonical region order, so duplicate ids stay apart
                if let Some(summary) = summaries.get(index) {
                    properties.insert("point_count".to_string(), Value::from(summary.point_count));
                    properties.insert("address_count".to_string(), Value::from(summary.address_count));
                    properties.insert("winning_party".to_string(), Value::from(summary.party()));
                    if let Some(attributes) = &summary.attributes {
                        properties.insert("total_votes".to_string(), Value::from(attributes.total_votes));
                        properties.insert("vote_share".to_string(), Value::from(attributes.vote_share));
                        if let Some(turnout) = attributes.turnout {
                            properties.insert("turnout".to_string(), Value::from(turnout));
                        }
                    }
                }

                Feature {
                    bbox: None,
                    geometry: (!region.geometry.0.is_empty())
                        .then(|| geojson::Geometry::new(geojson::Value::from(&region.geometry))),
                    id: Some(Id::String(region.id.clone())),
                    properties: Some(properties),
                    foreign_members: None,
                }
            })
            .collect();

        write_collection(path, features, &regions.crs)?;
        tracing::info!(path = %path.display(), count = regions.len(), "Wrote region summaries");
        Ok(())
    }
}

fn read_input(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => GeotallyError::MissingInput { path: path.to_path_buf() },
        _ => GeotallyError::Io(e),
    })
}

fn write_collection(path: &Path, features: Vec<Feature>, crs: &Crs) -> Result<()> {
    // EPSG:4326 is the GeoJSON default and needs no crs member
    let foreign_members = (crs.epsg != 4326).then(|| {
        let mut members = JsonObject::new();
        members.insert(
            "crs".to_string(),
            serde_json::json!({
                "type": "name",
                "properties": { "name": format!("urn:ogc:def:crs:EPSG::{}", crs.epsg) }
            }),
        );
        members
    });

    let collection = FeatureCollection { bbox: None, features, foreign_members };
    let json = serde_json::to_string_pretty(&collection)
        .map_err(|e| GeotallyError::Serialization(e.to_string()))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, json)?;
    Ok(())
}

/// Extract features and CRS from GeoJSON text
fn parse_features(content: &str) -> Result<(Vec<Feature>, Crs)> {
    let geojson: GeoJson = content.parse().map_err(|e: geojson::Error| GeotallyError::Format {
        format: "GeoJSON".to_string(),
        reason: format!("Failed to parse GeoJSON: {}", e),
    })?;

    match geojson {
        GeoJson::FeatureCollection(fc) => {
            // Extract CRS (default to WGS84 if not specified)
            let epsg = fc
                .foreign_members
                .as_ref()
                .and_then(|fm| fm.get("crs"))
                .and_then(extract_epsg_from_crs)
                .unwrap_or(4326);
            Ok((fc.features, Crs::from_epsg(epsg)))
        }
        GeoJson::Feature(feature) => Ok((vec![feature], Crs::wgs84())),
        GeoJson::Geometry(_) => Err(GeotallyError::Format {
            format: "GeoJSON".to_string(),
            reason: "Expected a Feature or FeatureCollection, found a bare geometry".to_string(),
        }),
    }
}

/// Extract EPSG code from a legacy CRS object
fn extract_epsg_from_crs(crs: &Value) -> Option<u32> {
    let name = crs.get("properties")?.get("name")?.as_str()?;
    // OGC CRS84 is lon/lat WGS 84
    if name.ends_with("CRS84") {
        return Some(4326);
    }
    // Parse "EPSG:4326" or "urn:ogc:def:crs:EPSG::4326"
    name.split(':').next_back()?.parse().ok()
}

fn id_to_string(id: &Id) -> String {
    match id {
        Id::String(s) => s.clone(),
        Id::Number(n) => n.to_string(),
    }
}

/// Read a property as a non-empty string, stringifying numbers
fn property_string(properties: &JsonObject, key: &str) -> Option<String> {
    match properties.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn geometry_kind(geometry: &geo::Geometry<f64>) -> &'static str {
    match geometry {
        geo::Geometry::Point(_) => "Point",
        geo::Geometry::Line(_) => "Line",
        geo::Geometry::LineString(_) => "LineString",
        geo::Geometry::Polygon(_) => "Polygon",
        geo::Geometry::MultiPoint(_) => "MultiPoint",
        geo::Geometry::MultiLineString(_) => "MultiLineString",
        geo::Geometry::MultiPolygon(_) => "MultiPolygon",
        geo::Geometry::GeometryCollection(_) => "GeometryCollection",
        geo::Geometry::Rect(_) => "Rect",
        geo::Geometry::Triangle(_) => "Triangle",
    }
}
