//! File-level tests for the GeoJSON reader and writer

use geo::{polygon, MultiPolygon, Point};
use geotally_core::aggregate::{count_by_region, join_attributes};
use geotally_core::attributes::AttributeTable;
use geotally_core::formats::{GeoJsonReader, GeoJsonWriter};
use geotally_core::models::{
    Assignment, AssignmentMethod, AssignmentTable, Crs, PointTable, Region, RegionTable, StorePoint,
};
use geotally_core::GeotallyError;
use std::fs;
use tempfile::TempDir;

fn square(id: &str, x0: f64) -> Region {
    let poly = polygon![
        (x: x0, y: 0.0),
        (x: x0 + 10.0, y: 0.0),
        (x: x0 + 10.0, y: 10.0),
        (x: x0, y: 10.0),
        (x: x0, y: 0.0),
    ];
    Region::new(id, MultiPolygon::new(vec![poly]))
}

#[test]
fn test_missing_file_is_missing_input() {
    let temp_dir = TempDir::new().unwrap();
    let err = GeoJsonReader::new().read_points(&temp_dir.path().join("nope.geojson")).unwrap_err();
    assert!(matches!(err, GeotallyError::MissingInput { .. }));
}

#[test]
fn test_points_written_with_assignments_and_crs() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("out").join("points.geojson");

    let points = PointTable::new(
        Crs::web_mercator(),
        vec![
            StorePoint::new("a", Some(Point::new(5.0, 5.0))).with_name("Tienda A"),
            StorePoint::new("b", None),
        ],
    );
    let assignments = AssignmentTable::from_entries(vec![
        Assignment {
            point_id: "a".into(),
            region_index: 0,
            region_id: "NORTE".into(),
            method: AssignmentMethod::Containment,
            candidates: 1,
        },
        Assignment {
            point_id: "b".into(),
            region_index: 0,
            region_id: "NORTE".into(),
            method: AssignmentMethod::DefaultRegion,
            candidates: 0,
        },
    ]);

    GeoJsonWriter.write_points(&path, &points, &assignments).unwrap();

    // The writer's output reads back through the reader
    let read_back = GeoJsonReader::new().read_points(&path).unwrap();
    assert_eq!(read_back.crs.epsg, 3857);
    assert_eq!(read_back.len(), 2);
    assert_eq!(read_back.points[0].id, "a");
    assert_eq!(read_back.points[0].location, Some(Point::new(5.0, 5.0)));
    assert_eq!(read_back.points[1].location, None);
    assert_eq!(read_back.points[1].properties["assignment_method"], "default-region");
    assert_eq!(read_back.points[0].properties["region_id"], "NORTE");
}

#[test]
fn test_regions_written_with_counts_and_attributes() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("regions.geojson");

    let regions = RegionTable::new(Crs::wgs84(), vec![square("NORTE", 0.0), square("SUR", 20.0)]);
    let points = vec![StorePoint::new("a", None).with_address("Calle 1"), StorePoint::new("b", None)];
    let assignments = AssignmentTable::from_entries(
        ["a", "b"]
            .iter()
            .map(|id| Assignment {
                point_id: id.to_string(),
                region_index: 1,
                region_id: "SUR".into(),
                method: AssignmentMethod::NearestCentroid,
                candidates: 0,
            })
            .collect(),
    );
    let attributes = AttributeTable::from_toml_str(
        r#"
[regions.sur]
winning_party = "MORENA"
total_votes = 1000
vote_share = 51.5
"#,
    )
    .unwrap();

    let summaries =
        join_attributes(count_by_region(&regions, &points, &assignments), Some(&attributes));
    GeoJsonWriter.write_regions(&path, &regions, &summaries).unwrap();

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    // WGS 84 needs no crs member
    assert!(json.get("crs").is_none());

    let features = json["features"].as_array().unwrap();
    assert_eq!(features.len(), 2);
    assert_eq!(features[0]["properties"]["point_count"], 0);
    assert_eq!(features[0]["properties"]["winning_party"], "No data");
    assert_eq!(features[1]["properties"]["point_count"], 2);
    assert_eq!(features[1]["properties"]["address_count"], 1);
    assert_eq!(features[1]["properties"]["winning_party"], "MORENA");
    assert_eq!(features[1]["properties"]["total_votes"], 1000);

    let read_back = GeoJsonReader::new()
        .with_region_id_fields(vec!["region_id".into()])
        .read_regions(&path)
        .unwrap();
    assert_eq!(read_back.ids().collect::<Vec<_>>(), vec!["NORTE", "SUR"]);
}

#[test]
fn test_duplicate_region_ids_keep_their_own_counts() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("regions.geojson");

    let regions = RegionTable::new(Crs::wgs84(), vec![square("DUP", 0.0), square("DUP", 20.0)]);
    let points: Vec<StorePoint> = (0..3).map(|i| StorePoint::new(format!("p{}", i), None)).collect();
    let assignments = AssignmentTable::from_entries(
        [0usize, 0, 1]
            .iter()
            .enumerate()
            .map(|(i, index)| Assignment {
                point_id: format!("p{}", i),
                region_index: *index,
                region_id: "DUP".into(),
                method: AssignmentMethod::Containment,
                candidates: 1,
            })
            .collect(),
    );

    let summaries = join_attributes(count_by_region(&regions, &points, &assignments), None);
    GeoJsonWriter.write_regions(&path, &regions, &summaries).unwrap();

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    let written: Vec<u64> = json["features"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["properties"]["point_count"].as_u64().unwrap())
        .collect();
    assert_eq!(written, vec![2, 1]);
}
