//! End-to-end flight plan generation tests.
//!
//! Files are written under the system temp directory and removed afterwards.

use flightplan_core::elevation::{integrate_elevation, ElevationRaster, GeoTransform, TerrainSource};
use flightplan_core::spatial::{haversine_distance, meters_per_deg_lat, meters_per_deg_lon};
use flightplan_core::{
    create_flightplan, create_flightplan_with_terrain, read_mission, Action, DroneProfile,
    FlightPlanError, FlightPlanOptions, HeightMode, TerrainStatus, Waypath,
};
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::path::PathBuf;

const LON: f64 = 85.3240;
const LAT: f64 = 27.7172;

fn square_coords(side_m: f64) -> Vec<[f64; 2]> {
    let dlat = side_m / meters_per_deg_lat(LAT);
    let dlon = side_m / meters_per_deg_lon(LAT);
    vec![
        [LON, LAT],
        [LON + dlon, LAT],
        [LON + dlon, LAT + dlat],
        [LON, LAT + dlat],
        [LON, LAT],
    ]
}

fn square_aoi(side_m: f64) -> Value {
    json!({
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "properties": {},
            "geometry": {"type": "Polygon", "coordinates": [square_coords(side_m)]}
        }]
    })
}

/// 100 m square, agl 50, 75 % overlaps, point mode.
fn example_options() -> FlightPlanOptions {
    let mut options = FlightPlanOptions::new(square_aoi(100.0));
    options.agl = Some(50.0);
    options.forward_overlap = 75.0;
    options.side_overlap = 75.0;
    options.image_interval = 2;
    options.generate_each_points = true;
    options
}

fn temp_path(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("flightplan-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir.join(name)
}

/// Raster around the test area rising 2 m per column eastwards.
fn sloped_terrain() -> ElevationRaster {
    let (cols, rows) = (40, 40);
    let values = (0..rows)
        .flat_map(|_| (0..cols).map(|col| 1000.0 + col as f64 * 2.0))
        .collect();
    let transform = GeoTransform {
        origin_lon: LON - 0.01,
        origin_lat: LAT + 0.01,
        pixel_width: 0.0005,
        pixel_height: 0.0005,
    };
    ElevationRaster::new(transform, cols, rows, values, Some(-9999.0)).unwrap()
}

#[test]
fn square_example_produces_nadir_grid() {
    let plan = create_flightplan(&example_options(), &DroneProfile::default()).unwrap();

    assert!((plan.spacing.forward_spacing - 8.875).abs() < 1e-9);
    assert!((plan.spacing.side_spacing - 15.75).abs() < 1e-9);

    let Waypath::Points(points) = &plan.waypath else {
        panic!("expected point mode");
    };
    assert!(!points.is_empty());
    assert!(points.iter().all(|wp| wp.gimbal_angle == -90.0));
    assert!(points.iter().all(|wp| wp.actions.contains(&Action::TakePhoto)));
    // Without a DEM altitudes are the requested AGL, relative to take-off.
    assert!(points.iter().all(|wp| wp.altitude == Some(50.0)));
    assert_eq!(plan.height_mode, HeightMode::RelativeToTakeoff);

    let indices: Vec<usize> = points.iter().map(|wp| wp.sequence_index).collect();
    assert_eq!(indices, (0..points.len()).collect::<Vec<_>>());

    let rows: BTreeSet<usize> = points.iter().map(|wp| wp.row).collect();
    assert_eq!(rows.len(), 7);
    // Every row has its two boundary points plus interior lattice points.
    for row in &rows {
        let count = points.iter().filter(|wp| wp.row == *row).count();
        assert!(count > 2, "row {row} has {count} points");
    }
}

#[test]
fn three_d_example_triples_the_waypoints() {
    let flat = create_flightplan(&example_options(), &DroneProfile::default()).unwrap();
    let mut options = example_options();
    options.generate_3d = true;
    let plan = create_flightplan(&options, &DroneProfile::default()).unwrap();

    let flat_points = flat.waypath.waypoints();
    let points = plan.waypath.waypoints();
    assert_eq!(points.len(), flat_points.len() * 3);
    for (triplet, base) in points.chunks(3).zip(&flat_points) {
        assert!(triplet.iter().all(|wp| wp.lon == base.lon && wp.lat == base.lat));
        let angles: Vec<f64> = triplet.iter().map(|wp| wp.gimbal_angle).collect();
        assert_eq!(angles, vec![-90.0, -45.0, 45.0]);
    }
}

#[test]
fn no_fly_zone_over_everything_is_an_empty_path() {
    let outfile = temp_path("covered.kmz");
    let _ = std::fs::remove_file(&outfile);

    let mut options = example_options();
    let dlat = 200.0 / meters_per_deg_lat(LAT);
    let dlon = 200.0 / meters_per_deg_lon(LAT);
    options.no_fly_zones = Some(json!({
        "type": "Polygon",
        "coordinates": [[
            [LON - dlon, LAT - dlat],
            [LON + dlon, LAT - dlat],
            [LON + dlon, LAT + dlat],
            [LON - dlon, LAT + dlat],
            [LON - dlon, LAT - dlat]
        ]]
    }));
    options.outfile = Some(outfile.clone());

    let result = create_flightplan(&options, &DroneProfile::default());
    assert!(matches!(result, Err(FlightPlanError::EmptyPath(_))));
    assert!(!outfile.exists());
}

#[test]
fn self_intersecting_area_is_rejected() {
    let coords = square_coords(100.0);
    let bowtie = json!({
        "type": "Polygon",
        "coordinates": [[coords[0], coords[2], coords[1], coords[3], coords[0]]]
    });
    let mut options = example_options();
    options.project_area = bowtie;
    assert!(matches!(
        create_flightplan(&options, &DroneProfile::default()),
        Err(FlightPlanError::InvalidGeometry(_))
    ));
}

#[test]
fn take_off_point_starts_the_path_nearby() {
    let coords = square_coords(100.0);
    // Just outside the north-east corner.
    let take_off = [coords[2][0] + 0.0002, coords[2][1] + 0.0002];
    let mut options = example_options();
    options.take_off_point = Some(take_off);
    let plan = create_flightplan(&options, &DroneProfile::default()).unwrap();

    let points = plan.waypath.waypoints();
    let first = points[0];
    let last = points[points.len() - 1];
    let to_first = haversine_distance(take_off[1], take_off[0], first.lat, first.lon);
    let to_last = haversine_distance(take_off[1], take_off[0], last.lat, last.lon);
    assert!(to_first <= to_last);
    assert!(to_first < 50.0, "path starts {to_first:.1} m from take-off");
}

#[test]
fn line_mode_never_photographs_across_a_concave_notch() {
    use geo::{Contains, Coord, LineString, Point, Polygon};

    let to_geo = |x: f64, y: f64| Coord {
        x: LON + x / meters_per_deg_lon(LAT),
        y: LAT + y / meters_per_deg_lat(LAT),
    };
    let ring: Vec<Coord<f64>> = [
        (0.0, 0.0),
        (120.0, 0.0),
        (120.0, 100.0),
        (80.0, 100.0),
        (80.0, 30.0),
        (40.0, 30.0),
        (40.0, 100.0),
        (0.0, 100.0),
        (0.0, 0.0),
    ]
    .iter()
    .map(|&(x, y)| to_geo(x, y))
    .collect();
    let aoi = Polygon::new(LineString::from(ring.clone()), vec![]);
    let coords: Vec<[f64; 2]> = ring.iter().map(|c| [c.x, c.y]).collect();

    let mut options = FlightPlanOptions::new(json!({"type": "Polygon", "coordinates": [coords]}));
    options.agl = Some(50.0);
    options.forward_overlap = 75.0;
    options.side_overlap = 75.0;
    let plan = create_flightplan(&options, &DroneProfile::default()).unwrap();

    let Waypath::Lines(lines) = &plan.waypath else {
        panic!("expected line mode");
    };
    for line in lines.iter().filter(|l| l.start.lon != l.end.lon || l.start.lat != l.end.lat) {
        let mid = Point::new((line.start.lon + line.end.lon) / 2.0, (line.start.lat + line.end.lat) / 2.0);
        assert!(
            aoi.contains(&mid),
            "row {} wayline midpoint ({:.6}, {:.6}) is outside the area",
            line.row,
            mid.x(),
            mid.y()
        );
    }
    // The five rows crossing the notch each fly as two waylines.
    let rows: BTreeSet<usize> = lines.iter().map(|l| l.row).collect();
    assert_eq!(lines.len(), rows.len() + 5);
    assert!(plan.placemarks().is_ok());
}

#[test]
fn kmz_round_trip_preserves_order_and_actions() {
    for (each_points, three_d) in [(true, false), (false, false), (false, true)] {
        let outfile = temp_path(&format!("mission-{each_points}-{three_d}.kmz"));
        let mut options = example_options();
        options.generate_each_points = each_points;
        options.generate_3d = three_d;
        options.rotation_angle = 20.0;
        options.outfile = Some(outfile.clone());

        let plan = create_flightplan(&options, &DroneProfile::default()).unwrap();
        let decoded = read_mission(&outfile).unwrap();
        assert_eq!(decoded, plan.placemarks().unwrap());
        assert!(!outfile.with_extension("kmz.partial").exists());
        std::fs::remove_file(&outfile).unwrap();
    }
}

#[test]
fn geojson_output_lists_every_waypoint() {
    let outfile = temp_path("waypoints.geojson");
    let mut options = example_options();
    options.outfile = Some(outfile.clone());
    let plan = create_flightplan(&options, &DroneProfile::default()).unwrap();

    let written: Value = serde_json::from_slice(&std::fs::read(&outfile).unwrap()).unwrap();
    let features = written["features"].as_array().unwrap();
    assert_eq!(features.len(), plan.waypath.waypoints().len());
    assert_eq!(features[0]["geometry"]["type"], "Point");
    assert_eq!(features[0]["properties"]["gimbal_angle"], -90.0);
    std::fs::remove_file(&outfile).unwrap();
}

#[test]
fn terrain_sets_absolute_altitudes_idempotently() {
    let dem = sloped_terrain();
    let plan =
        create_flightplan_with_terrain(&example_options(), &DroneProfile::default(), Some(&dem))
            .unwrap();
    assert_eq!(plan.height_mode, HeightMode::Absolute);
    let report = plan.elevation.unwrap();
    assert_eq!(report.degraded(), 0);

    for wp in plan.waypath.waypoints() {
        let ground = dem.sample(wp.lon, wp.lat).elevation.unwrap();
        assert_eq!(wp.altitude, Some(ground + 50.0));
        assert_eq!(wp.terrain, Some(TerrainStatus::Sampled));
    }

    let mut again = plan.waypath.clone();
    integrate_elevation(&mut again, &dem, HeightMode::Absolute);
    let before: Vec<Option<f64>> = plan.waypath.waypoints().iter().map(|w| w.altitude).collect();
    let after: Vec<Option<f64>> = again.waypoints().iter().map(|w| w.altitude).collect();
    assert_eq!(before, after);
}

#[test]
fn line_mode_follows_terrain_with_fly_through_splits() {
    let dem = sloped_terrain();
    let mut options = example_options();
    options.generate_each_points = false;
    options.terrain_follow_threshold = 1.0;
    let flat = create_flightplan(&options, &DroneProfile::default()).unwrap();
    let plan = create_flightplan_with_terrain(&options, &DroneProfile::default(), Some(&dem)).unwrap();

    let (Waypath::Lines(flat_lines), Waypath::Lines(lines)) = (&flat.waypath, &plan.waypath) else {
        panic!("expected line mode");
    };
    assert!(lines.len() >= flat_lines.len());
    for line in lines {
        assert!(line.start.altitude.is_some() && line.end.altitude.is_some());
    }
    // Encoding still succeeds and keeps timers balanced across splits.
    assert!(plan.placemarks().is_ok());
}

#[test]
fn geotiff_dem_is_read_with_its_georeference() {
    use tiff::encoder::{colortype, TiffEncoder};
    use tiff::tags::Tag;

    let path = temp_path("dem.tif");
    let (cols, rows) = (4u32, 3u32);
    let data: Vec<f32> = vec![
        10.0, 11.0, 12.0, 13.0,
        20.0, -9999.0, 22.0, 23.0,
        30.0, 31.0, 32.0, 33.0,
    ];
    {
        let file = std::fs::File::create(&path).unwrap();
        let mut encoder = TiffEncoder::new(file).unwrap();
        let mut image = encoder.new_image::<colortype::Gray32Float>(cols, rows).unwrap();
        image
            .encoder()
            .write_tag(Tag::ModelPixelScaleTag, &[0.001f64, 0.001, 0.0][..])
            .unwrap();
        image
            .encoder()
            .write_tag(Tag::ModelTiepointTag, &[0.0f64, 0.0, 0.0, 85.0, 28.0, 0.0][..])
            .unwrap();
        image
            .encoder()
            .write_tag(Tag::GeoKeyDirectoryTag, &[1u16, 1, 0, 1, 1024, 0, 1, 2][..])
            .unwrap();
        image.encoder().write_tag(Tag::GdalNodata, "-9999").unwrap();
        image.write_data(&data).unwrap();
    }

    let dem = ElevationRaster::from_geotiff(&path).unwrap();
    let sample = dem.sample(85.0025, 27.9985);
    assert_eq!(sample.elevation, Some(22.0));
    assert_eq!(sample.status, TerrainStatus::Sampled);

    let nodata = dem.sample(85.0015, 27.9985);
    assert_eq!(nodata.status, TerrainStatus::NearestValid);
    std::fs::remove_file(&path).unwrap();

    assert!(matches!(
        ElevationRaster::from_geotiff(&temp_path("missing.tif")),
        Err(FlightPlanError::Terrain(_))
    ));
}

#[test]
fn projected_geotiff_dem_is_rejected() {
    use tiff::encoder::{colortype, TiffEncoder};
    use tiff::tags::Tag;

    // 30 m pixels in UTM metres, with and without a key directory.
    for with_keys in [true, false] {
        let path = temp_path(&format!("utm-{with_keys}.tif"));
        {
            let file = std::fs::File::create(&path).unwrap();
            let mut encoder = TiffEncoder::new(file).unwrap();
            let mut image = encoder.new_image::<colortype::Gray32Float>(2, 2).unwrap();
            image
                .encoder()
                .write_tag(Tag::ModelPixelScaleTag, &[30.0f64, 30.0, 0.0][..])
                .unwrap();
            image
                .encoder()
                .write_tag(Tag::ModelTiepointTag, &[0.0f64, 0.0, 0.0, 334_000.0, 3_067_000.0, 0.0][..])
                .unwrap();
            if with_keys {
                // Version 1.1.0, two keys: projected model, UTM 45N.
                image
                    .encoder()
                    .write_tag(
                        Tag::GeoKeyDirectoryTag,
                        &[1u16, 1, 0, 2, 1024, 0, 1, 1, 3072, 0, 1, 32645][..],
                    )
                    .unwrap();
            }
            image.write_data(&[1300.0f32, 1301.0, 1302.0, 1303.0][..]).unwrap();
        }

        let result = ElevationRaster::from_geotiff(&path);
        assert!(matches!(result, Err(FlightPlanError::Terrain(_))), "with_keys={with_keys}");
        std::fs::remove_file(&path).unwrap();
    }
}
