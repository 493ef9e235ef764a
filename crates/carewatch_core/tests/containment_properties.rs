use carewatch_core::{evaluate, haversine_distance_meters, Coordinate, Geofence, GeofenceMonitor};

fn coord(latitude: f64, longitude: f64) -> Coordinate {
    Coordinate::new(latitude, longitude).expect("valid coordinate")
}

#[test]
fn inside_iff_distance_within_radius_across_a_grid() {
    let centers = [coord(0.0, 0.0), coord(31.5204, 74.3587), coord(-33.8688, 151.2093)];
    let radii = [50.0, 100.0, 750.0, 2_000.0];

    for center in centers {
        for radius in radii {
            let fence = Geofence::new(center, radius, 0).expect("valid fence");
            for step in -30..=30 {
                let offset = step as f64 * 0.0007;
                let point = coord(center.latitude + offset, center.longitude - offset / 2.0);
                let result = evaluate(&point, &fence);
                let expected = haversine_distance_meters(&point, &center);

                assert_eq!(result.distance_meters, expected);
                assert_eq!(
                    result.inside,
                    expected <= radius,
                    "center={center:?} radius={radius} point={point:?}"
                );
            }
        }
    }
}

#[test]
fn monitor_emits_one_transition_per_crossing() {
    let fence = Geofence::new(coord(0.0, 0.0), 1_000.0, 0).expect("valid fence");
    let mut monitor = GeofenceMonitor::new();
    monitor.on_geofence(fence);

    // Oscillate across the boundary with dwell periods on each side.
    let path = [0.001, 0.009, 0.0095, 0.01, 0.008, 0.007, 0.0091, 0.0092, 0.0];
    let transitions = path
        .iter()
        .enumerate()
        .filter_map(|(at, longitude)| {
            monitor.on_position(carewatch_core::PositionSample::new(
                coord(0.0, *longitude),
                at as i64,
            ))
        })
        .count();
    assert_eq!(transitions, 4);
}
