//! Single-vehicle trip report with geofence labels.
//!
//! Run with: cargo run --example trip_report

use chrono::{Duration, NaiveDate};
use trip_report::geo_utils::haversine_distance;
use trip_report::{
    build_trip_report, format_duration, DateRange, GeofenceCatalog, GeofenceRecord,
    GpsPoint, InMemoryFeed, PositionSample, ReportConfig, Vehicle,
};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let day = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
    let start = day.and_hms_opt(6, 0, 0).unwrap();

    // Parked in the yard, warm up, drive to the camp, idle at the gate
    let plan: [(i64, f64, f64, f64, bool); 8] = [
        (0, 24.0000, 46.0000, 0.0, false),
        (900, 24.0000, 46.0000, 0.0, true),
        (1_200, 24.0050, 46.0020, 35.0, true),
        (1_500, 24.0300, 46.0100, 62.0, true),
        (1_800, 24.0600, 46.0200, 71.0, true),
        (2_100, 24.0800, 46.0300, 1.0, true),
        (2_400, 24.0800, 46.0300, 0.0, true),
        (2_700, 24.0800, 46.0300, 0.0, false),
    ];

    let mut samples = Vec::new();
    let mut prev: Option<GpsPoint> = None;
    for (offset, lat, lng, speed, ignition) in plan {
        let here = GpsPoint::new(lat, lng);
        let distance = prev
            .map(|p| haversine_distance(&p, &here) / 1000.0)
            .unwrap_or(0.0);
        samples.push(PositionSample {
            time: start + Duration::seconds(offset),
            latitude: lat,
            longitude: lng,
            speed,
            distance,
            ignition,
            valid: true,
        });
        prev = Some(here);
    }

    let feed = InMemoryFeed::new()
        .with_positions("dev-12", samples)
        .with_geofences(
            7,
            vec![
                GeofenceRecord::circle("Main Yard", r#"{"lat":24.0,"lng":46.0}"#, 400.0),
                GeofenceRecord::polygon(
                    "Camp 3 Gate",
                    concat!(
                        r#"[{"lat":24.075,"lng":46.025},{"lat":24.075,"lng":46.035},"#,
                        r#"{"lat":24.085,"lng":46.035},{"lat":24.085,"lng":46.025}]"#
                    ),
                ),
            ],
        );

    let catalog = match GeofenceCatalog::load(&feed, 7) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load geofences: {}", e);
            return;
        }
    };

    let vehicle = Vehicle::new("dev-12", "Bus 12").with_group("Bus");
    let summary = match build_trip_report(
        &feed,
        &catalog,
        &vehicle,
        &DateRange::day(day),
        &ReportConfig::default(),
    ) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Report failed: {}", e);
            return;
        }
    };

    println!("Trip report for {} on {}\n", vehicle, day);
    for seg in &summary.segments {
        println!(
            "  {:<7} {} -> {}  {:>11}  {:>6.2} km  {:>6.1} km/h  {}",
            seg.state.as_str(),
            seg.start_time.time(),
            seg.stop_time.time(),
            format_duration(seg.duration).unwrap_or_default(),
            seg.distance,
            seg.avg_speed,
            seg.location,
        );
    }

    if let Ok(cols) = summary.formatted_durations() {
        println!("\nTotals:");
        println!(
            "  Run:    {} ({:.2} km, {} trips)",
            cols.run, summary.run_distance, summary.trip_count
        );
        println!("  Idle:   {}", cols.idle);
        println!("  Parked: {}", cols.parked);
        println!("  Total:  {}", cols.total);
    }
}
