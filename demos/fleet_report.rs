//! Fleet report over many synthetic vehicles, processed in parallel.
//!
//! Run with: cargo run --example fleet_report --features parallel

use chrono::{Duration, NaiveDate};
use std::time::Instant;
use trip_report::{
    build_fleet_report_parallel, format_duration, DateRange, GeofenceCatalog, GeofenceCircle,
    GpsPoint, InMemoryFeed, PositionSample, ReportConfig, Vehicle,
};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let day = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
    let start = day.and_hms_opt(5, 0, 0).unwrap();

    let mut feed = InMemoryFeed::new();
    let mut vehicles = Vec::new();

    for v in 0..50 {
        let id = format!("dev-{}", v);
        // One fix per minute over 12 hours, cycling parked / idle / run
        let samples: Vec<PositionSample> = (0..720)
            .map(|i| {
                let phase = (i + v * 7) % 90;
                let (speed, ignition) = match phase {
                    0..=19 => (0.0, false),
                    20..=29 => (0.5, true),
                    _ => (40.0 + (phase % 10) as f64 * 3.0, true),
                };
                let moving = speed > 2.0;
                PositionSample {
                    time: start + Duration::minutes(i as i64),
                    latitude: 24.0 + (i as f64) * 0.0001,
                    longitude: 46.0 + (v as f64) * 0.01,
                    speed,
                    distance: if moving { speed / 60.0 } else { 0.0 },
                    ignition,
                    valid: true,
                }
            })
            .collect();

        feed = feed.with_positions(id.clone(), samples);
        let group = if v % 3 == 0 { "Heavy" } else { "Light" };
        vehicles.push(Vehicle::new(id, format!("Unit {:02}", v)).with_group(group));
    }

    let yard = match GeofenceCircle::new("Depot", GpsPoint::new(24.0, 46.2), 2_000.0) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e);
            return;
        }
    };
    let catalog = GeofenceCatalog::new(vec![yard.into()]);

    let started = Instant::now();
    let report = match build_fleet_report_parallel(
        &feed,
        &catalog,
        &vehicles,
        &DateRange::day(day),
        &ReportConfig::default(),
    ) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Fleet report failed: {}", e);
            return;
        }
    };
    println!("Built fleet report in {:?}\n", started.elapsed());

    for v in report.vehicles.iter().take(5) {
        println!(
            "  {:<8} {:>3} segments  run {}  {:>7.1} km",
            v.vehicle.name,
            v.segments.len(),
            format_duration(v.run_duration).unwrap_or_default(),
            v.run_distance
        );
    }
    println!("  ...");

    let s = &report.summary;
    println!("\nFleet ({}):", s.period);
    println!("  Vehicles: {}", s.vehicle_count);
    println!("  Trips:    {}", s.trip_count);
    println!("  Distance: {:.1} km", s.run_distance);
    println!("  Run:      {}", format_duration(s.run_duration).unwrap_or_default());
    println!("  Idle:     {}", format_duration(s.idle_duration).unwrap_or_default());
    println!("  Parked:   {}", format_duration(s.parked_duration).unwrap_or_default());
    println!("  Failed:   {}", report.failures.len());
}
