//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `carewatch_core` linkage.
//! - Optionally evaluate one position against a fence:
//!   `carewatch_cli <lat> <lng> <center_lat> <center_lng> <radius_m>`.

use carewatch_core::{evaluate, Coordinate, Geofence};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("carewatch_core ping={}", carewatch_core::ping());
    println!("carewatch_core version={}", carewatch_core::core_version());

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        return ExitCode::SUCCESS;
    }

    match run_evaluation(&args) {
        Ok(line) => {
            println!("{line}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(2)
        }
    }
}

fn run_evaluation(args: &[String]) -> Result<String, String> {
    let [lat, lng, center_lat, center_lng, radius] = args else {
        return Err("expected: <lat> <lng> <center_lat> <center_lng> <radius_m>".to_string());
    };
    let number = |name: &str, raw: &str| {
        raw.parse::<f64>()
            .map_err(|_| format!("`{name}` is not a number: {raw}"))
    };

    let position = Coordinate::new(number("lat", lat)?, number("lng", lng)?)
        .map_err(|err| err.to_string())?;
    let center = Coordinate::new(
        number("center_lat", center_lat)?,
        number("center_lng", center_lng)?,
    )
    .map_err(|err| err.to_string())?;
    let fence = Geofence::new(center, number("radius_m", radius)?, 0)
        .map_err(|err| err.to_string())?;

    let result = evaluate(&position, &fence);
    Ok(format!(
        "inside={} distance_m={:.2}",
        result.inside, result.distance_meters
    ))
}
