//! Example: Fetch a single imagery tile.
//!
//! Usage: cargo run --example fetch_one -- <lat> <lon> [output.png]

use satfetch_export::{EsriExportFetcher, ImageSource};
use std::env;
use std::time::Instant;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 3 {
        eprintln!("Usage: {} <lat> <lon> [output.png]", args[0]);
        eprintln!("Example: {} 40.758 -73.9855 times_square.png", args[0]);
        std::process::exit(1);
    }

    let lat: f64 = args[1].parse().expect("Invalid latitude");
    let lon: f64 = args[2].parse().expect("Invalid longitude");
    let output = args.get(3).map(|s| s.as_str()).unwrap_or("tile.png");

    let fetcher = EsriExportFetcher::world_imagery().expect("Failed to create fetcher");
    println!(
        "Requesting bbox {} from {}",
        fetcher.params().bbox_for(lat, lon),
        fetcher.params().endpoint
    );

    let start = Instant::now();
    match fetcher.fetch_image(lat, lon) {
        Ok(image) => {
            println!(
                "Got {}x{} image in {:.2}s",
                image.width(),
                image.height(),
                start.elapsed().as_secs_f64()
            );
            if let Err(e) = image.save(output) {
                eprintln!("Error saving {}: {}", output, e);
                std::process::exit(1);
            }
            println!("Saved to {}", output);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }

    let stats = fetcher.download_stats();
    println!(
        "{} request(s), {} bytes downloaded",
        stats.requests_sent, stats.bytes_downloaded
    );
}
