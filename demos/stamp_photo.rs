//! Stamp a logo onto a single photo.
//!
//! Usage:
//! ```sh
//! cargo run --example stamp_photo -- input.jpg logo.png output.jpg
//! ```

use std::env;
use std::process;

use logostamp::{composite, load_logo, WatermarkConfig};

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 4 {
        eprintln!("Usage: {} <input> <logo> <output>", args[0]);
        process::exit(1);
    }

    let logo = load_logo(args[2].as_ref()).expect("failed to load logo");
    let base = image::open(&args[1]).expect("failed to load input").to_rgb8();

    let config = WatermarkConfig::default();
    let stamped = composite(&base, &logo, &config).expect("failed to composite");

    stamped.save(&args[3]).expect("failed to save output");
    println!("Done: {}", args[3]);
}
