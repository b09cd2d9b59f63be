//! Overlay a logo onto batches of photos and videos.
//!
//! The core is two small pieces: a pure placement calculator that turns a
//! named anchor plus a margin into pixel coordinates, and a compositor that
//! resizes the logo, scales its alpha by an opacity factor, and blends it
//! onto a base frame. Videos reuse the same compositor per frame over
//! abstract [`FrameSource`]/[`FrameSink`] collaborators, with a bundled
//! backend that shells out to the system `ffmpeg`.
//!
//! # Quick Start
//!
//! ```no_run
//! use logostamp::{composite, load_logo, Anchor, WatermarkConfig};
//!
//! let logo = load_logo("logo.png".as_ref()).unwrap();
//! let base = image::open("photo.jpg").unwrap().to_rgb8();
//! let config = WatermarkConfig::default()
//!     .with_anchor(Anchor::BottomRight)
//!     .with_scale_percent(20.0)
//!     .with_opacity(0.9)
//!     .with_margin(50);
//! let stamped = composite(&base, &logo, &config).unwrap();
//! stamped.save("photo_logo.jpg").unwrap();
//! ```
//!
//! # Batches
//!
//! [`StampEngine`] holds the logo and configuration once and processes
//! files, directories, or whole videos with per-item failure reporting:
//!
//! ```no_run
//! use logostamp::{load_logo, ProcessOptions, StampEngine, WatermarkConfig};
//!
//! let logo = load_logo("logo.png".as_ref()).unwrap();
//! let engine = StampEngine::new(logo, WatermarkConfig::default()).unwrap();
//! let opts = ProcessOptions::default();
//! for result in engine.process_directory("shoot/".as_ref(), "out/".as_ref(), &opts) {
//!     println!("{}: {}", result.path.display(), result.message);
//! }
//! ```

#![deny(missing_docs)]

pub mod archive;
pub mod compositing;
mod engine;
pub mod error;
pub mod ffmpeg;
pub mod logos;
pub mod placement;
pub mod video;

pub use archive::ArchiveWriter;
pub use compositing::{composite, PreparedStamp, WatermarkConfig};
pub use engine::{
    default_output_path, encode_image, is_supported_image, is_supported_video, save_image,
    ProcessOptions, ProcessResult, StampEngine,
};
pub use error::{Error, Result};
pub use logos::{load_logo, load_logo_bytes, scan_logo_directory, LogoScanEntry};
pub use placement::{compute_position, Anchor};
pub use video::{stamp_video, CanvasPolicy, FrameSink, FrameSource, VideoMeta};
