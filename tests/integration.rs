use std::path::PathBuf;

use image::{Rgb, RgbImage, Rgba, RgbaImage};

use logostamp::{
    composite, compute_position, Anchor, ArchiveWriter, CanvasPolicy, FrameSink, FrameSource,
    ProcessOptions, StampEngine, VideoMeta, WatermarkConfig,
};

fn temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("logostamp_test_{tag}_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn red_logo(w: u32, h: u32) -> RgbaImage {
    RgbaImage::from_pixel(w, h, Rgba([255, 0, 0, 255]))
}

#[test]
fn placement_matches_closed_form_table() {
    // 800x600 canvas, 160x90 logo, 20px margin.
    assert_eq!(
        compute_position(800, 600, 160, 90, Anchor::BottomRight, 20),
        (620, 490)
    );
    assert_eq!(
        compute_position(800, 600, 160, 90, Anchor::BottomLeft, 20),
        (20, 490)
    );
    assert_eq!(
        compute_position(800, 600, 160, 90, Anchor::TopRight, 20),
        (620, 20)
    );
    assert_eq!(
        compute_position(800, 600, 160, 90, Anchor::TopLeft, 20),
        (20, 20)
    );
    assert_eq!(
        compute_position(800, 600, 160, 90, Anchor::Center, 20),
        (320, 255)
    );
}

#[test]
fn composite_end_to_end_top_left() {
    let base = RgbImage::from_pixel(1000, 1000, Rgb([50, 60, 70]));
    let logo = red_logo(200, 100);
    let config = WatermarkConfig {
        anchor: Anchor::TopLeft,
        scale_percent: 20.0,
        opacity: 1.0,
        margin: 10,
    };

    let out = composite(&base, &logo, &config).unwrap();
    // 20% of 1000 keeps the logo at its native 200x100, pasted at (10,10).
    assert_eq!(out.get_pixel(10, 10), &Rgb([255, 0, 0]));
    assert_eq!(out.get_pixel(209, 109), &Rgb([255, 0, 0]));
    assert_eq!(out.get_pixel(5, 5), &Rgb([50, 60, 70]));
    assert_eq!(out.get_pixel(220, 10), &Rgb([50, 60, 70]));
}

#[test]
fn composite_opacity_zero_is_exact_identity() {
    let base = RgbImage::from_pixel(300, 200, Rgb([1, 2, 3]));
    let logo = red_logo(30, 30);
    let config = WatermarkConfig::default().with_opacity(0.0);

    let out = composite(&base, &logo, &config).unwrap();
    assert_eq!(out, base);
}

#[test]
fn engine_processes_directory_with_logo_prefix() {
    let in_dir = temp_dir("batch_in");
    let out_dir = temp_dir("batch_out");

    for name in ["a.png", "b.png"] {
        RgbImage::from_pixel(100, 100, Rgb([0, 0, 0]))
            .save(in_dir.join(name))
            .unwrap();
    }
    // A non-media file must be ignored, not failed.
    std::fs::write(in_dir.join("notes.txt"), b"not media").unwrap();

    let config = WatermarkConfig {
        anchor: Anchor::TopLeft,
        scale_percent: 20.0,
        opacity: 1.0,
        margin: 0,
    };
    let engine = StampEngine::new(red_logo(20, 10), config).unwrap();
    let results = engine.process_directory(&in_dir, &out_dir, &ProcessOptions::default());

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.success));

    for name in ["logo_a.png", "logo_b.png"] {
        let out = image::open(out_dir.join(name)).unwrap().to_rgb8();
        assert_eq!(out.get_pixel(0, 0), &Rgb([255, 0, 0]));
        assert_eq!(out.get_pixel(50, 50), &Rgb([0, 0, 0]));
    }

    std::fs::remove_dir_all(&in_dir).unwrap();
    std::fs::remove_dir_all(&out_dir).unwrap();
}

#[test]
fn engine_continues_batch_after_undecodable_item() {
    let in_dir = temp_dir("partial_in");
    let out_dir = temp_dir("partial_out");

    RgbImage::from_pixel(100, 100, Rgb([0, 0, 0]))
        .save(in_dir.join("good.png"))
        .unwrap();
    std::fs::write(in_dir.join("broken.png"), b"definitely not a png").unwrap();

    let engine = StampEngine::new(red_logo(20, 10), WatermarkConfig::default()).unwrap();
    let results = engine.process_directory(&in_dir, &out_dir, &ProcessOptions::default());

    assert_eq!(results.len(), 2);
    let failed: Vec<_> = results.iter().filter(|r| !r.success).collect();
    assert_eq!(failed.len(), 1);
    assert!(failed[0].path.ends_with("broken.png"));
    assert!(failed[0].message.contains("Failed to load"));
    assert!(out_dir.join("logo_good.png").exists());

    std::fs::remove_dir_all(&in_dir).unwrap();
    std::fs::remove_dir_all(&out_dir).unwrap();
}

#[derive(Default)]
struct MemArchive {
    entries: Vec<(String, Vec<u8>)>,
}

impl ArchiveWriter for MemArchive {
    fn add(&mut self, name: &str, bytes: &[u8]) -> logostamp::Result<()> {
        self.entries.push((name.to_string(), bytes.to_vec()));
        Ok(())
    }

    fn finalize(&mut self) -> logostamp::Result<Vec<u8>> {
        Ok(self.entries.iter().flat_map(|(_, b)| b.clone()).collect())
    }
}

#[test]
fn engine_stamps_directory_into_archive() {
    let in_dir = temp_dir("archive_in");
    RgbImage::from_pixel(80, 80, Rgb([0, 0, 0]))
        .save(in_dir.join("shot.png"))
        .unwrap();

    let config = WatermarkConfig {
        anchor: Anchor::TopLeft,
        scale_percent: 25.0,
        opacity: 1.0,
        margin: 0,
    };
    let engine = StampEngine::new(red_logo(20, 10), config).unwrap();

    let mut archive = MemArchive::default();
    let results = engine
        .process_directory_to_archive(&in_dir, &mut archive, &ProcessOptions::default())
        .unwrap();

    assert_eq!(results.len(), 1);
    assert!(results[0].success);
    assert_eq!(archive.entries.len(), 1);
    assert_eq!(archive.entries[0].0, "logo_shot.png");

    let decoded = image::load_from_memory(&archive.entries[0].1)
        .unwrap()
        .to_rgb8();
    assert_eq!(decoded.get_pixel(0, 0), &Rgb([255, 0, 0]));
    assert!(!archive.finalize().unwrap().is_empty());

    std::fs::remove_dir_all(&in_dir).unwrap();
}

struct VecSource {
    meta: VideoMeta,
    frames: std::vec::IntoIter<RgbImage>,
}

impl FrameSource for VecSource {
    fn meta(&self) -> &VideoMeta {
        &self.meta
    }

    fn next_frame(&mut self) -> logostamp::Result<Option<RgbImage>> {
        Ok(self.frames.next())
    }
}

#[derive(Default)]
struct VecSink {
    frames: Vec<RgbImage>,
    finished: bool,
}

impl FrameSink for VecSink {
    fn write_frame(&mut self, frame: &RgbImage) -> logostamp::Result<()> {
        self.frames.push(frame.clone());
        Ok(())
    }

    fn finish(&mut self) -> logostamp::Result<()> {
        self.finished = true;
        Ok(())
    }
}

#[test]
fn video_stream_strict_mode_crops_odd_width_from_trailing_edge() {
    let mut frame = RgbImage::from_pixel(101, 100, Rgb([0, 0, 0]));
    for y in 0..100 {
        frame.put_pixel(100, y, Rgb([200, 200, 200]));
    }

    let mut source = VecSource {
        meta: VideoMeta {
            width: 101,
            height: 100,
            fps: 24.0,
            duration_secs: Some(1.0),
            has_audio: false,
        },
        frames: vec![frame; 3].into_iter(),
    };
    let mut sink = VecSink::default();

    let config = WatermarkConfig {
        anchor: Anchor::TopLeft,
        scale_percent: 20.0,
        opacity: 1.0,
        margin: 0,
    };
    let engine = StampEngine::new(red_logo(20, 10), config).unwrap();

    let (written, applied) = engine
        .stamp_video_stream(&mut source, &mut sink, CanvasPolicy::Strict)
        .unwrap();

    assert_eq!(written, 3);
    assert!(applied);
    assert!(sink.finished);
    for out in &sink.frames {
        // Width 101 becomes 100; the marked trailing column is gone.
        assert_eq!(out.dimensions(), (100, 100));
        assert_eq!(out.get_pixel(99, 50), &Rgb([0, 0, 0]));
        // The stamp landed on every frame.
        assert_eq!(out.get_pixel(0, 0), &Rgb([255, 0, 0]));
    }
}
