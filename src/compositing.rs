//! Logo compositing: resize, alpha scaling, and the paste/blend step.
//!
//! The overlay is applied via standard straight-alpha blending:
//! `out = logo * alpha + base * (1 - alpha)`
//!
//! A [`PreparedStamp`] captures the resized, opacity-adjusted logo plus its
//! placement for one canvas size. Photos prepare once per image; videos
//! prepare once and re-apply the same stamp to every frame.

use image::{imageops, RgbImage, RgbaImage};

use crate::error::{Error, Result};
use crate::placement::{compute_position, Anchor};

/// Overlay configuration, immutable for the duration of a batch run.
#[derive(Debug, Clone)]
pub struct WatermarkConfig {
    /// Where the logo is anchored on the canvas.
    pub anchor: Anchor,
    /// Logo width as a percentage of the canvas width, in `(0, 100]`.
    pub scale_percent: f32,
    /// Overall logo opacity in `[0, 1]`; multiplies the logo's own alpha.
    pub opacity: f32,
    /// Pixel distance from the canvas edges for corner anchors.
    pub margin: u32,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            anchor: Anchor::BottomRight,
            scale_percent: 20.0,
            opacity: 0.9,
            margin: 50,
        }
    }
}

impl WatermarkConfig {
    /// Set the anchor position.
    #[must_use]
    pub fn with_anchor(mut self, anchor: Anchor) -> Self {
        self.anchor = anchor;
        self
    }

    /// Set the logo scale, clamped to `(0, 100]`.
    #[must_use]
    pub fn with_scale_percent(mut self, scale_percent: f32) -> Self {
        self.scale_percent = scale_percent.clamp(f32::EPSILON, 100.0);
        self
    }

    /// Set the opacity, clamped to `[0, 1]`.
    #[must_use]
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }

    /// Set the edge margin in pixels.
    #[must_use]
    pub fn with_margin(mut self, margin: u32) -> Self {
        self.margin = margin;
        self
    }
}

/// A logo resized, opacity-adjusted, and positioned for one canvas size.
///
/// The source logo is never mutated; preparation derives a new image.
#[derive(Debug, Clone)]
pub struct PreparedStamp {
    logo: RgbaImage,
    x: i64,
    y: i64,
}

impl PreparedStamp {
    /// Prepare a stamp for a canvas of the given size.
    ///
    /// Returns `Ok(None)` when the configured scale is degenerate (the
    /// target width or height floors to zero); callers treat that as a
    /// defined no-op, not a failure.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidLogoAspect`] if the source logo has a zero
    /// width or height.
    pub fn prepare(
        canvas_w: u32,
        canvas_h: u32,
        logo: &RgbaImage,
        config: &WatermarkConfig,
    ) -> Result<Option<Self>> {
        let (logo_w, logo_h) = logo.dimensions();
        if logo_w == 0 || logo_h == 0 {
            return Err(Error::InvalidLogoAspect {
                width: logo_w,
                height: logo_h,
            });
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let target_w =
            (f64::from(canvas_w) * (f64::from(config.scale_percent) / 100.0)).max(0.0) as u32;
        let aspect = f64::from(logo_w) / f64::from(logo_h);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let target_h = (f64::from(target_w) / aspect).max(0.0) as u32;

        if target_w < 1 || target_h < 1 {
            return Ok(None);
        }

        // Lanczos keeps the alpha mask's edges clean; a nearest-neighbor
        // resize would visibly alias once opacity is applied.
        let mut resized = if (target_w, target_h) == (logo_w, logo_h) {
            logo.clone()
        } else {
            imageops::resize(logo, target_w, target_h, imageops::FilterType::Lanczos3)
        };

        // Scale existing alpha multiplicatively so soft edges and drop
        // shadows keep their relative transparency profile.
        if config.opacity < 1.0 {
            let opacity = config.opacity.clamp(0.0, 1.0);
            for px in resized.pixels_mut() {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                {
                    px[3] = (f32::from(px[3]) * opacity) as u8;
                }
            }
        }

        let (x, y) = compute_position(
            canvas_w,
            canvas_h,
            target_w,
            target_h,
            config.anchor,
            config.margin,
        );

        Ok(Some(Self { logo: resized, x, y }))
    }

    /// Top-left insertion point on the canvas (may be out of bounds).
    #[must_use]
    pub fn position(&self) -> (i64, i64) {
        (self.x, self.y)
    }

    /// Dimensions of the resized logo.
    #[must_use]
    pub fn logo_size(&self) -> (u32, u32) {
        self.logo.dimensions()
    }

    /// Blend the stamp onto a frame in-place.
    ///
    /// Logo pixels falling outside the frame are silently clipped. Fully
    /// transparent logo pixels leave the frame byte-identical.
    pub fn apply(&self, frame: &mut RgbImage) {
        let frame_w = i64::from(frame.width());
        let frame_h = i64::from(frame.height());
        let logo_w = i64::from(self.logo.width());
        let logo_h = i64::from(self.logo.height());

        // Clip to frame bounds
        let x0 = self.x.max(0);
        let y0 = self.y.max(0);
        let x1 = (self.x + logo_w).min(frame_w);
        let y1 = (self.y + logo_h).min(frame_h);

        if x0 >= x1 || y0 >= y1 {
            return;
        }

        for fy in y0..y1 {
            for fx in x0..x1 {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let lp = self.logo.get_pixel((fx - self.x) as u32, (fy - self.y) as u32);

                let alpha = f32::from(lp[3]) / 255.0;
                if alpha <= 0.0 {
                    continue;
                }
                let inv_alpha = 1.0 - alpha;

                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let px = frame.get_pixel_mut(fx as u32, fy as u32);
                for ch in 0..3 {
                    let fg = f32::from(lp[ch]);
                    let bg = f32::from(px[ch]);
                    let blended = fg * alpha + bg * inv_alpha;
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    {
                        px[ch] = blended.clamp(0.0, 255.0) as u8;
                    }
                }
            }
        }
    }
}

/// Composite a logo onto a base frame, returning a new opaque frame.
///
/// Convenience wrapper over [`PreparedStamp`]: prepares against the base's
/// dimensions and applies to a copy. A degenerate scale returns the base
/// unchanged. Neither input is mutated.
///
/// # Errors
///
/// Returns [`Error::InvalidLogoAspect`] if the logo has a zero dimension.
pub fn composite(base: &RgbImage, logo: &RgbaImage, config: &WatermarkConfig) -> Result<RgbImage> {
    let mut out = base.clone();
    if let Some(stamp) = PreparedStamp::prepare(base.width(), base.height(), logo, config)? {
        stamp.apply(&mut out);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, Rgba};

    fn solid_base(w: u32, h: u32, rgb: [u8; 3]) -> RgbImage {
        RgbImage::from_pixel(w, h, Rgb(rgb))
    }

    fn solid_logo(w: u32, h: u32, rgba: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba(rgba))
    }

    #[test]
    fn top_left_scenario_places_logo_exactly() {
        let base = solid_base(1000, 1000, [10, 20, 30]);
        let logo = solid_logo(200, 100, [255, 0, 0, 255]);
        let config = WatermarkConfig {
            anchor: Anchor::TopLeft,
            scale_percent: 20.0,
            opacity: 1.0,
            margin: 10,
        };

        let stamp = PreparedStamp::prepare(1000, 1000, &logo, &config)
            .unwrap()
            .unwrap();
        assert_eq!(stamp.logo_size(), (200, 100));
        assert_eq!(stamp.position(), (10, 10));

        let out = composite(&base, &logo, &config).unwrap();
        assert_eq!(out.get_pixel(10, 10), &Rgb([255, 0, 0]));
        assert_eq!(out.get_pixel(209, 109), &Rgb([255, 0, 0]));
        // Outside the stamp the base is untouched.
        assert_eq!(out.get_pixel(5, 5), &Rgb([10, 20, 30]));
        assert_eq!(out.get_pixel(210, 10), &Rgb([10, 20, 30]));
    }

    #[test]
    fn degenerate_scale_returns_base_unchanged() {
        let base = solid_base(50, 50, [1, 2, 3]);
        let logo = solid_logo(100, 50, [255, 255, 255, 255]);
        // floor(50 * 0.01) == 0
        let config = WatermarkConfig::default().with_scale_percent(1.0);

        assert!(PreparedStamp::prepare(50, 50, &logo, &config)
            .unwrap()
            .is_none());
        let out = composite(&base, &logo, &config).unwrap();
        assert_eq!(out, base);
    }

    #[test]
    fn degenerate_height_from_extreme_aspect_is_noop() {
        let base = solid_base(100, 100, [0, 0, 0]);
        // 1000:1 aspect; target width 10 floors target height to 0.
        let logo = solid_logo(1000, 1, [255, 255, 255, 255]);
        let config = WatermarkConfig::default().with_scale_percent(10.0);

        let out = composite(&base, &logo, &config).unwrap();
        assert_eq!(out, base);
    }

    #[test]
    fn zero_dimension_logo_is_rejected() {
        let logo = RgbaImage::new(10, 0);
        let config = WatermarkConfig::default();
        let err = PreparedStamp::prepare(100, 100, &logo, &config).unwrap_err();
        assert!(matches!(err, Error::InvalidLogoAspect { .. }));
    }

    #[test]
    fn opacity_zero_leaves_base_pixel_identical() {
        let base = solid_base(100, 100, [40, 80, 120]);
        let logo = solid_logo(20, 10, [255, 255, 255, 255]);
        let config = WatermarkConfig {
            anchor: Anchor::Center,
            scale_percent: 20.0,
            opacity: 0.0,
            margin: 0,
        };

        let out = composite(&base, &logo, &config).unwrap();
        assert_eq!(out, base);
    }

    #[test]
    fn full_opacity_preserves_logo_alpha() {
        let logo = solid_logo(20, 10, [255, 0, 0, 200]);
        let config = WatermarkConfig {
            anchor: Anchor::TopLeft,
            scale_percent: 20.0,
            opacity: 1.0,
            margin: 0,
        };

        // Canvas width 100 at 20% resizes the logo to its own 20x10.
        let stamp = PreparedStamp::prepare(100, 100, &logo, &config)
            .unwrap()
            .unwrap();
        for px in stamp.logo.pixels() {
            assert_eq!(px[3], 200);
        }
    }

    #[test]
    fn opacity_multiplies_existing_alpha_truncating() {
        let logo = solid_logo(20, 10, [255, 0, 0, 128]);
        let config = WatermarkConfig {
            anchor: Anchor::TopLeft,
            scale_percent: 20.0,
            opacity: 0.5,
            margin: 0,
        };

        let stamp = PreparedStamp::prepare(100, 100, &logo, &config)
            .unwrap()
            .unwrap();
        // 128 * 0.5 = 64.0, truncated to 64.
        for px in stamp.logo.pixels() {
            assert_eq!(px[3], 64);
        }
    }

    #[test]
    fn semi_transparent_stamp_blends_with_over_operator() {
        let base = solid_base(100, 100, [0, 0, 0]);
        let logo = solid_logo(20, 10, [255, 255, 255, 255]);
        let config = WatermarkConfig {
            anchor: Anchor::TopLeft,
            scale_percent: 20.0,
            opacity: 0.5,
            margin: 0,
        };

        let out = composite(&base, &logo, &config).unwrap();
        // alpha = floor(255 * 0.5) / 255 = 127/255, so white over black
        // lands at 127 (+/- 1 for f32 rounding).
        let px = out.get_pixel(0, 0);
        for ch in 0..3 {
            let diff = (i32::from(px[ch]) - 127).abs();
            assert!(diff <= 1, "channel {ch} was {}", px[ch]);
        }
        assert_eq!(out.get_pixel(20, 0), &Rgb([0, 0, 0]));
    }

    #[test]
    fn composite_is_idempotent_for_opaque_logo() {
        let base = solid_base(500, 400, [90, 90, 90]);
        let logo = solid_logo(100, 50, [0, 128, 255, 255]);
        let config = WatermarkConfig {
            anchor: Anchor::BottomRight,
            scale_percent: 20.0,
            opacity: 1.0,
            margin: 25,
        };

        let once = composite(&base, &logo, &config).unwrap();
        let twice = composite(&once, &logo, &config).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn out_of_bounds_stamp_is_clipped_silently() {
        let base = solid_base(100, 100, [5, 5, 5]);
        let logo = solid_logo(100, 50, [255, 0, 0, 255]);
        // Full-width logo with a margin pushing past the left edge.
        let config = WatermarkConfig {
            anchor: Anchor::BottomRight,
            scale_percent: 100.0,
            opacity: 1.0,
            margin: 40,
        };

        let stamp = PreparedStamp::prepare(100, 100, &logo, &config)
            .unwrap()
            .unwrap();
        // 100 - 100 - 40 = -40: partially off-canvas to the left.
        assert_eq!(stamp.position(), (-40, 10));

        let mut frame = base;
        stamp.apply(&mut frame);
        // Visible part is blended, clipped part simply absent.
        assert_eq!(frame.get_pixel(0, 10), &Rgb([255, 0, 0]));
        assert_eq!(frame.get_pixel(0, 9), &Rgb([5, 5, 5]));
        assert_eq!(frame.get_pixel(60, 10), &Rgb([5, 5, 5]));
    }

    #[test]
    fn config_builders_clamp_ranges() {
        let config = WatermarkConfig::default()
            .with_opacity(1.5)
            .with_scale_percent(150.0);
        assert!((config.opacity - 1.0).abs() < f32::EPSILON);
        assert!((config.scale_percent - 100.0).abs() < f32::EPSILON);

        let config = WatermarkConfig::default().with_opacity(-0.5);
        assert!(config.opacity.abs() < f32::EPSILON);
    }
}
