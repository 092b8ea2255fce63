//! Image operations behind `/process` and `/api/process`
//!
//! Each operation reads its parameters from [`ParamValues`], falling back to
//! the catalog default when a value is missing or does not parse. Results
//! are always written as 3-channel PNG.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgb, RgbImage};
use imageproc::contours::{find_contours, BorderType};
use imageproc::drawing::draw_line_segment_mut;
use imageproc::edges::canny;
use imageproc::point::Point;

/// Largest Gaussian kernel accepted by `blur`
pub const MAX_KSIZE: i64 = 1001;
/// Largest bilateral filter diameter
pub const MAX_BILATERAL_DIAMETER: i64 = 31;
/// Largest image `resize` may produce (64 Mpx)
pub const MAX_OUTPUT_PIXELS: u64 = 64 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("Unable to read image at {path}: {source}")]
    Read {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParam { name: &'static str, reason: String },
    #[error("Failed to write output image: {0}")]
    Write(#[from] image::ImageError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Raw form values keyed by parameter name
#[derive(Debug, Clone, Default)]
pub struct ParamValues(HashMap<String, String>);

impl ParamValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Integer value, or `default` when absent or unparsable
    pub fn int(&self, name: &str, default: i64) -> i64 {
        self.get(name)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    /// Float value, or `default` when absent or unparsable
    pub fn float(&self, name: &str, default: f64) -> f64 {
        self.get(name)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| !v.is_nan())
            .unwrap_or(default)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ParamValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Operations the host can run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOp {
    Grayscale,
    Blur,
    Canny,
    Threshold,
    EqualizeHist,
    ConvertHsv,
    ConvertLab,
    SplitMerge,
    BitwiseNot,
    Resize,
    Rotate,
    SmoothBilateral,
    MaskCircle,
    Sobel,
    Laplacian,
    Contours,
}

impl FromStr for ImageOp {
    type Err = ProcessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "grayscale" => Self::Grayscale,
            "blur" => Self::Blur,
            "canny" => Self::Canny,
            "threshold" => Self::Threshold,
            "equalize_hist" => Self::EqualizeHist,
            "convert_hsv" => Self::ConvertHsv,
            "convert_lab" => Self::ConvertLab,
            "split_merge" => Self::SplitMerge,
            "bitwise_not" => Self::BitwiseNot,
            "resize" => Self::Resize,
            "rotate" => Self::Rotate,
            "smooth_bilateral" => Self::SmoothBilateral,
            "mask_circle" => Self::MaskCircle,
            "sobel" => Self::Sobel,
            "laplacian" => Self::Laplacian,
            "contours" => Self::Contours,
            _ => return Err(ProcessError::Unsupported(s.to_string())),
        })
    }
}

/// Decode `input`, apply `operation` and write the PNG result to `output`
pub fn process_image(
    input: &Path,
    output: &Path,
    operation: &str,
    params: &ParamValues,
) -> Result<PathBuf, ProcessError> {
    let op: ImageOp = operation.parse()?;
    let img = image::open(input).map_err(|source| ProcessError::Read {
        path: input.to_path_buf(),
        source,
    })?;

    let out = apply(op, &img, params)?;

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    DynamicImage::ImageRgb8(out).save_with_format(output, ImageFormat::Png)?;
    tracing::debug!(?op, output = %output.display(), "Wrote result");

    Ok(output.to_path_buf())
}

/// Apply one operation in memory
pub fn apply(op: ImageOp, img: &DynamicImage, params: &ParamValues) -> Result<RgbImage, ProcessError> {
    let out = match op {
        ImageOp::Grayscale => gray_to_rgb(&luma(img)),
        ImageOp::Blur => {
            let rgb = img.to_rgb8();
            let k = blur_kernel(params.int("ksize", 5), rgb.width(), rgb.height())?;
            imageops::blur(&rgb, gaussian_sigma(k))
        }
        ImageOp::Canny => {
            let t1 = params.int("threshold1", 100);
            let t2 = params.int("threshold2", 200);
            #[allow(clippy::cast_precision_loss)]
            let (low, high) = (t1.min(t2) as f32, t1.max(t2) as f32);
            gray_to_rgb(&canny(&luma(img), low, high))
        }
        ImageOp::Threshold => {
            let thresh = params.int("thresh", 127);
            let maxval = u8::try_from(params.int("maxval", 255).clamp(0, 255)).unwrap_or(u8::MAX);
            let gray = luma(img);
            gray_to_rgb(&GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
                let v = i64::from(gray.get_pixel(x, y)[0]);
                Luma([if v > thresh { maxval } else { 0 }])
            }))
        }
        ImageOp::EqualizeHist => gray_to_rgb(&equalize_hist(&luma(img))),
        ImageOp::ConvertHsv => {
            let mut rgb = img.to_rgb8();
            for p in rgb.pixels_mut() {
                let [h, s, v] = hsv(p.0);
                // HSV stored in B, G, R order
                *p = Rgb([v, s, h]);
            }
            rgb
        }
        ImageOp::ConvertLab => {
            let mut rgb = img.to_rgb8();
            for p in rgb.pixels_mut() {
                let [l, a, b] = lab(p.0);
                // Lab stored in B, G, R order
                *p = Rgb([b, a, l]);
            }
            rgb
        }
        ImageOp::SplitMerge => {
            let mut rgb = img.to_rgb8();
            for p in rgb.pixels_mut() {
                p.0.swap(0, 2);
            }
            rgb
        }
        ImageOp::BitwiseNot => {
            let mut rgb = img.to_rgb8();
            imageops::invert(&mut rgb);
            rgb
        }
        ImageOp::Resize => {
            let scale = params.float("scale", 0.5);
            let rgb = img.to_rgb8();
            let (w, h) = scaled_size(rgb.width(), rgb.height(), scale)?;
            imageops::resize(&rgb, w, h, FilterType::Triangle)
        }
        ImageOp::Rotate => rotate(&img.to_rgb8(), params.float("angle", 90.0)),
        ImageOp::SmoothBilateral => {
            let d = params.int("d", 9);
            if d > MAX_BILATERAL_DIAMETER {
                return Err(ProcessError::InvalidParam {
                    name: "d",
                    reason: format!("must be at most {MAX_BILATERAL_DIAMETER}"),
                });
            }
            #[allow(clippy::cast_precision_loss)]
            let (sigma_color, sigma_space) = (
                params.int("sigmaColor", 75) as f64,
                params.int("sigmaSpace", 75) as f64,
            );
            bilateral(&img.to_rgb8(), d, sigma_color, sigma_space)
        }
        ImageOp::MaskCircle => mask_circle(&img.to_rgb8()),
        ImageOp::Sobel => gray_to_rgb(&sobel(&luma(img))),
        ImageOp::Laplacian => gray_to_rgb(&laplacian(&luma(img))),
        ImageOp::Contours => {
            let edges = canny(&luma(img), 100.0, 200.0);
            let mut out = img.to_rgb8();
            for contour in find_contours::<i32>(&edges) {
                if contour.border_type == BorderType::Outer && contour.parent.is_none() {
                    draw_contour(&mut out, &contour.points);
                }
            }
            out
        }
    };
    Ok(out)
}

/// Gray conversion with BT.601 weights, matching OpenCV's `BGR2GRAY`
fn luma(img: &DynamicImage) -> GrayImage {
    let rgb = img.to_rgb8();
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        Luma([saturate(
            0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b),
        )])
    })
}

fn gray_to_rgb(gray: &GrayImage) -> RgbImage {
    DynamicImage::ImageLuma8(gray.clone()).to_rgb8()
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn saturate(v: f64) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// Kernel sizes must be odd and positive
const fn odd_kernel(k: i64) -> i64 {
    let k = if k < 1 { 1 } else { k };
    if k % 2 == 0 {
        k + 1
    } else {
        k
    }
}

/// Odd kernel size for `blur`, no wider than the image needs
fn blur_kernel(ksize: i64, w: u32, h: u32) -> Result<i64, ProcessError> {
    if ksize > MAX_KSIZE {
        return Err(ProcessError::InvalidParam {
            name: "ksize",
            reason: format!("must be at most {MAX_KSIZE}"),
        });
    }
    Ok(odd_kernel(ksize).min(2 * i64::from(w.max(h)) + 1))
}

/// Sigma OpenCV derives from a Gaussian kernel size when none is given
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn gaussian_sigma(k: i64) -> f32 {
    (0.3 * ((k - 1) as f64 * 0.5 - 1.0) + 0.8) as f32
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn scaled_size(w: u32, h: u32, scale: f64) -> Result<(u32, u32), ProcessError> {
    let invalid = |reason: &str| ProcessError::InvalidParam {
        name: "scale",
        reason: reason.to_string(),
    };
    if !scale.is_finite() || scale <= 0.0 {
        return Err(invalid("must be a positive number"));
    }
    let nw = (f64::from(w) * scale).round();
    let nh = (f64::from(h) * scale).round();
    if nw < 1.0 || nh < 1.0 {
        return Err(invalid("result would be empty"));
    }
    #[allow(clippy::cast_precision_loss)]
    let max_pixels = MAX_OUTPUT_PIXELS as f64;
    if nw > f64::from(u16::MAX) || nh > f64::from(u16::MAX) || nw * nh > max_pixels {
        return Err(invalid("result would be too large"));
    }
    Ok((nw as u32, nh as u32))
}

fn equalize_hist(gray: &GrayImage) -> GrayImage {
    let mut hist = [0u64; 256];
    for p in gray.pixels() {
        hist[usize::from(p[0])] += 1;
    }
    let total: u64 = hist.iter().sum();
    let first = hist.iter().copied().find(|&c| c > 0).unwrap_or(0);
    if total == first {
        return gray.clone();
    }

    let mut lut = [0u8; 256];
    let mut cdf = 0u64;
    #[allow(clippy::cast_precision_loss)]
    let scale = 255.0 / (total - first) as f64;
    for (i, count) in hist.iter().enumerate() {
        cdf += count;
        #[allow(clippy::cast_precision_loss)]
        let v = cdf.saturating_sub(first) as f64 * scale;
        lut[i] = saturate(v);
    }

    let mut out = gray.clone();
    for p in out.pixels_mut() {
        p[0] = lut[usize::from(p[0])];
    }
    out
}

/// 8-bit HSV with hue halved to fit 0..180
fn hsv([r, g, b]: [u8; 3]) -> [u8; 3] {
    let (r, g, b) = (f64::from(r), f64::from(g), f64::from(b));
    let v = r.max(g).max(b);
    let min = r.min(g).min(b);
    let diff = v - min;
    let s = if v == 0.0 { 0.0 } else { 255.0 * diff / v };
    let mut h = if diff == 0.0 {
        0.0
    } else if (v - r).abs() < f64::EPSILON {
        60.0 * (g - b) / diff
    } else if (v - g).abs() < f64::EPSILON {
        120.0 + 60.0 * (b - r) / diff
    } else {
        240.0 + 60.0 * (r - g) / diff
    };
    if h < 0.0 {
        h += 360.0;
    }
    [saturate(h / 2.0), saturate(s), saturate(v)]
}

/// 8-bit CIE L*a*b* (D65) with L scaled to 0..255 and a, b offset by 128
#[allow(clippy::many_single_char_names)]
fn lab([r, g, b]: [u8; 3]) -> [u8; 3] {
    fn linear(c: u8) -> f64 {
        let c = f64::from(c) / 255.0;
        if c <= 0.040_45 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    }
    fn f(t: f64) -> f64 {
        if t > 0.008_856 {
            t.cbrt()
        } else {
            7.787 * t + 16.0 / 116.0
        }
    }

    let (r, g, b) = (linear(r), linear(g), linear(b));
    let x = (0.412_453 * r + 0.357_580 * g + 0.180_423 * b) / 0.950_456;
    let y = 0.212_671 * r + 0.715_160 * g + 0.072_169 * b;
    let z = (0.019_334 * r + 0.119_193 * g + 0.950_227 * b) / 1.088_754;

    let l = if y > 0.008_856 { 116.0 * y.cbrt() - 16.0 } else { 903.3 * y };
    let a = 500.0 * (f(x) - f(y)) + 128.0;
    let bb = 200.0 * (f(y) - f(z)) + 128.0;
    [saturate(l * 255.0 / 100.0), saturate(a), saturate(bb)]
}

/// Edge-preserving smoothing; colour distance is the L1 norm over channels
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::similar_names
)]
fn bilateral(src: &RgbImage, d: i64, sigma_color: f64, sigma_space: f64) -> RgbImage {
    let sigma_color = if sigma_color <= 0.0 { 1.0 } else { sigma_color };
    let sigma_space = if sigma_space <= 0.0 { 1.0 } else { sigma_space };
    let radius = if d <= 0 { (sigma_space * 1.5).round() as i64 } else { d / 2 };
    let radius = radius.clamp(1, MAX_BILATERAL_DIAMETER / 2);

    let color_coeff = -0.5 / (sigma_color * sigma_color);
    let space_coeff = -0.5 / (sigma_space * sigma_space);

    let mut offsets = Vec::new();
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let r2 = dx * dx + dy * dy;
            if r2 <= radius * radius {
                offsets.push((dx, dy, (r2 as f64 * space_coeff).exp()));
            }
        }
    }

    let (w, h) = src.dimensions();
    RgbImage::from_fn(w, h, |x, y| {
        let centre = src.get_pixel(x, y).0;
        let mut sum = [0.0f64; 3];
        let mut wsum = 0.0;
        for &(dx, dy, space_weight) in &offsets {
            let sx = reflect101(i64::from(x) + dx, w);
            let sy = reflect101(i64::from(y) + dy, h);
            let px = src.get_pixel(sx, sy).0;
            let diff: f64 = px
                .iter()
                .zip(centre.iter())
                .map(|(a, b)| f64::from(a.abs_diff(*b)))
                .sum();
            let weight = space_weight * (diff * diff * color_coeff).exp();
            for (acc, c) in sum.iter_mut().zip(px.iter()) {
                *acc += weight * f64::from(*c);
            }
            wsum += weight;
        }
        Rgb(sum.map(|v| saturate(v / wsum)))
    })
}

/// Draw a closed contour in green, two pixels wide
#[allow(clippy::cast_precision_loss)]
fn draw_contour(canvas: &mut RgbImage, points: &[Point<i32>]) {
    const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
    for (i, p) in points.iter().enumerate() {
        let q = points[(i + 1) % points.len()];
        for offset in [0.0, 1.0] {
            draw_line_segment_mut(
                canvas,
                (p.x as f32 + offset, p.y as f32),
                (q.x as f32 + offset, q.y as f32),
                GREEN,
            );
        }
    }
}

/// Rotate about the centre on a same-size canvas; positive is counter-clockwise
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn rotate(src: &RgbImage, angle_deg: f64) -> RgbImage {
    let (w, h) = src.dimensions();
    let cx = f64::from(w / 2);
    let cy = f64::from(h / 2);
    let (sin, cos) = angle_deg.to_radians().sin_cos();

    RgbImage::from_fn(w, h, |x, y| {
        let dx = f64::from(x) - cx;
        let dy = f64::from(y) - cy;
        let sx = (cos * dx - sin * dy + cx).round();
        let sy = (sin * dx + cos * dy + cy).round();
        if sx >= 0.0 && sy >= 0.0 && sx < f64::from(w) && sy < f64::from(h) {
            *src.get_pixel(sx as u32, sy as u32)
        } else {
            Rgb([0, 0, 0])
        }
    })
}

fn mask_circle(src: &RgbImage) -> RgbImage {
    let (w, h) = src.dimensions();
    let r = i64::from(w.min(h) / 4);
    let cx = i64::from(w / 2);
    let cy = i64::from(h / 2);

    RgbImage::from_fn(w, h, |x, y| {
        let dx = i64::from(x) - cx;
        let dy = i64::from(y) - cy;
        if dx * dx + dy * dy <= r * r {
            *src.get_pixel(x, y)
        } else {
            Rgb([0, 0, 0])
        }
    })
}

/// Border index mirroring without repeating the edge pixel (`gfedcb|abcdefgh|gfedcba`)
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn reflect101(i: i64, n: u32) -> u32 {
    let n = i64::from(n);
    if n == 1 {
        return 0;
    }
    let i = if i < 0 { -i } else { i };
    let i = if i >= n { 2 * n - 2 - i } else { i };
    i.clamp(0, n - 1) as u32
}

/// Sum of a 3x3 kernel around (x, y)
fn convolve3(gray: &GrayImage, x: u32, y: u32, kernel: &[[i32; 3]; 3]) -> f64 {
    let (w, h) = gray.dimensions();
    let mut acc = 0i32;
    for (ky, row) in kernel.iter().enumerate() {
        for (kx, k) in row.iter().enumerate() {
            if *k == 0 {
                continue;
            }
            let sx = reflect101(i64::from(x) + kx as i64 - 1, w);
            let sy = reflect101(i64::from(y) + ky as i64 - 1, h);
            acc += k * i32::from(gray.get_pixel(sx, sy)[0]);
        }
    }
    f64::from(acc)
}

fn sobel(gray: &GrayImage) -> GrayImage {
    const GX: [[i32; 3]; 3] = [[-1, 0, 1], [-2, 0, 2], [-1, 0, 1]];
    const GY: [[i32; 3]; 3] = [[-1, -2, -1], [0, 0, 0], [1, 2, 1]];
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let gx = convolve3(gray, x, y, &GX);
        let gy = convolve3(gray, x, y, &GY);
        Luma([saturate(gx.hypot(gy))])
    })
}

fn laplacian(gray: &GrayImage) -> GrayImage {
    const K: [[i32; 3]; 3] = [[0, 1, 0], [1, -4, 1], [0, 1, 0]];
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        Luma([saturate(convolve3(gray, x, y, &K).abs())])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use imgops_web_protocol::catalog;

    fn solid(w: u32, h: u32, px: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb(px)))
    }

    #[test]
    fn test_param_coercion_falls_back() {
        let params: ParamValues = [("ksize", " 7 "), ("scale", "abc"), ("angle", "45.5"), ("d", "5.0")]
            .into_iter()
            .collect();
        assert_eq!(params.int("ksize", 5), 7);
        assert_eq!(params.int("missing", 5), 5);
        assert_eq!(params.int("d", 9), 9);
        assert!((params.float("scale", 0.5) - 0.5).abs() < f64::EPSILON);
        assert!((params.float("angle", 90.0) - 45.5).abs() < f64::EPSILON);
        assert!((params.float("nan", 1.0) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_every_catalog_operation_is_supported() {
        for op in &catalog::builtin() {
            assert!(op.name.parse::<ImageOp>().is_ok(), "{} not runnable", op.name);
        }
        assert!(matches!("Grayscale".parse::<ImageOp>(), Ok(ImageOp::Grayscale)));
        assert!(matches!("face_detect".parse::<ImageOp>(), Err(ProcessError::Unsupported(_))));
    }

    #[test]
    fn test_odd_kernel() {
        assert_eq!(odd_kernel(4), 5);
        assert_eq!(odd_kernel(5), 5);
        assert_eq!(odd_kernel(0), 1);
        assert_eq!(odd_kernel(-3), 1);
    }

    #[test]
    fn test_blur_rejects_oversized_kernel() {
        let img = solid(4, 4, [50, 60, 70]);
        let params: ParamValues = [("ksize", "2000000001")].into_iter().collect();
        assert!(matches!(
            apply(ImageOp::Blur, &img, &params),
            Err(ProcessError::InvalidParam { name: "ksize", .. })
        ));

        // Wider than the image but within the cap: clamped, not rejected
        let params: ParamValues = [("ksize", "101")].into_iter().collect();
        let out = apply(ImageOp::Blur, &img, &params).unwrap();
        assert_eq!(out.dimensions(), (4, 4));
        assert_eq!(blur_kernel(101, 4, 3).unwrap(), 9);
    }

    #[test]
    fn test_gray_uses_bt601_weights() {
        let out = apply(ImageOp::Grayscale, &solid(1, 1, [255, 0, 0]), &ParamValues::new()).unwrap();
        assert_eq!(out.get_pixel(0, 0), &Rgb([76, 76, 76]));
        let out = apply(ImageOp::Grayscale, &solid(1, 1, [0, 255, 0]), &ParamValues::new()).unwrap();
        assert_eq!(out.get_pixel(0, 0)[0], 150);
    }

    #[test]
    fn test_threshold() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_fn(2, 1, |x, _| Luma([if x == 0 { 100 } else { 200 }])));
        let params: ParamValues = [("thresh", "150"), ("maxval", "250")].into_iter().collect();
        let out = apply(ImageOp::Threshold, &img, &params).unwrap();
        assert_eq!(out.get_pixel(0, 0), &Rgb([0, 0, 0]));
        assert_eq!(out.get_pixel(1, 0), &Rgb([250, 250, 250]));
    }

    #[test]
    fn test_split_merge_and_not() {
        let img = solid(2, 2, [10, 20, 30]);
        let swapped = apply(ImageOp::SplitMerge, &img, &ParamValues::new()).unwrap();
        assert_eq!(swapped.get_pixel(1, 1), &Rgb([30, 20, 10]));
        let inverted = apply(ImageOp::BitwiseNot, &img, &ParamValues::new()).unwrap();
        assert_eq!(inverted.get_pixel(0, 0), &Rgb([245, 235, 225]));
    }

    #[test]
    fn test_resize_uses_default_scale() {
        let out = apply(ImageOp::Resize, &solid(10, 6, [1, 2, 3]), &ParamValues::new()).unwrap();
        assert_eq!(out.dimensions(), (5, 3));

        let params: ParamValues = [("scale", "0")].into_iter().collect();
        assert!(matches!(
            apply(ImageOp::Resize, &solid(10, 6, [1, 2, 3]), &params),
            Err(ProcessError::InvalidParam { name: "scale", .. })
        ));
    }

    #[test]
    fn test_resize_rejects_huge_output() {
        let params: ParamValues = [("scale", "1000")].into_iter().collect();
        assert!(matches!(
            apply(ImageOp::Resize, &solid(64, 64, [1, 2, 3]), &params),
            Err(ProcessError::InvalidParam { name: "scale", .. })
        ));
        assert!(scaled_size(4096, 4096, 2.0).is_ok());
        assert!(scaled_size(4096, 4096, 3.0).is_err());
    }

    #[test]
    fn test_rotate_keeps_size_and_centre() {
        let mut src = RgbImage::from_pixel(5, 5, Rgb([0, 0, 0]));
        src.put_pixel(2, 2, Rgb([255, 0, 0]));
        src.put_pixel(4, 2, Rgb([0, 255, 0]));
        let out = apply(ImageOp::Rotate, &DynamicImage::ImageRgb8(src), &ParamValues::new()).unwrap();
        assert_eq!(out.dimensions(), (5, 5));
        assert_eq!(out.get_pixel(2, 2), &Rgb([255, 0, 0]));
        // 90 degrees counter-clockwise moves the right edge to the top
        assert_eq!(out.get_pixel(2, 0), &Rgb([0, 255, 0]));
    }

    #[test]
    fn test_mask_circle_blacks_out_corners() {
        let out = apply(ImageOp::MaskCircle, &solid(8, 8, [9, 9, 9]), &ParamValues::new()).unwrap();
        assert_eq!(out.get_pixel(0, 0), &Rgb([0, 0, 0]));
        assert_eq!(out.get_pixel(4, 4), &Rgb([9, 9, 9]));
    }

    #[test]
    fn test_hsv() {
        assert_eq!(hsv([255, 0, 0]), [0, 255, 255]);
        assert_eq!(hsv([0, 255, 0]), [60, 255, 255]);
        assert_eq!(hsv([0, 0, 255]), [120, 255, 255]);
        assert_eq!(hsv([0, 0, 0]), [0, 0, 0]);
    }

    #[test]
    fn test_edges_are_zero_on_flat_image() {
        let img = solid(4, 4, [80, 80, 80]);
        let sob = apply(ImageOp::Sobel, &img, &ParamValues::new()).unwrap();
        let lap = apply(ImageOp::Laplacian, &img, &ParamValues::new()).unwrap();
        assert!(sob.pixels().chain(lap.pixels()).all(|p| p.0 == [0, 0, 0]));
    }

    fn square(size: u32, lo: u32, hi: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(size, size, |x, y| {
            if (lo..hi).contains(&x) && (lo..hi).contains(&y) {
                Rgb([255, 255, 255])
            } else {
                Rgb([0, 0, 0])
            }
        }))
    }

    #[test]
    fn test_canny_finds_square_edges() {
        let flat = apply(ImageOp::Canny, &solid(8, 8, [90, 90, 90]), &ParamValues::new()).unwrap();
        assert!(flat.pixels().all(|p| p.0 == [0, 0, 0]));

        let edges = apply(ImageOp::Canny, &square(24, 6, 18), &ParamValues::new()).unwrap();
        assert!(edges.pixels().any(|p| p.0 == [255, 255, 255]));
        assert_eq!(edges.get_pixel(12, 12), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_contours_drawn_in_green() {
        let img = square(24, 6, 18);
        let out = apply(ImageOp::Contours, &img, &ParamValues::new()).unwrap();
        assert!(out.pixels().any(|p| p.0 == [0, 255, 0]));
        assert_eq!(out.get_pixel(0, 0), &Rgb([0, 0, 0]));
        assert_eq!(out.get_pixel(12, 12), &Rgb([255, 255, 255]));

        let flat = solid(8, 8, [40, 40, 40]);
        let untouched = apply(ImageOp::Contours, &flat, &ParamValues::new()).unwrap();
        assert_eq!(untouched, flat.to_rgb8());
    }

    #[test]
    fn test_lab() {
        assert_eq!(lab([255, 255, 255]), [255, 128, 128]);
        assert_eq!(lab([0, 0, 0]), [0, 128, 128]);
        let out = apply(ImageOp::ConvertLab, &solid(1, 1, [255, 255, 255]), &ParamValues::new()).unwrap();
        assert_eq!(out.get_pixel(0, 0), &Rgb([128, 128, 255]));
        // red has positive a and b
        let [_, a, b] = lab([255, 0, 0]);
        assert!(a > 128 && b > 128);
    }

    #[test]
    fn test_bilateral_keeps_flat_image_and_caps_diameter() {
        let img = solid(6, 6, [10, 120, 230]);
        let out = apply(ImageOp::SmoothBilateral, &img, &ParamValues::new()).unwrap();
        assert_eq!(out, img.to_rgb8());

        // A strong edge survives smoothing
        let edge = apply(ImageOp::SmoothBilateral, &square(12, 0, 6), &ParamValues::new()).unwrap();
        assert!(edge.get_pixel(2, 2)[0] > 240);
        assert!(edge.get_pixel(9, 9)[0] < 15);

        let params: ParamValues = [("d", "500")].into_iter().collect();
        assert!(matches!(
            apply(ImageOp::SmoothBilateral, &img, &params),
            Err(ProcessError::InvalidParam { name: "d", .. })
        ));
    }

    #[test]
    fn test_equalize_stretches_range() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_fn(2, 1, |x, _| Luma([if x == 0 { 100 } else { 110 }])));
        let out = apply(ImageOp::EqualizeHist, &img, &ParamValues::new()).unwrap();
        assert_eq!(out.get_pixel(0, 0)[0], 0);
        assert_eq!(out.get_pixel(1, 0)[0], 255);

        let flat = apply(ImageOp::EqualizeHist, &solid(2, 2, [7, 7, 7]), &ParamValues::new()).unwrap();
        assert_eq!(flat.get_pixel(0, 0)[0], 7);
    }

    #[test]
    fn test_process_image_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.png");
        solid(4, 4, [200, 100, 50]).save(&input).unwrap();
        let output = dir.path().join("results").join("out.png");

        let written = process_image(&input, &output, "GRAYSCALE", &ParamValues::new()).unwrap();
        assert_eq!(written, output);
        let decoded = image::open(&output).unwrap();
        assert_eq!(decoded.color(), image::ColorType::Rgb8);
    }

    #[test]
    fn test_process_image_errors() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("missing.png");
        let output = dir.path().join("out.png");
        assert!(matches!(
            process_image(&input, &output, "blur", &ParamValues::new()),
            Err(ProcessError::Read { .. })
        ));
        assert!(matches!(
            process_image(&input, &output, "face_detect", &ParamValues::new()),
            Err(ProcessError::Unsupported(_))
        ));
    }
}
