// src/preprocessing.rs
//
// Image -> tensor conversion for the ONNX models. Pure Rust so it can be
// unit tested without the runtime.

use anyhow::{ensure, Result};

const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Gray used to pad letterboxed YOLO inputs.
const LETTERBOX_FILL: u8 = 114;

/// Resize + ImageNet normalisation, HWC RGB -> CHW f32 (court keypoint model).
pub fn preprocess_imagenet(
    src: &[u8],
    src_width: usize,
    src_height: usize,
    dst_width: usize,
    dst_height: usize,
) -> Result<Vec<f32>> {
    ensure!(
        src.len() == src_width * src_height * 3,
        "frame buffer has {} bytes, expected {}x{}x3",
        src.len(),
        src_width,
        src_height
    );

    let resized = resize_bilinear(src, src_width, src_height, dst_width, dst_height);
    let mut output = vec![0.0f32; 3 * dst_height * dst_width];

    for c in 0..3 {
        for h in 0..dst_height {
            for w in 0..dst_width {
                let hwc_idx = (h * dst_width + w) * 3 + c;
                let chw_idx = c * dst_height * dst_width + h * dst_width + w;

                let pixel = resized[hwc_idx] as f32 / 255.0;
                output[chw_idx] = (pixel - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
            }
        }
    }

    Ok(output)
}

/// Parameters needed to map letterboxed model coordinates back to the frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
}

impl Letterbox {
    pub fn for_frame(src_w: usize, src_h: usize, target_size: usize) -> Self {
        let scale = (target_size as f32 / src_w as f32).min(target_size as f32 / src_h as f32);
        let scaled_w = (src_w as f32 * scale) as usize;
        let scaled_h = (src_h as f32 * scale) as usize;
        Self {
            scale,
            pad_x: (target_size.saturating_sub(scaled_w) / 2) as f32,
            pad_y: (target_size.saturating_sub(scaled_h) / 2) as f32,
        }
    }

    pub fn to_frame(&self, x: f32, y: f32) -> (f32, f32) {
        ((x - self.pad_x) / self.scale, (y - self.pad_y) / self.scale)
    }
}

/// Letterbox into a `target_size` square and normalise to [0, 1], CHW.
pub fn preprocess_letterbox(
    src: &[u8],
    src_w: usize,
    src_h: usize,
    target_size: usize,
) -> Result<(Vec<f32>, Letterbox)> {
    ensure!(
        src.len() == src_w * src_h * 3,
        "frame buffer has {} bytes, expected {}x{}x3",
        src.len(),
        src_w,
        src_h
    );

    let letterbox = Letterbox::for_frame(src_w, src_h, target_size);
    let scaled_w = (src_w as f32 * letterbox.scale) as usize;
    let scaled_h = (src_h as f32 * letterbox.scale) as usize;
    let resized = resize_bilinear(src, src_w, src_h, scaled_w, scaled_h);

    let mut canvas = vec![LETTERBOX_FILL; target_size * target_size * 3];
    let (off_x, off_y) = (letterbox.pad_x as usize, letterbox.pad_y as usize);
    for y in 0..scaled_h {
        let src_row = y * scaled_w * 3;
        let dst_row = ((y + off_y) * target_size + off_x) * 3;
        canvas[dst_row..dst_row + scaled_w * 3]
            .copy_from_slice(&resized[src_row..src_row + scaled_w * 3]);
    }

    let plane = target_size * target_size;
    let mut input = vec![0.0f32; 3 * plane];
    for (i, px) in canvas.chunks_exact(3).enumerate() {
        for c in 0..3 {
            input[c * plane + i] = px[c] as f32 / 255.0;
        }
    }

    Ok((input, letterbox))
}

/// Bilinear image resize
fn resize_bilinear(src: &[u8], src_w: usize, src_h: usize, dst_w: usize, dst_h: usize) -> Vec<u8> {
    let mut dst = vec![0u8; dst_h * dst_w * 3];
    if dst_w == 0 || dst_h == 0 || src_w == 0 || src_h == 0 {
        return dst;
    }

    let x_ratio = src_w as f32 / dst_w as f32;
    let y_ratio = src_h as f32 / dst_h as f32;

    for dy in 0..dst_h {
        for dx in 0..dst_w {
            let sx = dx as f32 * x_ratio;
            let sy = dy as f32 * y_ratio;

            let sx0 = (sx.floor() as usize).min(src_w - 1);
            let sy0 = (sy.floor() as usize).min(src_h - 1);
            let sx1 = (sx0 + 1).min(src_w - 1);
            let sy1 = (sy0 + 1).min(src_h - 1);

            let fx = sx - sx0 as f32;
            let fy = sy - sy0 as f32;

            for c in 0..3 {
                let p00 = src[(sy0 * src_w + sx0) * 3 + c] as f32;
                let p10 = src[(sy0 * src_w + sx1) * 3 + c] as f32;
                let p01 = src[(sy1 * src_w + sx0) * 3 + c] as f32;
                let p11 = src[(sy1 * src_w + sx1) * 3 + c] as f32;

                let val = p00 * (1.0 - fx) * (1.0 - fy)
                    + p10 * fx * (1.0 - fy)
                    + p01 * (1.0 - fx) * fy
                    + p11 * fx * fy;

                dst[(dy * dst_w + dx) * 3 + c] = val.round() as u8;
            }
        }
    }

    dst
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_imagenet_preprocess_shape() {
        let src = vec![128u8; 640 * 480 * 3];
        let result = preprocess_imagenet(&src, 640, 480, 224, 224).unwrap();
        assert_eq!(result.len(), 3 * 224 * 224);
        let expected_r = (128.0 / 255.0 - IMAGENET_MEAN[0]) / IMAGENET_STD[0];
        assert!((result[0] - expected_r).abs() < 1e-5);
    }

    #[test]
    fn test_imagenet_preprocess_rejects_short_buffer() {
        assert!(preprocess_imagenet(&[0u8; 10], 640, 480, 224, 224).is_err());
    }

    #[test]
    fn test_letterbox_pads_wide_frame() {
        let src = vec![255u8; 1280 * 720 * 3];
        let (input, lb) = preprocess_letterbox(&src, 1280, 720, 640).unwrap();
        assert_eq!(input.len(), 3 * 640 * 640);
        assert_eq!(lb.scale, 0.5);
        assert_eq!(lb.pad_x, 0.0);
        assert_eq!(lb.pad_y, 140.0);
        // Top rows are padding, middle rows are image
        assert!((input[0] - 114.0 / 255.0).abs() < 1e-6);
        assert!((input[320 * 640 + 320] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_letterbox_maps_back_to_frame() {
        let lb = Letterbox::for_frame(1280, 720, 640);
        assert_eq!(lb.to_frame(320.0, 320.0), (640.0, 360.0));
    }

    #[test]
    fn test_resize() {
        let src = vec![255u8; 100 * 100 * 3];
        let dst = resize_bilinear(&src, 100, 100, 50, 50);
        assert_eq!(dst.len(), 50 * 50 * 3);
        assert!(dst.iter().all(|&v| v == 255));
    }
}
