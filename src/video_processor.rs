// src/video_processor.rs

use crate::types::VideoConfig;
use std::path::{Path, PathBuf};
use tracing::info;
use walkdir::WalkDir;

const VIDEO_EXTENSIONS: [&str; 4] = ["mp4", "avi", "mov", "mkv"];

fn is_video(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// A single file is returned as is; a directory is walked recursively.
pub fn find_video_files(input: &Path) -> Vec<PathBuf> {
    if input.is_file() {
        return vec![input.to_path_buf()];
    }

    let mut videos: Vec<PathBuf> = WalkDir::new(input)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file() && is_video(p))
        .collect();
    videos.sort();

    info!("Found {} video files", videos.len());
    videos
}

fn output_name(input: &Path, config: &VideoConfig, extension: &str) -> String {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    format!("{}{}.{}", stem, config.output_suffix, extension)
}

/// `<output_dir>/<stem><suffix>.avi`
pub fn output_path_for(input: &Path, config: &VideoConfig) -> PathBuf {
    PathBuf::from(&config.output_dir).join(output_name(input, config, "avi"))
}

/// `<export_dir>/<stem><suffix>.jsonl`, one statistics file per input video.
pub fn stats_path_for(input: &Path, export_dir: &Path, config: &VideoConfig) -> PathBuf {
    export_dir.join(output_name(input, config, "jsonl"))
}

#[cfg(feature = "video")]
pub use codec::{frame_to_mat, read_video, VideoClip, VideoSink};

#[cfg(feature = "video")]
mod codec {
    use crate::error::{AnalysisError, AnalysisResult};
    use crate::types::Frame;
    use opencv::{
        core::{self, Mat},
        imgproc,
        prelude::*,
        videoio::{self, VideoCapture, VideoCaptureTrait, VideoCaptureTraitConst, VideoWriter},
    };
    use std::path::{Path, PathBuf};
    use tracing::{debug, info};

    /// All frames of a video, decoded up front.
    pub struct VideoClip {
        pub frames: Vec<Frame>,
        /// Container-reported rate; analysis uses the configured fps
        pub source_fps: f64,
        pub width: usize,
        pub height: usize,
    }

    pub fn read_video(path: &Path) -> AnalysisResult<VideoClip> {
        info!("Opening video: {}", path.display());
        let decode_err = |e: opencv::Error| AnalysisError::Decode {
            path: path.to_path_buf(),
            source: e.into(),
        };

        let mut cap = VideoCapture::from_file(&path.to_string_lossy(), videoio::CAP_ANY)
            .map_err(decode_err)?;
        if !cap.is_opened().map_err(decode_err)? {
            return Err(AnalysisError::Decode {
                path: path.to_path_buf(),
                source: "capture did not open".into(),
            });
        }

        let source_fps = VideoCaptureTraitConst::get(&cap, videoio::CAP_PROP_FPS).map_err(decode_err)?;
        let width = VideoCaptureTraitConst::get(&cap, videoio::CAP_PROP_FRAME_WIDTH)
            .map_err(decode_err)? as usize;
        let height = VideoCaptureTraitConst::get(&cap, videoio::CAP_PROP_FRAME_HEIGHT)
            .map_err(decode_err)? as usize;

        let mut frames = Vec::new();
        let mut mat = Mat::default();
        while VideoCaptureTrait::read(&mut cap, &mut mat).map_err(decode_err)? && !mat.empty() {
            let mut rgb = Mat::default();
            imgproc::cvt_color(&mat, &mut rgb, imgproc::COLOR_BGR2RGB, 0).map_err(decode_err)?;
            frames.push(Frame {
                index: frames.len(),
                data: rgb.data_bytes().map_err(decode_err)?.to_vec(),
                width,
                height,
            });
        }

        if frames.is_empty() {
            return Err(AnalysisError::EmptyVideo(path.to_path_buf()));
        }

        info!(
            "Video properties: {}x{} @ {:.1} FPS, {} frames",
            width,
            height,
            source_fps,
            frames.len()
        );
        Ok(VideoClip {
            frames,
            source_fps,
            width,
            height,
        })
    }

    /// RGB frame buffer -> BGR Mat for drawing and encoding.
    pub fn frame_to_mat(frame: &Frame) -> opencv::Result<Mat> {
        let mat = Mat::from_slice(&frame.data)?;
        let mat = mat.reshape(3, frame.height as i32)?;

        let mut bgr = Mat::default();
        imgproc::cvt_color(&mat, &mut bgr, imgproc::COLOR_RGB2BGR, 0)?;
        Ok(bgr)
    }

    pub struct VideoSink {
        writer: VideoWriter,
        path: PathBuf,
        frames_written: usize,
    }

    impl VideoSink {
        pub fn create(
            path: &Path,
            width: usize,
            height: usize,
            fps: f64,
            fourcc: &str,
        ) -> AnalysisResult<Self> {
            let encode_err = |message: String| AnalysisError::Encode {
                path: path.to_path_buf(),
                message,
            };

            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| encode_err(e.to_string()))?;
            }

            let code: Vec<char> = fourcc.chars().collect();
            let &[c1, c2, c3, c4] = code.as_slice() else {
                return Err(encode_err(format!("fourcc {:?} must be 4 characters", fourcc)));
            };
            let fourcc = VideoWriter::fourcc(c1, c2, c3, c4).map_err(|e| encode_err(e.to_string()))?;

            let writer = VideoWriter::new(
                &path.to_string_lossy(),
                fourcc,
                fps,
                core::Size::new(width as i32, height as i32),
                true,
            )
            .map_err(|e| encode_err(e.to_string()))?;

            if !writer.is_opened().map_err(|e| encode_err(e.to_string()))? {
                return Err(encode_err("video writer did not open".to_string()));
            }

            info!("Output video: {}", path.display());
            Ok(Self {
                writer,
                path: path.to_path_buf(),
                frames_written: 0,
            })
        }

        pub fn write(&mut self, frame: &Mat) -> AnalysisResult<()> {
            self.writer.write(frame).map_err(|e| AnalysisError::Encode {
                path: self.path.clone(),
                message: e.to_string(),
            })?;
            self.frames_written += 1;
            Ok(())
        }

        pub fn finish(mut self) -> AnalysisResult<PathBuf> {
            self.writer.release().map_err(|e| AnalysisError::Encode {
                path: self.path.clone(),
                message: e.to_string(),
            })?;
            debug!("Closed {} after {} frames", self.path.display(), self.frames_written);
            Ok(self.path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_output_path_uses_stem_and_suffix() {
        let config = VideoConfig::default();
        let out = output_path_for(Path::new("input_videos/final_set.mp4"), &config);
        assert_eq!(out, PathBuf::from("output_videos/final_set_analysis.avi"));
    }

    #[test]
    fn test_each_video_gets_its_own_stats_file() {
        let config = VideoConfig::default();
        let dir = Path::new("output_videos/stats");
        let a = stats_path_for(Path::new("input_videos/day1/final.mp4"), dir, &config);
        let b = stats_path_for(Path::new("input_videos/day1/semi.mp4"), dir, &config);
        assert_eq!(a, PathBuf::from("output_videos/stats/final_analysis.jsonl"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_directory_is_walked_for_videos() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("day2")).unwrap();
        fs::write(dir.path().join("a.mp4"), b"").unwrap();
        fs::write(dir.path().join("day2").join("b.MOV"), b"").unwrap();
        fs::write(dir.path().join("notes.txt"), b"").unwrap();

        let found = find_video_files(dir.path());
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|p| is_video(p)));

        let single = find_video_files(&dir.path().join("a.mp4"));
        assert_eq!(single, vec![dir.path().join("a.mp4")]);
    }
}
