// src/detection/cache.rs
//
// Content-addressed store for per-frame detection results ("stubs").
//
// The cache key is SHA-256 over (video fingerprint, detector name,
// detector version). The video fingerprint is the SHA-256 of the file's
// bytes, so a stub can never be replayed against a different video.

use crate::error::{AnalysisError, AnalysisResult};
use crate::types::{CacheConfig, CacheMode, DetectionMap};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Fingerprint of the analysed video.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoKey(String);

impl VideoKey {
    pub fn from_file(path: &Path) -> AnalysisResult<Self> {
        let cache_err = |e: std::io::Error| AnalysisError::Cache {
            path: path.to_path_buf(),
            source: e.into(),
        };

        let mut reader = BufReader::new(File::open(path).map_err(cache_err)?);
        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; 1 << 16];
        loop {
            let n = reader.read(&mut buf).map_err(cache_err)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }

        Ok(Self(hex::encode(hasher.finalize())))
    }

    /// Key for content that is not backed by a file (e.g. synthetic frames).
    pub fn from_label(label: &str) -> Self {
        Self(hex::encode(Sha256::digest(label.as_bytes())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CachedDetections {
    detector: String,
    version: String,
    video: String,
    frames: Vec<DetectionMap>,
}

#[derive(Debug, Clone)]
pub struct DetectionCache {
    dir: PathBuf,
    mode: CacheMode,
}

impl DetectionCache {
    pub fn new(dir: impl Into<PathBuf>, mode: CacheMode) -> Self {
        Self {
            dir: dir.into(),
            mode,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(&config.dir, config.mode)
    }

    pub fn entry_path(&self, detector: &str, version: &str, video: &VideoKey) -> PathBuf {
        let mut hasher = Sha256::new();
        for part in [video.as_str(), detector, version] {
            hasher.update(part.as_bytes());
            hasher.update([0u8]);
        }
        let key = hex::encode(hasher.finalize());
        self.dir.join(format!("{}-{}.json", detector, &key[..32]))
    }

    /// Load a stub when the mode allows it and it matches the frame count.
    pub fn load(
        &self,
        detector: &str,
        version: &str,
        video: &VideoKey,
        expected_frames: usize,
    ) -> AnalysisResult<Option<Vec<DetectionMap>>> {
        if self.mode != CacheMode::Reuse {
            return Ok(None);
        }

        let path = self.entry_path(detector, version, video);
        if !path.exists() {
            debug!("No {} stub at {}", detector, path.display());
            return Ok(None);
        }

        let cache_err = |e: Box<dyn std::error::Error + Send + Sync>| AnalysisError::Cache {
            path: path.clone(),
            source: e,
        };
        let file = File::open(&path).map_err(|e| cache_err(e.into()))?;
        let cached: CachedDetections = match serde_json::from_reader(BufReader::new(file)) {
            Ok(cached) => cached,
            Err(e) => {
                warn!(
                    "Ignoring unreadable {} stub {}: {}",
                    detector,
                    path.display(),
                    e
                );
                return Ok(None);
            }
        };

        if cached.video != video.as_str() || cached.frames.len() != expected_frames {
            warn!(
                "Ignoring {} stub {}: covers {} frames, video has {}",
                detector,
                path.display(),
                cached.frames.len(),
                expected_frames
            );
            return Ok(None);
        }

        info!("✓ Loaded {} detections from {}", detector, path.display());
        Ok(Some(cached.frames))
    }

    pub fn store(
        &self,
        detector: &str,
        version: &str,
        video: &VideoKey,
        frames: &[DetectionMap],
    ) -> AnalysisResult<Option<PathBuf>> {
        if self.mode == CacheMode::Disabled {
            return Ok(None);
        }

        let path = self.entry_path(detector, version, video);
        let cache_err = |e: Box<dyn std::error::Error + Send + Sync>| AnalysisError::Cache {
            path: path.clone(),
            source: e,
        };

        fs::create_dir_all(&self.dir).map_err(|e| cache_err(e.into()))?;
        let payload = CachedDetections {
            detector: detector.to_string(),
            version: version.to_string(),
            video: video.as_str().to_string(),
            frames: frames.to_vec(),
        };
        // Readers only ever see a complete stub or none at all.
        let tmp = path.with_extension("json.tmp");
        let file = File::create(&tmp).map_err(|e| cache_err(e.into()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &payload).map_err(|e| cache_err(e.into()))?;
        writer.flush().map_err(|e| cache_err(e.into()))?;
        let file = writer.into_inner().map_err(|e| cache_err(e.into_error().into()))?;
        file.sync_all().map_err(|e| cache_err(e.into()))?;
        fs::rename(&tmp, &path).map_err(|e| cache_err(e.into()))?;

        info!("💾 Stored {} detections in {}", detector, path.display());
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BoundingBox;

    fn sample_frames() -> Vec<DetectionMap> {
        let mut a = DetectionMap::new();
        a.insert(1, BoundingBox::new(0.1, 1.0 / 3.0, 1234.567, 719.99994));
        a.insert(7, BoundingBox::new(f32::MIN_POSITIVE, 2.5e-7, 99.125, 1e7));
        vec![a, DetectionMap::new()]
    }

    #[test]
    fn test_round_trip_is_exact() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DetectionCache::new(dir.path(), CacheMode::Reuse);
        let video = VideoKey::from_label("match.mp4");
        let frames = sample_frames();

        cache.store("player", "1", &video, &frames).unwrap();
        let loaded = cache.load("player", "1", &video, 2).unwrap().unwrap();
        assert_eq!(loaded, frames);
    }

    #[test]
    fn test_key_depends_on_video_and_version() {
        let cache = DetectionCache::new("stubs", CacheMode::Reuse);
        let a = VideoKey::from_label("a.mp4");
        let b = VideoKey::from_label("b.mp4");
        assert_ne!(cache.entry_path("ball", "1", &a), cache.entry_path("ball", "1", &b));
        assert_ne!(cache.entry_path("ball", "1", &a), cache.entry_path("ball", "2", &a));
        assert_eq!(cache.entry_path("ball", "1", &a), cache.entry_path("ball", "1", &a));
    }

    #[test]
    fn test_other_video_does_not_hit() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DetectionCache::new(dir.path(), CacheMode::Reuse);
        cache
            .store("ball", "1", &VideoKey::from_label("a"), &sample_frames())
            .unwrap();
        let other = cache.load("ball", "1", &VideoKey::from_label("b"), 2).unwrap();
        assert!(other.is_none());
    }

    #[test]
    fn test_frame_count_mismatch_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DetectionCache::new(dir.path(), CacheMode::Reuse);
        let video = VideoKey::from_label("a");
        cache.store("ball", "1", &video, &sample_frames()).unwrap();
        assert!(cache.load("ball", "1", &video, 3).unwrap().is_none());
    }

    #[test]
    fn test_truncated_stub_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DetectionCache::new(dir.path(), CacheMode::Reuse);
        let video = VideoKey::from_label("a");
        let path = cache.entry_path("ball", "1", &video);
        fs::write(&path, br#"{"detector":"ball","vers"#).unwrap();

        assert!(cache.load("ball", "1", &video, 2).unwrap().is_none());

        // a fresh store replaces the broken file and leaves no temp file behind
        cache.store("ball", "1", &video, &sample_frames()).unwrap();
        assert_eq!(cache.load("ball", "1", &video, 2).unwrap().unwrap(), sample_frames());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_refresh_and_disabled_modes() {
        let dir = tempfile::tempdir().unwrap();
        let video = VideoKey::from_label("a");

        let refresh = DetectionCache::new(dir.path(), CacheMode::Refresh);
        assert!(refresh.store("ball", "1", &video, &sample_frames()).unwrap().is_some());
        assert!(refresh.load("ball", "1", &video, 2).unwrap().is_none());

        let disabled = DetectionCache::new(dir.path().join("off"), CacheMode::Disabled);
        assert!(disabled.store("ball", "1", &video, &sample_frames()).unwrap().is_none());
        assert!(!dir.path().join("off").exists());
    }

    #[test]
    fn test_file_fingerprint_tracks_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        fs::write(&path, b"frame bytes").unwrap();
        let first = VideoKey::from_file(&path).unwrap();
        fs::write(&path, b"other bytes").unwrap();
        let second = VideoKey::from_file(&path).unwrap();
        assert_ne!(first, second);
        assert_eq!(first.as_str().len(), 64);
    }
}
