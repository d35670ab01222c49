use image::codecs::png::PngEncoder;
use image::{ImageEncoder, RgbaImage};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::canvas::PixelBuffer;
use crate::error::{PaintError, PaintResult};
use crate::ops::sticker::StickerBitmap;

/// Magic tag at the head of every saved canvas file.
const SAVE_MAGIC_V1: &str = "CBK1";

// ============================================================================
// IMAGE LOADING / EXPORT
// ============================================================================

fn decode_rgba(path: &Path) -> PaintResult<RgbaImage> {
    let img = image::open(path)?.into_rgba8();
    debug!("decoded {} ({}x{})", path.display(), img.width(), img.height());
    Ok(img)
}

/// Decode a coloring-page template into the immutable reference mask buffer.
pub fn load_reference_mask(path: &Path) -> PaintResult<PixelBuffer> {
    PixelBuffer::from_rgba_image(&decode_rgba(path)?)
}

/// Decode a sticker image, binarizing its alpha.
pub fn load_sticker(path: &Path) -> PaintResult<StickerBitmap> {
    StickerBitmap::from_rgba_image(&decode_rgba(path)?)
}

/// Write the canvas to `path` as a PNG.
pub fn export_png(buffer: &PixelBuffer, path: &Path) -> PaintResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    PngEncoder::new(writer).write_image(
        buffer.as_bytes(),
        buffer.width(),
        buffer.height(),
        image::ColorType::Rgba8,
    )?;
    info!("exported {}", path.display());
    Ok(())
}

// ============================================================================
// PERSISTENCE
// ============================================================================

/// Key/value storage for raw canvas snapshots.
///
/// Values are opaque byte strings; the session decides whether a loaded value
/// fits its canvas.
pub trait BlobStore {
    fn save(&mut self, key: &str, bytes: &[u8]) -> PaintResult<()>;

    /// `Ok(None)` when nothing is stored under `key`.
    fn load(&self, key: &str) -> PaintResult<Option<Vec<u8>>>;
}

/// In-memory store, used by tests and by callers that persist elsewhere.
#[derive(Debug, Default, Clone)]
pub struct MemoryBlobStore {
    blobs: HashMap<String, Vec<u8>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.blobs.contains_key(key)
    }
}

impl BlobStore for MemoryBlobStore {
    fn save(&mut self, key: &str, bytes: &[u8]) -> PaintResult<()> {
        self.blobs.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn load(&self, key: &str) -> PaintResult<Option<Vec<u8>>> {
        Ok(self.blobs.get(key).cloned())
    }
}

/// On-disk envelope around the raw canvas bytes.
#[derive(Serialize, Deserialize)]
struct SavedCanvas {
    magic: String,
    bytes: Vec<u8>,
}

/// One `Portrait<key>.sav` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    dir: PathBuf,
}

impl FileBlobStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store rooted in the platform data directory.
    pub fn in_data_dir() -> Self {
        Self::new(default_store_dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("Portrait{key}.sav"))
    }
}

impl BlobStore for FileBlobStore {
    fn save(&mut self, key: &str, bytes: &[u8]) -> PaintResult<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let mut temp = path.clone();
        temp.set_extension("new");

        let saved = SavedCanvas {
            magic: SAVE_MAGIC_V1.to_string(),
            bytes: bytes.to_vec(),
        };
        {
            let writer = BufWriter::new(File::create(&temp)?);
            bincode::serialize_into(writer, &saved)?;
        }
        fs::rename(&temp, &path)?;
        debug!("saved {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }

    fn load(&self, key: &str) -> PaintResult<Option<Vec<u8>>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read(&path)?;
        let saved: SavedCanvas = bincode::deserialize(&raw)?;
        if saved.magic != SAVE_MAGIC_V1 {
            return Err(PaintError::Persist(format!(
                "unknown magic '{}' in {}",
                saved.magic,
                path.display()
            )));
        }
        Ok(Some(saved.bytes))
    }
}

/// `<data>/ColorBook/saves`, next to the session log.
pub fn default_store_dir() -> PathBuf {
    crate::logger::data_dir().join("ColorBook").join("saves")
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn memory_store_round_trip() {
        let mut store = MemoryBlobStore::new();
        assert_eq!(store.load("a").unwrap(), None);
        store.save("a", &[1, 2, 3]).unwrap();
        assert_eq!(store.load("a").unwrap(), Some(vec![1, 2, 3]));
        assert!(store.contains("a"));
    }

    #[test]
    fn file_store_uses_portrait_names() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileBlobStore::new(dir.path());
        assert_eq!(store.load("3").unwrap(), None);

        store.save("3", &[9; 16]).unwrap();
        assert!(dir.path().join("Portrait3.sav").exists());
        assert_eq!(store.load("3").unwrap(), Some(vec![9; 16]));
    }

    #[test]
    fn file_store_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileBlobStore::new(dir.path());
        fs::write(store.path_for("x"), b"not a canvas").unwrap();
        assert!(store.load("x").is_err());
    }

    #[test]
    fn data_dir_store_sits_next_to_the_log() {
        let store = FileBlobStore::in_data_dir();
        assert!(store.dir().ends_with("ColorBook/saves"));
        assert_eq!(store.dir(), default_store_dir().as_path());
    }

    #[test]
    fn file_store_rejects_unknown_magic() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileBlobStore::new(dir.path());
        let foreign = SavedCanvas {
            magic: "XXXX".to_string(),
            bytes: vec![1; 16],
        };
        fs::write(store.path_for("0"), bincode::serialize(&foreign).unwrap()).unwrap();

        let err = store.load("0").unwrap_err();
        assert!(matches!(err, PaintError::Persist(ref m) if m.contains("XXXX")));
    }

    #[test]
    fn export_and_reload_template() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/page.png");
        let mut buf = PixelBuffer::new(3, 2).unwrap();
        buf.set(2, 1, Rgba([10, 20, 30, 255]));
        export_png(&buf, &path).unwrap();

        let back = load_reference_mask(&path).unwrap();
        assert_eq!(back.as_bytes(), buf.as_bytes());
    }

    #[test]
    fn sticker_loads_with_binary_alpha() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("star.png");
        let mut img = RgbaImage::new(2, 2);
        img.put_pixel(0, 0, Rgba([200, 0, 0, 3]));
        img.save(&path).unwrap();

        let sticker = load_sticker(&path).unwrap();
        assert_eq!(sticker.as_bytes()[3], 255);
        assert_eq!(sticker.as_bytes()[7], 0);
    }
}
