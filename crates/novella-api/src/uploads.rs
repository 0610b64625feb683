use anyhow::{Result, bail};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

/// Largest accepted cover image.
pub const MAX_COVER_SIZE: usize = 5 * 1024 * 1024;

/// URL prefix the upload directory is served under.
pub const UPLOADS_PREFIX: &str = "/uploads";

const COVERS_DIR: &str = "novels";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Gif,
    Webp,
}

impl ImageKind {
    /// Sniff the image type from its leading bytes.
    pub fn detect(data: &[u8]) -> Option<Self> {
        match data {
            [0xFF, 0xD8, 0xFF, ..] => Some(Self::Jpeg),
            [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some(Self::Png),
            [b'G', b'I', b'F', b'8', b'7' | b'9', b'a', ..] => Some(Self::Gif),
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some(Self::Webp),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Webp => "webp",
        }
    }
}

/// Manages on-disk storage for uploaded images.
///
/// Covers are stored flat at `{dir}/novels/{novel_id}-{sha256}.{ext}` and
/// exposed as `/uploads/novels/...`.
pub struct Storage {
    dir: PathBuf,
}

impl Storage {
    pub async fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(dir.join(COVERS_DIR)).await?;
        info!("Upload directory: {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write a cover image and return its public URL. Writing the same bytes
    /// for the same novel again is a no-op.
    pub async fn save_cover(&self, novel_id: &str, data: &[u8], kind: ImageKind) -> Result<String> {
        let hash = hex::encode(Sha256::digest(data));
        let name = format!("{}-{}.{}", novel_id, hash, kind.extension());
        let path = self.dir.join(COVERS_DIR).join(&name);

        if fs::try_exists(&path).await? {
            info!("Cover {} already stored", name);
        } else {
            fs::write(&path, data).await?;
            info!("Stored cover {} ({} bytes)", name, data.len());
        }

        Ok(format!("{}/{}/{}", UPLOADS_PREFIX, COVERS_DIR, name))
    }

    /// Delete a file previously returned by [`Storage::save_cover`].
    pub async fn delete_by_url(&self, url: &str) -> Result<()> {
        let path = self.path_for_url(url)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                info!("Deleted upload {}", url);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Upload {} already gone", url);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn path_for_url(&self, url: &str) -> Result<PathBuf> {
        let Some(relative) = url
            .strip_prefix(UPLOADS_PREFIX)
            .and_then(|rest| rest.strip_prefix('/'))
        else {
            bail!("Not an upload URL: {}", url);
        };

        if relative
            .split('/')
            .any(|part| part.is_empty() || part == "." || part == "..")
        {
            bail!("Refusing suspicious upload path: {}", url);
        }

        Ok(self.dir.join(relative))
    }
}
