//! The display seam: the shell paints whatever image is current; the core
//! only ever pushes bytes through a single setter.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::info;

#[async_trait]
pub trait DisplaySurface: Send + Sync {
    /// Hand a freshly rendered poster (encoded PNG) to the display. No
    /// return value is consulted beyond failure, which callers treat as a
    /// failed render.
    async fn show_image(&self, png: Arc<Vec<u8>>) -> Result<()>;
}

/// Writes the current poster to a file the kiosk shell watches.
pub struct FileSurface {
    path: PathBuf,
}

impl FileSurface {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DisplaySurface for FileSurface {
    async fn show_image(&self, png: Arc<Vec<u8>>) -> Result<()> {
        tokio::fs::write(&self.path, png.as_slice())
            .await
            .with_context(|| format!("failed to write poster to {}", self.path.display()))?;
        info!("poster updated at {} ({} bytes)", self.path.display(), png.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_surface_writes_poster_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("current_poster.png");
        let surface = FileSurface::new(&path);

        surface.show_image(Arc::new(vec![1, 2, 3])).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), vec![1, 2, 3]);

        surface.show_image(Arc::new(vec![9])).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), vec![9]);
    }
}
