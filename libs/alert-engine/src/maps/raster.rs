//! External SVG -> PNG conversion (ImageMagick `convert` compatible)

use crate::error::{AlertError, Result};
use crate::traits::Rasterizer;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, warn};

pub const DEFAULT_PROGRAM: &str = "convert";
pub const DEFAULT_WIDTH: u32 = 1500;

/// Runs `<program> -resize <width>x <stem>.svg <stem>.png` inside `work_dir`
#[derive(Debug, Clone)]
pub struct ConvertRasterizer {
    program: String,
    width: u32,
    work_dir: PathBuf,
}

impl ConvertRasterizer {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            width: DEFAULT_WIDTH,
            work_dir: work_dir.into(),
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_width(mut self, width: u32) -> Self {
        self.width = width;
        self
    }
}

/// Input/output files of one conversion, removed when dropped
struct TempFiles {
    svg: PathBuf,
    png: PathBuf,
}

impl TempFiles {
    fn new(dir: &Path, stem: &str) -> Self {
        Self {
            svg: dir.join(format!("{stem}.svg")),
            png: dir.join(format!("{stem}.png")),
        }
    }
}

impl Drop for TempFiles {
    fn drop(&mut self) {
        for path in [&self.svg, &self.png] {
            match std::fs::remove_file(path) {
                Ok(()) => {},
                Err(e) if e.kind() == ErrorKind::NotFound => {},
                Err(e) => warn!("Failed to remove temp file {:?}: {}", path, e),
            }
        }
    }
}

#[async_trait]
impl Rasterizer for ConvertRasterizer {
    async fn rasterize(&self, stem: &str, svg: Vec<u8>) -> Result<Vec<u8>> {
        tokio::fs::create_dir_all(&self.work_dir).await?;
        let files = TempFiles::new(&self.work_dir, stem);

        tokio::fs::write(&files.svg, &svg).await?;

        let output = Command::new(&self.program)
            .arg("-resize")
            .arg(format!("{}x", self.width))
            .arg(&files.svg)
            .arg(&files.png)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => {
                    AlertError::Render(format!("rasterizer '{}' not found", self.program))
                },
                _ => AlertError::Render(format!("failed to run '{}': {}", self.program, e)),
            })?;

        if !output.status.success() {
            return Err(AlertError::Render(format!(
                "'{}' exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let png = tokio::fs::read(&files.png).await.map_err(|e| {
            AlertError::Render(format!("rasterizer output {:?} unreadable: {}", files.png, e))
        })?;

        if png.is_empty() {
            return Err(AlertError::Render(format!(
                "'{}' produced an empty image",
                self.program
            )));
        }

        debug!("Rasterized {} ({} bytes)", stem, png.len());
        Ok(png)
    }
}
