//! Temperature sensor access
//!
//! Thermal zones report the current temperature as decimal millidegrees
//! Celsius (e.g. `45821` = 45.821°C). The file is opened once and sampled
//! with a positional read at offset 0 on every tick, so no seek state is
//! carried between samples and the kernel always regenerates the value.

use std::fs::File;
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::constants::sensor;
use crate::error::{FanControlError, Result};

/// Source of temperature samples in degrees Celsius
#[cfg_attr(test, mockall::automock)]
pub trait TemperatureSource {
    /// Take a fresh reading
    fn read_celsius(&mut self) -> Result<f64>;
}

/// One reading, consumed by the tick that produced it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub celsius: f64,
    pub taken_at: Instant,
}

impl Sample {
    pub fn now(celsius: f64) -> Self {
        Self {
            celsius,
            taken_at: Instant::now(),
        }
    }
}

/// sysfs-style sensor file held open for the lifetime of the daemon
#[derive(Debug)]
pub struct SysfsSensor {
    path: PathBuf,
    file: File,
}

impl SysfsSensor {
    /// Open the sensor file read-only
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|source| FanControlError::SensorOpen {
            path: path.clone(),
            source,
        })?;
        Ok(Self { path, file })
    }

    /// Fill `buf` from offset 0, stopping early at end of file
    fn read_window(&self, buf: &mut [u8]) -> std::io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.file.read_at(&mut buf[filled..], filled as u64) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }
}

impl TemperatureSource for SysfsSensor {
    fn read_celsius(&mut self) -> Result<f64> {
        let mut buf = [0u8; sensor::SAMPLE_WIDTH];
        let n = self
            .read_window(&mut buf)
            .map_err(|source| FanControlError::SensorRead {
                path: self.path.clone(),
                source,
            })?;

        parse_millidegrees(&buf[..n]).ok_or_else(|| FanControlError::SensorParse {
            path: self.path.clone(),
            raw: String::from_utf8_lossy(&buf[..n]).into_owned(),
        })
    }
}

/// Convert a raw millidegree window to degrees Celsius
///
/// Whitespace and NUL padding around the digits are ignored so that short
/// values such as `"9000\n"` still parse. Non-finite values are rejected.
pub fn parse_millidegrees(raw: &[u8]) -> Option<f64> {
    let text = std::str::from_utf8(raw).ok()?;
    let text = text.trim_matches(|c: char| c.is_ascii_whitespace() || c == '\0');
    if text.is_empty() {
        return None;
    }
    let millidegrees: f64 = text.parse().ok()?;
    if !millidegrees.is_finite() {
        return None;
    }
    Some(millidegrees / sensor::MILLIDEGREE_DIVISOR)
}
