//! Mirrors the rolling history onto a small monochrome panel.

use std::sync::Arc;

use log::{info, warn};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    config::{AppConfig, DisplayKind},
    data::history::{HISTORY_CAPACITY, RollingHistory},
    error::{QbError, QbResult},
};

pub mod oled;

pub const HEIGHT: i32 = 64;
pub const LINE_HEIGHT: i32 = 16;

pub type SharedDisplay = Arc<Mutex<Box<dyn DisplayDevice>>>;

/// A framebuffer-backed display: draw into the buffer, then present it.
pub trait DisplayDevice: Send {
    /// Fill the framebuffer with the background colour.
    fn clear(&mut self) -> QbResult<()>;

    /// Draw `text` with its top-left corner at (`x`, `y`) pixels.
    fn draw_text(&mut self, x: i32, y: i32, text: &str) -> QbResult<()>;

    /// Push the framebuffer to the panel.
    fn present(&mut self) -> QbResult<()>;
}

/// Stand-in used when no panel is configured or it cannot be opened.
#[derive(Debug, Default)]
pub struct NullDisplay {
    lines: Vec<String>,
}

impl DisplayDevice for NullDisplay {
    fn clear(&mut self) -> QbResult<()> {
        self.lines.clear();
        Ok(())
    }

    fn draw_text(&mut self, x: i32, y: i32, text: &str) -> QbResult<()> {
        self.lines.push(format!("({x},{y}) {text}"));
        Ok(())
    }

    fn present(&mut self) -> QbResult<()> {
        info!("[Display] {}", self.lines.join(" | "));
        Ok(())
    }
}

pub fn open_display(config: &AppConfig) -> Box<dyn DisplayDevice> {
    match config.display {
        DisplayKind::Ssd1306 => {
            match oled::Ssd1306Display::open(&config.i2c_bus, config.display_address) {
                Ok(display) => Box::new(display),
                Err(err) => {
                    warn!("{err}, continuing without a display");
                    Box::new(NullDisplay::default())
                }
            }
        }
        DisplayKind::None => Box::new(NullDisplay::default()),
    }
}

pub fn shared(display: Box<dyn DisplayDevice>) -> SharedDisplay {
    Arc::new(Mutex::new(display))
}

/// Redraws the first `max_lines` history slots, one per 16 pixel row.
pub fn render_lines(
    device: &mut dyn DisplayDevice,
    history: &RollingHistory,
    max_lines: usize,
) -> QbResult<()> {
    device.clear()?;

    let rows = (HEIGHT / LINE_HEIGHT) as usize;

    for (i, line) in history
        .lines(max_lines.min(HISTORY_CAPACITY).min(rows))
        .iter()
        .enumerate()
    {
        device.draw_text(0, LINE_HEIGHT * i as i32, line)?;
    }

    device.present()
}

/// Runs [`render_lines`] on the blocking pool; panel I/O is synchronous.
/// The guard is held until the frame has been presented.
pub async fn render_lines_blocking(
    mut device: OwnedMutexGuard<Box<dyn DisplayDevice>>,
    history: RollingHistory,
    max_lines: usize,
) -> QbResult<()> {
    tokio::task::spawn_blocking(move || render_lines(&mut **device, &history, max_lines))
        .await
        .map_err(|err| QbError::DisplayError(format!("Render task failed: {err}")))?
}
