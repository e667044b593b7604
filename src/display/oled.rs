use embedded_graphics::{
    mono_font::{MonoTextStyle, MonoTextStyleBuilder, ascii::FONT_7X13},
    pixelcolor::BinaryColor,
    prelude::*,
    text::{Baseline, Text},
};
use linux_embedded_hal::I2cdev;
use log::info;
use ssd1306::{I2CDisplayInterface, Ssd1306, mode::BufferedGraphicsMode, prelude::*};

use crate::{
    display::DisplayDevice,
    error::{QbError, QbResult},
};

type Oled =
    Ssd1306<I2CInterface<I2cdev>, DisplaySize128x64, BufferedGraphicsMode<DisplaySize128x64>>;

/// 128x64 SSD1306 OLED on a Linux I2C bus, buffered graphics mode.
pub struct Ssd1306Display {
    display: Oled,
    text_style: MonoTextStyle<'static, BinaryColor>,
}

impl Ssd1306Display {
    /// `i2c_bus` is a device node such as "/dev/i2c-1".
    pub fn open(i2c_bus: &str, address: u8) -> QbResult<Self> {
        info!("Initializing display on {i2c_bus} at {address:#04x}");

        let i2c = I2cdev::new(i2c_bus)
            .map_err(|e| QbError::DisplayError(format!("Open {i2c_bus}: {e}")))?;
        let interface = I2CDisplayInterface::new_custom_address(i2c, address);

        let mut display = Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
            .into_buffered_graphics_mode();

        display
            .init()
            .map_err(|e| QbError::DisplayError(format!("Init: {e:?}")))?;
        display.clear_buffer();
        display
            .flush()
            .map_err(|e| QbError::DisplayError(format!("Flush: {e:?}")))?;

        let text_style = MonoTextStyleBuilder::new()
            .font(&FONT_7X13)
            .text_color(BinaryColor::On)
            .build();

        info!("Display initialized");

        Ok(Self {
            display,
            text_style,
        })
    }
}

impl DisplayDevice for Ssd1306Display {
    fn clear(&mut self) -> QbResult<()> {
        self.display.clear_buffer();
        Ok(())
    }

    fn draw_text(&mut self, x: i32, y: i32, text: &str) -> QbResult<()> {
        Text::with_baseline(text, Point::new(x, y), self.text_style, Baseline::Top)
            .draw(&mut self.display)
            .map_err(|e| QbError::DisplayError(format!("Draw: {e:?}")))?;

        Ok(())
    }

    fn present(&mut self) -> QbResult<()> {
        self.display
            .flush()
            .map_err(|e| QbError::DisplayError(format!("Flush: {e:?}")))
    }
}
