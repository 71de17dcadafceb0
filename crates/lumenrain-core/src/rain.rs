//! Multi-column falling-glyph rain.
//!
//! Columns are built once and handed to the container; the scroll itself runs
//! on the environment's animation timeline, so there is no per-frame loop
//! here. Resizes rebuild the whole set.

use std::time::Duration;

use lumenrain_platform::{ColumnContainer, ColumnNode};
use rand::rngs::SmallRng;
use rand::Rng;
use tracing::debug;

use crate::config::RainConfig;
use crate::error::{EngineError, Result};

/// Half-width katakana and digits.
pub const RAIN_GLYPHS: &[char] = &[
    'ｱ', 'ｲ', 'ｳ', 'ｴ', 'ｵ', 'ｶ', 'ｷ', 'ｸ', 'ｹ', 'ｺ', 'ｻ', 'ｼ', 'ｽ', 'ｾ', 'ｿ', 'ﾀ', 'ﾁ', 'ﾂ',
    'ﾃ', 'ﾄ', 'ﾅ', 'ﾆ', 'ﾇ', 'ﾈ', 'ﾉ', 'ﾊ', 'ﾋ', 'ﾌ', 'ﾍ', 'ﾎ', 'ﾏ', 'ﾐ', 'ﾑ', 'ﾒ', 'ﾓ', 'ﾔ',
    'ﾕ', 'ﾖ', 'ﾗ', 'ﾘ', 'ﾙ', 'ﾚ', 'ﾛ', 'ﾜ', 'ﾝ', '0', '1', '2', '3', '4', '5', '6', '7', '8',
    '9',
];

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub offset_px: f32,
    pub glyphs: Vec<char>,
    pub start_delay: Duration,
}

impl Column {
    pub fn text(&self) -> String {
        let mut text = String::with_capacity(self.glyphs.len() * 4);
        for (i, glyph) in self.glyphs.iter().enumerate() {
            if i > 0 {
                text.push('\n');
            }
            text.push(*glyph);
        }
        text
    }

    pub fn to_node(&self, scroll_duration: Duration) -> ColumnNode {
        ColumnNode {
            offset_px: self.offset_px,
            text: self.text(),
            start_delay: self.start_delay,
            scroll_duration,
        }
    }
}

pub struct ColumnRainGenerator {
    config: RainConfig,
    rng: SmallRng,
}

impl ColumnRainGenerator {
    pub fn new(config: RainConfig, rng: SmallRng) -> Self {
        Self { config, rng }
    }

    pub fn config(&self) -> &RainConfig {
        &self.config
    }

    /// `floor(width / column_width)`; zero for an unlaid-out or invalid width.
    pub fn column_count(&self, screen_width: f32) -> usize {
        if !(screen_width > 0.0) || !screen_width.is_finite() {
            return 0;
        }
        (screen_width / self.config.column_width_px).floor() as usize
    }

    pub fn build_column(&mut self, index: usize) -> Column {
        let length = self
            .rng
            .gen_range(self.config.min_glyphs..self.config.max_glyphs);
        let glyphs = (0..length)
            .map(|_| RAIN_GLYPHS[self.rng.gen_range(0..RAIN_GLYPHS.len())])
            .collect();
        let max_delay = self.config.max_start_delay_s;
        let delay_s = if max_delay > 0.0 && max_delay.is_finite() {
            self.rng.gen_range(0.0..max_delay)
        } else {
            0.0
        };
        Column {
            offset_px: index as f32 * self.config.column_width_px,
            glyphs,
            start_delay: Duration::from_secs_f32(delay_s),
        }
    }

    /// Appends one column per `column_width` of `screen_width`. Callers clear
    /// the container first; see [`ColumnRainGenerator::regenerate`].
    pub fn generate(
        &mut self,
        container: &mut dyn ColumnContainer,
        screen_width: f32,
    ) -> Result<usize> {
        let count = self.column_count(screen_width);
        let scroll_duration = self.config.scroll_duration();
        for index in 0..count {
            let node = self.build_column(index).to_node(scroll_duration);
            container
                .append_column(&node)
                .map_err(|err| EngineError::Container {
                    index,
                    reason: err.to_string(),
                })?;
        }
        debug!(screen_width, columns = count, "rain generated");
        Ok(count)
    }

    pub fn clear(container: &mut dyn ColumnContainer) {
        container.clear();
    }

    pub fn regenerate(
        &mut self,
        container: &mut dyn ColumnContainer,
        screen_width: f32,
    ) -> Result<usize> {
        Self::clear(container);
        self.generate(container, screen_width)
    }
}
