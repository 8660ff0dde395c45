//! Terminal preview of rasterized plots.
//!
//! Each character cell averages the block of pixels it covers, so thin
//! lines and small markers still tint their cell instead of disappearing
//! between samples.
//!
//! - ASCII: grayscale ramp ` .:-=+*#%@`
//! - Unicode half blocks: two colored pixels per cell (the default)
//! - ANSI: one 24-bit colored cell per sample

use crate::framebuffer::Framebuffer;
use std::fmt::Write as FmtWrite;
use std::io::{self, Write};

/// Terminal rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TerminalMode {
    /// ASCII grayscale characters.
    Ascii,
    /// Unicode upper half blocks with foreground and background colors.
    #[default]
    UnicodeHalfBlock,
    /// Colored spaces.
    AnsiTrueColor,
}

/// Renders a framebuffer as terminal text.
#[derive(Debug, Clone, Default)]
pub struct TerminalEncoder {
    mode: TerminalMode,
    width: Option<u32>,
    height: Option<u32>,
}

impl TerminalEncoder {
    const ASCII_RAMP: &'static [char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

    /// Encoder with the default mode, 80 columns wide at most.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the rendering mode.
    #[must_use]
    pub fn mode(mut self, mode: TerminalMode) -> Self {
        self.mode = mode;
        self
    }

    /// Target width in characters.
    #[must_use]
    pub fn width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    /// Target height in lines; derived from the width when unset.
    #[must_use]
    pub fn height(mut self, height: u32) -> Self {
        self.height = Some(height);
        self
    }

    /// Render a framebuffer to a string.
    #[must_use]
    pub fn render(&self, fb: &Framebuffer) -> String {
        // Half blocks carry two pixel rows per line.
        let rows_per_line = if self.mode == TerminalMode::UnicodeHalfBlock { 2 } else { 1 };
        let (cols, lines) = self.dimensions(fb, if rows_per_line == 2 { 1.0 } else { 2.0 });
        let sampler = Sampler { fb, cols, rows: lines * rows_per_line };
        let mut out = String::with_capacity((cols as usize * 20 + 8) * lines as usize);

        for line in 0..lines {
            for col in 0..cols {
                match self.mode {
                    TerminalMode::Ascii => {
                        let [r, g, b] = sampler.average(col, line);
                        let luma = 0.2126 * r + 0.7152 * g + 0.0722 * b;
                        let last = Self::ASCII_RAMP.len() - 1;
                        out.push(Self::ASCII_RAMP[((luma / 255.0 * last as f64).round() as usize).min(last)]);
                    }
                    TerminalMode::UnicodeHalfBlock => {
                        let [tr, tg, tb] = sampler.average(col, line * 2).map(channel);
                        let [br, bg, bb] = sampler.average(col, line * 2 + 1).map(channel);
                        let _ = write!(out, "\x1b[38;2;{tr};{tg};{tb}m\x1b[48;2;{br};{bg};{bb}m\u{2580}");
                    }
                    TerminalMode::AnsiTrueColor => {
                        let [r, g, b] = sampler.average(col, line).map(channel);
                        let _ = write!(out, "\x1b[48;2;{r};{g};{b}m ");
                    }
                }
            }
            if self.mode != TerminalMode::Ascii {
                out.push_str("\x1b[0m");
            }
            out.push('\n');
        }
        out
    }

    /// Character grid size, preserving the aspect ratio given the
    /// height/width ratio of a character cell.
    fn dimensions(&self, fb: &Framebuffer, cell_aspect: f64) -> (u32, u32) {
        let aspect = f64::from(fb.width()) / f64::from(fb.height());
        match (self.width, self.height) {
            (Some(w), Some(h)) => (w.max(1), h.max(1)),
            (Some(w), None) => (w.max(1), ((f64::from(w) / aspect / cell_aspect).round() as u32).max(1)),
            (None, Some(h)) => (((f64::from(h) * aspect * cell_aspect).round() as u32).max(1), h.max(1)),
            (None, None) => {
                let w = 80.min(fb.width());
                (w, ((f64::from(w) / aspect / cell_aspect).round() as u32).max(1))
            }
        }
    }

    /// Write the rendering to stdout.
    ///
    /// # Errors
    ///
    /// Returns an error if stdout cannot be written.
    pub fn print(&self, fb: &Framebuffer) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        stdout.write_all(self.render(fb).as_bytes())?;
        stdout.flush()
    }
}

fn channel(v: f64) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// Box filter over the pixels covered by one cell of a `cols x rows` grid.
struct Sampler<'a> {
    fb: &'a Framebuffer,
    cols: u32,
    rows: u32,
}

impl Sampler<'_> {
    fn span(size: u32, cells: u32, i: u32) -> (u32, u32) {
        let lo = (u64::from(i) * u64::from(size) / u64::from(cells)) as u32;
        let hi = (u64::from(i + 1) * u64::from(size) / u64::from(cells)) as u32;
        (lo.min(size - 1), hi.clamp(lo + 1, size))
    }

    /// Mean RGB, composited over black by alpha.
    fn average(&self, col: u32, row: u32) -> [f64; 3] {
        let (x0, x1) = Self::span(self.fb.width(), self.cols, col);
        let (y0, y1) = Self::span(self.fb.height(), self.rows, row);
        let mut sum = [0.0; 3];
        let mut n = 0.0;
        for y in y0..y1 {
            for x in x0..x1 {
                if let Some(p) = self.fb.get_pixel(x, y) {
                    let a = f64::from(p.a) / 255.0;
                    sum[0] += f64::from(p.r) * a;
                    sum[1] += f64::from(p.g) * a;
                    sum[2] += f64::from(p.b) * a;
                    n += 1.0;
                }
            }
        }
        if n == 0.0 {
            [0.0; 3]
        } else {
            sum.map(|s| s / n)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgba;

    fn filled(w: u32, h: u32, color: Rgba) -> Framebuffer {
        let mut fb = Framebuffer::new(w, h).unwrap();
        fb.clear(color);
        fb
    }

    #[test]
    fn test_ascii_white_and_black() {
        let ascii = TerminalEncoder::new().mode(TerminalMode::Ascii).width(5);
        let white = ascii.render(&filled(10, 10, Rgba::WHITE));
        assert!(white.lines().all(|l| l.chars().all(|c| c == '@')));
        let black = ascii.render(&filled(10, 10, Rgba::BLACK));
        assert!(black.lines().all(|l| l.chars().all(|c| c == ' ')));
    }

    #[test]
    fn test_half_blocks_carry_colors() {
        let out = TerminalEncoder::new().width(5).render(&filled(10, 10, Rgba::rgb(255, 0, 0)));
        assert!(out.contains("\x1b[38;2;255;0;0m"));
        assert!(out.contains('\u{2580}'));
        assert!(out.contains("\x1b[0m"));
    }

    #[test]
    fn test_true_color_cells() {
        let out = TerminalEncoder::new()
            .mode(TerminalMode::AnsiTrueColor)
            .width(5)
            .render(&filled(10, 10, Rgba::rgb(0, 0, 255)));
        assert!(out.contains("48;2;0;0;255"));
    }

    #[test]
    fn test_thin_line_survives_downsampling() {
        let mut fb = filled(100, 20, Rgba::WHITE);
        for x in 0..100 {
            fb.set_pixel(x, 7, Rgba::BLACK);
        }
        let out = TerminalEncoder::new().mode(TerminalMode::Ascii).width(10).height(2).render(&fb);
        let first = out.lines().next().unwrap();
        assert!(first.chars().all(|c| c != '@'));
    }

    #[test]
    fn test_dimensions() {
        let ascii = TerminalEncoder::new().mode(TerminalMode::Ascii);
        let lines = ascii.clone().width(40).render(&Framebuffer::new(200, 100).unwrap()).lines().count();
        assert_eq!(lines, 10);
        let out = ascii.clone().width(20).height(10).render(&Framebuffer::new(100, 100).unwrap());
        assert_eq!(out.lines().count(), 10);
        assert_eq!(out.lines().next().unwrap().chars().count(), 20);
        let wide = ascii.render(&Framebuffer::new(1000, 100).unwrap());
        assert!(wide.lines().next().unwrap().chars().count() <= 80);
    }
}
