//! Test patterns rendered into the output's canvas channels.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use linsn_core::PanelMatrix;

/// Colours stepped through by [`Pattern::Cycle`].
const CYCLE_COLORS: [[u8; 3]; 4] = [[255, 0, 0], [0, 255, 0], [0, 0, 255], [255, 255, 255]];

// ── Pattern ──────────────────────────────────────────────────────

/// Which test pattern the daemon draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pattern {
    /// Whole canvas in one colour, changing every `hold` ticks.
    #[default]
    Cycle,
    /// Horizontal brightness ramp scrolling one pixel per tick.
    Gradient,
    /// White border around every panel, black elsewhere.
    Outline,
}

impl FromStr for Pattern {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cycle" => Ok(Pattern::Cycle),
            "gradient" => Ok(Pattern::Gradient),
            "outline" => Ok(Pattern::Outline),
            other => Err(format!("unknown pattern {other:?}")),
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Pattern::Cycle => "cycle",
            Pattern::Gradient => "gradient",
            Pattern::Outline => "outline",
        })
    }
}

// ── PatternGenerator ─────────────────────────────────────────────

/// Renders successive frames of a [`Pattern`] for one canvas.
#[derive(Debug, Clone)]
pub struct PatternGenerator {
    pattern: Pattern,
    width: usize,
    height: usize,
    hold: u64,
    tick: u64,
    /// Panel footprints as `(x, y, width, height)` for the outline.
    footprints: Vec<(usize, usize, usize, usize)>,
}

impl PatternGenerator {
    /// `hold` is the number of ticks each cycle colour is shown.
    pub fn new(pattern: Pattern, matrix: &PanelMatrix, hold: u64) -> Self {
        let footprints = matrix
            .panels()
            .iter()
            .map(|p| {
                let (w, h) = if p.orientation.is_rotated() {
                    (matrix.panel_height(), matrix.panel_width())
                } else {
                    (matrix.panel_width(), matrix.panel_height())
                };
                (p.x_offset, p.y_offset, w, h)
            })
            .collect();
        Self {
            pattern,
            width: matrix.width(),
            height: matrix.height(),
            hold: hold.max(1),
            tick: 0,
            footprints,
        }
    }

    pub fn pattern(&self) -> Pattern {
        self.pattern
    }

    /// Draw the next frame into `canvas` (`width * height * 3` bytes).
    pub fn render(&mut self, canvas: &mut [u8]) {
        match self.pattern {
            Pattern::Cycle => {
                let step = (self.tick / self.hold) % CYCLE_COLORS.len() as u64;
                let color = CYCLE_COLORS[step as usize];
                for px in canvas.chunks_exact_mut(3) {
                    px.copy_from_slice(&color);
                }
            }
            Pattern::Gradient => {
                let span = self.width.max(2) - 1;
                let shift = (self.tick % self.width.max(1) as u64) as usize;
                for (i, px) in canvas.chunks_exact_mut(3).enumerate() {
                    let x = (i % self.width.max(1) + shift) % self.width.max(1);
                    let level = (x * 255 / span) as u8;
                    px.fill(level);
                }
            }
            Pattern::Outline => {
                canvas.fill(0);
                for &(x0, y0, w, h) in &self.footprints {
                    for y in y0..y0 + h {
                        for x in x0..x0 + w {
                            let edge = x == x0 || y == y0 || x == x0 + w - 1 || y == y0 + h - 1;
                            if !edge || x >= self.width || y >= self.height {
                                continue;
                            }
                            let i = (y * self.width + x) * 3;
                            if let Some(px) = canvas.get_mut(i..i + 3) {
                                px.fill(255);
                            }
                        }
                    }
                }
            }
        }
        self.tick += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linsn_core::OutputConfig;

    fn matrix(panels: usize) -> PanelMatrix {
        OutputConfig::single_chain(panels).build_matrix().unwrap()
    }

    #[test]
    fn cycle_holds_then_advances() {
        let m = matrix(1);
        let mut g = PatternGenerator::new(Pattern::Cycle, &m, 2);
        let mut canvas = vec![0u8; m.channel_count()];

        g.render(&mut canvas);
        assert_eq!(&canvas[0..3], &[255, 0, 0]);
        g.render(&mut canvas);
        assert_eq!(&canvas[canvas.len() - 3..], &[255, 0, 0]);
        g.render(&mut canvas);
        assert_eq!(&canvas[0..3], &[0, 255, 0]);
    }

    #[test]
    fn gradient_ramps_across_the_row() {
        let m = matrix(1);
        let mut g = PatternGenerator::new(Pattern::Gradient, &m, 1);
        let mut canvas = vec![0u8; m.channel_count()];
        g.render(&mut canvas);

        assert_eq!(canvas[0], 0);
        assert_eq!(canvas[31 * 3], 255);
        assert!(canvas[3] < canvas[30 * 3]);
        // Second row repeats the first.
        assert_eq!(&canvas[0..96], &canvas[96..192]);

        g.render(&mut canvas);
        assert_eq!(canvas[0], 255 / 31);
    }

    #[test]
    fn outline_marks_panel_edges() {
        let m = matrix(2);
        let mut g = PatternGenerator::new(Pattern::Outline, &m, 1);
        let mut canvas = vec![7u8; m.channel_count()];
        g.render(&mut canvas);

        let at = |x: usize, y: usize| canvas[(y * 64 + x) * 3];
        assert_eq!(at(0, 0), 255);
        assert_eq!(at(31, 5), 255);
        assert_eq!(at(32, 5), 255);
        assert_eq!(at(63, 15), 255);
        assert_eq!(at(10, 8), 0);
        assert_eq!(at(40, 8), 0);
    }

    #[test]
    fn parse_and_display() {
        assert_eq!("Outline".parse::<Pattern>().unwrap(), Pattern::Outline);
        assert!("plasma".parse::<Pattern>().is_err());
        assert_eq!(Pattern::Gradient.to_string(), "gradient");
    }
}
