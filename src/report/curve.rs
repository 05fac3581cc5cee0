//! Training-loss curve artifact.
//!
//! Written once at the end of a run; the filename stem encodes the
//! experiment (`fed_{dataset}_{model}_{rounds}_C{frac}_iid{iid}`).

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::Result;
use crate::federated::coordinator::RoundRecord;

const SVG_WIDTH: f32 = 640.0;
const SVG_HEIGHT: f32 = 400.0;
const SVG_MARGIN: f32 = 40.0;

/// One point of the loss curve.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct CurvePoint {
    /// Round index
    pub round: usize,
    /// Mean training loss of that round
    pub loss: f32,
}

/// The per-round training-loss sequence of one run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LossCurve {
    points: Vec<CurvePoint>,
}

impl LossCurve {
    /// Build from an ordered round history.
    pub fn from_history(history: &[RoundRecord]) -> Self {
        Self {
            points: history
                .iter()
                .map(|r| CurvePoint {
                    round: r.round,
                    loss: r.loss,
                })
                .collect(),
        }
    }

    /// Number of recorded rounds.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the curve holds no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The curve points in round order.
    pub fn points(&self) -> &[CurvePoint] {
        &self.points
    }

    /// Render as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Render as a standalone SVG line chart.
    pub fn to_svg(&self) -> String {
        let mut svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = SVG_WIDTH,
            h = SVG_HEIGHT
        );
        svg.push('\n');
        svg.push_str(&format!(
            r#"<rect width="{w}" height="{h}" fill="white"/>"#,
            w = SVG_WIDTH,
            h = SVG_HEIGHT
        ));
        svg.push('\n');

        if !self.points.is_empty() {
            let min_loss = self.points.iter().map(|p| p.loss).fold(f32::INFINITY, f32::min);
            let max_loss = self
                .points
                .iter()
                .map(|p| p.loss)
                .fold(f32::NEG_INFINITY, f32::max);
            let loss_range = (max_loss - min_loss).max(1e-6);
            let round_range = (self.points.len().saturating_sub(1)).max(1) as f32;

            let plot_w = SVG_WIDTH - 2.0 * SVG_MARGIN;
            let plot_h = SVG_HEIGHT - 2.0 * SVG_MARGIN;

            let coords: Vec<String> = self
                .points
                .iter()
                .enumerate()
                .map(|(i, p)| {
                    let x = SVG_MARGIN + (i as f32 / round_range) * plot_w;
                    let y = SVG_MARGIN + (1.0 - (p.loss - min_loss) / loss_range) * plot_h;
                    format!("{:.1},{:.1}", x, y)
                })
                .collect();

            svg.push_str(&format!(
                r#"<polyline fill="none" stroke="steelblue" stroke-width="2" points="{}"/>"#,
                coords.join(" ")
            ));
            svg.push('\n');
        }

        // Axes
        svg.push_str(&format!(
            r#"<line x1="{m}" y1="{b}" x2="{r}" y2="{b}" stroke="black"/>"#,
            m = SVG_MARGIN,
            b = SVG_HEIGHT - SVG_MARGIN,
            r = SVG_WIDTH - SVG_MARGIN
        ));
        svg.push('\n');
        svg.push_str(&format!(
            r#"<line x1="{m}" y1="{m}" x2="{m}" y2="{b}" stroke="black"/>"#,
            m = SVG_MARGIN,
            b = SVG_HEIGHT - SVG_MARGIN
        ));
        svg.push('\n');
        svg.push_str(&format!(
            r#"<text x="{x}" y="{y}" font-size="12" text-anchor="middle">round</text>"#,
            x = SVG_WIDTH / 2.0,
            y = SVG_HEIGHT - 10.0
        ));
        svg.push('\n');
        svg.push_str(&format!(
            r#"<text x="14" y="{y}" font-size="12" text-anchor="middle" transform="rotate(-90 14 {y})">train loss</text>"#,
            y = SVG_HEIGHT / 2.0
        ));
        svg.push_str("\n</svg>\n");
        svg
    }

    /// Write the JSON rendering to `dir/{stem}.json`.
    pub fn write_json(&self, dir: impl AsRef<Path>, stem: &str) -> Result<PathBuf> {
        let path = dir.as_ref().join(format!("{}.json", stem));
        fs::write(&path, self.to_json()?)?;
        Ok(path)
    }

    /// Write the SVG rendering to `dir/{stem}.svg`.
    pub fn write_svg(&self, dir: impl AsRef<Path>, stem: &str) -> Result<PathBuf> {
        let path = dir.as_ref().join(format!("{}.svg", stem));
        fs::write(&path, self.to_svg())?;
        Ok(path)
    }
}
