use crate::analysis::correlation::CorrelationResult;
use crate::viz::color::{ColorScale, Rgb};
use serde::Serialize;

const DARK_TEXT: &str = "#1a1a1a";
const LIGHT_TEXT: &str = "#ffffff";

// Backgrounds darker than this get white text.
const LUMINANCE_THRESHOLD: f64 = 0.35;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapCell {
    pub value: f64,
    pub background: String,
    pub foreground: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapRow {
    pub ticker: String,
    pub cells: Vec<HeatmapCell>,
}

/// Presentation model shared by the HTML page and the terminal table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapTable {
    pub tickers: Vec<String>,
    pub rows: Vec<HeatmapRow>,
    pub observation_count: usize,
}

impl HeatmapTable {
    pub fn from_result(result: &CorrelationResult) -> Self {
        Self::with_scale(result, &ColorScale::default())
    }

    pub fn with_scale(result: &CorrelationResult, scale: &ColorScale) -> Self {
        let rows = result
            .tickers
            .iter()
            .zip(&result.matrix)
            .map(|(ticker, values)| HeatmapRow {
                ticker: ticker.clone(),
                cells: values.iter().map(|v| cell(*v, scale)).collect(),
            })
            .collect();

        Self {
            tickers: result.tickers.clone(),
            rows,
            observation_count: result.observation_count,
        }
    }

    /// Hex colors only, row-major, for the JSON API.
    pub fn colors(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|r| r.cells.iter().map(|c| c.background.clone()).collect())
            .collect()
    }
}

fn cell(value: f64, scale: &ColorScale) -> HeatmapCell {
    let rgb = scale.to_rgb(value);
    HeatmapCell {
        value,
        background: rgb.to_hex(),
        foreground: text_color_for(rgb),
    }
}

pub fn text_color_for(background: Rgb) -> &'static str {
    if background.luminance() < LUMINANCE_THRESHOLD {
        LIGHT_TEXT
    } else {
        DARK_TEXT
    }
}
