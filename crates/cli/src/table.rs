use std::fmt::Write as _;

use correlheat_core::viz::color::Rgb;
use correlheat_core::viz::heatmap::HeatmapTable;

const CELL_WIDTH: usize = 7;
const RESET: &str = "\x1b[0m";

/// Fixed-width matrix; with `color`, each cell is painted with its heatmap color.
pub fn render(table: &HeatmapTable, color: bool) -> String {
    let label_width = table
        .tickers
        .iter()
        .map(|t| t.chars().count())
        .max()
        .unwrap_or(0)
        .max(4);

    let mut out = String::new();
    let _ = write!(out, "{:width$}", "", width = label_width);
    for ticker in &table.tickers {
        let _ = write!(out, " {:>width$}", ticker, width = CELL_WIDTH);
    }
    out.push('\n');

    for row in &table.rows {
        let _ = write!(out, "{:<width$}", row.ticker, width = label_width);
        for cell in &row.cells {
            let text = format!("{:>width$.2}", cell.value, width = CELL_WIDTH);
            out.push(' ');
            match (color, Rgb::from_hex(&cell.background), Rgb::from_hex(cell.foreground)) {
                (true, Some(bg), Some(fg)) => {
                    let _ = write!(
                        out,
                        "\x1b[48;2;{};{};{}m\x1b[38;2;{};{};{}m{text}{RESET}",
                        bg.0, bg.1, bg.2, fg.0, fg.1, fg.2
                    );
                }
                _ => out.push_str(&text),
            }
        }
        out.push('\n');
    }
    out
}
