use std::fmt::Write as _;

use correlheat_core::request::CorrelationForm;
use correlheat_core::viz::color::legend_stops;
use correlheat_core::viz::heatmap::HeatmapTable;
use correlheat_core::ReturnType;

use crate::PageOutcome;

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; margin: 2rem auto; max-width: 60rem; color: #1a1a1a; }
form { display: grid; grid-template-columns: 10rem 1fr; gap: .5rem 1rem; margin-bottom: 1.5rem; }
.error { background: #fde8e8; border: 1px solid #b2182b; padding: .75rem; border-radius: 4px; }
.status { color: #444; }
table.heatmap { border-collapse: collapse; margin-top: 1rem; }
table.heatmap th, table.heatmap td { padding: .5rem .75rem; text-align: center; border: 1px solid #fff; }
table.heatmap td { font-variant-numeric: tabular-nums; min-width: 4rem; }
.legend { display: flex; align-items: center; gap: .5rem; margin-top: 1rem; }
.legend .bar { width: 16rem; height: 1rem; border: 1px solid #ccc; }
"#;

pub fn render(form: &CorrelationForm, outcome: &PageOutcome) -> String {
    let mut out = String::with_capacity(4096);
    out.push_str("<!doctype html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    out.push_str("<title>Correlation Heatmap</title>\n<style>");
    out.push_str(STYLE);
    out.push_str("</style>\n</head>\n<body>\n<h1>Correlation Heatmap</h1>\n");

    render_form(&mut out, form);

    match outcome {
        PageOutcome::Empty => {}
        PageOutcome::Error(msg) => {
            let _ = writeln!(out, "<p class=\"error\">{}</p>", escape(msg));
        }
        PageOutcome::Report(report) => {
            let _ = writeln!(
                out,
                "<p class=\"status\">{}</p>",
                escape(&report.status_message())
            );
            render_table(&mut out, &report.table);
            render_legend(&mut out);
        }
    }

    out.push_str("</body>\n</html>\n");
    out
}

fn render_form(out: &mut String, form: &CorrelationForm) {
    out.push_str("<form method=\"post\" action=\"/\">\n");
    let _ = writeln!(
        out,
        "<label for=\"tickers\">Tickers</label><input id=\"tickers\" name=\"tickers\" type=\"text\" value=\"{}\">",
        escape(&form.tickers)
    );
    let _ = writeln!(
        out,
        "<label for=\"start\">Start date</label><input id=\"start\" name=\"start\" type=\"date\" value=\"{}\">",
        escape(&form.start)
    );
    let _ = writeln!(
        out,
        "<label for=\"end\">End date</label><input id=\"end\" name=\"end\" type=\"date\" value=\"{}\">",
        escape(&form.end)
    );

    out.push_str("<label for=\"return_type\">Returns</label><select id=\"return_type\" name=\"return_type\">");
    for rt in ReturnType::ALL {
        let selected = if form.return_type == rt.as_str() {
            " selected"
        } else {
            ""
        };
        let _ = write!(
            out,
            "<option value=\"{}\"{selected}>{}</option>",
            rt.as_str(),
            rt.label()
        );
    }
    out.push_str("</select>\n<span></span><button type=\"submit\">Compute</button>\n</form>\n");
}

fn render_table(out: &mut String, table: &HeatmapTable) {
    out.push_str("<table class=\"heatmap\">\n<thead><tr><th></th>");
    for ticker in &table.tickers {
        let _ = write!(out, "<th>{}</th>", escape(ticker));
    }
    out.push_str("</tr></thead>\n<tbody>\n");

    for row in &table.rows {
        let _ = write!(out, "<tr><th>{}</th>", escape(&row.ticker));
        for cell in &row.cells {
            let _ = write!(
                out,
                "<td style=\"background:{};color:{}\">{:.2}</td>",
                cell.background, cell.foreground, cell.value
            );
        }
        out.push_str("</tr>\n");
    }
    out.push_str("</tbody>\n</table>\n");
}

fn render_legend(out: &mut String) {
    let gradient = legend_stops()
        .iter()
        .map(|(pos, hex)| format!("{hex} {:.0}%", pos * 100.0))
        .collect::<Vec<_>>()
        .join(", ");
    let _ = writeln!(
        out,
        "<div class=\"legend\"><span>-1</span><div class=\"bar\" style=\"background:linear-gradient(to right, {gradient})\"></div><span>+1</span></div>"
    );
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
