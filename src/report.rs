//! Published artifacts: the edge tables, the workbook, diagnostics and the
//! static index page.

use std::fmt::Write as _;
use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use csv::WriterBuilder;
use rust_xlsxwriter::{Workbook, Worksheet};
use tracing::info;

use crate::logging::BUILD_LOG_FILE;
use crate::model::MatchedGame;
use crate::pipeline::{Diagnostics, EdgeReport};

pub const EDGES_CSV: &str = "edges.csv";
pub const STRONG_CSV: &str = "edges_strong.csv";
pub const EDGES_XLSX: &str = "edges.xlsx";
pub const DIAGNOSTICS_JSON: &str = "diagnostics.json";
pub const INDEX_HTML: &str = "index.html";

pub const EDGE_COLUMNS: [&str; 12] = [
    "home",
    "away",
    "home_spread",
    "h_adj_offense",
    "h_adj_defense",
    "a_adj_offense",
    "a_adj_defense",
    "model_home_margin",
    "market_home_margin",
    "edge_pts",
    "recommendation",
    "ticket",
];

/// Header is always written, so an empty slate still yields a valid table.
pub fn write_edges_csv_to<W: Write>(writer: W, games: &[MatchedGame]) -> Result<()> {
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record(EDGE_COLUMNS).context("write csv header")?;
    for game in games {
        wtr.serialize(game)
            .with_context(|| format!("write csv row {} vs {}", game.home_team, game.away_team))?;
    }
    wtr.flush().context("flush csv")?;
    Ok(())
}

pub fn write_edges_csv(path: &Path, games: &[MatchedGame]) -> Result<()> {
    let file = fs::File::create(path).with_context(|| format!("failed creating {}", path.display()))?;
    write_edges_csv_to(file, games)
}

pub fn write_strong_csv(path: &Path, games: &[MatchedGame]) -> Result<()> {
    let strong: Vec<MatchedGame> = games.iter().filter(|g| g.is_pick()).cloned().collect();
    write_edges_csv(path, &strong)
}

enum Cell {
    Text(String),
    Number(f64),
    Blank,
}

fn game_row(game: &MatchedGame) -> Vec<Cell> {
    let num = |v: Option<f64>| v.map_or(Cell::Blank, Cell::Number);
    vec![
        Cell::Text(game.home_team.clone()),
        Cell::Text(game.away_team.clone()),
        num(game.home_spread),
        num(game.h_adj_offense),
        num(game.h_adj_defense),
        num(game.a_adj_offense),
        num(game.a_adj_defense),
        num(game.model_home_margin),
        num(game.market_home_margin),
        num(game.edge_pts),
        Cell::Text(game.recommendation.label().to_string()),
        Cell::Text(game.ticket.clone()),
    ]
}

pub fn write_edges_xlsx(path: &Path, games: &[MatchedGame]) -> Result<()> {
    let mut rows: Vec<Vec<Cell>> = vec![EDGE_COLUMNS.iter().map(|h| Cell::Text(h.to_string())).collect()];
    rows.extend(games.iter().map(game_row));

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Edges")?;
        write_rows(sheet, &rows)?;
    }
    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;
    Ok(())
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<Cell>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            let (r, c) = (row_idx as u32, col_idx as u16);
            let written = match value {
                Cell::Text(s) => worksheet.write_string(r, c, s),
                Cell::Number(n) => worksheet.write_number(r, c, *n),
                Cell::Blank => continue,
            };
            written.with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}

pub fn write_diagnostics(path: &Path, diag: &Diagnostics) -> Result<()> {
    let json = serde_json::to_string_pretty(diag).context("serialize diagnostics")?;
    fs::write(path, json).with_context(|| format!("failed writing {}", path.display()))
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn one_decimal(value: Option<f64>) -> String {
    match value {
        Some(v) => {
            let s = format!("{v:.1}");
            if s == "-0.0" { "0.0".to_string() } else { s }
        }
        None => String::new(),
    }
}

/// Static page for the published site. `diag` is `None` when the run failed
/// before the pipeline produced anything.
pub fn render_index_html(
    games: &[MatchedGame],
    diag: Option<&Diagnostics>,
    generated_at: DateTime<Utc>,
) -> String {
    let mut html = String::new();
    html.push_str("<!doctype html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<title>NCAAB Edges</title>\n<style>\n");
    html.push_str("body{font-family:system-ui,sans-serif;margin:2rem}\n");
    html.push_str("table{border-collapse:collapse}td,th{padding:4px 8px;border-bottom:1px solid #ddd}\n");
    html.push_str("td.num{text-align:right}tr.pick{background:#eef7ee}\n");
    html.push_str("</style>\n</head>\n<body>\n<h1>NCAAB Edges</h1>\n");
    let _ = writeln!(
        html,
        "<p>Generated {}</p>",
        generated_at.format("%Y-%m-%d %H:%M UTC")
    );

    if let Some(diag) = diag {
        let _ = writeln!(
            html,
            "<p>{} games with lines, {} modeled, {} picks (threshold {} pts, home court {} pts).</p>",
            diag.lined_games,
            diag.modeled_games,
            diag.recommendations,
            one_decimal(Some(diag.edge_threshold)),
            one_decimal(Some(diag.home_court_points)),
        );
    }

    if games.is_empty() {
        html.push_str("<p>No lines available for this slate.</p>\n");
    } else {
        html.push_str("<table>\n<thead><tr>");
        for head in [
            "Home", "Away", "Home spread", "Model margin", "Market margin", "Edge", "Pick", "Ticket",
        ] {
            let _ = write!(html, "<th>{head}</th>");
        }
        html.push_str("</tr></thead>\n<tbody>\n");
        for game in games {
            let class = if game.is_pick() { " class=\"pick\"" } else { "" };
            let _ = writeln!(
                html,
                "<tr{class}><td>{}</td><td>{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td><td>{}</td><td>{}</td></tr>",
                escape_html(&game.home_team),
                escape_html(&game.away_team),
                one_decimal(game.home_spread),
                one_decimal(game.model_home_margin),
                one_decimal(game.market_home_margin),
                one_decimal(game.edge_pts),
                game.recommendation.label(),
                escape_html(&game.ticket),
            );
        }
        html.push_str("</tbody>\n</table>\n");
    }

    // Without diagnostics the run never reached the writers; only the log exists.
    let artifacts: &[&str] = if diag.is_some() {
        &[EDGES_CSV, STRONG_CSV, EDGES_XLSX, DIAGNOSTICS_JSON, BUILD_LOG_FILE]
    } else {
        html.push_str("<p>No CSV outputs found.</p>\n");
        &[BUILD_LOG_FILE]
    };
    html.push_str("<ul>\n");
    for file in artifacts {
        let _ = writeln!(html, "<li><a href=\"{file}\">{file}</a></li>");
    }
    html.push_str("</ul>\n</body>\n</html>\n");
    html
}

pub fn write_index_html(
    output_dir: &Path,
    games: &[MatchedGame],
    diag: Option<&Diagnostics>,
    generated_at: DateTime<Utc>,
) -> Result<()> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("failed creating {}", output_dir.display()))?;
    let path = output_dir.join(INDEX_HTML);
    fs::write(&path, render_index_html(games, diag, generated_at))
        .with_context(|| format!("failed writing {}", path.display()))
}

/// Writes every artifact for one run into `output_dir`.
pub fn write_all(output_dir: &Path, report: &EdgeReport, generated_at: DateTime<Utc>) -> Result<()> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("failed creating {}", output_dir.display()))?;
    write_edges_csv(&output_dir.join(EDGES_CSV), &report.games)?;
    write_strong_csv(&output_dir.join(STRONG_CSV), &report.games)?;
    write_edges_xlsx(&output_dir.join(EDGES_XLSX), &report.games)?;
    write_diagnostics(&output_dir.join(DIAGNOSTICS_JSON), &report.diagnostics)?;
    write_index_html(output_dir, &report.games, Some(&report.diagnostics), generated_at)?;
    info!(dir = %output_dir.display(), games = report.games.len(), "artifacts written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{
        DIAGNOSTICS_JSON, EDGES_CSV, EDGES_XLSX, STRONG_CSV, escape_html, one_decimal,
        render_index_html, write_edges_csv_to,
    };
    use crate::model::{MatchedGame, Recommendation};
    use crate::pipeline::Diagnostics;

    fn game(home: &str, edge: Option<f64>, rec: Recommendation) -> MatchedGame {
        MatchedGame {
            home_team: home.to_string(),
            away_team: "Away".to_string(),
            home_spread: Some(-3.0),
            h_adj_offense: Some(110.0),
            h_adj_defense: Some(95.0),
            a_adj_offense: None,
            a_adj_defense: None,
            model_home_margin: None,
            market_home_margin: Some(3.0),
            edge_pts: edge,
            recommendation: rec,
            ticket: String::new(),
        }
    }

    #[test]
    fn csv_leaves_absent_values_blank() {
        let mut buf = Vec::new();
        write_edges_csv_to(&mut buf, &[game("Duke", None, Recommendation::Pass)]).expect("csv");
        let text = String::from_utf8(buf).expect("utf8");
        let mut lines = text.lines();
        assert!(lines.next().expect("header").starts_with("home,away,home_spread"));
        assert_eq!(lines.next().expect("row"), "Duke,Away,-3.0,110.0,95.0,,,,3.0,,PASS,");
    }

    #[test]
    fn empty_csv_still_has_header() {
        let mut buf = Vec::new();
        write_edges_csv_to(&mut buf, &[]).expect("csv");
        assert_eq!(String::from_utf8(buf).expect("utf8").lines().count(), 1);
    }

    #[test]
    fn html_escapes_and_rounds() {
        let at = Utc.with_ymd_and_hms(2026, 1, 10, 12, 0, 0).single().expect("valid time");
        let html = render_index_html(
            &[game("Texas A&M", Some(2.345), Recommendation::Home)],
            None,
            at,
        );
        assert!(html.contains("Texas A&amp;M"));
        assert!(html.contains(">2.3<"));
        assert!(html.contains("class=\"pick\""));
        assert!(html.contains("2026-01-10 12:00 UTC"));
    }

    #[test]
    fn html_notes_empty_slate() {
        let at = Utc.with_ymd_and_hms(2026, 1, 10, 12, 0, 0).single().expect("valid time");
        assert!(render_index_html(&[], None, at).contains("No lines available"));
    }

    #[test]
    fn failed_run_links_only_the_build_log() {
        let at = Utc.with_ymd_and_hms(2026, 1, 10, 12, 0, 0).single().expect("valid time");
        let html = render_index_html(&[], None, at);
        assert!(html.contains("No CSV outputs found"));
        assert!(html.contains("href=\"build_log.txt\""));
        for missing in [EDGES_CSV, STRONG_CSV, EDGES_XLSX, DIAGNOSTICS_JSON] {
            assert!(!html.contains(missing), "{missing} should not be linked");
        }

        let full = render_index_html(&[], Some(&Diagnostics::default()), at);
        assert!(full.contains("href=\"edges.csv\""));
        assert!(!full.contains("No CSV outputs found"));
    }

    #[test]
    fn helpers() {
        assert_eq!(escape_html("<a href='x'>"), "&lt;a href=&#39;x&#39;&gt;");
        assert_eq!(one_decimal(Some(-0.04)), "0.0");
        assert_eq!(one_decimal(None), "");
    }
}
