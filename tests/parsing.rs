use std::fs;
use std::path::PathBuf;

use ncaab_edges::sources::bovada::parse_bovada_coupon;
use ncaab_edges::sources::espn::parse_espn_scoreboard;
use ncaab_edges::sources::file::parse_lines_csv;
use ncaab_edges::sources::torvik::parse_ratings_csv;

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

#[test]
fn parses_espn_scoreboard_fixture() {
    let raw = read_fixture("espn_scoreboard.json");
    let rows = parse_espn_scoreboard(&raw).expect("fixture should parse");
    assert_eq!(rows.len(), 3);

    assert_eq!(rows[0].home_team, "Duke");
    assert_eq!(rows[0].away_team, "North Carolina");
    assert_eq!(rows[0].home_spread, Some(-5.5));

    assert_eq!(rows[1].home_team, "Kansas");
    assert_eq!(rows[1].away_team, "Baylor");
    assert_eq!(rows[1].home_spread, Some(1.5));

    assert_eq!(rows[2].away_team, "Catawba");
    assert_eq!(rows[2].home_spread, None);
    assert!(rows.iter().all(|r| r.source == "espn"));
}

#[test]
fn parses_bovada_coupon_fixture() {
    let raw = read_fixture("bovada_coupon.json");
    let rows = parse_bovada_coupon(&raw).expect("fixture should parse");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].home_team, "UConn");
    assert_eq!(rows[0].away_team, "St. John's");
    assert_eq!(rows[0].home_spread, Some(-6.0));
    assert_eq!(rows[1].home_team, "Gonzaga");
    assert_eq!(rows[1].home_spread, None);
}

#[test]
fn parses_torvik_fixture() {
    let raw = read_fixture("torvik_team_results.csv");
    let rows = parse_ratings_csv(&raw).expect("fixture should parse");
    assert_eq!(rows.len(), 9);
    assert_eq!(rows[0].team_name, "Houston");
    assert_eq!(rows[0].adj_offense, 121.4);
    assert_eq!(rows[0].adj_defense, 87.9);
    assert!(rows.iter().all(|r| r.team_name != "Mystery State"));
}

#[test]
fn parses_lines_fixture() {
    let raw = read_fixture("lines.csv");
    let rows = parse_lines_csv(&raw, "file").expect("fixture should parse");
    assert_eq!(rows.len(), 6);
    assert_eq!(rows[2].home_team, "UConn");
    assert_eq!(rows[2].home_spread, Some(-6.0));
    assert_eq!(rows[2].source, "bovada");
    assert_eq!(rows[3].home_spread, None);
}
