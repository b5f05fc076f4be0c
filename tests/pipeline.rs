use std::collections::HashMap;
use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;

use clap::Parser;
use phrasegroup::{analyze_keywords, Args};
use regex::Regex;

const KEYWORDS: &str = "\
phrase,volume,URL-1,URL-2,URL-3,cpc
buty do biegania,10,u1,u2,u3,1.2
buty biegowe,50,u4,u1,u5,0.8
kurtka zimowa,5,u6,u7,u8,2.0
";

fn args_for(dir: &Path, extra: &[&str]) -> Args {
    let input = dir.join("keywords.csv").display().to_string();
    let output = dir.join("results.xlsx").display().to_string();
    let mut argv = vec!["phrasegroup", input.as_str(), "-o", output.as_str(), "--seed", "42"];
    argv.extend_from_slice(extra);
    Args::parse_from(argv)
}

#[test]
fn csv_is_grouped_and_exported() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("keywords.csv"), KEYWORDS).unwrap();
    let summary = dir.path().join("groups.csv");
    let summary_arg = summary.display().to_string();

    let args = args_for(dir.path(), &["--summary-csv", summary_arg.as_str()]);
    let result = analyze_keywords(&dir.path().join("keywords.csv"), &args).unwrap();

    assert_eq!(result.stats.total_rows, 3);
    assert_eq!(result.stats.multi_row_groups, 1);
    assert_eq!(result.stats.grouped_rows, 2);
    assert_eq!(result.stats.singleton_rows, 1);
    assert_eq!(result.stats.largest_group, 2);
    assert_eq!(result.colors.len(), 2);

    let workbook = fs::read(dir.path().join("results.xlsx")).unwrap();
    assert_eq!(&workbook[..2], b"PK");

    let summary_text = fs::read_to_string(&summary).unwrap();
    let lines: Vec<&str> = summary_text.lines().collect();
    assert_eq!(lines[0], "group_id,main_topic,size,total_volume");
    assert_eq!(lines[1], "1,buty biegowe,2,60.0");
    assert_eq!(lines[2], "2,kurtka zimowa,1,5.0");
}

#[test]
fn missing_volume_aborts_before_export() {
    let dir = tempfile::tempdir().unwrap();
    let broken = "phrase,volume,URL-1,URL-2,URL-3\nbuty,,a,b,c\n";
    fs::write(dir.path().join("keywords.csv"), broken).unwrap();

    let args = args_for(dir.path(), &[]);
    let err = analyze_keywords(&dir.path().join("keywords.csv"), &args).unwrap_err();

    assert!(format!("{err:#}").contains("row 1: missing required field 'volume'"));
    assert!(!dir.path().join("results.xlsx").exists());
}

#[test]
fn header_only_file_exports_empty_sheet() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("keywords.csv"), "phrase,volume,URL-1,URL-2,URL-3\n").unwrap();

    let args = args_for(dir.path(), &[]);
    let result = analyze_keywords(&dir.path().join("keywords.csv"), &args).unwrap();

    assert_eq!(result.stats.total_rows, 0);
    assert!(result.outcome.groups().is_empty());
    assert!(dir.path().join("results.xlsx").exists());
}

#[test]
fn transitive_flag_changes_grouping() {
    let dir = tempfile::tempdir().unwrap();
    let chain = "phrase,volume,URL-1,URL-2,URL-3\nr1,1,a,a,a\nr2,2,a,b,b\nr3,3,b,b,b\n";
    fs::write(dir.path().join("keywords.csv"), chain).unwrap();
    let input = dir.path().join("keywords.csv");

    let sequential = analyze_keywords(&input, &args_for(dir.path(), &[])).unwrap();
    assert_eq!(sequential.stats.singleton_rows, 1);

    let transitive = analyze_keywords(&input, &args_for(dir.path(), &["--transitive"])).unwrap();
    assert_eq!(transitive.stats.singleton_rows, 0);
    assert_eq!(transitive.stats.largest_group, 3);
}

#[test]
fn failed_summary_write_leaves_no_workbook() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("keywords.csv"), KEYWORDS).unwrap();
    let summary_dir = dir.path().join("groups");
    fs::create_dir(&summary_dir).unwrap();
    let summary_arg = summary_dir.display().to_string();

    let args = args_for(dir.path(), &["--summary-csv", summary_arg.as_str()]);
    let err = analyze_keywords(&dir.path().join("keywords.csv"), &args);

    assert!(err.is_err());
    assert!(!dir.path().join("results.xlsx").exists());
}

/// One `<c>` element of a worksheet.
#[derive(Debug)]
struct Cell {
    style: usize,
    shared_string: bool,
    value: Option<String>,
}

fn zip_entry(archive: &mut zip::ZipArchive<Cursor<Vec<u8>>>, name: &str) -> String {
    let mut text = String::new();
    archive.by_name(name).unwrap().read_to_string(&mut text).unwrap();
    text
}

fn sheet_cells(xml: &str) -> HashMap<String, Cell> {
    let cell = Regex::new(r#"<c r="([A-Z]+\d+)"([^>]*?)(?:/>|>(?:<v>([^<]*)</v>)?</c>)"#).unwrap();
    let style = Regex::new(r#"s="(\d+)""#).unwrap();
    cell.captures_iter(xml)
        .map(|c| {
            let attrs = &c[2];
            let style = style
                .captures(attrs)
                .map(|s| s[1].parse().unwrap())
                .unwrap_or(0);
            let parsed = Cell {
                style,
                shared_string: attrs.contains(r#"t="s""#),
                value: c.get(3).map(|v| v.as_str().to_string()),
            };
            (c[1].to_string(), parsed)
        })
        .collect()
}

fn shared_strings(xml: &str) -> Vec<String> {
    let item = Regex::new(r"(?s)<si>(.*?)</si>").unwrap();
    let text = Regex::new(r"<t[^>]*>([^<]*)</t>").unwrap();
    item.captures_iter(xml)
        .map(|si| {
            text.captures(&si[1])
                .map(|t| t[1].to_string())
                .unwrap_or_default()
        })
        .collect()
}

/// Fill color (`RRGGBB`) of every cell style, `None` for unfilled styles.
fn style_fills(xml: &str) -> Vec<Option<String>> {
    let fills_section = Regex::new(r"(?s)<fills[^>]*>(.*?)</fills>").unwrap();
    let fill = Regex::new(r"(?s)<fill>(.*?)</fill>").unwrap();
    let rgb = Regex::new(r#"rgb="FF([0-9A-F]{6})""#).unwrap();
    let fills: Vec<Option<String>> = fill
        .captures_iter(&fills_section.captures(xml).unwrap()[1])
        .map(|f| rgb.captures(&f[1]).map(|c| c[1].to_string()))
        .collect();

    let xfs_section = Regex::new(r"(?s)<cellXfs[^>]*>(.*?)</cellXfs>").unwrap();
    let xf = Regex::new(r"<xf\b[^>]*>").unwrap();
    let fill_id = Regex::new(r#"fillId="(\d+)""#).unwrap();
    xf.find_iter(&xfs_section.captures(xml).unwrap()[1])
        .map(|x| {
            let id: usize = fill_id
                .captures(x.as_str())
                .map(|c| c[1].parse().unwrap())
                .unwrap_or(0);
            fills[id].clone()
        })
        .collect()
}

#[test]
fn workbook_keeps_original_cells_and_colors_rows_by_group() {
    let dir = tempfile::tempdir().unwrap();
    let keywords = "\
phrase,volume,URL-1,URL-2,URL-3,cpc
buty do biegania,10,u1,u2,u3,1.2
buty biegowe,50,u4,u1,u5,0.8,sezon
kurtka zimowa,5,u6,u7,u8
";
    fs::write(dir.path().join("keywords.csv"), keywords).unwrap();
    fs::write(dir.path().join("palette.txt"), "#A1B2C3\n#D4E5F6\n").unwrap();
    let input = dir.path().join("keywords.csv").display().to_string();
    let output = dir.path().join("results.xlsx").display().to_string();
    let palette = dir.path().join("palette.txt").display().to_string();
    let args = Args::parse_from([
        "phrasegroup",
        input.as_str(),
        "-o",
        output.as_str(),
        "--palette",
        palette.as_str(),
    ]);

    analyze_keywords(&dir.path().join("keywords.csv"), &args).unwrap();

    let bytes = fs::read(dir.path().join("results.xlsx")).unwrap();
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let cells = sheet_cells(&zip_entry(&mut archive, "xl/worksheets/sheet1.xml"));
    let strings = shared_strings(&zip_entry(&mut archive, "xl/sharedStrings.xml"));
    let fills = style_fills(&zip_entry(&mut archive, "xl/styles.xml"));

    let text = |cell: &str| -> String {
        let c = &cells[cell];
        assert!(c.shared_string, "{cell} should hold a string");
        strings[c.value.as_deref().unwrap().parse::<usize>().unwrap()].clone()
    };
    let number = |cell: &str| -> f64 {
        let c = &cells[cell];
        assert!(!c.shared_string, "{cell} should hold a number");
        c.value.as_deref().unwrap().parse().unwrap()
    };
    let fill = |cell: &str| fills[cells[cell].style].clone();

    // Original headers, a blank column for the overlong record, then the computed columns.
    let header: Vec<String> = ["A1", "B1", "C1", "D1", "E1", "F1"].iter().map(|c| text(*c)).collect();
    assert_eq!(header, ["phrase", "volume", "URL-1", "URL-2", "URL-3", "cpc"]);
    assert!(!cells.contains_key("G1"));
    assert_eq!(text("H1"), "group id");
    assert_eq!(text("I1"), "main topic");

    assert_eq!(text("A2"), "buty do biegania");
    assert_eq!(text("A3"), "buty biegowe");
    assert_eq!(text("A4"), "kurtka zimowa");
    assert_eq!(number("B2"), 10.0);
    assert_eq!(number("B3"), 50.0);
    assert_eq!(number("B4"), 5.0);
    assert_eq!(text("D3"), "u1");
    assert_eq!(text("F2"), "1.2");
    assert_eq!(text("G3"), "sezon");

    assert_eq!(number("H2"), 1.0);
    assert_eq!(number("H3"), 1.0);
    assert_eq!(number("H4"), 2.0);
    assert_eq!(text("I2"), "buty biegowe");
    assert_eq!(text("I4"), "kurtka zimowa");

    // The short record is padded out to the full width.
    for cell in ["F4", "G4"] {
        assert!(cells[cell].value.is_none() || text(cell).is_empty(), "{cell} should be blank");
    }

    for row in 2..=4 {
        let expected = if row == 4 { "D4E5F6" } else { "A1B2C3" };
        for col in ["A", "B", "C", "F", "G", "H", "I"] {
            let cell = format!("{col}{row}");
            assert_eq!(fill(cell.as_str()).as_deref(), Some(expected), "fill of {cell}");
        }
    }
    assert_eq!(fill("A1"), None);
}
