use std::fs::File;
use std::io::Write;
use std::path::Path;

use trailsheet::config::ExpectedTabs;
use trailsheet::config::TraceConfig;
use trailsheet::map::GeometryError;
use trailsheet::progress::extract_trail_attributes;
use trailsheet::progress::Edition;
use trailsheet::progress::TabBounds;
use trailsheet::progress::TableBoundsError;
use trailsheet::progress::TracingWorkbook;
use trailsheet::spreadsheet::open_spreadsheet;
use trailsheet::spreadsheet::CellValue;
use trailsheet::spreadsheet::Spreadsheet;
use trailsheet::spreadsheet::SpreadsheetError;
use trailsheet::TrailSheetError;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

enum Value {
    Text(&'static str),
    Number(f64),
}

use Value::Number;
use Value::Text;

fn column_name(col: usize) -> String {
    let mut name = String::new();
    let mut index = col + 1;
    while index > 0 {
        let remainder = (index - 1) % 26;
        name.insert(0, (b'A' + remainder as u8) as char);
        index = (index - 1) / 26;
    }
    name
}

/// Places cells at explicit zero-based positions of a worksheet.
fn worksheet(cells: &[(usize, usize, Value)]) -> String {
    let mut rows: Vec<(usize, String)> = Vec::new();
    for (row, col, value) in cells {
        let reference = format!("{}{}", column_name(*col), row + 1);
        let cell = match value {
            Text(text) => format!(r#"<c r="{reference}" t="inlineStr"><is><t>{text}</t></is></c>"#),
            Number(number) => format!(r#"<c r="{reference}"><v>{number}</v></c>"#),
        };
        match rows.iter_mut().find(|(index, _)| index == row) {
            Some((_, xml)) => xml.push_str(&cell),
            None => rows.push((*row, cell)),
        }
    }
    rows.sort_by_key(|(row, _)| *row);
    let body: String = rows
        .into_iter()
        .map(|(row, xml)| format!(r#"<row r="{}">{xml}</row>"#, row + 1))
        .collect();
    format!(r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{body}</sheetData></worksheet>"#)
}

fn write_workbook(path: &Path, tabs: &[(&str, Vec<(usize, usize, Value)>)]) {
    let mut zip = ZipWriter::new(File::create(path).unwrap());
    let options = SimpleFileOptions::default();
    let mut sheets = String::new();
    let mut relationships = String::new();
    for (index, (name, cells)) in tabs.iter().enumerate() {
        let id = index + 1;
        sheets.push_str(&format!(r#"<sheet name="{name}" sheetId="{id}" r:id="rId{id}"/>"#));
        relationships.push_str(&format!(
            r#"<Relationship Id="rId{id}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{id}.xml"/>"#
        ));
        zip.start_file(format!("xl/worksheets/sheet{id}.xml"), options).unwrap();
        zip.write_all(worksheet(cells).as_bytes()).unwrap();
    }
    zip.start_file("xl/workbook.xml", options).unwrap();
    zip.write_all(
        format!(
            r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>{sheets}</sheets></workbook>"#
        )
        .as_bytes(),
    )
    .unwrap();
    zip.start_file("xl/_rels/workbook.xml.rels", options).unwrap();
    zip.write_all(
        format!(r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{relationships}</Relationships>"#)
            .as_bytes(),
    )
    .unwrap();
    zip.finish().unwrap();
}

fn summary() -> (&'static str, Vec<(usize, usize, Value)>) {
    ("Summary", vec![(0, 0, Text("AMC White Mountain Guide")), (1, 0, Text("30th Edition"))])
}

fn pemigewasset() -> (&'static str, Vec<(usize, usize, Value)>) {
    (
        "Pemigewasset",
        vec![
            (0, 0, Text("Pemigewasset Wilderness")),
            (3, 2, Text("Trail Name")),
            (3, 3, Text("Section")),
            (3, 5, Text("Total Mileage")),
            (3, 6, Text("Miles To Do")),
            (4, 2, Text("Pemi Trail")),
            (4, 5, Number(12.5)),
            (4, 6, Number(0.0)),
        ],
    )
}

fn carter_moriah() -> (&'static str, Vec<(usize, usize, Value)>) {
    (
        "Carter-Moriah",
        vec![
            (1, 0, Text("Trail Name")),
            (1, 1, Text("Mileage Total")),
            (1, 2, Text("Miles To Do This Year")),
            (2, 0, Text("Rattle River Trail")),
            (2, 1, Number(4.3)),
            (2, 2, Number(1.8)),
            (3, 0, Text("Stony Brook Trail")),
            (3, 1, Number(3.6)),
            (3, 2, Number(3.6)),
        ],
    )
}

const GEOMETRY: &str = r#"{
    "type": "FeatureCollection",
    "features": [
        {
            "type": "Feature",
            "properties": {"Trail_ID": "Pemigewasset, Pemi Trail", "Alt_ID": null},
            "geometry": {"type": "LineString", "coordinates": [[-71.59, 44.06], [-71.57, 44.08]]}
        },
        {
            "type": "Feature",
            "properties": {"Trail_ID": "Carter-Moriah, Rattlesnake Trail", "Alt_ID": "Carter-Moriah, Rattle River Trail"},
            "geometry": {"type": "LineString", "coordinates": [[-71.1, 44.3], [-71.2, 44.31]]}
        }
    ]
}"#;

struct Fixture {
    _dir: tempfile::TempDir,
    config: TraceConfig,
}

fn fixture(tabs: &[(&str, Vec<(usize, usize, Value)>)], workbook_name: &str) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let workbook = dir.path().join(workbook_name);
    write_workbook(&workbook, tabs);
    let geometry = dir.path().join("trails.geojson");
    std::fs::write(&geometry, GEOMETRY).unwrap();
    let peaks = dir.path().join("peaks.csv");
    std::fs::write(&peaks, "Peak,Elevation,LAT,LNG\nMount Carrigain,4700,44.0936,-71.4467\n").unwrap();

    let expected_tabs = ExpectedTabs::new([
        ("Pemigewasset", "Franconia, Twin, and Willey Ranges"),
        ("Carter-Moriah", "Carter and Baldface Ranges"),
    ]);
    Fixture {
        config: TraceConfig {
            workbook,
            expected_tabs,
            geometry,
            peaks: Some(peaks),
        },
        _dir: dir,
    }
}

#[test]
fn pemigewasset_trail_is_drawn_as_traced() {
    let fixture = fixture(&[summary(), pemigewasset(), carter_moriah()], "tracing.xlsx");

    let mut spreadsheet = open_spreadsheet(&fixture.config.workbook).unwrap();
    let tab = spreadsheet.read_tab("Pemigewasset").unwrap();
    let bounds = TabBounds::resolve(&tab).unwrap();
    assert_eq!(
        (bounds.header_row, bounds.name_column, bounds.mileage_column, bounds.todo_column, bounds.last_row),
        (3, 2, 5, 6, 4)
    );
    let table = extract_trail_attributes(&tab, &bounds);
    let entry = table.get("Pemigewasset, Pemi Trail").unwrap();
    assert_eq!(entry.mileage, CellValue::Number(12.5));
    assert_eq!(entry.miles_todo, CellValue::Number(0.0));

    let outcome = trailsheet::trace_workbook(&fixture.config).unwrap();
    assert_eq!(outcome.edition, Edition::Thirtieth);
    assert!(outcome.reconciliation.to_draw.contains(&"Pemigewasset, Pemi Trail".to_owned()));
    let pemi = outcome.geometry.get("Pemigewasset, Pemi Trail").unwrap();
    assert!(pemi.attributes.as_ref().unwrap().is_traced());

    let layers = serde_json::to_value(outcome.layers(&fixture.config.expected_tabs)).unwrap();
    let feature = &layers["features"][0];
    assert_eq!(feature["properties"]["trail_name"], "Pemi Trail");
    assert_eq!(feature["properties"]["section"], "Franconia, Twin, and Willey Ranges");
    assert_eq!(feature["properties"]["color"], "red");
}

#[test]
fn rattle_river_resolves_through_alternate_identifier() {
    let fixture = fixture(&[summary(), pemigewasset(), carter_moriah()], "tracing.xlsx");
    let outcome = trailsheet::trace_workbook(&fixture.config).unwrap();

    assert_eq!(
        outcome.reconciliation.to_draw,
        vec!["Pemigewasset, Pemi Trail", "Carter-Moriah, Rattlesnake Trail"]
    );
    assert_eq!(
        outcome.reconciliation.alternate,
        vec![(
            "Carter-Moriah, Rattle River Trail".to_owned(),
            "Carter-Moriah, Rattlesnake Trail".to_owned()
        )]
    );
    assert!(outcome.geometry.get("Carter-Moriah, Rattle River Trail").is_none());
    let rattlesnake = outcome.geometry.get("Carter-Moriah, Rattlesnake Trail").unwrap();
    assert_eq!(rattlesnake.attributes.as_ref().unwrap().mileage, CellValue::Number(4.3));
    assert_eq!(outcome.geometry.len(), 2);

    assert_eq!(outcome.reconciliation.without_geometry, vec!["Carter-Moriah, Stony Brook Trail"]);
    assert_eq!(
        outcome.report().unwrap(),
        "The geometry of the following trails is unavailable and could not be drawn:\n    (Tab, Trail Name)\n1.    Carter-Moriah, Stony Brook Trail"
    );
    assert_eq!(outcome.peaks.len(), 1);
}

#[test]
fn missing_tab_aborts_the_run() {
    let fixture = fixture(&[summary(), pemigewasset()], "tracing.xlsx");
    match trailsheet::trace_workbook(&fixture.config) {
        Err(TrailSheetError::SpreadsheetError(SpreadsheetError::SchemaValidationError(missing))) => {
            assert_eq!(missing, vec!["Carter-Moriah"]);
        }
        other => panic!("expected schema validation error, got {other:?}"),
    }
}

#[test]
fn broken_tab_names_failed_invariant() {
    let broken = ("Carter-Moriah", vec![(0, 0, Text("Trail Name")), (0, 1, Text("Total")), (1, 0, Text("Imp Trail"))]);
    let fixture = fixture(&[summary(), pemigewasset(), broken], "tracing.xlsx");
    let error = trailsheet::trace_workbook(&fixture.config).unwrap_err();
    assert!(matches!(error, TrailSheetError::TableBoundsError(TableBoundsError { ref tab, .. }) if tab == "Carter-Moriah"));
    assert_eq!(error.to_string(), "'Carter-Moriah' tab, could not find 'Miles To Do' column");
}

#[test]
fn unsupported_extension_fails_before_reading() {
    let fixture = fixture(&[summary(), pemigewasset()], "tracing.ods");
    let result = TracingWorkbook::open(&fixture.config.workbook, &fixture.config.expected_tabs);
    assert!(matches!(result, Err(TrailSheetError::SpreadsheetError(SpreadsheetError::PreconditionError(_)))));
}

#[test]
fn workbook_edition_29() {
    let old_summary = ("Summary", vec![(1, 0, Text("29th Edition"))]);
    let fixture = fixture(&[old_summary, pemigewasset(), carter_moriah()], "tracing.xlsx");
    let workbook = TracingWorkbook::open(&fixture.config.workbook, &fixture.config.expected_tabs).unwrap();
    assert_eq!(workbook.edition(), Edition::TwentyNinth);
    assert_eq!(workbook.tab_names(), ["Summary", "Pemigewasset", "Carter-Moriah"]);
}

#[test]
fn geometry_and_peaks_errors_stay_typed() {
    let fixture = fixture(&[summary(), pemigewasset(), carter_moriah()], "tracing.xlsx");
    let clash = GEOMETRY.replace("\"Alt_ID\": null", "\"Alt_ID\": \"Carter-Moriah, Rattle River Trail\"");
    std::fs::write(&fixture.config.geometry, clash).unwrap();
    match trailsheet::trace_workbook(&fixture.config) {
        Err(TrailSheetError::GeometryError(GeometryError::DuplicateAlternateId { alt_id, .. })) => {
            assert_eq!(alt_id, "Carter-Moriah, Rattle River Trail");
        }
        other => panic!("expected duplicate alternate identifier, got {other:?}"),
    }

    std::fs::write(&fixture.config.geometry, GEOMETRY).unwrap();
    let peaks = fixture.config.peaks.as_ref().unwrap();
    std::fs::write(peaks, "Peak,Elevation,LAT,LNG\nMount Carrigain,4700,north,-71.4467\n").unwrap();
    assert!(matches!(trailsheet::trace_workbook(&fixture.config), Err(TrailSheetError::CsvError(_))));
}
