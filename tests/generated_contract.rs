//! Generated declarations and generated payloads must agree: every payload
//! the value generator emits, malformed cells included, has to deserialize
//! into the field types the code generator declares.

use std::path::{Path, PathBuf};

use assert_matches::assert_matches;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sheetforge::binding::MemoryAssetStore;
use sheetforge::config::SettingsArgs;
use sheetforge::jobs::{JobProcessor, JobStore, MemoryJobStore};
use sheetforge::runtime::{Pair, SheetRecord, TableContainer};
use sheetforge::schema::CellGrid;
use sheetforge::{AssetRegistry, ForgeConfig, GenerateRequest, GenerationPipeline, SheetMode, TypeRegistry};
use tempfile::TempDir;

/// One column per descriptor shape.
const TYPES: [&str; 10] = [
    "int",
    "string",
    "int[]",
    "pair<int,string>",
    "pair<string,int>[]",
    "Vector3",
    "Vector3[]",
    "pair<int,Color>",
    "int[][]",
    "pair<Color,int>[]",
];
const NAMES: [&str; 10] = [
    "hp", "name", "level", "drop", "loot", "position", "color", "bonus", "grid", "slot",
];

/// Declarations the generator is expected to emit, in column order.
const DECLARATIONS: [&str; 10] = [
    "pub Hp: i32,",
    "pub Name: String,",
    "pub Levels: Vec<i32>,",
    "pub Drop: Pair<i32, String>,",
    "pub Loots: Vec<Pair<String, i32>>,",
    "pub Position: serde_json::Value,",
    "pub Colors: serde_json::Value,",
    "pub Bonus: serde_json::Value,",
    "pub Grids: Vec<Vec<i32>>,",
    "pub Slots: serde_json::Value,",
];

/// Mirror of the record generated for `TYPES`/`NAMES`.
#[allow(non_snake_case)]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct Monster {
    Hp: i32,
    Name: String,
    Levels: Vec<i32>,
    Drop: Pair<i32, String>,
    Loots: Vec<Pair<String, i32>>,
    Position: Value,
    Colors: Value,
    Bonus: Value,
    Grids: Vec<Vec<i32>>,
    Slots: Value,
}

impl SheetRecord for Monster {
    const TYPE_NAME: &'static str = "data::Monster";
}

#[allow(non_snake_case)]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct Monsters {
    Values: Vec<Monster>,
    sheet_id: String,
    sheet_name: String,
}

impl TableContainer for Monsters {
    type Record = Monster;

    const TYPE_NAME: &'static str = "data::Monsters";

    fn set_values(&mut self, values: Vec<Self::Record>) {
        self.Values = values;
    }

    fn set_metadata(&mut self, sheet_id: &str, sheet_name: &str) {
        self.sheet_id = sheet_id.to_string();
        self.sheet_name = sheet_name.to_string();
    }
}

fn pipeline(root: &Path) -> GenerationPipeline {
    let config = ForgeConfig::from_settings(SettingsArgs {
        project_root: Some(root.to_path_buf()),
        script_output: Some(PathBuf::from("src/data")),
        record_namespace: Some("data".into()),
        ..SettingsArgs::default()
    })
    .unwrap();
    GenerationPipeline::new(config).unwrap()
}

fn request() -> GenerateRequest {
    GenerateRequest {
        spreadsheet_id: "book".into(),
        sheet_name: "Monster".into(),
        mode: SheetMode::Table,
    }
}

fn grid(rows: Vec<Vec<&str>>) -> CellGrid {
    let mut all = vec![TYPES.to_vec(), NAMES.to_vec()];
    all.extend(rows);
    CellGrid::from_rows(all)
}

const WELL_FORMED: [&str; 10] = [
    "12",
    "Slime",
    "1, 2",
    "(1, a)",
    "(gold, 10), (gems, 2)",
    "x",
    "red",
    "(1, c)",
    "[1,2],[3]",
    "(c, 1)",
];

const MALFORMED: [&str; 10] = [
    "abc",
    "",
    "oops",
    "1",
    "(gold), (gems, 2)",
    "",
    "red, blue",
    "nope",
    "",
    "junk",
];

#[test]
fn generated_record_declares_every_shape() {
    let dir = TempDir::new().unwrap();
    let prepared = pipeline(dir.path())
        .prepare(&request(), &grid(vec![WELL_FORMED.to_vec()]))
        .unwrap();

    for declaration in DECLARATIONS {
        assert!(
            prepared.record.contents.contains(declaration),
            "missing `{declaration}` in\n{}",
            prepared.record.contents
        );
    }
    assert!(
        prepared
            .record
            .contents
            .contains("use sheetforge::runtime::{Pair, SheetRecord};")
    );
}

#[test]
fn every_payload_shape_deserializes_into_the_declared_types() {
    let dir = TempDir::new().unwrap();
    let prepared = pipeline(dir.path())
        .prepare(&request(), &grid(vec![WELL_FORMED.to_vec(), MALFORMED.to_vec()]))
        .unwrap();

    let records: Vec<Monster> = serde_json::from_value(prepared.document.clone()).unwrap();
    assert_eq!(
        records[0],
        Monster {
            Hp: 12,
            Name: "Slime".into(),
            Levels: vec![1, 2],
            Drop: Pair::new(1, "a".into()),
            Loots: vec![Pair::new("gold".into(), 10), Pair::new("gems".into(), 2)],
            Position: Value::Null,
            Colors: Value::Null,
            Bonus: Value::Null,
            Grids: vec![vec![1, 2], vec![3]],
            Slots: Value::Null,
        }
    );
    assert_eq!(
        records[1],
        Monster {
            Hp: 0,
            Name: String::new(),
            Levels: vec![0],
            Drop: Pair::default(),
            Loots: vec![Pair::default(), Pair::new("gems".into(), 2)],
            Grids: Vec::new(),
            ..Monster::default()
        }
    );
}

#[test]
fn malformed_cells_are_bound_instead_of_failing_the_job() {
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline(dir.path());
    let mut jobs = MemoryJobStore::new();
    let mut registry = AssetRegistry::load(dir.path().join("registry.json")).unwrap();
    pipeline
        .generate_from_grid(&request(), &grid(vec![MALFORMED.to_vec()]), &mut jobs, &mut registry)
        .unwrap();

    let payload: Value = serde_json::from_str(jobs.read_all().unwrap()[0].payload()).unwrap();
    assert_eq!(payload[0]["Drop"], Value::Null);
    assert_eq!(payload[0]["Colors"], Value::Null);
    assert_eq!(payload[0]["Loots"][0], Value::Null);

    let mut types = TypeRegistry::new();
    types.register_table::<Monsters>();
    let mut assets = MemoryAssetStore::new();
    let mut processor = JobProcessor::new(jobs);
    let report = processor.drain(&types, &mut assets).unwrap();

    assert_matches!(report.failed.as_slice(), []);
    let asset = assets.get("assets/Monsters.asset").unwrap();
    assert_eq!(asset.data["Values"][0]["Drop"], json!([0, ""]));
    assert_eq!(asset.data["Values"][0]["Loots"], json!([["", 0], ["gems", 2]]));
    assert_eq!(asset.data["Values"][0]["Colors"], Value::Null);
}
