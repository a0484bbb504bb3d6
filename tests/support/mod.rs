//! Hand-written equivalents of what the generator emits for the `Monster`
//! and `Settings` sheets used across the integration tests.

#![allow(dead_code)]

use serde::{Deserialize, Serialize};
use sheetforge::TypeRegistry;
use sheetforge::runtime::{ConstContainer, SheetRecord, TableContainer};
use sheetforge::schema::CellGrid;

#[allow(non_snake_case)]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Monster {
    pub Hp: i32,
    pub Name: String,
    pub Tags: Vec<String>,
}

impl SheetRecord for Monster {
    const TYPE_NAME: &'static str = "data::Monster";
}

#[allow(non_snake_case)]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Monsters {
    pub Values: Vec<Monster>,
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

#[allow(non_snake_case)]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub Volume: f32,
    pub Title: String,
}

impl SheetRecord for Settings {
    const TYPE_NAME: &'static str = "data::Settings";
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settingses {
    value: Settings,
    sheet_id: String,
    sheet_name: String,
}

impl ConstContainer for Settingses {
    type Record = Settings;

    const TYPE_NAME: &'static str = "data::Settingses";

    fn set_single_value(&mut self, value: Self::Record) {
        self.value = value;
    }

    fn set_metadata(&mut self, sheet_id: &str, sheet_name: &str) {
        self.sheet_id = sheet_id.to_string();
        self.sheet_name = sheet_name.to_string();
    }
}

pub fn registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry.register_table::<Monsters>();
    registry.register_const::<Settingses>();
    registry
}

pub fn monster_grid() -> CellGrid {
    CellGrid::from_rows(vec![
        vec!["int", "string", "string[]"],
        vec!["hp", "name", "tag"],
        vec!["10", "Slime", "weak, small"],
        vec!["250", "Dragon", "boss"],
    ])
}

pub fn settings_grid() -> CellGrid {
    CellGrid::from_rows(vec![
        vec!["float", "volume", "0.5"],
        vec!["string", "title", "Forge"],
    ])
}
