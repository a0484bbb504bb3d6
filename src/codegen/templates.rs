//! Tera templates for generated Rust sources.

pub const RECORD_TEMPLATE_NAME: &str = "record.rs";
pub const CONTAINER_TEMPLATE_NAME: &str = "container.rs";
pub const MODULE_INDEX_TEMPLATE_NAME: &str = "mod.rs";

/// First line of every file this crate writes; used to recognize its own output.
pub const GENERATED_MARKER: &str = "// @generated by sheetforge";

pub const RECORD_TEMPLATE: &str = r#"// @generated by sheetforge from sheet "{{ sheet_name }}". Do not edit by hand.

use serde::{Deserialize, Serialize};
use sheetforge::runtime::{ {{- runtime_imports | join(sep=", ") -}} };

#[allow(non_snake_case)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct {{ type_name }} {
{%- for field in fields %}
    /// {{ field.doc }}
    pub {{ field.member }}: {{ field.rust_type }},
{%- endfor %}
}

impl Default for {{ type_name }} {
    fn default() -> Self {
        Self {
{%- for field in fields %}
            {{ field.member }}: {{ field.default }},
{%- endfor %}
        }
    }
}

impl SheetRecord for {{ type_name }} {
    const TYPE_NAME: &'static str = "{{ full_name }}";
}
"#;

pub const CONTAINER_TEMPLATE: &str = r#"// @generated by sheetforge from sheet "{{ sheet_name }}". Do not edit by hand.

use serde::{Deserialize, Serialize};
use sheetforge::runtime::{{ capability }};

use {{ record_path }};

#[allow(non_snake_case)]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct {{ type_name }} {
{%- if is_table %}
    pub Values: Vec<{{ record_name }}>,
{%- else %}
    value: {{ record_name }},
{%- endif %}
    sheet_id: String,
    sheet_name: String,
}

impl {{ type_name }} {
{%- if is_table %}
    pub fn values(&self) -> &[{{ record_name }}] {
        &self.Values
    }
{%- else %}
    pub fn value(&self) -> &{{ record_name }} {
        &self.value
    }

    pub fn set_value(&mut self, value: {{ record_name }}) {
        self.value = value;
    }
{%- endif %}

    pub fn sheet_id(&self) -> &str {
        &self.sheet_id
    }

    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    pub fn set_sheet_metadata(&mut self, sheet_id: &str, sheet_name: &str) {
        self.sheet_id = sheet_id.to_string();
        self.sheet_name = sheet_name.to_string();
    }
}

impl {{ capability }} for {{ type_name }} {
    type Record = {{ record_name }};

    const TYPE_NAME: &'static str = "{{ full_name }}";
{% if is_table %}
    fn set_values(&mut self, values: Vec<Self::Record>) {
        self.Values = values;
    }
{%- else %}
    fn set_single_value(&mut self, value: Self::Record) {
        self.value = value;
    }
{%- endif %}

    fn set_metadata(&mut self, sheet_id: &str, sheet_name: &str) {
        self.set_sheet_metadata(sheet_id, sheet_name);
    }
}
"#;

pub const MODULE_INDEX_TEMPLATE: &str = r#"// @generated by sheetforge. Do not edit by hand.
{% for module in modules %}
mod {{ module }};
{%- endfor %}
{% for module in modules %}
pub use {{ module }}::*;
{%- endfor %}
"#;
