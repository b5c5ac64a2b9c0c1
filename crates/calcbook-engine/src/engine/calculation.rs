//! Calculation definitions as handed to the engine by the calculation store.
//!
//! The engine never mutates these; they are owned by whatever store the
//! surrounding application provides.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Identity of a calculation within its store.
pub type CalcId = String;

/// How a calculation body is executed.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum CalculationType {
    /// `equation` evaluated by the expression evaluator.
    Standard,
    /// `customCode` run as a Rhai function body.
    CustomScript,
    /// `customCode` run by an externally loaded interpreter.
    CustomAltRuntime,
}

impl CalculationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CalculationType::Standard => "standard",
            CalculationType::CustomScript => "custom-script",
            CalculationType::CustomAltRuntime => "custom-alt-runtime",
        }
    }
}

impl FromStr for CalculationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(CalculationType::Standard),
            "custom-script" => Ok(CalculationType::CustomScript),
            "custom-alt-runtime" => Ok(CalculationType::CustomAltRuntime),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for CalculationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Explicit override of the result classification used by the formatter.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultFormat {
    #[default]
    Auto,
    Number,
    Boolean,
    Array,
    Object,
    Text,
}

/// Rendering style for numeric results.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberFormat {
    #[default]
    Decimal,
    Scientific,
    Engineering,
    Percent,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    #[default]
    Literal,
    Calculation,
}

/// A declared calculation parameter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: ParameterKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calc_reference: Option<CalcId>,
    /// Dot-separated key extracted from a structured referenced result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_property: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
}

impl Parameter {
    pub fn literal(name: &str) -> Parameter {
        Parameter {
            name: name.to_string(),
            kind: ParameterKind::Literal,
            calc_reference: None,
            result_property: None,
            default_value: None,
        }
    }

    pub fn reference(name: &str, calc_id: &str) -> Parameter {
        Parameter {
            name: name.to_string(),
            kind: ParameterKind::Calculation,
            calc_reference: Some(calc_id.to_string()),
            result_property: None,
            default_value: None,
        }
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Parameter {
        self.default_value = Some(value.into());
        self
    }

    pub fn with_property(mut self, property: &str) -> Parameter {
        self.result_property = Some(property.to_string());
        self
    }

    /// The calculation this parameter pulls its value from, if any.
    ///
    /// A calculation-typed parameter without a reference behaves like a literal.
    pub fn referenced_calculation(&self) -> Option<&str> {
        match self.kind {
            ParameterKind::Calculation => self
                .calc_reference
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty()),
            ParameterKind::Literal => None,
        }
    }
}

/// A named, parameterized computation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Calculation {
    pub id: CalcId,
    #[serde(default)]
    pub title: String,
    /// Kept as text so an unrecognised type surfaces at execution time.
    #[serde(rename = "type")]
    pub calc_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_code: Option<String>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub result_format: ResultFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimal_places: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_format: Option<NumberFormat>,
    #[serde(default = "default_store_history")]
    pub store_history: bool,
}

fn default_store_history() -> bool {
    true
}

impl Calculation {
    fn with_type(id: &str, calc_type: CalculationType) -> Calculation {
        Calculation {
            id: id.to_string(),
            title: id.to_string(),
            calc_type: calc_type.as_str().to_string(),
            equation: None,
            custom_code: None,
            parameters: vec![],
            result_format: ResultFormat::Auto,
            result_unit: None,
            decimal_places: None,
            number_format: None,
            store_history: true,
        }
    }

    pub fn standard(id: &str, equation: &str) -> Calculation {
        let mut calc = Self::with_type(id, CalculationType::Standard);
        calc.equation = Some(equation.to_string());
        calc
    }

    pub fn script(id: &str, code: &str) -> Calculation {
        let mut calc = Self::with_type(id, CalculationType::CustomScript);
        calc.custom_code = Some(code.to_string());
        calc
    }

    pub fn alt_runtime(id: &str, code: &str) -> Calculation {
        let mut calc = Self::with_type(id, CalculationType::CustomAltRuntime);
        calc.custom_code = Some(code.to_string());
        calc
    }

    pub fn with_parameter(mut self, parameter: Parameter) -> Calculation {
        self.parameters.push(parameter);
        self
    }

    pub fn with_number_format(mut self, format: NumberFormat, decimal_places: usize) -> Calculation {
        self.number_format = Some(format);
        self.decimal_places = Some(decimal_places);
        self
    }

    /// Parse the declared type. The error carries the unrecognised text.
    pub fn calculation_type(&self) -> Result<CalculationType, String> {
        self.calc_type.parse()
    }

    pub fn display_name(&self) -> &str {
        if self.title.is_empty() {
            &self.id
        } else {
            &self.title
        }
    }
}

/// A user-defined helper function callable from calculation bodies.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionDef {
    pub name: String,
    #[serde(default)]
    pub params: Vec<String>,
    /// Rhai function body (without the `fn name(..)` header).
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Global functions are loaded at init. Defaults to true.
    #[serde(default = "default_global", alias = "isGlobal")]
    pub global: bool,
}

fn default_global() -> bool {
    true
}

impl FunctionDef {
    pub fn new(name: &str, params: &[&str], code: &str) -> FunctionDef {
        FunctionDef {
            name: name.to_string(),
            params: params.iter().map(|p| p.to_string()).collect(),
            code: code.to_string(),
            description: None,
            global: true,
        }
    }
}

/// Formatting defaults applied when a calculation leaves them unset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub default_decimal_places: usize,
    pub default_number_format: NumberFormat,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            default_decimal_places: 2,
            default_number_format: NumberFormat::Decimal,
        }
    }
}
