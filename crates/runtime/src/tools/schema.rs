//! Input schemas for tools.
//!
//! A schema is a flat list of named parameters. It validates the arguments
//! object the model sends and renders itself as JSON Schema for the model.

use serde_json::{Map, Value, json};

/// JSON type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParamType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }

    fn accepts(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => {
                value.is_i64()
                    || value.is_u64()
                    || value.as_f64().is_some_and(|f| f.fract() == 0.0)
            }
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// One named parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: ParamType,
    pub description: String,
    pub required: bool,
    pub default: Option<Value>,
    pub allowed: Vec<Value>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
}

impl Param {
    fn new(name: impl Into<String>, ty: ParamType, required: bool) -> Self {
        Self {
            name: name.into(),
            ty,
            description: String::new(),
            required,
            default: None,
            allowed: Vec::new(),
            minimum: None,
            maximum: None,
        }
    }

    pub fn required(name: impl Into<String>, ty: ParamType) -> Self {
        Self::new(name, ty, true)
    }

    pub fn optional(name: impl Into<String>, ty: ParamType) -> Self {
        Self::new(name, ty, false)
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Value filled in when an optional parameter is omitted.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Restrict the parameter to a fixed set of values.
    pub fn one_of<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.allowed = values.into_iter().map(Into::into).collect();
        self
    }

    /// Inclusive numeric bounds.
    pub fn range(mut self, minimum: f64, maximum: f64) -> Self {
        self.minimum = Some(minimum);
        self.maximum = Some(maximum);
        self
    }

    fn check(&self, value: &Value) -> Result<(), String> {
        if !self.ty.accepts(value) {
            return Err(format!(
                "parameter `{}` must be {}, got {}",
                self.name,
                self.ty.as_str(),
                type_name(value)
            ));
        }
        if !self.allowed.is_empty() && !self.allowed.contains(value) {
            let options: Vec<String> = self
                .allowed
                .iter()
                .map(|v| v.as_str().map_or_else(|| v.to_string(), str::to_string))
                .collect();
            return Err(format!(
                "parameter `{}` must be one of {}",
                self.name,
                options.join(", ")
            ));
        }
        if let Some(number) = value.as_f64() {
            if let Some(min) = self.minimum.filter(|min| number < *min) {
                return Err(format!("parameter `{}` must be at least {min}", self.name));
            }
            if let Some(max) = self.maximum.filter(|max| number > *max) {
                return Err(format!("parameter `{}` must be at most {max}", self.name));
            }
        }
        Ok(())
    }

    fn to_json_schema(&self) -> Value {
        let mut schema = Map::new();
        schema.insert("type".into(), json!(self.ty.as_str()));
        if !self.description.is_empty() {
            schema.insert("description".into(), json!(self.description));
        }
        if !self.allowed.is_empty() {
            schema.insert("enum".into(), Value::Array(self.allowed.clone()));
        }
        if let Some(min) = self.minimum {
            schema.insert("minimum".into(), json!(min));
        }
        if let Some(max) = self.maximum {
            schema.insert("maximum".into(), json!(max));
        }
        if let Some(default) = &self.default {
            schema.insert("default".into(), default.clone());
        }
        Value::Object(schema)
    }
}

/// The parameters a tool accepts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputSchema {
    params: Vec<Param>,
    allow_extra: bool,
}

impl InputSchema {
    /// A schema with no parameters.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    /// Accept parameters the schema does not declare.
    pub fn allow_extra(mut self) -> Self {
        self.allow_extra = true;
        self
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Check arguments, reporting the first violation.
    ///
    /// Checks run in a fixed order: missing required parameters first, then
    /// type and constraint violations (both in declaration order), then
    /// undeclared parameters (by name). A `null` value counts as absent.
    pub fn validate(&self, args: &Map<String, Value>) -> Result<(), String> {
        let present = |name: &str| args.get(name).filter(|v| !v.is_null());

        for param in self.params.iter().filter(|p| p.required) {
            if present(&param.name).is_none() {
                return Err(format!("missing required parameter `{}`", param.name));
            }
        }

        for param in &self.params {
            if let Some(value) = present(&param.name) {
                param.check(value)?;
            }
        }

        if !self.allow_extra {
            let mut extra: Vec<&String> = args
                .keys()
                .filter(|key| !self.params.iter().any(|p| &p.name == *key))
                .collect();
            extra.sort();
            if let Some(name) = extra.first() {
                return Err(format!("unexpected parameter `{name}`"));
            }
        }

        Ok(())
    }

    /// Fill omitted optional parameters with their defaults.
    pub fn apply_defaults(&self, args: &mut Map<String, Value>) {
        for param in &self.params {
            if let Some(default) = &param.default {
                let missing = args.get(&param.name).is_none_or(Value::is_null);
                if missing {
                    args.insert(param.name.clone(), default.clone());
                }
            }
        }
    }

    /// Render as a JSON Schema object.
    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .params
            .iter()
            .map(|p| (p.name.clone(), p.to_json_schema()))
            .collect();
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": self.allow_extra,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> InputSchema {
        InputSchema::new()
            .param(Param::required("player_name", ParamType::String).describe("Partial name"))
            .param(
                Param::optional("top_n", ParamType::Integer)
                    .range(1.0, 50.0)
                    .default_value(10),
            )
            .param(
                Param::optional("position", ParamType::String).one_of(["GKP", "DEF", "MID", "FWD"]),
            )
    }

    fn args(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn accepts_valid_arguments() {
        let result = schema().validate(&args(json!({ "player_name": "Saka", "top_n": 5 })));
        assert_eq!(result, Ok(()));
    }

    #[test]
    fn missing_required_reported_before_type_mismatch() {
        let err = schema()
            .validate(&args(json!({ "top_n": "five", "bogus": 1 })))
            .unwrap_err();
        assert_eq!(err, "missing required parameter `player_name`");
    }

    #[test]
    fn null_counts_as_missing() {
        let err = schema()
            .validate(&args(json!({ "player_name": null })))
            .unwrap_err();
        assert_eq!(err, "missing required parameter `player_name`");
    }

    #[test]
    fn type_mismatch_reported_before_extras() {
        let err = schema()
            .validate(&args(json!({ "player_name": "Saka", "top_n": "five", "bogus": 1 })))
            .unwrap_err();
        assert_eq!(err, "parameter `top_n` must be integer, got string");
    }

    #[test]
    fn constraint_violations() {
        let err = schema()
            .validate(&args(json!({ "player_name": "Saka", "top_n": 99 })))
            .unwrap_err();
        assert_eq!(err, "parameter `top_n` must be at most 50");

        let err = schema()
            .validate(&args(json!({ "player_name": "Saka", "position": "STR" })))
            .unwrap_err();
        assert_eq!(err, "parameter `position` must be one of GKP, DEF, MID, FWD");
    }

    #[test]
    fn integral_floats_are_integers() {
        let result = schema().validate(&args(json!({ "player_name": "Saka", "top_n": 5.0 })));
        assert_eq!(result, Ok(()));
        let err = schema()
            .validate(&args(json!({ "player_name": "Saka", "top_n": 5.5 })))
            .unwrap_err();
        assert_eq!(err, "parameter `top_n` must be integer, got number");
    }

    #[test]
    fn extras_reported_alphabetically() {
        let err = schema()
            .validate(&args(json!({ "player_name": "Saka", "zeta": 1, "alpha": 2 })))
            .unwrap_err();
        assert_eq!(err, "unexpected parameter `alpha`");

        let open = schema().allow_extra();
        assert_eq!(
            open.validate(&args(json!({ "player_name": "Saka", "zeta": 1 }))),
            Ok(())
        );
    }

    #[test]
    fn defaults_fill_omitted_parameters() {
        let mut values = args(json!({ "player_name": "Saka" }));
        schema().apply_defaults(&mut values);
        assert_eq!(values["top_n"], json!(10));

        let mut values = args(json!({ "player_name": "Saka", "top_n": 3 }));
        schema().apply_defaults(&mut values);
        assert_eq!(values["top_n"], json!(3));
    }

    #[test]
    fn renders_json_schema() {
        let rendered = schema().to_json_schema();
        assert_eq!(rendered["type"], "object");
        assert_eq!(rendered["required"], json!(["player_name"]));
        assert_eq!(rendered["additionalProperties"], json!(false));
        assert_eq!(rendered["properties"]["top_n"]["default"], json!(10));
        assert_eq!(rendered["properties"]["top_n"]["maximum"], json!(50.0));
        assert_eq!(
            rendered["properties"]["position"]["enum"],
            json!(["GKP", "DEF", "MID", "FWD"])
        );
    }
}
