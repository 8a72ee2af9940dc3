//! Documentation of the built-in functions.
//!
//! The catalog is rendered for people (Markdown) and for tools (JSON).

use serde::{Deserialize, Serialize};

use crate::interpreter::Builtin;

/// Documentation for a built-in function parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterDoc {
    /// Parameter name
    pub name: String,
    /// Parameter type (e.g., "STRING", "INTEGER")
    pub param_type: String,
    /// Human-readable description
    pub description: String,
}

impl ParameterDoc {
    pub fn new(name: impl Into<String>, param_type: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            param_type: param_type.into(),
            description: description.into(),
        }
    }
}

/// Documentation for one calling form of a built-in function.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDoc {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParameterDoc>,
    pub return_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
}

impl FunctionDoc {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
            return_type: String::new(),
            example: None,
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, param_type: impl Into<String>, description: impl Into<String>) -> Self {
        self.parameters.push(ParameterDoc::new(name, param_type, description));
        self
    }

    pub fn with_return_type(mut self, return_type: impl Into<String>) -> Self {
        self.return_type = return_type.into();
        self
    }

    pub fn with_example(mut self, example: impl Into<String>) -> Self {
        self.example = Some(example.into());
        self
    }

    /// `NAME(param: TYPE, ...) -> TYPE`
    pub fn signature(&self) -> String {
        let params: Vec<String> = self
            .parameters
            .iter()
            .map(|p| format!("{}: {}", p.name, p.param_type))
            .collect();
        let return_type = if self.return_type.is_empty() {
            String::new()
        } else {
            format!(" -> {}", self.return_type)
        };
        format!("{}({}){}", self.name, params.join(", "), return_type)
    }
}

/// Documentation for every built-in function.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinCatalog {
    /// Catalog format version
    pub version: String,
    pub functions: Vec<FunctionDoc>,
}

impl BuiltinCatalog {
    /// The catalog of all built-ins, in a stable order.
    pub fn new() -> Self {
        Self {
            version: String::from("1.0"),
            functions: Builtin::ALL.into_iter().flat_map(builtin_docs).collect(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str("# Built-in Functions\n\n");
        md.push_str("Built-in names are case-insensitive and cannot be redefined by a program.\n\n");
        md.push_str("---\n\n");

        for func in &self.functions {
            md.push_str(&generate_function_markdown(func));
        }

        md
    }
}

impl Default for BuiltinCatalog {
    fn default() -> Self {
        Self::new()
    }
}

fn builtin_docs(builtin: Builtin) -> Vec<FunctionDoc> {
    let name = builtin.name();
    match builtin {
        Builtin::Div => vec![FunctionDoc::new(name, "Quotient of a division, rounded down.")
            .with_param("a", "INTEGER", "Dividend")
            .with_param("b", "INTEGER", "Divisor; must not be zero")
            .with_return_type("INTEGER")
            .with_example("DIV(7, 2)  // 3")],
        Builtin::Mod => vec![FunctionDoc::new(name, "Remainder of a division; takes the sign of the dividend.")
            .with_param("a", "INTEGER", "Dividend")
            .with_param("b", "INTEGER", "Divisor; must not be zero")
            .with_return_type("INTEGER")
            .with_example("MOD(7, 2)  // 1")],
        Builtin::Length => vec![FunctionDoc::new(name, "Number of characters in a string.")
            .with_param("s", "STRING", "Text to measure")
            .with_return_type("INTEGER")
            .with_example("LENGTH(\"Hello\")  // 5")],
        Builtin::Lcase => vec![FunctionDoc::new(name, "Converts a string to lowercase.")
            .with_param("s", "STRING", "Text to convert")
            .with_return_type("STRING")
            .with_example("LCASE(\"Hello\")  // \"hello\"")],
        Builtin::Ucase => vec![FunctionDoc::new(name, "Converts a string to uppercase.")
            .with_param("s", "STRING", "Text to convert")
            .with_return_type("STRING")
            .with_example("UCASE(\"Hello\")  // \"HELLO\"")],
        Builtin::Substring => vec![FunctionDoc::new(
            name,
            "Part of a string. Positions start at 1; the range is clipped to the string.",
        )
        .with_param("s", "STRING", "Source text")
        .with_param("start", "INTEGER", "Position of the first character")
        .with_param("length", "INTEGER", "Number of characters")
        .with_return_type("STRING")
        .with_example("SUBSTRING(\"Hello\", 2, 3)  // \"ell\"")],
        Builtin::Round => vec![FunctionDoc::new(name, "Rounds half up to a number of decimal places.")
            .with_param("x", "REAL", "Value to round")
            .with_param("places", "INTEGER", "Decimal places")
            .with_return_type("REAL")
            .with_example("ROUND(3.14159, 2)  // 3.14")],
        Builtin::Random => vec![
            FunctionDoc::new(name, "Random real number from 0 (inclusive) to 1 (exclusive).")
                .with_return_type("REAL")
                .with_example("RANDOM()"),
            FunctionDoc::new(name, "Random whole number between two bounds, both inclusive.")
                .with_param("min", "INTEGER", "Lowest possible result")
                .with_param("max", "INTEGER", "Highest possible result; at least min")
                .with_return_type("INTEGER")
                .with_example("RANDOM(1, 6)"),
        ],
    }
}

fn generate_function_markdown(func: &FunctionDoc) -> String {
    let mut md = String::new();

    md.push_str(&format!("## `{}`\n\n", func.signature()));

    if !func.description.is_empty() {
        md.push_str(&format!("{}\n\n", func.description));
    }

    if !func.parameters.is_empty() {
        md.push_str("**Parameters:**\n\n");
        for param in &func.parameters {
            md.push_str(&format!("- `{}` ({}): {}\n", param.name, param.param_type, param.description));
        }
        md.push('\n');
    }

    if let Some(ref example) = func.example {
        md.push_str("**Example:**\n\n");
        md.push_str("```pseudocode\n");
        md.push_str(example);
        if !example.ends_with('\n') {
            md.push('\n');
        }
        md.push_str("```\n\n");
    }

    md
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_doc_builder() {
        let func = FunctionDoc::new("SUBSTRING", "Part of a string")
            .with_param("s", "STRING", "Source text")
            .with_param("start", "INTEGER", "First position")
            .with_return_type("STRING");

        assert_eq!(func.signature(), "SUBSTRING(s: STRING, start: INTEGER) -> STRING");
        assert!(func.example.is_none());
    }

    #[test]
    fn test_catalog_covers_every_builtin() {
        let catalog = BuiltinCatalog::new();
        for builtin in Builtin::ALL {
            let forms: Vec<_> = catalog
                .functions
                .iter()
                .filter(|f| f.name == builtin.name())
                .collect();
            assert!(!forms.is_empty(), "{} is undocumented", builtin);
            for form in forms {
                assert!(builtin.arities().contains(&form.parameters.len()));
            }
        }
    }

    #[test]
    fn test_catalog_json() {
        let json = BuiltinCatalog::new().to_json().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["functions"][0]["name"], "DIV");
        assert!(json.contains("\"return_type\": \"INTEGER\""));
    }

    #[test]
    fn test_catalog_markdown() {
        let md = BuiltinCatalog::new().to_markdown();
        assert!(md.starts_with("# Built-in Functions"));
        assert!(md.contains("## `LENGTH(s: STRING) -> INTEGER`"));
        assert!(md.contains("## `RANDOM() -> REAL`"));
        assert!(md.contains("```pseudocode\nDIV(7, 2)  // 3\n```"));
    }
}
