//! JSON schema builders for MCP tools.

use crate::processing::validate::{
    DEFAULT_SUMMARY_LENGTH, MAX_FOCUS_AREA_CHARS, MAX_GOAL_CHARS, SUMMARY_LENGTH_RANGE,
};
use serde_json::{Map, Value};

/// Build the schema describing the `pdf-smart-summarizer` tool input.
pub(crate) fn summarize_input_schema() -> Map<String, Value> {
    let mut properties = Map::new();
    properties.insert(
        "documentPath".into(),
        string_schema("Absolute path of the PDF to summarize (alias: pdfPath)"),
    );
    properties.insert(
        "role".into(),
        string_schema(
            "Reader role, e.g. lawyer, student, researcher, manager, analyst; other roles get a generic framing (alias: userRole)",
        ),
    );

    let mut goal_schema = Map::new();
    goal_schema.insert("type".into(), Value::String("string".into()));
    goal_schema.insert(
        "description".into(),
        Value::String("What the reader wants from the document (alias: summaryRequest)".into()),
    );
    goal_schema.insert("minLength".into(), Value::Number(1.into()));
    goal_schema.insert("maxLength".into(), Value::Number(MAX_GOAL_CHARS.into()));
    properties.insert("goal".into(), Value::Object(goal_schema));

    properties.insert(
        "level".into(),
        enum_schema(
            "Level of detail (alias: summaryLevel)",
            &["brief", "standard", "detailed"],
            "detailed",
        ),
    );

    let mut focus_item_schema = Map::new();
    focus_item_schema.insert("type".into(), Value::String("string".into()));
    focus_item_schema.insert("maxLength".into(), Value::Number(MAX_FOCUS_AREA_CHARS.into()));
    let mut focus_schema = Map::new();
    focus_schema.insert("type".into(), Value::String("array".into()));
    focus_schema.insert(
        "description".into(),
        Value::String("Sections or topics to emphasize".into()),
    );
    focus_schema.insert("items".into(), Value::Object(focus_item_schema));
    properties.insert("focusAreas".into(), Value::Object(focus_schema));

    properties.insert(
        "outputFormat".into(),
        enum_schema("Rendering target", &["markdown", "json", "text"], "markdown"),
    );
    properties.insert(
        "language".into(),
        enum_schema("Summary language", &["zh-CN", "en-US"], "zh-CN"),
    );
    properties.insert(
        "includeOriginalText".into(),
        bool_schema("Return the extracted text alongside the summary", true),
    );

    let mut length_schema = Map::new();
    length_schema.insert("type".into(), Value::String("integer".into()));
    length_schema.insert(
        "description".into(),
        Value::String("Upper bound on the narrative length, in characters".into()),
    );
    length_schema.insert(
        "minimum".into(),
        Value::Number((*SUMMARY_LENGTH_RANGE.start()).into()),
    );
    length_schema.insert(
        "maximum".into(),
        Value::Number((*SUMMARY_LENGTH_RANGE.end()).into()),
    );
    length_schema.insert("default".into(), Value::Number(DEFAULT_SUMMARY_LENGTH.into()));
    properties.insert("maxSummaryLength".into(), Value::Object(length_schema));

    properties.insert(
        "enableOcr".into(),
        bool_schema("Recognize scanned pages when the text layer is sparse (alias: enableOCR)", true),
    );
    properties.insert(
        "ocrLanguage".into(),
        enum_schema(
            "Recognizer language",
            &["chi_sim", "eng", "chi_sim+eng"],
            "chi_sim",
        ),
    );

    let mut schema = Map::new();
    schema.insert("type".into(), Value::String("object".into()));
    schema.insert("properties".into(), Value::Object(properties));
    schema.insert(
        "required".into(),
        Value::Array(
            ["documentPath", "role", "goal"]
                .into_iter()
                .map(|key| Value::String(key.into()))
                .collect(),
        ),
    );
    schema
}

/// Schema representing an empty object (used for parameterless tools).
pub(crate) fn empty_object_schema() -> Map<String, Value> {
    let mut schema = Map::new();
    schema.insert("type".into(), Value::String("object".into()));
    schema.insert("properties".into(), Value::Object(Map::new()));
    schema.insert("additionalProperties".into(), Value::Bool(false));
    schema
}

fn string_schema(description: &str) -> Value {
    let mut schema = Map::new();
    schema.insert("type".into(), Value::String("string".into()));
    schema.insert("description".into(), Value::String(description.into()));
    Value::Object(schema)
}

fn bool_schema(description: &str, default: bool) -> Value {
    let mut schema = Map::new();
    schema.insert("type".into(), Value::String("boolean".into()));
    schema.insert("description".into(), Value::String(description.into()));
    schema.insert("default".into(), Value::Bool(default));
    Value::Object(schema)
}

fn enum_schema(description: &str, variants: &[&str], default: &str) -> Value {
    let mut schema = Map::new();
    schema.insert("type".into(), Value::String("string".into()));
    schema.insert("description".into(), Value::String(description.into()));
    schema.insert(
        "enum".into(),
        Value::Array(
            variants
                .iter()
                .map(|variant| Value::String((*variant).into()))
                .collect(),
        ),
    );
    schema.insert("default".into(), Value::String(default.into()));
    Value::Object(schema)
}
