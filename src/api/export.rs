//! Export operations for the API
//!
//! Takes a score serialized as JSON plus an optional YAML export
//! configuration and returns the MusicXML text.

use thiserror::Error;
use wasm_bindgen::prelude::*;

use crate::config::{ConfigError, ExportConfig};
use crate::models::Score;
use crate::renderers::musicxml::{to_musicxml, ExportError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("score JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("MusicXML export error: {0}")]
    Export(#[from] ExportError),
}

/// Export a JSON score to MusicXML
///
/// # Arguments
/// * `score_json` - The `Score` object graph as JSON
/// * `config_yaml` - Optional export configuration; defaults fill anything left out
pub fn export_score_json(score_json: &str, config_yaml: Option<&str>) -> Result<String, ApiError> {
    let score: Score = serde_json::from_str(score_json)?;
    let config = match config_yaml {
        Some(text) if !text.trim().is_empty() => ExportConfig::from_yaml_str(text)?,
        _ => ExportConfig::default(),
    };

    log::info!("exportScoreJson: {} parts", score.parts.len());
    let musicxml = to_musicxml(&score, &config)?;
    log::info!("exportScoreJson: MusicXML generated, {} bytes", musicxml.len());
    Ok(musicxml)
}

/// Export a JSON score to MusicXML (JavaScript entry point)
#[wasm_bindgen(js_name = exportScoreJson)]
pub fn export_score_json_js(score_json: &str, config_yaml: Option<String>) -> Result<String, JsValue> {
    export_score_json(score_json, config_yaml.as_deref()).map_err(|e| {
        log::error!("exportScoreJson failed: {}", e);
        JsValue::from_str(&e.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_minimal_score() {
        let json = r#"{
            "parts": [{
                "name": "Flute",
                "measures": [{
                    "id": 1,
                    "number": 1,
                    "elements": [
                        {"id": 2, "type": "time_signature", "beats": 3, "beat_type": 4},
                        {"id": 3, "type": "note", "pitch": {"step": "A", "octave": 4},
                         "duration": {"quarter_length": 3}}
                    ]
                }]
            }]
        }"#;
        let xml = export_score_json(json, None).unwrap();
        assert!(xml.contains("<part-name>Flute</part-name>"));
        assert!(xml.contains("<beats>3</beats>"));
        assert!(xml.contains("<type>half</type>"));
        assert!(xml.contains("<dot/>"));
    }

    #[test]
    fn test_bad_json_is_reported() {
        let err = export_score_json("{ not json", None).unwrap_err();
        assert!(matches!(err, ApiError::Json(_)));
    }

    #[test]
    fn test_oversized_decimal_offset_is_a_json_error() {
        let json = r#"{"parts": [{"measures": [{"id": 1, "number": 1, "elements": [
            {"id": 2, "offset": "10000000.000000000001", "type": "segno"}
        ]}]}]}"#;
        let err = export_score_json(json, None).unwrap_err();
        assert!(matches!(err, ApiError::Json(_)));
    }

    #[test]
    fn test_zero_tuplet_side_is_an_export_error() {
        let json = r#"{"parts": [{"measures": [{"id": 1, "number": 1, "elements": [
            {"id": 2, "type": "rest", "duration": {"quarter_length": "1/3",
             "tuplets": [{"actual": 3, "normal": 0}]}}
        ]}]}]}"#;
        let err = export_score_json(json, None).unwrap_err();
        assert!(matches!(err, ApiError::Export(_)));
    }

    #[test]
    fn test_config_override() {
        let config = "export:\n  placeholder_title: Sketch\n";
        let xml = export_score_json("{}", Some(config)).unwrap();
        assert!(xml.contains("<movement-title>Sketch</movement-title>"));
    }
}
