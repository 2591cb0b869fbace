//! # Conversion Options
//!
//! Every knob of a batch lives in one value that is passed into
//! [`process_all_schemas`](crate::process_all_schemas) and threaded through
//! linking and conversion. There is no global state, so two batches with
//! different options never observe each other.
//!
//! The struct deserializes from YAML or JSON with every field optional:
//!
//! ```yaml
//! additional_properties: open
//! resolution: lenient
//! ```

use serde::{Deserialize, Serialize};

/// Policy for properties an XSD content model does not declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdditionalProperties {
    /// Emit `additionalProperties: false` on every object shape, so unknown
    /// members (a misspelled element name) fail validation.
    #[default]
    Closed,
    /// Leave object shapes open.
    Open,
}

/// How references that do not resolve by namespace are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMode {
    /// Unresolved references abort the batch.
    #[default]
    Strict,
    /// Fall back to the unique declaration with the same local name among
    /// the referencing document's own and imported namespaces, recording a
    /// diagnostic. Real-world schema sets often rely on this.
    Lenient,
}

/// Options of one conversion batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConversionOptions {
    /// Open or closed object shapes.
    pub additional_properties: AdditionalProperties,
    /// Strict or lenient reference resolution.
    pub resolution: ResolutionMode,
    /// Name qualified elements and attributes `prefix:local`.
    pub qualified_property_names: bool,
    /// Property that carries the text of `simpleContent` types.
    pub text_property: String,
    /// Extension of output identifiers (`BaseTypes.xsd` → `BaseTypes.json`).
    pub output_extension: String,
    /// Parse and convert documents on scoped worker threads.
    pub parallel: bool,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            additional_properties: AdditionalProperties::Closed,
            resolution: ResolutionMode::Strict,
            qualified_property_names: false,
            text_property: "#text".to_string(),
            output_extension: "json".to_string(),
            parallel: true,
        }
    }
}

impl ConversionOptions {
    /// Options with lenient resolution, everything else default.
    pub fn lenient() -> Self {
        Self {
            resolution: ResolutionMode::Lenient,
            ..Self::default()
        }
    }

    /// The output identifier for an input filename.
    ///
    /// The last extension is replaced; a name without an extension gains one.
    pub fn output_identifier(&self, filename: &str) -> String {
        let base = filename.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(filename);
        let stem = match base.rfind('.') {
            Some(dot) if dot > 0 => &base[..dot],
            _ => base,
        };
        format!("{stem}.{}", self.output_extension)
    }

    pub(crate) fn closed(&self) -> bool {
        self.additional_properties == AdditionalProperties::Closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = ConversionOptions::default();
        assert_eq!(opts.additional_properties, AdditionalProperties::Closed);
        assert_eq!(opts.resolution, ResolutionMode::Strict);
        assert_eq!(opts.text_property, "#text");
        assert!(opts.parallel);
    }

    #[test]
    fn test_output_identifier() {
        let opts = ConversionOptions::default();
        assert_eq!(opts.output_identifier("BaseTypes.xsd"), "BaseTypes.json");
        assert_eq!(opts.output_identifier("dir/Example.Types.xsd"), "Example.Types.json");
        assert_eq!(opts.output_identifier("noext"), "noext.json");
        assert_eq!(opts.output_identifier(".hidden"), ".hidden.json");
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let opts: ConversionOptions =
            serde_yaml::from_str("additional_properties: open\nresolution: lenient\n").unwrap();
        assert_eq!(opts.additional_properties, AdditionalProperties::Open);
        assert_eq!(opts.resolution, ResolutionMode::Lenient);
        assert_eq!(opts.output_extension, "json");
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: Result<ConversionOptions, _> = serde_yaml::from_str("closed: true\n");
        assert!(result.is_err());
    }
}
