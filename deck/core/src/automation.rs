//! Automation task composer
//!
//! Builds the prompt for a "generate an API test framework" task from an
//! OpenAPI document. The user picks an automation type, up to two endpoints
//! and a target language; the result is sent upstream as a new task.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Most endpoints a single automation task may cover
pub const MAX_SELECTED_ENDPOINTS: usize = 2;

/// What kind of tests to generate
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutomationType {
    /// HTTP API tests
    Api,
    /// Browser UI tests (not offered yet)
    Ui,
}

impl AutomationType {
    /// Name used in the prompt
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Api => "api",
            Self::Ui => "ui",
        }
    }

    /// Only API automation can be started today
    #[must_use]
    pub fn is_available(self) -> bool {
        matches!(self, Self::Api)
    }
}

/// Language of the generated framework
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetLanguage {
    /// Python
    Python,
    /// Java
    Java,
    /// JavaScript (ES6)
    Javascript,
}

impl TargetLanguage {
    /// Name used in the prompt
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::Java => "java",
            Self::Javascript => "javascript",
        }
    }
}

/// List every operation in an OpenAPI document as `"METHOD /path"`
///
/// Anything that is not a JSON object with a `paths` object yields an empty
/// list.
#[must_use]
pub fn extract_endpoints(document: &str) -> Vec<String> {
    let value: Value = match serde_json::from_str(document) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(error = %err, "could not parse OpenAPI document");
            return Vec::new();
        }
    };
    let Some(paths) = value.get("paths").and_then(Value::as_object) else {
        tracing::warn!("OpenAPI document has no paths object");
        return Vec::new();
    };
    paths
        .iter()
        .filter_map(|(path, item)| item.as_object().map(|ops| (path, ops)))
        .flat_map(|(path, ops)| {
            ops.keys()
                .map(move |method| format!("{} {path}", method.to_uppercase()))
        })
        .collect()
}

/// Selections made in the automation setup panel
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AutomationSetup {
    automation_type: Option<AutomationType>,
    endpoints: Vec<String>,
    selected: Vec<String>,
    language: Option<TargetLanguage>,
}

impl AutomationSetup {
    /// Start an empty setup
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Choose the automation type; unavailable types are ignored
    pub fn set_type(&mut self, automation_type: AutomationType) {
        if automation_type.is_available() {
            self.automation_type = Some(automation_type);
        }
    }

    /// Load an OpenAPI document, replacing endpoints and selection
    pub fn load_document(&mut self, document: &str) -> usize {
        self.endpoints = extract_endpoints(document);
        self.selected.clear();
        self.endpoints.len()
    }

    /// Flip an endpoint's selection
    ///
    /// Selecting beyond [`MAX_SELECTED_ENDPOINTS`] or an unknown endpoint does
    /// nothing. Returns whether the endpoint is selected afterwards.
    pub fn toggle_endpoint(&mut self, endpoint: &str) -> bool {
        if let Some(pos) = self.selected.iter().position(|e| e == endpoint) {
            self.selected.remove(pos);
            return false;
        }
        if self.selected.len() < MAX_SELECTED_ENDPOINTS && self.endpoints.iter().any(|e| e == endpoint)
        {
            self.selected.push(endpoint.to_string());
            return true;
        }
        false
    }

    /// Choose the target language
    pub fn set_language(&mut self, language: TargetLanguage) {
        self.language = Some(language);
    }

    /// Endpoints found in the loaded document
    #[must_use]
    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// Endpoints chosen so far, in selection order
    #[must_use]
    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    /// Whether an unselected endpoint can still be picked
    #[must_use]
    pub fn can_select_more(&self) -> bool {
        self.selected.len() < MAX_SELECTED_ENDPOINTS
    }

    /// The task prompt, once type, endpoints and language are all chosen
    #[must_use]
    pub fn prompt(&self) -> Option<String> {
        let automation_type = self.automation_type?;
        let language = self.language?;
        if self.selected.is_empty() {
            return None;
        }
        Some(format!(
            "Create an API automation framework for {} using {}. Endpoints: {}",
            automation_type.as_str(),
            language.as_str(),
            self.selected.join(", ")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PETSTORE: &str = r#"{
        "openapi": "3.0.0",
        "paths": {
            "/pets": {"get": {}, "post": {}},
            "/pets/{id}": {"delete": {}}
        }
    }"#;

    #[test]
    fn test_extract_endpoints() {
        let mut endpoints = extract_endpoints(PETSTORE);
        endpoints.sort();
        assert_eq!(
            endpoints,
            vec!["DELETE /pets/{id}", "GET /pets", "POST /pets"]
        );
    }

    #[test]
    fn test_extract_from_garbage() {
        assert!(extract_endpoints("not json").is_empty());
        assert!(extract_endpoints(r#"{"openapi":"3.0.0"}"#).is_empty());
    }

    #[test]
    fn test_two_endpoint_limit() {
        let mut setup = AutomationSetup::new();
        assert_eq!(setup.load_document(PETSTORE), 3);
        assert!(setup.toggle_endpoint("GET /pets"));
        assert!(setup.toggle_endpoint("POST /pets"));
        assert!(!setup.can_select_more());
        assert!(!setup.toggle_endpoint("DELETE /pets/{id}"));
        assert_eq!(setup.selected(), &["GET /pets", "POST /pets"]);

        assert!(!setup.toggle_endpoint("GET /pets"));
        assert!(setup.toggle_endpoint("DELETE /pets/{id}"));
    }

    #[test]
    fn test_unknown_endpoint_not_selectable() {
        let mut setup = AutomationSetup::new();
        setup.load_document(PETSTORE);
        assert!(!setup.toggle_endpoint("PUT /nowhere"));
        assert!(setup.selected().is_empty());
    }

    #[test]
    fn test_prompt() {
        let mut setup = AutomationSetup::new();
        setup.set_type(AutomationType::Api);
        setup.load_document(PETSTORE);
        assert_eq!(setup.prompt(), None);
        setup.toggle_endpoint("GET /pets");
        setup.toggle_endpoint("POST /pets");
        assert_eq!(setup.prompt(), None);
        setup.set_language(TargetLanguage::Python);
        assert_eq!(
            setup.prompt().as_deref(),
            Some("Create an API automation framework for api using python. Endpoints: GET /pets, POST /pets")
        );
    }

    #[test]
    fn test_ui_type_unavailable() {
        let mut setup = AutomationSetup::new();
        setup.set_type(AutomationType::Ui);
        setup.load_document(PETSTORE);
        setup.toggle_endpoint("GET /pets");
        setup.set_language(TargetLanguage::Java);
        assert_eq!(setup.prompt(), None);
    }
}
