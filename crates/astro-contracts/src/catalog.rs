use serde::Serialize;

/// Models offered when the service catalog cannot be fetched.
pub const BUILTIN_MODELS: &[&str] = &[
    "Stable Diffusion Upscaler (4x)",
    "ESRGAN Plus (4x)",
    "SwinIR (4x)",
    "Codeformer (Face Enhancement)",
    "Real-ESRGAN (4x)",
];

/// Presets offered when the service catalog cannot be fetched.
pub const BUILTIN_PRESETS: &[&str] = &[
    "General Astronomy",
    "Galaxy",
    "Nebula",
    "Planet",
    "Star Cluster",
    "Solar Surface",
    "Black Hole",
    "Deep Field",
    "Scientific Accuracy",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogSource {
    Remote,
    Builtin,
}

impl CatalogSource {
    pub fn as_str(self) -> &'static str {
        match self {
            CatalogSource::Remote => "remote",
            CatalogSource::Builtin => "builtin",
        }
    }
}

/// Selectable model and preset names for one session load.
///
/// Each list is either exactly what the service returned or exactly the
/// built-in constant list. The two are never merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Catalog {
    models: Vec<String>,
    presets: Vec<String>,
    models_source: CatalogSource,
    presets_source: CatalogSource,
}

impl Catalog {
    pub fn builtin() -> Self {
        Self::resolve(Vec::new(), Vec::new())
    }

    /// Applies the fallback policy to freshly fetched lists.
    pub fn resolve(fetched_models: Vec<String>, fetched_presets: Vec<String>) -> Self {
        let (models, models_source) = resolve_list(fetched_models, BUILTIN_MODELS);
        let (presets, presets_source) = resolve_list(fetched_presets, BUILTIN_PRESETS);
        Self {
            models,
            presets,
            models_source,
            presets_source,
        }
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn presets(&self) -> &[String] {
        &self.presets
    }

    pub fn models_source(&self) -> CatalogSource {
        self.models_source
    }

    pub fn presets_source(&self) -> CatalogSource {
        self.presets_source
    }

    pub fn default_model(&self) -> Option<&str> {
        self.models.first().map(String::as_str)
    }

    pub fn default_preset(&self) -> Option<&str> {
        self.presets.first().map(String::as_str)
    }

    pub fn has_model(&self, name: &str) -> bool {
        self.models.iter().any(|item| item == name)
    }

    pub fn has_preset(&self, name: &str) -> bool {
        self.presets.iter().any(|item| item == name)
    }
}

fn resolve_list(fetched: Vec<String>, builtin: &[&str]) -> (Vec<String>, CatalogSource) {
    if fetched.is_empty() {
        return (
            builtin.iter().map(|item| (*item).to_string()).collect(),
            CatalogSource::Builtin,
        );
    }
    (fetched, CatalogSource::Remote)
}
