use astro_contracts::catalog::Catalog;
use astro_contracts::diagnostics::{Diagnostic, DiagnosticSink, DiagnosticSource};

use crate::transport::{truncate_text, ServiceTransport};

pub const MODELS_PATH: &str = "/models";
pub const PRESETS_PATH: &str = "/presets";

const MAX_PAYLOAD_DETAIL_CHARS: usize = 256;

pub struct CatalogClient<'t> {
    transport: &'t dyn ServiceTransport,
}

impl<'t> CatalogClient<'t> {
    pub fn new(transport: &'t dyn ServiceTransport) -> Self {
        Self { transport }
    }

    /// Model names from the service, or empty after reporting why.
    pub fn fetch_models(&self, sink: &dyn DiagnosticSink) -> Vec<String> {
        self.fetch_list(MODELS_PATH, DiagnosticSource::Models, sink)
    }

    /// Preset names from the service, or empty after reporting why.
    pub fn fetch_presets(&self, sink: &dyn DiagnosticSink) -> Vec<String> {
        self.fetch_list(PRESETS_PATH, DiagnosticSource::Presets, sink)
    }

    /// Fetches both lists and substitutes built-ins for any that came back empty.
    pub fn load_catalog(&self, sink: &dyn DiagnosticSink) -> Catalog {
        let models = self.fetch_models(sink);
        let presets = self.fetch_presets(sink);
        Catalog::resolve(models, presets)
    }

    fn fetch_list(
        &self,
        path: &str,
        source: DiagnosticSource,
        sink: &dyn DiagnosticSink,
    ) -> Vec<String> {
        let label = source.as_str();
        let reply = match self.transport.get(path) {
            Ok(reply) => reply,
            Err(err) => {
                sink.report(&Diagnostic::new(
                    source,
                    format!("Error connecting to API: {err}"),
                ));
                return Vec::new();
            }
        };

        if !reply.is_success() {
            sink.report(&Diagnostic::new(
                source,
                format!("Error fetching {label}: {}", reply.body),
            ));
            return Vec::new();
        }

        match serde_json::from_str::<Vec<String>>(&reply.body) {
            Ok(items) => items,
            Err(err) => {
                sink.report(&Diagnostic::new(
                    source,
                    format!(
                        "Error fetching {label}: invalid catalog payload ({err}): {}",
                        truncate_text(&reply.body, MAX_PAYLOAD_DETAIL_CHARS)
                    ),
                ));
                Vec::new()
            }
        }
    }
}
