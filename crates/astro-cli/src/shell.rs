use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use astro_contracts::catalog::Catalog;
use astro_contracts::diagnostics::{ConsoleSink, Diagnostic, DiagnosticSink, DiagnosticSource, Fanout};
use astro_contracts::events::{EventWriter, SessionEvent};
use astro_contracts::request::{
    normalize_custom_prompt, EnhancementInputs, EnhancementRequest, DEFAULT_NOISE_LEVEL,
    NOISE_LEVEL_MAX, NOISE_LEVEL_MIN,
};
use astro_contracts::result::DecodedImage;
use astro_contracts::session::{Session, SessionSnapshot};
use astro_contracts::summary::{write_summary, SessionSummary};
use astro_engine::images::{probe_image, write_comparison, write_download};
use astro_engine::{CatalogClient, EnhanceClient, ServiceTransport};
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};

use crate::render::{render_preview_html, Theme};

pub const ACCEPTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];
pub const PREVIEW_FILE_NAME: &str = "preview.html";
pub const SUMMARY_FILE_NAME: &str = "summary.json";

/// An image file the user picked for enhancement.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub path: PathBuf,
    pub file_name: String,
    pub image: DecodedImage,
}

impl UploadedImage {
    pub fn load(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if !ACCEPTED_EXTENSIONS.contains(&extension.as_str()) {
            bail!(
                "unsupported image type for {} (expected png, jpg or jpeg)",
                path.display()
            );
        }
        let bytes = fs::read(path).with_context(|| format!("failed reading {}", path.display()))?;
        let image = probe_image(bytes)
            .with_context(|| format!("{} is not a readable image", path.display()))?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
            .to_string();
        Ok(Self {
            path: path.to_path_buf(),
            file_name,
            image,
        })
    }
}

/// Form state behind the settings controls.
#[derive(Debug, Clone, PartialEq)]
pub struct EnhancementSettings {
    pub model_name: String,
    pub preset: String,
    pub custom_prompt: Option<String>,
    pub noise_level: f64,
    pub scientific_mode: bool,
}

impl EnhancementSettings {
    pub fn for_catalog(catalog: &Catalog) -> Self {
        Self {
            model_name: catalog.default_model().unwrap_or_default().to_string(),
            preset: catalog.default_preset().unwrap_or_default().to_string(),
            custom_prompt: None,
            noise_level: DEFAULT_NOISE_LEVEL,
            scientific_mode: false,
        }
    }

    pub fn to_inputs(&self, upload: &UploadedImage) -> EnhancementInputs {
        EnhancementInputs {
            image: upload.image.bytes.clone(),
            filename: upload.file_name.clone(),
            model_name: self.model_name.clone(),
            preset: self.preset.clone(),
            custom_prompt: self.custom_prompt.clone(),
            noise_level: self.noise_level,
            scientific_mode: self.scientific_mode,
        }
    }
}

/// Everything one user session owns: catalog, form state, upload and the
/// session store. Created once and threaded through every render pass.
pub struct SessionContext {
    pub session_id: String,
    pub theme: Theme,
    pub catalog: Catalog,
    pub settings: EnhancementSettings,
    pub upload: Option<UploadedImage>,
    pub session: Session,
    events: Option<EventWriter>,
    started_at: String,
    submissions: u64,
    completed: u64,
    failed: u64,
    downloads: Vec<String>,
}

impl SessionContext {
    /// Loads the catalog once; fetch failures degrade to built-in lists.
    pub fn start(
        transport: &dyn ServiceTransport,
        theme: Theme,
        events: Option<EventWriter>,
        session_id: String,
    ) -> Self {
        let sink = Fanout(ConsoleSink, events.clone());
        let catalog = CatalogClient::new(transport).load_catalog(&sink);
        let settings = EnhancementSettings::for_catalog(&catalog);
        let context = Self {
            session_id,
            theme,
            catalog,
            settings,
            upload: None,
            session: Session::new(),
            events,
            started_at: now_utc_iso(),
            submissions: 0,
            completed: 0,
            failed: 0,
            downloads: Vec::new(),
        };
        context.emit(SessionEvent::catalog_loaded(transport.name(), &context.catalog));
        context
    }

    pub fn sink(&self) -> Fanout<ConsoleSink, Option<EventWriter>> {
        Fanout(ConsoleSink, self.events.clone())
    }

    pub fn current(&self) -> Option<&SessionSnapshot> {
        self.session.current()
    }

    pub fn select_image(&mut self, path: &Path) -> Result<&UploadedImage> {
        let upload = UploadedImage::load(path)?;
        self.emit(SessionEvent::ImageSelected {
            path: upload.path.display().to_string(),
            width: upload.image.width,
            height: upload.image.height,
            mime_type: upload.image.mime_type.clone(),
        });
        Ok(self.upload.insert(upload))
    }

    /// Accepts a catalog name or a 1-based position in the list.
    pub fn select_model(&mut self, raw: &str) -> Result<&str> {
        let name = if self.catalog.has_model(raw.trim()) {
            raw.trim().to_string()
        } else {
            pick_from_list(self.catalog.models(), raw, "model")?
        };
        self.settings.model_name = name;
        Ok(&self.settings.model_name)
    }

    pub fn select_preset(&mut self, raw: &str) -> Result<&str> {
        let name = if self.catalog.has_preset(raw.trim()) {
            raw.trim().to_string()
        } else {
            pick_from_list(self.catalog.presets(), raw, "preset")?
        };
        self.settings.preset = name;
        Ok(&self.settings.preset)
    }

    pub fn set_custom_prompt(&mut self, prompt: Option<String>) {
        self.settings.custom_prompt = normalize_custom_prompt(prompt);
    }

    pub fn set_noise_level(&mut self, value: f64) -> Result<()> {
        if !value.is_finite() || !(NOISE_LEVEL_MIN..=NOISE_LEVEL_MAX).contains(&value) {
            bail!("noise level must be between {NOISE_LEVEL_MIN:.1} and {NOISE_LEVEL_MAX:.1}");
        }
        self.settings.noise_level = value;
        Ok(())
    }

    pub fn set_scientific_mode(&mut self, enabled: bool) {
        self.settings.scientific_mode = enabled;
    }

    /// Submits the current settings. Returns whether the session now holds a
    /// fresh result; failures have already been reported as diagnostics.
    pub fn submit(&mut self, transport: &dyn ServiceTransport) -> bool {
        let sink = self.sink();
        let Some(upload) = self.upload.as_ref() else {
            sink.report(&Diagnostic::new(
                DiagnosticSource::Session,
                "Please upload an image to enhance",
            ));
            return false;
        };
        let request = match EnhancementRequest::new(self.settings.to_inputs(upload)) {
            Ok(request) => request,
            Err(err) => {
                sink.report(&Diagnostic::new(
                    DiagnosticSource::Enhance,
                    format!("Invalid enhancement request: {err}"),
                ));
                return false;
            }
        };

        self.submissions += 1;
        self.emit(SessionEvent::EnhanceStarted {
            file_name: request.filename().to_string(),
            model_name: request.model_name().to_string(),
            preset: request.preset().to_string(),
            custom_prompt: request.custom_prompt().map(str::to_string),
            noise_level: request.noise_level(),
            scientific_mode: request.scientific_mode(),
        });

        let outcome = EnhanceClient::new(transport)
            .submit(&mut self.session, &request, &sink)
            .map(completed_event);
        match outcome {
            Ok(event) => {
                self.completed += 1;
                self.emit(event);
                true
            }
            Err(err) => {
                self.failed += 1;
                self.emit(SessionEvent::EnhanceFailed {
                    error: err.to_string(),
                });
                false
            }
        }
    }

    /// Writes the enhanced image as a timestamped PNG, if there is one.
    pub fn download(&mut self, dir: &Path) -> Result<Option<PathBuf>> {
        let Some(snapshot) = self.session.current() else {
            return Ok(None);
        };
        let path = write_download(dir, snapshot)?;
        self.downloads.push(path.display().to_string());
        self.emit(SessionEvent::DownloadWritten {
            path: path.display().to_string(),
        });
        Ok(Some(path))
    }

    pub fn write_comparison(&self, dir: &Path) -> Result<Option<(PathBuf, PathBuf)>> {
        let Some(snapshot) = self.session.current() else {
            return Ok(None);
        };
        write_comparison(dir, snapshot).map(Some)
    }

    pub fn write_preview(&self, path: &Path) -> Result<PathBuf> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(path, render_preview_html(self))
            .with_context(|| format!("failed to write {}", path.display()))?;
        self.emit(SessionEvent::PreviewWritten {
            path: path.display().to_string(),
        });
        Ok(path.to_path_buf())
    }

    /// Writes `summary.json` and closes the event log.
    pub fn finish(&self, out_dir: &Path) -> Result<PathBuf> {
        let summary = SessionSummary {
            session_id: self.session_id.clone(),
            started_at: self.started_at.clone(),
            finished_at: now_utc_iso(),
            submissions: self.submissions,
            completed: self.completed,
            failed: self.failed,
            last_prompt_used: self
                .session
                .current()
                .map(|snapshot| snapshot.result.prompt_used.clone()),
            downloads: self.downloads.clone(),
        };
        let mut extra = Map::new();
        extra.insert(
            "theme".to_string(),
            Value::String(self.theme.as_str().to_string()),
        );
        let path = out_dir.join(SUMMARY_FILE_NAME);
        write_summary(&path, &summary, Some(&extra))?;
        self.emit(SessionEvent::SessionFinished {
            submissions: self.submissions,
            completed: self.completed,
            failed: self.failed,
        });
        Ok(path)
    }

    fn emit(&self, event: SessionEvent) {
        let Some(events) = &self.events else {
            return;
        };
        if let Err(err) = events.emit(&event) {
            eprintln!("failed to record {} event: {err:#}", event.kind());
        }
    }
}

fn completed_event(snapshot: &SessionSnapshot) -> SessionEvent {
    let enhanced = &snapshot.result.enhanced_image;
    SessionEvent::EnhanceCompleted {
        completed_at: snapshot.completed_at_label(),
        prompt_used: snapshot.result.prompt_used.clone(),
        enhanced_width: enhanced.width,
        enhanced_height: enhanced.height,
        enhanced_mime_type: enhanced.mime_type.clone(),
    }
}

fn pick_from_list(items: &[String], raw: &str, kind: &str) -> Result<String> {
    let wanted = raw.trim();
    if wanted.is_empty() {
        bail!("/{kind} requires a name or number");
    }
    if let Some(found) = items
        .iter()
        .find(|item| item.eq_ignore_ascii_case(wanted))
    {
        return Ok(found.clone());
    }
    if let Ok(position) = wanted.parse::<usize>() {
        if let Some(found) = position.checked_sub(1).and_then(|idx| items.get(idx)) {
            return Ok(found.clone());
        }
    }
    bail!("unknown {kind} '{wanted}'")
}

fn now_utc_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}
