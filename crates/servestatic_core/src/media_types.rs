use std::collections::BTreeMap;

pub const DEFAULT_MEDIA_TYPE: &str = "application/octet-stream";

/// Extension-based content-type lookup.
///
/// Built once and shared read-only; explicit overrides win over the
/// `mime_guess` registry.
#[derive(Debug, Clone, Default)]
pub struct MediaTypes {
    overrides: BTreeMap<String, String>,
}

impl MediaTypes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_override(mut self, extension: &str, media_type: impl Into<String>) -> Self {
        self.overrides.insert(
            extension.trim_start_matches('.').to_ascii_lowercase(),
            media_type.into(),
        );
        self
    }

    pub fn content_type_for(&self, entry_name: &str) -> String {
        let file_name = entry_name.rsplit('/').next().unwrap_or(entry_name);
        let extension = file_name
            .rsplit_once('.')
            .map(|(_, extension)| extension.to_ascii_lowercase());

        if let Some(media_type) = extension
            .as_deref()
            .and_then(|extension| self.overrides.get(extension))
        {
            return media_type.clone();
        }

        mime_guess::from_path(file_name)
            .first_raw()
            .unwrap_or(DEFAULT_MEDIA_TYPE)
            .to_string()
    }
}
