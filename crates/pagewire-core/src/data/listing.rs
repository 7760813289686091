// ── Static file listing source ──

use std::path::Path;

use futures_util::FutureExt;
use futures_util::future::{self, BoxFuture};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use url::Url;

use super::source::DataSource;
use super::state::LoadError;
use crate::model::Row;
use crate::model::row::keys;

/// Media category derived from a file extension.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Video,
    Image,
    Audio,
    Text,
}

const VIDEO: &[&str] = &["mp4", "m4v", "mov", "mkv", "webm", "avi", "3gp"];
const IMAGE: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp", "heic", "svg"];
const AUDIO: &[&str] = &["mp3", "wav", "ogg", "m4a", "aac", "flac", "opus"];

impl FileKind {
    /// Classify by extension, case-insensitively. Unknown or missing
    /// extensions are `Text`.
    pub fn classify(name: &str) -> Self {
        let Some(ext) = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
        else {
            return Self::Text;
        };

        if VIDEO.contains(&ext.as_str()) {
            Self::Video
        } else if IMAGE.contains(&ext.as_str()) {
            Self::Image
        } else if AUDIO.contains(&ext.as_str()) {
            Self::Audio
        } else {
            Self::Text
        }
    }
}

/// In-memory list of file names exposed as typed rows.
#[derive(Debug, Clone, Default)]
pub struct StaticListingSource {
    files: Vec<String>,
    base_url: Option<Url>,
}

impl StaticListingSource {
    pub fn new<I, S>(files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            files: files.into_iter().map(Into::into).collect(),
            base_url: None,
        }
    }

    /// Resolve each file against `base` to fill the `url` key (and `thumb`
    /// for images).
    pub fn with_base_url(mut self, base: Url) -> Self {
        self.base_url = Some(base);
        self
    }

    pub fn rows(&self) -> Vec<Row> {
        self.files.iter().map(|name| self.row_for(name)).collect()
    }

    fn row_for(&self, name: &str) -> Row {
        let kind = FileKind::classify(name);
        let mut row = Row::new()
            .with(keys::LABEL, name)
            .with(keys::VALUE, name)
            .with(keys::TYPE, kind.as_ref());

        if let Some(base) = &self.base_url {
            let url = base.join(name).ok().map(String::from);
            if kind == FileKind::Image {
                row.insert(keys::THUMB, url.clone());
            }
            row.insert(keys::URL, url);
        }
        row
    }
}

impl DataSource for StaticListingSource {
    fn load(&self) -> BoxFuture<'_, Result<Vec<Row>, LoadError>> {
        future::ready(Ok(self.rows())).boxed()
    }
}
