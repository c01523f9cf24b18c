use std::path::{Component, Path, PathBuf};

use thiserror::Error;

use crate::{archive_base_name, Attachment};

/// Appended to the archive base name to form the photos root directory.
pub const PHOTOS_DIR_SUFFIX: &str = " - Photos";

/// `<destination>/<archiveBaseName> - Photos`, or `None` if the archive path has no file name.
pub fn photos_root(destination: &Path, archive_path: &Path) -> Option<PathBuf> {
    archive_base_name(archive_path).map(|base| destination.join(format!("{base}{PHOTOS_DIR_SUFFIX}")))
}

/// Why an otherwise eligible attachment is left out of the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttachmentSkip {
    #[error("attachment {url} has no file name")]
    MissingName { url: String },
    #[error("attachment {url} has unusable file name {name:?}")]
    UnsafeName { url: String, name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTarget {
    pub channel: String,
    pub url: String,
    pub mimetype: String,
    pub file_name: String,
    /// `<photos root>/<channel>`
    pub channel_dir: PathBuf,
}

impl DownloadTarget {
    pub fn new(
        photos_root: &Path,
        channel: &str,
        attachment: Attachment,
    ) -> Result<Self, AttachmentSkip> {
        let Attachment {
            name,
            url,
            mimetype,
        } = attachment;
        let Some(name) = name.filter(|name| !name.trim().is_empty()) else {
            return Err(AttachmentSkip::MissingName { url });
        };
        if !is_plain_file_name(&name) {
            return Err(AttachmentSkip::UnsafeName { url, name });
        }
        Ok(Self {
            channel: channel.to_string(),
            url,
            mimetype,
            file_name: name,
            channel_dir: photos_root.join(channel),
        })
    }

    pub fn path(&self) -> PathBuf {
        self.channel_dir.join(&self.file_name)
    }
}

/// A single normal path component, so the file cannot land outside its channel directory.
fn is_plain_file_name(name: &str) -> bool {
    if name.contains(['/', '\\']) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
