use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;
use walkdir::WalkDir;

/// Channel name given to message logs sitting directly in the extraction root.
pub const NO_CHANNEL: &str = "no_channel";

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid JSON in {path}: {source}")]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{path} is not a JSON array of messages")]
    NotAnArray { path: PathBuf },
    #[error("cannot walk export tree: {0}")]
    Walk(#[from] walkdir::Error),
}

impl ParseError {
    /// The file (or directory) the error refers to, when known.
    pub fn path(&self) -> Option<&Path> {
        match self {
            ParseError::Io { path, .. }
            | ParseError::InvalidJson { path, .. }
            | ParseError::NotAnArray { path } => Some(path),
            ParseError::Walk(err) => err.path(),
        }
    }
}

/// One record from a channel log. Only the fields the filter reads are interpreted.
#[derive(Debug, Clone, PartialEq)]
pub struct Message(Value);

impl Message {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// The `files` array, when present and actually an array.
    pub fn files(&self) -> Option<&[Value]> {
        self.0.get("files")?.as_array().map(Vec::as_slice)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelLog {
    pub channel: String,
    pub path: PathBuf,
    pub messages: Vec<Message>,
}

/// Channel owning `path`: the name of its parent directory relative to `root`,
/// or [`NO_CHANNEL`] for files directly in `root`.
pub fn channel_name(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .parent()
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| NO_CHANNEL.to_string())
}

/// Lazily walks `root` and yields one parsed [`ChannelLog`] per `.json` file.
pub fn scan_export(root: &Path) -> ExportScan {
    ExportScan {
        root: root.to_path_buf(),
        walker: WalkDir::new(root).sort_by_file_name().into_iter(),
    }
}

/// Single-pass iterator returned by [`scan_export`].
///
/// A file that fails to parse yields an `Err` for that file only; iteration
/// continues with the next file.
pub struct ExportScan {
    root: PathBuf,
    walker: walkdir::IntoIter,
}

impl Iterator for ExportScan {
    type Item = Result<ChannelLog, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(err) => return Some(Err(ParseError::Walk(err))),
            };
            if !entry.file_type().is_file() || !is_json(entry.path()) {
                continue;
            }
            let path = entry.into_path();
            let channel = channel_name(&self.root, &path);
            return Some(parse_messages(&path).map(|messages| ChannelLog {
                channel,
                path,
                messages,
            }));
        }
    }
}

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json")
}

fn parse_messages(path: &Path) -> Result<Vec<Message>, ParseError> {
    let file = File::open(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value =
        serde_json::from_reader(BufReader::new(file)).map_err(|source| ParseError::InvalidJson {
            path: path.to_path_buf(),
            source,
        })?;
    match value {
        Value::Array(items) => Ok(items.into_iter().map(Message::new).collect()),
        _ => Err(ParseError::NotAnArray {
            path: path.to_path_buf(),
        }),
    }
}
