#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use slack_photos_engine::{EngineEvent, ProgressSink};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

pub enum Entry<'a> {
    Dir(&'a str),
    File(&'a str, &'a [u8]),
}

/// Writes a zip at `path` containing `entries` in the given order.
pub fn write_zip(path: &Path, entries: &[Entry<'_>]) -> PathBuf {
    let file = File::create(path).unwrap();
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    for entry in entries {
        match entry {
            Entry::Dir(name) => writer.add_directory(*name, options.clone()).unwrap(),
            Entry::File(name, bytes) => {
                writer.start_file(*name, options.clone()).unwrap();
                writer.write_all(bytes).unwrap();
            }
        }
    }
    writer.finish().unwrap();
    path.to_path_buf()
}

/// Slack file record as found in a message's `files` array.
pub fn slack_file(name: &str, mimetype: &str, url: &str) -> Value {
    json!({
        "id": "F0000001",
        "name": name,
        "title": name,
        "mimetype": mimetype,
        "filetype": mimetype.rsplit('/').next().unwrap_or_default(),
        "url_private": url,
        "url_private_download": url,
    })
}

pub fn message_with_files(files: Vec<Value>) -> Value {
    json!({
        "type": "message",
        "user": "U0000001",
        "text": "look at this",
        "ts": "1609459200.000100",
        "files": files,
    })
}

pub fn channel_log(messages: Vec<Value>) -> Vec<u8> {
    serde_json::to_vec_pretty(&Value::Array(messages)).unwrap()
}

#[derive(Default, Clone)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<EngineEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<EngineEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn statuses(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                EngineEvent::Status(line) => Some(line),
                _ => None,
            })
            .collect()
    }
}

impl ProgressSink for RecordingSink {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Relative paths of every file below `root`, sorted.
pub fn relative_files(root: &Path) -> Vec<String> {
    let mut files: Vec<String> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| {
            entry
                .path()
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect();
    files.sort();
    files
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFraming {
    ContentLength,
    Chunked,
}

/// Serves `body` once over plain HTTP/1.1, writing `chunk` bytes at a time
/// with `pause` before each write. Returns the URL to fetch.
pub async fn serve_slowly(
    body: Vec<u8>,
    chunk: usize,
    pause: Duration,
    framing: BodyFraming,
) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let read = socket.read(&mut buf).await.unwrap();
            if read == 0 {
                return;
            }
            request.extend_from_slice(&buf[..read]);
        }

        let head = match framing {
            BodyFraming::ContentLength => format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            ),
            BodyFraming::Chunked => {
                "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n"
                    .to_string()
            }
        };
        if socket.write_all(head.as_bytes()).await.is_err() {
            return;
        }
        for piece in body.chunks(chunk) {
            tokio::time::sleep(pause).await;
            let frame = match framing {
                BodyFraming::ContentLength => piece.to_vec(),
                BodyFraming::Chunked => {
                    let mut frame = format!("{:x}\r\n", piece.len()).into_bytes();
                    frame.extend_from_slice(piece);
                    frame.extend_from_slice(b"\r\n");
                    frame
                }
            };
            // The client may hang up early, e.g. on timeout.
            if socket.write_all(&frame).await.is_err() {
                return;
            }
        }
        if framing == BodyFraming::Chunked {
            let _ = socket.write_all(b"0\r\n\r\n").await;
        }
        let _ = socket.shutdown().await;
    });
    format!("http://{addr}/files/slow")
}
