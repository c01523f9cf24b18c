use serde_json::Value;

use crate::Message;

/// Slack keys holding the private download URL, most specific first.
const URL_KEYS: &[&str] = &["url_private_download", "url_private"];

const ELIGIBLE_MIME_PREFIXES: &[&str] = &["image", "video"];

/// A file reference from a message that looks like a photo or video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Destination file name; validated later when the download target is built.
    pub name: Option<String>,
    pub url: String,
    pub mimetype: String,
}

/// Case-sensitive prefix match against Slack's lowercase MIME strings.
pub fn is_eligible_mimetype(mimetype: &str) -> bool {
    ELIGIBLE_MIME_PREFIXES
        .iter()
        .any(|prefix| mimetype.starts_with(prefix))
}

/// Image and video attachments of `message`, in the order they appear.
pub fn filter_eligible(message: &Message) -> Vec<Attachment> {
    let Some(files) = message.files() else {
        return Vec::new();
    };
    files.iter().filter_map(eligible_attachment).collect()
}

fn eligible_attachment(file: &Value) -> Option<Attachment> {
    let url = URL_KEYS
        .iter()
        .find_map(|key| file.get(*key).and_then(Value::as_str))?;
    let mimetype = file.get("mimetype").and_then(Value::as_str)?;
    if !is_eligible_mimetype(mimetype) {
        return None;
    }
    Some(Attachment {
        name: file.get("name").and_then(Value::as_str).map(str::to_owned),
        url: url.to_owned(),
        mimetype: mimetype.to_owned(),
    })
}
