//! Types for the image-generation service.

use std::collections::{BTreeMap, HashMap};

use bytes::Bytes;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::remote::RemoteError;

/// Result of a connectivity probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingStatus {
    pub ok: bool,
    /// HTTP status returned by the service.
    pub status: u16,
}

/// Response to a job submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptResponse {
    pub prompt_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_errors: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Job history keyed by job id. Jobs the service has not finished are absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    pub jobs: HashMap<String, HistoryEntry>,
}

impl History {
    pub fn get(&self, prompt_id: &str) -> Option<&HistoryEntry> {
        self.jobs.get(prompt_id)
    }
}

/// One job's history record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Output per node id, ordered by node id.
    #[serde(default)]
    pub outputs: BTreeMap<String, NodeOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl HistoryEntry {
    /// Every non-empty image filename across all output nodes.
    pub fn image_filenames(&self) -> Vec<String> {
        self.outputs
            .values()
            .flat_map(|node| node.images.iter())
            .filter(|image| !image.filename.is_empty())
            .map(|image| image.filename.clone())
            .collect()
    }
}

/// Output of a single workflow node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeOutput {
    #[serde(default)]
    pub images: Vec<ImageRef>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Reference to an image the service wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub subfolder: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// Outcome of waiting for a job's images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageResult {
    pub done: bool,
    pub files: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ImageResult {
    pub fn done(files: Vec<String>) -> Self {
        Self {
            done: true,
            files,
            error: None,
        }
    }

    pub fn pending(error: Option<String>) -> Self {
        Self {
            done: false,
            files: Vec::new(),
            error,
        }
    }
}

/// A downloaded artifact, streamed.
pub struct Artifact {
    pub content_type: String,
    pub content_length: Option<u64>,
    pub body: BoxStream<'static, Result<Bytes, RemoteError>>,
}

/// Content type from the file extension, then the upstream header, then
/// `application/octet-stream`.
pub fn guess_content_type(filename: &str, upstream: Option<&str>) -> String {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());

    let guessed = match extension.as_deref() {
        Some("png") => Some("image/png"),
        Some("jpg") | Some("jpeg") => Some("image/jpeg"),
        Some("webp") => Some("image/webp"),
        Some("gif") => Some("image/gif"),
        Some("mp4") => Some("video/mp4"),
        Some("webm") => Some("video/webm"),
        Some("json") => Some("application/json"),
        Some("txt") => Some("text/plain"),
        _ => None,
    };

    guessed
        .or(upstream.filter(|u| !u.is_empty()))
        .unwrap_or("application/octet-stream")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn history(raw: Value) -> History {
        serde_json::from_value(raw).unwrap()
    }

    #[test]
    fn test_image_filenames_flattens_all_nodes() {
        let history = history(json!({
            "abc": {
                "outputs": {
                    "9": {"images": [
                        {"filename": "ComfyUI_00001_.png", "subfolder": "", "type": "output"},
                        {"filename": "ComfyUI_00002_.png", "subfolder": "", "type": "output"}
                    ]},
                    "12": {"images": [
                        {"filename": "preview_00001_.png", "subfolder": "", "type": "temp"}
                    ]}
                },
                "status": {"status_str": "success", "completed": true}
            }
        }));

        let entry = history.get("abc").unwrap();
        assert_eq!(
            entry.image_filenames(),
            vec!["preview_00001_.png", "ComfyUI_00001_.png", "ComfyUI_00002_.png"]
        );
    }

    #[test]
    fn test_nodes_without_images_are_ignored() {
        let history = history(json!({
            "abc": {
                "outputs": {
                    "3": {"text": ["hello"]},
                    "9": {"images": []},
                    "10": {"images": [{"filename": "", "type": "output"}]}
                }
            }
        }));

        let entry = history.get("abc").unwrap();
        assert!(entry.image_filenames().is_empty());
        assert_eq!(entry.outputs["3"].extra["text"], json!(["hello"]));
    }

    #[test]
    fn test_missing_job_is_absent() {
        let history = history(json!({}));
        assert!(history.get("abc").is_none());
    }

    #[test]
    fn test_prompt_response_requires_prompt_id() {
        let ok: PromptResponse = serde_json::from_value(json!({
            "prompt_id": "abc",
            "number": 3,
            "node_errors": {}
        }))
        .unwrap();
        assert_eq!(ok.prompt_id, "abc");
        assert_eq!(ok.number, Some(3));

        let missing = serde_json::from_value::<PromptResponse>(json!({"error": "bad workflow"}));
        assert!(missing.is_err());
    }

    #[test]
    fn test_image_result_serialization() {
        assert_eq!(
            serde_json::to_value(ImageResult::done(vec!["a.png".into()])).unwrap(),
            json!({"done": true, "files": ["a.png"]})
        );
        assert_eq!(
            serde_json::to_value(ImageResult::pending(Some("HTTP 500".into()))).unwrap(),
            json!({"done": false, "files": [], "error": "HTTP 500"})
        );
    }

    #[test]
    fn test_guess_content_type() {
        assert_eq!(guess_content_type("ComfyUI_00001_.png", None), "image/png");
        assert_eq!(guess_content_type("photo.JPEG", Some("text/html")), "image/jpeg");
        assert_eq!(guess_content_type("clip.webm", None), "video/webm");
        assert_eq!(guess_content_type("blob", Some("image/avif")), "image/avif");
        assert_eq!(guess_content_type("blob.bin", None), "application/octet-stream");
        assert_eq!(guess_content_type("blob", Some("")), "application/octet-stream");
    }
}
