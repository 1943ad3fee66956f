//! Persist an OCR result as per-page artifacts next to the source object.
//!
//! Each artifact is independent: a bad image or a failed write is logged and
//! counted, and the loop moves on.

use bytes::Bytes;
use serde::Serialize;
use tracing::info;

use docgate_core::{page_image_key, page_json_key, page_markdown_key, ArtifactKind, ObjectStore};
use docgate_logging::{EventLogger, PipelineEvent};

use crate::b64::decode_image;
use crate::mistral::OcrResponse;

#[derive(Debug, Clone, Copy, Default)]
pub struct FanoutOptions {
    /// Also store each page object as JSON.
    pub store_page_json: bool,
}

/// What a fan-out run wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FanoutReport {
    pub pages: usize,
    pub markdown_stored: usize,
    pub images_stored: usize,
    pub images_skipped: usize,
    pub json_stored: usize,
    pub failed: usize,
    pub stored_keys: Vec<String>,
}

async fn put_artifact(
    store: &dyn ObjectStore,
    source: &str,
    key: String,
    data: Bytes,
    kind: ArtifactKind,
    report: &mut FanoutReport,
) -> bool {
    let bytes = data.len();
    match store.put(&key, data, Some(kind.content_type())).await {
        Ok(()) => {
            EventLogger::log_event(
                source,
                PipelineEvent::ArtifactStored {
                    key: key.clone(),
                    content_type: kind.content_type().into(),
                    bytes,
                },
            );
            report.stored_keys.push(key);
            true
        }
        Err(e) => {
            EventLogger::log_event(
                source,
                PipelineEvent::ArtifactSkipped {
                    key,
                    reason: format!("store failed: {e}"),
                },
            );
            report.failed += 1;
            false
        }
    }
}

/// Write markdown, optional page JSON, and decoded images for every page.
pub async fn store_ocr_artifacts(
    store: &dyn ObjectStore,
    key: &str,
    response: &OcrResponse,
    options: &FanoutOptions,
) -> FanoutReport {
    let mut report = FanoutReport {
        pages: response.pages().len(),
        ..FanoutReport::default()
    };

    for (i, page) in response.pages().iter().enumerate() {
        if let Some(markdown) = page.markdown.as_deref().filter(|m| !m.is_empty()) {
            let data = Bytes::copy_from_slice(markdown.as_bytes());
            let stored = put_artifact(
                store,
                key,
                page_markdown_key(key, i),
                data,
                ArtifactKind::PageMarkdown,
                &mut report,
            )
            .await;
            if stored {
                report.markdown_stored += 1;
            }
        }

        if options.store_page_json {
            match serde_json::to_vec(&page.raw) {
                Ok(json) => {
                    let stored = put_artifact(
                        store,
                        key,
                        page_json_key(key, i),
                        json.into(),
                        ArtifactKind::PageJson,
                        &mut report,
                    )
                    .await;
                    if stored {
                        report.json_stored += 1;
                    }
                }
                Err(e) => {
                    EventLogger::log_event(
                        key,
                        PipelineEvent::ArtifactSkipped {
                            key: page_json_key(key, i),
                            reason: e.to_string(),
                        },
                    );
                    report.failed += 1;
                }
            }
        }

        for (j, image) in page.images.iter().enumerate() {
            let Some(raw) = image.image_base64.as_deref() else {
                continue;
            };
            let image_key = page_image_key(key, i, j);
            match decode_image(raw) {
                Ok(bytes) => {
                    let stored = put_artifact(
                        store,
                        key,
                        image_key,
                        bytes.into(),
                        ArtifactKind::PageImage,
                        &mut report,
                    )
                    .await;
                    if stored {
                        report.images_stored += 1;
                    }
                }
                Err(e) => {
                    EventLogger::log_event(
                        key,
                        PipelineEvent::ArtifactSkipped {
                            key: image_key,
                            reason: e.to_string(),
                        },
                    );
                    report.images_skipped += 1;
                }
            }
        }
    }

    info!(
        source = %key,
        pages = report.pages,
        markdown = report.markdown_stored,
        images = report.images_stored,
        skipped = report.images_skipped,
        failed = report.failed,
        "OCR artifacts stored"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use docgate_storage::MemoryObjectStore;
    use serde_json::json;

    fn response(value: serde_json::Value) -> OcrResponse {
        OcrResponse::from(value)
    }

    #[tokio::test]
    async fn one_markdown_artifact_per_page() {
        let store = MemoryObjectStore::new();
        let resp = response(json!({
            "pages": [
                {"markdown": "page one"},
                {"markdown": "page two"},
                {"markdown": "page three"}
            ]
        }));

        let report = store_ocr_artifacts(&store, "doc.pdf", &resp, &FanoutOptions::default()).await;

        assert_eq!(report.pages, 3);
        assert_eq!(report.markdown_stored, 3);
        let second = store.get("doc.pdf.page-2.md").await.unwrap().unwrap();
        assert_eq!(&second.data[..], b"page two");
        assert_eq!(second.content_type.as_deref(), Some("text/markdown"));
        assert!(store.get("doc.pdf.page-4.md").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn page_without_images_writes_no_image_artifacts() {
        let store = MemoryObjectStore::new();
        let resp = response(json!({"pages": [{"markdown": "text", "images": []}]}));

        let report = store_ocr_artifacts(&store, "doc.pdf", &resp, &FanoutOptions::default()).await;

        assert_eq!(report.images_stored, 0);
        assert_eq!(report.stored_keys, vec!["doc.pdf.page-1.md".to_string()]);
    }

    #[tokio::test]
    async fn invalid_image_is_skipped_and_later_images_still_stored() {
        let store = MemoryObjectStore::new();
        let resp = response(json!({
            "pages": [{
                "markdown": "",
                "images": [
                    {"image_base64": "???"},
                    {"image_base64": "data:image/jpeg;base64,QUJDREVGR0g="}
                ]
            }]
        }));

        let report =
            store_ocr_artifacts(&store, "scan.pdf", &resp, &FanoutOptions::default()).await;

        assert_eq!(report.markdown_stored, 0);
        assert_eq!(report.images_skipped, 1);
        assert_eq!(report.images_stored, 1);
        assert!(store.get("scan.pdf.page-1.image-1.jpeg").await.unwrap().is_none());
        let img = store.get("scan.pdf.page-1.image-2.jpeg").await.unwrap().unwrap();
        assert_eq!(&img.data[..], b"ABCDEFGH");
        assert_eq!(img.content_type.as_deref(), Some("image/jpeg"));
    }

    #[tokio::test]
    async fn page_json_is_opt_in() {
        let store = MemoryObjectStore::new();
        let resp = response(json!({"pages": [{"markdown": "x", "index": 0}]}));

        let report = store_ocr_artifacts(
            &store,
            "doc.pdf",
            &resp,
            &FanoutOptions { store_page_json: true },
        )
        .await;

        assert_eq!(report.json_stored, 1);
        let json = store.get("doc.pdf.page-1.json").await.unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&json.data).unwrap();
        assert_eq!(value["index"], 0);
    }

    #[tokio::test]
    async fn missing_pages_is_an_empty_report() {
        let store = MemoryObjectStore::new();
        let (empty, options) = (OcrResponse::default(), FanoutOptions::default());
        let report = store_ocr_artifacts(&store, "doc.pdf", &empty, &options).await;
        assert_eq!(report, FanoutReport::default());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn pages_object_writes_nothing() {
        let store = MemoryObjectStore::new();
        let resp = response(json!({"pages": {"markdown": "not a list"}}));

        let options = FanoutOptions { store_page_json: true };
        let report = store_ocr_artifacts(&store, "doc.pdf", &resp, &options).await;

        assert_eq!(report.pages, 0);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn page_json_keeps_null_fields() {
        let store = MemoryObjectStore::new();
        let resp = response(json!({"pages": [{"index": 0, "markdown": null, "images": null}]}));

        let options = FanoutOptions { store_page_json: true };
        let report = store_ocr_artifacts(&store, "doc.pdf", &resp, &options).await;

        assert_eq!(report.markdown_stored, 0);
        assert_eq!(report.json_stored, 1);
        let json = store.get("doc.pdf.page-1.json").await.unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&json.data).unwrap();
        assert_eq!(value, json!({"index": 0, "markdown": null, "images": null}));
    }
}
