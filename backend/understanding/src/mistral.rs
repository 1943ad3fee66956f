//! Mistral OCR client.
//!
//! One call per document. The HTTP caller gets back exactly what the
//! provider returned; fan-out reads pages from a lenient typed view.

use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::{Client, Url};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use tracing::{debug, warn};

use docgate_config::schema::OcrConfig;
use docgate_core::{DocgateError, Result, UpstreamFailure};
use docgate_logging::log_excerpt;

const SERVICE: &str = "mistral-ocr";

/// Where the provider should read the document from.
#[derive(Debug, Clone, PartialEq)]
pub enum OcrDocument {
    /// A URL the provider can fetch directly.
    PublicUrl { url: String, name: String },
    /// Document bytes sent inline as a `data:` URL.
    Inline { data: Vec<u8>, name: String },
}

impl OcrDocument {
    /// `<base>/<key>` with the key percent-encoded as a single path segment.
    pub fn public(base_url: &str, key: &str) -> Result<Self> {
        let mut url = Url::parse(base_url)
            .map_err(|e| DocgateError::Config(format!("invalid public base url: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| DocgateError::Config(format!("public base url cannot be a base: {base_url}")))?
            .pop_if_empty()
            .push(key);
        Ok(OcrDocument::PublicUrl {
            url: url.to_string(),
            name: key.to_string(),
        })
    }

    pub fn inline(data: impl Into<Vec<u8>>, name: impl Into<String>) -> Self {
        OcrDocument::Inline {
            data: data.into(),
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            OcrDocument::PublicUrl { name, .. } | OcrDocument::Inline { name, .. } => name,
        }
    }

    fn document_url(&self) -> String {
        match self {
            OcrDocument::PublicUrl { url, .. } => url.clone(),
            OcrDocument::Inline { data, .. } => {
                format!("data:application/pdf;base64,{}", STANDARD.encode(data))
            }
        }
    }
}

#[derive(Serialize)]
struct OcrRequest<'a> {
    model: &'a str,
    document: DocumentRef<'a>,
    include_image_base64: bool,
}

#[derive(Serialize)]
struct DocumentRef<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    document_url: String,
    document_name: &'a str,
}

/// Full OCR result.
///
/// The provider's JSON is kept untouched and is what gets serialized back to
/// the caller. `pages` is a lenient view over it: it is empty unless the
/// provider sent `pages` as a list of objects.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OcrResponse {
    raw: Value,
    pages: Vec<OcrPage>,
}

impl OcrResponse {
    pub fn pages(&self) -> &[OcrPage] {
        &self.pages
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn into_raw(self) -> Value {
        self.raw
    }
}

impl From<Value> for OcrResponse {
    fn from(raw: Value) -> Self {
        let pages = raw
            .get("pages")
            .and_then(Value::as_array)
            .filter(|pages| pages.iter().all(Value::is_object))
            .map(|pages| pages.iter().map(OcrPage::from_value).collect())
            .unwrap_or_default();
        Self { raw, pages }
    }
}

impl Serialize for OcrResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for OcrResponse {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Value::deserialize(deserializer).map(OcrResponse::from)
    }
}

/// One page of an OCR result. `raw` is the page object as sent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OcrPage {
    pub markdown: Option<String>,
    pub images: Vec<OcrImage>,
    pub raw: Value,
}

impl OcrPage {
    fn from_value(raw: &Value) -> Self {
        let images = raw
            .get("images")
            .and_then(Value::as_array)
            .map(|images| {
                images
                    .iter()
                    .map(|image| OcrImage {
                        image_base64: image
                            .get("image_base64")
                            .and_then(Value::as_str)
                            .map(str::to_string),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self {
            markdown: raw.get("markdown").and_then(Value::as_str).map(str::to_string),
            images,
            raw: raw.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OcrImage {
    pub image_base64: Option<String>,
}

/// Client for `POST /v1/ocr`.
pub struct MistralOcrClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
    include_image_base64: bool,
}

impl MistralOcrClient {
    pub fn from_config(config: &OcrConfig, http: Client) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| DocgateError::Config("ocr.apiKey is not set".into()))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            include_image_base64: config.include_image_base64,
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Run OCR over one document.
    pub async fn ocr(&self, document: &OcrDocument) -> Result<OcrResponse> {
        let body = OcrRequest {
            model: &self.model,
            document: DocumentRef {
                kind: "document_url",
                document_url: document.document_url(),
                document_name: document.name(),
            },
            include_image_base64: self.include_image_base64,
        };

        debug!(document = %document.name(), model = %self.model, "Sending OCR request");

        let resp = self
            .http
            .post(format!("{}/v1/ocr", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| UpstreamFailure::transport(SERVICE, e))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %log_excerpt(&text), "OCR request rejected");
            return Err(UpstreamFailure::new(SERVICE, Some(status.as_u16()), text).into());
        }

        let text = resp
            .text()
            .await
            .map_err(|e| UpstreamFailure::transport(SERVICE, e))?;
        serde_json::from_str::<Value>(&text).map(OcrResponse::from).map_err(|e| {
            DocgateError::Upstream(UpstreamFailure::new(
                SERVICE,
                Some(status.as_u16()),
                format!("unparsable OCR response ({e}): {}", log_excerpt(&text)),
            ))
        })
    }
}
