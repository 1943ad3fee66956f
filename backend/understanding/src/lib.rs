//! Document understanding providers: OCR, PDF structure extraction, and
//! retrieval-augmented search, plus the pipelines that persist their results.

pub mod adobe;
pub mod autorag;
pub mod b64;
pub mod extract;
pub mod fanout;
pub mod mistral;
pub mod sse;

pub use adobe::{AdobeExtractClient, AssetSlot, ExtractOptions, JobState, JobStatusPayload};
pub use autorag::AutoRagClient;
pub use b64::{decode_image, is_valid_base64, strip_data_url_prefix};
pub use extract::{
    ExtractError, ExtractFailure, ExtractOrchestrator, ExtractOutcome, ExtractStep, ExtractionJob,
};
pub use fanout::{store_ocr_artifacts, FanoutOptions, FanoutReport};
pub use mistral::{MistralOcrClient, OcrDocument, OcrImage, OcrPage, OcrResponse};
pub use sse::{extract_text, SseDecoder, SseFrame};
