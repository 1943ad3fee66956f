pub mod error;
pub mod mime;
pub mod poll;
pub mod traits;
pub mod types;

pub use error::{DocgateError, Result, UpstreamFailure};
pub use mime::detect_content_type;
pub use poll::{PollOutcome, PollPolicy, Sleeper, TokioSleeper};
pub use traits::ObjectStore;
pub use types::{
    extract_archive_key, page_image_key, page_json_key, page_markdown_key, validate_key,
    ArtifactKind, StoredObject,
};
