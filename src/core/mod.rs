pub mod emitter;
pub mod engine;
pub mod enricher;
pub mod paginator;
pub mod stars;
pub mod transport;

pub use crate::domain::model::{EnrichedUser, ProgressEvent, RawStargazer, RunOutcome, RunRequest};
pub use crate::domain::ports::{ApiRequest, ApiResponse, HttpTransport};
pub use crate::utils::error::Result;
