//! Integration with the external document-understanding and drafting
//! service. The service is untrusted: everything it returns is re-validated
//! in `dealdesk-core` before a human ever sees it, and every call is gated
//! on the tenant's subscription tier first.

pub mod client;
pub mod http;
pub mod runtime;
pub mod schema;

pub use client::{DocumentPayload, DraftRequest, DraftingClient, ExtractionClient, ExtractionRequest};
pub use http::HttpExtractionClient;
pub use runtime::ExtractionRuntime;
pub use schema::extraction_output_schema;
