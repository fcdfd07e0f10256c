/// Message and header constants shared by the use case, the HTTP layer and tests.
/// The message strings are part of the response contract the site UI reads.

// Response error messages
pub const MISSING_EMAIL: &str = "Missing email";
pub const UPSTREAM_SEND_FAILED: &str = "Upstream mail/send failed";
pub const UPSTREAM_SUBMISSION_FAILED: &str = "Upstream submission failed";
pub const SUBMISSION_FAILED: &str = "Submission failed";

// Detail excerpt
pub const NO_RESPONSE_BODY: &str = "No response body";
pub const DETAIL_MAX_CHARS: usize = 240;

/// Upstream bodies are read up to this many bytes; the rest is discarded
pub const MAX_UPSTREAM_BODY_BYTES: usize = 64 * 1024;

// Outbound content types
pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const JSON_ACCEPT: &str = "application/json";
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded;charset=UTF-8";
pub const FORM_ACCEPT: &str = "application/json,text/plain,*/*";
pub const NO_STORE: &str = "no-store";

/// Inbound route the site posts to
pub const WAITLIST_ROUTE: &str = "/api/waitlist";
