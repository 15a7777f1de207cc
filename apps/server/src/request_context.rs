//! Per-request context propagated through extensions.

/// Context attached by the request-id middleware, available to anything
/// downstream that wants to tag work with the request it belongs to.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
}
