/// Keep-alive frame a client sends to check the connection is alive.
pub const KEEP_ALIVE_REQUEST: &str = "yo";
/// Fixed reply to [`KEEP_ALIVE_REQUEST`].
pub const KEEP_ALIVE_RESPONSE: &str = "oy";

/// A request/response pair answered at the transport boundary, before a
/// frame is decoded or handed to the room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoResponse {
    request: String,
    response: String,
}

impl AutoResponse {
    pub fn new(request: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            request: request.into(),
            response: response.into(),
        }
    }

    pub fn keep_alive() -> Self {
        Self::new(KEEP_ALIVE_REQUEST, KEEP_ALIVE_RESPONSE)
    }

    /// Returns the reply when `frame` is exactly the request token.
    pub fn reply_to(&self, frame: &str) -> Option<&str> {
        (frame == self.request).then_some(self.response.as_str())
    }
}
