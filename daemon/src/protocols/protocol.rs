use warden_protocol::v1::action::{ActionRequest, ActionResponse};

/// One versioned request/response dialect spoken over every driver.
pub trait Protocol: Send + Sync {
    /// Parses a text frame. A parse failure is already the response to send back.
    fn process_text_request(&self, raw: &str) -> Result<ActionRequest, ActionResponse>;

    async fn process_request(&self, token: Option<&str>, request: ActionRequest) -> ActionResponse;

    /// Handles a whole text frame and returns the serialized response.
    async fn process_text(&self, token: Option<&str>, raw: &str) -> String;
}
