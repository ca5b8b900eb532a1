use serde::{Deserialize, Serialize};

/// Body of every non-2xx response.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ErrorBody {
    pub error: u16,
    pub message: String,
    pub platform: String,
}

/// Body of `GET /help`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct HelpDocument {
    pub service: String,
    pub version: String,
    pub platform: String,
    pub endpoints: Vec<EndpointDoc>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct EndpointDoc {
    pub method: String,
    pub path: String,
    pub description: String,
}
