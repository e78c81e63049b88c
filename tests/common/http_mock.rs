use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN_PATH: &str = "/v1/oauth/token";

/// Start a token endpoint that answers every refresh grant with `response`.
#[allow(dead_code)]
pub async fn start_token_server(response: ResponseTemplate) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_partial_json(serde_json::json!({
            "grant_type": "refresh_token"
        })))
        .respond_with(response)
        .mount(&server)
        .await;
    server
}

#[allow(dead_code)]
pub fn token_url(server: &MockServer) -> String {
    format!("{}{}", server.uri(), TOKEN_PATH)
}

#[allow(dead_code)]
pub fn ok_json(body: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}
