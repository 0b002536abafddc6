use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;

use secrecy::ExposeSecret;

use crate::client::config::Config;
use crate::client::consts::{AUTHORIZATION_HEADER, SESSION_PATH};

pub fn build_request(config: &Config) -> tokio_tungstenite::tungstenite::Result<Request> {
    let mut request =
        format!("{}{}", config.base_url(), SESSION_PATH).into_client_request()?;
    if let Some(token) = config.auth_token() {
        request.headers_mut().insert(
            AUTHORIZATION_HEADER,
            format!("Bearer {}", token.expose_secret()).as_str().parse()?,
        );
    }
    Ok(request)
}
