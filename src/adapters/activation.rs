//! Activation adapter: one HTTP POST to the backend.
//!
//! Implements [`ActivationPort`].  The request body is
//! `{"token": "..."}`; the response is interpreted by
//! [`parse_activation_response`].

use log::{info, warn};

use crate::app::ports::ActivationPort;
use crate::app::provisioning::{activation_request_body, parse_activation_response};
use crate::error::ProvisioningError;
use crate::identity::DeviceId;

/// Upper bound on the response body kept for parsing.
const MAX_RESPONSE_BODY: usize = 2048;

pub struct ActivationAdapter {
    url: String,
    #[cfg(target_os = "espidf")]
    timeout_ms: u32,
    #[cfg(not(target_os = "espidf"))]
    response: Option<(u16, Vec<u8>)>,
    #[cfg(not(target_os = "espidf"))]
    tokens: Vec<String>,
}

impl ActivationAdapter {
    #[cfg(target_os = "espidf")]
    pub fn new(url: &str, timeout_ms: u32) -> Self {
        Self {
            url: url.into(),
            timeout_ms,
        }
    }

    /// Simulation: unreachable backend until a response is scripted.
    #[cfg(not(target_os = "espidf"))]
    pub fn new(url: &str, _timeout_ms: u32) -> Self {
        Self {
            url: url.into(),
            response: None,
            tokens: Vec::new(),
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn sim_respond(&mut self, status: u16, body: &str) {
        self.response = Some((status, body.as_bytes().to_vec()));
    }

    /// Tokens sent so far.
    #[cfg(not(target_os = "espidf"))]
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    #[cfg(target_os = "espidf")]
    fn post(&mut self, body: &[u8]) -> Result<(u16, Vec<u8>), ProvisioningError> {
        use core::time::Duration;

        use esp_idf_svc::http::Method;
        use esp_idf_svc::http::client::{Client, Configuration, EspHttpConnection};
        use esp_idf_svc::io::{Read, Write};

        fn unreachable<E: core::fmt::Debug>(e: E) -> ProvisioningError {
            warn!("Activation: request failed: {:?}", e);
            ProvisioningError::ActivationUnreachable
        }

        let conf = Configuration {
            timeout: Some(Duration::from_millis(u64::from(self.timeout_ms))),
            ..Default::default()
        };
        let mut client = Client::wrap(EspHttpConnection::new(&conf).map_err(unreachable)?);

        let len = body.len().to_string();
        let headers = [
            ("Content-Type", "application/json"),
            ("Content-Length", len.as_str()),
        ];
        let mut request = client
            .request(Method::Post, &self.url, &headers)
            .map_err(unreachable)?;
        request.write_all(body).map_err(unreachable)?;
        request.flush().map_err(unreachable)?;
        let mut response = request.submit().map_err(unreachable)?;

        let status = response.status();
        let mut out = Vec::new();
        let mut chunk = [0u8; 256];
        loop {
            let n = response.read(&mut chunk).map_err(unreachable)?;
            if n == 0 || out.len() + n > MAX_RESPONSE_BODY {
                break;
            }
            out.extend_from_slice(&chunk[..n]);
        }
        Ok((status, out))
    }

    #[cfg(not(target_os = "espidf"))]
    fn post(&mut self, body: &[u8]) -> Result<(u16, Vec<u8>), ProvisioningError> {
        #[derive(serde::Deserialize)]
        struct Sent {
            token: String,
        }
        if let Ok(sent) = serde_json::from_slice::<Sent>(body) {
            self.tokens.push(sent.token);
        }
        let (status, mut resp) = self
            .response
            .clone()
            .ok_or(ProvisioningError::ActivationUnreachable)?;
        resp.truncate(MAX_RESPONSE_BODY);
        Ok((status, resp))
    }
}

impl ActivationPort for ActivationAdapter {
    fn activate(&mut self, token: &str) -> Result<DeviceId, ProvisioningError> {
        info!("Activation: POST {}", self.url);
        let body = activation_request_body(token)?;
        let (status, resp) = self.post(&body)?;
        let result = parse_activation_response(status, &resp);
        if let Err(e) = &result {
            warn!("Activation: HTTP {} -> {}", status, e);
        }
        result
    }
}
