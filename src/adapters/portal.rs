//! Provisioning portal: the HTTP form served on the access point.
//!
//! Implements [`ProvisioningSurface`].  `GET /` renders the form together
//! with the outcome of the last submission; `POST /submit` queues the
//! url-encoded form for the control loop.  The server handlers never run
//! domain logic themselves: they only hand the form over, so the submit
//! flow still executes on the tick loop.

use std::fmt::Write as _;

use log::info;

use crate::app::ports::ProvisioningSurface;
use crate::app::provisioning::{ProvisioningForm, ProvisioningOutcome};
use crate::error::CommsError;

/// Largest accepted form body.
pub const MAX_FORM_BODY: usize = 512;

/// Escape text for inclusion in HTML.
fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// The provisioning page.  `status` is shown above the form when present.
pub fn render_page(status: Option<&str>) -> String {
    let mut page = String::from(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\">\
         <meta name=\"viewport\" content=\"width=device-width,initial-scale=1\">\
         <title>Sensor setup</title></head><body><h1>Sensor setup</h1>",
    );
    if let Some(status) = status {
        let _ = write!(page, "<p id=\"status\">{}</p>", escape_html(status));
    }
    page.push_str(
        "<form method=\"post\" action=\"/submit\">\
         <label>WiFi network<input name=\"ssid\" maxlength=\"32\" required></label><br>\
         <label>Password<input name=\"password\" type=\"password\" maxlength=\"64\" required></label><br>\
         <label>Activation token<input name=\"token\" required></label><br>\
         <button type=\"submit\">Activate</button></form></body></html>",
    );
    page
}

#[derive(Default)]
struct PortalShared {
    pending: Option<ProvisioningForm>,
    last_outcome: Option<String>,
}

// ───────────────────────────────────────────────────────────────
// Portal adapter (ESP-IDF)
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub struct PortalAdapter {
    shared: std::sync::Arc<std::sync::Mutex<PortalShared>>,
    server: Option<esp_idf_svc::http::server::EspHttpServer<'static>>,
}

#[cfg(target_os = "espidf")]
impl Default for PortalAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_os = "espidf")]
impl PortalAdapter {
    pub fn new() -> Self {
        Self {
            shared: Default::default(),
            server: None,
        }
    }

    fn serve(&mut self) -> anyhow::Result<()> {
        use esp_idf_svc::http::Method;
        use esp_idf_svc::http::server::{Configuration, EspHttpServer};
        use esp_idf_svc::io::{Read, Write};

        use crate::app::provisioning::parse_form;

        let conf = Configuration {
            stack_size: 10 * 1024,
            ..Default::default()
        };
        let mut server = EspHttpServer::new(&conf)?;

        let shared = self.shared.clone();
        server.fn_handler::<anyhow::Error, _>("/", Method::Get, move |req| {
            let status = shared
                .lock()
                .map_err(|_| anyhow::anyhow!("portal state poisoned"))?
                .last_outcome
                .clone();
            req.into_response(200, Some("OK"), &[("Content-Type", "text/html; charset=utf-8")])?
                .write_all(render_page(status.as_deref()).as_bytes())?;
            Ok(())
        })?;

        let shared = self.shared.clone();
        server.fn_handler::<anyhow::Error, _>("/submit", Method::Post, move |mut req| {
            let len = req.content_len().unwrap_or(0) as usize;
            if len > MAX_FORM_BODY {
                req.into_status_response(413)?.write_all(b"form too large")?;
                return Ok(());
            }
            let mut body = vec![0u8; len];
            req.read_exact(&mut body)?;
            let form = parse_form(&String::from_utf8_lossy(&body));
            {
                let mut state = shared
                    .lock()
                    .map_err(|_| anyhow::anyhow!("portal state poisoned"))?;
                state.pending = Some(form);
                state.last_outcome = Some("Connecting...".into());
            }
            req.into_response(200, Some("OK"), &[("Content-Type", "text/html; charset=utf-8")])?
                .write_all(render_page(Some("Connecting... reload for the result.")).as_bytes())?;
            Ok(())
        })?;

        self.server = Some(server);
        Ok(())
    }
}

#[cfg(target_os = "espidf")]
impl ProvisioningSurface for PortalAdapter {
    fn start(&mut self) -> Result<(), CommsError> {
        self.serve().map_err(|e| {
            log::error!("Portal: server start failed: {}", e);
            CommsError::HttpFailed
        })?;
        info!("Portal: serving on port 80");
        Ok(())
    }

    fn poll_submission(&mut self) -> Option<ProvisioningForm> {
        self.shared.lock().ok().and_then(|mut s| s.pending.take())
    }

    fn report(&mut self, outcome: &ProvisioningOutcome) {
        if let Ok(mut s) = self.shared.lock() {
            s.last_outcome = Some(outcome.to_string());
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Portal adapter (simulation)
// ───────────────────────────────────────────────────────────────

/// Host-side stand-in.  Submissions are injected with
/// [`sim_submit`](Self::sim_submit).
#[cfg(not(target_os = "espidf"))]
#[derive(Default)]
pub struct PortalAdapter {
    shared: PortalShared,
    started: bool,
    reports: Vec<ProvisioningOutcome>,
}

#[cfg(not(target_os = "espidf"))]
impl PortalAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a url-encoded body as if it had been POSTed to `/submit`.
    pub fn sim_submit(&mut self, body: &str) {
        self.shared.pending = Some(crate::app::provisioning::parse_form(body));
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn reports(&self) -> &[ProvisioningOutcome] {
        &self.reports
    }

    /// What `GET /` would currently return.
    pub fn page(&self) -> String {
        render_page(self.shared.last_outcome.as_deref())
    }
}

#[cfg(not(target_os = "espidf"))]
impl ProvisioningSurface for PortalAdapter {
    fn start(&mut self) -> Result<(), CommsError> {
        self.started = true;
        info!("Portal(sim): serving");
        Ok(())
    }

    fn poll_submission(&mut self) -> Option<ProvisioningForm> {
        self.shared.pending.take()
    }

    fn report(&mut self, outcome: &ProvisioningOutcome) {
        self.shared.last_outcome = Some(outcome.to_string());
        self.reports.push(outcome.clone());
    }
}
