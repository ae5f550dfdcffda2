use anyhow::Result;

use crate::error::format_api_error;
use crate::util::urljoin;

/// First-step reply of every AEMET endpoint.
///
/// `{"descripcion": "exito", "estado": 200, "datos": "<url>", "metadatos": "<url>"}`
#[derive(Debug, serde::Deserialize)]
pub(crate) struct Envelope {
    #[serde(default)]
    pub(crate) descripcion: Option<String>,
    pub(crate) estado: u16,
    #[serde(default)]
    pub(crate) datos: Option<String>,
    #[serde(default)]
    pub(crate) metadatos: Option<String>,
}

impl Envelope {
    /// Location of the payload, or the upstream failure as an [`crate::ApiError`].
    pub(crate) fn data_url(&self, request_url: &str) -> Result<String> {
        let description = self.descripcion.as_deref().unwrap_or("");
        if self.estado != 200 {
            return Err(format_api_error(self.estado, request_url, description));
        }

        match self.datos.as_deref().map(str::trim) {
            Some(href) if !href.is_empty() => Ok(urljoin(request_url, href)),
            _ => Err(format_api_error(
                self.estado,
                request_url,
                "missing `datos` link in API reply",
            )),
        }
    }
}
