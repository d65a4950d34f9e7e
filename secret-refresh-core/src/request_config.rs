use crate::headers::{
    HeaderSource, FORWARD_TO_HEADER, HEADER_TEMPLATE_HEADER, SECRET_ID_HEADER,
    SECRET_PROVIDER_HEADER,
};

/// Per-request forwarding instructions carried in the reserved headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestConfig {
    pub destination_url: String,
    pub secret_provider: String,
    pub secret_id: String,
    pub header_template: String,
}

impl RequestConfig {
    /// Extract the config from request headers.
    ///
    /// Headers are checked in a fixed order (destination, provider, secret id,
    /// template) and the first problem found is reported.
    pub fn from_headers<H: HeaderSource + ?Sized>(headers: &H) -> Result<Self, ConfigError> {
        Ok(Self {
            destination_url: required(headers, FORWARD_TO_HEADER)?,
            secret_provider: required(headers, SECRET_PROVIDER_HEADER)?,
            secret_id: required(headers, SECRET_ID_HEADER)?,
            header_template: required(headers, HEADER_TEMPLATE_HEADER)?,
        })
    }
}

fn required<H: HeaderSource + ?Sized>(
    headers: &H,
    name: &'static str,
) -> Result<String, ConfigError> {
    let raw = headers
        .header_bytes(name)
        .ok_or(ConfigError::Missing { header: name })?;
    let value = std::str::from_utf8(raw).map_err(|_| ConfigError::NotUtf8 { header: name })?;
    let value = value.trim();
    if value.is_empty() {
        return Err(ConfigError::Empty { header: name });
    }
    Ok(value.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("required header {header} is missing")]
    Missing { header: &'static str },
    #[error("header {header} must not be empty")]
    Empty { header: &'static str },
    #[error("header {header} is not valid UTF-8")]
    NotUtf8 { header: &'static str },
}

impl ConfigError {
    /// The reserved header at fault.
    pub fn header(&self) -> &'static str {
        match self {
            Self::Missing { header } | Self::Empty { header } | Self::NotUtf8 { header } => header,
        }
    }
}
