#![forbid(unsafe_code)]

//! Request-scoped building blocks for the secret-refresh proxy.
//!
//! Everything in this crate is pure: it turns inbound request headers into a
//! validated [`RequestConfig`], a forwardable destination URL and a rendered
//! header. Secret retrieval and forwarding live in `secret-refresh-exec`.

pub mod destination;
pub mod headers;
pub mod request_config;
pub mod template;

pub use crate::destination::{forward_url, resolve_destination, DestinationError};
pub use crate::headers::{
    is_reserved_header, HeaderSource, FORWARD_TO_HEADER, HEADER_TEMPLATE_HEADER, RESERVED_HEADERS,
    SECRET_ID_HEADER, SECRET_PROVIDER_HEADER,
};
pub use crate::request_config::{ConfigError, RequestConfig};
pub use crate::template::{
    parse_header_template, render_header, HeaderTemplate, RenderedHeader, TemplateError,
    SECRET_PLACEHOLDER,
};
