use std::fmt;

/// Marker replaced by the resolved secret in a header template.
pub const SECRET_PLACEHOLDER: &str = "{secret}";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Secret,
}

/// A parsed `Header-Name: value {secret}` template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderTemplate {
    name: String,
    segments: Vec<Segment>,
}

/// Header produced by rendering a template. The value is never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct RenderedHeader {
    pub name: String,
    pub value: String,
}

impl fmt::Debug for RenderedHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderedHeader")
            .field("name", &self.name)
            .field("value", &"<redacted>")
            .finish()
    }
}

pub fn parse_header_template(input: &str) -> Result<HeaderTemplate, TemplateError> {
    let (name, pattern) = input
        .split_once(':')
        .ok_or(TemplateError::MissingSeparator)?;

    let name = name.trim();
    if name.is_empty() {
        return Err(TemplateError::EmptyHeaderName);
    }
    if !name.bytes().all(is_tchar) {
        return Err(TemplateError::InvalidHeaderName(name.to_string()));
    }

    let mut segments = Vec::new();
    let mut rest = pattern.trim();
    while let Some(idx) = rest.find(SECRET_PLACEHOLDER) {
        if idx > 0 {
            segments.push(Segment::Literal(rest[..idx].to_string()));
        }
        segments.push(Segment::Secret);
        rest = &rest[idx + SECRET_PLACEHOLDER.len()..];
    }
    if !rest.is_empty() {
        segments.push(Segment::Literal(rest.to_string()));
    }

    if !segments.contains(&Segment::Secret) {
        return Err(TemplateError::MissingPlaceholder);
    }

    Ok(HeaderTemplate {
        name: name.to_string(),
        segments,
    })
}

impl HeaderTemplate {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn render(&self, secret: &str) -> Result<RenderedHeader, TemplateError> {
        let mut value = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(s) => value.push_str(s),
                Segment::Secret => value.push_str(secret),
            }
        }
        if value.bytes().any(|b| b == b'\r' || b == b'\n' || b == 0) {
            return Err(TemplateError::InvalidValue);
        }
        Ok(RenderedHeader {
            name: self.name.clone(),
            value,
        })
    }
}

/// Parse `template` and render it with `secret` in one step.
pub fn render_header(template: &str, secret: &str) -> Result<RenderedHeader, TemplateError> {
    parse_header_template(template)?.render(secret)
}

// RFC 9110 token characters.
fn is_tchar(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("template must have the form 'Header-Name: value' (missing ':')")]
    MissingSeparator,
    #[error("template header name must not be empty")]
    EmptyHeaderName,
    #[error("template header name is not a valid HTTP header name: {0}")]
    InvalidHeaderName(String),
    #[error("template value must contain the {{secret}} placeholder")]
    MissingPlaceholder,
    #[error("rendered header value contains control characters")]
    InvalidValue,
}
