use secret_refresh_core::{parse_header_template, render_header, TemplateError};

#[test]
fn renders_bearer_template() {
    let h = render_header("Authorization: Bearer {secret}", "tok123").unwrap();
    assert_eq!(h.name, "Authorization");
    assert_eq!(h.value, "Bearer tok123");
}

#[test]
fn renders_bare_placeholder_and_repeats() {
    let h = render_header("X-Api-Key:{secret}", "k").unwrap();
    assert_eq!(h.name, "X-Api-Key");
    assert_eq!(h.value, "k");

    let h = render_header("X-Pair: {secret}/{secret}", "ab").unwrap();
    assert_eq!(h.value, "ab/ab");
}

#[test]
fn only_first_colon_separates_name() {
    let h = render_header("X-Creds: user:{secret}", "pw").unwrap();
    assert_eq!(h.name, "X-Creds");
    assert_eq!(h.value, "user:pw");
}

#[test]
fn rejects_malformed_templates() {
    assert_eq!(
        parse_header_template("Authorization Bearer {secret}"),
        Err(TemplateError::MissingSeparator)
    );
    assert_eq!(
        parse_header_template(" : Bearer {secret}"),
        Err(TemplateError::EmptyHeaderName)
    );
    assert_eq!(
        parse_header_template("Bad Name: {secret}"),
        Err(TemplateError::InvalidHeaderName("Bad Name".to_string()))
    );
    assert_eq!(
        parse_header_template("Authorization: Bearer {token}"),
        Err(TemplateError::MissingPlaceholder)
    );
}

#[test]
fn rejects_secret_that_would_split_the_header() {
    let err = render_header("Authorization: Bearer {secret}", "tok\r\nX-Evil: 1").unwrap_err();
    assert_eq!(err, TemplateError::InvalidValue);
    assert!(!err.to_string().contains("X-Evil"));
}

#[test]
fn debug_output_hides_value() {
    let h = render_header("Authorization: Bearer {secret}", "tok123").unwrap();
    assert!(!format!("{h:?}").contains("tok123"));
}
