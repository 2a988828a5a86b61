//! URL templates with `{name}` placeholders

use std::collections::BTreeMap;

use restsync_domain::{Result, SyncError};

/// Placeholder name to substitution value.
pub type PathParams = BTreeMap<String, String>;

/// A `{name}` occurrence inside a template, as byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span<'a> {
    start: usize,
    end: usize,
    name: &'a str,
}

fn spans(template: &str) -> Vec<Span<'_>> {
    let mut found = Vec::new();
    let mut cursor = 0;
    while let Some(open) = template[cursor..].find('{').map(|i| cursor + i) {
        let Some(close) = template[open + 1..].find('}').map(|i| open + 1 + i) else {
            break;
        };
        let name = &template[open + 1..close];
        // a stray '{' inside the name restarts the scan at that brace
        if let Some(inner) = name.rfind('{') {
            cursor = open + 1 + inner;
            continue;
        }
        if !name.is_empty() {
            found.push(Span { start: open, end: close + 1, name });
        }
        cursor = close + 1;
    }
    found
}

/// Placeholder names in order of appearance.
pub fn placeholders(template: &str) -> Vec<&str> {
    spans(template).into_iter().map(|span| span.name).collect()
}

pub fn is_parametric(template: &str) -> bool {
    !spans(template).is_empty()
}

/// Name of the last placeholder, the one detail fetches substitute.
pub fn last_placeholder(template: &str) -> Option<&str> {
    spans(template).last().map(|span| span.name)
}

/// Collection URL for a detail template.
///
/// Drops the last placeholder and everything after it, then trims trailing
/// `/`. `https://api/x/{id}` becomes `https://api/x`.
pub fn list_template(template: &str) -> String {
    match spans(template).last() {
        Some(span) => template[..span.start].trim_end_matches('/').to_owned(),
        None => template.to_owned(),
    }
}

/// Substitute every placeholder, percent-encoding each value as a path
/// segment.
///
/// # Errors
/// [`SyncError::MissingParameter`] for the first placeholder without a value.
pub fn render(template: &str, params: &PathParams) -> Result<String> {
    let mut rendered = String::with_capacity(template.len());
    let mut cursor = 0;
    for span in spans(template) {
        let value = params.get(span.name).ok_or_else(|| SyncError::MissingParameter {
            placeholder: span.name.to_owned(),
            template: template.to_owned(),
        })?;
        rendered.push_str(&template[cursor..span.start]);
        rendered.push_str(&urlencoding::encode(value));
        cursor = span.end;
    }
    rendered.push_str(&template[cursor..]);
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> PathParams {
        pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect()
    }

    #[test]
    fn finds_placeholders_in_order() {
        let template = "https://api.example.com/tenants/{tenant}/orders/{orderId}";
        assert_eq!(placeholders(template), vec!["tenant", "orderId"]);
        assert_eq!(last_placeholder(template), Some("orderId"));
        assert!(is_parametric(template));
    }

    #[test]
    fn plain_urls_have_no_placeholders() {
        let template = "https://api.example.com/settings";
        assert!(placeholders(template).is_empty());
        assert!(!is_parametric(template));
        assert_eq!(last_placeholder(template), None);
        assert_eq!(list_template(template), template);
    }

    #[test]
    fn empty_braces_and_unclosed_braces_are_literal() {
        assert!(!is_parametric("https://api/x/{}"));
        assert!(!is_parametric("https://api/x/{id"));
        assert_eq!(placeholders("/a/{b/{id}"), vec!["id"]);
    }

    #[test]
    fn list_template_cuts_at_last_placeholder() {
        assert_eq!(list_template("https://api.example.com/business/{id}"), "https://api.example.com/business");
        assert_eq!(list_template("https://api/business/{id}/"), "https://api/business");
        assert_eq!(list_template("https://api/business/{id}/detail"), "https://api/business");
        assert_eq!(list_template("https://api/t/{tenant}/o/{id}"), "https://api/t/{tenant}/o");
    }

    #[test]
    fn render_substitutes_and_encodes() {
        let url = render("https://api/business/{id}", &params(&[("id", "42")])).unwrap();
        assert_eq!(url, "https://api/business/42");

        let url = render("/files/{name}", &params(&[("name", "a b/c")])).unwrap();
        assert_eq!(url, "/files/a%20b%2Fc");

        let url = render("/t/{tenant}/o/{id}", &params(&[("tenant", "t1"), ("id", "7"), ("extra", "x")]))
            .unwrap();
        assert_eq!(url, "/t/t1/o/7");
    }

    #[test]
    fn render_reports_missing_parameter() {
        let err = render("/t/{tenant}/o/{id}", &params(&[("id", "7")])).unwrap_err();
        assert_eq!(
            err,
            SyncError::MissingParameter {
                placeholder: "tenant".into(),
                template: "/t/{tenant}/o/{id}".into(),
            }
        );
    }

    #[test]
    fn render_without_placeholders_is_identity() {
        assert_eq!(render("https://api/settings", &PathParams::new()).unwrap(), "https://api/settings");
    }
}
