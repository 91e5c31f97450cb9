//! The auto-posting form that returns the user to the relying party.

use crate::assertion::Assertion;

pub const SAML_RESPONSE_FIELD: &str = "SAMLResponse";
pub const RELAY_STATE_FIELD: &str = "RelayState";

/// A POST form targeting the relying party's assertion consumer service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnForm {
    /// Form action, the `serviceUrl` of the assertion.
    pub action: String,
    /// Hidden input fields, in document order.
    pub fields: Vec<(String, String)>,
}

impl ReturnForm {
    /// Build the form for a validated assertion. `RelayState` is only added
    /// when the assertion carries one.
    pub fn from_assertion(assertion: &Assertion) -> Self {
        let mut fields = vec![(
            SAML_RESPONSE_FIELD.to_string(),
            assertion.saml_response.clone(),
        )];
        if let Some(ref relay_state) = assertion.relay_state {
            fields.push((RELAY_STATE_FIELD.to_string(), relay_state.clone()));
        }

        Self {
            action: assertion.service_url.clone(),
            fields,
        }
    }

    /// Value of a hidden field.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// `application/x-www-form-urlencoded` body as a browser would submit it.
    pub fn encoded_body(&self) -> Result<String, serde_urlencoded::ser::Error> {
        serde_urlencoded::to_string(&self.fields)
    }

    /// Standalone page that posts the form as soon as it is loaded.
    pub fn to_html(&self) -> String {
        let inputs: String = self
            .fields
            .iter()
            .map(|(name, value)| {
                format!(
                    "        <input type=\"hidden\" name=\"{}\" value=\"{}\"/>\n",
                    html_escape(name),
                    html_escape(value)
                )
            })
            .collect();

        format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <title>Returning to service</title>
</head>
<body onload="document.forms[0].submit()">
    <form method="post" action="{}">
{}        <noscript>
            <input type="submit" value="Continue"/>
        </noscript>
    </form>
</body>
</html>"#,
            html_escape(&self.action),
            inputs
        )
    }
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assertion(relay_state: Option<&str>) -> Assertion {
        Assertion {
            service_url: "https://sp.example/acs".to_string(),
            saml_response: "<saml>".to_string(),
            relay_state: relay_state.map(String::from),
        }
    }

    #[test]
    fn test_form_without_relay_state() {
        let form = ReturnForm::from_assertion(&assertion(None));
        assert_eq!(form.action, "https://sp.example/acs");
        assert_eq!(form.field(SAML_RESPONSE_FIELD), Some("<saml>"));
        assert_eq!(form.field(RELAY_STATE_FIELD), None);
        assert_eq!(form.fields.len(), 1);
    }

    #[test]
    fn test_form_with_relay_state() {
        let form = ReturnForm::from_assertion(&assertion(Some("state 1")));
        assert_eq!(form.field(RELAY_STATE_FIELD), Some("state 1"));
        assert_eq!(
            form.encoded_body().unwrap(),
            "SAMLResponse=%3Csaml%3E&RelayState=state+1"
        );
    }

    #[test]
    fn test_html_is_escaped() {
        let mut a = assertion(Some("\"><script>"));
        a.service_url = "https://sp.example/acs?a=1&b=2".to_string();
        let html = ReturnForm::from_assertion(&a).to_html();

        assert!(html.contains(r#"action="https://sp.example/acs?a=1&amp;b=2""#));
        assert!(html.contains(r#"name="SAMLResponse" value="&lt;saml&gt;""#));
        assert!(html.contains(r#"name="RelayState" value="&quot;&gt;&lt;script&gt;""#));
        assert!(!html.contains("<script>"));
        assert!(html.contains(r#"<form method="post""#));
    }
}
