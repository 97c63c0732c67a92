//! Producing upstream-shaped transport text.
//!
//! The streaming endpoint emits a JSON object whose `arguments` field is a
//! string holding the model's JSON document (`{"message": ..., "steps": [...]}`).
//! [`encode_frame`] builds exactly that shape so replay files, the offline
//! stub, and tests all exercise the real parser.

use canvas::{ShapeType, Side};

use crate::model::{DiagramElement, Link, Node};

/// Encode `narration` and `elements` the way the streaming endpoint would.
///
/// # Errors
///
/// Returns the serializer error if an element cannot be encoded.
pub fn encode_frame(narration: Option<&str>, elements: &[DiagramElement]) -> Result<String, serde_json::Error> {
    let mut inner = String::from("{");
    if let Some(text) = narration {
        inner.push_str("\"message\": ");
        inner.push_str(&serde_json::to_string(text)?);
        inner.push_str(", ");
    }
    inner.push_str("\"steps\": [\n");
    for (i, element) in elements.iter().enumerate() {
        if i > 0 {
            inner.push_str(",\n");
        }
        inner.push_str("  ");
        inner.push_str(&serde_json::to_string(element)?);
    }
    inner.push_str("\n]}");

    let arguments = serde_json::to_string(&inner)?;
    Ok(format!("{{\"arguments\": {arguments}}}"))
}

// =============================================================================
// SAMPLE DIAGRAM
// =============================================================================

fn node(id: &str, label: &str, shape: ShapeType) -> Node {
    Node { id: id.to_owned(), label: label.to_owned(), shape }
}

fn edge(from: &Node, label: &str, to: &Node, magnets: Option<(Side, Side)>) -> DiagramElement {
    DiagramElement {
        from: from.clone(),
        link: Link {
            label: label.to_owned(),
            condition: None,
            from_magnet: magnets.map(|(from, _)| from),
            to_magnet: magnets.map(|(_, to)| to),
        },
        to: to.clone(),
    }
}

/// A fourteen-step sign-up flow used by the offline stub source.
///
/// A few steps carry side hints, so the sample also exercises the
/// suggested-anchor policy.
#[must_use]
pub fn sample_sign_up_flow() -> Vec<DiagramElement> {
    let start = node("start", "Start", ShapeType::Ellipse);
    let form = node("form", "Open sign-up form", ShapeType::RoundedRectangle);
    let details = node("details", "Enter email and password", ShapeType::ParallelogramRight);
    let valid = node("valid", "Input valid?", ShapeType::Diamond);
    let error = node("error", "Show validation error", ShapeType::RoundedRectangle);
    let exists = node("exists", "Account exists?", ShapeType::Diamond);
    let signin = node("signin", "Offer sign-in", ShapeType::RoundedRectangle);
    let create = node("create", "Create account", ShapeType::RoundedRectangle);
    let db = node("db", "Users table", ShapeType::EngineeringDatabase);
    let mail = node("mail", "Send verification email", ShapeType::EngineeringQueue);
    let verified = node("verified", "Email verified?", ShapeType::Diamond);
    let resend = node("resend", "Resend link", ShapeType::RoundedRectangle);
    let welcome = node("welcome", "Show welcome screen", ShapeType::Ellipse);

    vec![
        edge(&start, "", &form, None),
        edge(&form, "", &details, None),
        edge(&details, "submit", &valid, None),
        edge(&valid, "no", &error, Some((Side::Bottom, Side::Top))),
        edge(&error, "retry", &details, Some((Side::Bottom, Side::Bottom))),
        edge(&valid, "yes", &exists, None),
        edge(&exists, "yes", &signin, Some((Side::Bottom, Side::Top))),
        edge(&exists, "no", &create, None),
        edge(&create, "insert", &db, Some((Side::Bottom, Side::Top))),
        edge(&create, "", &mail, None),
        edge(&mail, "", &verified, None),
        edge(&verified, "no", &resend, Some((Side::Bottom, Side::Top))),
        edge(&resend, "", &mail, Some((Side::Bottom, Side::Bottom))),
        edge(&verified, "yes", &welcome, None),
    ]
}

#[cfg(test)]
#[path = "payload_test.rs"]
mod tests;
