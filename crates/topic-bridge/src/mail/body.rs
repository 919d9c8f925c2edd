use super::MailMessage;
use crate::error::{BridgeError, BridgeResult};
use mailparse::{DispositionType, ParsedMail};

/// Return the best human-readable body of `message`.
///
/// The first `text/plain` part wins regardless of where any `text/html` part
/// sits in part order. Without a plain part, non-empty raw HTML is returned
/// as-is.
/// Attachment parts are never considered.
pub fn extract_body(message: &MailMessage) -> BridgeResult<String> {
    let raw = message
        .body_section()
        .ok_or_else(|| BridgeError::NoReadableBody("message has no body section".to_string()))?;

    let parsed = mailparse::parse_mail(raw)
        .map_err(|e| BridgeError::NoReadableBody(format!("unparseable message: {}", e)))?;

    let mut html_body = None;
    if let Some(plain) = find_plain_part(&parsed, &mut html_body) {
        return Ok(plain);
    }

    html_body
        .filter(|body| !body.is_empty())
        .ok_or_else(|| BridgeError::NoReadableBody("no text/plain or text/html part".to_string()))
}

/// Depth-first over leaf parts. Returns the first plain body; records the
/// last HTML body seen on the way.
fn find_plain_part(part: &ParsedMail<'_>, html_body: &mut Option<String>) -> Option<String> {
    if part.get_content_disposition().disposition == DispositionType::Attachment {
        return None;
    }

    if !part.subparts.is_empty() {
        return part
            .subparts
            .iter()
            .find_map(|sub| find_plain_part(sub, html_body));
    }

    let mimetype = part.ctype.mimetype.to_lowercase();
    if mimetype != "text/plain" && mimetype != "text/html" {
        return None;
    }

    // An unreadable part is skipped, not fatal
    let body = match part.get_body() {
        Ok(body) => body,
        Err(e) => {
            tracing::debug!("Skipping unreadable {} part: {}", mimetype, e);
            return None;
        }
    };

    if mimetype == "text/plain" {
        Some(body)
    } else {
        *html_body = Some(body);
        None
    }
}

/// Drop quoted reply history: keep the text before the first `"> "` marker.
pub fn strip_quoted(body: &str) -> &str {
    body.split("> ").next().unwrap_or_default().trim()
}
