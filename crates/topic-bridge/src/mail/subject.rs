/// Subject line for a reply to a message titled `subject`.
///
/// Subjects already starting with the literal `Re:` are kept as they are;
/// the check is case-sensitive. An empty subject yields `"Re: "`.
pub fn build_reply_subject(subject: &str) -> String {
    if subject.starts_with("Re:") {
        subject.to_string()
    } else {
        format!("Re: {}", subject)
    }
}
