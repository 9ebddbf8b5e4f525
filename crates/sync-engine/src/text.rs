//! Message templates.

/// Chat text for a top-level annotation.
pub fn root_message_text(user: &str, text: &str, selection: &str, link: &str) -> String {
    format!("{} selected \"{}\" and wrote \"{}\"\n{}", user, selection, text, link)
}

/// Chat text for an annotation that replies to another one.
pub fn reply_message_text(user: &str, text: &str, link: &str) -> String {
    format!("{} wrote \"{}\"\n{}", user, text, link)
}

/// Annotation text for a chat reply.
pub fn chat_reply_annotation_text(author: &str, text: &str) -> String {
    format!("{} wrote \"{}\"", author, text)
}

/// Share link for an annotation.
pub fn annotation_link(base: &str, annotation_id: &str) -> String {
    format!("{}{}", base, annotation_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_text() {
        assert_eq!(
            root_message_text("acct:alice@hypothes.is", "nice", "a quote", "https://hypothes.is/a/A1"),
            "acct:alice@hypothes.is selected \"a quote\" and wrote \"nice\"\nhttps://hypothes.is/a/A1"
        );
    }

    #[test]
    fn reply_text() {
        assert_eq!(
            reply_message_text("bob", "agreed", "https://hypothes.is/a/A2"),
            "bob wrote \"agreed\"\nhttps://hypothes.is/a/A2"
        );
    }

    #[test]
    fn chat_reply_text() {
        assert_eq!(
            chat_reply_annotation_text("Ann Lee (ann)", "hi"),
            "Ann Lee (ann) wrote \"hi\""
        );
    }
}
