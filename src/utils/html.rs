// src/utils/html.rs

/// Clean learner or mentor supplied HTML using the ammonia library.
///
/// Whitelist-based: safe formatting tags (<b>, <p>, <em>) survive, while
/// <script>, <iframe> and event-handler attributes are stripped. Essay text
/// and correction comments pass through here before they are stored.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

/// Cleans every entry of a list, keeping order.
pub fn clean_all(inputs: &[String]) -> Vec<String> {
    inputs.iter().map(|s| clean_html(s)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_is_removed() {
        let cleaned = clean_html("<p>Nice work</p><script>alert(1)</script>");
        assert_eq!(cleaned, "<p>Nice work</p>");
    }

    #[test]
    fn test_plain_text_is_untouched() {
        assert_eq!(clean_all(&["Good thesis".to_string()]), vec!["Good thesis"]);
    }
}
