/// Heuristic spam scoring for guestbook submissions
///
/// Every submission gets a deterministic integer score. Entries scoring at or
/// above [`SPAM_THRESHOLD`] are stored flagged with `is_spam = true` and kept
/// out of public listings until a moderator reviews them; everything else is
/// auto-approved.
///
/// The heuristics are intentionally simple: keyword hits, excessive links,
/// and all-caps shouting. They catch drive-by form spam, not determined
/// abuse; moderation endpoints exist for the rest.

/// Score at which a submission is considered spam
pub const SPAM_THRESHOLD: u32 = 5;

/// Phrases that strongly correlate with guestbook spam
const SPAM_KEYWORDS: &[&str] = &[
    "buy now",
    "click here",
    "free money",
    "casino",
    "viagra",
    "crypto giveaway",
    "limited offer",
    "work from home",
    "earn $$$",
];

/// Scores a guestbook submission
///
/// - +3 per spam keyword found in the message or name
/// - +2 per link beyond the first
/// - +3 if the message is mostly uppercase shouting
/// - +1 if the message is a bare link with no other content
///
/// # Example
///
/// ```
/// use cosmic_shared::spam::{spam_score, SPAM_THRESHOLD};
///
/// assert!(spam_score("Great site, love the projects!", "Ada") < SPAM_THRESHOLD);
/// assert!(spam_score("BUY NOW!!! free money at http://a.example http://b.example", "x") >= SPAM_THRESHOLD);
/// ```
pub fn spam_score(message: &str, name: &str) -> u32 {
    let mut score = 0u32;

    let haystack = format!("{} {}", message, name).to_lowercase();
    for keyword in SPAM_KEYWORDS {
        if haystack.contains(keyword) {
            score += 3;
        }
    }

    let link_count = message.matches("http://").count() + message.matches("https://").count();
    if link_count > 1 {
        score += 2 * (link_count as u32 - 1);
    }

    let letters: Vec<char> = message.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.len() > 20 {
        let upper = letters.iter().filter(|c| c.is_uppercase()).count();
        if upper * 10 > letters.len() * 7 {
            score += 3;
        }
    }

    if link_count >= 1 && message.trim().split_whitespace().count() <= 2 {
        score += 1;
    }

    score
}

/// Whether a score crosses the spam threshold
pub fn is_spam(score: u32) -> bool {
    score >= SPAM_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_message_scores_low() {
        let score = spam_score("Really enjoyed browsing your portfolio, keep it up!", "Grace");
        assert!(!is_spam(score));
        assert_eq!(score, 0);
    }

    #[test]
    fn test_keywords_accumulate() {
        let score = spam_score("buy now and click here for free money", "promo");
        assert!(score >= 9);
        assert!(is_spam(score));
    }

    #[test]
    fn test_multiple_links_penalized() {
        let single = spam_score("check out my site https://example.com it has demos", "dev");
        let several = spam_score(
            "https://a.example https://b.example https://c.example great deals",
            "dev",
        );
        assert!(single < several);
        assert!(!is_spam(single));
    }

    #[test]
    fn test_shouting_penalized() {
        let score = spam_score("THIS IS AN EXTREMELY IMPORTANT ANNOUNCEMENT FOR EVERYONE", "x");
        assert_eq!(score, 3);
        assert!(!is_spam(score));
    }

    #[test]
    fn test_keyword_in_name_counts() {
        assert!(spam_score("hello there, nice work on the site", "casino royale") >= 3);
    }

    #[test]
    fn test_threshold_boundary() {
        assert!(!is_spam(SPAM_THRESHOLD - 1));
        assert!(is_spam(SPAM_THRESHOLD));
    }
}
