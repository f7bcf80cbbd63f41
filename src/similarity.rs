use std::collections::HashSet;

/// Lowercased, whitespace-separated distinct tokens. Punctuation stays attached.
fn tokens(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Jaccard similarity between the word sets of two posts (0.0 - 1.0).
///
/// Two texts without any tokens score 0.0 rather than dividing by zero.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = tokens(a);
    let b = tokens(b);

    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }

    let intersection = a.intersection(&b).count();
    intersection as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_similarity_identical() {
        assert_eq!(similarity("Treasury clarity for DAOs", "Treasury clarity for DAOs"), 1.0);
    }

    #[test]
    fn test_similarity_case_insensitive() {
        assert_eq!(similarity("Treasury Clarity", "treasury clarity"), 1.0);
    }

    #[test]
    fn test_similarity_empty() {
        assert_eq!(similarity("", ""), 0.0);
        assert_eq!(similarity("   \n\t", ""), 0.0);
        assert_eq!(similarity("", "something"), 0.0);
    }

    #[test]
    fn test_similarity_disjoint() {
        assert_eq!(similarity("multi-sig wallets", "runway optimization"), 0.0);
    }

    #[test]
    fn test_similarity_symmetric() {
        let a = "DAOs with dashboards see higher participation #DAO";
        let b = "DAOs without dashboards see lower participation";
        assert_eq!(similarity(a, b), similarity(b, a));
    }

    #[test]
    fn test_similarity_partial_overlap() {
        // {a, b, c} vs {b, c, d}: 2 shared out of 4
        assert!((similarity("a b c", "b c d") - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_similarity_punctuation_is_part_of_token() {
        // "growth" and "growth!" are different tokens
        let score = similarity("dao growth", "dao growth!");
        assert!((score - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_similarity_duplicate_words_collapse() {
        assert_eq!(similarity("dao dao dao", "dao"), 1.0);
    }

    #[test]
    fn test_similarity_grows_with_shared_tokens() {
        let base = "one two three four five";
        let low = similarity(base, "one six seven eight nine");
        let high = similarity(base, "one two three eight nine");
        assert!(high > low);
    }
}
