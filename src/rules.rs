// 🏷️ Keyword Rules - deterministic heuristic classifier
// Longest-keyword substring matching over an ordered bucket table

use crate::category::{short_name, Category, Classification};

// ============================================================================
// BUCKET TABLE
// ============================================================================

/// Buckets are tried in this order; the first bucket with any matching
/// keyword wins. Buckets holding compound keywords ("toilet paper",
/// "shampoo", "ice cream") come before buckets whose short keywords
/// ("oil", "ham", "cream") would otherwise match inside them.
pub const HEURISTIC_BUCKETS: &[(Category, &[&str])] = &[
    (
        Category::Household,
        &["detergent", "paper towel", "toilet paper", "trash bag", "cleaner", "bleach", "dish soap"],
    ),
    (
        Category::PersonalCare,
        &["shampoo", "soap", "toothpaste", "deodorant", "razor", "lotion", "conditioner"],
    ),
    (
        Category::Frozen,
        &["ice cream", "popsicle", "frozen", "ice-cream", "icecream"],
    ),
    (
        Category::Meat,
        &["chicken", "beef", "pork", "steak", "bacon", "sausage", "turkey", "ham", "lamb"],
    ),
    (
        Category::Seafood,
        &["salmon", "shrimp", "tuna", "cod", "crab", "lobster", "scallop"],
    ),
    (
        Category::Produce,
        &[
            "banana", "apple", "spinach", "lettuce", "tomato", "onion", "potato", "carrot",
            "berry", "fruit", "vegetable",
        ],
    ),
    (
        Category::Dairy,
        &["milk", "yogurt", "cheese", "butter", "cream", "eggs", "egg"],
    ),
    (
        Category::Bakery,
        &["bread", "bagel", "sourdough", "dough", "bun", "roll", "croissant"],
    ),
    (
        Category::Pantry,
        &[
            "rice", "pasta", "canned", "beans", "sauce", "oil", "vinegar", "flour", "sugar",
            "spice", "cereal",
        ],
    ),
    (
        Category::Snacks,
        &["chip", "chips", "cracker", "cookie", "chocolate", "popcorn", "granola"],
    ),
    (
        Category::Beverages,
        &["juice", "soda", "cola", "water", "beer", "wine", "coffee", "tea"],
    ),
];

// ============================================================================
// KEYWORD BUCKET
// ============================================================================

#[derive(Debug, Clone)]
pub struct KeywordBucket {
    pub category: Category,

    /// Lowercased keywords, longest first (ties keep table order)
    keywords: Vec<String>,
}

impl KeywordBucket {
    pub fn new(category: Category, keywords: &[&str]) -> Self {
        let mut keywords: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();
        // Stable sort, so equal-length keywords stay in declaration order
        keywords.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));
        KeywordBucket { category, keywords }
    }

    /// First (longest) keyword contained in the lowercased text
    pub fn matching_keyword(&self, lowered: &str) -> Option<&str> {
        self.keywords
            .iter()
            .find(|keyword| lowered.contains(keyword.as_str()))
            .map(String::as_str)
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }
}

// ============================================================================
// HEURISTIC CLASSIFIER
// ============================================================================

#[derive(Debug, Clone)]
pub struct HeuristicClassifier {
    buckets: Vec<KeywordBucket>,
}

impl HeuristicClassifier {
    /// Classifier over the built-in bucket table
    pub fn new() -> Self {
        HeuristicClassifier::from_buckets(HEURISTIC_BUCKETS)
    }

    pub fn from_buckets(table: &[(Category, &[&str])]) -> Self {
        let buckets = table
            .iter()
            .map(|(category, keywords)| KeywordBucket::new(*category, keywords))
            .collect();
        HeuristicClassifier { buckets }
    }

    /// Total: items matching no bucket come back as Misc.
    pub fn classify(&self, item: &str) -> Classification {
        let lowered = item.to_lowercase();

        for bucket in &self.buckets {
            if let Some(keyword) = bucket.matching_keyword(&lowered) {
                log::debug!(
                    "heuristic: '{}' matched keyword '{}' -> {}",
                    item.trim(),
                    keyword,
                    bucket.category
                );
                return Classification::new(bucket.category, short_name(item));
            }
        }

        log::debug!("heuristic: '{}' matched no bucket -> Misc", item.trim());
        Classification::misc(item)
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}

impl Default for HeuristicClassifier {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_longest_keyword_wins() {
        let classifier = HeuristicClassifier::new();
        let result = classifier.classify("ice cream sandwich");
        assert_eq!(result.category, Category::Frozen);
        assert_eq!(result.normalized_name, "Ice Cream Sandwich");
    }

    #[test]
    fn test_keywords_sorted_longest_first_stable() {
        let bucket = KeywordBucket::new(Category::Snacks, &["chip", "chips", "corn", "popcorn"]);
        assert_eq!(bucket.keywords(), &["popcorn", "chips", "chip", "corn"]);
    }

    #[test]
    fn test_longest_match_within_bucket() {
        let classifier = HeuristicClassifier::from_buckets(&[(Category::Frozen, &["ice", "ice cream"])]);
        let bucket = &classifier.buckets[0];
        assert_eq!(bucket.matching_keyword("vanilla ice cream"), Some("ice cream"));
        assert_eq!(bucket.matching_keyword("bag of ice"), Some("ice"));
    }

    #[test]
    fn test_first_bucket_wins() {
        let classifier = HeuristicClassifier::from_buckets(&[
            (Category::Dairy, &["cream"]),
            (Category::Frozen, &["ice cream"]),
        ]);
        assert_eq!(classifier.classify("ice cream").category, Category::Dairy);
    }

    #[test]
    fn test_common_items() {
        let classifier = HeuristicClassifier::new();
        assert_eq!(classifier.classify("salmon fillet").category, Category::Seafood);
        assert_eq!(classifier.classify("Bananas").category, Category::Produce);
        assert_eq!(classifier.classify("greek yogurt").category, Category::Dairy);
        assert_eq!(classifier.classify("sour dough").category, Category::Bakery);
        assert_eq!(classifier.classify("toilet paper").category, Category::Household);
        assert_eq!(classifier.classify("shampoo").category, Category::PersonalCare);
        assert_eq!(classifier.classify("dish soap").category, Category::Household);
        assert_eq!(classifier.classify("hand soap").category, Category::PersonalCare);
    }

    #[test]
    fn test_case_insensitive() {
        let classifier = HeuristicClassifier::new();
        assert_eq!(classifier.classify("MILK").category, Category::Dairy);
        assert_eq!(classifier.classify("MILK").normalized_name, "Milk");
    }

    #[test]
    fn test_no_match_defaults_to_misc() {
        let classifier = HeuristicClassifier::new();
        let result = classifier.classify("quirky item");
        assert_eq!(result.category, Category::Misc);
        assert_eq!(result.normalized_name, "Quirky Item");
    }

    #[test]
    fn test_name_truncated_to_three_words() {
        let classifier = HeuristicClassifier::new();
        let result = classifier.classify("organic baby spinach family pack");
        assert_eq!(result.category, Category::Produce);
        assert_eq!(result.normalized_name, "Organic Baby Spinach");
    }

    #[test]
    fn test_deterministic() {
        let classifier = HeuristicClassifier::new();
        assert_eq!(classifier.classify("chicken thighs"), classifier.classify("chicken thighs"));
        assert_eq!(classifier.bucket_count(), HEURISTIC_BUCKETS.len());
    }
}
