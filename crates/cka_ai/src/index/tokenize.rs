use std::collections::BTreeMap;

/// Whitespace tokenization. A token survives only if every character is alphanumeric; survivors
/// are lower-cased. "500-1000" and "hours." are dropped, "Paracetamol" becomes "paracetamol".
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .filter(|t| t.chars().all(char::is_alphanumeric))
        .map(str::to_lowercase)
        .collect()
}

pub fn term_counts(text: &str) -> BTreeMap<String, u32> {
    let mut counts = BTreeMap::new();
    for token in tokenize(text) {
        *counts.entry(token).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn drops_tokens_with_punctuation_and_folds_case() {
        assert_eq!(
            tokenize("Paracetamol dosing is 500-1000 mg every 4-6 hours."),
            vec!["paracetamol", "dosing", "is", "mg", "every"]
        );
        assert_eq!(tokenize("  \n\t "), Vec::<String>::new());
        assert_eq!(tokenize("Ärzte ÜBER 40"), vec!["ärzte", "über", "40"]);
    }

    #[test]
    fn counts_repeated_terms() {
        let c = term_counts("dose DOSE dose, dose");
        assert_eq!(c.get("dose"), Some(&3));
        assert_eq!(c.len(), 1);
    }
}
