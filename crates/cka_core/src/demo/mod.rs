use crate::domain::{Document, DocumentOrigin};

pub const FALLBACK_DOCUMENT_ID: &str = "sample_1";

const FALLBACK_DOCUMENT_TEXT: &str = "Paracetamol is used for fever and pain. Standard adult dosing guidance is 500-1000 mg every 4-6 hours.";

/// The single document substituted when the configured corpus cannot be loaded.
pub fn fallback_document() -> Document {
    Document::new(FALLBACK_DOCUMENT_ID, FALLBACK_DOCUMENT_TEXT).with_origin(DocumentOrigin::BuiltinFallback)
}

/// Small clinical corpus for tests that need more than one document. Ids are stable.
pub fn demo_corpus() -> Vec<Document> {
    let rows = [
        (
            "paracetamol_dosing",
            "Paracetamol dosing for adults is 500-1000 mg every 4-6 hours with a maximum of 4 g per day. Reduce the maximum in hepatic impairment.",
        ),
        (
            "ibuprofen_cautions",
            "Ibuprofen should be avoided in patients with active peptic ulcer disease and used with caution in renal impairment or heart failure.",
        ),
        (
            "amoxicillin_otitis",
            "Amoxicillin is first line for acute otitis media in children when antibiotics are indicated. Typical course length is 5 to 10 days.",
        ),
        (
            "sepsis_bundle",
            "The sepsis bundle includes lactate measurement, blood cultures before antibiotics, broad spectrum antibiotics and fluid resuscitation for hypotension.",
        ),
    ];
    rows.iter()
        .map(|(id, text)| Document::new(*id, *text))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn demo_corpus_is_ordinary_corpus_with_unique_ids() {
        let docs = demo_corpus();
        let ids = docs.iter().map(|d| d.id.as_str()).collect::<BTreeSet<_>>();
        assert_eq!(ids.len(), docs.len());
        assert!(!ids.contains(FALLBACK_DOCUMENT_ID));
        assert!(docs.iter().all(|d| d.origin == DocumentOrigin::Corpus));
        assert_eq!(fallback_document().origin, DocumentOrigin::BuiltinFallback);
    }
}
