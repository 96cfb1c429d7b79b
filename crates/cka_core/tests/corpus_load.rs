use std::io::Write;

use cka_core::corpus::{load_corpus, parse_corpus};
use cka_core::demo::{fallback_document, FALLBACK_DOCUMENT_ID};
use cka_core::domain::{DocumentOrigin, LOCAL_SOURCE_URL};
use cka_core::trace::Trace;
use pretty_assertions::assert_eq;

fn write_corpus(contents: &str) -> tempfile::NamedTempFile {
    let mut f = tempfile::NamedTempFile::new().expect("tempfile");
    f.write_all(contents.as_bytes()).expect("write");
    f.flush().expect("flush");
    f
}

#[test]
fn loads_fixture_corpus_in_file_order() {
    let path = std::path::PathBuf::from(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../../fixtures/docs_sample.jsonl"
    ));
    let mut trace = Trace::new();
    let load = load_corpus(&path, &mut trace);

    assert!(!load.used_fallback());
    let ids = load.documents.iter().map(|d| d.id.as_str()).collect::<Vec<_>>();
    assert_eq!(ids, vec!["d1", "d2", "d3"]);
    assert_eq!(load.documents[0].source_url, "https://example.org/paracetamol");
    assert_eq!(load.documents[1].source_url, LOCAL_SOURCE_URL);
    assert_eq!(trace.len(), 1);
    assert!(trace.lines()[0].starts_with("Loaded 3 documents"));
}

#[test]
fn skips_malformed_lines_but_keeps_valid_ones() {
    let f = write_corpus(concat!(
        "{\"id\":\"a\",\"text\":\"alpha text\"}\n",
        "\n",
        "not json at all\n",
        "{\"id\":\"\",\"text\":\"blank id\"}\n",
        "{\"id\":\"b\",\"text\":\"   \"}\n",
        "{\"text\":\"missing id\"}\n",
        "{\"id\":\"a\",\"text\":\"duplicate\"}\n",
        "{\"id\":\"c\",\"text\":\"gamma text\",\"url\":\"https://example.org/c\"}\n",
    ));
    let mut trace = Trace::new();
    let load = load_corpus(f.path(), &mut trace);

    assert!(!load.used_fallback());
    let ids = load.documents.iter().map(|d| d.id.as_str()).collect::<Vec<_>>();
    assert_eq!(ids, vec!["a", "c"]);
    let codes = load.warnings.iter().map(|w| w.code.as_str()).collect::<Vec<_>>();
    assert_eq!(
        codes,
        vec![
            "CORPUS_LINE_INVALID",
            "CORPUS_ID_MISSING",
            "CORPUS_TEXT_MISSING",
            "CORPUS_LINE_INVALID",
            "CORPUS_ID_DUPLICATE",
        ]
    );
    assert_eq!(load.warnings[0].line, Some(3));
    assert!(trace.lines()[0].contains("skipped 5 malformed lines"));
}

#[test]
fn missing_file_falls_back_to_builtin_sample() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut trace = Trace::new();
    let load = load_corpus(&dir.path().join("nope.jsonl"), &mut trace);

    assert!(load.used_fallback());
    assert_eq!(load.documents, vec![fallback_document()]);
    assert_eq!(load.documents[0].origin, DocumentOrigin::BuiltinFallback);
    assert!(trace.lines()[0].contains("using built-in sample document"));
    assert!(trace.lines()[0].contains("CORPUS_READ_FAILED"));
}

#[test]
fn file_without_valid_lines_falls_back_to_builtin_sample() {
    let f = write_corpus("garbage\n{\"id\":\"x\"}\n\n");
    let mut trace = Trace::new();
    let load = load_corpus(f.path(), &mut trace);

    assert!(load.used_fallback());
    assert_eq!(load.documents.len(), 1);
    assert_eq!(load.documents[0].id, FALLBACK_DOCUMENT_ID);
    assert!(load.fallback_reason.as_deref().unwrap_or("").contains("CORPUS_EMPTY"));
}

#[test]
fn corpus_records_cannot_claim_builtin_origin() {
    let parsed = parse_corpus(
        "{\"id\":\"sample_1\",\"text\":\"a real document\",\"origin\":\"builtin_fallback\"}\n",
    );
    assert_eq!(parsed.documents.len(), 1);
    assert_eq!(parsed.documents[0].origin, DocumentOrigin::Corpus);
}

#[test]
fn ids_are_trimmed_before_duplicate_check() {
    let parsed = parse_corpus(concat!(
        "{\"id\":\"  d1 \",\"text\":\"first\"}\n",
        "{\"id\":\"d1\",\"text\":\"second\"}\n",
        "{\"id\":\" d2\",\"text\":\"third\"}\n",
    ));
    let ids = parsed.documents.iter().map(|d| d.id.as_str()).collect::<Vec<_>>();
    assert_eq!(ids, vec!["d1", "d2"]);
    assert_eq!(parsed.documents[0].text, "first");
    assert_eq!(parsed.warnings.len(), 1);
    assert_eq!(parsed.warnings[0].code, "CORPUS_ID_DUPLICATE");
    assert_eq!(parsed.warnings[0].line, Some(2));
}
