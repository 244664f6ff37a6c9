//! End-to-end rendering of raw metadata through the built-in styles.

use papervista_citeproc::{OutputFormat, RulesEngine, RulesFailure, normalize};
use serde_json::{Value, json};

fn attention() -> Value {
    json!({
        "id": "VASWANI_2017",
        "type": "paper-conference",
        "title": "Attention Is All You Need",
        "author": [
            {"family": "Vaswani", "given": "Ashish"},
            {"family": "Shazeer", "given": "Noam"},
            {"family": "Parmar", "given": "Niki"}
        ],
        "issued": {"date-parts": [[2017]]},
        "container-title": "Advances in Neural Information Processing Systems",
        "volume": "30",
        "page": "5998-6008",
        "URL": "https://arxiv.org/abs/1706.03762"
    })
}

fn render(raw: &Value, style: &str) -> String {
    let record = normalize(raw).unwrap();
    RulesEngine::builtin()
        .render(&record, style, OutputFormat::Plain)
        .unwrap()
}

#[test]
fn test_minimal_record_renders_in_apa() {
    let raw = json!({
        "id": "X1",
        "title": "Attention Is All You Need",
        "authors": [{"family": "Vaswani", "given": "Ashish"}],
        "issued": [2017]
    });
    insta::assert_snapshot!(render(&raw, "apa"), @"Vaswani, A. (2017). Attention Is All You Need.");
}

#[test]
fn test_apa() {
    insta::assert_snapshot!(
        render(&attention(), "apa"),
        @"Vaswani, A., Shazeer, N., & Parmar, N. (2017). Attention Is All You Need. In Advances in Neural Information Processing Systems (pp. 5998–6008). https://arxiv.org/abs/1706.03762"
    );
}

#[test]
fn test_mla() {
    insta::assert_snapshot!(
        render(&attention(), "mla"),
        @"Vaswani, Ashish et al. “Attention Is All You Need.” Advances in Neural Information Processing Systems, vol. 30, 2017, pp. 5998–6008. https://arxiv.org/abs/1706.03762."
    );
}

#[test]
fn test_ieee() {
    insta::assert_snapshot!(
        render(&attention(), "ieee"),
        @"A. Vaswani, N. Shazeer, and N. Parmar, “Attention Is All You Need,” in Advances in Neural Information Processing Systems, vol. 30, pp. 5998–6008, 2017. [Online]. Available: https://arxiv.org/abs/1706.03762"
    );
}

#[test]
fn test_chicago_author_date() {
    insta::assert_snapshot!(
        render(&attention(), "chicago-author-date"),
        @"Vaswani, Ashish, Noam Shazeer, and Niki Parmar. 2017. “Attention Is All You Need.” In Advances in Neural Information Processing Systems, 5998–6008. https://arxiv.org/abs/1706.03762."
    );
}

#[test]
fn test_harvard() {
    insta::assert_snapshot!(
        render(&attention(), "harvard"),
        @"Vaswani, A., Shazeer, N. and Parmar, N. (2017) “Attention Is All You Need,” Advances in Neural Information Processing Systems, 30, pp. 5998–6008. Available at: https://arxiv.org/abs/1706.03762."
    );
}

#[test]
fn test_journal_article_in_apa() {
    let raw = json!({
        "id": "LECUN_2015",
        "type": "article-journal",
        "title": "Deep learning",
        "author": [
            {"family": "LeCun", "given": "Yann"},
            {"family": "Bengio", "given": "Yoshua"},
            {"family": "Hinton", "given": "Geoffrey"}
        ],
        "issued": {"date_parts": [[2015, 5, 28]]},
        "container_title": "Nature",
        "volume": 521,
        "issue": "7553",
        "page": "436-444"
    });
    insta::assert_snapshot!(
        render(&raw, "apa"),
        @"LeCun, Y., Bengio, Y., & Hinton, G. (2015). Deep learning. Nature, 521(7553), 436–444."
    );
}

#[test]
fn test_html_output_marks_up_container() {
    let record = normalize(&attention()).unwrap();
    let html = RulesEngine::builtin()
        .render(&record, "apa", OutputFormat::Html)
        .unwrap();
    assert!(
        html.contains("<i>Advances in Neural Information Processing Systems</i>"),
        "Got: {}",
        html
    );
    assert!(
        html.contains(r#"<a href="https://arxiv.org/abs/1706.03762">"#),
        "Got: {}",
        html
    );
}

#[test]
fn test_rendering_is_deterministic() {
    let record = normalize(&attention()).unwrap();
    let engine = RulesEngine::builtin();
    for style in engine.style_names() {
        let first = engine.render(&record, &style, OutputFormat::Plain).unwrap();
        let second = engine.render(&record, &style, OutputFormat::Plain).unwrap();
        assert_eq!(first, second, "style {} is not deterministic", style);
    }
}

#[test]
fn test_incomplete_record_is_missing_data() {
    // Accepted by the normalizer, but has no issued year
    let raw = json!({
        "id": "X3",
        "title": "Untimed",
        "author": [{"family": "Doe"}]
    });
    let record = normalize(&raw).unwrap();
    let err = RulesEngine::builtin()
        .render(&record, "apa", OutputFormat::Plain)
        .unwrap_err();
    assert!(matches!(err, RulesFailure::MissingData(_)));
}

#[test]
fn test_empty_record_fails_normalization_as_missing_data() {
    let raw = json!({"id": "X2", "title": "", "authors": [], "issued": []});
    let err: RulesFailure = normalize(&raw).unwrap_err().into();
    assert!(matches!(err, RulesFailure::MissingData(_)));
}

#[test]
fn test_unknown_style() {
    let record = normalize(&attention()).unwrap();
    let err = RulesEngine::builtin()
        .render(&record, "klingon", OutputFormat::Plain)
        .unwrap_err();
    assert_eq!(err, RulesFailure::UnknownStyle("klingon".to_string()));
}
