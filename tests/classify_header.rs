mod common;

use common::{context, fakes, test_config};
use lab_ingest::{classify::Classification, template::TemplateVariant};
use std::path::Path;

#[test]
fn header_marker_selects_template() {
    let cfg = test_config();
    let ctx = context(cfg.clone());
    let (renderer, recognizer) = fakes(&cfg);
    let recognizer = recognizer
        .header("cc.pdf", "Patient MEDICAL RECORD copy")
        .header("ml.pdf", "medlab\n");

    let cc = ctx.classifier.classify(&renderer, &recognizer, Path::new("cc.pdf"));
    let ml = ctx.classifier.classify(&renderer, &recognizer, Path::new("ml.pdf"));
    assert_eq!(cc.template(), Some(TemplateVariant::Cc));
    assert_eq!(ml.template(), Some(TemplateVariant::MedLab));

    // only the header region was read, with the header options
    let calls = recognizer.calls.borrow();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|c| c.options.segmentation_mode == 3));
    let header = ctx.classifier.header_box().to_pixels(cfg.render.dpi);
    assert_eq!(calls[0].dims, (header.width(), header.height()));
}

#[test]
fn unmatched_header_is_unknown() {
    let cfg = test_config();
    let ctx = context(cfg.clone());
    let (renderer, recognizer) = fakes(&cfg);
    let recognizer = recognizer.header("x.pdf", "QUARTERLY INVOICE");

    let c = ctx.classifier.classify(&renderer, &recognizer, Path::new("x.pdf"));
    assert!(matches!(c, Classification::Unknown { .. }));
}

#[test]
fn render_failure_becomes_unknown() {
    let cfg = test_config();
    let ctx = context(cfg.clone());
    let (renderer, recognizer) = fakes(&cfg);
    let renderer = renderer.fail_for("broken.pdf");

    let c = ctx
        .classifier
        .classify(&renderer, &recognizer, Path::new("broken.pdf"));
    match c {
        Classification::Unknown { reason } => assert!(reason.contains("corrupt document")),
        other => panic!("expected unknown, got {other:?}"),
    }
    assert!(recognizer.calls.borrow().is_empty());
}

#[test]
fn fallback_template_applies_when_configured() {
    let mut cfg = test_config();
    cfg.classifier.fallback = Some(TemplateVariant::MedLab);
    let ctx = context(cfg.clone());
    let (renderer, recognizer) = fakes(&cfg);

    let c = ctx.classifier.classify(&renderer, &recognizer, Path::new("x.pdf"));
    assert_eq!(c.template(), Some(TemplateVariant::MedLab));
}

#[test]
fn classification_serializes_with_status_tag() {
    let known = Classification::Known {
        template: TemplateVariant::Cc,
    };
    assert_eq!(
        serde_json::to_value(&known).unwrap(),
        serde_json::json!({"status": "known", "template": "cc"})
    );
}
