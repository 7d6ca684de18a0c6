use lab_ingest::{
    error::IngestError,
    registry::{PageBox, PixelBox, REFERENCE_DPI, RegionRegistry},
    template::{Field, TemplateVariant},
};

#[test]
fn builtin_registry_covers_both_templates() {
    let registry = RegionRegistry::builtin().unwrap();
    assert_eq!(
        registry.variants().collect::<Vec<_>>(),
        vec![TemplateVariant::Cc, TemplateVariant::MedLab]
    );

    let cc = registry.regions_for(TemplateVariant::Cc).unwrap();
    let medlab = registry.regions_for(TemplateVariant::MedLab).unwrap();
    assert_eq!(cc.len(), 9);
    assert_eq!(medlab.len(), 10);
    assert!(!cc.iter().any(|r| r.field == Field::SpecimenType));
    assert!(medlab.iter().any(|r| r.field == Field::SpecimenType));
    assert!(
        cc.iter()
            .chain(medlab)
            .all(|r| r.field != Field::TestDevice)
    );
}

#[test]
fn options_are_block_mode_with_gender_whitelist() {
    let registry = RegionRegistry::builtin().unwrap();
    for variant in TemplateVariant::ALL {
        for region in registry.regions_for(variant).unwrap() {
            assert_eq!(region.options.engine_mode, 3);
            assert_eq!(region.options.segmentation_mode, 6);
            let expected = (region.field == Field::Gender).then_some("FM");
            assert_eq!(region.options.char_whitelist.as_deref(), expected);
        }
    }
}

#[test]
fn reference_boxes_round_trip_at_reference_dpi() {
    let registry = RegionRegistry::builtin().unwrap();
    let mr = registry.regions_for(TemplateVariant::MedLab).unwrap();
    let result = mr.iter().find(|r| r.field == Field::TestResult).unwrap();
    assert_eq!(
        result.bbox.to_pixels(REFERENCE_DPI),
        PixelBox::new(1295, 1119, 2087, 1172)
    );

    for x in (0..2550).step_by(17) {
        for y in (0..3300).step_by(23) {
            let px = PixelBox::new(x, y, x + 1, y + 1);
            let bbox = PageBox::from_reference_pixels(px).unwrap();
            assert_eq!(bbox.to_pixels(REFERENCE_DPI), px);
        }
    }
}

#[test]
fn boxes_scale_with_dpi() {
    let bbox = PageBox::from_reference_pixels(PixelBox::new(600, 300, 1200, 900)).unwrap();
    assert_eq!(bbox.to_pixels(150), PixelBox::new(300, 150, 600, 450));
    assert_eq!(bbox.to_pixels(600), PixelBox::new(1200, 600, 2400, 1800));
}

#[test]
fn duplicate_field_is_rejected() {
    let err = RegionRegistry::builder()
        .region(TemplateVariant::Cc, Field::Mrn, [0, 0, 10, 10])
        .region(TemplateVariant::Cc, Field::Mrn, [20, 20, 30, 30])
        .build()
        .unwrap_err();
    assert!(matches!(err, IngestError::InvalidRegistry(msg) if msg.contains("duplicate field mrn")));
}

#[test]
fn same_field_in_two_templates_is_fine() {
    let registry = RegionRegistry::builder()
        .region(TemplateVariant::Cc, Field::Mrn, [0, 0, 10, 10])
        .region(TemplateVariant::MedLab, Field::Mrn, [20, 20, 30, 30])
        .build()
        .unwrap();
    assert_eq!(registry.regions_for(TemplateVariant::MedLab).unwrap().len(), 1);
}

#[test]
fn invalid_boxes_are_rejected() {
    let inverted = RegionRegistry::builder()
        .region(TemplateVariant::Cc, Field::Gender, [100, 100, 50, 150])
        .build()
        .unwrap_err();
    assert!(matches!(inverted, IngestError::InvalidRegistry(msg) if msg.starts_with("cc.gender:")));

    let off_page = RegionRegistry::builder()
        .region(TemplateVariant::MedLab, Field::Gender, [2500, 3200, 2600, 3290])
        .build()
        .unwrap_err();
    assert!(matches!(off_page, IngestError::InvalidRegistry(_)));
}

#[test]
fn missing_template_is_unknown_variant() {
    let registry = RegionRegistry::builder()
        .region(TemplateVariant::Cc, Field::Mrn, [0, 0, 10, 10])
        .build()
        .unwrap();
    assert!(matches!(
        registry.regions_for(TemplateVariant::MedLab),
        Err(IngestError::UnknownVariant(TemplateVariant::MedLab))
    ));
}
