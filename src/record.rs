use crate::template::{Field, TemplateVariant};
use serde::{Deserialize, Serialize};

/// Per-field values of one lab report. `None` means the template has no
/// region for the field; an empty string means the region was read but held
/// no recognizable text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldValues {
    pub patient_name: Option<String>,
    pub date_of_birth: Option<String>,
    pub gender: Option<String>,
    pub mrn: Option<String>,
    pub test_name: Option<String>,
    pub test_device: Option<String>,
    pub specimen_type: Option<String>,
    pub collection_date: Option<String>,
    pub tested_pathogen: Option<String>,
    pub test_result: Option<String>,
    pub reported_date: Option<String>,
}

impl FieldValues {
    pub fn get(&self, field: Field) -> Option<&str> {
        self.slot(field).as_deref()
    }

    pub fn set(&mut self, field: Field, value: String) {
        *self.slot_mut(field) = Some(value);
    }

    /// Fields that carry a value, in column order.
    pub fn present(&self) -> impl Iterator<Item = (Field, &str)> + '_ {
        Field::ALL
            .into_iter()
            .filter_map(move |f| self.get(f).map(|v| (f, v)))
    }

    fn slot(&self, field: Field) -> &Option<String> {
        match field {
            Field::PatientName => &self.patient_name,
            Field::DateOfBirth => &self.date_of_birth,
            Field::Gender => &self.gender,
            Field::Mrn => &self.mrn,
            Field::TestName => &self.test_name,
            Field::TestDevice => &self.test_device,
            Field::SpecimenType => &self.specimen_type,
            Field::CollectionDate => &self.collection_date,
            Field::TestedPathogen => &self.tested_pathogen,
            Field::TestResult => &self.test_result,
            Field::ReportedDate => &self.reported_date,
        }
    }

    fn slot_mut(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::PatientName => &mut self.patient_name,
            Field::DateOfBirth => &mut self.date_of_birth,
            Field::Gender => &mut self.gender,
            Field::Mrn => &mut self.mrn,
            Field::TestName => &mut self.test_name,
            Field::TestDevice => &mut self.test_device,
            Field::SpecimenType => &mut self.specimen_type,
            Field::CollectionDate => &mut self.collection_date,
            Field::TestedPathogen => &mut self.tested_pathogen,
            Field::TestResult => &mut self.test_result,
            Field::ReportedDate => &mut self.reported_date,
        }
    }
}

/// One successfully extracted document, ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    pub source: TemplateVariant,
    pub source_file: String,
    pub source_sha256: Option<String>,
    #[serde(flatten)]
    pub fields: FieldValues,
}

impl ExtractedRecord {
    pub fn new(source: TemplateVariant, source_file: impl Into<String>) -> Self {
        Self {
            source,
            source_file: source_file.into(),
            source_sha256: None,
            fields: FieldValues::default(),
        }
    }

    pub fn with_fingerprint(mut self, sha256: Option<String>) -> Self {
        self.source_sha256 = sha256;
        self
    }
}
