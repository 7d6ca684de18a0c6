use crate::error::IngestError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Known lab-report layouts.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
pub enum TemplateVariant {
    #[serde(rename = "cc")]
    #[value(name = "cc")]
    Cc,
    #[serde(rename = "medlab")]
    #[value(name = "medlab")]
    MedLab,
}

impl TemplateVariant {
    pub const ALL: [TemplateVariant; 2] = [TemplateVariant::Cc, TemplateVariant::MedLab];

    /// Tag stored in the `source` column.
    pub fn as_str(self) -> &'static str {
        match self {
            TemplateVariant::Cc => "cc",
            TemplateVariant::MedLab => "medlab",
        }
    }
}

impl fmt::Display for TemplateVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateVariant {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cc" => Ok(TemplateVariant::Cc),
            "medlab" => Ok(TemplateVariant::MedLab),
            other => Err(IngestError::Config(format!("unknown template: {other}"))),
        }
    }
}

/// The fixed set of fields a lab-report record can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    PatientName,
    DateOfBirth,
    Gender,
    Mrn,
    TestName,
    TestDevice,
    SpecimenType,
    CollectionDate,
    TestedPathogen,
    TestResult,
    ReportedDate,
}

impl Field {
    pub const ALL: [Field; 11] = [
        Field::PatientName,
        Field::DateOfBirth,
        Field::Gender,
        Field::Mrn,
        Field::TestName,
        Field::TestDevice,
        Field::SpecimenType,
        Field::CollectionDate,
        Field::TestedPathogen,
        Field::TestResult,
        Field::ReportedDate,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Field::PatientName => "patient_name",
            Field::DateOfBirth => "date_of_birth",
            Field::Gender => "gender",
            Field::Mrn => "mrn",
            Field::TestName => "test_name",
            Field::TestDevice => "test_device",
            Field::SpecimenType => "specimen_type",
            Field::CollectionDate => "collection_date",
            Field::TestedPathogen => "tested_pathogen",
            Field::TestResult => "test_result",
            Field::ReportedDate => "reported_date",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
