use serde::{Deserialize, Serialize};

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

/// Blood pressure severity tier, mildest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum ClassificationLevel {
    Optimal,
    Normal,
    HighNormal,
    MildHypertension,
    ModerateHypertension,
    SevereHypertension,
}

impl ClassificationLevel {
    /// Every tier, mildest first
    pub const ALL: [ClassificationLevel; 6] = [
        ClassificationLevel::Optimal,
        ClassificationLevel::Normal,
        ClassificationLevel::HighNormal,
        ClassificationLevel::MildHypertension,
        ClassificationLevel::ModerateHypertension,
        ClassificationLevel::SevereHypertension,
    ];

    /// Wire name of the tier
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassificationLevel::Optimal => "optimal",
            ClassificationLevel::Normal => "normal",
            ClassificationLevel::HighNormal => "high_normal",
            ClassificationLevel::MildHypertension => "mild_hypertension",
            ClassificationLevel::ModerateHypertension => "moderate_hypertension",
            ClassificationLevel::SevereHypertension => "severe_hypertension",
        }
    }

    /// Display data for the tier
    pub fn info(&self) -> &'static Classification {
        &CLASSIFICATIONS[*self as usize]
    }
}

/// Display data for a severity tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub level: ClassificationLevel,
    pub name: &'static str,
    /// Hex color hint for clients
    pub color: &'static str,
    /// Advice shown alongside the reading
    pub description: &'static str,
}

// Indexed by `ClassificationLevel as usize`
static CLASSIFICATIONS: [Classification; 6] = [
    Classification {
        level: ClassificationLevel::Optimal,
        name: "Optimal",
        color: "#52c41a",
        description: "Blood pressure is ideal, keep up the healthy lifestyle",
    },
    Classification {
        level: ClassificationLevel::Normal,
        name: "Normal",
        color: "#1890ff",
        description: "Blood pressure is within the normal range",
    },
    Classification {
        level: ClassificationLevel::HighNormal,
        name: "High normal",
        color: "#faad14",
        description: "Consider lifestyle adjustments and monitor regularly",
    },
    Classification {
        level: ClassificationLevel::MildHypertension,
        name: "Grade 1 hypertension",
        color: "#fa8c16",
        description: "Consult a doctor and adjust your lifestyle",
    },
    Classification {
        level: ClassificationLevel::ModerateHypertension,
        name: "Grade 2 hypertension",
        color: "#f5222d",
        description: "See a doctor promptly, medication may be needed",
    },
    Classification {
        level: ClassificationLevel::SevereHypertension,
        name: "Grade 3 hypertension",
        color: "#a8071a",
        description: "Seek medical attention immediately",
    },
];

/// Severity tier for a pair of readings.
///
/// Tiers are checked mildest first and a reading only qualifies for a tier
/// when *both* values are below its thresholds, so a single elevated value
/// pushes the reading into the first tier it fits under.
pub fn classify_level(systolic: i32, diastolic: i32) -> ClassificationLevel {
    if systolic < 120 && diastolic < 80 {
        ClassificationLevel::Optimal
    } else if systolic < 130 && diastolic < 85 {
        ClassificationLevel::Normal
    } else if systolic < 140 && diastolic < 90 {
        ClassificationLevel::HighNormal
    } else if systolic < 160 && diastolic < 100 {
        ClassificationLevel::MildHypertension
    } else if systolic < 180 && diastolic < 110 {
        ClassificationLevel::ModerateHypertension
    } else {
        ClassificationLevel::SevereHypertension
    }
}

/// Classify a reading and return its display data
pub fn classify(systolic: i32, diastolic: i32) -> &'static Classification {
    classify_level(systolic, diastolic).info()
}
