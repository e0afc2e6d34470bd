//! The ordered column list the classifier was trained on.

use serde::Serialize;

/// Columns passed through the fitted scaler, in the order it was fitted.
pub const NUMERICAL_FEATURES: [&str; 5] = ["Age", "Salt_Intake", "Stress_Score", "Sleep_Duration", "BMI"];

/// Single-column categoricals stored as their ordinal/binary code.
pub const ORDINAL_FEATURES: [&str; 4] = ["BP_History", "Exercise_Level", "Family_History", "Smoking_Status"];

/// Prefix of the Medication dummy columns; the label follows verbatim.
pub const MEDICATION_PREFIX: &str = "Medication_";

/// Used when the model artifact does not declare its input columns.
pub const FALLBACK_FEATURES: [&str; 14] = [
    "Age",
    "Salt_Intake",
    "Stress_Score",
    "Sleep_Duration",
    "BMI",
    "Medication_Beta Blocker",
    "Medication_Diuretic",
    "Medication_Other",
    "Medication_Unknown",
    "Medication_ACE Inhibitor",
    "BP_History",
    "Exercise_Level",
    "Family_History",
    "Smoking_Status",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Numeric,
    Ordinal,
    OneHot,
    Other,
}

impl Role {
    fn of(name: &str) -> Self {
        if NUMERICAL_FEATURES.contains(&name) {
            Role::Numeric
        } else if ORDINAL_FEATURES.contains(&name) {
            Role::Ordinal
        } else if name.starts_with(MEDICATION_PREFIX) {
            Role::OneHot
        } else {
            Role::Other
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: String,
    pub role: Role,
}

/// Where the schema came from; only used for startup logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaSource {
    Declared,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpectedSchema {
    columns: Vec<Column>,
}

impl ExpectedSchema {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns = names
            .into_iter()
            .map(|n| {
                let name = n.into();
                let role = Role::of(&name);
                Column { name, role }
            })
            .collect();
        Self { columns }
    }

    pub fn fallback() -> Self {
        Self::from_names(FALLBACK_FEATURES)
    }

    /// Prefer the list declared by the model; otherwise fall back to the
    /// hardcoded training columns.
    pub fn resolve(declared: Option<&[String]>) -> (Self, SchemaSource) {
        match declared {
            Some(names) if !names.is_empty() => {
                let schema = Self::from_names(names.iter().cloned());
                if !schema.same_columns_as(&Self::fallback()) {
                    tracing::warn!(
                        "model-declared features differ from the fallback list; using the model's: {:?}",
                        schema.names().collect::<Vec<_>>()
                    );
                }
                (schema, SchemaSource::Declared)
            }
            _ => (Self::fallback(), SchemaSource::Fallback),
        }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Index and name of every numerical column present, in the order the
    /// scaler was fitted (not schema order).
    pub fn numeric_columns(&self) -> Vec<(usize, &str)> {
        NUMERICAL_FEATURES
            .iter()
            .filter_map(|n| {
                self.columns
                    .iter()
                    .position(|c| c.role == Role::Numeric && c.name == *n)
                    .map(|i| (i, self.columns[i].name.as_str()))
            })
            .collect()
    }

    /// Index and name of every Medication dummy column, in schema order.
    pub fn medication_columns(&self) -> impl Iterator<Item = (usize, &str)> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.role == Role::OneHot)
            .map(|(i, c)| (i, c.name.as_str()))
    }

    /// Same names in the same order.
    pub fn same_columns_as(&self, other: &ExpectedSchema) -> bool {
        self.names().eq(other.names())
    }
}
