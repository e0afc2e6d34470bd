//! The single input form, as served and as submitted.

use serde::Deserialize;
use std::fmt::Write;

use crate::error::InputError;
use crate::types::{
    BpHistory, ExerciseLevel, FamilyHistory, Medication, PredictionOut, RawInput, RiskLabel, SmokingStatus, Visitor,
    AGE_RANGE, BMI_RANGE, SALT_INTAKE_RANGE, SLEEP_DURATION_RANGE, STRESS_SCORE_RANGE,
};

pub const TITLE: &str = "Hypertension Prediction App";

// Flat on purpose: urlencoded bodies carry every value as a string.
#[derive(Debug, Deserialize)]
pub struct PredictForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub age: i32,
    pub salt_intake: f64,
    pub stress_score: i32,
    pub sleep_duration: f64,
    pub bmi: f64,
    pub bp_history: String,
    pub family_history: String,
    pub exercise_level: String,
    pub smoking_status: String,
    pub medication: String,
}

impl PredictForm {
    pub fn visitor(&self) -> Visitor {
        Visitor { name: self.name.clone(), email: self.email.clone() }
    }

    pub fn raw_input(&self) -> Result<RawInput, InputError> {
        Ok(RawInput {
            age: self.age,
            salt_intake: self.salt_intake,
            stress_score: self.stress_score,
            sleep_duration: self.sleep_duration,
            bmi: self.bmi,
            bp_history: BpHistory::from_label(&self.bp_history)?,
            family_history: FamilyHistory::from_label(&self.family_history)?,
            exercise_level: ExerciseLevel::from_label(&self.exercise_level)?,
            smoking_status: SmokingStatus::from_label(&self.smoking_status)?,
            medication: Medication::from_label(&self.medication)?,
        })
    }

    /// What the user submitted, for re-rendering after a rejected submission.
    /// Unrecognised options fall back to the form's initial choice.
    pub fn partial_input(&self) -> RawInput {
        let initial = RawInput::default();
        RawInput {
            age: self.age,
            salt_intake: self.salt_intake,
            stress_score: self.stress_score,
            sleep_duration: self.sleep_duration,
            bmi: self.bmi,
            bp_history: BpHistory::from_label(&self.bp_history).unwrap_or(initial.bp_history),
            family_history: FamilyHistory::from_label(&self.family_history).unwrap_or(initial.family_history),
            exercise_level: ExerciseLevel::from_label(&self.exercise_level).unwrap_or(initial.exercise_level),
            smoking_status: SmokingStatus::from_label(&self.smoking_status).unwrap_or(initial.smoking_status),
            medication: Medication::from_label(&self.medication).unwrap_or(initial.medication),
        }
    }
}

/// What to show under the form after a submission.
#[derive(Debug, Clone)]
pub enum Outcome {
    Result(PredictionOut),
    Notice(String),
}

#[derive(Debug, Clone, Default)]
pub struct FormView {
    pub visitor: Visitor,
    pub input: RawInput,
    pub outcome: Option<Outcome>,
}

pub fn render(view: &FormView) -> String {
    let mut body = String::new();
    let input = &view.input;

    let _ = write!(
        body,
        "<h1>{TITLE}</h1>\n<p>Enter the patient information to predict the likelihood of hypertension and provide your details to record the visit.</p>\n<form method=\"post\" action=\"/predict\">\n"
    );
    text_field(&mut body, "name", "Your Name", &view.visitor.name);
    text_field(&mut body, "email", "Your Email", &view.visitor.email);

    slider(&mut body, "age", "Age", input.age as f64, *AGE_RANGE.start() as f64, *AGE_RANGE.end() as f64, 1.0);
    slider(&mut body, "salt_intake", "Salt Intake (grams/day)", input.salt_intake, *SALT_INTAKE_RANGE.start(), *SALT_INTAKE_RANGE.end(), 0.1);
    slider(
        &mut body,
        "stress_score",
        "Stress Score (0-10)",
        input.stress_score as f64,
        *STRESS_SCORE_RANGE.start() as f64,
        *STRESS_SCORE_RANGE.end() as f64,
        1.0,
    );
    slider(&mut body, "sleep_duration", "Sleep Duration (hours)", input.sleep_duration, *SLEEP_DURATION_RANGE.start(), *SLEEP_DURATION_RANGE.end(), 0.1);
    slider(&mut body, "bmi", "BMI", input.bmi, *BMI_RANGE.start(), *BMI_RANGE.end(), 0.1);

    select(&mut body, "bp_history", "BP History", BpHistory::ALL.iter().map(|v| v.label()), input.bp_history.label());
    select(
        &mut body,
        "family_history",
        "Family History of Hypertension",
        FamilyHistory::ALL.iter().map(|v| v.label()),
        input.family_history.label(),
    );
    select(&mut body, "exercise_level", "Exercise Level", ExerciseLevel::ALL.iter().map(|v| v.label()), input.exercise_level.label());
    select(&mut body, "smoking_status", "Smoking Status", SmokingStatus::ALL.iter().map(|v| v.label()), input.smoking_status.label());
    select(&mut body, "medication", "Medication", Medication::ALL.iter().map(|v| v.label()), input.medication.label());

    body.push_str("<button type=\"submit\">Predict</button>\n</form>\n");

    match &view.outcome {
        Some(Outcome::Result(out)) => {
            for w in &out.warnings {
                let _ = writeln!(body, "<div class=\"warning\">{}</div>", escape(w));
            }
            let class = match out.label {
                RiskLabel::HighRisk => "error",
                RiskLabel::LowRisk => "success",
            };
            let _ = writeln!(
                body,
                "<div class=\"{}\"><strong>{}</strong><br>{}</div>",
                class,
                out.label.headline(),
                out.probability_text()
            );
        }
        Some(Outcome::Notice(msg)) => {
            let _ = writeln!(body, "<div class=\"warning\">{}</div>", escape(msg));
        }
        None => {}
    }

    format!(
        "<!doctype html>\n<html>\n<head><meta charset=\"utf-8\"><title>{TITLE}</title>\
<style>.warning{{background:#fff4ce}}.error{{background:#fde2e1}}.success{{background:#dff5e3}}\
.warning,.error,.success{{padding:.6em;margin:.6em 0}}</style></head>\n<body>\n{body}</body>\n</html>\n"
    )
}

fn text_field(out: &mut String, name: &str, label: &str, value: &str) {
    let _ = writeln!(
        out,
        "<label>{label}<br><input type=\"text\" name=\"{name}\" value=\"{}\"></label><br>",
        escape(value)
    );
}

fn slider(out: &mut String, name: &str, label: &str, value: f64, min: f64, max: f64, step: f64) {
    let _ = writeln!(
        out,
        "<label>{label}<br><input type=\"range\" name=\"{name}\" min=\"{min}\" max=\"{max}\" step=\"{step}\" value=\"{value}\" \
oninput=\"this.nextElementSibling.value=this.value\"><output>{value}</output></label><br>"
    );
}

fn select<'a>(out: &mut String, name: &str, label: &str, options: impl Iterator<Item = &'a str>, selected: &str) {
    let _ = write!(out, "<label>{label}<br><select name=\"{name}\">");
    for o in options {
        let sel = if o == selected { " selected" } else { "" };
        let _ = write!(out, "<option{sel}>{}</option>", escape(o));
    }
    let _ = writeln!(out, "</select></label><br>");
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_form_has_initial_values() {
        let html = render(&FormView::default());
        assert!(html.contains("<title>Hypertension Prediction App</title>"));
        assert!(html.contains("name=\"age\" min=\"18\" max=\"90\" step=\"1\" value=\"45\""));
        assert!(html.contains("<option selected>Unknown</option>"));
        assert!(html.contains("<option>ACE Inhibitor</option>"));
        assert!(!html.contains("class=\"success\""));
    }

    #[test]
    fn visitor_values_are_escaped() {
        let view = FormView {
            visitor: Visitor { name: "<b>Ada</b>".into(), email: "a\"@x".into() },
            ..FormView::default()
        };
        let html = render(&view);
        assert!(html.contains("value=\"&lt;b&gt;Ada&lt;/b&gt;\""));
        assert!(html.contains("value=\"a&quot;@x\""));
    }

    #[test]
    fn result_block_shows_label_and_probability() {
        let out = PredictionOut {
            prediction: 0,
            label: RiskLabel::LowRisk,
            probability: 0.126,
            warnings: vec!["Numerical features mismatch. Found: [\"Age\"]".into()],
            features: None,
        };
        let html = render(&FormView { outcome: Some(Outcome::Result(out)), ..FormView::default() });
        assert!(html.contains("Low Risk: The model predicts low likelihood of hypertension."));
        assert!(html.contains("Probability: 0.13"));
        assert!(html.contains("Found: [&quot;Age&quot;]"));
    }

    #[test]
    fn form_labels_map_to_categories() {
        let form = PredictForm {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            age: 18,
            salt_intake: 0.0,
            stress_score: 10,
            sleep_duration: 3.0,
            bmi: 40.0,
            bp_history: "Hypertension".into(),
            family_history: "Yes".into(),
            exercise_level: "High".into(),
            smoking_status: "Smoker".into(),
            medication: "Beta Blocker".into(),
        };
        let input = form.raw_input().unwrap();
        assert_eq!(input.bp_history, BpHistory::Hypertension);
        assert_eq!(input.medication, Medication::BetaBlocker);
        assert!(input.validate().is_ok());

        let bad = PredictForm { medication: "Aspirin".into(), ..form };
        assert!(matches!(bad.raw_input(), Err(InputError::UnknownCategory { .. })));
    }

    #[test]
    fn rejected_submission_keeps_entered_values() {
        let form = PredictForm {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            age: 70,
            salt_intake: 12.5,
            stress_score: 8,
            sleep_duration: 5.5,
            bmi: 31.0,
            bp_history: "Hypertension".into(),
            family_history: "Yes".into(),
            exercise_level: "High".into(),
            smoking_status: "Smoker".into(),
            medication: "Aspirin".into(),
        };
        let input = form.partial_input();
        assert_eq!(input.age, 70);
        assert_eq!(input.bmi, 31.0);
        assert_eq!(input.bp_history, BpHistory::Hypertension);
        assert_eq!(input.smoking_status, SmokingStatus::Smoker);
        assert_eq!(input.medication, Medication::Unknown);

        let html = render(&FormView { visitor: form.visitor(), input, outcome: None });
        assert!(html.contains("name=\"age\" min=\"18\" max=\"90\" step=\"1\" value=\"70\""));
        assert!(html.contains("<option selected>Hypertension</option>"));
    }
}
