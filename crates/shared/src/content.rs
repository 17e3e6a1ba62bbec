//! Per-exercise content schema: step titles, field labels and layouts.
//!
//! Content is static JSON shipped with the app. It is parsed into tagged
//! variants once and checked for the few things the controllers rely on
//! (steps exist, field ids are present and unique); copy is not validated.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::ExerciseKind;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("malformed exercise content: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("exercise {0} declares no steps")]
    NoSteps(ExerciseKind),
    #[error("step {step} has an empty title")]
    EmptyTitle { step: usize },
    #[error("step {step} declares a field with an empty id")]
    EmptyFieldId { step: usize },
    #[error("field id {field_id:?} is declared twice (step {step})")]
    DuplicateFieldId { step: usize, field_id: String },
    #[error("step {step} has a repeated layout without item fields")]
    EmptyRepeatedItem { step: usize },
    #[error("step {step} requires at least one repeated item (min_items is 0)")]
    ZeroMinItems { step: usize },
    #[error("field id {field_id:?} (step {step}) clashes with the saved key of repeated field {repeated_field:?}")]
    ReservedFieldId {
        step: usize,
        field_id: String,
        repeated_field: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subsection {
    pub title: String,
    pub fields: Vec<FieldSpec>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Requirement {
    #[default]
    None,
    /// At least one of the step's fields (or repeated items) must be non-empty.
    AnyField,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "layout", rename_all = "snake_case")]
pub enum StepBody {
    Fields {
        fields: Vec<FieldSpec>,
    },
    Subsections {
        subsections: Vec<Subsection>,
    },
    /// An unbounded list of same-shaped items, e.g. urge / opposite action.
    /// Saved as `{field}_{n}` keys.
    Repeated {
        item_fields: Vec<FieldSpec>,
        /// Items always shown, and the number that must be filled in when
        /// the step is required.
        #[serde(default = "default_min_items")]
        min_items: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepContent {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intro: Option<String>,
    #[serde(default)]
    pub required: Requirement,
    #[serde(flatten)]
    pub body: StepBody,
}

impl StepContent {
    /// Field ids of a `Fields` or `Subsections` step, in declaration order.
    /// Repeated steps return their per-item field ids.
    pub fn field_ids(&self) -> Vec<&str> {
        self.field_specs().map(|field| field.id.as_str()).collect()
    }

    pub fn field_specs(&self) -> Box<dyn Iterator<Item = &FieldSpec> + '_> {
        match &self.body {
            StepBody::Fields { fields } => Box::new(fields.iter()),
            StepBody::Subsections { subsections } => {
                Box::new(subsections.iter().flat_map(|section| section.fields.iter()))
            }
            StepBody::Repeated { item_fields, .. } => Box::new(item_fields.iter()),
        }
    }

    pub fn is_repeated(&self) -> bool {
        matches!(self.body, StepBody::Repeated { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonLabels {
    #[serde(default = "default_next")]
    pub next: String,
    #[serde(default = "default_back")]
    pub back: String,
    #[serde(default = "default_save")]
    pub save: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_notice: Option<String>,
}

fn default_min_items() -> usize {
    1
}

fn default_next() -> String {
    "Next".into()
}

fn default_back() -> String {
    "Back".into()
}

fn default_save() -> String {
    "Save".into()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseContent {
    pub kind: ExerciseKind,
    pub title: String,
    pub steps: Vec<StepContent>,
    #[serde(default = "default_buttons")]
    pub buttons: ButtonLabels,
}

fn default_buttons() -> ButtonLabels {
    ButtonLabels {
        next: default_next(),
        back: default_back(),
        save: default_save(),
        saved_notice: None,
    }
}

impl ExerciseContent {
    pub fn from_json(raw: &str) -> Result<Self, ContentError> {
        let content: Self = serde_json::from_str(raw)?;
        content.validate()?;
        Ok(content)
    }

    pub fn validate(&self) -> Result<(), ContentError> {
        if self.steps.is_empty() {
            return Err(ContentError::NoSteps(self.kind.clone()));
        }

        let mut seen = HashSet::new();
        for (index, step) in self.steps.iter().enumerate() {
            let step_no = index + 1;
            if step.title.trim().is_empty() {
                return Err(ContentError::EmptyTitle { step: step_no });
            }
            if let StepBody::Repeated {
                item_fields,
                min_items,
            } = &step.body
            {
                if item_fields.is_empty() {
                    return Err(ContentError::EmptyRepeatedItem { step: step_no });
                }
                if *min_items == 0 {
                    return Err(ContentError::ZeroMinItems { step: step_no });
                }
            }
            for field in step.field_specs() {
                if field.id.trim().is_empty() {
                    return Err(ContentError::EmptyFieldId { step: step_no });
                }
                if !seen.insert(field.id.as_str()) {
                    return Err(ContentError::DuplicateFieldId {
                        step: step_no,
                        field_id: field.id.clone(),
                    });
                }
            }
        }
        self.check_repeated_keys()
    }

    /// Repeated items are saved as `{field}_{n}`; a plain field with such an
    /// id would overwrite one of them in the entry payload.
    fn check_repeated_keys(&self) -> Result<(), ContentError> {
        let repeated: HashSet<&str> = self
            .steps
            .iter()
            .filter(|step| step.is_repeated())
            .flat_map(|step| step.field_specs())
            .map(|field| field.id.as_str())
            .collect();
        if repeated.is_empty() {
            return Ok(());
        }

        for (index, step) in self.steps.iter().enumerate() {
            if step.is_repeated() {
                continue;
            }
            for field in step.field_specs() {
                let Some((base, suffix)) = field.id.rsplit_once('_') else {
                    continue;
                };
                if !suffix.is_empty()
                    && suffix.bytes().all(|b| b.is_ascii_digit())
                    && repeated.contains(base)
                {
                    return Err(ContentError::ReservedFieldId {
                        step: index + 1,
                        field_id: field.id.clone(),
                        repeated_field: base.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn total_steps(&self) -> usize {
        self.steps.len()
    }

    /// 1-based lookup.
    pub fn step(&self, index: usize) -> Option<&StepContent> {
        index.checked_sub(1).and_then(|i| self.steps.get(i))
    }

    pub fn saved_notice(&self) -> &str {
        self.buttons
            .saved_notice
            .as_deref()
            .unwrap_or("Entry saved.")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPPOSITE_ACTION: &str = r#"{
        "kind": "opposite-action",
        "title": "Opposite Action",
        "steps": [
            {
                "title": "Name the emotion",
                "layout": "fields",
                "required": "any_field",
                "fields": [
                    {"id": "emotion", "label": "Emotion", "placeholder": "e.g. fear"}
                ]
            },
            {
                "title": "Check the facts",
                "layout": "subsections",
                "subsections": [
                    {"title": "Facts", "fields": [{"id": "facts", "label": "What happened?"}]},
                    {"title": "Fit", "fields": [{"id": "fit", "label": "Does it fit?"}]}
                ]
            },
            {
                "title": "Plan",
                "layout": "repeated",
                "required": "any_field",
                "item_fields": [
                    {"id": "urge", "label": "Urge"},
                    {"id": "opposite", "label": "Opposite action"}
                ]
            }
        ]
    }"#;

    #[test]
    fn parses_every_layout() {
        let content = ExerciseContent::from_json(OPPOSITE_ACTION).expect("content");
        assert_eq!(content.total_steps(), 3);
        assert_eq!(content.buttons.save, "Save");
        assert_eq!(content.step(1).expect("step").required, Requirement::AnyField);
        assert_eq!(content.step(2).expect("step").field_ids(), vec!["facts", "fit"]);
        assert!(content.step(3).expect("step").is_repeated());
        assert!(content.step(0).is_none());
        assert!(content.step(4).is_none());
    }

    #[test]
    fn rejects_duplicate_field_ids_across_steps() {
        let raw = r#"{
            "kind": "wise-mind",
            "title": "Wise Mind",
            "steps": [
                {"title": "One", "layout": "fields", "fields": [{"id": "notes", "label": "A"}]},
                {"title": "Two", "layout": "fields", "fields": [{"id": "notes", "label": "B"}]}
            ]
        }"#;
        let err = ExerciseContent::from_json(raw).expect_err("duplicate");
        assert!(matches!(
            err,
            ContentError::DuplicateFieldId { step: 2, ref field_id } if field_id == "notes"
        ));
    }

    #[test]
    fn repeated_steps_default_to_one_required_item() {
        let content = ExerciseContent::from_json(OPPOSITE_ACTION).expect("content");
        assert!(matches!(
            content.step(3).expect("step").body,
            StepBody::Repeated { min_items: 1, .. }
        ));
    }

    #[test]
    fn rejects_zero_min_items() {
        let raw = r#"{
            "kind": "pros-cons",
            "title": "Pros and Cons",
            "steps": [
                {"title": "Pros", "layout": "repeated", "min_items": 0,
                 "item_fields": [{"id": "pro", "label": "Pro"}]}
            ]
        }"#;
        assert!(matches!(
            ExerciseContent::from_json(raw),
            Err(ContentError::ZeroMinItems { step: 1 })
        ));
    }

    #[test]
    fn rejects_field_ids_shaped_like_repeated_keys() {
        // "urge_1" is where the first repeated urge would be saved.
        let raw = r#"{
            "kind": "opposite-action",
            "title": "Opposite Action",
            "steps": [
                {"title": "Summary", "layout": "fields",
                 "fields": [{"id": "urge_1", "label": "Strongest urge"}]},
                {"title": "Plan", "layout": "repeated",
                 "item_fields": [{"id": "urge", "label": "Urge"}]}
            ]
        }"#;
        let err = ExerciseContent::from_json(raw).expect_err("clash");
        assert!(matches!(
            err,
            ContentError::ReservedFieldId { step: 1, ref field_id, ref repeated_field }
                if field_id == "urge_1" && repeated_field == "urge"
        ));

        let allowed = raw.replace("urge_1", "urge_top");
        assert!(ExerciseContent::from_json(&allowed).is_ok());
    }

    #[test]
    fn rejects_content_without_steps() {
        let raw = r#"{"kind": "wise-mind", "title": "Wise Mind", "steps": []}"#;
        assert!(matches!(
            ExerciseContent::from_json(raw),
            Err(ContentError::NoSteps(_))
        ));
    }

    #[test]
    fn rejects_unknown_layout() {
        let raw = r#"{
            "kind": "wise-mind",
            "title": "Wise Mind",
            "steps": [{"title": "One", "layout": "carousel"}]
        }"#;
        assert!(matches!(
            ExerciseContent::from_json(raw),
            Err(ContentError::Parse(_))
        ));
    }
}
