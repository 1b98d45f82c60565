/// Operating mode policy
///
/// A mode is configuration, not a type hierarchy: it names which models a
/// session loads, how their labels are tagged, the inference thresholds,
/// and the artifact prefix alerts are filed under. The trigger, buffer and
/// persistence machinery are mode-agnostic.
use super::detector::{Detection, InferenceOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeKind {
    /// Multi-model surveillance (fire + violence passes per frame)
    Public,
    /// Single general-object guardian model
    Home,
}

/// One model a mode runs per frame.
#[derive(Debug, Clone)]
pub struct ModelSpec {
    /// Opaque reference handed to the detector loader (a path, usually)
    pub model_ref: String,
    /// Tag prepended to this model's labels, if any
    pub label_prefix: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Mode {
    kind: ModeKind,
    models: Vec<ModelSpec>,
    options: InferenceOptions,
}

impl Mode {
    /// Public surveillance: two independent model passes per frame whose
    /// outputs are concatenated before the hit predicate runs.
    pub fn public(fire_model: impl Into<String>, violence_model: impl Into<String>) -> Self {
        Self {
            kind: ModeKind::Public,
            models: vec![
                ModelSpec {
                    model_ref: fire_model.into(),
                    label_prefix: Some("fire".to_string()),
                },
                ModelSpec {
                    model_ref: violence_model.into(),
                    label_prefix: Some("violence".to_string()),
                },
            ],
            options: InferenceOptions {
                confidence: 0.25,
                input_size: 640,
            },
        }
    }

    /// Home guardian: one lightweight general-object model.
    pub fn home(model: impl Into<String>) -> Self {
        Self {
            kind: ModeKind::Home,
            models: vec![ModelSpec {
                model_ref: model.into(),
                label_prefix: None,
            }],
            options: InferenceOptions {
                confidence: 0.35,
                input_size: 320,
            },
        }
    }

    pub fn kind(&self) -> ModeKind {
        self.kind
    }

    pub fn models(&self) -> &[ModelSpec] {
        &self.models
    }

    pub fn options(&self) -> InferenceOptions {
        self.options
    }

    /// Override the inference thresholds (config knob).
    pub fn with_options(mut self, options: InferenceOptions) -> Self {
        self.options = options;
        self
    }

    /// Prefix alert artifacts are filed under (`{prefix}_{ts}.mp4` / `.jpg`).
    pub fn alert_prefix(&self) -> &'static str {
        match self.kind {
            ModeKind::Public => "public_alert",
            ModeKind::Home => "home_alert",
        }
    }

    /// Per-frame hit predicate: any detection present.
    ///
    /// Both modes share it; they differ only in which models feed it.
    pub fn is_hit(&self, detections: &[Detection]) -> bool {
        !detections.is_empty()
    }
}
