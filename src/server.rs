use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::Html,
    routing::{get, post},
    Form, Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::config::{Config, RecordVisits};
use crate::error::{ArtifactError, PredictError};
use crate::features::{FeatureVector, FeatureVectorBuilder};
use crate::form::{self, FormView, Outcome, PredictForm};
use crate::model::{load_model, Classifier, Meta};
use crate::scaler::{IdentityScaler, Scaler, StandardScaler};
use crate::schema::{ExpectedSchema, SchemaSource};
use crate::types::{PredictionOut, RawInput, RiskLabel, Visitor};
use crate::visits::{record_best_effort, DisabledRecorder, MemoryRecorder, Visit, VisitRecorder};

const MEMORY_RECORDER_CAPACITY: usize = 1000;

// ---------- Server state ----------

/// Artifacts loaded once at startup and shared read-only by every request.
#[derive(Clone)]
pub struct AppState {
    pub model: Arc<dyn Classifier>,
    pub scaler: Arc<dyn Scaler>,
    pub schema: Arc<ExpectedSchema>, // authoritative input order
    pub recorder: Arc<dyn VisitRecorder>,
    pub log_pred: bool,
}

impl AppState {
    pub fn new(model: Arc<dyn Classifier>, scaler: Arc<dyn Scaler>) -> Self {
        let (schema, _) = ExpectedSchema::resolve(model.expected_features());
        Self {
            model,
            scaler,
            schema: Arc::new(schema),
            recorder: Arc::new(DisabledRecorder),
            log_pred: false,
        }
    }

    pub fn with_recorder(mut self, recorder: Arc<dyn VisitRecorder>) -> Self {
        self.recorder = recorder;
        self
    }

    pub fn load(cfg: &Config) -> Result<Self> {
        let meta = cfg
            .meta_path
            .as_deref()
            .map(Meta::load)
            .transpose()
            .with_context(|| "failed to load meta.json")?;

        let model = load_model(&cfg.model_path, meta.as_ref())
            .with_context(|| format!("failed to load model {}", cfg.model_path.display()))?;

        let scaler: Arc<dyn Scaler> = match &cfg.scaler_path {
            Some(p) => Arc::new(
                StandardScaler::load(p).with_context(|| format!("failed to load scaler {}", p.display()))?,
            ),
            None => {
                tracing::warn!("SCALER_PATH not set; numerical features will not be scaled");
                Arc::new(IdentityScaler)
            }
        };

        if let (Some(meta), Some(model_names)) = (meta.as_ref(), model.expected_features()) {
            if meta.feat_list.as_slice() != model_names {
                return Err(ArtifactError::FeatureListMismatch {
                    meta: meta.feat_list.clone(),
                    model: model_names.to_vec(),
                })
                .context("meta.json disagrees with the model artifact");
            }
        }

        let declared = meta.as_ref().map(|m| m.feat_list.as_slice()).or_else(|| model.expected_features());
        let (schema, source) = ExpectedSchema::resolve(declared);
        if source == SchemaSource::Fallback {
            tracing::warn!("model does not declare its features; using the fallback feature list");
        }
        tracing::info!(
            "loaded model; feat_list[{}]: {:?}",
            schema.len(),
            schema.names().collect::<Vec<_>>()
        );

        let recorder: Arc<dyn VisitRecorder> = match cfg.record_visits {
            RecordVisits::Off => Arc::new(DisabledRecorder),
            RecordVisits::Memory => Arc::new(MemoryRecorder::new(MEMORY_RECORDER_CAPACITY)),
        };

        Ok(Self {
            model: Arc::from(model),
            scaler,
            schema: Arc::new(schema),
            recorder,
            log_pred: cfg.log_pred,
        })
    }

    /// One forward pass on the default form values, so a broken artifact fails at startup.
    pub fn warmup(&self) -> Result<()> {
        let built = FeatureVectorBuilder::new(&self.schema, self.scaler.as_ref()).build(&RawInput::default());
        self.model
            .predict_proba(&built.vector)
            .context("warmup forward failed")?;
        tracing::info!("warmup forward ok");
        Ok(())
    }

    /// Identity check, encoding, inference, then best-effort visit logging.
    pub fn predict(&self, visitor: &Visitor, input: &RawInput, debug: bool) -> Result<PredictionOut, PredictError> {
        visitor.require()?;
        input.validate()?;

        let built = FeatureVectorBuilder::new(&self.schema, self.scaler.as_ref()).build(input);
        if self.log_pred {
            log_vector(&built.vector);
        }

        let probability = self.model.predict_proba(&built.vector)?;
        let prediction = u8::from(probability >= self.model.threshold());
        tracing::info!("prediction={} probability={:.2}", prediction, probability);

        record_best_effort(
            self.recorder.as_ref(),
            &Visit {
                name: visitor.name.clone(),
                email: visitor.email.clone(),
                age: input.age,
                prediction,
            },
        );

        Ok(PredictionOut {
            prediction,
            label: RiskLabel::from_prediction(prediction),
            probability,
            warnings: built.warnings.iter().map(ToString::to_string).collect(),
            features: debug.then_some(built.vector),
        })
    }
}

impl PredictError {
    fn status(&self) -> StatusCode {
        match self {
            PredictError::Input(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PredictError::Model(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// Debug signal so we can confirm we're not sending all-zeros
fn log_vector(vec: &FeatureVector) {
    let nz = vec.values().iter().filter(|x| **x != 0.0).count();
    let sample: Vec<String> = vec.iter().take(6).map(|(name, v)| format!("{}={:.3}", name, v)).collect();
    tracing::info!("in_dim={} nonzero={} sample=[{}]", vec.len(), nz, sample.join(", "));
}

// ---------- Handlers ----------

async fn index() -> Html<String> {
    Html(form::render(&FormView::default()))
}

async fn predict_form(State(state): State<AppState>, Form(payload): Form<PredictForm>) -> Html<String> {
    let visitor = payload.visitor();
    let (input, outcome) = match payload.raw_input() {
        Ok(input) => {
            let outcome = match state.predict(&visitor, &input, false) {
                Ok(out) => Outcome::Result(out),
                Err(e) => Outcome::Notice(e.to_string()),
            };
            (input, outcome)
        }
        Err(e) => (payload.partial_input(), Outcome::Notice(e.to_string())),
    };
    Html(form::render(&FormView { visitor, input, outcome: Some(outcome) }))
}

#[derive(Debug, Deserialize)]
pub struct ApiRequest {
    #[serde(flatten)]
    pub visitor: Visitor,
    #[serde(flatten)]
    pub input: RawInput,
    #[serde(default)]
    pub debug: bool,
}

async fn predict_api(
    State(state): State<AppState>,
    Json(payload): Json<ApiRequest>,
) -> Result<Json<PredictionOut>, (StatusCode, Json<serde_json::Value>)> {
    state
        .predict(&payload.visitor, &payload.input, payload.debug)
        .map(Json)
        .map_err(|e| (e.status(), Json(json!({ "error": e.to_string() }))))
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "features": state.schema.len(), "columns": state.schema.columns() }))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/predict", post(predict_form))
        .route("/api/predict", post(predict_api))
        .route("/health", get(health))
        .with_state(state)
}
