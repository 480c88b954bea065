// HTTP request handlers
use crate::domain::selection::{Selection, SelectionError};
use crate::presentation::app_state::AppState;
use crate::presentation::page::PageView;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

/// Raw selection as it arrives in the query string
#[derive(Debug, Default, Deserialize)]
pub struct SelectionQuery {
    pub dataset: Option<String>,
    pub model: Option<String>,
}

impl SelectionQuery {
    fn resolve(&self, state: &AppState) -> Result<Selection, SelectionError> {
        state
            .catalog
            .select(self.dataset.as_deref(), self.model.as_deref())
    }
}

fn bad_selection(e: SelectionError) -> Response {
    tracing::warn!("Rejected selection: {}", e);
    (StatusCode::BAD_REQUEST, e.to_string()).into_response()
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Dashboard page for the current selection
pub async fn dashboard_page(
    Query(query): Query<SelectionQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    match query.resolve(&state) {
        Ok(selection) => render_page(&state, &selection, false).await,
        Err(e) => bad_selection(e),
    }
}

/// Deploy action: validate the selected model and embed its dashboard
pub async fn deploy_model(
    Query(query): Query<SelectionQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    match query.resolve(&state) {
        Ok(selection) => {
            tracing::info!("Deploying {} for {}", selection.model, selection.dataset);
            render_page(&state, &selection, true).await
        }
        Err(e) => bad_selection(e),
    }
}

/// Which artifacts exist for the current selection
pub async fn artifact_status(
    Query(query): Query<SelectionQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    match query.resolve(&state) {
        Ok(selection) => Json(state.status_service.status(&selection).await).into_response(),
        Err(e) => bad_selection(e),
    }
}

async fn render_page(state: &AppState, selection: &Selection, deploy: bool) -> Response {
    let preview = state.preview_service.preview(&selection.dataset).await;

    let report = if deploy {
        let report = state.deploy_service.deploy(selection).await;
        tracing::debug!("Deploy {} ended in {:?}", report.model, report.final_stage());
        Some(report)
    } else {
        None
    };

    let page = PageView {
        settings: &state.page,
        catalog: &state.catalog,
        selection,
        preview: &preview,
        deploy: report.as_ref(),
    };

    Html(page.render()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::artifact_store::memory::MemoryStore;
    use crate::application::deploy_service::DeployService;
    use crate::application::preview_service::PreviewService;
    use crate::application::status_service::StatusService;
    use crate::domain::selection::Catalog;
    use crate::infrastructure::config::PageSettings;
    use crate::infrastructure::joblib_arrays::fixtures::joblib_logistic_regression;
    use crate::infrastructure::pickle_validator::PickleModelValidator;
    use serde_pickle::SerOptions;

    fn state(store: MemoryStore) -> Arc<AppState> {
        let store = Arc::new(store);
        Arc::new(AppState {
            catalog: Catalog::default(),
            page: PageSettings::default(),
            preview_service: PreviewService::new(store.clone(), 5),
            deploy_service: DeployService::new(store.clone(), Arc::new(PickleModelValidator::new())),
            status_service: StatusService::new(store),
        })
    }

    fn query(dataset: &str, model: &str) -> Query<SelectionQuery> {
        Query(SelectionQuery {
            dataset: Some(dataset.to_string()),
            model: Some(model.to_string()),
        })
    }

    async fn body(response: Response) -> (StatusCode, String) {
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn model_bytes() -> Vec<u8> {
        serde_pickle::to_vec(&vec![0.5, 1.5], SerOptions::new()).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        assert_eq!(health_check().await, "ok");
    }

    #[tokio::test]
    async fn test_page_defaults_to_first_dataset() {
        let response =
            dashboard_page(Query(SelectionQuery::default()), State(state(MemoryStore::new()))).await;

        let (status, html) = body(response).await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("1. Preprocessing Summary: FAUJI"));
        assert!(html.contains("File not found: <code>FAUJI_Processed_Data.csv</code>"));
        assert!(!html.contains("<table>"));
    }

    #[tokio::test]
    async fn test_unknown_dataset_is_bad_request() {
        let response = dashboard_page(query("KSE", "SVM"), State(state(MemoryStore::new()))).await;

        let (status, text) = body(response).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(text, "Unknown dataset: KSE");
    }

    #[tokio::test]
    async fn test_malformed_csv_shows_error_and_no_preview() {
        let store = MemoryStore::new().with_file("OGDCL_Processed_Data.csv", "a,b\n1,2,3\n");

        let response = dashboard_page(query("OGDCL", "SVM"), State(state(store))).await;

        let (_, html) = body(response).await;
        assert!(html.contains("Error reading CSV file: Expected 2 fields in line 2, saw 3"));
        assert!(!html.contains("<table>"));
    }

    #[tokio::test]
    async fn test_short_csv_row_is_previewed() {
        let store = MemoryStore::new()
            .with_file("OGDCL_Processed_Data.csv", "Date,Close,RSI\n2024-01-01,10.5\n");

        let response = dashboard_page(query("OGDCL", "SVM"), State(state(store))).await;

        let (_, html) = body(response).await;
        assert!(html.contains("<td>2024-01-01</td><td>10.5</td><td></td>"));
        assert!(!html.contains("Error reading CSV file"));
    }

    #[tokio::test]
    async fn test_deploy_renders_dashboard() {
        let store = MemoryStore::new()
            .with_file("FAUJI_Processed_Data.csv", "Close\n1.0\n")
            .with_file("FAUJI_SVM_Model.pkl", model_bytes())
            .with_file("FAUJI_SVM_Dashboard.html", "<p>SVM report</p>");

        let response = deploy_model(query("FAUJI", "SVM"), State(state(store))).await;

        let (status, html) = body(response).await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("<table>"));
        assert!(html.contains("SVM loaded successfully!"));
        assert!(html.contains(r#"srcdoc="&lt;p&gt;SVM report&lt;/p&gt;" height="1000" scrolling="yes""#));
    }

    #[tokio::test]
    async fn test_deploy_renders_joblib_model() {
        let store = MemoryStore::new()
            .with_file("OGDCL_Logistic_Regression_Model.pkl", joblib_logistic_regression())
            .with_file("OGDCL_Logistic_Regression_Dashboard.html", "<p>LR report</p>");

        let response = deploy_model(query("OGDCL", "Logistic Regression"), State(state(store))).await;

        let (_, html) = body(response).await;
        assert!(html.contains("Logistic Regression loaded successfully!"));
        assert!(!html.contains("Model Loading Error"));
        assert!(html.contains("<iframe"));
    }

    #[tokio::test]
    async fn test_deploy_with_corrupt_model_shows_load_error() {
        let mut corrupt = model_bytes();
        corrupt.truncate(corrupt.len() - 3);
        let store = MemoryStore::new()
            .with_file("FAUJI_Voting_Ensemble_Model.pkl", corrupt)
            .with_file("FAUJI_Voting_Ensemble_Dashboard.html", "<p>report</p>");

        let response = deploy_model(query("FAUJI", "Voting Ensemble"), State(state(store))).await;

        let (_, html) = body(response).await;
        assert!(html.contains("Model Loading Error"));
        assert!(html.contains("<code>FAUJI_Voting_Ensemble_Model.pkl</code>"));
        assert!(!html.contains("<iframe"));
    }

    #[tokio::test]
    async fn test_page_without_deploy_does_not_touch_model() {
        let store = MemoryStore::new().with_file("FAUJI_SVM_Model.pkl", model_bytes());

        let response = dashboard_page(query("FAUJI", "SVM"), State(state(store))).await;

        let (_, html) = body(response).await;
        assert!(!html.contains("Missing Dashboard File"));
        assert!(!html.contains("loaded successfully"));
    }

    #[tokio::test]
    async fn test_artifact_status_json() {
        let store = MemoryStore::new().with_file("OGDCL_SVM_Model.pkl", model_bytes());

        let response = artifact_status(query("OGDCL", "SVM"), State(state(store))).await;

        let (status, text) = body(response).await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["dataset"], "OGDCL");
        assert_eq!(json["artifacts"][0]["kind"], "processed_data");
        assert_eq!(json["artifacts"][0]["exists"], false);
        assert_eq!(json["artifacts"][1]["path"], "OGDCL_SVM_Model.pkl");
        assert_eq!(json["artifacts"][1]["exists"], true);
    }
}
