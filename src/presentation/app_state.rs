// Application state for HTTP handlers
use crate::application::deploy_service::DeployService;
use crate::application::preview_service::PreviewService;
use crate::application::status_service::StatusService;
use crate::domain::selection::Catalog;
use crate::infrastructure::config::PageSettings;

#[derive(Clone)]
pub struct AppState {
    pub catalog: Catalog,
    pub page: PageSettings,
    pub preview_service: PreviewService,
    pub deploy_service: DeployService,
    pub status_service: StatusService,
}
