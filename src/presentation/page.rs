// Server-side rendering of the dashboard page
use crate::application::deploy_service::DeployReport;
use crate::application::error::{ArtifactError, VERSION_MISMATCH_HINT};
use crate::domain::artifact::{processed_csv, ArtifactKind};
use crate::domain::loaded::DataPreview;
use crate::domain::selection::{Catalog, Selection};
use crate::infrastructure::config::PageSettings;
use crate::infrastructure::html::{embed_trusted_markup, escape};

const STYLE: &str = r#"
body { font-family: sans-serif; margin: 0; display: flex; color: #222; }
.sidebar { width: 260px; min-height: 100vh; padding: 20px; background: #f0f2f6; box-sizing: border-box; }
.sidebar a { display: block; padding: 4px 0; color: #222; text-decoration: none; }
.content { flex: 1; padding: 20px 40px; }
.main-header { font-size: 36px; font-weight: bold; color: #1E3A8A; margin: 0; }
.sub-header { font-size: 20px; color: #555; }
.columns { display: flex; gap: 24px; }
.columns .narrow { flex: 1; }
.columns .wide { flex: 2; overflow-x: auto; }
.banner { border-radius: 10px; padding: 12px 16px; margin: 8px 0; }
.banner-success { background: #e6f4ea; color: #1e6b34; }
.banner-info { background: #e8f0fe; color: #1a4d8f; }
.banner-warning { background: #fff8e1; color: #8a6d00; }
.banner-error { background: #fdecea; color: #9b1c1c; }
table { border-collapse: collapse; font-size: 14px; }
th, td { border: 1px solid #ddd; padding: 4px 8px; text-align: right; }
.caption { color: #777; font-size: 12px; }
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    Success,
    Info,
    Warning,
    Error,
}

impl BannerKind {
    fn class(self) -> &'static str {
        match self {
            BannerKind::Success => "banner-success",
            BannerKind::Info => "banner-info",
            BannerKind::Warning => "banner-warning",
            BannerKind::Error => "banner-error",
        }
    }
}

/// A status message; `body` must already be escaped markup.
fn banner(kind: BannerKind, body: &str) -> String {
    format!(r#"<div class="banner {}">{}</div>"#, kind.class(), body)
}

fn code(text: &str) -> String {
    format!("<code>{}</code>", escape(text))
}

fn selection_href(path: &str, dataset: &str, model: &str) -> String {
    format!(
        "{}?dataset={}&model={}",
        path,
        urlencoding::encode(dataset),
        urlencoding::encode(model)
    )
}

pub struct PageView<'a> {
    pub settings: &'a PageSettings,
    pub catalog: &'a Catalog,
    pub selection: &'a Selection,
    pub preview: &'a Result<DataPreview, ArtifactError>,
    pub deploy: Option<&'a DeployReport>,
}

impl PageView<'_> {
    pub fn render(&self) -> String {
        let mut html = String::new();
        html.push_str(&format!(
            r#"<!DOCTYPE html><html lang="en"><head><meta charset="utf-8"><title>{}</title><style>{}</style></head><body>"#,
            escape(&self.settings.title),
            STYLE
        ));
        html.push_str(&self.sidebar());
        html.push_str(r#"<main class="content">"#);
        html.push_str(&format!(
            r#"<p class="main-header">📊 {}</p><p class="sub-header">{}</p><hr>"#,
            escape(&self.settings.title),
            escape(&self.settings.subtitle)
        ));
        html.push_str(&self.preview_section());
        html.push_str("<hr>");
        html.push_str(&self.model_section());
        if let Some(report) = self.deploy {
            html.push_str(&self.deploy_section(report));
        }
        html.push_str("</main></body></html>");
        html
    }

    fn sidebar(&self) -> String {
        let dataset = self.selection.dataset.as_str();
        let model = self.selection.model.as_str();

        let mut html = String::from(r#"<aside class="sidebar"><h2>📁 Project Controls</h2><p>Select Stock Dataset:</p><nav>"#);
        for option in self.catalog.datasets() {
            let marker = if option.as_str() == dataset { "●" } else { "○" };
            html.push_str(&format!(
                r#"<a href="{}">{} {}</a>"#,
                escape(&selection_href("/", option.as_str(), model)),
                marker,
                escape(option.as_str())
            ));
        }
        html.push_str("</nav>");
        html.push_str(&banner(
            BannerKind::Info,
            &format!("<strong>Current Status:</strong><br>Selected: {}", escape(dataset)),
        ));
        html.push_str(&format!(
            r#"<hr><p class="caption">{}</p></aside>"#,
            escape(&self.settings.footer)
        ));
        html
    }

    fn preview_section(&self) -> String {
        let dataset = self.selection.dataset.as_str();
        let mut html = format!("<h2>1. Preprocessing Summary: {}</h2>", escape(dataset));

        match self.preview {
            Ok(preview) => {
                let path = processed_csv(&self.selection.dataset);
                html.push_str(r#"<div class="columns"><div class="narrow">"#);
                html.push_str(&banner(BannerKind::Success, &format!("✅ Loaded {}", escape(&path))));
                html.push_str("<p><strong>Pipeline Applied:</strong></p><ul>");
                for step in &self.settings.pipeline_steps {
                    html.push_str(&format!("<li>{}</li>", escape(step)));
                }
                html.push_str(r#"</ul></div><div class="wide">"#);
                html.push_str(&format!(
                    "<p><strong>Data Preview (First {} Rows):</strong></p>",
                    preview.rows.len()
                ));
                html.push_str(&preview_table(preview));
                html.push_str("</div></div>");
            }
            Err(ArtifactError::Missing { path, .. }) => {
                html.push_str(&banner(
                    BannerKind::Warning,
                    &format!(
                        "⚠️ File not found: {}. Please ensure it exists in the directory.",
                        code(&path.display().to_string())
                    ),
                ));
            }
            Err(e) => {
                html.push_str(&banner(BannerKind::Error, &escape(&e.to_string())));
            }
        }
        html
    }

    fn model_section(&self) -> String {
        let dataset = self.selection.dataset.as_str();
        let model = self.selection.model.as_str();

        let mut html = String::from(
            r#"<h2>2. Model Application &amp; Results</h2><form method="get" action="/deploy">"#,
        );
        html.push_str(&format!(
            r#"<input type="hidden" name="dataset" value="{}"><label for="model">Choose Model Architecture:</label> <select id="model" name="model">"#,
            escape(dataset)
        ));
        for option in self.catalog.models() {
            let selected = if option.as_str() == model { " selected" } else { "" };
            html.push_str(&format!(
                r#"<option value="{0}"{1}>{0}</option>"#,
                escape(option.as_str()),
                selected
            ));
        }
        html.push_str(&format!(
            r#"</select> <button type="submit" formaction="/">Select</button> <button type="submit">🚀 Deploy {}</button></form>"#,
            escape(model)
        ));
        html
    }

    fn deploy_section(&self, report: &DeployReport) -> String {
        let model = escape(report.model.as_str());

        match &report.outcome {
            Ok(loaded) => {
                let mut html = banner(
                    BannerKind::Success,
                    &format!("✅ <strong>Success:</strong> {} loaded successfully!", model),
                );
                html.push_str(&format!("<h3>Interactive Dashboard: {}</h3>", model));
                html.push_str(&embed_trusted_markup(&loaded.html, self.settings.frame_height));
                html
            }
            Err(ArtifactError::Missing { kind: ArtifactKind::Model, path }) => {
                let mut html = banner(
                    BannerKind::Error,
                    &format!("❌ <strong>Missing Model File:</strong> {}", code(&path.display().to_string())),
                );
                html.push_str(&banner(
                    BannerKind::Info,
                    "Please make sure you have trained this specific model and the .pkl file is in the folder.",
                ));
                html
            }
            Err(ArtifactError::Missing { path, .. }) => {
                let mut html = banner(
                    BannerKind::Error,
                    &format!(
                        "❌ <strong>Missing Dashboard File:</strong> {}",
                        code(&path.display().to_string())
                    ),
                );
                html.push_str(&banner(
                    BannerKind::Info,
                    "Please make sure the HTML dashboard file is in the folder.",
                ));
                html
            }
            Err(ArtifactError::Deserialization { path, message }) => {
                let mut html = banner(BannerKind::Error, "⚠️ <strong>Model Loading Error</strong>");
                html.push_str(&banner(
                    BannerKind::Warning,
                    &format!(
                        "The model file {} could not be loaded.<br><br><strong>Technical Error:</strong> {}<br><br><strong>Possible Fix:</strong> {}",
                        code(&path.display().to_string()),
                        escape(message),
                        escape(VERSION_MISMATCH_HINT)
                    ),
                ));
                html
            }
            Err(e) => banner(BannerKind::Error, &escape(&e.to_string())),
        }
    }
}

fn preview_table(preview: &DataPreview) -> String {
    let mut html = String::from("<table><thead><tr>");
    for column in &preview.columns {
        html.push_str(&format!("<th>{}</th>", escape(column)));
    }
    html.push_str("</tr></thead><tbody>");
    for row in &preview.rows {
        html.push_str("<tr>");
        for cell in row {
            html.push_str(&format!("<td>{}</td>", escape(cell)));
        }
        html.push_str("</tr>");
    }
    html.push_str(&format!(
        r#"</tbody></table><p class="caption">{} rows × {} columns</p>"#,
        preview.total_rows,
        preview.columns.len()
    ));
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::deploy_service::{DeployStage, LoadedDashboard};
    use crate::domain::loaded::ModelSummary;
    use crate::domain::selection::{DatasetId, ModelLabel};
    use std::path::PathBuf;

    fn render(preview: Result<DataPreview, ArtifactError>, deploy: Option<DeployReport>) -> String {
        let settings = PageSettings::default();
        let catalog = Catalog::default();
        let selection = Selection::new(DatasetId::new("FAUJI"), ModelLabel::new("Random Forest"));
        PageView {
            settings: &settings,
            catalog: &catalog,
            selection: &selection,
            preview: &preview,
            deploy: deploy.as_ref(),
        }
        .render()
    }

    fn missing_csv() -> Result<DataPreview, ArtifactError> {
        Err(ArtifactError::Missing {
            kind: ArtifactKind::ProcessedData,
            path: PathBuf::from("FAUJI_Processed_Data.csv"),
        })
    }

    fn report(outcome: Result<LoadedDashboard, ArtifactError>) -> DeployReport {
        DeployReport {
            model: ModelLabel::new("Random Forest"),
            stages: vec![DeployStage::Idle],
            outcome,
        }
    }

    #[test]
    fn test_missing_csv_warns_without_table() {
        let html = render(missing_csv(), None);

        assert!(html.contains("banner-warning"));
        assert!(html.contains("<code>FAUJI_Processed_Data.csv</code>"));
        assert!(!html.contains("<table>"));
        assert!(!html.contains("<iframe"));
    }

    #[test]
    fn test_preview_table_is_escaped() {
        let preview = DataPreview::new(
            vec!["Date".to_string(), "Note".to_string()],
            vec![vec!["2024-01-01".to_string(), "<b>up</b>".to_string()]],
            1,
        );

        let html = render(Ok(preview), None);

        assert!(html.contains("✅ Loaded FAUJI_Processed_Data.csv"));
        assert!(html.contains("<th>Date</th><th>Note</th>"));
        assert!(html.contains("<td>&lt;b&gt;up&lt;/b&gt;</td>"));
        assert!(html.contains("1 rows × 2 columns"));
        assert!(html.contains("Null handling (ffill/bfill)"));
    }

    #[test]
    fn test_controls_reflect_selection() {
        let html = render(missing_csv(), None);

        assert!(html.contains("Selected: FAUJI"));
        assert!(html.contains(r#"href="/?dataset=OGDCL&amp;model=Random%20Forest""#));
        assert!(html.contains(r#"<option value="Random Forest" selected>"#));
        assert!(html.contains("🚀 Deploy Random Forest"));
    }

    #[test]
    fn test_missing_model_banner() {
        let html = render(
            missing_csv(),
            Some(report(Err(ArtifactError::Missing {
                kind: ArtifactKind::Model,
                path: PathBuf::from("FAUJI_Random_Forest_Model.pkl"),
            }))),
        );

        assert!(html.contains("Missing Model File:</strong> <code>FAUJI_Random_Forest_Model.pkl</code>"));
        assert!(html.contains(".pkl file is in the folder"));
        assert!(!html.contains("<iframe"));
    }

    #[test]
    fn test_load_error_includes_message_and_hint() {
        let html = render(
            missing_csv(),
            Some(report(Err(ArtifactError::Deserialization {
                path: PathBuf::from("FAUJI_Random_Forest_Model.pkl"),
                message: "unexpected end of file".to_string(),
            }))),
        );

        assert!(html.contains("Model Loading Error"));
        assert!(html.contains("unexpected end of file"));
        assert!(html.contains("pip install --upgrade scikit-learn"));
        assert!(!html.contains("<iframe"));
    }

    #[test]
    fn test_successful_deploy_embeds_dashboard() {
        let html = render(
            missing_csv(),
            Some(report(Ok(LoadedDashboard {
                summary: ModelSummary {
                    size_bytes: 10,
                    root_kind: "dict",
                },
                html: "<h1>RF</h1>".to_string(),
            }))),
        );

        assert!(html.contains("Random Forest loaded successfully!"));
        assert!(html.contains("Interactive Dashboard: Random Forest"));
        assert!(html.contains(r#"srcdoc="&lt;h1&gt;RF&lt;/h1&gt;" height="1000" scrolling="yes""#));
    }
}
