use std::fmt::Write;

use crate::record::MenuForm;
use crate::service::{Prediction, ProfitabilityService, SubmitError};

/// What the result panel should show.
#[derive(Debug)]
pub enum Outcome {
    Idle,
    Predicted(Prediction),
    Failed(SubmitError),
}

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; margin: 0; background: #f8fafc; color: #1e293b; }
header, main, footer { max-width: 1100px; margin: 0 auto; padding: 1rem 1.5rem; }
main { display: grid; grid-template-columns: 2fr 3fr; gap: 2rem; }
form label { display: block; margin-top: .75rem; font-weight: 600; }
form input, form textarea { width: 100%; padding: .5rem; box-sizing: border-box; }
form button { margin-top: 1rem; width: 100%; padding: .75rem; font-size: 1rem; }
.banner-error { background: #fee2e2; color: #991b1b; padding: 1rem; border-radius: .5rem; }
.banner-warning { background: #fef3c7; color: #92400e; padding: 1rem; border-radius: .5rem; }
.custom-info { background: #e0f2fe; padding: 1rem; border-radius: .5rem; }
.prediction-message { padding: 1rem; border-radius: .5rem; }
.result-success { background: #dcfce7; color: #166534; }
.result-caution { background: #fef3c7; color: #92400e; }
.result-warning { background: #fee2e2; color: #991b1b; }
.metrics { display: grid; grid-template-columns: repeat(3, 1fr); gap: 1rem; margin-top: 1rem; }
.prediction-value { font-size: 1.75rem; font-weight: 700; }
.prediction-diff { color: #16a34a; }
.illustrative { color: #64748b; font-size: .85rem; }
table { border-collapse: collapse; width: 100%; }
td, th { border: 1px solid #cbd5e1; padding: .35rem .5rem; text-align: left; }
footer p { text-align: center; color: #666; font-size: 14px; }
"#;

/// Escapes text for use in HTML element content and quoted attributes.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

pub fn render_page(service: &ProfitabilityService, form: &MenuForm, outcome: &Outcome) -> String {
    let mut html = String::with_capacity(8 * 1024);
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<title>Menu Profitability Predictor</title>\n");
    let _ = write!(html, "<style>{}</style>\n</head>\n<body>\n", STYLE);

    html.push_str("<header>\n<h2 class=\"prediction-title\">🍽️ Menu Profitability Predictor</h2>\n");
    html.push_str("<p>Predict the profitability of your restaurant menu items with AI-powered analytics.</p>\n");
    if let Err(e) = service.artifacts() {
        let _ = write!(
            html,
            "<div class=\"banner-error\" role=\"alert\"><b>Predictions are unavailable.</b> {}</div>\n",
            escape_html(&e.to_string())
        );
    }
    html.push_str("</header>\n<main>\n");

    render_form(&mut html, form);

    html.push_str("<section>\n<h3>🔮 Prediction Results</h3>\n");
    render_outcome(&mut html, outcome);
    html.push_str("</section>\n</main>\n");

    render_footer(&mut html, service);
    html.push_str("</body>\n</html>\n");
    html
}

fn render_form(html: &mut String, form: &MenuForm) {
    let _ = write!(
        html,
        r#"<section>
<h3>📝 Menu Information</h3>
<form method="post" action="/predict">
<label for="restaurant_id">Restaurant ID</label>
<input id="restaurant_id" name="restaurant_id" type="text" value="{}">
<label for="menu_category">Menu Category</label>
<input id="menu_category" name="menu_category" type="text" value="{}">
<label for="menu_item">Menu Item Name</label>
<input id="menu_item" name="menu_item" type="text" value="{}">
<label for="price">Price ($)</label>
<input id="price" name="price" type="number" min="0" step="0.01" value="{}">
<label for="ingredients">Ingredients</label>
<textarea id="ingredients" name="ingredients" rows="4">{}</textarea>
<button type="submit">✨ Predict Profitability</button>
</form>
</section>
"#,
        escape_html(&form.restaurant_id),
        escape_html(&form.menu_category),
        escape_html(&form.menu_item),
        escape_html(&form.price),
        escape_html(&form.ingredients),
    );
}

fn render_outcome(html: &mut String, outcome: &Outcome) {
    match outcome {
        Outcome::Idle => {
            html.push_str("<div class=\"custom-info\">👈 <b>Fill out the form and click 'Predict Profitability'</b></div>\n");
        }
        Outcome::Failed(SubmitError::Validation(e)) => {
            let _ = write!(html, "<div class=\"banner-warning\" role=\"alert\">{}</div>\n", escape_html(&e.to_string()));
        }
        Outcome::Failed(e) => {
            let _ = write!(html, "<div class=\"banner-error\" role=\"alert\">{}</div>\n", escape_html(&e.to_string()));
        }
        Outcome::Predicted(prediction) => render_prediction(html, prediction),
    }
}

fn render_prediction(html: &mut String, prediction: &Prediction) {
    html.push_str("<details open>\n<summary>📊 View Input Data</summary>\n<table>\n<tr>");
    let columns = prediction.record.columns();
    for (name, _) in &columns {
        let _ = write!(html, "<th>{}</th>", name);
    }
    html.push_str("</tr>\n<tr>");
    for (_, value) in &columns {
        let _ = write!(html, "<td>{}</td>", escape_html(value));
    }
    html.push_str("</tr>\n</table>\n</details>\n");

    let label = prediction.label;
    let _ = write!(
        html,
        "<h3 class=\"prediction-title\">Prediction: {}</h3>\n<div class=\"prediction-message {}\">{}</div>\n",
        label,
        label.framing().css_class(),
        label.message()
    );

    let metrics = &prediction.metrics;
    let _ = write!(
        html,
        r#"<div class="metrics">
<div><div class="prediction-value">{}%</div><div class="prediction-diff">↑ {}% vs average</div></div>
<div><div class="prediction-value">${:.2}</div><div class="prediction-diff">↑ +{}%</div></div>
<div><div class="prediction-value">{}</div><div class="prediction-diff">↑ In your database</div></div>
</div>
<p class="illustrative">Illustrative figures only. They are not produced by the model.</p>
"#,
        metrics.confidence_pct,
        metrics.confidence_vs_average_pct,
        metrics.adjusted_price,
        metrics.adjusted_price_change_pct,
        metrics.similar_items,
    );
}

fn render_footer(html: &mut String, service: &ProfitabilityService) {
    html.push_str("<footer>\n<hr>\n");
    html.push_str("<p>This prediction is based on machine learning models and historical data. Actual results may vary.</p>\n");
    if let Ok(context) = service.artifacts() {
        if !context.fingerprints.is_empty() {
            let ids: Vec<String> = context
                .fingerprints
                .iter()
                .map(|f| format!("{} {}", f.artifact, f.short()))
                .collect();
            let _ = write!(html, "<p class=\"illustrative\">Artifacts: {}</p>\n", escape_html(&ids.join(" · ")));
        }
    }
    html.push_str("</footer>\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact_store::{ArtifactError, ArtifactKind};
    use crate::label::ProfitabilityLabel;
    use crate::pipeline::InferenceError;
    use crate::record::{MenuRecord, ValidationError};
    use crate::service::CosmeticMetrics;
    use std::path::PathBuf;

    fn unavailable() -> ProfitabilityService {
        ProfitabilityService::new(Err(ArtifactError::Missing {
            artifact: ArtifactKind::Preprocessor,
            path: PathBuf::from("preprocessor.onnx"),
        }))
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<b>\"Fish & Chips\"</b>"), "&lt;b&gt;&quot;Fish &amp; Chips&quot;&lt;/b&gt;");
        assert_eq!(escape_html("it's"), "it&#39;s");
    }

    #[test]
    fn test_banner_when_artifacts_missing() {
        let page = render_page(&unavailable(), &MenuForm::default(), &Outcome::Idle);
        assert!(page.contains("Predictions are unavailable."));
        assert!(page.contains("preprocessing transform not found"));
    }

    #[test]
    fn test_form_values_are_escaped() {
        let form = MenuForm {
            menu_item: "<script>alert(1)</script>".into(),
            ..MenuForm::default()
        };
        let page = render_page(&unavailable(), &form, &Outcome::Idle);
        assert!(!page.contains("<script>"));
        assert!(page.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_prediction_panel() {
        let record = MenuRecord::new("R1", "Appetizer", "Spring Roll", "cabbage, flour, oil", 5.5);
        let prediction = Prediction {
            metrics: CosmeticMetrics::for_price(record.price),
            record,
            label: ProfitabilityLabel::Low,
            menu_item_freq: Some(0.0),
        };
        let page = render_page(&unavailable(), &MenuForm::default(), &Outcome::Predicted(prediction));
        assert!(page.contains("Prediction: Low"));
        assert!(page.contains("result-warning"));
        assert!(page.contains("$6.05"));
        assert!(page.contains("Illustrative figures only"));
        assert!(page.contains("<td>Spring Roll</td>"));
    }

    #[test]
    fn test_validation_and_inference_failures_render_differently() {
        let validation = Outcome::Failed(SubmitError::Validation(ValidationError::EmptyFields(vec!["Ingredients"])));
        let page = render_page(&unavailable(), &MenuForm::default(), &validation);
        assert!(page.contains("banner-warning"));
        assert!(page.contains("Missing: Ingredients"));

        let inference = Outcome::Failed(SubmitError::Inference(InferenceError::Transform("unknown category".into())));
        let page = render_page(&unavailable(), &MenuForm::default(), &inference);
        assert!(page.contains("Prediction failed: Transform error: unknown category"));
    }
}
