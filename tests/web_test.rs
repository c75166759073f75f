use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use menu_profit::{
    ArtifactContext, ArtifactError, ArtifactKind, ClassIndex, Classifier, FeatureVector, InferenceError,
    InferencePipeline, LabelDecoder, MenuRecord, ProfitabilityService, Transform,
};
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use tokio::net::TcpListener;

struct PriceTransform;

impl Transform for PriceTransform {
    fn requires_frequency(&self) -> bool {
        false
    }

    fn apply(&self, record: &MenuRecord, _: Option<f32>) -> Result<FeatureVector, InferenceError> {
        if record.menu_category == "Unseen" {
            return Err(InferenceError::Transform("Found unknown categories ['Unseen'] in column 0".into()));
        }
        Ok(FeatureVector::new(vec![record.price as f32]))
    }
}

/// Expensive items are High, cheap ones Low.
struct PriceClassifier;

impl Classifier for PriceClassifier {
    fn predict(&self, features: &FeatureVector) -> Result<ClassIndex, InferenceError> {
        Ok(if features.as_slice()[0] >= 10.0 { 0 } else { 1 })
    }
}

fn ready_service() -> ProfitabilityService {
    let pipeline = InferencePipeline::new(
        Box::new(PriceTransform),
        Box::new(PriceClassifier),
        Box::new(LabelDecoder::from_classes(&["High", "Low", "Medium"]).unwrap()),
        None,
    );
    ProfitabilityService::new(Ok(Arc::new(ArtifactContext::new(pipeline, Vec::new()))))
}

async fn spawn_server(service: ProfitabilityService) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(menu_profit::web::serve(listener, service));
    addr
}

fn form(price: &str, ingredients: &str) -> Vec<(&'static str, String)> {
    vec![
        ("restaurant_id", "R1".to_string()),
        ("menu_category", "Appetizer".to_string()),
        ("menu_item", "Spring Roll".to_string()),
        ("price", price.to_string()),
        ("ingredients", ingredients.to_string()),
    ]
}

#[tokio::test]
async fn test_index_renders_form() -> Result<(), Box<dyn std::error::Error>> {
    let addr = spawn_server(ready_service()).await;
    let response = reqwest::get(format!("http://{}/", addr)).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.text().await?;
    assert!(body.contains("<form method=\"post\" action=\"/predict\">"));
    assert!(body.contains("name=\"ingredients\""));
    assert!(body.contains("Fill out the form"));
    assert!(!body.contains("Predictions are unavailable."));
    Ok(())
}

#[tokio::test]
async fn test_predict_renders_label() -> Result<(), Box<dyn std::error::Error>> {
    let addr = spawn_server(ready_service()).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("http://{}/predict", addr))
        .form(&form("12.00", "rice, nori, salmon"))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await?;
    assert!(body.contains("Prediction: High"));
    assert!(body.contains("result-success"));
    assert!(body.contains("$13.20"));

    let response = client
        .post(format!("http://{}/predict", addr))
        .form(&form("2.50", "rice"))
        .send()
        .await?;
    let body = response.text().await?;
    assert!(body.contains("Prediction: Low"));
    assert!(body.contains("result-warning"));
    Ok(())
}

#[tokio::test]
async fn test_predict_validation_warning() -> Result<(), Box<dyn std::error::Error>> {
    let addr = spawn_server(ready_service()).await;
    let response = reqwest::Client::new()
        .post(format!("http://{}/predict", addr))
        .form(&form("5.50", ""))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = response.text().await?;
    assert!(body.contains("Missing: Ingredients"));
    assert!(!body.contains("Prediction:"));
    // The submitted values are kept in the form
    assert!(body.contains("value=\"Spring Roll\""));
    Ok(())
}

#[tokio::test]
async fn test_unreadable_form_renders_page() -> Result<(), Box<dyn std::error::Error>> {
    let addr = spawn_server(ready_service()).await;
    let response = reqwest::Client::new()
        .post(format!("http://{}/predict", addr))
        .header(CONTENT_TYPE, "text/plain")
        .body("menu_item=Spring Roll")
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let body = response.text().await?;
    assert!(body.contains("The form could not be read"));
    assert!(body.contains("banner-warning"));
    assert!(body.contains("<form method=\"post\" action=\"/predict\">"));
    assert!(!body.contains("Prediction: "));
    Ok(())
}

#[tokio::test]
async fn test_predict_inference_failure_keeps_serving() -> Result<(), Box<dyn std::error::Error>> {
    let addr = spawn_server(ready_service()).await;
    let client = reqwest::Client::new();

    let mut unseen = form("5.50", "cabbage");
    unseen[1].1 = "Unseen".to_string();
    let response = client.post(format!("http://{}/predict", addr)).form(&unseen).send().await?;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.text().await?;
    assert!(body.contains("Prediction failed:"));
    assert!(!body.contains("Prediction: "));

    // The next submission still works
    let response = client
        .post(format!("http://{}/predict", addr))
        .form(&form("5.50", "cabbage"))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn test_missing_artifacts_banner() -> Result<(), Box<dyn std::error::Error>> {
    let service = ProfitabilityService::new(Err(ArtifactError::Missing {
        artifact: ArtifactKind::Classifier,
        path: PathBuf::from("xgb_model.onnx"),
    }));
    let addr = spawn_server(service).await;

    let response = reqwest::get(format!("http://{}/", addr)).await?;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(response.text().await?.contains("Predictions are unavailable."));

    let response = reqwest::Client::new()
        .post(format!("http://{}/predict", addr))
        .form(&form("5.50", "cabbage"))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = response.text().await?;
    assert!(body.contains("classifier not found"));
    assert!(!body.contains("Prediction: "));
    Ok(())
}
