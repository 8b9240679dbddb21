//! Prediction service integration.
//!
//! Turns a `FormRecord` into the flat JSON body the service expects and posts
//! it to `{base_url}/predict`. One attempt per call: no retry, no custom
//! timeout.

use reqwest::blocking::Client;
use serde_json::{Map, Number, Value};
use tracing::{info, warn};

use crate::domain::{Field, FieldValue, FormRecord, PredictionResult};
use crate::error::AppError;

/// Path appended to the configured base URL.
pub const PREDICT_PATH: &str = "/predict";

/// Request body: one key per field, in form order.
pub type PredictionRequest = Map<String, Value>;

/// Flatten a record into the request body.
///
/// - unset numbers become `0`
/// - booleans become `0` / `1`
/// - numbers and codes pass through unchanged
pub fn normalize(record: &FormRecord) -> PredictionRequest {
    let mut body = Map::new();
    for field in Field::ALL {
        let value = match record.get(field) {
            FieldValue::Number(n) => number_value(n.unwrap_or(0.0)),
            FieldValue::Flag(b) => Value::from(u8::from(b)),
            FieldValue::Code(code) => Value::String(code),
        };
        body.insert(field.key().to_string(), value);
    }
    body
}

fn number_value(v: f64) -> Value {
    // Whole amounts go out as integers, matching what a browser client sends.
    if v.fract() == 0.0 && v.abs() < 9.0e15 {
        return Value::from(v as i64);
    }
    Number::from_f64(v).map(Value::Number).unwrap_or(Value::from(0))
}

/// Anything that can answer a prediction request.
pub trait PredictionService {
    fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult, AppError>;
}

/// Blocking HTTP client for the remote prediction service.
#[derive(Debug, Clone)]
pub struct PredictionClient {
    client: Client,
    base_url: String,
}

impl PredictionClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn endpoint(&self) -> String {
        format!("{}{PREDICT_PATH}", self.base_url)
    }
}

impl PredictionService for PredictionClient {
    fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult, AppError> {
        let endpoint = self.endpoint();
        info!(%endpoint, fields = request.len(), "submitting prediction request");

        let resp = self
            .client
            .post(&endpoint)
            .json(request)
            .send()
            .map_err(|e| {
                warn!(error = %e, "prediction request failed");
                AppError::remote(format!("Prediction request failed: {e}"))
            })?;

        let status = resp.status();
        if !status.is_success() {
            warn!(%status, "prediction service returned an error status");
            return Err(AppError::remote(format!(
                "Prediction request failed with status {status}."
            )));
        }

        let result: PredictionResult = resp
            .json()
            .map_err(|e| AppError::remote(format!("Failed to parse prediction response: {e}")))?;

        info!(
            approved = result.approved,
            probability = ?result.approval_probability,
            "prediction received"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread;

    use super::*;

    fn test_client(base_url: &str) -> PredictionClient {
        let client = Client::builder().no_proxy().build().unwrap();
        PredictionClient::with_client(base_url, client)
    }

    /// Accept a single connection, answer it with `status` + `body`, and
    /// return the raw request text.
    fn serve_once(status: &'static str, body: &'static str) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let request = read_request(&mut stream);
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).unwrap();
            stream.flush().unwrap();
            request
        });
        (format!("http://{addr}"), handle)
    }

    fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
                continue;
            };
            let head = String::from_utf8_lossy(&buf[..pos]).to_string();
            let len = head
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    if name.eq_ignore_ascii_case("content-length") {
                        value.trim().parse::<usize>().ok()
                    } else {
                        None
                    }
                })
                .unwrap_or(0);
            if buf.len() >= pos + 4 + len {
                break;
            }
        }
        String::from_utf8_lossy(&buf).to_string()
    }

    #[test]
    fn normalize_fills_defaults() {
        let body = normalize(&FormRecord::new());
        assert_eq!(body.len(), Field::ALL.len());
        assert_eq!(body["scf_applicant_income_dollars"], Value::from(0));
        assert_eq!(body["scf_MARRIED"], Value::from(0));
        assert_eq!(body["hmda_loan_purpose"], Value::String(String::new()));
    }

    #[test]
    fn normalize_passes_values_through() {
        let mut record = FormRecord::new();
        record.applicant_income = Some(90_000.0);
        record.checking = Some(1_234.5);
        record.married = true;
        record.late_payments = false;
        record.lien_status = "2".to_string();

        let body = normalize(&record);
        assert_eq!(body["scf_applicant_income_dollars"].as_f64(), Some(90_000.0));
        assert_eq!(body["scf_CHECKING"].as_f64(), Some(1_234.5));
        assert_eq!(body["scf_MARRIED"], Value::from(1));
        assert_eq!(body["scf_LATE"], Value::from(0));
        assert_eq!(body["hmda_lien_status"], Value::String("2".to_string()));
    }

    #[test]
    fn normalize_keeps_form_order() {
        let body = normalize(&FormRecord::new());
        let keys: Vec<&str> = body.keys().map(String::as_str).collect();
        let expected: Vec<&str> = Field::ALL.iter().map(|f| f.key()).collect();
        assert_eq!(keys, expected);
    }

    #[test]
    fn endpoint_joins_base_url() {
        assert_eq!(
            PredictionClient::new("https://api.example.test/").endpoint(),
            "https://api.example.test/predict"
        );
    }

    #[test]
    fn predict_posts_json_and_parses_result() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"prediction":300000,"range_low":280000,"range_high":320000,"approved":true,"approval_probability":0.87,"explanation":[{"feature":"income","shap_value":0.4}]}"#,
        );

        let mut record = FormRecord::new();
        record.applicant_income = Some(90_000.0);
        let result = test_client(&url).predict(&normalize(&record)).unwrap();

        assert!(result.approved);
        assert_eq!(result.prediction, Some(300_000.0));
        assert_eq!(result.explanation.as_ref().map(Vec::len), Some(1));

        let request = server.join().unwrap();
        assert!(request.starts_with("POST /predict "));
        assert!(request.contains("\"scf_applicant_income_dollars\":90000"));
    }

    #[test]
    fn predict_reports_error_status() {
        let (url, server) = serve_once("500 Internal Server Error", r#"{"detail":"boom"}"#);
        let err = test_client(&url).predict(&normalize(&FormRecord::new())).unwrap_err();
        server.join().unwrap();
        assert_eq!(err.exit_code(), 4);
        assert!(err.message().contains("500"));
    }

    #[test]
    fn predict_reports_transport_error() {
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let err = test_client(&format!("http://{addr}"))
            .predict(&normalize(&FormRecord::new()))
            .unwrap_err();
        assert!(err.message().starts_with("Prediction request failed"));
    }
}
