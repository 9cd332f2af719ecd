//! Client for the product lookup service.
//!
//! The service speaks a `{success, data | error, timestamp}` envelope over
//! `GET /api/products/{barcode}`. A missing product is a normal outcome,
//! not an error.

use gloo::net::http::Request;
use serde::Deserialize;

use crate::error::LookupError;
use crate::product::ProductData;

pub const MAX_BARCODE_LEN: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    Found(ProductData),
    NotFound,
}

/// Character-set and length rules for a barcode, checked before the request
/// goes out. Mirrors the server-side schema.
pub fn validate_barcode(barcode: &str) -> Result<(), LookupError> {
    if barcode.is_empty() {
        return Err(LookupError::InvalidBarcode("Штрихкод не может быть пустым"));
    }
    if barcode.len() > MAX_BARCODE_LEN {
        return Err(LookupError::InvalidBarcode("Штрихкод слишком длинный"));
    }
    if !barcode
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        return Err(LookupError::InvalidBarcode(
            "Штрихкод содержит недопустимые символы",
        ));
    }
    Ok(())
}

/// Look a barcode up. `PRODUCT_NOT_FOUND` maps to `LookupOutcome::NotFound`;
/// every other service error surfaces its message.
pub async fn fetch_product(barcode: &str) -> Result<LookupOutcome, LookupError> {
    validate_barcode(barcode)?;
    let response = Request::get(&format!("/api/products/{barcode}"))
        .send()
        .await?;
    let envelope: ApiEnvelope<ProductData> = response.json().await?;
    interpret(envelope)
}

fn interpret(envelope: ApiEnvelope<ProductData>) -> Result<LookupOutcome, LookupError> {
    if envelope.success {
        return Ok(match envelope.data {
            Some(product) => LookupOutcome::Found(product),
            None => LookupOutcome::NotFound,
        });
    }
    match envelope.error {
        Some(error) if error.code == "PRODUCT_NOT_FOUND" => Ok(LookupOutcome::NotFound),
        Some(error) => Err(LookupError::Api {
            code: error.code,
            message: error.message,
        }),
        None => Err(LookupError::Api {
            code: "INTERNAL_ERROR".to_string(),
            message: "Внутренняя ошибка сервера".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_and_alphanumeric_barcodes_validate() {
        assert!(validate_barcode("5909990944514").is_ok());
        assert!(validate_barcode("ABC-123-xyz").is_ok());
    }

    #[test]
    fn empty_barcodes_are_rejected() {
        assert!(validate_barcode("").is_err());
    }

    #[test]
    fn overlong_barcodes_are_rejected() {
        let barcode = "1".repeat(MAX_BARCODE_LEN + 1);
        assert!(validate_barcode(&barcode).is_err());
        assert!(validate_barcode(&"1".repeat(MAX_BARCODE_LEN)).is_ok());
    }

    #[test]
    fn forbidden_characters_are_rejected() {
        assert!(validate_barcode("1234 567").is_err());
        assert!(validate_barcode("12/34").is_err());
        assert!(validate_barcode("штрихкод").is_err());
    }

    #[test]
    fn success_envelope_yields_the_product() {
        let envelope: ApiEnvelope<ProductData> = serde_json::from_str(
            r#"{
                "success": true,
                "data": {
                    "id": "p-1",
                    "ean": "5909990944514",
                    "name": "Test Product 1",
                    "price": 48.12,
                    "quantity": 78,
                    "min_quantity": 5,
                    "location": "CS-9-A-18",
                    "category": "Cosmetics",
                    "unit": "pieces"
                },
                "timestamp": "2025-01-01T00:00:00.000Z"
            }"#,
        )
        .unwrap();
        let LookupOutcome::Found(product) = interpret(envelope).unwrap() else {
            panic!("expected a product");
        };
        assert_eq!(product.ean, "5909990944514");
        assert_eq!(product.quantity, 78);
    }

    #[test]
    fn success_without_data_reads_as_not_found() {
        // The payload type carries no Default; a missing field is still None.
        let envelope: ApiEnvelope<ProductData> =
            serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert_eq!(envelope.data, None);
        assert_eq!(interpret(envelope).unwrap(), LookupOutcome::NotFound);
    }

    #[test]
    fn not_found_envelope_is_a_normal_outcome() {
        let envelope: ApiEnvelope<ProductData> = serde_json::from_str(
            r#"{
                "success": false,
                "error": {
                    "code": "PRODUCT_NOT_FOUND",
                    "message": "Товар с указанным штрихкодом не найден"
                },
                "timestamp": "2025-01-01T00:00:00.000Z"
            }"#,
        )
        .unwrap();
        assert_eq!(interpret(envelope).unwrap(), LookupOutcome::NotFound);
    }

    #[test]
    fn other_service_errors_surface_their_message() {
        let envelope: ApiEnvelope<ProductData> = serde_json::from_str(
            r#"{
                "success": false,
                "error": {"code": "DATABASE_ERROR", "message": "Ошибка базы данных"}
            }"#,
        )
        .unwrap();
        let err = interpret(envelope).unwrap_err();
        assert_eq!(err.to_string(), "Ошибка базы данных");
    }

    #[test]
    fn malformed_error_envelope_still_fails_loudly() {
        let envelope: ApiEnvelope<ProductData> =
            serde_json::from_str(r#"{"success": false}"#).unwrap();
        assert!(interpret(envelope).is_err());
    }
}
