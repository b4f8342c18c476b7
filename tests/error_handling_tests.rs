use std::time::Duration;

use actix_web::http::StatusCode;
use docx_pdf_server::converter::ConvertError;
use docx_pdf_server::documents::{GeneratorError, TemplateError};
use docx_pdf_server::docx::DocxError;
use docx_pdf_server::generation::handlers::{error_response, is_downloadable_name};
use docx_pdf_server::generation::ServiceError;
use docx_pdf_server::ErrorResponse;

#[cfg(test)]
mod error_handling_tests {
    use super::*;

    #[test]
    fn test_error_response_shape() {
        let error_response = ErrorResponse::bad_request("Tipo de template inválido.");
        assert_eq!(error_response.status, "erro");
        assert_eq!(error_response.error, "BadRequest");
        assert!(chrono::DateTime::parse_from_rfc3339(&error_response.timestamp).is_ok());

        let json = serde_json::to_value(ErrorResponse::not_found("x")).unwrap();
        for key in ["status", "error", "message", "timestamp"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }

    #[test]
    fn test_status_codes_per_failure() {
        let cases = [
            (
                ServiceError::Generator(GeneratorError::InvalidTemplateType("x".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                ServiceError::Generator(GeneratorError::Validation("Validação falhou".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                ServiceError::Template(TemplateError::NotFound("a.docx".into())),
                StatusCode::NOT_FOUND,
            ),
            (
                ServiceError::Template(TemplateError::InvalidName("../a.docx".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                ServiceError::Generator(GeneratorError::Docx(DocxError::MissingBody)),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (ServiceError::Docx(DocxError::MissingBody), StatusCode::INTERNAL_SERVER_ERROR),
            (
                ServiceError::Convert(ConvertError::Failed {
                    code: "status 1".into(),
                    stderr: String::new(),
                }),
                StatusCode::BAD_GATEWAY,
            ),
            (
                ServiceError::Convert(ConvertError::BinaryNotFound("soffice".into())),
                StatusCode::BAD_GATEWAY,
            ),
            (
                ServiceError::Convert(ConvertError::Timeout(Duration::from_secs(60))),
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                ServiceError::Convert(ConvertError::UnsupportedFormat("png".into())),
                StatusCode::BAD_REQUEST,
            ),
            (ServiceError::Unavailable, StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, expected) in cases {
            assert_eq!(error_response(&error).status(), expected, "{error}");
        }
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(
            ServiceError::Convert(ConvertError::Timeout(Duration::from_secs(1))).outcome(),
            "timeout"
        );
        assert_eq!(
            ServiceError::Template(TemplateError::NotFound("a.docx".into())).outcome(),
            "modelo_ausente"
        );
        assert_eq!(
            ServiceError::Generator(GeneratorError::Validation(String::new())).outcome(),
            "erro_validacao"
        );
    }

    #[test]
    fn test_downloadable_names() {
        let id = uuid::Uuid::new_v4();
        assert!(is_downloadable_name(&format!("{id}.pdf")));
        assert!(is_downloadable_name(&format!("{id}.docx")));
        assert!(!is_downloadable_name(&format!("../{id}.pdf")));
        assert!(!is_downloadable_name(&format!("sub\\{id}.pdf")));
        assert!(!is_downloadable_name("relatorio.pdf"));
        assert!(!is_downloadable_name(""));
    }
}
