mod common;

use actix_web::{http::StatusCode, test, web, App};
use std::time::Duration;

use common::{autorizacao_payload, MockConverter, MockMode, TestContext};
use docx_pdf_server::generation::models::GenerationResponse;

#[cfg(test)]
mod conversion_tests {
    use super::*;

    macro_rules! app {
        ($ctx:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new($ctx.state.clone()))
                    .configure(docx_pdf_server::configure),
            )
            .await
        };
    }

    fn multipart(field: &str, file_name: &str, content: &str) -> (String, String) {
        let boundary = "----docgen-test-boundary";
        let body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n{content}\r\n--{boundary}--\r\n"
        );
        (format!("multipart/form-data; boundary={boundary}"), body)
    }

    #[actix_web::test]
    async fn test_failed_conversion_is_bad_gateway_and_leaves_no_pdf() {
        let ctx = TestContext::new(MockMode::Fail);
        let app = app!(ctx);

        let req = test::TestRequest::post()
            .uri("/gerar-pdf/autorizacao")
            .set_json(autorizacao_payload("autorizacao_corretor"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "erro");
        assert_eq!(body["error"], "BadGateway");
        assert!(body["message"].as_str().unwrap().contains("mock failure"));

        let files = ctx.output_files();
        assert_eq!(files.len(), 1, "{files:?}");
        assert!(files[0].ends_with(".docx"));
    }

    #[actix_web::test]
    async fn test_timed_out_conversion_is_gateway_timeout() {
        let ctx = TestContext::new(MockMode::Hang);
        let app = app!(ctx);

        let req = test::TestRequest::post()
            .uri("/gerar-pdf/autorizacao")
            .set_json(autorizacao_payload("autorizacao_imobiliaria"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "GatewayTimeout");
        assert!(!ctx.output_files().iter().any(|name| name.ends_with(".pdf")));
    }

    #[actix_web::test]
    async fn test_download_serves_generated_pdf() {
        let ctx = TestContext::new(MockMode::Succeed);
        let app = app!(ctx);

        let req = test::TestRequest::post()
            .uri("/gerar-pdf/autorizacao")
            .set_json(autorizacao_payload("autorizacao_corretor"))
            .to_request();
        let generated: GenerationResponse = test::call_and_read_body_json(&app, req).await;

        let req = test::TestRequest::get()
            .uri(&format!("/download/{}", generated.pdf_name))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("content-type").unwrap().to_str().unwrap(),
            "application/pdf"
        );
        let disposition = resp
            .headers()
            .get("content-disposition")
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.starts_with("attachment"));
        assert!(disposition.contains(&generated.pdf_name));

        let body = test::read_body(resp).await;
        assert!(body.starts_with(b"%PDF-1.4"));
    }

    #[actix_web::test]
    async fn test_download_missing_file_is_not_found() {
        let ctx = TestContext::new(MockMode::Succeed);
        let app = app!(ctx);

        let req = test::TestRequest::get()
            .uri(&format!("/download/{}.pdf", uuid::Uuid::new_v4()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "NotFound");
    }

    #[actix_web::test]
    async fn test_download_rejects_traversal_and_foreign_names() {
        let ctx = TestContext::new(MockMode::Succeed);
        std::fs::write(ctx.output_dir().join("segredo.pdf"), b"%PDF").unwrap();
        let app = app!(ctx);

        for uri in [
            "/download/..%2F..%2Fetc%2Fpasswd",
            "/download/..%5Csegredo.pdf",
            "/download/segredo.pdf",
            "/download/.env",
        ] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{uri}");
        }
    }

    #[actix_web::test]
    async fn test_convert_upload_converts_as_is() {
        let ctx = TestContext::new(MockMode::Succeed);
        let app = app!(ctx);

        let (content_type, body) = multipart("file", "planilha de custos.xlsx", "conteudo");
        let req = test::TestRequest::post()
            .uri("/api/convert")
            .insert_header(("content-type", content_type))
            .set_payload(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: GenerationResponse = test::read_body_json(resp).await;
        assert_eq!(body.tipo, "conversao");
        assert!(body.docx_name.ends_with(".xlsx"));
        assert!(body.pdf_name.ends_with(".pdf"));
        assert_eq!(
            std::fs::read(ctx.output_dir().join(&body.docx_name)).unwrap(),
            b"conteudo"
        );
        assert_eq!(ctx.converter.calls(), 1);
    }

    #[actix_web::test]
    async fn test_convert_upload_rejects_unsupported_format() {
        let ctx = TestContext::new(MockMode::Succeed);
        let app = app!(ctx);

        let (content_type, body) = multipart("file", "foto.png", "png");
        let req = test::TestRequest::post()
            .uri("/api/convert")
            .insert_header(("content-type", content_type))
            .set_payload(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ctx.converter.calls(), 0);
        assert!(ctx.output_files().is_empty());
    }

    #[actix_web::test]
    async fn test_convert_upload_requires_file_field() {
        let ctx = TestContext::new(MockMode::Succeed);
        let app = app!(ctx);

        let (content_type, body) = multipart("documento", "contrato.docx", "x");
        let req = test::TestRequest::post()
            .uri("/api/convert")
            .insert_header(("content-type", content_type))
            .set_payload(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Campo 'file' ausente");
    }

    #[actix_web::test]
    async fn test_conversions_respect_concurrency_limit() {
        let converter = MockConverter::new(MockMode::Succeed).with_delay(Duration::from_millis(150));
        let ctx = TestContext::with_converter(converter, 2);
        let app = app!(ctx);

        let requests = (0..6).map(|i| {
            let req = test::TestRequest::post()
                .uri("/gerar-pdf/modelo")
                .set_json(serde_json::json!({
                    "modelo": "recibo.docx",
                    "dados": {"nome": format!("Cliente {i}"), "valor": "R$ 1,00", "referencia": "teste"}
                }))
                .to_request();
            test::call_service(&app, req)
        });
        let responses = futures_util::future::join_all(requests).await;

        assert!(responses.iter().all(|resp| resp.status() == StatusCode::OK));
        assert_eq!(ctx.converter.calls(), 6);
        assert_eq!(ctx.converter.peak(), 2);
        let pdfs = ctx.output_files().iter().filter(|name| name.ends_with(".pdf")).count();
        assert_eq!(pdfs, 6);
    }

    #[actix_web::test]
    async fn test_document_metrics_count_outcomes() {
        let ctx = TestContext::new(MockMode::Fail);
        let app = app!(ctx);

        let req = test::TestRequest::post()
            .uri("/gerar-pdf/autorizacao")
            .set_json(autorizacao_payload("autorizacao_corretor"))
            .to_request();
        test::call_service(&app, req).await;

        let req = test::TestRequest::get().uri("/metrics/documents").to_request();
        let body = test::call_and_read_body(&app, req).await;
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("docgen_documents_total{kind=\"autorizacao-de-venda\",outcome=\"erro_conversao\"}"));
        assert!(text.contains("docgen_conversion_seconds_count{kind=\"autorizacao-de-venda\"}"));
    }
}
