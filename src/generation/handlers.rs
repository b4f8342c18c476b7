use actix_files::NamedFile;
use actix_multipart::Multipart;
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use futures_util::TryStreamExt;
use log::{debug, error, info, warn};
use sanitize_filename::sanitize;

use crate::converter::fonts::list_font_families;
use crate::converter::ConvertError;
use crate::documents::{
    AutorizacaoGenerator, AutorizacaoVendaRequest, ContratoCorretagemGenerator, ContratoCorretagemRequest,
    DeclaracaoVisitaGenerator, DeclaracaoVisitaRequest, GeneratorError, ModeloLivreGenerator, ModeloLivreRequest,
    PromessaCompraVendaGenerator, PromessaCompraVendaRequest, TemplateError,
};
use crate::generation::cleanup::is_generated_file;
use crate::generation::models::{ConvertUploadRequest, GenerationResponse, GreetingResponse, HealthResponse};
use crate::generation::service::{GeneratedDocument, ServiceError};
use crate::{AppState, ErrorResponse};

/// Largest accepted upload for `/api/convert`.
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Map a pipeline failure to its status code and `ErrorResponse`.
pub fn error_response(err: &ServiceError) -> HttpResponse {
    match err {
        ServiceError::Generator(GeneratorError::Docx(e)) => {
            error!("Template fill failed: {}", e);
            HttpResponse::InternalServerError().json(ErrorResponse::internal_error(&format!(
                "Erro ao preencher o documento: {}",
                e
            )))
        }
        ServiceError::Generator(e) => HttpResponse::BadRequest().json(ErrorResponse::bad_request(&e.to_string())),
        ServiceError::Template(TemplateError::NotFound(name)) => HttpResponse::NotFound().json(
            ErrorResponse::not_found(&format!("Template não encontrado: {}", name)),
        ),
        ServiceError::Template(TemplateError::InvalidName(name)) => HttpResponse::BadRequest().json(
            ErrorResponse::bad_request(&format!("Nome de modelo inválido: {}", name)),
        ),
        ServiceError::Convert(ConvertError::UnsupportedFormat(ext)) => HttpResponse::BadRequest().json(
            ErrorResponse::bad_request(&format!("Formato não suportado: '{}'", ext)),
        ),
        ServiceError::Convert(ConvertError::Timeout(limit)) => HttpResponse::GatewayTimeout().json(
            ErrorResponse::new(
                "GatewayTimeout",
                &format!("A conversão para PDF excedeu {}s", limit.as_secs()),
            ),
        ),
        ServiceError::Convert(e) => HttpResponse::BadGateway().json(ErrorResponse::new(
            "BadGateway",
            &format!("Falha na conversão para PDF: {}", e),
        )),
        other => {
            error!("Internal error: {}", other);
            HttpResponse::InternalServerError().json(ErrorResponse::internal_error(&other.to_string()))
        }
    }
}

fn respond(state: &AppState, result: Result<GeneratedDocument, ServiceError>) -> HttpResponse {
    match result {
        Ok(document) => {
            info!(
                "Generated {} {} ({})",
                document.kind, document.pdf_name, document.docx_name
            );
            HttpResponse::Ok().json(GenerationResponse::from_generated(document, &state.config))
        }
        Err(e) => error_response(&e),
    }
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Service",
    responses((status = 200, description = "Service greeting", body = GreetingResponse))
)]
pub async fn index() -> impl Responder {
    HttpResponse::Ok().json(GreetingResponse {
        message: "Hello Clancy!".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Service",
    responses((status = 200, description = "Converter and font status", body = HealthResponse))
)]
pub async fn health(state: web::Data<AppState>) -> impl Responder {
    let font_families = list_font_families(state.fonts_conf.as_deref()).await;
    let templates = match state.documents.templates().list().await {
        Ok(names) => names,
        Err(e) => {
            warn!("Cannot list templates: {}", e);
            Vec::new()
        }
    };

    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        converter: state.documents.describe_converter(),
        fonts_conf: state.fonts_conf.as_ref().map(|p| p.display().to_string()),
        font_families,
        templates,
    })
}

#[utoipa::path(
    post,
    path = "/gerar-pdf/autorizacao",
    tag = "Documentos",
    request_body = AutorizacaoVendaRequest,
    responses(
        (status = 200, description = "Autorização de venda generated", body = GenerationResponse),
        (status = 400, description = "Invalid template type or fields", body = ErrorResponse),
        (status = 404, description = "Template missing", body = ErrorResponse),
        (status = 502, description = "Conversion failed", body = ErrorResponse),
        (status = 504, description = "Conversion timed out", body = ErrorResponse)
    )
)]
pub async fn gerar_autorizacao(
    state: web::Data<AppState>,
    body: web::Json<AutorizacaoVendaRequest>,
) -> impl Responder {
    info!("Executing gerar_autorizacao handler");
    let result = state
        .documents
        .generate(AutorizacaoGenerator::new(), body.into_inner())
        .await;
    respond(&state, result)
}

#[utoipa::path(
    post,
    path = "/gerar-pdf/contrato-corretagem",
    tag = "Documentos",
    request_body = ContratoCorretagemRequest,
    responses(
        (status = 200, description = "Contrato de corretagem generated", body = GenerationResponse),
        (status = 400, description = "Invalid fields", body = ErrorResponse),
        (status = 404, description = "Template missing", body = ErrorResponse),
        (status = 502, description = "Conversion failed", body = ErrorResponse),
        (status = 504, description = "Conversion timed out", body = ErrorResponse)
    )
)]
pub async fn gerar_contrato_corretagem(
    state: web::Data<AppState>,
    body: web::Json<ContratoCorretagemRequest>,
) -> impl Responder {
    info!("Executing gerar_contrato_corretagem handler");
    let result = state
        .documents
        .generate(ContratoCorretagemGenerator::new(), body.into_inner())
        .await;
    respond(&state, result)
}

#[utoipa::path(
    post,
    path = "/gerar-pdf/declaracao-visita",
    tag = "Documentos",
    request_body = DeclaracaoVisitaRequest,
    responses(
        (status = 200, description = "Declaração de visita generated", body = GenerationResponse),
        (status = 400, description = "Invalid fields", body = ErrorResponse),
        (status = 404, description = "Template missing", body = ErrorResponse),
        (status = 502, description = "Conversion failed", body = ErrorResponse),
        (status = 504, description = "Conversion timed out", body = ErrorResponse)
    )
)]
pub async fn gerar_declaracao_visita(
    state: web::Data<AppState>,
    body: web::Json<DeclaracaoVisitaRequest>,
) -> impl Responder {
    info!("Executing gerar_declaracao_visita handler");
    let result = state
        .documents
        .generate(DeclaracaoVisitaGenerator::new(), body.into_inner())
        .await;
    respond(&state, result)
}

#[utoipa::path(
    post,
    path = "/gerar-pdf/promessa-compra-venda",
    tag = "Documentos",
    request_body = PromessaCompraVendaRequest,
    responses(
        (status = 200, description = "Promessa de compra e venda generated", body = GenerationResponse),
        (status = 400, description = "Invalid fields", body = ErrorResponse),
        (status = 404, description = "Template missing", body = ErrorResponse),
        (status = 502, description = "Conversion failed", body = ErrorResponse),
        (status = 504, description = "Conversion timed out", body = ErrorResponse)
    )
)]
pub async fn gerar_promessa_compra_venda(
    state: web::Data<AppState>,
    body: web::Json<PromessaCompraVendaRequest>,
) -> impl Responder {
    info!("Executing gerar_promessa_compra_venda handler");
    let result = state
        .documents
        .generate(PromessaCompraVendaGenerator::new(), body.into_inner())
        .await;
    respond(&state, result)
}

#[utoipa::path(
    post,
    path = "/gerar-pdf/modelo",
    tag = "Documentos",
    request_body = ModeloLivreRequest,
    responses(
        (status = 200, description = "Template filled; unresolved keys are listed", body = GenerationResponse),
        (status = 400, description = "Invalid template name or data", body = ErrorResponse),
        (status = 404, description = "Template missing", body = ErrorResponse),
        (status = 502, description = "Conversion failed", body = ErrorResponse),
        (status = 504, description = "Conversion timed out", body = ErrorResponse)
    )
)]
pub async fn gerar_modelo(state: web::Data<AppState>, body: web::Json<ModeloLivreRequest>) -> impl Responder {
    info!("Executing gerar_modelo handler for {}", body.modelo);
    let result = state
        .documents
        .generate(ModeloLivreGenerator::new(), body.into_inner())
        .await;
    respond(&state, result)
}

/// First `file` field of the multipart payload: (sanitized name, bytes).
async fn read_upload(mut payload: Multipart) -> Result<(String, Vec<u8>), String> {
    while let Some(mut field) = payload.try_next().await.map_err(|e| e.to_string())? {
        let Some(content_disposition) = field.content_disposition() else {
            continue;
        };
        if content_disposition.get_name() != Some("file") {
            debug!("Skipping multipart field {:?}", content_disposition.get_name());
            continue;
        }
        let file_name = content_disposition
            .get_filename()
            .map(sanitize)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| "O campo 'file' precisa de um nome de arquivo".to_string())?;

        let mut bytes = Vec::new();
        while let Some(chunk) = field.try_next().await.map_err(|e| e.to_string())? {
            if bytes.len() + chunk.len() > MAX_UPLOAD_BYTES {
                return Err(format!(
                    "Arquivo maior que o limite de {} MB",
                    MAX_UPLOAD_BYTES / (1024 * 1024)
                ));
            }
            bytes.extend_from_slice(&chunk);
        }
        if bytes.is_empty() {
            return Err("Arquivo vazio".to_string());
        }
        return Ok((file_name, bytes));
    }
    Err("Campo 'file' ausente".to_string())
}

#[utoipa::path(
    post,
    path = "/api/convert",
    tag = "Conversão",
    request_body(content = inline(ConvertUploadRequest), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Upload converted to PDF", body = GenerationResponse),
        (status = 400, description = "Missing file or unsupported format", body = ErrorResponse),
        (status = 502, description = "Conversion failed", body = ErrorResponse),
        (status = 504, description = "Conversion timed out", body = ErrorResponse)
    )
)]
pub async fn convert_upload(state: web::Data<AppState>, payload: Multipart) -> impl Responder {
    info!("Executing convert_upload handler");
    let (file_name, bytes) = match read_upload(payload).await {
        Ok(upload) => upload,
        Err(message) => {
            warn!("Rejected upload: {}", message);
            return HttpResponse::BadRequest().json(ErrorResponse::bad_request(&message));
        }
    };
    debug!("Received {} ({} bytes)", file_name, bytes.len());

    let result = state.documents.convert_upload(&file_name, &bytes).await;
    respond(&state, result)
}

/// A bare name of a file this service generated.
pub fn is_downloadable_name(name: &str) -> bool {
    !name.is_empty()
        && !name.contains(['/', '\\'])
        && !name.contains("..")
        && is_generated_file(std::path::Path::new(name))
}

#[utoipa::path(
    get,
    path = "/download/{name}",
    tag = "Documentos",
    params(("name" = String, Path, description = "File name returned by a generation endpoint")),
    responses(
        (status = 200, description = "The generated file"),
        (status = 400, description = "Invalid file name", body = ErrorResponse),
        (status = 404, description = "File not found", body = ErrorResponse)
    )
)]
pub async fn download(req: HttpRequest, state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let name = path.into_inner();
    info!("Executing download handler for {}", name);

    if !is_downloadable_name(&name) {
        warn!("Rejected download name {:?}", name);
        return HttpResponse::BadRequest().json(ErrorResponse::bad_request("Nome de arquivo inválido"));
    }

    let full_path = state.documents.output_dir().join(&name);
    match NamedFile::open_async(&full_path).await {
        Ok(file) => file
            .set_content_disposition(ContentDisposition {
                disposition: DispositionType::Attachment,
                parameters: vec![DispositionParam::Filename(name)],
            })
            .into_response(&req),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => HttpResponse::NotFound().json(
            ErrorResponse::not_found(&format!("Arquivo não encontrado: {}", name)),
        ),
        Err(e) => {
            error!("Failed to open {}: {}", full_path.display(), e);
            HttpResponse::InternalServerError().json(ErrorResponse::internal_error("Falha ao ler o arquivo"))
        }
    }
}
