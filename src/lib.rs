use actix_cors::Cors;
use actix_web::middleware::Compress;
use actix_web::{http::header, web, App, HttpServer};
use actix_web_prometheus::PrometheusMetricsBuilder;
use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

pub mod config;
pub mod converter;
pub mod documents;
pub mod docx;
pub mod generation;
pub mod metrics;
pub mod state;

pub use crate::config::AppConfig;
pub use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    #[schema(example = "erro")]
    pub status: String,
    pub error: String,
    pub message: String,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_type: &str, message: &str) -> Self {
        Self {
            status: "erro".to_string(),
            error: error_type.to_string(),
            message: message.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn not_found(message: &str) -> Self {
        Self::new("NotFound", message)
    }

    pub fn bad_request(message: &str) -> Self {
        Self::new("BadRequest", message)
    }

    pub fn internal_error(message: &str) -> Self {
        Self::new("InternalServerError", message)
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::generation::handlers::index,
        crate::generation::handlers::health,
        crate::generation::handlers::gerar_autorizacao,
        crate::generation::handlers::gerar_contrato_corretagem,
        crate::generation::handlers::gerar_declaracao_visita,
        crate::generation::handlers::gerar_promessa_compra_venda,
        crate::generation::handlers::gerar_modelo,
        crate::generation::handlers::convert_upload,
        crate::generation::handlers::download
    ),
    components(
        schemas(
            documents::AutorizacaoVendaRequest,
            documents::ContratoCorretagemRequest,
            documents::contrato_corretagem::Contratante,
            documents::contrato_corretagem::Corretor,
            documents::contrato_corretagem::Testemunha,
            documents::DeclaracaoVisitaRequest,
            documents::declaracao_visita::Visitante,
            documents::PromessaCompraVendaRequest,
            documents::promessa_compra_venda::Pessoa,
            documents::promessa_compra_venda::DadosImovel,
            documents::promessa_compra_venda::Pagamento,
            documents::ModeloLivreRequest,
            generation::models::GenerationResponse,
            generation::models::GreetingResponse,
            generation::models::HealthResponse,
            generation::models::ConvertUploadRequest,
            ErrorResponse,
        )
    ),
    tags(
        (name = "Documentos", description = "Template filling and PDF generation."),
        (name = "Conversão", description = "Direct office-to-PDF conversion."),
        (name = "Service", description = "Greeting and health.")
    )
)]
pub struct ApiDoc;

/// Every route of the service: documents, downloads, metrics and docs.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.configure(generation::routes::config)
        .service(web::resource("/metrics/documents").route(web::get().to(metrics::documents_metrics)))
        .service(SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-doc/openapi.json", ApiDoc::openapi()));
}

fn cors(config: &AppConfig) -> Cors {
    if config.allows_any_origin() {
        return Cors::permissive();
    }

    config
        .cors_allowed_origins
        .iter()
        .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
        .allowed_methods(vec!["GET", "POST", "OPTIONS"])
        .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE])
        .max_age(3600)
}

pub async fn run() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let state = AppState::new(config.clone())
        .await
        .context("failed to initialise the document service")?;
    let app_state = web::Data::new(state);

    tokio::spawn(generation::cleanup::start_cleanup_worker(
        config.output_dir.clone(),
        config.output_ttl,
        config.cleanup_interval,
    ));

    let prometheus = PrometheusMetricsBuilder::new("docgen")
        .endpoint("/metrics")
        .build()
        .map_err(|e| anyhow!("failed to create Prometheus metrics middleware: {}", e))?;

    log::info!("Starting server at http://{}:{}", config.host, config.port);
    log::info!("Public download base: {}", config.public_base_url);

    let server_config = config.clone();
    let mut server = HttpServer::new(move || {
        App::new()
            .wrap(Compress::default())
            .wrap(prometheus.clone())
            .wrap(cors(&server_config))
            .app_data(app_state.clone())
            .configure(configure)
    })
    .backlog(8192)
    .keep_alive(actix_web::http::KeepAlive::Os);

    if let Some(workers) = config.workers {
        server = server.workers(workers);
    }

    server
        .bind((config.host.as_str(), config.port))
        .with_context(|| format!("cannot bind {}:{}", config.host, config.port))?
        .run()
        .await
        .context("server error")
}
