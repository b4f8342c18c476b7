use actix_web::{error, web, HttpResponse};

use crate::generation::handlers;
use crate::ErrorResponse;

/// JSON extractor settings: malformed bodies get an `ErrorResponse` too.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(4 * 1024 * 1024)
        .error_handler(|err, _req| {
            let message = format!("JSON inválido: {}", err);
            log::warn!("{}", message);
            let response = HttpResponse::BadRequest().json(ErrorResponse::bad_request(&message));
            error::InternalError::from_response(err, response).into()
        })
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .service(web::resource("/").route(web::get().to(handlers::index)))
        .service(web::resource("/health").route(web::get().to(handlers::health)))
        .service(
            web::scope("/gerar-pdf")
                .service(web::resource("/autorizacao").route(web::post().to(handlers::gerar_autorizacao)))
                .service(
                    web::resource("/contrato-corretagem")
                        .route(web::post().to(handlers::gerar_contrato_corretagem)),
                )
                .service(
                    web::resource("/declaracao-visita")
                        .route(web::post().to(handlers::gerar_declaracao_visita)),
                )
                .service(
                    web::resource("/promessa-compra-venda")
                        .route(web::post().to(handlers::gerar_promessa_compra_venda)),
                )
                .service(web::resource("/modelo").route(web::post().to(handlers::gerar_modelo))),
        )
        .service(web::resource("/api/convert").route(web::post().to(handlers::convert_upload)))
        .service(web::resource("/download/{name}").route(web::get().to(handlers::download)));
}
