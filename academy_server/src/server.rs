use std::time::Duration;

use academy_engine::{CatalogApi, CheckoutApi, EnrollmentApi, SqliteDatabase, UserApi};
use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use razorpay_tools::RazorpayApi;

use crate::{
    auth::TokenIssuer,
    config::{ServerConfig, ServerOptions},
    errors::ServerError,
    integrations::razorpay::RazorpayGateway,
    middleware::{HmacMiddlewareFactory, JwtAuthMiddlewareFactory, RAZORPAY_SIGNATURE_HEADER},
    routes::{
        health,
        logout,
        CancelEnrollmentRoute,
        CatalogItemRoute,
        CatalogRoute,
        CreateCatalogItemRoute,
        CreateEnrollmentRoute,
        CreateOrderRoute,
        CreateStaffRoute,
        EnrollmentPaymentsRoute,
        LoginRoute,
        MeRoute,
        MyEnrollmentsRoute,
        PaymentWebhookRoute,
        RegisterRoute,
        SearchEnrollmentsRoute,
        UpdateCatalogItemRoute,
        VerifyEmailRoute,
        VerifyPaymentRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, config.db_max_connections)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    if config.run_migrations {
        db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    } else {
        info!("🗃️ Skipping database migrations");
    }
    let api = RazorpayApi::new(config.gateway.api.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let gateway = RazorpayGateway::new(api);
    let srv = create_server_instance(config, db, gateway)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    gateway: RazorpayGateway,
) -> Result<Server, ServerError> {
    let options = ServerOptions::from_config(&config);
    let issuer = TokenIssuer::new(&config.auth);
    let key_secret = config.gateway.api.key_secret.clone();
    let webhook_secret = config.gateway.webhook_secret.clone();
    let webhook_checks = config.gateway.webhook_checks;
    let srv = HttpServer::new(move || {
        let enrollment_api = EnrollmentApi::new(db.clone());
        let checkout_api = CheckoutApi::new(db.clone(), gateway.clone(), key_secret.clone());
        let catalog_api = CatalogApi::new(db.clone());
        let user_api = UserApi::new(db.clone());
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("academy::access_log"))
            .app_data(json_config())
            .app_data(web::Data::new(enrollment_api))
            .app_data(web::Data::new(checkout_api))
            .app_data(web::Data::new(catalog_api))
            .app_data(web::Data::new(user_api))
            .app_data(web::Data::new(issuer.clone()))
            .app_data(web::Data::new(options));
        // Routes that require authentication
        let auth_scope = web::scope("/api")
            .wrap(JwtAuthMiddlewareFactory::new(issuer.clone()))
            .service(MeRoute::<SqliteDatabase>::new())
            .service(MyEnrollmentsRoute::<SqliteDatabase>::new())
            .service(SearchEnrollmentsRoute::<SqliteDatabase>::new())
            .service(CancelEnrollmentRoute::<SqliteDatabase>::new())
            .service(EnrollmentPaymentsRoute::<SqliteDatabase>::new())
            .service(CreateStaffRoute::<SqliteDatabase>::new())
            .service(CreateCatalogItemRoute::<SqliteDatabase>::new())
            .service(UpdateCatalogItemRoute::<SqliteDatabase>::new());
        let webhook_scope = web::scope("/payments/webhook")
            .wrap(HmacMiddlewareFactory::new(RAZORPAY_SIGNATURE_HEADER, webhook_secret.clone(), webhook_checks))
            .service(PaymentWebhookRoute::<SqliteDatabase, RazorpayGateway>::new());
        app.service(health)
            .service(CreateEnrollmentRoute::<SqliteDatabase>::new())
            .service(CreateOrderRoute::<SqliteDatabase, RazorpayGateway>::new())
            .service(VerifyPaymentRoute::<SqliteDatabase, RazorpayGateway>::new())
            .service(webhook_scope)
            .service(RegisterRoute::<SqliteDatabase>::new())
            .service(VerifyEmailRoute::<SqliteDatabase>::new())
            .service(LoginRoute::<SqliteDatabase>::new())
            .service(logout)
            .service(CatalogRoute::<SqliteDatabase>::new())
            .service(CatalogItemRoute::<SqliteDatabase>::new())
            .service(auth_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

/// Malformed JSON bodies are answered with the same JSON error envelope as every other failure.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        debug!("💻️ Rejected request body. {err}");
        ServerError::InvalidRequestBody(err.to_string()).into()
    })
}
