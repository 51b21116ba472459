//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests:
//! ```nocompile
//!     fn my_handler() -> impl Responder {
//!         std::thread::sleep(Duration::from_secs(5)); // <-- Bad practice! Will cause the current worker thread to
//! hang!
//!     }
//! ```
//! For this reason, any long, non-cpu-bound operation (e.g. I/O, database operations, etc.) should be expressed as
//! futures or asynchronous functions. Async handlers get executed concurrently by worker threads and thus don’t block
//! execution.
use std::str::FromStr;

use academy_engine::{
    checkout_objects::{CreateOrderRequest, VerifyPaymentRequest, VerifyPaymentResponse},
    db_types::{CatalogItemUpdate, CatalogKind, NewCatalogItem, NewEnrollment, Role},
    traits::{
        CatalogManagement,
        EnrollmentManagement,
        EnrollmentQueryFilter,
        IdentifierLookup,
        PaymentGateway,
        PaymentSessionManagement,
        UserManagement,
    },
    CatalogApi,
    CheckoutApi,
    CheckoutError,
    EnrollmentApi,
    UserApi,
};
use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};
use log::*;
use razorpay_tools::WebhookEvent;

use crate::{
    auth::{auth_cookie, removal_cookie, JwtClaims, TokenIssuer},
    config::ServerOptions,
    data_objects::{JsonResponse, LoginRequest, LoginResponse, NewStaffRequest, RegisterRequest, VerifyEmailRequest},
    errors::ServerError,
    helpers::get_remote_ip,
    integrations::razorpay::payment_event,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal requires [$($roles:expr),+]) => {
        paste::paste! { pub struct [<$name:camel Route>];}
        paste::paste! {
                impl [<$name:camel Route>] {
                #[allow(clippy::new_without_default)]
                pub fn new() -> Self { Self }
            }
        }
        paste::paste! {
            impl actix_web::dev::HttpServiceFactory for [<$name:camel Route>] {
                fn register(self, config: &mut actix_web::dev::AppService) {
                    let res = actix_web::Resource::new($path)
                        .name(stringify!($name))
                        .guard(actix_web::guard::$method())
                        .to($name)
                        .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                    actix_web::dev::HttpServiceFactory::register(res, config);
                }
            }
        }
    };

    // A storage backend plus a payment gateway
    ($name:ident => $method:ident $path:literal impl $($bounds:path),+ ; $gateway:path) => {
        paste::paste! { pub struct [<$name:camel Route>]<A, G>(core::marker::PhantomData<fn() -> (A, G)>);}
        paste::paste! { impl<A, G> [<$name:camel Route>]<A, G> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> (A, G)>)
            }
        }}
        paste::paste! { impl<A, G> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A, G>
        where
            A: $($bounds +)+ 'static,
            G: $gateway + 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A, G>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:path),+ where requires [$($roles:expr),+])  => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds +)+ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:path),+) => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds +)+ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Enrollments  ----------------------------------------------------
route!(create_enrollment => Post "/enrollments" impl EnrollmentManagement, PaymentSessionManagement);
pub async fn create_enrollment<B>(
    body: web::Json<NewEnrollment>,
    api: web::Data<EnrollmentApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: EnrollmentManagement + PaymentSessionManagement,
{
    trace!("💻️ Received new enrollment request");
    let enrollment = api.create_enrollment(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(enrollment))
}

//----------------------------------------------   Checkout  ----------------------------------------------------
route!(create_order => Post "/payments/create-order" impl EnrollmentManagement, PaymentSessionManagement; PaymentGateway);
pub async fn create_order<B, G>(
    body: web::Json<CreateOrderRequest>,
    api: web::Data<CheckoutApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: EnrollmentManagement + PaymentSessionManagement,
    G: PaymentGateway,
{
    let enrollment_id =
        body.enrollment_id.ok_or_else(|| ServerError::InvalidRequestBody("enrollmentId is required".into()))?;
    debug!("💻️ Create order request for enrollment #{enrollment_id}");
    let order = api.create_order(enrollment_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(verify_payment => Post "/payments/verify" impl EnrollmentManagement, PaymentSessionManagement; PaymentGateway);
/// Missing fields and signature mismatches are answered with `400 { success: false, error }`. Every other failure
/// goes through the usual error mapping.
pub async fn verify_payment<B, G>(
    body: web::Json<VerifyPaymentRequest>,
    api: web::Data<CheckoutApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: EnrollmentManagement + PaymentSessionManagement,
    G: PaymentGateway,
{
    trace!("💻️ Received payment verification request");
    match api.verify_payment(body.into_inner()).await {
        Ok(result) => Ok(HttpResponse::Ok().json(result)),
        Err(e @ (CheckoutError::SignatureMismatch | CheckoutError::InvalidInput(_))) => {
            debug!("💻️ Payment verification failed. {e}");
            Ok(HttpResponse::BadRequest().json(VerifyPaymentResponse::failure(e.to_string())))
        },
        Err(e) => Err(e.into()),
    }
}

route!(payment_webhook => Post "" impl EnrollmentManagement, PaymentSessionManagement; PaymentGateway);
/// Gateway notifications. Mounted at `/payments/webhook` behind the HMAC middleware.
///
/// Webhook responses must always be in the 200 range, otherwise the gateway keeps retrying. Failures are reported in
/// the body and logged.
pub async fn payment_webhook<B, G>(body: web::Json<WebhookEvent>, api: web::Data<CheckoutApi<B, G>>) -> HttpResponse
where
    B: EnrollmentManagement + PaymentSessionManagement,
    G: PaymentGateway,
{
    let event = body.into_inner();
    trace!("💻️ Received {} webhook", event.event);
    let payment = event.payment().and_then(payment_event);
    let result = match (event.event.as_str(), payment) {
        ("payment.captured", Some(payment)) => {
            let payment_id = payment.gateway_payment_id.clone();
            match api.payment_captured(payment).await {
                Ok(Some(session)) => {
                    info!("💻️ Payment {payment_id} captured for session #{}", session.id);
                    JsonResponse::success("Payment recorded.")
                },
                Ok(None) => JsonResponse::success("Payment does not match a known order."),
                Err(e) => {
                    warn!("💻️ Could not record captured payment {payment_id}. {e}");
                    JsonResponse::failure("Could not record payment.")
                },
            }
        },
        ("payment.failed", Some(payment)) => {
            let payment_id = payment.gateway_payment_id.clone();
            match api.payment_failed(payment).await {
                Ok(Some(session)) => {
                    info!("💻️ Payment {payment_id} failed. Session #{} is {}", session.id, session.status);
                    JsonResponse::success("Payment failure recorded.")
                },
                Ok(None) => JsonResponse::success("Payment does not match a known order."),
                Err(e) => {
                    warn!("💻️ Could not record failed payment {payment_id}. {e}");
                    JsonResponse::failure("Could not record payment failure.")
                },
            }
        },
        (event, _) => {
            info!("💻️ Ignoring {event} webhook");
            JsonResponse::success("Event ignored.")
        },
    };
    HttpResponse::Ok().json(result)
}

//----------------------------------------------   Auth  ----------------------------------------------------
route!(register => Post "/auth/register" impl UserManagement, IdentifierLookup);
/// Self-service sign up. The new account is a student account, and an e-mail verification token is issued for it.
pub async fn register<A>(body: web::Json<RegisterRequest>, api: web::Data<UserApi<A>>) -> Result<HttpResponse, ServerError>
where A: UserManagement + IdentifierLookup {
    let RegisterRequest { email, name, password } = body.into_inner();
    let user = api.register(&email, &name, &password).await?;
    api.issue_verification_token(user.id).await?;
    Ok(HttpResponse::Created().json(user))
}

route!(verify_email => Post "/auth/verify-email" impl UserManagement, IdentifierLookup);
pub async fn verify_email<A>(
    body: web::Json<VerifyEmailRequest>,
    api: web::Data<UserApi<A>>,
) -> Result<HttpResponse, ServerError>
where
    A: UserManagement + IdentifierLookup,
{
    let user = api.verify_email(&body.token).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("{} has been verified.", user.email))))
}

route!(login => Post "/auth/login" impl UserManagement, IdentifierLookup);
/// Checks the credentials and issues an access token, both as an HttpOnly cookie and in the response body.
pub async fn login<A>(
    req: HttpRequest,
    body: web::Json<LoginRequest>,
    api: web::Data<UserApi<A>>,
    signer: web::Data<TokenIssuer>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError>
where
    A: UserManagement + IdentifierLookup,
{
    let ip = get_remote_ip(&req, options.use_x_forwarded_for, options.use_forwarded);
    let user = api.authenticate(&body.email, &body.password).await.map_err(|e| {
        info!("💻️ Failed login for {} from {ip:?}", body.email);
        ServerError::from(e)
    })?;
    let token = signer.issue_token(&user)?;
    debug!("💻️ Issued access token for user #{} from {ip:?}", user.id);
    let cookie = auth_cookie(token.clone(), signer.ttl(), options.cookie_secure);
    let response = LoginResponse { token, expires_in: signer.ttl().num_seconds(), user };
    Ok(HttpResponse::Ok().cookie(cookie).json(response))
}

#[post("/auth/logout")]
pub async fn logout(options: web::Data<ServerOptions>) -> HttpResponse {
    trace!("💻️ Logging out");
    HttpResponse::Ok().cookie(removal_cookie(options.cookie_secure)).json(JsonResponse::success("Logged out."))
}

//----------------------------------------------   Catalog  ----------------------------------------------------
route!(catalog => Get "/catalog/{kind}" impl CatalogManagement, IdentifierLookup);
pub async fn catalog<A>(path: web::Path<String>, api: web::Data<CatalogApi<A>>) -> Result<HttpResponse, ServerError>
where A: CatalogManagement + IdentifierLookup {
    let kind = parse_kind(&path)?;
    let items = api.list(kind, true).await?;
    Ok(HttpResponse::Ok().json(items))
}

route!(catalog_item => Get "/catalog/{kind}/{slug}" impl CatalogManagement, IdentifierLookup);
pub async fn catalog_item<A>(
    path: web::Path<(String, String)>,
    api: web::Data<CatalogApi<A>>,
) -> Result<HttpResponse, ServerError>
where
    A: CatalogManagement + IdentifierLookup,
{
    let (kind, slug) = path.into_inner();
    let kind = parse_kind(&kind)?;
    let item = api.fetch_by_slug(kind, &slug).await?;
    Ok(HttpResponse::Ok().json(item))
}

fn parse_kind(kind: &str) -> Result<CatalogKind, ServerError> {
    CatalogKind::from_str(kind).map_err(|e| ServerError::InvalidRequestPath(e.to_string()))
}

//----------------------------------------------   Dashboard  ----------------------------------------------------
route!(me => Get "/me" impl UserManagement, IdentifierLookup);
pub async fn me<A>(claims: JwtClaims, api: web::Data<UserApi<A>>) -> Result<HttpResponse, ServerError>
where A: UserManagement + IdentifierLookup {
    let user = api.fetch_user(claims.sub).await?;
    Ok(HttpResponse::Ok().json(user))
}

route!(my_enrollments => Get "/dashboard/enrollments" impl EnrollmentManagement, PaymentSessionManagement);
pub async fn my_enrollments<B>(claims: JwtClaims, api: web::Data<EnrollmentApi<B>>) -> Result<HttpResponse, ServerError>
where B: EnrollmentManagement + PaymentSessionManagement {
    debug!("💻️ Fetching enrollments for user #{}", claims.sub);
    let enrollments = api.enrollments_for_user(&claims.email).await?;
    Ok(HttpResponse::Ok().json(enrollments))
}

//----------------------------------------------   Back office  ----------------------------------------------------
route!(search_enrollments => Get "/admin/enrollments" impl EnrollmentManagement, PaymentSessionManagement where requires [Role::Admin]);
pub async fn search_enrollments<B>(
    query: web::Query<EnrollmentQueryFilter>,
    api: web::Data<EnrollmentApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: EnrollmentManagement + PaymentSessionManagement,
{
    let enrollments = api.search_enrollments(query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(enrollments))
}

route!(cancel_enrollment => Patch "/admin/enrollments/{id}/cancel" impl EnrollmentManagement, PaymentSessionManagement where requires [Role::Admin]);
pub async fn cancel_enrollment<B>(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<EnrollmentApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: EnrollmentManagement + PaymentSessionManagement,
{
    let id = path.into_inner();
    info!("💻️ Admin #{} is cancelling enrollment #{id}", claims.sub);
    let enrollment = api.cancel_enrollment(id).await?;
    Ok(HttpResponse::Ok().json(enrollment))
}

route!(enrollment_payments => Get "/admin/enrollments/{id}/payments" impl EnrollmentManagement, PaymentSessionManagement where requires [Role::Admin]);
pub async fn enrollment_payments<B>(path: web::Path<i64>, api: web::Data<EnrollmentApi<B>>) -> Result<HttpResponse, ServerError>
where B: EnrollmentManagement + PaymentSessionManagement {
    let sessions = api.payments_for_enrollment(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(sessions))
}

route!(create_staff => Post "/admin/users" impl UserManagement, IdentifierLookup where requires [Role::Admin]);
pub async fn create_staff<A>(
    claims: JwtClaims,
    body: web::Json<NewStaffRequest>,
    api: web::Data<UserApi<A>>,
) -> Result<HttpResponse, ServerError>
where
    A: UserManagement + IdentifierLookup,
{
    let NewStaffRequest { email, name, password, role } = body.into_inner();
    let user = api.create_staff(&email, &name, &password, role).await?;
    info!("💻️ Admin #{} created {} account #{}", claims.sub, user.role, user.id);
    Ok(HttpResponse::Created().json(user))
}

route!(create_catalog_item => Post "/admin/catalog" impl CatalogManagement, IdentifierLookup where requires [Role::Admin, Role::Instructor]);
pub async fn create_catalog_item<A>(
    claims: JwtClaims,
    body: web::Json<NewCatalogItem>,
    api: web::Data<CatalogApi<A>>,
) -> Result<HttpResponse, ServerError>
where
    A: CatalogManagement + IdentifierLookup,
{
    let item = api.create_item(body.into_inner(), claims.role).await?;
    Ok(HttpResponse::Created().json(item))
}

route!(update_catalog_item => Patch "/admin/catalog/{id}" impl CatalogManagement, IdentifierLookup where requires [Role::Admin, Role::Instructor]);
pub async fn update_catalog_item<A>(
    claims: JwtClaims,
    path: web::Path<i64>,
    body: web::Json<CatalogItemUpdate>,
    api: web::Data<CatalogApi<A>>,
) -> Result<HttpResponse, ServerError>
where
    A: CatalogManagement + IdentifierLookup,
{
    let item = api.update_item(path.into_inner(), body.into_inner(), claims.role).await?;
    Ok(HttpResponse::Ok().json(item))
}
