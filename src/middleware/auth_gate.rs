/// Authorization Gate
///
/// Request-interception contract applied to every protected operation:
/// extract the bearer token, verify it, and either attach the resolved
/// identity to the request or reject the call before any business logic
/// runs. Missing, malformed, expired, and tampered tokens all produce the
/// same 401 envelope; the distinction lives in the security log only.
///
/// Business-specific permission rules do NOT belong here — operations
/// layer those on top via [`crate::middleware::Capability`].

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage, HttpResponse,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;
use uuid::Uuid;

use crate::auth::verify_access_token;
use crate::configuration::SecuritySettings;
use crate::store::Role;

/// Identity resolved from a verified access token, attached to the request
/// extensions for handlers to read.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub subject_id: Uuid,
    pub role: Role,
}

/// Middleware guarding protected routes.
pub struct AuthGate {
    settings: SecuritySettings,
}

impl AuthGate {
    pub fn new(settings: SecuritySettings) -> Self {
        Self { settings }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthGate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthGateService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(AuthGateService {
            service: Rc::new(service),
            settings: self.settings.clone(),
        }))
    }
}

pub struct AuthGateService<S> {
    service: Rc<S>,
    settings: SecuritySettings,
}

impl<S, B> Service<ServiceRequest> for AuthGateService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let bearer = req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::to_string);

        let context = match bearer {
            Some(token) => {
                verify_access_token(&token, &self.settings).and_then(|claims| {
                    Ok(AuthContext {
                        subject_id: claims.subject_id()?,
                        role: claims.parsed_role()?,
                    })
                })
            }
            None => {
                tracing::warn!(target: "security", "missing or malformed Authorization header");
                Err(crate::error::AuthError::Unauthenticated)
            }
        };

        match context {
            Ok(context) => {
                tracing::debug!(
                    subject_id = %context.subject_id,
                    role = %context.role,
                    "access token verified"
                );
                req.extensions_mut().insert(context);

                let service = self.service.clone();
                Box::pin(async move {
                    service
                        .call(req)
                        .await
                        .map(|res| res.map_into_left_body())
                })
            }
            Err(_) => {
                // The one rejection body, identical for every failure mode.
                let response = HttpResponse::Unauthorized()
                    .json(serde_json::json!({
                        "error": "Authentication failed",
                        "code": "UNAUTHENTICATED"
                    }))
                    .map_into_right_body();

                let (req, _) = req.into_parts();
                Box::pin(async move { Ok(ServiceResponse::new(req, response)) })
            }
        }
    }
}
