use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage, HttpResponse,
};
use futures_util::future::LocalBoxFuture;
use serde_json::json;
use std::{
    future::{ready, Ready},
    rc::Rc,
};

use crate::utils::jwt::verify_jwt;

/// Identity the middleware resolves from the bearer credential and stores in
/// request extensions.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
    pub id: i64,
}

/// Bearer-JWT middleware for the API scope. A request with no Authorization
/// header passes through anonymously (public routes serve it; routes that
/// need identity reject it themselves); a present-but-invalid credential is
/// rejected outright. The signing secret is injected at construction rather
/// than read from the environment per request.
pub struct AuthMiddleware {
    secret: Rc<String>,
}

impl AuthMiddleware {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: Rc::new(secret.into()),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
            secret: self.secret.clone(),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
    secret: Rc<String>,
}

enum Credential {
    Anonymous,
    User(i64),
}

fn resolve_credential(req: &ServiceRequest, secret: &str) -> Result<Credential, &'static str> {
    let Some(header) = req.headers().get("Authorization") else {
        return Ok(Credential::Anonymous);
    };
    let header = header.to_str().map_err(|_| "Invalid Authorization header")?;
    let token = header
        .strip_prefix("Bearer ")
        .ok_or("Invalid token format")?;
    verify_jwt(token, secret)
        .map(Credential::User)
        .map_err(|_| "Invalid or expired token")
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
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
        match resolve_credential(&req, &self.secret) {
            Ok(Credential::User(id)) => {
                req.extensions_mut().insert(AuthenticatedUser { id });
            }
            Ok(Credential::Anonymous) => {}
            Err(message) => {
                let (req, _payload) = req.into_parts();
                let response = HttpResponse::Unauthorized()
                    .json(json!({
                        "status": "error",
                        "message": message
                    }))
                    .map_into_right_body();
                return Box::pin(async move { Ok(ServiceResponse::new(req, response)) });
            }
        }

        let service = Rc::clone(&self.service);
        Box::pin(async move {
            let res = service.call(req).await?;
            Ok(res.map_into_left_body())
        })
    }
}
