use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error,
};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};
use subtle::ConstantTimeEq;

/// Shared secret for admin routes, registered as app data.
/// `None` disables the admin API entirely.
#[derive(Debug, Clone)]
pub struct AdminKey(pub Option<String>);

/// Constant-time comparison of the presented key against the configured one.
fn keys_match(presented: &str, expected: &str) -> bool {
    presented.as_bytes().ct_eq(expected.as_bytes()).into()
}

pub struct AdminAuth;

impl<S, B> Transform<S, ServiceRequest> for AdminAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AdminAuthService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AdminAuthService { service }))
    }
}

pub struct AdminAuthService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for AdminAuthService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let expected = req
            .app_data::<web::Data<AdminKey>>()
            .and_then(|key| key.0.clone());

        let Some(expected) = expected else {
            log::warn!("🔐 Admin request to {} rejected: ADMIN_API_KEY not set", req.path());
            return Box::pin(async move {
                Err(actix_web::error::ErrorUnauthorized("Admin API disabled"))
            });
        };

        let presented = req
            .headers()
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::to_string);

        match presented {
            Some(token) if keys_match(&token, &expected) => {
                let fut = self.service.call(req);
                Box::pin(async move {
                    let res = fut.await?;
                    Ok(res)
                })
            }
            Some(_) => {
                log::warn!("🔐 Admin request to {} rejected: wrong key", req.path());
                Box::pin(async move { Err(actix_web::error::ErrorUnauthorized("Invalid admin key")) })
            }
            None => Box::pin(async move {
                Err(actix_web::error::ErrorUnauthorized("Missing authorization token"))
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_match() {
        assert!(keys_match("s3cret", "s3cret"));
        assert!(!keys_match("s3cret", "s3creT"));
        assert!(!keys_match("s3cret", "s3cret!"));
        assert!(!keys_match("", "s3cret"));
    }
}
