//! Request extractors
//!
//! The authentication gateway in front of this service resolves the caller
//! to a corporate account or a franchise office and forwards it in headers.

use actix_web::{dev::Payload, FromRequest, HttpRequest};
use courier_core::models::{EntityRef, EntityType};
use courier_core::AppError;
use futures::future::{ready, Ready};
use std::ops::Deref;
use tracing::debug;

/// Header naming the entity kind: `corporate` or `office`
pub const ENTITY_TYPE_HEADER: &str = "X-Entity-Type";

/// Header carrying the entity identifier
pub const ENTITY_ID_HEADER: &str = "X-Entity-Id";

/// Entity on whose behalf the request is made
///
/// # Examples
///
/// ```no_run
/// use actix_web::HttpResponse;
/// use courier_api::EntityContext;
///
/// async fn whoami(entity: EntityContext) -> HttpResponse {
///     HttpResponse::Ok().body(entity.to_string())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct EntityContext(EntityRef);

impl EntityContext {
    pub fn into_inner(self) -> EntityRef {
        self.0
    }

    fn from_headers(req: &HttpRequest) -> Result<Self, AppError> {
        let header = |name: &str| -> Result<String, AppError> {
            req.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or_else(|| AppError::MissingField(name.to_string()))
        };

        let raw_type = header(ENTITY_TYPE_HEADER)?;
        let entity_type = EntityType::from_str(&raw_type).ok_or_else(|| {
            AppError::InvalidInput(format!("Unknown entity type '{}'", raw_type))
        })?;
        let entity_id = header(ENTITY_ID_HEADER)?;

        Ok(Self(EntityRef::new(entity_type, entity_id)))
    }
}

impl Deref for EntityContext {
    type Target = EntityRef;

    fn deref(&self) -> &EntityRef {
        &self.0
    }
}

impl FromRequest for EntityContext {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let result = Self::from_headers(req);
        if let Err(e) = &result {
            debug!("Rejected entity context: {}", e);
        }
        ready(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_entity_from_headers() {
        let req = TestRequest::default()
            .insert_header((ENTITY_TYPE_HEADER, "office"))
            .insert_header((ENTITY_ID_HEADER, "GHY-01"))
            .to_http_request();

        let entity = EntityContext::from_headers(&req).unwrap();
        assert_eq!(entity.entity_type, EntityType::Office);
        assert_eq!(entity.entity_id, "GHY-01");
    }

    #[test]
    fn test_missing_headers_rejected() {
        let req = TestRequest::default()
            .insert_header((ENTITY_TYPE_HEADER, "corporate"))
            .to_http_request();
        assert!(matches!(
            EntityContext::from_headers(&req),
            Err(AppError::MissingField(_))
        ));

        let req = TestRequest::default().to_http_request();
        assert!(EntityContext::from_headers(&req).is_err());
    }

    #[test]
    fn test_unknown_entity_type_rejected() {
        let req = TestRequest::default()
            .insert_header((ENTITY_TYPE_HEADER, "agent"))
            .insert_header((ENTITY_ID_HEADER, "a-1"))
            .to_http_request();
        assert!(matches!(
            EntityContext::from_headers(&req),
            Err(AppError::InvalidInput(_))
        ));
    }
}
