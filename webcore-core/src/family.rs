// Endpoint families and their processing contracts

use crate::descriptor::ErasedInstance;
use crate::endpoint::EndpointContext;
use crate::http::{HttpMethod, Request, Response};
use crate::metadata::EndpointKind;
use crate::{Error, HttpStatus};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// A resource produces a complete response itself.
///
/// Cached instances are shared by concurrent requests; implementations must
/// be safe to call reentrantly.
#[async_trait]
pub trait Resource: Send + Sync {
    async fn process(&self, context: &EndpointContext, request: &Request) -> Result<Response, Error>;
}

/// A page renders an HTML document.
#[async_trait]
pub trait Page: Send + Sync {
    async fn render(&self, context: &EndpointContext, request: &Request) -> Result<String, Error>;
}

/// A REST API answers with JSON, one method per HTTP verb.
///
/// Verbs that are not overridden answer `405 Method Not Allowed`. Returning
/// `Value::Null` produces `204 No Content`.
#[async_trait]
pub trait RestApi: Send + Sync {
    async fn get(&self, _context: &EndpointContext, request: &Request) -> Result<Value, Error> {
        Err(method_not_allowed(request))
    }

    async fn post(&self, _context: &EndpointContext, request: &Request) -> Result<Value, Error> {
        Err(method_not_allowed(request))
    }

    async fn put(&self, _context: &EndpointContext, request: &Request) -> Result<Value, Error> {
        Err(method_not_allowed(request))
    }

    async fn patch(&self, _context: &EndpointContext, request: &Request) -> Result<Value, Error> {
        Err(method_not_allowed(request))
    }

    async fn delete(&self, _context: &EndpointContext, request: &Request) -> Result<Value, Error> {
        Err(method_not_allowed(request))
    }
}

/// A page shown for an HTTP status, e.g. 404 or 500.
#[async_trait]
pub trait StatusPage: Send + Sync {
    async fn render(
        &self,
        context: &EndpointContext,
        status: HttpStatus,
        request: &Request,
    ) -> Result<String, Error>;
}

fn method_not_allowed(request: &Request) -> Error {
    Error::MethodNotAllowed(format!("{} {}", request.method, request.uri))
}

/// Binds an endpoint family to its instance trait and request handler.
///
/// The endpoint manager is generic over this trait; the sitemap only sees the
/// type-erased [`EndpointRegistration`](crate::sitemap::EndpointRegistration)
/// built from it.
#[async_trait]
pub trait EndpointFamily: Send + Sync + 'static {
    type Instance: ?Sized + Send + Sync + 'static;

    const KIND: EndpointKind;

    /// Whether contexts of this family are entered into the URI index
    const ADDRESSABLE: bool = true;

    /// Recover the family's trait object from an erased instance.
    fn downcast(erased: ErasedInstance) -> Option<Arc<Self::Instance>> {
        erased
            .downcast::<Arc<Self::Instance>>()
            .ok()
            .map(|instance| Arc::clone(&*instance))
    }

    async fn handle(
        instance: Arc<Self::Instance>,
        context: Arc<EndpointContext>,
        request: &Request,
    ) -> Result<Response, Error>;
}

pub struct ResourceFamily;

#[async_trait]
impl EndpointFamily for ResourceFamily {
    type Instance = dyn Resource;
    const KIND: EndpointKind = EndpointKind::Resource;

    async fn handle(
        instance: Arc<dyn Resource>,
        context: Arc<EndpointContext>,
        request: &Request,
    ) -> Result<Response, Error> {
        instance.process(&context, request).await
    }
}

pub struct PageFamily;

#[async_trait]
impl EndpointFamily for PageFamily {
    type Instance = dyn Page;
    const KIND: EndpointKind = EndpointKind::Page;

    async fn handle(
        instance: Arc<dyn Page>,
        context: Arc<EndpointContext>,
        request: &Request,
    ) -> Result<Response, Error> {
        let html = instance.render(&context, request).await?;
        Ok(Response::ok().with_html(html))
    }
}

pub struct RestApiFamily;

#[async_trait]
impl EndpointFamily for RestApiFamily {
    type Instance = dyn RestApi;
    const KIND: EndpointKind = EndpointKind::RestApi;

    async fn handle(
        instance: Arc<dyn RestApi>,
        context: Arc<EndpointContext>,
        request: &Request,
    ) -> Result<Response, Error> {
        let value = match request.method {
            HttpMethod::GET => instance.get(&context, request).await?,
            HttpMethod::POST => instance.post(&context, request).await?,
            HttpMethod::PUT => instance.put(&context, request).await?,
            HttpMethod::PATCH => instance.patch(&context, request).await?,
            HttpMethod::DELETE => instance.delete(&context, request).await?,
            HttpMethod::HEAD | HttpMethod::OPTIONS => return Err(method_not_allowed(request)),
        };

        if value.is_null() {
            return Ok(Response::new(HttpStatus::NoContent.code()));
        }
        Response::ok().with_json(&value)
    }
}

pub struct StatusPageFamily;

#[async_trait]
impl EndpointFamily for StatusPageFamily {
    type Instance = dyn StatusPage;
    const KIND: EndpointKind = EndpointKind::StatusPage;
    const ADDRESSABLE: bool = false;

    async fn handle(
        instance: Arc<dyn StatusPage>,
        context: Arc<EndpointContext>,
        request: &Request,
    ) -> Result<Response, Error> {
        let status = context
            .metadata()
            .status_code
            .and_then(HttpStatus::from_code)
            .unwrap_or(HttpStatus::InternalServerError);
        let html = instance.render(&context, status, request).await?;
        Ok(Response::new(status.code()).with_html(html))
    }
}
