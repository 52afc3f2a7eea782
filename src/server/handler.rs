// src/server/handler.rs
use hyper::{Body, Request, Response};
use std::sync::Arc;
use tower::Service;

use crate::server::api::MonitorApi;

#[derive(Clone)]
pub struct RequestHandler {
    api: Arc<MonitorApi>,
}

impl RequestHandler {
    pub fn new(api: Arc<MonitorApi>) -> Self {
        Self { api }
    }
}

impl Service<Request<Body>> for RequestHandler {
    type Response = Response<Body>;
    type Error = Box<dyn std::error::Error + Send + Sync>;
    type Future = futures::future::BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let api = self.api.clone();
        Box::pin(async move {
            let method = req.method().clone();
            let path = req.uri().path().to_string();

            match api.handle(req).await {
                Ok(response) => Ok(response),
                Err(e) => {
                    tracing::warn!(%method, %path, %e, "request failed");
                    Ok(Response::from(e))
                }
            }
        })
    }
}
