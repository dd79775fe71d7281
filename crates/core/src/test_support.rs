use crate::traits::Transport;
use crate::transport::{RequestBody, TransportResponse};
use crate::IngestError;
use async_trait::async_trait;
use reqwest::Method;
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub(crate) struct RecordedCall {
    pub method: Method,
    pub target: String,
    pub body: Option<RequestBody>,
}

#[derive(Debug, Clone)]
struct Route {
    method: Method,
    target: String,
    status: u16,
    body: String,
    once: bool,
}

/// In-memory backend: answers from canned routes and records every call.
pub(crate) struct FakeTransport {
    routes: Mutex<Vec<Route>>,
    fallback_status: u16,
    calls: Mutex<Vec<RecordedCall>>,
}

impl FakeTransport {
    pub fn new(fallback_status: u16) -> Self {
        Self {
            routes: Mutex::new(Vec::new()),
            fallback_status,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn route(self, method: Method, target: &str, status: u16, body: &str) -> Self {
        self.push_route(method, target, status, body, false)
    }

    pub fn route_once(self, method: Method, target: &str, status: u16, body: &str) -> Self {
        self.push_route(method, target, status, body, true)
    }

    fn push_route(self, method: Method, target: &str, status: u16, body: &str, once: bool) -> Self {
        self.routes.lock().expect("routes lock").push(Route {
            method,
            target: target.to_string(),
            status,
            body: body.to_string(),
            once,
        });
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn request(
        &self,
        target: &str,
        method: Method,
        body: Option<RequestBody>,
    ) -> Result<TransportResponse, IngestError> {
        self.calls.lock().expect("calls lock").push(RecordedCall {
            method: method.clone(),
            target: target.to_string(),
            body,
        });

        let mut routes = self.routes.lock().expect("routes lock");
        let matches = |route: &Route| route.method == method && route.target == target;
        let position = routes
            .iter()
            .position(|route| route.once && matches(route))
            .or_else(|| routes.iter().position(|route| matches(route)));

        let response = match position {
            Some(index) if routes[index].once => {
                let route = routes.remove(index);
                TransportResponse {
                    status: route.status,
                    body: route.body,
                }
            }
            Some(index) => TransportResponse {
                status: routes[index].status,
                body: routes[index].body.clone(),
            },
            None => TransportResponse {
                status: self.fallback_status,
                body: String::new(),
            },
        };

        Ok(response)
    }
}
