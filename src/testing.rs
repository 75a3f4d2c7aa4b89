//! Stub collaborators for unit tests.

use crate::discover::browser::BrowserSession;
use crate::error::{HuntError, Result};
use crate::http_client::{HttpRequest, HttpResponse, HttpTransport};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

pub fn response(status: u16, body: &str) -> HttpResponse {
    HttpResponse {
        status,
        body: body.as_bytes().to_vec(),
        cookies: HashMap::new(),
    }
}

/// Answers by URL. A URL mapped to `None` fails with a transport error; an unknown
/// URL does too. Every request is recorded.
#[derive(Default)]
pub struct StubTransport {
    gets: HashMap<String, Option<HttpResponse>>,
    posts: HashMap<String, Option<HttpResponse>>,
    pub requests: Mutex<Vec<(String, HttpRequest)>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_get(mut self, url: &str, response: HttpResponse) -> Self {
        self.gets.insert(url.to_string(), Some(response));
        self
    }

    pub fn fail_get(mut self, url: &str) -> Self {
        self.gets.insert(url.to_string(), None);
        self
    }

    pub fn on_post(mut self, url: &str, response: HttpResponse) -> Self {
        self.posts.insert(url.to_string(), Some(response));
        self
    }

    pub fn recorded(&self, method: &str) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, r)| r.clone())
            .collect()
    }

    fn answer(
        &self,
        method: &str,
        table: &HashMap<String, Option<HttpResponse>>,
        request: &HttpRequest,
    ) -> Result<HttpResponse> {
        self.requests
            .lock()
            .push((method.to_string(), request.clone()));
        match table.get(&request.url) {
            Some(Some(resp)) => Ok(resp.clone()),
            _ => Err(HuntError::Transport(format!("connection refused: {}", request.url))),
        }
    }
}

#[async_trait]
impl HttpTransport for StubTransport {
    async fn get(&self, request: &HttpRequest) -> Result<HttpResponse> {
        self.answer("GET", &self.gets, request)
    }

    async fn post(&self, request: &HttpRequest) -> Result<HttpResponse> {
        self.answer("POST", &self.posts, request)
    }
}

/// Serves queued page sources, one per navigation, and records every URL.
#[derive(Default)]
pub struct StubBrowser {
    pages: VecDeque<String>,
    current: String,
    pub visited: Vec<String>,
}

impl StubBrowser {
    pub fn with_pages<I, S>(pages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            pages: pages.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl BrowserSession for StubBrowser {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        self.visited.push(url.to_string());
        self.current = self.pages.pop_front().unwrap_or_default();
        Ok(())
    }

    async fn page_source(&mut self) -> Result<String> {
        Ok(self.current.clone())
    }
}
