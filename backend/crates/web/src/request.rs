//! Request
//!
//! What a controller action may look at: method, path, query string and
//! form fields. Headers and cookies stay in the front controller.

use std::collections::HashMap;

use axum::http::Method;

#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    path: String,
    query: HashMap<String, String>,
    form: HashMap<String, String>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: HashMap::new(),
            form: HashMap::new(),
        }
    }

    pub fn with_query(mut self, query: HashMap<String, String>) -> Self {
        self.query = query;
        self
    }

    pub fn with_form(mut self, form: HashMap<String, String>) -> Self {
        self.form = form;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_post(&self) -> bool {
        self.method == Method::POST
    }

    pub fn is_get(&self) -> bool {
        self.method == Method::GET
    }

    /// Form field first, then query parameter
    pub fn input(&self, key: &str) -> Option<&str> {
        self.form
            .get(key)
            .or_else(|| self.query.get(key))
            .map(String::as_str)
    }

    /// [`Request::input`] with `""` for a missing field
    pub fn input_or_empty(&self, key: &str) -> &str {
        self.input(key).unwrap_or_default()
    }

    /// Several fields at once, missing ones as `""`
    pub fn inputs(&self, keys: &[&str]) -> HashMap<String, String> {
        keys.iter()
            .map(|key| (key.to_string(), self.input_or_empty(key).to_string()))
            .collect()
    }

    pub fn form(&self) -> &HashMap<String, String> {
        &self.form
    }
}
