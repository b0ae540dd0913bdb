//! Machine settings document and the handler that exposes it.

use std::path::Path;

use anyhow::Context;
use bytes::Bytes;
use quick_xml::se::Serializer;
use serde::Serialize;
use serde_yaml::{Mapping, Value};
use tracing::{info, warn};

use crate::http::handler::Handler;
use crate::http::request::Request;
use crate::http::writer::ResponseWriter;

const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n";
const XML_ROOT: &str = "settings";

/// Settings loaded once at startup and read-only afterwards.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    document: Value,
}

impl SettingsStore {
    pub fn new(document: Value) -> Self {
        Self { document }
    }

    pub fn empty() -> Self {
        Self::new(Value::Mapping(Mapping::new()))
    }

    pub fn from_yaml(text: &str) -> anyhow::Result<Self> {
        let document = serde_yaml::from_str(text).context("settings are not valid YAML")?;
        Ok(Self::new(document))
    }

    /// Loads the document at `path`.
    ///
    /// A missing file is not fatal: the server starts with empty settings.
    /// A file that exists but does not parse is.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            info!("No settings file given, serving empty settings");
            return Ok(Self::empty());
        };

        if !path.exists() {
            warn!(path = %path.display(), "Settings file not found, serving empty settings");
            return Ok(Self::empty());
        }

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let store = Self::from_yaml(&text)?;
        info!(path = %path.display(), entries = store.len(), "Loaded settings");
        Ok(store)
    }

    /// Number of top-level entries.
    pub fn len(&self) -> usize {
        match &self.document {
            Value::Mapping(m) => m.len(),
            Value::Sequence(s) => s.len(),
            Value::Null => 0,
            _ => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.document.get(key)
    }

    /// Serializes the document as an indented XML document rooted at `<settings>`.
    pub fn to_xml(&self) -> anyhow::Result<String> {
        let mut xml = String::from(XML_DECLARATION);
        let mut serializer = Serializer::with_root(&mut xml, Some(XML_ROOT))?;
        serializer.indent(' ', 2);
        self.document
            .serialize(serializer)
            .context("failed to serialize settings")?;
        Ok(xml)
    }
}

/// Serves the settings document on GET and echoes POST bodies.
pub struct SettingsHandler {
    settings: SettingsStore,
}

impl SettingsHandler {
    pub fn new(settings: SettingsStore) -> Self {
        Self { settings }
    }
}

impl Handler for SettingsHandler {
    async fn handle_get(&self, request: &Request, response: &mut ResponseWriter) -> anyhow::Result<()> {
        let document = self.settings.to_xml()?;
        info!(
            uri = %request.target,
            entries = self.settings.len(),
            "Serving settings"
        );

        response
            .write_success("text/xml")
            .write_body(document);
        Ok(())
    }

    async fn handle_post(
        &self,
        request: &Request,
        body: Bytes,
        response: &mut ResponseWriter,
    ) -> anyhow::Result<()> {
        info!(uri = %request.target, len = body.len(), "POST request");
        let data = String::from_utf8_lossy(&body);

        response.write_html_success().write_body(format!(
            "<html><body><h1>settings server</h1>\r\n\
             <a href=/>return</a><p>\r\n\
             postbody: <pre>{}</pre>\r\n",
            escape_html(&data)
        ));
        Ok(())
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
