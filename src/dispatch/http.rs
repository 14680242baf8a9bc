//! HTTP and Filesystem Dispatcher
//!
//! Performs the real side effect for each action kind:
//! - `notify`: POST a text message to the chat webhook
//! - `deploy`: POST a deployment request to `{DEPLOY_API_URL}/deploy`
//! - `upload_file`: multipart POST to `{FILE_UPLOAD_API_URL}/upload`
//! - file actions: local filesystem operations
//! - `web_search`, `process_data`: acknowledged without a backing service
//! - `call_api`: an arbitrary HTTP request
//!
//! Every request shares one client with a bounded timeout. Responses with a
//! non-2xx status are returned as [`DispatchError::Status`].

use std::io::ErrorKind;
use std::path::Path;

use async_trait::async_trait;
use log::{debug, info};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde_json::{json, Value};

use super::{optional_bool, optional_str, required_str, required_text, ActionDispatcher};
use crate::config::DispatcherConfig;
use crate::error::{ConfigError, DispatchError};
use crate::workflow::{ActionKind, Params};

/// Dispatcher backed by HTTP services and the local filesystem.
pub struct HttpDispatcher {
    client: Client,
    config: DispatcherConfig,
}

impl HttpDispatcher {
    /// Creates a dispatcher with one shared HTTP client.
    pub fn new(config: DispatcherConfig) -> Result<Self, ConfigError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    /// Adds the service bearer token, if one is configured.
    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.config.api_token {
            Some(ref token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Sends a JSON request to one of the configured services.
    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, DispatchError> {
        let request = self.authorized(self.client.post(url)).json(body);
        read_response(request.send().await?).await
    }

    async fn notify(&self, params: &Params) -> Result<Value, DispatchError> {
        let url = self
            .config
            .notify_webhook_url
            .as_deref()
            .ok_or(DispatchError::NotConfigured("NOTIFY_WEBHOOK_URL"))?;

        let message = required_text(params, "message")?;
        let at_mobiles = params.get("at_mobiles").cloned().unwrap_or_else(|| json!([]));
        let is_at_all = optional_bool(params, "is_at_all")?;

        let body = json!({
            "msgtype": "text",
            "text": { "content": message },
            "at": { "atMobiles": at_mobiles, "isAtAll": is_at_all },
        });

        let result = self.post_json(url, &body).await?;

        Ok(json!({
            "status": "success",
            "result": result,
            "message": "Notification sent",
        }))
    }

    async fn deploy(&self, params: &Params) -> Result<Value, DispatchError> {
        let base = self
            .config
            .deploy_api_url
            .as_deref()
            .ok_or(DispatchError::NotConfigured("DEPLOY_API_URL"))?;

        let project = required_str(params, "project_name")?;
        let environment = optional_str(params, "environment")?.unwrap_or("dev");
        let version = optional_str(params, "version")?.unwrap_or("latest");
        let config = params.get("config").cloned().unwrap_or_else(|| json!({}));

        let body = json!({
            "environment": environment,
            "project": project,
            "version": version,
            "config": config,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        let url = format!("{}/deploy", base.trim_end_matches('/'));
        let result = self.post_json(&url, &body).await?;

        Ok(json!({
            "status": "success",
            "deployment_id": result.get("deployment_id").cloned().unwrap_or(Value::Null),
            "result": result,
            "message": format!("Deployed {} to {}", project, environment),
        }))
    }

    async fn upload_file(&self, params: &Params) -> Result<Value, DispatchError> {
        let file_path = required_str(params, "file_path")?;

        if !tokio::fs::try_exists(file_path).await.unwrap_or(false) {
            return Err(DispatchError::FileNotFound(file_path.to_string()));
        }

        let base = self
            .config
            .file_upload_api_url
            .as_deref()
            .ok_or(DispatchError::NotConfigured("FILE_UPLOAD_API_URL"))?;

        let service = optional_str(params, "service_name")?.unwrap_or("default");
        let metadata = params.get("metadata").cloned().unwrap_or_else(|| json!({}));

        let bytes = tokio::fs::read(file_path).await?;
        let file_name = Path::new(file_path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();

        let form = Form::new()
            .text("service", service.to_string())
            .text("metadata", metadata.to_string())
            .part("file", Part::bytes(bytes).file_name(file_name));

        let url = format!("{}/upload", base.trim_end_matches('/'));
        let request = self.authorized(self.client.post(url)).multipart(form);
        let result = read_response(request.send().await?).await?;

        Ok(json!({
            "status": "success",
            "file_id": result.get("file_id").cloned().unwrap_or(Value::Null),
            "file_url": result.get("url").cloned().unwrap_or(Value::Null),
            "result": result,
            "message": "File uploaded",
        }))
    }

    async fn call_api(&self, params: &Params) -> Result<Value, DispatchError> {
        let url = required_str(params, "url")?;
        let method_name = optional_str(params, "method")?.unwrap_or("GET");
        let method = Method::from_bytes(method_name.to_ascii_uppercase().as_bytes()).map_err(
            |e| DispatchError::InvalidParameter {
                name: "method",
                reason: e.to_string(),
            },
        )?;

        let mut request = self.client.request(method.clone(), url);

        match params.get("headers") {
            None | Some(Value::Null) => {}
            Some(Value::Object(headers)) => {
                for (name, value) in headers {
                    let value = match value {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    request = request.header(name.as_str(), value);
                }
            }
            Some(other) => {
                return Err(DispatchError::InvalidParameter {
                    name: "headers",
                    reason: format!("expected a mapping, got {}", other),
                })
            }
        }

        if let Some(body) = params.get("body").filter(|b| !b.is_null()) {
            request = request.json(body);
        }

        let result = read_response(request.send().await?).await?;

        Ok(json!({
            "status": "success",
            "result": result,
            "message": format!("{} {} succeeded", method, url),
        }))
    }
}

/// Reads a response body as JSON, falling back to text.
async fn read_response(response: Response) -> Result<Value, DispatchError> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        return Err(DispatchError::Status {
            status: status.as_u16(),
            body: text,
        });
    }

    debug!("Response {} ({} bytes)", status, text.len());
    Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
}

/// Maps a missing file to [`DispatchError::FileNotFound`].
fn file_error(path: &str, error: std::io::Error) -> DispatchError {
    if error.kind() == ErrorKind::NotFound {
        DispatchError::FileNotFound(path.to_string())
    } else {
        DispatchError::Io(error)
    }
}

async fn read_file(params: &Params) -> Result<Value, DispatchError> {
    let file_path = required_str(params, "file_path")?;
    let content = tokio::fs::read_to_string(file_path)
        .await
        .map_err(|e| file_error(file_path, e))?;

    Ok(json!({
        "status": "success",
        "file_path": file_path,
        "content": content,
        "message": format!("Read {} bytes", content.len()),
    }))
}

async fn write_file(params: &Params) -> Result<Value, DispatchError> {
    let file_path = required_str(params, "file_path")?;
    let content = required_text(params, "content")?;

    if let Some(parent) = Path::new(file_path).parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(file_path, &content).await?;

    Ok(json!({
        "status": "success",
        "file_path": file_path,
        "bytes_written": content.len(),
        "message": format!("Wrote {}", file_path),
    }))
}

async fn delete_file(params: &Params) -> Result<Value, DispatchError> {
    let file_path = required_str(params, "file_path")?;
    tokio::fs::remove_file(file_path)
        .await
        .map_err(|e| file_error(file_path, e))?;

    Ok(json!({
        "status": "success",
        "file_path": file_path,
        "message": format!("Deleted {}", file_path),
    }))
}

async fn list_directory(params: &Params) -> Result<Value, DispatchError> {
    let directory = required_str(params, "directory_path")?;
    let mut reader = tokio::fs::read_dir(directory)
        .await
        .map_err(|e| file_error(directory, e))?;

    let mut entries = Vec::new();
    while let Some(entry) = reader.next_entry().await? {
        let is_dir = entry.file_type().await?.is_dir();
        entries.push((entry.file_name().to_string_lossy().into_owned(), is_dir));
    }
    entries.sort();

    let entries: Vec<Value> = entries
        .into_iter()
        .map(|(name, is_dir)| json!({ "name": name, "is_dir": is_dir }))
        .collect();

    Ok(json!({
        "status": "success",
        "directory_path": directory,
        "count": entries.len(),
        "entries": entries,
    }))
}

/// Actions without a backing service are acknowledged and echoed.
fn acknowledge(action: ActionKind, params: &Params) -> Value {
    json!({
        "status": "success",
        "action": action.as_str(),
        "params": params,
        "message": format!("Executed action: {}", action),
    })
}

#[async_trait]
impl ActionDispatcher for HttpDispatcher {
    async fn dispatch(&self, action: ActionKind, params: &Params) -> Result<Value, DispatchError> {
        info!("Dispatching {}", action);

        match action {
            ActionKind::Notify => self.notify(params).await,
            ActionKind::Deploy => self.deploy(params).await,
            ActionKind::UploadFile => self.upload_file(params).await,
            ActionKind::ReadFile => read_file(params).await,
            ActionKind::WriteFile => write_file(params).await,
            ActionKind::DeleteFile => delete_file(params).await,
            ActionKind::ListDirectory => list_directory(params).await,
            ActionKind::WebSearch | ActionKind::ProcessData => Ok(acknowledge(action, params)),
            ActionKind::CallApi => self.call_api(params).await,
        }
    }
}
