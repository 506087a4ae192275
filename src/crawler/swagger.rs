//! Swagger/OpenAPI importer.
//!
//! API specs bypass the HTML crawler: the JSON document is fetched once and
//! turned into one overview document plus one document per (path, method)
//! operation. Only the seven standard HTTP methods are considered.

use serde_json::Value;

use super::CrawlError;
use crate::documents::{Document, DocumentSource, doc_id};

const METHODS: [&str; 7] = ["GET", "POST", "PUT", "DELETE", "PATCH", "HEAD", "OPTIONS"];

/// Fetch a spec URL and synthesize its documents.
pub async fn import(client: &reqwest::Client, url: &str) -> Result<Vec<Document>, CrawlError> {
    let spec: Value = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    Ok(documents_from_spec(url, &spec))
}

/// Synthesize documents from a parsed Swagger/OpenAPI spec.
pub fn documents_from_spec(url: &str, spec: &Value) -> Vec<Document> {
    let mut documents = Vec::new();

    let info = &spec["info"];
    let title = info["title"].as_str().unwrap_or("API Documentation");
    let description = info["description"].as_str().unwrap_or("");

    if !description.is_empty() {
        let mut doc = Document::new(
            format!("{title}\n\n{description}"),
            format!("{title} - Overview"),
            url,
            DocumentSource::Swagger,
        );
        doc.id = format!("{}_overview", doc_id(url));
        documents.push(doc);
    }

    let Some(paths) = spec["paths"].as_object() else {
        tracing::info!("Extracted 0 API paths from Swagger/OpenAPI");
        return documents;
    };

    for (path, methods) in paths {
        let Some(methods) = methods.as_object() else {
            continue;
        };

        for (method, operation) in methods {
            let method_upper = method.to_uppercase();
            if !METHODS.contains(&method_upper.as_str()) {
                continue;
            }

            let summary = operation["summary"].as_str().unwrap_or("");
            let description = operation["description"].as_str().unwrap_or("");
            let op_id = operation["operationId"]
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| format!("{method}_{path}"));

            let params_text = format_parameters(operation);
            let responses_text = format_responses(operation);

            let content = format!(
                "{method_upper} {path}\n\n{summary}\n\n{description}{params_text}{responses_text}"
            )
            .trim()
            .to_string();

            let display = if summary.is_empty() { &op_id } else { summary };
            let mut doc = Document::new(
                content,
                format!("{method_upper} {path} - {display}"),
                url,
                DocumentSource::Swagger,
            );
            doc.id = doc_id(&format!("{url}_{op_id}"));
            documents.push(doc);
        }
    }

    tracing::info!("Extracted {} API paths from Swagger/OpenAPI", paths.len());
    documents
}

fn format_parameters(operation: &Value) -> String {
    let Some(params) = operation["parameters"].as_array() else {
        return String::new();
    };
    if params.is_empty() {
        return String::new();
    }

    let mut text = String::from("\n\nParameters:\n");
    for param in params {
        let name = param["name"].as_str().unwrap_or("");
        let location = param["in"].as_str().unwrap_or("");
        let description = param["description"].as_str().unwrap_or("");
        let required = param["required"].as_bool().unwrap_or(false);
        let marker = if required { " [required]" } else { "" };
        text.push_str(&format!("- {name} ({location}){marker}: {description}\n"));
    }
    text
}

fn format_responses(operation: &Value) -> String {
    let Some(responses) = operation["responses"].as_object() else {
        return String::new();
    };
    if responses.is_empty() {
        return String::new();
    }

    let mut text = String::from("\n\nResponses:\n");
    for (code, response) in responses {
        let description = response["description"].as_str().unwrap_or("");
        text.push_str(&format!("- {code}: {description}\n"));
    }
    text
}
