//! Router builder for the Bookshelf HTTP server

use anyhow::{bail, Context};
use axum::{
    http::{HeaderName, Uri},
    routing::get,
    Router,
};
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};

use bookshelf_kernel::{settings::Settings, ModuleRegistry};

use crate::{error::AppError, MakeRequestUuid};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Builder for constructing the main HTTP router
///
/// Layers only wrap what has been added before them, so mount routes first.
pub struct RouterBuilder {
    router: Router,
}

impl RouterBuilder {
    /// Create a new router builder
    pub fn new() -> Self {
        Self {
            router: Router::new(),
        }
    }

    /// Add a route to the router
    pub fn route(mut self, path: &str, route: axum::routing::MethodRouter) -> Self {
        self.router = self.router.route(path, route);
        self
    }

    /// Mount a module's router at `mount_path`
    pub fn mount_module(mut self, mount_path: &str, module_router: Router) -> Self {
        self.router = self.router.nest(mount_path, module_router);
        self
    }

    /// Answer unmatched paths with a JSON 404
    pub fn with_not_found_fallback(mut self) -> Self {
        self.router = self.router.fallback(not_found);
        self
    }

    /// Add tracing middleware
    pub fn with_tracing(mut self) -> Self {
        self.router = self.router.layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_request(DefaultOnRequest::new().level(tracing::Level::INFO))
                .on_response(DefaultOnResponse::new().level(tracing::Level::INFO)),
        );
        self
    }

    /// Add CORS middleware
    pub fn with_cors(mut self) -> Self {
        self.router = self.router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
        self
    }

    /// Copy the request ID onto the response
    pub fn with_request_id_propagation(mut self) -> Self {
        self.router = self.router.layer(PropagateRequestIdLayer::new(
            HeaderName::from_static(REQUEST_ID_HEADER),
        ));
        self
    }

    /// Assign a request ID to requests that arrive without one
    pub fn with_request_id(mut self) -> Self {
        self.router = self.router.layer(SetRequestIdLayer::new(
            HeaderName::from_static(REQUEST_ID_HEADER),
            MakeRequestUuid,
        ));
        self
    }

    /// Add timeout middleware
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.router = self
            .router
            .layer(TimeoutLayer::new(Duration::from_millis(timeout_ms)));
        self
    }

    /// Serve the merged OpenAPI document and a Swagger UI on top of it
    pub fn with_openapi(mut self, openapi_spec: serde_json::Value) -> Self {
        // utoipa's typed document is what SwaggerUi needs; fall back to an
        // empty document if the merged JSON does not fit its model.
        let openapi_obj: utoipa::openapi::OpenApi = serde_json::from_value(openapi_spec.clone())
            .unwrap_or_else(|err| {
                tracing::warn!(%err, "merged OpenAPI document rejected by utoipa");
                utoipa::openapi::OpenApiBuilder::new()
                    .info(
                        utoipa::openapi::InfoBuilder::new()
                            .title("Bookshelf API")
                            .version("1.0.0")
                            .build(),
                    )
                    .build()
            });

        self.router = self.router.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", openapi_obj),
        );

        // Raw JSON for external consumers
        self.router = self.router.route(
            "/docs/openapi.json",
            get(move || async move { axum::Json(openapi_spec.clone()) }),
        );

        self
    }

    /// Build the final router
    pub fn build(self) -> Router {
        self.router
    }
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

async fn not_found(uri: Uri) -> AppError {
    AppError::not_found(format!("no route matches '{}'", uri.path()))
}

/// Path a module is nested at: `{base_path}/{module_name}`
pub fn mount_path(base_path: &str, module_name: &str) -> anyhow::Result<String> {
    let base = base_path.trim_end_matches('/');
    if !base.is_empty() && !base.starts_with('/') {
        bail!("base path '{}' must start with '/'", base_path);
    }
    if module_name.is_empty() || module_name.contains('/') {
        bail!("module name '{}' is not a single path segment", module_name);
    }

    Ok(format!("{}/{}", base, module_name))
}

/// Merge every module's OpenAPI fragment into one document, prefixing module
/// paths with the module's mount path
pub fn openapi_document(
    registry: &ModuleRegistry,
    settings: &Settings,
) -> anyhow::Result<serde_json::Value> {
    let mut openapi_spec = serde_json::json!({
        "openapi": "3.1.0",
        "info": {
            "title": "Bookshelf API",
            "version": "1.0.0",
            "description": "In-memory book catalog"
        },
        "paths": {},
        "components": {
            "schemas": {}
        }
    });

    openapi_spec["components"]["schemas"]["ErrorResponse"] = serde_json::json!({
        "type": "object",
        "properties": {
            "error": {
                "type": "object",
                "properties": {
                    "code": { "type": "string" },
                    "message": { "type": "string" },
                    "details": { "type": "array", "items": {} },
                    "trace_id": { "type": "string" },
                    "timestamp": { "type": "string" }
                },
                "required": ["code", "message", "trace_id", "timestamp"]
            }
        },
        "required": ["error"]
    });

    openapi_spec["paths"]["/healthz"] = serde_json::json!({
        "get": {
            "summary": "Health check",
            "responses": {
                "200": {
                    "description": "OK",
                    "content": {
                        "text/plain": { "schema": { "type": "string" } }
                    }
                }
            }
        }
    });

    for module in registry.modules() {
        let Some(module_spec) = module.openapi() else {
            continue;
        };
        let prefix = mount_path(&settings.server.base_path, module.name())
            .with_context(|| format!("invalid mount path for module '{}'", module.name()))?;

        if let Some(paths) = module_spec.get("paths").and_then(|p| p.as_object()) {
            for (path, path_item) in paths {
                let prefixed_path = match path.as_str() {
                    "/" => prefix.clone(),
                    other => format!("{}{}", prefix, other),
                };
                openapi_spec["paths"][prefixed_path] = path_item.clone();
            }
        }

        if let Some(schemas) = module_spec
            .get("components")
            .and_then(|c| c.get("schemas"))
            .and_then(|s| s.as_object())
        {
            for (schema_name, schema_def) in schemas {
                openapi_spec["components"]["schemas"][schema_name] = schema_def.clone();
            }
        }
    }

    Ok(openapi_spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use bookshelf_kernel::Module;
    use std::sync::Arc;
    use tower::ServiceExt;

    struct EchoModule;

    #[async_trait::async_trait]
    impl Module for EchoModule {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn routes(&self) -> Router {
            Router::new().route("/", get(|| async { "echo" }))
        }

        fn openapi(&self) -> Option<serde_json::Value> {
            Some(serde_json::json!({
                "paths": {
                    "/": { "get": { "summary": "Echo" } },
                    "/{id}": { "get": { "summary": "Echo one" } }
                },
                "components": { "schemas": { "Echo": { "type": "string" } } }
            }))
        }
    }

    fn registry() -> ModuleRegistry {
        let mut registry = ModuleRegistry::new();
        registry.register(Arc::new(EchoModule));
        registry
    }

    #[test]
    fn test_mount_path() {
        assert_eq!(mount_path("/api/v1", "books").unwrap(), "/api/v1/books");
        assert_eq!(mount_path("/api/v1/", "books").unwrap(), "/api/v1/books");
        assert_eq!(mount_path("", "books").unwrap(), "/books");
        assert!(mount_path("api", "books").is_err());
        assert!(mount_path("/api", "a/b").is_err());
    }

    #[test]
    fn test_openapi_paths_are_prefixed() {
        let spec = openapi_document(&registry(), &Settings::default()).unwrap();

        assert!(spec["paths"]["/api/v1/echo"]["get"].is_object());
        assert!(spec["paths"]["/api/v1/echo/{id}"]["get"].is_object());
        assert!(spec["paths"]["/healthz"].is_object());
        assert_eq!(spec["components"]["schemas"]["Echo"]["type"], "string");
    }

    #[tokio::test]
    async fn test_module_mounting() {
        let router = RouterBuilder::new()
            .mount_module("/api/v1/echo", EchoModule.routes())
            .build();

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/api/v1/echo")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_middleware_chain() {
        let router = RouterBuilder::new()
            .route("/health", get(|| async { "ok" }))
            .with_not_found_fallback()
            .with_timeout(5000)
            .with_cors()
            .with_request_id_propagation()
            .with_tracing()
            .with_request_id()
            .build();

        let response = router
            .clone()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));

        let response = router
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
    }
}
