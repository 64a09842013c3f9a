//! Pet store API guarded by validation layers
//!
//! This example demonstrates:
//! - Path, query, header and cookie parameters declared in code
//! - JSON and form bodies selected by content type
//! - A handler declared in YAML (`validation.yaml`)
//! - Reading the validated `RequestParameters` in handlers
//!
//! Try it:
//!
//! ```text
//! curl 'http://127.0.0.1:3000/pets?limit=5&tags=cat&tags=dog'
//! curl 'http://127.0.0.1:3000/pets/three'
//! curl -X POST -H 'content-type: application/json' -d '{"name":"rex"}' http://127.0.0.1:3000/pets
//! ```

use axum::Json;
use request_validator::prelude::*;
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

const CONFIG: &str = include_str!("validation.yaml");

#[derive(Debug, Serialize, Deserialize)]
struct NewPet {
    name: String,
    #[serde(default)]
    tag: Option<String>,
}

async fn list_pets(params: RequestParameters) -> Json<Value> {
    let limit = params
        .query_parameter("limit")
        .and_then(|p| p.as_i64())
        .unwrap_or_default();
    let tags = params
        .query_parameter("tags")
        .map(|p| p.value().clone())
        .unwrap_or_else(|| json!([]));
    Json(json!({ "limit": limit, "tags": tags, "pets": [] }))
}

async fn get_pet(params: RequestParameters) -> Json<Value> {
    let id = params.path_parameter("petId").and_then(|p| p.as_i64());
    Json(json!({ "id": id, "name": "rex" }))
}

async fn create_pet(params: RequestParameters) -> Json<Value> {
    let pet: Option<NewPet> = params.body().and_then(|b| b.deserialize().ok());
    match pet {
        Some(pet) => Json(json!({ "created": pet.name, "tag": pet.tag })),
        None => Json(json!({ "created": null })),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,request_validator=debug")),
        )
        .init();

    let config = ValidationConfig::from_yaml_str(CONFIG)?;
    let handlers = config.build_handlers()?;
    tracing::info!(handlers = handlers.len(), "loaded validation handlers");

    let list_handler = ValidationHandlerBuilder::new()
        .query_parameter(optional_param(
            "limit",
            int_schema().minimum(1).maximum(100).default_value(20),
        ))?
        .query_parameter(exploded_param_optional(
            "tags",
            array_schema().items(string_schema()),
        ))?
        .header_parameter(optional_param("X-Request-Id", string_schema()))?
        .cookie_parameter(optional_param("session", string_schema()))?
        .build();

    let create_handler = ValidationHandlerBuilder::new()
        .body(json_body(
            object_schema()
                .required_property("name", string_schema().min_length(1))
                .property("tag", string_schema()),
        ))?
        .body(form_url_encoded_body(
            object_schema().required_property("name", string_schema()),
        ))?
        .body_required(true)
        .build();

    let mut app = Router::new().route(
        "/pets",
        get(list_pets)
            .route_layer(list_handler.layer())
            .merge(post(create_pet).route_layer(create_handler.layer())),
    );
    if let Some(handler) = handlers.get("get_pet") {
        app = app.route("/pets/{petId}", get(get_pet).route_layer(handler.layer()));
    }
    let app = app.layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    println!("🚀 Pet store listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
