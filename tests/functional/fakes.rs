//! Fake servers.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Form, Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;

use pds_integration::ControlPlane;
use pds_integration::cluster::TargetCluster;
use pds_integration::sink::{AttemptAborted, Sink};

/// Serve `app` on an ephemeral port and return its base URL.
pub async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn list(items: &[Value]) -> Json<Value> {
    Json(json!({ "data": items }))
}

fn not_found(what: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "message": format!("{what} not found") })),
    )
        .into_response()
}

/// Mutable state of the fake Control Plane.
#[derive(Default)]
pub struct ControlPlaneState {
    pub data_services: Vec<Value>,
    pub images: Vec<Value>,
    pub resource_settings_templates: Vec<Value>,
    pub app_config_templates: Vec<Value>,
    pub storage_options_templates: Vec<Value>,
    pub backup_policies: Vec<Value>,
    pub dns_zone: String,
    /// Reject deployments without TLS like a TLS-required target does.
    pub tls_required: bool,
    /// Credential ids referenced by a backup target.
    pub referenced_credentials: Vec<String>,
    /// Bodies of accepted create-deployment calls.
    pub created_deployments: Vec<Value>,
    /// Query strings seen on `/images`.
    pub image_queries: Vec<BTreeMap<String, String>>,
    /// `Authorization` headers seen on `/accounts`.
    pub authorization: Vec<String>,
    /// Ids of templates created through the API, in order.
    pub created_templates: Vec<String>,
    /// Ids of templates deleted through the API, in order.
    pub deleted_templates: Vec<String>,
    /// Template kind whose creation fails with HTTP 500.
    pub failing_template_kind: Option<&'static str>,
}

pub type SharedControlPlane = Arc<Mutex<ControlPlaneState>>;

/// A fake Control Plane serving `state`.
pub fn control_plane_app(state: SharedControlPlane) -> Router {
    Router::new()
        .route("/accounts", get(accounts))
        .route("/data-services", get(data_services))
        .route("/images", get(images))
        .route(
            "/tenants/{tenant_id}/resource-settings-templates",
            get(|State(s): State<SharedControlPlane>| async move {
                list(&s.lock().unwrap().resource_settings_templates)
            })
            .post(
                |State(s): State<SharedControlPlane>, Json(body): Json<Value>| async move {
                    create_template(&s, "resource-settings", body)
                },
            ),
        )
        .route("/resource-settings-templates/{id}", delete(delete_template))
        .route(
            "/tenants/{tenant_id}/application-configuration-templates",
            get(|State(s): State<SharedControlPlane>| async move {
                list(&s.lock().unwrap().app_config_templates)
            })
            .post(
                |State(s): State<SharedControlPlane>, Json(body): Json<Value>| async move {
                    create_template(&s, "application-configuration", body)
                },
            ),
        )
        .route("/application-configuration-templates/{id}", delete(delete_template))
        .route(
            "/tenants/{tenant_id}/storage-options-templates",
            get(|State(s): State<SharedControlPlane>| async move {
                list(&s.lock().unwrap().storage_options_templates)
            })
            .post(
                |State(s): State<SharedControlPlane>, Json(body): Json<Value>| async move {
                    create_template(&s, "storage-options", body)
                },
            ),
        )
        .route("/storage-options-templates/{id}", delete(delete_template))
        .route(
            "/tenants/{tenant_id}/backup-policies",
            get(|State(s): State<SharedControlPlane>| async move {
                list(&s.lock().unwrap().backup_policies)
            }),
        )
        .route(
            "/tenants/{tenant_id}/dns-details",
            get(|State(s): State<SharedControlPlane>| async move {
                Json(json!({ "dns_zone": s.lock().unwrap().dns_zone }))
            }),
        )
        .route("/projects/{project_id}/deployments", post(create_deployment))
        .route(
            "/deployments/{id}",
            get(|Path(id): Path<String>| async move { not_found(&format!("deployment {id}")) }),
        )
        .route("/backup-credentials/{id}", delete(delete_backup_credentials))
        .with_state(state)
}

fn create_template(state: &SharedControlPlane, kind: &'static str, mut body: Value) -> Response {
    let mut state = state.lock().unwrap();
    if state.failing_template_kind == Some(kind) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": format!("creating {kind} template failed") })),
        )
            .into_response();
    }
    let id = format!("{kind}-{}", state.created_templates.len() + 1);
    body["id"] = json!(id);
    state.created_templates.push(id);
    (StatusCode::CREATED, Json(body)).into_response()
}

async fn delete_template(State(state): State<SharedControlPlane>, Path(id): Path<String>) -> Response {
    let mut state = state.lock().unwrap();
    if !state.created_templates.contains(&id) {
        return not_found(&format!("template {id}"));
    }
    state.deleted_templates.push(id);
    StatusCode::NO_CONTENT.into_response()
}

async fn accounts(State(state): State<SharedControlPlane>, headers: HeaderMap) -> Json<Value> {
    if let Some(value) = headers.get("authorization") {
        state
            .lock()
            .unwrap()
            .authorization
            .push(value.to_str().unwrap().to_string());
    }
    list(&[json!({ "id": "acc-1", "name": "integration" })])
}

async fn data_services(State(state): State<SharedControlPlane>) -> Json<Value> {
    list(&state.lock().unwrap().data_services)
}

async fn images(
    State(state): State<SharedControlPlane>,
    Query(query): Query<BTreeMap<String, String>>,
) -> Json<Value> {
    let mut state = state.lock().unwrap();
    state.image_queries.push(query.clone());
    let wanted = query.get("data_service_id").cloned().unwrap_or_default();
    let images: Vec<Value> = state
        .images
        .iter()
        .filter(|image| image["data_service_id"] == wanted.as_str())
        .cloned()
        .collect();
    list(&images)
}

async fn create_deployment(
    State(state): State<SharedControlPlane>,
    Path(project_id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut state = state.lock().unwrap();
    if state.tls_required && body["tls_enabled"] != json!(true) {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "message": "policy requires enabling TLS for this deployment"
            })),
        )
            .into_response();
    }
    state.created_deployments.push(body.clone());
    let id = format!("dep-{}", state.created_deployments.len());
    Json(json!({
        "id": id,
        "name": "pg-test",
        "cluster_resource_name": "pg-test-abc123",
        "project_id": project_id,
        "namespace_id": body["namespace_id"],
        "deployment_target_id": body["deployment_target_id"],
        "image_id": body["image_id"],
        "node_count": body["node_count"],
    }))
    .into_response()
}

async fn delete_backup_credentials(
    State(state): State<SharedControlPlane>,
    Path(id): Path<String>,
) -> Response {
    if state.lock().unwrap().referenced_credentials.contains(&id) {
        return (
            StatusCode::CONFLICT,
            Json(json!({ "message": "backup credentials are in use" })),
        )
            .into_response();
    }
    StatusCode::NO_CONTENT.into_response()
}

/// Catalog and templates for PostgreSQL under the suite prefix `prefix`.
pub fn postgres_state(prefix: &str) -> ControlPlaneState {
    ControlPlaneState {
        data_services: vec![
            json!({ "id": "ds-pg", "name": "PostgreSQL", "short_name": "pg" }),
            json!({ "id": "ds-unknown", "name": "Oracle", "short_name": "ora" }),
        ],
        images: vec![
            json!({
                "id": "img-pg-153", "data_service_id": "ds-pg", "version_id": "v-153",
                "tag": "15.3", "build": "a1b2c3", "created_at": "2023-06-01T00:00:00Z"
            }),
            json!({
                "id": "img-pg-148", "data_service_id": "ds-pg", "version_id": "v-148",
                "tag": "14.8", "build": "d4e5f6"
            }),
        ],
        resource_settings_templates: vec![
            json!({ "id": "rs-small", "name": format!("{prefix}-small"), "data_service_id": "ds-pg" }),
            json!({ "id": "rs-other", "name": "small", "data_service_id": "ds-pg" }),
        ],
        app_config_templates: vec![
            json!({ "id": "ac-default", "name": format!("{prefix}-default"), "data_service_id": "ds-pg" }),
        ],
        storage_options_templates: vec![
            json!({ "id": "so-default", "name": format!("{prefix}-default"), "repl": 1, "fs": "xfs" }),
        ],
        backup_policies: vec![
            json!({ "id": "bp-1", "name": "nightly", "schedules": [] }),
        ],
        dns_zone: "pds.example.test".to_string(),
        ..Default::default()
    }
}

/// A fake Control Plane with `state`, and an unauthenticated client for it.
pub async fn fake_control_plane(state: ControlPlaneState) -> (SharedControlPlane, ControlPlane) {
    let state = Arc::new(Mutex::new(state));
    let url = serve(control_plane_app(state.clone())).await;
    let cp = ControlPlane::with_client(reqwest::Client::new(), &url, None);
    (state, cp)
}

/// Fake OIDC provider that issues `token` for `username`/`password`.
pub async fn fake_oidc(username: &'static str, password: &'static str, token: &'static str) -> String {
    let issuer = Arc::new(Mutex::new(String::new()));
    let app = Router::new()
        .route(
            "/.well-known/openid-configuration",
            get({
                let issuer = issuer.clone();
                move || {
                    let issuer = issuer.lock().unwrap().clone();
                    async move { Json(json!({ "token_endpoint": format!("{issuer}/token") })) }
                }
            }),
        )
        .route(
            "/token",
            post(move |Form(form): Form<BTreeMap<String, String>>| async move {
                let valid = form.get("grant_type").map(String::as_str) == Some("password")
                    && form.get("scope").map(String::as_str) == Some("openid")
                    && form.get("username").map(String::as_str) == Some(username)
                    && form.get("password").map(String::as_str) == Some(password);
                if valid {
                    Json(json!({ "access_token": token, "token_type": "Bearer" })).into_response()
                } else {
                    (
                        StatusCode::UNAUTHORIZED,
                        Json(json!({ "error": "invalid_grant" })),
                    )
                        .into_response()
                }
            }),
        );
    let url = serve(app).await;
    *issuer.lock().unwrap() = url.clone();
    url
}

/// Fake Prometheus answering every instant query with `respond(query)`.
pub async fn fake_prometheus<F>(respond: F) -> String
where
    F: Fn(&str) -> Value + Clone + Send + Sync + 'static,
{
    let app = Router::new().route(
        "/api/v1/query",
        get(move |Query(params): Query<BTreeMap<String, String>>| {
            let query = params.get("query").cloned().unwrap_or_default();
            let body = respond(&query);
            async move { Json(body) }
        }),
    );
    serve(app).await
}

/// Successful instant-vector response with one sample per label set.
pub fn vector(samples: &[Value]) -> Value {
    let result: Vec<Value> = samples
        .iter()
        .map(|metric| json!({ "metric": metric, "value": [1_700_000_000.0, "1"] }))
        .collect();
    json!({ "status": "success", "data": { "resultType": "vector", "result": result } })
}

/// Mutable state of the fake Kubernetes API. Objects are keyed by name only.
#[derive(Default)]
pub struct ClusterState {
    pub jobs: BTreeMap<String, Value>,
    /// Status reported for every Job; jobs never finish while `None`.
    pub job_status: Option<Value>,
    pub deleted_jobs: Vec<String>,
    /// Log text of every pod.
    pub pod_logs: String,
    pub backups: BTreeMap<String, Value>,
    pub restores: BTreeMap<String, Value>,
    /// Status reported for every Restore.
    pub restore_status: Option<Value>,
}

pub type SharedCluster = Arc<Mutex<ClusterState>>;

fn kube_not_found(kind: &str, name: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "apiVersion": "v1",
            "kind": "Status",
            "metadata": {},
            "status": "Failure",
            "message": format!("{kind} \"{name}\" not found"),
            "reason": "NotFound",
            "code": 404,
        })),
    )
        .into_response()
}

/// A fake Kubernetes API covering Jobs, pod logs, Backups and Restores.
pub fn cluster_app(state: SharedCluster) -> Router {
    Router::new()
        .route("/apis/batch/v1/namespaces/{namespace}/jobs", post(create_job))
        .route(
            "/apis/batch/v1/namespaces/{namespace}/jobs/{name}",
            get(get_job).delete(delete_job),
        )
        .route("/api/v1/namespaces/{namespace}/pods", get(list_pods))
        .route(
            "/api/v1/namespaces/{namespace}/pods/{pod}/log",
            get(|State(s): State<SharedCluster>| async move { s.lock().unwrap().pod_logs.clone() }),
        )
        .route(
            "/apis/backups.pds.io/v1/namespaces/{namespace}/backups/{name}",
            get(
                |State(s): State<SharedCluster>, Path((_, name)): Path<(String, String)>| async move {
                    match s.lock().unwrap().backups.get(&name) {
                        Some(backup) => Json(backup.clone()).into_response(),
                        None => kube_not_found("backups.backups.pds.io", &name),
                    }
                },
            ),
        )
        .route(
            "/apis/backups.pds.io/v1/namespaces/{namespace}/restores",
            post(create_restore),
        )
        .route(
            "/apis/backups.pds.io/v1/namespaces/{namespace}/restores/{name}",
            get(get_restore),
        )
        .with_state(state)
}

async fn create_job(State(state): State<SharedCluster>, Json(job): Json<Value>) -> Response {
    let name = job["metadata"]["name"].as_str().unwrap_or_default().to_string();
    state.lock().unwrap().jobs.insert(name, job.clone());
    (StatusCode::CREATED, Json(job)).into_response()
}

async fn get_job(
    State(state): State<SharedCluster>,
    Path((_, name)): Path<(String, String)>,
) -> Response {
    let state = state.lock().unwrap();
    let Some(mut job) = state.jobs.get(&name).cloned() else {
        return kube_not_found("jobs.batch", &name);
    };
    if let Some(status) = &state.job_status {
        job["status"] = status.clone();
    }
    Json(job).into_response()
}

async fn delete_job(
    State(state): State<SharedCluster>,
    Path((_, name)): Path<(String, String)>,
) -> Response {
    let mut state = state.lock().unwrap();
    let Some(job) = state.jobs.remove(&name) else {
        return kube_not_found("jobs.batch", &name);
    };
    state.deleted_jobs.push(name);
    Json(job).into_response()
}

/// One pod per existing Job, selected by `job-name=<job>`.
async fn list_pods(
    State(state): State<SharedCluster>,
    Path(namespace): Path<String>,
    Query(query): Query<BTreeMap<String, String>>,
) -> Json<Value> {
    let state = state.lock().unwrap();
    let selector = query.get("labelSelector").cloned().unwrap_or_default();
    let items: Vec<Value> = state
        .jobs
        .keys()
        .filter(|job| selector == format!("job-name={job}"))
        .map(|job| {
            json!({
                "apiVersion": "v1",
                "kind": "Pod",
                "metadata": {
                    "name": format!("{job}-pod"),
                    "namespace": namespace,
                    "labels": { "job-name": job },
                },
            })
        })
        .collect();
    Json(json!({ "apiVersion": "v1", "kind": "PodList", "metadata": {}, "items": items }))
}

async fn create_restore(State(state): State<SharedCluster>, Json(restore): Json<Value>) -> Response {
    let name = restore["metadata"]["name"].as_str().unwrap_or_default().to_string();
    state.lock().unwrap().restores.insert(name, restore.clone());
    (StatusCode::CREATED, Json(restore)).into_response()
}

async fn get_restore(
    State(state): State<SharedCluster>,
    Path((_, name)): Path<(String, String)>,
) -> Response {
    let state = state.lock().unwrap();
    let Some(mut restore) = state.restores.get(&name).cloned() else {
        return kube_not_found("restores.backups.pds.io", &name);
    };
    if let Some(status) = &state.restore_status {
        restore["status"] = status.clone();
    }
    Json(restore).into_response()
}

/// A fake Kubernetes API with `state`, and a cluster client routed straight
/// into it. Must be called inside a Tokio runtime.
pub fn fake_cluster(state: ClusterState) -> (SharedCluster, TargetCluster) {
    let state = Arc::new(Mutex::new(state));
    let client = kube::Client::new(cluster_app(state.clone()), "default");
    (state, TargetCluster::new(client))
}

/// Outer sink double that records errors. `fail_now` unwinds like an aborted
/// waiter attempt.
#[derive(Default)]
pub struct Recorder {
    errors: Mutex<Vec<String>>,
    failed: AtomicBool,
}

impl Recorder {
    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }
}

impl Sink for Recorder {
    fn name(&self) -> &str {
        "recorder"
    }

    fn log(&self, _message: &str) {}

    fn error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
        self.fail();
    }

    fn fail(&self) {
        self.failed.store(true, Ordering::SeqCst);
    }

    fn fail_now(&self) -> ! {
        self.fail();
        std::panic::resume_unwind(Box::new(AttemptAborted))
    }

    fn failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }
}
