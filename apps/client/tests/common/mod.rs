//! In-process fake of the Fursa REST API for integration tests.
//!
//! Every handler bumps `hits`, so tests can prove a failure never left the client.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRequest, Multipart, Path, Request, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Map, Value};

use fursa_client::{Config, FursaClient, MemoryTokenStore, TokenStore};

pub const TOKEN: &str = "tok-abc";
pub const PROFILE_ID: i64 = 4;

pub struct FakeApi {
    pub hits: AtomicUsize,
    pub profile: Mutex<Value>,
    pub applications: Mutex<Vec<Value>>,
    pub last_profile_content_type: Mutex<Option<String>>,
    pub last_file_content_type: Mutex<Option<String>>,
    pub registered_emails: Mutex<Vec<String>>,
}

impl FakeApi {
    fn new() -> Self {
        Self {
            hits: AtomicUsize::new(0),
            profile: Mutex::new(json!({
                "id": PROFILE_ID,
                "name": "Amina",
                "bio": "Android developer",
                "skills": [{"id": 1, "name": "Python"}, {"id": 5, "name": "Flutter"}],
                "profile_image": null
            })),
            applications: Mutex::new(Vec::new()),
            last_profile_content_type: Mutex::new(None),
            last_file_content_type: Mutex::new(None),
            registered_emails: Mutex::new(vec!["a@b.com".to_string()]),
        }
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.hits.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn catalog() -> Value {
    json!([
        {"id": 1, "name": "Python"},
        {"id": 2, "name": "React"},
        {"id": 3, "name": "JavaScript"},
        {"id": 4, "name": "Django"},
        {"id": 5, "name": "Flutter"}
    ])
}

pub fn jobs() -> Value {
    json!([
        {
            "id": 1,
            "title": "Mobile Developer",
            "company": "Safiri",
            "description": "Build our rider app.",
            "requirements": "React Native, 2 years",
            "location": "Nairobi"
        },
        {
            "id": 2,
            "title": "Backend Engineer",
            "company": "Kilimo",
            "description": "Own the Django API.",
            "requirements": "Python, Django",
            "location": "Arusha"
        }
    ])
}

/// Starts the fake on an ephemeral port and returns its `/api` base URL.
pub async fn spawn_api() -> (Arc<FakeApi>, String) {
    let state = Arc::new(FakeApi::new());

    let api = Router::new()
        .route("/login/", post(login))
        .route("/register/", post(register))
        .route("/profiles/", get(list_profiles))
        .route("/profiles/:id/", get(get_profile).patch(patch_profile))
        .route("/skills/", get(skills))
        .route("/jobs/", get(list_jobs))
        .route(
            "/applications/",
            get(list_applications).post(create_application),
        )
        .with_state(state.clone());
    let app = Router::new().nest("/api", api);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (state, format!("http://{addr}/api"))
}

/// A client over an in-memory token store, plus that store for inspection.
pub async fn client_for(base_url: &str) -> (FursaClient, Arc<MemoryTokenStore>) {
    let store = Arc::new(MemoryTokenStore::new());
    let client = client_with_store(base_url, store.clone()).await;
    (client, store)
}

pub async fn client_with_store(base_url: &str, store: Arc<dyn TokenStore>) -> FursaClient {
    let config = Config::with_base_url(base_url, std::env::temp_dir().join("unused.json"));
    FursaClient::with_store(&config, store).await.unwrap()
}

/// A base URL nothing is listening on.
pub async fn dead_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/api")
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

type Shared = State<Arc<FakeApi>>;

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {TOKEN}"))
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"detail": "Given token not valid for any token type"})),
    )
        .into_response()
}

async fn login(State(state): Shared, Json(body): Json<Value>) -> Response {
    state.hit();
    let by_email = body.get("email").and_then(|v| v.as_str()) == Some("a@b.com");
    let by_username = body.get("username").and_then(|v| v.as_str()) == Some("amina");
    let password_ok = body.get("password").and_then(|v| v.as_str()) == Some("x");

    // a misbehaving server variant that answers 200 without a usable token
    if body.get("email").and_then(|v| v.as_str()) == Some("empty@b.com") {
        return Json(json!({"message": "Login successful!", "access_token": ""})).into_response();
    }

    if (by_email || by_username) && password_ok {
        return (
            StatusCode::OK,
            Json(json!({
                "message": "Login successful!",
                "access_token": TOKEN,
                "refresh_token": "refresh-abc"
            })),
        )
            .into_response();
    }
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": "Invalid credentials"})),
    )
        .into_response()
}

async fn register(State(state): Shared, Json(body): Json<Value>) -> Response {
    state.hit();
    let email = body
        .get("email")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    let mut errors = Map::new();
    if body.get("username").and_then(|v| v.as_str()).unwrap_or_default().is_empty() {
        errors.insert("username".into(), json!(["This field may not be blank."]));
    }
    let mut emails = state.registered_emails.lock().unwrap();
    if emails.contains(&email) {
        errors.insert("email".into(), json!(["Email already exists."]));
    }
    if !errors.is_empty() {
        return (StatusCode::BAD_REQUEST, Json(Value::Object(errors))).into_response();
    }

    emails.push(email);
    (
        StatusCode::CREATED,
        Json(json!({"message": "Account created successfully!"})),
    )
        .into_response()
}

async fn list_profiles(State(state): Shared, headers: HeaderMap) -> Response {
    state.hit();
    if !authorized(&headers) {
        return unauthorized();
    }
    let profile = state.profile.lock().unwrap().clone();
    Json(json!([profile])).into_response()
}

async fn get_profile(State(state): Shared, Path(id): Path<i64>, headers: HeaderMap) -> Response {
    state.hit();
    if !authorized(&headers) {
        return unauthorized();
    }
    if id != PROFILE_ID {
        return (StatusCode::NOT_FOUND, Json(json!({"detail": "Not found."}))).into_response();
    }
    Json(state.profile.lock().unwrap().clone()).into_response()
}

async fn patch_profile(State(state): Shared, Path(id): Path<i64>, req: Request) -> Response {
    state.hit();
    if !authorized(req.headers()) {
        return unauthorized();
    }
    if id != PROFILE_ID {
        return (StatusCode::NOT_FOUND, Json(json!({"detail": "Not found."}))).into_response();
    }

    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    *state.last_profile_content_type.lock().unwrap() = Some(content_type.clone());

    let mut changes = Map::new();
    let mut skill_ids: Option<Vec<i64>> = None;

    if content_type.starts_with("multipart/form-data") {
        let mut form = Multipart::from_request(req, &()).await.unwrap();
        while let Some(field) = form.next_field().await.unwrap() {
            let name = field.name().unwrap_or_default().to_string();
            let file_name = field.file_name().map(str::to_string);
            if file_name.is_some() {
                *state.last_file_content_type.lock().unwrap() =
                    field.content_type().map(str::to_string);
            }
            let data = field.bytes().await.unwrap();
            match name.as_str() {
                "skill_ids" => skill_ids
                    .get_or_insert_with(Vec::new)
                    .push(String::from_utf8_lossy(&data).parse().unwrap_or(-1)),
                "profile_image" | "resume" => {
                    let dir = if name == "resume" { "resumes" } else { "profile_images" };
                    changes.insert(
                        name.clone(),
                        json!(format!(
                            "http://testserver/media/{dir}/{}",
                            file_name.unwrap_or_default()
                        )),
                    );
                }
                _ => {
                    changes.insert(name, json!(String::from_utf8_lossy(&data)));
                }
            }
        }
    } else {
        let raw = axum::body::to_bytes(req.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&raw).unwrap();
        for (key, value) in body.as_object().cloned().unwrap_or_default() {
            if key == "skill_ids" {
                skill_ids = Some(
                    value
                        .as_array()
                        .unwrap()
                        .iter()
                        .filter_map(|v| v.as_i64())
                        .collect(),
                );
            } else {
                changes.insert(key, value);
            }
        }
    }

    let catalog = catalog();
    let mut skills = Vec::new();
    if let Some(ids) = &skill_ids {
        for id in ids {
            match catalog
                .as_array()
                .unwrap()
                .iter()
                .find(|s| s["id"].as_i64() == Some(*id))
            {
                Some(skill) => skills.push(skill.clone()),
                None => {
                    return (
                        StatusCode::BAD_REQUEST,
                        Json(json!({
                            "skill_ids": [format!("Invalid pk \"{id}\" - object does not exist.")]
                        })),
                    )
                        .into_response()
                }
            }
        }
    }

    let mut profile = state.profile.lock().unwrap();
    let obj = profile.as_object_mut().unwrap();
    for (key, value) in changes {
        obj.insert(key, value);
    }
    if skill_ids.is_some() {
        obj.insert("skills".into(), Value::Array(skills));
    }
    Json(profile.clone()).into_response()
}

async fn skills(State(state): Shared) -> Json<Value> {
    state.hit();
    Json(catalog())
}

async fn list_jobs(State(state): Shared) -> Json<Value> {
    state.hit();
    Json(jobs())
}

async fn list_applications(State(state): Shared, headers: HeaderMap) -> Response {
    state.hit();
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(Value::Array(state.applications.lock().unwrap().clone())).into_response()
}

async fn create_application(State(state): Shared, req: Request) -> Response {
    state.hit();
    if !authorized(req.headers()) {
        return unauthorized();
    }

    let mut form = Multipart::from_request(req, &()).await.unwrap();
    let mut job_id: Option<i64> = None;
    let mut cover_letter = String::new();
    let mut resume: Option<String> = None;
    while let Some(field) = form.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let data = field.bytes().await.unwrap();
        match name.as_str() {
            "job" => job_id = String::from_utf8_lossy(&data).parse().ok(),
            "cover_letter" => cover_letter = String::from_utf8_lossy(&data).into_owned(),
            "resume" if !data.is_empty() => {
                resume = Some(format!(
                    "http://testserver/media/resumes/{}",
                    file_name.unwrap_or_default()
                ))
            }
            _ => {}
        }
    }

    let Some(job_id) = job_id else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Job ID is required."})),
        )
            .into_response();
    };
    let Some(job) = jobs()
        .as_array()
        .unwrap()
        .iter()
        .find(|j| j["id"].as_i64() == Some(job_id))
        .cloned()
    else {
        return (StatusCode::NOT_FOUND, Json(json!({"error": "Job not found."}))).into_response();
    };

    let mut applications = state.applications.lock().unwrap();
    if applications
        .iter()
        .any(|a| a["job"]["id"].as_i64() == Some(job_id))
    {
        return (
            StatusCode::OK,
            Json(json!({"message": "You have already applied for this job."})),
        )
            .into_response();
    }

    let application = json!({
        "id": applications.len() as i64 + 1,
        "job": {
            "id": job["id"],
            "title": job["title"],
            "company": job["company"],
            "location": job["location"]
        },
        "user": 9,
        "cover_letter": cover_letter,
        "resume": resume,
        "applied_at": "2024-11-02T09:30:00Z"
    });
    applications.push(application.clone());
    (StatusCode::CREATED, Json(application)).into_response()
}
