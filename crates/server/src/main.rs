use std::{net::SocketAddr, sync::Arc};

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Extension, Router,
};
use serde::Deserialize;
use serde_json::Value;
use tower_http::{limit::RequestBodyLimitLayer, services::ServeDir};
use tracing::info;

use climate::{ClimateApi, ClimateClient};
use shared::{
    domain::Activity,
    error::{ApiError, ErrorCode},
};

mod config;
mod session;
mod views;

use config::load_settings;
use session::{attach_session, Session, SessionKey, SessionStore, SessionUpdate};

const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;
const OBSERVATION_PAGE_LIMIT: u32 = 100;

struct AppState {
    climate: Arc<dyn ClimateApi>,
    sessions: SessionStore,
    public_url: String,
}

impl AppState {
    /// Where the platform sends the browser back after Log In with FieldView.
    fn redirect_uri(&self) -> String {
        format!("{}/login-redirect", self.public_url.trim_end_matches('/'))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let settings = load_settings()?;
    let state = Arc::new(AppState {
        climate: Arc::new(ClimateClient::new(settings.climate)),
        sessions: SessionStore::default(),
        public_url: settings.public_url,
    });
    let app = build_router(state);

    let addr: SocketAddr = settings.bind_addr.parse()?;
    info!(%addr, "partner demo listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/home", get(home))
        .route("/login-redirect", get(login_redirect))
        .route("/refresh-token", get(refresh_token))
        .route("/logout-redirect", get(logout_redirect))
        .route("/field/:field_id", get(field_detail))
        .route("/upload", get(upload_form).post(upload_submit))
        .route("/upload/:upload_id", get(upload_status))
        .route("/scouting-observations", get(scouting_observations))
        .route("/scouting-observation/:observation_id", get(scouting_observation))
        .route(
            "/scouting-observation/:observation_id/attachments",
            get(observation_attachments),
        )
        .route(
            "/scouting-observation/:observation_id/attachments/:attachment_id",
            get(attachment_contents),
        )
        .route("/layers/asPlanted", get(as_planted))
        .route("/layers/asHarvested", get(as_harvested))
        .route("/layers/asApplied", get(as_applied))
        .route("/layers/:layer_id/:activity_id/contents", get(activity_contents))
        .nest_service("/res", ServeDir::new("res"))
        .layer(middleware::from_fn(attach_session))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_UPLOAD_BYTES))
        .with_state(state)
}

enum AppError {
    /// The session carries no access token; the home page shows the login
    /// link, so that is where the browser goes.
    NotLoggedIn,
    Api(ApiError),
}

impl From<ApiError> for AppError {
    fn from(error: ApiError) -> Self {
        AppError::Api(error)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::NotLoggedIn => Redirect::to("/home").into_response(),
            AppError::Api(error) => {
                let status = match error.code {
                    ErrorCode::Unauthorized => StatusCode::FORBIDDEN,
                    ErrorCode::AuthExpired => StatusCode::UNAUTHORIZED,
                    ErrorCode::NotFound => StatusCode::NOT_FOUND,
                    ErrorCode::Validation => StatusCode::BAD_REQUEST,
                    ErrorCode::Upstream => StatusCode::BAD_GATEWAY,
                    ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, Html(views::error_page(&error))).into_response()
            }
        }
    }
}

fn logged_in(state: &AppState, key: SessionKey) -> Result<(Session, String), AppError> {
    let session = state.sessions.snapshot(key);
    let token = session.access_token.clone().ok_or(AppError::NotLoggedIn)?;
    Ok((session, token))
}

async fn home(
    State(state): State<Arc<AppState>>,
    Extension(key): Extension<SessionKey>,
) -> Html<String> {
    let session = state.sessions.snapshot(key);
    match session.user {
        Some(user) => Html(views::user_home(
            &user,
            session.access_token.as_deref().unwrap_or(""),
            session.refresh_token.as_deref().unwrap_or(""),
            session.fields.as_deref().unwrap_or(&[]),
        )),
        None => Html(views::login_page(
            &state.climate.login_uri(&state.redirect_uri()),
        )),
    }
}

#[derive(Debug, Deserialize)]
struct LoginRedirectQuery {
    code: Option<String>,
}

async fn login_redirect(
    State(state): State<Arc<AppState>>,
    Extension(key): Extension<SessionKey>,
    Query(query): Query<LoginRedirectQuery>,
) -> Result<Redirect, AppError> {
    if let Some(code) = query.code.as_deref().filter(|c| !c.is_empty()) {
        let auth = state.climate.authorize(code, &state.redirect_uri()).await?;
        state.sessions.apply(
            key,
            SessionUpdate {
                access_token: Some(auth.access_token.clone()),
                refresh_token: Some(auth.refresh_token),
                user: Some(auth.user),
                ..SessionUpdate::default()
            },
        );

        // The demo pages link straight into the field list, so cache it now.
        let fields = state.climate.fields(&auth.access_token).await?;
        state.sessions.apply(
            key,
            SessionUpdate {
                fields: Some(fields),
                ..SessionUpdate::default()
            },
        );
    }
    Ok(Redirect::to("/home"))
}

async fn refresh_token(
    State(state): State<Arc<AppState>>,
    Extension(key): Extension<SessionKey>,
) -> Result<Redirect, AppError> {
    let Some(refresh) = state.sessions.snapshot(key).refresh_token else {
        return Ok(Redirect::to("/home"));
    };
    let auth = state.climate.reauthorize(&refresh).await?;
    state.sessions.apply(
        key,
        SessionUpdate {
            access_token: Some(auth.access_token),
            refresh_token: Some(auth.refresh_token),
            user: Some(auth.user),
            ..SessionUpdate::default()
        },
    );
    Ok(Redirect::to("/home"))
}

async fn logout_redirect(
    State(state): State<Arc<AppState>>,
    Extension(key): Extension<SessionKey>,
) -> Redirect {
    state.sessions.clear(key);
    Redirect::to("/home")
}

async fn field_detail(
    State(state): State<Arc<AppState>>,
    Extension(key): Extension<SessionKey>,
    Path(field_id): Path<String>,
) -> Result<Html<String>, AppError> {
    let (session, token) = logged_in(&state, key)?;
    let field = session
        .fields
        .unwrap_or_default()
        .into_iter()
        .find(|f| f.id == field_id)
        .ok_or_else(|| ApiError::not_found(format!("field '{field_id}' is not in the field list")))?;

    let boundary = match field.boundary_id.as_deref() {
        Some(boundary_id) => Some(state.climate.boundary(&token, boundary_id).await?),
        None => None,
    };
    Ok(Html(views::field_page(&field, boundary.as_ref())))
}

async fn upload_form() -> Html<String> {
    Html(views::upload_form_page())
}

async fn upload_submit(
    State(state): State<Arc<AppState>>,
    Extension(key): Extension<SessionKey>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let (_, token) = logged_in(&state, key)?;

    let mut content_type: Option<String> = None;
    let mut data: Option<Bytes> = None;
    while let Some(part) = multipart.next_field().await.map_err(bad_form)? {
        match part.name() {
            Some("file_content_type") => content_type = Some(part.text().await.map_err(bad_form)?),
            Some("file") => data = Some(part.bytes().await.map_err(bad_form)?),
            _ => {}
        }
    }

    let Some(data) = data.filter(|d| !d.is_empty()) else {
        return Ok(Redirect::to("/upload").into_response());
    };
    let content_type = content_type
        .filter(|ct| !ct.trim().is_empty())
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let upload_id = state.climate.upload(&token, &content_type, data).await?;
    Ok(Html(views::upload_result_page(&upload_id)).into_response())
}

fn bad_form(error: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::new(ErrorCode::Validation, format!("malformed upload form: {error}"))
}

async fn upload_status(
    State(state): State<Arc<AppState>>,
    Extension(key): Extension<SessionKey>,
    Path(upload_id): Path<String>,
) -> Result<Html<String>, AppError> {
    let (_, token) = logged_in(&state, key)?;
    let status = state.climate.upload_status(&token, &upload_id).await?;
    let status_text = status
        .get("status")
        .and_then(Value::as_str)
        .unwrap_or("UNKNOWN");
    Ok(Html(views::upload_status_page(&upload_id, status_text)))
}

async fn scouting_observations(
    State(state): State<Arc<AppState>>,
    Extension(key): Extension<SessionKey>,
) -> Result<Html<String>, AppError> {
    let (_, token) = logged_in(&state, key)?;
    let observations = state
        .climate
        .scouting_observations(&token, OBSERVATION_PAGE_LIMIT)
        .await?;
    Ok(Html(views::observations_page(&observations)))
}

async fn scouting_observation(
    State(state): State<Arc<AppState>>,
    Extension(key): Extension<SessionKey>,
    Path(observation_id): Path<String>,
) -> Result<Html<String>, AppError> {
    let (_, token) = logged_in(&state, key)?;
    let observation = state
        .climate
        .scouting_observation(&token, &observation_id)
        .await?;
    Ok(Html(views::observation_page(&observation_id, &observation)))
}

async fn observation_attachments(
    State(state): State<Arc<AppState>>,
    Extension(key): Extension<SessionKey>,
    Path(observation_id): Path<String>,
) -> Result<Html<String>, AppError> {
    let (_, token) = logged_in(&state, key)?;
    let attachments = state
        .climate
        .scouting_observation_attachments(&token, &observation_id)
        .await?;
    Ok(Html(views::attachments_page(&observation_id, &attachments)))
}

#[derive(Debug, Deserialize)]
struct AttachmentQuery {
    #[serde(rename = "contentType")]
    content_type: Option<String>,
    length: u64,
}

async fn attachment_contents(
    State(state): State<Arc<AppState>>,
    Extension(key): Extension<SessionKey>,
    Path((observation_id, attachment_id)): Path<(String, String)>,
    Query(query): Query<AttachmentQuery>,
) -> Result<Response, AppError> {
    let (_, token) = logged_in(&state, key)?;
    let content_type = query
        .content_type
        .unwrap_or_else(|| "application/octet-stream".to_string());
    let contents = state
        .climate
        .attachment_contents(&token, &observation_id, &attachment_id, &content_type, query.length)
        .await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    Ok((StatusCode::OK, headers, contents).into_response())
}

#[derive(Debug, Deserialize)]
struct ActivityQuery {
    next_token: Option<String>,
}

async fn as_planted(
    State(state): State<Arc<AppState>>,
    Extension(key): Extension<SessionKey>,
    Query(query): Query<ActivityQuery>,
) -> Result<Html<String>, AppError> {
    activity_listing(&state, key, Activity::AsPlanted, query.next_token.as_deref()).await
}

async fn as_harvested(
    State(state): State<Arc<AppState>>,
    Extension(key): Extension<SessionKey>,
    Query(query): Query<ActivityQuery>,
) -> Result<Html<String>, AppError> {
    activity_listing(&state, key, Activity::AsHarvested, query.next_token.as_deref()).await
}

async fn as_applied(
    State(state): State<Arc<AppState>>,
    Extension(key): Extension<SessionKey>,
    Query(query): Query<ActivityQuery>,
) -> Result<Html<String>, AppError> {
    activity_listing(&state, key, Activity::AsApplied, query.next_token.as_deref()).await
}

async fn activity_listing(
    state: &AppState,
    key: SessionKey,
    activity: Activity,
    next_token: Option<&str>,
) -> Result<Html<String>, AppError> {
    let (_, token) = logged_in(state, key)?;
    let page = state.climate.activities(&token, activity, next_token).await?;
    Ok(Html(views::activities_page(
        activity,
        &page.items,
        page.next_token.as_deref(),
    )))
}

#[derive(Debug, Deserialize)]
struct ContentsQuery {
    length: u64,
}

async fn activity_contents(
    State(state): State<Arc<AppState>>,
    Extension(key): Extension<SessionKey>,
    Path((layer_id, activity_id)): Path<(String, String)>,
    Query(query): Query<ContentsQuery>,
) -> Result<Response, AppError> {
    let (_, token) = logged_in(&state, key)?;
    let activity: Activity = layer_id
        .parse()
        .map_err(|_| ApiError::not_found(format!("unknown activity layer '{layer_id}'")))?;
    let contents = state
        .climate
        .activity_contents(&token, activity, &activity_id, query.length)
        .await?;

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/zip"));
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_static("attachment; filename=\"data.zip\""),
    );
    Ok((StatusCode::OK, headers, contents).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::{body, body::Body, http::Request};
    use serde_json::{json, Map};
    use shared::domain::{ActivityPage, Authorization, Field, FieldViewUser};
    use tower::ServiceExt;

    #[derive(Default)]
    struct FakeClimate {
        fields: Vec<Field>,
        next_token: Option<String>,
    }

    #[async_trait]
    impl ClimateApi for FakeClimate {
        fn login_uri(&self, redirect_uri: &str) -> String {
            format!("https://login.example/?redirect_uri={redirect_uri}")
        }

        async fn authorize(&self, _code: &str, _redirect_uri: &str) -> Result<Authorization, ApiError> {
            Ok(Authorization {
                access_token: "AT".into(),
                refresh_token: "RT".into(),
                user: FieldViewUser {
                    firstname: "Ada".into(),
                    lastname: "Lovelace".into(),
                    extra: Map::new(),
                },
            })
        }

        async fn reauthorize(&self, _refresh_token: &str) -> Result<Authorization, ApiError> {
            Ok(Authorization {
                access_token: "AT2".into(),
                refresh_token: "RT2".into(),
                user: FieldViewUser {
                    firstname: "Ada".into(),
                    lastname: "Lovelace".into(),
                    extra: Map::new(),
                },
            })
        }

        async fn fields(&self, _token: &str) -> Result<Vec<Field>, ApiError> {
            Ok(self.fields.clone())
        }

        async fn boundary(&self, _token: &str, boundary_id: &str) -> Result<Value, ApiError> {
            Ok(json!({"id": boundary_id, "type": "Polygon"}))
        }

        async fn upload(&self, _token: &str, _content_type: &str, _data: Bytes) -> Result<String, ApiError> {
            Ok("upload-1".into())
        }

        async fn upload_status(&self, _token: &str, upload_id: &str) -> Result<Value, ApiError> {
            Ok(json!({"id": upload_id, "status": "SUCCESS"}))
        }

        async fn scouting_observations(&self, _token: &str, _limit: u32) -> Result<Vec<Value>, ApiError> {
            Ok(vec![json!({"id": "obs-1"})])
        }

        async fn scouting_observation(&self, _token: &str, id: &str) -> Result<Value, ApiError> {
            Ok(json!({"id": id}))
        }

        async fn scouting_observation_attachments(&self, _token: &str, _id: &str) -> Result<Vec<Value>, ApiError> {
            Ok(vec![json!({
                "id": "att-1",
                "status": "ACTIVE",
                "contentType": "image/jpeg",
                "length": 4,
            })])
        }

        async fn attachment_contents(
            &self,
            _token: &str,
            _observation_id: &str,
            _attachment_id: &str,
            _content_type: &str,
            _length: u64,
        ) -> Result<Bytes, ApiError> {
            Ok(Bytes::from_static(b"JPEG"))
        }

        async fn activities(
            &self,
            _token: &str,
            _activity: Activity,
            _next_token: Option<&str>,
        ) -> Result<ActivityPage, ApiError> {
            Ok(ActivityPage {
                items: vec![json!({"id": "act-1", "length": 10})],
                next_token: self.next_token.clone(),
            })
        }

        async fn activity_contents(
            &self,
            _token: &str,
            _activity: Activity,
            _activity_id: &str,
            _length: u64,
        ) -> Result<Bytes, ApiError> {
            Ok(Bytes::from_static(b"PK"))
        }
    }

    fn sample_fields() -> Vec<Field> {
        vec![
            Field {
                id: "a".into(),
                name: "Field A".into(),
                boundary_id: Some("bnd-a".into()),
                extra: Map::new(),
            },
            Field {
                id: "b".into(),
                name: "Field B".into(),
                boundary_id: Some("bnd-b".into()),
                extra: Map::new(),
            },
        ]
    }

    fn test_state(fake: FakeClimate) -> Arc<AppState> {
        Arc::new(AppState {
            climate: Arc::new(fake),
            sessions: SessionStore::default(),
            public_url: "http://localhost:8080".into(),
        })
    }

    fn seeded_session(state: &AppState, fields: Option<Vec<Field>>) -> SessionKey {
        let key = SessionKey::fresh();
        state.sessions.apply(
            key,
            SessionUpdate {
                access_token: Some("AT".into()),
                fields,
                ..SessionUpdate::default()
            },
        );
        key
    }

    fn get_with_session(path: &str, key: SessionKey) -> Request<Body> {
        Request::get(path)
            .header("cookie", format!("sid={}", key.0))
            .body(Body::empty())
            .expect("request")
    }

    async fn body_text(response: Response) -> String {
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        String::from_utf8_lossy(&bytes).into_owned()
    }

    fn session_cookie(response: &Response) -> String {
        response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .expect("session cookie")
            .to_string()
    }

    #[tokio::test]
    async fn home_without_a_user_shows_the_login_view() {
        let app = build_router(test_state(FakeClimate::default()));
        let response = app
            .oneshot(Request::get("/home").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let page = body_text(response).await;
        assert!(page.contains("Log In with FieldView"));
        assert!(page.contains("https://login.example/?redirect_uri=http://localhost:8080/login-redirect"));
    }

    #[tokio::test]
    async fn login_redirect_stores_tokens_and_caches_fields() {
        let app = build_router(test_state(FakeClimate {
            fields: sample_fields(),
            ..FakeClimate::default()
        }));

        let response = app
            .clone()
            .oneshot(
                Request::get("/login-redirect?code=one-time-code")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let cookie = session_cookie(&response);

        let home = app
            .oneshot(
                Request::get("/home")
                    .header("cookie", &cookie)
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        let page = body_text(home).await;
        assert!(page.contains("Ada Lovelace"));
        assert!(page.contains("Field A (a)"));
        assert!(page.contains("Field B (b)"));
    }

    #[tokio::test]
    async fn login_redirect_without_a_code_just_goes_home() {
        let app = build_router(test_state(FakeClimate::default()));
        let response = app
            .oneshot(
                Request::get("/login-redirect")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn logout_clears_the_session() {
        let state = test_state(FakeClimate::default());
        let key = seeded_session(&state, Some(sample_fields()));
        let app = build_router(state.clone());

        let response = app
            .clone()
            .oneshot(get_with_session("/logout-redirect", key))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(state.sessions.snapshot(key), Session::default());
    }

    #[tokio::test]
    async fn field_detail_returns_the_matching_cached_record() {
        let state = test_state(FakeClimate::default());
        let key = seeded_session(&state, Some(sample_fields()));
        let app = build_router(state);

        let response = app
            .oneshot(get_with_session("/field/b", key))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let page = body_text(response).await;
        assert!(page.contains("Field Name: Field B"));
        assert!(page.contains("bnd-b"));
    }

    #[tokio::test]
    async fn unknown_field_id_is_a_structured_not_found() {
        let state = test_state(FakeClimate::default());
        let key = seeded_session(&state, Some(sample_fields()));
        let app = build_router(state);

        let response = app
            .oneshot(get_with_session("/field/nope", key))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn protected_routes_redirect_home_without_a_login() {
        let app = build_router(test_state(FakeClimate::default()));
        let response = app
            .oneshot(
                Request::get("/layers/asPlanted")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(header::LOCATION).and_then(|v| v.to_str().ok()),
            Some("/home")
        );
    }

    #[tokio::test]
    async fn activity_listing_links_more_records_only_with_a_token() {
        let with_token = test_state(FakeClimate {
            next_token: Some("tok-9".into()),
            ..FakeClimate::default()
        });
        let key = seeded_session(&with_token, None);
        let page = body_text(
            build_router(with_token)
                .oneshot(get_with_session("/layers/asPlanted", key))
                .await
                .expect("response"),
        )
        .await;
        assert!(page.contains("/layers/asPlanted?next_token=tok-9"));

        let without_token = test_state(FakeClimate::default());
        let key = seeded_session(&without_token, None);
        let page = body_text(
            build_router(without_token)
                .oneshot(get_with_session("/layers/asHarvested", key))
                .await
                .expect("response"),
        )
        .await;
        assert!(!page.contains("More records"));
    }

    #[tokio::test]
    async fn upload_form_posts_through_to_the_platform() {
        let state = test_state(FakeClimate::default());
        let key = seeded_session(&state, None);
        let app = build_router(state);

        let boundary = "XDEMOBOUNDARY";
        let form = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"file_content_type\"\r\n\r\n\
             text/csv\r\n\
             --{boundary}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"data.csv\"\r\n\
             Content-Type: text/csv\r\n\r\n\
             a,b,c\r\n\
             --{boundary}--\r\n"
        );
        let request = Request::post("/upload")
            .header("cookie", format!("sid={}", key.0))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(form))
            .expect("request");

        let response = app.oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let page = body_text(response).await;
        assert!(page.contains("File uploaded: upload-1"));
        assert!(page.contains("/upload/upload-1"));
    }

    #[tokio::test]
    async fn upload_status_is_fetched_on_demand() {
        let state = test_state(FakeClimate::default());
        let key = seeded_session(&state, None);
        let app = build_router(state);

        let response = app
            .oneshot(get_with_session("/upload/upload-1", key))
            .await
            .expect("response");
        let page = body_text(response).await;
        assert!(page.contains("Upload ID: upload-1"));
        assert!(page.contains("Status: SUCCESS"));
    }

    #[tokio::test]
    async fn attachment_contents_stream_back_with_the_given_content_type() {
        let state = test_state(FakeClimate::default());
        let key = seeded_session(&state, None);
        let app = build_router(state);

        let response = app
            .oneshot(get_with_session(
                "/scouting-observation/obs-1/attachments/att-1?contentType=image/jpeg&length=4",
                key,
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()),
            Some("image/jpeg")
        );
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        assert_eq!(bytes.as_ref(), b"JPEG");
    }

    #[tokio::test]
    async fn unknown_activity_layer_is_not_found() {
        let state = test_state(FakeClimate::default());
        let key = seeded_session(&state, None);
        let app = build_router(state);

        let response = app
            .oneshot(get_with_session("/layers/asSprayed/act-1/contents?length=4", key))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn activity_contents_download_as_a_zip_attachment() {
        let state = test_state(FakeClimate::default());
        let key = seeded_session(&state, None);
        let app = build_router(state);

        let response = app
            .oneshot(get_with_session("/layers/asApplied/act-1/contents?length=2", key))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_DISPOSITION).and_then(|v| v.to_str().ok()),
            Some("attachment; filename=\"data.zip\"")
        );
    }
}
