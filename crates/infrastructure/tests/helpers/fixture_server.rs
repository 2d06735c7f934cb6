use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::net::TcpListener;

#[derive(Default)]
struct FixtureState {
    lists: RwLock<HashMap<String, String>>,
    failing: AtomicBool,
    delay_ms: AtomicUsize,
    hits: AtomicUsize,
}

/// Serves rule lists at `/lists/{name}` from a local axum server.
#[derive(Clone)]
pub struct FixtureServer {
    state: Arc<FixtureState>,
    base_url: String,
}

impl FixtureServer {
    pub async fn start() -> Self {
        let state = Arc::new(FixtureState::default());
        let app = Router::new()
            .route("/lists/{name}", get(serve_list))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            state,
            base_url: format!("http://{}", addr),
        }
    }

    pub fn url(&self, name: &str) -> String {
        format!("{}/lists/{}", self.base_url, name)
    }

    pub fn set_list(&self, name: &str, body: &str) {
        self.state
            .lists
            .write()
            .unwrap()
            .insert(name.to_string(), body.to_string());
    }

    /// Every request answers 500 while set.
    pub fn set_failing(&self, failing: bool) {
        self.state.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        self.state
            .delay_ms
            .store(delay.as_millis() as usize, Ordering::SeqCst);
    }

    pub fn hits(&self) -> usize {
        self.state.hits.load(Ordering::SeqCst)
    }
}

async fn serve_list(
    State(state): State<Arc<FixtureState>>,
    Path(name): Path<String>,
) -> Result<String, StatusCode> {
    state.hits.fetch_add(1, Ordering::SeqCst);

    let delay = state.delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay as u64)).await;
    }

    if state.failing.load(Ordering::SeqCst) {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }

    state
        .lists
        .read()
        .unwrap()
        .get(&name)
        .cloned()
        .ok_or(StatusCode::NOT_FOUND)
}
