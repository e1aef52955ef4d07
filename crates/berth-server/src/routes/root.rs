//! `GET /`: node identity and build information.

use axum::extract::State;
use axum::http::header::{ACCEPT, CONTENT_TYPE};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use berth_core::Did;
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::{REPOSITORY, VERSION};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub id: String,
    pub build: BuildInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildInfo {
    pub version: String,
    pub repo: String,
}

impl ServerInfo {
    pub fn new(id: &Did) -> Self {
        Self {
            id: id.to_string(),
            build: BuildInfo {
                version: VERSION.to_string(),
                repo: REPOSITORY.to_string(),
            },
        }
    }

    /// Plain text rendering
    pub fn banner(&self) -> String {
        format!(
            "berth {}\nid   {}\nrepo {}\n",
            self.build.version, self.id, self.build.repo
        )
    }
}

pub async fn info(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let info = ServerInfo::new(state.service.signer().did());

    let wants_json = headers
        .get(ACCEPT)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.contains("application/json"));

    if wants_json {
        Json(info).into_response()
    } else {
        ([(CONTENT_TYPE, "text/plain; charset=utf-8")], info.banner()).into_response()
    }
}
