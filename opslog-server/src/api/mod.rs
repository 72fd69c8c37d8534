// Copyright 2025 AgentReplay (https://github.com/agentreplay)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

pub mod health;

use axum::{
    extract::{rejection::FormRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Router,
};
use std::sync::Arc;

use crate::dispatcher::{CommandResponse, Dispatcher, SlashCommand};

pub use health::health_check;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
}

impl IntoResponse for CommandResponse {
    fn into_response(self) -> Response {
        match self {
            CommandResponse::Empty => StatusCode::OK.into_response(),
            CommandResponse::Text(text) => (StatusCode::OK, text).into_response(),
        }
    }
}

/// POST /slack/command - Slack slash command webhook
///
/// Always answers 200; rejections and failures come back as body text so
/// Slack shows them to the invoking user. A body that cannot be decoded is
/// treated as an empty command, which fails the token check.
pub async fn slash_command(
    State(state): State<AppState>,
    form: Result<Form<SlashCommand>, FormRejection>,
) -> CommandResponse {
    let req = match form {
        Ok(Form(req)) => req,
        Err(rejection) => {
            tracing::warn!("Undecodable slash command body: {}", rejection);
            SlashCommand::default()
        }
    };
    state.dispatcher.dispatch(&req).await
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/slack/command", post(slash_command))
        .with_state(state)
}
