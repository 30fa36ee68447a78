//! Stateless todo server used to exercise the REST client.
//!
//! Every request is answered from a fixed list of three todos and nothing is
//! ever stored, so the same request always gets the same response. Writes
//! answer with what the todo *would* look like after the change.

use axum::{
    extract::{FromRequest, Path, Request},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Form, Json, Router,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;
use tracing::debug;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Todo {
    pub id: i64,
    pub title: String,
    pub is_completed: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateTodo {
    pub title: String,
    #[serde(default)]
    pub is_completed: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateTodo {
    pub title: Option<String>,
    pub is_completed: Option<bool>,
}

/// Id given to every created todo.
pub const CREATED_ID: i64 = 3;

/// The todos every listing returns.
pub fn todos() -> Vec<Todo> {
    (0..3)
        .map(|id| Todo {
            id,
            title: format!("Todo {id}"),
            is_completed: id == 2,
        })
        .collect()
}

pub fn app() -> Router {
    Router::new()
        .route("/todos", get(list_todos).post(create_todo))
        .route(
            "/todos/{id}",
            get(get_todo).patch(update_todo).delete(delete_todo),
        )
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

type ApiError = (StatusCode, Json<serde_json::Value>);

fn error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({ "error": message.into() })))
}

/// Request body decoded as JSON or form data according to `Content-Type`.
pub struct Payload<T>(pub T);

impl<S, T> FromRequest<S> for Payload<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("application/json"));

        if is_json {
            match Json::<T>::from_request(req, state).await {
                Ok(Json(value)) => Ok(Payload(value)),
                Err(rejection) => {
                    Err(error(StatusCode::UNPROCESSABLE_ENTITY, rejection.body_text()).into_response())
                }
            }
        } else {
            match Form::<T>::from_request(req, state).await {
                Ok(Form(value)) => Ok(Payload(value)),
                Err(rejection) => {
                    Err(error(StatusCode::UNPROCESSABLE_ENTITY, rejection.body_text()).into_response())
                }
            }
        }
    }
}

/// Resolve the `{id}` path segment to its todo in the fixture.
fn find(raw: &str) -> Result<Todo, ApiError> {
    let id: i64 = raw.parse().map_err(|_| {
        error(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("Could not convert id parameter \"{raw}\" to int"),
        )
    })?;
    todos()
        .into_iter()
        .find(|todo| todo.id == id)
        .ok_or_else(|| {
            error(
                StatusCode::NOT_FOUND,
                format!("Could not find todo with id = {id}"),
            )
        })
}

async fn list_todos() -> Json<Vec<Todo>> {
    Json(todos())
}

async fn create_todo(Payload(input): Payload<CreateTodo>) -> Json<Todo> {
    debug!(title = %input.title, "create");
    Json(Todo {
        id: CREATED_ID,
        title: input.title,
        is_completed: input.is_completed,
    })
}

async fn get_todo(Path(id): Path<String>) -> Result<Json<Todo>, ApiError> {
    find(&id).map(Json)
}

async fn update_todo(
    Path(id): Path<String>,
    Payload(input): Payload<UpdateTodo>,
) -> Result<Json<Todo>, ApiError> {
    let mut todo = find(&id)?;
    if let Some(title) = input.title {
        todo.title = title;
    }
    if let Some(is_completed) = input.is_completed {
        todo.is_completed = is_completed;
    }
    Ok(Json(todo))
}

async fn delete_todo(Path(id): Path<String>) -> Result<Json<serde_json::Value>, ApiError> {
    find(&id)?;
    Ok(Json(json!({})))
}
