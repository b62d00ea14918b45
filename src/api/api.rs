use actix_web::{delete, get, patch, post, web, HttpResponse};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::models::item::{ItemPatch, ItemPayload};
use crate::models::todo::{CreateTodoRequest, TodoPatch, TodoStatus};
use crate::services::AppState;

#[derive(Deserialize, Debug, Default)]
pub struct TodoQuery {
    pub status: Option<TodoStatus>,
}

#[post("/todos")]
pub async fn create_todo(state: web::Data<AppState>, request: web::Json<CreateTodoRequest>) -> AppResult<HttpResponse> {
    let todo = web::block(move || state.creation.create_with_items(request.into_inner())).await??;
    Ok(HttpResponse::Ok().json(todo))
}

#[get("/todos/{id}")]
pub async fn get_todo_by_id(state: web::Data<AppState>, id: web::Path<i32>) -> AppResult<HttpResponse> {
    let id = id.into_inner();
    let todo = web::block(move || state.todos.get(id)).await??;
    Ok(HttpResponse::Ok().json(todo))
}

#[get("/todos")]
pub async fn get_todos(state: web::Data<AppState>, query: web::Query<TodoQuery>) -> AppResult<HttpResponse> {
    let status = query.into_inner().status;
    let todos = web::block(move || state.todos.list(status)).await??;
    Ok(HttpResponse::Ok().json(todos))
}

#[patch("/todos/{id}")]
pub async fn update_todo_by_id(
    state: web::Data<AppState>,
    id: web::Path<i32>,
    patch: web::Json<TodoPatch>,
) -> AppResult<HttpResponse> {
    let id = id.into_inner();
    let todo = web::block(move || state.todos.update(id, patch.into_inner())).await??;
    Ok(HttpResponse::Ok().json(todo))
}

#[delete("/todos/{id}")]
pub async fn delete_todo_by_id(state: web::Data<AppState>, id: web::Path<i32>) -> AppResult<HttpResponse> {
    let id = id.into_inner();
    web::block(move || state.todos.soft_delete(id)).await??;
    Ok(HttpResponse::NoContent().finish())
}

#[post("/items")]
pub async fn create_item(state: web::Data<AppState>, payload: web::Json<ItemPayload>) -> AppResult<HttpResponse> {
    let item = web::block(move || state.items.create(payload.into_inner())).await??;
    Ok(HttpResponse::Ok().json(item))
}

#[get("/items/{id}")]
pub async fn get_item_by_id(state: web::Data<AppState>, id: web::Path<i32>) -> AppResult<HttpResponse> {
    let id = id.into_inner();
    let item = web::block(move || state.items.get(id)).await??;
    Ok(HttpResponse::Ok().json(item))
}

#[patch("/items/{id}")]
pub async fn update_item_by_id(
    state: web::Data<AppState>,
    id: web::Path<i32>,
    patch: web::Json<ItemPatch>,
) -> AppResult<HttpResponse> {
    let id = id.into_inner();
    web::block(move || state.items.update(id, patch.into_inner())).await??;
    Ok(HttpResponse::NoContent().finish())
}

#[delete("/items/{id}")]
pub async fn delete_item_by_id(state: web::Data<AppState>, id: web::Path<i32>) -> AppResult<HttpResponse> {
    let id = id.into_inner();
    web::block(move || state.items.delete(id)).await??;
    Ok(HttpResponse::NoContent().finish())
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| AppError::bad_request(err.to_string()).into())
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| AppError::bad_request(err.to_string()).into())
}

// An id that does not parse cannot name a stored entity.
fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|err, _req| AppError::not_found(err.to_string()).into())
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(query_config())
        .app_data(path_config())
        .service(create_todo)
        .service(get_todo_by_id)
        .service(get_todos)
        .service(update_todo_by_id)
        .service(delete_todo_by_id)
        .service(create_item)
        .service(get_item_by_id)
        .service(update_item_by_id)
        .service(delete_item_by_id);
}
