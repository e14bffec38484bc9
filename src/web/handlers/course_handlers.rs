// src/web/handlers/course_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{Category, Course, Instructor};
use crate::state::AppState;

#[derive(Deserialize, Debug)]
pub struct ListCoursesQuery {
  pub category: Option<String>,
  pub level: Option<String>,
  pub search: Option<String>,
}

#[instrument(name = "handler::list_courses", skip(app_state, query))]
pub async fn list_courses_handler(
  app_state: web::Data<AppState>,
  query: web::Query<ListCoursesQuery>,
) -> Result<HttpResponse, AppError> {
  let courses: Vec<Course> = sqlx::query_as(
    "SELECT * FROM courses \
     WHERE is_published = TRUE \
       AND ($1::text IS NULL OR category = $1) \
       AND ($2::text IS NULL OR level = $2) \
       AND ($3::text IS NULL OR title ILIKE '%' || $3 || '%' OR description ILIKE '%' || $3 || '%') \
     ORDER BY created_at DESC",
  )
  .bind(query.category.as_deref())
  .bind(query.level.as_deref())
  .bind(query.search.as_deref())
  .fetch_all(&app_state.db_pool)
  .await?;

  info!("Fetched {} published courses.", courses.len());
  Ok(HttpResponse::Ok().json(json!({ "courses": courses })))
}

#[instrument(name = "handler::get_course", skip(app_state, path), fields(course_id = %path.as_ref()))]
pub async fn get_course_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let course_id = path.into_inner();

  let course: Option<Course> = sqlx::query_as("SELECT * FROM courses WHERE id = $1")
    .bind(course_id)
    .fetch_optional(&app_state.db_pool)
    .await?;

  match course {
    Some(course) => Ok(HttpResponse::Ok().json(json!({ "course": course }))),
    None => {
      warn!("Course {} not found.", course_id);
      Err(AppError::NotFound(format!("Course with ID {} not found.", course_id)))
    }
  }
}

#[instrument(name = "handler::list_categories", skip(app_state))]
pub async fn list_categories_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let categories: Vec<Category> = sqlx::query_as("SELECT * FROM categories ORDER BY name ASC")
    .fetch_all(&app_state.db_pool)
    .await?;
  Ok(HttpResponse::Ok().json(json!({ "categories": categories })))
}

#[instrument(name = "handler::list_instructors", skip(app_state))]
pub async fn list_instructors_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let instructors: Vec<Instructor> = sqlx::query_as("SELECT * FROM instructors ORDER BY name ASC")
    .fetch_all(&app_state.db_pool)
    .await?;
  Ok(HttpResponse::Ok().json(json!({ "instructors": instructors })))
}
