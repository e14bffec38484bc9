// src/web/routes.rs

use actix_web::web;

use crate::web::handlers::{
  admin_order_handlers, auth_handlers, cart_handlers, course_handlers, enrollment_handlers, favorite_handlers,
  order_handlers, progress_handlers,
};

async fn health_check_handler() -> actix_web::HttpResponse {
  actix_web::HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

/// Wires the full `/api/v1` surface. Specific routes are registered before
/// their parameterized siblings so `/orders/admin` never matches
/// `/orders/{order_id}`.
pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.service(
    web::scope("/api/v1")
      .route("/health", web::get().to(health_check_handler))
      .service(
        web::scope("/auth")
          .route("/signup", web::post().to(auth_handlers::signup_handler))
          .route("/signin", web::post().to(auth_handlers::signin_handler))
          .route("/signout", web::post().to(auth_handlers::signout_handler))
          .route("/me", web::get().to(auth_handlers::me_handler)),
      )
      .service(
        web::scope("/courses")
          .route("", web::get().to(course_handlers::list_courses_handler))
          .route("/{course_id}", web::get().to(course_handlers::get_course_handler)),
      )
      .route("/categories", web::get().to(course_handlers::list_categories_handler))
      .route("/instructors", web::get().to(course_handlers::list_instructors_handler))
      .service(
        web::scope("/cart")
          .route("", web::get().to(cart_handlers::get_cart_handler))
          .route("", web::post().to(cart_handlers::add_to_cart_handler))
          .route("", web::delete().to(cart_handlers::clear_cart_handler))
          .route("/{course_id}", web::delete().to(cart_handlers::remove_from_cart_handler)),
      )
      .service(
        web::scope("/favorites")
          .route("", web::get().to(favorite_handlers::get_favorites_handler))
          .route("", web::post().to(favorite_handlers::add_to_favorites_handler))
          .route("", web::delete().to(favorite_handlers::clear_favorites_handler))
          .route("/status/{course_id}", web::get().to(favorite_handlers::favorite_status_handler))
          .route("/{course_id}", web::delete().to(favorite_handlers::remove_from_favorites_handler)),
      )
      .service(
        web::scope("/enrollments")
          .route("", web::post().to(enrollment_handlers::enroll_handler))
          .route("/my", web::get().to(enrollment_handlers::my_enrollments_handler)),
      )
      .service(
        web::scope("/progress")
          .route("", web::post().to(progress_handlers::save_progress_handler))
          .route("/{course_id}", web::get().to(progress_handlers::get_progress_handler)),
      )
      .service(
        web::scope("/orders")
          // Admin routes first so they are not swallowed by /{order_id}.
          .service(
            web::scope("/admin")
              .route("", web::get().to(admin_order_handlers::list_orders_handler))
              .route(
                "/{order_id}/status",
                web::put().to(admin_order_handlers::update_order_status_handler),
              )
              .route("/{order_id}", web::get().to(admin_order_handlers::get_order_handler)),
          )
          .route(
            "/checkout-session",
            web::post().to(order_handlers::create_checkout_session_handler),
          )
          .route("/checkout-success", web::get().to(order_handlers::checkout_success_handler))
          .route(
            "/payment-intent",
            web::post().to(order_handlers::create_payment_intent_handler),
          )
          .route("/payment-success", web::post().to(order_handlers::payment_success_handler))
          .route("/cart", web::delete().to(order_handlers::clear_cart_handler))
          .route("/my", web::get().to(order_handlers::my_orders_handler))
          .route("", web::post().to(order_handlers::create_order_handler))
          .route("", web::get().to(order_handlers::my_orders_handler))
          .route("/{order_id}/cancel", web::put().to(order_handlers::cancel_order_handler))
          .route("/{order_id}", web::get().to(order_handlers::get_order_handler)),
      ),
  );
}
