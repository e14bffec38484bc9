// src/services/notifications.rs

//! Transactional email: purchase confirmation and the delayed welcome note.
//! Sends are best-effort: failures are logged and never propagate into the
//! surrounding order operation, and dispatch never blocks the HTTP response.

use crate::config::AppConfig;
use crate::errors::{AppError, Result};
use crate::models::Order;
use crate::services::orders::PurchasedItemView;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone)]
pub struct OutboundEmail {
  pub to: String,
  pub from: String,
  pub from_name: String,
  pub subject: String,
  pub html_body: String,
  pub text_body: String,
}

#[derive(Debug)]
pub struct SentEmailInfo {
  pub message_id: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
  async fn send(&self, email: OutboundEmail) -> Result<SentEmailInfo>;
}

/// Development mailer: logs the send and fabricates a message id.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
  async fn send(&self, email: OutboundEmail) -> Result<SentEmailInfo> {
    info!(to = %email.to, from = %email.from, from_name = %email.from_name, subject = %email.subject, "Sending email");
    tokio::time::sleep(std::time::Duration::from_millis(20)).await; // Simulate network latency

    if email.subject.to_lowercase().contains("fail_test") {
      warn!(subject = %email.subject, "Simulated email failure");
      return Err(AppError::Email("Simulated email send failure".to_string()));
    }

    let message_id = format!("mail_{}", uuid::Uuid::new_v4().simple());
    info!(%message_id, "Email sent");
    Ok(SentEmailInfo { message_id })
  }
}

fn format_amount(amount: i64) -> String {
  format!("₹{}", amount)
}

/// Purchase confirmation bodies, HTML plus a plaintext fallback.
pub fn build_purchase_confirmation(order: &Order, items: &[PurchasedItemView], frontend_url: &str) -> (String, String, String) {
  let subject = format!("Purchase Confirmation - Order {}", order.order_number);

  let course_blocks: String = items
    .iter()
    .map(|item| {
      format!(
        "<div style=\"border:1px solid #e0e0e0;border-radius:8px;padding:15px;margin:10px 0;\">\
           <h3 style=\"margin:0 0 10px 0;\">{}</h3>\
           <p style=\"margin:5px 0;color:#666;\">{}</p>\
           <p style=\"margin:5px 0;font-weight:bold;\">Price: {} &times; {}</p>\
         </div>",
        item.title,
        item.description.chars().take(100).collect::<String>(),
        format_amount(item.price),
        item.quantity
      )
    })
    .collect();

  let html_body = format!(
    "<html><body style=\"font-family:Arial,sans-serif;max-width:600px;margin:0 auto;padding:20px;\">\
       <h1>Thank You for Your Purchase!</h1>\
       <h2>Hi {first_name}!</h2>\
       <p>Your purchase has been processed successfully. You now have access to your new course(s).</p>\
       <p><strong>Order Number:</strong> {order_number}</p>\
       <h3>Your Courses</h3>{courses}\
       <h4>Payment Summary</h4>\
       <p>Subtotal: {subtotal}<br>Shipping: {shipping}<br>Tax (GST): {tax}<br>\
          <strong>Total Paid: {total}</strong></p>\
       <p><a href=\"{frontend}/my-courses\">Access My Courses</a></p>\
     </body></html>",
    first_name = order.customer_first_name,
    order_number = order.order_number,
    courses = course_blocks,
    subtotal = format_amount(order.subtotal),
    shipping = format_amount(order.shipping),
    tax = format_amount(order.tax),
    total = format_amount(order.total),
    frontend = frontend_url,
  );

  let course_lines: String = items
    .iter()
    .map(|item| format!("- {} ({} x {})\n", item.title, format_amount(item.price), item.quantity))
    .collect();
  let text_body = format!(
    "Thank You for Your Purchase!\n\n\
     Hi {}!\n\n\
     Your purchase has been processed successfully.\n\n\
     Order Number: {}\n\n\
     Your Courses:\n{}\n\
     Subtotal: {}\nShipping: {}\nTax (GST): {}\nTotal Paid: {}\n\n\
     Access your courses: {}/my-courses\n",
    order.customer_first_name,
    order.order_number,
    course_lines,
    format_amount(order.subtotal),
    format_amount(order.shipping),
    format_amount(order.tax),
    format_amount(order.total),
    frontend_url,
  );

  (subject, html_body, text_body)
}

pub fn build_welcome(order: &Order, frontend_url: &str) -> (String, String, String) {
  let subject = "Welcome to Your Learning Journey!".to_string();
  let html_body = format!(
    "<div style=\"font-family:Arial,sans-serif;max-width:600px;margin:0 auto;padding:20px;\">\
       <h1>Welcome {first_name}!</h1>\
       <p>Your courses are ready and waiting for you. Start your learning journey today!</p>\
       <p><a href=\"{frontend}/my-courses\">Start Learning Now</a></p>\
     </div>",
    first_name = order.customer_first_name,
    frontend = frontend_url,
  );
  let text_body = format!(
    "Welcome {}!\n\nYour courses are ready and waiting for you: {}/my-courses\n",
    order.customer_first_name, frontend_url,
  );
  (subject, html_body, text_body)
}

/// Best-effort send of the purchase confirmation. Errors are logged, never
/// returned.
#[instrument(name = "notifications::purchase_confirmation", skip_all, fields(order_number = %order.order_number))]
pub async fn send_purchase_confirmation(
  mailer: &dyn Mailer,
  config: &AppConfig,
  order: &Order,
  items: &[PurchasedItemView],
) {
  let (subject, html_body, text_body) = build_purchase_confirmation(order, items, &config.frontend_url);
  let email = OutboundEmail {
    to: order.customer_email.clone(),
    from: config.email_sender.clone(),
    from_name: config.email_sender_name.clone(),
    subject,
    html_body,
    text_body,
  };
  match mailer.send(email).await {
    Ok(sent) => info!(message_id = %sent.message_id, "Purchase confirmation email sent"),
    Err(e) => warn!(error = %e, "Failed to send purchase confirmation email"),
  }
}

#[instrument(name = "notifications::welcome", skip_all, fields(order_number = %order.order_number))]
pub async fn send_welcome(mailer: &dyn Mailer, config: &AppConfig, order: &Order) {
  let (subject, html_body, text_body) = build_welcome(order, &config.frontend_url);
  let email = OutboundEmail {
    to: order.customer_email.clone(),
    from: config.email_sender.clone(),
    from_name: config.email_sender_name.clone(),
    subject,
    html_body,
    text_body,
  };
  match mailer.send(email).await {
    Ok(sent) => info!(message_id = %sent.message_id, "Welcome email sent"),
    Err(e) => warn!(error = %e, "Failed to send welcome email"),
  }
}

/// Fire-and-forget dispatch for the completion transition: the
/// confirmation goes out immediately, the welcome note after a fixed delay.
/// Both run on their own tasks with their own failure handling.
pub fn dispatch_purchase_emails(state: &crate::state::AppState, order: Order, items: Vec<PurchasedItemView>) {
  let mailer: Arc<dyn Mailer> = state.mailer.clone();
  let config = state.config.clone();

  {
    let mailer = mailer.clone();
    let config = config.clone();
    let order = order.clone();
    tokio::spawn(async move {
      send_purchase_confirmation(mailer.as_ref(), &config, &order, &items).await;
    });
  }

  tokio::spawn(async move {
    tokio::time::sleep(std::time::Duration::from_secs(config.welcome_email_delay_secs)).await;
    send_welcome(mailer.as_ref(), &config, &order).await;
  });
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::{OrderStatus, PaymentMethod, PaymentStatus};
  use chrono::Utc;
  use parking_lot::Mutex;
  use uuid::Uuid;

  pub(crate) struct RecordingMailer {
    pub sent: Mutex<Vec<OutboundEmail>>,
  }

  #[async_trait]
  impl Mailer for RecordingMailer {
    async fn send(&self, email: OutboundEmail) -> Result<SentEmailInfo> {
      self.sent.lock().push(email);
      Ok(SentEmailInfo {
        message_id: "mail_test".to_string(),
      })
    }
  }

  struct FailingMailer;

  #[async_trait]
  impl Mailer for FailingMailer {
    async fn send(&self, _email: OutboundEmail) -> Result<SentEmailInfo> {
      Err(AppError::Email("mailbox on fire".to_string()))
    }
  }

  fn config() -> AppConfig {
    AppConfig {
      server_host: "127.0.0.1".to_string(),
      server_port: 8080,
      database_url: String::new(),
      app_base_url: "http://127.0.0.1:8080".to_string(),
      frontend_url: "http://localhost:3000".to_string(),
      currency: "inr".to_string(),
      email_sender: "noreply@learncart.example".to_string(),
      email_sender_name: "LearnCart".to_string(),
      session_ttl_hours: 72,
      checkout_session_ttl_minutes: 30,
      welcome_email_delay_secs: 0,
      pricing: Default::default(),
    }
  }

  fn order() -> Order {
    Order {
      id: Uuid::new_v4(),
      order_number: "ORD-1700000000000-0001".to_string(),
      user_id: Uuid::new_v4(),
      customer_email: "buyer@example.com".to_string(),
      customer_first_name: "Asha".to_string(),
      customer_last_name: "Verma".to_string(),
      customer_phone: "9999999999".to_string(),
      customer_address: "1 Main St".to_string(),
      customer_city: "Pune".to_string(),
      customer_state: "MH".to_string(),
      customer_pincode: "411001".to_string(),
      payment_method: PaymentMethod::Card,
      payment_status: PaymentStatus::Completed,
      checkout_session_id: None,
      payment_intent_id: None,
      transaction_id: None,
      paid_at: Some(Utc::now()),
      failure_reason: None,
      subtotal: 1000,
      shipping: 500,
      tax: 180,
      total: 1680,
      status: OrderStatus::Confirmed,
      created_at: Utc::now(),
      updated_at: Utc::now(),
      completed_at: Some(Utc::now()),
      cancelled_at: None,
      notes: None,
    }
  }

  fn items() -> Vec<PurchasedItemView> {
    vec![PurchasedItemView {
      course_id: Uuid::new_v4(),
      title: "Rust Basics".to_string(),
      description: "Learn Rust from scratch".to_string(),
      thumbnail_url: String::new(),
      price: 1000,
      quantity: 1,
    }]
  }

  #[test]
  fn confirmation_bodies_carry_order_details() {
    let (subject, html, text) = build_purchase_confirmation(&order(), &items(), "http://localhost:3000");
    assert!(subject.contains("ORD-1700000000000-0001"));
    assert!(html.contains("Rust Basics"));
    assert!(html.contains("₹1680"));
    assert!(text.contains("Rust Basics"));
    assert!(text.contains("Total Paid: ₹1680"));
  }

  #[tokio::test]
  async fn confirmation_send_records_one_email() {
    let mailer = RecordingMailer { sent: Mutex::new(Vec::new()) };
    let cfg = config();
    send_purchase_confirmation(&mailer, &cfg, &order(), &items()).await;
    let sent = mailer.sent.lock();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "buyer@example.com");
  }

  #[tokio::test]
  async fn mailer_failure_is_swallowed() {
    let cfg = config();
    // Must not panic or surface the error.
    send_purchase_confirmation(&FailingMailer, &cfg, &order(), &items()).await;
    send_welcome(&FailingMailer, &cfg, &order()).await;
  }

  #[tokio::test]
  async fn log_mailer_reports_a_message_id() {
    let (subject, html, text) = build_welcome(&order(), "http://localhost:3000");
    let sent = LogMailer
      .send(OutboundEmail {
        to: "buyer@example.com".to_string(),
        from: "noreply@learncart.example".to_string(),
        from_name: "LearnCart".to_string(),
        subject,
        html_body: html,
        text_body: text,
      })
      .await
      .unwrap();
    assert!(sent.message_id.starts_with("mail_"));
  }
}
