//! Output formatting utilities

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, Color, ContentArrangement, Table};

use storefront_core::domain::NotificationLevel;
use storefront_core::ports::Notifier;
use storefront_core::{Notification, Product, Session, SessionPhase};

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Print the product list as a table
pub fn print_products(products: &[Product]) {
    if products.is_empty() {
        warning("No products found");
        return;
    }

    let mut table = create_table();
    table.set_header(vec!["ID", "Name", "Category", "Price", "Featured"]);
    for product in products {
        let featured = if product.is_featured {
            Cell::new("yes").fg(Color::Green)
        } else {
            Cell::new("")
        };
        table.add_row(vec![
            Cell::new(&product.id),
            Cell::new(&product.name),
            Cell::new(&product.category),
            Cell::new(format!("${:.2}", product.price)),
            featured,
        ]);
    }
    println!("{}", table);
    println!("{} product(s)", products.len());
}

/// Print who is logged in and where the signup flow stands
pub fn print_session(session: &Session) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    let phase = match session.phase() {
        SessionPhase::Anonymous => "anonymous",
        SessionPhase::PendingVerification => "pending verification",
        SessionPhase::Authenticated => "authenticated",
    };
    table.add_row(vec!["Status", phase]);

    if let Some(user) = &session.user {
        table.add_row(vec!["Name", user.name.as_str()]);
        table.add_row(vec!["Email", user.email.as_str()]);
        table.add_row(vec!["Role", if user.is_admin() { "admin" } else { "customer" }]);
    }
    if let Some(email) = &session.pending_email {
        table.add_row(vec!["Pending email", email.as_str()]);
    }

    println!("{}", table);
}

/// Shows store notifications as colored console lines
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Success => success(&notification.message),
            NotificationLevel::Error => error(&notification.message),
        }
    }
}
