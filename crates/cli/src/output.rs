//! Terminal output.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use shopfront_client::cart::{CartLine, CartSummary};
use shopfront_client::chat::ChatEntry;
use shopfront_client::feedback::{Level, Notice};
use shopfront_core::{Category, FileUpload, Order, Product, User, format_amount};

pub fn notice(notice: &Notice) {
    match notice.level {
        Level::Success => println!("{}", notice.message),
        Level::Error => eprintln!("error: {}", notice.message),
    }
}

pub fn error(message: &str) {
    eprintln!("error: {message}");
}

pub fn line(text: &str) {
    println!("{text}");
}

pub fn user(user: &User) {
    println!("{} <{}>", user.display_name(), user.email);
    println!("  username: {}", user.username);
    println!("  verified: {}", if user.is_verified { "yes" } else { "no" });
}

pub fn products(products: &[Product]) {
    if products.is_empty() {
        println!("No products found");
        return;
    }
    for product in products {
        println!(
            "{}  {:<40} {:>10}  stock {}",
            product.id,
            product.name,
            format_amount(product.effective_price()),
            product.available_stock()
        );
    }
}

pub fn product(product: &Product) {
    println!("{} ({})", product.name, product.id);
    println!("  price: {}", format_amount(product.effective_price()));
    if product.discount_price.is_some() {
        println!("  was:   {}", format_amount(product.price));
    }
    println!("  stock: {}", product.available_stock());
    if let Some(description) = &product.description {
        println!();
        println!("{description}");
    }
}

pub fn categories(categories: &[Category]) {
    for category in categories {
        println!("{}  {}", category.id, category.name);
    }
}

pub fn cart(lines: &[CartLine], summary: CartSummary) {
    if lines.is_empty() {
        println!("Your cart is empty");
        return;
    }
    for line in lines {
        println!(
            "{}  {:<40} {:>3} x {:>10} = {:>10}",
            line.product_id,
            line.name,
            line.quantity,
            format_amount(line.unit_price),
            format_amount(line.total())
        );
    }
    println!(
        "{} item(s), total {}",
        summary.total_items,
        format_amount(summary.total_price)
    );
}

pub fn orders(orders: &[Order]) {
    if orders.is_empty() {
        println!("No orders yet");
        return;
    }
    for order in orders {
        println!(
            "{}  {}  {:<10} {:<8} {:>10}",
            order.id,
            order.created_at.format("%Y-%m-%d"),
            order.status,
            order.payment_status,
            format_amount(order.total_amount)
        );
    }
}

pub fn order(order: &Order) {
    println!("Order {}", order.id);
    println!("  placed:  {}", order.created_at.format("%Y-%m-%d %H:%M"));
    println!("  status:  {} / payment {}", order.status, order.payment_status);
    println!("  method:  {}", order.payment_method);
    for item in &order.order_items {
        let name = item
            .product
            .as_ref()
            .map_or("(removed product)", |product| product.name.as_str());
        println!(
            "  {:>3} x {:<40} {:>10}",
            item.quantity,
            name,
            format_amount(item.price)
        );
    }
    println!("  total:   {}", format_amount(order.total_amount));
}

pub fn chat(entries: &[ChatEntry]) {
    for entry in entries {
        let who = if entry.from_ai { "assistant" } else { "you" };
        println!("{who}: {}", entry.text);
    }
}

pub fn uploads(uploads: &[FileUpload]) {
    for upload in uploads {
        println!("{}  {} ({} bytes)", upload.url, upload.filename, upload.size);
    }
}
