//! # Sales Report
//!
//! Summary of orders and users for admins: key figures, a per-status
//! breakdown and the most recent orders with recipient details. Rendered as
//! a plain-text document that the bot sends as a file and the web console
//! serves as `text/plain`.

use std::fmt::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{format_price, Order, User};
use crate::order_lifecycle::OrderStatus;

/// How many orders the detailed section lists
pub const RECENT_ORDER_LIMIT: usize = 15;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSummary {
    pub status: OrderStatus,
    pub count: usize,
    /// Revenue counted from completed orders only
    pub revenue: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesReport {
    pub generated_at: DateTime<Utc>,
    pub total_orders: usize,
    pub total_users: usize,
    pub completed_orders: usize,
    pub pending_orders: usize,
    pub total_revenue: i64,
    pub average_order_value: i64,
    /// Share of completed orders, in percent
    pub success_rate: f64,
    pub by_status: Vec<StatusSummary>,
    pub recent_orders: Vec<Order>,
}

impl SalesReport {
    pub fn build(orders: &[Order], users: &[User]) -> Self {
        let completed: Vec<&Order> = orders
            .iter()
            .filter(|order| order.status == OrderStatus::Completed)
            .collect();
        let total_revenue: i64 = completed.iter().map(|order| order.price).sum();
        let average_order_value = if completed.is_empty() {
            0
        } else {
            total_revenue / completed.len() as i64
        };
        let success_rate = if orders.is_empty() {
            0.0
        } else {
            completed.len() as f64 * 100.0 / orders.len() as f64
        };

        let by_status = OrderStatus::ALL
            .iter()
            .filter_map(|&status| {
                let matching: Vec<&Order> = orders.iter().filter(|o| o.status == status).collect();
                if matching.is_empty() {
                    return None;
                }
                let revenue = if status == OrderStatus::Completed {
                    matching.iter().map(|o| o.price).sum()
                } else {
                    0
                };
                Some(StatusSummary {
                    status,
                    count: matching.len(),
                    revenue,
                })
            })
            .collect();

        let mut recent_orders = orders.to_vec();
        recent_orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        recent_orders.truncate(RECENT_ORDER_LIMIT);

        Self {
            generated_at: Utc::now(),
            total_orders: orders.len(),
            total_users: users.len(),
            completed_orders: completed.len(),
            pending_orders: orders.iter().filter(|o| o.status.is_pending()).count(),
            total_revenue,
            average_order_value,
            success_rate,
            by_status,
            recent_orders,
        }
    }

    /// File name for the rendered document
    pub fn file_name(&self) -> String {
        format!("sales_report_{}.txt", self.generated_at.format("%Y%m%d_%H%M"))
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        // Writing to a String cannot fail
        let _ = self.write_text(&mut out);
        out
    }

    fn write_text(&self, out: &mut String) -> std::fmt::Result {
        writeln!(out, "TIE SHOP SALES REPORT")?;
        writeln!(out, "Generated: {}", self.generated_at.format("%d.%m.%Y %H:%M UTC"))?;
        writeln!(out)?;

        writeln!(out, "KEY FIGURES")?;
        writeln!(out, "  Total orders:         {}", self.total_orders)?;
        writeln!(out, "  Total users:          {}", self.total_users)?;
        writeln!(out, "  Completed orders:     {}", self.completed_orders)?;
        writeln!(out, "  Pending orders:       {}", self.pending_orders)?;
        writeln!(out, "  Total revenue:        {} тг", format_price(self.total_revenue))?;
        writeln!(out, "  Average order value:  {} тг", format_price(self.average_order_value))?;
        writeln!(out, "  Success rate:         {:.1}%", self.success_rate)?;
        writeln!(out)?;

        writeln!(out, "ORDERS BY STATUS")?;
        if self.by_status.is_empty() {
            writeln!(out, "  No orders yet")?;
        }
        for summary in &self.by_status {
            writeln!(
                out,
                "  {:<22} {:>5}   {} тг",
                summary.status.as_str(),
                summary.count,
                format_price(summary.revenue)
            )?;
        }
        writeln!(out)?;

        writeln!(out, "RECENT ORDERS")?;
        for order in &self.recent_orders {
            writeln!(out, "  Order #{} ({})", order.id, order.status)?;
            writeln!(out, "    Date:     {}", order.created_at.format("%d.%m.%Y %H:%M"))?;
            writeln!(out, "    Buyer:    {}", order.buyer_id)?;
            writeln!(out, "    Name:     {}", order.recipient_full_name())?;
            writeln!(out, "    Phone:    {}", order.recipient_phone)?;
            writeln!(out, "    Address:  {}", order.delivery_address)?;
            writeln!(out, "    Product:  {}", order.tie_name)?;
            writeln!(out, "    Price:    {} тг", format_price(order.price))?;
            if let Some(days) = order.delivery_days {
                writeln!(out, "    Delivery: {days} days")?;
            }
        }
        Ok(())
    }
}
