//! # Checkout Orchestrator
//!
//! Converts a user's cart into a Pending order plus a payment-session
//! request. The order is recorded before the provider is ever contacted,
//! so a provider outage still leaves an auditable Pending order; the
//! caller makes the actual provider call and redirects the buyer.

use crate::cart::CartLedger;
use crate::error::{StoreError, StoreResult};
use crate::order::{Order, OrderBook};
use crate::product::Currency;
use crate::provider::{CheckoutUrls, PaymentSessionRequest, SessionLineItem};
use uuid::Uuid;

/// Validate addresses and the cart, record a Pending order, and build the
/// payment-session request for it.
///
/// Preconditions: the user's cart has at least one item and both addresses
/// are non-empty. An empty cart never creates an order (and the caller
/// therefore never contacts the provider).
pub fn submit(
    ledger: &CartLedger,
    orders: &mut OrderBook,
    user_id: Uuid,
    shipping_address: &str,
    billing_address: &str,
    currency: Currency,
    urls: &CheckoutUrls,
) -> StoreResult<(Order, PaymentSessionRequest)> {
    let shipping = shipping_address.trim();
    let billing = billing_address.trim();
    if shipping.is_empty() {
        return Err(StoreError::Validation("shipping address is required".into()));
    }
    if billing.is_empty() {
        return Err(StoreError::Validation("billing address is required".into()));
    }

    let lines = ledger.lines(user_id);
    if lines.is_empty() {
        return Err(StoreError::EmptyCart);
    }

    let order = orders.create(user_id, shipping, billing);

    let line_items = lines
        .iter()
        .map(|line| SessionLineItem {
            name: line.item.name.clone(),
            unit_amount: line.item.unit_price.amount,
            quantity: line.item.quantity,
            currency,
        })
        .collect();

    let request = PaymentSessionRequest {
        order_id: order.id,
        line_items,
        success_url: urls.success_url_with_session(),
        cancel_url: urls.cancel_url(),
    };

    Ok((order, request))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::OrderStatus;
    use crate::product::{Price, Product};

    fn urls() -> CheckoutUrls {
        CheckoutUrls::new("https://shop.example.com")
    }

    #[test]
    fn test_empty_cart_creates_no_order() {
        let ledger = CartLedger::new();
        let mut orders = OrderBook::new();
        let alice = Uuid::new_v4();

        let err = submit(
            &ledger,
            &mut orders,
            alice,
            "1 Main St",
            "1 Main St",
            Currency::USD,
            &urls(),
        )
        .unwrap_err();

        assert!(matches!(err, StoreError::EmptyCart));
        assert!(orders.orders_for(alice).is_empty());
    }

    #[test]
    fn test_blank_addresses_rejected() {
        let mut ledger = CartLedger::new();
        let mut orders = OrderBook::new();
        let alice = Uuid::new_v4();
        let p = Product::new("Mug", Price::new(9.99, Currency::USD));
        ledger.add_item(alice, &p, 1).unwrap();

        for (ship, bill) in [("", "1 Main St"), ("1 Main St", "  "), ("", "")] {
            let err = submit(
                &ledger,
                &mut orders,
                alice,
                ship,
                bill,
                Currency::USD,
                &urls(),
            )
            .unwrap_err();
            assert!(matches!(err, StoreError::Validation(_)));
        }
        assert!(orders.orders_for(alice).is_empty());
    }

    #[test]
    fn test_builds_minor_unit_line_items() {
        // 9.99 x 2 plus 5.00 x 1 must become [{999, 2}, {500, 1}]
        let mut ledger = CartLedger::new();
        let mut orders = OrderBook::new();
        let alice = Uuid::new_v4();

        ledger
            .add_item(alice, &Product::new("Mug", Price::new(9.99, Currency::USD)), 2)
            .unwrap();
        ledger
            .add_item(alice, &Product::new("Lamp", Price::new(5.00, Currency::USD)), 1)
            .unwrap();

        let (order, request) = submit(
            &ledger,
            &mut orders,
            alice,
            "1 Main St",
            "2 Side St",
            Currency::USD,
            &urls(),
        )
        .unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.shipping_address, "1 Main St");
        assert_eq!(request.order_id, order.id);
        assert_eq!(request.line_items.len(), 2);
        assert_eq!(request.line_items[0].unit_amount, 999);
        assert_eq!(request.line_items[0].quantity, 2);
        assert_eq!(request.line_items[1].unit_amount, 500);
        assert_eq!(request.line_items[1].quantity, 1);

        // order is recorded before any provider contact
        assert_eq!(
            orders.get(order.id).unwrap().status,
            OrderStatus::Pending
        );
    }

    #[test]
    fn test_redirect_urls_are_fixed_absolute() {
        let mut ledger = CartLedger::new();
        let mut orders = OrderBook::new();
        let alice = Uuid::new_v4();
        ledger
            .add_item(alice, &Product::new("Mug", Price::new(9.99, Currency::USD)), 1)
            .unwrap();

        let (_, request) = submit(
            &ledger,
            &mut orders,
            alice,
            "1 Main St",
            "1 Main St",
            Currency::USD,
            &urls(),
        )
        .unwrap();

        assert!(request
            .success_url
            .starts_with("https://shop.example.com/checkout/success"));
        assert_eq!(
            request.cancel_url,
            "https://shop.example.com/checkout/cancel"
        );
    }
}
