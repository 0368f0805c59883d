//! # Session Reconciler
//!
//! Finalizes local state after a payment session ends. Two paths feed it:
//!
//! - the provider's browser redirects (`on_success` / `on_cancel`), which
//!   only touch the cart — the redirect alone is not proof of payment and
//!   carries no order reference, so the redirect path leaves every order
//!   Pending (see DESIGN.md);
//! - signature-verified webhook notifications, which carry the order id in
//!   session metadata and are the only thing allowed to move an order to a
//!   terminal state.
//!
//! Every entry point tolerates replays: a second success redirect clears
//! nothing and reports "nothing to clear", and a redelivered webhook finds
//! the order already terminal and changes nothing.

use crate::cart::CartLedger;
use crate::error::{StoreError, StoreResult};
use crate::order::OrderBook;
use crate::provider::PaymentEvent;
use uuid::Uuid;

/// Outcome of a success redirect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartOutcome {
    /// The cart held items and they were cleared
    Cleared { items_removed: usize },
    /// No cart, or nothing left in it — a replayed redirect lands here
    NothingToClear,
}

/// Handle the provider's success redirect: clear the user's cart if there
/// is anything to clear. Never fails; an absent cart is a non-fatal
/// notice, so browser back-button replays are safe.
pub fn on_success(ledger: &mut CartLedger, user_id: Uuid) -> CartOutcome {
    match ledger.clear(user_id) {
        0 => CartOutcome::NothingToClear,
        items_removed => CartOutcome::Cleared { items_removed },
    }
}

/// Outcome of a cancel redirect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancelOutcome {
    /// Items still in the cart, available for a resumed checkout
    pub items_retained: usize,
}

/// Handle the provider's cancel redirect. Mutates nothing: the cart and
/// any Pending order stay as they were so the user can resume checkout.
pub fn on_cancel(ledger: &CartLedger, user_id: Uuid) -> CancelOutcome {
    CancelOutcome {
        items_retained: ledger.item_count(user_id),
    }
}

/// Outcome of a provider-attested completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Finalized {
    pub order_id: Uuid,
    /// False when the webhook was a redelivery of an already-Paid order
    pub newly_paid: bool,
    pub items_cleared: usize,
}

/// Finalize an order from a verified `checkout.session.completed` event.
///
/// The order is looked up by the id carried in session metadata — not by
/// whoever's browser hit the success page — then moved Pending -> Paid and
/// its owner's cart cleared. Both steps are idempotent under redelivery.
pub fn on_session_completed(
    ledger: &mut CartLedger,
    orders: &mut OrderBook,
    event: &PaymentEvent,
) -> StoreResult<Finalized> {
    let order_id = event.order_id.ok_or_else(|| {
        StoreError::WebhookParse("completed session carries no order_id metadata".into())
    })?;

    let user_id = orders
        .get(order_id)
        .ok_or(StoreError::OrderNotFound { order_id })?
        .user_id;

    let newly_paid = orders.mark_paid(order_id)?;
    let items_cleared = if newly_paid { ledger.clear(user_id) } else { 0 };

    Ok(Finalized {
        order_id,
        newly_paid,
        items_cleared,
    })
}

/// Cancel the order for an expired, never-paid session. Terminal orders
/// are left untouched. Returns whether a transition happened.
pub fn on_session_expired(orders: &mut OrderBook, event: &PaymentEvent) -> StoreResult<bool> {
    let order_id = event.order_id.ok_or_else(|| {
        StoreError::WebhookParse("expired session carries no order_id metadata".into())
    })?;
    orders.cancel_if_pending(order_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::OrderStatus;
    use crate::product::{Currency, Price, Product};
    use crate::provider::PaymentEventKind;
    use chrono::Utc;

    fn seeded_cart(user_id: Uuid) -> CartLedger {
        let mut ledger = CartLedger::new();
        let p = Product::new("Mug", Price::new(9.99, Currency::USD));
        ledger.add_item(user_id, &p, 2).unwrap();
        ledger
    }

    fn completed_event(order_id: Option<Uuid>) -> PaymentEvent {
        PaymentEvent {
            event_id: "evt_1".into(),
            kind: PaymentEventKind::SessionCompleted,
            session_id: Some("cs_1".into()),
            order_id,
            amount_total: Some(1998),
            payment_status: Some("paid".into()),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_on_success_twice_is_safe() {
        let alice = Uuid::new_v4();
        let mut ledger = seeded_cart(alice);

        assert_eq!(
            on_success(&mut ledger, alice),
            CartOutcome::Cleared { items_removed: 1 }
        );
        // replayed redirect: nothing to clear, no error
        assert_eq!(on_success(&mut ledger, alice), CartOutcome::NothingToClear);
        assert!(ledger.lines(alice).is_empty());
    }

    #[test]
    fn test_on_success_without_cart() {
        let mut ledger = CartLedger::new();
        assert_eq!(
            on_success(&mut ledger, Uuid::new_v4()),
            CartOutcome::NothingToClear
        );
    }

    #[test]
    fn test_redirect_leaves_order_pending() {
        // the worked example: success redirect clears the cart but the
        // order only moves on the provider-attested path
        let alice = Uuid::new_v4();
        let mut ledger = seeded_cart(alice);
        let mut orders = OrderBook::new();
        let order = orders.create(alice, "1 Main St", "1 Main St");

        on_success(&mut ledger, alice);

        assert!(ledger.lines(alice).is_empty());
        assert_eq!(orders.get(order.id).unwrap().status, OrderStatus::Pending);
    }

    #[test]
    fn test_on_cancel_mutates_nothing() {
        let alice = Uuid::new_v4();
        let ledger = seeded_cart(alice);
        let outcome = on_cancel(&ledger, alice);
        assert_eq!(outcome.items_retained, 1);
        assert_eq!(ledger.lines(alice).len(), 1);
    }

    #[test]
    fn test_session_completed_finalizes_once() {
        let alice = Uuid::new_v4();
        let mut ledger = seeded_cart(alice);
        let mut orders = OrderBook::new();
        let order = orders.create(alice, "1 Main St", "1 Main St");
        let event = completed_event(Some(order.id));

        let first = on_session_completed(&mut ledger, &mut orders, &event).unwrap();
        assert!(first.newly_paid);
        assert_eq!(first.items_cleared, 1);
        assert_eq!(orders.get(order.id).unwrap().status, OrderStatus::Paid);

        // redelivery: no transition, no double clear
        let second = on_session_completed(&mut ledger, &mut orders, &event).unwrap();
        assert!(!second.newly_paid);
        assert_eq!(second.items_cleared, 0);
    }

    #[test]
    fn test_session_completed_requires_order_metadata() {
        let mut ledger = CartLedger::new();
        let mut orders = OrderBook::new();
        let err =
            on_session_completed(&mut ledger, &mut orders, &completed_event(None)).unwrap_err();
        assert!(matches!(err, StoreError::WebhookParse(_)));
    }

    #[test]
    fn test_session_completed_unknown_order() {
        let mut ledger = CartLedger::new();
        let mut orders = OrderBook::new();
        let err = on_session_completed(
            &mut ledger,
            &mut orders,
            &completed_event(Some(Uuid::new_v4())),
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::OrderNotFound { .. }));
    }

    #[test]
    fn test_session_expired_cancels_pending_only() {
        let alice = Uuid::new_v4();
        let mut orders = OrderBook::new();
        let order = orders.create(alice, "1 Main St", "1 Main St");
        let mut event = completed_event(Some(order.id));
        event.kind = PaymentEventKind::SessionExpired;

        assert!(on_session_expired(&mut orders, &event).unwrap());
        assert_eq!(orders.get(order.id).unwrap().status, OrderStatus::Cancelled);

        // replay: already terminal, nothing happens
        assert!(!on_session_expired(&mut orders, &event).unwrap());
    }
}
