//! End-to-end checkout pipeline tests on the in-memory backends.

use catalog::{InMemoryCatalog, Product};
use checkout::{
    CartService, CheckoutError, CheckoutRequest, InMemoryNotifier, LedgerWriter, LineRequest,
    OrderRequest, OrderService,
};
use common::{BuyerId, Money, ProductId, StoreId};
use domain::{Address, LedgerStatus, OrderStatus, PaymentMethod, PaymentStatus};
use storage::{LedgerRepository, MemoryStore, OrderRepository};

struct Harness {
    store: MemoryStore,
    catalog: InMemoryCatalog,
    notifier: InMemoryNotifier,
    writer: LedgerWriter<MemoryStore, InMemoryCatalog, InMemoryNotifier>,
    orders: OrderService<MemoryStore, InMemoryCatalog>,
    carts: CartService<MemoryStore, InMemoryCatalog>,
}

fn harness() -> Harness {
    let store = MemoryStore::new();
    let catalog = InMemoryCatalog::new();
    let notifier = InMemoryNotifier::new();
    Harness {
        writer: LedgerWriter::new(store.clone(), catalog.clone(), notifier.clone()),
        orders: OrderService::new(store.clone(), catalog.clone()),
        carts: CartService::new(store.clone(), catalog.clone()),
        store,
        catalog,
        notifier,
    }
}

fn product(store_id: StoreId, price_cents: i64, stock: i64) -> Product {
    Product {
        id: ProductId::new(),
        store_id,
        name: "Widget".to_string(),
        category: "tools".to_string(),
        price: Money::from_cents(price_cents),
        stock,
        sales_count: 0,
        active: true,
    }
}

fn address() -> Address {
    Address {
        recipient: "Jamie Buyer".to_string(),
        street: "1 Market St".to_string(),
        city: "Springfield".to_string(),
        postal_code: "12345".to_string(),
        country: "US".to_string(),
    }
}

fn request(buyer_id: BuyerId, lines: Vec<LineRequest>) -> OrderRequest {
    OrderRequest {
        buyer_id,
        lines,
        shipping_address: address(),
        payment_method: PaymentMethod::Card,
        payment_status: PaymentStatus::Paid,
        shipping_cost: Money::from_cents(500),
        tax: Money::from_cents(200),
        idempotency_key: None,
    }
}

#[tokio::test]
async fn checkout_fans_out_order_ledger_stock_and_notifications() {
    let h = harness();
    let store_a = StoreId::new();
    let store_b = StoreId::new();
    let pa = product(store_a, 2500, 10);
    let pb = product(store_b, 1000, 10);
    h.catalog.put_product(pa.clone()).await;
    h.catalog.put_product(pb.clone()).await;

    let buyer = BuyerId::new();
    let order = h
        .writer
        .create_order(request(
            buyer,
            vec![
                LineRequest {
                    product_id: pa.id,
                    quantity: 2,
                    unit_price: pa.price,
                },
                LineRequest {
                    product_id: pb.id,
                    quantity: 3,
                    unit_price: pb.price,
                },
            ],
        ))
        .await
        .unwrap();

    // Totals derived from the lines, never from the caller.
    assert_eq!(order.subtotal, Money::from_cents(8000));
    assert_eq!(order.total, Money::from_cents(8700));
    assert_eq!(order.status, OrderStatus::Pending);
    assert!(order.order_number.as_str().starts_with("ORD-"));

    // One Purchase and one Sale per line.
    let purchases = h.store.purchases_for_order(order.id).await.unwrap();
    let sales = h.store.sales_for_order(order.id).await.unwrap();
    assert_eq!(purchases.len(), 2);
    assert_eq!(sales.len(), 2);
    assert!(purchases.iter().all(|p| p.status == LedgerStatus::Completed));

    // Stock down, sales counters up.
    assert_eq!(h.catalog.stock_of(pa.id).await, Some(8));
    assert_eq!(h.catalog.stock_of(pb.id).await, Some(7));
    assert_eq!(h.catalog.sales_count_of(pa.id).await, Some(2));
    assert_eq!(h.catalog.sales_count_of(pb.id).await, Some(3));

    // One notification per store, carrying that store's share.
    let mut sent = h.notifier.sent_for_order(order.id).await;
    sent.sort_by_key(|n| n.amount.cents());
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].store_id, store_b);
    assert_eq!(sent[0].amount, Money::from_cents(3000));
    assert_eq!(sent[1].store_id, store_a);
    assert_eq!(sent[1].amount, Money::from_cents(5000));
}

#[tokio::test]
async fn commission_is_split_per_sale_at_the_platform_rate() {
    let h = harness();
    let store_id = StoreId::new();
    let p = product(store_id, 10_000, 5);
    h.catalog.put_product(p.clone()).await;

    let order = h
        .writer
        .create_order(request(
            BuyerId::new(),
            vec![LineRequest {
                product_id: p.id,
                quantity: 2,
                unit_price: p.price,
            }],
        ))
        .await
        .unwrap();

    // $100.00 x 2 at the 5% default: $10.00 commission, $190.00 net.
    let sales = h.store.sales_for_order(order.id).await.unwrap();
    assert_eq!(sales.len(), 1);
    assert_eq!(sales[0].total, Money::from_cents(20_000));
    assert_eq!(sales[0].commission, Money::from_cents(1_000));
    assert_eq!(sales[0].net, Money::from_cents(19_000));
    assert!((sales[0].commission_rate.value() - 0.05).abs() < f64::EPSILON);
}

#[tokio::test]
async fn insufficient_stock_aborts_before_any_record() {
    let h = harness();
    let p = product(StoreId::new(), 1000, 3);
    h.catalog.put_product(p.clone()).await;

    let err = h
        .writer
        .create_order(request(
            BuyerId::new(),
            vec![LineRequest {
                product_id: p.id,
                quantity: 5,
                unit_price: p.price,
            }],
        ))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CheckoutError::InsufficientStock {
            requested: 5,
            available: 3,
            ..
        }
    ));
    assert_eq!(h.store.order_count().await, 0);
    assert_eq!(h.store.purchase_count().await, 0);
    assert_eq!(h.catalog.stock_of(p.id).await, Some(3));
}

#[tokio::test]
async fn inactive_product_is_unavailable() {
    let h = harness();
    let mut p = product(StoreId::new(), 1000, 10);
    p.active = false;
    h.catalog.put_product(p.clone()).await;

    let err = h
        .writer
        .create_order(request(
            BuyerId::new(),
            vec![LineRequest {
                product_id: p.id,
                quantity: 1,
                unit_price: p.price,
            }],
        ))
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::ProductUnavailable(id) if id == p.id));
}

#[tokio::test]
async fn concurrent_checkouts_cannot_oversell_the_last_unit() {
    let h = harness();
    let p = product(StoreId::new(), 1000, 1);
    h.catalog.put_product(p.clone()).await;

    let req = |buyer| {
        request(
            buyer,
            vec![LineRequest {
                product_id: p.id,
                quantity: 1,
                unit_price: p.price,
            }],
        )
    };
    let (a, b) = tokio::join!(
        h.writer.create_order(req(BuyerId::new())),
        h.writer.create_order(req(BuyerId::new())),
    );

    assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
    assert_eq!(h.store.order_count().await, 1);
    assert_eq!(h.catalog.stock_of(p.id).await, Some(0));
}

#[tokio::test]
async fn failed_commit_restores_every_decrement() {
    let h = harness();
    let pa = product(StoreId::new(), 1000, 5);
    let pb = product(StoreId::new(), 2000, 5);
    h.catalog.put_product(pa.clone()).await;
    h.catalog.put_product(pb.clone()).await;
    h.store.set_fail_next_commit(true).await;

    let err = h
        .writer
        .create_order(request(
            BuyerId::new(),
            vec![
                LineRequest {
                    product_id: pa.id,
                    quantity: 2,
                    unit_price: pa.price,
                },
                LineRequest {
                    product_id: pb.id,
                    quantity: 1,
                    unit_price: pb.price,
                },
            ],
        ))
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::Storage(_)));
    assert_eq!(h.store.order_count().await, 0);
    assert_eq!(h.store.sale_count().await, 0);
    // Both decrements compensated.
    assert_eq!(h.catalog.stock_of(pa.id).await, Some(5));
    assert_eq!(h.catalog.stock_of(pb.id).await, Some(5));
    // And no sales counted for an order that never committed.
    assert_eq!(h.catalog.sales_count_of(pa.id).await, Some(0));
}

#[tokio::test]
async fn order_number_exhaustion_is_retryable_not_a_validation_error() {
    let h = harness();
    let p = product(StoreId::new(), 1000, 5);
    h.catalog.put_product(p.clone()).await;
    h.store.set_all_order_numbers_taken(true).await;

    let err = h
        .writer
        .create_order(request(
            BuyerId::new(),
            vec![LineRequest {
                product_id: p.id,
                quantity: 2,
                unit_price: p.price,
            }],
        ))
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::OrderNumberExhausted));
    assert_eq!(h.store.order_count().await, 0);
    // The decrement made before the commit loop is compensated.
    assert_eq!(h.catalog.stock_of(p.id).await, Some(5));
}

#[tokio::test]
async fn idempotency_key_replays_the_original_order() {
    let h = harness();
    let p = product(StoreId::new(), 1000, 10);
    h.catalog.put_product(p.clone()).await;

    let buyer = BuyerId::new();
    let mut req = request(
        buyer,
        vec![LineRequest {
            product_id: p.id,
            quantity: 2,
            unit_price: p.price,
        }],
    );
    req.idempotency_key = Some("retry-abc".to_string());

    let first = h.writer.create_order(req.clone()).await.unwrap();
    let second = h.writer.create_order(req).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(h.store.order_count().await, 1);
    // Stock only moved once.
    assert_eq!(h.catalog.stock_of(p.id).await, Some(8));
}

#[tokio::test]
async fn cancellation_restores_stock_and_cancels_ledger_children() {
    let h = harness();
    let p = product(StoreId::new(), 1000, 10);
    h.catalog.put_product(p.clone()).await;

    let order = h
        .writer
        .create_order(request(
            BuyerId::new(),
            vec![LineRequest {
                product_id: p.id,
                quantity: 4,
                unit_price: p.price,
            }],
        ))
        .await
        .unwrap();
    assert_eq!(h.catalog.stock_of(p.id).await, Some(6));

    let cancelled = h
        .orders
        .update_status(
            order.id,
            OrderStatus::Cancelled,
            Some("buyer".to_string()),
            Some("changed my mind".to_string()),
        )
        .await
        .unwrap();

    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert!(cancelled.cancelled_at.is_some());
    assert_eq!(cancelled.cancel_reason.as_deref(), Some("changed my mind"));
    assert_eq!(h.catalog.stock_of(p.id).await, Some(10));

    let purchases = h.store.purchases_for_order(order.id).await.unwrap();
    let sales = h.store.sales_for_order(order.id).await.unwrap();
    assert!(purchases.iter().all(|r| r.status == LedgerStatus::Cancelled));
    assert!(sales.iter().all(|r| r.status == LedgerStatus::Cancelled));
}

#[tokio::test]
async fn terminal_orders_reject_further_transitions() {
    let h = harness();
    let p = product(StoreId::new(), 1000, 10);
    h.catalog.put_product(p.clone()).await;

    let order = h
        .writer
        .create_order(request(
            BuyerId::new(),
            vec![LineRequest {
                product_id: p.id,
                quantity: 1,
                unit_price: p.price,
            }],
        ))
        .await
        .unwrap();

    h.orders
        .update_status(order.id, OrderStatus::Cancelled, None, None)
        .await
        .unwrap();
    let err = h
        .orders
        .update_status(order.id, OrderStatus::Shipped, None, None)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CheckoutError::Order(domain::OrderError::InvalidStatus { .. })
    ));
}

#[tokio::test]
async fn refund_flips_payment_status_everywhere() {
    let h = harness();
    let p = product(StoreId::new(), 1000, 10);
    h.catalog.put_product(p.clone()).await;

    let order = h
        .writer
        .create_order(request(
            BuyerId::new(),
            vec![LineRequest {
                product_id: p.id,
                quantity: 1,
                unit_price: p.price,
            }],
        ))
        .await
        .unwrap();

    let refunded = h
        .orders
        .refund_order(order.id, Some("damaged in transit".to_string()))
        .await
        .unwrap();
    assert_eq!(refunded.payment_status, PaymentStatus::Refunded);

    let purchases = h.store.purchases_for_order(order.id).await.unwrap();
    let sales = h.store.sales_for_order(order.id).await.unwrap();
    assert!(purchases.iter().all(|r| r.status == LedgerStatus::Refunded));
    assert!(sales.iter().all(|r| r.payment_status == PaymentStatus::Refunded));

    // Refunding an already-refunded order is rejected.
    let err = h.orders.refund_order(order.id, None).await.unwrap_err();
    assert!(matches!(err, CheckoutError::Validation(_)));
}

#[tokio::test]
async fn cart_checkout_drains_the_cart() {
    let h = harness();
    let p = product(StoreId::new(), 1500, 10);
    h.catalog.put_product(p.clone()).await;

    let buyer = BuyerId::new();
    let cart = h.carts.add_item(buyer, p.id, 2).await.unwrap();
    assert_eq!(cart.total_amount, Money::from_cents(3000));

    let order = h
        .writer
        .checkout(CheckoutRequest {
            buyer_id: buyer,
            shipping_address: address(),
            payment_method: PaymentMethod::Card,
            payment_status: PaymentStatus::Paid,
            shipping_cost: Money::zero(),
            tax: Money::zero(),
            idempotency_key: None,
        })
        .await
        .unwrap();

    // Price snapshotted from the catalog at add time.
    assert_eq!(order.total, Money::from_cents(3000));
    assert!(h.carts.get_cart(buyer).await.unwrap().is_empty());
    assert_eq!(
        h.store.find_order(order.id).await.unwrap().map(|o| o.id),
        Some(order.id)
    );
}

#[tokio::test]
async fn empty_cart_checkout_is_a_validation_error() {
    let h = harness();
    let err = h
        .writer
        .checkout(CheckoutRequest {
            buyer_id: BuyerId::new(),
            shipping_address: address(),
            payment_method: PaymentMethod::Card,
            payment_status: PaymentStatus::Pending,
            shipping_cost: Money::zero(),
            tax: Money::zero(),
            idempotency_key: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::Validation(_)));
}

#[tokio::test]
async fn cart_add_respects_stock_across_merged_lines() {
    let h = harness();
    let p = product(StoreId::new(), 1000, 3);
    h.catalog.put_product(p.clone()).await;

    let buyer = BuyerId::new();
    h.carts.add_item(buyer, p.id, 2).await.unwrap();
    // 2 already in the cart: asking for 2 more exceeds the 3 in stock.
    let err = h.carts.add_item(buyer, p.id, 2).await.unwrap_err();
    assert!(matches!(
        err,
        CheckoutError::InsufficientStock {
            requested: 4,
            available: 3,
            ..
        }
    ));

    // A quantity of zero on update removes the line.
    let cart = h.carts.update_quantity(buyer, p.id, 0).await.unwrap();
    assert!(cart.is_empty());
}
