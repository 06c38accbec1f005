use chrono::Utc;
use common::{BuyerId, Money, OrderId, ProductId, StoreId};
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{
    Address, CommissionRate, LineItem, Order, OrderNumber, PaymentMethod, PaymentStatus, Purchase,
    Sale,
};

fn address() -> Address {
    Address {
        recipient: "Bench Buyer".to_string(),
        street: "1 Main St".to_string(),
        city: "Springfield".to_string(),
        postal_code: "12345".to_string(),
        country: "US".to_string(),
    }
}

fn lines(n: usize) -> Vec<LineItem> {
    (0..n)
        .map(|i| {
            LineItem::new(
                ProductId::new(),
                StoreId::new(),
                (i as u32 % 5) + 1,
                Money::from_cents(100 * (i as i64 + 1)),
            )
        })
        .collect()
}

fn bench_order_create(c: &mut Criterion) {
    let items = lines(20);

    c.bench_function("domain/order_create_20_lines", |b| {
        b.iter(|| {
            Order::create(
                OrderId::new(),
                OrderNumber::generate(Utc::now()),
                BuyerId::new(),
                items.clone(),
                address(),
                PaymentMethod::Card,
                PaymentStatus::Paid,
                Money::from_cents(500),
                Money::from_cents(160),
                None,
                Utc::now(),
            )
            .unwrap()
        });
    });
}

fn bench_ledger_fanout(c: &mut Criterion) {
    let order = Order::create(
        OrderId::new(),
        OrderNumber::generate(Utc::now()),
        BuyerId::new(),
        lines(20),
        address(),
        PaymentMethod::Card,
        PaymentStatus::Paid,
        Money::from_cents(500),
        Money::from_cents(160),
        None,
        Utc::now(),
    )
    .unwrap();
    let rate = CommissionRate::default();

    c.bench_function("domain/ledger_fanout_20_lines", |b| {
        b.iter(|| {
            let now = Utc::now();
            let ledger: Vec<(Purchase, Sale)> = order
                .line_items
                .iter()
                .map(|line| {
                    (
                        Purchase::from_line(
                            order.id,
                            order.buyer_id,
                            line,
                            order.payment_method,
                            order.payment_status,
                            now,
                        ),
                        Sale::from_line(
                            order.id,
                            order.buyer_id,
                            line,
                            rate,
                            order.payment_method,
                            order.payment_status,
                            now,
                        ),
                    )
                })
                .collect();
            ledger
        });
    });
}

criterion_group!(benches, bench_order_create, bench_ledger_fanout);
criterion_main!(benches);
