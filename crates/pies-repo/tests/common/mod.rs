//! Store contract checks shared by the memory and sqlite adapters.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use pies_types::domain::catalog::Catalog;
use pies_types::domain::customer::{CustomerId, NewCustomer};
use pies_types::domain::order::{NewOrder, OrderStatus};
use pies_types::ports::store::{RepoError, Store};

pub fn at(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 2, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

pub fn new_order(customer_id: CustomerId, delivery_at: NaiveDateTime) -> NewOrder {
    let catalog = Catalog::default();
    NewOrder::new(
        customer_id,
        "12 Oak St".into(),
        vec![catalog.line_item("Яблочный", 2).unwrap()],
        delivery_at,
        &catalog,
    )
    .unwrap()
}

pub async fn customers_are_found_by_name_or_phone<S: Store>(store: &S) {
    let anna = store
        .create_customer(NewCustomer::new("Анна", "555-0100").unwrap())
        .await
        .unwrap();
    let olga = store
        .create_customer(NewCustomer::new("Ольга", "555-0199").unwrap())
        .await
        .unwrap();
    assert!(anna < olga);

    let by_name = store.find_customers("аНн").await.unwrap();
    assert_eq!(by_name.len(), 1);
    assert_eq!(by_name[0].id, anna);

    let by_phone = store.find_customers("0199").await.unwrap();
    assert_eq!(by_phone.len(), 1);
    assert_eq!(by_phone[0].id, olga);

    let both = store.find_customers("555").await.unwrap();
    let ids: Vec<_> = both.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![anna, olga]);

    assert!(store.find_customers("Ирина").await.unwrap().is_empty());
    assert_eq!(store.list_customers().await.unwrap().len(), 2);
    assert_eq!(
        store.get_customer(olga).await.unwrap().unwrap().name,
        "Ольга"
    );
    assert!(store.get_customer(CustomerId(999)).await.unwrap().is_none());
}

pub async fn orders_round_trip_and_delete_idempotently<S: Store>(store: &S) {
    let customer = store
        .create_customer(NewCustomer::new("Anna", "555-0100").unwrap())
        .await
        .unwrap();
    let id = store
        .create_order(new_order(customer, at(18, 14)))
        .await
        .unwrap();

    let listed = store.list_orders(at(18, 0), at(18, 23)).await.unwrap();
    assert_eq!(listed.len(), 1);
    let row = &listed[0];
    assert_eq!(row.order.id, id);
    assert_eq!(row.customer_name, "Anna");
    assert_eq!(row.customer_phone, "555-0100");
    assert_eq!(row.order.address, "12 Oak St");
    assert_eq!(row.order.total_price, 14000);
    assert_eq!(row.order.status, OrderStatus::New);
    assert_eq!(row.order.delivery_at, at(18, 14));
    assert_eq!(row.order.items[0].name(), "Яблочный");
    assert_eq!(row.order.items[0].quantity(), 2);

    assert!(store.delete_order(id).await.unwrap());
    assert!(!store.delete_order(id).await.unwrap());
    assert!(store
        .list_orders(at(18, 0), at(18, 23))
        .await
        .unwrap()
        .is_empty());
}

pub async fn order_for_missing_customer_is_rejected<S: Store>(store: &S) {
    let res = store
        .create_order(new_order(CustomerId(4242), at(18, 14)))
        .await;
    assert!(matches!(res, Err(RepoError::MissingCustomer(CustomerId(4242)))));
    assert!(store
        .list_orders(at(1, 0), at(28, 23))
        .await
        .unwrap()
        .is_empty());
}

pub async fn list_orders_uses_a_closed_interval<S: Store>(store: &S) {
    let customer = store
        .create_customer(NewCustomer::new("Anna", "555-0100").unwrap())
        .await
        .unwrap();
    let start = at(18, 10);
    let end = at(18, 16);
    let second = Duration::seconds(1);

    let before = store
        .create_order(new_order(customer, start - second))
        .await
        .unwrap();
    let late = store.create_order(new_order(customer, end)).await.unwrap();
    let early = store.create_order(new_order(customer, start)).await.unwrap();
    let after = store
        .create_order(new_order(customer, end + second))
        .await
        .unwrap();

    let ids: Vec<_> = store
        .list_orders(start, end)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.order.id)
        .collect();
    assert_eq!(ids, vec![early, late]);
    assert!(!ids.contains(&before));
    assert!(!ids.contains(&after));
}

pub async fn reminded_orders_leave_the_new_listing<S: Store>(store: &S) {
    let customer = store
        .create_customer(NewCustomer::new("Anna", "555-0100").unwrap())
        .await
        .unwrap();
    let id = store
        .create_order(new_order(customer, at(18, 14)))
        .await
        .unwrap();

    let due = store.list_new_orders(at(18, 13), at(18, 15)).await.unwrap();
    assert_eq!(due.len(), 1);

    assert!(store.mark_reminded(id).await.unwrap());
    assert!(!store.mark_reminded(id).await.unwrap());
    assert!(store
        .list_new_orders(at(18, 13), at(18, 15))
        .await
        .unwrap()
        .is_empty());

    let all = store.list_orders(at(18, 13), at(18, 15)).await.unwrap();
    assert_eq!(all[0].order.status, OrderStatus::Reminded);
}
