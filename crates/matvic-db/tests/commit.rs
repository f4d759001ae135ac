//! Integration tests for the sale commit: scenarios, atomicity, conservation,
//! price immutability and concurrent buyers.

use std::collections::HashMap;

use matvic_core::sale::coalesce_lines;
use matvic_core::{CoreError, Money, PaymentMethod, ProductInput, SaleLine, SaleRequest};
use matvic_db::{Database, DbConfig, DbError};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

async fn memory_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

async fn add_product(db: &Database, name: &str, price: Money, stock: i64) -> String {
    db.products()
        .create(ProductInput {
            name: name.to_string(),
            description: None,
            category: "Accesorios".to_string(),
            unit_price: price,
            stock,
            min_stock: 0,
        })
        .await
        .unwrap()
        .id
}

fn sale(lines: Vec<SaleLine>, payment_method: &str) -> SaleRequest {
    SaleRequest {
        lines,
        payment_method: payment_method.to_string(),
        employee_id: 3,
        store_id: 1,
        customer_name: None,
        customer_id: None,
    }
}

fn line(product_id: &str, quantity: i64) -> SaleLine {
    SaleLine {
        product_id: product_id.to_string(),
        quantity,
    }
}

async fn stock_of(db: &Database, id: &str) -> i64 {
    db.products().get(id).await.unwrap().stock
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn cable_sale_succeeds_and_decrements_stock() {
    let db = memory_db().await;
    let cable = add_product(&db, "Cable USB-C", Money::from_pesos(15), 5).await;

    let receipt = db
        .sales()
        .commit(sale(vec![line(&cable, 3)], "Efectivo"))
        .await
        .unwrap();

    assert_eq!(receipt.total, Money::from_pesos(45));
    assert_eq!(stock_of(&db, &cable).await, 2);

    let detail = db
        .sales()
        .get_detail(&receipt.sale_id.to_string())
        .await
        .unwrap();
    assert_eq!(detail.sale.payment_method, PaymentMethod::Cash);
    assert_eq!(detail.items.len(), 1);
    assert_eq!(detail.items[0].quantity, 3);
    assert_eq!(detail.items[0].unit_price, Money::from_pesos(15));
}

#[tokio::test]
async fn charger_sale_over_stock_is_rejected() {
    let db = memory_db().await;
    let charger = add_product(&db, "Cargador Inalámbrico", Money::from_pesos(30), 2).await;

    let err = db
        .sales()
        .commit(sale(vec![line(&charger, 5)], "Tarjeta"))
        .await
        .unwrap_err();

    match err {
        DbError::Domain(CoreError::InsufficientStock {
            product_id,
            available,
            requested,
            ..
        }) => {
            assert_eq!(product_id, charger);
            assert_eq!(available, 2);
            assert_eq!(requested, 5);
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }
    assert_eq!(stock_of(&db, &charger).await, 2);
    assert_eq!(db.sales().count().await.unwrap(), 0);
}

#[tokio::test]
async fn empty_cart_is_rejected_without_a_sale_row() {
    let db = memory_db().await;

    let err = db.sales().commit(sale(vec![], "Efectivo")).await.unwrap_err();

    assert!(matches!(err, DbError::Domain(CoreError::EmptyCart)));
    assert_eq!(db.sales().count().await.unwrap(), 0);
}

#[tokio::test]
async fn unknown_product_and_payment_method_are_rejected() {
    let db = memory_db().await;
    let cable = add_product(&db, "Cable USB-C", Money::from_pesos(15), 5).await;

    let err = db
        .sales()
        .commit(sale(vec![line(&cable, 1), line("ghost", 1)], "Efectivo"))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Domain(CoreError::ProductNotFound(id)) if id == "ghost"));

    let err = db
        .sales()
        .commit(sale(vec![line(&cable, 1)], "Bitcoin"))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Domain(CoreError::InvalidPaymentMethod(_))));

    assert_eq!(stock_of(&db, &cable).await, 5);
    assert_eq!(db.sales().count().await.unwrap(), 0);
}

#[tokio::test]
async fn repeated_lines_are_coalesced() {
    let db = memory_db().await;
    let cable = add_product(&db, "Cable USB-C", Money::from_pesos(15), 5).await;

    let receipt = db
        .sales()
        .commit(sale(vec![line(&cable, 2), line(&cable, 2)], "cash"))
        .await
        .unwrap();
    assert_eq!(receipt.total, Money::from_pesos(60));
    assert_eq!(stock_of(&db, &cable).await, 1);

    let detail = db
        .sales()
        .get_detail(&receipt.sale_id.to_string())
        .await
        .unwrap();
    assert_eq!(detail.items.len(), 1);
    assert_eq!(detail.items[0].quantity, 4);

    // 2 + 2 = 4 > 1 left, even though each line alone would fit.
    let err = db
        .sales()
        .commit(sale(vec![line(&cable, 1), line(&cable, 1)], "cash"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DbError::Domain(CoreError::InsufficientStock { requested: 2, .. })
    ));
}

// =============================================================================
// Snapshots
// =============================================================================

#[tokio::test]
async fn committed_prices_survive_product_edits_and_deletes() {
    let db = memory_db().await;
    let funda = add_product(&db, "Funda iPhone 15", Money::from_pesos(25), 10).await;

    let receipt = db
        .sales()
        .commit(sale(vec![line(&funda, 2)], "Efectivo"))
        .await
        .unwrap();

    db.products()
        .update(
            &funda,
            ProductInput {
                name: "Funda iPhone 15 Pro".to_string(),
                description: None,
                category: "Fundas".to_string(),
                unit_price: Money::from_pesos(40),
                stock: 8,
                min_stock: 0,
            },
        )
        .await
        .unwrap();

    let id = receipt.sale_id.to_string();
    let detail = db.sales().get_detail(&id).await.unwrap();
    assert_eq!(detail.sale.total, Money::from_pesos(50));
    assert_eq!(detail.items[0].unit_price, Money::from_pesos(25));
    assert_eq!(detail.items[0].name_snapshot, "Funda iPhone 15");

    db.products().delete(&funda).await.unwrap();
    let detail = db.sales().get_detail(&id).await.unwrap();
    assert_eq!(detail.items[0].product_id, funda);
    assert_eq!(detail.items[0].line_total, Money::from_pesos(50));
}

// =============================================================================
// Properties
// =============================================================================

/// Random carts against random stock. Every commit either applies in full or
/// leaves no trace, and stock only ever drops by what was sold.
#[tokio::test]
async fn random_carts_are_atomic_and_conserve_stock() {
    let db = memory_db().await;
    let mut rng = SmallRng::seed_from_u64(0x5EED_CAFE);

    let mut ids = Vec::new();
    let mut initial = HashMap::new();
    for i in 0..5 {
        let stock = rng.gen_range(0..8);
        let price = Money::from_pesos(rng.gen_range(1..5000));
        let id = add_product(&db, &format!("Producto {i}"), price, stock).await;
        initial.insert(id.clone(), stock);
        ids.push(id);
    }

    let mut expected = initial.clone();
    let mut sold: HashMap<String, i64> = HashMap::new();
    let mut expected_sales = 0;

    for _ in 0..150 {
        let cart: Vec<SaleLine> = (0..rng.gen_range(1..4))
            .map(|_| line(&ids[rng.gen_range(0..ids.len())], rng.gen_range(1..4)))
            .collect();
        let merged = coalesce_lines(cart.clone()).unwrap();
        let fits = merged.iter().all(|l| expected[&l.product_id] >= l.quantity);

        let result = db.sales().commit(sale(cart, "Transferencia")).await;

        if fits {
            let receipt = result.unwrap();
            expected_sales += 1;
            for l in &merged {
                *expected.get_mut(&l.product_id).unwrap() -= l.quantity;
                *sold.entry(l.product_id.clone()).or_default() += l.quantity;
            }
            let detail = db
                .sales()
                .get_detail(&receipt.sale_id.to_string())
                .await
                .unwrap();
            assert_eq!(
                detail.items.iter().map(|i| i.line_total).sum::<Money>(),
                receipt.total
            );
        } else {
            assert!(matches!(
                result,
                Err(DbError::Domain(CoreError::InsufficientStock { .. }))
            ));
        }

        for id in &ids {
            assert_eq!(stock_of(&db, id).await, expected[id]);
        }
    }

    assert_eq!(db.sales().count().await.unwrap(), expected_sales);
    for id in &ids {
        let after = stock_of(&db, id).await;
        assert!(after >= 0);
        assert_eq!(after, initial[id] - sold.get(id).copied().unwrap_or(0));
    }
}

// =============================================================================
// Concurrency
// =============================================================================

async fn file_db(dir: &tempfile::TempDir) -> Database {
    Database::new(DbConfig::new(dir.path().join("matvic.db")).max_connections(8))
        .await
        .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_buyers_cannot_oversell() {
    let dir = tempfile::tempdir().unwrap();
    let db = file_db(&dir).await;
    let cable = add_product(&db, "Cable USB-C", Money::from_pesos(15), 5).await;

    let a = {
        let db = db.clone();
        let cable = cable.clone();
        tokio::spawn(async move {
            db.sales()
                .commit(sale(vec![line(&cable, 3)], "Efectivo"))
                .await
        })
    };
    let b = {
        let db = db.clone();
        let cable = cable.clone();
        tokio::spawn(async move {
            db.sales()
                .commit(sale(vec![line(&cable, 3)], "Tarjeta"))
                .await
        })
    };

    let results = [a.await.unwrap(), b.await.unwrap()];

    let successes = results.iter().filter(|r| r.is_ok()).count();
    let rejections = results
        .iter()
        .filter(|r| matches!(r, Err(DbError::Domain(CoreError::InsufficientStock { .. }))))
        .count();

    assert_eq!(successes, 1, "results: {results:?}");
    assert_eq!(rejections, 1, "results: {results:?}");
    assert_eq!(stock_of(&db, &cable).await, 2);
    assert_eq!(db.sales().count().await.unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn many_concurrent_buyers_drain_stock_exactly() {
    let dir = tempfile::tempdir().unwrap();
    let db = file_db(&dir).await;
    let charger = add_product(&db, "Cargador Inalámbrico", Money::from_pesos(30), 3).await;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let db = db.clone();
            let charger = charger.clone();
            tokio::spawn(async move {
                db.sales()
                    .commit(sale(vec![line(&charger, 1)], "Efectivo"))
                    .await
            })
        })
        .collect();

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(DbError::Domain(CoreError::InsufficientStock { .. })) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(successes, 3);
    assert_eq!(stock_of(&db, &charger).await, 0);
    assert_eq!(db.sales().count().await.unwrap(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_buyers_with_ample_stock_all_succeed() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::new(DbConfig::new(dir.path().join("matvic.db")).max_connections(16))
        .await
        .unwrap();
    let funda = add_product(&db, "Funda iPhone 15", Money::from_pesos(12_990), 1000).await;

    let mut expected_stock = 1000;
    for _round in 0..5 {
        let handles: Vec<_> = (0..32)
            .map(|_| {
                let db = db.clone();
                let funda = funda.clone();
                tokio::spawn(async move {
                    db.sales()
                        .commit(sale(vec![line(&funda, 1)], "Tarjeta"))
                        .await
                })
            })
            .collect();

        for handle in handles {
            if let Err(err) = handle.await.unwrap() {
                panic!("valid sale rejected under contention: {err:?}");
            }
        }
        expected_stock -= 32;
        assert_eq!(stock_of(&db, &funda).await, expected_stock);
    }

    assert_eq!(db.sales().count().await.unwrap(), 160);
}
