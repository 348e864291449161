//! Read-only reports over the ledger and the catalog.
//!
//! Aggregation lives in `bodega_core::reporting`; this layer only picks
//! the rows to feed it.

use chrono::NaiveDate;
use tracing::{debug, warn};

use bodega_core::reporting::{
    self, CategoryValuation, MonthPeriod, Reconciliation, SalesVsPurchases, StockAlerts,
    TopSeller, VatReport,
};
use bodega_core::{InventoryMethod, Movement, Product};

use super::InventoryService;
use crate::error::ServiceResult;
use crate::store::LedgerStore;

impl<S: LedgerStore> InventoryService<S> {
    async fn movements_in(&self, period: MonthPeriod) -> ServiceResult<Vec<Movement>> {
        Ok(self
            .store
            .movements_between(period.start(), period.end())
            .await?)
    }

    /// Output IVA on sales, input IVA on purchases and the difference, for
    /// one calendar month.
    pub async fn monthly_vat_report(&self, year: i32, month: u32) -> ServiceResult<VatReport> {
        let period = MonthPeriod::new(year, month)?;
        let movements = self.movements_in(period).await?;
        let report = reporting::monthly_vat(&movements, period);

        debug!(
            year,
            month,
            output = report.output_vat_cents,
            input = report.input_vat_cents,
            "Built VAT report"
        );
        Ok(report)
    }

    pub async fn valuation_by_category(&self) -> ServiceResult<Vec<CategoryValuation>> {
        let products = self.store.list_products().await?;
        Ok(reporting::valuation_by_category(&products))
    }

    pub async fn top_selling(
        &self,
        year: i32,
        month: u32,
        limit: usize,
    ) -> ServiceResult<Vec<TopSeller>> {
        let period = MonthPeriod::new(year, month)?;
        let movements = self.movements_in(period).await?;
        Ok(reporting::top_selling(&movements, period, limit))
    }

    pub async fn sales_vs_purchases(&self, year: i32, month: u32) -> ServiceResult<SalesVsPurchases> {
        let period = MonthPeriod::new(year, month)?;
        let movements = self.movements_in(period).await?;
        Ok(reporting::sales_vs_purchases(&movements, period))
    }

    pub async fn stock_alerts(&self) -> ServiceResult<StockAlerts> {
        let products = self.store.list_products().await?;
        Ok(reporting::stock_alerts(&products))
    }

    /// Products expiring within `days` of `today`, soonest first.
    pub async fn expiring_products(&self, today: NaiveDate, days: i64) -> ServiceResult<Vec<Product>> {
        let products = self.store.list_products().await?;
        Ok(reporting::expiring_within(&products, today, days))
    }

    /// Every movement of a product, oldest first.
    pub async fn movement_history(&self, product_id: &str) -> ServiceResult<Vec<Movement>> {
        Ok(self.store.movements_for_product(product_id).await?)
    }

    /// Checks one product's stock against its ledger and, under FIFO, its
    /// lots.
    pub async fn reconciliation(&self, product_id: &str) -> ServiceResult<Reconciliation> {
        let method = self.method().await?;
        let product = self.require_product(product_id).await?;
        self.reconcile_product(&product, method).await
    }

    /// Reconciliation of every product in the catalog. Inconsistent
    /// products are logged.
    pub async fn reconcile_all(&self) -> ServiceResult<Vec<Reconciliation>> {
        let method = self.method().await?;
        let products = self.store.list_products().await?;

        let mut rows = Vec::with_capacity(products.len());
        for product in &products {
            let row = self.reconcile_product(product, method).await?;
            if !row.is_consistent() {
                warn!(
                    product_id = %row.product_id,
                    stock = row.stock,
                    movement_total = row.movement_total,
                    lot_total = ?row.lot_total,
                    "Product does not reconcile"
                );
            }
            rows.push(row);
        }
        Ok(rows)
    }

    async fn reconcile_product(
        &self,
        product: &Product,
        method: InventoryMethod,
    ) -> ServiceResult<Reconciliation> {
        let movements = self.store.movements_for_product(&product.id).await?;
        let lots = match method {
            InventoryMethod::Fifo => Some(self.store.read_batches(&product.id).await?),
            InventoryMethod::Cpp => None,
        };
        Ok(reporting::reconcile(product, &movements, lots.as_deref()))
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::{empty_product, new_product, service, TENANT};
    use super::*;
    use crate::store::LedgerWrite;
    use bodega_core::{
        AdjustmentReason, CartLine, CoreError, Direction, MovementType, NewProduct, PaymentMethod,
    };
    use chrono::{DateTime, Datelike, Duration, Utc};

    fn this_month() -> (i32, u32) {
        let now = Utc::now();
        (now.year(), now.month())
    }

    fn taxed(product: &Product, kind: MovementType, iva: i64, at: DateTime<Utc>) -> Movement {
        Movement {
            id: uuid::Uuid::new_v4().to_string(),
            tenant_id: TENANT.to_string(),
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            occurred_at: at,
            movement_type: kind,
            quantity: match kind.direction() {
                Direction::Inbound => 1,
                Direction::Outbound => -1,
            },
            net_amount_cents: Some(iva * 100 / 19),
            iva_amount_cents: Some(iva),
            total_amount_cents: Some(iva * 100 / 19 + iva),
            cost_of_goods_sold_cents: None,
            payment_method: None,
            reference_id: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_vat_payable_is_output_minus_input() {
        let (_db, svc) = service(InventoryMethod::Cpp).await;
        let p = empty_product(&svc, "Ledger").await;
        let period = MonthPeriod::containing(Utc::now());
        let last_month = period.start() - Duration::days(3);

        svc.store()
            .run_atomic(vec![
                LedgerWrite::InsertMovement(taxed(&p, MovementType::Sale, 190, period.start())),
                LedgerWrite::InsertMovement(taxed(&p, MovementType::PurchaseEntry, 100, period.start())),
                LedgerWrite::InsertMovement(taxed(&p, MovementType::Sale, 5000, last_month)),
            ])
            .await
            .unwrap();

        let report = svc
            .monthly_vat_report(period.year, period.month)
            .await
            .unwrap();
        assert_eq!(report.output_vat_cents, 190);
        assert_eq!(report.input_vat_cents, 100);
        assert_eq!(report.vat_payable_cents, 90);
    }

    #[tokio::test]
    async fn test_vat_from_real_operations() {
        let (_db, svc) = service(InventoryMethod::Fifo).await;
        let p = empty_product(&svc, "Cereal").await;
        let today = Utc::now().date_naive();

        // 10 × 1000 bought: IVA 1900.
        svc.enter_purchase(&p.id, 10, 1000, today).await.unwrap();
        // 2 × 5000 sold: IVA 1900.
        svc.sale(&[CartLine::new(&p.id, 2).at_price(5000)], PaymentMethod::Cash)
            .await
            .unwrap();
        // Adjustments carry no IVA.
        svc.adjust_stock(&p.id, -1, AdjustmentReason::Shrinkage, None)
            .await
            .unwrap();

        let (year, month) = this_month();
        let report = svc.monthly_vat_report(year, month).await.unwrap();
        assert_eq!(report.output_vat_cents, 1900);
        assert_eq!(report.input_vat_cents, 1900);
        assert_eq!(report.vat_payable_cents, 0);

        let totals = svc.sales_vs_purchases(year, month).await.unwrap();
        assert_eq!(totals.sales_total_cents, 11_900);
        assert_eq!(totals.purchases_total_cents, 11_900);
    }

    #[tokio::test]
    async fn test_invalid_month_rejected() {
        let (_db, svc) = service(InventoryMethod::Cpp).await;
        let err = svc.monthly_vat_report(2024, 13).await.unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::Validation(_))));

        let err = svc.monthly_vat_report(i32::MAX, 6).await.unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_top_selling() {
        let (_db, svc) = service(InventoryMethod::Cpp).await;
        let a = svc.create_product(new_product("Alfajor", 100, 50)).await.unwrap();
        let b = svc.create_product(new_product("Bebida", 100, 50)).await.unwrap();
        let c = svc.create_product(new_product("Chicle", 100, 50)).await.unwrap();

        svc.sale(
            &[CartLine::new(&a.id, 2), CartLine::new(&b.id, 7), CartLine::new(&c.id, 1)],
            PaymentMethod::Cash,
        )
        .await
        .unwrap();
        svc.sale(&[CartLine::new(&a.id, 3)], PaymentMethod::Card)
            .await
            .unwrap();

        let (year, month) = this_month();
        let top = svc.top_selling(year, month, 2).await.unwrap();
        let names: Vec<&str> = top.iter().map(|t| t.product_name.as_str()).collect();
        assert_eq!(names, vec!["Bebida", "Alfajor"]);
        assert_eq!(top[1].units_sold, 5);
    }

    #[tokio::test]
    async fn test_valuation_and_alerts() {
        let (_db, svc) = service(InventoryMethod::Cpp).await;
        svc.create_product(new_product("Rice", 100, 3)).await.unwrap();
        svc.create_product(NewProduct {
            category: None,
            max_stock_threshold: Some(20),
            ..new_product("Candles", 50, 40)
        })
        .await
        .unwrap();

        let valuation = svc.valuation_by_category().await.unwrap();
        assert_eq!(valuation.len(), 2);
        assert_eq!(valuation[0].category, reporting::UNCATEGORIZED);
        assert_eq!(valuation[0].value_cents, 2000);
        assert_eq!(valuation[1].value_cents, 300);

        let alerts = svc.stock_alerts().await.unwrap();
        assert_eq!(alerts.low_stock.len(), 1);
        assert_eq!(alerts.low_stock[0].name, "Rice");
        assert_eq!(alerts.overstock.len(), 1);
        assert_eq!(alerts.overstock[0].name, "Candles");
    }

    #[tokio::test]
    async fn test_expiring_products() {
        let (_db, svc) = service(InventoryMethod::Cpp).await;
        let today = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        for (name, offset) in [("Yesterday", -1), ("Soon", 3), ("Later", 20), ("Today", 0)] {
            svc.create_product(NewProduct {
                expiration_date: Some(today + Duration::days(offset)),
                ..new_product(name, 100, 1)
            })
            .await
            .unwrap();
        }

        let expiring = svc.expiring_products(today, 7).await.unwrap();
        let names: Vec<&str> = expiring.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Today", "Soon"]);
    }

    #[tokio::test]
    async fn test_every_operation_reconciles() {
        let (_db, svc) = service(InventoryMethod::Fifo).await;
        let p = svc.create_product(new_product("Flour", 100, 10)).await.unwrap();
        let today = Utc::now().date_naive();

        svc.enter_purchase(&p.id, 5, 130, today).await.unwrap();
        svc.sale(&[CartLine::new(&p.id, 8)], PaymentMethod::Cash)
            .await
            .unwrap();
        svc.adjust_stock(&p.id, 2, AdjustmentReason::Count, None)
            .await
            .unwrap();
        svc.adjust_stock(&p.id, -1, AdjustmentReason::Shrinkage, None)
            .await
            .unwrap();

        let row = svc.reconciliation(&p.id).await.unwrap();
        assert!(row.is_consistent(), "{row:?}");
        assert_eq!(row.stock, 8);
        assert_eq!(row.movement_total, 8);
        assert_eq!(row.lot_total, Some(8));

        let all = svc.reconcile_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert!(all.iter().all(Reconciliation::is_consistent));
    }

    #[tokio::test]
    async fn test_reconciliation_flags_drift() {
        let (db, svc) = service(InventoryMethod::Cpp).await;
        let p = svc.create_product(new_product("Oats", 100, 4)).await.unwrap();

        sqlx::query("UPDATE products SET stock = 9 WHERE id = ?1")
            .bind(&p.id)
            .execute(db.pool())
            .await
            .unwrap();

        let row = svc.reconciliation(&p.id).await.unwrap();
        assert!(!row.is_consistent());
        assert_eq!(row.lot_total, None);
        assert_eq!(row.movement_total, 4);
    }

    #[tokio::test]
    async fn test_movement_history_is_oldest_first() {
        let (_db, svc) = service(InventoryMethod::Cpp).await;
        let p = svc.create_product(new_product("Salt", 10, 5)).await.unwrap();
        svc.sale(&[CartLine::new(&p.id, 1)], PaymentMethod::Cash)
            .await
            .unwrap();

        let kinds: Vec<MovementType> = svc
            .movement_history(&p.id)
            .await
            .unwrap()
            .iter()
            .map(|m| m.movement_type)
            .collect();
        assert_eq!(kinds, vec![MovementType::OpeningBalance, MovementType::Sale]);
    }
}
