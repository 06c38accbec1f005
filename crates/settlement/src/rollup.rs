//! Time and catalog rollups over the sales ledger.

use std::collections::BTreeMap;

use catalog::CatalogStore;
use chrono::Datelike;
use common::{Money, ProductId, StoreId};
use domain::LedgerStatus;
use serde::Serialize;
use storage::LedgerRepository;

use crate::Result;

/// One calendar month of a store's completed sales.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyBucket {
    pub year: i32,
    pub month: u32,
    pub sales: u64,
    pub units: u64,
    pub gross: Money,
    pub commission: Money,
    pub net: Money,
}

/// A store's completed sales folded onto one product.
#[derive(Debug, Clone, Serialize)]
pub struct ProductBreakdown {
    pub product_id: ProductId,
    /// `None` when the catalog entry no longer exists.
    pub product_name: Option<String>,
    pub units: u64,
    pub gross: Money,
    pub net: Money,
}

/// A store's completed sales folded onto one catalog category. Sales whose
/// product is gone from the catalog land in the `None` bucket.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryBreakdown {
    pub category: Option<String>,
    pub units: u64,
    pub gross: Money,
}

/// Reporting rollups for one store, derived from the sales ledger.
pub struct RollupView<S, C>
where
    S: LedgerRepository,
    C: CatalogStore,
{
    store: S,
    catalog: C,
}

impl<S, C> RollupView<S, C>
where
    S: LedgerRepository,
    C: CatalogStore,
{
    pub fn new(store: S, catalog: C) -> Self {
        Self { store, catalog }
    }

    /// Completed sales bucketed by calendar month, oldest first. Months
    /// with no sales are absent rather than zero-filled.
    #[tracing::instrument(skip(self))]
    pub async fn monthly_sales(&self, store_id: StoreId) -> Result<Vec<MonthlyBucket>> {
        let sales = self.store.sales_for_store(store_id).await?;

        let mut buckets: BTreeMap<(i32, u32), MonthlyBucket> = BTreeMap::new();
        for sale in sales {
            if sale.status != LedgerStatus::Completed {
                continue;
            }
            let key = (sale.created_at.year(), sale.created_at.month());
            let bucket = buckets.entry(key).or_insert(MonthlyBucket {
                year: key.0,
                month: key.1,
                sales: 0,
                units: 0,
                gross: Money::zero(),
                commission: Money::zero(),
                net: Money::zero(),
            });
            bucket.sales += 1;
            bucket.units += u64::from(sale.quantity);
            bucket.gross += sale.total;
            bucket.commission += sale.commission;
            bucket.net += sale.net;
        }
        Ok(buckets.into_values().collect())
    }

    /// Completed sales per product, best-selling (by gross) first.
    #[tracing::instrument(skip(self))]
    pub async fn product_breakdown(&self, store_id: StoreId) -> Result<Vec<ProductBreakdown>> {
        let sales = self.store.sales_for_store(store_id).await?;

        let mut by_product: BTreeMap<ProductId, ProductBreakdown> = BTreeMap::new();
        for sale in sales {
            if sale.status != LedgerStatus::Completed {
                continue;
            }
            let entry = by_product
                .entry(sale.product_id)
                .or_insert(ProductBreakdown {
                    product_id: sale.product_id,
                    product_name: None,
                    units: 0,
                    gross: Money::zero(),
                    net: Money::zero(),
                });
            entry.units += u64::from(sale.quantity);
            entry.gross += sale.total;
            entry.net += sale.net;
        }

        let mut breakdown: Vec<ProductBreakdown> = Vec::with_capacity(by_product.len());
        for (product_id, mut entry) in by_product {
            entry.product_name = self
                .catalog
                .get_product(product_id)
                .await?
                .map(|p| p.name);
            breakdown.push(entry);
        }
        breakdown.sort_by(|a, b| b.gross.cents().cmp(&a.gross.cents()));
        Ok(breakdown)
    }

    /// Completed sales per catalog category, largest (by gross) first.
    #[tracing::instrument(skip(self))]
    pub async fn category_breakdown(&self, store_id: StoreId) -> Result<Vec<CategoryBreakdown>> {
        let sales = self.store.sales_for_store(store_id).await?;

        let mut by_category: BTreeMap<Option<String>, CategoryBreakdown> = BTreeMap::new();
        for sale in sales {
            if sale.status != LedgerStatus::Completed {
                continue;
            }
            let category = self
                .catalog
                .get_product(sale.product_id)
                .await?
                .map(|p| p.category);
            let entry = by_category
                .entry(category.clone())
                .or_insert(CategoryBreakdown {
                    category,
                    units: 0,
                    gross: Money::zero(),
                });
            entry.units += u64::from(sale.quantity);
            entry.gross += sale.total;
        }

        let mut breakdown: Vec<CategoryBreakdown> = by_category.into_values().collect();
        breakdown.sort_by(|a, b| b.gross.cents().cmp(&a.gross.cents()));
        Ok(breakdown)
    }
}
