//! Seller-side settlement: sales pages and payout statistics.

use catalog::CatalogStore;
use common::{Money, PageRequest, Paginated, StoreId};
use domain::{LedgerStatus, Sale};
use serde::Serialize;
use storage::LedgerRepository;

use crate::Result;

/// One sale row joined with current catalog product data, null-filled when
/// the product no longer exists.
#[derive(Debug, Clone, Serialize)]
pub struct SaleEntry {
    pub sale: Sale,
    pub product_name: Option<String>,
}

/// Lifetime sales statistics for one store.
///
/// The gross/commission/net figures cover completed sales only; the
/// commission on a completed sale is the amount the platform actually
/// keeps, so cancelled and refunded rows contribute counts, not money.
#[derive(Debug, Clone, Serialize)]
pub struct SellerSalesStats {
    pub store_id: StoreId,
    pub total_sales: u64,
    pub completed_sales: u64,
    pub cancelled_sales: u64,
    pub refunded_sales: u64,
    pub units_sold: u64,
    pub gross: Money,
    pub commission: Money,
    pub net: Money,
}

/// Seller-facing read model over the sales ledger.
pub struct SellerSettlementView<S, C>
where
    S: LedgerRepository,
    C: CatalogStore,
{
    store: S,
    catalog: C,
}

impl<S, C> SellerSettlementView<S, C>
where
    S: LedgerRepository,
    C: CatalogStore,
{
    pub fn new(store: S, catalog: C) -> Self {
        Self { store, catalog }
    }

    /// One page of a store's sales, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn sales_page(
        &self,
        store_id: StoreId,
        page: PageRequest,
    ) -> Result<Paginated<SaleEntry>> {
        let (sales, total) = self.store.sales_for_store_page(store_id, page).await?;

        let mut entries = Vec::with_capacity(sales.len());
        for sale in sales {
            let product = self.catalog.get_product(sale.product_id).await?;
            entries.push(SaleEntry {
                product_name: product.map(|p| p.name),
                sale,
            });
        }
        Ok(Paginated::new(entries, total, page))
    }

    /// Folds the store's whole sales ledger into payout statistics.
    #[tracing::instrument(skip(self))]
    pub async fn sales_stats(&self, store_id: StoreId) -> Result<SellerSalesStats> {
        let sales = self.store.sales_for_store(store_id).await?;

        let mut stats = SellerSalesStats {
            store_id,
            total_sales: 0,
            completed_sales: 0,
            cancelled_sales: 0,
            refunded_sales: 0,
            units_sold: 0,
            gross: Money::zero(),
            commission: Money::zero(),
            net: Money::zero(),
        };
        for sale in &sales {
            stats.total_sales += 1;
            match sale.status {
                LedgerStatus::Completed => {
                    stats.completed_sales += 1;
                    stats.units_sold += u64::from(sale.quantity);
                    stats.gross += sale.total;
                    stats.commission += sale.commission;
                    stats.net += sale.net;
                }
                LedgerStatus::Cancelled => stats.cancelled_sales += 1,
                LedgerStatus::Refunded => stats.refunded_sales += 1,
            }
        }
        Ok(stats)
    }
}
