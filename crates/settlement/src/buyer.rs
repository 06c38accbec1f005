//! Buyer-side settlement: purchase history and spend totals.

use catalog::CatalogStore;
use common::{BuyerId, Money, PageRequest, Paginated};
use domain::{LedgerStatus, Purchase};
use serde::Serialize;
use storage::LedgerRepository;

use crate::Result;

/// One purchase row joined with what the catalog still knows about the
/// product. `product_name`/`category` are `None` when the product has been
/// deleted since the purchase; the financial fields are always the ledger's.
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseHistoryEntry {
    pub purchase: Purchase,
    pub product_name: Option<String>,
    pub category: Option<String>,
}

/// Lifetime spend statistics for one buyer.
///
/// Cancelled and refunded purchases are counted but excluded from
/// `total_spent`; money that came back is not money spent.
#[derive(Debug, Clone, Serialize)]
pub struct BuyerSpendSummary {
    pub buyer_id: BuyerId,
    pub total_purchases: u64,
    pub completed_purchases: u64,
    pub cancelled_purchases: u64,
    pub refunded_purchases: u64,
    pub total_spent: Money,
    pub units_bought: u64,
}

/// Buyer-facing read model over the purchase ledger.
pub struct BuyerSettlementView<S, C>
where
    S: LedgerRepository,
    C: CatalogStore,
{
    store: S,
    catalog: C,
}

impl<S, C> BuyerSettlementView<S, C>
where
    S: LedgerRepository,
    C: CatalogStore,
{
    pub fn new(store: S, catalog: C) -> Self {
        Self { store, catalog }
    }

    /// One page of a buyer's purchases, newest first, joined with catalog
    /// product data where it still exists.
    #[tracing::instrument(skip(self))]
    pub async fn purchase_history(
        &self,
        buyer_id: BuyerId,
        page: PageRequest,
    ) -> Result<Paginated<PurchaseHistoryEntry>> {
        let (purchases, total) = self.store.purchases_for_buyer_page(buyer_id, page).await?;

        let mut entries = Vec::with_capacity(purchases.len());
        for purchase in purchases {
            let product = self.catalog.get_product(purchase.product_id).await?;
            entries.push(PurchaseHistoryEntry {
                product_name: product.as_ref().map(|p| p.name.clone()),
                category: product.map(|p| p.category),
                purchase,
            });
        }
        Ok(Paginated::new(entries, total, page))
    }

    /// Folds the buyer's whole purchase ledger into spend statistics.
    #[tracing::instrument(skip(self))]
    pub async fn spend_summary(&self, buyer_id: BuyerId) -> Result<BuyerSpendSummary> {
        let purchases = self.store.purchases_for_buyer(buyer_id).await?;

        let mut summary = BuyerSpendSummary {
            buyer_id,
            total_purchases: 0,
            completed_purchases: 0,
            cancelled_purchases: 0,
            refunded_purchases: 0,
            total_spent: Money::zero(),
            units_bought: 0,
        };
        for purchase in &purchases {
            summary.total_purchases += 1;
            match purchase.status {
                LedgerStatus::Completed => {
                    summary.completed_purchases += 1;
                    summary.total_spent += purchase.total;
                    summary.units_bought += u64::from(purchase.quantity);
                }
                LedgerStatus::Cancelled => summary.cancelled_purchases += 1,
                LedgerStatus::Refunded => summary.refunded_purchases += 1,
            }
        }
        Ok(summary)
    }
}
