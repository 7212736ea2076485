//! Cart session
//!
//! Shares a [`Cart`] between callers, persists it after every change and owns
//! the undo timer for the pending removal.

use std::{fmt, sync::Arc, time::Duration};

use decimal_percentage::Percentage;
use rusty_money::iso::Currency;
use tokio::{sync::Mutex, task::JoinHandle, time::sleep};
use tracing::{debug, info, warn};

use crate::{
    listings::{Listing, ListingId, ListingRecord},
    pricing::Totals,
    promotions::{AppliedPromo, PromoTable},
    storage::{self, StorageError, StorageKey, Store},
};

use super::{Cart, CartError, Removal, RemovalTicket};

#[derive(Debug)]
struct UndoTimer {
    ticket: RemovalTicket,
    handle: JoinHandle<()>,
}

/// Cart shared between the UI and its undo timer.
pub struct CartSession {
    cart: Arc<Mutex<Cart>>,
    store: Arc<dyn Store>,
    promos: PromoTable,
    tax_rate: Percentage,
    undo_window: Duration,
    timer: Mutex<Option<UndoTimer>>,
}

impl fmt::Debug for CartSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CartSession")
            .field("tax_rate", &self.tax_rate)
            .field("undo_window", &self.undo_window)
            .finish_non_exhaustive()
    }
}

/// Write the cart lines, pending removal included, to the store.
fn persist(store: &dyn Store, cart: &Cart) -> Result<(), StorageError> {
    let records: Vec<ListingRecord> = cart
        .persisted_items()
        .iter()
        .map(ListingRecord::from)
        .collect();

    storage::write(store, StorageKey::Cart, &records)
}

/// Apply `change` to a copy of `cart`, store the copy and only then swap it in.
/// A failed change or write leaves `cart` as it was.
fn commit<T>(
    store: &dyn Store,
    cart: &mut Cart,
    change: impl FnOnce(&mut Cart) -> Result<T, CartError>,
) -> Result<T, CartError> {
    let mut next = cart.clone();
    let outcome = change(&mut next)?;

    persist(store, &next)?;
    *cart = next;

    Ok(outcome)
}

/// Read the stored cart lines.
///
/// # Errors
///
/// Returns an error if the stored value is malformed.
pub fn stored_items(store: &dyn Store) -> Result<Vec<Listing>, CartError> {
    storage::read::<Vec<ListingRecord>>(store, StorageKey::Cart)?
        .unwrap_or_default()
        .into_iter()
        .map(|record| Listing::try_from(record).map_err(CartError::from))
        .collect()
}

impl CartSession {
    /// Load the stored cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored cart is malformed or in another currency.
    pub fn load(
        store: Arc<dyn Store>,
        currency: &'static Currency,
        promos: PromoTable,
        tax_rate: Percentage,
        undo_window: Duration,
    ) -> Result<Self, CartError> {
        let cart = Cart::with_items(stored_items(store.as_ref())?, currency)?;

        debug!(items = cart.len(), "cart loaded");

        Ok(Self {
            cart: Arc::new(Mutex::new(cart)),
            store,
            promos,
            tax_rate,
            undo_window,
            timer: Mutex::new(None),
        })
    }

    /// Copy of the current cart.
    pub async fn snapshot(&self) -> Cart {
        self.cart.lock().await.clone()
    }

    /// Totals for the active lines.
    ///
    /// # Errors
    ///
    /// Returns an error if the arithmetic fails.
    pub async fn totals(&self) -> Result<Totals, CartError> {
        Ok(self.cart.lock().await.totals(self.tax_rate)?)
    }

    /// Append a line and persist.
    ///
    /// # Errors
    ///
    /// Returns an error if the line is in another currency or the store fails.
    /// The cart is unchanged on error.
    pub async fn add(&self, item: Listing) -> Result<(), CartError> {
        let mut cart = self.cart.lock().await;
        let id = item.id.clone();

        commit(self.store.as_ref(), &mut cart, |next| next.add(item))?;

        info!(%id, "added to cart");

        Ok(())
    }

    /// Apply a promo code.
    ///
    /// # Errors
    ///
    /// Returns an error if the code is unknown or one is already applied.
    pub async fn apply_promo(&self, code: &str) -> Result<AppliedPromo, CartError> {
        let mut cart = self.cart.lock().await;

        match cart.apply_promo(&self.promos, code) {
            Ok(applied) => {
                info!(code, "promo code applied");

                Ok(applied.clone())
            }
            Err(error) => {
                warn!(code, %error, "promo code rejected");

                Err(error)
            }
        }
    }

    /// Remove the applied promo code.
    pub async fn remove_promo(&self) -> Option<AppliedPromo> {
        let removed = self.cart.lock().await.remove_promo();

        if let Some(promo) = &removed {
            info!(code = promo.code(), "promo code removed");
        }

        removed
    }

    /// Remove a line and start its undo window. When the window closes the
    /// line is discarded and the cart re-persisted.
    ///
    /// # Errors
    ///
    /// Returns an error if the line is not in the cart or the store fails. The
    /// cart is unchanged and no window opens on error.
    pub async fn remove_item(&self, id: &ListingId) -> Result<Removal, CartError> {
        let mut timer = self.timer.lock().await;
        let mut cart = self.cart.lock().await;

        let removal = commit(self.store.as_ref(), &mut cart, |next| next.remove_item(id))?;

        drop(cart);

        if let Some(previous) = timer.take() {
            previous.handle.abort();
        }

        info!(%id, ticket = %removal.ticket, "removed from cart");

        *timer = Some(UndoTimer {
            ticket: removal.ticket,
            handle: self.spawn_expiry(removal.ticket),
        });

        Ok(removal)
    }

    /// Restore the pending line and cancel its timer.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NothingToUndo`] if the window has closed.
    pub async fn undo(&self) -> Result<RemovalTicket, CartError> {
        let mut timer = self.timer.lock().await;
        let mut cart = self.cart.lock().await;

        let ticket = commit(self.store.as_ref(), &mut cart, Cart::undo)?;

        drop(cart);

        if let Some(active) = timer.take_if(|active| active.ticket == ticket) {
            active.handle.abort();
        }

        info!(%ticket, "removal undone");

        Ok(ticket)
    }

    /// Empty the cart and cancel any undo window.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn clear(&self) -> Result<(), CartError> {
        let mut timer = self.timer.lock().await;
        let mut cart = self.cart.lock().await;

        commit(self.store.as_ref(), &mut cart, |next| {
            next.clear();

            Ok(())
        })?;

        if let Some(active) = timer.take() {
            active.handle.abort();
        }

        info!("cart cleared");

        Ok(())
    }

    /// Wait for the open undo window, if any, to close.
    pub async fn wait_for_expiry(&self) {
        let active = self.timer.lock().await.take();

        if let Some(active) = active
            && let Err(error) = active.handle.await
        {
            debug!(ticket = %active.ticket, %error, "undo timer did not finish");
        }
    }

    fn spawn_expiry(&self, ticket: RemovalTicket) -> JoinHandle<()> {
        let cart = Arc::clone(&self.cart);
        let store = Arc::clone(&self.store);
        let window = self.undo_window;

        tokio::spawn(async move {
            sleep(window).await;

            let mut cart = cart.lock().await;

            let Some(item) = cart.expire(ticket) else {
                return;
            };

            debug!(%ticket, id = %item.id, "undo window closed");

            if let Err(error) = persist(store.as_ref(), &cart) {
                warn!(%ticket, %error, "failed to persist cart after removal");
            }
        })
    }
}
