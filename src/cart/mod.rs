//! Cart
//!
//! The cart is a plain state machine: it holds the active lines, the applied
//! promo code and at most one pending removal. Timers live in
//! [`session::CartSession`], which drives [`Cart::expire`] when an undo
//! window closes.

use std::fmt;

use decimal_percentage::Percentage;
use rusty_money::iso::Currency;
use thiserror::Error;
use tracing::debug;

use crate::{
    discounts::no_discount,
    listings::{Listing, ListingError, ListingId},
    pricing::{PricingError, Totals, calculate_totals, ensure_currency},
    promotions::{AppliedPromo, PromoError, PromoTable},
    storage::StorageError,
};

pub mod session;

/// Cart errors
#[derive(Debug, Error)]
pub enum CartError {
    /// No active line has this listing id
    #[error("Item {0} is not in the cart")]
    ItemNotFound(ListingId),

    /// No removal is waiting to be undone
    #[error("Nothing to undo")]
    NothingToUndo,

    /// Promo code was rejected
    #[error(transparent)]
    Promo(#[from] PromoError),

    /// Totals could not be calculated
    #[error(transparent)]
    Pricing(#[from] PricingError),

    /// Stored cart could not be read or written
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Stored cart line is malformed
    #[error(transparent)]
    Listing(#[from] ListingError),
}

/// Identifies one removal and its undo window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RemovalTicket(u64);

impl fmt::Display for RemovalTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct PendingRemoval {
    ticket: RemovalTicket,
    index: usize,
    item: Listing,
}

/// Outcome of [`Cart::remove_item`].
#[derive(Debug, Clone, PartialEq)]
pub struct Removal {
    /// Ticket for the new undo window
    pub ticket: RemovalTicket,

    /// Line taken out of the active list
    pub removed: Listing,

    /// Earlier pending removal that was discarded to make room
    pub finalized: Option<Listing>,
}

/// Shopping cart.
#[derive(Debug, Clone, PartialEq)]
pub struct Cart {
    items: Vec<Listing>,
    currency: &'static Currency,
    promo: Option<AppliedPromo>,
    pending: Option<PendingRemoval>,
    next_ticket: u64,
}

impl Cart {
    /// Create an empty cart.
    pub fn new(currency: &'static Currency) -> Self {
        Cart {
            items: Vec::new(),
            currency,
            promo: None,
            pending: None,
            next_ticket: 1,
        }
    }

    /// Create a cart with the given lines.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError::CurrencyMismatch`] if a line is priced in another currency.
    pub fn with_items(
        items: impl Into<Vec<Listing>>,
        currency: &'static Currency,
    ) -> Result<Self, CartError> {
        let items = items.into();

        ensure_currency(&items, currency)?;

        Ok(Cart {
            items,
            ..Cart::new(currency)
        })
    }

    /// Append a line. Duplicates are allowed.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError::CurrencyMismatch`] if the line is priced in another currency.
    pub fn add(&mut self, item: Listing) -> Result<(), CartError> {
        ensure_currency(std::slice::from_ref(&item), self.currency)?;

        self.items.push(item);

        Ok(())
    }

    /// Drop every line, the pending removal included. The promo code stays.
    pub fn clear(&mut self) {
        self.items.clear();
        self.pending = None;
    }

    /// Active lines, in order.
    pub fn items(&self) -> &[Listing] {
        &self.items
    }

    /// Number of active lines.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether there are no active lines.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Cart currency.
    pub fn currency(&self) -> &'static Currency {
        self.currency
    }

    /// Applied promo code, if any.
    pub fn applied_promo(&self) -> Option<&AppliedPromo> {
        self.promo.as_ref()
    }

    /// Current discount rate, zero without a promo code.
    pub fn discount_rate(&self) -> Percentage {
        self.promo
            .as_ref()
            .map_or_else(no_discount, AppliedPromo::rate)
    }

    /// Line waiting out its undo window, with its ticket.
    pub fn pending_removal(&self) -> Option<(RemovalTicket, &Listing)> {
        self.pending
            .as_ref()
            .map(|pending| (pending.ticket, &pending.item))
    }

    /// Apply a promo code from `table`.
    ///
    /// # Errors
    ///
    /// Returns [`PromoError::PromoAlreadyApplied`] while a code is active and
    /// [`PromoError::InvalidPromoCode`] for unknown codes. The cart is unchanged
    /// on error.
    pub fn apply_promo(&mut self, table: &PromoTable, code: &str) -> Result<&AppliedPromo, CartError> {
        if let Some(active) = &self.promo {
            return Err(PromoError::PromoAlreadyApplied(active.code().to_string()).into());
        }

        Ok(self.promo.insert(table.lookup(code)?))
    }

    /// Remove the promo code, returning it.
    pub fn remove_promo(&mut self) -> Option<AppliedPromo> {
        self.promo.take()
    }

    /// Take the first line with `id` out of the active list and open an undo
    /// window for it. A removal that was already pending is discarded.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::ItemNotFound`] if no active line has `id`.
    pub fn remove_item(&mut self, id: &ListingId) -> Result<Removal, CartError> {
        let index = self
            .items
            .iter()
            .position(|item| &item.id == id)
            .ok_or_else(|| CartError::ItemNotFound(id.clone()))?;

        let finalized = self.pending.take().map(|pending| {
            debug!(ticket = %pending.ticket, id = %pending.item.id, "discarding pending removal");

            pending.item
        });

        let removed = self.items.remove(index);
        let ticket = RemovalTicket(self.next_ticket);

        self.next_ticket += 1;
        self.pending = Some(PendingRemoval {
            ticket,
            index,
            item: removed.clone(),
        });

        Ok(Removal {
            ticket,
            removed,
            finalized,
        })
    }

    /// Restore the pending line at its former position. The promo code is left alone.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NothingToUndo`] if no removal is pending.
    pub fn undo(&mut self) -> Result<RemovalTicket, CartError> {
        let pending = self.pending.take().ok_or(CartError::NothingToUndo)?;
        let index = pending.index.min(self.items.len());

        self.items.insert(index, pending.item);

        Ok(pending.ticket)
    }

    /// Close the undo window for `ticket`, discarding its line. Stale tickets
    /// are ignored.
    pub fn expire(&mut self, ticket: RemovalTicket) -> Option<Listing> {
        if self.pending.as_ref().map(|pending| pending.ticket) != Some(ticket) {
            debug!(%ticket, "ignoring stale removal ticket");

            return None;
        }

        self.pending.take().map(|pending| pending.item)
    }

    /// Lines as they should be stored: the pending line stays in place until
    /// its window closes.
    pub fn persisted_items(&self) -> Vec<Listing> {
        let mut items = self.items.clone();

        if let Some(pending) = &self.pending {
            items.insert(pending.index.min(items.len()), pending.item.clone());
        }

        items
    }

    /// Totals for the active lines.
    ///
    /// # Errors
    ///
    /// Returns a [`PricingError`] if the arithmetic fails.
    pub fn totals(&self, tax_rate: Percentage) -> Result<Totals, PricingError> {
        calculate_totals(&self.items, self.discount_rate(), tax_rate, self.currency)
    }
}
