//! `WasteLink` prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    auth::{Access, AccessMode, AuthSession, User},
    cart::{Cart, CartError, RemovalTicket, session::CartSession},
    chat::{
        Author, ChatAction, ChatError, ChatMessage, Navigation,
        engine::{ChatEngine, RequestId},
        responder::{CannedResponder, ChatReply, ChatRequest, Responder},
        session::{ChatEvent, ChatSession},
    },
    config::{Settings, SettingsError},
    listings::{Grade, Listing, ListingId, Location, Quantity, Unit},
    marketplace::{LocationFilter, Marketplace, MarketplaceQuery, WishlistChange},
    payment::{
        CheckoutOutcome, MpesaPayment, PaymentError, PaymentMethod, PhoneNumber, StkPush, StkStep,
        checkout,
    },
    prices::Price,
    pricing::{PricingError, Totals, calculate_totals},
    promotions::{AppliedPromo, PromoError, PromoTable},
    receipt::OrderSummary,
    scanner::{ScanError, ScanRequest, ScanResult, Scanner},
    storage::{FileStore, MemoryStore, Store, StorageError, StorageKey},
};
