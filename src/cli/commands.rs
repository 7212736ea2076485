//! Command execution.

use std::{io::Write, sync::Arc};

use thiserror::Error;
use tracing::debug;

use wastelink::{
    auth::{AuthSession, User},
    cart::{CartError, session::CartSession},
    chat::{
        Author, ChatError, Navigation, PRESET_QUESTIONS, responder::CannedResponder,
        session::ChatSession,
    },
    config::{Settings, SettingsError},
    fixtures::{self, FixtureError},
    listings::{Listing, ListingId},
    marketplace::{LocationFilter, Marketplace, MarketplaceError, MarketplaceQuery},
    payment::{CheckoutOutcome, MpesaPayment, PaymentError, PaymentMethod, StkPush, StkStep, checkout},
    prices::format_price,
    receipt::{OrderSummary, ReceiptError},
    scanner::{ScanError, ScanRequest, Scanner},
    storage::{FileStore, StorageError, Store},
};

use super::{CartCommand, ChatArgs, Cli, Command, MarketArgs, MemberArgs, PayArgs, ScanArgs};

/// Errors surfaced to the terminal.
#[derive(Debug, Error)]
pub(crate) enum CliError {
    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Fixture(#[from] FixtureError),

    #[error(transparent)]
    Marketplace(#[from] MarketplaceError),

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Receipt(#[from] ReceiptError),

    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error("Failed to write output: {0}")]
    Io(#[from] std::io::Error),
}

struct App {
    settings: Settings,
    store: Arc<dyn Store>,
}

impl App {
    fn open(cli: &Cli) -> Result<Self, CliError> {
        let settings = match &cli.config {
            Some(path) => Settings::load(path)?,
            None => Settings::default(),
        };

        let store: Arc<dyn Store> = Arc::new(FileStore::open(&cli.store)?);

        debug!(store = %cli.store.display(), "store opened");

        Ok(Self { settings, store })
    }

    fn cart(&self) -> Result<CartSession, CliError> {
        Ok(CartSession::load(
            Arc::clone(&self.store),
            self.settings.currency()?,
            self.settings.promo_table()?,
            self.settings.tax()?,
            self.settings.timings.undo_window(),
        )?)
    }

    fn marketplace(&self) -> Result<Marketplace, CliError> {
        Ok(Marketplace::new(fixtures::catalog()?, &self.store)?)
    }

    fn sign_in(&self, member: &MemberArgs) -> Result<AuthSession, CliError> {
        let mut auth = AuthSession::start(Arc::clone(&self.store))?;

        if let Some(name) = &member.member {
            auth.login(User::new(name.as_str()))?;
        }

        Ok(auth)
    }
}

pub(crate) async fn run(cli: Cli, out: &mut impl Write) -> Result<(), CliError> {
    let app = App::open(&cli)?;

    match cli.command {
        Command::Market(args) => market(&app, &args, out),
        Command::Cart { action } => cart(&app, action, out).await,
        Command::Chat(args) => chat(&app, &args, out).await,
        Command::Scan(args) => scan(&app, args, out).await,
        Command::Pay(args) => pay(&app, &args, out).await,
    }
}

fn write_listing_row(out: &mut impl Write, listing: &Listing) -> Result<(), CliError> {
    writeln!(
        out,
        "{:>14}  {:<42} {:>12}  {:<24} {}",
        listing.id.as_str(),
        listing.title,
        listing.quantity.to_string(),
        listing.location.to_string(),
        listing.price_label(),
    )?;

    Ok(())
}

fn market(app: &App, args: &MarketArgs, out: &mut impl Write) -> Result<(), CliError> {
    let market = app.marketplace()?;

    if let Some(id) = &args.view {
        let listing = market.view(&ListingId::new(id.as_str()))?;
        let seller = listing.seller_or_default();

        writeln!(out, "{}", listing.title)?;
        writeln!(out, "  Category:  {}", listing.category)?;
        writeln!(out, "  Quantity:  {}", listing.quantity)?;
        writeln!(out, "  Grade:     {}", listing.quality.grade)?;
        writeln!(out, "  Location:  {}", listing.location)?;
        writeln!(
            out,
            "  Price:     {}{}",
            listing.price_label(),
            if listing.negotiable { " (negotiable)" } else { "" }
        )?;
        writeln!(
            out,
            "  Seller:    {}{}",
            seller.name,
            if seller.verified { " ✓" } else { "" }
        )?;

        if let Some(analysis) = &listing.analysis {
            writeln!(out, "  Demand:    {}", analysis.market_demand)?;
        }

        return Ok(());
    }

    let mut query = args
        .query
        .as_deref()
        .map(MarketplaceQuery::parse)
        .unwrap_or_default();

    if let Some(search) = &args.search {
        query.search.clone_from(search);
    }

    if let Some(location) = &args.location {
        query.location = match location.parse::<LocationFilter>() {
            Ok(location) => location,
            Err(never) => match never {},
        };
    }

    let found = market.filter(&query);

    for listing in &found {
        write_listing_row(out, listing)?;
    }

    writeln!(out, "\n{} of {} listings", found.len(), market.listings().len())?;

    Ok(())
}

async fn cart(app: &App, action: CartCommand, out: &mut impl Write) -> Result<(), CliError> {
    let cart = app.cart()?;

    match action {
        CartCommand::Show { promo } => {
            if let Some(code) = promo {
                cart.apply_promo(&code).await?;
            }

            let summary = OrderSummary::from_cart(&cart.snapshot().await, app.settings.tax()?)?;

            summary.write_to(out)?;
        }
        CartCommand::Add { id } => {
            let listing = app
                .marketplace()?
                .add_to_cart(&ListingId::new(id), &cart)
                .await?;

            writeln!(out, "Added {} ({})", listing.title, listing.price_label())?;
        }
        CartCommand::Remove { id, undo } => {
            let removal = cart.remove_item(&ListingId::new(id)).await?;

            writeln!(out, "Removed {}", removal.removed.title)?;

            if undo {
                cart.undo().await?;

                writeln!(out, "Restored {}", removal.removed.title)?;
            } else {
                writeln!(
                    out,
                    "Undo window: {}s",
                    app.settings.timings.undo_window().as_secs()
                )?;

                cart.wait_for_expiry().await;
            }
        }
        CartCommand::Clear => {
            cart.clear().await?;

            writeln!(out, "Cart cleared")?;
        }
    }

    Ok(())
}

async fn chat(app: &App, args: &ChatArgs, out: &mut impl Write) -> Result<(), CliError> {
    if args.presets {
        for question in PRESET_QUESTIONS {
            writeln!(out, "{question}")?;
        }

        return Ok(());
    }

    let auth = app.sign_in(&args.member)?;
    let timings = &app.settings.timings;

    let session = ChatSession::new(
        auth.access().mode(),
        Arc::new(CannedResponder),
        app.settings.sentence_limit,
        timings.response_delay(),
        timings.typing_interval(),
    );

    for message in &args.messages {
        session.send(message).await?;
    }

    for message in session.transcript().await {
        let author = match message.author {
            Author::User => "You",
            Author::Bot => "TakaBot",
        };

        writeln!(out, "{author}: {}", message.text)?;

        if let Some(action) = &message.action {
            let Navigation::Marketplace(query) = &action.navigation;

            writeln!(out, "  [{}] wastelink market --query '{query}'", action.label)?;
        }

        writeln!(out)?;
    }

    Ok(())
}

async fn scan(app: &App, args: ScanArgs, out: &mut impl Write) -> Result<(), CliError> {
    let auth = app.sign_in(&args.member)?;
    let scanner = Scanner::new(app.settings.timings.scan_delay());

    let request = ScanRequest {
        image: args.image,
        quantity: args.quantity,
        unit: args.unit,
        description: args.description,
    };

    let result = scanner.analyze(auth.access(), &request).await?;

    writeln!(out, "AI Analysis Result ({}% confident)", result.confidence_percent())?;
    writeln!(out, "  Category:   {}", result.category)?;
    writeln!(out, "  Materials:  {}", result.materials.join(", "))?;
    writeln!(out, "  Grade:      {}", result.grade)?;
    writeln!(
        out,
        "  Value:      KSh {} - KSh {}",
        result.estimated_value.min, result.estimated_value.max
    )?;
    writeln!(out, "  Trend:      {}", result.market_trends)?;

    for recommendation in &result.recommendations {
        writeln!(out, "  • {recommendation}")?;
    }

    if args.publish {
        let listing = scanner.publish_listing(auth.access(), &request, &result, &app.store)?;

        writeln!(
            out,
            "Listed {} ({}), {} potential buyers",
            listing.title,
            listing.id,
            result.potential_buyers
        )?;
    }

    Ok(())
}

async fn pay(app: &App, args: &PayArgs, out: &mut impl Write) -> Result<(), CliError> {
    let cart = app.cart()?;

    if let Some(code) = &args.promo {
        cart.apply_promo(code).await?;
    }

    let method = args
        .method
        .as_deref()
        .map(str::parse::<PaymentMethod>)
        .transpose()?;

    match checkout(method)? {
        CheckoutOutcome::Proceeding(method) => {
            writeln!(out, "Proceeding with {method}...")?;
        }
        CheckoutOutcome::MpesaPrompt => {
            let total = cart.totals().await?.total();
            let mut stk = StkPush::new(total, app.settings.min_phone_length);
            let payment = MpesaPayment::new(
                app.settings.timings.payment_processing(),
                app.settings.timings.payment_success(),
            );

            writeln!(out, "Total: {}", format_price(&total))?;

            let mut steps = Vec::new();
            let receipt = payment
                .pay(&mut stk, args.phone.as_deref().unwrap_or_default(), |step| {
                    steps.push(step);
                })
                .await?;

            for step in steps {
                match step {
                    StkStep::Processing => writeln!(out, "STK push sent to {}", receipt.phone)?,
                    StkStep::Success => writeln!(out, "Payment Successful!")?,
                    StkStep::Input => {}
                }
            }

            writeln!(out, "Paid {}", format_price(&receipt.amount))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use testresult::TestResult;

    use super::*;

    async fn run_args(store: &std::path::Path, args: &[&str]) -> TestResult<String> {
        let store = store.to_string_lossy();
        let mut argv = vec!["wastelink", "--store", &*store];

        argv.extend_from_slice(args);

        let mut out = Vec::new();

        run(Cli::try_parse_from(argv)?, &mut out).await?;

        Ok(String::from_utf8(out)?)
    }

    #[tokio::test]
    async fn market_filters_by_query_string() -> TestResult {
        let dir = tempfile::tempdir()?;

        let out = run_args(dir.path(), &["market", "--query", "search=glass&location=Kenya"]).await?;

        assert!(out.contains("Glass Bottles - Mixed"), "glass listing shown");
        assert!(out.contains("1 of 13 listings"), "count line");

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn cart_commands_share_the_store() -> TestResult {
        let dir = tempfile::tempdir()?;

        run_args(dir.path(), &["cart", "add", "6"]).await?;
        run_args(dir.path(), &["cart", "add", "3"]).await?;

        let removed = run_args(dir.path(), &["cart", "remove", "3"]).await?;

        assert!(removed.contains("Removed E-Waste Components"), "removal reported");

        let summary = run_args(dir.path(), &["cart", "show", "--promo", "RECYCLE5"]).await?;

        assert!(summary.contains("Glass Bottles - Mixed"), "remaining line shown");
        assert!(!summary.contains("E-Waste"), "removed line is gone");
        assert!(summary.contains("21489.00 KES"), "discounted total");

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn member_chat_prints_button() -> TestResult {
        let dir = tempfile::tempdir()?;

        let out = run_args(
            dir.path(),
            &["chat", "--member", "Grace Wanjiku", "looking for glass near Thika"],
        )
        .await?;

        assert!(out.contains("TakaBot: I found 1 glass bottle listing"), "glass reply");
        assert!(out.contains("search=glass&location=Kenya"), "navigation shown");

        Ok(())
    }

    #[tokio::test]
    async fn pay_requires_a_method() -> TestResult {
        let dir = tempfile::tempdir()?;
        let mut out = Vec::new();
        let store = dir.path().to_string_lossy();

        let cli = Cli::try_parse_from(["wastelink", "--store", &*store, "pay"])?;

        let result = run(cli, &mut out).await;

        assert!(matches!(
            result,
            Err(CliError::Payment(PaymentError::NoPaymentMethod))
        ));

        Ok(())
    }
}
