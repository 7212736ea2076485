//! Checkout and M-Pesa
//!
//! Card and wallet methods only acknowledge the choice. M-Pesa runs a
//! simulated STK push: `input → processing → success`, after which the modal
//! closes and resets.

use std::{fmt, str::FromStr, time::Duration};

use thiserror::Error;
use tokio::time::sleep;
use tracing::{info, instrument, warn};

use crate::prices::{Price, format_price};

/// Payment errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PaymentError {
    /// Checkout attempted before choosing a method
    #[error("Select a payment method")]
    NoPaymentMethod,

    /// Method name not recognised
    #[error("Unknown payment method: {0}")]
    UnknownMethod(String),

    /// Phone number has the wrong length
    #[error("Please enter a valid phone number")]
    InvalidPhoneNumber(String),

    /// Operation not allowed in the current step
    #[error("Expected the {expected} step, but the payment is at {found}")]
    UnexpectedStep {
        /// Step the operation needs
        expected: StkStep,

        /// Current step
        found: StkStep,
    },

    /// The modal cannot be closed while the push is processing
    #[error("Payment is processing")]
    CloseWhileProcessing,
}

/// Supported payment methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaymentMethod {
    /// M-Pesa mobile money
    Mpesa,
    /// Visa card
    Visa,
    /// `PayPal`
    PayPal,
    /// Mastercard
    Mastercard,
}

impl PaymentMethod {
    /// Every method, in display order.
    pub const ALL: [PaymentMethod; 4] = [
        PaymentMethod::Mpesa,
        PaymentMethod::Visa,
        PaymentMethod::PayPal,
        PaymentMethod::Mastercard,
    ];

    /// Identifier used on the command line.
    pub fn id(self) -> &'static str {
        match self {
            PaymentMethod::Mpesa => "mpesa",
            PaymentMethod::Visa => "visa",
            PaymentMethod::PayPal => "paypal",
            PaymentMethod::Mastercard => "mastercard",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PaymentMethod::Mpesa => "M-Pesa",
            PaymentMethod::Visa => "Visa",
            PaymentMethod::PayPal => "PayPal",
            PaymentMethod::Mastercard => "Mastercard",
        })
    }
}

impl FromStr for PaymentMethod {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();

        PaymentMethod::ALL
            .into_iter()
            .find(|method| method.id() == wanted || method.to_string().to_ascii_lowercase() == wanted)
            .ok_or_else(|| PaymentError::UnknownMethod(s.to_string()))
    }
}

/// What checkout leads to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutOutcome {
    /// Open the M-Pesa modal
    MpesaPrompt,

    /// Acknowledge the chosen method
    Proceeding(PaymentMethod),
}

/// Proceed to checkout with the selected method.
///
/// # Errors
///
/// Returns [`PaymentError::NoPaymentMethod`] when nothing is selected.
pub fn checkout(method: Option<PaymentMethod>) -> Result<CheckoutOutcome, PaymentError> {
    match method {
        None => Err(PaymentError::NoPaymentMethod),
        Some(PaymentMethod::Mpesa) => Ok(CheckoutOutcome::MpesaPrompt),
        Some(other) => {
            info!(method = %other, "proceeding with payment method");

            Ok(CheckoutOutcome::Proceeding(other))
        }
    }
}

/// A phone number of the required length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Accept `raw` when it is exactly `length` characters long.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::InvalidPhoneNumber`] otherwise.
    pub fn parse(raw: &str, length: usize) -> Result<Self, PaymentError> {
        if raw.chars().count() == length {
            Ok(Self(raw.to_string()))
        } else {
            Err(PaymentError::InvalidPhoneNumber(raw.to_string()))
        }
    }

    /// Number as entered.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Step of the STK push modal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StkStep {
    /// Waiting for a phone number
    #[default]
    Input,

    /// Waiting for the PIN on the phone
    Processing,

    /// Payment went through
    Success,
}

impl fmt::Display for StkStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StkStep::Input => "input",
            StkStep::Processing => "processing",
            StkStep::Success => "success",
        })
    }
}

/// M-Pesa modal state.
#[derive(Debug, Clone, PartialEq)]
pub struct StkPush {
    amount: Price,
    phone_length: usize,
    step: StkStep,
    phone: Option<PhoneNumber>,
    open: bool,
}

impl StkPush {
    /// Open the modal for `amount`.
    pub fn new(amount: Price, phone_length: usize) -> Self {
        Self {
            amount,
            phone_length,
            step: StkStep::Input,
            phone: None,
            open: true,
        }
    }

    /// Amount being paid.
    pub fn amount(&self) -> Price {
        self.amount
    }

    /// Current step.
    pub fn step(&self) -> StkStep {
        self.step
    }

    /// Number the push was sent to.
    pub fn phone(&self) -> Option<&PhoneNumber> {
        self.phone.as_ref()
    }

    /// Whether the modal is showing.
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Show the modal again.
    pub fn open(&mut self) {
        self.open = true;
    }

    fn expect_step(&self, expected: StkStep) -> Result<(), PaymentError> {
        if self.step == expected {
            Ok(())
        } else {
            Err(PaymentError::UnexpectedStep {
                expected,
                found: self.step,
            })
        }
    }

    /// Send the push to `raw`. On error the modal stays at the input step.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::InvalidPhoneNumber`] for numbers of the wrong
    /// length, or [`PaymentError::UnexpectedStep`] outside the input step.
    pub fn submit(&mut self, raw: &str) -> Result<&PhoneNumber, PaymentError> {
        self.expect_step(StkStep::Input)?;

        let phone = PhoneNumber::parse(raw, self.phone_length)?;

        self.step = StkStep::Processing;

        Ok(self.phone.insert(phone))
    }

    /// Mark the push as paid.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::UnexpectedStep`] unless processing.
    pub fn complete(&mut self) -> Result<(), PaymentError> {
        self.expect_step(StkStep::Processing)?;

        self.step = StkStep::Success;

        Ok(())
    }

    /// Close the modal and reset it to the input step.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::CloseWhileProcessing`] while processing.
    pub fn close(&mut self) -> Result<(), PaymentError> {
        if self.step == StkStep::Processing {
            return Err(PaymentError::CloseWhileProcessing);
        }

        self.open = false;
        self.step = StkStep::Input;
        self.phone = None;

        Ok(())
    }
}

/// Completed M-Pesa payment.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentReceipt {
    /// Number charged
    pub phone: PhoneNumber,

    /// Amount paid
    pub amount: Price,
}

/// Drives an [`StkPush`] through its timed steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MpesaPayment {
    processing: Duration,
    success_display: Duration,
}

impl MpesaPayment {
    /// Create a driver with the given step durations.
    pub fn new(processing: Duration, success_display: Duration) -> Self {
        Self {
            processing,
            success_display,
        }
    }

    /// Pay with `phone`, calling `on_step` as the modal moves on. Returns once
    /// the modal has closed.
    ///
    /// # Errors
    ///
    /// Returns an error if the number is rejected; the modal stays at input.
    #[instrument(skip(self, stk, on_step), fields(amount = %format_price(&stk.amount())))]
    pub async fn pay(
        &self,
        stk: &mut StkPush,
        phone: &str,
        mut on_step: impl FnMut(StkStep) + Send,
    ) -> Result<PaymentReceipt, PaymentError> {
        let phone = match stk.submit(phone) {
            Ok(phone) => phone.clone(),
            Err(error) => {
                warn!(%error, "STK push rejected");

                return Err(error);
            }
        };

        info!(%phone, "STK push sent");
        on_step(StkStep::Processing);

        sleep(self.processing).await;

        stk.complete()?;

        info!(%phone, "payment complete");
        on_step(StkStep::Success);

        sleep(self.success_display).await;

        stk.close()?;

        Ok(PaymentReceipt {
            phone,
            amount: stk.amount(),
        })
    }
}
