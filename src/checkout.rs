//! # Checkout Module
//!
//! The checkout conversation collects recipient name, surname, phone and
//! delivery address, one step at a time, before the summary is shown. Each
//! step owns a validator; invalid input keeps the conversation on the same
//! step and the same draft.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Field, ValidationError, ValidationIssue};

pub const MIN_NAME_CHARS: usize = 2;
pub const MIN_ADDRESS_CHARS: usize = 5;

lazy_static! {
    /// Latin or Cyrillic letters (Kazakh included), spaces and hyphens
    static ref PERSON_NAME_PATTERN: Regex = Regex::new(r"^[\p{Latin}\p{Cyrillic} -]+$").unwrap();

    /// Kazakh mobile numbers once formatting characters are stripped:
    /// optional trunk prefix (7 or 8) followed by ten digits starting with 7
    static ref PHONE_DIGITS_PATTERN: Regex = Regex::new(r"^(?:7|8)?(7\d{9})$").unwrap();
}

/// Checkout steps in the order they are asked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckoutStep {
    Name,
    Surname,
    Phone,
    Address,
    Confirm,
}

/// Partially collected recipient details
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutDraft {
    pub name: Option<String>,
    pub surname: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Fully validated recipient details
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutDetails {
    pub name: String,
    pub surname: String,
    pub phone: String,
    pub address: String,
}

type Validator = fn(&str) -> Result<String, ValidationError>;

struct StepRule {
    step: CheckoutStep,
    next: CheckoutStep,
    validate: Validator,
    prompt_key: &'static str,
}

const STEPS: [StepRule; 4] = [
    StepRule {
        step: CheckoutStep::Name,
        next: CheckoutStep::Surname,
        validate: validate_first_name,
        prompt_key: "checkout-ask-name",
    },
    StepRule {
        step: CheckoutStep::Surname,
        next: CheckoutStep::Phone,
        validate: validate_surname,
        prompt_key: "checkout-ask-surname",
    },
    StepRule {
        step: CheckoutStep::Phone,
        next: CheckoutStep::Address,
        validate: normalize_phone,
        prompt_key: "checkout-ask-phone",
    },
    StepRule {
        step: CheckoutStep::Address,
        next: CheckoutStep::Confirm,
        validate: validate_address,
        prompt_key: "checkout-ask-address",
    },
];

fn rule_for(step: CheckoutStep) -> Option<&'static StepRule> {
    STEPS.iter().find(|rule| rule.step == step)
}

impl CheckoutStep {
    pub const FIRST: CheckoutStep = CheckoutStep::Name;

    /// Localization key of the question asked at this step
    pub fn prompt_key(&self) -> &'static str {
        rule_for(*self)
            .map(|rule| rule.prompt_key)
            .unwrap_or("checkout-confirm-prompt")
    }
}

/// Result of feeding one message into the checkout conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Value accepted; ask the next question
    Next {
        step: CheckoutStep,
        draft: CheckoutDraft,
    },
    /// All four fields collected; show the summary
    Complete {
        draft: CheckoutDraft,
        details: CheckoutDetails,
    },
    /// Value refused; ask the same question again
    Retry { error: ValidationError },
}

impl CheckoutDraft {
    fn store(&mut self, step: CheckoutStep, value: String) {
        match step {
            CheckoutStep::Name => self.name = Some(value),
            CheckoutStep::Surname => self.surname = Some(value),
            CheckoutStep::Phone => self.phone = Some(value),
            CheckoutStep::Address => self.address = Some(value),
            CheckoutStep::Confirm => {}
        }
    }

    /// The completed details, if every field is present
    pub fn details(&self) -> Option<CheckoutDetails> {
        Some(CheckoutDetails {
            name: self.name.clone()?,
            surname: self.surname.clone()?,
            phone: self.phone.clone()?,
            address: self.address.clone()?,
        })
    }
}

/// Validate `input` for `step` and move the draft forward
pub fn advance(step: CheckoutStep, draft: &CheckoutDraft, input: &str) -> StepOutcome {
    let Some(rule) = rule_for(step) else {
        // The confirm step is answered with buttons, not text
        return StepOutcome::Retry {
            error: ValidationError::new(Field::Text, ValidationIssue::Empty),
        };
    };

    match (rule.validate)(input) {
        Ok(value) => {
            let mut draft = draft.clone();
            draft.store(step, value);
            if rule.next == CheckoutStep::Confirm {
                match draft.details() {
                    Some(details) => StepOutcome::Complete { draft, details },
                    None => StepOutcome::Next {
                        step: CheckoutStep::FIRST,
                        draft: CheckoutDraft::default(),
                    },
                }
            } else {
                StepOutcome::Next {
                    step: rule.next,
                    draft,
                }
            }
        }
        Err(error) => StepOutcome::Retry { error },
    }
}

fn validate_person_name(field: Field, input: &str) -> Result<String, ValidationError> {
    let value = input.trim();
    if value.is_empty() {
        return Err(ValidationError::new(field, ValidationIssue::Empty));
    }
    if value.chars().count() < MIN_NAME_CHARS {
        return Err(ValidationError::new(
            field,
            ValidationIssue::TooShort { min: MIN_NAME_CHARS },
        ));
    }
    if !PERSON_NAME_PATTERN.is_match(value) || !value.chars().any(char::is_alphabetic) {
        return Err(ValidationError::new(field, ValidationIssue::InvalidCharacters));
    }
    Ok(value.to_string())
}

pub fn validate_first_name(input: &str) -> Result<String, ValidationError> {
    validate_person_name(Field::Name, input)
}

pub fn validate_surname(input: &str) -> Result<String, ValidationError> {
    validate_person_name(Field::Surname, input)
}

/// Canonicalize a phone number to `+7XXXXXXXXXX`
///
/// Every non-digit character is dropped before matching, so separators and
/// labels such as `tel:` do not matter. A leading `8` trunk prefix is accepted.
pub fn normalize_phone(input: &str) -> Result<String, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new(Field::Phone, ValidationIssue::Empty));
    }
    let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();
    PHONE_DIGITS_PATTERN
        .captures(&digits)
        .and_then(|caps| caps.get(1))
        .map(|national| format!("+7{}", national.as_str()))
        .ok_or_else(|| ValidationError::new(Field::Phone, ValidationIssue::InvalidPhone))
}

pub fn validate_address(input: &str) -> Result<String, ValidationError> {
    let value = input.trim();
    if value.is_empty() {
        return Err(ValidationError::new(Field::Address, ValidationIssue::Empty));
    }
    if value.chars().count() < MIN_ADDRESS_CHARS {
        return Err(ValidationError::new(
            Field::Address,
            ValidationIssue::TooShort {
                min: MIN_ADDRESS_CHARS,
            },
        ));
    }
    Ok(value.to_string())
}

/// Validate a complete set of details submitted in one request
pub fn validate_details(
    name: &str,
    surname: &str,
    phone: &str,
    address: &str,
) -> Result<CheckoutDetails, ValidationError> {
    Ok(CheckoutDetails {
        name: validate_first_name(name)?,
        surname: validate_surname(surname)?,
        phone: normalize_phone(phone)?,
        address: validate_address(address)?,
    })
}
