//! # Validation Module
//!
//! Input validation utilities for the MatVic back office.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP extractors (matvic-api)                                 │
//! │  ├── JSON shape and types (deserialization)                            │
//! │  └── Bearer token                                                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Lengths, ranges, formats                                          │
//! │  └── Period parameters (day, month)                                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL constraints                                              │
//! │  ├── CHECK (stock >= 0)                                                │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use matvic_core::validation::{validate_month, validate_quantity};
//!
//! assert!(validate_quantity(5).is_ok());
//! assert_eq!(validate_month("2024-03").unwrap(), "2024-03");
//! ```

use chrono::NaiveDate;

use crate::error::ValidationError;
use crate::money::Money;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

fn validate_text(field: &str, value: &str, required: bool, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if required && value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates a product name.
///
/// ## Rules
/// - Must not be blank
/// - At most 200 characters
///
/// ## Example
/// ```rust
/// use matvic_core::validation::validate_product_name;
///
/// assert!(validate_product_name("Cable USB-C 2m").is_ok());
/// assert!(validate_product_name("   ").is_err());
/// ```
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    validate_text("name", name, true, 200)
}

/// Validates a category tag. Empty is allowed (uncategorised).
pub fn validate_category(category: &str) -> ValidationResult<()> {
    validate_text("category", category, false, 50)
}

/// Validates a product description.
pub fn validate_description(description: &str) -> ValidationResult<()> {
    validate_text("description", description, false, 500)
}

/// Validates an optional customer name on a sale.
pub fn validate_customer_name(name: &str) -> ValidationResult<()> {
    validate_text("customer_name", name, false, 100)
}

/// Validates a search query.
///
/// ## Returns
/// The trimmed query string.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.chars().count() > 100 {
        return Err(ValidationError::TooLong {
            field: "q".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity. Any positive count is accepted; stock is the
/// only upper bound.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    Ok(())
}

/// Validates a unit price. Zero is allowed (promotional items).
///
/// ## Example
/// ```rust
/// use matvic_core::money::Money;
/// use matvic_core::validation::validate_price;
///
/// assert!(validate_price(Money::from_pesos(1099)).is_ok());
/// assert!(validate_price(Money::zero()).is_ok());
/// assert!(validate_price(Money::from_pesos(-100)).is_err());
/// ```
pub fn validate_price(price: Money) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: "unit_price".to_string(),
        });
    }

    Ok(())
}

/// Validates a stock level or alert threshold.
pub fn validate_stock_level(field: &str, value: i64) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Identifier Validators
// =============================================================================

/// Validates a UUID string format.
///
/// ## Example
/// ```rust
/// use matvic_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::required("id"));
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Period Validators
// =============================================================================

/// Parses a `YYYY-MM-DD` day parameter.
pub fn validate_day(day: &str) -> ValidationResult<NaiveDate> {
    NaiveDate::parse_from_str(day.trim(), "%Y-%m-%d").map_err(|_| {
        ValidationError::InvalidFormat {
            field: "date".to_string(),
            reason: "expected YYYY-MM-DD".to_string(),
        }
    })
}

/// Parses a `YYYY-MM` month parameter and returns it normalised
/// (zero-padded month).
///
/// ```text
/// "2024-3"  → "2024-03"
/// "2024-13" → InvalidFormat
/// ```
pub fn validate_month(month: &str) -> ValidationResult<String> {
    let invalid = || ValidationError::InvalidFormat {
        field: "month".to_string(),
        reason: "expected YYYY-MM".to_string(),
    };

    let (year, mon) = month.trim().split_once('-').ok_or_else(invalid)?;
    let year: i32 = year.parse().map_err(|_| invalid())?;
    let mon: u32 = mon.parse().map_err(|_| invalid())?;

    // Reuse chrono's calendar rules for the range check.
    let first = NaiveDate::from_ymd_opt(year, mon, 1).ok_or_else(invalid)?;
    Ok(first.format("%Y-%m").to_string())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_validate_product_name() {
        assert!(validate_product_name("Cable USB-C 2m").is_ok());
        assert!(validate_product_name("").is_err());
        assert!(validate_product_name(&"A".repeat(201)).is_err());
        // Length is counted in characters, not bytes.
        assert!(validate_product_name(&"ñ".repeat(200)).is_ok());
    }

    #[test]
    fn test_optional_text_fields() {
        assert!(validate_category("").is_ok());
        assert!(validate_category(&"x".repeat(51)).is_err());
        assert!(validate_description(&"x".repeat(500)).is_ok());
        assert!(validate_customer_name(&"x".repeat(101)).is_err());
    }

    #[test]
    fn test_validate_search_query_trims() {
        assert_eq!(validate_search_query("  funda ").unwrap(), "funda");
        assert!(validate_search_query(&"q".repeat(101)).is_err());
    }

    #[rstest]
    #[case(1, true)]
    #[case(1000, true)]
    #[case(i64::MAX, true)]
    #[case(0, false)]
    #[case(-1, false)]
    fn test_validate_quantity(#[case] qty: i64, #[case] ok: bool) {
        assert_eq!(validate_quantity(qty).is_ok(), ok);
    }

    #[test]
    fn test_validate_price() {
        assert!(validate_price(Money::zero()).is_ok());
        assert!(validate_price(Money::from_pesos(1099)).is_ok());
        assert!(validate_price(Money::from_pesos(-1)).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("123").is_err());
    }

    #[rstest]
    #[case("2024-03-15", true)]
    #[case("2024-02-30", false)]
    #[case("15/03/2024", false)]
    #[case("", false)]
    fn test_validate_day(#[case] input: &str, #[case] ok: bool) {
        assert_eq!(validate_day(input).is_ok(), ok);
    }

    #[rstest]
    #[case("2024-03", Some("2024-03"))]
    #[case("2024-3", Some("2024-03"))]
    #[case("2024-12", Some("2024-12"))]
    #[case("2024-13", None)]
    #[case("2024-00", None)]
    #[case("march", None)]
    fn test_validate_month(#[case] input: &str, #[case] expected: Option<&str>) {
        assert_eq!(validate_month(input).ok().as_deref(), expected);
    }
}
