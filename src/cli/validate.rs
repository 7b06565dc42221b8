//! Form checks run before anything is sent to the platform.

use thiserror::Error;

use crate::cli::util::fmt_rupiah;
use crate::database::models::{NewComment, NewExpense, NewIncome, Role, MAX_AMOUNT};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Amount must be greater than 0!")]
    AmountNotPositive,

    #[error("Amount must not exceed {}!", fmt_rupiah(MAX_AMOUNT))]
    AmountTooLarge,

    #[error("{0} must not be empty!")]
    EmptyField(&'static str),

    #[error("Only administrators may do this!")]
    NotAdmin,

    #[error("Insufficient balance: only {} left", rupiah(.balance))]
    InsufficientBalance { balance: i64 },
}

fn rupiah(balance: &i64) -> String {
    fmt_rupiah(*balance)
}

/// Whole currency units; anything that is not a positive integer is rejected.
pub fn parse_amount(input: &str) -> Result<i64, ValidationError> {
    match input.trim().parse::<i64>() {
        Ok(n) if n > MAX_AMOUNT => Err(ValidationError::AmountTooLarge),
        Ok(n) if n > 0 => Ok(n),
        // digits beyond i64 are still just too large
        Err(e) if *e.kind() == std::num::IntErrorKind::PosOverflow => {
            Err(ValidationError::AmountTooLarge)
        }
        _ => Err(ValidationError::AmountNotPositive),
    }
}

fn non_empty(field: &'static str, input: &str) -> Result<String, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        Err(ValidationError::EmptyField(field))
    } else {
        Ok(trimmed.to_string())
    }
}

fn require_admin(role: Role) -> Result<(), ValidationError> {
    if role.is_admin() {
        Ok(())
    } else {
        Err(ValidationError::NotAdmin)
    }
}

/// Checks amount, title, role, then the balance currently on screen.
/// The receipt URL is attached after the upload succeeds.
pub fn validate_expense(
    role: Role,
    title: &str,
    amount: &str,
    balance: i64,
) -> Result<NewExpense, ValidationError> {
    let amount = parse_amount(amount)?;
    let title = non_empty("Title", title)?;
    require_admin(role)?;
    if amount > balance {
        return Err(ValidationError::InsufficientBalance { balance });
    }
    Ok(NewExpense { title, amount, image_url: None })
}

pub fn validate_income(role: Role, source: &str, amount: &str) -> Result<NewIncome, ValidationError> {
    let amount = parse_amount(amount)?;
    let source = non_empty("Source", source)?;
    require_admin(role)?;
    Ok(NewIncome { source, amount })
}

pub fn validate_comment(content: &str) -> Result<NewComment, ValidationError> {
    Ok(NewComment { content: non_empty("Comment", content)? })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amounts_must_be_positive_integers() {
        assert_eq!(parse_amount(" 15000 "), Ok(15000));
        for bad in ["", "0", "-5", "abc", "12.5", "1e3"] {
            assert_eq!(parse_amount(bad), Err(ValidationError::AmountNotPositive), "{bad:?}");
        }
    }

    #[test]
    fn amounts_are_capped() {
        assert_eq!(parse_amount("1000000000000000"), Ok(MAX_AMOUNT));
        for big in ["1000000000000001", "9223372036854775807", "99999999999999999999999"] {
            assert_eq!(parse_amount(big), Err(ValidationError::AmountTooLarge), "{big:?}");
        }
        assert_eq!(
            validate_income(Role::Admin, "Lottery", "9223372036854775807").unwrap_err(),
            ValidationError::AmountTooLarge
        );
    }

    #[test]
    fn expense_is_trimmed() {
        let e = validate_expense(Role::Admin, "  Groceries ", "20000", 50_000).unwrap();
        assert_eq!(e, NewExpense { title: "Groceries".into(), amount: 20000, image_url: None });
    }

    #[test]
    fn expense_rejects_empty_title() {
        assert_eq!(
            validate_expense(Role::Admin, "   ", "100", 1_000),
            Err(ValidationError::EmptyField("Title"))
        );
    }

    #[test]
    fn expense_checks_amount_before_title() {
        assert_eq!(
            validate_expense(Role::Admin, "", "0", 1_000),
            Err(ValidationError::AmountNotPositive)
        );
    }

    #[test]
    fn viewers_cannot_record_anything() {
        assert_eq!(validate_expense(Role::User, "Rice", "100", 1_000), Err(ValidationError::NotAdmin));
        assert_eq!(validate_income(Role::User, "Salary", "100"), Err(ValidationError::NotAdmin));
    }

    #[test]
    fn expense_cannot_exceed_balance() {
        assert_eq!(
            validate_expense(Role::Admin, "TV", "5000001", 5_000_000),
            Err(ValidationError::InsufficientBalance { balance: 5_000_000 })
        );
        assert!(validate_expense(Role::Admin, "TV", "5000000", 5_000_000).is_ok());
    }

    #[test]
    fn income_has_no_balance_limit() {
        let i = validate_income(Role::Admin, "Bonus", "1000000").unwrap();
        assert_eq!(i.amount, 1_000_000);
        assert_eq!(i.source, "Bonus");
    }

    #[test]
    fn messages_read_well() {
        assert_eq!(
            ValidationError::InsufficientBalance { balance: 1_500 }.to_string(),
            "Insufficient balance: only Rp 1.500 left"
        );
        assert_eq!(validate_comment(" ").unwrap_err().to_string(), "Comment must not be empty!");
    }
}
