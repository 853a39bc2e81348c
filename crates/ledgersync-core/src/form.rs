//! Create/edit form for transactions
//!
//! Which account fields a transaction needs depends only on its type, so the
//! rules live in one pure function, [`field_requirements`]. The form clears
//! hidden fields as soon as the type changes, so a value typed for one type
//! can never leak into a submission of another.

use chrono::{NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::directory::AccountDirectory;
use crate::error::{CoreError, CoreResult, ValidationIssue};
use crate::models::{Mutability, NewTransaction, Transaction, TransactionId, TransactionType};

/// Longest description the store accepts
pub const MAX_DESCRIPTION_LEN: usize = 255;

/// Editable fields of the draft
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormField {
    Type,
    Amount,
    Description,
    Source,
    Destination,
}

impl std::fmt::Display for FormField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormField::Type => write!(f, "type"),
            FormField::Amount => write!(f, "amount"),
            FormField::Description => write!(f, "description"),
            FormField::Source => write!(f, "source account"),
            FormField::Destination => write!(f, "destination account"),
        }
    }
}

impl FromStr for FormField {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "type" => Ok(FormField::Type),
            "amount" => Ok(FormField::Amount),
            "description" => Ok(FormField::Description),
            "source" | "from" | "fromaccountnumber" => Ok(FormField::Source),
            "destination" | "to" | "toaccountnumber" => Ok(FormField::Destination),
            _ => Err(format!("Unknown form field: {}", s)),
        }
    }
}

/// How the form treats an account field for a given type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldRule {
    Required,
    Hidden,
}

/// Rules for the two account fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRequirements {
    pub source: FieldRule,
    pub destination: FieldRule,
}

impl FieldRequirements {
    /// Rule for an account field; other fields are always shown
    pub fn rule(&self, field: FormField) -> Option<FieldRule> {
        match field {
            FormField::Source => Some(self.source),
            FormField::Destination => Some(self.destination),
            _ => None,
        }
    }
}

/// Account field rules per transaction type
pub fn field_requirements(kind: TransactionType) -> FieldRequirements {
    use FieldRule::{Hidden, Required};

    match kind {
        TransactionType::Transfer => FieldRequirements {
            source: Required,
            destination: Required,
        },
        TransactionType::Deposit => FieldRequirements {
            source: Hidden,
            destination: Required,
        },
        TransactionType::Withdrawal => FieldRequirements {
            source: Required,
            destination: Hidden,
        },
        TransactionType::Income | TransactionType::Expense => FieldRequirements {
            source: Hidden,
            destination: Hidden,
        },
    }
}

/// Whether the draft creates a new row or edits an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum FormMode {
    Create,
    Edit { id: TransactionId },
}

/// Working copy of a transaction, as typed by the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    pub mode: FormMode,
    pub kind: TransactionType,
    /// Raw amount text; parsed on validation
    pub amount: String,
    pub description: String,
    pub source: Option<String>,
    pub destination: Option<String>,
    /// Original occurrence time when editing
    pub timestamp: Option<NaiveDateTime>,
    /// Flag of the row being edited
    pub mutability: Mutability,
}

impl Draft {
    fn blank() -> Self {
        Self {
            mode: FormMode::Create,
            kind: TransactionType::Transfer,
            amount: String::new(),
            description: String::new(),
            source: None,
            destination: None,
            timestamp: None,
            mutability: Mutability::Mutable,
        }
    }

    fn from_transaction(tx: &Transaction) -> Self {
        let mut draft = Self {
            mode: FormMode::Edit { id: tx.id },
            kind: tx.kind,
            amount: tx.amount.normalize().to_string(),
            description: tx.description.clone(),
            source: tx.from_account_number.clone(),
            destination: tx.to_account_number.clone(),
            timestamp: Some(tx.timestamp),
            mutability: tx.mutability,
        };
        draft.clear_hidden();
        draft
    }

    fn clear_hidden(&mut self) {
        let rules = field_requirements(self.kind);
        if rules.source == FieldRule::Hidden {
            self.source = None;
        }
        if rules.destination == FieldRule::Hidden {
            self.destination = None;
        }
    }
}

/// Validated write, ready for the store
#[derive(Debug, Clone, PartialEq)]
pub enum MutationRequest {
    Create(NewTransaction),
    Update { id: TransactionId, transaction: Transaction },
}

/// Per-row state as the UI sees it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowState {
    /// Mutable and not in the form
    Viewable,
    /// Mutable and currently open in the form
    Editing,
    /// Locked by the store; terminal for local edits
    Locked,
}

/// Owns the in-progress draft. Never touches the directory or the page
/// cache; validated requests go to the sync coordinator.
#[derive(Debug, Default)]
pub struct MutationForm {
    draft: Option<Draft>,
}

impl MutationForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start editing `existing`, or a blank TRANSFER when `None`.
    ///
    /// Locked transactions cannot be opened.
    pub fn open(&mut self, existing: Option<&Transaction>) -> CoreResult<()> {
        self.draft = Some(match existing {
            Some(tx) if !tx.is_mutable() => return Err(CoreError::locked(tx.id)),
            Some(tx) => Draft::from_transaction(tx),
            None => Draft::blank(),
        });
        Ok(())
    }

    /// Discard the draft
    pub fn close(&mut self) {
        self.draft = None;
    }

    pub fn is_open(&self) -> bool {
        self.draft.is_some()
    }

    pub fn draft(&self) -> Option<&Draft> {
        self.draft.as_ref()
    }

    pub fn mode(&self) -> Option<FormMode> {
        self.draft.as_ref().map(|d| d.mode)
    }

    /// Rules for the draft's current type
    pub fn requirements(&self) -> Option<FieldRequirements> {
        self.draft.as_ref().map(|d| field_requirements(d.kind))
    }

    /// Update one field of the draft.
    ///
    /// Changing the type clears account fields the new type hides. An empty
    /// account value clears that field.
    pub fn set_field(&mut self, field: FormField, value: &str) -> CoreResult<()> {
        let draft = self
            .draft
            .as_mut()
            .ok_or_else(|| CoreError::invalid(ValidationIssue::FormClosed))?;

        match field {
            FormField::Type => {
                draft.kind = TransactionType::from_str(value).map_err(|_| {
                    CoreError::invalid(ValidationIssue::InvalidType {
                        value: value.to_string(),
                    })
                })?;
                draft.clear_hidden();
            }
            FormField::Amount => draft.amount = value.trim().to_string(),
            FormField::Description => draft.description = value.to_string(),
            FormField::Source | FormField::Destination => {
                if field_requirements(draft.kind).rule(field) == Some(FieldRule::Hidden) {
                    return Err(CoreError::invalid(ValidationIssue::HiddenField { field }));
                }
                let value = value.trim();
                let value = (!value.is_empty()).then(|| value.to_string());
                if field == FormField::Source {
                    draft.source = value;
                } else {
                    draft.destination = value;
                }
            }
        }
        Ok(())
    }

    /// Check the draft and build the request to send.
    ///
    /// Every broken rule is reported at once. Account numbers must exist in
    /// `accounts`.
    pub fn validate(&self, accounts: &AccountDirectory) -> CoreResult<MutationRequest> {
        let draft = self
            .draft
            .as_ref()
            .ok_or_else(|| CoreError::invalid(ValidationIssue::FormClosed))?;
        let rules = field_requirements(draft.kind);
        let mut issues = Vec::new();

        let amount = match parse_amount(&draft.amount) {
            Ok(amount) => Some(amount),
            Err(issue) => {
                issues.push(issue);
                None
            }
        };

        let mut account_field = |field: FormField, value: &Option<String>| -> Option<String> {
            match (rules.rule(field), value) {
                (Some(FieldRule::Hidden), _) => None,
                (_, None) => {
                    issues.push(ValidationIssue::MissingField { field });
                    None
                }
                (_, Some(number)) => {
                    if !accounts.contains(number) {
                        issues.push(ValidationIssue::UnknownAccount {
                            field,
                            account: number.clone(),
                        });
                    }
                    Some(number.clone())
                }
            }
        };
        let source = account_field(FormField::Source, &draft.source);
        let destination = account_field(FormField::Destination, &draft.destination);

        if draft.kind == TransactionType::Transfer && source.is_some() && source == destination {
            issues.push(ValidationIssue::SameAccount);
        }

        if draft.description.chars().count() > MAX_DESCRIPTION_LEN {
            issues.push(ValidationIssue::DescriptionTooLong {
                max: MAX_DESCRIPTION_LEN,
            });
        }

        let amount = match amount {
            Some(amount) if issues.is_empty() => amount,
            _ => return Err(CoreError::Validation { issues }),
        };

        let description = draft.description.trim().to_string();
        Ok(match draft.mode {
            FormMode::Create => MutationRequest::Create(NewTransaction {
                kind: draft.kind,
                amount,
                description,
                from_account_number: source,
                to_account_number: destination,
                timestamp: now(),
            }),
            FormMode::Edit { id } => MutationRequest::Update {
                id,
                transaction: Transaction {
                    id,
                    kind: draft.kind,
                    amount,
                    description,
                    timestamp: draft.timestamp.unwrap_or_else(now),
                    from_account_number: source,
                    to_account_number: destination,
                    mutability: draft.mutability,
                },
            },
        })
    }

    /// State of `tx` given what the form is doing
    pub fn row_state(&self, tx: &Transaction) -> RowState {
        if !tx.is_mutable() {
            return RowState::Locked;
        }
        match self.mode() {
            Some(FormMode::Edit { id }) if id == tx.id => RowState::Editing,
            _ => RowState::Viewable,
        }
    }
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Smallest amount the store accepts
pub const MIN_AMOUNT: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Parse amount text into a finite, strictly positive decimal
pub fn parse_amount(raw: &str) -> Result<Decimal, ValidationIssue> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ValidationIssue::MissingField {
            field: FormField::Amount,
        });
    }
    let amount = Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|_| ValidationIssue::InvalidAmount {
            value: raw.to_string(),
        })?;
    if amount <= Decimal::ZERO {
        return Err(ValidationIssue::NonPositiveAmount);
    }
    if amount < MIN_AMOUNT {
        return Err(ValidationIssue::AmountTooSmall { min: MIN_AMOUNT });
    }
    Ok(amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{account, transaction, FakeStore};

    async fn directory() -> AccountDirectory {
        let store = FakeStore::new().with_accounts(vec![
            account("A001", "Li Wei", 1000),
            account("A002", "Chen Jie", 200),
        ]);
        let directory = AccountDirectory::new();
        directory.reload(&store).await.unwrap();
        directory
    }

    fn open_with(kind: &str, amount: &str) -> MutationForm {
        let mut form = MutationForm::new();
        form.open(None).unwrap();
        form.set_field(FormField::Type, kind).unwrap();
        form.set_field(FormField::Amount, amount).unwrap();
        form
    }

    #[test]
    fn test_field_requirements_table() {
        use FieldRule::{Hidden, Required};

        let t = field_requirements(TransactionType::Transfer);
        assert_eq!((t.source, t.destination), (Required, Required));
        let d = field_requirements(TransactionType::Deposit);
        assert_eq!((d.source, d.destination), (Hidden, Required));
        let w = field_requirements(TransactionType::Withdrawal);
        assert_eq!((w.source, w.destination), (Required, Hidden));
        let legacy = field_requirements(TransactionType::Income);
        assert_eq!((legacy.source, legacy.destination), (Hidden, Hidden));
    }

    #[test]
    fn test_open_blank_defaults_to_transfer() {
        let mut form = MutationForm::new();
        assert!(!form.is_open());
        form.open(None).unwrap();

        let draft = form.draft().unwrap();
        assert_eq!(draft.mode, FormMode::Create);
        assert_eq!(draft.kind, TransactionType::Transfer);
        assert!(draft.amount.is_empty());
        assert_eq!(form.requirements().unwrap().source, FieldRule::Required);
    }

    #[test]
    fn test_open_existing_seeds_draft() {
        let tx = transaction(5, TransactionType::Withdrawal, 40, Some("A001"), None);
        let mut form = MutationForm::new();
        form.open(Some(&tx)).unwrap();

        let draft = form.draft().unwrap();
        assert_eq!(draft.mode, FormMode::Edit { id: 5 });
        assert_eq!(draft.amount, "40");
        assert_eq!(draft.source.as_deref(), Some("A001"));
        assert_eq!(draft.timestamp, Some(tx.timestamp));
        assert_eq!(form.row_state(&tx), RowState::Editing);
    }

    #[test]
    fn test_open_locked_is_refused() {
        let mut tx = transaction(6, TransactionType::Deposit, 10, None, Some("A001"));
        tx.mutability = Mutability::Locked;
        let mut form = MutationForm::new();

        let err = form.open(Some(&tx)).unwrap_err();
        assert!(matches!(err, CoreError::Permission { id: Some(6), .. }));
        assert!(!form.is_open());
        assert_eq!(form.row_state(&tx), RowState::Locked);
    }

    #[test]
    fn test_set_field_without_form() {
        let mut form = MutationForm::new();
        let err = form.set_field(FormField::Amount, "1").unwrap_err();
        assert_eq!(err.issues(), &[ValidationIssue::FormClosed]);
    }

    #[test]
    fn test_set_field_updates_one_field() {
        let mut form = open_with("TRANSFER", "5");
        form.set_field(FormField::Source, "A001").unwrap();
        form.set_field(FormField::Description, "lunch").unwrap();

        let draft = form.draft().unwrap();
        assert_eq!(draft.source.as_deref(), Some("A001"));
        assert_eq!(draft.destination, None);
        assert_eq!(draft.description, "lunch");
        assert_eq!(draft.amount, "5");

        form.set_field(FormField::Source, "  ").unwrap();
        assert_eq!(form.draft().unwrap().source, None);
    }

    #[test]
    fn test_type_switch_clears_hidden_fields() {
        let mut form = open_with("TRANSFER", "5");
        form.set_field(FormField::Source, "A001").unwrap();
        form.set_field(FormField::Destination, "A002").unwrap();

        form.set_field(FormField::Type, "DEPOSIT").unwrap();
        assert_eq!(form.draft().unwrap().source, None);
        assert_eq!(form.draft().unwrap().destination.as_deref(), Some("A002"));

        // switching back does not bring the old source back
        form.set_field(FormField::Type, "TRANSFER").unwrap();
        assert_eq!(form.draft().unwrap().source, None);
    }

    #[test]
    fn test_hidden_field_cannot_be_set() {
        let mut form = open_with("WITHDRAWAL", "5");
        let err = form.set_field(FormField::Destination, "A002").unwrap_err();
        assert_eq!(
            err.issues(),
            &[ValidationIssue::HiddenField {
                field: FormField::Destination
            }]
        );
    }

    #[test]
    fn test_unknown_type_rejected() {
        let mut form = open_with("TRANSFER", "5");
        let err = form.set_field(FormField::Type, "REFUND").unwrap_err();
        assert!(matches!(err.issues()[0], ValidationIssue::InvalidType { .. }));
        assert_eq!(form.draft().unwrap().kind, TransactionType::Transfer);
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("12.50").unwrap(), Decimal::from_str("12.5").unwrap());
        assert_eq!(parse_amount("1e2").unwrap(), Decimal::from(100));
        assert_eq!(parse_amount("0"), Err(ValidationIssue::NonPositiveAmount));
        assert_eq!(parse_amount("-5"), Err(ValidationIssue::NonPositiveAmount));
        assert_eq!(parse_amount("0.01").unwrap(), MIN_AMOUNT);
        assert_eq!(
            parse_amount("0.001"),
            Err(ValidationIssue::AmountTooSmall { min: MIN_AMOUNT })
        );
        assert!(matches!(parse_amount("NaN"), Err(ValidationIssue::InvalidAmount { .. })));
        assert!(matches!(parse_amount("inf"), Err(ValidationIssue::InvalidAmount { .. })));
        assert!(matches!(parse_amount("abc"), Err(ValidationIssue::InvalidAmount { .. })));
        assert!(matches!(parse_amount(""), Err(ValidationIssue::MissingField { .. })));
    }

    #[tokio::test]
    async fn test_validate_amounts() {
        let accounts = directory().await;
        for bad in ["0", "-5"] {
            let mut form = open_with("DEPOSIT", bad);
            form.set_field(FormField::Destination, "A001").unwrap();
            let err = form.validate(&accounts).unwrap_err();
            assert_eq!(err.issues(), &[ValidationIssue::NonPositiveAmount]);
        }

        let mut form = open_with("DEPOSIT", "0.009");
        form.set_field(FormField::Destination, "A001").unwrap();
        let err = form.validate(&accounts).unwrap_err();
        assert_eq!(err.issues(), &[ValidationIssue::AmountTooSmall { min: MIN_AMOUNT }]);

        let mut form = open_with("DEPOSIT", "12.50");
        form.set_field(FormField::Destination, "A001").unwrap();
        assert!(form.validate(&accounts).is_ok());
    }

    #[tokio::test]
    async fn test_validate_lists_every_issue() {
        let accounts = directory().await;
        let form = open_with("TRANSFER", "-1");

        let err = form.validate(&accounts).unwrap_err();
        let issues = err.issues();
        assert_eq!(issues.len(), 3);
        assert!(issues.contains(&ValidationIssue::NonPositiveAmount));
        assert!(issues.contains(&ValidationIssue::MissingField { field: FormField::Source }));
        assert!(issues.contains(&ValidationIssue::MissingField {
            field: FormField::Destination
        }));
    }

    #[tokio::test]
    async fn test_validate_account_rules() {
        let accounts = directory().await;

        let mut form = open_with("TRANSFER", "10");
        form.set_field(FormField::Source, "A001").unwrap();
        form.set_field(FormField::Destination, "A001").unwrap();
        let err = form.validate(&accounts).unwrap_err();
        assert_eq!(err.issues(), &[ValidationIssue::SameAccount]);

        form.set_field(FormField::Destination, "Z999").unwrap();
        let err = form.validate(&accounts).unwrap_err();
        assert_eq!(
            err.issues(),
            &[ValidationIssue::UnknownAccount {
                field: FormField::Destination,
                account: "Z999".to_string()
            }]
        );

        form.set_field(FormField::Destination, "A002").unwrap();
        match form.validate(&accounts).unwrap() {
            MutationRequest::Create(body) => {
                assert_eq!(body.kind, TransactionType::Transfer);
                assert_eq!(body.amount, Decimal::from(10));
                assert_eq!(body.from_account_number.as_deref(), Some("A001"));
                assert_eq!(body.to_account_number.as_deref(), Some("A002"));
            }
            other => panic!("expected create, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_validate_description_length() {
        let accounts = directory().await;
        let mut form = open_with("WITHDRAWAL", "1");
        form.set_field(FormField::Source, "A002").unwrap();
        form.set_field(FormField::Description, &"x".repeat(256)).unwrap();

        let err = form.validate(&accounts).unwrap_err();
        assert_eq!(err.issues(), &[ValidationIssue::DescriptionTooLong { max: 255 }]);
    }

    #[tokio::test]
    async fn test_validate_legacy_type_needs_no_accounts() {
        let accounts = directory().await;
        let form = open_with("INCOME", "300");
        match form.validate(&accounts).unwrap() {
            MutationRequest::Create(body) => {
                assert_eq!(body.from_account_number, None);
                assert_eq!(body.to_account_number, None);
            }
            other => panic!("expected create, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_validate_edit_builds_update() {
        let accounts = directory().await;
        let tx = transaction(8, TransactionType::Deposit, 20, None, Some("A002"));
        let mut form = MutationForm::new();
        form.open(Some(&tx)).unwrap();
        form.set_field(FormField::Amount, "25").unwrap();

        match form.validate(&accounts).unwrap() {
            MutationRequest::Update { id, transaction } => {
                assert_eq!(id, 8);
                assert_eq!(transaction.amount, Decimal::from(25));
                assert_eq!(transaction.timestamp, tx.timestamp);
                assert_eq!(transaction.to_account_number.as_deref(), Some("A002"));
            }
            other => panic!("expected update, got {:?}", other),
        }
    }

    #[test]
    fn test_close_discards_draft() {
        let mut form = open_with("TRANSFER", "1");
        form.close();
        assert!(form.draft().is_none());
        assert!(form.mode().is_none());
    }

    #[test]
    fn test_form_field_from_str() {
        assert_eq!("from".parse::<FormField>().unwrap(), FormField::Source);
        assert_eq!("toAccountNumber".parse::<FormField>().unwrap(), FormField::Destination);
        assert!("currency".parse::<FormField>().is_err());
    }
}
