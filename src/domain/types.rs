//! Shared domain types.
//!
//! - the field catalogue (`Field`) with each field's wire key, spreadsheet
//!   column header, wizard label, kind and form section
//! - the applicant record (`FormRecord`) and its dynamically addressed view
//!   (`FieldValue`, `PartialRecord`)
//! - the prediction service response (`PredictionResult`)

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// How a field is typed and coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Non-negative amount or count; may be unset.
    Numeric,
    /// Yes/no flag; defaults to `false`.
    Boolean,
    /// Small enumerated code stored as text (HMDA codes).
    Code,
}

/// Form section a field belongs to. Each section is one wizard page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Income,
    Assets,
    Debt,
    Liquid,
    Demographics,
    Hmda,
}

/// A single option of an enumerated code field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeOption {
    pub code: &'static str,
    pub label: &'static str,
}

/// Every applicant field, in form order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    ApplicantIncome,
    Wages,
    BusinessIncome,
    CapitalGains,
    RetirementIncome,
    Stocks,
    Bonds,
    FinancialAssets,
    TotalAssets,
    TotalDebt,
    VehiclePayments,
    EducationPayments,
    LatePayments,
    Checking,
    Saving,
    MoneyMarket,
    CallAccount,
    HoldsLiquidAssets,
    DependentChildren,
    Married,
    InLaborForce,
    Bankruptcy5y,
    Foreclosure5y,
    LoanPurpose,
    LienStatus,
    PropertyType,
    Preapproval,
}

struct FieldSpec {
    key: &'static str,
    column: &'static str,
    label: &'static str,
    kind: FieldKind,
    section: Section,
}

const fn spec(
    key: &'static str,
    column: &'static str,
    label: &'static str,
    kind: FieldKind,
    section: Section,
) -> FieldSpec {
    FieldSpec {
        key,
        column,
        label,
        kind,
        section,
    }
}

use FieldKind::{Boolean, Code, Numeric};
use Section::{Assets, Debt, Demographics, Hmda, Income, Liquid};

// Indexed by `Field as usize`; keep in the same order as the enum.
const FIELD_SPECS: [FieldSpec; 27] = [
    spec("scf_applicant_income_dollars", "Household Income (2019 USD)", "Household income", Numeric, Income),
    spec("scf_WAGEINC", "Wages & Salary", "Wages & salary", Numeric, Income),
    spec("scf_BUSSEFARMINC", "Business Income", "Business / farm income", Numeric, Income),
    spec("scf_KGINC", "Capital Gains (Net)", "Capital gains (net)", Numeric, Income),
    spec("scf_SSRETINC", "Social Security & Retirement Income", "Social security & retirement income", Numeric, Income),
    spec("scf_STOCKS", "Market Value of Stocks", "Stocks (market value)", Numeric, Assets),
    spec("scf_BOND", "Market Value of Bonds", "Bonds (market value)", Numeric, Assets),
    spec("scf_FIN", "Total Financial Assets", "Total financial assets", Numeric, Assets),
    spec("scf_ASSET", "Total Asset Value (incl. real estate & equity)", "Total assets (incl. real estate)", Numeric, Assets),
    spec("scf_DEBT", "Total Outstanding Debt", "Total outstanding debt", Numeric, Debt),
    spec("scf_PAYVEH_total", "Monthly Vehicle Loan Payments", "Monthly vehicle loan payments", Numeric, Debt),
    spec("scf_PAYEDU_total", "Monthly Education Loan Payments", "Monthly education loan payments", Numeric, Debt),
    spec("scf_LATE", "Any Late Debt Payments (Yes=1, No=0)", "Any late debt payments", Boolean, Debt),
    spec("scf_CHECKING", "Checking Account Balance", "Checking balance", Numeric, Liquid),
    spec("scf_SAVING", "Savings Account Balance", "Savings balance", Numeric, Liquid),
    spec("scf_MMA", "Money-Market Account Balance", "Money-market balance", Numeric, Liquid),
    spec("scf_CALL", "Call Account Balance", "Call account balance", Numeric, Liquid),
    spec("scf_HLIQ", "Holds Liquid Assets (Yes=1, No=0)", "Holds liquid assets", Boolean, Liquid),
    spec("scf_KIDS", "Dependent Children", "Dependent children", Numeric, Demographics),
    spec("scf_MARRIED", "Married (Yes=1, No=0)", "Married", Boolean, Demographics),
    spec("scf_LF", "In Labor Force (Yes=1, No=0)", "In labor force", Boolean, Demographics),
    spec("scf_BNKRUPLAST5", "Bankruptcy Past 5 Years (Yes=1, No=0)", "Bankruptcy in past 5 years", Boolean, Demographics),
    spec("scf_FORECLLAST5", "Foreclosure Past 5 Years (Yes=1, No=0)", "Foreclosure in past 5 years", Boolean, Demographics),
    spec(
        "hmda_loan_purpose",
        "HMDA Loan Purpose (1=Purchase,2=Improvement,31=Refinance,32=Cash\u{2011}out,4=Other,5=N/A)",
        "Loan purpose",
        Code,
        Hmda,
    ),
    spec("hmda_lien_status", "HMDA Lien Status (1=First lien,2=Subordinate lien)", "Lien status", Code, Hmda),
    spec(
        "hmda_property_type",
        "HMDA Property Type (1=Principal residence,2=Second home,3=Investment property)",
        "Property type",
        Code,
        Hmda,
    ),
    spec(
        "hmda_preapproval",
        "HMDA Preapproval (1=Requested,2=Not requested,3=Not applicable)",
        "Preapproval",
        Code,
        Hmda,
    ),
];

const LOAN_PURPOSE_CODES: &[CodeOption] = &[
    CodeOption { code: "1", label: "Home purchase" },
    CodeOption { code: "2", label: "Home improvement" },
    CodeOption { code: "31", label: "Refinance" },
    CodeOption { code: "32", label: "Cash-out refinance" },
    CodeOption { code: "4", label: "Other purpose" },
    CodeOption { code: "5", label: "Not applicable" },
];

const LIEN_STATUS_CODES: &[CodeOption] = &[
    CodeOption { code: "1", label: "First lien" },
    CodeOption { code: "2", label: "Subordinate lien" },
];

const PROPERTY_TYPE_CODES: &[CodeOption] = &[
    CodeOption { code: "1", label: "Principal residence" },
    CodeOption { code: "2", label: "Second home" },
    CodeOption { code: "3", label: "Investment property" },
];

const PREAPPROVAL_CODES: &[CodeOption] = &[
    CodeOption { code: "1", label: "Requested" },
    CodeOption { code: "2", label: "Not requested" },
    CodeOption { code: "3", label: "Not applicable" },
];

impl Field {
    pub const ALL: [Field; 27] = [
        Field::ApplicantIncome,
        Field::Wages,
        Field::BusinessIncome,
        Field::CapitalGains,
        Field::RetirementIncome,
        Field::Stocks,
        Field::Bonds,
        Field::FinancialAssets,
        Field::TotalAssets,
        Field::TotalDebt,
        Field::VehiclePayments,
        Field::EducationPayments,
        Field::LatePayments,
        Field::Checking,
        Field::Saving,
        Field::MoneyMarket,
        Field::CallAccount,
        Field::HoldsLiquidAssets,
        Field::DependentChildren,
        Field::Married,
        Field::InLaborForce,
        Field::Bankruptcy5y,
        Field::Foreclosure5y,
        Field::LoanPurpose,
        Field::LienStatus,
        Field::PropertyType,
        Field::Preapproval,
    ];

    fn spec(self) -> &'static FieldSpec {
        &FIELD_SPECS[self as usize]
    }

    /// Wire key used in the prediction request body.
    pub fn key(self) -> &'static str {
        self.spec().key
    }

    /// Exact spreadsheet column header.
    pub fn column(self) -> &'static str {
        self.spec().column
    }

    /// Short label shown by the wizard.
    pub fn label(self) -> &'static str {
        self.spec().label
    }

    pub fn kind(self) -> FieldKind {
        self.spec().kind
    }

    pub fn section(self) -> Section {
        self.spec().section
    }

    /// Look a field up by its exact spreadsheet column header.
    pub fn from_column(column: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.column() == column)
    }

    /// Known codes for `Code` fields; empty for every other kind.
    pub fn codes(self) -> &'static [CodeOption] {
        match self {
            Field::LoanPurpose => LOAN_PURPOSE_CODES,
            Field::LienStatus => LIEN_STATUS_CODES,
            Field::PropertyType => PROPERTY_TYPE_CODES,
            Field::Preapproval => PREAPPROVAL_CODES,
            _ => &[],
        }
    }

    /// Fields shown on one form section, in form order.
    pub fn in_section(section: Section) -> impl Iterator<Item = Field> {
        Field::ALL.into_iter().filter(move |f| f.section() == section)
    }
}

/// Smallest amount accepted from manual numeric input.
pub const MIN_AMOUNT: f64 = 0.0;

/// A field's value, tagged by kind.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Number(Option<f64>),
    Flag(bool),
    Code(String),
}

impl FieldValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Number(_) => FieldKind::Numeric,
            FieldValue::Flag(_) => FieldKind::Boolean,
            FieldValue::Code(_) => FieldKind::Code,
        }
    }
}

/// A subset of fields, as produced by the document mapper.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialRecord {
    values: BTreeMap<Field, FieldValue>,
}

impl PartialRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: Field, value: FieldValue) {
        self.values.insert(field, value);
    }

    pub fn get(&self, field: Field) -> Option<&FieldValue> {
        self.values.get(&field)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.values.contains_key(&field)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &FieldValue)> {
        self.values.iter().map(|(f, v)| (*f, v))
    }
}

/// The applicant record filled in by the wizard.
///
/// Numeric fields are `None` until set. Booleans default to `false` and code
/// fields to the empty string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormRecord {
    pub applicant_income: Option<f64>,
    pub wages: Option<f64>,
    pub business_income: Option<f64>,
    pub capital_gains: Option<f64>,
    pub retirement_income: Option<f64>,
    pub stocks: Option<f64>,
    pub bonds: Option<f64>,
    pub financial_assets: Option<f64>,
    pub total_assets: Option<f64>,
    pub total_debt: Option<f64>,
    pub vehicle_payments: Option<f64>,
    pub education_payments: Option<f64>,
    pub late_payments: bool,
    pub checking: Option<f64>,
    pub saving: Option<f64>,
    pub money_market: Option<f64>,
    pub call_account: Option<f64>,
    pub holds_liquid_assets: bool,
    pub dependent_children: Option<f64>,
    pub married: bool,
    pub in_labor_force: bool,
    pub bankruptcy_5y: bool,
    pub foreclosure_5y: bool,
    pub loan_purpose: String,
    pub lien_status: String,
    pub property_type: String,
    pub preapproval: String,
}

impl FormRecord {
    pub fn new() -> Self {
        Self::default()
    }

    fn number_slot(&mut self, field: Field) -> Option<&mut Option<f64>> {
        Some(match field {
            Field::ApplicantIncome => &mut self.applicant_income,
            Field::Wages => &mut self.wages,
            Field::BusinessIncome => &mut self.business_income,
            Field::CapitalGains => &mut self.capital_gains,
            Field::RetirementIncome => &mut self.retirement_income,
            Field::Stocks => &mut self.stocks,
            Field::Bonds => &mut self.bonds,
            Field::FinancialAssets => &mut self.financial_assets,
            Field::TotalAssets => &mut self.total_assets,
            Field::TotalDebt => &mut self.total_debt,
            Field::VehiclePayments => &mut self.vehicle_payments,
            Field::EducationPayments => &mut self.education_payments,
            Field::Checking => &mut self.checking,
            Field::Saving => &mut self.saving,
            Field::MoneyMarket => &mut self.money_market,
            Field::CallAccount => &mut self.call_account,
            Field::DependentChildren => &mut self.dependent_children,
            _ => return None,
        })
    }

    fn flag_slot(&mut self, field: Field) -> Option<&mut bool> {
        Some(match field {
            Field::LatePayments => &mut self.late_payments,
            Field::HoldsLiquidAssets => &mut self.holds_liquid_assets,
            Field::Married => &mut self.married,
            Field::InLaborForce => &mut self.in_labor_force,
            Field::Bankruptcy5y => &mut self.bankruptcy_5y,
            Field::Foreclosure5y => &mut self.foreclosure_5y,
            _ => return None,
        })
    }

    fn code_slot(&mut self, field: Field) -> Option<&mut String> {
        Some(match field {
            Field::LoanPurpose => &mut self.loan_purpose,
            Field::LienStatus => &mut self.lien_status,
            Field::PropertyType => &mut self.property_type,
            Field::Preapproval => &mut self.preapproval,
            _ => return None,
        })
    }

    /// Read a field as a tagged value.
    pub fn get(&self, field: Field) -> FieldValue {
        match field {
            Field::ApplicantIncome => FieldValue::Number(self.applicant_income),
            Field::Wages => FieldValue::Number(self.wages),
            Field::BusinessIncome => FieldValue::Number(self.business_income),
            Field::CapitalGains => FieldValue::Number(self.capital_gains),
            Field::RetirementIncome => FieldValue::Number(self.retirement_income),
            Field::Stocks => FieldValue::Number(self.stocks),
            Field::Bonds => FieldValue::Number(self.bonds),
            Field::FinancialAssets => FieldValue::Number(self.financial_assets),
            Field::TotalAssets => FieldValue::Number(self.total_assets),
            Field::TotalDebt => FieldValue::Number(self.total_debt),
            Field::VehiclePayments => FieldValue::Number(self.vehicle_payments),
            Field::EducationPayments => FieldValue::Number(self.education_payments),
            Field::LatePayments => FieldValue::Flag(self.late_payments),
            Field::Checking => FieldValue::Number(self.checking),
            Field::Saving => FieldValue::Number(self.saving),
            Field::MoneyMarket => FieldValue::Number(self.money_market),
            Field::CallAccount => FieldValue::Number(self.call_account),
            Field::HoldsLiquidAssets => FieldValue::Flag(self.holds_liquid_assets),
            Field::DependentChildren => FieldValue::Number(self.dependent_children),
            Field::Married => FieldValue::Flag(self.married),
            Field::InLaborForce => FieldValue::Flag(self.in_labor_force),
            Field::Bankruptcy5y => FieldValue::Flag(self.bankruptcy_5y),
            Field::Foreclosure5y => FieldValue::Flag(self.foreclosure_5y),
            Field::LoanPurpose => FieldValue::Code(self.loan_purpose.clone()),
            Field::LienStatus => FieldValue::Code(self.lien_status.clone()),
            Field::PropertyType => FieldValue::Code(self.property_type.clone()),
            Field::Preapproval => FieldValue::Code(self.preapproval.clone()),
        }
    }

    /// Write one field. Returns `false` (and changes nothing) when the value's
    /// kind does not match the field's kind or a number is not finite.
    pub fn set(&mut self, field: Field, value: FieldValue) -> bool {
        match value {
            FieldValue::Number(n) => {
                if n.is_some_and(|v| !v.is_finite()) {
                    return false;
                }
                match self.number_slot(field) {
                    Some(slot) => {
                        *slot = n;
                        true
                    }
                    None => false,
                }
            }
            FieldValue::Flag(b) => match self.flag_slot(field) {
                Some(slot) => {
                    *slot = b;
                    true
                }
                None => false,
            },
            FieldValue::Code(s) => match self.code_slot(field) {
                Some(slot) => {
                    *slot = s;
                    true
                }
                None => false,
            },
        }
    }

    /// Merge every entry of a partial record into this one.
    pub fn apply(&mut self, partial: &PartialRecord) {
        for (field, value) in partial.iter() {
            self.set(field, value.clone());
        }
    }

    /// Build a record from defaults plus a partial record.
    pub fn from_partial(partial: &PartialRecord) -> Self {
        let mut record = Self::new();
        record.apply(partial);
        record
    }
}

/// One `(feature, contribution)` pair of the model explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub feature: String,
    pub shap_value: f64,
}

/// Response of the prediction service.
///
/// Amount fields are optional so that a missing or `null` value renders as
/// "Not Available" instead of failing the whole response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    #[serde(default)]
    pub prediction: Option<f64>,
    #[serde(default)]
    pub range_low: Option<f64>,
    #[serde(default)]
    pub range_high: Option<f64>,
    pub approved: bool,
    #[serde(default)]
    pub approval_probability: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<Vec<Explanation>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_table_is_consistent() {
        for (idx, field) in Field::ALL.into_iter().enumerate() {
            assert_eq!(field as usize, idx);
            assert_eq!(Field::ALL.iter().filter(|f| f.key() == field.key()).count(), 1);
            assert_eq!(Field::from_column(field.column()), Some(field));
            let has_codes = !field.codes().is_empty();
            assert_eq!(has_codes, field.kind() == FieldKind::Code, "{field:?}");
        }
    }

    #[test]
    fn new_record_is_unset() {
        let record = FormRecord::new();
        for field in Field::ALL {
            let expected = match field.kind() {
                FieldKind::Numeric => FieldValue::Number(None),
                FieldKind::Boolean => FieldValue::Flag(false),
                FieldKind::Code => FieldValue::Code(String::new()),
            };
            assert_eq!(record.get(field), expected, "{field:?}");
        }
    }

    #[test]
    fn set_rejects_mismatched_kinds_and_nan() {
        let mut record = FormRecord::new();
        assert!(!record.set(Field::Married, FieldValue::Number(Some(1.0))));
        assert!(!record.set(Field::Wages, FieldValue::Number(Some(f64::NAN))));
        assert!(!record.set(Field::LoanPurpose, FieldValue::Flag(true)));
        assert_eq!(record, FormRecord::new());

        assert!(record.set(Field::Wages, FieldValue::Number(Some(52_000.0))));
        assert!(record.set(Field::LoanPurpose, FieldValue::Code("31".to_string())));
        assert_eq!(record.wages, Some(52_000.0));
        assert_eq!(record.loan_purpose, "31");
    }

    #[test]
    fn prediction_result_tolerates_missing_amounts() {
        let json = r#"{"approved": false, "prediction": null}"#;
        let result: PredictionResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.prediction, None);
        assert_eq!(result.range_low, None);
        assert_eq!(result.approval_probability, None);
        assert!(result.explanation.is_none());
    }

    #[test]
    fn sections_cover_every_field_once() {
        let total: usize = [
            Section::Income,
            Section::Assets,
            Section::Debt,
            Section::Liquid,
            Section::Demographics,
            Section::Hmda,
        ]
        .into_iter()
        .map(|s| Field::in_section(s).count())
        .sum();
        assert_eq!(total, Field::ALL.len());
    }
}
