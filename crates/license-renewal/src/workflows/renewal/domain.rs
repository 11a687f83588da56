use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Days between payment and the promised license delivery.
pub const DELIVERY_WINDOW_DAYS: i64 = 14;

/// The signed-in person.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    pub email: String,
    pub phone_number: String,
    pub country_code: String,
}

/// Shallow patch applied by `update_user_profile`. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserProfilePatch {
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub country_code: Option<String>,
}

impl UserProfile {
    pub fn apply(&mut self, patch: UserProfilePatch) {
        if let Some(email) = patch.email {
            self.email = email;
        }
        if let Some(phone_number) = patch.phone_number {
            self.phone_number = phone_number;
        }
        if let Some(country_code) = patch.country_code {
            self.country_code = country_code;
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LicenseType {
    #[default]
    #[serde(rename = "")]
    Unselected,
    A,
    B,
    C,
    M,
    E,
}

impl LicenseType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Unselected => "Not selected",
            Self::A => "Type A",
            Self::B => "Type B",
            Self::C => "Type C",
            Self::M => "Type M",
            Self::E => "Type E",
        }
    }
}

/// Renewal period in years, stored as `0` (unselected) through `5`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum RenewalYears {
    #[default]
    Unselected,
    One,
    Two,
    Three,
    Four,
    Five,
}

impl RenewalYears {
    pub const fn years(self) -> u8 {
        match self {
            Self::Unselected => 0,
            Self::One => 1,
            Self::Two => 2,
            Self::Three => 3,
            Self::Four => 4,
            Self::Five => 5,
        }
    }
}

impl TryFrom<u8> for RenewalYears {
    type Error = InvalidRenewalYears;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Unselected),
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            3 => Ok(Self::Three),
            4 => Ok(Self::Four),
            5 => Ok(Self::Five),
            other => Err(InvalidRenewalYears(other)),
        }
    }
}

impl From<RenewalYears> for u8 {
    fn from(value: RenewalYears) -> Self {
        value.years()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidRenewalYears(pub u8);

impl fmt::Display for InvalidRenewalYears {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "renewal period must be between 0 and 5 years, got {}", self.0)
    }
}

impl std::error::Error for InvalidRenewalYears {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LicenseInformation {
    pub dpi: String,
    pub names: String,
    pub last_names: String,
    pub license_type: LicenseType,
    pub renewal_years: RenewalYears,
    pub born_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LicenseInformationPatch {
    pub dpi: Option<String>,
    pub names: Option<String>,
    pub last_names: Option<String>,
    pub license_type: Option<LicenseType>,
    pub renewal_years: Option<RenewalYears>,
    /// `Some(None)` clears a previously entered birth date.
    pub born_date: Option<Option<NaiveDate>>,
}

impl LicenseInformation {
    pub fn apply(&mut self, patch: LicenseInformationPatch) {
        if let Some(dpi) = patch.dpi {
            self.dpi = dpi;
        }
        if let Some(names) = patch.names {
            self.names = names;
        }
        if let Some(last_names) = patch.last_names {
            self.last_names = last_names;
        }
        if let Some(license_type) = patch.license_type {
            self.license_type = license_type;
        }
        if let Some(renewal_years) = patch.renewal_years {
            self.renewal_years = renewal_years;
        }
        if let Some(born_date) = patch.born_date {
            self.born_date = born_date;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeliveryAddress {
    pub street_address: String,
    pub apartment: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryAddressPatch {
    pub street_address: Option<String>,
    pub apartment: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
}

impl DeliveryAddress {
    pub fn apply(&mut self, patch: DeliveryAddressPatch) {
        if let Some(street_address) = patch.street_address {
            self.street_address = street_address;
        }
        if let Some(apartment) = patch.apartment {
            self.apartment = apartment;
        }
        if let Some(city) = patch.city {
            self.city = city;
        }
        if let Some(state) = patch.state {
            self.state = state;
        }
        if let Some(zip_code) = patch.zip_code {
            self.zip_code = zip_code;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessType {
    Renewal,
    Replacement,
}

impl ProcessType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Renewal => "Renewal",
            Self::Replacement => "Replacement",
        }
    }
}

/// The single in-progress, not-yet-paid renewal case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessDraft {
    pub license_information: LicenseInformation,
    pub delivery_address: DeliveryAddress,
    pub process_types: BTreeSet<ProcessType>,
}

impl ProcessDraft {
    /// Flips membership of `process_type`, returning whether it is now selected.
    pub fn toggle_process_type(&mut self, process_type: ProcessType) -> bool {
        if self.process_types.remove(&process_type) {
            false
        } else {
            self.process_types.insert(process_type);
            true
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessId(pub String);

impl ProcessId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProcessId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessStatus {
    #[default]
    Pending,
    Processing,
    Completed,
}

impl ProcessStatus {
    pub const fn ordered() -> [Self; 3] {
        [Self::Pending, Self::Processing, Self::Completed]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Processing => "Processing",
            Self::Completed => "Completed",
        }
    }

    /// Next status along `pending → processing → completed`; `completed` stays put.
    pub const fn next(self) -> Self {
        match self {
            Self::Pending => Self::Processing,
            Self::Processing | Self::Completed => Self::Completed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TestType {
    Colorblind,
    DepthPerception,
    Myopia,
}

impl TestType {
    pub const fn ordered() -> [Self; 3] {
        [Self::Colorblind, Self::DepthPerception, Self::Myopia]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Colorblind => "Color blindness",
            Self::DepthPerception => "Depth perception",
            Self::Myopia => "Myopia",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub score: u32,
    pub total_questions: u32,
    pub passed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TestResults {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colorblind: Option<TestResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth_perception: Option<TestResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub myopia: Option<TestResult>,
}

impl TestResults {
    pub fn get(&self, test_type: TestType) -> Option<&TestResult> {
        match test_type {
            TestType::Colorblind => self.colorblind.as_ref(),
            TestType::DepthPerception => self.depth_perception.as_ref(),
            TestType::Myopia => self.myopia.as_ref(),
        }
    }

    pub fn record(&mut self, test_type: TestType, result: TestResult) {
        let slot = match test_type {
            TestType::Colorblind => &mut self.colorblind,
            TestType::DepthPerception => &mut self.depth_perception,
            TestType::Myopia => &mut self.myopia,
        };
        *slot = Some(result);
    }

    /// True once all three vision sub-tests have a recorded result.
    pub fn is_complete(&self) -> bool {
        self.colorblind.is_some() && self.depth_perception.is_some() && self.myopia.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VerificationStep {
    VisualTest,
    DocumentVerification,
    TransitVerification,
}

impl VerificationStep {
    pub const fn ordered() -> [Self; 3] {
        [
            Self::VisualTest,
            Self::DocumentVerification,
            Self::TransitVerification,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::VisualTest => "Visual test",
            Self::DocumentVerification => "Document verification",
            Self::TransitVerification => "Transit department verification",
        }
    }
}

/// A renewal case whose payment has been finalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedProcess {
    pub id: ProcessId,
    #[serde(flatten)]
    pub draft: ProcessDraft,
    pub status: ProcessStatus,
    pub payment_date: DateTime<Utc>,
    pub amount: f64,
    pub estimated_delivery_date: DateTime<Utc>,
    #[serde(default)]
    pub visual_test_completed: bool,
    #[serde(default)]
    pub document_verification_completed: bool,
    #[serde(default)]
    pub transit_verification_completed: bool,
    #[serde(default)]
    pub test_results: TestResults,
}

impl CompletedProcess {
    pub(crate) fn from_draft(
        id: ProcessId,
        draft: ProcessDraft,
        amount: f64,
        paid_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            draft,
            status: ProcessStatus::Pending,
            payment_date: paid_at,
            amount,
            estimated_delivery_date: paid_at + Duration::days(DELIVERY_WINDOW_DAYS),
            visual_test_completed: false,
            document_verification_completed: false,
            transit_verification_completed: false,
            test_results: TestResults::default(),
        }
    }

    pub fn is_step_completed(&self, step: VerificationStep) -> bool {
        match step {
            VerificationStep::VisualTest => self.visual_test_completed,
            VerificationStep::DocumentVerification => self.document_verification_completed,
            VerificationStep::TransitVerification => self.transit_verification_completed,
        }
    }

    /// Applies a verification-step request. The visual test can only be marked complete
    /// once every vision sub-test is recorded; clearing it is always allowed.
    pub(crate) fn set_step(&mut self, step: VerificationStep, completed: bool) {
        match step {
            VerificationStep::VisualTest => {
                self.visual_test_completed = completed && self.test_results.is_complete();
            }
            VerificationStep::DocumentVerification => {
                self.document_verification_completed = completed;
            }
            VerificationStep::TransitVerification => {
                self.transit_verification_completed = completed;
            }
        }
    }

    pub(crate) fn record_test(&mut self, test_type: TestType, result: TestResult) {
        self.test_results.record(test_type, result);
        self.visual_test_completed = self.test_results.is_complete();
    }

    pub fn verified_step_count(&self) -> usize {
        VerificationStep::ordered()
            .into_iter()
            .filter(|step| self.is_step_completed(*step))
            .count()
    }

    pub fn is_fully_verified(&self) -> bool {
        self.verified_step_count() == VerificationStep::ordered().len()
    }
}
