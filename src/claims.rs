//! Reward claims
//!
//! The claim form is validated locally before anything is sent. The claim
//! service itself is an outside collaborator behind [`ClaimService`];
//! [`LocalClaimStore`] is an in-browser implementation persisted to
//! LocalStorage.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::reward::CouponCode;

/// Indian states and union territories accepted as the claim region
pub const REGIONS: [&str; 36] = [
    "Andhra Pradesh",
    "Arunachal Pradesh",
    "Assam",
    "Bihar",
    "Chhattisgarh",
    "Goa",
    "Gujarat",
    "Haryana",
    "Himachal Pradesh",
    "Jharkhand",
    "Karnataka",
    "Kerala",
    "Madhya Pradesh",
    "Maharashtra",
    "Manipur",
    "Meghalaya",
    "Mizoram",
    "Nagaland",
    "Odisha",
    "Punjab",
    "Rajasthan",
    "Sikkim",
    "Tamil Nadu",
    "Telangana",
    "Tripura",
    "Uttar Pradesh",
    "Uttarakhand",
    "West Bengal",
    "Andaman and Nicobar Islands",
    "Chandigarh",
    "Dadra and Nagar Haveli and Daman and Diu",
    "Delhi",
    "Jammu and Kashmir",
    "Ladakh",
    "Lakshadweep",
    "Puducherry",
];

/// Form fields that can be flagged inline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClaimField {
    Region,
    Locality,
    PayoutId,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("select your state")]
    MissingRegion,
    #[error("{0} is not a state or union territory")]
    UnknownRegion(String),
    #[error("enter your city")]
    MissingLocality,
    #[error("enter your UPI ID")]
    MissingPayoutId,
    #[error("UPI ID should look like name@bank")]
    MalformedPayoutId,
}

impl ValidationError {
    /// Field the message belongs next to
    pub fn field(&self) -> ClaimField {
        match self {
            ValidationError::MissingRegion | ValidationError::UnknownRegion(_) => {
                ClaimField::Region
            }
            ValidationError::MissingLocality => ClaimField::Locality,
            ValidationError::MissingPayoutId | ValidationError::MalformedPayoutId => {
                ClaimField::PayoutId
            }
        }
    }
}

/// `name@provider`, no whitespace
pub fn is_valid_upi(id: &str) -> bool {
    let Some((name, provider)) = id.split_once('@') else {
        return false;
    };
    let name_ok = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    let provider_ok = !provider.is_empty() && provider.chars().all(|c| c.is_ascii_alphanumeric());
    name_ok && provider_ok
}

/// Raw form input as typed by the user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimForm {
    pub region: String,
    pub locality: String,
    pub payout_id: String,
    pub feedback: String,
}

/// Trimmed, validated form contents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimDetails {
    pub region: String,
    pub locality: String,
    pub payout_id: String,
    pub feedback: String,
}

impl ClaimForm {
    /// Every problem with the form, in field order
    pub fn errors(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        let region = self.region.trim();
        if region.is_empty() {
            errors.push(ValidationError::MissingRegion);
        } else if !REGIONS.contains(&region) {
            errors.push(ValidationError::UnknownRegion(region.to_string()));
        }

        if self.locality.trim().is_empty() {
            errors.push(ValidationError::MissingLocality);
        }

        let payout_id = self.payout_id.trim();
        if payout_id.is_empty() {
            errors.push(ValidationError::MissingPayoutId);
        } else if !is_valid_upi(payout_id) {
            errors.push(ValidationError::MalformedPayoutId);
        }

        errors
    }

    pub fn is_valid(&self) -> bool {
        self.errors().is_empty()
    }

    /// Trim every field; fails with the first problem found
    pub fn validate(&self) -> Result<ClaimDetails, ValidationError> {
        if let Some(e) = self.errors().into_iter().next() {
            return Err(e);
        }
        Ok(ClaimDetails {
            region: self.region.trim().to_string(),
            locality: self.locality.trim().to_string(),
            payout_id: self.payout_id.trim().to_string(),
            feedback: self.feedback.trim().to_string(),
        })
    }
}

/// What gets sent to the claim service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRequest {
    pub code: CouponCode,
    pub reward_amount: u32,
    pub region: String,
    pub locality: String,
    pub feedback: String,
    pub payout_id: String,
    pub submitted_at_ms: f64,
}

impl ClaimRequest {
    pub fn new(code: CouponCode, reward_amount: u32, details: ClaimDetails, now_ms: f64) -> Self {
        Self {
            code,
            reward_amount,
            region: details.region,
            locality: details.locality,
            feedback: details.feedback,
            payout_id: details.payout_id,
            submitted_at_ms: now_ms,
        }
    }
}

/// A stored claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    #[serde(flatten)]
    pub request: ClaimRequest,
    #[serde(default)]
    pub redeemed: bool,
}

impl From<ClaimRequest> for Submission {
    fn from(request: ClaimRequest) -> Self {
        Self {
            request,
            redeemed: false,
        }
    }
}

/// Claim counts overall and per reward amount
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardStats {
    pub total: usize,
    pub per_amount: BTreeMap<u32, usize>,
}

impl RewardStats {
    pub fn tally<'a>(submissions: impl IntoIterator<Item = &'a Submission>) -> Self {
        let mut stats = Self::default();
        for s in submissions {
            stats.total += 1;
            *stats.per_amount.entry(s.request.reward_amount).or_default() += 1;
        }
        stats
    }
}

/// Failures reported by the claim service
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("coupon {0} has already been claimed")]
    DuplicateCode(CouponCode),
    #[error("no claim found for coupon {0}")]
    NotFound(CouponCode),
    #[error("claim service unavailable: {0}")]
    Unavailable(String),
    #[error("claim rejected: {0}")]
    Rejected(String),
}

/// Why a claim did not go through
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClaimError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error("this card has no reward to claim")]
    NotEligible,
    #[error("scratch the card first")]
    NotRevealed,
    #[error("a claim is already being submitted")]
    InFlight,
    #[error("this card has already been claimed")]
    AlreadyClaimed,
}

/// The remote claim submission and query service
pub trait ClaimService {
    fn submit_claim(&mut self, request: ClaimRequest) -> Result<(), ServiceError>;

    fn query_by_code(&self, code: &CouponCode) -> Option<Submission>;

    fn mark_redeemed(&mut self, code: &CouponCode) -> Result<(), ServiceError>;

    fn list_all(&self) -> Vec<Submission>;

    /// Claims not yet redeemed
    fn list_active(&self) -> Vec<Submission> {
        self.list_all().into_iter().filter(|s| !s.redeemed).collect()
    }

    fn reward_stats(&self) -> RewardStats {
        RewardStats::tally(&self.list_all())
    }

    fn filter_by_region(&self, region: &str) -> Vec<Submission> {
        self.list_all()
            .into_iter()
            .filter(|s| s.request.region == region)
            .collect()
    }

    /// Case-insensitive code prefix search
    fn search_by_code_prefix(&self, prefix: &str) -> Vec<Submission> {
        let prefix = prefix.trim().to_ascii_uppercase();
        self.list_all()
            .into_iter()
            .filter(|s| s.request.code.as_str().starts_with(&prefix))
            .collect()
    }
}

/// Claim store kept in the browser
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocalClaimStore {
    submissions: Vec<Submission>,
}

impl LocalClaimStore {
    /// LocalStorage key (used only in wasm32)
    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "scratch_reveal_claims";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.submissions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.submissions.is_empty()
    }

    fn find_mut(&mut self, code: &CouponCode) -> Result<&mut Submission, ServiceError> {
        self.submissions
            .iter_mut()
            .find(|s| &s.request.code == code)
            .ok_or_else(|| ServiceError::NotFound(code.clone()))
    }

    /// Admin correction of a claim's amount
    pub fn update_reward_amount(
        &mut self,
        code: &CouponCode,
        amount: u32,
    ) -> Result<(), ServiceError> {
        self.find_mut(code)?.request.reward_amount = amount;
        self.save();
        Ok(())
    }

    /// Load claims from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                if let Ok(store) = serde_json::from_str::<LocalClaimStore>(&json) {
                    log::info!("Loaded {} claims", store.submissions.len());
                    return store;
                }
            }
        }

        log::info!("No claims found, starting fresh");
        Self::new()
    }

    /// Save claims to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = serde_json::to_string(self) {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
                log::info!("Claims saved ({} entries)", self.submissions.len());
            }
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::new()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        // No-op for native
    }
}

impl ClaimService for LocalClaimStore {
    fn submit_claim(&mut self, request: ClaimRequest) -> Result<(), ServiceError> {
        if self.submissions.iter().any(|s| s.request.code == request.code) {
            return Err(ServiceError::DuplicateCode(request.code));
        }
        if request.reward_amount == 0 {
            return Err(ServiceError::Rejected("reward amount must be positive".into()));
        }
        self.submissions.push(request.into());
        self.save();
        Ok(())
    }

    fn query_by_code(&self, code: &CouponCode) -> Option<Submission> {
        self.submissions.iter().find(|s| &s.request.code == code).cloned()
    }

    fn mark_redeemed(&mut self, code: &CouponCode) -> Result<(), ServiceError> {
        self.find_mut(code)?.redeemed = true;
        self.save();
        Ok(())
    }

    fn list_all(&self) -> Vec<Submission> {
        self.submissions.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> ClaimForm {
        ClaimForm {
            region: " Kerala ".into(),
            locality: "  Kochi".into(),
            payout_id: "asha.n@okaxis ".into(),
            feedback: "  fun card  ".into(),
        }
    }

    fn request(code: &str, amount: u32, region: &str) -> ClaimRequest {
        let details = ClaimForm {
            region: region.into(),
            ..form()
        }
        .validate()
        .unwrap();
        ClaimRequest::new(CouponCode::parse(code).unwrap(), amount, details, 1_000.0)
    }

    #[test]
    fn test_regions() {
        assert_eq!(REGIONS.len(), 36);
        let mut sorted = REGIONS.to_vec();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), 36);
    }

    #[test]
    fn test_validate_trims_fields() {
        let details = form().validate().unwrap();
        assert_eq!(details.region, "Kerala");
        assert_eq!(details.locality, "Kochi");
        assert_eq!(details.payout_id, "asha.n@okaxis");
        assert_eq!(details.feedback, "fun card");
    }

    #[test]
    fn test_feedback_is_optional() {
        let f = ClaimForm {
            feedback: String::new(),
            ..form()
        };
        assert!(f.is_valid());
        assert_eq!(f.validate().unwrap().feedback, "");
    }

    #[test]
    fn test_missing_fields_reported_in_order() {
        let errors = ClaimForm::default().errors();
        assert_eq!(
            errors,
            vec![
                ValidationError::MissingRegion,
                ValidationError::MissingLocality,
                ValidationError::MissingPayoutId,
            ]
        );
        assert_eq!(errors[1].field(), ClaimField::Locality);
    }

    #[test]
    fn test_whitespace_only_locality_rejected() {
        let f = ClaimForm {
            locality: "   ".into(),
            ..form()
        };
        assert_eq!(f.validate(), Err(ValidationError::MissingLocality));
    }

    #[test]
    fn test_unknown_region_rejected() {
        let f = ClaimForm {
            region: "Atlantis".into(),
            ..form()
        };
        assert_eq!(
            f.validate(),
            Err(ValidationError::UnknownRegion("Atlantis".into()))
        );
    }

    #[test]
    fn test_upi_format() {
        assert!(is_valid_upi("ravi_99@ybl"));
        assert!(is_valid_upi("9876543210@paytm"));
        assert!(!is_valid_upi("ravi"));
        assert!(!is_valid_upi("@ybl"));
        assert!(!is_valid_upi("ravi@"));
        assert!(!is_valid_upi("ra vi@ybl"));
        assert!(!is_valid_upi("ravi@y@bl"));
    }

    #[test]
    fn test_store_rejects_duplicate_codes() {
        let mut store = LocalClaimStore::new();
        store.submit_claim(request("VW-AAAA-BBBB", 10, "Goa")).unwrap();
        let err = store
            .submit_claim(request("VW-AAAA-BBBB", 20, "Goa"))
            .unwrap_err();
        assert!(matches!(err, ServiceError::DuplicateCode(_)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_queries() {
        let mut store = LocalClaimStore::new();
        store.submit_claim(request("VW-AAAA-BBBB", 10, "Goa")).unwrap();
        store.submit_claim(request("VW-CCCC-DDDD", 20, "Assam")).unwrap();
        store.submit_claim(request("VW-AAZZ-EEEE", 10, "Goa")).unwrap();

        let code = CouponCode::parse("VW-CCCC-DDDD").unwrap();
        assert_eq!(store.query_by_code(&code).unwrap().request.region, "Assam");

        assert_eq!(store.filter_by_region("Goa").len(), 2);
        assert_eq!(store.search_by_code_prefix("vw-aa").len(), 2);

        let stats = store.reward_stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.per_amount[&10], 2);
        assert_eq!(stats.per_amount[&20], 1);
    }

    #[test]
    fn test_redeem_and_active() {
        let mut store = LocalClaimStore::new();
        store.submit_claim(request("VW-AAAA-BBBB", 10, "Goa")).unwrap();
        store.submit_claim(request("VW-CCCC-DDDD", 20, "Goa")).unwrap();

        let code = CouponCode::parse("VW-AAAA-BBBB").unwrap();
        store.mark_redeemed(&code).unwrap();
        let active = store.list_active();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].request.code.as_str(), "VW-CCCC-DDDD");
        assert_eq!(store.list_all().len(), 2);

        let missing = CouponCode::parse("VW-ZZZZ-ZZZZ").unwrap();
        assert!(matches!(
            store.mark_redeemed(&missing),
            Err(ServiceError::NotFound(_))
        ));
    }

    #[test]
    fn test_update_reward_amount() {
        let mut store = LocalClaimStore::new();
        store.submit_claim(request("VW-AAAA-BBBB", 10, "Goa")).unwrap();
        let code = CouponCode::parse("VW-AAAA-BBBB").unwrap();
        store.update_reward_amount(&code, 30).unwrap();
        assert_eq!(store.query_by_code(&code).unwrap().request.reward_amount, 30);
    }

    #[test]
    fn test_submission_json_shape() {
        let sub = Submission::from(request("VW-AAAA-BBBB", 10, "Goa"));
        let json = serde_json::to_value(&sub).unwrap();
        assert_eq!(json["code"], "VW-AAAA-BBBB");
        assert_eq!(json["rewardAmount"], 10);
        assert_eq!(json["payoutId"], "asha.n@okaxis");
        assert_eq!(json["redeemed"], false);
    }
}
