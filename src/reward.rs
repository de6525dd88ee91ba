//! Weighted reward draw and coupon codes
//!
//! A card's outcome comes from one uniform draw compared against an ordered
//! table of cumulative-probability tiers. Codes are `PREFIX-XXXX-XXXX` over a
//! 32-character alphabet without look-alike glyphs (no I, O, 0, 1).

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Characters allowed in the random part of a coupon code
pub const CODE_ALPHABET: &[u8; 32] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Default coupon prefix
pub const CODE_PREFIX: &str = "VW";

/// Characters per random code segment
pub const CODE_SEGMENT_LEN: usize = 4;

/// Slack allowed when checking that the top bound reaches 1.0
const BOUND_TOLERANCE: f64 = 1e-9;

/// What a card hides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RewardResult {
    /// Cashback in whole currency units
    Reward { amount: u32 },
    /// Nothing won this time
    BetterLuck,
}

impl RewardResult {
    /// Monetary value, if any
    pub fn amount(&self) -> Option<u32> {
        match self {
            RewardResult::Reward { amount } => Some(*amount),
            RewardResult::BetterLuck => None,
        }
    }

    pub fn is_win(&self) -> bool {
        matches!(self, RewardResult::Reward { .. })
    }

    /// Value used to rank tiers (BetterLuck is worth nothing)
    fn value(&self) -> u32 {
        self.amount().unwrap_or(0)
    }
}

impl fmt::Display for RewardResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RewardResult::Reward { amount } => write!(f, "₹{amount}"),
            RewardResult::BetterLuck => f.write_str("better luck next time"),
        }
    }
}

/// Problems with a tier table
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TableError {
    #[error("reward table has no tiers")]
    Empty,
    #[error("tier {index} bound {bound} is outside (0, 1]")]
    OutOfRange { index: usize, bound: f64 },
    #[error("tier {index} bound does not increase")]
    NotAscending { index: usize },
    #[error("top cumulative bound is {top}, expected 1.0")]
    Incomplete { top: f64 },
}

/// One row of the cumulative table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RewardTier {
    /// Running probability up to and including this tier
    pub upper_bound: f64,
    pub result: RewardResult,
}

/// Ordered, exhaustive cumulative-probability table
///
/// Serialized as its tier list; deserializing goes through [`RewardTable::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<RewardTier>", into = "Vec<RewardTier>")]
pub struct RewardTable {
    tiers: Vec<RewardTier>,
    /// Index of the lowest-value tier, used when rounding leaves a draw unmatched
    fallback: usize,
}

impl RewardTable {
    /// Build from cumulative bounds, validating order and completeness
    pub fn new(tiers: Vec<RewardTier>) -> Result<Self, TableError> {
        if tiers.is_empty() {
            return Err(TableError::Empty);
        }

        let mut previous = 0.0;
        for (index, tier) in tiers.iter().enumerate() {
            let bound = tier.upper_bound;
            if !(bound > 0.0 && bound <= 1.0 + BOUND_TOLERANCE) {
                return Err(TableError::OutOfRange { index, bound });
            }
            if bound <= previous {
                return Err(TableError::NotAscending { index });
            }
            previous = bound;
        }

        if (previous - 1.0).abs() > BOUND_TOLERANCE {
            return Err(TableError::Incomplete { top: previous });
        }

        let fallback = tiers
            .iter()
            .enumerate()
            .min_by_key(|(_, t)| t.result.value())
            .map(|(i, _)| i)
            .unwrap_or(0);

        Ok(Self { tiers, fallback })
    }

    /// Build from per-tier shares; bounds are their running sum
    pub fn from_shares(shares: &[(f64, RewardResult)]) -> Result<Self, TableError> {
        let mut running = 0.0;
        let tiers = shares
            .iter()
            .map(|&(share, result)| {
                running += share;
                RewardTier {
                    upper_bound: running,
                    result,
                }
            })
            .collect();
        Self::new(tiers)
    }

    /// Production table
    ///
    /// | tier        | share  |
    /// |-------------|--------|
    /// | ₹10         | 40%    |
    /// | better luck | 40%    |
    /// | ₹20         | 18%    |
    /// | ₹30         | 1.99%  |
    /// | ₹100        | 0.01%  |
    pub fn standard() -> Self {
        let tier = |upper_bound, result| RewardTier {
            upper_bound,
            result,
        };
        Self {
            tiers: vec![
                tier(0.4000, RewardResult::Reward { amount: 10 }),
                tier(0.8000, RewardResult::BetterLuck),
                tier(0.9800, RewardResult::Reward { amount: 20 }),
                tier(0.9999, RewardResult::Reward { amount: 30 }),
                tier(1.0000, RewardResult::Reward { amount: 100 }),
            ],
            fallback: 1,
        }
    }

    pub fn tiers(&self) -> &[RewardTier] {
        &self.tiers
    }

    /// Probability of landing on tier `index`
    pub fn share(&self, index: usize) -> Option<f64> {
        let upper = self.tiers.get(index)?.upper_bound;
        let lower = match index {
            0 => 0.0,
            i => self.tiers[i - 1].upper_bound,
        };
        Some(upper - lower)
    }

    /// Map a draw in [0, 1) to its tier
    pub fn lookup(&self, r: f64) -> RewardResult {
        self.tiers
            .iter()
            .find(|t| r < t.upper_bound)
            .unwrap_or(&self.tiers[self.fallback])
            .result
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> RewardResult {
        self.lookup(rng.random::<f64>())
    }
}

impl Default for RewardTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl TryFrom<Vec<RewardTier>> for RewardTable {
    type Error = TableError;

    fn try_from(tiers: Vec<RewardTier>) -> Result<Self, Self::Error> {
        Self::new(tiers)
    }
}

impl From<RewardTable> for Vec<RewardTier> {
    fn from(table: RewardTable) -> Self {
        table.tiers
    }
}

/// Problems parsing a coupon string
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodeError {
    #[error("expected PREFIX-XXXX-XXXX, got {0:?}")]
    Shape(String),
    #[error("character {0:?} is not in the coupon alphabet")]
    Alphabet(char),
    #[error("coupon prefix {0:?} must be non-empty ASCII letters or digits")]
    Prefix(String),
}

/// Prefixes [`CouponCode::parse`] accepts
pub fn is_valid_prefix(prefix: &str) -> bool {
    !prefix.is_empty() && prefix.chars().all(|c| c.is_ascii_alphanumeric())
}

/// A coupon code in `PREFIX-XXXX-XXXX` form
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CouponCode(String);

impl CouponCode {
    /// Generate a fresh code (fair, not secure)
    pub fn generate<R: Rng + ?Sized>(prefix: &str, rng: &mut R) -> Self {
        let mut code = String::with_capacity(prefix.len() + 2 + CODE_SEGMENT_LEN * 2);
        code.push_str(prefix);
        for _ in 0..2 {
            code.push('-');
            for _ in 0..CODE_SEGMENT_LEN {
                let idx = rng.random_range(0..CODE_ALPHABET.len());
                code.push(CODE_ALPHABET[idx] as char);
            }
        }
        Self(code)
    }

    /// Validate an existing code (any non-empty alphanumeric prefix)
    pub fn parse(s: &str) -> Result<Self, CodeError> {
        let shape = || CodeError::Shape(s.to_string());
        let mut parts = s.split('-');
        let (Some(prefix), Some(a), Some(b), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(shape());
        };

        if !is_valid_prefix(prefix) {
            return Err(shape());
        }
        for segment in [a, b] {
            if segment.chars().count() != CODE_SEGMENT_LEN {
                return Err(shape());
            }
            if let Some(bad) = segment
                .chars()
                .find(|c| !c.is_ascii() || !CODE_ALPHABET.contains(&(*c as u8)))
            {
                return Err(CodeError::Alphabet(bad));
            }
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn prefix(&self) -> &str {
        self.0.split('-').next().unwrap_or_default()
    }
}

impl fmt::Display for CouponCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CouponCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A code and the reward it carries, always drawn together
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draw {
    pub code: CouponCode,
    pub reward: RewardResult,
}

/// Stateless sampler over a reward table
#[derive(Debug, Clone, Default)]
pub struct RewardDistributor {
    table: RewardTable,
    prefix: Option<String>,
}

impl RewardDistributor {
    pub fn new(table: RewardTable) -> Self {
        Self {
            table,
            prefix: None,
        }
    }

    /// Use a custom coupon prefix instead of [`CODE_PREFIX`]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Result<Self, CodeError> {
        let prefix = prefix.into();
        if !is_valid_prefix(&prefix) {
            return Err(CodeError::Prefix(prefix));
        }
        self.prefix = Some(prefix);
        Ok(self)
    }

    pub fn table(&self) -> &RewardTable {
        &self.table
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> RewardResult {
        self.table.sample(rng)
    }

    pub fn generate_code<R: Rng + ?Sized>(&self, rng: &mut R) -> CouponCode {
        CouponCode::generate(self.prefix.as_deref().unwrap_or(CODE_PREFIX), rng)
    }

    /// Fresh code + reward pair for a new card
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Draw {
        let code = self.generate_code(rng);
        let reward = self.sample(rng);
        Draw { code, reward }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_standard_table_is_valid() {
        let table = RewardTable::standard();
        let rebuilt = RewardTable::new(table.tiers().to_vec()).unwrap();
        assert_eq!(rebuilt, table);
        assert_eq!(table.lookup(f64::NAN), RewardResult::BetterLuck);
    }

    #[test]
    fn test_lookup_boundaries() {
        let table = RewardTable::standard();
        assert_eq!(table.lookup(0.0), RewardResult::Reward { amount: 10 });
        assert_eq!(table.lookup(0.3999), RewardResult::Reward { amount: 10 });
        assert_eq!(table.lookup(0.4), RewardResult::BetterLuck);
        assert_eq!(table.lookup(0.8), RewardResult::Reward { amount: 20 });
        assert_eq!(table.lookup(0.9999), RewardResult::Reward { amount: 100 });
        // Unmatched draw falls back to the lowest-value tier
        assert_eq!(table.lookup(1.0), RewardResult::BetterLuck);
    }

    #[test]
    fn test_table_validation() {
        assert_eq!(RewardTable::new(vec![]), Err(TableError::Empty));

        let ten = RewardResult::Reward { amount: 10 };
        let err = RewardTable::from_shares(&[(0.5, ten), (0.4, RewardResult::BetterLuck)]);
        assert!(matches!(err, Err(TableError::Incomplete { .. })));

        let err = RewardTable::from_shares(&[(0.5, ten), (0.0, RewardResult::BetterLuck)]);
        assert_eq!(err, Err(TableError::NotAscending { index: 1 }));

        let err = RewardTable::from_shares(&[(1.5, ten)]);
        assert!(matches!(err, Err(TableError::OutOfRange { index: 0, .. })));

        // Float sums that land within tolerance of 1.0 are fine
        assert!(RewardTable::from_shares(&[(0.1, ten); 10]).is_ok());
        let ok = RewardTable::from_shares(&[
            (0.1, ten),
            (0.2, RewardResult::Reward { amount: 20 }),
            (0.7, RewardResult::BetterLuck),
        ])
        .unwrap();
        assert_eq!(ok.lookup(0.95), RewardResult::BetterLuck);
    }

    #[test]
    fn test_fallback_prefers_lowest_value() {
        let table = RewardTable::from_shares(&[
            (0.5, RewardResult::Reward { amount: 50 }),
            (0.5, RewardResult::Reward { amount: 5 }),
        ])
        .unwrap();
        assert_eq!(table.lookup(2.0), RewardResult::Reward { amount: 5 });
    }

    #[test]
    fn test_sample_frequencies_match_shares() {
        let table = RewardTable::standard();
        let mut rng = Pcg32::seed_from_u64(0xC0FFEE);
        let n = 100_000;
        let mut counts = vec![0usize; table.tiers().len()];

        for _ in 0..n {
            let result = table.sample(&mut rng);
            let idx = table
                .tiers()
                .iter()
                .position(|t| t.result == result)
                .unwrap();
            counts[idx] += 1;
        }

        for (idx, count) in counts.iter().enumerate() {
            let observed = *count as f64 / n as f64;
            let expected = table.share(idx).unwrap();
            assert!(
                (observed - expected).abs() < 0.01,
                "tier {idx}: observed {observed}, expected {expected}"
            );
        }
    }

    #[test]
    fn test_generated_codes_stay_in_alphabet() {
        let mut rng = Pcg32::seed_from_u64(7);
        for _ in 0..10_000 {
            let code = CouponCode::generate(CODE_PREFIX, &mut rng);
            let s = code.as_str();
            assert_eq!(s.len(), 12);
            assert!(s.starts_with("VW-"));
            assert_eq!(&s[7..8], "-");
            for c in s[3..7].bytes().chain(s[8..].bytes()) {
                assert!(CODE_ALPHABET.contains(&c), "bad char {}", c as char);
            }
            assert_eq!(CouponCode::parse(s).as_ref(), Ok(&code));
        }
    }

    #[test]
    fn test_parse_rejects_bad_codes() {
        assert!(CouponCode::parse("VW-ABCD").is_err());
        assert!(CouponCode::parse("VW-ABCD-EFG").is_err());
        assert!(CouponCode::parse("-ABCD-EFGH").is_err());
        assert!(CouponCode::parse("VW-ABCD-EFGH-JKLM").is_err());
        assert_eq!(
            CouponCode::parse("VW-ABCD-EF0H"),
            Err(CodeError::Alphabet('0'))
        );
        assert_eq!(
            CouponCode::parse("VW-abcd-EFGH"),
            Err(CodeError::Alphabet('a'))
        );
        assert_eq!(CouponCode::parse("PROMO-2345-6789").unwrap().prefix(), "PROMO");
    }

    #[test]
    fn test_distributor_custom_prefix() {
        let mut rng = Pcg32::seed_from_u64(1);
        let distributor = RewardDistributor::default().with_prefix("XMAS").unwrap();
        let draw = distributor.draw(&mut rng);
        assert_eq!(draw.code.prefix(), "XMAS");
        assert!(CouponCode::parse(draw.code.as_str()).is_ok());
    }

    #[test]
    fn test_distributor_rejects_unparseable_prefix() {
        for bad in ["", "VW-2", "ÄB", "X Y"] {
            assert_eq!(
                RewardDistributor::default().with_prefix(bad).unwrap_err(),
                CodeError::Prefix(bad.to_string())
            );
        }
    }

    #[test]
    fn test_table_json_goes_through_validation() {
        let json = serde_json::to_string(&RewardTable::standard()).unwrap();
        assert!(json.starts_with('['));
        let back: RewardTable = serde_json::from_str(&json).unwrap();
        assert_eq!(back, RewardTable::standard());
        assert_eq!(back.lookup(1.0), RewardResult::BetterLuck);

        assert!(serde_json::from_str::<RewardTable>("[]").is_err());
        assert!(serde_json::from_str::<RewardTable>(r#"{"tiers":[],"fallback":0}"#).is_err());
        let short = r#"[{"upper_bound":0.5,"result":{"type":"better_luck"}}]"#;
        let err = serde_json::from_str::<RewardTable>(short).unwrap_err();
        assert!(err.to_string().contains("top cumulative bound"));
    }

    #[test]
    fn test_reward_serde_shape() {
        let json = serde_json::to_string(&RewardResult::Reward { amount: 20 }).unwrap();
        assert_eq!(json, r#"{"type":"reward","amount":20}"#);
        let back: RewardResult = serde_json::from_str(r#"{"type":"better_luck"}"#).unwrap();
        assert_eq!(back, RewardResult::BetterLuck);
    }

    proptest! {
        #[test]
        fn prop_lookup_is_a_declared_tier(r in 0.0f64..1.0) {
            let table = RewardTable::standard();
            let result = table.lookup(r);
            prop_assert!(table.tiers().iter().any(|t| t.result == result));
        }

        #[test]
        fn prop_code_round_trips_through_parse(seed in any::<u64>()) {
            let mut rng = Pcg32::seed_from_u64(seed);
            let code = CouponCode::generate(CODE_PREFIX, &mut rng);
            prop_assert_eq!(CouponCode::parse(code.as_str()), Ok(code));
        }
    }
}
