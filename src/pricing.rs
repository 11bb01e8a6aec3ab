//! Plan catalogue
//!
//! Prices are whole US dollars. Annual billing is discounted; the discount
//! is what the pricing page shows as "savings".

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Subscription tier, ordered from least to most privileged
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    Basic,
    Pro,
    Elite,
}

impl PlanTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::Basic => "basic",
            PlanTier::Pro => "pro",
            PlanTier::Elite => "elite",
        }
    }
}

impl fmt::Display for PlanTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "basic" | "free" => Ok(PlanTier::Basic),
            "pro" => Ok(PlanTier::Pro),
            "elite" => Ok(PlanTier::Elite),
            other => Err(format!("unknown plan tier '{}'", other)),
        }
    }
}

/// Billing period of a subscription
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BillingCycle {
    Monthly,
    Annual,
}

impl BillingCycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingCycle::Monthly => "monthly",
            BillingCycle::Annual => "annual",
        }
    }
}

impl FromStr for BillingCycle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "monthly" | "month" => Ok(BillingCycle::Monthly),
            "annual" | "yearly" | "year" => Ok(BillingCycle::Annual),
            other => Err(format!("unknown billing cycle '{}'", other)),
        }
    }
}

/// One purchasable plan
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Plan {
    pub tier: PlanTier,
    pub name: &'static str,
    pub monthly_price: u32,
    pub annual_price: u32,
    /// Upload credits granted when a billing cycle starts
    pub upload_credits_per_cycle: i64,
    pub features: &'static [&'static str],
}

static PLANS: [Plan; 3] = [
    Plan {
        tier: PlanTier::Basic,
        name: "Basic",
        monthly_price: 0,
        annual_price: 0,
        upload_credits_per_cycle: 10,
        features: &["Trade journal", "Daily challenges", "XP and streaks", "Leaderboard"],
    },
    Plan {
        tier: PlanTier::Pro,
        name: "Pro",
        monthly_price: 12,
        annual_price: 120,
        upload_credits_per_cycle: 100,
        features: &[
            "Everything in Basic",
            "CSV import",
            "Advanced analytics",
            "Per-symbol breakdown",
        ],
    },
    Plan {
        tier: PlanTier::Elite,
        name: "Elite",
        monthly_price: 30,
        annual_price: 300,
        upload_credits_per_cycle: 500,
        features: &[
            "Everything in Pro",
            "Exchange API sync",
            "Priority support",
        ],
    },
];

/// All plans, cheapest first
pub fn plans() -> &'static [Plan] {
    &PLANS
}

/// Plan definition for a tier
pub fn plan(tier: PlanTier) -> &'static Plan {
    match tier {
        PlanTier::Basic => &PLANS[0],
        PlanTier::Pro => &PLANS[1],
        PlanTier::Elite => &PLANS[2],
    }
}

/// Dollars saved per year by paying annually: `monthly * 12 - annual`
pub fn get_savings(plan: &Plan) -> i64 {
    i64::from(plan.monthly_price) * 12 - i64::from(plan.annual_price)
}

/// Savings as a whole percentage of the yearly monthly-billing cost
pub fn savings_percent(plan: &Plan) -> u32 {
    let yearly = i64::from(plan.monthly_price) * 12;
    if yearly == 0 {
        return 0;
    }
    ((get_savings(plan) * 100) as f64 / yearly as f64).round() as u32
}

/// Price charged for one billing period
pub fn price_for(plan: &Plan, cycle: BillingCycle) -> u32 {
    match cycle {
        BillingCycle::Monthly => plan.monthly_price,
        BillingCycle::Annual => plan.annual_price,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pro_savings() {
        assert_eq!(get_savings(plan(PlanTier::Pro)), 24);
        assert_eq!(savings_percent(plan(PlanTier::Pro)), 17);
    }

    #[test]
    fn test_basic_has_no_savings() {
        assert_eq!(get_savings(plan(PlanTier::Basic)), 0);
        assert_eq!(savings_percent(plan(PlanTier::Basic)), 0);
    }

    #[test]
    fn test_elite_savings() {
        assert_eq!(get_savings(plan(PlanTier::Elite)), 60);
    }

    #[test]
    fn test_catalogue_order_and_lookup() {
        let tiers: Vec<PlanTier> = plans().iter().map(|p| p.tier).collect();
        assert_eq!(tiers, vec![PlanTier::Basic, PlanTier::Pro, PlanTier::Elite]);
        for p in plans() {
            assert_eq!(plan(p.tier), p);
        }
        assert!(PlanTier::Elite > PlanTier::Pro);
    }

    #[test]
    fn test_parse() {
        assert_eq!("FREE".parse::<PlanTier>().unwrap(), PlanTier::Basic);
        assert_eq!("yearly".parse::<BillingCycle>().unwrap(), BillingCycle::Annual);
        assert!("platinum".parse::<PlanTier>().is_err());
        assert_eq!(price_for(plan(PlanTier::Pro), BillingCycle::Annual), 120);
    }
}
