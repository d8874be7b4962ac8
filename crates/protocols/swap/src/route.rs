//! Route selection
//!
//! Which venues a swap goes through depends only on what kind of token sits
//! on each side: the reserve currency, a project token with a bonding curve,
//! or anything else.

use std::collections::HashSet;
use std::fmt;

use coin_client::{SubmitVia, Venue};
use coin_core::{TokenDescriptor, TokenId, TokenPair};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapRoute {
    /// Reserve <-> project token on its bonding curve, one transaction
    DirectBondingCurve,
    /// Project -> reserve -> project, two curve legs merged into one transaction
    CombinedBondingCurve,
    /// Aggregator leg and curve leg, two transactions bridged through the reserve
    MixedAggregatorAndBondingCurve,
    /// Aggregator only, one transaction
    AggregatorOnly,
}

impl SwapRoute {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DirectBondingCurve => "direct_bonding_curve",
            Self::CombinedBondingCurve => "combined_bonding_curve",
            Self::MixedAggregatorAndBondingCurve => "mixed_aggregator_and_bonding_curve",
            Self::AggregatorOnly => "aggregator_only",
        }
    }

    /// Number of transactions the route submits
    pub fn transaction_count(&self) -> usize {
        match self {
            Self::MixedAggregatorAndBondingCurve => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for SwapRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenClass {
    Reserve,
    Project,
    External,
}

/// What the route classifier needs to know about the token universe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteContext {
    pub reserve: TokenDescriptor,
    project_tokens: HashSet<TokenId>,
}

impl RouteContext {
    pub fn new(reserve: TokenDescriptor) -> Self {
        Self {
            reserve,
            project_tokens: HashSet::new(),
        }
    }

    pub fn with_project_tokens(mut self, tokens: impl IntoIterator<Item = TokenId>) -> Self {
        self.project_tokens.extend(tokens);
        self
    }

    pub fn add_project_token(&mut self, token: TokenId) {
        self.project_tokens.insert(token);
    }

    pub fn classify_token(&self, token: &TokenId) -> TokenClass {
        if *token == self.reserve.token_id {
            TokenClass::Reserve
        } else if self.project_tokens.contains(token) {
            TokenClass::Project
        } else {
            TokenClass::External
        }
    }

    pub fn is_project(&self, token: &TokenId) -> bool {
        self.classify_token(token) == TokenClass::Project
    }
}

/// Pick the route for `input -> output`. First matching rule wins.
pub fn classify(input: &TokenId, output: &TokenId, context: &RouteContext) -> SwapRoute {
    use TokenClass::*;

    match (context.classify_token(input), context.classify_token(output)) {
        (Reserve, Project) | (Project, Reserve) => SwapRoute::DirectBondingCurve,
        (Project, Project) => SwapRoute::CombinedBondingCurve,
        (Project, External) | (External, Project) => SwapRoute::MixedAggregatorAndBondingCurve,
        _ => SwapRoute::AggregatorOnly,
    }
}

/// One quoted hop of a route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegPlan {
    pub venue: Venue,
    pub input: TokenDescriptor,
    pub output: TokenDescriptor,
}

impl LegPlan {
    pub fn new(venue: Venue, input: TokenDescriptor, output: TokenDescriptor) -> Self {
        Self {
            venue,
            input,
            output,
        }
    }

    /// Curve-only transactions go through the relay
    pub fn submit_via(&self) -> SubmitVia {
        match self.venue {
            Venue::BondingCurve => SubmitVia::Relay,
            Venue::Aggregator => SubmitVia::Direct,
        }
    }
}

/// Ordered legs for `route` on `pair`
pub fn plan_legs(route: SwapRoute, pair: &TokenPair, context: &RouteContext) -> Vec<LegPlan> {
    let reserve = context.reserve.clone();
    let input = pair.input.clone();
    let output = pair.output.clone();

    match route {
        SwapRoute::DirectBondingCurve => vec![LegPlan::new(Venue::BondingCurve, input, output)],
        SwapRoute::AggregatorOnly => vec![LegPlan::new(Venue::Aggregator, input, output)],
        SwapRoute::CombinedBondingCurve => vec![
            LegPlan::new(Venue::BondingCurve, input, reserve.clone()),
            LegPlan::new(Venue::BondingCurve, reserve, output),
        ],
        SwapRoute::MixedAggregatorAndBondingCurve => {
            if context.is_project(&input.token_id) {
                vec![
                    LegPlan::new(Venue::BondingCurve, input, reserve.clone()),
                    LegPlan::new(Venue::Aggregator, reserve, output),
                ]
            } else {
                vec![
                    LegPlan::new(Venue::Aggregator, input, reserve.clone()),
                    LegPlan::new(Venue::BondingCurve, reserve, output),
                ]
            }
        }
    }
}

/// Transport for a transaction made of `legs`
pub fn submit_via_for(legs: &[LegPlan]) -> SubmitVia {
    if legs.iter().all(|leg| leg.venue == Venue::BondingCurve) {
        SubmitVia::Relay
    } else {
        SubmitVia::Direct
    }
}
