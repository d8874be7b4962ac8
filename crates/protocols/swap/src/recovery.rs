//! Resume record for two-transaction routes
//!
//! Once the first leg of a mixed route is confirmed its effect is permanent.
//! If the second leg then fails, the caller gets this record back and can
//! persist it; resuming executes the second leg only.
//!
//! A first leg that was sent but never seen confirmed yields an
//! [`UnconfirmedFirstLeg`] instead. Settling it once the leg lands turns it
//! into a [`PendingSecondLeg`].

use coin_core::{Address, Error, RawAmount, TxSignature};
use serde::{Deserialize, Serialize};

use crate::route::LegPlan;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingSecondLeg {
    /// The remaining hop, starting from the reserve currency
    pub leg: LegPlan,
    /// Reserve amount realised by the first leg
    pub amount: RawAmount,
    pub first_leg_signature: TxSignature,
    pub user: Address,
}

impl PendingSecondLeg {
    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))
    }
}

/// First leg of a mixed route, sent but not known to be confirmed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnconfirmedFirstLeg {
    /// The hop still to run once the first leg lands
    pub leg: LegPlan,
    pub first_leg_signature: TxSignature,
    pub user: Address,
    /// Reserve balance read before the first leg was sent
    pub reserve_balance_before: Option<RawAmount>,
    /// First leg's slippage-protected minimum
    pub minimum_output: RawAmount,
}

impl UnconfirmedFirstLeg {
    /// Resume record carrying the reserve the first leg delivered
    pub fn into_pending(self, amount: RawAmount) -> PendingSecondLeg {
        PendingSecondLeg {
            leg: self.leg,
            amount,
            first_leg_signature: self.first_leg_signature,
            user: self.user,
        }
    }

    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))
    }
}
