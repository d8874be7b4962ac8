//! Swap Constants
//!
//! Pool program identifiers and stable failure-stage codes.

/// On-chain programs that execute bonding-curve swaps
pub mod programs {
    /// Dynamic bonding curve program (pre-graduation pools)
    pub const DBC_PROGRAM_ID: &str = "dbcij3LWUppWqq96dh6gJWwBifmcGfLSB5D4DuSMaqN";

    /// Constant-product pool program that graduated curves migrate to
    pub const DAMM_V2_PROGRAM_ID: &str = "cpamdpZCGKUy5JxQXB4dcpGPiikHawvSWAd6mEn1sGG";

    /// Every program a bonding-curve leg may invoke for its swap
    pub const POOL_PROGRAM_IDS: [&str; 2] = [DBC_PROGRAM_ID, DAMM_V2_PROGRAM_ID];
}

/// Error stage codes reported with a failed swap
pub mod stages {
    pub const VALIDATION: &str = "VALIDATION";
    pub const GETTING_QUOTE: &str = "GETTING_QUOTE";
    pub const BUILDING_TRANSACTION: &str = "BUILDING_TRANSACTION";
    pub const SIGNING_TRANSACTION: &str = "SIGNING_TRANSACTION";
    pub const USER_REJECTED: &str = "USER_REJECTED";
    pub const SENDING_TRANSACTION: &str = "SENDING_TRANSACTION";
    pub const SECOND_LEG: &str = "SECOND_LEG";
}
