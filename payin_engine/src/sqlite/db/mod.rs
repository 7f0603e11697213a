pub mod disputes;
pub mod intents;
pub mod payout_accounts;
pub mod receipts;
