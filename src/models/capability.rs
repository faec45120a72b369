use serde::{Deserialize, Serialize};

/// An operation a connector declares it supports. The orchestrator uses
/// the declared list to decide which workflow tasks to schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Capability {
    FetchAccounts,
    FetchBalances,
    FetchExternalAccounts,
    FetchPayments,
    FetchOthers,
    CreateWebhooks,
    TranslateWebhooks,
    CreateBankAccount,
    CreateTransfer,
    CreatePayout,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FetchAccounts => "CAPABILITY_FETCH_ACCOUNTS",
            Self::FetchBalances => "CAPABILITY_FETCH_BALANCES",
            Self::FetchExternalAccounts => "CAPABILITY_FETCH_EXTERNAL_ACCOUNTS",
            Self::FetchPayments => "CAPABILITY_FETCH_PAYMENTS",
            Self::FetchOthers => "CAPABILITY_FETCH_OTHERS",
            Self::CreateWebhooks => "CAPABILITY_CREATE_WEBHOOKS",
            Self::TranslateWebhooks => "CAPABILITY_TRANSLATE_WEBHOOKS",
            Self::CreateBankAccount => "CAPABILITY_CREATE_BANK_ACCOUNT",
            Self::CreateTransfer => "CAPABILITY_CREATE_TRANSFER",
            Self::CreatePayout => "CAPABILITY_CREATE_PAYOUT",
        }
    }
}
