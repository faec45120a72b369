use super::polling::PollingPeriod;
use super::workflow::ConnectorTasksTree;
use crate::models::{
    BankAccount, Capability, PspAccount, PspBalance, PspOther, PspPayment, PspPaymentInitiation,
    PspPaymentInitiationReversal, PspWebhook, PspWebhookConfig, WebhookResponse,
};

#[derive(Debug, Clone, Default)]
pub struct InstallRequest {
    pub connector_id: String,
    /// Connector configuration as JSON.
    pub config: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstallResponse {
    pub capabilities: Vec<Capability>,
    pub workflow: ConnectorTasksTree,
    /// Interval for re-running periodic tasks, from the validated config.
    pub polling_period: PollingPeriod,
}

#[derive(Debug, Clone, Default)]
pub struct UninstallRequest {
    pub connector_id: String,
    pub webhook_configs: Vec<PspWebhookConfig>,
}

#[derive(Debug, Clone, Default)]
pub struct UninstallResponse {}

/// Request shared by every `fetch_next_*` operation.
#[derive(Debug, Clone, Default)]
pub struct FetchNextRequest {
    /// Opaque JSON state returned by the previous call, `None` on the first.
    pub state: Option<Vec<u8>>,
    pub page_size: usize,
    /// Raw JSON of the parent item for child tasks.
    pub from_payload: Option<Vec<u8>>,
}

impl FetchNextRequest {
    pub fn state(&self) -> Option<&[u8]> {
        self.state.as_deref()
    }

    pub fn from_payload(&self) -> Option<&[u8]> {
        self.from_payload.as_deref()
    }
}

#[derive(Debug, Clone, Default)]
pub struct FetchNextOthersRequest {
    /// Which connector-specific entity to fetch.
    pub name: String,
    pub state: Option<Vec<u8>>,
    pub page_size: usize,
    pub from_payload: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchNextResponse<T> {
    pub items: Vec<T>,
    pub new_state: Vec<u8>,
    pub has_more: bool,
}

pub type FetchNextAccountsResponse = FetchNextResponse<PspAccount>;
pub type FetchNextBalancesResponse = FetchNextResponse<PspBalance>;
pub type FetchNextExternalAccountsResponse = FetchNextResponse<PspAccount>;
pub type FetchNextPaymentsResponse = FetchNextResponse<PspPayment>;
pub type FetchNextOthersResponse = FetchNextResponse<PspOther>;

#[derive(Debug, Clone)]
pub struct CreateBankAccountRequest {
    pub bank_account: BankAccount,
}

#[derive(Debug, Clone)]
pub struct CreateBankAccountResponse {
    pub related_account: PspAccount,
}

#[derive(Debug, Clone)]
pub struct CreateTransferRequest {
    pub payment_initiation: PspPaymentInitiation,
}

/// Either the payment is available right away, or the caller polls
/// `polling_transfer_id` until it is.
#[derive(Debug, Clone, Default)]
pub struct CreateTransferResponse {
    pub payment: Option<PspPayment>,
    pub polling_transfer_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ReverseTransferRequest {
    pub payment_initiation_reversal: PspPaymentInitiationReversal,
}

#[derive(Debug, Clone)]
pub struct ReverseTransferResponse {
    pub payment: PspPayment,
}

#[derive(Debug, Clone)]
pub struct PollTransferStatusRequest {
    pub transfer_id: String,
}

/// `payment == None && error == None` means still pending.
#[derive(Debug, Clone, Default)]
pub struct PollTransferStatusResponse {
    pub payment: Option<PspPayment>,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreatePayoutRequest {
    pub payment_initiation: PspPaymentInitiation,
}

#[derive(Debug, Clone, Default)]
pub struct CreatePayoutResponse {
    pub payment: Option<PspPayment>,
    pub polling_payout_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ReversePayoutRequest {
    pub payment_initiation_reversal: PspPaymentInitiationReversal,
}

#[derive(Debug, Clone)]
pub struct ReversePayoutResponse {
    pub payment: PspPayment,
}

#[derive(Debug, Clone)]
pub struct PollPayoutStatusRequest {
    pub payout_id: String,
}

#[derive(Debug, Clone, Default)]
pub struct PollPayoutStatusResponse {
    pub payment: Option<PspPayment>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CreateWebhooksRequest {
    pub connector_id: String,
    pub webhook_base_url: String,
    pub from_payload: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Default)]
pub struct CreateWebhooksResponse {
    pub configs: Vec<PspWebhookConfig>,
    pub others: Vec<PspOther>,
}

#[derive(Debug, Clone)]
pub struct VerifyWebhookRequest {
    pub webhook: PspWebhook,
    pub config: Option<PspWebhookConfig>,
}

#[derive(Debug, Clone, Default)]
pub struct VerifyWebhookResponse {
    pub webhook_idempotency_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TranslateWebhookRequest {
    /// Name of the webhook config the delivery arrived on.
    pub name: String,
    pub webhook: PspWebhook,
    pub config: Option<PspWebhookConfig>,
}

#[derive(Debug, Clone, Default)]
pub struct TranslateWebhookResponse {
    pub responses: Vec<WebhookResponse>,
}
