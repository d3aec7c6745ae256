use serde::Deserialize;
use serde_json::Value;

// API envelopes: `{ data, meta? }` on success, `{ error }` on failure
#[derive(Debug, Deserialize)]
pub struct Envelope {
    pub data: Value,
    #[serde(default)]
    pub meta: Option<PageMeta>,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct PageMeta {
    pub total: u32,
    #[serde(default = "first_page")]
    pub page: u32,
    pub limit: u32,
}

fn first_page() -> u32 {
    1
}

impl PageMeta {
    pub fn page_count(&self) -> u32 {
        if self.limit == 0 {
            return 1;
        }
        self.total.div_ceil(self.limit).max(1)
    }
}

#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

impl ApiErrorBody {
    /// `data.cooldown.remainingSeconds` of a cooldown-conflict error.
    pub fn cooldown_remaining(&self) -> Option<u64> {
        self.data.as_ref()?.get("cooldown")?.get("remainingSeconds")?.as_u64()
    }

    /// `data.retryAfter` of a rate-limit error, in seconds.
    pub fn retry_after(&self) -> Option<f64> {
        self.data.as_ref()?.get("retryAfter")?.as_f64()
    }
}
