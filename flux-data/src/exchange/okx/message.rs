use serde::{Deserialize, Serialize};

/// Generic [`Okx`](super::Okx) channel push message.
///
/// ### Raw Payload Examples
/// See docs: <https://www.okx.com/docs-v5/en/#websocket-api-push-data>
/// ```json
/// {
///     "arg": {"channel": "books", "instId": "BTC-USDT"},
///     "action": "update",
///     "data": [{"asks": [], "bids": [["8476.98", "0", "0", "0"]], "ts": "1597026383085"}]
/// }
/// ```
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct OkxMessage<T> {
    pub arg: OkxArg,
    /// Only present on incremental channels, eg/ `books`.
    #[serde(default)]
    pub action: Option<OkxAction>,
    pub data: Vec<T>,
}

#[derive(Clone, Eq, PartialEq, Debug, Deserialize, Serialize)]
pub struct OkxArg {
    pub channel: String,
    #[serde(rename = "instId", default)]
    pub instrument: Option<String>,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OkxAction {
    Snapshot,
    Update,
}
